//! In-memory gridded datasets.

pub mod nc;

use std::{collections::BTreeMap, path::Path};

use ndarray::ArrayD;

use crate::error::DatasetError;

pub use nc::NetcdfReader;

pub type Attributes = BTreeMap<String, AttrValue>;

#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Text(String),
    Number(f64),
    Numbers(Vec<f64>),
}

impl AttrValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            AttrValue::Number(n) => Some(*n),
            AttrValue::Numbers(ns) if ns.len() == 1 => Some(ns[0]),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Number(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
/// A named array's dimensions, values and attributes. Missing values are `NaN`.
pub struct Variable {
    pub dims: Vec<String>,
    pub values: ArrayD<f64>,
    pub attributes: Attributes,
}

impl Variable {
    pub fn new(dims: Vec<String>, values: ArrayD<f64>) -> Self {
        Variable {
            dims,
            values,
            attributes: Attributes::new(),
        }
    }

    pub fn with_attribute(mut self, name: &str, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    pub fn axis_of(&self, dim: &str) -> Option<usize> {
        self.dims.iter().position(|d| d == dim)
    }

    /// Dimension names paired with their lengths.
    pub fn shape(&self) -> Vec<(String, usize)> {
        self.dims
            .iter()
            .cloned()
            .zip(self.values.shape().iter().copied())
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub dimensions: Vec<(String, usize)>,
    pub variables: BTreeMap<String, Variable>,
    pub attributes: Attributes,
}

impl Dataset {
    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    /// The 1-D variable labelling `dim`, if the dataset has one.
    pub fn coordinate(&self, dim: &str) -> Option<&Variable> {
        self.variables
            .get(dim)
            .filter(|v| v.dims.len() == 1 && v.dims[0] == dim)
    }

    pub fn dimension_len(&self, dim: &str) -> Option<usize> {
        self.dimensions
            .iter()
            .find(|(name, _)| name == dim)
            .map(|(_, len)| *len)
    }

    /// Adds `variable` under `name`, registering any dimension not seen yet.
    pub fn insert(&mut self, name: &str, variable: Variable) {
        for (dim, len) in variable.shape() {
            if self.dimension_len(&dim).is_none() {
                self.dimensions.push((dim, len));
            }
        }
        self.variables.insert(name.to_string(), variable);
    }
}

/// Opens one input file. Implementations load `variable` (if present) and the
/// coordinate variables of its dimensions, nothing else.
pub trait DatasetReader: Send + Sync {
    fn open(&self, path: &Path, variable: &str) -> Result<Dataset, DatasetError>;
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use ndarray::{ArrayD, IxDyn};

    use super::*;

    #[test]
    fn should_register_dimensions_once() {
        let mut ds = Dataset::default();
        let lat = Variable::new(vec!["lat".into()], ArrayD::zeros(IxDyn(&[3])));
        let temp = Variable::new(vec!["time".into(), "lat".into()], ArrayD::zeros(IxDyn(&[24, 3])));

        ds.insert("lat", lat);
        ds.insert("temp", temp);

        assert_eq!(
            ds.dimensions,
            vec![("lat".to_string(), 3), ("time".to_string(), 24)]
        );
        assert!(ds.coordinate("lat").is_some());
        assert!(ds.coordinate("temp").is_none());
        assert_eq!(ds.variable("temp").unwrap().axis_of("lat"), Some(1));
    }

    #[test]
    fn should_read_attribute_values() {
        assert_eq!(AttrValue::Numbers(vec![2.5]).as_number(), Some(2.5));
        assert_eq!(AttrValue::Numbers(vec![1.0, 2.0]).as_number(), None);
        assert_eq!(AttrValue::from("K").as_text(), Some("K"));
        assert_eq!(AttrValue::from(1.0).as_text(), None);
    }
}
