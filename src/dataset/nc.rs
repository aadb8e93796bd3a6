//! Reading and writing datasets in the NetCDF file format.

use std::path::Path;

use ndarray::{ArrayD, IxDyn};
use netcdf::AttributeValue;

use crate::error::DatasetError;

use super::{AttrValue, Attributes, Dataset, DatasetReader, Variable};

/// Attributes consumed while unpacking values; they describe the file
/// encoding, not the data, and are not carried into memory.
const PACKING_ATTRIBUTES: [&str; 4] = ["_FillValue", "missing_value", "scale_factor", "add_offset"];

#[derive(Debug, Clone, Copy, Default)]
/// Loads a variable and its coordinates from a NetCDF file, masking fill
/// values and applying `scale_factor`/`add_offset`.
pub struct NetcdfReader;

impl DatasetReader for NetcdfReader {
    fn open(&self, path: &Path, variable: &str) -> Result<Dataset, DatasetError> {
        let file = netcdf::open(path)?;

        let mut dataset = Dataset {
            dimensions: file.dimensions().map(|d| (d.name(), d.len())).collect(),
            attributes: read_attributes(file.attributes()),
            ..Dataset::default()
        };

        let Some(var) = file.variable(variable) else {
            return Ok(dataset);
        };

        let data = read_variable(&var)?;
        for dim in data.dims.iter().filter(|d| d.as_str() != variable) {
            if let Some(coord) = file.variable(dim) {
                let dims = coord.dimensions();
                if dims.len() == 1 && dims[0].name() == *dim {
                    dataset.variables.insert(dim.clone(), read_variable(&coord)?);
                }
            }
        }
        dataset.variables.insert(variable.to_string(), data);

        Ok(dataset)
    }
}

/// Writes every dimension, variable and attribute of `dataset` to a new
/// NetCDF file at `path`, replacing any existing file.
pub fn write(dataset: &Dataset, path: &Path) -> Result<(), DatasetError> {
    let mut file = netcdf::create(path)?;

    for (name, len) in &dataset.dimensions {
        file.add_dimension(name, *len)?;
    }
    for (name, value) in &dataset.attributes {
        file.add_attribute(name, to_netcdf(value))?;
    }

    for (name, variable) in &dataset.variables {
        for (dim, len) in variable.shape() {
            let expected = dataset.dimension_len(&dim).unwrap_or(0);
            if expected != len {
                return Err(DatasetError::DimensionLength {
                    name: dim,
                    expected,
                    found: len,
                });
            }
        }

        let dims: Vec<&str> = variable.dims.iter().map(String::as_str).collect();
        let mut nc_var = file.add_variable::<f64>(name, &dims)?;

        let is_coordinate = dims.len() == 1 && dims[0] == name;
        if !is_coordinate && variable.values.iter().any(|v| v.is_nan()) {
            nc_var.set_fill_value(f64::NAN)?;
        }
        for (attr, value) in &variable.attributes {
            nc_var.put_attribute(attr, to_netcdf(value))?;
        }

        let values: Vec<f64> = variable.values.iter().copied().collect();
        nc_var.put_values(&values, ..)?;
    }

    Ok(())
}

fn read_variable(var: &netcdf::Variable) -> Result<Variable, DatasetError> {
    let dims: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
    let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();

    let mut attributes = read_attributes(var.attributes());
    let packing = Packing::take_from(&mut attributes);

    let raw: Vec<f64> = var.get_values::<f64, _>(..)?;
    let values = raw.into_iter().map(|v| packing.unpack(v)).collect();

    Ok(Variable {
        dims,
        values: ArrayD::from_shape_vec(IxDyn(&shape), values)?,
        attributes,
    })
}

fn read_attributes<'a>(attributes: impl Iterator<Item = netcdf::Attribute<'a>>) -> Attributes {
    attributes
        .filter_map(|attr| {
            let value = attr.value().ok().and_then(from_netcdf)?;
            Some((attr.name().to_string(), value))
        })
        .collect()
}

#[derive(Debug, Default)]
struct Packing {
    fill_values: Vec<f64>,
    scale: Option<f64>,
    offset: Option<f64>,
}

impl Packing {
    fn take_from(attributes: &mut Attributes) -> Self {
        let mut packing = Packing::default();

        for name in PACKING_ATTRIBUTES {
            let Some(value) = attributes.remove(name) else {
                continue;
            };
            match name {
                "scale_factor" => packing.scale = value.as_number(),
                "add_offset" => packing.offset = value.as_number(),
                _ => match value {
                    AttrValue::Number(n) => packing.fill_values.push(n),
                    AttrValue::Numbers(ns) => packing.fill_values.extend(ns),
                    AttrValue::Text(_) => {}
                },
            }
        }

        packing
    }

    fn unpack(&self, raw: f64) -> f64 {
        let is_fill = self
            .fill_values
            .iter()
            .any(|f| *f == raw || (f.is_nan() && raw.is_nan()));
        if is_fill {
            return f64::NAN;
        }

        raw * self.scale.unwrap_or(1.0) + self.offset.unwrap_or(0.0)
    }
}

fn from_netcdf(value: AttributeValue) -> Option<AttrValue> {
    let value = match value {
        AttributeValue::Str(s) => AttrValue::Text(s),
        AttributeValue::Strs(ss) => AttrValue::Text(ss.join("\n")),
        AttributeValue::Double(n) => AttrValue::Number(n),
        AttributeValue::Float(n) => AttrValue::Number(n.into()),
        AttributeValue::Int(n) => AttrValue::Number(n.into()),
        AttributeValue::Short(n) => AttrValue::Number(n.into()),
        AttributeValue::Longlong(n) => AttrValue::Number(n as f64),
        AttributeValue::Doubles(ns) => AttrValue::Numbers(ns),
        AttributeValue::Floats(ns) => AttrValue::Numbers(ns.into_iter().map(f64::from).collect()),
        AttributeValue::Ints(ns) => AttrValue::Numbers(ns.into_iter().map(f64::from).collect()),
        AttributeValue::Shorts(ns) => AttrValue::Numbers(ns.into_iter().map(f64::from).collect()),
        _ => return None,
    };

    Some(value)
}

fn to_netcdf(value: &AttrValue) -> AttributeValue {
    match value {
        AttrValue::Text(s) => AttributeValue::Str(s.clone()),
        AttrValue::Number(n) => AttributeValue::Double(*n),
        AttrValue::Numbers(ns) => AttributeValue::Doubles(ns.clone()),
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use tempfile::TempDir;

    use super::*;
    use crate::testing::grid_dataset;

    #[test]
    fn should_write_and_read_back_variable_with_coordinates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("era5-temp-2020_01_01.nc");
        let mut dataset = grid_dataset("temp", 24, 1.0);
        dataset
            .attributes
            .insert("title".to_string(), AttrValue::from("hourly test"));

        write(&dataset, &path).unwrap();
        let read = NetcdfReader.open(&path, "temp").unwrap();

        let temp = read.variable("temp").unwrap();
        assert_eq!(temp.dims, vec!["time", "lat", "lon"]);
        assert_eq!(temp.values.shape(), &[24, 2, 3]);
        assert!(temp.values.iter().all(|v| *v == 1.0));
        assert_eq!(temp.attributes.get("units"), Some(&AttrValue::from("K")));

        let lat = read.coordinate("lat").unwrap();
        assert_eq!(lat.values.iter().copied().collect::<Vec<_>>(), vec![10.0, 20.0]);
        assert_eq!(read.attributes.get("title"), Some(&AttrValue::from("hourly test")));
    }

    #[test]
    fn should_return_dataset_without_missing_variable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("file.nc");
        write(&grid_dataset("temp", 2, 1.0), &path).unwrap();

        let read = NetcdfReader.open(&path, "precip").unwrap();

        assert!(read.variable("precip").is_none());
        assert!(read.variables.is_empty());
        assert_eq!(read.dimension_len("time"), Some(2));
    }

    #[test]
    fn should_unpack_scaled_values_and_mask_fill() {
        let mut attributes = Attributes::new();
        attributes.insert("scale_factor".into(), AttrValue::Number(0.5));
        attributes.insert("add_offset".into(), AttrValue::Number(10.0));
        attributes.insert("_FillValue".into(), AttrValue::Number(-32767.0));
        attributes.insert("units".into(), AttrValue::from("m"));

        let packing = Packing::take_from(&mut attributes);

        assert_eq!(packing.unpack(4.0), 12.0);
        assert!(packing.unpack(-32767.0).is_nan());
        assert_eq!(attributes.len(), 1);
        assert!(attributes.contains_key("units"));
    }

    #[test]
    fn should_round_trip_missing_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gaps.nc");
        let mut dataset = grid_dataset("temp", 2, 3.0);
        if let Some(temp) = dataset.variables.get_mut("temp") {
            temp.values[[0, 0, 0]] = f64::NAN;
        }

        write(&dataset, &path).unwrap();
        let temp = NetcdfReader.open(&path, "temp").unwrap().variables["temp"].clone();

        assert!(temp.values[[0, 0, 0]].is_nan());
        assert_eq!(temp.values[[1, 1, 2]], 3.0);
        assert!(!temp.attributes.contains_key("_FillValue"));
    }
}
