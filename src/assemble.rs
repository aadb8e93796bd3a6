//! Concatenating per-file slices into one time series.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDateTime;
use clap::ValueEnum;
use ndarray::{Array1, ArrayD, Axis, IxDyn};

use crate::{
    dataset::{AttrValue, Attributes, Dataset, Variable},
    error::SkipReason,
    reduce::ReducedSlice,
    time,
};

pub const TIME_DIM: &str = "time";

#[derive(Debug, Clone, PartialEq)]
/// A reduced slice and the timestamp of the file it came from. Both are
/// produced together and dropped together.
pub struct TimestampedSlice {
    pub timestamp: NaiveDateTime,
    pub slice: ReducedSlice,
}

#[derive(Debug, Clone, PartialEq)]
/// A run of time steps ready for concatenation: `data` has the time dimension
/// as its leading axis and `times` labels that axis.
pub struct Segment {
    pub times: Vec<NaiveDateTime>,
    pub data: Variable,
    pub coordinates: BTreeMap<String, Variable>,
}

impl Segment {
    /// Wraps a slice as a single step along a new `time_dim` axis.
    pub fn from_slice(slice: TimestampedSlice, time_dim: &str) -> Result<Self, SkipReason> {
        let TimestampedSlice { timestamp, slice } = slice;
        if slice.data.axis_of(time_dim).is_some() {
            return Err(SkipReason::TimeDimensionClash(time_dim.to_string()));
        }

        let mut dims = vec![time_dim.to_string()];
        dims.extend(slice.data.dims);

        Ok(Segment {
            times: vec![timestamp],
            data: Variable {
                dims,
                values: slice.data.values.insert_axis(Axis(0)),
                attributes: slice.data.attributes,
            },
            coordinates: slice.coordinates,
        })
    }

    /// Takes `variable` as-is from a dataset that already has a decodable
    /// `time_dim` coordinate.
    pub fn from_dataset(dataset: &Dataset, variable: &str, time_dim: &str) -> Result<Self, SkipReason> {
        let var = dataset
            .variable(variable)
            .ok_or_else(|| SkipReason::MissingVariable(variable.to_string()))?;
        let axis = var.axis_of(time_dim).ok_or_else(|| SkipReason::MissingDimension {
            variable: variable.to_string(),
            dimension: time_dim.to_string(),
        })?;

        let times = dataset
            .coordinate(time_dim)
            .and_then(|coord| {
                let units = coord.attributes.get("units")?.as_text()?;
                let offsets: Vec<f64> = coord.values.iter().copied().collect();
                time::decode(units, &offsets)
            })
            .ok_or_else(|| SkipReason::UndecodableTime(time_dim.to_string()))?;

        let mut order = vec![axis];
        order.extend((0..var.dims.len()).filter(|i| *i != axis));
        let dims = order.iter().map(|i| var.dims[*i].clone()).collect();

        let coordinates = var
            .dims
            .iter()
            .filter(|d| d.as_str() != time_dim)
            .filter_map(|d| dataset.coordinate(d).map(|c| (d.clone(), c.clone())))
            .collect();

        Ok(Segment {
            times,
            data: Variable {
                dims,
                values: var.values.clone().permuted_axes(IxDyn(&order)),
                attributes: var.attributes.clone(),
            },
            coordinates,
        })
    }

    fn grid(&self) -> Vec<(String, usize)> {
        self.data.shape().into_iter().skip(1).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CombinedDataset {
    pub variable: String,
    pub time_dim: String,
    pub times: Vec<NaiveDateTime>,
    pub data: Variable,
    pub coordinates: BTreeMap<String, Variable>,
}

impl CombinedDataset {
    /// Lays the series out as a dataset with a CF-encoded time coordinate.
    pub fn into_dataset(self) -> Dataset {
        let encoded = time::encode(&self.times);
        let time_values = Array1::from(encoded.values).into_dyn();

        let mut dataset = Dataset::default();
        dataset.insert(
            &self.time_dim,
            Variable::new(vec![self.time_dim.clone()], time_values)
                .with_attribute("units", encoded.units.as_str())
                .with_attribute("calendar", time::CALENDAR),
        );
        dataset.insert(&self.variable, self.data);
        for (name, coord) in self.coordinates {
            dataset.insert(&name, coord);
        }

        dataset
    }
}

/// Concatenates segments along the time dimension in the order they are
/// pushed. Timestamps are never re-sorted.
pub struct TimeSeriesAssembler {
    variable: String,
    time_dim: String,
    times: Vec<NaiveDateTime>,
    seen: BTreeSet<NaiveDateTime>,
    values: Vec<f64>,
    grid: Option<Vec<(String, usize)>>,
    coordinates: BTreeMap<String, Variable>,
}

impl TimeSeriesAssembler {
    pub fn new(variable: &str, time_dim: &str) -> Self {
        TimeSeriesAssembler {
            variable: variable.to_string(),
            time_dim: time_dim.to_string(),
            times: Vec::new(),
            seen: BTreeSet::new(),
            values: Vec::new(),
            grid: None,
            coordinates: BTreeMap::new(),
        }
    }

    /// Appends a segment, or rejects it whole when its grid differs from the
    /// first accepted segment's or when it repeats a timestamp.
    pub fn push(&mut self, segment: Segment) -> Result<(), SkipReason> {
        if segment.data.dims.iter().skip(1).any(|d| *d == self.time_dim) {
            return Err(SkipReason::TimeDimensionClash(self.time_dim.clone()));
        }

        let mut incoming = BTreeSet::new();
        if let Some(t) = segment
            .times
            .iter()
            .find(|t| self.seen.contains(*t) || !incoming.insert(**t))
        {
            return Err(SkipReason::DuplicateTimestamp(*t));
        }

        let grid = segment.grid();
        match &self.grid {
            Some(expected) if *expected != grid => {
                return Err(SkipReason::GridMismatch {
                    expected: expected.clone(),
                    found: grid,
                });
            }
            Some(_) => {}
            None => {
                self.grid = Some(grid);
                self.coordinates = segment.coordinates;
            }
        }

        self.seen.extend(incoming);
        self.times.extend(segment.times);
        self.values.extend(segment.data.values.iter().copied());

        Ok(())
    }

    /// `None` when nothing was accepted.
    pub fn finish(self) -> Option<CombinedDataset> {
        let grid = self.grid?;

        let mut dims = vec![self.time_dim.clone()];
        let mut shape = vec![self.times.len()];
        for (dim, len) in grid {
            dims.push(dim);
            shape.push(len);
        }

        let values = ArrayD::from_shape_vec(IxDyn(&shape), self.values).ok()?;

        Some(CombinedDataset {
            variable: self.variable,
            time_dim: self.time_dim,
            times: self.times,
            data: Variable::new(dims, values),
            coordinates: self.coordinates,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
/// Which input file's variable attributes end up on the output.
pub enum AttributeSource {
    /// The file opened last, even when it was then skipped.
    #[default]
    LastOpened,
    /// The file whose slice was included last.
    LastIncluded,
    /// The file whose slice was included first.
    FirstIncluded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CarryThrough {
    /// Only `units`, and only when the reference has it.
    #[default]
    Units,
    All,
}

/// Tracks the reference attributes as files are opened and included.
#[derive(Debug, Default)]
pub struct Provenance {
    source: AttributeSource,
    reference: Option<Attributes>,
    included: usize,
}

impl Provenance {
    pub fn new(source: AttributeSource) -> Self {
        Provenance {
            source,
            ..Provenance::default()
        }
    }

    /// `attributes` is `None` when the opened file lacks the variable.
    pub fn opened(&mut self, attributes: Option<&Attributes>) {
        if self.source == AttributeSource::LastOpened {
            self.reference = attributes.cloned();
        }
    }

    pub fn included(&mut self, attributes: Option<&Attributes>) {
        match self.source {
            AttributeSource::LastIncluded => self.reference = attributes.cloned(),
            AttributeSource::FirstIncluded if self.included == 0 => {
                self.reference = attributes.cloned()
            }
            _ => {}
        }
        self.included += 1;
    }

    pub fn reference(&self) -> Option<&Attributes> {
        self.reference.as_ref()
    }
}

/// Copies attributes from `reference` onto the combined variable. Nothing is
/// invented when the reference lacks them.
pub fn propagate(combined: &mut CombinedDataset, reference: Option<&Attributes>, carry: CarryThrough) {
    let Some(reference) = reference else {
        return;
    };

    let copied: Vec<(&String, &AttrValue)> = match carry {
        CarryThrough::Units => reference.iter().filter(|(k, _)| *k == "units").collect(),
        CarryThrough::All => reference.iter().collect(),
    };
    for (name, value) in copied {
        combined.data.attributes.insert(name.clone(), value.clone());
    }
}

// -- Tests -------------------------------------------------------------------
