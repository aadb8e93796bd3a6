//! Collapsing one dimension of a variable with a summary statistic.

use std::{collections::BTreeMap, str::FromStr};

use ndarray::{ArrayView1, Axis};

use crate::{
    dataset::{Attributes, Dataset, Variable},
    error::SkipReason,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Statistics available for reducing a dimension. Missing (`NaN`) values are
/// ignored by all of them; `std` and `var` are sample statistics.
pub enum Statistic {
    Mean,
    Sum,
    Median,
    Min,
    Max,
    Std,
    Var,
    Count,
}

impl Statistic {
    pub const ALL: [Statistic; 8] = [
        Statistic::Mean,
        Statistic::Sum,
        Statistic::Median,
        Statistic::Min,
        Statistic::Max,
        Statistic::Std,
        Statistic::Var,
        Statistic::Count,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Statistic::Mean => "mean",
            Statistic::Sum => "sum",
            Statistic::Median => "median",
            Statistic::Min => "min",
            Statistic::Max => "max",
            Statistic::Std => "std",
            Statistic::Var => "var",
            Statistic::Count => "count",
        }
    }

    pub fn apply(self, lane: ArrayView1<f64>) -> f64 {
        let valid: Vec<f64> = lane.iter().copied().filter(|v| !v.is_nan()).collect();
        let n = valid.len();

        match self {
            Statistic::Count => n as f64,
            Statistic::Sum => valid.iter().sum(),
            Statistic::Mean => mean(&valid).unwrap_or(f64::NAN),
            Statistic::Min => valid.iter().copied().reduce(f64::min).unwrap_or(f64::NAN),
            Statistic::Max => valid.iter().copied().reduce(f64::max).unwrap_or(f64::NAN),
            Statistic::Median => median(valid),
            Statistic::Var => sample_variance(&valid),
            Statistic::Std => sample_variance(&valid).sqrt(),
        }
    }
}

impl FromStr for Statistic {
    type Err = SkipReason;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Statistic::ALL
            .into_iter()
            .find(|stat| stat.name() == s)
            .ok_or_else(|| SkipReason::UnknownStatistic(s.to_string()))
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn median(mut values: Vec<f64>) -> f64 {
    let n = values.len();
    if n == 0 {
        return f64::NAN;
    }

    values.sort_by(f64::total_cmp);
    if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    }
}

fn sample_variance(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return f64::NAN;
    }

    let m = values.iter().sum::<f64>() / n as f64;
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (n - 1) as f64
}

#[derive(Debug, Clone, PartialEq)]
/// One file's variable with the source dimension collapsed. Coordinates of the
/// remaining dimensions are kept as they were in the file.
pub struct ReducedSlice {
    pub data: Variable,
    pub coordinates: BTreeMap<String, Variable>,
}

pub fn reduce(
    dataset: &Dataset,
    variable: &str,
    dim: &str,
    statistic: Statistic,
) -> Result<ReducedSlice, SkipReason> {
    let var = dataset
        .variable(variable)
        .ok_or_else(|| SkipReason::MissingVariable(variable.to_string()))?;

    let axis = var.axis_of(dim).ok_or_else(|| SkipReason::MissingDimension {
        variable: variable.to_string(),
        dimension: dim.to_string(),
    })?;

    let values = var.values.map_axis(Axis(axis), |lane| statistic.apply(lane));
    let dims: Vec<String> = var.dims.iter().filter(|d| *d != dim).cloned().collect();

    let coordinates = dims
        .iter()
        .filter_map(|d| dataset.coordinate(d).map(|c| (d.clone(), c.clone())))
        .collect();

    Ok(ReducedSlice {
        data: Variable {
            dims,
            values,
            attributes: Attributes::new(),
        },
        coordinates,
    })
}

// -- Tests -------------------------------------------------------------------
