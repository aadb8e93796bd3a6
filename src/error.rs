//! Error taxonomy for a consolidation batch.
//!
//! Per-file problems are [`SkipReason`]s: the file is dropped and the batch
//! carries on. Everything in [`Error`] ends the batch.

use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
/// Why a single input file contributes nothing to the combined output.
pub enum SkipReason {
    #[error("no variable named '{0}'")]
    MissingVariable(String),

    #[error("variable '{variable}' has no dimension '{dimension}'")]
    MissingDimension { variable: String, dimension: String },

    #[error("aggregation method '{0}' not recognized")]
    UnknownStatistic(String),

    #[error("date token '{token}' does not match '{format}'")]
    UnparseableDate { token: String, format: String },

    #[error("time coordinate '{0}' is missing or has undecodable units")]
    UndecodableTime(String),

    #[error("grid {found:?} does not match {expected:?} of the first included file")]
    GridMismatch {
        expected: Vec<(String, usize)>,
        found: Vec<(String, usize)>,
    },

    #[error("slice already has a '{0}' dimension")]
    TimeDimensionClash(String),

    #[error("timestamp {0} is already in the combined series")]
    DuplicateTimestamp(chrono::NaiveDateTime),
}

#[derive(Debug, Error)]
/// Failures of the NetCDF codec.
pub enum DatasetError {
    #[error(transparent)]
    Netcdf(#[from] netcdf::Error),

    #[error("array shape does not match dimensions")]
    Shape(#[from] ndarray::ShapeError),

    #[error("dimension '{name}' has length {found} but {expected} was expected")]
    DimensionLength {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("variable '{0}' not found")]
    VariableNotFound(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("no files matched '{pattern}'")]
    NoFilesMatched { pattern: String },

    #[error("all {total} input files were skipped, nothing to combine")]
    AllInputsSkipped { total: usize },

    #[error("invalid file pattern")]
    Pattern(#[from] glob::PatternError),

    #[error("failed to open '{0}'")]
    Open(PathBuf, #[source] DatasetError),

    #[error("failed to write '{0}'")]
    Write(PathBuf, #[source] DatasetError),

    #[error("failed to move '{from}' to '{to}'")]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read overwrite confirmation")]
    Prompt(#[source] io::Error),

    #[error("background task failed to complete")]
    Task(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
