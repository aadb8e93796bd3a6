//! Fixtures shared by the unit tests.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

use chrono::{NaiveDate, NaiveDateTime};
use ndarray::{ArrayD, IxDyn};

use crate::{
    dataset::{AttrValue, Dataset, DatasetReader, Variable},
    error::DatasetError,
    report::{Event, Reporter},
    time,
};

pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// A `time(steps) x lat(2) x lon(3)` dataset filled with `value`, hourly from
/// 2020-01-01.
pub(crate) fn grid_dataset(variable: &str, steps: usize, value: f64) -> Dataset {
    hourly_dataset(variable, date(2020, 1, 1), steps, value)
}

pub(crate) fn hourly_dataset(
    variable: &str,
    start: NaiveDateTime,
    steps: usize,
    value: f64,
) -> Dataset {
    let times: Vec<NaiveDateTime> = (0..steps)
        .map(|h| start + chrono::TimeDelta::hours(h as i64))
        .collect();
    let encoded = time::encode(&times);

    let mut dataset = Dataset::default();
    dataset.insert(
        "time",
        Variable::new(vec!["time".into()], ArrayD::from_shape_vec(IxDyn(&[steps]), encoded.values).unwrap())
            .with_attribute("units", encoded.units.as_str()),
    );
    dataset.insert(
        "lat",
        Variable::new(vec!["lat".into()], ArrayD::from_shape_vec(IxDyn(&[2]), vec![10.0, 20.0]).unwrap())
            .with_attribute("units", "degrees_north"),
    );
    dataset.insert(
        "lon",
        Variable::new(vec!["lon".into()], ArrayD::from_shape_vec(IxDyn(&[3]), vec![0.0, 0.25, 0.5]).unwrap())
            .with_attribute("units", "degrees_east"),
    );
    dataset.insert(
        variable,
        Variable::new(
            vec!["time".into(), "lat".into(), "lon".into()],
            ArrayD::from_elem(IxDyn(&[steps, 2, 3]), value),
        )
        .with_attribute("units", "K")
        .with_attribute("long_name", "2 metre temperature"),
    );

    dataset
}

pub(crate) fn with_units(mut dataset: Dataset, variable: &str, units: &str) -> Dataset {
    if let Some(var) = dataset.variables.get_mut(variable) {
        var.attributes
            .insert("units".to_string(), AttrValue::from(units));
    }
    dataset
}

/// Serves datasets from memory and remembers the order files were opened in.
#[derive(Default)]
pub(crate) struct MemoryReader {
    files: HashMap<PathBuf, Dataset>,
    pub(crate) opened: Mutex<Vec<PathBuf>>,
}

impl MemoryReader {
    pub(crate) fn with(mut self, path: &Path, dataset: Dataset) -> Self {
        self.files.insert(path.to_path_buf(), dataset);
        self
    }

    /// Registers `dataset` and creates an empty placeholder so the file
    /// resolves on disk.
    pub(crate) fn with_file(self, path: &Path, dataset: Dataset) -> Self {
        fs::write(path, b"").unwrap();
        self.with(path, dataset)
    }
}

impl DatasetReader for MemoryReader {
    fn open(&self, path: &Path, _variable: &str) -> Result<Dataset, DatasetError> {
        self.opened.lock().unwrap().push(path.to_path_buf());
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| DatasetError::VariableNotFound(path.display().to_string()))
    }
}

/// Keeps a one-line rendering of every event.
#[derive(Default)]
pub(crate) struct RecordingReporter {
    pub(crate) events: Mutex<Vec<String>>,
}

impl RecordingReporter {
    pub(crate) fn count(&self, kind: &str) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.starts_with(kind))
            .count()
    }

    pub(crate) fn lines(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl Reporter for RecordingReporter {
    fn report(&self, event: Event<'_>) {
        let line = match event {
            Event::Started { files } => format!("started {files}"),
            Event::Included { path, .. } => format!("included {}", path.display()),
            Event::Skipped { path, reason } => format!("skipped {}: {reason}", path.display()),
            Event::Failed { error } => format!("failed {error}"),
            Event::Staged { path } => format!("staged {}", path.display()),
            Event::Moved { to, .. } => format!("moved {}", to.display()),
            Event::Declined { destination, .. } => format!("declined {}", destination.display()),
            Event::Finished { included, skipped } => format!("finished {included} {skipped}"),
        };
        self.events.lock().unwrap().push(line);
    }
}

/// Replays canned answers and records the questions asked.
pub(crate) struct ScriptedPrompt {
    answers: std::collections::VecDeque<String>,
    pub(crate) asked: Vec<String>,
}

impl ScriptedPrompt {
    pub(crate) fn new(answers: &[&str]) -> Self {
        ScriptedPrompt {
            answers: answers.iter().map(|a| a.to_string()).collect(),
            asked: Vec::new(),
        }
    }
}

impl crate::relocate::Prompt for ScriptedPrompt {
    fn ask(&mut self, message: &str) -> std::io::Result<String> {
        self.asked.push(message.to_string());
        self.answers
            .pop_front()
            .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::UnexpectedEof))
    }
}
