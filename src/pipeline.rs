//! The batch engine shared by aggregation and append.
//!
//! Files are opened and turned into [`Segment`]s on blocking tasks, at most
//! `jobs` at a time. Results are consumed in resolver order whatever order the
//! tasks finish in, so the combined time axis always follows the file list.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use futures::{stream, StreamExt};
use indicatif::ProgressBar;

use crate::{
    assemble::{
        propagate, AttributeSource, CarryThrough, CombinedDataset, Provenance, Segment,
        TimeSeriesAssembler, TimestampedSlice, TIME_DIM,
    },
    dataset::{nc, Attributes, Dataset, DatasetReader},
    error::{Error, Result, SkipReason},
    label::{DelimitedDate, LabelExtractor, DAILY_DATE_FORMAT},
    reduce::{reduce, Statistic},
    relocate::{relocate, stage, OverwritePolicy, Relocation},
    report::{Event, Reporter},
    resolve::{resolve_extension, resolve_glob},
};

/// Turns one opened file into a segment of the combined series.
pub trait FileStep: Send + Sync {
    fn variable(&self) -> &str;

    fn time_dim(&self) -> &str;

    fn carry(&self) -> CarryThrough;

    fn apply(&self, path: &Path, dataset: &Dataset) -> std::result::Result<Segment, SkipReason>;
}

/// Reduces `dim` with the named statistic and stamps the result with the date
/// in the file name.
pub struct Aggregate {
    pub variable: String,
    pub dim: String,
    pub method: String,
    pub labels: Box<dyn LabelExtractor>,
}

impl FileStep for Aggregate {
    fn variable(&self) -> &str {
        &self.variable
    }

    fn time_dim(&self) -> &str {
        TIME_DIM
    }

    fn carry(&self) -> CarryThrough {
        CarryThrough::Units
    }

    fn apply(&self, path: &Path, dataset: &Dataset) -> std::result::Result<Segment, SkipReason> {
        let statistic: Statistic = self.method.parse()?;
        let timestamp = self.labels.extract(path)?;
        let slice = reduce(dataset, &self.variable, &self.dim, statistic)?;

        Segment::from_slice(TimestampedSlice { timestamp, slice }, TIME_DIM)
    }
}

/// Takes the variable unchanged along its existing time axis.
pub struct Append {
    pub variable: String,
    pub time_dim: String,
}

impl FileStep for Append {
    fn variable(&self) -> &str {
        &self.variable
    }

    fn time_dim(&self) -> &str {
        &self.time_dim
    }

    fn carry(&self) -> CarryThrough {
        CarryThrough::All
    }

    fn apply(&self, _path: &Path, dataset: &Dataset) -> std::result::Result<Segment, SkipReason> {
        Segment::from_dataset(dataset, &self.variable, &self.time_dim)
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Shown when nothing matched.
    pub pattern: String,
    pub jobs: usize,
    pub attributes: AttributeSource,
}

#[derive(Debug)]
pub struct Batch {
    pub combined: CombinedDataset,
    pub included: usize,
    pub skipped: usize,
}

struct FileOutcome {
    path: PathBuf,
    attributes: Option<Attributes>,
    segment: std::result::Result<Segment, SkipReason>,
}

fn process(reader: &dyn DatasetReader, step: &dyn FileStep, path: PathBuf) -> Result<FileOutcome> {
    let dataset = reader
        .open(&path, step.variable())
        .map_err(|e| Error::Open(path.clone(), e))?;

    let attributes = dataset.variable(step.variable()).map(|v| v.attributes.clone());
    let segment = step.apply(&path, &dataset);

    Ok(FileOutcome {
        path,
        attributes,
        segment,
    })
}

/// Runs `step` over `paths` and concatenates the accepted segments.
pub async fn run(
    paths: Vec<PathBuf>,
    reader: Arc<dyn DatasetReader>,
    step: Arc<dyn FileStep>,
    options: &RunOptions,
    reporter: &dyn Reporter,
    progress: &ProgressBar,
) -> Result<Batch> {
    if paths.is_empty() {
        return Err(Error::NoFilesMatched {
            pattern: options.pattern.clone(),
        });
    }

    let total = paths.len();
    reporter.report(Event::Started { files: total });
    progress.set_length(total as u64);

    let mut assembler = TimeSeriesAssembler::new(step.variable(), step.time_dim());
    let mut provenance = Provenance::new(options.attributes);
    let mut included = 0;
    let mut skipped = 0;

    let mut outcomes = stream::iter(paths)
        .map(|path| {
            let reader = Arc::clone(&reader);
            let step = Arc::clone(&step);
            tokio::task::spawn_blocking(move || process(reader.as_ref(), step.as_ref(), path))
        })
        .buffered(options.jobs.max(1));

    while let Some(joined) = outcomes.next().await {
        let outcome = joined??;
        progress.inc(1);
        provenance.opened(outcome.attributes.as_ref());

        let accepted = outcome.segment.and_then(|segment| {
            let times = segment.times.clone();
            assembler.push(segment).map(|_| times)
        });

        match accepted {
            Ok(times) => {
                reporter.report(Event::Included {
                    path: &outcome.path,
                    times: &times,
                });
                provenance.included(outcome.attributes.as_ref());
                included += 1;
            }
            Err(reason) => {
                reporter.report(Event::Skipped {
                    path: &outcome.path,
                    reason: &reason,
                });
                skipped += 1;
            }
        }
    }
    progress.finish_with_message("Files combined");

    let mut combined = assembler.finish().ok_or(Error::AllInputsSkipped { total })?;
    propagate(&mut combined, provenance.reference(), step.carry());

    Ok(Batch {
        combined,
        included,
        skipped,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub relocation: Relocation,
    pub included: usize,
    pub skipped: usize,
}

/// Writes the batch to `staging_dir/output_name` and moves it into
/// `destination`.
async fn deliver(
    batch: Batch,
    staging_dir: &Path,
    output_name: &str,
    destination: &Path,
    policy: OverwritePolicy<'_>,
    reporter: &dyn Reporter,
) -> Result<Outcome> {
    let Batch {
        combined,
        included,
        skipped,
    } = batch;

    fs::create_dir_all(staging_dir)?;
    let staged_path = staging_dir.join(output_name);
    let staged = tokio::task::spawn_blocking(move || {
        let dataset = combined.into_dataset();
        stage(&staged_path, |path| nc::write(&dataset, path))
    })
    .await??;
    reporter.report(Event::Staged { path: &staged });

    let relocation = relocate(&staged, destination, policy)?;
    match &relocation {
        Relocation::Moved(to) => reporter.report(Event::Moved { from: &staged, to }),
        Relocation::Declined {
            staged,
            destination,
        } => reporter.report(Event::Declined {
            staged,
            destination,
        }),
    }
    reporter.report(Event::Finished { included, skipped });

    Ok(Outcome {
        relocation,
        included,
        skipped,
    })
}

fn report_failure<T>(result: Result<T>, reporter: &dyn Reporter) -> Result<T> {
    if let Err(error) = &result {
        reporter.report(Event::Failed { error });
    }
    result
}

#[derive(Debug, Clone)]
/// Settings of an aggregation batch: reduce each matching file in `source`
/// and write one combined file to `destination`.
pub struct AggregateConfig {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub pattern: String,
    pub output_name: String,
    pub variable: String,
    pub dimension: String,
    pub method: String,
    pub date_format: String,
    pub staging_dir: PathBuf,
    pub jobs: usize,
    pub attributes: AttributeSource,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        AggregateConfig {
            source: PathBuf::from("."),
            destination: PathBuf::from("."),
            pattern: "*.nc".to_string(),
            output_name: "combined.nc".to_string(),
            variable: String::new(),
            dimension: TIME_DIM.to_string(),
            method: Statistic::Sum.name().to_string(),
            date_format: DAILY_DATE_FORMAT.to_string(),
            staging_dir: PathBuf::from("."),
            jobs: 1,
            attributes: AttributeSource::default(),
        }
    }
}

impl AggregateConfig {
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>, variable: impl Into<String>) -> Self {
        AggregateConfig {
            source: source.into(),
            destination: destination.into(),
            variable: variable.into(),
            ..AggregateConfig::default()
        }
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }

    pub fn with_output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = name.into();
        self
    }

    /// The dimension collapsed in every file.
    pub fn with_dimension(mut self, dimension: impl Into<String>) -> Self {
        self.dimension = dimension.into();
        self
    }

    /// Statistic name. It is checked per file, so an unknown name skips
    /// every file.
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn with_date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = format.into();
        self
    }

    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = dir.into();
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    pub fn with_attributes(mut self, source: AttributeSource) -> Self {
        self.attributes = source;
        self
    }
}

/// Reduces and combines the files matching the configured pattern. The
/// destination file is replaced when it exists.
pub async fn aggregate(
    config: &AggregateConfig,
    reader: Arc<dyn DatasetReader>,
    reporter: &dyn Reporter,
    progress: &ProgressBar,
) -> Result<Outcome> {
    let result: Result<Outcome> = async {
        let paths = resolve_glob(&config.source, &config.pattern)?;
        let step = Aggregate {
            variable: config.variable.clone(),
            dim: config.dimension.clone(),
            method: config.method.clone(),
            labels: Box::new(DelimitedDate::new(&config.date_format)),
        };
        let options = RunOptions {
            pattern: config.source.join(&config.pattern).display().to_string(),
            jobs: config.jobs,
            attributes: config.attributes,
        };

        let batch = run(paths, reader, Arc::new(step), &options, reporter, progress).await?;

        deliver(
            batch,
            &config.staging_dir,
            &config.output_name,
            &config.destination,
            OverwritePolicy::Replace,
            reporter,
        )
        .await
    }
    .await;

    report_failure(result, reporter)
}

#[derive(Debug, Clone)]
/// Settings of an append batch: concatenate every `.nc` file in `directory`
/// along its time axis.
pub struct AppendConfig {
    pub directory: PathBuf,
    pub destination: PathBuf,
    pub output_name: String,
    pub variable: String,
    pub time_dim: String,
    pub staging_dir: PathBuf,
    pub jobs: usize,
    pub attributes: AttributeSource,
}

impl Default for AppendConfig {
    fn default() -> Self {
        AppendConfig {
            directory: PathBuf::from("."),
            destination: PathBuf::from("."),
            output_name: "combined.nc".to_string(),
            variable: String::new(),
            time_dim: TIME_DIM.to_string(),
            staging_dir: std::env::temp_dir(),
            jobs: 1,
            attributes: AttributeSource::FirstIncluded,
        }
    }
}

impl AppendConfig {
    pub fn new(
        directory: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
        output_name: impl Into<String>,
        variable: impl Into<String>,
    ) -> Self {
        AppendConfig {
            directory: directory.into(),
            destination: destination.into(),
            output_name: output_name.into(),
            variable: variable.into(),
            ..AppendConfig::default()
        }
    }

    pub fn with_time_dim(mut self, time_dim: impl Into<String>) -> Self {
        self.time_dim = time_dim.into();
        self
    }

    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = dir.into();
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }
}

pub const APPEND_EXTENSION: &str = ".nc";

/// Concatenates the `.nc` files of a directory. `policy` decides what happens
/// when the destination already exists.
pub async fn append(
    config: &AppendConfig,
    reader: Arc<dyn DatasetReader>,
    reporter: &dyn Reporter,
    progress: &ProgressBar,
    policy: OverwritePolicy<'_>,
) -> Result<Outcome> {
    let result: Result<Outcome> = async {
        let paths = resolve_extension(&config.directory, APPEND_EXTENSION)?;
        let step = Append {
            variable: config.variable.clone(),
            time_dim: config.time_dim.clone(),
        };
        let options = RunOptions {
            pattern: config
                .directory
                .join(format!("*{}", APPEND_EXTENSION))
                .display()
                .to_string(),
            jobs: config.jobs,
            attributes: config.attributes,
        };

        let batch = run(paths, reader, Arc::new(step), &options, reporter, progress).await?;

        deliver(
            batch,
            &config.staging_dir,
            &config.output_name,
            &config.destination,
            policy,
            reporter,
        )
        .await
    }
    .await;

    report_failure(result, reporter)
}

// -- Tests -------------------------------------------------------------------
