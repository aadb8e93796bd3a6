//! Batch events and where they go.

use std::path::Path;

use chrono::NaiveDateTime;
use tracing::{debug, info, warn};

use crate::error::{Error, SkipReason};

#[derive(Debug)]
pub enum Event<'a> {
    Started { files: usize },
    Included { path: &'a Path, times: &'a [NaiveDateTime] },
    Skipped { path: &'a Path, reason: &'a SkipReason },
    Failed { error: &'a Error },
    Staged { path: &'a Path },
    Moved { from: &'a Path, to: &'a Path },
    Declined { staged: &'a Path, destination: &'a Path },
    Finished { included: usize, skipped: usize },
}

/// Receives every event of a batch run, in order. A run starts with
/// [`Event::Started`] and ends with [`Event::Finished`] or [`Event::Failed`].
pub trait Reporter: Send + Sync {
    fn report(&self, event: Event<'_>);
}

#[derive(Debug, Clone, Copy, Default)]
/// Forwards events to `tracing`.
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, event: Event<'_>) {
        match event {
            Event::Started { files } => info!("Combining {} files", files),
            Event::Included { path, times } => match times {
                [t] => debug!("Included {} at {}", path.display(), t),
                _ => debug!("Included {} ({} steps)", path.display(), times.len()),
            },
            Event::Skipped { path, reason } => warn!("{}: {}. Skipping.", path.display(), reason),
            // The caller prints fatal errors with their context.
            Event::Failed { error } => debug!("Batch failed: {:?}", error),
            Event::Staged { path } => info!("Combined data saved to {}", path.display()),
            Event::Moved { from, to } => info!("File moved from {} to {}", from.display(), to.display()),
            Event::Declined { staged, destination } => warn!(
                "File not moved: {} already exists, combined data left at {}",
                destination.display(),
                staged.display()
            ),
            Event::Finished { included, skipped } => {
                info!("Finished: {} files included, {} skipped", included, skipped)
            }
        }
    }
}

// -- Tests -------------------------------------------------------------------
