use std::sync::Arc;

use anyhow::{Context, Result};

use crate::{
    cli::{create_progress_bar, AppendArgs},
    dataset::NetcdfReader,
    pipeline::{self, AppendConfig, Outcome},
    relocate::{AssumeYes, OverwritePolicy, StdinPrompt},
    report::TracingReporter,
};

fn append_config(args: &AppendArgs) -> AppendConfig {
    let config = AppendConfig::new(&args.directory, &args.destination, &args.output, &args.variable)
        .with_time_dim(&args.time_dimension)
        .with_jobs(args.jobs);

    match &args.staging_dir {
        Some(dir) => config.with_staging_dir(dir),
        None => config,
    }
}

/// Concatenates a directory of files, asking before an existing destination
/// file is replaced unless `--yes` was given.
pub async fn append(args: &AppendArgs) -> Result<Outcome> {
    let config = append_config(args);
    let bar = create_progress_bar(0, "Appending files...".to_string());

    let mut assume_yes = AssumeYes;
    let mut stdin = StdinPrompt;
    let policy = if args.yes {
        OverwritePolicy::Confirm(&mut assume_yes)
    } else {
        OverwritePolicy::Confirm(&mut stdin)
    };

    let outcome = pipeline::append(&config, Arc::new(NetcdfReader), &TracingReporter, &bar, policy)
        .await
        .with_context(|| format!("Failed to build {}", config.output_name))?;

    Ok(outcome)
}

// -- Tests -------------------------------------------------------------------
