pub mod append;
pub mod daily;
pub mod monthly;

use std::sync::Arc;

use anyhow::{Context, Result};

pub use append::append;
pub use daily::daily;
pub use monthly::monthly;

use crate::{
    cli::{create_progress_bar, AggregateArgs},
    dataset::NetcdfReader,
    pipeline::{self, AggregateConfig, Outcome},
    report::TracingReporter,
};

/// Values substituted into file name templates.
#[derive(Debug, Clone, Copy)]
pub struct Placeholders<'a> {
    pub prefix: &'a str,
    pub data_type: &'a str,
    pub year: &'a str,
    pub month: Option<&'a str>,
}

impl<'a> Placeholders<'a> {
    pub fn from_args(args: &'a AggregateArgs, month: Option<&'a str>) -> Self {
        Placeholders {
            prefix: &args.prefix,
            data_type: &args.data_type,
            year: &args.year,
            month,
        }
    }
}

/// Replaces `{prefix}`, `{data_type}`, `{year}` and `{month}` in `template`.
/// Values are inserted literally; unknown placeholders are left alone.
pub fn render(template: &str, values: &Placeholders) -> String {
    let mut rendered = template
        .replace("{prefix}", values.prefix)
        .replace("{data_type}", values.data_type)
        .replace("{year}", values.year);
    if let Some(month) = values.month {
        rendered = rendered.replace("{month}", month);
    }

    rendered
}

/// Builds the batch settings from the shared arguments, falling back to the
/// command's own templates and date format.
fn aggregate_config(
    args: &AggregateArgs,
    month: Option<&str>,
    input_template: &str,
    output_template: &str,
    date_format: &str,
) -> AggregateConfig {
    let values = Placeholders::from_args(args, month);
    let pattern = render(args.pattern.as_deref().unwrap_or(input_template), &values);
    let output = render(args.output_pattern.as_deref().unwrap_or(output_template), &values);

    AggregateConfig::new(&args.source, &args.destination, &args.variable)
        .with_pattern(pattern)
        .with_output_name(output)
        .with_dimension(&args.dimension)
        .with_method(&args.method)
        .with_date_format(args.date_format.as_deref().unwrap_or(date_format))
        .with_staging_dir(&args.staging_dir)
        .with_jobs(args.jobs)
        .with_attributes(args.attributes_from)
}

async fn run_aggregate(config: AggregateConfig) -> Result<Outcome> {
    let bar = create_progress_bar(0, "Combining files...".to_string());

    let outcome = pipeline::aggregate(&config, Arc::new(NetcdfReader), &TracingReporter, &bar)
        .await
        .with_context(|| format!("Failed to build {}", config.output_name))?;

    Ok(outcome)
}

// -- Tests -------------------------------------------------------------------
