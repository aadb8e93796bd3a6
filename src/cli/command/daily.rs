use anyhow::Result;

use crate::{cli::DailyArgs, label::DAILY_DATE_FORMAT, pipeline::Outcome};

use super::{aggregate_config, run_aggregate};

pub const INPUT_TEMPLATE: &str = "{prefix}-{data_type}-{year}_{month}_*.nc";
pub const OUTPUT_TEMPLATE: &str = "{prefix}-{data_type}-{year}_{month}.nc";

/// Reduces one month of hourly files to a file with one step per day.
pub async fn daily(args: &DailyArgs) -> Result<Outcome> {
    let config = aggregate_config(
        &args.common,
        Some(&args.month),
        INPUT_TEMPLATE,
        OUTPUT_TEMPLATE,
        DAILY_DATE_FORMAT,
    );

    run_aggregate(config).await
}
