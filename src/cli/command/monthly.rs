use anyhow::Result;

use crate::{cli::MonthlyArgs, label::MONTHLY_DATE_FORMAT, pipeline::Outcome};

use super::{aggregate_config, run_aggregate};

pub const INPUT_TEMPLATE: &str = "{prefix}-{data_type}-{year}_*.nc";
pub const OUTPUT_TEMPLATE: &str = "{prefix}-{data_type}-{year}.nc";

/// Reduces one year of the daily command's outputs to a file with one step
/// per month.
pub async fn monthly(args: &MonthlyArgs) -> Result<Outcome> {
    let config = aggregate_config(
        &args.common,
        None,
        INPUT_TEMPLATE,
        OUTPUT_TEMPLATE,
        MONTHLY_DATE_FORMAT,
    );

    run_aggregate(config).await
}
