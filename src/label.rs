//! Timestamps derived from file names.

use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::SkipReason;

pub const DEFAULT_DELIMITER: char = '-';
pub const DAILY_DATE_FORMAT: &str = "%Y_%m_%d";
pub const MONTHLY_DATE_FORMAT: &str = "%Y_%m";

/// Maps an input file to the timestamp of the slice it contributes.
pub trait LabelExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<NaiveDateTime, SkipReason>;
}

impl<F> LabelExtractor for F
where
    F: Fn(&Path) -> Option<NaiveDateTime> + Send + Sync,
{
    fn extract(&self, path: &Path) -> Result<NaiveDateTime, SkipReason> {
        self(path).ok_or_else(|| SkipReason::UnparseableDate {
            token: path.display().to_string(),
            format: "custom label".to_string(),
        })
    }
}

#[derive(Debug, Clone)]
/// Parses the last `delimiter`-separated token of the file stem, e.g.
/// `2020_01_31` in `era5-temp-2020_01_31.nc`.
pub struct DelimitedDate {
    pub delimiter: char,
    pub format: String,
}

impl DelimitedDate {
    pub fn new(format: &str) -> Self {
        DelimitedDate {
            delimiter: DEFAULT_DELIMITER,
            format: format.to_string(),
        }
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    fn token<'a>(&self, path: &'a Path) -> &'a str {
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
        stem.rsplit(self.delimiter).next().unwrap_or(stem)
    }
}

impl Default for DelimitedDate {
    fn default() -> Self {
        DelimitedDate::new(DAILY_DATE_FORMAT)
    }
}

impl LabelExtractor for DelimitedDate {
    fn extract(&self, path: &Path) -> Result<NaiveDateTime, SkipReason> {
        let token = self.token(path);
        parse_timestamp(token, &self.format).ok_or_else(|| SkipReason::UnparseableDate {
            token: token.to_string(),
            format: self.format.clone(),
        })
    }
}

/// Parses `token` with a strftime `format`. Fields the format leaves out take
/// their earliest value: midnight, the first day, the first month.
pub fn parse_timestamp(token: &str, format: &str) -> Option<NaiveDateTime> {
    if let Ok(t) = NaiveDateTime::parse_from_str(token, format) {
        return Some(t);
    }

    let date = NaiveDate::parse_from_str(token, format)
        .or_else(|_| NaiveDate::parse_from_str(&format!("{token} 1"), &format!("{format} %d")))
        .or_else(|_| NaiveDate::parse_from_str(&format!("{token} 1 1"), &format!("{format} %m %d")))
        .ok()?;

    date.and_hms_opt(0, 0, 0)
}

// -- Tests -------------------------------------------------------------------
