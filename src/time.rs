//! CF-convention time axes: `<unit> since <reference>` offsets.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

const REFERENCE_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

pub const CALENDAR: &str = "proleptic_gregorian";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Days,
    Hours,
    Minutes,
    Seconds,
}

impl TimeUnit {
    fn seconds(self) -> i64 {
        match self {
            TimeUnit::Days => 86_400,
            TimeUnit::Hours => 3_600,
            TimeUnit::Minutes => 60,
            TimeUnit::Seconds => 1,
        }
    }

    fn name(self) -> &'static str {
        match self {
            TimeUnit::Days => "days",
            TimeUnit::Hours => "hours",
            TimeUnit::Minutes => "minutes",
            TimeUnit::Seconds => "seconds",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "day" | "days" => Some(TimeUnit::Days),
            "hour" | "hours" => Some(TimeUnit::Hours),
            "minute" | "minutes" => Some(TimeUnit::Minutes),
            "second" | "seconds" => Some(TimeUnit::Seconds),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EncodedTime {
    pub units: String,
    pub values: Vec<f64>,
}

/// Encodes `times` as offsets from the first timestamp, in the coarsest unit
/// that represents every offset exactly.
pub fn encode(times: &[NaiveDateTime]) -> EncodedTime {
    let Some(reference) = times.first().copied() else {
        return EncodedTime {
            units: format!("{} since 1970-01-01 00:00:00", TimeUnit::Days.name()),
            values: vec![],
        };
    };

    let offsets: Vec<i64> = times
        .iter()
        .map(|t| (*t - reference).num_seconds())
        .collect();

    let unit = [TimeUnit::Days, TimeUnit::Hours, TimeUnit::Minutes]
        .into_iter()
        .find(|u| offsets.iter().all(|o| o % u.seconds() == 0))
        .unwrap_or(TimeUnit::Seconds);

    EncodedTime {
        units: format!(
            "{} since {}",
            unit.name(),
            reference.format("%Y-%m-%d %H:%M:%S")
        ),
        values: offsets
            .iter()
            .map(|o| (*o / unit.seconds()) as f64)
            .collect(),
    }
}

/// Decodes offsets given CF `units`. Returns `None` when the units string is
/// not of the form `<unit> since <date>`.
pub fn decode(units: &str, values: &[f64]) -> Option<Vec<NaiveDateTime>> {
    let (unit, reference) = units.split_once(" since ")?;
    let unit = TimeUnit::parse(unit.trim())?;
    let reference = parse_reference(reference.trim())?;

    values
        .iter()
        .map(|v| {
            if !v.is_finite() {
                return None;
            }
            let millis = (v * unit.seconds() as f64 * 1000.0).round() as i64;
            reference.checked_add_signed(TimeDelta::milliseconds(millis))
        })
        .collect()
}

fn parse_reference(s: &str) -> Option<NaiveDateTime> {
    // Some producers append a zone designator; only UTC is meaningful here.
    let s = s.trim_end_matches(" UTC").trim_end_matches('Z');

    REFERENCE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn should_encode_daily_steps_in_days() {
        let times: Vec<_> = (1..=3).map(|d| at(2020, 1, d, 0)).collect();

        let encoded = encode(&times);

        assert_eq!(encoded.units, "days since 2020-01-01 00:00:00");
        assert_eq!(encoded.values, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn should_encode_hourly_steps_in_hours() {
        let times = vec![at(2020, 1, 1, 0), at(2020, 1, 1, 6), at(2020, 1, 2, 0)];

        let encoded = encode(&times);

        assert_eq!(encoded.units, "hours since 2020-01-01 00:00:00");
        assert_eq!(encoded.values, vec![0.0, 6.0, 24.0]);
    }

    #[test]
    fn should_decode_common_unit_spellings() {
        let times = decode("hours since 1900-01-01 00:00:00.0", &[1_051_896.0]).unwrap();
        assert_eq!(times, vec![at(2020, 1, 1, 0)]);

        let times = decode("hours since 2020-01-01", &[0.0, 1.5]).unwrap();
        assert_eq!(times[0], at(2020, 1, 1, 0));
        assert_eq!(times[1], at(2020, 1, 1, 1) + TimeDelta::minutes(30));

        let times = decode("Days since 2020-01-01T00:00:00Z", &[31.0]).unwrap();
        assert_eq!(times, vec![at(2020, 2, 1, 0)]);
    }

    #[test]
    fn should_reject_unknown_units() {
        assert_eq!(decode("fortnights since 2020-01-01", &[1.0]), None);
        assert_eq!(decode("days", &[1.0]), None);
        assert_eq!(decode("days since 2020-01-01", &[f64::NAN]), None);
    }

    #[test]
    fn should_round_trip_encoded_axis() {
        let times = vec![at(2020, 1, 1, 0), at(2020, 1, 1, 1), at(2020, 1, 1, 3)];

        let encoded = encode(&times);

        assert_eq!(decode(&encoded.units, &encoded.values), Some(times));
    }
}
