//! Decode a raw time variable into comparable instants.
//!
//! Accepted encodings:
//!
//! - already-decoded instants ([`VarData::Instant`]), passed through;
//! - numeric offsets with a CF `units` attribute such as
//!   `"days since 1950-01-01 00:00:00 UTC"`, optionally qualified by a
//!   `calendar` attribute;
//! - timestamp strings (RFC 3339 or `YYYY-MM-DD[ HH:MM[:SS[.f]]]`).
//!
//! Anything else is reported as [`Decoded::Undecodable`]. Numbers without
//! units are never decoded under an assumed epoch.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Utc};
use thiserror::Error;

use crate::dataset::{Dataset, Instant, VarData, Variable};

/// Why a time variable could not be turned into instants. Not fatal: the
/// run continues without filtering and with the fallback file name.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeFailure {
    #[error("variable '{0}' not found")]
    NoSuchVariable(String),

    #[error("numeric time values carry no 'units' attribute")]
    MissingUnits,

    #[error("unsupported time units: '{0}'")]
    UnsupportedUnits(String),

    #[error("unsupported calendar: '{0}'")]
    UnsupportedCalendar(String),

    #[error("value {index} is not a timestamp: '{value}'")]
    UnparseableText { index: usize, value: String },

    #[error("{0} values cannot be read as time offsets")]
    NotNumeric(&'static str),
}

/// Years an instant must fall in to be usable. Outside this range `%Y`
/// no longer prints four digits.
const YEARS: std::ops::RangeInclusive<i32> = 1..=9999;

fn in_calendar_range(t: Instant) -> Option<Instant> {
    YEARS.contains(&t.year()).then_some(t)
}

/// Decoded time values laid out like the source variable.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeAxis {
    /// Name of the variable the instants came from.
    pub field: String,
    pub dims: Vec<String>,
    pub shape: Vec<usize>,
    /// Row-major, one entry per element. `None` is a missing value.
    pub values: Vec<Option<Instant>>,
}

impl TimeAxis {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over the instants that are present.
    pub fn present(&self) -> impl Iterator<Item = Instant> + '_ {
        self.values.iter().filter_map(|v| *v)
    }
}

/// Outcome of [`decode_time_field`].
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Instants(TimeAxis),
    Undecodable(DecodeFailure),
}

// ── CF units ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Microseconds,
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
    Weeks,
}

impl TimeUnit {
    fn parse(s: &str) -> Option<Self> {
        let unit = match s.trim().to_lowercase().as_str() {
            "microseconds" | "microsecond" | "us" => TimeUnit::Microseconds,
            "milliseconds" | "millisecond" | "ms" => TimeUnit::Milliseconds,
            "seconds" | "second" | "secs" | "sec" | "s" => TimeUnit::Seconds,
            "minutes" | "minute" | "mins" | "min" => TimeUnit::Minutes,
            "hours" | "hour" | "hrs" | "hr" | "h" => TimeUnit::Hours,
            "days" | "day" | "d" => TimeUnit::Days,
            "weeks" | "week" => TimeUnit::Weeks,
            _ => return None,
        };
        Some(unit)
    }

    fn micros(self) -> f64 {
        match self {
            TimeUnit::Microseconds => 1.0,
            TimeUnit::Milliseconds => 1e3,
            TimeUnit::Seconds => 1e6,
            TimeUnit::Minutes => 60e6,
            TimeUnit::Hours => 3_600e6,
            TimeUnit::Days => 86_400e6,
            TimeUnit::Weeks => 604_800e6,
        }
    }
}

/// A parsed `"<unit> since <epoch>"` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeUnits {
    pub unit: TimeUnit,
    pub epoch: Instant,
}

impl TimeUnits {
    /// Instant for one offset. Non-finite offsets and offsets landing
    /// outside years 1 to 9999 yield `None`.
    pub fn instant_at(&self, offset: f64) -> Option<Instant> {
        if !offset.is_finite() {
            return None;
        }
        let micros = (offset * self.unit.micros()).round();
        if micros.abs() >= i64::MAX as f64 {
            return None;
        }
        self.epoch
            .checked_add_signed(TimeDelta::microseconds(micros as i64))
            .and_then(in_calendar_range)
    }
}

/// Parse CF time units, e.g. `"days since 1950-01-01 00:00:00 UTC"`.
pub fn parse_time_units(units: &str) -> Result<TimeUnits, DecodeFailure> {
    let unsupported = || DecodeFailure::UnsupportedUnits(units.to_string());

    let (unit, epoch) = units.split_once(" since ").ok_or_else(unsupported)?;
    let unit = TimeUnit::parse(unit).ok_or_else(unsupported)?;
    let epoch = parse_timestamp(epoch).ok_or_else(unsupported)?;
    Ok(TimeUnits { unit, epoch })
}

/// Parse a timestamp string as UTC.
///
/// Accepts RFC 3339, or `YYYY-MM-DD` optionally followed by a ` `/`T`
/// separated `HH:MM`, `HH:MM:SS` or `HH:MM:SS.f`, with an optional trailing
/// `Z` or `UTC`.
pub fn parse_timestamp(s: &str) -> Option<Instant> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    let bare = s
        .strip_suffix("UTC")
        .or_else(|| s.strip_suffix('Z'))
        .unwrap_or(s)
        .trim_end();

    const FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    for fmt in FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(bare, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    NaiveDate::parse_from_str(bare, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn check_calendar(variable: &Variable) -> Result<(), DecodeFailure> {
    let Some(calendar) = variable.attr("calendar").and_then(|a| a.as_text()) else {
        return Ok(());
    };
    match calendar.trim().to_lowercase().as_str() {
        "standard" | "gregorian" | "proleptic_gregorian" => Ok(()),
        _ => Err(DecodeFailure::UnsupportedCalendar(calendar.to_string())),
    }
}

// ── decode ──────────────────────────────────────────────────────────────────

/// Decode the named variable of `dataset`.
///
/// The dataset is not modified; the caller gets a separate [`TimeAxis`].
pub fn decode_time_field(dataset: &Dataset, field: &str) -> Decoded {
    let Some(variable) = dataset.variable(field) else {
        return Decoded::Undecodable(DecodeFailure::NoSuchVariable(field.to_string()));
    };
    let shape = match dataset.shape_of(&variable.dims) {
        Ok(shape) => shape,
        Err(_) => return Decoded::Undecodable(DecodeFailure::NoSuchVariable(field.to_string())),
    };
    match decode_values(variable) {
        Ok(values) => Decoded::Instants(TimeAxis {
            field: variable.name.clone(),
            dims: variable.dims.clone(),
            shape,
            values,
        }),
        Err(failure) => Decoded::Undecodable(failure),
    }
}

fn decode_values(variable: &Variable) -> Result<Vec<Option<Instant>>, DecodeFailure> {
    match &variable.data {
        VarData::Instant(values) => Ok(values
            .iter()
            .map(|v| v.and_then(in_calendar_range))
            .collect()),
        VarData::Text(values) => decode_text(values),
        VarData::F64(_) | VarData::F32(_) | VarData::I32(_) | VarData::I64(_) => {
            decode_offsets(variable)
        }
    }
}

fn decode_offsets(variable: &Variable) -> Result<Vec<Option<Instant>>, DecodeFailure> {
    let Some(offsets) = variable.data.to_f64() else {
        return Err(DecodeFailure::NotNumeric(variable.data.kind()));
    };
    let units = variable
        .attr("units")
        .and_then(|a| a.as_text())
        .ok_or(DecodeFailure::MissingUnits)?;
    let units = parse_time_units(units)?;
    check_calendar(variable)?;

    let fills: Vec<f64> = ["_FillValue", "missing_value"]
        .iter()
        .filter_map(|key| variable.attr(key).and_then(|a| a.as_f64()))
        .collect();

    let decoded = offsets
        .into_iter()
        .map(|v| {
            if fills.contains(&v) {
                None
            } else {
                units.instant_at(v)
            }
        })
        .collect::<Vec<_>>();

    let missing = decoded.iter().filter(|v| v.is_none()).count();
    if missing > 0 {
        log::debug!(
            "'{}': {missing} of {} values are missing after decoding",
            variable.name,
            decoded.len()
        );
    }
    Ok(decoded)
}

fn decode_text(values: &[String]) -> Result<Vec<Option<Instant>>, DecodeFailure> {
    values
        .iter()
        .enumerate()
        .map(|(index, raw)| {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            parse_timestamp(trimmed)
                .map(in_calendar_range)
                .ok_or_else(|| DecodeFailure::UnparseableText {
                    index,
                    value: raw.clone(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::AttrValue;
    use proptest::prelude::*;

    fn utc(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> Instant {
        Utc.with_ymd_and_hms(y, m, d, h, mi, s).unwrap()
    }

    fn single(var: Variable) -> Dataset {
        let mut ds = Dataset::new();
        ds.add_dimension("N_PROF", var.data.len()).unwrap();
        ds.add_variable(var).unwrap();
        ds
    }

    fn juld(values: Vec<f64>) -> Variable {
        Variable::new("JULD", &["N_PROF"], VarData::F64(values))
            .with_attr("units", "days since 1950-01-01 00:00:00 UTC")
            .with_attr("_FillValue", 999999.0)
    }

    fn instants(decoded: Decoded) -> Vec<Option<Instant>> {
        match decoded {
            Decoded::Instants(axis) => axis.values,
            Decoded::Undecodable(f) => panic!("expected instants, got {f}"),
        }
    }

    fn failure(decoded: Decoded) -> DecodeFailure {
        match decoded {
            Decoded::Undecodable(f) => f,
            Decoded::Instants(axis) => panic!("expected failure, got {:?}", axis.values),
        }
    }

    // ── units parsing ───────────────────────────────────────────────────

    #[test]
    fn test_parse_argo_juld_units() {
        let units = parse_time_units("days since 1950-01-01 00:00:00 UTC").unwrap();
        assert_eq!(units.unit, TimeUnit::Days);
        assert_eq!(units.epoch, utc(1950, 1, 1, 0, 0, 0));
    }

    #[test]
    fn test_parse_erddap_units() {
        let units = parse_time_units("seconds since 1970-01-01T00:00:00Z").unwrap();
        assert_eq!(units.unit, TimeUnit::Seconds);
        assert_eq!(units.epoch, utc(1970, 1, 1, 0, 0, 0));
    }

    #[test]
    fn test_parse_date_only_epoch() {
        let units = parse_time_units("Hours since 2000-01-01").unwrap();
        assert_eq!(units.unit, TimeUnit::Hours);
        assert_eq!(units.epoch, utc(2000, 1, 1, 0, 0, 0));
    }

    #[test]
    fn test_parse_units_rejects_garbage() {
        for bad in ["days", "UTC", "fortnights since 1950-01-01", "days since yesterday"] {
            assert!(
                matches!(parse_time_units(bad), Err(DecodeFailure::UnsupportedUnits(_))),
                "accepted: {bad}"
            );
        }
    }

    #[test]
    fn test_parse_timestamp_variants() {
        let expected = utc(2025, 12, 4, 10, 30, 0);
        for s in [
            "2025-12-04T10:30:00Z",
            "2025-12-04T10:30:00+00:00",
            "2025-12-04 10:30:00",
            "2025-12-04 10:30:00 UTC",
            "2025-12-04T10:30",
            "2025-12-04 10:30",
        ] {
            assert_eq!(parse_timestamp(s), Some(expected), "input: {s}");
        }
        assert_eq!(parse_timestamp("2025-12-04"), Some(utc(2025, 12, 4, 0, 0, 0)));
        assert_eq!(parse_timestamp("04/12/2025"), None);
    }

    #[test]
    fn test_parse_timestamp_fractional_seconds() {
        let dt = parse_timestamp("2025-12-04 10:30:00.5").unwrap();
        assert_eq!(dt.timestamp_subsec_millis(), 500);
    }

    // ── decode ──────────────────────────────────────────────────────────

    #[test]
    fn test_decode_juld_days() {
        let ds = single(juld(vec![20072.25, 27731.0]));
        let values = instants(decode_time_field(&ds, "JULD"));
        assert_eq!(
            values,
            vec![Some(utc(2004, 12, 15, 6, 0, 0)), Some(utc(2025, 12, 4, 0, 0, 0))]
        );
    }

    #[test]
    fn test_decode_keeps_layout() {
        let ds = single(juld(vec![0.0, 1.0, 2.0]));
        match decode_time_field(&ds, "JULD") {
            Decoded::Instants(axis) => {
                assert_eq!(axis.field, "JULD");
                assert_eq!(axis.dims, vec!["N_PROF".to_string()]);
                assert_eq!(axis.shape, vec![3]);
            }
            Decoded::Undecodable(f) => panic!("{f}"),
        }
    }

    #[test]
    fn test_decode_fill_and_nan_are_missing() {
        let ds = single(juld(vec![999999.0, f64::NAN, 1.0]));
        let values = instants(decode_time_field(&ds, "JULD"));
        assert_eq!(values, vec![None, None, Some(utc(1950, 1, 2, 0, 0, 0))]);
    }

    #[test]
    fn test_decode_missing_value_attribute() {
        let var = Variable::new("time", &["N_PROF"], VarData::I64(vec![-1, 60]))
            .with_attr("units", "minutes since 2020-01-01")
            .with_attr("missing_value", AttrValue::Int(-1));
        let values = instants(decode_time_field(&single(var), "time"));
        assert_eq!(values, vec![None, Some(utc(2020, 1, 1, 1, 0, 0))]);
    }

    #[test]
    fn test_decode_out_of_range_offset_is_missing() {
        let var = Variable::new("TIME", &["N_PROF"], VarData::F64(vec![1e300, 0.0]))
            .with_attr("units", "days since 1950-01-01");
        let values = instants(decode_time_field(&single(var), "TIME"));
        assert_eq!(values, vec![None, Some(utc(1950, 1, 1, 0, 0, 0))]);
    }

    #[test]
    fn test_decode_beyond_year_9999_is_missing() {
        // 3 000 000 days after 1950 is past year 10 000
        let ds = single(juld(vec![20072.0, 3_000_000.0, -1_000_000.0]));
        let values = instants(decode_time_field(&ds, "JULD"));
        assert_eq!(values, vec![Some(utc(2004, 12, 15, 0, 0, 0)), None, None]);

        let far = Utc.with_ymd_and_hms(10_000, 1, 1, 0, 0, 0).unwrap();
        let var = Variable::new("time", &["N_PROF"], VarData::Instant(vec![Some(far)]));
        assert_eq!(instants(decode_time_field(&single(var), "time")), vec![None]);
    }

    #[test]
    fn test_offsets_require_numeric_data() {
        let var = Variable::new("TIME", &["N_PROF"], VarData::Text(vec!["1".to_string()]))
            .with_attr("units", "days since 1950-01-01");
        assert_eq!(
            decode_offsets(&var),
            Err(DecodeFailure::NotNumeric("text"))
        );
    }

    #[test]
    fn test_decode_f32_and_i32() {
        let var = Variable::new("TIME", &["N_PROF"], VarData::F32(vec![0.5]))
            .with_attr("units", "days since 1950-01-01");
        assert_eq!(
            instants(decode_time_field(&single(var), "TIME")),
            vec![Some(utc(1950, 1, 1, 12, 0, 0))]
        );

        let var = Variable::new("TIME", &["N_PROF"], VarData::I32(vec![3600]))
            .with_attr("units", "seconds since 1970-01-01T00:00:00Z");
        assert_eq!(
            instants(decode_time_field(&single(var), "TIME")),
            vec![Some(utc(1970, 1, 1, 1, 0, 0))]
        );
    }

    #[test]
    fn test_decode_bare_integers_are_undecodable() {
        let var = Variable::new("TIME", &["N_PROF"], VarData::I64(vec![20072, 27731]));
        assert_eq!(
            failure(decode_time_field(&single(var), "TIME")),
            DecodeFailure::MissingUnits
        );
    }

    #[test]
    fn test_decode_unsupported_calendar() {
        let var = juld(vec![1.0]).with_attr("calendar", "360_day");
        assert_eq!(
            failure(decode_time_field(&single(var), "JULD")),
            DecodeFailure::UnsupportedCalendar("360_day".to_string())
        );

        let var = juld(vec![1.0]).with_attr("calendar", "Gregorian");
        assert!(matches!(
            decode_time_field(&single(var), "JULD"),
            Decoded::Instants(_)
        ));
    }

    #[test]
    fn test_decode_text_timestamps() {
        let var = Variable::new(
            "TIME",
            &["N_PROF"],
            VarData::Text(vec![
                "2004-12-15T10:02:00Z".to_string(),
                "".to_string(),
                "2025-12-04T00:00:00Z".to_string(),
            ]),
        )
        .with_attr("units", "UTC");
        let values = instants(decode_time_field(&single(var), "TIME"));
        assert_eq!(
            values,
            vec![
                Some(utc(2004, 12, 15, 10, 2, 0)),
                None,
                Some(utc(2025, 12, 4, 0, 0, 0))
            ]
        );
    }

    #[test]
    fn test_decode_text_with_garbage_is_undecodable() {
        let var = Variable::new(
            "TIME",
            &["N_PROF"],
            VarData::Text(vec!["2004-12-15".to_string(), "cycle 12".to_string()]),
        );
        assert_eq!(
            failure(decode_time_field(&single(var), "TIME")),
            DecodeFailure::UnparseableText {
                index: 1,
                value: "cycle 12".to_string()
            }
        );
    }

    #[test]
    fn test_decode_instants_pass_through() {
        let raw = vec![Some(utc(2020, 5, 1, 0, 0, 0)), None];
        let var = Variable::new("time", &["N_PROF"], VarData::Instant(raw.clone()));
        assert_eq!(instants(decode_time_field(&single(var), "time")), raw);
    }

    #[test]
    fn test_decode_unknown_variable() {
        assert_eq!(
            failure(decode_time_field(&Dataset::new(), "TIME")),
            DecodeFailure::NoSuchVariable("TIME".to_string())
        );
    }

    #[test]
    fn test_decode_does_not_touch_dataset() {
        let ds = single(juld(vec![1.0, 2.0]));
        let before = ds.clone();
        let _ = decode_time_field(&ds, "JULD");
        assert_eq!(ds, before);
    }

    proptest! {
        #[test]
        fn prop_decode_preserves_order(
            mut offsets in proptest::collection::vec(-40_000.0f64..40_000.0, 0..64),
            unit in prop_oneof![
                Just("seconds"), Just("minutes"), Just("hours"), Just("days")
            ],
        ) {
            offsets.sort_by(f64::total_cmp);
            let var = Variable::new("TIME", &["N_PROF"], VarData::F64(offsets.clone()))
                .with_attr("units", format!("{unit} since 1950-01-01 00:00:00"));
            let values = instants(decode_time_field(&single(var), "TIME"));

            prop_assert_eq!(values.len(), offsets.len());
            let decoded: Vec<Instant> = values.into_iter().map(|v| v.unwrap()).collect();
            for pair in decoded.windows(2) {
                prop_assert!(pair[0] <= pair[1]);
            }
        }
    }
}
