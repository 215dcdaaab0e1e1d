//! One download run: fetch, find and decode time, optionally keep a day
//! window, name the output, stamp provenance, save.
//!
//! Network and storage sit behind [`ProfileSource`] and [`DatasetSink`] so
//! the sequencing can be exercised with in-memory collaborators. Fetch and
//! save failures abort the run. A missing or undecodable time field does
//! not: the run continues unfiltered with the fallback name.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::dataset::{Dataset, Dimension};
use crate::decode::{decode_time_field, Decoded, TimeAxis};
use crate::error::{ArgoError, Result};
use crate::filter::{filter_by_time, FilterReport, Interval};
use crate::locate::{locate_time_field, DEFAULT_TIME_CANDIDATES};
use crate::naming::{name_output, Extent, ExtentResult, NamingScheme};
use crate::provenance::stamp_provenance;

// ── Collaborators ───────────────────────────────────────────────────────────

/// Remote data service the profiles come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    #[default]
    Erddap,
    Gdac,
}

/// How much of the record to keep: everything, or the core measurements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataMode {
    #[default]
    Expert,
    Standard,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DataSource::Erddap => "erddap",
            DataSource::Gdac => "gdac",
        })
    }
}

impl fmt::Display for DataMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DataMode::Expert => "expert",
            DataMode::Standard => "standard",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub float_id: u64,
    pub source: DataSource,
    pub mode: DataMode,
}

/// Produces the raw dataset for one float.
pub trait ProfileSource {
    fn fetch(&self, request: &FetchRequest) -> Result<Dataset>;
}

/// Stores a finished dataset under a file name.
pub trait DatasetSink {
    fn save(&self, dataset: &Dataset, filename: &str) -> Result<()>;
}

// ── Options + report ────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub float_id: u64,
    pub source: DataSource,
    pub mode: DataMode,
    /// Keep only the last N days; `None` keeps everything.
    pub days_back: Option<u32>,
    pub output_override: Option<String>,
    /// Anchor for the day window and the history stamp.
    pub now: DateTime<Utc>,
    pub time_candidates: Vec<String>,
    pub naming: NamingScheme,
}

impl RunOptions {
    pub fn new(float_id: u64, now: DateTime<Utc>) -> Self {
        Self {
            float_id,
            source: DataSource::default(),
            mode: DataMode::default(),
            days_back: None,
            output_override: None,
            now,
            time_candidates: DEFAULT_TIME_CANDIDATES
                .iter()
                .map(|c| c.to_string())
                .collect(),
            naming: NamingScheme::default(),
        }
    }
}

/// What happened to the time field during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TimeStatus {
    Decoded { field: String },
    Missing,
    Undecodable { field: String, reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub float_id: u64,
    pub filename: String,
    pub extent: ExtentResult,
    pub time: TimeStatus,
    /// Present only when a day window was requested and applied.
    pub filter: Option<FilterReport>,
    pub sizes: Vec<Dimension>,
    pub variables: usize,
}

// ── run ─────────────────────────────────────────────────────────────────────

/// Execute one run end to end.
///
/// # Errors
///
/// - [`ArgoError::InvalidDays`] before anything is fetched if the window
///   cannot be built;
/// - [`ArgoError::Fetch`] / [`ArgoError::EmptyDataset`] if no data came back;
/// - [`ArgoError::Persist`] if the sink fails.
pub fn run(
    source: &dyn ProfileSource,
    sink: &dyn DatasetSink,
    options: &RunOptions,
) -> Result<RunReport> {
    let float_id = options.float_id;

    let interval = options
        .days_back
        .map(|days| Interval::last_days(options.now, days))
        .transpose()?;
    match &interval {
        Some(i) => log::info!(
            "Requested window (UTC): {} → {}",
            i.start().format("%Y-%m-%d"),
            i.end().format("%Y-%m-%d")
        ),
        None => log::info!("No day window requested: keeping the full record"),
    }

    let request = FetchRequest {
        float_id,
        source: options.source,
        mode: options.mode,
    };
    log::info!(
        "Fetching float {float_id} from '{}' in '{}' mode",
        request.source,
        request.mode
    );
    let mut dataset = source.fetch(&request).map_err(|e| match e {
        ArgoError::Fetch { .. } | ArgoError::EmptyDataset { .. } => e,
        other => ArgoError::Fetch {
            float_id,
            message: other.to_string(),
        },
    })?;
    if dataset.is_empty() {
        return Err(ArgoError::EmptyDataset { float_id });
    }
    log::info!(
        "Fetched {} variables, dimensions {}",
        dataset.num_variables(),
        format_sizes(&dataset.sizes())
    );

    let (time, axis) = resolve_time(&dataset, &options.time_candidates);

    let (axis, filter) = match (interval, axis) {
        (Some(interval), Some(axis)) => {
            let (reduced, report) = filter_by_time(&mut dataset, &axis, &interval)?;
            log::info!(
                "Entries inside window: {} of {}; dimensions now {}",
                report.after,
                report.before,
                format_sizes(&dataset.sizes())
            );
            (Some(reduced), Some(report))
        }
        (Some(_), None) => {
            log::warn!("Time field unusable: day window NOT applied, keeping the full record");
            (None, None)
        }
        (None, axis) => (axis, None),
    };

    let extent = axis.as_ref().and_then(Extent::from_axis);
    match &extent {
        Some(e) => log::info!(
            "Data time range: {} → {}",
            e.min.format("%Y-%m-%d"),
            e.max.format("%Y-%m-%d")
        ),
        None => log::warn!("Could not infer a time range from the data"),
    }
    let named = name_output(
        &options.naming,
        float_id,
        extent,
        options.output_override.as_deref(),
    );
    log::info!("Output name: {}", named.identifier);

    stamp_provenance(&mut dataset, float_id, options.now);

    log::info!("Saving dataset to {}", named.identifier);
    sink.save(&dataset, &named.identifier).map_err(|e| match e {
        ArgoError::Persist { .. } => e,
        other => ArgoError::Persist {
            filename: named.identifier.clone(),
            message: other.to_string(),
        },
    })?;

    Ok(RunReport {
        float_id,
        filename: named.identifier.clone(),
        extent: named,
        time,
        filter,
        sizes: dataset.sizes(),
        variables: dataset.num_variables(),
    })
}

/// Locate and decode the time field, logging which branch was taken.
fn resolve_time(dataset: &Dataset, candidates: &[String]) -> (TimeStatus, Option<TimeAxis>) {
    let candidates: Vec<&str> = candidates.iter().map(String::as_str).collect();
    let Some(field) = locate_time_field(dataset, &candidates) else {
        log::warn!(
            "No time variable found (looked for {})",
            candidates.join("/")
        );
        return (TimeStatus::Missing, None);
    };
    log::info!("Time variable: {field}");

    match decode_time_field(dataset, field) {
        Decoded::Instants(axis) => (
            TimeStatus::Decoded {
                field: field.to_string(),
            },
            Some(axis),
        ),
        Decoded::Undecodable(failure) => {
            log::warn!("Time variable '{field}' could not be decoded: {failure}");
            (
                TimeStatus::Undecodable {
                    field: field.to_string(),
                    reason: failure.to_string(),
                },
                None,
            )
        }
    }
}

pub fn format_sizes(sizes: &[Dimension]) -> String {
    let inner = sizes
        .iter()
        .map(|d| format!("{}: {}", d.name, d.len))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{{{inner}}}")
}
