//! Global attributes identifying who produced a file and when.

use chrono::{DateTime, Utc};

use crate::dataset::{AttrValue, Dataset};

pub const INSTITUTION: &str = "Instituto Geofísico del Perú (IGP)";
pub const ACKNOWLEDGEMENT: &str = "IGP: Ciencia para protegernos, ciencia para avanzar";
/// Program name written into the `history` line.
pub const PRODUCER: &str = "argo-download";

/// Set `institution`, `acknowledgement` and `argo_float_id`, and append a
/// creation line to `history`. Other attributes are kept.
pub fn stamp_provenance(dataset: &mut Dataset, float_id: u64, now: DateTime<Utc>) {
    let previous = dataset
        .attr("history")
        .and_then(AttrValue::as_text)
        .unwrap_or_default()
        .to_string();
    let history = format!(
        "{previous}\nCreated by {PRODUCER} on {}Z",
        now.naive_utc().format("%Y-%m-%dT%H:%M:%S%.f")
    );

    dataset.set_attr("institution", INSTITUTION);
    dataset.set_attr("acknowledgement", ACKNOWLEDGEMENT);
    dataset.set_attr("argo_float_id", float_id.to_string());
    dataset.set_attr("history", history.trim());
}
