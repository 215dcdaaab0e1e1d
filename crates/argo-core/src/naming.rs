//! Output file names derived from the time extent of the data.

use serde::Serialize;

use crate::dataset::Instant;
use crate::decode::TimeAxis;

/// Calendar date format used in generated names.
const NAME_DATE_FORMAT: &str = "%Y%m%d";

/// Earliest and latest instant present in a time axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Extent {
    pub min: Instant,
    pub max: Instant,
}

impl Extent {
    /// Flat min/max over every present instant, ignoring layout. `None`
    /// when nothing is present.
    pub fn from_axis(axis: &TimeAxis) -> Option<Self> {
        Self::from_instants(axis.present())
    }

    pub fn from_instants(instants: impl IntoIterator<Item = Instant>) -> Option<Self> {
        instants.into_iter().fold(None, |acc, t| match acc {
            None => Some(Extent { min: t, max: t }),
            Some(e) => Some(Extent {
                min: e.min.min(t),
                max: e.max.max(t),
            }),
        })
    }
}

/// Prefix and extension of generated names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingScheme {
    pub prefix: String,
    pub extension: String,
}

impl Default for NamingScheme {
    fn default() -> Self {
        Self {
            prefix: "argo".to_string(),
            extension: "nc".to_string(),
        }
    }
}

/// The chosen output name and the extent it was derived from, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtentResult {
    pub identifier: String,
    pub min: Option<Instant>,
    pub max: Option<Instant>,
}

/// Pick the output name.
///
/// An explicit `override_name` always wins. Otherwise the name is
/// `<prefix>_<id>_<YYYYMMDD>-<YYYYMMDD>.<ext>` when an extent is known and
/// `<prefix>_<id>_full.<ext>` when it is not. The result depends only on
/// the arguments.
pub fn name_output(
    scheme: &NamingScheme,
    float_id: u64,
    extent: Option<Extent>,
    override_name: Option<&str>,
) -> ExtentResult {
    let identifier = match (override_name, extent) {
        (Some(name), _) => name.to_string(),
        (None, Some(e)) => format!(
            "{}_{}_{}-{}.{}",
            scheme.prefix,
            float_id,
            e.min.format(NAME_DATE_FORMAT),
            e.max.format(NAME_DATE_FORMAT),
            scheme.extension
        ),
        (None, None) => format!("{}_{}_full.{}", scheme.prefix, float_id, scheme.extension),
    };

    ExtentResult {
        identifier,
        min: extent.map(|e| e.min),
        max: extent.map(|e| e.max),
    }
}
