//! # argo-core
//!
//! Time handling for Argo float downloads.
//!
//! Given the dataset returned for one float, this crate finds its time
//! variable, decodes it whatever its encoding, optionally keeps only the
//! entries inside a closed date window, and derives a deterministic output
//! file name from the time extent that remains. Every function takes an
//! explicit "now" where one is needed; nothing here reads the clock or
//! touches the network or the file system.
//!
//! ## Modules
//!
//! - [`dataset`] — Labelled multi-dimensional dataset with dimension-wise selection
//! - [`locate`] — Time variable lookup by candidate name
//! - [`decode`] — CF units / timestamp strings → instants, or an explicit failure
//! - [`filter`] — Closed intervals, inclusion masks, selection along the time dimension
//! - [`naming`] — Time extent and output file name
//! - [`provenance`] — Institution and history attributes
//! - [`pipeline`] — One full run over pluggable fetch and save collaborators
//! - [`error`] — Error types

pub mod dataset;
pub mod decode;
pub mod error;
pub mod filter;
pub mod locate;
pub mod naming;
pub mod pipeline;
pub mod provenance;

pub use dataset::{AttrValue, Attributes, Dataset, Dimension, Instant, VarData, Variable};
pub use decode::{
    decode_time_field, parse_time_units, parse_timestamp, DecodeFailure, Decoded, TimeAxis,
    TimeUnit, TimeUnits,
};
pub use error::ArgoError;
pub use filter::{filter_by_time, time_mask, FilterReport, Interval};
pub use locate::{locate_time_field, DEFAULT_TIME_CANDIDATES};
pub use naming::{name_output, Extent, ExtentResult, NamingScheme};
pub use pipeline::{
    run, DataMode, DataSource, DatasetSink, FetchRequest, ProfileSource, RunOptions, RunReport,
    TimeStatus,
};
pub use provenance::stamp_provenance;
