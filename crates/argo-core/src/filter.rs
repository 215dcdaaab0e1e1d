//! Closed date windows and selection of dataset entries falling inside one.

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use crate::dataset::{Dataset, Instant};
use crate::decode::TimeAxis;
use crate::error::{ArgoError, Result};

// ── Interval ────────────────────────────────────────────────────────────────

/// Closed range `[start, end]`. `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Interval {
    start: Instant,
    end: Instant,
}

impl Interval {
    /// # Errors
    ///
    /// Returns [`ArgoError::InvalidInterval`] when `start > end`.
    pub fn new(start: Instant, end: Instant) -> Result<Self> {
        if start > end {
            return Err(ArgoError::InvalidInterval(format!(
                "start {} is after end {}",
                start.to_rfc3339(),
                end.to_rfc3339()
            )));
        }
        Ok(Self { start, end })
    }

    /// The window `[now - days, now]`.
    ///
    /// `now` is passed in rather than read from the clock, so the same
    /// arguments always give the same window.
    ///
    /// # Errors
    ///
    /// Returns [`ArgoError::InvalidDays`] when `days` is zero or the start
    /// would fall outside the representable range.
    pub fn last_days(now: DateTime<Utc>, days: u32) -> Result<Self> {
        if days == 0 {
            return Err(ArgoError::InvalidDays(
                "number of days must be positive".to_string(),
            ));
        }
        let span = TimeDelta::try_days(i64::from(days))
            .ok_or_else(|| ArgoError::InvalidDays(format!("{days} days is out of range")))?;
        let start = now
            .checked_sub_signed(span)
            .ok_or_else(|| ArgoError::InvalidDays(format!("{days} days is out of range")))?;
        Self::new(start, now)
    }

    pub fn start(&self) -> Instant {
        self.start
    }

    pub fn end(&self) -> Instant {
        self.end
    }

    /// Inclusive on both ends.
    pub fn contains(&self, instant: Instant) -> bool {
        instant >= self.start && instant <= self.end
    }
}

// ── Mask + selection ────────────────────────────────────────────────────────

/// Per-element membership of `axis` in `interval`. Missing instants are
/// never inside.
pub fn time_mask(axis: &TimeAxis, interval: &Interval) -> Vec<bool> {
    axis.values
        .iter()
        .map(|v| v.is_some_and(|t| interval.contains(t)))
        .collect()
}

/// What a filter pass did to its dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterReport {
    /// Dimension selected along; `None` when the time field has no
    /// dimensions and nothing could be selected.
    pub dim: Option<String>,
    pub before: usize,
    pub after: usize,
}

impl FilterReport {
    pub fn skipped(&self) -> bool {
        self.dim.is_none()
    }
}

/// Drop every index along the time field's leading dimension whose row has
/// no instant inside `interval`.
///
/// For a one-dimensional time field this is exactly the element mask. For a
/// multi-dimensional one an index is kept when any element of its row is
/// inside. Returns the time axis reduced the same way, so later stages see
/// only the kept instants.
///
/// An empty result is valid: the dimension simply ends up with length zero.
pub fn filter_by_time(
    dataset: &mut Dataset,
    axis: &TimeAxis,
    interval: &Interval,
) -> Result<(TimeAxis, FilterReport)> {
    let Some(dim) = axis.dims.first() else {
        log::warn!(
            "'{}' has no dimension to select along; time filter not applied",
            axis.field
        );
        let n = axis.len();
        return Ok((
            axis.clone(),
            FilterReport {
                dim: None,
                before: n,
                after: n,
            },
        ));
    };

    let mask = time_mask(axis, interval);
    let rows = axis.shape[0];
    let row_len: usize = axis.shape[1..].iter().product();

    let keep: Vec<usize> = (0..rows)
        .filter(|&r| mask[r * row_len..(r + 1) * row_len].iter().any(|&m| m))
        .collect();

    dataset.isel(dim, &keep)?;

    let mut reduced = axis.clone();
    reduced.values = crate::dataset::take_along(&axis.values, &axis.shape, 0, &keep);
    reduced.shape[0] = keep.len();

    if keep.is_empty() {
        log::warn!(
            "No data inside {} → {}; '{dim}' is now empty",
            interval.start().format("%Y-%m-%d"),
            interval.end().format("%Y-%m-%d")
        );
    }

    Ok((
        reduced,
        FilterReport {
            dim: Some(dim.clone()),
            before: rows,
            after: keep.len(),
        },
    ))
}
