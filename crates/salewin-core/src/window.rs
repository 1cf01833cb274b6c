//! Sale windows: the `(start, end)` pair that gates purchasability.
//!
//! The same three rules apply at every level of the catalog (attribute value,
//! template link, variant, template): validation, activity at an instant, and
//! the display label. They live here as pure functions so that no level can
//! drift from the others.

use chrono::{DateTime, Datelike, SubsecRound as _, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Window ──────────────────────────────────────────────────────────────────

/// An optionally bounded sale period. Either bound may be absent; an absent
/// bound never excludes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleWindow {
  #[serde(rename = "sale_start")]
  pub start: Option<DateTime<Utc>>,
  #[serde(rename = "sale_end")]
  pub end:   Option<DateTime<Utc>>,
}

impl SaleWindow {
  /// A window with no bounds; always active.
  pub const OPEN: Self = Self { start: None, end: None };

  pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
    Self { start, end }
  }

  pub fn is_open(&self) -> bool { self.start.is_none() && self.end.is_none() }

  /// Drop sub-microsecond precision from both bounds, the finest the catalog
  /// persists. Validate the result, not the raw input.
  pub fn at_micros(self) -> Self {
    Self {
      start: self.start.map(|s| s.trunc_subsecs(6)),
      end:   self.end.map(|e| e.trunc_subsecs(6)),
    }
  }

  /// Reject a window whose bounds are both set and not strictly ordered.
  ///
  /// `name` identifies the attribute value in the error message.
  pub fn validate(&self, name: &str) -> Result<()> {
    if let (Some(start), Some(end)) = (self.start, self.end)
      && start >= end
    {
      return Err(Error::InvalidRange { name: name.to_owned() });
    }
    Ok(())
  }

  pub fn is_active(&self, now: DateTime<Utc>) -> bool {
    window_active(self.start, self.end, now)
  }

  pub fn label(&self) -> String { format_label(self.end) }
}

/// `false` when `now` is before the start or after the end, `true` otherwise.
/// Both comparisons are strict: the boundary instants themselves are active.
pub fn window_active(
  start: Option<DateTime<Utc>>,
  end: Option<DateTime<Utc>>,
  now: DateTime<Utc>,
) -> bool {
  if start.is_some_and(|s| s > now) {
    return false;
  }
  if end.is_some_and(|e| e < now) {
    return false;
  }
  true
}

// ─── Label ───────────────────────────────────────────────────────────────────

/// Render the end bound as `"Until 1st Jul"`. Empty when there is no end.
pub fn format_label(end: Option<DateTime<Utc>>) -> String {
  let Some(end) = end else {
    return String::new();
  };
  let day = end.day();
  format!("Until {day}{} {}", ordinal_suffix(day), end.format("%b"))
}

fn ordinal_suffix(day: u32) -> &'static str {
  match day {
    1 | 21 | 31 => "st",
    2 | 22 => "nd",
    3 | 23 => "rd",
    _ => "th",
  }
}
