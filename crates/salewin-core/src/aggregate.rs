//! Combining several child windows into one parent window.

use serde::{Deserialize, Serialize};

use crate::window::SaleWindow;

/// How a variant combines the windows of its attribute-value links.
///
/// Templates do not use this setting; they always combine their variants
/// least-restrictively (see [`aggregate_template`]).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationPolicy {
  /// Earliest start, latest end: the variant is on sale while any of its
  /// attribute choices is.
  LeastRestrictive,
  /// Latest start, earliest end: the variant is on sale only while every one
  /// of its attribute choices is.
  #[default]
  MostRestrictive,
}

/// Combine `windows` under `policy`. Absent bounds are skipped rather than
/// treated as extremes; with no bounds at all the result is open.
pub fn aggregate<I>(windows: I, policy: AggregationPolicy) -> SaleWindow
where
  I: IntoIterator<Item = SaleWindow>,
{
  let (starts, ends): (Vec<_>, Vec<_>) =
    windows.into_iter().map(|w| (w.start, w.end)).unzip();
  let starts = starts.into_iter().flatten();
  let ends = ends.into_iter().flatten();

  match policy {
    AggregationPolicy::LeastRestrictive => SaleWindow::new(starts.min(), ends.max()),
    AggregationPolicy::MostRestrictive => SaleWindow::new(starts.max(), ends.min()),
  }
}

/// Template-level aggregation over every variant, archived ones included.
pub fn aggregate_template<I>(variants: I) -> SaleWindow
where
  I: IntoIterator<Item = SaleWindow>,
{
  aggregate(variants, AggregationPolicy::LeastRestrictive)
}

#[cfg(test)]
mod tests {
  use chrono::{DateTime, Duration, TimeZone, Utc};

  use super::*;

  fn t(days: i64) -> Option<DateTime<Utc>> {
    Some(Utc.with_ymd_and_hms(2026, 7, 1, 0, 0, 0).unwrap() + Duration::days(days))
  }

  fn sample() -> Vec<SaleWindow> {
    vec![
      SaleWindow::new(t(-30), t(30)),
      SaleWindow::new(t(7), t(60)),
      SaleWindow::new(None, t(10)),
      SaleWindow::new(t(-10), None),
    ]
  }

  #[test]
  fn least_restrictive_takes_outer_bounds() {
    let w = aggregate(sample(), AggregationPolicy::LeastRestrictive);
    assert_eq!(w, SaleWindow::new(t(-30), t(60)));
  }

  #[test]
  fn most_restrictive_takes_inner_bounds() {
    let inputs = sample();
    let w = aggregate(inputs.clone(), AggregationPolicy::MostRestrictive);
    assert_eq!(w, SaleWindow::new(t(7), t(10)));
    for input in inputs {
      if let Some(s) = input.start {
        assert!(w.start.unwrap() >= s);
      }
      if let Some(e) = input.end {
        assert!(w.end.unwrap() <= e);
      }
    }
  }

  #[test]
  fn order_does_not_matter() {
    let mut inputs = sample();
    for policy in [AggregationPolicy::LeastRestrictive, AggregationPolicy::MostRestrictive] {
      let expected = aggregate(inputs.clone(), policy);
      inputs.reverse();
      assert_eq!(aggregate(inputs.clone(), policy), expected);
      inputs.rotate_left(1);
      assert_eq!(aggregate(inputs.clone(), policy), expected);
    }
  }

  #[test]
  fn empty_and_undated_inputs_are_open() {
    assert!(aggregate(Vec::new(), AggregationPolicy::MostRestrictive).is_open());
    let undated = vec![SaleWindow::OPEN, SaleWindow::OPEN];
    assert!(aggregate(undated, AggregationPolicy::LeastRestrictive).is_open());
  }

  #[test]
  fn template_ignores_variant_policy() {
    let w = aggregate_template(sample());
    assert_eq!((w.start, w.end), (t(-30), t(60)));
  }
}
