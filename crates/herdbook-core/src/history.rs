//! Weight history: change-from-predecessor annotation and its two views.
//!
//! The annotation is computed exactly once, over observations in ascending
//! date order. Display contexts read the result newest-first, export and chart
//! contexts read it oldest-first; neither recomputes anything, so the change
//! values are identical in both views.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::observation::WeightObservation;

/// An observation with its change relative to the preceding observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedObservation {
  pub date:     NaiveDate,
  pub value:    f64,
  /// `value - previous`; `None` for the first observation.
  pub diff:     Option<f64>,
  /// `diff / previous * 100`, or `0` when the previous value is not positive;
  /// `None` for the first observation.
  pub pct:      Option<f64>,
  /// The predecessor's value, kept so export can apply its own policy.
  #[serde(skip)]
  pub previous: Option<f64>,
}

/// Annotate `observations`, which must already be sorted ascending by date.
///
/// Negative values pass through untouched; validation belongs to callers.
pub fn annotate(observations: &[WeightObservation]) -> Vec<AnnotatedObservation> {
  let mut previous: Option<f64> = None;

  observations
    .iter()
    .map(|obs| {
      let (diff, pct) = match previous {
        None => (None, None),
        Some(prev) => {
          let diff = obs.value - prev;
          let pct = if prev > 0.0 { diff / prev * 100.0 } else { 0.0 };
          (Some(diff), Some(pct))
        }
      };
      let annotated = AnnotatedObservation {
        date: obs.date,
        value: obs.value,
        diff,
        pct,
        previous,
      };
      previous = Some(obs.value);
      annotated
    })
    .collect()
}

/// A subject's annotated weight history, held oldest-first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeightHistory {
  entries: Vec<AnnotatedObservation>,
}

impl WeightHistory {
  /// Sort by date and annotate once.
  ///
  /// The sort is stable: observations sharing a date keep the order they
  /// arrived in. No further tie-break is applied.
  pub fn build(mut observations: Vec<WeightObservation>) -> Self {
    observations.sort_by_key(|o| o.date);
    Self { entries: annotate(&observations) }
  }

  /// Export and chart view.
  pub fn oldest_first(&self) -> &[AnnotatedObservation] { &self.entries }

  /// History display view — the same entries, reversed.
  pub fn newest_first(&self) -> impl Iterator<Item = &AnnotatedObservation> {
    self.entries.iter().rev()
  }

  pub fn latest(&self) -> Option<&AnnotatedObservation> { self.entries.last() }

  pub fn len(&self) -> usize { self.entries.len() }

  pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}
