//! Weight observations.
//!
//! Observations are append-only: there is no update path, and they disappear
//! only when their subject is deleted. No ordering is stored; readers sort by
//! date.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A dated weight reading for one subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightObservation {
  pub observation_id: Uuid,
  pub subject_id:     String,
  pub date:           NaiveDate,
  /// Kilograms.
  pub value:          f64,
}

/// Input to [`crate::store::FarmStore::record_observation`].
#[derive(Debug, Clone)]
pub struct NewObservation {
  pub subject_id: String,
  pub date:       NaiveDate,
  pub value:      f64,
}
