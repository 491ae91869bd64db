//! Input for the weight chart. Rendering happens elsewhere.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::history::WeightHistory;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
  pub date:  NaiveDate,
  pub value: f64,
}

/// Oldest-first weight points plus a title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
  pub label:  String,
  pub points: Vec<ChartPoint>,
}

impl ChartSeries {
  pub fn for_subject(subject_id: &str, history: &WeightHistory) -> Self {
    Self {
      label:  format!("Weight Progress for {subject_id}"),
      points: history
        .oldest_first()
        .iter()
        .map(|e| ChartPoint { date: e.date, value: e.value })
        .collect(),
    }
  }
}
