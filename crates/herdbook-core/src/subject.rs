//! Subject — a tracked animal.
//!
//! A subject is created [`SubjectStatus::Active`] and moves once, for good, to
//! [`SubjectStatus::Terminated`]. Its weight history lives in separate
//! observation records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

/// Lifecycle status of a subject.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SubjectStatus {
  Active,
  Terminated,
}

/// A tracked animal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
  /// Farmer-assigned identifier (ear tag or similar); unique.
  pub subject_id:    String,
  pub birth_date:    NaiveDate,
  pub sex:           String,
  pub breed:         String,
  pub status:        SubjectStatus,
  /// Set exactly when `status` is [`SubjectStatus::Terminated`].
  pub terminated_on: Option<NaiveDate>,
  pub notes:         Option<String>,
  pub group_id:      Option<Uuid>,
  /// If set, `group_id` is set too and owns this subgroup.
  pub subgroup_id:   Option<Uuid>,
}

impl Subject {
  pub fn is_active(&self) -> bool { self.status == SubjectStatus::Active }
}

/// Input to [`crate::store::FarmStore::add_subject`].
/// New subjects always start out active.
#[derive(Debug, Clone, Deserialize)]
pub struct NewSubject {
  pub subject_id:  String,
  pub birth_date:  NaiveDate,
  pub sex:         String,
  pub breed:       String,
  #[serde(default)]
  pub notes:       Option<String>,
  #[serde(default)]
  pub group_id:    Option<Uuid>,
  #[serde(default)]
  pub subgroup_id: Option<Uuid>,
}

impl NewSubject {
  /// Materialise the stored form of this subject.
  pub fn into_subject(self) -> Subject {
    Subject {
      subject_id:    self.subject_id,
      birth_date:    self.birth_date,
      sex:           self.sex,
      breed:         self.breed,
      status:        SubjectStatus::Active,
      terminated_on: None,
      notes:         self.notes,
      group_id:      self.group_id,
      subgroup_id:   self.subgroup_id,
    }
  }
}
