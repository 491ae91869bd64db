//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Dates are stored as `YYYY-MM-DD` so that text ordering is date ordering.
//! Enums are stored under their `SCREAMING_SNAKE_CASE` names. UUIDs are stored
//! as hyphenated lowercase strings.

use std::str::FromStr as _;

use chrono::NaiveDate;
use herdbook_core::{
  actor::{Actor, Credentials, Role},
  group::{Group, Subgroup},
  observation::WeightObservation,
  subject::{Subject, SubjectStatus},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

fn decode_opt_uuid(s: Option<String>) -> Result<Option<Uuid>> {
  s.as_deref().map(decode_uuid).transpose()
}

// ─── NaiveDate ────────────────────────────────────────────────────────────────

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn encode_date(d: NaiveDate) -> String { d.format(DATE_FORMAT).to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, DATE_FORMAT)
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Enums ───────────────────────────────────────────────────────────────────

pub fn decode_status(s: &str) -> Result<SubjectStatus> {
  SubjectStatus::from_str(s)
    .map_err(|_| herdbook_core::Error::UnknownStatus(s.to_owned()).into())
}

pub fn decode_role(s: &str) -> Result<Role> {
  Role::from_str(s).map_err(|_| herdbook_core::Error::UnknownRole(s.to_owned()).into())
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const SUBJECT_COLUMNS: &str = "subject_id, birth_date, sex, breed, status, \
                                   terminated_on, notes, group_id, subgroup_id";

/// Raw strings read directly from a `subjects` row.
pub struct RawSubject {
  pub subject_id:    String,
  pub birth_date:    String,
  pub sex:           String,
  pub breed:         String,
  pub status:        String,
  pub terminated_on: Option<String>,
  pub notes:         Option<String>,
  pub group_id:      Option<String>,
  pub subgroup_id:   Option<String>,
}

impl RawSubject {
  /// Read a row selected with [`SUBJECT_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      subject_id:    row.get(0)?,
      birth_date:    row.get(1)?,
      sex:           row.get(2)?,
      breed:         row.get(3)?,
      status:        row.get(4)?,
      terminated_on: row.get(5)?,
      notes:         row.get(6)?,
      group_id:      row.get(7)?,
      subgroup_id:   row.get(8)?,
    })
  }

  pub fn into_subject(self) -> Result<Subject> {
    Ok(Subject {
      subject_id:    self.subject_id,
      birth_date:    decode_date(&self.birth_date)?,
      sex:           self.sex,
      breed:         self.breed,
      status:        decode_status(&self.status)?,
      terminated_on: self.terminated_on.as_deref().map(decode_date).transpose()?,
      notes:         self.notes,
      group_id:      decode_opt_uuid(self.group_id)?,
      subgroup_id:   decode_opt_uuid(self.subgroup_id)?,
    })
  }
}

/// Raw strings read directly from an `observations` row.
pub struct RawObservation {
  pub observation_id: String,
  pub subject_id:     String,
  pub date:           String,
  pub value:          f64,
}

impl RawObservation {
  /// Read a row selected as `observation_id, subject_id, date, value`.
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      observation_id: row.get(0)?,
      subject_id:     row.get(1)?,
      date:           row.get(2)?,
      value:          row.get(3)?,
    })
  }

  pub fn into_observation(self) -> Result<WeightObservation> {
    Ok(WeightObservation {
      observation_id: decode_uuid(&self.observation_id)?,
      subject_id:     self.subject_id,
      date:           decode_date(&self.date)?,
      value:          self.value,
    })
  }
}

/// Raw strings read directly from a `barns` row.
pub struct RawGroup {
  pub group_id: String,
  pub name:     String,
}

impl RawGroup {
  pub fn into_group(self) -> Result<Group> {
    Ok(Group { group_id: decode_uuid(&self.group_id)?, name: self.name })
  }
}

/// Raw strings read directly from a `sections` row.
pub struct RawSubgroup {
  pub subgroup_id: String,
  pub group_id:    String,
  pub name:        String,
}

impl RawSubgroup {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      subgroup_id: row.get(0)?,
      group_id:    row.get(1)?,
      name:        row.get(2)?,
    })
  }

  pub fn into_subgroup(self) -> Result<Subgroup> {
    Ok(Subgroup {
      subgroup_id: decode_uuid(&self.subgroup_id)?,
      group_id:    decode_uuid(&self.group_id)?,
      name:        self.name,
    })
  }
}

/// Raw strings read directly from an `actors` row.
pub struct RawActor {
  pub actor_id:      String,
  pub username:      String,
  pub password_hash: String,
  pub role:          String,
  pub group_id:      Option<String>,
}

impl RawActor {
  /// Read a row selected as `actor_id, username, password_hash, role, group_id`.
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      actor_id:      row.get(0)?,
      username:      row.get(1)?,
      password_hash: row.get(2)?,
      role:          row.get(3)?,
      group_id:      row.get(4)?,
    })
  }

  pub fn into_credentials(self) -> Result<Credentials> {
    Ok(Credentials {
      actor:         Actor {
        actor_id: decode_uuid(&self.actor_id)?,
        username: self.username,
        role:     decode_role(&self.role)?,
        group_id: decode_opt_uuid(self.group_id)?,
      },
      password_hash: self.password_hash,
    })
  }

  pub fn into_actor(self) -> Result<Actor> { Ok(self.into_credentials()?.actor) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn dates_roundtrip_as_iso() {
    let d = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
    assert_eq!(encode_date(d), "2025-03-09");
    assert_eq!(decode_date("2025-03-09").unwrap(), d);
    assert!(decode_date("09/03/2025").is_err());
  }

  #[test]
  fn unknown_enum_names_are_core_errors() {
    assert!(matches!(
      decode_status("ALIVE"),
      Err(Error::Core(herdbook_core::Error::UnknownStatus(_)))
    ));
    assert!(matches!(
      decode_role("OWNER"),
      Err(Error::Core(herdbook_core::Error::UnknownRole(_)))
    ));
    assert_eq!(decode_role("HELPER").unwrap(), Role::Helper);
  }
}
