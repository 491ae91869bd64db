//! [`SqliteStore`] — the SQLite implementation of [`FarmStore`].

use std::path::Path;

use chrono::NaiveDate;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use herdbook_core::{
  actor::{Actor, Credentials, NewActor},
  group::{Group, Subgroup},
  observation::{NewObservation, WeightObservation},
  store::{FarmStore, SubjectQuery},
  subject::{NewSubject, Subject, SubjectStatus},
};

use crate::{
  Error, Result,
  encode::{
    RawActor, RawGroup, RawObservation, RawSubgroup, RawSubject, SUBJECT_COLUMNS,
    encode_date, encode_uuid,
  },
  schema::SCHEMA,
};

type CoreError = herdbook_core::Error;

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Herdbook store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Check that a group/subgroup pair names existing rows and that the
  /// subgroup, if any, lives inside the group.
  async fn check_membership(
    &self,
    group_id:    Option<Uuid>,
    subgroup_id: Option<Uuid>,
  ) -> Result<()> {
    if let Some(id) = group_id
      && self.get_group(id).await?.is_none()
    {
      return Err(CoreError::GroupNotFound(id).into());
    }

    if let Some(id) = subgroup_id {
      let subgroup = self
        .get_subgroup(id)
        .await?
        .ok_or(CoreError::SubgroupNotFound(id))?;
      if Some(subgroup.group_id) != group_id {
        return Err(
          CoreError::SubgroupOutsideGroup { subgroup_id: id, group_id }.into(),
        );
      }
    }

    Ok(())
  }

  /// Like `get_subject`, but a missing subject is an error.
  async fn require_subject(&self, id: &str) -> Result<Subject> {
    self
      .get_subject(id)
      .await?
      .ok_or_else(|| CoreError::SubjectNotFound(id.to_owned()).into())
  }

  /// Run a single-row `UPDATE`/`DELETE` keyed by subject id and return the
  /// number of rows touched.
  async fn execute_for_subject(
    &self,
    sql: &'static str,
    id: &str,
    value: Option<String>,
  ) -> Result<usize> {
    let id = id.to_owned();
    let changed = self
      .conn
      .call(move |conn| {
        let n = match value {
          Some(v) => conn.execute(sql, rusqlite::params![id, v])?,
          None => conn.execute(sql, rusqlite::params![id])?,
        };
        Ok(n)
      })
      .await?;
    Ok(changed)
  }
}

// ─── FarmStore impl ──────────────────────────────────────────────────────────

impl FarmStore for SqliteStore {
  type Error = Error;

  // ── Groups ────────────────────────────────────────────────────────────────

  async fn create_group(&self, name: String) -> Result<Group> {
    let group = Group { group_id: Uuid::new_v4(), name };

    let id_str = encode_uuid(group.group_id);
    let name_c = group.name.clone();

    let inserted: bool = self
      .conn
      .call(move |conn| {
        let taken: bool = conn
          .query_row(
            "SELECT 1 FROM barns WHERE name = ?1",
            rusqlite::params![name_c],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if taken {
          return Ok(false);
        }
        conn.execute(
          "INSERT INTO barns (group_id, name) VALUES (?1, ?2)",
          rusqlite::params![id_str, name_c],
        )?;
        Ok(true)
      })
      .await?;

    if !inserted {
      return Err(CoreError::DuplicateGroup(group.name).into());
    }
    Ok(group)
  }

  async fn get_group(&self, id: Uuid) -> Result<Option<Group>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawGroup> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT group_id, name FROM barns WHERE group_id = ?1",
            rusqlite::params![id_str],
            |row| Ok(RawGroup { group_id: row.get(0)?, name: row.get(1)? }),
          )
          .optional()?)
      })
      .await?;

    raw.map(RawGroup::into_group).transpose()
  }

  async fn list_groups(&self) -> Result<Vec<Group>> {
    let raws: Vec<RawGroup> = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT group_id, name FROM barns ORDER BY name")?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawGroup { group_id: row.get(0)?, name: row.get(1)? })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawGroup::into_group).collect()
  }

  async fn create_subgroup(&self, group_id: Uuid, name: String) -> Result<Subgroup> {
    if self.get_group(group_id).await?.is_none() {
      return Err(CoreError::GroupNotFound(group_id).into());
    }

    let subgroup = Subgroup { subgroup_id: Uuid::new_v4(), group_id, name };

    let id_str    = encode_uuid(subgroup.subgroup_id);
    let group_str = encode_uuid(group_id);
    let name_c    = subgroup.name.clone();

    let inserted: bool = self
      .conn
      .call(move |conn| {
        let taken: bool = conn
          .query_row(
            "SELECT 1 FROM sections WHERE group_id = ?1 AND name = ?2",
            rusqlite::params![group_str, name_c],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if taken {
          return Ok(false);
        }
        conn.execute(
          "INSERT INTO sections (subgroup_id, group_id, name) VALUES (?1, ?2, ?3)",
          rusqlite::params![id_str, group_str, name_c],
        )?;
        Ok(true)
      })
      .await?;

    if !inserted {
      return Err(
        CoreError::DuplicateSubgroup { group_id, name: subgroup.name }.into(),
      );
    }
    Ok(subgroup)
  }

  async fn get_subgroup(&self, id: Uuid) -> Result<Option<Subgroup>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawSubgroup> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT subgroup_id, group_id, name FROM sections WHERE subgroup_id = ?1",
            rusqlite::params![id_str],
            RawSubgroup::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawSubgroup::into_subgroup).transpose()
  }

  async fn list_subgroups(&self, group_id: Option<Uuid>) -> Result<Vec<Subgroup>> {
    let group_str = group_id.map(encode_uuid);

    let raws: Vec<RawSubgroup> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT subgroup_id, group_id, name FROM sections
           WHERE (?1 IS NULL OR group_id = ?1)
           ORDER BY name",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![group_str], RawSubgroup::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSubgroup::into_subgroup).collect()
  }

  // ── Subjects ──────────────────────────────────────────────────────────────

  async fn add_subject(&self, input: NewSubject) -> Result<Subject> {
    self.check_membership(input.group_id, input.subgroup_id).await?;

    let subject = input.into_subject();

    let id           = subject.subject_id.clone();
    let birth_str    = encode_date(subject.birth_date);
    let sex          = subject.sex.clone();
    let breed        = subject.breed.clone();
    let status_str   = subject.status.as_ref().to_owned();
    let notes        = subject.notes.clone();
    let group_str    = subject.group_id.map(encode_uuid);
    let subgroup_str = subject.subgroup_id.map(encode_uuid);

    let inserted: bool = self
      .conn
      .call(move |conn| {
        let taken: bool = conn
          .query_row(
            "SELECT 1 FROM subjects WHERE subject_id = ?1",
            rusqlite::params![id],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if taken {
          return Ok(false);
        }
        conn.execute(
          "INSERT INTO subjects (
             subject_id, birth_date, sex, breed, status,
             terminated_on, notes, group_id, subgroup_id
           ) VALUES (?1, ?2, ?3, ?4, ?5, NULL, ?6, ?7, ?8)",
          rusqlite::params![
            id,
            birth_str,
            sex,
            breed,
            status_str,
            notes,
            group_str,
            subgroup_str,
          ],
        )?;
        Ok(true)
      })
      .await?;

    if !inserted {
      return Err(CoreError::DuplicateSubject(subject.subject_id).into());
    }
    Ok(subject)
  }

  async fn get_subject(&self, id: &str) -> Result<Option<Subject>> {
    let id = id.to_owned();

    let raw: Option<RawSubject> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {SUBJECT_COLUMNS} FROM subjects WHERE subject_id = ?1"),
            rusqlite::params![id],
            RawSubject::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawSubject::into_subject).transpose()
  }

  async fn list_subjects(&self, query: &SubjectQuery) -> Result<Vec<Subject>> {
    let group_str    = query.group_id.map(encode_uuid);
    let subgroup_str = query.subgroup_id.map(encode_uuid);
    let status_str   = query.status.map(|s| s.as_ref().to_owned());

    let raws: Vec<RawSubject> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {SUBJECT_COLUMNS} FROM subjects
           WHERE (?1 IS NULL OR group_id = ?1)
             AND (?2 IS NULL OR subgroup_id = ?2)
             AND (?3 IS NULL OR status = ?3)
           ORDER BY subject_id"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![group_str, subgroup_str, status_str],
            RawSubject::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSubject::into_subject).collect()
  }

  async fn assign_subject(
    &self,
    id:          &str,
    group_id:    Option<Uuid>,
    subgroup_id: Option<Uuid>,
  ) -> Result<Subject> {
    let mut subject = self.require_subject(id).await?;
    self.check_membership(group_id, subgroup_id).await?;

    let id_c         = id.to_owned();
    let group_str    = group_id.map(encode_uuid);
    let subgroup_str = subgroup_id.map(encode_uuid);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE subjects SET group_id = ?2, subgroup_id = ?3 WHERE subject_id = ?1",
          rusqlite::params![id_c, group_str, subgroup_str],
        )?;
        Ok(())
      })
      .await?;

    subject.group_id = group_id;
    subject.subgroup_id = subgroup_id;
    Ok(subject)
  }

  async fn set_notes(&self, id: &str, notes: Option<String>) -> Result<Subject> {
    let mut subject = self.require_subject(id).await?;

    let id_c    = id.to_owned();
    let notes_c = notes.clone();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE subjects SET notes = ?2 WHERE subject_id = ?1",
          rusqlite::params![id_c, notes_c],
        )?;
        Ok(())
      })
      .await?;

    subject.notes = notes;
    Ok(subject)
  }

  async fn terminate_subject(&self, id: &str, date: NaiveDate) -> Result<Subject> {
    let mut subject = self.require_subject(id).await?;
    if subject.status == SubjectStatus::Terminated {
      return Err(CoreError::AlreadyTerminated(id.to_owned()).into());
    }

    let changed = self
      .execute_for_subject(
        "UPDATE subjects SET status = 'TERMINATED', terminated_on = ?2
         WHERE subject_id = ?1 AND status = 'ACTIVE'",
        id,
        Some(encode_date(date)),
      )
      .await?;
    if changed == 0 {
      return Err(CoreError::AlreadyTerminated(id.to_owned()).into());
    }

    subject.status = SubjectStatus::Terminated;
    subject.terminated_on = Some(date);
    Ok(subject)
  }

  async fn delete_subject(&self, id: &str) -> Result<()> {
    // Observations follow via ON DELETE CASCADE.
    let changed = self
      .execute_for_subject("DELETE FROM subjects WHERE subject_id = ?1", id, None)
      .await?;
    if changed == 0 {
      return Err(CoreError::SubjectNotFound(id.to_owned()).into());
    }
    Ok(())
  }

  // ── Observations ──────────────────────────────────────────────────────────

  async fn record_observation(&self, input: NewObservation) -> Result<WeightObservation> {
    self.require_subject(&input.subject_id).await?;

    let observation = WeightObservation {
      observation_id: Uuid::new_v4(),
      subject_id:     input.subject_id,
      date:           input.date,
      value:          input.value,
    };

    let id_str      = encode_uuid(observation.observation_id);
    let subject_str = observation.subject_id.clone();
    let date_str    = encode_date(observation.date);
    let value       = observation.value;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO observations (observation_id, subject_id, date, value)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, subject_str, date_str, value],
        )?;
        Ok(())
      })
      .await?;

    Ok(observation)
  }

  async fn list_observations(&self, subject_id: &str) -> Result<Vec<WeightObservation>> {
    let subject_str = subject_id.to_owned();

    let raws: Vec<RawObservation> = self
      .conn
      .call(move |conn| {
        // No tie-break: equal dates come back in whatever order SQLite picks.
        let mut stmt = conn.prepare(
          "SELECT observation_id, subject_id, date, value
           FROM observations
           WHERE subject_id = ?1
           ORDER BY date ASC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![subject_str], RawObservation::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawObservation::into_observation).collect()
  }

  async fn list_observations_matching(
    &self,
    query: &SubjectQuery,
  ) -> Result<Vec<WeightObservation>> {
    let group_str    = query.group_id.map(encode_uuid);
    let subgroup_str = query.subgroup_id.map(encode_uuid);
    let status_str   = query.status.map(|s| s.as_ref().to_owned());

    let raws: Vec<RawObservation> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT o.observation_id, o.subject_id, o.date, o.value
           FROM observations o
           JOIN subjects s ON s.subject_id = o.subject_id
           WHERE (?1 IS NULL OR s.group_id = ?1)
             AND (?2 IS NULL OR s.subgroup_id = ?2)
             AND (?3 IS NULL OR s.status = ?3)
           ORDER BY o.date ASC",
        )?;
        let rows = stmt
          .query_map(
            rusqlite::params![group_str, subgroup_str, status_str],
            RawObservation::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawObservation::into_observation).collect()
  }

  // ── Actors ────────────────────────────────────────────────────────────────

  async fn add_actor(&self, input: NewActor) -> Result<Actor> {
    self.check_membership(input.group_id, None).await?;

    let actor = Actor {
      actor_id: Uuid::new_v4(),
      username: input.username,
      role:     input.role,
      group_id: input.group_id,
    };

    let id_str    = encode_uuid(actor.actor_id);
    let username  = actor.username.clone();
    let hash      = input.password_hash;
    let role_str  = actor.role.as_ref().to_owned();
    let group_str = actor.group_id.map(encode_uuid);

    let inserted: bool = self
      .conn
      .call(move |conn| {
        let taken: bool = conn
          .query_row(
            "SELECT 1 FROM actors WHERE username = ?1",
            rusqlite::params![username],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if taken {
          return Ok(false);
        }
        conn.execute(
          "INSERT INTO actors (actor_id, username, password_hash, role, group_id)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, username, hash, role_str, group_str],
        )?;
        Ok(true)
      })
      .await?;

    if !inserted {
      return Err(CoreError::DuplicateUsername(actor.username).into());
    }
    Ok(actor)
  }

  async fn get_actor(&self, id: Uuid) -> Result<Option<Actor>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawActor> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT actor_id, username, password_hash, role, group_id
             FROM actors WHERE actor_id = ?1",
            rusqlite::params![id_str],
            RawActor::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawActor::into_actor).transpose()
  }

  async fn find_credentials(&self, username: &str) -> Result<Option<Credentials>> {
    let username = username.to_owned();

    let raw: Option<RawActor> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT actor_id, username, password_hash, role, group_id
             FROM actors WHERE username = ?1",
            rusqlite::params![username],
            RawActor::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawActor::into_credentials).transpose()
  }

  async fn list_actors(&self) -> Result<Vec<Actor>> {
    let raws: Vec<RawActor> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT actor_id, username, password_hash, role, group_id
           FROM actors ORDER BY username",
        )?;
        let rows = stmt
          .query_map([], RawActor::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawActor::into_actor).collect()
  }

  async fn delete_actor(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);

    let changed: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM actors WHERE actor_id = ?1", rusqlite::params![id_str])?)
      })
      .await?;

    if changed == 0 {
      return Err(CoreError::ActorNotFound(id).into());
    }
    Ok(())
  }
}
