//! The `FarmStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g.
//! `herdbook-store-sqlite`). Higher layers (`herdbook-api`) depend on this
//! abstraction, not on any concrete backend.

use std::future::Future;

use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  AsCoreError,
  actor::{Actor, Credentials, NewActor},
  group::{Group, Subgroup},
  observation::{NewObservation, WeightObservation},
  subject::{NewSubject, Subject, SubjectStatus},
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Filters for [`FarmStore::list_subjects`] and
/// [`FarmStore::list_observations_matching`]. Empty means "everything".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubjectQuery {
  pub group_id:    Option<Uuid>,
  pub subgroup_id: Option<Uuid>,
  pub status:      Option<SubjectStatus>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Herdbook storage backend.
///
/// Observations are append-only; the only way to remove them is to delete
/// their subject. Reads of observations always come back ascending by date,
/// with no guaranteed order among equal dates.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait FarmStore: Send + Sync {
  type Error: std::error::Error + AsCoreError + Send + Sync + 'static;

  // ── Groups ────────────────────────────────────────────────────────────

  /// Create a barn. Names are unique.
  fn create_group(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Group, Self::Error>> + Send + '_;

  fn get_group(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Group>, Self::Error>> + Send + '_;

  /// All barns, ordered by name.
  fn list_groups(
    &self,
  ) -> impl Future<Output = Result<Vec<Group>, Self::Error>> + Send + '_;

  /// Create a section inside `group_id`. Names are unique per barn.
  fn create_subgroup(
    &self,
    group_id: Uuid,
    name: String,
  ) -> impl Future<Output = Result<Subgroup, Self::Error>> + Send + '_;

  fn get_subgroup(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Subgroup>, Self::Error>> + Send + '_;

  /// Sections of one barn, or of all barns when `group_id` is `None`.
  fn list_subgroups(
    &self,
    group_id: Option<Uuid>,
  ) -> impl Future<Output = Result<Vec<Subgroup>, Self::Error>> + Send + '_;

  // ── Subjects ──────────────────────────────────────────────────────────

  /// Persist a new, active subject.
  ///
  /// Fails if the id is taken, if a referenced group or subgroup does not
  /// exist, or if the subgroup belongs to a different group.
  fn add_subject(
    &self,
    input: NewSubject,
  ) -> impl Future<Output = Result<Subject, Self::Error>> + Send + '_;

  fn get_subject<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<Option<Subject>, Self::Error>> + Send + 'a;

  /// Subjects matching `query`, ordered by id.
  fn list_subjects<'a>(
    &'a self,
    query: &'a SubjectQuery,
  ) -> impl Future<Output = Result<Vec<Subject>, Self::Error>> + Send + 'a;

  /// Move a subject to another group/subgroup (or out of any group).
  /// Same membership rules as [`FarmStore::add_subject`].
  fn assign_subject<'a>(
    &'a self,
    id: &'a str,
    group_id: Option<Uuid>,
    subgroup_id: Option<Uuid>,
  ) -> impl Future<Output = Result<Subject, Self::Error>> + Send + 'a;

  fn set_notes<'a>(
    &'a self,
    id: &'a str,
    notes: Option<String>,
  ) -> impl Future<Output = Result<Subject, Self::Error>> + Send + 'a;

  /// Mark a subject terminated on `date`. Fails if it already is.
  fn terminate_subject<'a>(
    &'a self,
    id: &'a str,
    date: NaiveDate,
  ) -> impl Future<Output = Result<Subject, Self::Error>> + Send + 'a;

  /// Delete a subject together with all of its observations.
  fn delete_subject<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  // ── Observations ──────────────────────────────────────────────────────

  /// Append a weight reading. Fails if the subject does not exist.
  fn record_observation(
    &self,
    input: NewObservation,
  ) -> impl Future<Output = Result<WeightObservation, Self::Error>> + Send + '_;

  /// One subject's observations, ascending by date.
  fn list_observations<'a>(
    &'a self,
    subject_id: &'a str,
  ) -> impl Future<Output = Result<Vec<WeightObservation>, Self::Error>> + Send + 'a;

  /// Observations of every subject matching `query`, ascending by date.
  fn list_observations_matching<'a>(
    &'a self,
    query: &'a SubjectQuery,
  ) -> impl Future<Output = Result<Vec<WeightObservation>, Self::Error>> + Send + 'a;

  // ── Actors ────────────────────────────────────────────────────────────

  /// Fails if the username is taken or the group does not exist.
  fn add_actor(
    &self,
    input: NewActor,
  ) -> impl Future<Output = Result<Actor, Self::Error>> + Send + '_;

  fn get_actor(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Actor>, Self::Error>> + Send + '_;

  /// Look up an actor and its password hash for authentication.
  fn find_credentials<'a>(
    &'a self,
    username: &'a str,
  ) -> impl Future<Output = Result<Option<Credentials>, Self::Error>> + Send + 'a;

  /// All actors, ordered by username.
  fn list_actors(
    &self,
  ) -> impl Future<Output = Result<Vec<Actor>, Self::Error>> + Send + '_;

  fn delete_actor(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
