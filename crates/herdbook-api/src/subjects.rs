//! Handlers for `/subjects` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/subjects` | Optional `?group_id=&subgroup_id=&status=ACTIVE\|TERMINATED` |
//! | `POST`   | `/subjects` | Body: [`NewSubject`] |
//! | `GET`    | `/subjects/{id}` | Subject plus newest-first weight history |
//! | `DELETE` | `/subjects/{id}` | Removes the subject and its weights |
//! | `POST`   | `/subjects/{id}/assign` | Body: `{"group_id":…,"subgroup_id":…}` |
//! | `PUT`    | `/subjects/{id}/notes` | Body: `{"notes":"…"}` |
//! | `POST`   | `/subjects/{id}/terminate` | Body: `{"date":"YYYY-MM-DD"}` |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::NaiveDate;
use herdbook_core::{
  access::{Capability, authorize},
  actor::Actor,
  history::{AnnotatedObservation, WeightHistory},
  store::{FarmStore, SubjectQuery},
  subject::{NewSubject, Subject},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppState, auth::CurrentActor, error::ApiError, visible_group};

/// Fetch a subject or fail with 404.
pub(crate) async fn load_subject<S>(store: &S, id: &str) -> Result<Subject, ApiError>
where
  S: FarmStore,
{
  store
    .get_subject(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("subject {id:?} not found")))
}

/// Fetch a subject and check that `actor` may exercise `capability` on it.
pub(crate) async fn load_authorized<S, F>(
  store: &S,
  actor: &Actor,
  id: &str,
  capability: F,
) -> Result<Subject, ApiError>
where
  S: FarmStore,
  F: FnOnce(Option<Uuid>) -> Capability,
{
  let subject = load_subject(store, id).await?;
  authorize(actor, capability(subject.group_id))?;
  Ok(subject)
}

fn require(field: &str, value: &str) -> Result<(), ApiError> {
  if value.trim().is_empty() {
    Err(ApiError::BadRequest(format!("{field} must not be blank")))
  } else {
    Ok(())
  }
}

fn non_blank(s: Option<String>) -> Option<String> {
  s.filter(|s| !s.trim().is_empty())
}

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /subjects[?group_id=…][&subgroup_id=…][&status=…]`
///
/// Non-admins are confined to their own group.
pub async fn list<S>(
  State(state): State<AppState<S>>,
  CurrentActor(actor): CurrentActor,
  Query(mut query): Query<SubjectQuery>,
) -> Result<Json<Vec<Subject>>, ApiError>
where
  S: FarmStore + Clone + 'static,
{
  query.group_id = visible_group(&actor, query.group_id)?;
  let subjects = state
    .store
    .list_subjects(&query)
    .await
    .map_err(ApiError::store)?;
  tracing::debug!(count = subjects.len(), by = %actor.username, "listed subjects");
  Ok(Json(subjects))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /subjects`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  CurrentActor(actor): CurrentActor,
  Json(mut body): Json<NewSubject>,
) -> Result<impl IntoResponse, ApiError>
where
  S: FarmStore + Clone + 'static,
{
  require("subject_id", &body.subject_id)?;
  require("sex", &body.sex)?;
  require("breed", &body.breed)?;
  authorize(&actor, Capability::ManageSubjects { group: body.group_id })?;

  body.subject_id = body.subject_id.trim().to_owned();
  body.notes = non_blank(body.notes);

  let subject = state
    .store
    .add_subject(body)
    .await
    .map_err(ApiError::store)?;
  tracing::info!(subject_id = %subject.subject_id, by = %actor.username, "subject added");
  Ok((StatusCode::CREATED, Json(subject)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// A subject with its weight history, newest first.
#[derive(Debug, Serialize)]
pub struct SubjectDetail {
  #[serde(flatten)]
  pub subject: Subject,
  pub weights: Vec<AnnotatedObservation>,
}

/// `GET /subjects/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  CurrentActor(actor): CurrentActor,
  Path(id): Path<String>,
) -> Result<Json<SubjectDetail>, ApiError>
where
  S: FarmStore + Clone + 'static,
{
  let subject = load_authorized(state.store.as_ref(), &actor, &id, |group| {
    Capability::View { group }
  })
  .await?;

  let observations = state
    .store
    .list_observations(&id)
    .await
    .map_err(ApiError::store)?;
  let history = WeightHistory::build(observations);

  Ok(Json(SubjectDetail {
    subject,
    weights: history.newest_first().cloned().collect(),
  }))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /subjects/{id}`
pub async fn delete_one<S>(
  State(state): State<AppState<S>>,
  CurrentActor(actor): CurrentActor,
  Path(id): Path<String>,
) -> Result<StatusCode, ApiError>
where
  S: FarmStore + Clone + 'static,
{
  load_authorized(state.store.as_ref(), &actor, &id, |group| {
    Capability::ManageSubjects { group }
  })
  .await?;

  state
    .store
    .delete_subject(&id)
    .await
    .map_err(ApiError::store)?;
  tracing::info!(subject_id = %id, by = %actor.username, "subject deleted");
  Ok(StatusCode::NO_CONTENT)
}

// ─── Assign ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AssignBody {
  #[serde(default)]
  pub group_id:    Option<Uuid>,
  #[serde(default)]
  pub subgroup_id: Option<Uuid>,
}

/// `POST /subjects/{id}/assign`
///
/// The actor must be able to manage subjects both where the subject is and
/// where it is going.
pub async fn assign<S>(
  State(state): State<AppState<S>>,
  CurrentActor(actor): CurrentActor,
  Path(id): Path<String>,
  Json(body): Json<AssignBody>,
) -> Result<Json<Subject>, ApiError>
where
  S: FarmStore + Clone + 'static,
{
  load_authorized(state.store.as_ref(), &actor, &id, |group| {
    Capability::ManageSubjects { group }
  })
  .await?;
  authorize(&actor, Capability::ManageSubjects { group: body.group_id })?;

  let subject = state
    .store
    .assign_subject(&id, body.group_id, body.subgroup_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(subject))
}

// ─── Notes ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct NotesBody {
  #[serde(default)]
  pub notes: Option<String>,
}

/// `PUT /subjects/{id}/notes`; blank notes clear the field.
pub async fn set_notes<S>(
  State(state): State<AppState<S>>,
  CurrentActor(actor): CurrentActor,
  Path(id): Path<String>,
  Json(body): Json<NotesBody>,
) -> Result<Json<Subject>, ApiError>
where
  S: FarmStore + Clone + 'static,
{
  load_authorized(state.store.as_ref(), &actor, &id, |group| {
    Capability::ManageSubjects { group }
  })
  .await?;

  let subject = state
    .store
    .set_notes(&id, non_blank(body.notes))
    .await
    .map_err(ApiError::store)?;
  Ok(Json(subject))
}

// ─── Terminate ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TerminateBody {
  pub date: NaiveDate,
}

/// `POST /subjects/{id}/terminate`; 409 if the subject is already terminated.
pub async fn terminate<S>(
  State(state): State<AppState<S>>,
  CurrentActor(actor): CurrentActor,
  Path(id): Path<String>,
  Json(body): Json<TerminateBody>,
) -> Result<Json<Subject>, ApiError>
where
  S: FarmStore + Clone + 'static,
{
  load_authorized(state.store.as_ref(), &actor, &id, |group| {
    Capability::ManageSubjects { group }
  })
  .await?;

  let subject = state
    .store
    .terminate_subject(&id, body.date)
    .await
    .map_err(ApiError::store)?;
  tracing::info!(subject_id = %id, date = %body.date, by = %actor.username, "subject terminated");
  Ok(Json(subject))
}
