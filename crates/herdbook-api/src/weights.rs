//! Handlers for a subject's weight readings.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/subjects/{id}/weights` | Annotated history, newest first |
//! | `POST` | `/subjects/{id}/weights` | Body: `{"value":82.5,"date":"YYYY-MM-DD"}` |
//! | `GET`  | `/subjects/{id}/chart` | Oldest-first chart series |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::NaiveDate;
use herdbook_core::{
  access::Capability,
  chart::ChartSeries,
  history::{AnnotatedObservation, WeightHistory},
  observation::NewObservation,
  store::FarmStore,
};
use serde::Deserialize;

use crate::{AppState, auth::CurrentActor, error::ApiError, subjects::load_authorized};

async fn history_of<S>(store: &S, id: &str) -> Result<WeightHistory, ApiError>
where
  S: FarmStore,
{
  let observations = store.list_observations(id).await.map_err(ApiError::store)?;
  Ok(WeightHistory::build(observations))
}

// ─── History ──────────────────────────────────────────────────────────────────

/// `GET /subjects/{id}/weights`
pub async fn history<S>(
  State(state): State<AppState<S>>,
  CurrentActor(actor): CurrentActor,
  Path(id): Path<String>,
) -> Result<Json<Vec<AnnotatedObservation>>, ApiError>
where
  S: FarmStore + Clone + 'static,
{
  load_authorized(state.store.as_ref(), &actor, &id, |group| {
    Capability::View { group }
  })
  .await?;

  let history = history_of(state.store.as_ref(), &id).await?;
  tracing::debug!(subject_id = %id, entries = history.len(), "weight history");
  Ok(Json(history.newest_first().cloned().collect()))
}

// ─── Record ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RecordBody {
  pub value: f64,
  pub date:  NaiveDate,
}

/// `POST /subjects/{id}/weights`
pub async fn record<S>(
  State(state): State<AppState<S>>,
  CurrentActor(actor): CurrentActor,
  Path(id): Path<String>,
  Json(body): Json<RecordBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: FarmStore + Clone + 'static,
{
  if !body.value.is_finite() || body.value < 0.0 {
    return Err(ApiError::BadRequest(format!(
      "weight must be a non-negative number, got {}",
      body.value
    )));
  }

  let subject = load_authorized(state.store.as_ref(), &actor, &id, |group| {
    Capability::RecordWeight { group }
  })
  .await?;
  if !subject.is_active() {
    tracing::warn!(subject_id = %id, "recording weight for a terminated subject");
  }

  let observation = state
    .store
    .record_observation(NewObservation {
      subject_id: id,
      date:       body.date,
      value:      body.value,
    })
    .await
    .map_err(ApiError::store)?;
  tracing::info!(
    subject_id = %observation.subject_id,
    value = observation.value,
    date = %observation.date,
    by = %actor.username,
    "weight recorded"
  );
  Ok((StatusCode::CREATED, Json(observation)))
}

// ─── Chart ────────────────────────────────────────────────────────────────────

/// `GET /subjects/{id}/chart`
pub async fn chart<S>(
  State(state): State<AppState<S>>,
  CurrentActor(actor): CurrentActor,
  Path(id): Path<String>,
) -> Result<Json<ChartSeries>, ApiError>
where
  S: FarmStore + Clone + 'static,
{
  load_authorized(state.store.as_ref(), &actor, &id, |group| {
    Capability::View { group }
  })
  .await?;

  let history = history_of(state.store.as_ref(), &id).await?;
  Ok(Json(ChartSeries::for_subject(&id, &history)))
}
