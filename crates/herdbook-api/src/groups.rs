//! Handlers for barns (`/groups`), their sections and herd statistics.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use herdbook_core::{
  access::{Capability, authorize},
  group::{Group, Subgroup},
  stats::{GroupStats, farm_stats, group_stats},
  store::{FarmStore, SubjectQuery},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, auth::CurrentActor, error::ApiError, visible_group};

#[derive(Debug, Deserialize)]
pub struct NameBody {
  pub name: String,
}

fn clean_name(body: NameBody) -> Result<String, ApiError> {
  let name = body.name.trim();
  if name.is_empty() {
    return Err(ApiError::BadRequest("name must not be blank".into()));
  }
  Ok(name.to_owned())
}

async fn load_group<S>(store: &S, id: Uuid) -> Result<Group, ApiError>
where
  S: FarmStore,
{
  store
    .get_group(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("barn {id} not found")))
}

/// Barns the actor can see: all of them for admins, otherwise their own.
async fn visible_groups<S>(store: &S, filter: Option<Uuid>) -> Result<Vec<Group>, ApiError>
where
  S: FarmStore,
{
  match filter {
    None => store.list_groups().await.map_err(ApiError::store),
    Some(id) => Ok(
      store
        .get_group(id)
        .await
        .map_err(ApiError::store)?
        .into_iter()
        .collect(),
    ),
  }
}

// ─── Groups ───────────────────────────────────────────────────────────────────

/// `GET /groups`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  CurrentActor(actor): CurrentActor,
) -> Result<Json<Vec<Group>>, ApiError>
where
  S: FarmStore + Clone + 'static,
{
  let filter = visible_group(&actor, None)?;
  Ok(Json(visible_groups(state.store.as_ref(), filter).await?))
}

/// `POST /groups` — body: `{"name":"Barn A"}`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  CurrentActor(actor): CurrentActor,
  Json(body): Json<NameBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: FarmStore + Clone + 'static,
{
  authorize(&actor, Capability::ManageGroups)?;
  let group = state
    .store
    .create_group(clean_name(body)?)
    .await
    .map_err(ApiError::store)?;
  tracing::info!(group = %group.name, "barn created");
  Ok((StatusCode::CREATED, Json(group)))
}

/// `GET /groups/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  CurrentActor(actor): CurrentActor,
  Path(id): Path<Uuid>,
) -> Result<Json<Group>, ApiError>
where
  S: FarmStore + Clone + 'static,
{
  let group = load_group(state.store.as_ref(), id).await?;
  authorize(&actor, Capability::View { group: Some(id) })?;
  Ok(Json(group))
}

// ─── Subgroups ────────────────────────────────────────────────────────────────

/// `GET /groups/{id}/subgroups`
pub async fn list_subgroups<S>(
  State(state): State<AppState<S>>,
  CurrentActor(actor): CurrentActor,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Subgroup>>, ApiError>
where
  S: FarmStore + Clone + 'static,
{
  load_group(state.store.as_ref(), id).await?;
  authorize(&actor, Capability::View { group: Some(id) })?;
  let subgroups = state
    .store
    .list_subgroups(Some(id))
    .await
    .map_err(ApiError::store)?;
  Ok(Json(subgroups))
}

/// `POST /groups/{id}/subgroups` — body: `{"name":"Pen 1"}`
pub async fn create_subgroup<S>(
  State(state): State<AppState<S>>,
  CurrentActor(actor): CurrentActor,
  Path(id): Path<Uuid>,
  Json(body): Json<NameBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: FarmStore + Clone + 'static,
{
  load_group(state.store.as_ref(), id).await?;
  authorize(&actor, Capability::ManageSubgroups { group: id })?;
  let subgroup = state
    .store
    .create_subgroup(id, clean_name(body)?)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(subgroup)))
}

// ─── Stats ────────────────────────────────────────────────────────────────────

/// `GET /groups/{id}/stats`
pub async fn stats_one<S>(
  State(state): State<AppState<S>>,
  CurrentActor(actor): CurrentActor,
  Path(id): Path<Uuid>,
) -> Result<Json<GroupStats>, ApiError>
where
  S: FarmStore + Clone + 'static,
{
  let group = load_group(state.store.as_ref(), id).await?;
  authorize(&actor, Capability::View { group: Some(id) })?;

  let query = SubjectQuery { group_id: Some(id), ..Default::default() };
  let subjects = state
    .store
    .list_subjects(&query)
    .await
    .map_err(ApiError::store)?;
  let observations = state
    .store
    .list_observations_matching(&query)
    .await
    .map_err(ApiError::store)?;

  Ok(Json(group_stats(&group, &subjects, &observations)))
}

/// `GET /stats` — one entry per visible barn.
pub async fn stats_all<S>(
  State(state): State<AppState<S>>,
  CurrentActor(actor): CurrentActor,
) -> Result<Json<Vec<GroupStats>>, ApiError>
where
  S: FarmStore + Clone + 'static,
{
  let filter = visible_group(&actor, None)?;
  let groups = visible_groups(state.store.as_ref(), filter).await?;

  let query = SubjectQuery { group_id: filter, ..Default::default() };
  let subjects = state
    .store
    .list_subjects(&query)
    .await
    .map_err(ApiError::store)?;
  let observations = state
    .store
    .list_observations_matching(&query)
    .await
    .map_err(ApiError::store)?;

  Ok(Json(farm_stats(&groups, &subjects, &observations)))
}
