//! Handlers for user accounts.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/me` | The authenticated actor |
//! | `GET`    | `/actors` | Admin only |
//! | `POST`   | `/actors` | Body: `{"username","password","role","group_id"}` |
//! | `DELETE` | `/actors/{id}` | Admins cannot delete themselves |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use herdbook_core::{
  access::{Capability, authorize},
  actor::{Actor, NewActor, Role},
  store::FarmStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  AppState,
  auth::{CurrentActor, hash_password},
  error::ApiError,
};

/// `GET /me`
pub async fn me(CurrentActor(actor): CurrentActor) -> Json<Actor> { Json(actor) }

/// `GET /actors`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  CurrentActor(actor): CurrentActor,
) -> Result<Json<Vec<Actor>>, ApiError>
where
  S: FarmStore + Clone + 'static,
{
  authorize(&actor, Capability::ManageActors)?;
  let actors = state.store.list_actors().await.map_err(ApiError::store)?;
  Ok(Json(actors))
}

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub username: String,
  pub password: String,
  pub role:     Role,
  #[serde(default)]
  pub group_id: Option<Uuid>,
}

/// `POST /actors`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  CurrentActor(actor): CurrentActor,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: FarmStore + Clone + 'static,
{
  authorize(&actor, Capability::ManageActors)?;

  let username = body.username.trim().to_owned();
  if username.is_empty() {
    return Err(ApiError::BadRequest("username must not be blank".into()));
  }
  if body.password.is_empty() {
    return Err(ApiError::BadRequest("password must not be empty".into()));
  }

  let password_hash = hash_password(&body.password)
    .map_err(|e| ApiError::Store(e.to_string().into()))?;

  let created = state
    .store
    .add_actor(NewActor {
      username,
      password_hash,
      role: body.role,
      group_id: body.group_id,
    })
    .await
    .map_err(ApiError::store)?;
  tracing::info!(username = %created.username, role = %created.role, "user created");
  Ok((StatusCode::CREATED, Json(created)))
}

/// `DELETE /actors/{id}`
pub async fn delete_one<S>(
  State(state): State<AppState<S>>,
  CurrentActor(actor): CurrentActor,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: FarmStore + Clone + 'static,
{
  authorize(&actor, Capability::ManageActors)?;
  if id == actor.actor_id {
    return Err(ApiError::BadRequest("cannot delete your own account".into()));
  }

  state.store.delete_actor(id).await.map_err(ApiError::store)?;
  tracing::info!(actor_id = %id, by = %actor.username, "user deleted");
  Ok(StatusCode::NO_CONTENT)
}
