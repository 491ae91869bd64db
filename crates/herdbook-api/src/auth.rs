//! HTTP Basic-auth extractor resolving the acting [`Actor`].
//!
//! Every request carries its own credentials; the resolved actor is handed to
//! handlers explicitly and checked with [`herdbook_core::access::authorize`].

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::{self, SaltString},
};
use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, request::Parts};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use herdbook_core::{actor::Actor, store::FarmStore};
use rand_core::OsRng;

use crate::{AppState, error::ApiError};

/// The authenticated actor behind the current request.
pub struct CurrentActor(pub Actor);

/// Produce the argon2 PHC string stored for `password`.
pub fn hash_password(password: &str) -> Result<String, password_hash::Error> {
  let salt = SaltString::generate(&mut OsRng);
  Ok(Argon2::default().hash_password(password.as_bytes(), &salt)?.to_string())
}

/// Split an `Authorization: Basic …` header into username and password.
fn basic_credentials(headers: &HeaderMap) -> Result<(String, String), ApiError> {
  let header_val = headers
    .get(axum::http::header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(ApiError::Unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(ApiError::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| ApiError::Unauthorized)?;
  let creds   = String::from_utf8(decoded).map_err(|_| ApiError::Unauthorized)?;

  let (username, password) = creds.split_once(':').ok_or(ApiError::Unauthorized)?;
  Ok((username.to_owned(), password.to_owned()))
}

/// Verify the request's credentials against the actor table.
pub async fn authenticate<S>(headers: &HeaderMap, store: &S) -> Result<Actor, ApiError>
where
  S: FarmStore,
{
  let (username, password) = basic_credentials(headers)?;

  let creds = store
    .find_credentials(&username)
    .await
    .map_err(ApiError::store)?
    .ok_or(ApiError::Unauthorized)?;

  let parsed_hash = PasswordHash::new(&creds.password_hash)
    .map_err(|_| ApiError::Unauthorized)?;

  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| ApiError::Unauthorized)?;

  Ok(creds.actor)
}

impl<S> FromRequestParts<AppState<S>> for CurrentActor
where
  S: FarmStore + Clone + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let actor = authenticate(&parts.headers, state.store.as_ref()).await?;
    tracing::debug!(username = %actor.username, role = %actor.role, "authenticated");
    Ok(CurrentActor(actor))
  }
}
