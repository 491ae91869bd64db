//! Configuration and bootstrap for the `herdbook` server binary.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use herdbook_core::{
  actor::{NewActor, Role},
  store::FarmStore,
};
use serde::Deserialize;

/// Runtime server configuration.
///
/// Read from an optional TOML file, then overridden by `HERDBOOK_*`
/// environment variables (e.g. `HERDBOOK_PORT=9000`).
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:           String,
  pub port:           u16,
  pub store_path:     PathBuf,
  /// Account created on first start if no actor has this username.
  pub admin_username: String,
  pub admin_password: String,
}

/// Load configuration from `path` (if it exists) and the environment.
pub fn load_config(path: &Path) -> anyhow::Result<ServerConfig> {
  build_config(config::File::from(path).required(false))
}

fn build_config<T>(file: T) -> anyhow::Result<ServerConfig>
where
  T: config::Source + Send + Sync + 'static,
{
  let settings = config::Config::builder()
    .set_default("host", "127.0.0.1")?
    .set_default("port", 8080)?
    .set_default("store_path", "herdbook.db")?
    .set_default("admin_username", "admin")?
    .set_default("admin_password", "admin123")?
    .add_source(file)
    .add_source(config::Environment::with_prefix("HERDBOOK"))
    .build()
    .context("failed to read config file")?;

  let mut cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;
  cfg.store_path = expand_tilde(&cfg.store_path);
  Ok(cfg)
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

/// Create the configured admin account unless it already exists.
///
/// Returns `true` if an account was created.
pub async fn ensure_admin<S>(store: &S, cfg: &ServerConfig) -> anyhow::Result<bool>
where
  S: FarmStore,
{
  if store.find_credentials(&cfg.admin_username).await?.is_some() {
    return Ok(false);
  }

  let password_hash = herdbook_api::hash_password(&cfg.admin_password)
    .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?;
  store
    .add_actor(NewActor {
      username: cfg.admin_username.clone(),
      password_hash,
      role: Role::Admin,
      group_id: None,
    })
    .await?;

  tracing::warn!(
    username = %cfg.admin_username,
    "created default admin account; change its password"
  );
  Ok(true)
}
