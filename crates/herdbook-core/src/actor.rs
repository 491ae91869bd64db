//! Actors — authenticated users of the record-keeper.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

/// What an actor is allowed to do; see [`crate::access::authorize`].
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
pub enum Role {
  Admin,
  Farmer,
  Helper,
}

/// A user as seen by the rest of the system. Never carries a password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
  pub actor_id: Uuid,
  pub username: String,
  pub role:     Role,
  /// Non-admins see nothing unless they belong to a group.
  pub group_id: Option<Uuid>,
}

/// The slice of farm data an actor may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
  Everything,
  Group(Uuid),
  Nothing,
}

impl Scope {
  /// Whether a record filed under `group` falls inside this scope.
  pub fn covers(&self, group: Option<Uuid>) -> bool {
    match (self, group) {
      (Self::Everything, _) => true,
      (Self::Group(own), Some(target)) => *own == target,
      _ => false,
    }
  }
}

impl Actor {
  pub fn is_admin(&self) -> bool { self.role == Role::Admin }

  pub fn scope(&self) -> Scope {
    match (self.role, self.group_id) {
      (Role::Admin, _) => Scope::Everything,
      (_, Some(group_id)) => Scope::Group(group_id),
      (_, None) => Scope::Nothing,
    }
  }
}

/// Input to [`crate::store::FarmStore::add_actor`]. The password is already
/// hashed (argon2 PHC string) by the caller.
#[derive(Debug, Clone)]
pub struct NewActor {
  pub username:      String,
  pub password_hash: String,
  pub role:          Role,
  pub group_id:      Option<Uuid>,
}

/// An actor together with the stored password hash, for login checks only.
#[derive(Debug, Clone)]
pub struct Credentials {
  pub actor:         Actor,
  pub password_hash: String,
}
