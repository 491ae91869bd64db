//! Error types for `herdbook-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("subject not found: {0}")]
  SubjectNotFound(String),

  #[error("group not found: {0}")]
  GroupNotFound(Uuid),

  #[error("subgroup not found: {0}")]
  SubgroupNotFound(Uuid),

  #[error("actor not found: {0}")]
  ActorNotFound(Uuid),

  #[error("subject id already exists: {0}")]
  DuplicateSubject(String),

  #[error("group name already exists: {0}")]
  DuplicateGroup(String),

  #[error("subgroup {name:?} already exists in group {group_id}")]
  DuplicateSubgroup { group_id: Uuid, name: String },

  #[error("username already exists: {0}")]
  DuplicateUsername(String),

  #[error("subject {0} is already terminated")]
  AlreadyTerminated(String),

  #[error("subgroup {subgroup_id} does not belong to group {group_id:?}")]
  SubgroupOutsideGroup {
    subgroup_id: Uuid,
    group_id:    Option<Uuid>,
  },

  #[error("access denied: {0}")]
  AccessDenied(String),

  #[error("unknown subject status: {0:?}")]
  UnknownStatus(String),

  #[error("unknown role: {0:?}")]
  UnknownRole(String),

  #[error("csv error: {0}")]
  Csv(#[from] csv::Error),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

impl Error {
  /// Whether this error reports a missing entity.
  pub fn is_not_found(&self) -> bool {
    matches!(
      self,
      Self::SubjectNotFound(_)
        | Self::GroupNotFound(_)
        | Self::SubgroupNotFound(_)
        | Self::ActorNotFound(_)
    )
  }

  /// Whether this error reports a write that conflicts with stored state.
  pub fn is_conflict(&self) -> bool {
    matches!(
      self,
      Self::DuplicateSubject(_)
        | Self::DuplicateGroup(_)
        | Self::DuplicateSubgroup { .. }
        | Self::DuplicateUsername(_)
        | Self::AlreadyTerminated(_)
        | Self::SubgroupOutsideGroup { .. }
    )
  }
}

/// Implemented by backend error types so callers can recover the domain
/// failure (if any) behind a storage error.
pub trait AsCoreError {
  fn as_core(&self) -> Option<&Error>;
}

impl AsCoreError for Error {
  fn as_core(&self) -> Option<&Error> { Some(self) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
