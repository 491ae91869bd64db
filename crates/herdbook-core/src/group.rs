//! Groups (barns) and subgroups (sections) — pure organisational containers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A barn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
  pub group_id: Uuid,
  pub name:     String,
}

/// A section inside exactly one barn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subgroup {
  pub subgroup_id: Uuid,
  pub group_id:    Uuid,
  pub name:        String,
}
