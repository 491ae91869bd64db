//! Capability checks.
//!
//! Handlers resolve the acting [`Actor`] explicitly and ask [`authorize`]
//! whether it holds a [`Capability`] before touching the store.

use uuid::Uuid;

use crate::{
  Error, Result,
  actor::{Actor, Role, Scope},
};

/// An action, together with the group of the record it targets.
///
/// `group: None` means the target is not filed under any group; only admins
/// may act on such records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
  View { group: Option<Uuid> },
  RecordWeight { group: Option<Uuid> },
  /// Create, reassign, annotate, terminate or delete subjects.
  ManageSubjects { group: Option<Uuid> },
  ManageSubgroups { group: Uuid },
  ManageGroups,
  ManageActors,
  /// Download the CSV export; non-admins only get their own group's rows.
  Export,
}

impl Capability {
  fn describe(&self) -> &'static str {
    match self {
      Self::View { .. } => "view",
      Self::RecordWeight { .. } => "record weights",
      Self::ManageSubjects { .. } => "manage animals",
      Self::ManageSubgroups { .. } => "manage sections",
      Self::ManageGroups => "manage barns",
      Self::ManageActors => "manage users",
      Self::Export => "export",
    }
  }

  fn roles(&self) -> &'static [Role] {
    match self {
      Self::View { .. } | Self::RecordWeight { .. } => {
        &[Role::Admin, Role::Farmer, Role::Helper]
      }
      Self::ManageSubjects { .. }
      | Self::ManageSubgroups { .. }
      | Self::Export => &[Role::Admin, Role::Farmer],
      Self::ManageGroups | Self::ManageActors => &[Role::Admin],
    }
  }

  /// The group the capability is exercised against, if it is group-bound.
  fn target(&self) -> Option<Option<Uuid>> {
    match *self {
      Self::View { group }
      | Self::RecordWeight { group }
      | Self::ManageSubjects { group } => Some(group),
      Self::ManageSubgroups { group } => Some(Some(group)),
      Self::ManageGroups | Self::ManageActors | Self::Export => None,
    }
  }
}

/// Decide whether `actor` may exercise `capability`.
pub fn authorize(actor: &Actor, capability: Capability) -> Result<()> {
  let denied = || {
    Error::AccessDenied(format!(
      "{} ({}) may not {}",
      actor.username,
      actor.role,
      capability.describe()
    ))
  };

  if !capability.roles().contains(&actor.role) {
    return Err(denied());
  }

  let scope = actor.scope();
  let in_scope = match capability.target() {
    Some(group) => scope.covers(group),
    None => scope != Scope::Nothing,
  };

  if in_scope { Ok(()) } else { Err(denied()) }
}
