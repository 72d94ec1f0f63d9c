//! Actors performing coordinator operations.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CoordinatorError, Result};

/// Role of an actor within the workspace.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Owner,
    Editor,
    Viewer,
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "owner" => Ok(Role::Owner),
            "editor" => Ok(Role::Editor),
            "viewer" => Ok(Role::Viewer),
            _ => Err(format!("Invalid role: {s}")),
        }
    }
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Editor => "editor",
            Role::Viewer => "viewer",
        }
    }
}

/// The human (or service) on whose behalf an operation runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }

    /// Owners and editors may change plans; viewers may only read them.
    pub fn can_edit(&self) -> bool {
        matches!(self.role, Role::Owner | Role::Editor)
    }

    /// Fails with a permission error unless the actor can edit.
    pub fn require_edit(&self) -> Result<()> {
        if self.can_edit() {
            Ok(())
        } else {
            Err(CoordinatorError::PermissionDenied {
                actor: self.id.clone(),
                capability: "edit plans".to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_viewer_cannot_edit() {
        let viewer = Actor::new("vera", Role::Viewer);
        let err = viewer.require_edit().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Permission);
        assert!(Actor::new("ed", Role::Editor).require_edit().is_ok());
    }

    #[test]
    fn test_role_from_str() {
        assert_eq!("Editor".parse::<Role>().unwrap(), Role::Editor);
        assert!("admin".parse::<Role>().is_err());
    }
}
