//! Service status state machine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of a single service.
///
/// ```text
///            ┌──────────► Unresolvable
///            │
/// Pending ───┼──► Resolved ──► Ready
///            │        │
///            └────────┴─────► Error
/// ```
///
/// Transitions only move forward; `Ready`, `Unresolvable` and `Error` are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    /// Waiting for the factory or requirements.
    #[default]
    Pending,
    /// Requirements are available; the factory is running.
    Resolved,
    /// The value has been published.
    Ready,
    /// The factory or a requirement does not exist.
    Unresolvable,
    /// Resolution failed at runtime.
    Error,
}

impl ServiceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Resolved => "resolved",
            Self::Ready => "ready",
            Self::Unresolvable => "unresolvable",
            Self::Error => "error",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Unresolvable | Self::Error)
    }

    pub fn is_failed(self) -> bool {
        matches!(self, Self::Unresolvable | Self::Error)
    }

    /// Returns `true` if moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(self, next: ServiceStatus) -> bool {
        match (self, next) {
            (Self::Pending, Self::Resolved | Self::Unresolvable | Self::Error) => true,
            (Self::Resolved, Self::Ready | Self::Error) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions_only_move_forward() {
        use ServiceStatus::*;

        assert!(Pending.can_transition_to(Resolved));
        assert!(Pending.can_transition_to(Unresolvable));
        assert!(Resolved.can_transition_to(Ready));
        assert!(Resolved.can_transition_to(Error));

        assert!(!Pending.can_transition_to(Ready));
        assert!(!Resolved.can_transition_to(Unresolvable));
        assert!(!Ready.can_transition_to(Error));
        assert!(!Error.can_transition_to(Pending));
        assert!(!Pending.can_transition_to(Pending));
    }

    #[test]
    fn test_serializes_lowercase() {
        assert_eq!(ServiceStatus::Unresolvable.to_string(), "unresolvable");
        assert!(ServiceStatus::Ready.is_terminal());
        assert!(!ServiceStatus::Resolved.is_terminal());
        assert!(ServiceStatus::Error.is_failed());
    }
}
