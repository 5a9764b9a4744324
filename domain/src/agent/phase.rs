//! ReAct loop phases.
//!
//! ```text
//! THINKING ──▶ ACTING ──▶ OBSERVING ──▶ REFLECTING ──┬──▶ THINKING
//!     │           │            │             │        ├──▶ COMPLETE
//!     └───────────┴────────────┴─────────────┴────────┴──▶ ABORTED
//! ```
//!
//! A turn without actions still passes through every phase; the controller
//! decides `COMPLETE` while reflecting.

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentPhase {
    Thinking,
    Acting,
    Observing,
    Reflecting,
    Complete,
    Aborted,
}

impl AgentPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentPhase::Thinking => "thinking",
            AgentPhase::Acting => "acting",
            AgentPhase::Observing => "observing",
            AgentPhase::Reflecting => "reflecting",
            AgentPhase::Complete => "complete",
            AgentPhase::Aborted => "aborted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentPhase::Complete | AgentPhase::Aborted)
    }

    pub fn can_transition_to(&self, next: AgentPhase) -> bool {
        use AgentPhase::*;
        match (self, next) {
            (Complete | Aborted, _) => false,
            (_, Aborted) => true,
            (Thinking, Acting) | (Acting, Observing) | (Observing, Reflecting) => true,
            (Reflecting, Thinking | Complete) => true,
            _ => false,
        }
    }

    /// Validated transition.
    pub fn transition(self, next: AgentPhase) -> Result<AgentPhase, DomainError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(DomainError::InvalidPhaseTransition {
                from: self.as_str().to_string(),
                to: next.as_str().to_string(),
            })
        }
    }
}

impl std::fmt::Display for AgentPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_cycle() {
        let mut phase = AgentPhase::Thinking;
        for next in [
            AgentPhase::Acting,
            AgentPhase::Observing,
            AgentPhase::Reflecting,
            AgentPhase::Thinking,
        ] {
            phase = phase.transition(next).unwrap();
        }
        assert_eq!(phase, AgentPhase::Thinking);
    }

    #[test]
    fn test_any_live_phase_can_abort() {
        for phase in [
            AgentPhase::Thinking,
            AgentPhase::Acting,
            AgentPhase::Observing,
            AgentPhase::Reflecting,
        ] {
            assert!(phase.can_transition_to(AgentPhase::Aborted));
        }
    }

    #[test]
    fn test_complete_only_from_reflecting() {
        assert!(!AgentPhase::Thinking.can_transition_to(AgentPhase::Complete));
        assert!(!AgentPhase::Acting.can_transition_to(AgentPhase::Complete));
        assert!(AgentPhase::Reflecting.can_transition_to(AgentPhase::Complete));
    }

    #[test]
    fn test_terminal_phases_are_final() {
        assert!(AgentPhase::Complete.transition(AgentPhase::Thinking).is_err());
        assert!(AgentPhase::Aborted.transition(AgentPhase::Aborted).is_err());
    }

    #[test]
    fn test_skipping_is_rejected() {
        let err = AgentPhase::Thinking
            .transition(AgentPhase::Reflecting)
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidPhaseTransition {
                from: "thinking".into(),
                to: "reflecting".into()
            }
        );
    }
}
