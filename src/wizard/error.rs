//! Wizard engine errors
//!
//! Every failure the engines can report. All of them are returned before any
//! state is mutated (or after a full rollback), so a caller may fix the data
//! and retry the same call.

use thiserror::Error;

use crate::wizard::data::ValueKind;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WizardError {
    // Structural
    #[error("State '{0}' is already registered")]
    DuplicateState(String),

    #[error("State '{0}' is not registered")]
    UnknownState(String),

    #[error("Main state '{0}' is not registered")]
    UnknownMainState(String),

    #[error("Sub-state '{sub}' is not registered under '{main}'")]
    UnknownSubState { main: String, sub: String },

    #[error("No transition for action '{action}' from state '{state}'")]
    NoTransition { state: String, action: String },

    #[error("No state is registered (nothing to navigate)")]
    Empty,

    #[error("Invalid state identifier '{0}'")]
    InvalidIdentifier(String),

    // Capability
    #[error("Action '{action}' is not permitted in state '{state}'")]
    ActionNotPermitted { state: String, action: String },

    #[error("Sub-action '{action}' is not allowed in '{state}'")]
    SubActionNotAllowed { state: String, action: String },

    // Validation
    #[error("Validation failed in state '{state}': {message}")]
    Validation { state: String, message: String },

    #[error("Sub-state '{state}' is not complete")]
    SubStateIncomplete { state: String },

    #[error("Key '{key}' expects a {expected} value, got {found}")]
    DataType {
        key: String,
        expected: ValueKind,
        found: ValueKind,
    },

    // History exhaustion
    #[error("No history to go back to")]
    NoHistory,

    // Observer hooks
    #[error("{hook} callback failed: {message}")]
    Callback { hook: &'static str, message: String },

    #[error("Wizard lock poisoned by a panicking thread")]
    LockPoisoned,
}

impl WizardError {
    /// Returns true for failures caused by the current data (the caller may
    /// fix the data bag and retry).
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. } | Self::SubStateIncomplete { .. } | Self::DataType { .. }
        )
    }

    pub(crate) fn callback(hook: &'static str, err: anyhow::Error) -> Self {
        Self::Callback {
            hook,
            message: format!("{err:#}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WizardError::NoTransition {
            state: "welcome".into(),
            action: "skip".into(),
        };
        assert_eq!(
            err.to_string(),
            "No transition for action 'skip' from state 'welcome'"
        );

        let err = WizardError::DataType {
            key: "theme".into(),
            expected: ValueKind::Text,
            found: ValueKind::Bool,
        };
        assert_eq!(err.to_string(), "Key 'theme' expects a text value, got bool");
    }

    #[test]
    fn test_validation_classification() {
        assert!(
            WizardError::Validation {
                state: "license".into(),
                message: "not accepted".into()
            }
            .is_validation()
        );
        assert!(!WizardError::NoHistory.is_validation());
    }

    #[test]
    fn test_callback_error_keeps_context_chain() {
        let err = anyhow::anyhow!("disk full").context("writing log");
        let wrapped = WizardError::callback("on_enter", err);
        assert_eq!(wrapped.to_string(), "on_enter callback failed: writing log: disk full");
    }
}
