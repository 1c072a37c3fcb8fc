//! Wizard state engines
//!
//! - `state` - identifiers (`State`, `CompositeState`, `Action`, `SubAction`)
//! - `data` - the shared, schema-checked data bag
//! - `dfa` - flat deterministic state machine
//! - `hierarchical` - main states composed of sub-states
//! - `callbacks` - observer hooks
//! - `shared` - mutex-guarded handle for cross-thread access
//!
//! The engines never log or print. Every failure is returned as a
//! [`WizardError`] to the caller.

pub mod callbacks;
pub mod data;
pub mod dfa;
pub mod error;
pub mod hierarchical;
pub mod shared;
pub mod state;

pub use callbacks::Callbacks;
pub use data::{DataBag, KnownKey, ValueKind, WizardValue};
pub use dfa::{Dfa, NextStateFn, StateConfig, ValidateFn};
pub use error::WizardError;
pub use hierarchical::{CompletionFn, HierarchicalDfa, MainStateConfig, SubStateConfig};
pub use shared::Shared;
pub use state::{Action, CompositeState, State, SubAction, SubState};
