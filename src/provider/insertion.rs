//! State insertion
//!
//! Splices a new state into an existing linear chain without touching the
//! code that built the chain. Given `A -> B` (A's `next` is B), inserting X
//! after A produces `A -> X -> B`, and X's `skip` also lands on B. X takes
//! over A's `cancel` target unless it declares its own.
//!
//! States that resolve `next` dynamically cannot be used as anchors: there is
//! no single target to splice around.

use std::fmt;
use std::sync::Arc;

use crate::provider::handler::StateHandler;
use crate::provider::ui::UiMapping;
use crate::provider::ProviderError;
use crate::wizard::{Action, Dfa, State, StateConfig};

/// A state to graft into a provider's flow, with its handler and UI descriptor.
#[derive(Clone)]
pub struct StateInsertion {
    pub state: State,
    /// Anchor: the new state is entered via this state's `next`
    pub after: State,
    pub config: StateConfig,
    pub handler: Arc<dyn StateHandler>,
    pub ui: UiMapping,
}

impl fmt::Debug for StateInsertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateInsertion")
            .field("state", &self.state)
            .field("after", &self.after)
            .field("config", &self.config)
            .field("ui", &self.ui)
            .finish_non_exhaustive()
    }
}

impl StateInsertion {
    pub fn new(
        state: impl Into<State>,
        after: impl Into<State>,
        config: StateConfig,
        handler: Arc<dyn StateHandler>,
        ui: UiMapping,
    ) -> Self {
        Self {
            state: state.into(),
            after: after.into(),
            config,
            handler,
            ui,
        }
    }
}

/// Insert `state` after `after` in `dfa`, rewiring `next` transitions.
///
/// The new state's `next` and `skip` both point at the anchor's original
/// `next` target, and skipping is enabled on it. A new state that allows
/// cancelling but has no `cancel` target inherits the anchor's. Nothing is
/// modified when an error is returned.
///
/// # Errors
///
/// - `UnknownAnchor` if `after` is not registered
/// - `DynamicAnchor` if `after` resolves its next state with a function
/// - `NoNextTransition` if `after` has no explicit `next` target
/// - `Wizard(DuplicateState)` if `state` already exists
pub fn splice_state(
    dfa: &mut Dfa,
    state: &State,
    after: &State,
    config: StateConfig,
) -> Result<(), ProviderError> {
    let anchor = dfa
        .state_config(after.as_str())
        .ok_or_else(|| ProviderError::UnknownAnchor {
            state: state.to_string(),
            after: after.to_string(),
        })?;

    if anchor.next_state_fn.is_some() {
        return Err(ProviderError::DynamicAnchor {
            state: state.to_string(),
            after: after.to_string(),
        });
    }

    let original_next = anchor
        .next_target()
        .cloned()
        .ok_or_else(|| ProviderError::NoNextTransition {
            state: state.to_string(),
            after: after.to_string(),
        })?;

    let anchor_cancel = anchor.transitions.get(&Action::CANCEL).cloned();

    let mut config = config
        .on(Action::NEXT, original_next.clone())
        .on(Action::SKIP, original_next)
        .can_skip(true);
    if config.can_cancel && !config.transitions.contains_key(&Action::CANCEL) {
        if let Some(target) = anchor_cancel {
            config = config.on(Action::CANCEL, target);
        }
    }
    dfa.add_state(state.clone(), config)?;

    if let Some(anchor) = dfa.state_config_mut(after.as_str()) {
        anchor.transitions.insert(Action::NEXT, state.clone());
    }
    Ok(())
}
