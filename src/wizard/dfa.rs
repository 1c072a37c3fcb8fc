//! Flat wizard state machine
//!
//! A deterministic automaton over flat [`State`]s. Transitions are keyed by
//! [`Action`] and resolved through each state's explicit transition map, or a
//! dynamic next-state function when the map has no entry.
//!
//! # Guarantees
//!
//! - **Fail closed**: a target that is not registered is an error, never a move
//! - **Atomic**: a transition either applies fully (current state, history,
//!   callbacks) or leaves the engine exactly as it was
//! - **History-based back**: `back` pops the visited stack instead of
//!   consulting the transition map
//! - **Dry run**: state still moves, but every move and data write is recorded
//!   in the dry-run log for the caller to inspect

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::wizard::callbacks::Callbacks;
use crate::wizard::data::{DataBag, WizardValue};
use crate::wizard::error::WizardError;
use crate::wizard::state::{Action, State};

/// Validation run against the data bag before leaving a state via `next` or `skip`.
pub type ValidateFn = Arc<dyn Fn(&DataBag) -> anyhow::Result<()> + Send + Sync>;

/// Dynamic next-state resolution used when the transition map has no entry.
pub type NextStateFn = Arc<dyn Fn(&DataBag) -> Option<State> + Send + Sync>;

/// Per-state metadata: display name, capability flags and transitions.
#[derive(Clone)]
pub struct StateConfig {
    /// Display name
    pub name: String,
    pub can_go_next: bool,
    pub can_go_back: bool,
    pub can_cancel: bool,
    pub can_skip: bool,
    /// Explicit targets, keyed by action
    pub transitions: BTreeMap<Action, State>,
    /// Dynamic resolution. A state using this cannot have another state
    /// spliced in after it.
    pub next_state_fn: Option<NextStateFn>,
    pub validate: Option<ValidateFn>,
}

impl fmt::Debug for StateConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateConfig")
            .field("name", &self.name)
            .field("can_go_next", &self.can_go_next)
            .field("can_go_back", &self.can_go_back)
            .field("can_cancel", &self.can_cancel)
            .field("can_skip", &self.can_skip)
            .field("transitions", &self.transitions)
            .field("next_state_fn", &self.next_state_fn.is_some())
            .field("validate", &self.validate.is_some())
            .finish()
    }
}

impl StateConfig {
    /// New config that allows next, back and cancel but not skip.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            can_go_next: true,
            can_go_back: true,
            can_cancel: true,
            can_skip: false,
            transitions: BTreeMap::new(),
            next_state_fn: None,
            validate: None,
        }
    }

    /// Config for a terminal state: no outgoing actions.
    pub fn terminal(name: impl Into<String>) -> Self {
        Self {
            can_go_next: false,
            can_go_back: false,
            can_cancel: false,
            ..Self::new(name)
        }
    }

    /// Add an explicit transition.
    pub fn on(mut self, action: impl Into<Action>, target: impl Into<State>) -> Self {
        self.transitions.insert(action.into(), target.into());
        self
    }

    /// Shorthand for `.on(Action::NEXT, target)`.
    pub fn next_to(self, target: impl Into<State>) -> Self {
        self.on(Action::NEXT, target)
    }

    pub fn with_next_state_fn(
        mut self,
        f: impl Fn(&DataBag) -> Option<State> + Send + Sync + 'static,
    ) -> Self {
        self.next_state_fn = Some(Arc::new(f));
        self
    }

    pub fn with_validator(
        mut self,
        f: impl Fn(&DataBag) -> anyhow::Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.validate = Some(Arc::new(f));
        self
    }

    pub fn can_go_next(mut self, allowed: bool) -> Self {
        self.can_go_next = allowed;
        self
    }

    pub fn can_go_back(mut self, allowed: bool) -> Self {
        self.can_go_back = allowed;
        self
    }

    pub fn can_cancel(mut self, allowed: bool) -> Self {
        self.can_cancel = allowed;
        self
    }

    pub fn can_skip(mut self, allowed: bool) -> Self {
        self.can_skip = allowed;
        self
    }

    /// Target of `next` in the explicit map, if any
    pub fn next_target(&self) -> Option<&State> {
        self.transitions.get(&Action::NEXT)
    }

    /// Capability flag check for the canonical actions. Custom actions are
    /// governed by the transition map alone.
    pub fn permits(&self, action: &Action) -> bool {
        match action.as_str() {
            "next" => self.can_go_next,
            "back" => self.can_go_back,
            "skip" => self.can_skip,
            "cancel" => self.can_cancel,
            _ => true,
        }
    }

    /// Returns true when this state has no way out.
    pub fn is_terminal(&self) -> bool {
        !self.can_go_next
            && !self.can_go_back
            && !self.can_cancel
            && !self.can_skip
            && self.transitions.is_empty()
            && self.next_state_fn.is_none()
    }
}

/// Whether a committed move grows or shrinks the history stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HistoryOp {
    Push,
    Pop,
}

/// Saved position used to undo a move vetoed by a callback.
#[derive(Debug, Clone)]
pub(crate) struct Position {
    current: Option<State>,
    history: Vec<State>,
}

/// Flat wizard state machine.
///
/// # Example
///
/// ```
/// use installkit::wizard::{Dfa, StateConfig};
///
/// let mut dfa = Dfa::new();
/// dfa.add_state("welcome", StateConfig::new("Welcome").next_to("license")).unwrap();
/// dfa.add_state("license", StateConfig::new("License").next_to("complete")).unwrap();
/// dfa.add_state("complete", StateConfig::terminal("Complete")).unwrap();
///
/// dfa.next().unwrap();
/// assert_eq!(dfa.current_state().unwrap().as_str(), "license");
/// dfa.back().unwrap();
/// assert_eq!(dfa.current_state().unwrap().as_str(), "welcome");
/// ```
#[derive(Debug, Default)]
pub struct Dfa {
    states: HashMap<State, StateConfig>,
    /// Registration order
    order: Vec<State>,
    initial: Option<State>,
    current: Option<State>,
    history: Vec<State>,
    data: DataBag,
    dry_run: bool,
    dry_run_log: Vec<String>,
    callbacks: Callbacks,
}

fn name_of(state: &Option<State>) -> &str {
    state.as_ref().map(State::as_str).unwrap_or("")
}

impl Dfa {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a state. The first state registered becomes the initial and
    /// current state.
    ///
    /// # Errors
    ///
    /// - `DuplicateState` if the state is already registered
    pub fn add_state(
        &mut self,
        state: impl Into<State>,
        config: StateConfig,
    ) -> Result<(), WizardError> {
        let state = state.into();
        if self.states.contains_key(&state) {
            return Err(WizardError::DuplicateState(state.to_string()));
        }

        if self.initial.is_none() {
            self.initial = Some(state.clone());
            self.current = Some(state.clone());
        }
        self.order.push(state.clone());
        self.states.insert(state, config);
        Ok(())
    }

    /// Choose the initial state explicitly. If no navigation has happened yet
    /// the current state moves there as well.
    pub fn set_initial_state(&mut self, state: impl Into<State>) -> Result<(), WizardError> {
        let state = state.into();
        if !self.states.contains_key(&state) {
            return Err(WizardError::UnknownState(state.to_string()));
        }
        if self.history.is_empty() {
            self.current = Some(state.clone());
        }
        self.initial = Some(state);
        Ok(())
    }

    #[inline]
    pub fn current_state(&self) -> Option<&State> {
        self.current.as_ref()
    }

    #[inline]
    pub fn initial_state(&self) -> Option<&State> {
        self.initial.as_ref()
    }

    /// Registered states in registration order
    pub fn states(&self) -> &[State] {
        &self.order
    }

    pub fn has_state(&self, state: &str) -> bool {
        self.states.contains_key(state)
    }

    pub fn state_config(&self, state: &str) -> Option<&StateConfig> {
        self.states.get(state)
    }

    pub(crate) fn state_config_mut(&mut self, state: &str) -> Option<&mut StateConfig> {
        self.states.get_mut(state)
    }

    /// Config of the current state
    pub fn current_config(&self) -> Option<&StateConfig> {
        self.current.as_ref().and_then(|s| self.states.get(s))
    }

    /// True iff `transition(action)` would succeed with the current data
    /// (callback vetoes aside).
    pub fn can_transition(&self, action: impl Into<Action>) -> bool {
        let action = action.into();
        if action == Action::BACK {
            return self.resolve_back().is_ok();
        }
        self.resolve(&action).is_ok()
    }

    /// Every action `can_transition` currently accepts: the canonical four
    /// followed by custom actions from the transition map.
    pub fn available_actions(&self) -> Vec<Action> {
        let mut candidates = vec![Action::NEXT, Action::BACK, Action::SKIP, Action::CANCEL];
        if let Some(config) = self.current_config() {
            candidates.extend(
                config
                    .transitions
                    .keys()
                    .filter(|a| !a.is_canonical())
                    .cloned(),
            );
        }
        candidates
            .into_iter()
            .filter(|a| self.can_transition(a.clone()))
            .collect()
    }

    /// Resolve the target of `action` from the current state without moving.
    ///
    /// Checks, in order: capability flag, target resolution (explicit map,
    /// then next-state function), target registration, and for `next`/`skip`
    /// the state's validator.
    pub(crate) fn resolve(&self, action: &Action) -> Result<(State, State), WizardError> {
        let from = self.current.clone().ok_or(WizardError::Empty)?;
        let config = self
            .states
            .get(&from)
            .ok_or_else(|| WizardError::UnknownState(from.to_string()))?;

        if !config.permits(action) {
            return Err(WizardError::ActionNotPermitted {
                state: from.to_string(),
                action: action.to_string(),
            });
        }

        let target = config
            .transitions
            .get(action)
            .cloned()
            .or_else(|| config.next_state_fn.as_ref().and_then(|f| f(&self.data)))
            .ok_or_else(|| WizardError::NoTransition {
                state: from.to_string(),
                action: action.to_string(),
            })?;

        if !self.states.contains_key(&target) {
            return Err(WizardError::UnknownState(target.to_string()));
        }

        if *action == Action::NEXT || *action == Action::SKIP {
            if let Some(validate) = &config.validate {
                validate(&self.data).map_err(|e| WizardError::Validation {
                    state: from.to_string(),
                    message: format!("{e:#}"),
                })?;
            }
        }

        Ok((from, target))
    }

    pub(crate) fn resolve_back(&self) -> Result<(State, State), WizardError> {
        let from = self.current.clone().ok_or(WizardError::Empty)?;
        let config = self
            .states
            .get(&from)
            .ok_or_else(|| WizardError::UnknownState(from.to_string()))?;

        if !config.can_go_back {
            return Err(WizardError::ActionNotPermitted {
                state: from.to_string(),
                action: Action::BACK.to_string(),
            });
        }

        let target = self.history.last().cloned().ok_or(WizardError::NoHistory)?;
        Ok((from, target))
    }

    /// Perform `action` from the current state and return the new state.
    ///
    /// On a validation failure `on_validation_error` fires and nothing changes.
    /// On success the order is `on_leave(from)`, move + history push,
    /// `on_enter(to)`, `on_transition(from, to, action)`. A failing hook
    /// undoes the move.
    pub fn transition(&mut self, action: impl Into<Action>) -> Result<State, WizardError> {
        let action = action.into();
        if action == Action::BACK {
            return self.back();
        }

        let (from, target) = match self.resolve(&action) {
            Ok(pair) => pair,
            Err(err) => {
                if err.is_validation() {
                    self.callbacks.validation_error(name_of(&self.current), &err);
                }
                return Err(err);
            }
        };

        self.commit(from, target, &action, HistoryOp::Push)
    }

    pub fn next(&mut self) -> Result<State, WizardError> {
        self.transition(Action::NEXT)
    }

    /// Return to the most recently visited state.
    ///
    /// # Errors
    ///
    /// - `ActionNotPermitted` if the current state forbids going back
    /// - `NoHistory` if nothing has been visited yet
    pub fn back(&mut self) -> Result<State, WizardError> {
        let (from, target) = self.resolve_back()?;
        self.commit(from, target, &Action::BACK, HistoryOp::Pop)
    }

    pub fn skip(&mut self) -> Result<State, WizardError> {
        self.transition(Action::SKIP)
    }

    pub fn cancel(&mut self) -> Result<State, WizardError> {
        self.transition(Action::CANCEL)
    }

    fn commit(
        &mut self,
        from: State,
        target: State,
        action: &Action,
        op: HistoryOp,
    ) -> Result<State, WizardError> {
        self.callbacks.leave(from.as_str())?;

        let saved = self.position();
        self.move_to(target.clone(), op);

        if let Err(err) = self
            .callbacks
            .arrive(from.as_str(), target.as_str(), action.as_str())
        {
            self.restore(saved);
            return Err(err);
        }

        self.record(format!("transition: {from} -> {target} ({action})"));
        Ok(target)
    }

    /// Move without checks or callbacks. Callers have already resolved the target.
    pub(crate) fn move_to(&mut self, target: State, op: HistoryOp) {
        match op {
            HistoryOp::Push => {
                if let Some(current) = self.current.take() {
                    self.history.push(current);
                }
            }
            HistoryOp::Pop => {
                self.history.pop();
            }
        }
        self.current = Some(target);
    }

    pub(crate) fn position(&self) -> Position {
        Position {
            current: self.current.clone(),
            history: self.history.clone(),
        }
    }

    pub(crate) fn restore(&mut self, position: Position) {
        self.current = position.current;
        self.history = position.history;
    }

    /// Write a value into the data bag and fire `on_data_change`.
    ///
    /// Values for well-known keys are checked against their expected kind.
    pub fn set_data(
        &mut self,
        key: impl Into<String>,
        value: impl Into<WizardValue>,
    ) -> Result<(), WizardError> {
        let key = key.into();
        let value = value.into();

        let old = self.data.insert(key.clone(), value.clone())?;
        if let Err(err) =
            self.callbacks
                .data_change(name_of(&self.current), &key, old.as_ref(), &value)
        {
            self.data.restore(&key, old);
            return Err(err);
        }

        self.record(format!("set data: {key} = {value}"));
        Ok(())
    }

    pub fn get_data(&self, key: &str) -> Option<&WizardValue> {
        self.data.get(key)
    }

    /// Borrow the whole data bag.
    pub fn data(&self) -> &DataBag {
        &self.data
    }

    /// Snapshot of the data bag
    pub fn all_data(&self) -> DataBag {
        self.data.clone()
    }

    pub(crate) fn data_mut(&mut self) -> &mut DataBag {
        &mut self.data
    }

    /// Visited states, oldest first
    pub fn history(&self) -> &[State] {
        &self.history
    }

    pub fn can_go_back(&self) -> bool {
        self.resolve_back().is_ok()
    }

    /// Clear history and data and return to the initial state.
    ///
    /// The dry-run log is append-only and survives a reset.
    pub fn reset(&mut self) {
        self.history.clear();
        self.data.clear();
        self.current = self.initial.clone();
    }

    pub fn set_dry_run(&mut self, enabled: bool) {
        self.dry_run = enabled;
    }

    #[inline]
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn dry_run_log(&self) -> &[String] {
        &self.dry_run_log
    }

    /// Install observer hooks, replacing any previous set.
    pub fn set_callbacks(&mut self, callbacks: Callbacks) {
        self.callbacks = callbacks;
    }

    fn record(&mut self, entry: String) {
        if self.dry_run {
            self.dry_run_log.push(format!("[DRY RUN] {entry}"));
        }
    }
}
