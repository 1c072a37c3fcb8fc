//! Two-level wizard state machine
//!
//! Each main state (a wizard screen) owns an independent set of sub-states
//! (intra-screen interaction modes such as `reading` and `accepting` on a
//! license screen). The outer flow stays small and is driven exactly like the
//! flat [`Dfa`]; sub-states model the interaction inside one screen.
//!
//! # Rules
//!
//! - Sub-state navigation never changes the main state and is not recorded in
//!   history; only main-state moves can be undone with `go_back`
//! - Entering a main state (forward or by explicit jump) resets the sub-state
//!   to that main state's initial sub-state; going back restores the exact
//!   composite position that was left
//! - With `require_sub_state_completion`, `next` is refused until the current
//!   sub-state's completion predicate holds
//! - Observers see composite positions: `license.reading -> license.accepting`

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::wizard::callbacks::Callbacks;
use crate::wizard::data::{DataBag, WizardValue};
use crate::wizard::dfa::{Dfa, HistoryOp, StateConfig};
use crate::wizard::error::WizardError;
use crate::wizard::state::{Action, CompositeState, State, SubAction, SubState};

/// Completion predicate evaluated against the shared data bag.
pub type CompletionFn = Arc<dyn Fn(&DataBag) -> bool + Send + Sync>;

/// Action name reported to observers for explicit jumps.
const NAVIGATE: &str = "navigate";

/// Configuration of one sub-state.
#[derive(Clone, Default)]
pub struct SubStateConfig {
    pub name: String,
    pub description: String,
    /// Whitelist of sub-actions accepted while this sub-state is current
    pub allowed_actions: BTreeSet<SubAction>,
    /// Sub-state entered automatically after an allowed sub-action once this
    /// sub-state's completion predicate holds
    pub auto_transition_to: Option<SubState>,
    pub can_complete: Option<CompletionFn>,
}

impl fmt::Debug for SubStateConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubStateConfig")
            .field("name", &self.name)
            .field("allowed_actions", &self.allowed_actions)
            .field("auto_transition_to", &self.auto_transition_to)
            .field("can_complete", &self.can_complete.is_some())
            .finish()
    }
}

impl SubStateConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn allow(mut self, action: impl Into<SubAction>) -> Self {
        self.allowed_actions.insert(action.into());
        self
    }

    pub fn auto_transition_to(mut self, sub: impl Into<SubState>) -> Self {
        self.auto_transition_to = Some(sub.into());
        self
    }

    pub fn with_completion(mut self, f: impl Fn(&DataBag) -> bool + Send + Sync + 'static) -> Self {
        self.can_complete = Some(Arc::new(f));
        self
    }

    pub fn allows(&self, action: &SubAction) -> bool {
        self.allowed_actions.contains(action)
    }

    /// Completion check; vacuously true without a predicate.
    pub fn is_complete(&self, data: &DataBag) -> bool {
        self.can_complete.as_ref().is_none_or(|f| f(data))
    }
}

/// Configuration of one main state: its flat config plus sub-structure.
#[derive(Debug, Clone)]
pub struct MainStateConfig {
    pub state: StateConfig,
    /// Sub-states in insertion order
    pub sub_states: Vec<(SubState, SubStateConfig)>,
    /// Defaults to the first sub-state when unset
    pub initial_sub_state: Option<SubState>,
    pub require_sub_state_completion: bool,
}

impl MainStateConfig {
    pub fn new(state: StateConfig) -> Self {
        Self {
            state,
            sub_states: Vec::new(),
            initial_sub_state: None,
            require_sub_state_completion: false,
        }
    }

    pub fn with_sub_state(mut self, sub: impl Into<SubState>, config: SubStateConfig) -> Self {
        self.sub_states.push((sub.into(), config));
        self
    }

    pub fn initial_sub_state(mut self, sub: impl Into<SubState>) -> Self {
        self.initial_sub_state = Some(sub.into());
        self
    }

    pub fn require_completion(mut self, required: bool) -> Self {
        self.require_sub_state_completion = required;
        self
    }
}

#[derive(Debug, Default)]
struct MainEntry {
    order: Vec<SubState>,
    subs: HashMap<SubState, SubStateConfig>,
    initial: Option<SubState>,
    require_completion: bool,
}

impl MainEntry {
    /// Initial sub-state, if it has been registered
    fn entry_sub(&self) -> Option<SubState> {
        self.initial
            .as_ref()
            .filter(|sub| self.subs.contains_key(*sub))
            .cloned()
    }
}

/// Hierarchical wizard state machine.
///
/// # Example
///
/// ```
/// use installkit::wizard::{
///     HierarchicalDfa, MainStateConfig, StateConfig, SubStateConfig,
/// };
///
/// let mut wizard = HierarchicalDfa::new();
/// wizard
///     .add_main_state(
///         "license",
///         MainStateConfig::new(StateConfig::new("License").next_to("done"))
///             .with_sub_state("reading", SubStateConfig::new("Reading").allow("scroll"))
///             .with_sub_state(
///                 "accepting",
///                 SubStateConfig::new("Accepting")
///                     .with_completion(|d| d.get_bool("license_accepted") == Some(true)),
///             )
///             .require_completion(true),
///     )
///     .unwrap();
/// wizard
///     .add_main_state("done", MainStateConfig::new(StateConfig::terminal("Done")))
///     .unwrap();
///
/// wizard.navigate_to_sub_state("accepting").unwrap();
/// assert!(wizard.next().is_err());
/// wizard.set_data("license_accepted", true).unwrap();
/// assert_eq!(wizard.next().unwrap().to_string(), "done");
/// ```
#[derive(Debug, Default)]
pub struct HierarchicalDfa {
    dfa: Dfa,
    mains: HashMap<State, MainEntry>,
    current_sub: Option<SubState>,
    history: Vec<CompositeState>,
    dry_run: bool,
    dry_run_log: Vec<String>,
    callbacks: Callbacks,
}

/// Snapshot used to undo a main-state move vetoed by a callback.
struct Saved {
    position: crate::wizard::dfa::Position,
    sub: Option<SubState>,
    history: Vec<CompositeState>,
}

impl HierarchicalDfa {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a main state with its sub-states. The first main state added
    /// becomes current, positioned at its initial sub-state.
    pub fn add_main_state(
        &mut self,
        main: impl Into<State>,
        config: MainStateConfig,
    ) -> Result<(), WizardError> {
        let main = main.into();
        if self.mains.contains_key(&main) {
            return Err(WizardError::DuplicateState(main.to_string()));
        }

        let mut entry = MainEntry {
            require_completion: config.require_sub_state_completion,
            ..MainEntry::default()
        };
        for (sub, sub_config) in config.sub_states {
            if entry.subs.contains_key(&sub) {
                return Err(WizardError::DuplicateState(
                    CompositeState::with_sub(main.clone(), sub).to_string(),
                ));
            }
            entry.order.push(sub.clone());
            entry.subs.insert(sub, sub_config);
        }
        entry.initial = config
            .initial_sub_state
            .or_else(|| entry.order.first().cloned());

        self.dfa.add_state(main.clone(), config.state)?;
        if self.dfa.current_state() == Some(&main) {
            self.current_sub = entry.entry_sub();
        }
        self.mains.insert(main, entry);
        Ok(())
    }

    /// Register a sub-state under an existing main state.
    ///
    /// # Errors
    ///
    /// - `UnknownMainState` if `main` was never added
    /// - `DuplicateState` if `main.sub` already exists
    pub fn add_sub_state(
        &mut self,
        main: impl Into<State>,
        sub: impl Into<SubState>,
        config: SubStateConfig,
    ) -> Result<(), WizardError> {
        let main = main.into();
        let sub = sub.into();
        let entry = self
            .mains
            .get_mut(&main)
            .ok_or_else(|| WizardError::UnknownMainState(main.to_string()))?;

        if entry.subs.contains_key(&sub) {
            return Err(WizardError::DuplicateState(
                CompositeState::with_sub(main, sub).to_string(),
            ));
        }

        entry.order.push(sub.clone());
        entry.subs.insert(sub.clone(), config);
        if entry.initial.is_none() {
            entry.initial = Some(sub.clone());
        }

        let is_current = self.dfa.current_state() == Some(&main);
        if is_current && self.current_sub.is_none() && entry.initial.as_ref() == Some(&sub) {
            self.current_sub = Some(sub);
        }
        Ok(())
    }

    pub fn current_state(&self) -> Option<CompositeState> {
        self.dfa.current_state().map(|main| CompositeState {
            main: main.clone(),
            sub: self.current_sub.clone(),
        })
    }

    fn require_current(&self) -> Result<CompositeState, WizardError> {
        self.current_state().ok_or(WizardError::Empty)
    }

    /// Main states in registration order
    pub fn main_states(&self) -> &[State] {
        self.dfa.states()
    }

    /// Sub-states of `main` in registration order
    pub fn sub_states(&self, main: &str) -> Option<&[SubState]> {
        self.mains.get(main).map(|entry| entry.order.as_slice())
    }

    pub fn main_state_config(&self, main: &str) -> Option<&StateConfig> {
        self.dfa.state_config(main)
    }

    pub fn sub_state_config(&self, main: &str, sub: &str) -> Option<&SubStateConfig> {
        self.mains.get(main).and_then(|entry| entry.subs.get(sub))
    }

    fn current_sub_config(&self) -> Option<&SubStateConfig> {
        let main = self.dfa.current_state()?;
        let sub = self.current_sub.as_ref()?;
        self.sub_state_config(main.as_str(), sub.as_str())
    }

    /// Evaluate the current sub-state's completion predicate. True when there
    /// is no current sub-state or no predicate.
    pub fn can_complete_current_sub_state(&self) -> bool {
        self.current_sub_config()
            .is_none_or(|config| config.is_complete(self.dfa.data()))
    }

    fn completion_gate(&self, action: &Action) -> Result<(), WizardError> {
        if *action != Action::NEXT {
            return Ok(());
        }
        let requires = self
            .dfa
            .current_state()
            .and_then(|main| self.mains.get(main))
            .is_some_and(|entry| entry.require_completion);

        if requires && !self.can_complete_current_sub_state() {
            return Err(WizardError::SubStateIncomplete {
                state: self.require_current()?.to_string(),
            });
        }
        Ok(())
    }

    /// True iff `transition(action)` would succeed with the current data.
    pub fn can_transition(&self, action: impl Into<Action>) -> bool {
        let action = action.into();
        if action == Action::BACK {
            return self.can_go_back();
        }
        self.completion_gate(&action).is_ok() && self.dfa.resolve(&action).is_ok()
    }

    /// Perform a main-state transition.
    ///
    /// `next` is additionally gated on sub-state completion when the current
    /// main state requires it. The target is entered at its initial sub-state.
    pub fn transition(&mut self, action: impl Into<Action>) -> Result<CompositeState, WizardError> {
        let action = action.into();
        if action == Action::BACK {
            return self.go_back();
        }

        let resolved = self
            .completion_gate(&action)
            .and_then(|()| self.dfa.resolve(&action));
        let (_, target) = match resolved {
            Ok(pair) => pair,
            Err(err) => {
                if err.is_validation() {
                    let state = self.current_state().map(|c| c.to_string()).unwrap_or_default();
                    self.callbacks.validation_error(&state, &err);
                }
                return Err(err);
            }
        };

        let to = CompositeState {
            sub: self.mains.get(&target).and_then(MainEntry::entry_sub),
            main: target,
        };
        self.commit_main(to, action.as_str(), HistoryOp::Push)
    }

    pub fn next(&mut self) -> Result<CompositeState, WizardError> {
        self.transition(Action::NEXT)
    }

    pub fn back(&mut self) -> Result<CompositeState, WizardError> {
        self.go_back()
    }

    pub fn skip(&mut self) -> Result<CompositeState, WizardError> {
        self.transition(Action::SKIP)
    }

    pub fn cancel(&mut self) -> Result<CompositeState, WizardError> {
        self.transition(Action::CANCEL)
    }

    /// Jump straight to `main`, bypassing the transition map (menus, links).
    ///
    /// Pushes history and resets the sub-state like any forward move.
    pub fn navigate_to_main_state(
        &mut self,
        main: impl Into<State>,
    ) -> Result<CompositeState, WizardError> {
        let main = main.into();
        let entry = self
            .mains
            .get(&main)
            .ok_or_else(|| WizardError::UnknownMainState(main.to_string()))?;

        let to = CompositeState {
            sub: entry.entry_sub(),
            main,
        };
        self.commit_main(to, NAVIGATE, HistoryOp::Push)
    }

    /// Return to the previous main state, restoring the sub-state it was left in.
    pub fn go_back(&mut self) -> Result<CompositeState, WizardError> {
        self.dfa.resolve_back()?;
        let to = self.history.last().cloned().ok_or(WizardError::NoHistory)?;
        self.commit_main(to, Action::BACK.as_str(), HistoryOp::Pop)
    }

    pub fn can_go_back(&self) -> bool {
        self.dfa.can_go_back() && !self.history.is_empty()
    }

    fn commit_main(
        &mut self,
        to: CompositeState,
        action: &str,
        op: HistoryOp,
    ) -> Result<CompositeState, WizardError> {
        let from = self.require_current()?;
        let (from_name, to_name) = (from.to_string(), to.to_string());

        self.callbacks.leave(&from_name)?;

        let saved = Saved {
            position: self.dfa.position(),
            sub: self.current_sub.clone(),
            history: self.history.clone(),
        };

        self.dfa.move_to(to.main.clone(), op);
        match op {
            HistoryOp::Push => self.history.push(from),
            HistoryOp::Pop => {
                self.history.pop();
            }
        }
        self.current_sub = to.sub.clone();

        if let Err(err) = self.callbacks.arrive(&from_name, &to_name, action) {
            self.dfa.restore(saved.position);
            self.current_sub = saved.sub;
            self.history = saved.history;
            return Err(err);
        }

        self.record(format!("transition: {from_name} -> {to_name} ({action})"));
        Ok(to)
    }

    /// Move to another sub-state of the current main state.
    ///
    /// Not recorded in history.
    pub fn navigate_to_sub_state(
        &mut self,
        sub: impl Into<SubState>,
    ) -> Result<CompositeState, WizardError> {
        self.move_sub(sub.into(), NAVIGATE)
    }

    fn move_sub(&mut self, sub: SubState, action: &str) -> Result<CompositeState, WizardError> {
        let from = self.require_current()?;
        let known = self
            .mains
            .get(&from.main)
            .is_some_and(|entry| entry.subs.contains_key(&sub));
        if !known {
            return Err(WizardError::UnknownSubState {
                main: from.main.to_string(),
                sub: sub.to_string(),
            });
        }

        let to = CompositeState::with_sub(from.main.clone(), sub);
        let (from_name, to_name) = (from.to_string(), to.to_string());

        self.callbacks.leave(&from_name)?;
        let saved = std::mem::replace(&mut self.current_sub, to.sub.clone());
        if let Err(err) = self.callbacks.arrive(&from_name, &to_name, action) {
            self.current_sub = saved;
            return Err(err);
        }

        self.record(format!("sub-state: {from_name} -> {to_name} ({action})"));
        Ok(to)
    }

    /// Apply a sub-action to the current sub-state.
    ///
    /// Fails with `SubActionNotAllowed` unless the sub-state whitelists the
    /// action. If the sub-state has an auto-transition and its completion
    /// predicate now holds, the target sub-state is entered.
    ///
    /// Each accepted sub-action adds exactly one dry-run entry: `sub-action`
    /// when it stays put, or `sub-state: from -> to (action)` when it moves.
    pub fn handle_sub_action(
        &mut self,
        action: impl Into<SubAction>,
    ) -> Result<CompositeState, WizardError> {
        let action = action.into();
        let current = self.require_current()?;

        let config = self
            .current_sub_config()
            .filter(|config| config.allows(&action))
            .ok_or_else(|| WizardError::SubActionNotAllowed {
                state: current.to_string(),
                action: action.to_string(),
            })?;

        let auto = config
            .auto_transition_to
            .clone()
            .filter(|_| config.is_complete(self.dfa.data()));

        match auto {
            Some(target) => self.move_sub(target, action.as_str()),
            None => {
                self.record(format!("sub-action: {action} in {current}"));
                Ok(current)
            }
        }
    }

    /// Write a value into the shared data bag and fire `on_data_change`.
    pub fn set_data(
        &mut self,
        key: impl Into<String>,
        value: impl Into<WizardValue>,
    ) -> Result<(), WizardError> {
        let key = key.into();
        let value = value.into();
        let state = self.current_state().map(|c| c.to_string()).unwrap_or_default();

        let old = self.dfa.data_mut().insert(key.clone(), value.clone())?;
        if let Err(err) = self
            .callbacks
            .data_change(&state, &key, old.as_ref(), &value)
        {
            self.dfa.data_mut().restore(&key, old);
            return Err(err);
        }

        self.record(format!("set data: {key} = {value}"));
        Ok(())
    }

    pub fn get_data(&self, key: &str) -> Option<&WizardValue> {
        self.dfa.get_data(key)
    }

    pub fn data(&self) -> &DataBag {
        self.dfa.data()
    }

    pub fn all_data(&self) -> DataBag {
        self.dfa.all_data()
    }

    /// Visited composite positions, oldest first
    pub fn history(&self) -> &[CompositeState] {
        &self.history
    }

    /// Clear history and data, returning to the initial main state at its
    /// initial sub-state.
    pub fn reset(&mut self) {
        self.dfa.reset();
        self.history.clear();
        self.current_sub = self
            .dfa
            .current_state()
            .and_then(|main| self.mains.get(main))
            .and_then(MainEntry::entry_sub);
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

    pub fn set_callbacks(&mut self, callbacks: Callbacks) {
        self.callbacks = callbacks;
    }

    fn record(&mut self, entry: String) {
        if self.dry_run {
            self.dry_run_log.push(format!("[DRY RUN] {entry}"));
        }
    }
}
