//! Observer hooks fired by the wizard engines.
//!
//! States are reported by their string form so the hierarchical engine can
//! report composite positions (`license.reading`) through the same hooks.
//! Any hook except `on_validation_error` may veto a transition by returning an
//! error; the engine then rolls back and returns `WizardError::Callback`.

use crate::wizard::data::WizardValue;
use crate::wizard::error::WizardError;

pub type StateHook = Box<dyn FnMut(&str) -> anyhow::Result<()> + Send>;
pub type TransitionHook = Box<dyn FnMut(&str, &str, &str) -> anyhow::Result<()> + Send>;
pub type DataChangeHook =
    Box<dyn FnMut(&str, &str, Option<&WizardValue>, &WizardValue) -> anyhow::Result<()> + Send>;
pub type ValidationErrorHook = Box<dyn FnMut(&str, &WizardError) + Send>;

/// Set of optional observer hooks. Build with the chained setters:
///
/// ```
/// use installkit::wizard::Callbacks;
///
/// let callbacks = Callbacks::new()
///     .on_transition(|from, to, action| {
///         println!("{from} -> {to} ({action})");
///         Ok(())
///     });
/// ```
#[derive(Default)]
pub struct Callbacks {
    on_enter: Option<StateHook>,
    on_leave: Option<StateHook>,
    on_transition: Option<TransitionHook>,
    on_data_change: Option<DataChangeHook>,
    on_validation_error: Option<ValidationErrorHook>,
}

impl std::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_enter", &self.on_enter.is_some())
            .field("on_leave", &self.on_leave.is_some())
            .field("on_transition", &self.on_transition.is_some())
            .field("on_data_change", &self.on_data_change.is_some())
            .field("on_validation_error", &self.on_validation_error.is_some())
            .finish()
    }
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called with the state being entered.
    pub fn on_enter(mut self, hook: impl FnMut(&str) -> anyhow::Result<()> + Send + 'static) -> Self {
        self.on_enter = Some(Box::new(hook));
        self
    }

    /// Called with the state being left, before anything changes.
    pub fn on_leave(mut self, hook: impl FnMut(&str) -> anyhow::Result<()> + Send + 'static) -> Self {
        self.on_leave = Some(Box::new(hook));
        self
    }

    /// Called with `(from, to, action)` once the move is applied.
    pub fn on_transition(
        mut self,
        hook: impl FnMut(&str, &str, &str) -> anyhow::Result<()> + Send + 'static,
    ) -> Self {
        self.on_transition = Some(Box::new(hook));
        self
    }

    /// Called with `(state, key, old, new)` after a data write.
    pub fn on_data_change(
        mut self,
        hook: impl FnMut(&str, &str, Option<&WizardValue>, &WizardValue) -> anyhow::Result<()>
        + Send
        + 'static,
    ) -> Self {
        self.on_data_change = Some(Box::new(hook));
        self
    }

    /// Informational: called when validation rejects a transition.
    pub fn on_validation_error(
        mut self,
        hook: impl FnMut(&str, &WizardError) + Send + 'static,
    ) -> Self {
        self.on_validation_error = Some(Box::new(hook));
        self
    }

    pub(crate) fn enter(&mut self, state: &str) -> Result<(), WizardError> {
        match self.on_enter.as_mut() {
            Some(hook) => hook(state).map_err(|e| WizardError::callback("on_enter", e)),
            None => Ok(()),
        }
    }

    pub(crate) fn leave(&mut self, state: &str) -> Result<(), WizardError> {
        match self.on_leave.as_mut() {
            Some(hook) => hook(state).map_err(|e| WizardError::callback("on_leave", e)),
            None => Ok(()),
        }
    }

    pub(crate) fn transition(&mut self, from: &str, to: &str, action: &str) -> Result<(), WizardError> {
        match self.on_transition.as_mut() {
            Some(hook) => hook(from, to, action).map_err(|e| WizardError::callback("on_transition", e)),
            None => Ok(()),
        }
    }

    pub(crate) fn data_change(
        &mut self,
        state: &str,
        key: &str,
        old: Option<&WizardValue>,
        new: &WizardValue,
    ) -> Result<(), WizardError> {
        match self.on_data_change.as_mut() {
            Some(hook) => {
                hook(state, key, old, new).map_err(|e| WizardError::callback("on_data_change", e))
            }
            None => Ok(()),
        }
    }

    pub(crate) fn validation_error(&mut self, state: &str, err: &WizardError) {
        if let Some(hook) = self.on_validation_error.as_mut() {
            hook(state, err);
        }
    }

    /// Fire the entry side of a move: `on_enter(to)` then `on_transition`.
    pub(crate) fn arrive(&mut self, from: &str, to: &str, action: &str) -> Result<(), WizardError> {
        self.enter(to)?;
        self.transition(from, to, action)
    }
}
