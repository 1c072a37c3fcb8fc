//! Wizard driver
//!
//! Glue between a provider's engine and its state handlers. The engine only
//! moves between states; the driver runs the handler lifecycle around every
//! successful move:
//!
//! 1. `on_exit` on the state left
//! 2. `on_enter` on the state entered
//! 3. `execute` on the state entered (skipped in dry-run mode)
//!
//! A rejected transition runs no hooks at all. A failing hook is reported as
//! [`DriverError::Handler`]; the transition that preceded it stays committed.

use serde::Serialize;
use strum::IntoStaticStr;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::provider::{ProviderError, UiMapping, WizardProvider};
use crate::provider::handler::HandlerContext;
use crate::wizard::{Action, DataBag, Dfa, Shared, State, WizardError, WizardValue};

/// Errors raised while driving a wizard
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DriverError {
    #[error("Wizard has not been started")]
    NotStarted,

    #[error("{hook} hook of state '{state}' failed: {message}")]
    Handler {
        state: String,
        hook: &'static str,
        message: String,
    },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Wizard(#[from] WizardError),
}

impl DriverError {
    /// True when the user can fix the input and retry
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Wizard(err) if err.is_validation())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
enum Hook {
    OnEnter,
    Execute,
    OnExit,
}

/// Snapshot of the wizard for a front-end to render
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WizardView {
    pub state: String,
    pub ui: Option<UiMapping>,
    pub can_go_back: bool,
    pub can_go_next: bool,
    pub available_actions: Vec<String>,
    pub is_terminal: bool,
    pub dry_run: bool,
    pub data: DataBag,
}

/// Runs a provider's flow, invoking handlers around each transition
pub struct WizardDriver {
    provider: Box<dyn WizardProvider>,
    started: bool,
}

impl WizardDriver {
    /// Wrap an initialized provider.
    ///
    /// # Errors
    ///
    /// - `Provider(NotInitialized)` if `initialize` has not been called
    pub fn new(provider: Box<dyn WizardProvider>) -> Result<Self, DriverError> {
        provider.dfa()?;
        Ok(Self {
            provider,
            started: false,
        })
    }

    pub fn provider(&self) -> &dyn WizardProvider {
        self.provider.as_ref()
    }

    pub fn dfa(&self) -> Result<&Dfa, DriverError> {
        Ok(self.provider.dfa()?)
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Enter the initial state. Calling it again is a no-op.
    pub fn start(&mut self) -> Result<WizardView, DriverError> {
        if !self.started {
            let state = self.current()?;
            info!(provider = self.provider.name(), state = %state, "starting wizard");
            self.started = true;
            self.run_hook(&state, Hook::OnEnter)?;
            self.run_hook(&state, Hook::Execute)?;
        }
        self.view()
    }

    pub fn next(&mut self) -> Result<WizardView, DriverError> {
        self.perform(Action::NEXT)
    }

    pub fn back(&mut self) -> Result<WizardView, DriverError> {
        self.perform(Action::BACK)
    }

    pub fn skip(&mut self) -> Result<WizardView, DriverError> {
        self.perform(Action::SKIP)
    }

    pub fn cancel(&mut self) -> Result<WizardView, DriverError> {
        self.perform(Action::CANCEL)
    }

    /// Apply `action` and run the handler lifecycle.
    ///
    /// # Errors
    ///
    /// - `NotStarted` before [`start`](Self::start)
    /// - `Wizard(..)` if the engine rejects the transition; nothing changes
    /// - `Handler { .. }` if a hook fails after the move
    pub fn perform(&mut self, action: impl Into<Action>) -> Result<WizardView, DriverError> {
        if !self.started {
            return Err(DriverError::NotStarted);
        }
        let action = action.into();
        let from = self.current()?;

        let to = match self.provider.dfa_mut()?.transition(action.clone()) {
            Ok(to) => to,
            Err(err) => {
                warn!(state = %from, action = %action, error = %err, "transition rejected");
                return Err(err.into());
            }
        };
        debug!(from = %from, to = %to, action = %action, "transition");

        self.run_hook(&from, Hook::OnExit)?;
        self.run_hook(&to, Hook::OnEnter)?;
        self.run_hook(&to, Hook::Execute)?;
        self.view()
    }

    pub fn set_data(
        &mut self,
        key: impl Into<String>,
        value: impl Into<WizardValue>,
    ) -> Result<(), DriverError> {
        self.provider.dfa_mut()?.set_data(key, value)?;
        Ok(())
    }

    /// Whether the current state has no way out
    pub fn is_finished(&self) -> bool {
        self.provider
            .dfa()
            .ok()
            .and_then(Dfa::current_config)
            .is_some_and(|config| config.is_terminal())
    }

    pub fn view(&self) -> Result<WizardView, DriverError> {
        let dfa = self.provider.dfa()?;
        let state = dfa.current_state().ok_or(WizardError::Empty)?;
        let config = dfa.current_config();

        Ok(WizardView {
            state: state.to_string(),
            ui: self.provider.ui_mapping(state.as_str()).cloned(),
            can_go_back: dfa.can_go_back(),
            can_go_next: dfa.can_transition(Action::NEXT),
            available_actions: dfa
                .available_actions()
                .iter()
                .map(|a| a.to_string())
                .collect(),
            is_terminal: config.is_some_and(|c| c.is_terminal()),
            dry_run: dfa.is_dry_run(),
            data: dfa.all_data(),
        })
    }

    /// Move the driver behind a mutex for use from several threads.
    pub fn into_shared(self) -> Shared<Self> {
        Shared::new(self)
    }

    fn current(&self) -> Result<State, DriverError> {
        let dfa = self.provider.dfa()?;
        Ok(dfa.current_state().cloned().ok_or(WizardError::Empty)?)
    }

    fn run_hook(&mut self, state: &State, hook: Hook) -> Result<(), DriverError> {
        let Some(handler) = self.provider.state_handler(state.as_str()) else {
            return Ok(());
        };
        let dfa = self.provider.dfa_mut()?;

        if hook == Hook::Execute && dfa.is_dry_run() {
            debug!(state = %state, "dry run: execute skipped");
            return Ok(());
        }

        let mut ctx = HandlerContext::for_state(dfa, state.clone());
        let result = match hook {
            Hook::OnEnter => handler.on_enter(&mut ctx),
            Hook::Execute => handler.execute(&mut ctx),
            Hook::OnExit => handler.on_exit(&mut ctx),
        };

        result.map_err(|err| {
            let hook: &'static str = hook.into();
            warn!(state = %state, hook, error = %format!("{err:#}"), "handler failed");
            DriverError::Handler {
                state: state.to_string(),
                hook,
                message: format!("{err:#}"),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InstallerConfig;
    use crate::provider::{InstallContext, StandardProvider};

    fn driver(context: InstallContext) -> WizardDriver {
        let mut provider = StandardProvider::new();
        provider
            .initialize(&InstallerConfig::default(), &context)
            .unwrap();
        WizardDriver::new(Box::new(provider)).unwrap()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    #[test]
    fn test_uninitialized_provider_rejected() {
        let err = WizardDriver::new(Box::new(StandardProvider::new())).err().unwrap();
        assert!(matches!(err, DriverError::Provider(ProviderError::NotInitialized(_))));
    }

    #[test]
    fn test_perform_before_start() {
        let mut driver = driver(InstallContext::dry_run());
        assert_eq!(driver.next().unwrap_err(), DriverError::NotStarted);
    }

    #[test]
    fn test_enter_seeds_defaults() {
        let mut driver = driver(InstallContext::dry_run());
        driver.start().unwrap();
        let view = driver.next().unwrap();
        assert_eq!(view.state, "license");
        assert_eq!(view.data.get_bool("license_accepted"), Some(false));
        assert!(!view.can_go_next);

        driver.set_data("license_accepted", true).unwrap();
        let view = driver.next().unwrap();
        assert_eq!(view.state, "components");
        assert_eq!(
            view.data.get_text_list("selected_components"),
            Some(vec!["core", "docs"])
        );
    }

    #[test]
    fn test_rejected_transition_is_validation() {
        let mut driver = driver(InstallContext::dry_run());
        driver.start().unwrap();
        driver.next().unwrap();
        let err = driver.next().unwrap_err();
        assert!(err.is_validation());
        assert_eq!(driver.view().unwrap().state, "license");
    }

    // ========================================================================
    // Execute
    // ========================================================================

    #[test]
    fn test_installing_without_platform_reports_handler_error() {
        let mut driver = driver(InstallContext::default());
        driver.start().unwrap();
        driver.next().unwrap();
        driver.set_data("license_accepted", true).unwrap();
        driver.next().unwrap();
        driver.next().unwrap();
        driver.next().unwrap();

        let err = driver.next().unwrap_err();
        assert!(matches!(
            err,
            DriverError::Handler { ref state, hook: "execute", .. } if state == "installing"
        ));
        // the move itself stays committed
        assert_eq!(driver.view().unwrap().state, "installing");
        assert!(driver.perform("fail").is_ok());
        assert_eq!(driver.view().unwrap().state, "error");
    }

    #[test]
    fn test_view_of_finished_flow() {
        let mut driver = driver(InstallContext::dry_run());
        driver.start().unwrap();
        let view = driver.cancel().unwrap();
        assert_eq!(view.state, "rollback");
        assert!(view.is_terminal);
        assert!(view.available_actions.is_empty());
        assert!(driver.is_finished());
    }
}
