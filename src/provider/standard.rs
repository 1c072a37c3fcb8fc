//! Standard installer flow
//!
//! ```text
//! welcome -> license -> components -> location -> ready -> installing -> complete
//!                                                              |
//!                                                            fail
//!                                                              v
//!            (cancel from any pre-install screen)  ------>  rollback <- error
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::InstallerConfig;
use crate::provider::handler::{
    ComponentsHandler, InstallingHandler, LicenseHandler, LocationHandler, PassiveHandler,
    RollbackHandler, StateHandler,
};
use crate::provider::ui::{UiComponent, UiMapping};
use crate::provider::{InstallContext, ProviderError, WizardMode, WizardProvider};
use crate::wizard::{Action, Dfa, State, StateConfig};

/// State identifiers of the standard flow
pub mod states {
    use crate::wizard::State;

    pub const WELCOME: State = State::from_static("welcome");
    pub const LICENSE: State = State::from_static("license");
    pub const COMPONENTS: State = State::from_static("components");
    pub const LOCATION: State = State::from_static("location");
    pub const READY: State = State::from_static("ready");
    pub const INSTALLING: State = State::from_static("installing");
    pub const COMPLETE: State = State::from_static("complete");
    pub const ERROR: State = State::from_static("error");
    pub const ROLLBACK: State = State::from_static("rollback");
}

/// Custom action taken from `installing` when the install fails
pub const FAIL: &str = "fail";

/// Engine, handlers and UI descriptors of a flow under construction
pub(crate) struct FlowAssembly {
    pub(crate) dfa: Dfa,
    pub(crate) handlers: HashMap<State, Arc<dyn StateHandler>>,
    pub(crate) ui: HashMap<State, UiMapping>,
}

impl FlowAssembly {
    fn new(dry_run: bool) -> Self {
        let mut dfa = Dfa::new();
        dfa.set_dry_run(dry_run);
        Self {
            dfa,
            handlers: HashMap::new(),
            ui: HashMap::new(),
        }
    }

    /// Register a state, wiring the handler's `validate` in as the state's
    /// validator unless one is already set.
    fn add(
        &mut self,
        state: State,
        config: StateConfig,
        handler: Arc<dyn StateHandler>,
        ui: UiMapping,
    ) -> Result<(), ProviderError> {
        self.dfa.add_state(state.clone(), with_handler_validation(config, &handler))?;
        self.handlers.insert(state.clone(), handler);
        self.ui.insert(state, ui);
        Ok(())
    }

    pub(crate) fn register(&mut self, state: State, handler: Arc<dyn StateHandler>, ui: UiMapping) {
        self.handlers.insert(state.clone(), handler);
        self.ui.insert(state, ui);
    }
}

pub(crate) fn with_handler_validation(
    config: StateConfig,
    handler: &Arc<dyn StateHandler>,
) -> StateConfig {
    if config.validate.is_some() {
        return config;
    }
    let handler = Arc::clone(handler);
    config.with_validator(move |data| handler.validate(data))
}

/// The built-in linear installer flow
#[derive(Default)]
pub struct StandardProvider {
    config: Option<InstallerConfig>,
    dfa: Option<Dfa>,
    handlers: HashMap<State, Arc<dyn StateHandler>>,
    ui: HashMap<State, UiMapping>,
}

impl StandardProvider {
    pub const NAME: &'static str = "standard";

    pub fn new() -> Self {
        Self::default()
    }

    /// Build the standard flow without touching any provider.
    pub(crate) fn assemble(
        config: &InstallerConfig,
        context: &InstallContext,
    ) -> Result<FlowAssembly, ProviderError> {
        use states::*;

        let mut flow = FlowAssembly::new(context.dry_run);
        let passive: Arc<dyn StateHandler> = Arc::new(PassiveHandler);

        flow.add(
            WELCOME,
            StateConfig::new("Welcome")
                .next_to(LICENSE)
                .on(Action::CANCEL, ROLLBACK)
                .can_go_back(false),
            Arc::clone(&passive),
            UiMapping::new(format!("Welcome to {}", config.window_title()), UiComponent::Welcome)
                .with_description(format!(
                    "This wizard installs {} {}.",
                    config.app_name, config.app_version
                ))
                .without_back(),
        )?;

        let license_title = config
            .license
            .as_ref()
            .map_or("License Agreement", |l| l.title.as_str());
        flow.add(
            LICENSE,
            StateConfig::new("License")
                .next_to(COMPONENTS)
                .on(Action::CANCEL, ROLLBACK),
            Arc::new(LicenseHandler::new(config)),
            UiMapping::new(license_title, UiComponent::License)
                .with_next_label("I Agree"),
        )?;

        flow.add(
            COMPONENTS,
            StateConfig::new("Components")
                .next_to(LOCATION)
                .on(Action::CANCEL, ROLLBACK),
            Arc::new(ComponentsHandler::new(config)),
            UiMapping::new("Select Components", UiComponent::ComponentList),
        )?;

        flow.add(
            LOCATION,
            StateConfig::new("Location")
                .next_to(READY)
                .on(Action::CANCEL, ROLLBACK),
            Arc::new(LocationHandler::new(config)),
            UiMapping::new("Installation Directory", UiComponent::DirectoryPicker),
        )?;

        flow.add(
            READY,
            StateConfig::new("Ready")
                .next_to(INSTALLING)
                .on(Action::CANCEL, ROLLBACK),
            Arc::clone(&passive),
            UiMapping::new("Ready to Install", UiComponent::Summary).with_next_label("Install"),
        )?;

        flow.add(
            INSTALLING,
            StateConfig::new("Installing")
                .next_to(COMPLETE)
                .on(FAIL, ERROR)
                .can_go_back(false)
                .can_cancel(false),
            Arc::new(InstallingHandler::new(config, context.platform.clone())),
            UiMapping::new(format!("Installing {}", config.app_name), UiComponent::Progress)
                .without_back()
                .without_cancel(),
        )?;

        flow.add(
            COMPLETE,
            StateConfig::terminal("Complete"),
            Arc::clone(&passive),
            UiMapping::new("Installation Complete", UiComponent::Finish)
                .with_next_label("Finish")
                .without_back()
                .without_cancel(),
        )?;

        flow.add(
            ERROR,
            StateConfig::new("Error")
                .next_to(ROLLBACK)
                .can_go_back(false)
                .can_cancel(false),
            Arc::clone(&passive),
            UiMapping::new("Installation Failed", UiComponent::Error)
                .with_next_label("Roll Back")
                .without_back()
                .without_cancel(),
        )?;

        flow.add(
            ROLLBACK,
            StateConfig::terminal("Rollback"),
            Arc::new(RollbackHandler::new(context.platform.clone())),
            UiMapping::new("Installation Cancelled", UiComponent::Rollback)
                .with_next_label("Close")
                .without_back()
                .without_cancel(),
        )?;

        Ok(flow)
    }

    /// Adopt a fully built flow, then check it.
    ///
    /// On failure the provider is left uninitialized.
    pub(crate) fn install(
        &mut self,
        config: &InstallerConfig,
        flow: FlowAssembly,
    ) -> Result<(), ProviderError> {
        self.config = Some(config.clone());
        self.dfa = Some(flow.dfa);
        self.handlers = flow.handlers;
        self.ui = flow.ui;

        if let Err(err) = self.validate_configuration() {
            *self = Self::default();
            return Err(err);
        }
        Ok(())
    }

    pub fn config(&self) -> Option<&InstallerConfig> {
        self.config.as_ref()
    }
}

pub(crate) fn check_config(config: &InstallerConfig) -> Result<(), ProviderError> {
    config
        .validate()
        .map_err(|e| ProviderError::InvalidConfiguration(format!("{e:#}")))
}

impl WizardProvider for StandardProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn mode(&self) -> WizardMode {
        WizardMode::Standard
    }

    fn initialize(
        &mut self,
        config: &InstallerConfig,
        context: &InstallContext,
    ) -> Result<(), ProviderError> {
        if self.is_initialized() {
            return Err(ProviderError::AlreadyInitialized(self.name().to_string()));
        }
        check_config(config)?;
        let flow = Self::assemble(config, context)?;
        self.install(config, flow)
    }

    fn is_initialized(&self) -> bool {
        self.dfa.is_some()
    }

    fn dfa(&self) -> Result<&Dfa, ProviderError> {
        self.dfa
            .as_ref()
            .ok_or_else(|| ProviderError::NotInitialized(Self::NAME.to_string()))
    }

    fn dfa_mut(&mut self) -> Result<&mut Dfa, ProviderError> {
        self.dfa
            .as_mut()
            .ok_or_else(|| ProviderError::NotInitialized(Self::NAME.to_string()))
    }

    fn state_handler(&self, state: &str) -> Option<Arc<dyn StateHandler>> {
        self.handlers.get(state).cloned()
    }

    fn ui_mapping(&self, state: &str) -> Option<&UiMapping> {
        self.ui.get(state)
    }

    fn validate_configuration(&self) -> Result<(), ProviderError> {
        let dfa = self.dfa()?;
        let config = self
            .config
            .as_ref()
            .ok_or_else(|| ProviderError::NotInitialized(Self::NAME.to_string()))?;
        check_config(config)?;

        for state in dfa.states() {
            if !self.handlers.contains_key(state) {
                return Err(ProviderError::InvalidConfiguration(format!(
                    "state '{state}' has no handler"
                )));
            }
            if !self.ui.contains_key(state) {
                return Err(ProviderError::InvalidConfiguration(format!(
                    "state '{state}' has no UI mapping"
                )));
            }
            if let Some(state_config) = dfa.state_config(state.as_str()) {
                for (action, target) in &state_config.transitions {
                    if !dfa.has_state(target.as_str()) {
                        return Err(ProviderError::InvalidConfiguration(format!(
                            "'{action}' from '{state}' leads to unregistered state '{target}'"
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::states::*;
    use super::*;
    use crate::wizard::WizardError;

    fn initialized() -> StandardProvider {
        let mut provider = StandardProvider::new();
        provider
            .initialize(&InstallerConfig::default(), &InstallContext::dry_run())
            .unwrap();
        provider
    }

    #[test]
    fn test_dfa_requires_initialization() {
        let provider = StandardProvider::new();
        assert_eq!(
            provider.dfa().unwrap_err(),
            ProviderError::NotInitialized("standard".into())
        );
        assert!(provider.current_state().is_none());
    }

    #[test]
    fn test_initialize_twice_fails() {
        let mut provider = initialized();
        let err = provider
            .initialize(&InstallerConfig::default(), &InstallContext::dry_run())
            .unwrap_err();
        assert!(matches!(err, ProviderError::AlreadyInitialized(_)));
    }

    #[test]
    fn test_invalid_config_leaves_provider_uninitialized() {
        let mut config = InstallerConfig::default();
        config.components.clear();
        let mut provider = StandardProvider::new();
        let err = provider
            .initialize(&config, &InstallContext::dry_run())
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidConfiguration(_)));
        assert!(!provider.is_initialized());
    }

    #[test]
    fn test_flow_shape() {
        let provider = initialized();
        let dfa = provider.dfa().unwrap();
        assert_eq!(dfa.current_state(), Some(&WELCOME));
        assert_eq!(dfa.states().len(), 9);
        assert!(dfa.state_config("complete").unwrap().is_terminal());
        assert!(dfa.state_config("rollback").unwrap().is_terminal());
        assert!(dfa.is_dry_run());
        provider.validate_configuration().unwrap();
    }

    #[test]
    fn test_every_state_has_handler_and_ui() {
        let provider = initialized();
        for state in provider.dfa().unwrap().states() {
            assert!(provider.state_handler(state.as_str()).is_some(), "{state}");
            assert!(provider.ui_mapping(state.as_str()).is_some(), "{state}");
        }
    }

    #[test]
    fn test_license_gates_next() {
        let mut provider = initialized();
        let dfa = provider.dfa_mut().unwrap();
        dfa.next().unwrap();
        assert_eq!(dfa.current_state(), Some(&LICENSE));

        let err = dfa.next().unwrap_err();
        assert!(matches!(err, WizardError::Validation { .. }));
        assert_eq!(dfa.current_state(), Some(&LICENSE));

        dfa.set_data("license_accepted", true).unwrap();
        assert_eq!(dfa.next().unwrap(), COMPONENTS);
    }

    #[test]
    fn test_cancel_routes_to_rollback() {
        let mut provider = initialized();
        let dfa = provider.dfa_mut().unwrap();
        assert_eq!(dfa.cancel().unwrap(), ROLLBACK);
        assert!(dfa.available_actions().is_empty());
    }

    #[test]
    fn test_installing_cannot_go_back_or_cancel() {
        let provider = initialized();
        let installing = provider.dfa().unwrap().state_config("installing").unwrap();
        assert!(!installing.can_go_back);
        assert!(!installing.can_cancel);
        assert_eq!(installing.transitions.get(&Action::custom(FAIL)), Some(&ERROR));
    }
}
