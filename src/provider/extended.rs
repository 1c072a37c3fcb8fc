//! Extended installer flow
//!
//! The standard flow with extra states spliced in. Insertions are queued
//! before [`WizardProvider::initialize`] and applied once, in the order they
//! were registered. Inserting twice after the same anchor therefore places
//! the later state first: `A -> second -> first -> B`.

use anyhow::{bail, Context};
use std::sync::Arc;

use crate::config::{InstallerConfig, ThemeSelectionConfig};
use crate::provider::handler::{HandlerContext, StateHandler};
use crate::provider::insertion::{splice_state, StateInsertion};
use crate::provider::standard::{check_config, with_handler_validation, StandardProvider};
use crate::provider::ui::{UiComponent, UiMapping};
use crate::provider::{InstallContext, ProviderError, WizardMode, WizardProvider};
use crate::wizard::{DataBag, Dfa, KnownKey, State, StateConfig};

/// Identifier of the theme selection screen
pub const THEME_SELECTION: State = State::from_static("theme_selection");

/// Seeds and validates the chosen theme.
#[derive(Debug, Clone)]
pub struct ThemeSelectionHandler {
    config: ThemeSelectionConfig,
}

impl ThemeSelectionHandler {
    pub fn new(config: ThemeSelectionConfig) -> Self {
        Self { config }
    }
}

impl StateHandler for ThemeSelectionHandler {
    fn on_enter(&self, ctx: &mut HandlerContext<'_>) -> anyhow::Result<()> {
        ctx.seed(KnownKey::Theme.as_str(), self.config.default_theme.clone())?;
        Ok(())
    }

    fn validate(&self, data: &DataBag) -> anyhow::Result<()> {
        let theme = data
            .get_str(KnownKey::Theme.as_str())
            .context("no theme selected")?;
        if !self.config.has_theme(theme) {
            bail!("unknown theme '{theme}'");
        }
        Ok(())
    }
}

fn theme_insertion(config: ThemeSelectionConfig) -> StateInsertion {
    let after = State::new(config.insert_after.clone());
    StateInsertion::new(
        THEME_SELECTION,
        after,
        StateConfig::new("Theme"),
        Arc::new(ThemeSelectionHandler::new(config)),
        UiMapping::new("Choose a Theme", UiComponent::ThemePicker),
    )
}

/// Standard flow plus caller-supplied states
#[derive(Default)]
pub struct ExtendedProvider {
    base: StandardProvider,
    insertions: Vec<StateInsertion>,
    theme_enabled: bool,
}

impl ExtendedProvider {
    pub const NAME: &'static str = "extended";

    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_not_initialized(&self) -> Result<(), ProviderError> {
        if self.base.is_initialized() {
            return Err(ProviderError::AlreadyInitialized(Self::NAME.to_string()));
        }
        Ok(())
    }

    /// Queue a state to be spliced in during initialization.
    ///
    /// # Errors
    ///
    /// - `AlreadyInitialized` once the flow has been built
    pub fn insert_custom_state(&mut self, insertion: StateInsertion) -> Result<(), ProviderError> {
        self.ensure_not_initialized()?;
        self.insertions.push(insertion);
        Ok(())
    }

    /// Queue the theme selection screen. Without this call, the screen is
    /// still added when the installer config carries a theme selection.
    pub fn enable_theme_selection(
        &mut self,
        config: ThemeSelectionConfig,
    ) -> Result<(), ProviderError> {
        self.ensure_not_initialized()?;
        if self.theme_enabled {
            return Ok(());
        }
        self.theme_enabled = true;
        self.insertions.push(theme_insertion(config));
        Ok(())
    }

    pub fn pending_insertions(&self) -> &[StateInsertion] {
        &self.insertions
    }
}

impl WizardProvider for ExtendedProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn mode(&self) -> WizardMode {
        WizardMode::Extended
    }

    fn initialize(
        &mut self,
        config: &InstallerConfig,
        context: &InstallContext,
    ) -> Result<(), ProviderError> {
        self.ensure_not_initialized()?;
        check_config(config)?;

        let mut insertions = self.insertions.clone();
        if !self.theme_enabled {
            if let Some(themes) = &config.theme_selection {
                insertions.push(theme_insertion(themes.clone()));
            }
        }

        let mut flow = StandardProvider::assemble(config, context)?;
        for insertion in insertions {
            let state_config = with_handler_validation(insertion.config, &insertion.handler);
            splice_state(&mut flow.dfa, &insertion.state, &insertion.after, state_config)?;
            flow.register(insertion.state, insertion.handler, insertion.ui);
        }

        self.base.install(config, flow)
    }

    fn is_initialized(&self) -> bool {
        self.base.is_initialized()
    }

    fn dfa(&self) -> Result<&Dfa, ProviderError> {
        self.base
            .dfa()
            .map_err(|_| ProviderError::NotInitialized(Self::NAME.to_string()))
    }

    fn dfa_mut(&mut self) -> Result<&mut Dfa, ProviderError> {
        self.base
            .dfa_mut()
            .map_err(|_| ProviderError::NotInitialized(Self::NAME.to_string()))
    }

    fn state_handler(&self, state: &str) -> Option<Arc<dyn StateHandler>> {
        self.base.state_handler(state)
    }

    fn ui_mapping(&self, state: &str) -> Option<&UiMapping> {
        self.base.ui_mapping(state)
    }

    fn validate_configuration(&self) -> Result<(), ProviderError> {
        self.base.validate_configuration()
    }
}
