//! Wizard providers
//!
//! A provider owns a flat [`Dfa`] describing an installer flow, plus the
//! handler and UI descriptor for each of its states. Providers are built in
//! two steps: construction, then [`WizardProvider::initialize`] with the
//! installer description and runtime context. Accessing the engine before
//! initialization is an error.
//!
//! - [`StandardProvider`] - welcome, license, components, location, ready,
//!   installing, complete (plus error and rollback)
//! - [`ExtendedProvider`] - the standard flow with extra states spliced in
//! - [`ProviderRegistry`] - providers by name

pub mod extended;
pub mod handler;
pub mod insertion;
pub mod registry;
pub mod standard;
pub mod ui;

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use strum::{Display, EnumString};
use thiserror::Error;

use crate::config::InstallerConfig;
use crate::wizard::{Dfa, State, WizardError};

pub use extended::{ExtendedProvider, ThemeSelectionHandler};
pub use handler::{
    ComponentsHandler, HandlerContext, InstallingHandler, LicenseHandler, LocationHandler,
    PassiveHandler, RollbackHandler, StateHandler,
};
pub use insertion::{splice_state, StateInsertion};
pub use registry::{ProviderFactory, ProviderRegistry};
pub use standard::StandardProvider;
pub use ui::{UiComponent, UiMapping};

/// Errors raised while building or querying a provider
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Provider '{0}' has not been initialized")]
    NotInitialized(String),

    #[error("Provider '{0}' is already initialized")]
    AlreadyInitialized(String),

    #[error("Cannot insert '{state}': anchor state '{after}' is not registered")]
    UnknownAnchor { state: String, after: String },

    #[error("Cannot insert '{state}' after '{after}': the anchor resolves its next state dynamically")]
    DynamicAnchor { state: String, after: String },

    #[error("Cannot insert '{state}' after '{after}': the anchor has no next transition")]
    NoNextTransition { state: String, after: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Unknown provider '{0}'")]
    UnknownProvider(String),

    #[error("Provider '{0}' is already registered")]
    DuplicateProvider(String),

    #[error(transparent)]
    Wizard(#[from] WizardError),
}

/// Which family of flow a provider builds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum WizardMode {
    Standard,
    Extended,
}

/// What the installing state asks the platform to do
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallRequest {
    pub app_name: String,
    pub app_version: String,
    pub install_path: PathBuf,
    pub components: Vec<String>,
}

/// Platform-specific installation backend.
///
/// Only ever invoked from a handler's `execute` hook, which the driver skips
/// in dry-run mode.
pub trait PlatformInstaller: Send + Sync {
    fn install(&self, request: &InstallRequest) -> anyhow::Result<()>;

    /// Undo a partial or complete install. Must succeed when nothing was installed.
    fn rollback(&self) -> anyhow::Result<()>;
}

/// Runtime settings passed to [`WizardProvider::initialize`]
#[derive(Clone, Default)]
pub struct InstallContext {
    pub dry_run: bool,
    pub platform: Option<Arc<dyn PlatformInstaller>>,
}

impl fmt::Debug for InstallContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstallContext")
            .field("dry_run", &self.dry_run)
            .field("platform", &self.platform.is_some())
            .finish()
    }
}

impl InstallContext {
    pub fn dry_run() -> Self {
        Self {
            dry_run: true,
            platform: None,
        }
    }

    pub fn with_platform(platform: Arc<dyn PlatformInstaller>) -> Self {
        Self {
            dry_run: false,
            platform: Some(platform),
        }
    }
}

/// A named installer flow
pub trait WizardProvider: Send {
    fn name(&self) -> &str;

    fn mode(&self) -> WizardMode;

    /// Build the flow from `config`.
    ///
    /// # Errors
    ///
    /// - `AlreadyInitialized` on a second call
    /// - `InvalidConfiguration` if `config` or the resulting flow is inconsistent
    fn initialize(
        &mut self,
        config: &InstallerConfig,
        context: &InstallContext,
    ) -> Result<(), ProviderError>;

    fn is_initialized(&self) -> bool;

    fn dfa(&self) -> Result<&Dfa, ProviderError>;

    fn dfa_mut(&mut self) -> Result<&mut Dfa, ProviderError>;

    fn state_handler(&self, state: &str) -> Option<Arc<dyn StateHandler>>;

    fn ui_mapping(&self, state: &str) -> Option<&UiMapping>;

    /// Check the stored configuration and the built flow for consistency:
    /// every state has a handler and a UI mapping, and every explicit
    /// transition target is registered.
    fn validate_configuration(&self) -> Result<(), ProviderError>;

    /// Current state of the engine, once initialized
    fn current_state(&self) -> Option<State> {
        self.dfa().ok().and_then(|dfa| dfa.current_state().cloned())
    }
}
