//! installkit
//!
//! Building blocks for installer wizards: a flat and a hierarchical wizard
//! state machine, providers that assemble standard installer flows (and let
//! new screens be spliced into them), and a driver that runs state handlers
//! around every transition.

pub mod cli;
pub mod config;
pub mod driver;
pub mod error;
pub mod logging;
pub mod provider;
pub mod wizard;

// Re-export main types for convenience
pub use config::InstallerConfig;
pub use driver::{DriverError, WizardDriver, WizardView};
pub use error::{InstallKitError, Result};
pub use provider::{
    ExtendedProvider, InstallContext, ProviderError, ProviderRegistry, StandardProvider,
    StateHandler, StateInsertion, UiMapping, WizardMode, WizardProvider,
};
pub use wizard::{
    Action, CompositeState, DataBag, Dfa, HierarchicalDfa, StateConfig, State, WizardError,
    WizardValue,
};
