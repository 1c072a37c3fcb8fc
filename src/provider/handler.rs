//! State handlers
//!
//! Business logic attached to a state. The driver calls `on_exit` on the state
//! being left and `on_enter` then `execute` on the state entered; `validate`
//! is wired into the state's validator so the engine itself refuses to leave
//! a state whose data is not acceptable.
//!
//! `execute` is the only hook allowed to have effects outside the wizard
//! (installing files, rolling back), and the driver never calls it in dry-run
//! mode.

use anyhow::{bail, Context};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::InstallerConfig;
use crate::provider::{InstallRequest, PlatformInstaller};
use crate::wizard::{DataBag, Dfa, KnownKey, State, WizardError, WizardValue};

/// Restricted view of the engine handed to handler hooks: data access only,
/// no navigation.
pub struct HandlerContext<'a> {
    dfa: &'a mut Dfa,
    state: Option<State>,
}

impl<'a> HandlerContext<'a> {
    /// Context for the engine's current state.
    pub fn new(dfa: &'a mut Dfa) -> Self {
        let state = dfa.current_state().cloned();
        Self { dfa, state }
    }

    /// Context for `state`, which need not be current. `on_exit` runs after
    /// the engine has already moved on.
    pub fn for_state(dfa: &'a mut Dfa, state: State) -> Self {
        Self {
            dfa,
            state: Some(state),
        }
    }

    /// State the hook is running for
    pub fn state(&self) -> Option<&State> {
        self.state.as_ref()
    }

    pub fn data(&self) -> &DataBag {
        self.dfa.data()
    }

    /// Write through the engine so observers see the change.
    pub fn set_data(
        &mut self,
        key: impl Into<String>,
        value: impl Into<WizardValue>,
    ) -> Result<(), WizardError> {
        self.dfa.set_data(key, value)
    }

    /// Write only if the key is not already present.
    pub fn seed(
        &mut self,
        key: &str,
        value: impl Into<WizardValue>,
    ) -> Result<(), WizardError> {
        if self.dfa.data().contains_key(key) {
            return Ok(());
        }
        self.dfa.set_data(key, value)
    }

    pub fn is_dry_run(&self) -> bool {
        self.dfa.is_dry_run()
    }
}

/// Lifecycle hooks for one state. Every hook defaults to a no-op.
pub trait StateHandler: Send + Sync {
    fn on_enter(&self, _ctx: &mut HandlerContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn execute(&self, _ctx: &mut HandlerContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn validate(&self, _data: &DataBag) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_exit(&self, _ctx: &mut HandlerContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Handler for screens with no logic of their own (welcome, ready, complete).
#[derive(Debug, Default, Clone, Copy)]
pub struct PassiveHandler;

impl StateHandler for PassiveHandler {}

/// Gates the license screen on acceptance.
#[derive(Debug, Clone)]
pub struct LicenseHandler {
    required: bool,
}

impl LicenseHandler {
    pub fn new(config: &InstallerConfig) -> Self {
        Self {
            required: config.license_required(),
        }
    }
}

impl StateHandler for LicenseHandler {
    fn on_enter(&self, ctx: &mut HandlerContext<'_>) -> anyhow::Result<()> {
        ctx.seed(KnownKey::LicenseAccepted.as_str(), false)?;
        Ok(())
    }

    fn validate(&self, data: &DataBag) -> anyhow::Result<()> {
        if self.required && data.get_bool(KnownKey::LicenseAccepted.as_str()) != Some(true) {
            bail!("the license agreement must be accepted to continue");
        }
        Ok(())
    }
}

/// Seeds the default component selection and checks required components.
#[derive(Debug, Clone)]
pub struct ComponentsHandler {
    known: Vec<String>,
    required: Vec<String>,
    defaults: Vec<String>,
}

impl ComponentsHandler {
    pub fn new(config: &InstallerConfig) -> Self {
        Self {
            known: config.components.iter().map(|c| c.id.clone()).collect(),
            required: config.required_components().into_iter().map(String::from).collect(),
            defaults: config.default_selection().into_iter().map(String::from).collect(),
        }
    }
}

impl StateHandler for ComponentsHandler {
    fn on_enter(&self, ctx: &mut HandlerContext<'_>) -> anyhow::Result<()> {
        ctx.seed(KnownKey::SelectedComponents.as_str(), self.defaults.clone())?;
        Ok(())
    }

    fn validate(&self, data: &DataBag) -> anyhow::Result<()> {
        let selected = data
            .get_text_list(KnownKey::SelectedComponents.as_str())
            .context("no components selected")?;

        if selected.is_empty() {
            bail!("select at least one component");
        }
        if let Some(unknown) = selected.iter().find(|id| !self.known.iter().any(|k| k == *id)) {
            bail!("unknown component '{unknown}'");
        }
        if let Some(missing) = self
            .required
            .iter()
            .find(|id| !selected.contains(&id.as_str()))
        {
            bail!("component '{missing}' is required");
        }
        Ok(())
    }
}

/// Seeds and validates the installation directory.
#[derive(Debug, Clone)]
pub struct LocationHandler {
    default_path: PathBuf,
}

impl LocationHandler {
    pub fn new(config: &InstallerConfig) -> Self {
        Self {
            default_path: config.default_install_path.clone(),
        }
    }
}

impl StateHandler for LocationHandler {
    fn on_enter(&self, ctx: &mut HandlerContext<'_>) -> anyhow::Result<()> {
        ctx.seed(
            KnownKey::InstallPath.as_str(),
            self.default_path.to_string_lossy().into_owned(),
        )?;
        Ok(())
    }

    fn validate(&self, data: &DataBag) -> anyhow::Result<()> {
        let path = data
            .get_str(KnownKey::InstallPath.as_str())
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .context("an installation directory must be chosen")?;

        if !Path::new(path).is_absolute() {
            bail!("installation directory '{path}' must be an absolute path");
        }
        Ok(())
    }
}

/// Runs the installation through the platform installer.
pub struct InstallingHandler {
    app_name: String,
    app_version: String,
    platform: Option<Arc<dyn PlatformInstaller>>,
}

impl InstallingHandler {
    pub fn new(config: &InstallerConfig, platform: Option<Arc<dyn PlatformInstaller>>) -> Self {
        Self {
            app_name: config.app_name.clone(),
            app_version: config.app_version.clone(),
            platform,
        }
    }

    fn request(&self, data: &DataBag) -> anyhow::Result<InstallRequest> {
        let install_path = data
            .get_str(KnownKey::InstallPath.as_str())
            .context("installation directory is not set")?;
        let components = data
            .get_text_list(KnownKey::SelectedComponents.as_str())
            .context("component selection is not set")?;

        Ok(InstallRequest {
            app_name: self.app_name.clone(),
            app_version: self.app_version.clone(),
            install_path: PathBuf::from(install_path),
            components: components.into_iter().map(String::from).collect(),
        })
    }
}

impl StateHandler for InstallingHandler {
    fn execute(&self, ctx: &mut HandlerContext<'_>) -> anyhow::Result<()> {
        let platform = self
            .platform
            .as_ref()
            .context("no platform installer is configured")?;
        let request = self.request(ctx.data())?;

        match platform.install(&request) {
            Ok(()) => {
                ctx.set_data(KnownKey::InstallCompleted.as_str(), true)?;
                Ok(())
            }
            Err(err) => {
                ctx.set_data(KnownKey::InstallError.as_str(), format!("{err:#}"))?;
                Err(err.context(format!("installing {} failed", self.app_name)))
            }
        }
    }
}

/// Undoes whatever the platform installer managed to do.
pub struct RollbackHandler {
    platform: Option<Arc<dyn PlatformInstaller>>,
}

impl RollbackHandler {
    pub fn new(platform: Option<Arc<dyn PlatformInstaller>>) -> Self {
        Self { platform }
    }
}

impl StateHandler for RollbackHandler {
    fn execute(&self, _ctx: &mut HandlerContext<'_>) -> anyhow::Result<()> {
        match &self.platform {
            Some(platform) => platform.rollback().context("rollback failed"),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wizard::StateConfig;
    use std::sync::Mutex;

    fn single_state() -> Dfa {
        let mut dfa = Dfa::new();
        dfa.add_state("screen", StateConfig::new("Screen")).unwrap();
        dfa
    }

    #[test]
    fn test_seed_does_not_overwrite() {
        let mut dfa = single_state();
        dfa.set_data("install_path", "/srv/app").unwrap();
        let mut ctx = HandlerContext::new(&mut dfa);
        ctx.seed("install_path", "/opt/app").unwrap();
        assert_eq!(ctx.data().get_str("install_path"), Some("/srv/app"));
    }

    #[test]
    fn test_license_handler() {
        let handler = LicenseHandler::new(&InstallerConfig::default());
        let mut dfa = single_state();
        handler.on_enter(&mut HandlerContext::new(&mut dfa)).unwrap();
        assert_eq!(dfa.data().get_bool("license_accepted"), Some(false));
        assert!(handler.validate(dfa.data()).is_err());

        dfa.set_data("license_accepted", true).unwrap();
        assert!(handler.validate(dfa.data()).is_ok());
    }

    #[test]
    fn test_license_not_required_without_license() {
        let config = InstallerConfig {
            license: None,
            ..InstallerConfig::default()
        };
        let handler = LicenseHandler::new(&config);
        assert!(handler.validate(&DataBag::new()).is_ok());
    }

    #[test]
    fn test_components_handler_requires_core() {
        let handler = ComponentsHandler::new(&InstallerConfig::default());
        let mut dfa = single_state();
        handler.on_enter(&mut HandlerContext::new(&mut dfa)).unwrap();
        assert!(handler.validate(dfa.data()).is_ok());

        dfa.set_data("selected_components", vec!["docs"]).unwrap();
        let err = handler.validate(dfa.data()).unwrap_err();
        assert!(err.to_string().contains("'core' is required"));

        dfa.set_data("selected_components", vec!["core", "games"]).unwrap();
        let err = handler.validate(dfa.data()).unwrap_err();
        assert!(err.to_string().contains("unknown component 'games'"));
    }

    #[test]
    fn test_location_handler_requires_absolute_path() {
        let handler = LocationHandler::new(&InstallerConfig::default());
        let mut data = DataBag::new();
        assert!(handler.validate(&data).is_err());
        data.insert("install_path", "relative/dir").unwrap();
        assert!(handler.validate(&data).is_err());
        data.insert("install_path", "/opt/app").unwrap();
        assert!(handler.validate(&data).is_ok());
    }

    struct FailingInstaller;

    impl PlatformInstaller for FailingInstaller {
        fn install(&self, _request: &InstallRequest) -> anyhow::Result<()> {
            bail!("disk full")
        }

        fn rollback(&self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingInstaller {
        requests: Mutex<Vec<InstallRequest>>,
    }

    impl PlatformInstaller for RecordingInstaller {
        fn install(&self, request: &InstallRequest) -> anyhow::Result<()> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(())
        }

        fn rollback(&self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn ready_dfa() -> Dfa {
        let mut dfa = single_state();
        dfa.set_data("install_path", "/opt/app").unwrap();
        dfa.set_data("selected_components", vec!["core"]).unwrap();
        dfa
    }

    #[test]
    fn test_installing_handler_records_success() {
        let installer = Arc::new(RecordingInstaller::default());
        let handler = InstallingHandler::new(
            &InstallerConfig::default(),
            Some(Arc::clone(&installer) as Arc<dyn PlatformInstaller>),
        );
        let mut dfa = ready_dfa();
        handler.execute(&mut HandlerContext::new(&mut dfa)).unwrap();

        assert_eq!(dfa.data().get_bool("install_completed"), Some(true));
        let requests = installer.requests.lock().unwrap();
        assert_eq!(requests[0].install_path, PathBuf::from("/opt/app"));
        assert_eq!(requests[0].components, vec!["core".to_string()]);
    }

    #[test]
    fn test_installing_handler_records_failure() {
        let handler =
            InstallingHandler::new(&InstallerConfig::default(), Some(Arc::new(FailingInstaller)));
        let mut dfa = ready_dfa();
        let err = handler.execute(&mut HandlerContext::new(&mut dfa)).unwrap_err();

        assert!(format!("{err:#}").contains("disk full"));
        assert_eq!(dfa.data().get_str("install_error"), Some("disk full"));
    }

    #[test]
    fn test_installing_without_platform_fails() {
        let handler = InstallingHandler::new(&InstallerConfig::default(), None);
        let mut dfa = ready_dfa();
        assert!(handler.execute(&mut HandlerContext::new(&mut dfa)).is_err());
    }
}
