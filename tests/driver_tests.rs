//! Tests for the wizard driver
//!
//! These tests verify:
//! - Dry-run mode records transitions and never runs `execute`
//! - Handler lifecycle order around transitions
//! - A real (non dry-run) install through a fake platform installer
//! - Shared access to a driver from another thread

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::bail;
use installkit::config::InstallerConfig;
use installkit::driver::{DriverError, WizardDriver};
use installkit::provider::{
    HandlerContext, InstallContext, InstallRequest, PlatformInstaller, ProviderError,
    StandardProvider, StateHandler, UiMapping, WizardMode, WizardProvider,
};
use installkit::wizard::{Dfa, StateConfig};

/// Records every hook invocation as `hook:state`
#[derive(Default)]
struct SpyHandler {
    calls: Mutex<Vec<String>>,
    executes: AtomicUsize,
}

impl SpyHandler {
    fn record(&self, hook: &str, ctx: &HandlerContext<'_>) {
        let state = ctx.state().map(|s| s.to_string()).unwrap_or_default();
        self.calls.lock().unwrap().push(format!("{hook}:{state}"));
    }
}

impl StateHandler for SpyHandler {
    fn on_enter(&self, ctx: &mut HandlerContext<'_>) -> anyhow::Result<()> {
        self.record("enter", ctx);
        Ok(())
    }

    fn execute(&self, ctx: &mut HandlerContext<'_>) -> anyhow::Result<()> {
        self.executes.fetch_add(1, Ordering::SeqCst);
        self.record("execute", ctx);
        Ok(())
    }

    fn on_exit(&self, ctx: &mut HandlerContext<'_>) -> anyhow::Result<()> {
        self.record("exit", ctx);
        Ok(())
    }
}

/// Four-step chain where every state shares one spy handler
struct SpyProvider {
    dfa: Option<Dfa>,
    spy: Arc<SpyHandler>,
}

impl SpyProvider {
    fn new(spy: Arc<SpyHandler>) -> Self {
        Self { dfa: None, spy }
    }
}

impl WizardProvider for SpyProvider {
    fn name(&self) -> &str {
        "spy"
    }

    fn mode(&self) -> WizardMode {
        WizardMode::Standard
    }

    fn initialize(
        &mut self,
        _config: &InstallerConfig,
        context: &InstallContext,
    ) -> Result<(), ProviderError> {
        let mut dfa = Dfa::new();
        dfa.add_state("one", StateConfig::new("One").next_to("two"))?;
        dfa.add_state("two", StateConfig::new("Two").next_to("three"))?;
        dfa.add_state("three", StateConfig::new("Three").next_to("four"))?;
        dfa.add_state("four", StateConfig::terminal("Four"))?;
        dfa.set_dry_run(context.dry_run);
        self.dfa = Some(dfa);
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.dfa.is_some()
    }

    fn dfa(&self) -> Result<&Dfa, ProviderError> {
        self.dfa
            .as_ref()
            .ok_or_else(|| ProviderError::NotInitialized("spy".into()))
    }

    fn dfa_mut(&mut self) -> Result<&mut Dfa, ProviderError> {
        self.dfa
            .as_mut()
            .ok_or_else(|| ProviderError::NotInitialized("spy".into()))
    }

    fn state_handler(&self, _state: &str) -> Option<Arc<dyn StateHandler>> {
        Some(Arc::clone(&self.spy) as Arc<dyn StateHandler>)
    }

    fn ui_mapping(&self, _state: &str) -> Option<&UiMapping> {
        None
    }

    fn validate_configuration(&self) -> Result<(), ProviderError> {
        self.dfa().map(|_| ())
    }
}

fn spy_driver(dry_run: bool) -> (WizardDriver, Arc<SpyHandler>) {
    let spy = Arc::new(SpyHandler::default());
    let mut provider = SpyProvider::new(Arc::clone(&spy));
    let context = InstallContext {
        dry_run,
        platform: None,
    };
    provider
        .initialize(&InstallerConfig::default(), &context)
        .unwrap();
    (WizardDriver::new(Box::new(provider)).unwrap(), spy)
}

// =============================================================================
// Dry-Run Tests
// =============================================================================

#[test]
fn test_dry_run_three_transitions_three_entries_no_execute() {
    let (mut driver, spy) = spy_driver(true);
    driver.start().unwrap();

    driver.next().unwrap();
    driver.next().unwrap();
    driver.back().unwrap();

    let log = driver.dfa().unwrap().dry_run_log().to_vec();
    assert_eq!(log.len(), 3);
    assert_eq!(log[2], "[DRY RUN] transition: three -> two (back)");
    assert_eq!(spy.executes.load(Ordering::SeqCst), 0);
    assert!(driver.view().unwrap().dry_run);
}

#[test]
fn test_rejected_transition_runs_no_hooks() {
    let (mut driver, spy) = spy_driver(true);
    driver.start().unwrap();
    let before = spy.calls.lock().unwrap().len();

    let err = driver.back().unwrap_err();
    assert!(matches!(err, DriverError::Wizard(_)));
    assert_eq!(spy.calls.lock().unwrap().len(), before);
    assert!(driver.dfa().unwrap().dry_run_log().is_empty());
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_hook_order_without_dry_run() {
    let (mut driver, spy) = spy_driver(false);
    driver.start().unwrap();
    driver.next().unwrap();

    assert_eq!(
        *spy.calls.lock().unwrap(),
        vec!["enter:one", "execute:one", "exit:one", "enter:two", "execute:two"]
    );
    assert_eq!(spy.executes.load(Ordering::SeqCst), 2);
}

#[test]
fn test_start_is_idempotent() {
    let (mut driver, spy) = spy_driver(false);
    driver.start().unwrap();
    driver.start().unwrap();
    assert_eq!(spy.executes.load(Ordering::SeqCst), 1);
    assert!(driver.is_started());
}

// =============================================================================
// Standard Flow Tests
// =============================================================================

#[derive(Default)]
struct FakeInstaller {
    installed: Mutex<Vec<InstallRequest>>,
    rollbacks: AtomicUsize,
    fail: bool,
}

impl PlatformInstaller for FakeInstaller {
    fn install(&self, request: &InstallRequest) -> anyhow::Result<()> {
        if self.fail {
            bail!("not enough space on {}", request.install_path.display());
        }
        self.installed.lock().unwrap().push(request.clone());
        Ok(())
    }

    fn rollback(&self) -> anyhow::Result<()> {
        self.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn standard_driver(installer: Arc<FakeInstaller>) -> WizardDriver {
    let mut provider = StandardProvider::new();
    provider
        .initialize(
            &InstallerConfig::default(),
            &InstallContext::with_platform(installer),
        )
        .unwrap();
    WizardDriver::new(Box::new(provider)).unwrap()
}

fn walk_to_ready(driver: &mut WizardDriver) {
    driver.start().unwrap();
    driver.next().unwrap();
    driver.set_data("license_accepted", true).unwrap();
    driver.next().unwrap();
    driver.next().unwrap();
    driver.set_data("install_path", "/srv/widget").unwrap();
    let view = driver.next().unwrap();
    assert_eq!(view.state, "ready");
    assert_eq!(view.ui.unwrap().next_label, "Install");
}

#[test]
fn test_full_install_reaches_complete() {
    let installer = Arc::new(FakeInstaller::default());
    let mut driver = standard_driver(Arc::clone(&installer));
    walk_to_ready(&mut driver);

    let view = driver.next().unwrap();
    assert_eq!(view.state, "installing");
    assert_eq!(view.data.get_bool("install_completed"), Some(true));

    let installed = installer.installed.lock().unwrap();
    assert_eq!(installed.len(), 1);
    assert_eq!(installed[0].install_path.to_str(), Some("/srv/widget"));
    assert_eq!(installed[0].components, vec!["core", "docs"]);
    drop(installed);

    let view = driver.next().unwrap();
    assert_eq!(view.state, "complete");
    assert!(driver.is_finished());
}

#[test]
fn test_failed_install_rolls_back() {
    let installer = Arc::new(FakeInstaller {
        fail: true,
        ..FakeInstaller::default()
    });
    let mut driver = standard_driver(Arc::clone(&installer));
    walk_to_ready(&mut driver);

    let err = driver.next().unwrap_err();
    assert!(err.to_string().contains("not enough space"));

    let view = driver.perform("fail").unwrap();
    assert_eq!(view.state, "error");
    assert!(view.data.get_str("install_error").is_some());

    let view = driver.next().unwrap();
    assert_eq!(view.state, "rollback");
    assert_eq!(installer.rollbacks.load(Ordering::SeqCst), 1);
}

#[test]
fn test_cancel_before_install_rolls_back() {
    let installer = Arc::new(FakeInstaller::default());
    let mut driver = standard_driver(Arc::clone(&installer));
    driver.start().unwrap();
    driver.next().unwrap();

    let view = driver.cancel().unwrap();
    assert_eq!(view.state, "rollback");
    assert!(installer.installed.lock().unwrap().is_empty());
    assert_eq!(installer.rollbacks.load(Ordering::SeqCst), 1);
}

// =============================================================================
// Shared Access Tests
// =============================================================================

#[test]
fn test_shared_driver_observed_from_thread() {
    let (mut driver, _spy) = spy_driver(true);
    driver.start().unwrap();
    let shared = driver.into_shared();

    let reader = shared.clone();
    let handle = std::thread::spawn(move || {
        reader
            .with(|driver| driver.view().map(|v| v.state))
            .unwrap()
            .unwrap()
    });
    let seen = handle.join().unwrap();
    assert!(["one", "two"].contains(&seen.as_str()));

    shared.with(|driver| driver.next().map(|_| ())).unwrap().unwrap();
    let state = shared.with(|driver| driver.view().unwrap().state).unwrap();
    assert_eq!(state, "two");
}
