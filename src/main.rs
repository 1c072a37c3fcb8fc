//! installkit - command-line front end
//!
//! Loads an installer description, builds a provider's flow and either prints
//! it or drives it in dry-run mode.

use std::collections::HashSet;
use std::path::Path;
use std::process;

use tracing::{debug, error, info};

use installkit::cli::{Cli, Commands};
use installkit::config::{InstallerConfig, ThemeSelectionConfig};
use installkit::driver::WizardDriver;
use installkit::error::{InstallKitError, Result};
use installkit::provider::{InstallContext, ProviderRegistry, WizardProvider};
use installkit::wizard::{Dfa, State, WizardValue};
use installkit::logging;

fn load_config(path: Option<&Path>, themes: bool) -> Result<InstallerConfig> {
    let mut config = match path {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            InstallerConfig::load_from_file(path)
                .map_err(|e| InstallKitError::config(format!("{e:#}")))?
        }
        None => {
            debug!("No configuration given, using built-in defaults");
            InstallerConfig::default()
        }
    };
    if themes && config.theme_selection.is_none() {
        config.theme_selection = Some(ThemeSelectionConfig::default());
    }
    Ok(config)
}

fn build_provider(name: &str, config: &InstallerConfig) -> Result<Box<dyn WizardProvider>> {
    let registry = ProviderRegistry::with_builtin();
    let mut provider = registry.create(name)?;
    provider.initialize(config, &InstallContext::dry_run())?;
    debug!(provider = name, "provider initialized");
    Ok(provider)
}

/// States reachable from the initial state by following `next`, in order.
fn next_chain(dfa: &Dfa) -> Vec<State> {
    let mut chain = Vec::new();
    let mut seen = HashSet::new();
    let mut cursor = dfa.initial_state().cloned();

    while let Some(state) = cursor {
        if !seen.insert(state.clone()) {
            break;
        }
        cursor = dfa
            .state_config(state.as_str())
            .and_then(|config| config.next_target().cloned());
        chain.push(state);
    }
    chain
}

fn run_flow(provider_name: &str, config_path: Option<&Path>, themes: bool) -> Result<()> {
    let config = load_config(config_path, themes)?;
    let provider = build_provider(provider_name, &config)?;
    let dfa = provider.dfa()?;

    println!("{} flow for {}:", provider.name(), config.window_title());
    for (i, state) in next_chain(dfa).iter().enumerate() {
        let title = provider
            .ui_mapping(state.as_str())
            .map_or("", |ui| ui.title.as_str());
        println!("  {:>2}. {:<16} {}", i + 1, state, title);

        if let Some(state_config) = dfa.state_config(state.as_str()) {
            for (action, target) in state_config
                .transitions
                .iter()
                .filter(|(action, _)| action.as_str() != "next")
            {
                println!("        {action} -> {target}");
            }
        }
    }
    Ok(())
}

fn run_simulate(
    provider_name: &str,
    config_path: Option<&Path>,
    themes: bool,
    set: Vec<(String, WizardValue)>,
    actions: &[String],
) -> Result<()> {
    let config = load_config(config_path, themes)?;
    let provider = build_provider(provider_name, &config)?;
    let mut driver = WizardDriver::new(provider)?;

    let view = driver.start()?;
    println!("start: {}", view.state);

    for (key, value) in set {
        driver.set_data(key, value)?;
    }

    let mut outcome = Ok(());
    for action in actions {
        match driver.perform(action.as_str()) {
            Ok(view) => println!("{action}: -> {}", view.state),
            Err(e) => {
                println!("{action}: ✗ {e}");
                outcome = Err(InstallKitError::from(e));
                break;
            }
        }
    }

    let dfa = driver.dfa()?;
    println!();
    println!("Dry-run log:");
    for entry in dfa.dry_run_log() {
        println!("  {entry}");
    }

    let view = driver.view()?;
    println!();
    println!("Final state: {}", view.state);
    println!("Data: {}", serde_json::to_string_pretty(&view.data)?);

    outcome
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse_args();
    logging::init(cli.verbose);
    debug!("CLI arguments parsed");

    match cli.command {
        Commands::Validate { config } => {
            info!("Validating configuration file: {:?}", config);
            match InstallerConfig::load_from_file(&config).and_then(|c| {
                c.validate()?;
                Ok(c)
            }) {
                Ok(config) => {
                    info!("Configuration validation successful");
                    println!(
                        "✓ Configuration file is valid: {} {} ({} components)",
                        config.app_name,
                        config.app_version,
                        config.components.len()
                    );
                }
                Err(e) => {
                    error!("Configuration validation failed: {:#}", e);
                    eprintln!("✗ Configuration file is invalid: {e:#}");
                    process::exit(1);
                }
            }
        }
        Commands::Flow {
            provider,
            config,
            themes,
        } => run_flow(&provider, config.as_deref(), themes)?,
        Commands::Simulate {
            provider,
            config,
            themes,
            set,
            actions,
        } => {
            if let Err(e) = run_simulate(&provider, config.as_deref(), themes, set, &actions) {
                error!("Simulation stopped: {}", e);
                process::exit(1);
            }
        }
    }

    Ok(())
}
