use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::wizard::{KnownKey, WizardValue};

/// installkit - build and exercise installer wizards
#[derive(Parser, Debug)]
#[command(name = "installkit")]
#[command(about = "Inspect and simulate installer wizard flows")]
#[command(version)]
pub struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate an installer configuration file
    Validate {
        /// Path to the JSON configuration
        config: PathBuf,
    },
    /// Print the states of a provider's flow in `next` order
    Flow {
        /// Provider name: standard or extended
        #[arg(short, long, default_value = "standard")]
        provider: String,

        /// Installer configuration; built-in defaults when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Add the default theme selection screen if the config has none
        #[arg(long)]
        themes: bool,
    },
    /// Drive a flow in dry-run mode and print what would happen
    Simulate {
        #[arg(short, long, default_value = "standard")]
        provider: String,

        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(long)]
        themes: bool,

        /// Data to set after the wizard starts, e.g. `--set license_accepted=true`
        #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        set: Vec<(String, WizardValue)>,

        /// Actions to apply in order: next, back, skip, cancel or a custom name
        actions: Vec<String>,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Parse `key=value`. Known keys are read as the kind they hold; other keys
/// are read as a bool, number, comma list or text.
pub fn parse_key_value(raw: &str) -> Result<(String, WizardValue), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{raw}'"));
    }
    let value = match key.parse::<KnownKey>() {
        Ok(known) => WizardValue::parse_as(value, known.expected_kind()),
        Err(_) => WizardValue::parse_literal(value),
    };
    Ok((key.to_string(), value))
}
