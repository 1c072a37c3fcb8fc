//! Declarative installer description
//!
//! An [`InstallerConfig`] describes the application being installed: its
//! components, license and branding. Providers read it during initialization
//! to seed defaults and build their validators. Files are JSON.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

fn default_true() -> bool {
    true
}

fn default_insert_after() -> String {
    "license".to_string()
}

/// License shown on the license screen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LicenseConfig {
    pub title: String,
    pub text: String,
    /// Whether the user must accept before continuing
    #[serde(default = "default_true")]
    pub require_acceptance: bool,
}

/// One installable component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Required components cannot be deselected
    #[serde(default)]
    pub required: bool,
    #[serde(default = "default_true")]
    pub selected_by_default: bool,
    #[serde(default)]
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BrandingConfig {
    #[serde(default)]
    pub window_title: Option<String>,
    #[serde(default)]
    pub theme: Option<String>,
}

/// A theme offered on the theme selection screen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeOption {
    pub id: String,
    pub display_name: String,
}

/// Theme selection screen spliced into the standard flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeSelectionConfig {
    pub themes: Vec<ThemeOption>,
    pub default_theme: String,
    /// State after which the screen is inserted
    #[serde(default = "default_insert_after")]
    pub insert_after: String,
}

impl ThemeSelectionConfig {
    pub fn has_theme(&self, id: &str) -> bool {
        self.themes.iter().any(|t| t.id == id)
    }
}

impl Default for ThemeSelectionConfig {
    fn default() -> Self {
        Self {
            themes: vec![
                ThemeOption {
                    id: "light".to_string(),
                    display_name: "Light".to_string(),
                },
                ThemeOption {
                    id: "dark".to_string(),
                    display_name: "Dark".to_string(),
                },
            ],
            default_theme: "light".to_string(),
            insert_after: default_insert_after(),
        }
    }
}

/// Installer description that can be saved/loaded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallerConfig {
    pub app_name: String,
    pub app_version: String,
    #[serde(default)]
    pub publisher: String,
    #[serde(default)]
    pub license: Option<LicenseConfig>,
    pub components: Vec<ComponentConfig>,
    pub default_install_path: PathBuf,
    #[serde(default)]
    pub branding: BrandingConfig,
    #[serde(default)]
    pub theme_selection: Option<ThemeSelectionConfig>,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            app_name: "Application".to_string(),
            app_version: "1.0.0".to_string(),
            publisher: String::new(),
            license: Some(LicenseConfig {
                title: "License Agreement".to_string(),
                text: "Permission is hereby granted, free of charge, to any person obtaining a copy of this software.".to_string(),
                require_acceptance: true,
            }),
            components: vec![
                ComponentConfig {
                    id: "core".to_string(),
                    name: "Core files".to_string(),
                    description: "Application binaries and resources".to_string(),
                    required: true,
                    selected_by_default: true,
                    size_bytes: 0,
                },
                ComponentConfig {
                    id: "docs".to_string(),
                    name: "Documentation".to_string(),
                    description: "Offline manual".to_string(),
                    required: false,
                    selected_by_default: true,
                    size_bytes: 0,
                },
            ],
            default_install_path: PathBuf::from("/opt/application"),
            branding: BrandingConfig::default(),
            theme_selection: None,
        }
    }
}

impl InstallerConfig {
    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize installer configuration to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read configuration from {:?}", path.as_ref()))?;

        let config: Self =
            serde_json::from_str(&content).context("Failed to parse configuration JSON")?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.app_name.trim().is_empty() {
            anyhow::bail!("Application name must be specified");
        }

        if self.components.is_empty() {
            anyhow::bail!("At least one component must be defined");
        }

        let mut seen = HashSet::new();
        for component in &self.components {
            let id = component.id.trim();
            if id.is_empty() {
                anyhow::bail!("Component '{}' has an empty id", component.name);
            }
            if !seen.insert(id) {
                anyhow::bail!("Duplicate component id '{}'", id);
            }
        }

        if self.default_install_path.as_os_str().is_empty() {
            anyhow::bail!("Default install path must be specified");
        }

        if let Some(license) = &self.license {
            if license.require_acceptance && license.text.trim().is_empty() {
                anyhow::bail!("License acceptance is required but the license text is empty");
            }
        }

        if let Some(themes) = &self.theme_selection {
            if themes.themes.is_empty() {
                anyhow::bail!("Theme selection is enabled but no themes are listed");
            }
            if !themes.has_theme(&themes.default_theme) {
                anyhow::bail!(
                    "Default theme '{}' is not one of the listed themes",
                    themes.default_theme
                );
            }
        }

        Ok(())
    }

    pub fn component(&self, id: &str) -> Option<&ComponentConfig> {
        self.components.iter().find(|c| c.id == id)
    }

    /// Ids of required components
    pub fn required_components(&self) -> Vec<&str> {
        self.components
            .iter()
            .filter(|c| c.required)
            .map(|c| c.id.as_str())
            .collect()
    }

    /// Ids selected when the wizard starts: required or selected by default
    pub fn default_selection(&self) -> Vec<&str> {
        self.components
            .iter()
            .filter(|c| c.required || c.selected_by_default)
            .map(|c| c.id.as_str())
            .collect()
    }

    /// Whether the license screen must gate on acceptance
    pub fn license_required(&self) -> bool {
        self.license.as_ref().is_some_and(|l| l.require_acceptance)
    }

    pub fn window_title(&self) -> String {
        self.branding
            .window_title
            .clone()
            .unwrap_or_else(|| format!("{} {} Setup", self.app_name, self.app_version))
    }
}
