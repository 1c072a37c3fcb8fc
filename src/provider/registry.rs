//! Provider lookup by name

use std::collections::BTreeMap;
use std::fmt;

use crate::provider::extended::ExtendedProvider;
use crate::provider::standard::StandardProvider;
use crate::provider::{ProviderError, WizardProvider};

/// Builds a fresh, uninitialized provider
pub type ProviderFactory = Box<dyn Fn() -> Box<dyn WizardProvider> + Send + Sync>;

/// Named provider factories with an optional default.
///
/// The first provider registered becomes the default until
/// [`set_default`](Self::set_default) says otherwise.
#[derive(Default)]
pub struct ProviderRegistry {
    factories: BTreeMap<String, ProviderFactory>,
    default: Option<String>,
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .field("default", &self.default)
            .finish()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding `standard` (the default) and `extended`.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.factories.insert(
            StandardProvider::NAME.to_string(),
            Box::new(|| Box::new(StandardProvider::new())),
        );
        registry.factories.insert(
            ExtendedProvider::NAME.to_string(),
            Box::new(|| Box::new(ExtendedProvider::new())),
        );
        registry.default = Some(StandardProvider::NAME.to_string());
        registry
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        factory: impl Fn() -> Box<dyn WizardProvider> + Send + Sync + 'static,
    ) -> Result<(), ProviderError> {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(ProviderError::DuplicateProvider(name));
        }
        if self.default.is_none() {
            self.default = Some(name.clone());
        }
        self.factories.insert(name, Box::new(factory));
        Ok(())
    }

    pub fn set_default(&mut self, name: &str) -> Result<(), ProviderError> {
        if !self.factories.contains_key(name) {
            return Err(ProviderError::UnknownProvider(name.to_string()));
        }
        self.default = Some(name.to_string());
        Ok(())
    }

    pub fn default_name(&self) -> Option<&str> {
        self.default.as_deref()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    pub fn create(&self, name: &str) -> Result<Box<dyn WizardProvider>, ProviderError> {
        self.factories
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| ProviderError::UnknownProvider(name.to_string()))
    }

    pub fn create_default(&self) -> Result<Box<dyn WizardProvider>, ProviderError> {
        let name = self
            .default
            .as_deref()
            .ok_or_else(|| ProviderError::UnknownProvider("<default>".to_string()))?;
        self.create(name)
    }
}
