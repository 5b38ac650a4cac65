//! Settings Store

use std::{fs, path::Path};

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::settings::{SettingKey, SettingValue};

/// Settings loading errors
#[derive(Debug, Error)]
pub enum SettingsError {
    /// IO error reading a settings file
    #[error("Failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),
}

/// Read access to the host's stored settings.
#[cfg_attr(test, mockall::automock)]
pub trait SettingsStore {
    /// Stored value for a fully qualified key, if any.
    fn get(&self, key: &SettingKey) -> Option<SettingValue>;
}

impl<S: SettingsStore + ?Sized> SettingsStore for &S {
    fn get(&self, key: &SettingKey) -> Option<SettingValue> {
        (**self).get(key)
    }
}

/// Settings held in memory, keyed by fully qualified key.
///
/// Can be seeded from a YAML mapping such as:
///
/// ```yaml
/// cart-increase_percentage: 15
/// cart-increase_products: [12, 48]
/// cart-increase_increment_per_product: "yes"
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemorySettingsStore {
    values: FxHashMap<String, SettingValue>,
}

impl MemorySettingsStore {
    /// Parse settings from a YAML mapping.
    ///
    /// Keys with a null value are left unset.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Yaml`] if the document is not a mapping of
    /// keys to setting values.
    pub fn from_yaml(yaml: &str) -> Result<Self, SettingsError> {
        let values: Option<FxHashMap<String, Option<SettingValue>>> =
            serde_norway::from_str(yaml)?;

        let values = values
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(key, value)| value.map(|value| (key, value)))
            .collect();

        Ok(Self { values })
    }

    /// Read settings from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Io`] if the file cannot be read, or
    /// [`SettingsError::Yaml`] if it cannot be parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path)?;

        Self::from_yaml(&contents)
    }

    /// Store a value.
    pub fn set(&mut self, key: &SettingKey, value: impl Into<SettingValue>) {
        self.values.insert(key.as_str().to_string(), value.into());
    }

    /// Store a value, builder style.
    #[must_use]
    pub fn with_value(mut self, key: &SettingKey, value: impl Into<SettingValue>) -> Self {
        self.set(key, value);
        self
    }

    /// Remove a stored value, returning it.
    pub fn remove(&mut self, key: &SettingKey) -> Option<SettingValue> {
        self.values.remove(key.as_str())
    }
}

impl SettingsStore for MemorySettingsStore {
    fn get(&self, key: &SettingKey) -> Option<SettingValue> {
        self.values.get(key.as_str()).cloned()
    }
}
