//! Settings
//!
//! Describes the admin settings section for the fee rule, and reads its
//! values back out of a [`SettingsStore`].

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::validation::{RULE_ID_FIELD, RawSettings};

pub mod schema;
pub mod store;

pub use schema::{
    FieldKind, FieldSpec, OptionSource, ResolvedField, SchemaError, SchemaField, SettingsSchema,
    SettingsSchemaBuilder, SettingsSection,
};
pub use store::{MemorySettingsStore, SettingsError, SettingsStore};

/// Fully qualified settings key, `"<section id>_<field id>"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SettingKey(String);

impl SettingKey {
    /// Build the key for a field within a section.
    #[must_use]
    pub fn new(section_id: &str, field_id: &str) -> Self {
        Self(format!("{section_id}_{field_id}"))
    }

    /// Returns the key as stored by the host.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored setting value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    /// Boolean flag
    Flag(bool),

    /// Free text, including numbers and flags stored as strings
    Text(String),

    /// Numeric value
    Number(Decimal),

    /// Multiple values, e.g. a multiselect
    List(Vec<SettingValue>),
}

impl SettingValue {
    /// Empty text and empty lists count as unset.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.trim().is_empty(),
            Self::List(values) => values.is_empty(),
            Self::Flag(_) | Self::Number(_) => false,
        }
    }
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Decimal> for SettingValue {
    fn from(value: Decimal) -> Self {
        Self::Number(value)
    }
}

impl From<u64> for SettingValue {
    fn from(value: u64) -> Self {
        Self::Number(Decimal::from(value))
    }
}

impl<T: Into<SettingValue>> From<Vec<T>> for SettingValue {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

/// A schema bound to the store its values live in.
#[derive(Debug)]
pub struct Settings<'s, S: SettingsStore + ?Sized> {
    schema: &'s SettingsSchema,
    store: &'s S,
}

impl<'s, S: SettingsStore + ?Sized> Settings<'s, S> {
    /// Bind a schema to a store.
    pub fn new(schema: &'s SettingsSchema, store: &'s S) -> Self {
        Self { schema, store }
    }

    /// Stored value of a field by its unqualified id.
    ///
    /// Empty values count as unset. Field defaults are form metadata only and
    /// are never substituted here, so a missing required value reaches the
    /// validator as missing. Unknown fields have no value.
    pub fn get(&self, field_id: &str) -> Option<SettingValue> {
        let field = self.schema.field(field_id)?;

        self.store
            .get(field.key())
            .filter(|value| !value.is_empty())
    }

    /// Raw values for every field, plus the section id as the rule id.
    pub fn snapshot(&self) -> RawSettings {
        let mut raw = RawSettings::default();

        raw.insert(
            RULE_ID_FIELD,
            SettingValue::Text(self.schema.section().id().to_string()),
        );

        for field in self.schema.fields() {
            if let Some(value) = self.get(field.spec().id()) {
                raw.insert(field.spec().id(), value);
            }
        }

        raw
    }
}
