//! Cart Fees prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    adjustments::{AdjustmentError, CartAdjustments},
    cart::{CartError, CartSnapshot, LineItem},
    engine::FeeRuleEngine,
    fees::{Fee, FeeError, FeeRate, RuleConfig, evaluate},
    products::{Catalog, CatalogError, CatalogProduct, InMemoryCatalog, ProductId, SelectOption},
    settings::{
        FieldSpec, MemorySettingsStore, OptionSource, SchemaError, SettingKey, SettingValue,
        Settings, SettingsError, SettingsSchema, SettingsSection, SettingsStore,
    },
    validation::{RawSettings, ValidationError, ValidationReason, validate},
};
