//! Validation
//!
//! Turns raw stored settings into a [`RuleConfig`], rejecting anything that
//! cannot be used rather than substituting defaults.

use std::{fmt, str::FromStr};

use rust_decimal::{Decimal, prelude::ToPrimitive};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Deserialize;
use thiserror::Error;

use crate::{
    fees::{FeeRate, RuleConfig},
    products::ProductId,
    settings::SettingValue,
};

/// Raw key of the rule id.
pub const RULE_ID_FIELD: &str = "id";

/// Raw key of the fee percentage.
pub const PERCENTAGE_FIELD: &str = "percentage";

/// Raw key of the trigger products.
pub const PRODUCTS_FIELD: &str = "products";

/// Raw key of the per-product increment flag.
pub const INCREMENT_FIELD: &str = "increment_per_product";

/// Why a field failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationReason {
    /// Required but absent or empty.
    Missing,

    /// Not convertible to a number.
    NotANumber(String),

    /// Numeric but outside the accepted range.
    OutOfRange {
        /// Value received
        value: Decimal,
        /// Smallest accepted value
        min: Decimal,
        /// Largest accepted value
        max: Decimal,
    },

    /// Not a valid product id.
    InvalidProductId(String),

    /// Not a recognised yes/no value.
    InvalidFlag(String),

    /// The value has the wrong shape, e.g. a list where text was expected.
    WrongType {
        /// Expected shape
        expected: &'static str,
    },
}

impl fmt::Display for ValidationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "is required"),
            Self::NotANumber(value) => write!(f, "{value:?} is not a number"),
            Self::OutOfRange { value, min, max } => {
                write!(f, "{value} is outside {min}..={max}")
            }
            Self::InvalidProductId(value) => write!(f, "{value:?} is not a product id"),
            Self::InvalidFlag(value) => write!(f, "{value:?} is not yes or no"),
            Self::WrongType { expected } => write!(f, "expected {expected}"),
        }
    }
}

/// A settings field that cannot be turned into a rule.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid setting {field}: {reason}")]
pub struct ValidationError {
    /// Unqualified field id
    pub field: &'static str,

    /// What is wrong with it
    pub reason: ValidationReason,
}

impl ValidationError {
    fn new(field: &'static str, reason: ValidationReason) -> Self {
        Self { field, reason }
    }
}

/// Raw settings keyed by unqualified field id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct RawSettings(FxHashMap<String, SettingValue>);

impl RawSettings {
    /// Set a value.
    pub fn insert(&mut self, field: &str, value: impl Into<SettingValue>) {
        self.0.insert(field.to_string(), value.into());
    }

    /// Get a value.
    pub fn get(&self, field: &str) -> Option<&SettingValue> {
        self.0.get(field)
    }

    /// Get a value, treating empty ones as absent.
    fn present(&self, field: &str) -> Option<&SettingValue> {
        self.get(field).filter(|value| !value.is_empty())
    }
}

impl<K: Into<String>, V: Into<SettingValue>> FromIterator<(K, V)> for RawSettings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

/// Validate raw settings into a rule configuration.
///
/// # Errors
///
/// Returns a [`ValidationError`] naming the first offending field:
/// - `id` missing or not text.
/// - `percentage` missing, not numeric, or outside `0..=100`.
/// - `products` containing anything other than product ids.
/// - `increment_per_product` not a recognised yes/no value.
pub fn validate(raw: &RawSettings) -> Result<RuleConfig, ValidationError> {
    let rule_id = rule_id(raw)?;
    let rate = rate(raw)?;
    let products = trigger_products(raw)?;
    let increment = increment_per_match(raw)?;

    Ok(RuleConfig::new(rule_id, products, rate, increment))
}

fn rule_id(raw: &RawSettings) -> Result<String, ValidationError> {
    match raw.present(RULE_ID_FIELD) {
        Some(SettingValue::Text(id)) => Ok(id.trim().to_string()),
        Some(_) => Err(ValidationError::new(
            RULE_ID_FIELD,
            ValidationReason::WrongType { expected: "text" },
        )),
        None => Err(ValidationError::new(RULE_ID_FIELD, ValidationReason::Missing)),
    }
}

fn rate(raw: &RawSettings) -> Result<FeeRate, ValidationError> {
    let points = match raw.present(PERCENTAGE_FIELD) {
        Some(SettingValue::Number(points)) => *points,
        Some(SettingValue::Text(text)) => Decimal::from_str(text.trim()).map_err(|_err| {
            ValidationError::new(PERCENTAGE_FIELD, ValidationReason::NotANumber(text.clone()))
        })?,
        Some(SettingValue::Flag(_) | SettingValue::List(_)) => {
            return Err(ValidationError::new(
                PERCENTAGE_FIELD,
                ValidationReason::WrongType { expected: "number" },
            ));
        }
        None => {
            return Err(ValidationError::new(PERCENTAGE_FIELD, ValidationReason::Missing));
        }
    };

    FeeRate::new(points).map_err(|_err| {
        ValidationError::new(
            PERCENTAGE_FIELD,
            ValidationReason::OutOfRange {
                value: points,
                min: Decimal::ZERO,
                max: Decimal::ONE_HUNDRED,
            },
        )
    })
}

fn trigger_products(raw: &RawSettings) -> Result<FxHashSet<ProductId>, ValidationError> {
    match raw.present(PRODUCTS_FIELD) {
        None => Ok(FxHashSet::default()),
        Some(SettingValue::List(values)) => values.iter().map(product_id).collect(),
        Some(single) => product_id(single).map(|id| FxHashSet::from_iter([id])),
    }
}

fn product_id(value: &SettingValue) -> Result<ProductId, ValidationError> {
    let invalid = |shown: String| {
        ValidationError::new(PRODUCTS_FIELD, ValidationReason::InvalidProductId(shown))
    };

    match value {
        SettingValue::Text(text) => text.parse().map_err(|_err| invalid(text.clone())),
        SettingValue::Number(number) if number.fract().is_zero() => number
            .to_u64()
            .map(ProductId::new)
            .ok_or_else(|| invalid(number.to_string())),
        SettingValue::Number(number) => Err(invalid(number.to_string())),
        SettingValue::Flag(flag) => Err(invalid(flag.to_string())),
        SettingValue::List(_) => Err(ValidationError::new(
            PRODUCTS_FIELD,
            ValidationReason::WrongType {
                expected: "product id",
            },
        )),
    }
}

fn increment_per_match(raw: &RawSettings) -> Result<bool, ValidationError> {
    let invalid =
        |shown: String| ValidationError::new(INCREMENT_FIELD, ValidationReason::InvalidFlag(shown));

    match raw.present(INCREMENT_FIELD) {
        None => Ok(false),
        Some(SettingValue::Flag(flag)) => Ok(*flag),
        Some(SettingValue::Text(text)) => match text.trim().to_ascii_lowercase().as_str() {
            "yes" | "true" | "1" | "on" => Ok(true),
            "no" | "false" | "0" | "off" => Ok(false),
            _ => Err(invalid(text.clone())),
        },
        Some(SettingValue::Number(number)) if *number == Decimal::ONE => Ok(true),
        Some(SettingValue::Number(number)) if number.is_zero() => Ok(false),
        Some(SettingValue::Number(number)) => Err(invalid(number.to_string())),
        Some(SettingValue::List(_)) => Err(ValidationError::new(
            INCREMENT_FIELD,
            ValidationReason::WrongType { expected: "flag" },
        )),
    }
}
