//! Fees
//!
//! The percentage surcharge rule and its pure evaluation against a cart snapshot.

use std::fmt;

use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use rustc_hash::FxHashSet;
use rusty_money::{Money, iso::Currency};
use smallvec::SmallVec;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    cart::{CartSnapshot, LineItem},
    products::ProductId,
};

/// Errors specific to fee calculations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FeeError {
    /// A fee rate outside of `0..=100` percentage points.
    #[error("fee rate {0} is outside 0..=100")]
    RateOutOfRange(Decimal),

    /// Percentage calculation could not be safely represented.
    #[error("fee calculation overflowed")]
    Overflow,
}

/// Percentage points applied to the cart total, within `0..=100`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct FeeRate(Decimal);

impl FeeRate {
    /// Create a fee rate from percentage points (`10` is 10%).
    ///
    /// # Errors
    ///
    /// Returns [`FeeError::RateOutOfRange`] for negative values or values above 100.
    pub fn new(points: Decimal) -> Result<Self, FeeError> {
        if points < Decimal::ZERO || points > Decimal::ONE_HUNDRED {
            return Err(FeeError::RateOutOfRange(points));
        }

        Ok(Self(points))
    }

    /// Returns the rate in percentage points.
    #[must_use]
    pub fn points(self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for FeeRate {
    type Error = FeeError;

    fn try_from(points: Decimal) -> Result<Self, Self::Error> {
        Self::new(points)
    }
}

impl fmt::Display for FeeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0.normalize())
    }
}

/// Validated fee rule configuration.
///
/// Built by [`crate::validation::validate`] from the stored settings, once per evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleConfig {
    rule_id: String,
    trigger_products: FxHashSet<ProductId>,
    rate: FeeRate,
    increment_per_match: bool,
}

impl RuleConfig {
    /// Create a rule configuration.
    pub fn new(
        rule_id: impl Into<String>,
        trigger_products: impl IntoIterator<Item = ProductId>,
        rate: FeeRate,
        increment_per_match: bool,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            trigger_products: trigger_products.into_iter().collect(),
            rate,
            increment_per_match,
        }
    }

    /// Identifier of the rule, used to key the cart adjustment it produces.
    pub fn rule_id(&self) -> &str {
        &self.rule_id
    }

    /// Products whose presence in the cart activates the surcharge.
    pub fn trigger_products(&self) -> &FxHashSet<ProductId> {
        &self.trigger_products
    }

    /// Configured rate before any per-match scaling.
    pub fn rate(&self) -> FeeRate {
        self.rate
    }

    /// Whether the rate is multiplied by the number of matching line items.
    pub fn increment_per_match(&self) -> bool {
        self.increment_per_match
    }

    /// Check whether a product is in the trigger set.
    pub fn triggers(&self, product: ProductId) -> bool {
        self.trigger_products.contains(&product)
    }

    /// Rate actually applied for `match_count` matching line items.
    ///
    /// # Errors
    ///
    /// Returns [`FeeError::Overflow`] if the scaled rate cannot be represented.
    pub fn effective_percentage(&self, match_count: usize) -> Result<Decimal, FeeError> {
        if !self.increment_per_match {
            return Ok(self.rate.points());
        }

        self.rate
            .points()
            .checked_mul(Decimal::from(match_count))
            .ok_or(FeeError::Overflow)
    }
}

/// A labelled surcharge to add to the cart.
#[derive(Debug, Clone, PartialEq)]
pub struct Fee<'a> {
    label: String,
    percentage: Decimal,
    amount: Money<'a, Currency>,
}

impl<'a> Fee<'a> {
    /// Create a fee for an effective percentage and amount.
    pub fn new(percentage: Decimal, amount: Money<'a, Currency>) -> Self {
        Self {
            label: fee_label(percentage),
            percentage,
            amount,
        }
    }

    /// Display label, e.g. `"10% Fee"`.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Effective percentage the fee was computed with.
    pub fn percentage(&self) -> Decimal {
        self.percentage
    }

    /// Fee amount in the cart currency.
    pub fn amount(&self) -> Money<'a, Currency> {
        self.amount
    }
}

/// Evaluate a fee rule against a cart.
///
/// Returns `None` when the rule has no trigger products or no line item
/// matches. A matching cart always yields a fee, even when its amount is zero.
///
/// Never fails: a negative contents total is treated as zero, and an
/// arithmetic overflow yields no fee. Both are logged at `warn`.
#[tracing::instrument(
    level = "debug",
    skip_all,
    fields(rule = %config.rule_id(), line_items = cart.len())
)]
pub fn evaluate<'a>(config: &RuleConfig, cart: &CartSnapshot<'a>) -> Option<Fee<'a>> {
    if config.trigger_products().is_empty() {
        return None;
    }

    let matches: SmallVec<[&LineItem; 8]> = cart
        .line_items()
        .filter(|item| config.triggers(item.product()))
        .collect();

    if matches.is_empty() {
        return None;
    }

    let total_minor = authoritative_total_minor(cart);

    let calculated = config
        .effective_percentage(matches.len())
        .and_then(|percentage| {
            percent_of_minor(percentage, total_minor).map(|fee_minor| (percentage, fee_minor))
        });

    match calculated {
        Ok((percentage, fee_minor)) => {
            let fee = Fee::new(percentage, Money::from_minor(fee_minor, cart.currency()));

            debug!(
                matches = matches.len(),
                label = fee.label(),
                amount_minor = fee_minor,
                "evaluated cart fee"
            );

            Some(fee)
        }
        Err(error) => {
            warn!(
                %error,
                matches = matches.len(),
                total_minor,
                "cart fee could not be calculated; no fee applied"
            );

            None
        }
    }
}

/// Contents total in minor units, clamped to zero.
fn authoritative_total_minor(cart: &CartSnapshot<'_>) -> i64 {
    let total_minor = cart.contents_total().to_minor_units();

    if total_minor < 0 {
        warn!(total_minor, "negative cart contents total; treating as zero");

        return 0;
    }

    total_minor
}

/// Calculate `percentage` points of a minor unit amount, rounded half away from zero.
///
/// # Errors
///
/// Returns [`FeeError::Overflow`] if the result cannot be represented in minor units.
pub fn percent_of_minor(percentage: Decimal, minor: i64) -> Result<i64, FeeError> {
    Decimal::from(minor)
        .checked_mul(percentage)
        .and_then(|scaled| scaled.checked_div(Decimal::ONE_HUNDRED))
        .ok_or(FeeError::Overflow)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or(FeeError::Overflow)
}

/// Label shown for a fee, e.g. `"12.5% Fee"`.
pub fn fee_label(percentage: Decimal) -> String {
    format!("{}% Fee", percentage.normalize())
}
