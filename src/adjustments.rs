//! Cart Adjustments
//!
//! Labelled fees applied to a cart by the checkout pipeline, one per rule.

use std::io;

use rusty_money::{Money, MoneyError, iso::Currency};
use smallvec::SmallVec;
use tabled::{
    builder::Builder,
    settings::{Alignment, Style, object::Columns},
};
use thiserror::Error;
use tracing::debug;

use crate::fees::Fee;

/// Errors raised while applying or totalling adjustments.
#[derive(Debug, Error)]
pub enum AdjustmentError {
    /// A fee was priced in a different currency than the cart (fee currency, cart currency).
    #[error("fee has currency {0}, but cart has currency {1}")]
    CurrencyMismatch(&'static str, &'static str),

    /// Wrapped money arithmetic error.
    #[error(transparent)]
    Money(#[from] MoneyError),

    /// IO error writing the summary table
    #[error("Failed to write cart summary: {0}")]
    Io(#[from] io::Error),
}

/// Fees currently applied to a cart, keyed by the rule that produced them.
///
/// Each rule holds at most one fee; recalculating replaces it instead of
/// stacking a second one.
#[derive(Debug, Clone)]
pub struct CartAdjustments<'a> {
    currency: &'a Currency,
    fees: SmallVec<[(String, Fee<'a>); 2]>,
}

impl<'a> CartAdjustments<'a> {
    /// Create an empty set of adjustments for a cart currency.
    #[must_use]
    pub fn new(currency: &'a Currency) -> Self {
        Self {
            currency,
            fees: SmallVec::new(),
        }
    }

    /// Replace the fee for `rule_id`. `None` clears it.
    ///
    /// # Errors
    ///
    /// Returns [`AdjustmentError::CurrencyMismatch`] if the fee is not in the
    /// cart currency. The previous fee is cleared either way.
    pub fn replace(&mut self, rule_id: &str, fee: Option<Fee<'a>>) -> Result<(), AdjustmentError> {
        let previous = self.remove(rule_id);

        let Some(fee) = fee else {
            if previous.is_some() {
                debug!(rule = rule_id, "cleared cart fee");
            }

            return Ok(());
        };

        let fee_currency = fee.amount().currency();

        if fee_currency != self.currency {
            return Err(AdjustmentError::CurrencyMismatch(
                fee_currency.iso_alpha_code,
                self.currency.iso_alpha_code,
            ));
        }

        debug!(rule = rule_id, label = fee.label(), "applied cart fee");

        self.fees.push((rule_id.to_string(), fee));

        Ok(())
    }

    /// Remove the fee for `rule_id`, returning it.
    pub fn remove(&mut self, rule_id: &str) -> Option<Fee<'a>> {
        let position = self.fees.iter().position(|(id, _)| id == rule_id)?;

        Some(self.fees.remove(position).1)
    }

    /// Fee currently applied by `rule_id`.
    pub fn fee(&self, rule_id: &str) -> Option<&Fee<'a>> {
        self.fees
            .iter()
            .find_map(|(id, fee)| (id == rule_id).then_some(fee))
    }

    /// Iterate over applied fees in the order they were added.
    pub fn fees(&self) -> impl Iterator<Item = (&str, &Fee<'a>)> {
        self.fees.iter().map(|(id, fee)| (id.as_str(), fee))
    }

    /// Get the number of applied fees.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fees.len()
    }

    /// Check if no fees are applied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fees.is_empty()
    }

    /// Sum of all applied fees.
    ///
    /// # Errors
    ///
    /// Returns a [`MoneyError`] if the money arithmetic fails.
    pub fn fees_total(&self) -> Result<Money<'a, Currency>, MoneyError> {
        self.fees
            .iter()
            .try_fold(Money::from_minor(0, self.currency), |acc, (_, fee)| {
                acc.add(fee.amount())
            })
    }

    /// Cart total including fees.
    ///
    /// # Errors
    ///
    /// Returns a [`MoneyError`] if `contents_total` is in another currency.
    pub fn total(
        &self,
        contents_total: Money<'a, Currency>,
    ) -> Result<Money<'a, Currency>, MoneyError> {
        contents_total.add(self.fees_total()?)
    }

    /// Write a summary table of the subtotal, each fee and the total.
    ///
    /// # Errors
    ///
    /// Returns an [`AdjustmentError`] if totalling fails or `out` cannot be written.
    pub fn write_to(
        &self,
        mut out: impl io::Write,
        contents_total: Money<'a, Currency>,
    ) -> Result<(), AdjustmentError> {
        let total = self.total(contents_total)?;
        let mut builder = Builder::default();

        builder.push_record(["Subtotal".to_string(), contents_total.to_string()]);

        for (_, fee) in self.fees() {
            builder.push_record([fee.label().to_string(), fee.amount().to_string()]);
        }

        builder.push_record(["Total".to_string(), total.to_string()]);

        let mut table = builder.build();

        table.with(Style::modern_rounded());
        table.modify(Columns::new(1..2), Alignment::right());

        writeln!(out, "{table}")?;

        Ok(())
    }
}
