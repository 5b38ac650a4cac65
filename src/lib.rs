//! Cart Fees
//!
//! Applies a percentage surcharge to a shopping cart when it contains any of a
//! configured set of products, optionally scaled by the number of matching
//! line items.
//!
//! The fee rule is evaluated by [`fees::evaluate`], a pure function over a
//! validated [`fees::RuleConfig`] and a [`cart::CartSnapshot`]. The
//! [`engine::FeeRuleEngine`] ties the rule to a [`settings::SettingsStore`] so
//! the host checkout pipeline can call it directly on every recalculation.

pub mod adjustments;
pub mod cart;
pub mod engine;
pub mod fees;
pub mod prelude;
pub mod products;
pub mod settings;
pub mod validation;
