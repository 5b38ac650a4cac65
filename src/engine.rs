//! Fee Rule Engine
//!
//! Binds the fee rule to its settings. The checkout pipeline holds an engine
//! and calls it on every cart recalculation.

use tracing::{info, warn};

use crate::{
    adjustments::{AdjustmentError, CartAdjustments},
    cart::CartSnapshot,
    fees::{Fee, RuleConfig, evaluate},
    settings::{Settings, SettingsSchema, SettingsStore},
    validation::{ValidationError, validate},
};

/// Percentage fee rule, reading its configuration from a settings store.
#[derive(Debug)]
pub struct FeeRuleEngine<S: SettingsStore> {
    schema: SettingsSchema,
    store: S,
}

impl<S: SettingsStore> FeeRuleEngine<S> {
    /// Register the rule, validating the currently stored settings.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the settings cannot produce a rule; no
    /// engine is created in that case.
    #[tracing::instrument(skip_all, fields(section = %schema.section().id()), err)]
    pub fn register(schema: SettingsSchema, store: S) -> Result<Self, ValidationError> {
        let engine = Self { schema, store };
        let config = engine.load_config()?;

        info!(
            rule = config.rule_id(),
            rate = %config.rate(),
            trigger_products = config.trigger_products().len(),
            increment_per_match = config.increment_per_match(),
            "registered cart fee rule"
        );

        Ok(engine)
    }

    /// Id of the rule, which keys its cart adjustment.
    pub fn rule_id(&self) -> &str {
        self.schema.section().id()
    }

    /// Settings schema the rule reads.
    pub fn schema(&self) -> &SettingsSchema {
        &self.schema
    }

    /// Settings store the rule reads.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Settings store, mutably, for stores that accept updates.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Load and validate the current configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the stored settings are invalid.
    pub fn load_config(&self) -> Result<RuleConfig, ValidationError> {
        validate(&Settings::new(&self.schema, &self.store).snapshot())
    }

    /// Evaluate the rule against a cart with freshly loaded settings.
    ///
    /// Settings that became invalid after registration yield no fee.
    pub fn evaluate_cart<'a>(&self, cart: &CartSnapshot<'a>) -> Option<Fee<'a>> {
        match self.load_config() {
            Ok(config) => evaluate(&config, cart),
            Err(error) => {
                warn!(
                    rule = self.rule_id(),
                    %error,
                    "cart fee settings are invalid; no fee applied"
                );

                None
            }
        }
    }

    /// Evaluate the rule and replace its adjustment on the cart.
    ///
    /// # Errors
    ///
    /// Returns an [`AdjustmentError`] if the fee is not in the adjustments' currency.
    pub fn recalculate<'a>(
        &self,
        cart: &CartSnapshot<'a>,
        adjustments: &mut CartAdjustments<'a>,
    ) -> Result<(), AdjustmentError> {
        adjustments.replace(self.rule_id(), self.evaluate_cart(cart))
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::{Money, iso::GBP};
    use testresult::TestResult;

    use crate::{
        cart::LineItem,
        settings::{MemorySettingsStore, SettingKey, SettingValue, store::MockSettingsStore},
        validation::ValidationReason,
    };

    use super::*;

    fn key(field: &str) -> SettingKey {
        SettingKey::new("cart-increase", field)
    }

    #[test]
    fn register_fails_closed_on_invalid_percentage() -> TestResult {
        let store = MemorySettingsStore::default()
            .with_value(&key("percentage"), "lots");

        let result = FeeRuleEngine::register(SettingsSchema::cart_fees()?, store);

        assert!(matches!(
            result,
            Err(ValidationError {
                field: "percentage",
                reason: ValidationReason::NotANumber(_),
            })
        ));

        Ok(())
    }

    #[test]
    fn register_fails_closed_when_percentage_was_never_saved() -> TestResult {
        let products_only = MemorySettingsStore::default()
            .with_value(&key("products"), vec!["5"]);

        for store in [MemorySettingsStore::default(), products_only] {
            let result = FeeRuleEngine::register(SettingsSchema::cart_fees()?, store);

            assert!(matches!(
                result,
                Err(ValidationError {
                    field: "percentage",
                    reason: ValidationReason::Missing,
                })
            ));
        }

        Ok(())
    }

    #[test]
    fn register_fails_closed_on_blank_percentage() -> TestResult {
        let store = MemorySettingsStore::default()
            .with_value(&key("percentage"), "  ")
            .with_value(&key("products"), vec!["5"]);

        let result = FeeRuleEngine::register(SettingsSchema::cart_fees()?, store);

        assert!(matches!(
            result,
            Err(ValidationError {
                field: "percentage",
                reason: ValidationReason::Missing,
            })
        ));

        Ok(())
    }

    #[test]
    fn register_reads_saved_percentage() -> TestResult {
        let store = MemorySettingsStore::default()
            .with_value(&key("percentage"), 10_u64)
            .with_value(&key("products"), vec!["5"]);
        let engine = FeeRuleEngine::register(SettingsSchema::cart_fees()?, store)?;

        let config = engine.load_config()?;

        assert_eq!(config.rule_id(), "cart-increase");
        assert_eq!(config.rate().to_string(), "10%");

        Ok(())
    }

    #[test]
    fn evaluate_cart_reads_settings_on_every_call() -> TestResult {
        let store = MemorySettingsStore::default()
            .with_value(&key("percentage"), 10_u64)
            .with_value(&key("products"), vec!["5"]);
        let mut engine = FeeRuleEngine::register(SettingsSchema::cart_fees()?, store)?;
        let cart = CartSnapshot::new([LineItem::new(5_u64, 1)?], Money::from_minor(50_00, GBP));

        let before = engine.evaluate_cart(&cart).ok_or("expected a fee")?;

        engine.store_mut().set(&key("percentage"), 20_u64);

        let after = engine.evaluate_cart(&cart).ok_or("expected a fee")?;

        assert_eq!(before.amount(), Money::from_minor(5_00, GBP));
        assert_eq!(after.amount(), Money::from_minor(10_00, GBP));

        Ok(())
    }

    #[test]
    fn evaluate_cart_yields_nothing_when_settings_turn_invalid() -> TestResult {
        let store = MemorySettingsStore::default()
            .with_value(&key("percentage"), 10_u64)
            .with_value(&key("products"), vec!["5"]);
        let mut engine = FeeRuleEngine::register(SettingsSchema::cart_fees()?, store)?;
        let cart = CartSnapshot::new([LineItem::new(5_u64, 1)?], Money::from_minor(50_00, GBP));

        engine.store_mut().set(&key("percentage"), 250_u64);
        assert_eq!(engine.evaluate_cart(&cart), None);

        engine.store_mut().remove(&key("percentage"));
        assert_eq!(engine.evaluate_cart(&cart), None);

        Ok(())
    }

    #[test]
    fn register_reads_through_store_trait() -> TestResult {
        let mut store = MockSettingsStore::new();

        store.expect_get().returning(|key| match key.as_str() {
            "cart-increase_percentage" => Some(SettingValue::from("7.5")),
            "cart-increase_products" => Some(SettingValue::from(vec![9_u64])),
            "cart-increase_increment_per_product" => Some(SettingValue::from("yes")),
            _ => None,
        });

        let engine = FeeRuleEngine::register(SettingsSchema::cart_fees()?, store)?;
        let config = engine.load_config()?;

        assert_eq!(config.rate().to_string(), "7.5%");
        assert!(config.increment_per_match());
        assert_eq!(config.trigger_products().len(), 1);

        Ok(())
    }

    #[test]
    fn recalculate_replaces_previous_fee() -> TestResult {
        let store = MemorySettingsStore::default()
            .with_value(&key("percentage"), 10_u64)
            .with_value(&key("products"), vec!["5", "7"])
            .with_value(&key("increment_per_product"), "yes");
        let engine = FeeRuleEngine::register(SettingsSchema::cart_fees()?, store)?;
        let mut adjustments = CartAdjustments::new(GBP);

        let both = CartSnapshot::new(
            [LineItem::new(5_u64, 1)?, LineItem::new(7_u64, 1)?],
            Money::from_minor(100_00, GBP),
        );
        let one = CartSnapshot::new([LineItem::new(5_u64, 1)?], Money::from_minor(60_00, GBP));
        let none = CartSnapshot::new([LineItem::new(1_u64, 1)?], Money::from_minor(10_00, GBP));

        engine.recalculate(&both, &mut adjustments)?;
        engine.recalculate(&both, &mut adjustments)?;
        assert_eq!(adjustments.len(), 1);
        assert_eq!(adjustments.fees_total()?, Money::from_minor(20_00, GBP));

        engine.recalculate(&one, &mut adjustments)?;
        assert_eq!(adjustments.fees_total()?, Money::from_minor(6_00, GBP));

        engine.recalculate(&none, &mut adjustments)?;
        assert!(adjustments.is_empty());

        Ok(())
    }
}
