//! Settings Schema
//!
//! Field layout of an admin settings section. Describes the form; rendering
//! it is up to the host.

use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::{
    products::{Catalog, CatalogError, SelectOption},
    settings::{SettingKey, SettingValue},
    validation::{INCREMENT_FIELD, PERCENTAGE_FIELD, PRODUCTS_FIELD, RULE_ID_FIELD},
};

/// Section id of the stock cart fee settings.
pub const CART_FEES_SECTION_ID: &str = "cart-increase";

/// Percentage the admin form pre-fills. Never applied to an unsaved setting.
pub const DEFAULT_PERCENTAGE: u64 = 10;

/// Errors raised while describing a settings section.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    /// A required section property was missing or blank.
    #[error("settings section {0} is required")]
    MissingRequired(&'static str),

    /// A field was declared without an id.
    #[error("settings field is missing an id")]
    MissingFieldId,

    /// A field id is reserved for the rule id.
    #[error("settings field id {0:?} is reserved")]
    ReservedFieldId(String),

    /// Two fields share the same id.
    #[error("settings field {0:?} is declared more than once")]
    DuplicateField(String),
}

/// Where a settings section lives in the host's admin area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsSection {
    tab: String,
    id: String,
    name: String,
}

impl SettingsSection {
    /// Create a section on a host settings tab.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::MissingRequired`] if `id` or `name` is blank.
    pub fn new(
        tab: impl Into<String>,
        id: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self, SchemaError> {
        let id = id.into();
        let name = name.into();

        if id.trim().is_empty() {
            return Err(SchemaError::MissingRequired("id"));
        }

        if name.trim().is_empty() {
            return Err(SchemaError::MissingRequired("name"));
        }

        Ok(Self {
            tab: tab.into(),
            id,
            name,
        })
    }

    /// Host settings tab, e.g. `products`.
    pub fn tab(&self) -> &str {
        &self.tab
    }

    /// Section id; also the namespace of every field key.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Section display name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Lazily resolved option lists.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OptionSource {
    /// Every published product in the catalog.
    AllProducts,
}

impl OptionSource {
    /// Resolve the options against a catalog.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] if the catalog cannot be read.
    pub fn resolve<C: Catalog + ?Sized>(
        self,
        catalog: &C,
    ) -> Result<Vec<SelectOption>, CatalogError> {
        match self {
            Self::AllProducts => all_products(catalog),
        }
    }
}

fn all_products<C: Catalog + ?Sized>(catalog: &C) -> Result<Vec<SelectOption>, CatalogError> {
    Ok(catalog
        .list_published()?
        .iter()
        .map(SelectOption::from)
        .collect())
}

/// Kind of input a field is shown as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// Numeric input bounded by `min..=max`.
    Number {
        /// Smallest accepted value
        min: Decimal,
        /// Largest accepted value
        max: Decimal,
    },

    /// Multiple choice from a resolved option list.
    MultiSelect {
        /// Source of the options
        options: OptionSource,
    },

    /// Single yes/no checkbox.
    Checkbox,
}

/// Declaration of a single settings field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    id: String,
    kind: FieldKind,
    name: String,
    description: Option<String>,
    tip: Option<String>,
    default: Option<SettingValue>,
}

impl FieldSpec {
    /// Create a field of any kind.
    pub fn new(id: impl Into<String>, kind: FieldKind, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            name: name.into(),
            description: None,
            tip: None,
            default: None,
        }
    }

    /// Numeric field bounded by `min..=max`.
    pub fn number(
        id: impl Into<String>,
        name: impl Into<String>,
        min: Decimal,
        max: Decimal,
    ) -> Self {
        Self::new(id, FieldKind::Number { min, max }, name)
    }

    /// Multiselect field with options from `options`.
    pub fn multiselect(
        id: impl Into<String>,
        name: impl Into<String>,
        options: OptionSource,
    ) -> Self {
        Self::new(id, FieldKind::MultiSelect { options }, name)
    }

    /// Checkbox field.
    pub fn checkbox(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(id, FieldKind::Checkbox, name)
    }

    /// Set the description shown below the input.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the hover tip.
    #[must_use]
    pub fn with_tip(mut self, tip: impl Into<String>) -> Self {
        self.tip = Some(tip.into());
        self
    }

    /// Set the value used when nothing is stored.
    #[must_use]
    pub fn with_default(mut self, default: impl Into<SettingValue>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Unqualified field id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Input kind
    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// Field label
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field description
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Field tip
    pub fn tip(&self) -> Option<&str> {
        self.tip.as_deref()
    }

    /// Value the admin form pre-fills; not read back as a stored value.
    pub fn default_value(&self) -> Option<&SettingValue> {
        self.default.as_ref()
    }
}

/// A field registered in a schema, with its fully qualified key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaField {
    key: SettingKey,
    spec: FieldSpec,
}

impl SchemaField {
    /// Fully qualified store key
    pub fn key(&self) -> &SettingKey {
        &self.key
    }

    /// Field declaration
    pub fn spec(&self) -> &FieldSpec {
        &self.spec
    }
}

/// A field ready to hand to the host form renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedField<'s> {
    /// Section heading.
    Title {
        /// Section id
        id: &'s str,
        /// Heading text
        title: &'s str,
        /// Text below the heading
        description: &'s str,
    },

    /// An input field, with its option list resolved when it has one.
    Input {
        /// The field
        field: &'s SchemaField,
        /// Resolved options for multiselect fields
        options: Option<Vec<SelectOption>>,
    },

    /// End of the section.
    SectionEnd {
        /// Section id
        id: &'s str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Heading {
    title: String,
    description: String,
}

/// Settings section with its ordered fields.
#[derive(Debug, Clone)]
pub struct SettingsSchema {
    section: SettingsSection,
    heading: Option<Heading>,
    fields: Vec<SchemaField>,
    index: FxHashMap<String, usize>,
}

impl SettingsSchema {
    /// Start building a schema for a section.
    pub fn builder(section: SettingsSection) -> SettingsSchemaBuilder {
        SettingsSchemaBuilder {
            section,
            heading: None,
            fields: Vec::new(),
        }
    }

    /// The stock cart fee settings: a percentage, the trigger products and the
    /// per-product increment flag.
    ///
    /// # Errors
    ///
    /// Never fails in practice; errors only surface if the declarations below
    /// become invalid.
    pub fn cart_fees() -> Result<Self, SchemaError> {
        let section = SettingsSection::new("products", CART_FEES_SECTION_ID, "Product Cart Fees")?;

        Self::builder(section)
            .title(
                "Cart Percentage Increaser",
                "The following options allow you to choose products that will increase the \
                 total value of the shopping cart by a specified percentage.",
            )
            .field(
                FieldSpec::number(
                    PERCENTAGE_FIELD,
                    "Percentage Value",
                    Decimal::ZERO,
                    Decimal::ONE_HUNDRED,
                )
                .with_default(DEFAULT_PERCENTAGE)
                .with_description(
                    "The percentage amount to increase the total cart value by when applicable.",
                )
                .with_tip(format!("Pre-filled with {DEFAULT_PERCENTAGE}%. Save to apply.")),
            )
            .field(
                FieldSpec::multiselect(PRODUCTS_FIELD, "Products", OptionSource::AllProducts)
                    .with_description("The products that will trigger the price increase.")
                    .with_tip("Hold cmd (mac) or control (windows) to select multiple values."),
            )
            .field(
                FieldSpec::checkbox(INCREMENT_FIELD, "Increment fee per product?")
                    .with_description(
                        "When ticked, 2 products selected with a rate of 10% will add a 20% \
                         (10% * 2) fee to the cart. If unticked, the fee will be 10% regardless \
                         of the number of products.",
                    ),
            )
            .build()
    }

    /// The section the schema describes.
    pub fn section(&self) -> &SettingsSection {
        &self.section
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    /// Look up a field by its unqualified id.
    pub fn field(&self, id: &str) -> Option<&SchemaField> {
        self.index.get(id).and_then(|&i| self.fields.get(i))
    }

    /// Add this section to a host tab's section list, if it belongs to `tab`.
    pub fn register_section(&self, tab: &str, sections: &mut FxHashMap<String, String>) {
        if tab == self.section.tab {
            sections.insert(self.section.id.clone(), self.section.name.clone());
        }
    }

    /// Fields to render when the host shows `current_section`.
    ///
    /// Returns `None` for other sections, or if the schema declares nothing.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] if an option list cannot be resolved.
    pub fn fields_for_section<C: Catalog + ?Sized>(
        &self,
        current_section: &str,
        catalog: &C,
    ) -> Result<Option<Vec<ResolvedField<'_>>>, CatalogError> {
        if current_section != self.section.id {
            return Ok(None);
        }

        if self.heading.is_none() && self.fields.is_empty() {
            return Ok(None);
        }

        let mut resolved = Vec::with_capacity(self.fields.len() + 2);

        if let Some(heading) = &self.heading {
            resolved.push(ResolvedField::Title {
                id: &self.section.id,
                title: &heading.title,
                description: &heading.description,
            });
        }

        for field in &self.fields {
            let options = match field.spec.kind {
                FieldKind::MultiSelect { options } => Some(options.resolve(catalog)?),
                FieldKind::Number { .. } | FieldKind::Checkbox => None,
            };

            resolved.push(ResolvedField::Input { field, options });
        }

        resolved.push(ResolvedField::SectionEnd {
            id: &self.section.id,
        });

        Ok(Some(resolved))
    }
}

/// Builder for [`SettingsSchema`].
#[derive(Debug)]
pub struct SettingsSchemaBuilder {
    section: SettingsSection,
    heading: Option<Heading>,
    fields: Vec<FieldSpec>,
}

impl SettingsSchemaBuilder {
    /// Set the section heading.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>, description: impl Into<String>) -> Self {
        self.heading = Some(Heading {
            title: title.into(),
            description: description.into(),
        });
        self
    }

    /// Append a field.
    #[must_use]
    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    /// Qualify field keys and build the schema.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] for blank, reserved or duplicate field ids.
    pub fn build(self) -> Result<SettingsSchema, SchemaError> {
        let mut index = FxHashMap::default();
        let mut fields = Vec::with_capacity(self.fields.len());

        for spec in self.fields {
            if spec.id.trim().is_empty() {
                return Err(SchemaError::MissingFieldId);
            }

            if spec.id == RULE_ID_FIELD {
                return Err(SchemaError::ReservedFieldId(spec.id));
            }

            if index.contains_key(&spec.id) {
                return Err(SchemaError::DuplicateField(spec.id));
            }

            index.insert(spec.id.clone(), fields.len());
            fields.push(SchemaField {
                key: SettingKey::new(&self.section.id, &spec.id),
                spec,
            });
        }

        Ok(SettingsSchema {
            section: self.section,
            heading: self.heading,
            fields,
            index,
        })
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::products::{CatalogProduct, MockCatalog, ProductId};

    use super::*;

    fn section() -> Result<SettingsSection, SchemaError> {
        SettingsSection::new("products", "cart-increase", "Product Cart Fees")
    }

    #[test]
    fn section_requires_id_and_name() {
        assert_eq!(
            SettingsSection::new("products", " ", "Fees"),
            Err(SchemaError::MissingRequired("id"))
        );
        assert_eq!(
            SettingsSection::new("products", "fees", ""),
            Err(SchemaError::MissingRequired("name"))
        );
    }

    #[test]
    fn build_qualifies_field_keys_once() -> TestResult {
        let schema = SettingsSchema::builder(section()?)
            .field(FieldSpec::checkbox("cart-increase_flag", "Flag"))
            .build()?;

        let field = schema.field("cart-increase_flag").ok_or("missing field")?;

        assert_eq!(field.key().as_str(), "cart-increase_cart-increase_flag");

        Ok(())
    }

    #[test]
    fn build_rejects_duplicate_and_reserved_ids() -> TestResult {
        let duplicate = SettingsSchema::builder(section()?)
            .field(FieldSpec::checkbox("flag", "Flag"))
            .field(FieldSpec::checkbox("flag", "Flag again"))
            .build();

        let reserved = SettingsSchema::builder(section()?)
            .field(FieldSpec::checkbox("id", "Id"))
            .build();

        let blank = SettingsSchema::builder(section()?)
            .field(FieldSpec::checkbox("", "Blank"))
            .build();

        assert!(matches!(duplicate, Err(SchemaError::DuplicateField(id)) if id == "flag"));
        assert!(matches!(reserved, Err(SchemaError::ReservedFieldId(id)) if id == "id"));
        assert!(matches!(blank, Err(SchemaError::MissingFieldId)));

        Ok(())
    }

    #[test]
    fn cart_fees_schema_declares_stock_fields() -> TestResult {
        let schema = SettingsSchema::cart_fees()?;

        let ids: Vec<&str> = schema.fields().iter().map(|f| f.spec().id()).collect();
        let percentage = schema.field("percentage").ok_or("missing percentage")?;

        assert_eq!(ids, ["percentage", "products", "increment_per_product"]);
        assert_eq!(schema.section().tab(), "products");
        assert_eq!(percentage.key().as_str(), "cart-increase_percentage");
        assert_eq!(
            percentage.spec().default_value(),
            Some(&SettingValue::from(10_u64))
        );

        Ok(())
    }

    #[test]
    fn register_section_only_touches_matching_tab() -> TestResult {
        let schema = SettingsSchema::cart_fees()?;
        let mut sections = FxHashMap::default();

        schema.register_section("shipping", &mut sections);
        assert!(sections.is_empty());

        schema.register_section("products", &mut sections);
        assert_eq!(
            sections.get("cart-increase").map(String::as_str),
            Some("Product Cart Fees")
        );

        Ok(())
    }

    #[test]
    fn fields_for_other_sections_are_untouched() -> TestResult {
        let schema = SettingsSchema::cart_fees()?;
        let mut catalog = MockCatalog::new();

        catalog.expect_list_published().never();

        assert_eq!(schema.fields_for_section("inventory", &catalog)?, None);

        Ok(())
    }

    #[test]
    fn fields_for_section_resolves_product_options() -> TestResult {
        let schema = SettingsSchema::cart_fees()?;
        let mut catalog = MockCatalog::new();

        catalog.expect_list_published().times(1).returning(|| {
            Ok(vec![
                CatalogProduct::published(3_u64, "Gift Wrap"),
                CatalogProduct::published(8_u64, "Rush Delivery"),
            ])
        });

        let fields = schema
            .fields_for_section("cart-increase", &catalog)?
            .ok_or("expected fields")?;

        assert_eq!(fields.len(), 5);
        assert!(matches!(fields.first(), Some(ResolvedField::Title { .. })));
        assert!(matches!(
            fields.last(),
            Some(ResolvedField::SectionEnd { id: "cart-increase" })
        ));

        let options = fields
            .iter()
            .find_map(|field| match field {
                ResolvedField::Input {
                    options: Some(options),
                    ..
                } => Some(options),
                _ => None,
            })
            .ok_or("expected product options")?;

        assert_eq!(
            options,
            &[
                SelectOption {
                    value: ProductId::new(3),
                    label: "Gift Wrap. ID:3".to_string(),
                },
                SelectOption {
                    value: ProductId::new(8),
                    label: "Rush Delivery. ID:8".to_string(),
                },
            ]
        );

        Ok(())
    }

    #[test]
    fn fields_for_section_propagates_catalog_errors() -> TestResult {
        let schema = SettingsSchema::cart_fees()?;
        let mut catalog = MockCatalog::new();

        catalog
            .expect_list_published()
            .returning(|| Err(CatalogError::Unavailable("timeout".to_string())));

        let result = schema.fields_for_section("cart-increase", &catalog);

        assert!(matches!(result, Err(CatalogError::Unavailable(_))));

        Ok(())
    }

    #[test]
    fn empty_schema_has_no_fields_to_render() -> TestResult {
        let schema = SettingsSchema::builder(section()?).build()?;
        let catalog = MockCatalog::new();

        assert_eq!(schema.fields_for_section("cart-increase", &catalog)?, None);

        Ok(())
    }
}
