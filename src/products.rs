//! Products
//!
//! Product identity and the read-only catalog used to populate product
//! selection options.

use std::{fmt, num::ParseIntError, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Product identifier, as assigned by the host store.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(u64);

impl ProductId {
    /// Create a product id from its raw value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for ProductId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl FromStr for ProductId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Publication status of a catalog product.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    /// Visible in the storefront.
    Published,

    /// Not yet published.
    Draft,

    /// Only visible to store administrators.
    Private,
}

/// Product as seen by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogProduct {
    /// Product id
    pub id: ProductId,

    /// Product title
    pub title: String,

    /// Publication status
    pub status: ProductStatus,
}

impl CatalogProduct {
    /// Create a published product.
    pub fn published(id: impl Into<ProductId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            status: ProductStatus::Published,
        }
    }

    /// Create a product with an explicit status.
    pub fn with_status(
        id: impl Into<ProductId>,
        title: impl Into<String>,
        status: ProductStatus,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            status,
        }
    }
}

/// Errors raised by catalog providers.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog backend could not be reached or read.
    #[error("catalog unavailable: {0}")]
    Unavailable(String),
}

/// Read access to the host's product catalog.
#[cfg_attr(test, mockall::automock)]
pub trait Catalog {
    /// List published products, ordered by title ascending.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] if the backend cannot be read.
    fn list_published(&self) -> Result<Vec<CatalogProduct>, CatalogError>;
}

/// Catalog held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    products: Vec<CatalogProduct>,
}

impl InMemoryCatalog {
    /// Create a catalog from a set of products, in any order and status.
    pub fn new(products: impl Into<Vec<CatalogProduct>>) -> Self {
        Self {
            products: products.into(),
        }
    }

    /// Add a product to the catalog.
    pub fn insert(&mut self, product: CatalogProduct) {
        self.products.push(product);
    }

    /// Number of products held, in any status.
    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// Check if the catalog holds no products.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl Catalog for InMemoryCatalog {
    fn list_published(&self) -> Result<Vec<CatalogProduct>, CatalogError> {
        let mut published: Vec<CatalogProduct> = self
            .products
            .iter()
            .filter(|product| product.status == ProductStatus::Published)
            .cloned()
            .collect();

        published.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));

        Ok(published)
    }
}

/// A selectable product option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    /// Stored value when selected
    pub value: ProductId,

    /// Display label
    pub label: String,
}

impl From<&CatalogProduct> for SelectOption {
    fn from(product: &CatalogProduct) -> Self {
        Self {
            value: product.id,
            label: format!("{}. ID:{}", product.title, product.id),
        }
    }
}
