//! Cart

use rusty_money::{Money, iso::Currency};
use thiserror::Error;

use crate::products::ProductId;

/// Errors related to cart snapshot construction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartError {
    /// A line item was created with a zero quantity.
    #[error("line item for product {0} has zero quantity")]
    ZeroQuantity(ProductId),
}

/// One distinct product entry in a cart.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LineItem {
    product: ProductId,
    quantity: u32,
}

impl LineItem {
    /// Create a line item.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::ZeroQuantity`] if `quantity` is zero.
    pub fn new(product: impl Into<ProductId>, quantity: u32) -> Result<Self, CartError> {
        let product = product.into();

        if quantity == 0 {
            return Err(CartError::ZeroQuantity(product));
        }

        Ok(Self { product, quantity })
    }

    /// Returns the product of the line item
    pub fn product(&self) -> ProductId {
        self.product
    }

    /// Returns the quantity of the line item
    pub fn quantity(&self) -> u32 {
        self.quantity
    }
}

/// Point-in-time view of a cart, as handed over by the checkout pipeline.
///
/// `contents_total` already reflects any other discounts and is taken as
/// authoritative; it is not recomputed from the line items.
#[derive(Debug, Clone, PartialEq)]
pub struct CartSnapshot<'a> {
    line_items: Vec<LineItem>,
    contents_total: Money<'a, Currency>,
}

impl<'a> CartSnapshot<'a> {
    /// Create a cart snapshot.
    pub fn new(line_items: impl Into<Vec<LineItem>>, contents_total: Money<'a, Currency>) -> Self {
        Self {
            line_items: line_items.into(),
            contents_total,
        }
    }

    /// Create an empty cart with a zero total.
    #[must_use]
    pub fn empty(currency: &'a Currency) -> Self {
        Self::new(Vec::new(), Money::from_minor(0, currency))
    }

    /// Iterate over the line items in cart order.
    pub fn line_items(&self) -> impl Iterator<Item = &LineItem> {
        self.line_items.iter()
    }

    /// Contents total as provided by the host.
    pub fn contents_total(&self) -> Money<'a, Currency> {
        self.contents_total
    }

    /// Currency of the cart total.
    pub fn currency(&self) -> &'a Currency {
        self.contents_total.currency()
    }

    /// Get the number of line items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.line_items.len()
    }

    /// Check if the cart has no line items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.line_items.is_empty()
    }
}
