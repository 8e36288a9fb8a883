//! Cart line items.

use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use crate::types::{CartLineId, Money, ProductId};

/// One product entry in the shopper's cart.
///
/// The server upserts by product: adding a product already in the cart
/// bumps its quantity instead of creating a second line. Quantity is
/// `NonZeroU32` because a zero-quantity line is removed, never kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Server-assigned cart entry id.
    pub id: CartLineId,
    pub product_id: ProductId,
    pub title: String,
    pub subtitle: String,
    pub unit_price: Money,
    pub quantity: NonZeroU32,
    /// Absolute image URL.
    pub image: Option<String>,
}

impl CartLine {
    /// Price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity.get())
    }

    /// Copy with a different quantity.
    #[must_use]
    pub fn with_quantity(&self, quantity: NonZeroU32) -> Self {
        Self {
            quantity,
            ..self.clone()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::types::CurrencyCode;

    fn line(price: rust_decimal::Decimal, quantity: u32) -> CartLine {
        CartLine {
            id: CartLineId::new(1),
            product_id: ProductId::new(5),
            title: "Bananas".to_string(),
            subtitle: "1kg".to_string(),
            unit_price: Money::new(price, CurrencyCode::USD),
            quantity: NonZeroU32::new(quantity).unwrap(),
            image: None,
        }
    }

    #[test]
    fn test_line_total() {
        assert_eq!(line(dec!(4.99), 2).line_total().to_string(), "$9.98");
    }

    #[test]
    fn test_zero_quantity_is_unrepresentable_on_the_wire() {
        let json = r#"{"id":1,"product_id":5,"title":"x","subtitle":"","unit_price":{"amount":"1","currency":"USD"},"quantity":0,"image":null}"#;
        assert!(serde_json::from_str::<CartLine>(json).is_err());
    }

    #[test]
    fn test_with_quantity_keeps_identity() {
        let original = line(dec!(1.25), 1);
        let bumped = original.with_quantity(NonZeroU32::new(4).unwrap());
        assert_eq!(bumped.id, original.id);
        assert_eq!(bumped.line_total().to_string(), "$5.00");
    }
}
