//! Orders, their line details, and the draft submitted at checkout.
//!
//! An order and its details are created together in one submission. The
//! unit price on each detail is a snapshot taken at that moment, so later
//! price changes never rewrite order history.

use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use crate::models::{CartLine, Discount};
use crate::types::{
    AccountId, CurrencyCode, DiscountId, Money, MoneyError, OrderDetailId, OrderId, OrderStatus,
    PaymentMethod, ProductId, Recipient,
};

/// Errors building an [`OrderDraft`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderDraftError {
    /// No lines were given.
    #[error("an order needs at least one item")]
    Empty,
    /// A line carries a price that cannot be charged.
    #[error("invalid price for {title} (product {product_id}): {reason}")]
    InvalidPrice {
        product_id: ProductId,
        title: String,
        reason: String,
    },
}

/// A submitted order as the server reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub account_id: Option<AccountId>,
    pub discount_id: Option<DiscountId>,
    pub recipient: Recipient,
    pub payment: PaymentMethod,
    pub total: Money,
    pub status: OrderStatus,
}

/// One product line of a submitted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetail {
    pub id: Option<OrderDetailId>,
    pub order_id: Option<OrderId>,
    pub product_id: Option<ProductId>,
    pub quantity: u32,
    pub unit_price: Money,
    pub line_total: Money,
}

/// A detail line about to be submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetailDraft {
    pub product_id: ProductId,
    pub quantity: NonZeroU32,
    pub unit_price: Money,
    pub line_total: Money,
}

impl OrderDetailDraft {
    /// Snapshot a cart line's price and quantity.
    ///
    /// # Errors
    ///
    /// Returns [`OrderDraftError::InvalidPrice`] when the price is negative
    /// or not in `currency`.
    pub fn from_line(line: &CartLine, currency: CurrencyCode) -> Result<Self, OrderDraftError> {
        let invalid = |reason: String| OrderDraftError::InvalidPrice {
            product_id: line.product_id,
            title: line.title.clone(),
            reason,
        };

        if line.unit_price.currency() != currency {
            return Err(invalid(
                MoneyError::CurrencyMismatch {
                    left: currency,
                    right: line.unit_price.currency(),
                }
                .to_string(),
            ));
        }
        if line.unit_price.is_negative() {
            return Err(invalid(format!("negative price {}", line.unit_price)));
        }

        Ok(Self {
            product_id: line.product_id,
            quantity: line.quantity,
            unit_price: line.unit_price,
            line_total: line.line_total(),
        })
    }
}

/// Everything the server needs to create an order with its details.
///
/// Always starts in [`OrderStatus::Preparing`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDraft {
    pub account_id: Option<AccountId>,
    pub discount_id: Option<DiscountId>,
    pub recipient: Recipient,
    pub payment: PaymentMethod,
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
    pub status: OrderStatus,
    pub details: Vec<OrderDetailDraft>,
}

impl OrderDraft {
    /// Build a draft from the selected cart lines.
    ///
    /// The total is `subtotal - discount`, floored at zero. Every line is
    /// converted before anything is returned, so one bad price rejects the
    /// whole draft.
    ///
    /// # Errors
    ///
    /// Returns [`OrderDraftError::Empty`] for no lines, or the first
    /// [`OrderDraftError::InvalidPrice`].
    pub fn from_lines<'a, I>(
        lines: I,
        currency: CurrencyCode,
        recipient: Recipient,
        payment: PaymentMethod,
        discount: Option<&Discount>,
        account_id: Option<AccountId>,
    ) -> Result<Self, OrderDraftError>
    where
        I: IntoIterator<Item = &'a CartLine>,
    {
        let details = lines
            .into_iter()
            .map(|line| OrderDetailDraft::from_line(line, currency))
            .collect::<Result<Vec<_>, _>>()?;

        if details.is_empty() {
            return Err(OrderDraftError::Empty);
        }

        // Currencies were checked per line, so the sum cannot mismatch.
        let subtotal = Money::sum(currency, details.iter().map(|d| d.line_total))
            .unwrap_or_else(|_| Money::zero(currency));
        let applicable = discount.filter(|d| d.is_applicable() && d.amount.currency() == currency);
        let discount_amount = applicable.map_or_else(|| Money::zero(currency), |d| d.amount);
        let total = subtotal
            .saturating_sub(discount_amount)
            .unwrap_or(subtotal);

        Ok(Self {
            account_id,
            discount_id: applicable.and_then(|d| d.id),
            recipient,
            payment,
            subtotal,
            discount: discount_amount,
            total,
            status: OrderStatus::Preparing,
            details,
        })
    }

    /// Products referenced by this draft.
    pub fn product_ids(&self) -> impl Iterator<Item = ProductId> + '_ {
        self.details.iter().map(|d| d.product_id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::types::CartLineId;

    fn line(id: i64, product: i64, price: Decimal, quantity: u32) -> CartLine {
        CartLine {
            id: CartLineId::new(id),
            product_id: ProductId::new(product),
            title: format!("product {product}"),
            subtitle: String::new(),
            unit_price: Money::new(price, CurrencyCode::USD),
            quantity: NonZeroU32::new(quantity).unwrap(),
            image: None,
        }
    }

    fn recipient() -> Recipient {
        Recipient::new("An", "0901", "1 Main St")
    }

    fn discount(amount: Decimal) -> Discount {
        Discount {
            id: Some(DiscountId::new(9)),
            account_id: None,
            code: "SAVE5".to_string(),
            amount: Money::new(amount, CurrencyCode::USD),
        }
    }

    #[test]
    fn test_single_line_without_discount() {
        let lines = [line(1, 5, dec!(4.99), 2)];
        let draft = OrderDraft::from_lines(
            &lines,
            CurrencyCode::USD,
            recipient(),
            PaymentMethod::Cash,
            None,
            None,
        )
        .unwrap();

        assert_eq!(draft.total.amount(), dec!(9.98));
        assert_eq!(draft.status, OrderStatus::Preparing);
        assert_eq!(draft.details.len(), 1);
        assert_eq!(draft.details[0].line_total.amount(), dec!(9.98));
        assert_eq!(draft.discount_id, None);
    }

    #[test]
    fn test_discount_is_subtracted_and_floored() {
        let lines = [line(1, 5, dec!(4.99), 2)];
        let draft = OrderDraft::from_lines(
            &lines,
            CurrencyCode::USD,
            recipient(),
            PaymentMethod::Online,
            Some(&discount(dec!(5))),
            None,
        )
        .unwrap();
        assert_eq!(draft.total.amount(), dec!(4.98));
        assert_eq!(draft.discount_id, Some(DiscountId::new(9)));

        let draft = OrderDraft::from_lines(
            &lines,
            CurrencyCode::USD,
            recipient(),
            PaymentMethod::Online,
            Some(&discount(dec!(50))),
            None,
        )
        .unwrap();
        assert!(draft.total.is_zero());
    }

    #[test]
    fn test_zero_discount_is_ignored() {
        let lines = [line(1, 5, dec!(3), 1)];
        let draft = OrderDraft::from_lines(
            &lines,
            CurrencyCode::USD,
            recipient(),
            PaymentMethod::Cash,
            Some(&discount(dec!(0))),
            None,
        )
        .unwrap();
        assert_eq!(draft.total.amount(), dec!(3));
        assert_eq!(draft.discount_id, None);
    }

    #[test]
    fn test_one_bad_price_rejects_everything() {
        let mut bad = line(2, 6, dec!(1), 1);
        bad.unit_price = Money::new(dec!(1), CurrencyCode::EUR);
        let lines = [line(1, 5, dec!(4.99), 2), bad];

        let err = OrderDraft::from_lines(
            &lines,
            CurrencyCode::USD,
            recipient(),
            PaymentMethod::Cash,
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, OrderDraftError::InvalidPrice { product_id, .. } if product_id == ProductId::new(6)));

        let negative = [line(3, 7, dec!(-2), 1)];
        assert!(matches!(
            OrderDraft::from_lines(
                &negative,
                CurrencyCode::USD,
                recipient(),
                PaymentMethod::Cash,
                None,
                None,
            ),
            Err(OrderDraftError::InvalidPrice { .. })
        ));
    }

    #[test]
    fn test_empty_selection() {
        let none: [CartLine; 0] = [];
        let err = OrderDraft::from_lines(
            &none,
            CurrencyCode::USD,
            recipient(),
            PaymentMethod::Cash,
            None,
            None,
        )
        .unwrap_err();
        assert_eq!(err, OrderDraftError::Empty);
    }
}
