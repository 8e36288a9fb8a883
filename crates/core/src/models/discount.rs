//! Promo-code discounts.

use serde::{Deserialize, Serialize};

use crate::types::{AccountId, DiscountId, Money};

/// A flat-amount reduction looked up by code at checkout.
///
/// A resolved code with a zero amount is a valid lookup that simply gives
/// no benefit; it is distinct from a code that does not exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discount {
    pub id: Option<DiscountId>,
    pub account_id: Option<AccountId>,
    pub code: String,
    pub amount: Money,
}

impl Discount {
    /// Whether applying this discount reduces the total.
    #[must_use]
    pub fn is_applicable(&self) -> bool {
        self.amount.is_positive()
    }
}
