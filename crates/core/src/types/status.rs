//! Status enums for orders and payments.

use serde::{Deserialize, Serialize};

/// Order lifecycle status.
///
/// The server owns every transition. The only one a client may request is
/// `Preparing -> Canceled`; see [`OrderStatus::is_cancellable`].
///
/// Serialized as the integer the API uses (`0..=3`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "i32", into = "i32")]
pub enum OrderStatus {
    #[default]
    Preparing,
    Shipped,
    Delivered,
    Canceled,
}

impl OrderStatus {
    /// All statuses in lifecycle order, for order-tracking tabs.
    pub const ALL: [Self; 4] = [
        Self::Preparing,
        Self::Shipped,
        Self::Delivered,
        Self::Canceled,
    ];

    /// Whether the client may request a cancellation.
    #[must_use]
    pub const fn is_cancellable(self) -> bool {
        matches!(self, Self::Preparing)
    }

    /// Wire code.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Preparing => 0,
            Self::Shipped => 1,
            Self::Delivered => 2,
            Self::Canceled => 3,
        }
    }
}

impl TryFrom<i32> for OrderStatus {
    type Error = String;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Preparing),
            1 => Ok(Self::Shipped),
            2 => Ok(Self::Delivered),
            3 => Ok(Self::Canceled),
            other => Err(format!("invalid order status: {other}")),
        }
    }
}

impl From<OrderStatus> for i32 {
    fn from(status: OrderStatus) -> Self {
        status.code()
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Preparing => write!(f, "preparing"),
            Self::Shipped => write!(f, "shipped"),
            Self::Delivered => write!(f, "delivered"),
            Self::Canceled => write!(f, "canceled"),
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "preparing" => Ok(Self::Preparing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "canceled" | "cancelled" => Ok(Self::Canceled),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

/// How the customer pays.
///
/// The API models this as a boolean: `true` is cash on delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "bool", into = "bool")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Online,
}

impl From<bool> for PaymentMethod {
    fn from(cash: bool) -> Self {
        if cash { Self::Cash } else { Self::Online }
    }
}

impl From<PaymentMethod> for bool {
    fn from(method: PaymentMethod) -> Self {
        matches!(method, PaymentMethod::Cash)
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cash => write!(f, "cash"),
            Self::Online => write!(f, "online"),
        }
    }
}
