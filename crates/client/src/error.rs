//! Crate-level error type.
//!
//! Each module has its own error enum; `Error` unifies them for hosts that
//! drive several modules and only need one `Result`.

use thiserror::Error;

use crate::api::ApiError;
use crate::cart::CartError;
use crate::checkout::CheckoutError;
use crate::config::ConfigError;
use crate::orders::OrderError;
use crate::session::SessionError;

/// Any error the client library can return.
#[derive(Debug, Error)]
pub enum Error {
    /// Environment configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Session file could not be read or written.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Commerce API call failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    #[error("Order error: {0}")]
    Order(#[from] OrderError),
}

impl Error {
    /// Text suitable for an alert dialog.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Config(e) => e.to_string(),
            Self::Session(_) => "Could not save your session.".to_string(),
            Self::Api(e) => e.user_message(),
            Self::Cart(e) => e.user_message(),
            Self::Checkout(e) => e.user_message(),
            Self::Order(e) => e.user_message(),
        }
    }

    /// Whether the error points at a fault outside the user's control and
    /// is worth reporting to error tracking.
    #[must_use]
    pub const fn is_unexpected(&self) -> bool {
        matches!(
            self,
            Self::Session(_)
                | Self::Api(ApiError::Parse(_) | ApiError::InvalidPrice(_) | ApiError::Session(_))
                | Self::Cart(CartError::Api(ApiError::Parse(_) | ApiError::InvalidPrice(_)))
                | Self::Order(OrderError::Api(ApiError::Parse(_) | ApiError::InvalidPrice(_)))
                | Self::Checkout(
                    CheckoutError::Submission(ApiError::Parse(_) | ApiError::InvalidPrice(_))
                        | CheckoutError::Discount(ApiError::Parse(_) | ApiError::InvalidPrice(_))
                )
        )
    }
}

/// Result alias over [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use freshcart_core::OrderStatus;

    use super::*;

    #[test]
    fn test_user_message_delegates() {
        let err: Error = OrderError::NotCancellable(OrderStatus::Shipped).into();
        assert_eq!(err.user_message(), "Only orders being prepared can be cancelled.");
        assert!(!err.is_unexpected());

        let err: Error = ApiError::Parse("bad json".to_string()).into();
        assert!(err.is_unexpected());
    }

    #[test]
    fn test_malformed_checkout_responses_are_unexpected() {
        let err: Error =
            CheckoutError::Submission(ApiError::Parse("missing id".to_string())).into();
        assert!(err.is_unexpected());
        let err: Error =
            CheckoutError::Discount(ApiError::InvalidPrice("discount SAVE5".to_string())).into();
        assert!(err.is_unexpected());

        let err: Error = CheckoutError::Submission(ApiError::Transport("down".to_string())).into();
        assert!(!err.is_unexpected());
        let err: Error = CheckoutError::EmptySelection.into();
        assert!(!err.is_unexpected());
    }
}
