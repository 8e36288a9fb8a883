//! Remote commerce API client.
//!
//! # Architecture
//!
//! - One `CommerceClient` per process, cheap to clone (`Arc` inner)
//! - The server is the source of truth; nothing is cached here except the
//!   bearer token, which lives in the shared [`SessionStore`]
//! - Wire DTOs (Vietnamese field names) live in [`types`]; conversion to
//!   domain types happens once in `conversions`, so prices are parsed into
//!   `Money` at the boundary
//! - Cart, stock, discount, order and favourite operations are also
//!   exposed through the [`CommerceApi`] trait, which the cart state and
//!   checkout workflow depend on
//!
//! Endpoint methods are split by domain: `auth`, `catalog`, `cart`,
//! `favourites` and `orders`.

mod auth;
mod cart;
mod catalog;
mod conversions;
mod favourites;
mod orders;
pub mod types;

use std::num::NonZeroU32;
use std::sync::Arc;

use async_trait::async_trait;
use freshcart_core::{
    CartLine, CartLineId, CurrencyCode, Discount, FavouriteId, FavouriteItem, Order, OrderDetail,
    OrderDraft, OrderId, ProductId,
};
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, error, warn};
use url::Url;

use crate::config::ApiConfig;
use crate::session::{SessionError, SessionStore};

/// Longest server body excerpt kept in logs and fallback messages.
const BODY_EXCERPT_CHARS: usize = 500;

/// Errors that can occur when talking to the commerce API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed (connection, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Connection failure reported without a `reqwest` error.
    #[error("Transport error: {0}")]
    Transport(String),

    /// No token stored locally; no request was made.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The server rejected the bearer token.
    #[error("Session expired")]
    SessionExpired,

    /// Login or registration rejected.
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    /// Promo code lookup failed.
    #[error("Discount not found: {0}")]
    DiscountNotFound(String),

    /// Order submission rejected.
    #[error("Order rejected: {0}")]
    OrderRejected(String),

    /// Any other non-success response.
    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Response body did not match the expected shape.
    #[error("JSON parse error: {0}")]
    Parse(String),

    /// A price from the server could not be parsed.
    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    /// The session could not be persisted after login.
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl ApiError {
    /// Whether the request never got a usable answer from the server.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Transport(_))
    }

    /// Text suitable for an alert dialog.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Http(_) | Self::Transport(_) => "Cannot connect to the server.".to_string(),
            Self::NotAuthenticated => "Please log in first.".to_string(),
            Self::SessionExpired => "Your session has expired. Please log in again.".to_string(),
            Self::AuthFailed(message)
            | Self::DiscountNotFound(message)
            | Self::OrderRejected(message)
            | Self::Rejected { message, .. }
            | Self::NotFound(message)
                if !message.is_empty() =>
            {
                message.clone()
            }
            Self::AuthFailed(_) => "Login failed.".to_string(),
            Self::DiscountNotFound(_) => "Promo code not found.".to_string(),
            Self::OrderRejected(_) => "The order could not be placed.".to_string(),
            Self::NotFound(_) => "Not found.".to_string(),
            Self::Rejected { .. } | Self::Parse(_) | Self::InvalidPrice(_) => {
                "The server sent an unexpected response.".to_string()
            }
            Self::Session(_) => "Could not save your session.".to_string(),
        }
    }

    /// Re-tag a generic rejection with a domain-specific variant.
    fn reclassify(self, tag: fn(String) -> Self) -> Self {
        match self {
            Self::Rejected { message, .. } => tag(message),
            other => other,
        }
    }
}

// =============================================================================
// CommerceApi
// =============================================================================

/// Operations the cart, checkout, order and favourite flows depend on.
///
/// Implemented by [`CommerceClient`] and, with the `testing` feature, by
/// `InMemoryCommerce`.
#[async_trait]
pub trait CommerceApi: Send + Sync {
    /// Currency every price from this backend is denominated in.
    fn currency(&self) -> CurrencyCode;

    async fn fetch_cart(&self) -> Result<Vec<CartLine>, ApiError>;

    /// Server-side upsert: an existing line for `product` grows by `quantity`.
    async fn add_to_cart(&self, product: ProductId, quantity: NonZeroU32) -> Result<(), ApiError>;

    async fn remove_from_cart(&self, line: CartLineId) -> Result<(), ApiError>;

    /// Units of `product` currently in stock.
    async fn stock(&self, product: ProductId) -> Result<u32, ApiError>;

    async fn find_discount(&self, code: &str) -> Result<Discount, ApiError>;

    /// Create an order with its details. Returns the new id when the server
    /// reports one.
    async fn submit_order(&self, draft: &OrderDraft) -> Result<Option<OrderId>, ApiError>;

    async fn orders(&self) -> Result<Vec<Order>, ApiError>;

    async fn order_details(&self, order: OrderId) -> Result<Vec<OrderDetail>, ApiError>;

    async fn cancel_order(&self, order: OrderId) -> Result<(), ApiError>;

    async fn favourites(&self) -> Result<Vec<FavouriteItem>, ApiError>;

    async fn add_favourite(&self, product: ProductId) -> Result<FavouriteItem, ApiError>;

    async fn remove_favourite(&self, favourite: FavouriteId) -> Result<(), ApiError>;

    async fn is_favourite(&self, product: ProductId) -> Result<bool, ApiError>;
}

// =============================================================================
// CommerceClient
// =============================================================================

/// HTTP client for the commerce API.
#[derive(Clone)]
pub struct CommerceClient {
    inner: Arc<CommerceClientInner>,
}

struct CommerceClientInner {
    client: reqwest::Client,
    base_url: Url,
    currency: CurrencyCode,
    session: SessionStore,
}

impl std::fmt::Debug for CommerceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommerceClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("currency", &self.inner.currency)
            .finish_non_exhaustive()
    }
}

/// Whether a request carries the bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Auth {
    Anonymous,
    Bearer,
}

impl CommerceClient {
    /// Create a client for the configured API.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the HTTP client cannot be built.
    pub fn new(config: &ApiConfig, session: SessionStore) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(CommerceClientInner {
                client,
                base_url: config.base_url.clone(),
                currency: config.currency,
                session,
            }),
        })
    }

    /// The session this client reads its token from.
    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    /// Absolute URL for an endpoint path.
    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.inner
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::Parse(format!("invalid endpoint {path}: {e}")))
    }

    /// Start a request, attaching the bearer token when required.
    ///
    /// Fails with `NotAuthenticated` before any network activity when the
    /// token is missing.
    async fn request(&self, method: Method, path: &str, auth: Auth) -> Result<RequestBuilder, ApiError> {
        let builder = self.inner.client.request(method, self.url(path)?);
        match auth {
            Auth::Anonymous => Ok(builder),
            Auth::Bearer => {
                let token = self.inner.session.require_token().await?;
                Ok(builder.bearer_auth(token.expose_secret()))
            }
        }
    }

    /// Send a request and return the body of a successful response.
    ///
    /// A 401 on an authenticated request invalidates the session.
    async fn execute(&self, request: RequestBuilder, auth: Auth) -> Result<String, ApiError> {
        let response = request.send().await.inspect_err(|e| {
            error!(error = %e, "Commerce API request failed");
        })?;

        let status = response.status();
        let url = response.url().path().to_string();
        let body = response.text().await?;

        if status == StatusCode::UNAUTHORIZED && auth == Auth::Bearer {
            if let Err(e) = self.inner.session.invalidate().await {
                warn!(error = %e, "Failed to persist invalidated session");
            }
            return Err(ApiError::SessionExpired);
        }

        if !status.is_success() {
            let message = extract_message(&body);
            if status.is_server_error() {
                error!(
                    status = %status,
                    path = %url,
                    body = %excerpt(&body),
                    "Commerce API returned server error"
                );
            } else {
                debug!(status = %status, path = %url, message = %message, "Commerce API rejected request");
            }
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        debug!(status = %status, path = %url, "Commerce API response");
        Ok(body)
    }

    /// Send a request and decode its JSON body.
    async fn execute_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        auth: Auth,
    ) -> Result<T, ApiError> {
        let body = self.execute(request, auth).await?;
        decode(&body)
    }
}

/// Decode a JSON body, logging an excerpt on failure.
fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| {
        error!(
            error = %e,
            body = %excerpt(body),
            "Failed to parse commerce API response"
        );
        ApiError::Parse(e.to_string())
    })
}

/// The server's `message` field, or the (truncated) raw body.
fn extract_message(body: &str) -> String {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        message: Option<String>,
    }

    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| excerpt(body))
}

fn excerpt(body: &str) -> String {
    body.chars().take(BODY_EXCERPT_CHARS).collect()
}

#[async_trait]
impl CommerceApi for CommerceClient {
    fn currency(&self) -> CurrencyCode {
        self.inner.currency
    }

    async fn fetch_cart(&self) -> Result<Vec<CartLine>, ApiError> {
        Self::fetch_cart(self).await
    }

    async fn add_to_cart(&self, product: ProductId, quantity: NonZeroU32) -> Result<(), ApiError> {
        Self::add_to_cart(self, product, quantity).await
    }

    async fn remove_from_cart(&self, line: CartLineId) -> Result<(), ApiError> {
        Self::remove_from_cart(self, line).await
    }

    async fn stock(&self, product: ProductId) -> Result<u32, ApiError> {
        Ok(self.product(product).await?.stock)
    }

    async fn find_discount(&self, code: &str) -> Result<Discount, ApiError> {
        Self::find_discount(self, code).await
    }

    async fn submit_order(&self, draft: &OrderDraft) -> Result<Option<OrderId>, ApiError> {
        Self::submit_order(self, draft).await
    }

    async fn orders(&self) -> Result<Vec<Order>, ApiError> {
        Self::orders(self).await
    }

    async fn order_details(&self, order: OrderId) -> Result<Vec<OrderDetail>, ApiError> {
        Self::order_details(self, order).await
    }

    async fn cancel_order(&self, order: OrderId) -> Result<(), ApiError> {
        Self::cancel_order(self, order).await
    }

    async fn favourites(&self) -> Result<Vec<FavouriteItem>, ApiError> {
        Self::favourites(self).await
    }

    async fn add_favourite(&self, product: ProductId) -> Result<FavouriteItem, ApiError> {
        Self::add_favourite(self, product).await
    }

    async fn remove_favourite(&self, favourite: FavouriteId) -> Result<(), ApiError> {
        Self::remove_favourite(self, favourite).await
    }

    async fn is_favourite(&self, product: ProductId) -> Result<bool, ApiError> {
        Self::is_favourite(self, product).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(session: SessionStore) -> CommerceClient {
        let config = ApiConfig::new(Url::parse("http://127.0.0.1:9/api/").unwrap());
        CommerceClient::new(&config, session).unwrap()
    }

    #[test]
    fn test_extract_message_prefers_message_field() {
        assert_eq!(
            extract_message(r#"{"message":"Sai mật khẩu"}"#),
            "Sai mật khẩu"
        );
        assert_eq!(extract_message("Bad Gateway"), "Bad Gateway");
        assert_eq!(extract_message(&"x".repeat(2000)).len(), BODY_EXCERPT_CHARS);
    }

    #[test]
    fn test_user_message_for_transport() {
        let err = ApiError::Transport("connection refused".to_string());
        assert!(err.is_transport());
        assert_eq!(err.user_message(), "Cannot connect to the server.");
    }

    #[test]
    fn test_user_message_uses_server_text() {
        let err = ApiError::Rejected {
            status: 400,
            message: "Hết hàng".to_string(),
        };
        assert_eq!(err.user_message(), "Hết hàng");
        assert!(!err.is_transport());

        let err = ApiError::DiscountNotFound(String::new());
        assert_eq!(err.user_message(), "Promo code not found.");
    }

    #[test]
    fn test_reclassify_only_touches_rejections() {
        let err = ApiError::Rejected {
            status: 404,
            message: "no such code".to_string(),
        }
        .reclassify(ApiError::DiscountNotFound);
        assert!(matches!(err, ApiError::DiscountNotFound(ref m) if m == "no such code"));

        let err = ApiError::SessionExpired.reclassify(ApiError::DiscountNotFound);
        assert!(matches!(err, ApiError::SessionExpired));
    }

    #[test]
    fn test_url_joins_under_base_path() {
        let client = client(SessionStore::in_memory());
        assert_eq!(
            client.url("/sanphammagager/giohang").unwrap().as_str(),
            "http://127.0.0.1:9/api/sanphammagager/giohang"
        );
    }

    #[tokio::test]
    async fn test_bearer_request_without_token_fails_before_sending() {
        let client = client(SessionStore::in_memory());
        let result = client
            .request(Method::GET, "sanphammagager/giohang", Auth::Bearer)
            .await;
        assert!(matches!(result, Err(ApiError::NotAuthenticated)));
    }

    #[tokio::test]
    async fn test_unauthenticated_cart_call_makes_no_request() {
        // Port 9 is discard; a request attempt would surface as a transport error.
        let client = client(SessionStore::in_memory());
        let err = client.fetch_cart().await.unwrap_err();
        assert!(matches!(err, ApiError::NotAuthenticated));
    }
}
