//! Integration test harness for the FreshCart client.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p freshcart-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `checkout` - End-to-end checkout scenarios over the in-memory backend
//! - `cart` - Cart accumulation, stock checks and bulk removal
//! - `orders` - Order history and cancellation
//! - `http_client` - `CommerceClient` against a local stub server
//!
//! [`Shop`] wires the client library to `InMemoryCommerce`; [`StubServer`]
//! answers HTTP requests with canned responses so the real client can be
//! exercised without the remote API.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use freshcart_client::testing::InMemoryCommerce;
use freshcart_client::{
    ApiConfig, CartState, CheckoutWorkflow, CommerceClient, SessionStore, StockCache,
};
use freshcart_core::{ProductId, Recipient};
use rust_decimal_macros::dec;
use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use tokio::net::TcpListener;
use url::Url;

pub const BANANAS: ProductId = ProductId::new(5);
pub const MILK: ProductId = ProductId::new(6);
pub const APPLES: ProductId = ProductId::new(7);

/// The client library wired to an in-memory backend.
pub struct Shop {
    pub api: Arc<InMemoryCommerce>,
    pub cart: CartState,
    pub stock: StockCache,
}

impl Shop {
    /// A shop selling bananas at $4.99, milk at $1.50 and apples at $0.80,
    /// with the promo code `SAVE5` worth $5.
    #[must_use]
    pub fn new() -> Self {
        Self::with_api(
            InMemoryCommerce::new()
                .with_product(BANANAS, "Bananas", dec!(4.99), 10)
                .with_product(MILK, "Milk", dec!(1.50), 20)
                .with_product(APPLES, "Apples", dec!(0.80), 50)
                .with_discount("SAVE5", dec!(5)),
        )
    }

    #[must_use]
    pub fn with_api(api: InMemoryCommerce) -> Self {
        Self {
            api: Arc::new(api),
            cart: CartState::new(),
            stock: StockCache::default(),
        }
    }

    /// A checkout workflow over this shop's cart, already editing with a
    /// complete recipient.
    ///
    /// # Panics
    ///
    /// Panics if the workflow refuses to start.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn checkout(&self) -> CheckoutWorkflow {
        let workflow =
            CheckoutWorkflow::new(self.api.clone(), self.cart.clone(), self.stock.clone());
        workflow.begin(None).expect("fresh workflow can begin");
        workflow
            .set_recipient(Recipient::new("Nguyen An", "0901234567", "12 Le Loi, District 1"))
            .expect("editing workflow accepts a recipient");
        workflow
    }
}

impl Default for Shop {
    fn default() -> Self {
        Self::new()
    }
}

/// One request received by a [`StubServer`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    /// Path and query.
    pub target: String,
    pub authorization: Option<String>,
    pub body: String,
}

impl RecordedRequest {
    #[must_use]
    pub fn path(&self) -> &str {
        self.target.split('?').next().unwrap_or(&self.target)
    }

    /// The body parsed as JSON, or `Null`.
    #[must_use]
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap_or_default()
    }
}

#[derive(Default)]
struct StubState {
    routes: HashMap<(String, String), (u16, String)>,
    requests: Vec<RecordedRequest>,
}

type SharedStub = Arc<Mutex<StubState>>;

/// A local HTTP server answering each `(method, path)` with a canned
/// status and JSON body. Unknown routes get 404.
#[derive(Clone)]
pub struct StubServer {
    base_url: Url,
    state: SharedStub,
}

impl StubServer {
    /// Bind to an ephemeral local port and start serving.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    #[allow(clippy::expect_used)]
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub server");
        let addr = listener.local_addr().expect("stub server address");
        let state = SharedStub::default();

        let app = Router::new().fallback(answer).with_state(state.clone());
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "Stub server stopped");
            }
        });

        let base_url = Url::parse(&format!("http://{addr}/")).expect("stub server url");
        Self { base_url, state }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Answer `method path` with `status` and `body`.
    pub fn route(&self, method: &str, path: &str, status: u16, body: &str) {
        self.lock().routes.insert(
            (method.to_string(), path.to_string()),
            (status, body.to_string()),
        );
    }

    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    /// A client config pointing at this server.
    #[must_use]
    pub fn config(&self) -> ApiConfig {
        ApiConfig::new(self.base_url.clone())
    }

    /// A `CommerceClient` for this server sharing `session`.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn client(&self, session: SessionStore) -> CommerceClient {
        CommerceClient::new(&self.config(), session).expect("build commerce client")
    }
}

/// Record the request and reply with the canned answer for its route.
async fn answer(
    State(state): State<SharedStub>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let target = uri
        .path_and_query()
        .map_or_else(|| uri.path(), |pq| pq.as_str())
        .trim_start_matches('/')
        .to_string();
    let request = RecordedRequest {
        method: method.as_str().to_string(),
        target,
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: String::from_utf8_lossy(&body).into_owned(),
    };

    let (status, reply) = {
        let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
        let key = (request.method.clone(), request.path().to_string());
        let answer = state
            .routes
            .get(&key)
            .cloned()
            .unwrap_or_else(|| (404, r#"{"message":"Not found"}"#.to_string()));
        state.requests.push(request);
        answer
    };

    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, [(header::CONTENT_TYPE, "application/json")], reply).into_response()
}
