//! `CommerceClient` against a local stub server.

#![allow(clippy::unwrap_used)]

use std::num::NonZeroU32;

use freshcart_client::{ApiError, SessionStore};
use freshcart_core::{
    CartLine, CartLineId, CurrencyCode, Email, Money, OrderDraft, OrderId, PaymentMethod,
    ProductId, Recipient,
};
use freshcart_integration_tests::StubServer;
use rust_decimal_macros::dec;
use secrecy::{ExposeSecret, SecretString};

const CART: &str = "sanphammagager/giohang";

#[tokio::test]
async fn test_unauthorized_response_invalidates_session() {
    let server = StubServer::start().await;
    server.route("GET", CART, 401, r#"{"message":"Token expired"}"#);
    let session = SessionStore::in_memory_with_token("stale-token");
    let mut relogin = session.subscribe_relogin();
    let client = server.client(session.clone());

    let err = client.fetch_cart().await.unwrap_err();
    assert!(matches!(err, ApiError::SessionExpired));
    assert!(session.token().await.is_none());
    assert!(!session.is_logged_in().await);
    assert!(*relogin.borrow_and_update());

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].authorization.as_deref(), Some("Bearer stale-token"));
}

#[tokio::test]
async fn test_missing_token_sends_nothing() {
    let server = StubServer::start().await;
    let client = server.client(SessionStore::in_memory());

    let err = client.fetch_cart().await.unwrap_err();
    assert!(matches!(err, ApiError::NotAuthenticated));
    assert!(server.requests().is_empty());
}

#[tokio::test]
async fn test_cart_lines_are_decoded() {
    let server = StubServer::start().await;
    server.route(
        "GET",
        CART,
        200,
        r#"[
            {"id":41,"sanPhamId":5,"tenSanPham":"Bananas","giaTien":4.99,"soLuong":2,"duongDanAnh":"images/bananas.png"},
            {"id":42,"sanPhamId":6,"tenSanPham":"Milk","giaTien":"1.50","soLuong":0}
        ]"#,
    );
    let client = server.client(SessionStore::in_memory_with_token("t"));

    let lines = client.fetch_cart().await.unwrap();
    assert_eq!(lines.len(), 1);
    let line = &lines[0];
    assert_eq!(line.id, CartLineId::new(41));
    assert_eq!(line.product_id, ProductId::new(5));
    assert_eq!(line.subtitle, "2 items");
    assert_eq!(line.line_total().amount(), dec!(9.98));
    assert!(line.image.as_deref().unwrap().ends_with("/images/bananas.png"));
}

#[tokio::test]
async fn test_malformed_price_is_an_error() {
    let server = StubServer::start().await;
    server.route(
        "GET",
        CART,
        200,
        r#"[{"id":41,"sanPhamId":5,"tenSanPham":"Bananas","giaTien":"free","soLuong":1}]"#,
    );
    let client = server.client(SessionStore::in_memory_with_token("t"));

    let err = client.fetch_cart().await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidPrice(_)));
}

fn bananas_draft() -> OrderDraft {
    let line = CartLine {
        id: CartLineId::new(41),
        product_id: ProductId::new(5),
        title: "Bananas".to_string(),
        subtitle: "2 items".to_string(),
        unit_price: Money::new(dec!(4.99), CurrencyCode::USD),
        quantity: NonZeroU32::new(2).unwrap(),
        image: None,
    };
    OrderDraft::from_lines(
        [&line],
        CurrencyCode::USD,
        Recipient::new("  Nguyen An ", "0901234567", "12 Le Loi"),
        PaymentMethod::Cash,
        None,
        None,
    )
    .unwrap()
}

#[tokio::test]
async fn test_order_payload_shape() {
    let server = StubServer::start().await;
    server.route("POST", "sanphammagager/add-order", 200, r#"{"orderId":"42"}"#);
    let client = server.client(SessionStore::in_memory_with_token("t"));

    let order_id = client.submit_order(&bananas_draft()).await.unwrap();
    assert_eq!(order_id, Some(OrderId::new(42)));

    let body = server.requests()[0].json();
    assert_eq!(body["order"]["hoTen"], "Nguyen An");
    assert_eq!(body["order"]["status"], 0);
    assert_eq!(body["order"]["phuongthucthanhtoan"], true);
    assert_eq!(body["order"]["tongtien"].to_string(), "9.98");
    let details = body["orderDetails"].as_array().unwrap();
    assert_eq!(details.len(), 1);
    assert_eq!(details[0]["idSanpham"], 5);
    assert_eq!(details[0]["soluong"], 2);
    assert_eq!(details[0]["tongtiensanpham"].to_string(), "9.98");
}

#[tokio::test]
async fn test_order_rejection_carries_server_message() {
    let server = StubServer::start().await;
    server.route(
        "POST",
        "sanphammagager/add-order",
        400,
        r#"{"message":"Sản phẩm đã hết hàng"}"#,
    );
    let client = server.client(SessionStore::in_memory_with_token("t"));

    let err = client.submit_order(&bananas_draft()).await.unwrap_err();
    assert!(matches!(&err, ApiError::OrderRejected(m) if m == "Sản phẩm đã hết hàng"));
    assert_eq!(err.user_message(), "Sản phẩm đã hết hàng");
}

#[tokio::test]
async fn test_unknown_discount_code() {
    let server = StubServer::start().await;
    server.route(
        "POST",
        "checkmobile/find-discount",
        404,
        r#"{"message":"Discount code not found"}"#,
    );
    let client = server.client(SessionStore::in_memory_with_token("t"));

    let err = client.find_discount("NOPE").await.unwrap_err();
    assert!(matches!(err, ApiError::DiscountNotFound(_)));
    assert_eq!(
        server.requests()[0].json()["discountCode"],
        serde_json::json!("NOPE")
    );
}

#[tokio::test]
async fn test_login_persists_token() {
    let server = StubServer::start().await;
    server.route(
        "POST",
        "checkmobile/login",
        200,
        r#"{"id":3,"gmail":"an@market.vn","hoten":"Nguyen An","diachi":"12 Le Loi","sdt":"0901234567","token":"fresh-token"}"#,
    );
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");

    let session = SessionStore::open(&path).await.unwrap();
    let client = server.client(session);
    let email = Email::parse("an@market.vn").unwrap();
    let account = client
        .login(&email, &SecretString::from("hunter2".to_string()))
        .await
        .unwrap();
    assert_eq!(account.full_name, "Nguyen An");
    assert_eq!(account.recipient().phone, "0901234567");

    let body = server.requests()[0].json();
    assert_eq!(body["gmail"], "an@market.vn");
    assert_eq!(body["matKhau"], "hunter2");

    let reopened = SessionStore::open(&path).await.unwrap();
    assert!(reopened.is_logged_in().await);
    assert_eq!(reopened.token().await.unwrap().expose_secret(), "fresh-token");
}
