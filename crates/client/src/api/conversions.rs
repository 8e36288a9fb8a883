//! Mapping between wire types and domain types.
//!
//! Prices are parsed here and nowhere else. A malformed price is an error,
//! never a silent zero.

use std::num::NonZeroU32;
use std::str::FromStr;

use chrono::NaiveDate;
use freshcart_core::{
    Account, AccountId, AccountUpdate, CartLine, CartLineId, Category, CategoryId, CurrencyCode,
    Discount, DiscountId, FavouriteId, FavouriteItem, Money, Order, OrderDetail, OrderDetailId,
    OrderDraft, OrderId, OrderStatus, PaymentMethod, Product, ProductId, Recipient,
};
use rust_decimal::Decimal;
use tracing::warn;
use url::Url;

use super::ApiError;
use super::types::{
    NewOrder, NewOrderDetail, SubmitOrderRequest, UpdateAccountRequest, WireAccount,
    WireCartItem, WireCategory, WireDiscount, WireFavourite, WireOrder, WireOrderDetail,
    WirePrice, WireProduct,
};

/// Absolute URL for a server-relative asset path.
pub fn asset_url(base: &Url, path: Option<&str>) -> Option<String> {
    let path = path.map(str::trim).filter(|p| !p.is_empty())?;
    if path.starts_with("http://") || path.starts_with("https://") {
        return Some(path.to_string());
    }
    Some(format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    ))
}

fn parse_price(price: &WirePrice, currency: CurrencyCode, context: &str) -> Result<Money, ApiError> {
    Money::parse(&price.as_text(), currency)
        .map_err(|e| ApiError::InvalidPrice(format!("{context}: {e}")))
}

/// Stock counts below zero are reported as empty.
fn clamp_count(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

/// Birthdays arrive as `YYYY-MM-DD`, an ISO timestamp, or `DD/MM/YYYY`.
fn parse_birthday(raw: Option<&str>) -> Option<NaiveDate> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    let date_part = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d/%m/%Y"))
        .ok()
}

/// Decimal as a JSON number.
fn json_number(amount: Decimal) -> Result<serde_json::Number, ApiError> {
    serde_json::Number::from_str(&amount.normalize().to_string())
        .map_err(|e| ApiError::InvalidPrice(format!("{amount}: {e}")))
}

pub fn convert_account(wire: WireAccount, base: &Url) -> Account {
    Account {
        id: wire.id.and_then(|id| id.as_i64()).map(AccountId::new),
        email: wire.gmail.unwrap_or_default(),
        role: wire.role.unwrap_or_default(),
        full_name: wire.hoten.unwrap_or_default(),
        address: wire.diachi.unwrap_or_default(),
        phone: wire.sdt.unwrap_or_default(),
        gender: wire.gioitinh.map(Into::into),
        birthday: parse_birthday(wire.sinhnhat.as_deref()),
        avatar: asset_url(base, wire.duong_dan_anh.as_deref()),
    }
}

pub fn account_update_request(update: &AccountUpdate) -> UpdateAccountRequest {
    UpdateAccountRequest {
        gmail: update.email.as_str().to_string(),
        hoten: update.full_name.clone(),
        diachi: update.address.clone(),
        sinhnhat: update
            .birthday
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
        sex: update.gender.map(Into::into),
        sdt: update.phone.clone(),
        duong_dan_anh: update.avatar.clone(),
    }
}

pub fn convert_category(wire: WireCategory, base: &Url) -> Category {
    Category {
        id: CategoryId::new(wire.id),
        name: wire.ten_loai,
        unit: wire.don_vi,
        image: asset_url(base, wire.duong_dan_anh.as_deref()),
    }
}

pub fn convert_product(
    wire: WireProduct,
    currency: CurrencyCode,
    base: &Url,
) -> Result<Product, ApiError> {
    let price = parse_price(&wire.gia_tien, currency, &format!("product {}", wire.id))?;
    Ok(Product {
        id: ProductId::new(wire.id),
        category: wire.loai.unwrap_or_default(),
        title: wire.ten_san_pham,
        description: wire.mo_ta.unwrap_or_default(),
        price,
        image: asset_url(base, wire.duong_dan_anh.as_deref()),
        stock: clamp_count(wire.so_luong),
        unit: wire.don_vi.unwrap_or_default(),
    })
}

/// Convert a cart entry. Entries with no units left are dropped.
pub fn convert_cart_line(
    wire: WireCartItem,
    currency: CurrencyCode,
    base: &Url,
) -> Result<Option<CartLine>, ApiError> {
    let unit_price = parse_price(&wire.gia_tien, currency, &format!("cart line {}", wire.id))?;
    let Some(quantity) = NonZeroU32::new(clamp_count(wire.so_luong)) else {
        warn!(cart_line_id = wire.id, quantity = wire.so_luong, "Skipping empty cart line");
        return Ok(None);
    };

    Ok(Some(CartLine {
        id: CartLineId::new(wire.id),
        product_id: ProductId::new(wire.san_pham_id),
        title: wire.ten_san_pham,
        subtitle: format!("{quantity} items"),
        unit_price,
        quantity,
        image: asset_url(base, wire.duong_dan_anh.as_deref()),
    }))
}

pub fn convert_favourite(
    wire: WireFavourite,
    currency: CurrencyCode,
    base: &Url,
) -> Result<FavouriteItem, ApiError> {
    let price = wire
        .gia_tien
        .as_ref()
        .map(|p| parse_price(p, currency, &format!("favourite {}", wire.id)))
        .transpose()?;

    Ok(FavouriteItem {
        id: FavouriteId::new(wire.id),
        product_id: ProductId::new(wire.san_pham_id),
        title: wire.ten_san_pham,
        image: asset_url(base, wire.duong_dan_anh.as_deref()),
        price,
    })
}

/// Convert a discount lookup. A missing amount is a zero-value discount.
pub fn convert_discount(
    wire: WireDiscount,
    requested_code: &str,
    currency: CurrencyCode,
) -> Result<Discount, ApiError> {
    let amount = wire
        .gia_tien
        .as_ref()
        .map(|p| parse_price(p, currency, &format!("discount {requested_code}")))
        .transpose()?
        .unwrap_or_else(|| Money::zero(currency));

    Ok(Discount {
        id: wire.id.map(DiscountId::new),
        account_id: wire.id_account.filter(|id| *id != 0).map(AccountId::new),
        code: wire
            .ma_khuyen_mai
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| requested_code.to_string()),
        amount,
    })
}

pub fn convert_order(wire: WireOrder, currency: CurrencyCode) -> Result<Order, ApiError> {
    let id = wire
        .id
        .ok_or_else(|| ApiError::Parse("order without id".to_string()))?;
    let status = wire
        .status
        .map(OrderStatus::try_from)
        .transpose()
        .map_err(ApiError::Parse)?
        .unwrap_or_default();

    Ok(Order {
        id: OrderId::new(id),
        account_id: wire.id_account.map(AccountId::new),
        discount_id: wire.id_discount.map(DiscountId::new),
        recipient: Recipient::new(
            wire.ho_ten,
            wire.sdt.unwrap_or_default(),
            wire.diachigiaohang,
        ),
        payment: PaymentMethod::from(wire.phuongthucthanhtoan),
        total: parse_price(&wire.tongtien, currency, &format!("order {id}"))?,
        status,
    })
}

pub fn convert_order_detail(
    wire: WireOrderDetail,
    currency: CurrencyCode,
) -> Result<OrderDetail, ApiError> {
    let context = format!("order detail {}", wire.id.unwrap_or_default());
    Ok(OrderDetail {
        id: wire.id.map(OrderDetailId::new),
        order_id: wire.id_order.map(OrderId::new),
        product_id: wire.id_sanpham.map(ProductId::new),
        quantity: clamp_count(wire.soluong),
        unit_price: parse_price(&wire.giatien, currency, &context)?,
        line_total: parse_price(&wire.tongtiensanpham, currency, &context)?,
    })
}

pub fn submit_order_request(draft: &OrderDraft) -> Result<SubmitOrderRequest, ApiError> {
    let order_details = draft
        .details
        .iter()
        .map(|detail| {
            Ok(NewOrderDetail {
                id_sanpham: detail.product_id.as_i64(),
                soluong: detail.quantity.get(),
                giatien: json_number(detail.unit_price.amount())?,
                tongtiensanpham: json_number(detail.line_total.amount())?,
            })
        })
        .collect::<Result<Vec<_>, ApiError>>()?;

    let recipient = draft.recipient.trimmed();
    Ok(SubmitOrderRequest {
        order: NewOrder {
            id_account: draft.account_id.map(|id| id.as_i64()),
            id_discount: draft.discount_id.map(|id| id.as_i64()),
            ho_ten: recipient.name,
            sdt: recipient.phone,
            diachigiaohang: recipient.address,
            phuongthucthanhtoan: draft.payment.into(),
            tongtien: json_number(draft.total.amount())?,
            status: draft.status.code(),
        },
        order_details,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::api::types::WireId;

    fn base() -> Url {
        Url::parse("http://10.0.0.5:3000/").unwrap()
    }

    fn cart_item(price: WirePrice, quantity: i64) -> WireCartItem {
        WireCartItem {
            id: 11,
            account_id: Some(3),
            san_pham_id: 5,
            ten_san_pham: "Bananas".to_string(),
            duong_dan_anh: Some("/images/banana.png".to_string()),
            gia_tien: price,
            so_luong: quantity,
        }
    }

    #[test]
    fn test_cart_line_from_wire() {
        let line = convert_cart_line(
            cart_item(WirePrice::Text("$4.99".to_string()), 2),
            CurrencyCode::USD,
            &base(),
        )
        .unwrap()
        .unwrap();

        assert_eq!(line.unit_price.amount(), dec!(4.99));
        assert_eq!(line.subtitle, "2 items");
        assert_eq!(
            line.image.as_deref(),
            Some("http://10.0.0.5:3000/images/banana.png")
        );
        assert_eq!(line.line_total().to_string(), "$9.98");
    }

    #[test]
    fn test_exponent_form_json_price() {
        let price: WirePrice = serde_json::from_str("1e-7").unwrap();
        let line = convert_cart_line(cart_item(price, 1), CurrencyCode::USD, &base())
            .unwrap()
            .unwrap();
        assert_eq!(line.unit_price.amount(), dec!(0.0000001));

        let price: WirePrice = serde_json::from_str("1e21").unwrap();
        let line = convert_cart_line(cart_item(price, 1), CurrencyCode::USD, &base())
            .unwrap()
            .unwrap();
        assert_eq!(line.unit_price.amount(), dec!(1000000000000000000000));
    }

    #[test]
    fn test_malformed_price_is_an_error() {
        let err = convert_cart_line(
            cart_item(WirePrice::Text("$4.9x".to_string()), 2),
            CurrencyCode::USD,
            &base(),
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::InvalidPrice(_)));
    }

    #[test]
    fn test_zero_quantity_line_is_dropped() {
        let line = convert_cart_line(
            cart_item(WirePrice::Number(5.into()), 0),
            CurrencyCode::USD,
            &base(),
        )
        .unwrap();
        assert!(line.is_none());
    }

    #[test]
    fn test_asset_url_keeps_absolute_urls() {
        assert_eq!(
            asset_url(&base(), Some("https://cdn.example.com/a.png")).as_deref(),
            Some("https://cdn.example.com/a.png")
        );
        assert_eq!(asset_url(&base(), Some("  ")), None);
        assert_eq!(asset_url(&base(), None), None);
    }

    #[test]
    fn test_birthday_formats() {
        let expected = NaiveDate::from_ymd_opt(2001, 4, 30);
        assert_eq!(parse_birthday(Some("2001-04-30")), expected);
        assert_eq!(parse_birthday(Some("2001-04-30T00:00:00.000+00:00")), expected);
        assert_eq!(parse_birthday(Some("30/04/2001")), expected);
        assert_eq!(parse_birthday(Some("")), None);
        assert_eq!(parse_birthday(Some("someday")), None);
    }

    #[test]
    fn test_account_from_wire() {
        let account = convert_account(
            WireAccount {
                id: Some(WireId::Text("7".to_string())),
                gmail: Some("an@market.vn".to_string()),
                hoten: Some("Nguyen An".to_string()),
                gioitinh: Some(true),
                duong_dan_anh: Some("/avatars/7.jpg".to_string()),
                ..WireAccount::default()
            },
            &base(),
        );
        assert_eq!(account.id, Some(AccountId::new(7)));
        assert_eq!(account.gender, Some(freshcart_core::Gender::Male));
        assert_eq!(account.phone, "");
        assert_eq!(
            account.avatar.as_deref(),
            Some("http://10.0.0.5:3000/avatars/7.jpg")
        );
    }

    #[test]
    fn test_discount_zero_amount_is_valid_lookup() {
        let discount = convert_discount(
            WireDiscount {
                id: Some(4),
                id_account: Some(0),
                ma_khuyen_mai: None,
                gia_tien: None,
            },
            "FREE",
            CurrencyCode::USD,
        )
        .unwrap();
        assert_eq!(discount.code, "FREE");
        assert!(discount.amount.is_zero());
        assert!(!discount.is_applicable());
        assert_eq!(discount.account_id, None);
    }

    #[test]
    fn test_order_with_unknown_status_is_rejected() {
        let wire = WireOrder {
            id: Some(9),
            id_account: None,
            id_discount: None,
            ho_ten: "An".to_string(),
            sdt: None,
            diachigiaohang: "1 Main St".to_string(),
            phuongthucthanhtoan: false,
            tongtien: WirePrice::Number(10.into()),
            status: Some(7),
        };
        assert!(matches!(
            convert_order(wire, CurrencyCode::USD),
            Err(ApiError::Parse(_))
        ));
    }

    #[test]
    fn test_submit_request_from_draft() {
        let line = CartLine {
            id: CartLineId::new(11),
            product_id: ProductId::new(5),
            title: "Bananas".to_string(),
            subtitle: "2 items".to_string(),
            unit_price: Money::new(dec!(4.99), CurrencyCode::USD),
            quantity: NonZeroU32::new(2).unwrap(),
            image: None,
        };
        let draft = OrderDraft::from_lines(
            [&line],
            CurrencyCode::USD,
            Recipient::new(" An ", "0901", "1 Main St"),
            PaymentMethod::Online,
            None,
            Some(AccountId::new(3)),
        )
        .unwrap();

        let request = submit_order_request(&draft).unwrap();
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["order"]["tongtien"], 9.98);
        assert_eq!(json["order"]["status"], 0);
        assert_eq!(json["order"]["phuongthucthanhtoan"], false);
        assert_eq!(json["order"]["hoTen"], "An");
        assert_eq!(json["orderDetails"][0]["soluong"], 2);
        assert_eq!(json["orderDetails"][0]["giatien"], 4.99);
    }
}
