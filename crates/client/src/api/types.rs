//! Wire types for the commerce API.
//!
//! Field names follow the server's JSON exactly. Nothing here is exposed
//! to callers; see `conversions` for the mapping to domain types.

use serde::{Deserialize, Serialize};

/// A price as the server sends it: a JSON number or a currency-prefixed
/// string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WirePrice {
    Number(serde_json::Number),
    Text(String),
}

impl WirePrice {
    /// The textual form handed to `Money::parse`.
    #[must_use]
    pub fn as_text(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

/// An id that some endpoints send as a string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireId {
    Number(i64),
    Text(String),
}

impl WireId {
    /// The numeric id, if there is one.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

// =============================================================================
// Accounts
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WireAccount {
    pub id: Option<WireId>,
    pub gmail: Option<String>,
    pub role: Option<String>,
    pub hoten: Option<String>,
    pub diachi: Option<String>,
    pub gioitinh: Option<bool>,
    pub sinhnhat: Option<String>,
    #[serde(rename = "duongDanAnh")]
    pub duong_dan_anh: Option<String>,
    pub sdt: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub gmail: &'a str,
    #[serde(rename = "matKhau")]
    pub mat_khau: &'a str,
}

#[derive(Debug, Serialize)]
pub struct SignupRequest<'a> {
    #[serde(rename = "hoTen")]
    pub ho_ten: &'a str,
    pub gmail: &'a str,
    #[serde(rename = "matKhau")]
    pub mat_khau: &'a str,
}

#[derive(Debug, Serialize)]
pub struct OtpRequest<'a> {
    pub gmail: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct OtpResponse {
    #[serde(default)]
    pub otp: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct ResetPasswordRequest<'a> {
    pub gmail: &'a str,
    #[serde(rename = "matKhau")]
    pub mat_khau: &'a str,
    pub otp: &'a str,
}

#[derive(Debug, Serialize)]
pub struct UpdateAccountRequest {
    pub gmail: String,
    pub hoten: String,
    pub diachi: String,
    /// `YYYY-MM-DD`, or empty when unknown.
    pub sinhnhat: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sex: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sdt: Option<String>,
    #[serde(rename = "duongDanAnh", skip_serializing_if = "Option::is_none")]
    pub duong_dan_anh: Option<String>,
}

// =============================================================================
// Catalog
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct WireCategory {
    pub id: i64,
    #[serde(rename = "tenLoai", default)]
    pub ten_loai: String,
    #[serde(rename = "donVi", default)]
    pub don_vi: String,
    #[serde(rename = "duongDanAnh", default)]
    pub duong_dan_anh: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireProduct {
    pub id: i64,
    #[serde(default)]
    pub loai: Option<String>,
    #[serde(rename = "tenSanPham", default)]
    pub ten_san_pham: String,
    #[serde(rename = "moTa", default)]
    pub mo_ta: Option<String>,
    #[serde(rename = "giaTien")]
    pub gia_tien: WirePrice,
    #[serde(rename = "duongDanAnh", default)]
    pub duong_dan_anh: Option<String>,
    #[serde(rename = "soLuong", default)]
    pub so_luong: i64,
    #[serde(rename = "donVi", default)]
    pub don_vi: Option<String>,
}

// =============================================================================
// Cart and favourites
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct WireCartItem {
    pub id: i64,
    #[serde(rename = "accountId", default)]
    pub account_id: Option<i64>,
    #[serde(rename = "sanPhamId")]
    pub san_pham_id: i64,
    #[serde(rename = "tenSanPham", default)]
    pub ten_san_pham: String,
    #[serde(rename = "duongDanAnh", default)]
    pub duong_dan_anh: Option<String>,
    #[serde(rename = "giaTien")]
    pub gia_tien: WirePrice,
    #[serde(rename = "soLuong")]
    pub so_luong: i64,
}

#[derive(Debug, Serialize)]
pub struct AddCartRequest {
    #[serde(rename = "sanPhamId")]
    pub san_pham_id: i64,
    #[serde(rename = "soLuong")]
    pub so_luong: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireFavourite {
    pub id: i64,
    #[serde(rename = "accountId", default)]
    pub account_id: Option<i64>,
    #[serde(rename = "sanPhamId")]
    pub san_pham_id: i64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(rename = "tenSanPham", default)]
    pub ten_san_pham: Option<String>,
    #[serde(rename = "duongDanAnh", default)]
    pub duong_dan_anh: Option<String>,
    #[serde(rename = "giaTien", default)]
    pub gia_tien: Option<WirePrice>,
}

#[derive(Debug, Serialize)]
pub struct AddFavouriteRequest {
    #[serde(rename = "sanPhamId")]
    pub san_pham_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct FavouriteCheckResponse {
    #[serde(rename = "isFavourite", default)]
    pub is_favourite: bool,
}

// =============================================================================
// Orders and discounts
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct WireDiscount {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(rename = "idAccount", default)]
    pub id_account: Option<i64>,
    #[serde(rename = "maKhuyenMai", default)]
    pub ma_khuyen_mai: Option<String>,
    #[serde(rename = "giaTien", default)]
    pub gia_tien: Option<WirePrice>,
}

#[derive(Debug, Serialize)]
pub struct DiscountRequest<'a> {
    #[serde(rename = "discountCode")]
    pub discount_code: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireOrder {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(rename = "idAccount", default)]
    pub id_account: Option<i64>,
    #[serde(rename = "idDiscount", default)]
    pub id_discount: Option<i64>,
    #[serde(rename = "hoTen", default)]
    pub ho_ten: String,
    #[serde(default)]
    pub sdt: Option<String>,
    #[serde(default)]
    pub diachigiaohang: String,
    #[serde(default = "default_cash")]
    pub phuongthucthanhtoan: bool,
    pub tongtien: WirePrice,
    #[serde(default)]
    pub status: Option<i32>,
}

const fn default_cash() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireOrderDetail {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(rename = "idOrder", default)]
    pub id_order: Option<i64>,
    #[serde(rename = "idSanpham", default)]
    pub id_sanpham: Option<i64>,
    pub soluong: i64,
    pub giatien: WirePrice,
    pub tongtiensanpham: WirePrice,
}

#[derive(Debug, Deserialize)]
pub struct OrdersResponse {
    #[serde(default)]
    pub orders: Vec<WireOrder>,
}

#[derive(Debug, Deserialize)]
pub struct OrderDetailsResponse {
    #[serde(rename = "orderDetails", default)]
    pub order_details: Vec<WireOrderDetail>,
}

#[derive(Debug, Serialize)]
pub struct NewOrder {
    #[serde(rename = "idAccount", skip_serializing_if = "Option::is_none")]
    pub id_account: Option<i64>,
    #[serde(rename = "idDiscount", skip_serializing_if = "Option::is_none")]
    pub id_discount: Option<i64>,
    #[serde(rename = "hoTen")]
    pub ho_ten: String,
    pub sdt: String,
    pub diachigiaohang: String,
    pub phuongthucthanhtoan: bool,
    pub tongtien: serde_json::Number,
    pub status: i32,
}

#[derive(Debug, Serialize)]
pub struct NewOrderDetail {
    #[serde(rename = "idSanpham")]
    pub id_sanpham: i64,
    pub soluong: u32,
    pub giatien: serde_json::Number,
    pub tongtiensanpham: serde_json::Number,
}

#[derive(Debug, Serialize)]
pub struct SubmitOrderRequest {
    pub order: NewOrder,
    #[serde(rename = "orderDetails")]
    pub order_details: Vec<NewOrderDetail>,
}

/// The add-order response carries the new id under one of these keys,
/// if at all.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SubmitOrderResponse {
    #[serde(rename = "orderId")]
    pub order_id: Option<WireId>,
    pub id: Option<WireId>,
}
