//! Cart endpoints.

use std::num::NonZeroU32;

use freshcart_core::{CartLine, CartLineId, ProductId};
use reqwest::Method;
use tracing::{debug, info, instrument};

use super::conversions::convert_cart_line;
use super::types::{AddCartRequest, WireCartItem};
use super::{ApiError, Auth, CommerceClient};

impl CommerceClient {
    /// The shopper's cart. An empty cart is an empty vector.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidPrice` if a line carries a malformed price,
    /// or another `ApiError` if the request fails.
    #[instrument(skip(self))]
    pub async fn fetch_cart(&self) -> Result<Vec<CartLine>, ApiError> {
        let request = self
            .request(Method::GET, "sanphammagager/giohang", Auth::Bearer)
            .await?;
        let wire: Vec<WireCartItem> = self.execute_json(request, Auth::Bearer).await?;

        let lines = wire
            .into_iter()
            .filter_map(|item| {
                convert_cart_line(item, self.inner.currency, &self.inner.base_url).transpose()
            })
            .collect::<Result<Vec<_>, _>>()?;
        debug!(lines = lines.len(), "Fetched cart");
        Ok(lines)
    }

    /// Add units of a product. The server merges into an existing line.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails or is rejected.
    #[instrument(skip(self), fields(product_id = %product, quantity = quantity.get()))]
    pub async fn add_to_cart(&self, product: ProductId, quantity: NonZeroU32) -> Result<(), ApiError> {
        let request = self
            .request(Method::POST, "sanphammagager/themgiohang", Auth::Bearer)
            .await?
            .json(&AddCartRequest {
                san_pham_id: product.as_i64(),
                so_luong: quantity.get(),
            });
        self.execute(request, Auth::Bearer).await?;
        info!("Added to cart");
        Ok(())
    }

    /// Delete a cart line.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails or is rejected.
    #[instrument(skip(self), fields(cart_line_id = %line))]
    pub async fn remove_from_cart(&self, line: CartLineId) -> Result<(), ApiError> {
        let request = self
            .request(Method::DELETE, "sanphammagager/xoagiohang", Auth::Bearer)
            .await?
            .query(&[("id", line.as_i64())]);
        self.execute(request, Auth::Bearer).await?;
        debug!("Removed cart line");
        Ok(())
    }
}
