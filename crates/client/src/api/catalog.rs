//! Catalog endpoints. These are public and need no token.

use freshcart_core::{Category, CategoryId, Product, ProductId};
use reqwest::Method;
use tracing::{debug, instrument};

use super::conversions::{convert_category, convert_product};
use super::types::{WireCategory, WireProduct};
use super::{ApiError, Auth, CommerceClient};

impl CommerceClient {
    /// All product categories.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<Vec<Category>, ApiError> {
        let request = self
            .request(Method::GET, "sanphammagager/loaisanpham", Auth::Anonymous)
            .await?;
        let wire: Vec<WireCategory> = self.execute_json(request, Auth::Anonymous).await?;

        debug!(count = wire.len(), "Fetched categories");
        Ok(wire
            .into_iter()
            .map(|c| convert_category(c, &self.inner.base_url))
            .collect())
    }

    /// Products in a category.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidPrice` if any product carries a malformed
    /// price, or another `ApiError` if the request fails.
    #[instrument(skip(self), fields(category_id = %category))]
    pub async fn products_by_category(&self, category: CategoryId) -> Result<Vec<Product>, ApiError> {
        let request = self
            .request(Method::GET, "sanphammagager/sanpham/idloai", Auth::Anonymous)
            .await?
            .query(&[("idloai", category.as_i64())]);
        let wire: Vec<WireProduct> = self.execute_json(request, Auth::Anonymous).await?;

        debug!(count = wire.len(), "Fetched products");
        wire.into_iter()
            .map(|p| convert_product(p, self.inner.currency, &self.inner.base_url))
            .collect()
    }

    /// One product with its current stock.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for an unknown product.
    #[instrument(skip(self), fields(product_id = %product))]
    pub async fn product(&self, product: ProductId) -> Result<Product, ApiError> {
        let path = format!("sanphammagager/sanphamchitiet/{product}");
        let request = self.request(Method::GET, &path, Auth::Anonymous).await?;
        let wire: WireProduct = self
            .execute_json(request, Auth::Anonymous)
            .await
            .map_err(|e| match e {
                ApiError::Rejected { status: 404, message } => ApiError::NotFound(message),
                other => other,
            })?;

        convert_product(wire, self.inner.currency, &self.inner.base_url)
    }
}
