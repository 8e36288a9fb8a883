//! Favourite endpoints.

use freshcart_core::{FavouriteId, FavouriteItem, ProductId};
use reqwest::Method;
use tracing::{debug, info, instrument};

use super::conversions::convert_favourite;
use super::types::{AddFavouriteRequest, FavouriteCheckResponse, WireFavourite};
use super::{ApiError, Auth, CommerceClient};

impl CommerceClient {
    /// Mark a product as favourite.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails or is rejected.
    #[instrument(skip(self), fields(product_id = %product))]
    pub async fn add_favourite(&self, product: ProductId) -> Result<FavouriteItem, ApiError> {
        let request = self
            .request(Method::POST, "sanphammagager/themyeuthich", Auth::Bearer)
            .await?
            .json(&AddFavouriteRequest {
                san_pham_id: product.as_i64(),
            });
        let wire: WireFavourite = self.execute_json(request, Auth::Bearer).await?;
        info!("Added favourite");
        convert_favourite(wire, self.inner.currency, &self.inner.base_url)
    }

    /// The shopper's favourites.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self))]
    pub async fn favourites(&self) -> Result<Vec<FavouriteItem>, ApiError> {
        let request = self
            .request(Method::GET, "sanphammagager/showyeuthich", Auth::Bearer)
            .await?;
        let wire: Vec<WireFavourite> = self.execute_json(request, Auth::Bearer).await?;
        debug!(count = wire.len(), "Fetched favourites");
        wire.into_iter()
            .map(|f| convert_favourite(f, self.inner.currency, &self.inner.base_url))
            .collect()
    }

    /// Delete a favourite entry.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails or is rejected.
    #[instrument(skip(self), fields(favourite_id = %favourite))]
    pub async fn remove_favourite(&self, favourite: FavouriteId) -> Result<(), ApiError> {
        let request = self
            .request(Method::DELETE, "sanphammagager/xoayeuthich", Auth::Bearer)
            .await?
            .query(&[("id", favourite.as_i64())]);
        self.execute(request, Auth::Bearer).await?;
        debug!("Removed favourite");
        Ok(())
    }

    /// Whether a product is among the shopper's favourites.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self), fields(product_id = %product))]
    pub async fn is_favourite(&self, product: ProductId) -> Result<bool, ApiError> {
        let request = self
            .request(Method::GET, "sanphammagager/check-favourite", Auth::Bearer)
            .await?
            .query(&[("sanPhamId", product.as_i64())]);
        let response: FavouriteCheckResponse = self.execute_json(request, Auth::Bearer).await?;
        Ok(response.is_favourite)
    }
}
