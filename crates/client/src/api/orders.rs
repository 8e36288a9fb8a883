//! Order and discount endpoints.

use freshcart_core::{Discount, Order, OrderDetail, OrderDraft, OrderId};
use reqwest::Method;
use tracing::{debug, info, instrument};

use super::conversions::{
    convert_discount, convert_order, convert_order_detail, submit_order_request,
};
use super::types::{
    DiscountRequest, OrderDetailsResponse, OrdersResponse, SubmitOrderResponse, WireDiscount,
};
use super::{ApiError, Auth, CommerceClient};

impl CommerceClient {
    /// The shopper's orders, newest as the server orders them.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self))]
    pub async fn orders(&self) -> Result<Vec<Order>, ApiError> {
        let request = self
            .request(Method::POST, "sanphammagager/get-orders-by-account", Auth::Bearer)
            .await?;
        let response: OrdersResponse = self.execute_json(request, Auth::Bearer).await?;
        debug!(count = response.orders.len(), "Fetched orders");
        response
            .orders
            .into_iter()
            .map(|o| convert_order(o, self.inner.currency))
            .collect()
    }

    /// Line details of one order.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self), fields(order_id = %order))]
    pub async fn order_details(&self, order: OrderId) -> Result<Vec<OrderDetail>, ApiError> {
        let request = self
            .request(
                Method::POST,
                "sanphammagager/get-order-details-by-order",
                Auth::Bearer,
            )
            .await?
            .query(&[("orderId", order.as_i64())]);
        let response: OrderDetailsResponse = self.execute_json(request, Auth::Bearer).await?;
        response
            .order_details
            .into_iter()
            .map(|d| convert_order_detail(d, self.inner.currency))
            .collect()
    }

    /// Create an order together with its details.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::OrderRejected` with the server's message when the
    /// order is refused.
    #[instrument(skip(self, draft), fields(lines = draft.details.len(), total = %draft.total))]
    pub async fn submit_order(&self, draft: &OrderDraft) -> Result<Option<OrderId>, ApiError> {
        let body = submit_order_request(draft)?;
        let request = self
            .request(Method::POST, "sanphammagager/add-order", Auth::Bearer)
            .await?
            .json(&body);

        let text = self
            .execute(request, Auth::Bearer)
            .await
            .map_err(|e| e.reclassify(ApiError::OrderRejected))?;

        // The id is informational; an unexpected body does not undo the order.
        let order_id = serde_json::from_str::<SubmitOrderResponse>(&text)
            .ok()
            .and_then(|r| r.order_id.or(r.id))
            .and_then(|id| id.as_i64())
            .map(OrderId::new);
        info!(order_id = ?order_id, "Order submitted");
        Ok(order_id)
    }

    /// Cancel an order. The server only accepts this while it is preparing.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails or is rejected.
    #[instrument(skip(self), fields(order_id = %order))]
    pub async fn cancel_order(&self, order: OrderId) -> Result<(), ApiError> {
        let request = self
            .request(Method::PUT, "sanphammagager/update-order-status", Auth::Bearer)
            .await?
            .query(&[("orderId", order.as_i64())]);
        self.execute(request, Auth::Bearer).await?;
        info!("Order cancelled");
        Ok(())
    }

    /// Look up a promo code.
    ///
    /// A code that resolves to a zero amount is returned as-is; the caller
    /// decides whether it is usable.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::DiscountNotFound` with the server's message when
    /// the code is unknown.
    #[instrument(skip(self))]
    pub async fn find_discount(&self, code: &str) -> Result<Discount, ApiError> {
        let request = self
            .request(Method::POST, "checkmobile/find-discount", Auth::Bearer)
            .await?
            .json(&DiscountRequest {
                discount_code: code,
            });
        let wire: WireDiscount = self
            .execute_json(request, Auth::Bearer)
            .await
            .map_err(|e| e.reclassify(ApiError::DiscountNotFound))?;
        convert_discount(wire, code, self.inner.currency)
    }
}
