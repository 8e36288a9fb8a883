//! Order history.
//!
//! Orders are fetched whole and filtered into status tabs locally. Only
//! orders still in preparation can be cancelled; the check runs before any
//! request is made.

use freshcart_core::{Order, OrderDetail, OrderId, OrderStatus};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::api::{ApiError, CommerceApi};

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Orders that are {0} cannot be cancelled")]
    NotCancellable(OrderStatus),

    #[error("Order {0} not found")]
    UnknownOrder(OrderId),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl OrderError {
    /// Text suitable for an alert dialog.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NotCancellable(_) => "Only orders being prepared can be cancelled.".to_string(),
            Self::UnknownOrder(_) => "This order no longer exists.".to_string(),
            Self::Api(e) => e.user_message(),
        }
    }
}

/// One tab of the order history screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderTab {
    #[default]
    All,
    Status(OrderStatus),
}

impl OrderTab {
    /// The "All" tab followed by one tab per status.
    pub fn all_tabs() -> impl Iterator<Item = Self> {
        std::iter::once(Self::All).chain(OrderStatus::ALL.into_iter().map(Self::Status))
    }

    #[must_use]
    pub fn matches(self, order: &Order) -> bool {
        match self {
            Self::All => true,
            Self::Status(status) => order.status == status,
        }
    }
}

/// The account's orders as last fetched.
#[derive(Debug, Clone, Default)]
pub struct OrderHistory {
    orders: Vec<Order>,
}

impl OrderHistory {
    /// Fetch every order of the logged-in account.
    ///
    /// # Errors
    ///
    /// Returns the API error when the list cannot be fetched.
    #[instrument(skip(api))]
    pub async fn list(api: &dyn CommerceApi) -> Result<Self, OrderError> {
        let orders = api.orders().await?;
        info!(count = orders.len(), "Orders loaded");
        Ok(Self { orders })
    }

    /// Replace the list with a fresh fetch.
    ///
    /// # Errors
    ///
    /// Returns the API error and keeps the previous list.
    pub async fn refresh(&mut self, api: &dyn CommerceApi) -> Result<(), OrderError> {
        *self = Self::list(api).await?;
        Ok(())
    }

    #[must_use]
    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    #[must_use]
    pub fn get(&self, id: OrderId) -> Option<&Order> {
        self.orders.iter().find(|o| o.id == id)
    }

    /// Orders shown under `tab`, in server order.
    pub fn by_tab(&self, tab: OrderTab) -> impl Iterator<Item = &Order> {
        self.orders.iter().filter(move |o| tab.matches(o))
    }

    /// Orders with the given status.
    pub fn by_status(&self, status: OrderStatus) -> impl Iterator<Item = &Order> {
        self.by_tab(OrderTab::Status(status))
    }

    /// Line items of one order.
    ///
    /// # Errors
    ///
    /// Returns the API error when the details cannot be fetched.
    #[instrument(skip(self, api), fields(order_id = %id))]
    pub async fn details(
        &self,
        api: &dyn CommerceApi,
        id: OrderId,
    ) -> Result<Vec<OrderDetail>, OrderError> {
        Ok(api.order_details(id).await?)
    }

    /// Cancel an order that is still being prepared.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotCancellable` without a request when the order
    /// has progressed past preparation, `OrderError::UnknownOrder` when it
    /// is not in the list, or the API error.
    #[instrument(skip(self, api), fields(order_id = %id))]
    pub async fn cancel(&mut self, api: &dyn CommerceApi, id: OrderId) -> Result<(), OrderError> {
        let status = self.get(id).ok_or(OrderError::UnknownOrder(id))?.status;
        if !status.is_cancellable() {
            warn!(%status, "Refusing to cancel order");
            return Err(OrderError::NotCancellable(status));
        }

        api.cancel_order(id).await?;

        if let Some(order) = self.orders.iter_mut().find(|o| o.id == id) {
            order.status = OrderStatus::Canceled;
        }
        info!("Order cancelled");
        Ok(())
    }
}
