//! Order history commands.

use freshcart_client::{OrderHistory, OrderTab};
use freshcart_core::{OrderId, OrderStatus};
use tracing::info;

use super::{CommandError, Context};

pub async fn list(ctx: &Context, status: Option<OrderStatus>) -> Result<(), CommandError> {
    let history = OrderHistory::list(&ctx.client).await?;
    let tab = status.map_or(OrderTab::All, OrderTab::Status);

    let mut shown = 0_usize;
    for order in history.by_tab(tab) {
        info!(
            "{:>5}  {:<10}  {}  {} ({})",
            order.id.as_i64(),
            order.status.to_string(),
            order.total,
            order.recipient.name,
            order.payment
        );
        shown += 1;
    }
    if shown == 0 {
        info!("No orders");
    }
    Ok(())
}

pub async fn details(ctx: &Context, order: i64) -> Result<(), CommandError> {
    let history = OrderHistory::default();
    let details = history.details(&ctx.client, OrderId::new(order)).await?;
    for detail in &details {
        let product = detail
            .product_id
            .map_or_else(|| "?".to_string(), |id| id.to_string());
        info!(
            "product {product}  {} x {} = {}",
            detail.quantity, detail.unit_price, detail.line_total
        );
    }
    Ok(())
}

pub async fn cancel(ctx: &Context, order: i64) -> Result<(), CommandError> {
    let mut history = OrderHistory::list(&ctx.client).await?;
    history.cancel(&ctx.client, OrderId::new(order)).await?;
    info!("Order {order} cancelled");
    Ok(())
}
