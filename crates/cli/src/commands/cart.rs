//! Cart commands.

use freshcart_client::CommerceApi;
use freshcart_core::{CartLineId, ProductId};
use tracing::{info, warn};

use super::{CommandError, Context};

pub async fn list(ctx: &Context) -> Result<(), CommandError> {
    ctx.cart.refresh(&ctx.client).await?;
    let lines = ctx.cart.lines();
    if lines.is_empty() {
        info!("Your cart is empty");
        return Ok(());
    }
    for line in &lines {
        info!(
            "{:>5}  {}  {} x {} = {}",
            line.id.as_i64(),
            line.title,
            line.quantity,
            line.unit_price,
            line.line_total()
        );
    }
    if let Some(total) = ctx.cart.total(ctx.client.currency()) {
        info!("Total: {total}");
    }
    Ok(())
}

pub async fn add(ctx: &Context, product: i64, quantity: u32) -> Result<(), CommandError> {
    ctx.cart
        .add(&ctx.client, ProductId::new(product), quantity)
        .await?;
    info!("Added to cart ({} lines)", ctx.cart.lines().len());
    Ok(())
}

pub async fn remove(ctx: &Context, lines: &[i64]) -> Result<(), CommandError> {
    ctx.cart.refresh(&ctx.client).await?;
    let report = ctx
        .cart
        .remove_many(&ctx.client, lines.iter().copied().map(CartLineId::new))
        .await;
    info!("Removed {} lines", report.succeeded.len());
    for (id, reason) in &report.failed {
        warn!("Line {id}: {reason}");
    }
    if let Some(message) = report.user_message() {
        warn!("{message}");
    }
    Ok(())
}

/// Quantity edits are local to this process, so this only reports whether
/// the new quantity fits the available stock.
pub async fn set_quantity(ctx: &Context, line: i64, quantity: u32) -> Result<(), CommandError> {
    ctx.cart.refresh(&ctx.client).await?;
    let line = ctx
        .cart
        .mutate_quantity(CartLineId::new(line), quantity, &ctx.stock, &ctx.client)
        .await?;
    info!("{}: {} ({})", line.title, line.subtitle, line.line_total());
    Ok(())
}
