//! Order placement.

use std::sync::Arc;

use freshcart_client::CheckoutWorkflow;
use freshcart_core::{CartLineId, PaymentMethod, Recipient};
use futures::future::AbortHandle;
use tracing::{info, warn};

use super::{CommandError, Context};

/// Arguments of `freshcart checkout`.
pub struct CheckoutRequest {
    /// Cart lines to order; every line when empty.
    pub lines: Vec<i64>,
    pub promo: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub online: bool,
}

pub async fn run(ctx: &Context, request: CheckoutRequest) -> Result<(), CommandError> {
    ctx.cart.refresh(&ctx.client).await?;
    let account = ctx.client.show_account().await?;

    let workflow = CheckoutWorkflow::new(
        Arc::new(ctx.client.clone()),
        ctx.cart.clone(),
        ctx.stock.clone(),
    );
    workflow.begin(Some(&account))?;

    let profile = workflow.summary().recipient;
    workflow.set_recipient(Recipient::new(
        request.name.unwrap_or(profile.name),
        request.phone.unwrap_or(profile.phone),
        request.address.unwrap_or(profile.address),
    ))?;
    workflow.set_payment_method(if request.online {
        PaymentMethod::Online
    } else {
        PaymentMethod::Cash
    })?;

    if request.lines.is_empty() {
        workflow.select_all()?;
    } else {
        for line in request.lines {
            workflow.select(CartLineId::new(line))?;
        }
    }

    if let Some(code) = request.promo {
        let discount = workflow.apply_discount(&code).await?;
        info!("Promo {} applied: -{}", discount.code, discount.amount);
    }

    let summary = workflow.summary();
    info!(
        "Ordering {} lines: subtotal {}, total {}",
        summary.selected.len(),
        summary.subtotal,
        summary.total
    );

    // Ctrl-C stops the checkout up to the point the order is sent.
    let (abort, registration) = AbortHandle::new_pair();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            abort.abort();
        }
    });
    let result = workflow.submit_abortable(registration).await;
    interrupt.abort();
    let outcome = result?;

    match outcome.order_id {
        Some(id) => info!("Order {id} placed, total {}", outcome.order.total),
        None => info!("Order placed, total {}", outcome.order.total),
    }
    if let Some(message) = outcome.cleanup.user_message() {
        warn!("The order was placed but some items are still in your cart. {message}");
        let retry = workflow.retry_cleanup().await?;
        if let Some(message) = retry.user_message() {
            warn!("{message}");
        }
    }
    Ok(())
}
