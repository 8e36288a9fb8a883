//! Favourite commands.

use freshcart_client::favourites::{self, FavouriteToggle};
use freshcart_core::{FavouriteId, FavouriteItem, ProductId};
use tracing::{info, warn};

use super::{CommandError, Context};

fn show(item: &FavouriteItem) {
    let title = item.title.as_deref().unwrap_or("(unknown product)");
    match item.price {
        Some(price) => info!("{:>5}  {}  {}  {}", item.id.as_i64(), item.product_id, title, price),
        None => info!("{:>5}  {}  {}", item.id.as_i64(), item.product_id, title),
    }
}

pub async fn list(ctx: &Context) -> Result<(), CommandError> {
    let items = ctx.client.favourites().await?;
    if items.is_empty() {
        info!("No favourites yet");
    }
    items.iter().for_each(show);
    Ok(())
}

pub async fn add(ctx: &Context, product: i64) -> Result<(), CommandError> {
    let item = ctx.client.add_favourite(ProductId::new(product)).await?;
    show(&item);
    Ok(())
}

pub async fn remove(ctx: &Context, ids: &[i64]) -> Result<(), CommandError> {
    let report =
        favourites::remove_many(&ctx.client, ids.iter().copied().map(FavouriteId::new)).await;
    info!("Removed {} favourites", report.succeeded.len());
    if let Some(message) = report.user_message() {
        warn!("{message}");
    }
    Ok(())
}

pub async fn toggle(ctx: &Context, product: i64) -> Result<(), CommandError> {
    match favourites::toggle(&ctx.client, ProductId::new(product)).await? {
        FavouriteToggle::Added(item) => info!("Added favourite {}", item.id),
        FavouriteToggle::Removed(id) => info!("Removed favourite {id}"),
    }
    Ok(())
}

/// Move favourites into the cart; all of them when `products` is empty.
pub async fn to_cart(ctx: &Context, products: &[i64]) -> Result<(), CommandError> {
    let mut items = ctx.client.favourites().await?;
    if !products.is_empty() {
        items.retain(|item| products.contains(&item.product_id.as_i64()));
    }
    if items.is_empty() {
        info!("Nothing to add");
        return Ok(());
    }

    let report = favourites::move_to_cart(&ctx.client, &ctx.cart, &items).await;
    info!("Added {} products to the cart", report.succeeded.len());
    if let Some(message) = report.user_message() {
        warn!("{message}");
    }
    Ok(())
}
