//! Category and product browsing.

use freshcart_core::{CategoryId, ProductId};
use tracing::info;

use super::{CommandError, Context};

pub async fn categories(ctx: &Context) -> Result<(), CommandError> {
    let categories = ctx.client.categories().await?;
    for category in &categories {
        info!("{:>5}  {} ({})", category.id.as_i64(), category.name, category.unit);
    }
    Ok(())
}

pub async fn products(ctx: &Context, category: i64) -> Result<(), CommandError> {
    let products = ctx
        .client
        .products_by_category(CategoryId::new(category))
        .await?;
    if products.is_empty() {
        info!("No products in this category");
    }
    for product in &products {
        info!(
            "{:>5}  {}  {} / {}",
            product.id.as_i64(),
            product.title,
            product.price,
            product.unit
        );
    }
    Ok(())
}

pub async fn product(ctx: &Context, id: i64) -> Result<(), CommandError> {
    let id = ProductId::new(id);
    let product = ctx.client.product(id).await?;
    let stock = ctx.stock.get_stock(&ctx.client, id).await;

    info!("{} ({})", product.title, product.category);
    info!("  Price: {} / {}", product.price, product.unit);
    info!("  In stock: {stock}");
    if !product.description.is_empty() {
        info!("  {}", product.description);
    }
    Ok(())
}
