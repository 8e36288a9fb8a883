//! In-memory commerce backend.
//!
//! Implements [`CommerceApi`] over plain collections so cart, checkout,
//! order and favourite flows can run without a server. Every call yields to
//! the scheduler once, so concurrent callers interleave the way they would
//! against a real backend. Call counters and failure switches let tests
//! assert exactly which requests were made.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use freshcart_core::{
    CartLine, CartLineId, CurrencyCode, Discount, DiscountId, FavouriteId, FavouriteItem, Money,
    Order, OrderDetail, OrderDetailId, OrderDraft, OrderId, OrderStatus, ProductId, Recipient,
};
use rust_decimal::Decimal;
use tokio::sync::watch;

use crate::api::{ApiError, CommerceApi};

#[derive(Debug, Clone)]
struct ProductRecord {
    title: String,
    price: Money,
    stock: u32,
}

#[derive(Debug, Clone)]
struct StoredOrder {
    order: Order,
    details: Vec<OrderDetail>,
}

#[derive(Debug, Default)]
struct Store {
    next_id: i64,
    products: BTreeMap<ProductId, ProductRecord>,
    cart: Vec<CartLine>,
    favourites: Vec<FavouriteItem>,
    discounts: HashMap<String, Money>,
    orders: Vec<StoredOrder>,
    submitted: Vec<OrderDraft>,

    offline: bool,
    fail_stock: bool,
    fail_removals: HashSet<CartLineId>,
    fail_adds: HashSet<ProductId>,
    fail_favourite_removals: HashSet<FavouriteId>,
    submit_rejection: Option<String>,
}

impl Store {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn check_online(&self) -> Result<(), ApiError> {
        if self.offline {
            Err(ApiError::Transport("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    fetches: AtomicUsize,
    adds: AtomicUsize,
    removals: AtomicUsize,
    stock_lookups: AtomicUsize,
    discount_lookups: AtomicUsize,
    submits: AtomicUsize,
    cancels: AtomicUsize,
}

fn bump(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::SeqCst);
}

fn rejected(status: u16, message: &str) -> ApiError {
    ApiError::Rejected {
        status,
        message: message.to_string(),
    }
}

/// A commerce backend held entirely in memory.
#[derive(Debug)]
pub struct InMemoryCommerce {
    currency: CurrencyCode,
    store: Mutex<Store>,
    counters: Counters,
    /// `false` holds order submissions until released.
    submissions_open: watch::Sender<bool>,
}

impl Default for InMemoryCommerce {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCommerce {
    /// Empty backend pricing in USD.
    #[must_use]
    pub fn new() -> Self {
        Self::with_currency(CurrencyCode::USD)
    }

    #[must_use]
    pub fn with_currency(currency: CurrencyCode) -> Self {
        let (submissions_open, _) = watch::channel(true);
        Self {
            currency,
            store: Mutex::new(Store::default()),
            counters: Counters::default(),
            submissions_open,
        }
    }

    fn store(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Seeding
    // =========================================================================

    /// Add a product to the catalog.
    #[must_use]
    pub fn with_product(self, id: ProductId, title: &str, price: Decimal, stock: u32) -> Self {
        let price = Money::new(price, self.currency);
        self.store().products.insert(
            id,
            ProductRecord {
                title: title.to_string(),
                price,
                stock,
            },
        );
        self
    }

    /// Register a promo code.
    #[must_use]
    pub fn with_discount(self, code: &str, amount: Decimal) -> Self {
        let amount = Money::new(amount, self.currency);
        self.store().discounts.insert(code.to_string(), amount);
        self
    }

    /// Put a line straight into the server-side cart, bypassing stock checks.
    ///
    /// # Panics
    ///
    /// Panics if `product` was not added with [`Self::with_product`] or
    /// `quantity` is zero.
    #[allow(clippy::expect_used)]
    pub fn seed_cart_line(&self, product: ProductId, quantity: u32) -> CartLineId {
        let mut store = self.store();
        let record = store
            .products
            .get(&product)
            .cloned()
            .expect("seeded cart line for unknown product");
        let quantity = NonZeroU32::new(quantity).expect("seeded cart line with zero quantity");
        let id = CartLineId::new(store.next_id());
        store.cart.push(CartLine {
            id,
            product_id: product,
            title: record.title,
            subtitle: format!("{quantity} items"),
            unit_price: record.price,
            quantity,
            image: None,
        });
        id
    }

    /// Put a line with an arbitrary price into the server-side cart.
    pub fn seed_priced_line(
        &self,
        product: ProductId,
        title: &str,
        price: Money,
        quantity: NonZeroU32,
    ) -> CartLineId {
        let mut store = self.store();
        let id = CartLineId::new(store.next_id());
        store.cart.push(CartLine {
            id,
            product_id: product,
            title: title.to_string(),
            subtitle: format!("{quantity} items"),
            unit_price: price,
            quantity,
            image: None,
        });
        id
    }

    /// Add a favourite for `product`.
    pub fn seed_favourite(&self, product: ProductId) -> FavouriteId {
        let mut store = self.store();
        let id = FavouriteId::new(store.next_id());
        let record = store.products.get(&product).cloned();
        store.favourites.push(FavouriteItem {
            id,
            product_id: product,
            title: record.as_ref().map(|r| r.title.clone()),
            image: None,
            price: record.map(|r| r.price),
        });
        id
    }

    /// Add a past order with the given status and total.
    pub fn seed_order(&self, status: OrderStatus, total: Decimal) -> OrderId {
        let mut store = self.store();
        let id = OrderId::new(store.next_id());
        let total = Money::new(total, self.currency);
        store.orders.push(StoredOrder {
            order: Order {
                id,
                account_id: None,
                discount_id: None,
                recipient: Recipient::new("Seeded", "0900000000", "1 Test St"),
                payment: freshcart_core::PaymentMethod::Cash,
                total,
                status,
            },
            details: Vec::new(),
        });
        id
    }

    // =========================================================================
    // Failure switches
    // =========================================================================

    /// Make every call fail as if the server were unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.store().offline = offline;
    }

    /// Make stock lookups fail.
    pub fn fail_stock_lookups(&self, fail: bool) {
        self.store().fail_stock = fail;
    }

    /// Change a product's stock.
    pub fn set_stock(&self, product: ProductId, stock: u32) {
        if let Some(record) = self.store().products.get_mut(&product) {
            record.stock = stock;
        }
    }

    /// Refuse deletion of a cart line.
    pub fn fail_removal_of(&self, line: CartLineId) {
        self.store().fail_removals.insert(line);
    }

    /// Allow deletion of a cart line again.
    pub fn allow_removal_of(&self, line: CartLineId) {
        self.store().fail_removals.remove(&line);
    }

    /// Refuse adding a product to the cart.
    pub fn fail_add_of(&self, product: ProductId) {
        self.store().fail_adds.insert(product);
    }

    /// Refuse deletion of a favourite.
    pub fn fail_favourite_removal_of(&self, favourite: FavouriteId) {
        self.store().fail_favourite_removals.insert(favourite);
    }

    /// Reject order submissions with `message` until cleared with `None`.
    pub fn reject_submissions(&self, message: Option<&str>) {
        self.store().submit_rejection = message.map(str::to_string);
    }

    /// Park order submissions until [`Self::release_submissions`].
    pub fn hold_submissions(&self) {
        self.submissions_open.send_replace(false);
    }

    pub fn release_submissions(&self) {
        self.submissions_open.send_replace(true);
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Server-side cart lines.
    #[must_use]
    pub fn cart_snapshot(&self) -> Vec<CartLine> {
        self.store().cart.clone()
    }

    /// Drafts accepted by `submit_order`, in order.
    #[must_use]
    pub fn submitted_orders(&self) -> Vec<OrderDraft> {
        self.store().submitted.clone()
    }

    /// Server-side favourites.
    #[must_use]
    pub fn favourites_snapshot(&self) -> Vec<FavouriteItem> {
        self.store().favourites.clone()
    }

    /// Current status of an order.
    #[must_use]
    pub fn order_status(&self, order: OrderId) -> Option<OrderStatus> {
        self.store()
            .orders
            .iter()
            .find(|o| o.order.id == order)
            .map(|o| o.order.status)
    }

    #[must_use]
    pub fn fetch_calls(&self) -> usize {
        self.counters.fetches.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn add_calls(&self) -> usize {
        self.counters.adds.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn removal_calls(&self) -> usize {
        self.counters.removals.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn stock_lookups(&self) -> usize {
        self.counters.stock_lookups.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn discount_lookups(&self) -> usize {
        self.counters.discount_lookups.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn submit_calls(&self) -> usize {
        self.counters.submits.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn cancel_calls(&self) -> usize {
        self.counters.cancels.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CommerceApi for InMemoryCommerce {
    fn currency(&self) -> CurrencyCode {
        self.currency
    }

    async fn fetch_cart(&self) -> Result<Vec<CartLine>, ApiError> {
        bump(&self.counters.fetches);
        tokio::task::yield_now().await;
        let store = self.store();
        store.check_online()?;
        Ok(store.cart.clone())
    }

    async fn add_to_cart(&self, product: ProductId, quantity: NonZeroU32) -> Result<(), ApiError> {
        bump(&self.counters.adds);
        tokio::task::yield_now().await;
        let mut store = self.store();
        store.check_online()?;
        if store.fail_adds.contains(&product) {
            return Err(rejected(400, "Could not add product to cart"));
        }
        let record = store
            .products
            .get(&product)
            .cloned()
            .ok_or_else(|| rejected(404, "Product not found"))?;

        if let Some(line) = store.cart.iter_mut().find(|l| l.product_id == product) {
            let total = line.quantity.saturating_add(quantity.get());
            if total.get() > record.stock {
                return Err(rejected(400, "Not enough stock"));
            }
            line.quantity = total;
            line.subtitle = format!("{total} items");
            return Ok(());
        }

        if quantity.get() > record.stock {
            return Err(rejected(400, "Not enough stock"));
        }
        let id = CartLineId::new(store.next_id());
        store.cart.push(CartLine {
            id,
            product_id: product,
            title: record.title,
            subtitle: format!("{quantity} items"),
            unit_price: record.price,
            quantity,
            image: None,
        });
        Ok(())
    }

    async fn remove_from_cart(&self, line: CartLineId) -> Result<(), ApiError> {
        bump(&self.counters.removals);
        tokio::task::yield_now().await;
        let mut store = self.store();
        store.check_online()?;
        if store.fail_removals.contains(&line) {
            return Err(rejected(500, "Could not delete cart line"));
        }
        let before = store.cart.len();
        store.cart.retain(|l| l.id != line);
        if store.cart.len() == before {
            return Err(rejected(404, "Cart line not found"));
        }
        Ok(())
    }

    async fn stock(&self, product: ProductId) -> Result<u32, ApiError> {
        bump(&self.counters.stock_lookups);
        tokio::task::yield_now().await;
        let store = self.store();
        store.check_online()?;
        if store.fail_stock {
            return Err(rejected(503, "Stock service unavailable"));
        }
        store
            .products
            .get(&product)
            .map(|r| r.stock)
            .ok_or_else(|| ApiError::NotFound(format!("product {product}")))
    }

    async fn find_discount(&self, code: &str) -> Result<Discount, ApiError> {
        bump(&self.counters.discount_lookups);
        tokio::task::yield_now().await;
        let mut store = self.store();
        store.check_online()?;
        let amount = store
            .discounts
            .get(code)
            .copied()
            .ok_or_else(|| ApiError::DiscountNotFound("Discount code not found".to_string()))?;
        Ok(Discount {
            id: Some(DiscountId::new(store.next_id())),
            account_id: None,
            code: code.to_string(),
            amount,
        })
    }

    async fn submit_order(&self, draft: &OrderDraft) -> Result<Option<OrderId>, ApiError> {
        bump(&self.counters.submits);
        tokio::task::yield_now().await;

        let mut open = self.submissions_open.subscribe();
        // The sender lives as long as `self`, so this only fails on shutdown.
        let _ = open.wait_for(|open| *open).await;

        let mut store = self.store();
        store.check_online()?;
        if let Some(message) = store.submit_rejection.clone() {
            return Err(ApiError::OrderRejected(message));
        }

        let id = OrderId::new(store.next_id());
        let details = draft
            .details
            .iter()
            .map(|d| OrderDetail {
                id: Some(OrderDetailId::new(id.as_i64() * 100 + d.product_id.as_i64())),
                order_id: Some(id),
                product_id: Some(d.product_id),
                quantity: d.quantity.get(),
                unit_price: d.unit_price,
                line_total: d.line_total,
            })
            .collect();
        store.orders.push(StoredOrder {
            order: Order {
                id,
                account_id: draft.account_id,
                discount_id: draft.discount_id,
                recipient: draft.recipient.clone(),
                payment: draft.payment,
                total: draft.total,
                status: draft.status,
            },
            details,
        });
        store.submitted.push(draft.clone());
        Ok(Some(id))
    }

    async fn orders(&self) -> Result<Vec<Order>, ApiError> {
        tokio::task::yield_now().await;
        let store = self.store();
        store.check_online()?;
        Ok(store.orders.iter().map(|o| o.order.clone()).collect())
    }

    async fn order_details(&self, order: OrderId) -> Result<Vec<OrderDetail>, ApiError> {
        tokio::task::yield_now().await;
        let store = self.store();
        store.check_online()?;
        store
            .orders
            .iter()
            .find(|o| o.order.id == order)
            .map(|o| o.details.clone())
            .ok_or_else(|| rejected(404, "Order not found"))
    }

    async fn cancel_order(&self, order: OrderId) -> Result<(), ApiError> {
        bump(&self.counters.cancels);
        tokio::task::yield_now().await;
        let mut store = self.store();
        store.check_online()?;
        let stored = store
            .orders
            .iter_mut()
            .find(|o| o.order.id == order)
            .ok_or_else(|| rejected(404, "Order not found"))?;
        if !stored.order.status.is_cancellable() {
            return Err(rejected(400, "Order can no longer be cancelled"));
        }
        stored.order.status = OrderStatus::Canceled;
        Ok(())
    }

    async fn favourites(&self) -> Result<Vec<FavouriteItem>, ApiError> {
        tokio::task::yield_now().await;
        let store = self.store();
        store.check_online()?;
        Ok(store.favourites.clone())
    }

    async fn add_favourite(&self, product: ProductId) -> Result<FavouriteItem, ApiError> {
        tokio::task::yield_now().await;
        let mut store = self.store();
        store.check_online()?;
        if let Some(existing) = store.favourites.iter().find(|f| f.product_id == product) {
            return Ok(existing.clone());
        }
        let record = store
            .products
            .get(&product)
            .cloned()
            .ok_or_else(|| rejected(404, "Product not found"))?;
        let item = FavouriteItem {
            id: FavouriteId::new(store.next_id()),
            product_id: product,
            title: Some(record.title),
            image: None,
            price: Some(record.price),
        };
        store.favourites.push(item.clone());
        Ok(item)
    }

    async fn remove_favourite(&self, favourite: FavouriteId) -> Result<(), ApiError> {
        tokio::task::yield_now().await;
        let mut store = self.store();
        store.check_online()?;
        if store.fail_favourite_removals.contains(&favourite) {
            return Err(rejected(500, "Could not delete favourite"));
        }
        let before = store.favourites.len();
        store.favourites.retain(|f| f.id != favourite);
        if store.favourites.len() == before {
            return Err(rejected(404, "Favourite not found"));
        }
        Ok(())
    }

    async fn is_favourite(&self, product: ProductId) -> Result<bool, ApiError> {
        tokio::task::yield_now().await;
        let store = self.store();
        store.check_online()?;
        Ok(store.favourites.iter().any(|f| f.product_id == product))
    }
}
