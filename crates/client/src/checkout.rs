//! Checkout workflow.
//!
//! A small state machine driving one order from cart selection to
//! submission:
//!
//! ```text
//! Idle ──begin──▶ Editing ──submit──▶ Submitting ──▶ Complete
//!                    ▲                     │
//!                    │ (validation,        ├──▶ Failed ──submit (retry)──▶ Submitting
//!                    │  stock, cancel)     │
//!                    └─────────────────────┘
//! ```
//!
//! Submission runs these steps in order:
//!
//! 1. Single-flight guard: a second submit while one is running is refused.
//! 2. Local validation: a non-empty selection and a complete recipient.
//! 3. Stock re-validation through the [`StockCache`]; the first line whose
//!    quantity exceeds stock aborts the whole order.
//! 4. Draft building: one detail per selected line, total floored at zero.
//! 5. One `submit_order` request. Failure leaves the workflow in `Failed`
//!    with every edit retained, so the next submit is a retry.
//! 6. Cart cleanup: every submitted line leaves the local cart and one delete
//!    per line is sent, concurrently. Lines the server refused to delete are
//!    reported and kept for [`CheckoutWorkflow::retry_cleanup`]; they cannot
//!    be selected again until the server confirms the delete.
//!
//! Steps 2 to 4 can be aborted with an [`AbortRegistration`]. Once the
//! order is handed to the server the remaining steps always run.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use freshcart_core::{
    Account, AccountId, CartLine, CartLineId, CurrencyCode, Discount, Money, OrderDraft,
    OrderDraftError, OrderId, PaymentMethod, Recipient, RecipientError,
};
use futures::future::{AbortRegistration, Abortable};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::api::{ApiError, CommerceApi};
use crate::cart::CartState;
use crate::report::BatchReport;
use crate::stock::StockCache;

/// Per-line result of removing submitted lines from the cart.
pub type CleanupReport = BatchReport<CartLineId>;

/// Where the workflow is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckoutState {
    #[default]
    Idle,
    Editing,
    Submitting,
    Failed,
    Complete,
}

impl std::fmt::Display for CheckoutState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Editing => "editing",
            Self::Submitting => "submitting",
            Self::Failed => "failed",
            Self::Complete => "complete",
        };
        f.write_str(name)
    }
}

/// Checkout errors.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("No items selected")]
    EmptySelection,

    #[error("Invalid recipient: {0}")]
    Recipient(#[from] RecipientError),

    #[error("Promo code is empty")]
    EmptyPromoCode,

    #[error("Promo code {0} has no value")]
    DiscountWithoutValue(String),

    #[error("Discount lookup failed: {0}")]
    Discount(#[source] ApiError),

    #[error("Only {available} of {title} in stock (requested {requested})")]
    StockExceeded {
        title: String,
        requested: u32,
        available: u32,
    },

    #[error(transparent)]
    Draft(#[from] OrderDraftError),

    #[error("Order submission failed: {0}")]
    Submission(#[source] ApiError),

    #[error("An order is already being submitted")]
    AlreadySubmitting,

    #[error("Not allowed while checkout is {0}")]
    InvalidState(CheckoutState),

    #[error("Checkout cancelled")]
    Cancelled,

    #[error("Cart line {0} is not in the cart")]
    UnknownLine(CartLineId),

    #[error("Cart line {0} was already ordered")]
    AlreadyOrdered(CartLineId),
}

impl CheckoutError {
    /// Text suitable for an alert dialog.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::EmptySelection => "Please select at least one item.".to_string(),
            Self::Recipient(e) => format!("Please fill in all delivery details: {e}."),
            Self::EmptyPromoCode => "Please enter a promo code.".to_string(),
            Self::DiscountWithoutValue(code) => format!("Promo code {code} is not valid."),
            Self::StockExceeded {
                title, available, ..
            } => format!("Only {available} of {title} left in stock."),
            Self::Draft(OrderDraftError::InvalidPrice { title, .. }) => {
                format!("{title} has an invalid price and cannot be ordered.")
            }
            Self::AlreadyOrdered(_) => {
                "This item was already ordered and is being removed from your cart.".to_string()
            }
            Self::Discount(e) | Self::Submission(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

/// A completed checkout.
#[derive(Debug, Clone)]
pub struct CheckoutOutcome {
    /// What was submitted.
    pub order: OrderDraft,
    /// Id assigned by the server, when it reports one.
    pub order_id: Option<OrderId>,
    /// Which submitted lines were removed from the cart.
    pub cleanup: CleanupReport,
}

/// Snapshot of the editable data and computed totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSummary {
    pub state: CheckoutState,
    pub recipient: Recipient,
    pub payment: PaymentMethod,
    pub selected: Vec<CartLineId>,
    pub subtotal: Money,
    pub discount: Option<Discount>,
    pub total: Money,
}

#[derive(Debug, Default)]
struct Session {
    state: CheckoutState,
    account_id: Option<AccountId>,
    recipient: Recipient,
    payment: PaymentMethod,
    selection: BTreeSet<CartLineId>,
    discount: Option<Discount>,
    /// Submitted lines whose cart deletion has not been confirmed.
    pending_cleanup: Vec<CartLineId>,
}

impl Session {
    fn ensure_editable(&self) -> Result<(), CheckoutError> {
        match self.state {
            CheckoutState::Editing | CheckoutState::Failed => Ok(()),
            CheckoutState::Submitting => Err(CheckoutError::AlreadySubmitting),
            other => Err(CheckoutError::InvalidState(other)),
        }
    }

    fn complete(&mut self, pending: impl IntoIterator<Item = CartLineId>) {
        self.state = CheckoutState::Complete;
        self.selection.clear();
        self.discount = None;
        for id in pending {
            if !self.pending_cleanup.contains(&id) {
                self.pending_cleanup.push(id);
            }
        }
    }

    fn ensure_orderable(&self, line: CartLineId) -> Result<(), CheckoutError> {
        if self.pending_cleanup.contains(&line) {
            return Err(CheckoutError::AlreadyOrdered(line));
        }
        Ok(())
    }
}

/// Drives one checkout at a time over the shared cart.
#[derive(Clone)]
pub struct CheckoutWorkflow {
    api: Arc<dyn CommerceApi>,
    cart: CartState,
    stock: StockCache,
    currency: CurrencyCode,
    session: Arc<Mutex<Session>>,
}

impl std::fmt::Debug for CheckoutWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutWorkflow")
            .field("state", &self.state())
            .field("currency", &self.currency)
            .finish_non_exhaustive()
    }
}

impl CheckoutWorkflow {
    /// Create a workflow in the `Idle` state.
    pub fn new(api: Arc<dyn CommerceApi>, cart: CartState, stock: StockCache) -> Self {
        let currency = api.currency();
        Self {
            api,
            cart,
            stock,
            currency,
            session: Arc::new(Mutex::new(Session::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn state(&self) -> CheckoutState {
        self.lock().state
    }

    /// Start editing, with the recipient pre-filled from the profile.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::AlreadySubmitting` while a submission runs.
    pub fn begin(&self, profile: Option<&Account>) -> Result<(), CheckoutError> {
        let mut session = self.lock();
        if session.state == CheckoutState::Submitting {
            return Err(CheckoutError::AlreadySubmitting);
        }
        let pending = std::mem::take(&mut session.pending_cleanup);
        *session = Session {
            state: CheckoutState::Editing,
            account_id: profile.and_then(|p| p.id),
            recipient: profile.map(Account::recipient).unwrap_or_default(),
            pending_cleanup: pending,
            ..Session::default()
        };
        Ok(())
    }

    /// Replace the delivery recipient.
    ///
    /// # Errors
    ///
    /// Returns an error outside `Editing` and `Failed`.
    pub fn set_recipient(&self, recipient: Recipient) -> Result<(), CheckoutError> {
        let mut session = self.lock();
        session.ensure_editable()?;
        session.recipient = recipient;
        Ok(())
    }

    /// Choose cash on delivery or online payment.
    ///
    /// # Errors
    ///
    /// Returns an error outside `Editing` and `Failed`.
    pub fn set_payment_method(&self, payment: PaymentMethod) -> Result<(), CheckoutError> {
        let mut session = self.lock();
        session.ensure_editable()?;
        session.payment = payment;
        Ok(())
    }

    /// Include a cart line in the order.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::UnknownLine` when the line is not in the cart
    /// and `CheckoutError::AlreadyOrdered` while its delete is pending.
    pub fn select(&self, line: CartLineId) -> Result<(), CheckoutError> {
        if self.cart.line(line).is_none() {
            return Err(CheckoutError::UnknownLine(line));
        }
        let mut session = self.lock();
        session.ensure_editable()?;
        session.ensure_orderable(line)?;
        session.selection.insert(line);
        Ok(())
    }

    /// Exclude a cart line from the order.
    ///
    /// # Errors
    ///
    /// Returns an error outside `Editing` and `Failed`.
    pub fn deselect(&self, line: CartLineId) -> Result<(), CheckoutError> {
        let mut session = self.lock();
        session.ensure_editable()?;
        session.selection.remove(&line);
        Ok(())
    }

    /// Flip a line's selection. Returns whether it is now selected.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::UnknownLine` when selecting a line that is not
    /// in the cart.
    pub fn toggle(&self, line: CartLineId) -> Result<bool, CheckoutError> {
        let known = self.cart.line(line).is_some();
        let mut session = self.lock();
        session.ensure_editable()?;
        if session.selection.remove(&line) {
            return Ok(false);
        }
        if !known {
            return Err(CheckoutError::UnknownLine(line));
        }
        session.ensure_orderable(line)?;
        session.selection.insert(line);
        Ok(true)
    }

    /// Select every line currently in the cart, skipping lines that were
    /// already ordered.
    ///
    /// # Errors
    ///
    /// Returns an error outside `Editing` and `Failed`.
    pub fn select_all(&self) -> Result<(), CheckoutError> {
        let ids: Vec<CartLineId> = self.cart.lines().iter().map(|l| l.id).collect();
        let mut session = self.lock();
        session.ensure_editable()?;
        let orderable: Vec<CartLineId> = ids
            .into_iter()
            .filter(|id| !session.pending_cleanup.contains(id))
            .collect();
        session.selection.extend(orderable);
        Ok(())
    }

    /// Deselect everything.
    ///
    /// # Errors
    ///
    /// Returns an error outside `Editing` and `Failed`.
    pub fn clear_selection(&self) -> Result<(), CheckoutError> {
        let mut session = self.lock();
        session.ensure_editable()?;
        session.selection.clear();
        Ok(())
    }

    /// Selected lines that are still in the cart, in cart order.
    #[must_use]
    pub fn selected_lines(&self) -> Vec<CartLine> {
        let selection = self.lock().selection.clone();
        self.cart
            .lines()
            .into_iter()
            .filter(|l| selection.contains(&l.id))
            .collect()
    }

    /// Sum of the selected lines' totals.
    #[must_use]
    pub fn subtotal(&self) -> Money {
        Money::sum(self.currency, self.selected_lines().iter().map(CartLine::line_total))
            .unwrap_or_else(|_| Money::zero(self.currency))
    }

    /// Subtotal minus the applied discount, never below zero.
    #[must_use]
    pub fn total(&self) -> Money {
        let subtotal = self.subtotal();
        match self.applied_discount() {
            Some(discount) => subtotal.saturating_sub(discount.amount).unwrap_or(subtotal),
            None => subtotal,
        }
    }

    /// The discount currently applied.
    #[must_use]
    pub fn applied_discount(&self) -> Option<Discount> {
        self.lock().discount.clone()
    }

    /// Everything a checkout screen shows.
    #[must_use]
    pub fn summary(&self) -> CheckoutSummary {
        let (state, recipient, payment, selected, discount) = {
            let session = self.lock();
            (
                session.state,
                session.recipient.clone(),
                session.payment,
                session.selection.iter().copied().collect(),
                session.discount.clone(),
            )
        };
        CheckoutSummary {
            state,
            recipient,
            payment,
            selected,
            subtotal: self.subtotal(),
            discount,
            total: self.total(),
        }
    }

    /// Look up and apply a promo code, replacing any earlier discount.
    ///
    /// On lookup failure, or when the code carries no value, the discount
    /// is reset to none.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::EmptyPromoCode` without a request for a blank
    /// code, `CheckoutError::Discount` when the lookup fails, and
    /// `CheckoutError::DiscountWithoutValue` for a zero amount.
    #[instrument(skip(self))]
    pub async fn apply_discount(&self, code: &str) -> Result<Discount, CheckoutError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(CheckoutError::EmptyPromoCode);
        }
        self.lock().ensure_editable()?;

        let result = self.api.find_discount(code).await;

        let mut session = self.lock();
        session.ensure_editable()?;
        match result {
            Ok(discount) if discount.is_applicable() && discount.amount.currency() == self.currency => {
                info!(amount = %discount.amount, "Discount applied");
                session.discount = Some(discount.clone());
                Ok(discount)
            }
            Ok(_) => {
                warn!("Discount code has no value");
                session.discount = None;
                Err(CheckoutError::DiscountWithoutValue(code.to_string()))
            }
            Err(e) => {
                warn!(error = %e, "Discount lookup failed");
                session.discount = None;
                Err(CheckoutError::Discount(e))
            }
        }
    }

    /// Remove the applied discount.
    ///
    /// # Errors
    ///
    /// Returns an error outside `Editing` and `Failed`.
    pub fn clear_discount(&self) -> Result<(), CheckoutError> {
        let mut session = self.lock();
        session.ensure_editable()?;
        session.discount = None;
        Ok(())
    }

    /// Submit the selected lines as one order.
    ///
    /// # Errors
    ///
    /// See [`CheckoutError`]; every error leaves the editing data intact.
    pub async fn submit(&self) -> Result<CheckoutOutcome, CheckoutError> {
        self.run_submit(None).await
    }

    /// Like [`Self::submit`], but validation, stock checks and draft building
    /// stop when `registration`'s handle is aborted.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Cancelled` when aborted before the order was
    /// sent.
    pub async fn submit_abortable(
        &self,
        registration: AbortRegistration,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        self.run_submit(Some(registration)).await
    }

    #[instrument(skip_all)]
    async fn run_submit(
        &self,
        registration: Option<AbortRegistration>,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        let snapshot = {
            let mut session = self.lock();
            match session.state {
                CheckoutState::Editing | CheckoutState::Failed => {}
                CheckoutState::Submitting => {
                    warn!("Ignoring duplicate submit");
                    return Err(CheckoutError::AlreadySubmitting);
                }
                other => return Err(CheckoutError::InvalidState(other)),
            }
            session.state = CheckoutState::Submitting;
            Snapshot {
                account_id: session.account_id,
                recipient: session.recipient.clone(),
                payment: session.payment,
                selection: session.selection.clone(),
                discount: session.discount.clone(),
                pending_cleanup: session.pending_cleanup.clone(),
            }
        };
        let mut guard = SubmitGuard::new(&self.session);

        let prepared = match registration {
            Some(registration) => Abortable::new(self.prepare(&snapshot), registration)
                .await
                .unwrap_or(Err(CheckoutError::Cancelled)),
            None => self.prepare(&snapshot).await,
        };
        let (draft, lines) = match prepared {
            Ok(prepared) => prepared,
            Err(e) => {
                warn!(error = %e, "Checkout stopped before submission");
                guard.settle(CheckoutState::Editing);
                return Err(e);
            }
        };

        let order_id = match self.api.submit_order(&draft).await {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "Order submission failed");
                guard.settle(CheckoutState::Failed);
                return Err(CheckoutError::Submission(e));
            }
        };
        let line_ids: Vec<CartLineId> = lines.iter().map(|l| l.id).collect();
        guard.persisted(line_ids.clone());
        self.cart.forget(line_ids.iter().copied());
        info!(order_id = ?order_id, total = %draft.total, "Order placed");

        let cleanup = self.remove_lines(line_ids).await;
        self.stock.invalidate_many(draft.product_ids()).await;

        self.lock().complete(cleanup.failed_ids());
        guard.disarm();

        Ok(CheckoutOutcome {
            order: draft,
            order_id,
            cleanup,
        })
    }

    /// Steps 2 to 4: validation, stock re-validation and draft building.
    async fn prepare(&self, snapshot: &Snapshot) -> Result<(OrderDraft, Vec<CartLine>), CheckoutError> {
        let lines: Vec<CartLine> = self
            .cart
            .lines()
            .into_iter()
            .filter(|l| snapshot.selection.contains(&l.id))
            .collect();
        if lines.is_empty() {
            return Err(CheckoutError::EmptySelection);
        }
        if let Some(line) = lines.iter().find(|l| snapshot.pending_cleanup.contains(&l.id)) {
            return Err(CheckoutError::AlreadyOrdered(line.id));
        }
        snapshot.recipient.validate()?;

        for line in &lines {
            let available = self.stock.get_stock(self.api.as_ref(), line.product_id).await;
            if line.quantity.get() > available {
                warn!(
                    product_id = %line.product_id,
                    requested = line.quantity.get(),
                    available,
                    "Stock check failed"
                );
                return Err(CheckoutError::StockExceeded {
                    title: line.title.clone(),
                    requested: line.quantity.get(),
                    available,
                });
            }
        }

        let draft = OrderDraft::from_lines(
            &lines,
            self.currency,
            snapshot.recipient.trimmed(),
            snapshot.payment,
            snapshot.discount.as_ref(),
            snapshot.account_id,
        )?;
        Ok((draft, lines))
    }

    /// Forget ordered lines locally and delete them on the server.
    async fn remove_lines(&self, ids: Vec<CartLineId>) -> CleanupReport {
        self.cart.forget(ids.iter().copied());
        let api = self.api.as_ref();
        let report = BatchReport::collect(ids, move |id| api.remove_from_cart(id))
            .await
            .with_action("removed");
        if !report.is_complete() {
            warn!(
                failed = report.failed.len(),
                "Order placed but some cart lines could not be removed"
            );
        }
        report
    }

    /// Lines from the last order still waiting to be removed from the cart.
    #[must_use]
    pub fn pending_cleanup(&self) -> Vec<CartLineId> {
        self.lock().pending_cleanup.clone()
    }

    /// Re-issue deletes for lines earlier cleanups could not remove.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::AlreadySubmitting` while a submission runs and
    /// `CheckoutError::InvalidState` before the first `begin`.
    #[instrument(skip(self))]
    pub async fn retry_cleanup(&self) -> Result<CleanupReport, CheckoutError> {
        let pending = {
            let session = self.lock();
            match session.state {
                CheckoutState::Editing | CheckoutState::Failed | CheckoutState::Complete => {}
                CheckoutState::Submitting => return Err(CheckoutError::AlreadySubmitting),
                CheckoutState::Idle => return Err(CheckoutError::InvalidState(session.state)),
            }
            session.pending_cleanup.clone()
        };
        if pending.is_empty() {
            return Ok(CleanupReport::default());
        }

        let report = self.remove_lines(pending).await;
        self.lock()
            .pending_cleanup
            .retain(|id| !report.succeeded.contains(id));
        Ok(report)
    }
}

/// Editing data captured when a submission starts.
struct Snapshot {
    account_id: Option<AccountId>,
    recipient: Recipient,
    payment: PaymentMethod,
    selection: BTreeSet<CartLineId>,
    discount: Option<Discount>,
    pending_cleanup: Vec<CartLineId>,
}

/// Restores a terminal state if the submission future is dropped midway.
struct SubmitGuard<'a> {
    session: &'a Mutex<Session>,
    /// Set once the server accepted the order, with the submitted lines.
    submitted: Option<Vec<CartLineId>>,
    armed: bool,
}

impl<'a> SubmitGuard<'a> {
    const fn new(session: &'a Mutex<Session>) -> Self {
        Self {
            session,
            submitted: None,
            armed: true,
        }
    }

    fn lock(&self) -> MutexGuard<'a, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persisted(&mut self, lines: Vec<CartLineId>) {
        self.submitted = Some(lines);
    }

    fn settle(&mut self, state: CheckoutState) {
        self.lock().state = state;
        self.armed = false;
    }

    const fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut session = self.lock();
        match self.submitted.take() {
            // Cleanup was interrupted; every submitted line may still be on the server.
            Some(lines) => session.complete(lines),
            None => session.state = CheckoutState::Editing,
        }
    }
}
