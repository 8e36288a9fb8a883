//! Outcome of fanning one operation out over several items.

use std::fmt::Display;
use std::future::Future;

use futures::future::join_all;

use crate::api::ApiError;

/// Which items an operation succeeded and failed for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport<Id> {
    pub succeeded: Vec<Id>,
    /// Failed items with the user-facing reason.
    pub failed: Vec<(Id, String)>,
    /// Past participle used in the alert text, e.g. "removed".
    action: &'static str,
}

impl<Id> Default for BatchReport<Id> {
    fn default() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
            action: "processed",
        }
    }
}

impl<Id> BatchReport<Id> {
    /// Name what was done to each item in [`Self::user_message`].
    #[must_use]
    pub const fn with_action(mut self, action: &'static str) -> Self {
        self.action = action;
        self
    }
}

impl<Id: Copy + Display> BatchReport<Id> {
    /// Run `op` for every id concurrently and collect the results.
    pub async fn collect<I, F, Fut>(ids: I, op: F) -> Self
    where
        I: IntoIterator<Item = Id>,
        F: Fn(Id) -> Fut,
        Fut: Future<Output = Result<(), ApiError>>,
    {
        let ids: Vec<Id> = ids.into_iter().collect();
        let results = join_all(ids.iter().map(|id| op(*id))).await;

        let mut report = Self::default();
        for (id, result) in ids.into_iter().zip(results) {
            match result {
                Ok(()) => report.succeeded.push(id),
                Err(e) => {
                    tracing::warn!(id = %id, error = %e, "Batch item failed");
                    report.failed.push((id, e.user_message()));
                }
            }
        }
        report
    }

    /// Whether every item succeeded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Ids that failed.
    pub fn failed_ids(&self) -> impl Iterator<Item = Id> + '_ {
        self.failed.iter().map(|(id, _)| *id)
    }

    /// Aggregate alert text, or `None` when nothing failed.
    #[must_use]
    pub fn user_message(&self) -> Option<String> {
        match self.failed.len() {
            0 => None,
            n if self.succeeded.is_empty() => Some(format!(
                "None of the {n} items could be {}. Please try again.",
                self.action
            )),
            n => Some(format!(
                "{n} of {} items could not be {}. Please try again.",
                n + self.succeeded.len(),
                self.action
            )),
        }
    }
}
