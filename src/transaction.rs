//! Unit-of-work coordination.

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, error};

use crate::error::Result;
use crate::interfaces::{Transactor, TxContext};

/// Runs closures inside store transactions.
///
/// Reentrant: a context that is already in a transaction runs inline, so
/// nested service calls share the caller's unit of work.
pub struct TransactionManager {
    transactor: Arc<dyn Transactor>,
    enabled: bool,
}

impl TransactionManager {
    pub fn new(transactor: Arc<dyn Transactor>, enabled: bool) -> Self {
        Self {
            transactor,
            enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Runs `f` in a transaction, committing on success and aborting on any
    /// error from `f` or from the commit itself.
    ///
    /// When transactions are disabled, `f` runs inline with no atomicity.
    pub async fn with_transaction<T, F, Fut>(&self, ctx: &TxContext, f: F) -> Result<T>
    where
        F: FnOnce(TxContext) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if !self.enabled || ctx.is_in_transaction() {
            return f(*ctx).await;
        }

        let txn = self.transactor.begin().await?;
        debug!(txn, "Transaction opened");

        let outcome = match f(TxContext::within(txn)).await {
            Ok(value) => self
                .transactor
                .commit(txn)
                .await
                .map(|()| value)
                .map_err(Into::into),
            Err(e) => Err(e),
        };

        if let Err(e) = &outcome {
            debug!(txn, error = %e, "Rolling back transaction");
            if let Err(abort_err) = self.transactor.abort(txn).await {
                error!(txn, error = %abort_err, "Failed to roll back transaction");
            }
        }
        outcome
    }
}
