//! Transaction interface and the unit-of-work handle threaded through writes.

use async_trait::async_trait;

use super::storage_error::Result;

/// Identifier of an open store transaction.
pub type TxnId = u64;

/// Unit-of-work handle passed explicitly down the call chain.
///
/// A default context is outside any transaction. Code running inside
/// [`crate::transaction::TransactionManager::with_transaction`] receives a
/// context bound to the open transaction, and nested `with_transaction`
/// calls made with that context run inline instead of opening another one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxContext {
    txn: Option<TxnId>,
}

impl TxContext {
    /// Context outside any transaction.
    pub const fn none() -> Self {
        Self { txn: None }
    }

    /// Context bound to an open transaction.
    pub const fn within(txn: TxnId) -> Self {
        Self { txn: Some(txn) }
    }

    pub fn is_in_transaction(&self) -> bool {
        self.txn.is_some()
    }

    pub fn txn(&self) -> Option<TxnId> {
        self.txn
    }
}

/// Store-side transaction control.
///
/// Writes issued with a context bound to `txn` become visible to other
/// readers only after `commit`; `abort` discards them.
#[async_trait]
pub trait Transactor: Send + Sync {
    async fn begin(&self) -> Result<TxnId>;

    async fn commit(&self, txn: TxnId) -> Result<()>;

    async fn abort(&self, txn: TxnId) -> Result<()>;
}
