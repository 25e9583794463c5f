//! Abstract interfaces for the external collaborators.
//!
//! These traits define the contracts for:
//! - Snapshot storage (system of record for snapshots)
//! - Delta storage (precomputed snapshot-to-snapshot differences)
//! - User storage (which users are tracked, for cache priming)
//! - Transactions (unit-of-work around snapshot + delta writes)

pub mod delta_store;
pub mod snapshot_store;
pub mod storage_error;
pub mod transactor;
pub mod user_store;

pub use delta_store::DeltaStore;
pub use snapshot_store::SnapshotStore;
pub use storage_error::{optional, Result, StorageError};
pub use transactor::{Transactor, TxContext, TxnId};
pub use user_store::UserStore;
