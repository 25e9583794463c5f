//! Storage configuration.

use serde::Deserialize;

/// Storage behaviour shared by every backend.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Wrap snapshot and delta writes in one store transaction.
    ///
    /// Disable for backends without multi-document transactions. Writes
    /// then run inline with no atomicity.
    pub transactions_enabled: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            transactions_enabled: true,
        }
    }
}
