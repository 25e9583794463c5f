//! Hiscore services.

pub mod backfill;
pub mod delta;
pub mod orchestrator;
pub mod priming;
pub mod snapshot;

pub use backfill::{BackfillReport, BackfillService};
pub use delta::{DeltaService, DeltaTotals};
pub use orchestrator::{DeltaSummary, HiscoreOrchestrator, SnapshotWithDelta};
pub use priming::{CachePrimer, PrimeReport};
pub use snapshot::{pick_nearest, SnapshotService};
