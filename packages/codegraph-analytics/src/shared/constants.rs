//! Crate-wide constants

/// Schema version reserved for future serialization of decomposition arrays.
/// Increment on any on-disk layout change.
pub const HLD_SCHEMA_VERSION: u32 = 1;

/// How many inner iterations long-running algorithms may execute between
/// cancellation polls.
pub const CANCEL_POLL_INTERVAL: usize = 100;

/// Hard ceiling on segment-tree capacity.
pub const MAX_SEGMENT_TREE_SIZE: usize = 1 << 30;
