// ============================================================================
// Dedup Types - Core Data Types
// ============================================================================
//
// Data structures shared by the deduplication tracker and its storage
// backends. No dependencies on storage, configuration or runtime.
//
// Contents:
// - Delivery keys (message ID + subscriber name)
// - Delivery records (state + timestamp of the last transition)
// - Delivery verdicts
//
// Dependencies:
// - serde (serialization only)
// - chrono (timestamps)
//
// ============================================================================

pub mod key;
pub mod record;

// Re-exports for convenience
pub use key::*;
pub use record::*;
