//! `TrackingStore` implementations that live in core.

pub mod memory;
pub mod retrying;

pub use memory::MemoryStore;
pub use retrying::RetryingStore;
