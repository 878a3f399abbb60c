//! Durable library metadata
//!
//! The store owns every library entry and the cleanup rule tying an entry's
//! existence to its input and output files. Each mutation is written through
//! to a JSON snapshot before the call returns.

pub mod snapshot;
pub mod store;

pub use snapshot::StoreError;
pub use store::MetadataStore;
