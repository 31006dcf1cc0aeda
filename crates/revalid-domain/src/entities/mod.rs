//! Domain Entities
//!
//! | Entity | Description |
//! |--------|-------------|
//! | [`CacheEntry`] | Cached value with its lifecycle state |
//! | [`CacheEntryMetadata`] | Entry envelope without the value |
//! | [`QueryMetadata`] | Per-key query statistics |

/// Cached value and envelope
pub mod cache_entry;
/// Per-key query statistics
pub mod query_metadata;

pub use cache_entry::{CacheEntry, CacheEntryMetadata, payload_etag};
pub use query_metadata::QueryMetadata;
