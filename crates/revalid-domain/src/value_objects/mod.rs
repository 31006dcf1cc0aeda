//! Domain Value Objects
//!
//! Immutable values describing queries and how their results are cached.
//!
//! ## Value Objects
//!
//! | Value Object | Description |
//! |--------------|-------------|
//! | [`QueryKey`] | Composite identifier of a query |
//! | [`CacheEntryPriority`] | Eviction priority of an entry |
//! | [`CacheEntryOptions`] | Expiry, staleness, priority and tags of a write |
//! | [`QueryOptions`] | Caching, refresh and retry behaviour of a query |
//! | [`MutationOptions`] | Invalidation behaviour of a mutation |
//! | [`OptimisticMutationOptions`] | Speculative writes around a mutation |
//! | [`QueryResult`] | Outcome of a query |

/// Option bags for queries, mutations and entries
pub mod options;
/// Entry eviction priority
pub mod priority;
/// Composite query key
pub mod query_key;
/// Query outcome
pub mod query_result;

pub use options::{
    CacheEntryOptions, ErrorCallbackFn, MutationOptions, OptimisticMutationOptions,
    OptimisticValueFn, QueryOptions, SuccessTransformFn, add_duration,
};
pub use priority::CacheEntryPriority;
pub use query_key::QueryKey;
pub use query_result::QueryResult;
