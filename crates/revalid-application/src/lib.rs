//! # Revalid Application
//!
//! Orchestration layer: the [`QueryClient`] that serves reads through a
//! cache with stale-while-revalidate semantics, runs mutations with
//! invalidation, and keeps peer instances consistent through cache events.
//!
//! ## Modules
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`query_client`] | `QueryClient`, its builder and `QueryTarget` |
//! | [`registry`] | Compile-time registries of cache and event providers |
//!
//! The client depends only on the ports in `revalid-domain`; concrete
//! backends come from `revalid-providers` through the registries.

pub mod query_client;
pub mod registry;

pub use query_client::{QueryClient, QueryClientBuilder, QueryTarget};
