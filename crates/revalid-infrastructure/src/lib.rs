//! # Revalid Infrastructure
//!
//! Wiring around the query client:
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`config`] | `AppConfig` sections and the Figment-based `ConfigLoader` |
//! | [`logging`] | `tracing-subscriber` initialisation |
//! | [`bootstrap`] | Build a `QueryClient` from configuration |
//! | [`error_ext`] | Context helpers for foreign errors |

// Force-link revalid-providers so its linkme registrations are included
extern crate revalid_providers;

pub mod bootstrap;
pub mod config;
pub mod constants;
pub mod error_ext;
pub mod logging;

pub use bootstrap::{build_query_client, build_query_client_with_clock, init_from_config};
pub use config::{AppConfig, ConfigLoader};
pub use logging::init_logging;
