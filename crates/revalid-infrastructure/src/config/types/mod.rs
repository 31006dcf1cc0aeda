//! Configuration types module

pub mod app;
pub mod cache;
pub mod events;
pub mod keys;
pub mod logging;
pub mod query;

pub use app::AppConfig;
pub use cache::CacheConfig;
pub use events::EventsConfig;
pub use keys::KeysConfig;
pub use logging::LoggingConfig;
pub use query::QueryConfig;
