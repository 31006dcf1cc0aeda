//! Event Provider Implementations
//!
//! ## Available Providers
//!
//! | Provider | Type | Description |
//! |----------|------|-------------|
//! | [`TokioEventProvider`] | Local | In-process broadcast channels |
//! | [`NatsEventProvider`] | Distributed | NATS subjects shared by every instance |
//! | [`NullEventProvider`] | Testing | Publishes nowhere, never dispatches |
//!
//! All providers fan events out through the same dispatcher: handlers of
//! one event run concurrently and a failing or panicking handler is logged
//! without affecting the others.

pub mod dispatch;
#[cfg(feature = "events-nats")]
pub mod nats;
pub mod null;
pub mod tokio;

pub use dispatch::{ConnectionNotifier, HandlerRegistry};
#[cfg(feature = "events-nats")]
pub use nats::NatsEventProvider;
pub use null::NullEventProvider;
pub use self::tokio::TokioEventProvider;
