/// Transport-facing façade: id validation and registry lookups.
pub mod application;
/// Broker configuration loading.
pub mod config;
/// Error types: pub/sub errors, config errors, status codes.
pub mod error;
/// Flexible logging (formatting, filters, sinks).
pub mod logging;
/// Pub/Sub: Registry, Publisher, Subscriber, Mailbox, Message.
pub mod pubsub;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

/// Service façade and the port it implements.
pub use application::{PubSubPort, PubSubService};
/// config
pub use crate::config::PubSubConfig;
/// Operation errors and result types.
pub use error::{
    ConfigError, ConfigResult, EntityKind, ErrorExt, PubSubError, PubSubResult, StatusCode,
};
/// Logging initialization.
pub use logging::{init_logging, LoggingConfig, LoggingHandle};
/// Pub/Sub API.
pub use pubsub::{
    IdKind, Mailbox, Message, PubSubId, Publisher, Registry, Subscriber,
    DEFAULT_MAILBOX_CAPACITY, WILDCARD_TOPIC,
};
