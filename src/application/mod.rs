pub mod pubsub_port;
pub mod pubsub_service;

pub use pubsub_port::*;
pub use pubsub_service::*;
