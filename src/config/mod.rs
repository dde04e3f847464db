pub mod settings;

pub use settings::PubSubConfig;
