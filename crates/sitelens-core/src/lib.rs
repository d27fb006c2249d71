pub mod compare;
pub mod config;
pub mod custom_events;
pub mod engine;
pub mod error;
pub mod event;
pub mod memory;
pub mod metrics;
pub mod sessions;
pub mod signature;
pub mod store;
pub mod window;

pub use engine::AnalyticsEngine;
pub use error::{CoreError, ErrorKind};
