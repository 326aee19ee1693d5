pub mod alert;
pub mod config;
pub mod cycle;
pub mod retry;
pub mod sensor;
pub mod webhook;

/// Error type used at the trait seams between the core and a platform
/// implementation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
