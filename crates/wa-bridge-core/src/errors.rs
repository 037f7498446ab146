use std::time::Duration;

/// Core error type for the bridge.
///
/// Adapter crates should map their specific errors into this type so the
/// listener can log every failure the same way at its per-event boundary.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("relay call timed out after {}ms", .0.as_millis())]
    RelayTimeout(Duration),

    #[error("relay returned {status}: {body}")]
    RelayStatus { status: u16, body: String },

    #[error("relay error: {0}")]
    Relay(String),

    #[error("messaging error: {0}")]
    Messaging(String),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
