//! Sink error types

use thiserror::Error;

/// Errors that can occur while writing to a strip
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("I/O error on {device}: {source}")]
    Io {
        device: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Pixel index {index} out of range (strip has {len} pixels)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Invalid sink configuration: {0}")]
    InvalidConfig(String),

    /// Failure injected by a test sink
    #[error("Injected failure: {0}")]
    Injected(String),
}

impl SinkError {
    pub(crate) fn io(device: &str, source: std::io::Error) -> Self {
        SinkError::Io {
            device: device.to_string(),
            source,
        }
    }
}
