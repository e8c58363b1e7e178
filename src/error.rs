//! Error types for the recording pipeline.

use thiserror::Error;

pub type RecorderResult<T> = Result<T, RecorderError>;

#[derive(Debug, Error)]
pub enum RecorderError {
    /// A capture device (display or audio input) could not be opened.
    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The output container could not be created or initialized.
    #[error("cannot open container: {0}")]
    ContainerOpen(String),

    /// A single grab or read failed; the loops treat this as skippable.
    #[error("capture failed: {0}")]
    Capture(String),

    /// An encoder or the muxer rejected a frame, block or packet.
    #[error("encoding failed: {0}")]
    Encoding(String),

    /// An operation was called in a state that does not allow it.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    /// A teardown step failed; the remaining steps were still attempted.
    #[error("teardown failed: {0}")]
    Teardown(String),

    /// The session configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
