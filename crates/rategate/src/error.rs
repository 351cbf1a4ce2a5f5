//! Gateway error types

use thiserror::Error;

/// Per-request failures of the admission middleware.
///
/// Neither variant converts into a response on its own. An address failure
/// is answered with an empty `500`; an encoding failure keeps the status that
/// was already chosen (see [`crate::message::encoding_failure`]).
#[derive(Debug, Error)]
pub enum AdmissionError {
    /// The source address could not be split into host and port.
    #[error("invalid source address '{addr}': {reason}")]
    AddressParse { addr: String, reason: &'static str },

    /// The response payload could not be serialized.
    #[error("failed to encode response payload: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Failures that stop the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind listener on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server terminated: {0}")]
    Serve(#[source] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

pub type AdmissionResult<T> = Result<T, AdmissionError>;
