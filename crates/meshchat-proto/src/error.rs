//! Error types for the wire protocol.

use thiserror::Error;

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Failures while encoding, decoding or framing envelopes.
///
/// None of these are domain errors: a peer that receives one logs it and
/// drops the offending frame.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("failed to encode envelope: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("failed to decode envelope: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    /// The envelope named a known service but its `data` did not fit it.
    #[error("malformed {service} envelope: {reason}")]
    Malformed { service: String, reason: String },

    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProtocolError {
    /// Static label for metrics and log fields.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Encode(_) => "encode",
            Self::Decode(_) => "decode",
            Self::Malformed { .. } => "malformed",
            Self::Io(_) => "io",
        }
    }
}
