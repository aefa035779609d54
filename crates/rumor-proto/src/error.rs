//! Error types for rumor-proto.

use thiserror::Error;

/// Errors that can occur while encoding or decoding envelopes.
#[derive(Debug, Error)]
pub enum ProtoError {
    /// The envelope could not be parsed or serialized.
    #[error("malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),
}
