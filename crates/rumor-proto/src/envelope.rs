//! Message envelopes and bodies.

use serde::{Deserialize, Serialize};

use crate::error::ProtoError;
use crate::payload::Payload;
use crate::types::NodeId;

/// A full protocol envelope as it appears on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Sender id.
    pub src: NodeId,
    /// Recipient id.
    pub dest: NodeId,
    /// The message body.
    pub body: Body,
}

impl Message {
    /// Creates a new envelope.
    #[must_use]
    pub fn new(src: NodeId, dest: NodeId, body: Body) -> Self {
        Self { src, dest, body }
    }

    /// Parses an envelope from a single line of JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ProtoError::Malformed`] if the line is not a valid envelope.
    pub fn from_json(line: &str) -> Result<Self, ProtoError> {
        Ok(serde_json::from_str(line)?)
    }

    /// Serializes the envelope to a single line of JSON (no trailing newline).
    ///
    /// # Errors
    ///
    /// Returns [`ProtoError::Malformed`] if serialization fails.
    pub fn to_json(&self) -> Result<String, ProtoError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// A message body: correlation ids plus the typed payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Body {
    /// Unique id of this message within its sender, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg_id: Option<u64>,
    /// The `msg_id` of the request this body replies to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<u64>,
    /// The typed payload.
    #[serde(flatten)]
    pub payload: Payload,
}

impl Body {
    /// Creates a body with no correlation ids.
    #[must_use]
    pub fn new(payload: Payload) -> Self {
        Self {
            msg_id: None,
            in_reply_to: None,
            payload,
        }
    }

    /// Creates a reply body correlated to a request's `msg_id`.
    #[must_use]
    pub fn reply(in_reply_to: Option<u64>, payload: Payload) -> Self {
        Self {
            msg_id: None,
            in_reply_to,
            payload,
        }
    }

    /// Sets the message id.
    #[must_use]
    pub const fn with_msg_id(mut self, msg_id: u64) -> Self {
        self.msg_id = Some(msg_id);
        self
    }
}
