//! Envelope wrapping every message that crosses the transport.
//!
//! # Format
//!
//! ```json
//! {
//!   "type": "network_stats",
//!   "data": { "totalPeers": 5 },
//!   "timestamp": "2024-01-01T00:00:00Z",
//!   "id": "550e8400-e29b-41d4-a716-446655440000"
//! }
//! ```
//!
//! `timestamp` and `id` are optional on the wire. Outbound envelopes carry a
//! fresh [`MessageId`] and no timestamp.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::MessageId;

use super::event::{ChannelEvent, InboundEvent};

// ============================================================================
// Envelope
// ============================================================================

/// A `{type, data}` message as sent over the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Event name, e.g. `search_result`.
    #[serde(rename = "type")]
    pub event_type: String,

    /// Event payload. Missing `data` decodes as `null`.
    #[serde(default)]
    pub data: Value,

    /// Server-side timestamp, if provided.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    /// Message identifier, if provided.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Envelope {
    /// Creates an envelope with no timestamp or ID.
    #[inline]
    #[must_use]
    pub fn new(event_type: impl Into<String>, data: Value) -> Self {
        Self {
            event_type: event_type.into(),
            data,
            timestamp: None,
            id: None,
        }
    }

    /// Creates an outbound envelope stamped with a fresh message ID.
    #[must_use]
    pub fn outbound(event_type: impl Into<String>, data: Value) -> Self {
        Self {
            id: Some(MessageId::generate().to_string()),
            ..Self::new(event_type, data)
        }
    }

    /// Creates an outbound envelope from a typed event.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the payload cannot be serialized.
    pub fn from_event<E: ChannelEvent>(event: &E) -> Result<Self> {
        Ok(Self::outbound(E::NAME, serde_json::to_value(event)?))
    }

    /// Parses an envelope from a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the frame is not a valid envelope.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serializes the envelope to a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decodes `data` as the payload of `E`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the envelope type is not `E::NAME`,
    /// or [`Error::Json`] if the payload does not match the schema.
    pub fn decode<E: ChannelEvent>(&self) -> Result<E> {
        if self.event_type != E::NAME {
            return Err(Error::protocol(format!(
                "expected '{}' envelope, got '{}'",
                E::NAME,
                self.event_type
            )));
        }

        Ok(E::decode(&self.data)?)
    }

    /// Parses the envelope into a typed variant.
    ///
    /// Unrecognized types become [`InboundEvent::Unknown`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if a known type carries a malformed payload.
    pub fn parse(&self) -> Result<InboundEvent> {
        InboundEvent::from_parts(&self.event_type, &self.data)
    }
}

// ============================================================================
// Tests
// ============================================================================
