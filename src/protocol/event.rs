//! Typed event payloads.
//!
//! Every envelope `type` the FileNest backend emits has a schema here, keyed
//! by [`ChannelEvent::NAME`]. The client-local lifecycle events share the
//! same trait so subscribers handle both kinds the same way.
//!
//! # Event Types
//!
//! | Name | Payload | Origin |
//! |------|---------|--------|
//! | `search_result` | [`SearchResult`] | remote |
//! | `peer_update` | [`Peer`] | remote |
//! | `upload_progress` | [`UploadProgress`] | remote |
//! | `network_stats` | [`NetworkStats`] | remote |
//! | `notification` | [`Notification`] | remote |
//! | `connected` | [`Connected`] | local |
//! | `disconnected` | [`Disconnected`] | local |
//! | `error` | [`ChannelError`] | local |
//! | `max_reconnect_attempts_reached` | [`MaxReconnectAttemptsReached`] | local |

// ============================================================================
// Imports
// ============================================================================

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

// ============================================================================
// Event Names
// ============================================================================

/// Event type names used on the wire and in the registry.
pub mod names {
    /// A search hit pushed by the backend.
    pub const SEARCH_RESULT: &str = "search_result";
    /// A peer joined, left, or changed status.
    pub const PEER_UPDATE: &str = "peer_update";
    /// Progress of an upload being processed.
    pub const UPLOAD_PROGRESS: &str = "upload_progress";
    /// Aggregate network statistics.
    pub const NETWORK_STATS: &str = "network_stats";
    /// User-facing notification.
    pub const NOTIFICATION: &str = "notification";

    /// Local: the connection opened.
    pub const CONNECTED: &str = "connected";
    /// Local: the connection closed or failed to open.
    pub const DISCONNECTED: &str = "disconnected";
    /// Local: non-fatal transport error.
    pub const ERROR: &str = "error";
    /// Local: automatic reconnection gave up.
    pub const MAX_RECONNECT_ATTEMPTS_REACHED: &str = "max_reconnect_attempts_reached";
}

// ============================================================================
// ChannelEvent
// ============================================================================

/// A payload schema bound to one event name.
pub trait ChannelEvent: Serialize + DeserializeOwned + Send + 'static {
    /// Event type name this payload travels under.
    const NAME: &'static str;

    /// Decodes the payload from an envelope's `data`.
    ///
    /// # Errors
    ///
    /// Returns a JSON error if `data` does not match the schema.
    fn decode(data: &Value) -> serde_json::Result<Self> {
        Self::deserialize(data)
    }
}

macro_rules! channel_event {
    ($ty:ty, $name:expr) => {
        impl ChannelEvent for $ty {
            const NAME: &'static str = $name;
        }
    };
}

// ============================================================================
// Remote Payloads
// ============================================================================

/// Metadata for a file indexed somewhere on the network.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    /// Network-wide file identifier.
    pub id: String,
    /// File name.
    pub name: String,
    /// Path on the owning peer.
    pub path: String,
    /// MIME type.
    pub content_type: String,
    /// Size in bytes.
    pub size: u64,
    /// Peer holding the file.
    pub peer_id: String,
    /// Content embedding vector.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f64>>,
    /// Creation time (ISO 8601).
    pub created_at: String,
    /// Last update time (ISO 8601).
    pub updated_at: String,
    /// User tags.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Free-text description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Thumbnail URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    /// Text preview.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

/// A search hit: file metadata plus scoring.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// Metadata of the matched file.
    #[serde(flatten)]
    pub file: FileMetadata,
    /// Cosine similarity to the query, 0-1.
    pub similarity: f64,
    /// Matching excerpt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    /// Fields that matched the query.
    #[serde(default)]
    pub matched_fields: Vec<String>,
    /// Ranking score.
    pub relevance_score: f64,
}

/// Connection status of a peer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeerStatus {
    Connected,
    #[default]
    Disconnected,
    Connecting,
}

/// A node of the search network.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Peer {
    /// Peer identifier.
    pub id: String,
    /// Host address.
    pub address: String,
    /// Listening port.
    pub port: u16,
    /// Current connection status.
    pub status: PeerStatus,
    /// Last contact time (ISO 8601).
    pub last_seen: String,
    /// Files shared by the peer.
    pub file_count: u64,
    /// Reputation score.
    pub reputation: f64,
    /// Round-trip latency in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency: Option<f64>,
    /// Measured bandwidth.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bandwidth: Option<f64>,
}

/// Pipeline stage of an upload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    #[default]
    Uploading,
    Processing,
    Indexing,
    Complete,
    Error,
}

/// Progress report for one uploaded file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadProgress {
    /// Identifier of the uploaded file.
    pub file_id: String,
    /// Name of the uploaded file.
    pub file_name: String,
    /// Percent complete, 0-100.
    pub progress: f64,
    /// Pipeline stage.
    pub status: UploadStatus,
    /// Failure message when `status` is `error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Seconds left, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time_remaining: Option<f64>,
}

impl UploadProgress {
    /// Returns `true` once the upload has completed or failed.
    #[inline]
    #[must_use]
    pub fn is_finished(&self) -> bool {
        matches!(self.status, UploadStatus::Complete | UploadStatus::Error)
    }
}

/// Aggregate network statistics.
///
/// Missing fields decode as zero; the backend often sends partial updates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NetworkStats {
    /// Peers known to the network.
    pub total_peers: u64,
    /// Peers currently online.
    pub active_peers: u64,
    /// Files indexed across the network.
    pub total_files: u64,
    /// Mean latency in milliseconds.
    pub network_latency: f64,
    /// Aggregate throughput.
    pub throughput: f64,
    /// Delivery success ratio, 0-1.
    pub reliability: f64,
    /// Backend uptime in seconds.
    pub uptime: f64,
}

/// Severity of a notification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

/// A user-facing notification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Notification identifier.
    pub id: String,
    /// Severity.
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    /// Short title.
    pub title: String,
    /// Body text.
    pub message: String,
    /// Creation time (ISO 8601).
    pub timestamp: String,
    /// Whether the user has seen it.
    #[serde(default)]
    pub read: bool,
}

channel_event!(SearchResult, names::SEARCH_RESULT);
channel_event!(Peer, names::PEER_UPDATE);
channel_event!(UploadProgress, names::UPLOAD_PROGRESS);
channel_event!(NetworkStats, names::NETWORK_STATS);
channel_event!(Notification, names::NOTIFICATION);

// ============================================================================
// Local Payloads
// ============================================================================

/// Payload of the local `connected` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connected {
    /// Always `true`.
    pub connected: bool,
    /// Identifier assigned by the peer, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Payload of the local `disconnected` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disconnected {
    /// Always `false`.
    pub connected: bool,
    /// Why the connection ended or failed to open.
    pub reason: String,
}

/// Payload of the local `error` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelError {
    /// Transport error description.
    pub message: String,
}

/// Payload of the local `max_reconnect_attempts_reached` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaxReconnectAttemptsReached {
    /// Configured attempt limit that was exhausted.
    pub attempts: u32,
}

channel_event!(Connected, names::CONNECTED);
channel_event!(Disconnected, names::DISCONNECTED);
channel_event!(ChannelError, names::ERROR);
channel_event!(MaxReconnectAttemptsReached, names::MAX_RECONNECT_ATTEMPTS_REACHED);

// ============================================================================
// InboundEvent
// ============================================================================

/// Parsed remote event for exhaustive matching.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    SearchResult(SearchResult),
    PeerUpdate(Peer),
    UploadProgress(UploadProgress),
    NetworkStats(NetworkStats),
    Notification(Notification),
    /// Any type without a schema.
    Unknown {
        /// Envelope type.
        event_type: String,
        /// Raw payload.
        data: Value,
    },
}

impl InboundEvent {
    /// Parses a type name and payload into a typed variant.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] when a known type has a malformed payload.
    pub fn from_parts(event_type: &str, data: &Value) -> Result<Self> {
        let event = match event_type {
            names::SEARCH_RESULT => Self::SearchResult(SearchResult::decode(data)?),
            names::PEER_UPDATE => Self::PeerUpdate(Peer::decode(data)?),
            names::UPLOAD_PROGRESS => Self::UploadProgress(UploadProgress::decode(data)?),
            names::NETWORK_STATS => Self::NetworkStats(NetworkStats::decode(data)?),
            names::NOTIFICATION => Self::Notification(Notification::decode(data)?),
            _ => Self::Unknown {
                event_type: event_type.to_string(),
                data: data.clone(),
            },
        };

        Ok(event)
    }

    /// Returns the event type name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::SearchResult(_) => names::SEARCH_RESULT,
            Self::PeerUpdate(_) => names::PEER_UPDATE,
            Self::UploadProgress(_) => names::UPLOAD_PROGRESS,
            Self::NetworkStats(_) => names::NETWORK_STATS,
            Self::Notification(_) => names::NOTIFICATION,
            Self::Unknown { event_type, .. } => event_type,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_peer_update_parsing() {
        let data = json!({
            "id": "peer-1",
            "address": "10.0.0.2",
            "port": 9000,
            "status": "connecting",
            "lastSeen": "2024-01-01T00:00:00Z",
            "fileCount": 12,
            "reputation": 0.8,
            "latency": 35.0
        });

        match InboundEvent::from_parts("peer_update", &data).expect("parse") {
            InboundEvent::PeerUpdate(peer) => {
                assert_eq!(peer.id, "peer-1");
                assert_eq!(peer.port, 9000);
                assert_eq!(peer.status, PeerStatus::Connecting);
                assert_eq!(peer.latency, Some(35.0));
                assert_eq!(peer.bandwidth, None);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_search_result_flattens_metadata() {
        let data = json!({
            "id": "file-9",
            "name": "thesis.pdf",
            "path": "/docs/thesis.pdf",
            "contentType": "application/pdf",
            "size": 2048,
            "peerId": "peer-3",
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-02T00:00:00Z",
            "similarity": 0.91,
            "matchedFields": ["name"],
            "relevanceScore": 0.87
        });

        let result = SearchResult::decode(&data).expect("decode");
        assert_eq!(result.file.name, "thesis.pdf");
        assert_eq!(result.file.size, 2048);
        assert_eq!(result.matched_fields, vec!["name".to_string()]);
        assert!(result.snippet.is_none());
    }

    #[test]
    fn test_upload_progress_status() {
        let data = json!({
            "fileId": "f1",
            "fileName": "a.txt",
            "progress": 100.0,
            "status": "complete"
        });

        let progress = UploadProgress::decode(&data).expect("decode");
        assert!(progress.is_finished());
        assert_eq!(progress.status, UploadStatus::Complete);
    }

    #[test]
    fn test_notification_kind_uses_type_key() {
        let data = json!({
            "id": "n1",
            "type": "warning",
            "title": "Low disk",
            "message": "Only 1 GB left",
            "timestamp": "2024-01-01T00:00:00Z"
        });

        let notification = Notification::decode(&data).expect("decode");
        assert_eq!(notification.kind, NotificationKind::Warning);
        assert!(!notification.read);
    }

    #[test]
    fn test_partial_network_stats() {
        let stats = NetworkStats::decode(&json!({ "totalPeers": 5 })).expect("decode");
        assert_eq!(stats.total_peers, 5);
        assert_eq!(stats.active_peers, 0);
    }

    #[test]
    fn test_unknown_event() {
        let data = json!({ "foo": "bar" });
        let event = InboundEvent::from_parts("custom_event", &data).expect("parse");

        assert_eq!(event.name(), "custom_event");
        assert!(matches!(event, InboundEvent::Unknown { .. }));
    }

    #[test]
    fn test_malformed_known_payload_is_error() {
        let result = InboundEvent::from_parts("peer_update", &json!({ "id": 5 }));
        assert!(result.is_err());
    }

    #[test]
    fn test_local_event_shapes() {
        let value = serde_json::to_value(Disconnected {
            connected: false,
            reason: "transport close".into(),
        })
        .expect("serialize");
        assert_eq!(value, json!({ "connected": false, "reason": "transport close" }));

        let value = serde_json::to_value(Connected {
            connected: true,
            id: None,
        })
        .expect("serialize");
        assert_eq!(value, json!({ "connected": true }));
    }
}
