//! Wire protocol message types.
//!
//! Every message crossing the transport is an [`Envelope`]:
//! `{type, data, timestamp?, id?}`. The `type` string selects the payload
//! schema; [`ChannelEvent`] ties each schema to its name.
//!
//! # Protocol Overview
//!
//! | Message | Direction | Purpose |
//! |---------|-----------|---------|
//! | `search_result` | Remote → Local | Search hit |
//! | `peer_update` | Remote → Local | Peer status change |
//! | `upload_progress` | Remote → Local | Upload pipeline progress |
//! | `network_stats` | Remote → Local | Aggregate network stats |
//! | `notification` | Remote → Local | User notification |
//! | any | Local → Remote | Application request |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `envelope` | Envelope type and JSON codec |
//! | `event` | Typed payloads and event names |

// ============================================================================
// Submodules
// ============================================================================

/// Envelope type and JSON codec.
pub mod envelope;

/// Typed event payloads.
pub mod event;

// ============================================================================
// Re-exports
// ============================================================================

pub use envelope::Envelope;
pub use event::{
    ChannelError, ChannelEvent, Connected, Disconnected, FileMetadata, InboundEvent,
    MaxReconnectAttemptsReached, NetworkStats, Notification, NotificationKind, Peer, PeerStatus,
    SearchResult, UploadProgress, UploadStatus, names,
};
