//! FileNest event channel - reconnecting real-time client.
//!
//! This library keeps one persistent WebSocket connection to the FileNest
//! search backend and delivers its push events to local subscribers.
//!
//! # Architecture
//!
//! ```text
//! FileNest backend → Transport → ChannelClient → EventRegistry → callbacks
//! ```
//!
//! Key design principles:
//!
//! - Each [`ChannelClient`] owns at most one live link; clones share it
//! - Every message is an [`Envelope`] `{type, data}`; payloads are typed
//!   per event name through [`ChannelEvent`]
//! - Drops reconnect with exponential backoff (1s, 2s, 4s, 8s, 16s by default)
//! - Sends while disconnected are dropped, never queued
//!
//! # Quick Start
//!
//! ```no_run
//! use filenest_channel::{ChannelClient, Disconnected, NetworkStats, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = ChannelClient::builder()
//!         .url("ws://localhost:8000/ws")
//!         .build()?;
//!
//!     client.subscribe::<NetworkStats, _>(|stats| {
//!         println!("{} of {} peers active", stats.active_peers, stats.total_peers);
//!     });
//!     client.subscribe::<Disconnected, _>(|event| {
//!         eprintln!("connection lost: {}", event.reason);
//!     });
//!
//!     client.connect().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`ChannelClient`], builder, reconnect policy |
//! | [`registry`] | Subscriber registry and fan-out |
//! | [`protocol`] | Envelope and typed payloads |
//! | [`transport`] | Transport trait and WebSocket transport |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`similarity`] | Cosine similarity |
//! | [`pacing`] | Throttle and debounce |

// ============================================================================
// Modules
// ============================================================================

/// Event channel client.
///
/// - [`ChannelClient`] - Connection owner and subscription API
/// - [`ChannelClientBuilder`] - Configuration
/// - [`ReconnectPolicy`] - Backoff settings
pub mod client;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// Call pacing helpers.
pub mod pacing;

/// Wire protocol message types.
pub mod protocol;

/// Subscriber registry.
pub mod registry;

/// Vector similarity.
pub mod similarity;

/// Transport layer.
///
/// Implement [`transport::Transport`] to run the client over something
/// other than WebSocket.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{ChannelClient, ChannelClientBuilder, ConnectionInfo, ReconnectPolicy};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{MessageId, SubscriptionId};

// Protocol types
pub use protocol::{
    ChannelError, ChannelEvent, Connected, Disconnected, Envelope, FileMetadata, InboundEvent,
    MaxReconnectAttemptsReached, NetworkStats, Notification, NotificationKind, Peer, PeerStatus,
    SearchResult, UploadProgress, UploadStatus,
};

// Registry
pub use registry::EventRegistry;

// Utilities
pub use pacing::{Debouncer, Throttle};
pub use similarity::cosine_similarity;
