//! Transport layer.
//!
//! The channel client never touches sockets directly. It asks a
//! [`Transport`] to open a [`Link`] and then talks to the link through two
//! channels, one per direction.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  ChannelClient  │  outbound: OutboundFrame     │  Link pump task │         WebSocket
//! │                 │─────────────────────────────►│                 │◄────────────────────► FileNest
//! │  link task      │◄─────────────────────────────│  (per link)     │                       backend
//! │                 │  inbound: InboundFrame       │                 │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Link Lifecycle
//!
//! 1. `Transport::open` - Connect and spawn the pump task
//! 2. `InboundFrame::Text` - Frames arrive in per-connection order
//! 3. `InboundFrame::Closed` - Remote side or network ended the link
//! 4. `OutboundFrame::Close` - Client ended the link; no `Closed` follows
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `websocket` | tokio-tungstenite transport |

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Result;

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket transport.
pub mod websocket;

#[cfg(test)]
pub(crate) mod mock;

// ============================================================================
// Re-exports
// ============================================================================

pub use websocket::WebSocketTransport;

// ============================================================================
// Frames
// ============================================================================

/// Frame delivered from the transport to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    /// A text message.
    Text(String),
    /// A non-fatal transport error.
    Error(String),
    /// The link ended; carries the reason. Always the last frame.
    Closed(String),
}

/// Frame sent from the client to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    /// A text message.
    Text(String),
    /// Close the link.
    Close,
}

// ============================================================================
// Link
// ============================================================================

/// An open connection, as seen by the client.
#[derive(Debug)]
pub struct Link {
    /// Identifier assigned by the remote peer, if it sent one.
    pub identifier: Option<String>,
    /// Frames to write.
    pub outbound: mpsc::UnboundedSender<OutboundFrame>,
    /// Frames read.
    pub inbound: mpsc::UnboundedReceiver<InboundFrame>,
}

// ============================================================================
// Transport
// ============================================================================

/// Opens links to a remote event source.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Opens a new link.
    ///
    /// # Errors
    ///
    /// Returns a connection error if the peer cannot be reached.
    async fn open(&self) -> Result<Link>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn open(&self) -> Result<Link> {
        (**self).open().await
    }
}
