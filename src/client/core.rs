//! Core channel client implementation.
//!
//! [`ChannelClient`] owns at most one live link, fans inbound envelopes out
//! to its [`EventRegistry`], and reconnects with exponential backoff when
//! the link drops.
//!
//! # Lifecycle
//!
//! ```text
//!            connect()                    link drop / open failure
//! Disconnected ─────────► Connected ──────────────────────────────► Backoff
//!      ▲                      │                                       │
//!      │    disconnect()      │            timer fires, open()        │
//!      └──────────────────────┘◄──────────────────────────────────────┘
//!                                   attempts exhausted → Disconnected
//! ```
//!
//! Every `connect()` and `disconnect()` bumps a generation counter. Link
//! tasks and reconnect timers carry the generation they were started under
//! and stand down once it is stale, so an explicit `disconnect()` is never
//! followed by a surprise reconnect.
//!
//! Opens are serialized: overlapping `connect()` calls and scheduled
//! reconnects queue on one gate, and a caller that gets through after a
//! link is already live returns without opening another.

// ============================================================================
// Imports
// ============================================================================

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{Mutex as AsyncMutex, mpsc};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::SubscriptionId;
use crate::protocol::{
    ChannelError, ChannelEvent, Connected, Disconnected, Envelope, MaxReconnectAttemptsReached,
};
use crate::registry::EventRegistry;
use crate::transport::{InboundFrame, Link, OutboundFrame, Transport};

use super::builder::ChannelClientBuilder;
use super::options::ReconnectPolicy;

// ============================================================================
// Constants
// ============================================================================

/// Reason reported when the caller disconnects.
pub const REASON_CLIENT_DISCONNECT: &str = "client disconnect";

/// Reason reported when a link ends without saying why.
const REASON_LINK_ENDED: &str = "transport close";

// ============================================================================
// ConnectionInfo
// ============================================================================

/// Snapshot of the connection state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionInfo {
    /// Whether a link is live.
    pub connected: bool,
    /// Identifier the peer assigned to the live link.
    pub id: Option<String>,
}

// ============================================================================
// ConnectionState
// ============================================================================

/// Mutable state guarded by one lock.
///
/// Never held across an `.await` or while callbacks run.
#[derive(Default)]
struct ConnectionState {
    /// Writer for the live link.
    link: Option<mpsc::UnboundedSender<OutboundFrame>>,
    /// Peer-assigned identifier of the live link.
    identifier: Option<String>,
    /// Reconnect attempts since the last successful connect.
    attempt: u32,
    /// Bumped on every `connect()` and `disconnect()`.
    generation: u64,
    /// Pending reconnect timer.
    reconnect: Option<JoinHandle<()>>,
}

// ============================================================================
// Inner
// ============================================================================

struct Inner {
    transport: Arc<dyn Transport>,
    policy: ReconnectPolicy,
    registry: EventRegistry,
    state: Mutex<ConnectionState>,
    /// Held for the whole of one open attempt.
    connecting: AsyncMutex<()>,
}

// ============================================================================
// ChannelClient
// ============================================================================

/// Reconnecting event channel client.
///
/// Cheap to clone; clones share the connection and the registry. Construct
/// one per backend and hand clones to whatever needs it.
///
/// # Example
///
/// ```no_run
/// use filenest_channel::{ChannelClient, NetworkStats, Result};
///
/// # async fn example() -> Result<()> {
/// let client = ChannelClient::builder()
///     .url("ws://localhost:8000/ws")
///     .build()?;
///
/// client.subscribe::<NetworkStats, _>(|stats| {
///     println!("{} peers online", stats.active_peers);
/// });
///
/// client.connect().await?;
/// client.send("search", serde_json::json!({ "query": "thesis" }));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ChannelClient {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ChannelClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("ChannelClient")
            .field("connected", &state.link.is_some())
            .field("id", &state.identifier)
            .field("attempt", &state.attempt)
            .field("policy", &self.inner.policy)
            .field("registry", &self.inner.registry)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// ChannelClient - Construction
// ============================================================================

impl ChannelClient {
    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> ChannelClientBuilder {
        ChannelClientBuilder::new()
    }

    /// Creates a client over an explicit transport.
    ///
    /// The client starts disconnected; call [`connect`](Self::connect).
    #[must_use]
    pub fn new(transport: impl Transport, policy: ReconnectPolicy) -> Self {
        Self::from_shared(Arc::new(transport), policy)
    }

    /// Creates a client over an already shared transport.
    pub(crate) fn from_shared(transport: Arc<dyn Transport>, policy: ReconnectPolicy) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                policy,
                registry: EventRegistry::new(),
                state: Mutex::new(ConnectionState::default()),
                connecting: AsyncMutex::new(()),
            }),
        }
    }
}

// ============================================================================
// ChannelClient - Connection
// ============================================================================

impl ChannelClient {
    /// Opens the connection.
    ///
    /// Does nothing if already connected. Otherwise resets the backoff
    /// counter, cancels any pending reconnect, and opens the transport.
    ///
    /// A call that overlaps an open already in flight waits for it. If that
    /// open succeeded the call returns `Ok(())` on the same link; if it
    /// failed the call makes its own attempt.
    ///
    /// On failure a `disconnected` event fires, a reconnect is scheduled,
    /// and the error is returned.
    ///
    /// # Errors
    ///
    /// - [`Error::WebSocket`], [`Error::Connection`] or [`Error::ConnectionTimeout`]
    ///   if the open fails
    /// - [`Error::ConnectionClosed`] if `disconnect()` was called before the
    ///   open finished
    pub async fn connect(&self) -> Result<()> {
        let _connecting = self.inner.connecting.lock().await;

        let generation = {
            let mut state = self.inner.state.lock();
            if state.link.is_some() {
                debug!("Already connected");
                return Ok(());
            }

            if let Some(handle) = state.reconnect.take() {
                handle.abort();
            }
            state.attempt = 0;
            state.generation += 1;
            state.generation
        };

        Inner::establish(&self.inner, generation).await
    }

    /// Closes the connection.
    ///
    /// Cancels any pending reconnect. Fires `disconnected` with reason
    /// [`REASON_CLIENT_DISCONNECT`] if a link was live. No reconnect follows.
    pub fn disconnect(&self) {
        let link = {
            let mut state = self.inner.state.lock();
            state.generation += 1;
            if let Some(handle) = state.reconnect.take() {
                handle.abort();
                debug!("Pending reconnect cancelled");
            }
            state.identifier = None;
            state.link.take()
        };

        if let Some(link) = link {
            let _ = link.send(OutboundFrame::Close);
            info!("Channel disconnected by client");
            self.inner.registry.emit_event(&Disconnected {
                connected: false,
                reason: REASON_CLIENT_DISCONNECT.to_owned(),
            });
        }
    }

    /// Returns `true` while a link is live.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.state.lock().link.is_some()
    }

    /// Returns the connection state and peer identifier.
    #[must_use]
    pub fn connection_info(&self) -> ConnectionInfo {
        let state = self.inner.state.lock();
        ConnectionInfo {
            connected: state.link.is_some(),
            id: state.identifier.clone(),
        }
    }

    /// Returns reconnect attempts made since the last successful connect.
    #[inline]
    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.inner.state.lock().attempt
    }

    /// Returns the reconnect policy.
    #[inline]
    #[must_use]
    pub fn policy(&self) -> ReconnectPolicy {
        self.inner.policy
    }
}

// ============================================================================
// ChannelClient - Messaging
// ============================================================================

impl ChannelClient {
    /// Sends `{type, data}` to the peer.
    ///
    /// Returns `false` and logs a warning if not connected. Nothing is
    /// queued; delivery is best-effort.
    pub fn send(&self, event_type: &str, payload: Value) -> bool {
        self.send_envelope(&Envelope::outbound(event_type, payload))
    }

    /// Sends a typed event under `E::NAME`.
    pub fn send_event<E: ChannelEvent>(&self, event: &E) -> bool {
        match Envelope::from_event(event) {
            Ok(envelope) => self.send_envelope(&envelope),
            Err(e) => {
                warn!(event_type = E::NAME, error = %e, "Failed to encode message");
                false
            }
        }
    }

    fn send_envelope(&self, envelope: &Envelope) -> bool {
        let json = match envelope.to_json() {
            Ok(json) => json,
            Err(e) => {
                warn!(event_type = %envelope.event_type, error = %e, "Failed to encode message");
                return false;
            }
        };

        let state = self.inner.state.lock();
        let Some(link) = state.link.as_ref() else {
            warn!(
                event_type = %envelope.event_type,
                "Channel not connected. Message not sent"
            );
            return false;
        };

        if link.send(OutboundFrame::Text(json)).is_err() {
            warn!(event_type = %envelope.event_type, "Link closed. Message not sent");
            return false;
        }

        trace!(event_type = %envelope.event_type, "Message sent");
        true
    }
}

// ============================================================================
// ChannelClient - Subscriptions
// ============================================================================

impl ChannelClient {
    /// Subscribes to raw payloads of `event_type`.
    pub fn on<F>(&self, event_type: impl Into<String>, callback: F) -> SubscriptionId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.inner.registry.on(event_type, callback)
    }

    /// Subscribes to decoded payloads of `E`.
    pub fn subscribe<E, F>(&self, callback: F) -> SubscriptionId
    where
        E: ChannelEvent,
        F: Fn(E) + Send + Sync + 'static,
    {
        self.inner.registry.subscribe::<E, F>(callback)
    }

    /// Unsubscribes one subscription, or all of `event_type` when `None`.
    ///
    /// Returns how many subscriptions were removed.
    pub fn off(&self, event_type: &str, subscription: Option<SubscriptionId>) -> usize {
        self.inner.registry.off(event_type, subscription)
    }

    /// Returns the subscriber registry.
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &EventRegistry {
        &self.inner.registry
    }
}

// ============================================================================
// Inner - Connection Management
// ============================================================================

impl Inner {
    /// Returns `true` if `generation` is still current.
    fn is_current(&self, generation: u64) -> bool {
        self.state.lock().generation == generation
    }

    /// Opens the transport and installs the link.
    async fn establish(inner: &Arc<Self>, generation: u64) -> Result<()> {
        match inner.transport.open().await {
            Ok(link) => Self::install(inner, generation, link),
            Err(e) => {
                if !inner.is_current(generation) {
                    return Err(e);
                }

                warn!(error = %e, "Connection failed");
                inner.registry.emit_event(&Disconnected {
                    connected: false,
                    reason: e.to_string(),
                });
                Self::schedule_reconnect(inner, generation);
                Err(e)
            }
        }
    }

    /// Stores a freshly opened link and starts its reader task.
    fn install(inner: &Arc<Self>, generation: u64, link: Link) -> Result<()> {
        let Link {
            identifier,
            outbound,
            inbound,
        } = link;

        {
            let mut state = inner.state.lock();
            if state.generation != generation || state.link.is_some() {
                debug!("Connection attempt superseded");
                let _ = outbound.send(OutboundFrame::Close);
                return Err(Error::ConnectionClosed);
            }

            state.link = Some(outbound);
            state.identifier.clone_from(&identifier);
            state.attempt = 0;
        }

        info!(id = ?identifier, "Channel connected");

        inner.registry.emit_event(&Connected {
            connected: true,
            id: identifier,
        });

        tokio::spawn(Self::run_link(Arc::downgrade(inner), generation, inbound));

        Ok(())
    }

    /// Reads frames from one link until it ends or goes stale.
    ///
    /// Staleness is checked once per frame, before dispatch. Frames still
    /// queued when `disconnect()` returns are dropped. A frame already past
    /// the check on another worker thread may still reach subscribers while
    /// `disconnect()` runs, since callbacks never run under the state lock.
    async fn run_link(
        weak: Weak<Self>,
        generation: u64,
        mut inbound: mpsc::UnboundedReceiver<InboundFrame>,
    ) {
        while let Some(frame) = inbound.recv().await {
            let Some(inner) = weak.upgrade() else {
                return;
            };

            if !inner.is_current(generation) {
                debug!("Link reader stale, stopping");
                return;
            }

            match frame {
                InboundFrame::Text(text) => inner.dispatch(&text),

                InboundFrame::Error(message) => {
                    warn!(%message, "Transport error");
                    inner.registry.emit_event(&ChannelError { message });
                }

                InboundFrame::Closed(reason) => {
                    Self::handle_drop(&inner, generation, reason);
                    return;
                }
            }
        }

        if let Some(inner) = weak.upgrade() {
            Self::handle_drop(&inner, generation, REASON_LINK_ENDED.to_owned());
        }
    }

    /// Fans one text frame out to subscribers.
    fn dispatch(&self, text: &str) {
        match Envelope::from_json(text) {
            Ok(envelope) => {
                let delivered = self.registry.emit(&envelope.event_type, &envelope.data);
                trace!(event_type = %envelope.event_type, delivered, "Envelope dispatched");
            }
            Err(e) => warn!(error = %e, "Dropping malformed frame"),
        }
    }

    /// Handles a link that ended without `disconnect()`.
    fn handle_drop(inner: &Arc<Self>, generation: u64, reason: String) {
        {
            let mut state = inner.state.lock();
            if state.generation != generation || state.link.is_none() {
                return;
            }
            state.link = None;
            state.identifier = None;
        }

        info!(%reason, "Channel disconnected");
        inner.registry.emit_event(&Disconnected {
            connected: false,
            reason,
        });

        Self::schedule_reconnect(inner, generation);
    }

    /// Counts an attempt and either arms the backoff timer or gives up.
    fn schedule_reconnect(inner: &Arc<Self>, generation: u64) {
        {
            let mut state = inner.state.lock();
            if state.generation != generation || state.link.is_some() {
                return;
            }

            state.attempt = state.attempt.saturating_add(1);
            let attempt = state.attempt;

            if let Some(delay) = inner.policy.delay_for(attempt) {
                info!(
                    attempt,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "Attempting to reconnect"
                );

                let weak = Arc::downgrade(inner);
                state.reconnect = Some(tokio::spawn(async move {
                    sleep(delay).await;
                    if let Some(inner) = weak.upgrade() {
                        Self::reconnect(&inner, generation).await;
                    }
                }));
                return;
            }
        }

        error!(
            max_attempts = inner.policy.max_attempts,
            "Max reconnection attempts reached"
        );
        inner.registry.emit_event(&MaxReconnectAttemptsReached {
            attempts: inner.policy.max_attempts,
        });
    }

    /// Runs one scheduled reconnect attempt.
    async fn reconnect(inner: &Arc<Self>, generation: u64) {
        let _connecting = inner.connecting.lock().await;

        {
            let state = inner.state.lock();
            if state.generation != generation || state.link.is_some() {
                return;
            }
            debug!(attempt = state.attempt, "Reconnecting");
        }

        // Failures are reported through events and rescheduled by establish.
        let _ = Self::establish(inner, generation).await;
    }
}

// ============================================================================
// Tests
// ============================================================================
