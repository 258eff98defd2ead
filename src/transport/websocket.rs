//! WebSocket transport for the FileNest backend.
//!
//! Connects with tokio-tungstenite and spawns one pump task per link that
//! shuttles frames between the socket and the link channels.
//!
//! # Pump Loop
//!
//! - Socket text → `InboundFrame::Text`
//! - Socket error → `InboundFrame::Error`, then `InboundFrame::Closed`
//! - Socket close / end of stream → `InboundFrame::Closed`
//! - `OutboundFrame::Text` → socket text
//! - `OutboundFrame::Close` or dropped sender → close handshake, exit

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::client::Response;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::error::{Error, Result};

use super::{InboundFrame, Link, OutboundFrame, Transport};

// ============================================================================
// Constants
// ============================================================================

/// Default timeout for the WebSocket handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(20);

/// Response header carrying the peer-assigned connection identifier.
pub const CONNECTION_ID_HEADER: &str = "x-connection-id";

/// Close reason when the remote ends the link without one.
const REASON_TRANSPORT_CLOSE: &str = "transport close";

/// Close reason after a socket error.
const REASON_TRANSPORT_ERROR: &str = "transport error";

// ============================================================================
// Types
// ============================================================================

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ============================================================================
// WebSocketTransport
// ============================================================================

/// Opens WebSocket links to a fixed endpoint.
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    /// Endpoint URL (`ws://` or `wss://`).
    url: Url,
    /// Handshake timeout.
    connect_timeout: Duration,
}

impl WebSocketTransport {
    /// Creates a transport for `url` with the default handshake timeout.
    #[inline]
    #[must_use]
    pub fn new(url: Url) -> Self {
        Self {
            url,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Sets the handshake timeout.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Returns the endpoint URL.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Returns the handshake timeout.
    #[inline]
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Reads the peer-assigned identifier from the handshake response.
    fn identifier(response: &Response) -> Option<String> {
        response
            .headers()
            .get(CONNECTION_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(str::to_owned)
    }

    /// Pumps frames between the socket and the link channels.
    async fn run_pump(
        socket: Socket,
        mut outbound_rx: mpsc::UnboundedReceiver<OutboundFrame>,
        inbound_tx: mpsc::UnboundedSender<InboundFrame>,
    ) {
        let (mut ws_write, mut ws_read) = socket.split();

        let reason = loop {
            tokio::select! {
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            if inbound_tx.send(InboundFrame::Text(text.as_str().to_owned())).is_err() {
                                debug!("Link receiver dropped");
                                let _ = ws_write.close().await;
                                return;
                            }
                        }

                        Some(Ok(Message::Close(frame))) => {
                            let reason = frame
                                .map(|f| f.reason.as_str().to_owned())
                                .filter(|r| !r.is_empty())
                                .unwrap_or_else(|| REASON_TRANSPORT_CLOSE.to_owned());
                            debug!(%reason, "WebSocket closed by remote");
                            break reason;
                        }

                        Some(Err(e)) => {
                            warn!(error = %e, "WebSocket error");
                            let _ = inbound_tx.send(InboundFrame::Error(e.to_string()));
                            break REASON_TRANSPORT_ERROR.to_owned();
                        }

                        None => {
                            debug!("WebSocket stream ended");
                            break REASON_TRANSPORT_CLOSE.to_owned();
                        }

                        // Ignore Binary, Ping, Pong
                        _ => {}
                    }
                }

                frame = outbound_rx.recv() => {
                    match frame {
                        Some(OutboundFrame::Text(json)) => {
                            if let Err(e) = ws_write.send(Message::Text(json.into())).await {
                                warn!(error = %e, "Failed to write frame");
                                let _ = inbound_tx.send(InboundFrame::Error(e.to_string()));
                            } else {
                                trace!("Frame written");
                            }
                        }

                        Some(OutboundFrame::Close) | None => {
                            debug!("Client closed link");
                            let _ = ws_write.close().await;
                            return;
                        }
                    }
                }
            }
        };

        let _ = inbound_tx.send(InboundFrame::Closed(reason));
        debug!("Pump terminated");
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn open(&self) -> Result<Link> {
        let timeout_ms = u64::try_from(self.connect_timeout.as_millis()).unwrap_or(u64::MAX);

        let (socket, response) = timeout(self.connect_timeout, connect_async(self.url.as_str()))
            .await
            .map_err(|_| Error::connection_timeout(timeout_ms))??;

        let identifier = Self::identifier(&response);
        info!(url = %self.url, id = ?identifier, "WebSocket connection established");

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        tokio::spawn(Self::run_pump(socket, outbound_rx, inbound_tx));

        Ok(Link {
            identifier,
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    /// Binds a one-shot echo server and returns its `ws://` URL.
    async fn echo_server() -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = accept_async(stream).await.expect("upgrade");
            while let Some(Ok(message)) = ws.next().await {
                if message.is_text() && ws.send(message).await.is_err() {
                    break;
                }
            }
        });

        Url::parse(&format!("ws://127.0.0.1:{port}")).expect("url")
    }

    #[test]
    fn test_defaults() {
        let url = Url::parse("ws://localhost:8000/ws").expect("url");
        let transport = WebSocketTransport::new(url.clone());
        assert_eq!(transport.url(), &url);
        assert_eq!(transport.connect_timeout(), DEFAULT_CONNECT_TIMEOUT);

        let transport = transport.with_connect_timeout(Duration::from_secs(1));
        assert_eq!(transport.connect_timeout(), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_open_and_echo() {
        let transport = WebSocketTransport::new(echo_server().await);
        let mut link = transport.open().await.expect("open");
        assert!(link.identifier.is_none());

        link.outbound
            .send(OutboundFrame::Text(r#"{"type":"ping"}"#.into()))
            .expect("send");

        let frame = link.inbound.recv().await.expect("frame");
        assert_eq!(frame, InboundFrame::Text(r#"{"type":"ping"}"#.into()));

        link.outbound.send(OutboundFrame::Close).expect("close");
    }

    #[tokio::test]
    async fn test_remote_close_reports_closed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = accept_async(stream).await.expect("upgrade");
            let _ = ws.close(None).await;
        });

        let url = Url::parse(&format!("ws://127.0.0.1:{port}")).expect("url");
        let mut link = WebSocketTransport::new(url).open().await.expect("open");

        let last = loop {
            match link.inbound.recv().await {
                Some(InboundFrame::Closed(reason)) => break reason,
                Some(_) => {}
                None => panic!("link ended without Closed frame"),
            }
        };
        assert!(!last.is_empty());
    }

    #[tokio::test]
    async fn test_client_over_websocket() {
        use std::sync::Arc;

        use serde_json::json;
        use tokio::sync::oneshot;

        use crate::client::ChannelClient;
        use crate::protocol::NetworkStats;

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = accept_async(stream).await.expect("upgrade");
            // Answer the first request with a stats push
            if let Some(Ok(message)) = ws.next().await
                && message.is_text()
            {
                let push = json!({ "type": "network_stats", "data": { "totalPeers": 5 } });
                let _ = ws.send(Message::Text(push.to_string().into())).await;
            }
            while ws.next().await.is_some() {}
        });

        let client = ChannelClient::builder()
            .url(format!("ws://127.0.0.1:{port}/ws"))
            .build()
            .expect("build");

        let (tx, rx) = oneshot::channel();
        let tx = Arc::new(parking_lot::Mutex::new(Some(tx)));
        client.subscribe::<NetworkStats, _>(move |stats| {
            if let Some(tx) = tx.lock().take() {
                let _ = tx.send(stats.total_peers);
            }
        });

        client.connect().await.expect("connect");
        assert!(client.is_connected());
        assert!(client.send("get_stats", json!({})));

        let total = timeout(Duration::from_secs(5), rx)
            .await
            .expect("push within timeout")
            .expect("callback fired");
        assert_eq!(total, 5);

        client.disconnect();
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn test_open_refused() {
        // Grab a free port, then release it so nothing is listening.
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();
        drop(listener);

        let url = Url::parse(&format!("ws://127.0.0.1:{port}")).expect("url");
        let result = WebSocketTransport::new(url).open().await;

        let err = result.expect_err("nothing is listening");
        assert!(matches!(err, Error::WebSocket(_)), "got {err:?}");
        assert!(err.is_connection_error());
    }
}
