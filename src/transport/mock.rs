//! Scripted in-memory transport for tests.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep};

use crate::error::{Error, Result};

use super::{InboundFrame, Link, OutboundFrame, Transport};

/// Outcome of the next `open` call.
#[derive(Debug, Clone)]
pub(crate) enum Outcome {
    /// Open succeeds with this identifier.
    Accept(Option<String>),
    /// Open fails with this message.
    Refuse(String),
}

/// Remote half of an accepted link.
pub(crate) struct Remote {
    pub inbound: mpsc::UnboundedSender<InboundFrame>,
    pub outbound: mpsc::UnboundedReceiver<OutboundFrame>,
}

impl Remote {
    /// Pushes a text frame to the client.
    pub fn push(&self, text: impl Into<String>) {
        let _ = self.inbound.send(InboundFrame::Text(text.into()));
    }

    /// Ends the link from the remote side.
    pub fn drop_link(&self, reason: &str) {
        let _ = self.inbound.send(InboundFrame::Closed(reason.to_owned()));
    }
}

/// Transport that follows a script and records every `open` call.
///
/// Once the script is exhausted every `open` is refused.
#[derive(Default)]
pub(crate) struct MockTransport {
    script: Mutex<VecDeque<Outcome>>,
    opens: Mutex<Vec<Instant>>,
    remotes: Mutex<VecDeque<Remote>>,
    open_delay: Duration,
}

impl MockTransport {
    pub fn new(script: impl IntoIterator<Item = Outcome>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Makes every `open` take `delay` before resolving.
    pub fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = delay;
        self
    }

    /// Appends outcomes to the script.
    pub fn push_script(&self, outcomes: impl IntoIterator<Item = Outcome>) {
        self.script.lock().extend(outcomes);
    }

    /// Instants at which `open` was called.
    pub fn opens(&self) -> Vec<Instant> {
        self.opens.lock().clone()
    }

    /// Takes the remote half of the oldest unclaimed accepted link.
    pub fn take_remote(&self) -> Option<Remote> {
        self.remotes.lock().pop_front()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn open(&self) -> Result<Link> {
        self.opens.lock().push(Instant::now());

        let outcome = self
            .script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Outcome::Refuse("connection refused".into()));

        if !self.open_delay.is_zero() {
            sleep(self.open_delay).await;
        }

        match outcome {
            Outcome::Accept(identifier) => {
                let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
                let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

                self.remotes.lock().push_back(Remote {
                    inbound: inbound_tx,
                    outbound: outbound_rx,
                });

                Ok(Link {
                    identifier,
                    outbound: outbound_tx,
                    inbound: inbound_rx,
                })
            }
            Outcome::Refuse(message) => Err(Error::connection(message)),
        }
    }
}
