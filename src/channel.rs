//! Managed bidirectional event channel to the SAMi backend.
//!
//! [`EventChannel::connect`] spawns a background tokio task that owns the
//! WebSocket with automatic reconnection. Outbound events are fire-and-forget
//! (at-most-once); inbound events are parsed at the boundary and delivered to
//! the session strictly in arrival order, with no reordering or coalescing.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use crate::protocol::{self, InboundEvent, OutboundEvent};

/// Connection lifecycle state of the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Initial connection attempt in progress.
    Connecting,
    /// Channel is live.
    Connected,
    /// Connection lost; retrying with backoff.
    Reconnecting { attempt: u32 },
    /// Channel shut down cleanly.
    Disconnected,
}

/// What the background task delivers to the session, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelNotice {
    /// Lifecycle transition.
    Status(ConnectionStatus),
    /// A parsed inbound event.
    Event(InboundEvent),
}

/// Shared state between the handle and the background task.
struct SharedState {
    status: ConnectionStatus,
}

/// Handle to the managed event channel.
///
/// Dropping the handle closes the outbound queue, which shuts the background
/// connection task down cleanly.
pub struct EventChannel {
    shared: Arc<Mutex<SharedState>>,
    /// Outbound frames for the background task.
    tx: mpsc::UnboundedSender<String>,
}

impl EventChannel {
    /// Connect to the backend event endpoint.
    ///
    /// Returns the channel handle and the ordered notice receiver. The
    /// background task manages the socket and reconnects on failure;
    /// reconnection policy is the channel's own concern, opaque to callers.
    #[must_use]
    pub fn connect(url: impl Into<String>) -> (Self, mpsc::UnboundedReceiver<ChannelNotice>) {
        let url = url.into();
        let shared = Arc::new(Mutex::new(SharedState {
            status: ConnectionStatus::Connecting,
        }));

        let (tx, outbound_rx) = mpsc::unbounded_channel();
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();

        let task_shared = Arc::clone(&shared);
        tokio::spawn(async move {
            connection_loop(url, task_shared, outbound_rx, notice_tx).await;
        });

        (Self { shared, tx }, notice_rx)
    }

    /// Emit an outbound event, fire-and-forget.
    ///
    /// No acknowledgment is tracked; if the connection task is gone the event
    /// is silently dropped (at-most-once semantics).
    pub fn emit(&self, event: &OutboundEvent) {
        if let Ok(json) = serde_json::to_string(event) {
            let _ = self.tx.send(json);
        }
    }

    /// Current connection status.
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        match self.shared.lock() {
            Ok(s) => s.status.clone(),
            Err(p) => p.into_inner().status.clone(),
        }
    }
}

/// Maximum reconnect delay.
const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(30);
/// Base reconnect delay.
const BASE_RECONNECT_DELAY: Duration = Duration::from_secs(1);

fn set_status(
    shared: &Arc<Mutex<SharedState>>,
    notice_tx: &mpsc::UnboundedSender<ChannelNotice>,
    status: ConnectionStatus,
) {
    if let Ok(mut s) = shared.lock() {
        s.status = status.clone();
    }
    let _ = notice_tx.send(ChannelNotice::Status(status));
}

/// Run the connection loop with automatic reconnection.
async fn connection_loop(
    url: String,
    shared: Arc<Mutex<SharedState>>,
    mut outbound_rx: mpsc::UnboundedReceiver<String>,
    notice_tx: mpsc::UnboundedSender<ChannelNotice>,
) {
    let mut attempt: u32 = 0;

    loop {
        set_status(
            &shared,
            &notice_tx,
            if attempt == 0 {
                ConnectionStatus::Connecting
            } else {
                ConnectionStatus::Reconnecting { attempt }
            },
        );

        match run_connection(&url, &shared, &mut outbound_rx, &notice_tx).await {
            Ok(()) => {
                // Handle dropped; clean shutdown.
                set_status(&shared, &notice_tx, ConnectionStatus::Disconnected);
                break;
            }
            Err(e) => {
                tracing::warn!("event channel connection failed (attempt {attempt}): {e}");
                attempt += 1;

                let delay = BASE_RECONNECT_DELAY
                    .saturating_mul(2u32.saturating_pow(attempt.min(5)))
                    .min(MAX_RECONNECT_DELAY);

                set_status(
                    &shared,
                    &notice_tx,
                    ConnectionStatus::Reconnecting { attempt },
                );

                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Drive a single WebSocket connection. Returns `Ok(())` only when the
/// channel handle is dropped (clean shutdown); any transport failure is `Err`
/// so the outer loop reconnects.
async fn run_connection(
    url: &str,
    shared: &Arc<Mutex<SharedState>>,
    outbound_rx: &mut mpsc::UnboundedReceiver<String>,
    notice_tx: &mpsc::UnboundedSender<ChannelNotice>,
) -> Result<(), String> {
    use futures_util::{SinkExt, StreamExt};
    use tokio_tungstenite::{connect_async, tungstenite::Message};

    let (ws_stream, _) = connect_async(url)
        .await
        .map_err(|e| format!("connect: {e}"))?;

    let (mut write, mut read) = ws_stream.split();

    set_status(shared, notice_tx, ConnectionStatus::Connected);

    loop {
        tokio::select! {
            // Inbound from the backend.
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(event) = protocol::parse_inbound(&text) {
                            let _ = notice_tx.send(ChannelNotice::Event(event));
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        return Err("connection closed by server".into());
                    }
                    Some(Err(e)) => {
                        return Err(format!("read error: {e}"));
                    }
                    _ => {} // Binary, Ping/Pong frames handled by tungstenite.
                }
            }
            // Outbound from the session.
            outbound = outbound_rx.recv() => {
                match outbound {
                    Some(json) => {
                        if let Err(e) = write.send(Message::Text(json)).await {
                            return Err(format!("send error: {e}"));
                        }
                    }
                    // Handle dropped: shut down cleanly.
                    None => return Ok(()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::protocol::ToggleAction;

    #[test]
    fn reconnect_delay_capped() {
        for attempt in 0u32..20 {
            let delay = BASE_RECONNECT_DELAY
                .saturating_mul(2u32.saturating_pow(attempt.min(5)))
                .min(MAX_RECONNECT_DELAY);
            assert!(delay <= MAX_RECONNECT_DELAY);
        }
    }

    #[tokio::test]
    async fn emit_after_task_gone_is_silent() {
        let (channel, notice_rx) = EventChannel::connect("ws://127.0.0.1:1/ws");
        drop(notice_rx);

        // Must not panic even while the connection is failing.
        channel.emit(&OutboundEvent::ToggleListening {
            action: ToggleAction::Toggle,
        });
        channel.emit(&OutboundEvent::TextCommand {
            text: "hello".into(),
        });
    }

    #[tokio::test]
    async fn initial_status_reported() {
        let (_channel, mut notice_rx) = EventChannel::connect("ws://127.0.0.1:1/ws");

        // First notice is always the Connecting transition.
        let first = notice_rx.recv().await.unwrap();
        assert_eq!(first, ChannelNotice::Status(ConnectionStatus::Connecting));
    }
}
