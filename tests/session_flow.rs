//! End-to-end session flow over a real WebSocket connection.
//!
//! Spins up an in-process WebSocket server standing in for the SAMi backend
//! and verifies the channel contract: inbound events reach the transcript in
//! delivery order, and outbound commands arrive on the wire exactly once.

use futures_util::{SinkExt, StreamExt};
use sami::speech::UnsupportedCapability;
use sami::{ChannelNotice, ClientConfig, ConnectionStatus, EventChannel, Session};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

/// Collect notices until the predicate is satisfied or the timeout hits.
async fn drive_until<F>(
    session: &mut Session<UnsupportedCapability>,
    notices: &mut tokio::sync::mpsc::UnboundedReceiver<ChannelNotice>,
    mut done: F,
) where
    F: FnMut(&Session<UnsupportedCapability>) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        while !done(session) {
            let Some(notice) = notices.recv().await else {
                panic!("notice channel closed early");
            };
            session.handle_notice(notice).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for session state"));
}

#[tokio::test]
async fn inbound_order_preserved_and_commands_emitted_once() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept");
        let mut ws = tokio_tungstenite::accept_async(stream).await.expect("handshake");

        // Deliver a burst of conversation updates in a fixed order.
        for i in 0..4 {
            let frame = format!(
                r#"{{"event":"conversation_update","data":{{"role":"sami","text":"reply {i}"}}}}"#
            );
            ws.send(Message::Text(frame)).await.expect("send");
        }
        ws.send(Message::Text(
            r#"{"event":"status_update","data":{"status":"Listening"}}"#.to_owned(),
        ))
        .await
        .expect("send status");

        // Collect every text frame the client sends back.
        let mut outbound = Vec::new();
        while let Ok(Some(msg)) =
            tokio::time::timeout(Duration::from_secs(2), ws.next()).await
        {
            match msg {
                Ok(Message::Text(text)) => outbound.push(text),
                Ok(Message::Close(_)) | Err(_) => break,
                Ok(_) => {}
            }
        }
        outbound
    });

    let config = ClientConfig::default();
    let (channel, mut notices) = EventChannel::connect(format!("ws://{addr}"));
    let mut session = Session::new(&config, channel, UnsupportedCapability);

    // Wait until everything the server sent has been applied.
    drive_until(&mut session, &mut notices, |s| {
        s.state().listening_status == "LISTENING"
    })
    .await;

    // The connect transition logged one system entry, then the four replies
    // in exactly delivery order.
    let texts: Vec<&str> = session
        .transcript()
        .entries()
        .iter()
        .map(|e| e.text.as_str())
        .collect();
    assert_eq!(
        texts,
        vec![
            "Interface connected to Mainframe.",
            "reply 0",
            "reply 1",
            "reply 2",
            "reply 3",
        ]
    );

    // A typed command goes out on the wire but produces no local echo.
    session.send_command("hello");
    assert_eq!(session.transcript().len(), 5);

    let outbound = server.await.expect("server task");
    assert_eq!(outbound.len(), 1);
    assert!(outbound[0].contains(r#""event":"text_command""#));
    assert!(outbound[0].contains(r#""text":"hello""#));
}

#[tokio::test]
async fn command_echo_does_not_duplicate_entries() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept");
        let mut ws = tokio_tungstenite::accept_async(stream).await.expect("handshake");

        // Echo each text_command back as a user conversation_update, the way
        // the backend does.
        while let Some(Ok(Message::Text(frame))) = ws.next().await {
            let value: serde_json::Value = serde_json::from_str(&frame).expect("json");
            if value["event"] == "text_command" {
                let echo = serde_json::json!({
                    "event": "conversation_update",
                    "data": {"role": "user", "text": value["data"]["text"]},
                });
                ws.send(Message::Text(echo.to_string())).await.expect("echo");
            }
        }
    });

    let config = ClientConfig::default();
    let (channel, mut notices) = EventChannel::connect(format!("ws://{addr}"));
    let mut session = Session::new(&config, channel, UnsupportedCapability);

    drive_until(&mut session, &mut notices, |s| {
        matches!(
            s.transcript().last(),
            Some(entry) if entry.text == "Interface connected to Mainframe."
        )
    })
    .await;

    session.send_command("hello");
    drive_until(&mut session, &mut notices, |s| s.transcript().len() >= 2).await;

    // One logical command, one transcript entry (the echo) — never two.
    let user_entries = session
        .transcript()
        .entries()
        .iter()
        .filter(|e| e.text == "hello")
        .count();
    assert_eq!(user_entries, 1);
}

#[tokio::test]
async fn reconnect_status_is_surfaced() {
    // Nothing listens here; the channel should report Connecting and then
    // Reconnecting without ever panicking or delivering events.
    let (channel, mut notices) = EventChannel::connect("ws://127.0.0.1:1/ws");

    let first = tokio::time::timeout(Duration::from_secs(5), notices.recv())
        .await
        .expect("timeout")
        .expect("notice");
    assert_eq!(first, ChannelNotice::Status(ConnectionStatus::Connecting));

    let second = tokio::time::timeout(Duration::from_secs(5), notices.recv())
        .await
        .expect("timeout")
        .expect("notice");
    assert!(matches!(
        second,
        ChannelNotice::Status(ConnectionStatus::Reconnecting { .. })
    ));

    assert_ne!(channel.status(), ConnectionStatus::Connected);
}
