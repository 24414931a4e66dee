//! Public client handle
//!
//! [`ChatClient`] is a cheap clone-able handle over the connection actor.
//! All operations are forwarded as commands; replies come back on oneshot
//! channels. Dropping every handle shuts the actor down.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::config::ClientConfig;
use crate::connection::{Command, ConnectionActor};
use crate::error::ClientError;
use crate::message::{OutboundAction, RoomCallbacks};
use crate::transport::{Connector, WebSocketConnector};
use crate::types::{MessageId, RoomId};

/// Channel buffer size for actor commands
const COMMAND_BUFFER_SIZE: usize = 256;

/// Handle to the real-time messaging client
///
/// One instance owns one broker connection; every room subscription is
/// multiplexed over it. `connect` is idempotent and every operation that
/// needs the connection awaits an in-flight attempt instead of failing
/// immediately, so callers do not have to sequence connect-then-subscribe
/// by hand.
#[derive(Clone)]
pub struct ChatClient {
    commands: mpsc::Sender<Command>,
}

impl ChatClient {
    /// Create a client for the configured broker and spawn its actor
    ///
    /// Must be called within a tokio runtime. No connection is opened
    /// until [`connect`](Self::connect) or a dependent operation runs.
    pub fn new(config: ClientConfig) -> Self {
        let connector = Arc::new(WebSocketConnector::new(&config));
        Self::with_connector(config, connector)
    }

    pub(crate) fn with_connector(config: ClientConfig, connector: Arc<dyn Connector>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER_SIZE);
        tokio::spawn(ConnectionActor::new(config, connector, cmd_rx).run());
        Self { commands: cmd_tx }
    }

    /// Establish the broker connection
    ///
    /// Concurrent and repeated calls share one underlying attempt; a second
    /// transport is never opened while one is pending or live. Resolves
    /// once the handshake completes or fails.
    pub async fn connect(&self) -> Result<(), ClientError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Connect { reply }).await?;
        rx.await.map_err(|_| ClientError::ChannelClosed)?
    }

    /// Subscribe to a room's event streams
    ///
    /// One broker subscription per callback present in `callbacks`; absent
    /// callbacks subscribe nothing. Returns the active channel keys.
    /// Connects first if the connection is not fully established.
    pub async fn subscribe_to_room(
        &self,
        room_id: RoomId,
        callbacks: RoomCallbacks,
    ) -> Result<Vec<String>, ClientError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Subscribe {
            room_id,
            callbacks,
            reply,
        })
        .await?;
        rx.await.map_err(|_| ClientError::ChannelClosed)?
    }

    /// Remove all subscriptions for a room
    ///
    /// A no-op for channels that were never subscribed; safe to call while
    /// a subscribe attempt for the room is still in flight.
    pub async fn unsubscribe_from_room(&self, room_id: RoomId) -> Result<(), ClientError> {
        self.send(Command::Unsubscribe { room_id }).await
    }

    /// Publish a new message to a room
    ///
    /// Fire-and-forget: resolves once the frame is handed to the transport,
    /// not when the broker echoes the message back.
    pub async fn send_message(
        &self,
        room_id: RoomId,
        content: impl Into<String>,
    ) -> Result<(), ClientError> {
        self.publish(OutboundAction::NewMessage {
            room_id,
            content: content.into(),
        })
        .await
    }

    /// Publish a message deletion
    pub async fn delete_message(&self, message_id: MessageId) -> Result<(), ClientError> {
        self.publish(OutboundAction::DeleteMessage { message_id })
            .await
    }

    /// Publish a message edit
    pub async fn edit_message(
        &self,
        message_id: MessageId,
        new_content: impl Into<String>,
    ) -> Result<(), ClientError> {
        self.publish(OutboundAction::EditMessage {
            message_id,
            new_content: new_content.into(),
        })
        .await
    }

    /// Tear down all subscriptions and the transport; stops reconnecting
    pub async fn disconnect(&self) -> Result<(), ClientError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Disconnect { reply }).await?;
        rx.await.map_err(|_| ClientError::ChannelClosed)
    }

    /// Has the broker handshake completed?
    pub async fn is_connected(&self) -> bool {
        let (reply, rx) = oneshot::channel();
        if self.send(Command::IsConnected { reply }).await.is_err() {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    /// Handshake completed and the transport still live?
    ///
    /// Stricter than [`is_connected`](Self::is_connected): a connection can
    /// be marked connected and then silently invalidated by a close event.
    pub async fn is_fully_connected(&self) -> bool {
        let (reply, rx) = oneshot::channel();
        if self.send(Command::IsFullyConnected { reply }).await.is_err() {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    async fn publish(&self, action: OutboundAction) -> Result<(), ClientError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Publish { action, reply }).await?;
        rx.await.map_err(|_| ClientError::ChannelClosed)?
    }

    async fn send(&self, cmd: Command) -> Result<(), ClientError> {
        self.commands
            .send(cmd)
            .await
            .map_err(|_| ClientError::ChannelClosed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use serde_json::json;
    use tokio::time::timeout;

    use super::*;
    use crate::frame::StompCommand;
    use crate::message::{InboundPayload, RoomCallbacks};
    use crate::transport::mock::{MockBroker, MockConnector, MockSession};
    use crate::transport::OutboundItem;

    fn test_config() -> ClientConfig {
        let mut config = ClientConfig::new("ws://test");
        config.reconnect_delay_ms = 20;
        config
    }

    fn test_client() -> (ChatClient, MockBroker) {
        let (connector, broker) = MockConnector::new();
        let client = ChatClient::with_connector(test_config(), Arc::new(connector));
        (client, broker)
    }

    /// Capture callback invocations for assertions
    fn capture() -> (
        impl Fn(InboundPayload) + Send + Sync + 'static,
        Arc<Mutex<Vec<InboundPayload>>>,
    ) {
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        (
            move |payload| sink.lock().unwrap().push(payload),
            received,
        )
    }

    async fn connected_client() -> (ChatClient, MockBroker, MockSession) {
        let (client, mut broker) = test_client();
        let connecting = tokio::spawn({
            let client = client.clone();
            async move { client.connect().await }
        });
        let mut session = broker.accept().await;
        session.complete_handshake().await;
        connecting.await.unwrap().unwrap();
        (client, broker, session)
    }

    /// Wait until the capture sink holds at least `n` payloads
    async fn wait_for_payloads(received: &Arc<Mutex<Vec<InboundPayload>>>, n: usize) {
        timeout(Duration::from_secs(1), async {
            loop {
                if received.lock().unwrap().len() >= n {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .expect("timed out waiting for callback delivery");
    }

    #[tokio::test]
    async fn test_concurrent_connects_share_one_transport() {
        let (client, mut broker) = test_client();

        let c1 = tokio::spawn({
            let client = client.clone();
            async move { client.connect().await }
        });
        let c2 = tokio::spawn({
            let client = client.clone();
            async move { client.connect().await }
        });

        let mut session = broker.accept().await;
        session.complete_handshake().await;

        c1.await.unwrap().unwrap();
        c2.await.unwrap().unwrap();

        assert_eq!(broker.connect_count(), 1);
        assert!(client.is_connected().await);
        assert!(client.is_fully_connected().await);
    }

    #[tokio::test]
    async fn test_connect_idempotent_when_already_connected() {
        let (client, broker, _session) = connected_client().await;
        client.connect().await.unwrap();
        client.connect().await.unwrap();
        assert_eq!(broker.connect_count(), 1);
    }

    #[tokio::test]
    async fn test_connect_failure_resets_attempt_for_retry() {
        let (client, mut broker) = test_client();

        broker.fail_connects(true);
        let err = client.connect().await.unwrap_err();
        assert!(matches!(err, ClientError::Connection(_)));
        assert!(!client.is_connected().await);

        // The failed attempt token was cleared: a fresh connect succeeds
        broker.fail_connects(false);
        let connecting = tokio::spawn({
            let client = client.clone();
            async move { client.connect().await }
        });
        let mut session = broker.accept().await;
        session.complete_handshake().await;
        connecting.await.unwrap().unwrap();
        assert!(client.is_fully_connected().await);
    }

    #[tokio::test]
    async fn test_handshake_error_surfaces_to_all_waiters() {
        let (client, mut broker) = test_client();

        let c1 = tokio::spawn({
            let client = client.clone();
            async move { client.connect().await }
        });
        let mut session = broker.accept().await;
        let connect = session.next_frame().await;
        assert_eq!(connect.command, StompCommand::Connect);

        // Second caller joins the same pending attempt; drive it until it
        // is registered (it cannot resolve while the handshake is open).
        let c2 = client.connect();
        tokio::pin!(c2);
        tokio::select! {
            _ = &mut c2 => panic!("connect resolved before the handshake finished"),
            _ = tokio::time::sleep(Duration::from_millis(50)) => {}
        }

        session.send_frame(
            crate::frame::StompFrame::new(StompCommand::Error).header("message", "auth failed"),
        );

        for result in [c1.await.unwrap(), c2.await] {
            match result {
                Err(ClientError::Connection(reason)) => assert_eq!(reason, "auth failed"),
                other => panic!("expected connection error, got {:?}", other),
            }
        }
        assert_eq!(broker.connect_count(), 1);
    }

    #[tokio::test]
    async fn test_subscribe_registers_per_present_callback() {
        let (client, _broker, mut session) = connected_client().await;

        let (on_message, _) = capture();
        let (on_delete, _) = capture();
        let keys = client
            .subscribe_to_room(
                RoomId(42),
                RoomCallbacks::new().on_message(on_message).on_delete(on_delete),
            )
            .await
            .unwrap();

        assert_eq!(keys, vec!["/topic/chat.42", "/topic/chat.42.delete"]);

        let sub1 = session.next_frame().await;
        assert_eq!(sub1.command, StompCommand::Subscribe);
        assert_eq!(sub1.get_header("destination"), Some("/topic/chat.42"));
        let sub2 = session.next_frame().await;
        assert_eq!(sub2.get_header("destination"), Some("/topic/chat.42.delete"));
        // No callback for edits, so no third subscription
        assert!(session.try_next_frame().is_none());
    }

    #[tokio::test]
    async fn test_inbound_message_delivered_decoded() {
        let (client, _broker, mut session) = connected_client().await;

        let (on_message, received) = capture();
        client
            .subscribe_to_room(RoomId(42), RoomCallbacks::new().on_message(on_message))
            .await
            .unwrap();
        let sub = session.next_frame().await;
        let sub_id = sub.get_header("id").unwrap().to_string();

        session.send_message(
            "/topic/chat.42",
            &sub_id,
            r#"{"id":1,"content":"hi","author":"a","timeSent":"10:00"}"#,
        );
        wait_for_payloads(&received, 1).await;

        let received = received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(
            received[0].as_json().unwrap(),
            &json!({"id": 1, "content": "hi", "author": "a", "timeSent": "10:00"})
        );
    }

    #[tokio::test]
    async fn test_malformed_payload_delivered_raw() {
        let (client, _broker, mut session) = connected_client().await;

        let (on_delete, received) = capture();
        client
            .subscribe_to_room(RoomId(42), RoomCallbacks::new().on_delete(on_delete))
            .await
            .unwrap();
        let sub = session.next_frame().await;
        assert_eq!(sub.get_header("destination"), Some("/topic/chat.42.delete"));

        session.send_message("/topic/chat.42.delete", "sub-0", "not json {");
        wait_for_payloads(&received, 1).await;

        assert_eq!(
            received.lock().unwrap()[0],
            InboundPayload::Raw("not json {".to_string())
        );
    }

    #[tokio::test]
    async fn test_duplicate_subscribe_registers_once() {
        let (client, _broker, mut session) = connected_client().await;

        let (first, first_received) = capture();
        let (second, second_received) = capture();
        client
            .subscribe_to_room(RoomId(42), RoomCallbacks::new().on_message(first))
            .await
            .unwrap();
        let keys = client
            .subscribe_to_room(RoomId(42), RoomCallbacks::new().on_message(second))
            .await
            .unwrap();
        assert_eq!(keys, vec!["/topic/chat.42"]);

        // Exactly one SUBSCRIBE reached the broker
        let sub = session.next_frame().await;
        assert_eq!(sub.command, StompCommand::Subscribe);
        client.send_message(RoomId(42), "probe").await.unwrap();
        let next = session.next_frame().await;
        assert_eq!(next.command, StompCommand::Send);

        // One inbound event, one delivery - to the replacing callback
        session.send_message("/topic/chat.42", "sub-0", r#"{"id":1}"#);
        wait_for_payloads(&second_received, 1).await;
        assert_eq!(second_received.lock().unwrap().len(), 1);
        assert!(first_received.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_delivery() {
        let (client, _broker, mut session) = connected_client().await;

        let (muted, muted_received) = capture();
        let (sentinel, sentinel_received) = capture();
        client
            .subscribe_to_room(RoomId(42), RoomCallbacks::new().on_message(muted))
            .await
            .unwrap();
        client
            .subscribe_to_room(RoomId(1), RoomCallbacks::new().on_message(sentinel))
            .await
            .unwrap();

        client.unsubscribe_from_room(RoomId(42)).await.unwrap();

        // Skip the two SUBSCRIBEs, then expect the UNSUBSCRIBE
        session.next_frame().await;
        session.next_frame().await;
        let unsub = session.next_frame().await;
        assert_eq!(unsub.command, StompCommand::Unsubscribe);
        assert_eq!(unsub.get_header("id"), Some("sub-0"));

        // Event on the former channel, then a sentinel event to order against
        session.send_message("/topic/chat.42", "sub-0", r#"{"id":9}"#);
        session.send_message("/topic/chat.1", "sub-1", r#"{"id":10}"#);
        wait_for_payloads(&sentinel_received, 1).await;

        assert!(muted_received.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unsubscribe_unknown_room_is_noop() {
        let (client, _broker, mut session) = connected_client().await;
        client.unsubscribe_from_room(RoomId(99)).await.unwrap();
        client.send_message(RoomId(1), "probe").await.unwrap();
        // No UNSUBSCRIBE frame was produced
        let frame = session.next_frame().await;
        assert_eq!(frame.command, StompCommand::Send);
    }

    #[tokio::test]
    async fn test_unsubscribe_during_pending_subscribe_leaves_no_registration() {
        let (client, mut broker) = test_client();

        // Subscribe with no connection: the op queues behind the handshake
        let (orphan, orphan_received) = capture();
        let subscribing = tokio::spawn({
            let client = client.clone();
            async move {
                client
                    .subscribe_to_room(RoomId(42), RoomCallbacks::new().on_message(orphan))
                    .await
            }
        });
        let mut session = broker.accept().await;
        let connect = session.next_frame().await;
        assert_eq!(connect.command, StompCommand::Connect);

        // Cancel the room while its subscribe is still queued, then let the
        // handshake finish
        client.unsubscribe_from_room(RoomId(42)).await.unwrap();
        session.send_frame(
            crate::frame::StompFrame::new(StompCommand::Connected).header("version", "1.2"),
        );
        subscribing.await.unwrap().unwrap();

        // Fence with a publish. Depending on which of the cancel and the
        // CONNECTED frame lands first, the broker saw either nothing for the
        // room or a SUBSCRIBE immediately undone by an UNSUBSCRIBE; a live
        // registration is never left behind.
        client.send_message(RoomId(1), "fence").await.unwrap();
        let mut subscribes = 0;
        let mut unsubscribes = 0;
        loop {
            let frame = session.next_frame().await;
            match frame.command {
                StompCommand::Subscribe => subscribes += 1,
                StompCommand::Unsubscribe => unsubscribes += 1,
                StompCommand::Send => break,
                other => panic!("unexpected {} frame", other.as_str()),
            }
        }
        assert_eq!(subscribes, unsubscribes);

        // Nothing is delivered on the canceled channel, ordered against a
        // sentinel event on a live one
        let (sentinel, sentinel_received) = capture();
        client
            .subscribe_to_room(RoomId(1), RoomCallbacks::new().on_message(sentinel))
            .await
            .unwrap();
        let sub = session.next_frame().await;
        session.send_message("/topic/chat.42", "sub-0", r#"{"id":9}"#);
        session.send_message("/topic/chat.1", sub.get_header("id").unwrap(), r#"{"id":10}"#);
        wait_for_payloads(&sentinel_received, 1).await;
        assert!(orphan_received.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_heartbeats_sent_on_outgoing_interval() {
        let mut config = test_config();
        config.heartbeat_outgoing_ms = 10;
        config.heartbeat_incoming_ms = 0; // no watchdog, the broker stays silent
        let (connector, mut broker) = MockConnector::new();
        let client = ChatClient::with_connector(config, Arc::new(connector));

        let connecting = tokio::spawn({
            let client = client.clone();
            async move { client.connect().await }
        });
        let mut session = broker.accept().await;
        session.complete_handshake().await;
        connecting.await.unwrap().unwrap();

        // CONNECT was consumed by the handshake; the next outbound items are
        // the periodic heartbeats
        let item = timeout(Duration::from_secs(1), session.outbound.recv())
            .await
            .expect("timed out waiting for a heartbeat")
            .expect("client transport dropped");
        assert!(matches!(item, OutboundItem::Heartbeat));
    }

    #[tokio::test]
    async fn test_silent_connection_dropped_and_reconnected() {
        let mut config = test_config();
        config.heartbeat_outgoing_ms = 10;
        config.heartbeat_incoming_ms = 10;
        let (connector, mut broker) = MockConnector::new();
        let client = ChatClient::with_connector(config, Arc::new(connector));

        let connecting = tokio::spawn({
            let client = client.clone();
            async move { client.connect().await }
        });
        let mut session = broker.accept().await;
        session.complete_handshake().await;
        connecting.await.unwrap().unwrap();

        // Send nothing further: twice the incoming interval without traffic
        // makes the watchdog drop the connection and retry
        let mut session2 = broker.accept().await;
        session2.complete_handshake().await;
        assert!(broker.connect_count() >= 2);
    }

    #[tokio::test]
    async fn test_send_message_while_disconnected_connects_first() {
        let (client, mut broker) = test_client();

        let sending = tokio::spawn({
            let client = client.clone();
            async move { client.send_message(RoomId(42), "hello").await }
        });

        let mut session = broker.accept().await;
        session.complete_handshake().await;

        let send = session.next_frame().await;
        assert_eq!(send.command, StompCommand::Send);
        assert_eq!(send.get_header("destination"), Some("/app/chat.sendMessage"));
        assert_eq!(send.get_header("content-type"), Some("application/json"));
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&send.body).unwrap(),
            json!({"chatRoomId": 42, "content": "hello"})
        );
        sending.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_publish_fails_without_connection_and_nothing_is_sent() {
        let (client, mut broker) = test_client();
        broker.fail_connects(true);

        let err = client.send_message(RoomId(42), "hello").await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::NotConnected | ClientError::Connection(_)
        ));
        assert!(broker.try_accept().is_none());
    }

    #[tokio::test]
    async fn test_delete_and_edit_publish_wire_payloads() {
        let (client, _broker, mut session) = connected_client().await;

        client.delete_message(MessageId(7)).await.unwrap();
        client.edit_message(MessageId(7), "fixed").await.unwrap();

        let delete = session.next_frame().await;
        assert_eq!(delete.get_header("destination"), Some("/app/chat.deleteMessage"));
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&delete.body).unwrap(),
            json!({"messageId": 7})
        );

        let edit = session.next_frame().await;
        assert_eq!(edit.get_header("destination"), Some("/app/chat.editMessage"));
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&edit.body).unwrap(),
            json!({"messageId": 7, "newContent": "fixed"})
        );
    }

    #[tokio::test]
    async fn test_disconnect_clears_subscriptions_and_reconnect_starts_fresh() {
        let (client, mut broker, mut session) = connected_client().await;

        let (stale, stale_received) = capture();
        client
            .subscribe_to_room(RoomId(42), RoomCallbacks::new().on_message(stale))
            .await
            .unwrap();
        session.next_frame().await; // SUBSCRIBE

        client.disconnect().await.unwrap();
        assert!(!client.is_connected().await);

        // Reconnect: a brand new transport, no stale registrations
        let connecting = tokio::spawn({
            let client = client.clone();
            async move { client.connect().await }
        });
        let mut session2 = broker.accept().await;
        session2.complete_handshake().await;
        connecting.await.unwrap().unwrap();
        assert_eq!(broker.connect_count(), 2);

        let (fresh, fresh_received) = capture();
        client
            .subscribe_to_room(RoomId(42), RoomCallbacks::new().on_message(fresh))
            .await
            .unwrap();
        let sub = session2.next_frame().await;
        assert_eq!(sub.command, StompCommand::Subscribe);
        assert_eq!(sub.get_header("destination"), Some("/topic/chat.42"));

        session2.send_message("/topic/chat.42", sub.get_header("id").unwrap(), r#"{"id":1}"#);
        wait_for_payloads(&fresh_received, 1).await;
        assert!(stale_received.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_auto_reconnect_rearms_subscriptions() {
        let (client, mut broker, mut session) = connected_client().await;

        let (on_message, received) = capture();
        client
            .subscribe_to_room(RoomId(42), RoomCallbacks::new().on_message(on_message))
            .await
            .unwrap();
        session.next_frame().await; // SUBSCRIBE

        // Unexpected close: the client retries after the fixed delay
        session.close(Some("broker restart"));
        let mut session2 = broker.accept().await;
        session2.complete_handshake().await;

        let resub = session2.next_frame().await;
        assert_eq!(resub.command, StompCommand::Subscribe);
        assert_eq!(resub.get_header("destination"), Some("/topic/chat.42"));

        session2.send_message(
            "/topic/chat.42",
            resub.get_header("id").unwrap(),
            r#"{"id":2}"#,
        );
        wait_for_payloads(&received, 1).await;
        assert_eq!(broker.connect_count(), 2);
    }

    #[tokio::test]
    async fn test_silently_invalidated_connection_detected_and_replaced() {
        let (client, mut broker, session) = connected_client().await;

        // Drop only the broker-side frame receiver: the handshake flag still
        // says connected but the transport can no longer carry frames.
        let MockSession { outbound, events } = session;
        drop(outbound);
        let _keep_events_alive = events;

        assert!(client.is_connected().await);
        assert!(!client.is_fully_connected().await);

        // A publish must not trust the stale flag; it opens a new transport
        let sending = tokio::spawn({
            let client = client.clone();
            async move { client.send_message(RoomId(42), "hello").await }
        });
        let mut session2 = broker.accept().await;
        session2.complete_handshake().await;
        let send = session2.next_frame().await;
        assert_eq!(send.command, StompCommand::Send);
        sending.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_callback_panic_does_not_affect_other_channels() {
        let (client, _broker, mut session) = connected_client().await;

        client
            .subscribe_to_room(
                RoomId(42),
                RoomCallbacks::new().on_message(|_| panic!("consumer bug")),
            )
            .await
            .unwrap();
        let (sentinel, sentinel_received) = capture();
        client
            .subscribe_to_room(RoomId(1), RoomCallbacks::new().on_message(sentinel))
            .await
            .unwrap();
        session.next_frame().await;
        session.next_frame().await;

        session.send_message("/topic/chat.42", "sub-0", r#"{"id":1}"#);
        session.send_message("/topic/chat.1", "sub-1", r#"{"id":2}"#);
        wait_for_payloads(&sentinel_received, 1).await;

        // Delivery continued past the panicking callback
        session.send_message("/topic/chat.1", "sub-1", r#"{"id":3}"#);
        wait_for_payloads(&sentinel_received, 2).await;
    }
}
