//! Connection actor
//!
//! The central actor owning all real-time state: the transport handle, the
//! connection state machine, the set of callers awaiting a connect, and the
//! subscription registry. Uses the actor pattern with mpsc channels - no
//! locks, all state access goes through message passing.
//!
//! Connection state machine:
//! Disconnected -(connect)-> Connecting -(CONNECTED frame)-> Connected
//! -(close/error)-> Disconnected, with a fixed-delay reconnect scheduled
//! after every unexpected drop. `disconnect()` is reachable from any state
//! and always ends in Disconnected with auto-reconnect disabled.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::config::ClientConfig;
use crate::destination::room_topic;
use crate::error::ClientError;
use crate::frame::{StompCommand, StompFrame};
use crate::message::{EventCallback, InboundPayload, OutboundAction, RoomCallbacks};
use crate::transport::{Connector, OutboundItem, TransportEvent, TransportHandle};
use crate::types::{EventKind, RoomId};

/// Commands sent from [`ChatClient`] handles to the connection actor
///
/// [`ChatClient`]: crate::client::ChatClient
#[derive(Debug)]
pub(crate) enum Command {
    /// Establish (or join the in-flight attempt to establish) the connection
    Connect {
        reply: oneshot::Sender<Result<(), ClientError>>,
    },
    /// Register room subscriptions; connects first when necessary
    Subscribe {
        room_id: RoomId,
        callbacks: RoomCallbacks,
        reply: oneshot::Sender<Result<Vec<String>, ClientError>>,
    },
    /// Remove all subscriptions for a room
    Unsubscribe { room_id: RoomId },
    /// Publish an outbound action; connects first when necessary
    Publish {
        action: OutboundAction,
        reply: oneshot::Sender<Result<(), ClientError>>,
    },
    /// Tear everything down and stop reconnecting
    Disconnect { reply: oneshot::Sender<()> },
    /// Has the handshake completed?
    IsConnected { reply: oneshot::Sender<bool> },
    /// Handshake completed and the transport is still live?
    IsFullyConnected { reply: oneshot::Sender<bool> },
}

/// Actor-internal events (transport attempt results, reconnect timers)
enum Internal {
    TransportOpened {
        epoch: u64,
        result: Result<TransportHandle, ClientError>,
    },
    ReconnectDue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Errored,
}

/// One active `(room, kind)` registration
struct SubscriptionEntry {
    id: String,
    callback: EventCallback,
}

/// An operation queued behind an in-flight connect attempt
enum PendingOp {
    Subscribe {
        room_id: RoomId,
        callbacks: RoomCallbacks,
        reply: oneshot::Sender<Result<Vec<String>, ClientError>>,
    },
    Publish {
        action: OutboundAction,
        reply: oneshot::Sender<Result<(), ClientError>>,
    },
}

impl PendingOp {
    fn fail(self) {
        match self {
            PendingOp::Subscribe { reply, .. } => {
                let _ = reply.send(Err(ClientError::NotConnected));
            }
            PendingOp::Publish { reply, .. } => {
                let _ = reply.send(Err(ClientError::NotConnected));
            }
        }
    }
}

/// The connection actor
///
/// Exclusively owns the transport handle and the subscription registry;
/// subscriptions cannot outlive the connection they ride on.
pub(crate) struct ConnectionActor {
    config: ClientConfig,
    connector: Arc<dyn Connector>,
    commands: mpsc::Receiver<Command>,
    internal_tx: mpsc::UnboundedSender<Internal>,
    internal_rx: mpsc::UnboundedReceiver<Internal>,
    state: ConnectionState,
    transport: Option<TransportHandle>,
    /// Callers awaiting the current connect attempt; all observe one outcome
    connect_waiters: Vec<oneshot::Sender<Result<(), ClientError>>>,
    /// Operations queued until the in-flight connect resolves
    pending_ops: Vec<PendingOp>,
    /// Subscription registry, keyed by destination
    registry: HashMap<String, SubscriptionEntry>,
    next_subscription: u64,
    /// Connect attempt generation; stale attempt results are discarded
    epoch: u64,
    auto_reconnect: bool,
    reconnect_scheduled: bool,
    last_inbound: Instant,
}

impl ConnectionActor {
    pub(crate) fn new(
        config: ClientConfig,
        connector: Arc<dyn Connector>,
        commands: mpsc::Receiver<Command>,
    ) -> Self {
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        Self {
            config,
            connector,
            commands,
            internal_tx,
            internal_rx,
            state: ConnectionState::Disconnected,
            transport: None,
            connect_waiters: Vec::new(),
            pending_ops: Vec::new(),
            registry: HashMap::new(),
            next_subscription: 0,
            epoch: 0,
            auto_reconnect: false,
            reconnect_scheduled: false,
            last_inbound: Instant::now(),
        }
    }

    /// Run the actor event loop
    ///
    /// Processes commands, transport events, and heartbeat ticks until all
    /// client handles are dropped.
    pub(crate) async fn run(mut self) {
        info!("Connection actor started");

        let mut heartbeat =
            tokio::time::interval(Duration::from_millis(self.config.heartbeat_outgoing_ms.max(1)));
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let transport_events = self.transport.as_mut().map(|t| &mut t.events);

            tokio::select! {
                maybe_cmd = self.commands.recv() => {
                    match maybe_cmd {
                        Some(cmd) => self.handle_command(cmd),
                        None => break, // all handles dropped
                    }
                }
                maybe_internal = self.internal_rx.recv() => {
                    if let Some(internal) = maybe_internal {
                        self.handle_internal(internal);
                    }
                }
                maybe_event = recv_or_pending(transport_events) => {
                    match maybe_event {
                        Some(event) => self.handle_transport_event(event),
                        // Reader gone without a close frame
                        None => self.handle_transport_event(TransportEvent::Closed { reason: None }),
                    }
                }
                _ = heartbeat.tick() => self.on_heartbeat_tick(),
            }
        }

        info!("Connection actor shutting down");
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Connect { reply } => self.start_or_join_connect(Some(reply)),
            Command::Subscribe {
                room_id,
                callbacks,
                reply,
            } => {
                if self.is_fully_connected() {
                    let keys = self.do_subscribe(room_id, &callbacks);
                    let _ = reply.send(Ok(keys));
                } else {
                    self.pending_ops.push(PendingOp::Subscribe {
                        room_id,
                        callbacks,
                        reply,
                    });
                    self.start_or_join_connect(None);
                }
            }
            Command::Unsubscribe { room_id } => self.do_unsubscribe(room_id),
            Command::Publish { action, reply } => {
                if self.is_fully_connected() {
                    let _ = reply.send(self.do_publish(&action));
                } else {
                    self.pending_ops.push(PendingOp::Publish { action, reply });
                    self.start_or_join_connect(None);
                }
            }
            Command::Disconnect { reply } => {
                self.do_disconnect();
                let _ = reply.send(());
            }
            Command::IsConnected { reply } => {
                let _ = reply.send(self.state == ConnectionState::Connected);
            }
            Command::IsFullyConnected { reply } => {
                let _ = reply.send(self.is_fully_connected());
            }
        }
    }

    fn handle_internal(&mut self, internal: Internal) {
        match internal {
            Internal::TransportOpened { epoch, result } => {
                if epoch != self.epoch {
                    // A disconnect or newer attempt superseded this one;
                    // dropping the handle closes the transport.
                    debug!("Ignoring stale transport from attempt {}", epoch);
                    return;
                }
                match result {
                    Ok(handle) => self.begin_handshake(handle),
                    Err(e) => {
                        warn!("Broker connection failed: {}", e);
                        self.fail_connect(e.to_string());
                    }
                }
            }
            Internal::ReconnectDue => {
                self.reconnect_scheduled = false;
                if !self.auto_reconnect {
                    return;
                }
                if !matches!(
                    self.state,
                    ConnectionState::Disconnected | ConnectionState::Errored
                ) {
                    return;
                }
                info!("Attempting scheduled reconnect");
                self.begin_connect_attempt();
            }
        }
    }

    fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Frame(frame) => {
                self.last_inbound = Instant::now();
                match frame.command {
                    StompCommand::Connected => self.on_connected(frame),
                    StompCommand::Message => self.dispatch_message(frame),
                    StompCommand::Error => self.on_error_frame(frame),
                    StompCommand::Receipt => {
                        debug!("Receipt {:?}", frame.get_header("receipt-id"));
                    }
                    other => warn!("Unexpected {} frame from broker", other.as_str()),
                }
            }
            TransportEvent::Heartbeat => {
                self.last_inbound = Instant::now();
            }
            TransportEvent::Closed { reason } => {
                let reason = reason.unwrap_or_else(|| "connection closed".to_string());
                warn!("Transport closed: {}", reason);
                self.fail_connect(reason);
            }
        }
    }

    /// Join the in-flight attempt, report success, or start a fresh attempt
    fn start_or_join_connect(&mut self, reply: Option<oneshot::Sender<Result<(), ClientError>>>) {
        match self.state {
            // A connection can be marked connected and then silently
            // invalidated by a close; only a live transport short-circuits.
            ConnectionState::Connected if self.transport_alive() => {
                if let Some(reply) = reply {
                    let _ = reply.send(Ok(()));
                }
            }
            ConnectionState::Connecting => {
                if let Some(reply) = reply {
                    self.connect_waiters.push(reply);
                }
            }
            _ => {
                if let Some(reply) = reply {
                    self.connect_waiters.push(reply);
                }
                self.begin_connect_attempt();
            }
        }
    }

    fn begin_connect_attempt(&mut self) {
        self.auto_reconnect = true;
        self.state = ConnectionState::Connecting;
        self.transport = None;
        self.epoch += 1;
        let epoch = self.epoch;

        info!("Opening broker connection to {}", self.config.ws_url());
        let connect = self.connector.connect();
        let internal_tx = self.internal_tx.clone();
        tokio::spawn(async move {
            let result = connect.await;
            let _ = internal_tx.send(Internal::TransportOpened { epoch, result });
        });
    }

    /// Transport is open; send the STOMP CONNECT frame
    fn begin_handshake(&mut self, handle: TransportHandle) {
        let connect_frame = StompFrame::new(StompCommand::Connect)
            .header("accept-version", "1.2")
            .header("heart-beat", self.config.heart_beat_header());
        if handle
            .outbound
            .send(OutboundItem::Frame(connect_frame))
            .is_err()
        {
            self.fail_connect("transport closed before handshake".to_string());
            return;
        }
        self.last_inbound = Instant::now();
        self.transport = Some(handle);
        // State stays Connecting until the CONNECTED frame arrives
    }

    fn on_connected(&mut self, frame: StompFrame) {
        if self.state != ConnectionState::Connecting {
            debug!("CONNECTED frame in state {:?}, ignoring", self.state);
            return;
        }
        info!(
            "Broker handshake completed (version {})",
            frame.get_header("version").unwrap_or("?")
        );
        self.state = ConnectionState::Connected;
        for waiter in self.connect_waiters.drain(..) {
            let _ = waiter.send(Ok(()));
        }
        self.resubscribe_all();
        self.flush_pending_ops();
    }

    fn on_error_frame(&mut self, frame: StompFrame) {
        let message = frame
            .get_header("message")
            .unwrap_or("broker error")
            .to_string();
        error!("ERROR frame from broker: {} ({})", message, frame.body);
        if self.state == ConnectionState::Connecting {
            self.fail_connect(message);
        } else {
            // Protocol error on a live connection: drop it and retry
            self.state = ConnectionState::Errored;
            self.transport = None;
            self.schedule_reconnect();
        }
    }

    /// Resolve the current attempt as failed: release every waiter with the
    /// same error, fail queued operations, reset so a later connect starts
    /// fresh, and schedule the retry.
    fn fail_connect(&mut self, reason: String) {
        self.state = ConnectionState::Disconnected;
        self.transport = None;
        for waiter in self.connect_waiters.drain(..) {
            let _ = waiter.send(Err(ClientError::Connection(reason.clone())));
        }
        for op in self.pending_ops.drain(..) {
            op.fail();
        }
        self.schedule_reconnect();
    }

    fn schedule_reconnect(&mut self) {
        if !self.auto_reconnect || self.reconnect_scheduled {
            return;
        }
        self.reconnect_scheduled = true;
        let delay = Duration::from_millis(self.config.reconnect_delay_ms);
        debug!("Scheduling reconnect in {:?}", delay);
        let internal_tx = self.internal_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = internal_tx.send(Internal::ReconnectDue);
        });
    }

    /// Re-arm registered subscriptions on a fresh connection
    fn resubscribe_all(&mut self) {
        if self.registry.is_empty() {
            return;
        }
        info!(
            "Re-arming {} subscription(s) after reconnect",
            self.registry.len()
        );
        let destinations: Vec<String> = self.registry.keys().cloned().collect();
        for destination in destinations {
            let id = self.next_subscription_id();
            if let Some(entry) = self.registry.get_mut(&destination) {
                entry.id = id.clone();
            }
            self.send_subscribe_frame(&id, &destination);
        }
    }

    fn flush_pending_ops(&mut self) {
        for op in std::mem::take(&mut self.pending_ops) {
            match op {
                PendingOp::Subscribe {
                    room_id,
                    callbacks,
                    reply,
                } => {
                    let keys = self.do_subscribe(room_id, &callbacks);
                    let _ = reply.send(Ok(keys));
                }
                PendingOp::Publish { action, reply } => {
                    let _ = reply.send(self.do_publish(&action));
                }
            }
        }
    }

    /// Register one subscription per present callback; returns channel keys
    ///
    /// Idempotent per `(room, kind)`: an existing registration keeps its
    /// single broker subscription and only the callback is replaced.
    fn do_subscribe(&mut self, room_id: RoomId, callbacks: &RoomCallbacks) -> Vec<String> {
        let mut keys = Vec::new();
        for kind in EventKind::ALL {
            let Some(callback) = callbacks.get(kind) else {
                continue;
            };
            let destination = room_topic(room_id, kind);
            if let Some(entry) = self.registry.get_mut(&destination) {
                entry.callback = callback.clone();
                debug!("Subscription to {} already active", destination);
            } else {
                let id = self.next_subscription_id();
                self.send_subscribe_frame(&id, &destination);
                info!("Subscribed to {} ({})", destination, id);
                self.registry.insert(
                    destination.clone(),
                    SubscriptionEntry {
                        id,
                        callback: callback.clone(),
                    },
                );
            }
            keys.push(destination);
        }
        keys
    }

    /// Remove all three channel kinds for a room, tolerating absent kinds
    fn do_unsubscribe(&mut self, room_id: RoomId) {
        // A subscribe still queued behind an in-flight connect is canceled
        // here, so no lingering registration can appear later.
        let mut retained = Vec::with_capacity(self.pending_ops.len());
        for op in self.pending_ops.drain(..) {
            match op {
                PendingOp::Subscribe {
                    room_id: pending_room,
                    reply,
                    ..
                } if pending_room == room_id => {
                    let _ = reply.send(Ok(Vec::new()));
                }
                other => retained.push(other),
            }
        }
        self.pending_ops = retained;

        for kind in EventKind::ALL {
            let destination = room_topic(room_id, kind);
            if let Some(entry) = self.registry.remove(&destination) {
                self.send_frame(StompFrame::new(StompCommand::Unsubscribe).header("id", entry.id));
                info!("Unsubscribed from {}", destination);
            }
        }
    }

    /// Serialize and publish an outbound action, fire-and-forget
    fn do_publish(&mut self, action: &OutboundAction) -> Result<(), ClientError> {
        let body = action.to_json()?;
        let frame = StompFrame::new(StompCommand::Send)
            .header("destination", action.destination())
            .header("content-type", "application/json")
            .body(body);
        debug!("Publishing to {}", action.destination());
        match &self.transport {
            Some(transport) if transport.outbound.send(OutboundItem::Frame(frame)).is_ok() => {
                Ok(())
            }
            _ => Err(ClientError::NotConnected),
        }
    }

    /// Deliver a MESSAGE frame to the registered callback
    fn dispatch_message(&mut self, frame: StompFrame) {
        let Some(destination) = frame.get_header("destination") else {
            warn!("MESSAGE frame without destination");
            return;
        };
        let Some(entry) = self.registry.get(destination) else {
            debug!("Message for inactive channel {} dropped", destination);
            return;
        };
        let callback = entry.callback.clone();
        let payload = InboundPayload::decode(&frame.body);
        // A panicking callback must not take down delivery on other channels
        if catch_unwind(AssertUnwindSafe(|| callback(payload))).is_err() {
            error!("Subscription callback for {} panicked", destination);
        }
    }

    fn do_disconnect(&mut self) {
        info!("Disconnecting from broker");
        self.auto_reconnect = false;
        self.epoch += 1; // invalidate any in-flight attempt

        let entries: Vec<SubscriptionEntry> =
            self.registry.drain().map(|(_, entry)| entry).collect();
        for entry in entries {
            self.send_frame(StompFrame::new(StompCommand::Unsubscribe).header("id", entry.id));
        }
        self.send_frame(StompFrame::new(StompCommand::Disconnect));

        self.transport = None;
        self.state = ConnectionState::Disconnected;
        for waiter in self.connect_waiters.drain(..) {
            let _ = waiter.send(Err(ClientError::NotConnected));
        }
        for op in self.pending_ops.drain(..) {
            op.fail();
        }
    }

    fn on_heartbeat_tick(&mut self) {
        if self.state != ConnectionState::Connected {
            return;
        }
        // Watchdog: a silent broker means the connection is dead
        if self.config.heartbeat_incoming_ms > 0 {
            let stale_after =
                Duration::from_millis(self.config.heartbeat_incoming_ms.saturating_mul(2));
            if self.last_inbound.elapsed() > stale_after {
                warn!("No traffic from broker within heartbeat window");
                self.fail_connect("heartbeat timeout".to_string());
                return;
            }
        }
        if let Some(transport) = &self.transport {
            if transport.outbound.send(OutboundItem::Heartbeat).is_err() {
                self.fail_connect("transport closed".to_string());
            }
        }
    }

    fn is_fully_connected(&self) -> bool {
        self.state == ConnectionState::Connected && self.transport_alive()
    }

    fn transport_alive(&self) -> bool {
        self.transport
            .as_ref()
            .map(|t| !t.outbound.is_closed())
            .unwrap_or(false)
    }

    fn next_subscription_id(&mut self) -> String {
        let id = format!("sub-{}", self.next_subscription);
        self.next_subscription += 1;
        id
    }

    fn send_subscribe_frame(&mut self, id: &str, destination: &str) {
        self.send_frame(
            StompFrame::new(StompCommand::Subscribe)
                .header("id", id)
                .header("destination", destination),
        );
    }

    fn send_frame(&mut self, frame: StompFrame) {
        if let Some(transport) = &self.transport {
            if transport.outbound.send(OutboundItem::Frame(frame)).is_err() {
                debug!("Transport gone, frame dropped");
            }
        }
    }
}

async fn recv_or_pending(
    events: Option<&mut mpsc::UnboundedReceiver<TransportEvent>>,
) -> Option<TransportEvent> {
    match events {
        Some(events) => events.recv().await,
        None => std::future::pending().await,
    }
}
