//! Transport layer: WebSocket connection to the broker
//!
//! A [`Connector`] opens one transport and hands back a [`TransportHandle`]:
//! an outbound frame channel and an inbound event channel. The WebSocket
//! implementation bridges both channels to the socket with dedicated read
//! and write tasks; the connection actor never touches the socket directly.

use futures_util::future::BoxFuture;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::COOKIE;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::frame::{self, StompFrame};

/// Item sent from the connection actor to the transport writer
#[derive(Debug)]
pub(crate) enum OutboundItem {
    Frame(StompFrame),
    Heartbeat,
}

/// Event delivered from the transport reader to the connection actor
#[derive(Debug)]
pub(crate) enum TransportEvent {
    /// A parsed STOMP frame
    Frame(StompFrame),
    /// A bare heartbeat (liveness only)
    Heartbeat,
    /// The transport is gone; no further events follow
    Closed { reason: Option<String> },
}

/// Channel pair for one live transport
///
/// Dropping the handle tears the transport down: the writer task ends when
/// the outbound channel closes and shuts the socket.
pub(crate) struct TransportHandle {
    pub outbound: mpsc::UnboundedSender<OutboundItem>,
    pub events: mpsc::UnboundedReceiver<TransportEvent>,
}

/// Opens transports to the broker
///
/// The seam that lets tests drive the connection actor without a real
/// broker. Exactly one call per connection attempt.
pub(crate) trait Connector: Send + Sync + 'static {
    fn connect(&self) -> BoxFuture<'static, Result<TransportHandle, ClientError>>;
}

/// Production connector: WebSocket client via tokio-tungstenite
pub(crate) struct WebSocketConnector {
    url: String,
    cookie: Option<String>,
}

impl WebSocketConnector {
    pub(crate) fn new(config: &ClientConfig) -> Self {
        Self {
            url: config.ws_url(),
            cookie: config.cookie.clone(),
        }
    }
}

impl Connector for WebSocketConnector {
    fn connect(&self) -> BoxFuture<'static, Result<TransportHandle, ClientError>> {
        let url = self.url.clone();
        let cookie = self.cookie.clone();

        Box::pin(async move {
            let mut request = url.as_str().into_client_request()?;
            if let Some(cookie) = &cookie {
                let value = HeaderValue::from_str(cookie)
                    .map_err(|e| ClientError::Connection(format!("invalid cookie header: {}", e)))?;
                request.headers_mut().insert(COOKIE, value);
            }

            let (ws_stream, _response) = connect_async(request).await?;
            debug!("WebSocket handshake completed with {}", url);

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (out_tx, mut out_rx) = mpsc::unbounded_channel::<OutboundItem>();
            let (event_tx, event_rx) = mpsc::unbounded_channel::<TransportEvent>();

            // Write task (actor -> WebSocket)
            tokio::spawn(async move {
                while let Some(item) = out_rx.recv().await {
                    let text = match item {
                        OutboundItem::Frame(stomp_frame) => stomp_frame.serialize(),
                        OutboundItem::Heartbeat => frame::HEARTBEAT.to_string(),
                    };
                    if let Err(e) = ws_sender.send(Message::Text(text.into())).await {
                        debug!("WebSocket send failed, ending write task: {}", e);
                        break;
                    }
                }
                let _ = ws_sender.close().await;
                debug!("Write task ended");
            });

            // Read task (WebSocket -> actor)
            tokio::spawn(async move {
                loop {
                    match ws_receiver.next().await {
                        Some(Ok(Message::Text(text))) => {
                            if frame::is_heartbeat(&text) {
                                if event_tx.send(TransportEvent::Heartbeat).is_err() {
                                    break;
                                }
                                continue;
                            }
                            match StompFrame::parse(&text) {
                                Ok(stomp_frame) => {
                                    if event_tx.send(TransportEvent::Frame(stomp_frame)).is_err() {
                                        break;
                                    }
                                }
                                Err(e) => warn!("Dropping unparseable frame: {}", e),
                            }
                        }
                        Some(Ok(Message::Close(close_frame))) => {
                            let reason = close_frame.map(|f| f.reason.to_string());
                            let _ = event_tx.send(TransportEvent::Closed { reason });
                            break;
                        }
                        Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                            // Counts as liveness for the heartbeat watchdog
                            if event_tx.send(TransportEvent::Heartbeat).is_err() {
                                break;
                            }
                        }
                        Some(Ok(_)) => {
                            // Binary or other message types - ignore
                        }
                        Some(Err(e)) => {
                            let _ = event_tx.send(TransportEvent::Closed {
                                reason: Some(e.to_string()),
                            });
                            break;
                        }
                        None => {
                            let _ = event_tx.send(TransportEvent::Closed { reason: None });
                            break;
                        }
                    }
                }
                debug!("Read task ended");
            });

            Ok(TransportHandle {
                outbound: out_tx,
                events: event_rx,
            })
        })
    }
}
