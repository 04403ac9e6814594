//! Push channel over WebSocket.
//!
//! A background task owns the socket, reconnects after a fixed delay and
//! forwards parsed frames as [`PushSignal`]s. Frames that fail validation are
//! logged and dropped here; nothing malformed reaches the session.

use std::time::Duration;

use chrono::Utc;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::header::{HeaderValue, AUTHORIZATION};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use hrms_shared::normalize::Ingest;
use hrms_shared::protocol::PushEvent;

use crate::error::ClientError;

const SIGNAL_BUFFER: usize = 256;
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq)]
pub enum PushSignal {
    Connected,
    Disconnected,
    Event(PushEvent),
}

pub struct PushConnection {
    signals: mpsc::Receiver<PushSignal>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl PushConnection {
    /// Open the push channel in the background. The token is presented once,
    /// as a bearer header on the upgrade request.
    pub fn connect(url: &str, token: &str, reconnect_delay: Duration) -> Result<Self, ClientError> {
        // Fail fast on a bad URL or token instead of looping on it.
        handshake_request(url, token)?;

        let (tx, signals) = mpsc::channel(SIGNAL_BUFFER);
        let (shutdown, shutdown_rx) = oneshot::channel();
        let url = url.to_string();
        let token = token.to_string();

        let task = tokio::spawn(async move {
            run(url, token, reconnect_delay, tx, shutdown_rx).await;
        });

        Ok(Self {
            signals,
            shutdown: Some(shutdown),
            task: Some(task),
        })
    }

    /// Wrap an existing signal source, e.g. a test harness.
    pub fn from_channel(signals: mpsc::Receiver<PushSignal>) -> Self {
        Self {
            signals,
            shutdown: None,
            task: None,
        }
    }

    /// Next signal, or `None` once the channel is gone for good.
    pub async fn recv(&mut self) -> Option<PushSignal> {
        self.signals.recv().await
    }

    /// Close the socket and stop reconnecting.
    ///
    /// The signal channel is closed first so a reader blocked on a full
    /// buffer is released instead of waiting for a consumer that is gone.
    pub async fn disconnect(&mut self) {
        self.signals.close();
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Push task ended abnormally");
            }
        }
    }
}

fn handshake_request(url: &str, token: &str) -> Result<Request, ClientError> {
    let mut request = url.into_client_request()?;
    let bearer = HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|_| ClientError::Config("token is not a valid header value".into()))?;
    request.headers_mut().insert(AUTHORIZATION, bearer);
    Ok(request)
}

async fn run(
    url: String,
    token: String,
    reconnect_delay: Duration,
    tx: mpsc::Sender<PushSignal>,
    mut shutdown: oneshot::Receiver<()>,
) {
    loop {
        let request = match handshake_request(&url, &token) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Cannot build push handshake");
                return;
            }
        };

        let connected = tokio::select! {
            _ = &mut shutdown => return,
            result = connect_async(request) => result,
        };

        match connected {
            Ok((ws, _)) => {
                info!(%url, "Push channel connected");
                if !forward(&tx, PushSignal::Connected, &mut shutdown).await {
                    return;
                }
                if pump(ws, &tx, &mut shutdown).await {
                    // `shutdown` may be spent; never wait on it or on a full buffer here.
                    let _ = tx.try_send(PushSignal::Disconnected);
                    return;
                }
                if !forward(&tx, PushSignal::Disconnected, &mut shutdown).await {
                    return;
                }
                info!(delay = ?reconnect_delay, "Push channel dropped; reconnecting");
            }
            Err(e) => {
                warn!(%url, error = %e, delay = ?reconnect_delay, "Push connect failed");
            }
        }

        tokio::select! {
            _ = &mut shutdown => return,
            _ = tokio::time::sleep(reconnect_delay) => {}
        }
    }
}

/// Deliver one signal unless shutdown arrives first. Returns `false` when the
/// task must stop; `shutdown` must not be polled again after that.
async fn forward(
    tx: &mpsc::Sender<PushSignal>,
    signal: PushSignal,
    shutdown: &mut oneshot::Receiver<()>,
) -> bool {
    tokio::select! {
        _ = &mut *shutdown => false,
        sent = tx.send(signal) => sent.is_ok(),
    }
}

/// Forward frames until the socket drops. Returns `true` when the task
/// should stop instead of reconnecting.
async fn pump(
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    tx: &mpsc::Sender<PushSignal>,
    shutdown: &mut oneshot::Receiver<()>,
) -> bool {
    let (mut write, mut read) = ws.split();

    loop {
        let frame = tokio::select! {
            _ = &mut *shutdown => break,
            frame = read.next() => frame,
        };

        match frame {
            Some(Ok(WsMessage::Text(text))) => match PushEvent::parse(text.as_str(), Utc::now()) {
                Ingest::Valid(event) => {
                    if !forward(tx, PushSignal::Event(event), shutdown).await {
                        break;
                    }
                }
                Ingest::Dropped(reason) => {
                    debug!(%reason, "Dropped push frame");
                }
            },
            Some(Ok(WsMessage::Close(frame))) => {
                debug!(?frame, "Server closed push channel");
                return false;
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                warn!(error = %e, "Push channel read error");
                return false;
            }
            None => return false,
        }
    }

    if tokio::time::timeout(CLOSE_TIMEOUT, write.send(WsMessage::Close(None)))
        .await
        .is_err()
    {
        debug!("Timed out sending close frame");
    }
    true
}
