//! Channel layer: handshake, request/response correlation, inbound dispatch.
//!
//! A [`Channel`] is an established bidirectional capability-call connection
//! between two contexts. Establishment is a SYN/ACK handshake retried a
//! bounded number of times at a fixed interval, each attempt timing out
//! independently; once established, calls are at-most-once - a remote call is
//! never retried automatically, since calls may have side effects on the
//! peer.
//!
//! # Message flow
//!
//! 1. Caller invokes [`Channel::call`] with method name and params
//! 2. Channel assigns a sequential id and registers a oneshot callback
//! 3. The request is queued to the writer task and sent over the transport
//! 4. The peer's dispatch loop routes it to its exposed [`MethodHandler`]
//! 5. The response comes back, is correlated by id, and resolves the call
//!
//! Inbound requests are served concurrently on spawned tasks so a slow
//! handler never stalls response correlation.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::error::{Error, Result};
use crate::transport::TransportParts;

/// Handler for methods exposed on a channel.
///
/// One handler serves every method a context exposes; unknown methods should
/// fail inside the handler so the peer gets a remote error rather than a
/// hung call.
pub trait MethodHandler: Send + Sync {
    fn handle(
        &self,
        method: &str,
        params: Value,
    ) -> Pin<Box<dyn Future<Output = Result<Value>> + Send + '_>>;
}

/// Tunables for channel establishment.
#[derive(Debug, Clone, Copy)]
pub struct EstablishOptions {
    /// Number of SYN attempts before giving up.
    pub attempts: u32,
    /// Fixed interval between attempts; doubles as the per-attempt timeout.
    pub retry_interval: Duration,
}

impl Default for EstablishOptions {
    fn default() -> Self {
        Self {
            attempts: 5,
            retry_interval: Duration::from_secs(1),
        }
    }
}

impl EstablishOptions {
    /// Total time budget the responder side waits for a SYN.
    fn budget(&self) -> Duration {
        self.retry_interval * self.attempts
    }
}

/// Error payload carried in a response message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteErrorPayload {
    /// Error kind name (e.g. "TimeoutError").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub message: String,
}

/// Wire messages exchanged over a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Message {
    /// Handshake: initiator announces itself.
    Syn,
    /// Handshake: responder confirms.
    Ack,
    /// Method call addressed to the peer's exposed handler.
    Request {
        id: u32,
        method: String,
        params: Value,
    },
    /// Answer to a request, correlated by id.
    Response {
        id: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<RemoteErrorPayload>,
    },
}

struct ChannelInner {
    /// Sequential request id counter.
    last_id: AtomicU32,
    /// Pending call callbacks keyed by request id.
    callbacks: Mutex<HashMap<u32, oneshot::Sender<Result<Value>>>>,
    /// Queue toward the writer task.
    outbound_tx: mpsc::UnboundedSender<Message>,
    /// Handler serving inbound requests; swappable via `expose`.
    handler: Mutex<Option<Arc<dyn MethodHandler>>>,
    /// Flips to true once the handshake completes.
    established_tx: watch::Sender<bool>,
    closed: AtomicBool,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

/// RAII cleanup for a pending call abandoned before its response arrived.
struct CancelGuard {
    id: u32,
    inner: Arc<ChannelInner>,
    completed: bool,
}

impl CancelGuard {
    fn complete(&mut self) {
        self.completed = true;
    }
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        if self.completed {
            return;
        }
        if self.inner.callbacks.lock().remove(&self.id).is_some() {
            tracing::debug!(target: "skybridge.channel", id = self.id, "removed orphaned callback");
        }
    }
}

/// An established bidirectional capability-call connection.
#[derive(Clone)]
pub struct Channel {
    inner: Arc<ChannelInner>,
    established_rx: watch::Receiver<bool>,
}

impl Channel {
    /// Establishes a channel as the initiating side.
    ///
    /// Sends SYN up to `options.attempts` times at `options.retry_interval`,
    /// resolving as soon as the peer answers with ACK. Exhausting the budget
    /// surfaces [`Error::HandshakeTimeout`].
    pub async fn establish(
        parts: TransportParts,
        exposed: Option<Arc<dyn MethodHandler>>,
        options: EstablishOptions,
    ) -> Result<Channel> {
        let channel = Channel::spawn(parts, exposed);
        let mut established = channel.established_rx.clone();

        for attempt in 1..=options.attempts {
            if channel.inner.outbound_tx.send(Message::Syn).is_err() {
                channel.close();
                return Err(Error::ChannelClosed);
            }
            tracing::trace!(target: "skybridge.channel", attempt, "handshake syn sent");

            tokio::select! {
                changed = established.wait_for(|ready| *ready) => {
                    if changed.is_ok() {
                        tracing::debug!(target: "skybridge.channel", attempt, "handshake complete");
                        return Ok(channel);
                    }
                    break;
                }
                _ = sleep(options.retry_interval) => {}
            }
        }

        channel.close();
        Err(Error::HandshakeTimeout {
            attempts: options.attempts,
        })
    }

    /// Establishes a channel as the responding side.
    ///
    /// Waits for the initiator's SYN (which the dispatch loop answers with
    /// ACK) within the same overall budget the initiator spends retrying.
    pub async fn accept(
        parts: TransportParts,
        exposed: Option<Arc<dyn MethodHandler>>,
        options: EstablishOptions,
    ) -> Result<Channel> {
        let channel = Channel::spawn(parts, exposed);
        let mut established = channel.established_rx.clone();

        match tokio::time::timeout(options.budget(), established.wait_for(|ready| *ready)).await {
            Ok(Ok(_)) => Ok(channel),
            _ => {
                channel.close();
                Err(Error::HandshakeTimeout {
                    attempts: options.attempts,
                })
            }
        }
    }

    /// Sends a method call to the peer and awaits the response.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value> {
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(Error::ChannelClosed);
        }

        let id = self.inner.last_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.inner.callbacks.lock().insert(id, tx);
        let mut guard = CancelGuard {
            id,
            inner: Arc::clone(&self.inner),
            completed: false,
        };

        tracing::debug!(target: "skybridge.channel", id, method, "sending call");
        let request = Message::Request {
            id,
            method: method.to_string(),
            params,
        };
        if self.inner.outbound_tx.send(request).is_err() {
            return Err(Error::ChannelClosed);
        }

        let result = match rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(Error::ChannelClosed),
        };
        guard.complete();
        result
    }

    /// Typed wrapper around [`Channel::call`].
    pub async fn call_typed<P: Serialize, R: DeserializeOwned>(
        &self,
        method: &str,
        params: P,
    ) -> Result<R> {
        let response = self.call(method, serde_json::to_value(params)?).await?;
        serde_json::from_value(response).map_err(Into::into)
    }

    /// Replaces the handler serving inbound requests.
    pub fn expose(&self, handler: Arc<dyn MethodHandler>) {
        *self.inner.handler.lock() = Some(handler);
    }

    /// Returns true once the channel has been closed from either side.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Tears down the channel: pump tasks stop, outstanding calls fail with
    /// [`Error::ChannelClosed`]. Idempotent.
    pub fn close(&self) {
        self.inner.close();
    }

    fn spawn(parts: TransportParts, handler: Option<Arc<dyn MethodHandler>>) -> Channel {
        let TransportParts {
            mut sender,
            receiver,
            mut message_rx,
        } = parts;

        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
        let (established_tx, established_rx) = watch::channel(false);

        let inner = Arc::new(ChannelInner {
            last_id: AtomicU32::new(0),
            callbacks: Mutex::new(HashMap::new()),
            outbound_tx,
            handler: Mutex::new(handler),
            established_tx,
            closed: AtomicBool::new(false),
            tasks: Mutex::new(Vec::new()),
        });

        let writer = tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                let value = match serde_json::to_value(&message) {
                    Ok(value) => value,
                    Err(e) => {
                        tracing::error!(target: "skybridge.channel", error = %e, "failed to encode message");
                        continue;
                    }
                };
                if let Err(e) = sender.send(value).await {
                    tracing::debug!(target: "skybridge.channel", error = %e, "transport write failed");
                    break;
                }
            }
        });

        let reader = tokio::spawn(async move {
            if let Err(e) = receiver.run().await {
                tracing::debug!(target: "skybridge.channel", error = %e, "transport read failed");
            }
        });

        let dispatch_inner = Arc::clone(&inner);
        let dispatcher = tokio::spawn(async move {
            while let Some(value) = message_rx.recv().await {
                match serde_json::from_value::<Message>(value) {
                    Ok(message) => dispatch_inner.dispatch(message),
                    Err(e) => {
                        tracing::error!(target: "skybridge.channel", error = %e, "failed to parse message");
                    }
                }
            }
            // Peer is gone; fail anything still waiting.
            dispatch_inner.close();
        });

        inner.tasks.lock().extend([writer, reader, dispatcher]);

        Channel {
            inner,
            established_rx,
        }
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl ChannelInner {
    fn dispatch(&self, message: Message) {
        match message {
            Message::Syn => {
                let _ = self.outbound_tx.send(Message::Ack);
                let _ = self.established_tx.send(true);
            }
            Message::Ack => {
                let _ = self.established_tx.send(true);
            }
            Message::Request { id, method, params } => {
                let handler = self.handler.lock().clone();
                let outbound = self.outbound_tx.clone();
                tokio::spawn(async move {
                    let result = match handler {
                        Some(handler) => handler.handle(&method, params).await,
                        None => Err(Error::Protocol(format!(
                            "no methods exposed (method '{method}')"
                        ))),
                    };
                    let response = match result {
                        Ok(value) => Message::Response {
                            id,
                            result: Some(value),
                            error: None,
                        },
                        Err(e) => Message::Response {
                            id,
                            result: None,
                            error: Some(RemoteErrorPayload {
                                name: Some(error_kind(&e).to_string()),
                                message: e.to_string(),
                            }),
                        },
                    };
                    let _ = outbound.send(response);
                });
            }
            Message::Response { id, result, error } => {
                let Some(callback) = self.callbacks.lock().remove(&id) else {
                    tracing::debug!(target: "skybridge.channel", id, "response for unknown request (ignored)");
                    return;
                };
                let outcome = match error {
                    Some(payload) => Err(Error::Remote {
                        name: payload.name.unwrap_or_else(|| "Error".to_string()),
                        message: payload.message,
                    }),
                    None => Ok(result.unwrap_or(Value::Null)),
                };
                let _ = callback.send(outcome);
            }
        }
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
        for (_, callback) in self.callbacks.lock().drain() {
            let _ = callback.send(Err(Error::ChannelClosed));
        }
        tracing::debug!(target: "skybridge.channel", "channel closed");
    }
}

/// Maps a local error onto the wire error-kind vocabulary.
fn error_kind(error: &Error) -> &str {
    match error {
        Error::Timeout(_) | Error::HandshakeTimeout { .. } => "TimeoutError",
        Error::Remote { name, .. } => name,
        _ => "Error",
    }
}
