//! Message transport between two execution contexts.
//!
//! A transport moves opaque JSON values between exactly two contexts. The
//! sender half pushes values toward the peer; the receiver half pumps inbound
//! values into an mpsc queue the connection's dispatch loop drains. Splitting
//! the halves lets the connection own each in a separate task.
//!
//! [`PairTransport`] is the canonical implementation: both contexts live in
//! the same process, so the medium is a pair of unbounded mpsc channels.

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::{Error, Result};

/// Sender half of a transport.
pub trait Transport: Send {
    /// Delivers one message to the peer context.
    fn send(&mut self, message: Value) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Receiver half of a transport.
///
/// `run()` pumps inbound messages into the `message_rx` queue of the
/// [`TransportParts`] it was created with, returning when the peer goes away.
pub trait TransportReceiver: Send {
    fn run(self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>>;
}

/// Everything a connection needs to drive one endpoint of a transport.
pub struct TransportParts {
    pub sender: Box<dyn Transport>,
    pub receiver: Box<dyn TransportReceiver>,
    pub message_rx: mpsc::UnboundedReceiver<Value>,
}

/// In-process transport connecting two contexts over mpsc channels.
pub struct PairTransport;

impl PairTransport {
    /// Creates a connected endpoint pair.
    ///
    /// Messages sent on either endpoint arrive on the other, in order.
    pub fn pair() -> (TransportParts, TransportParts) {
        let (a_tx, a_inbound) = mpsc::unbounded_channel();
        let (b_tx, b_inbound) = mpsc::unbounded_channel();

        (endpoint(b_tx, a_inbound), endpoint(a_tx, b_inbound))
    }
}

fn endpoint(peer_tx: mpsc::UnboundedSender<Value>, inbound: mpsc::UnboundedReceiver<Value>) -> TransportParts {
    let (message_tx, message_rx) = mpsc::unbounded_channel();
    TransportParts {
        sender: Box::new(PairSender { peer_tx }),
        receiver: Box::new(PairReceiver { inbound, message_tx }),
        message_rx,
    }
}

struct PairSender {
    peer_tx: mpsc::UnboundedSender<Value>,
}

impl Transport for PairSender {
    fn send(&mut self, message: Value) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let result = self
            .peer_tx
            .send(message)
            .map_err(|_| Error::Transport("peer context is gone".to_string()));
        Box::pin(async move { result })
    }
}

struct PairReceiver {
    inbound: mpsc::UnboundedReceiver<Value>,
    message_tx: mpsc::UnboundedSender<Value>,
}

impl TransportReceiver for PairReceiver {
    fn run(mut self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> {
        Box::pin(async move {
            while let Some(message) = self.inbound.recv().await {
                if self.message_tx.send(message).is_err() {
                    // Connection dropped its queue; nothing left to pump for.
                    break;
                }
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn pair_delivers_in_both_directions() {
        let (mut a, mut b) = PairTransport::pair();

        tokio::spawn(a.receiver.run());
        tokio::spawn(b.receiver.run());

        a.sender.send(json!({"dir": "a-to-b"})).await.unwrap();
        b.sender.send(json!({"dir": "b-to-a"})).await.unwrap();

        assert_eq!(b.message_rx.recv().await.unwrap()["dir"], "a-to-b");
        assert_eq!(a.message_rx.recv().await.unwrap()["dir"], "b-to-a");
    }

    #[tokio::test]
    async fn pair_preserves_message_order() {
        let (mut a, mut b) = PairTransport::pair();
        tokio::spawn(b.receiver.run());

        for i in 0..10 {
            a.sender.send(json!({ "seq": i })).await.unwrap();
        }
        for i in 0..10 {
            assert_eq!(b.message_rx.recv().await.unwrap()["seq"], i);
        }
    }

    #[tokio::test]
    async fn send_fails_once_peer_is_dropped() {
        let (mut a, b) = PairTransport::pair();
        drop(b);

        let err = a.sender.send(json!({})).await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }
}
