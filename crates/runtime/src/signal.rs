//! Origin-scoped broadcast key/value signaling.
//!
//! The bridge and the router are not parent and child; they share only a
//! broadcast-style key/value medium scoped to the host origin (the
//! storage-event analog). Writers set well-known keys; watchers observe them
//! and consume each value immediately so no key is delivered twice. Events
//! from other origins are ignored.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::error::{Error, Result};

const EVENT_BUFFER: usize = 64;

/// One key write observed on the medium.
#[derive(Debug, Clone)]
pub struct SignalEvent {
    /// Origin of the writer.
    pub origin: String,
    pub key: String,
    pub value: String,
}

struct Medium {
    /// Written-but-unconsumed values, keyed by (origin, key).
    pending: Mutex<HashMap<(String, String), String>>,
    events: broadcast::Sender<SignalEvent>,
}

/// Handle onto the signaling medium for one origin.
///
/// Clones share the same medium. [`SignalBus::endpoint`] derives a handle
/// for a different origin on the same medium, which is how tests and demo
/// harnesses stand in for the router window.
#[derive(Clone)]
pub struct SignalBus {
    origin: String,
    medium: Arc<Medium>,
}

impl SignalBus {
    /// Creates a fresh medium with a handle scoped to `origin`.
    pub fn new(origin: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            origin: origin.into(),
            medium: Arc::new(Medium {
                pending: Mutex::new(HashMap::new()),
                events,
            }),
        }
    }

    /// Derives a handle for another origin on the same medium.
    pub fn endpoint(&self, origin: impl Into<String>) -> SignalBus {
        SignalBus {
            origin: origin.into(),
            medium: Arc::clone(&self.medium),
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Writes `key` and broadcasts the event to all watchers.
    pub fn set(&self, key: &str, value: impl Into<String>) {
        let value = value.into();
        self.medium
            .pending
            .lock()
            .insert((self.origin.clone(), key.to_string()), value.clone());
        // No watchers yet is fine; the pending map catches late subscribers.
        let _ = self.medium.events.send(SignalEvent {
            origin: self.origin.clone(),
            key: key.to_string(),
            value,
        });
        tracing::trace!(target: "skybridge.signal", origin = %self.origin, key, "signal set");
    }

    /// Consumes `key` written by this bus's own origin, if present.
    pub fn take(&self, key: &str) -> Option<String> {
        self.medium
            .pending
            .lock()
            .remove(&(self.origin.clone(), key.to_string()))
    }

    /// Starts watching for same-origin key writes.
    ///
    /// Subscribe before triggering the writer: values written after the
    /// watcher exists are caught either live or via the pending map.
    pub fn watch(&self) -> SignalWatcher {
        SignalWatcher {
            origin: self.origin.clone(),
            medium: Arc::clone(&self.medium),
            events: self.medium.events.subscribe(),
        }
    }
}

/// Watches the medium for same-origin key writes, consuming each observation.
pub struct SignalWatcher {
    origin: String,
    medium: Arc<Medium>,
    events: broadcast::Receiver<SignalEvent>,
}

impl SignalWatcher {
    /// Waits until `key` is written by a same-origin sender and consumes it.
    ///
    /// If the key was already written before this call, it resolves
    /// immediately. Loses to a racing watcher consuming the same key and
    /// keeps waiting in that case.
    pub async fn wait(&mut self, key: &str) -> Result<String> {
        if let Some(value) = self.consume(key) {
            return Ok(value);
        }

        loop {
            match self.events.recv().await {
                Ok(event) => {
                    if event.origin != self.origin || event.key != key {
                        continue;
                    }
                    if self.consume(key).is_some() {
                        return Ok(event.value);
                    }
                    // Another watcher got there first.
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(target: "skybridge.signal", skipped, "signal watcher lagged");
                    if let Some(value) = self.consume(key) {
                        return Ok(value);
                    }
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(Error::ChannelClosed);
                }
            }
        }
    }

    fn consume(&self, key: &str) -> Option<String> {
        self.medium
            .pending
            .lock()
            .remove(&(self.origin.clone(), key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn watcher_sees_same_origin_write() {
        let bus = SignalBus::new("https://host.test");
        let mut watcher = bus.watch();

        bus.set("success-router", "crane.portal.test");

        let value = watcher.wait("success-router").await.unwrap();
        assert_eq!(value, "crane.portal.test");
    }

    #[tokio::test]
    async fn write_before_watch_is_not_lost() {
        let bus = SignalBus::new("https://host.test");
        bus.set("success-router", "early");

        let mut watcher = bus.watch();
        assert_eq!(watcher.wait("success-router").await.unwrap(), "early");
    }

    #[tokio::test]
    async fn key_is_consumed_on_observation() {
        let bus = SignalBus::new("https://host.test");
        let mut watcher = bus.watch();

        bus.set("success-router", "once");
        watcher.wait("success-router").await.unwrap();

        assert!(bus.take("success-router").is_none());
    }

    #[tokio::test]
    async fn cross_origin_writes_are_ignored() {
        let bus = SignalBus::new("https://host.test");
        let stranger = bus.endpoint("https://evil.test");
        let mut watcher = bus.watch();

        stranger.set("success-router", "spoofed");
        bus.set("success-router", "genuine");

        assert_eq!(watcher.wait("success-router").await.unwrap(), "genuine");
    }

    #[tokio::test]
    async fn wait_blocks_until_key_arrives() {
        let bus = SignalBus::new("https://host.test");
        let mut watcher = bus.watch();

        let pending = timeout(Duration::from_millis(50), watcher.wait("event-router")).await;
        assert!(pending.is_err());

        bus.set("event-router", "closed");
        assert_eq!(watcher.wait("event-router").await.unwrap(), "closed");
    }
}
