//! Router protocol: wait for the user's provider choice.
//!
//! The router window runs on the host origin and shares only the signaling
//! medium with the bridge. After the host opens it, the bridge waits on a
//! three-way race: the router posts a provider address (success), the user
//! closes it (lifecycle event), or the router reports an error. A liveness
//! monitor pings the window in parallel so a crashed router cannot leave the
//! login hanging forever.

use std::time::Duration;

use async_trait::async_trait;
use skybridge_protocol::{ProviderMetadata, RouterLaunch, keys};
use skybridge_runtime::SignalBus;

use crate::error::{BridgeError, Result};

/// Handle onto an open router window.
#[async_trait]
pub trait RouterWindow: Send + Sync {
    /// Answers a liveness ping. `false` means the window is gone.
    async fn ping(&self) -> bool;
}

/// Environment capability that opens router windows.
#[async_trait]
pub trait RouterHost: Send + Sync {
    async fn open(&self, launch: &RouterLaunch) -> Result<Box<dyn RouterWindow>>;
}

/// Tunables for the router liveness monitor.
#[derive(Debug, Clone, Copy)]
pub struct RouterConfig {
    /// Interval between liveness pings.
    pub liveness_interval: Duration,
    /// How long a single ping may take before the window counts as dead.
    pub ping_timeout: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            liveness_interval: Duration::from_millis(5000),
            ping_timeout: Duration::from_millis(1000),
        }
    }
}

/// Discards router outcomes left over from an abandoned session.
///
/// A router the bridge gave up on (liveness timeout, dropped login) may
/// still write its outcome key afterwards; nobody consumes it, so it would
/// sit pending and resolve the next login instantly without any user
/// interaction. Called before a new router window is opened.
pub fn discard_stale_outcomes(bus: &SignalBus) {
    for key in [keys::SUCCESS_ROUTER, keys::EVENT_ROUTER, keys::ERROR_ROUTER] {
        if bus.take(key).is_some() {
            tracing::debug!(target: "skybridge.router", key, "discarded stale router key");
        }
    }
}

/// Waits for the router to resolve a provider address.
///
/// Resolves with the raw (un-normalized) address on success. The three
/// outcome keys and the liveness monitor race; the first to fire wins and
/// the rest are dropped.
pub async fn request_provider_address(
    bus: &SignalBus,
    window: &dyn RouterWindow,
    config: RouterConfig,
) -> Result<String> {
    let mut success = bus.watch();
    let mut lifecycle = bus.watch();
    let mut failure = bus.watch();

    tokio::select! {
        address = success.wait(keys::SUCCESS_ROUTER) => {
            let address = address?;
            tracing::debug!(target: "skybridge.router", %address, "router chose a provider");
            Ok(address)
        }
        _ = lifecycle.wait(keys::EVENT_ROUTER) => {
            tracing::debug!(target: "skybridge.router", "router closed without a choice");
            Err(BridgeError::RouterClosed)
        }
        message = failure.wait(keys::ERROR_ROUTER) => {
            let message = message?;
            tracing::warn!(target: "skybridge.router", %message, "router reported an error");
            Err(BridgeError::RouterError(message))
        }
        ms = monitor(window, config) => {
            tracing::warn!(target: "skybridge.router", ms, "router stopped responding");
            Err(BridgeError::RouterTimeout { ms })
        }
    }
}

/// Pings the window until it stops answering, then resolves with the
/// length of the failed liveness window (interval plus ping grace) in
/// milliseconds.
async fn monitor(window: &dyn RouterWindow, config: RouterConfig) -> u64 {
    let window_ms = (config.liveness_interval + config.ping_timeout).as_millis() as u64;
    loop {
        tokio::time::sleep(config.liveness_interval).await;
        match tokio::time::timeout(config.ping_timeout, window.ping()).await {
            Ok(true) => {}
            Ok(false) | Err(_) => return window_ms,
        }
    }
}

/// Reports the finished login back to the router so it can show the result.
pub fn report_success(bus: &SignalBus, metadata: &ProviderMetadata) {
    match serde_json::to_string(metadata) {
        Ok(json) => bus.set(keys::SUCCESS_BRIDGE, json),
        Err(e) => {
            tracing::error!(target: "skybridge.router", error = %e, "failed to encode provider metadata");
        }
    }
}

/// Reports a post-choice failure back to the router.
pub fn report_error(bus: &SignalBus, error: &BridgeError) {
    bus.set(keys::ERROR_BRIDGE, error.to_string());
}
