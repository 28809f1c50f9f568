//! The bridge facade: the five operations a host skapp drives.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use skybridge_protocol::{BridgeMetadata, InterfaceName, RouterLaunch, SkappInfo, keys};
use skybridge_runtime::{EstablishOptions, FrameHost, FrameManager, SignalBus};

use crate::error::{BridgeError, Result};
use crate::orchestrator;
use crate::provider::ProviderClient;
use crate::registry::{Lookup, SessionRegistry};
use crate::router::{RouterConfig, RouterHost};
use crate::store::ProviderStore;

/// Environment capabilities the bridge is constructed over.
///
/// Everything the bridge touches outside its own state arrives here, which
/// is what lets the whole broker run against test doubles.
pub struct BridgeEnv {
    pub store: Arc<dyn ProviderStore>,
    pub frames: Arc<dyn FrameHost>,
    pub router: Arc<dyn RouterHost>,
    pub bus: SignalBus,
}

/// Tunables; defaults match production behavior.
#[derive(Debug, Clone, Copy, Default)]
pub struct BridgeOptions {
    pub establish: EstablishOptions,
    pub router: RouterConfig,
}

/// Shared state the login orchestrator works against.
pub(crate) struct BridgeParts {
    pub(crate) registry: Arc<SessionRegistry>,
    pub(crate) store: Arc<dyn ProviderStore>,
    pub(crate) frames: FrameManager,
    pub(crate) router: Arc<dyn RouterHost>,
    pub(crate) bus: SignalBus,
    pub(crate) launch: RouterLaunch,
    pub(crate) establish: EstablishOptions,
    pub(crate) router_config: RouterConfig,
}

/// In-page identity broker between a host skapp and provider sessions.
pub struct Bridge {
    metadata: BridgeMetadata,
    /// Host identity, recorded on the first `get_bridge_metadata`.
    skapp: Mutex<Option<SkappInfo>>,
    parts: BridgeParts,
}

impl Bridge {
    pub fn new(metadata: BridgeMetadata, env: BridgeEnv) -> Self {
        Self::with_options(metadata, env, BridgeOptions::default())
    }

    pub fn with_options(metadata: BridgeMetadata, env: BridgeEnv, options: BridgeOptions) -> Self {
        let launch = metadata.router.clone();
        Self {
            metadata,
            skapp: Mutex::new(None),
            parts: BridgeParts {
                registry: Arc::new(SessionRegistry::new()),
                store: env.store,
                frames: FrameManager::new(env.frames),
                router: env.router,
                bus: env.bus,
                launch,
                establish: options.establish,
                router_config: options.router,
            },
        }
    }

    /// Records the host's identity and returns the static bridge metadata.
    ///
    /// Must run before any login; the identity is handed to providers so
    /// they know who is connecting.
    pub fn get_bridge_metadata(&self, skapp: SkappInfo) -> BridgeMetadata {
        tracing::debug!(target: "skybridge.bridge", name = %skapp.name, domain = %skapp.domain, "host identity recorded");
        *self.skapp.lock() = Some(skapp);
        self.metadata.clone()
    }

    /// Full interactive login: router choice, provider launch, connect.
    pub async fn login_popup(&self, name: &InterfaceName) -> Result<()> {
        let skapp = self.skapp()?;
        orchestrator::login_popup(&self.parts, name, &skapp).await
    }

    /// Reconnects from the persisted record with no user interaction.
    pub async fn login_silent(&self, name: &InterfaceName) -> Result<()> {
        let skapp = self.skapp()?;
        orchestrator::login_silent(&self.parts, name, &skapp).await
    }

    /// Disconnects and tears down the session for `name`.
    ///
    /// The provider's graceful disconnect is attempted first, but teardown
    /// (registry, store, frame, channel) proceeds unconditionally even when
    /// it fails.
    pub async fn logout(&self, name: &InterfaceName) -> Result<()> {
        let session = match self.parts.registry.lookup(name) {
            Lookup::Missing => return Err(BridgeError::NotFound { name: name.clone() }),
            Lookup::Pending => return Err(BridgeError::NotConnected { name: name.clone() }),
            Lookup::Active(session) => session,
        };

        if let Err(e) = ProviderClient::new(session.channel()).disconnect().await {
            tracing::warn!(target: "skybridge.bridge", %name, error = %e, "provider disconnect failed, tearing down anyway");
        }

        self.parts.registry.remove(name);
        self.parts.store.remove(&keys::interface_key(name));
        if let Some(frame) = session.take_frame() {
            self.parts.frames.destroy(frame);
        }
        session.channel().close();
        tracing::info!(target: "skybridge.bridge", %name, "logged out");
        Ok(())
    }

    /// Forwards a capability call to the connected provider for `name`.
    pub async fn call_interface(
        &self,
        name: &InterfaceName,
        call: &str,
        args: Vec<Value>,
    ) -> Result<Value> {
        let session = match self.parts.registry.lookup(name) {
            Lookup::Missing => return Err(BridgeError::NotFound { name: name.clone() }),
            Lookup::Pending => return Err(BridgeError::NotConnected { name: name.clone() }),
            Lookup::Active(session) => session,
        };
        ProviderClient::new(session.channel())
            .call_interface(call, args)
            .await
    }

    fn skapp(&self) -> Result<SkappInfo> {
        self.skapp.lock().clone().ok_or(BridgeError::SkappNotSet)
    }
}
