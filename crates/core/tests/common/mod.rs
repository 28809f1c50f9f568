//! Test doubles for the bridge's environment capabilities.

// Not every test binary uses every double.
#![allow(dead_code)]

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use skybridge::{Bridge, BridgeEnv, BridgeOptions, MemoryStore, RouterConfig, RouterHost, RouterWindow};
use skybridge_protocol::{
    BridgeMetadata, ProviderCall, ProviderMetadata, RouterLaunch, SkappInfo, keys,
};
use skybridge_runtime::{
    Channel, EstablishOptions, Error as RuntimeError, FrameContext, FrameHandle, FrameHost,
    MethodHandler, PairTransport, SignalBus, TransportParts,
};

pub fn fast_options() -> BridgeOptions {
    BridgeOptions {
        establish: EstablishOptions {
            attempts: 2,
            retry_interval: Duration::from_millis(50),
        },
        router: RouterConfig {
            liveness_interval: Duration::from_millis(20),
            ping_timeout: Duration::from_millis(10),
        },
    }
}

pub fn sample_metadata() -> BridgeMetadata {
    BridgeMetadata {
        required_methods: vec!["identity".into()],
        router: RouterLaunch {
            address: "https://host.test/router.html".into(),
            window_title: "Choose a provider".into(),
            width: 500,
            height: 600,
        },
    }
}

pub fn sample_skapp() -> SkappInfo {
    SkappInfo {
        name: "skapp".into(),
        domain: "host.test".into(),
    }
}

/// Scripted provider answering over its side of the frame channel.
pub struct StubProvider {
    metadata: ProviderMetadata,
    pub reject_connect_popup: bool,
    pub reject_connect_silent: bool,
    pub fail_disconnect: bool,
    /// Methods received, in order.
    pub received: Mutex<Vec<String>>,
}

impl StubProvider {
    pub fn healthy(name: &str) -> Self {
        Self {
            // Already in normalized form, as a provider would report it.
            metadata: ProviderMetadata::new(name, format!("https://{name}.test")),
            reject_connect_popup: false,
            reject_connect_silent: false,
            fail_disconnect: false,
            received: Mutex::new(Vec::new()),
        }
    }

    pub fn metadata(&self) -> &ProviderMetadata {
        &self.metadata
    }

    pub fn rejecting_popup(mut self) -> Self {
        self.reject_connect_popup = true;
        self
    }

    pub fn rejecting_silent(mut self) -> Self {
        self.reject_connect_silent = true;
        self
    }

    pub fn failing_disconnect(mut self) -> Self {
        self.fail_disconnect = true;
        self
    }
}

impl MethodHandler for StubProvider {
    fn handle(
        &self,
        method: &str,
        params: Value,
    ) -> Pin<Box<dyn Future<Output = skybridge_runtime::Result<Value>> + Send + '_>> {
        self.received.lock().push(method.to_string());
        let call = ProviderCall::from_wire(method, params);
        Box::pin(async move {
            let call = call
                .map_err(|e| RuntimeError::Protocol(format!("unknown provider call: {e}")))?;
            match call {
                ProviderCall::GetProviderMetadata => {
                    Ok(serde_json::to_value(&self.metadata)?)
                }
                ProviderCall::ConnectPopup { .. } => {
                    if self.reject_connect_popup {
                        Err(RuntimeError::Remote {
                            name: "UserRejectionError".into(),
                            message: "the user rejected the connection".into(),
                        })
                    } else {
                        Ok(Value::Null)
                    }
                }
                ProviderCall::ConnectSilent { .. } => {
                    if self.reject_connect_silent {
                        Err(RuntimeError::Remote {
                            name: "NotAuthorizedError".into(),
                            message: "no standing authorization".into(),
                        })
                    } else {
                        Ok(Value::Null)
                    }
                }
                ProviderCall::Disconnect => {
                    if self.fail_disconnect {
                        Err(RuntimeError::Remote {
                            name: "Error".into(),
                            message: "disconnect blew up".into(),
                        })
                    } else {
                        Ok(Value::Null)
                    }
                }
                ProviderCall::CallInterface { call, args } => {
                    Ok(json!({ "call": call, "args": args }))
                }
            }
        })
    }
}

/// Frame host backed by in-process transport pairs.
///
/// Each created frame spawns the stub provider on the far side, unless
/// constructed `unanswered`, in which case the far endpoint is kept alive
/// but never accepts, so establishment exhausts its retries.
pub struct TestFrameHost {
    provider: Option<Arc<StubProvider>>,
    establish: EstablishOptions,
    pub created: Mutex<Vec<String>>,
    pub destroyed: Arc<AtomicU32>,
    parked: Mutex<Vec<TransportParts>>,
}

impl TestFrameHost {
    pub fn new(provider: Arc<StubProvider>) -> Self {
        Self {
            provider: Some(provider),
            establish: fast_options().establish,
            created: Mutex::new(Vec::new()),
            destroyed: Arc::new(AtomicU32::new(0)),
            parked: Mutex::new(Vec::new()),
        }
    }

    pub fn unanswered() -> Self {
        Self {
            provider: None,
            establish: fast_options().establish,
            created: Mutex::new(Vec::new()),
            destroyed: Arc::new(AtomicU32::new(0)),
            parked: Mutex::new(Vec::new()),
        }
    }

    pub fn created_urls(&self) -> Vec<String> {
        self.created.lock().clone()
    }

    pub fn destroyed_count(&self) -> u32 {
        self.destroyed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FrameHost for TestFrameHost {
    async fn create(&self, url: &str) -> skybridge_runtime::Result<FrameContext> {
        self.created.lock().push(url.to_string());
        let (bridge_side, provider_side) = PairTransport::pair();

        match &self.provider {
            Some(provider) => {
                let provider = Arc::clone(provider);
                let establish = self.establish;
                tokio::spawn(async move {
                    // The accepted channel must outlive the session driving it.
                    if let Ok(_channel) =
                        Channel::accept(provider_side, Some(provider), establish).await
                    {
                        std::future::pending::<()>().await;
                    }
                });
            }
            None => {
                // Keep the endpoint alive so the handshake times out instead
                // of failing fast on a closed transport.
                self.parked.lock().push(provider_side);
            }
        }

        let destroyed = Arc::clone(&self.destroyed);
        Ok(FrameContext {
            transport: bridge_side,
            handle: FrameHandle::new(url, move || {
                destroyed.fetch_add(1, Ordering::SeqCst);
            }),
        })
    }
}

/// What the scripted router does once opened.
#[derive(Debug, Clone)]
pub enum RouterScript {
    /// Immediately posts the given provider address.
    ChooseProvider(String),
    /// The user closes the window without choosing.
    CloseWithoutChoosing,
    /// The router reports an internal error.
    ReportError(String),
    /// The window opens dead: no keys, no ping answers.
    Unresponsive,
    /// The window stays alive but never posts anything.
    Hang,
}

struct AliveWindow;

#[async_trait]
impl RouterWindow for AliveWindow {
    async fn ping(&self) -> bool {
        true
    }
}

struct DeadWindow;

#[async_trait]
impl RouterWindow for DeadWindow {
    async fn ping(&self) -> bool {
        false
    }
}

/// Router host that follows a fixed script on open.
pub struct ScriptedRouter {
    bus: SignalBus,
    script: RouterScript,
    pub opened: Mutex<Vec<RouterLaunch>>,
}

impl ScriptedRouter {
    pub fn new(bus: SignalBus, script: RouterScript) -> Self {
        Self {
            bus,
            script,
            opened: Mutex::new(Vec::new()),
        }
    }

    pub fn opened_count(&self) -> usize {
        self.opened.lock().len()
    }
}

#[async_trait]
impl RouterHost for ScriptedRouter {
    async fn open(&self, launch: &RouterLaunch) -> skybridge::Result<Box<dyn RouterWindow>> {
        self.opened.lock().push(launch.clone());
        match &self.script {
            RouterScript::ChooseProvider(address) => {
                self.bus.set(keys::SUCCESS_ROUTER, address.clone());
                Ok(Box::new(AliveWindow))
            }
            RouterScript::CloseWithoutChoosing => {
                self.bus.set(keys::EVENT_ROUTER, "closed");
                Ok(Box::new(AliveWindow))
            }
            RouterScript::ReportError(message) => {
                self.bus.set(keys::ERROR_ROUTER, message.clone());
                Ok(Box::new(AliveWindow))
            }
            RouterScript::Unresponsive => Ok(Box::new(DeadWindow)),
            RouterScript::Hang => Ok(Box::new(AliveWindow)),
        }
    }
}

/// Fully wired bridge over test doubles.
pub struct TestEnv {
    pub bridge: Arc<Bridge>,
    pub frames: Arc<TestFrameHost>,
    pub store: Arc<MemoryStore>,
    pub router: Arc<ScriptedRouter>,
    pub bus: SignalBus,
}

impl TestEnv {
    pub fn new(script: RouterScript, frames: TestFrameHost) -> Self {
        let bus = SignalBus::new("https://host.test");
        let frames = Arc::new(frames);
        let store = Arc::new(MemoryStore::new());
        let router = Arc::new(ScriptedRouter::new(bus.clone(), script));

        let bridge = Arc::new(Bridge::with_options(
            sample_metadata(),
            BridgeEnv {
                store: Arc::clone(&store) as Arc<dyn skybridge::ProviderStore>,
                frames: Arc::clone(&frames) as Arc<dyn FrameHost>,
                router: Arc::clone(&router) as Arc<dyn RouterHost>,
                bus: bus.clone(),
            },
            fast_options(),
        ));

        Self {
            bridge,
            frames,
            store,
            router,
            bus,
        }
    }

    /// Records the host identity, as a well-behaved host does first.
    pub fn identify(&self) {
        self.bridge.get_bridge_metadata(sample_skapp());
    }
}
