//! Scripted end-to-end run against an in-process provider.
//!
//! Everything a real host environment would supply (frames, router window,
//! signaling) is stood in by in-process doubles, so the whole broker can be
//! exercised from a terminal. With `--store`, a second run reconnects
//! silently from the record the first run persisted.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::{Value, json};
use skybridge::{Bridge, BridgeEnv, RouterHost, RouterWindow, open_store};
use skybridge_protocol::{
	BridgeMetadata, ProviderCall, ProviderMetadata, RouterLaunch, SkappInfo, keys,
};
use skybridge_runtime::{
	Channel, EstablishOptions, Error as RuntimeError, FrameContext, FrameHandle, FrameHost,
	MethodHandler, PairTransport, SignalBus,
};
use tracing::info;

const DEMO_ORIGIN: &str = "https://skapp.localhost";
const DEMO_PROVIDER_ADDRESS: &str = "crane.portal.localhost";

pub async fn run(store: Option<PathBuf>, interface: &str) -> anyhow::Result<()> {
	let bus = SignalBus::new(DEMO_ORIGIN);
	let bridge = Bridge::new(
		BridgeMetadata {
			required_methods: vec![interface.to_string()],
			router: RouterLaunch {
				address: format!("{DEMO_ORIGIN}/router.html"),
				window_title: "Choose a provider".into(),
				width: 500,
				height: 600,
			},
		},
		BridgeEnv {
			store: open_store(store),
			frames: Arc::new(DemoFrameHost),
			router: Arc::new(AutoRouter { bus: bus.clone() }),
			bus,
		},
	);

	bridge.get_bridge_metadata(SkappInfo {
		name: "skybridge-demo".into(),
		domain: "skapp.localhost".into(),
	});

	let name = interface.into();
	match bridge.login_silent(&name).await {
		Ok(()) => info!(target: "skybridge", %name, "reconnected silently"),
		Err(err) => {
			info!(target: "skybridge", %name, %err, "silent login unavailable, using the router");
			bridge
				.login_popup(&name)
				.await
				.context("interactive login failed")?;
		}
	}

	let result = bridge
		.call_interface(&name, "identity", vec![json!("who-am-i")])
		.await
		.context("capability call failed")?;
	println!("{}", serde_json::to_string_pretty(&result)?);

	bridge.logout(&name).await.context("logout failed")?;
	info!(target: "skybridge", %name, "session closed");
	Ok(())
}

/// Provider living behind the demo frames.
struct DemoProvider;

impl MethodHandler for DemoProvider {
	fn handle(
		&self,
		method: &str,
		params: Value,
	) -> Pin<Box<dyn Future<Output = skybridge_runtime::Result<Value>> + Send + '_>> {
		let call = ProviderCall::from_wire(method, params);
		Box::pin(async move {
			let call =
				call.map_err(|e| RuntimeError::Protocol(format!("unknown provider call: {e}")))?;
			match call {
				ProviderCall::GetProviderMetadata => Ok(serde_json::to_value(
					// Normalized form of DEMO_PROVIDER_ADDRESS.
					ProviderMetadata::new("crane", "https://crane.localhost"),
				)?),
				ProviderCall::ConnectPopup { skapp } | ProviderCall::ConnectSilent { skapp } => {
					info!(target: "skybridge.demo", skapp = %skapp.name, "provider connected");
					Ok(Value::Null)
				}
				ProviderCall::Disconnect => Ok(Value::Null),
				ProviderCall::CallInterface { call, args } => {
					Ok(json!({ "provider": "crane", "call": call, "args": args }))
				}
			}
		})
	}
}

/// Frame host that runs [`DemoProvider`] behind every created frame.
struct DemoFrameHost;

#[async_trait]
impl FrameHost for DemoFrameHost {
	async fn create(&self, url: &str) -> skybridge_runtime::Result<FrameContext> {
		info!(target: "skybridge.demo", %url, "provider frame created");
		let (bridge_side, provider_side) = PairTransport::pair();

		tokio::spawn(async move {
			if let Ok(_channel) = Channel::accept(
				provider_side,
				Some(Arc::new(DemoProvider)),
				EstablishOptions::default(),
			)
			.await
			{
				std::future::pending::<()>().await;
			}
		});

		let url = url.to_string();
		Ok(FrameContext {
			handle: FrameHandle::new(url.clone(), move || {
				info!(target: "skybridge.demo", %url, "provider frame destroyed");
			}),
			transport: bridge_side,
		})
	}
}

/// Router window whose user always picks the demo provider.
struct AutoRouter {
	bus: SignalBus,
}

struct AutoWindow;

#[async_trait]
impl RouterWindow for AutoWindow {
	async fn ping(&self) -> bool {
		true
	}
}

#[async_trait]
impl RouterHost for AutoRouter {
	async fn open(&self, launch: &RouterLaunch) -> skybridge::Result<Box<dyn RouterWindow>> {
		info!(target: "skybridge.demo", title = %launch.window_title, "router opened");
		self.bus.set(keys::SUCCESS_ROUTER, DEMO_PROVIDER_ADDRESS);
		Ok(Box::new(AutoWindow))
	}
}
