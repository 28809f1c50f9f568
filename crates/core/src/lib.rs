//! In-page identity broker between a host skapp and identity providers.
//!
//! The bridge runs inside the host page and mediates every interaction with
//! identity providers: interactive login through a router window, silent
//! reconnection from a persisted record, capability calls against connected
//! providers, and teardown. Providers live in hidden isolated frames and are
//! reached over capability-call channels; the router shares only an
//! origin-scoped signaling medium with the bridge.
//!
//! Environment concerns (frame instantiation, window opening, persistence)
//! are injected through traits, so the broker itself is host-agnostic.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use skybridge::{Bridge, BridgeEnv, store::MemoryStore};
//! # use skybridge_protocol::{BridgeMetadata, RouterLaunch, SkappInfo};
//! # use skybridge_runtime::SignalBus;
//! # async fn example(frames: Arc<dyn skybridge_runtime::FrameHost>,
//! #                  router: Arc<dyn skybridge::router::RouterHost>) {
//! let bridge = Bridge::new(
//!     BridgeMetadata {
//!         required_methods: vec!["identity".into()],
//!         router: RouterLaunch {
//!             address: "https://host.example.com/router.html".into(),
//!             window_title: "Choose a provider".into(),
//!             width: 500,
//!             height: 600,
//!         },
//!     },
//!     BridgeEnv {
//!         store: Arc::new(MemoryStore::new()),
//!         frames,
//!         router,
//!         bus: SignalBus::new("https://host.example.com"),
//!     },
//! );
//!
//! bridge.get_bridge_metadata(SkappInfo {
//!     name: "skapp".into(),
//!     domain: "host.example.com".into(),
//! });
//! bridge.login_popup(&"identity".into()).await.unwrap();
//! # }
//! ```

mod bridge;
mod error;
mod orchestrator;
mod provider;
pub mod registry;
pub mod router;
mod server;
pub mod store;

pub use bridge::{Bridge, BridgeEnv, BridgeOptions};
pub use error::{BridgeError, Result};
pub use provider::ProviderClient;
pub use registry::{Lookup, ProviderSession, SessionRegistry};
pub use router::{RouterConfig, RouterHost, RouterWindow};
pub use server::BridgeServer;
pub use store::{JsonFileStore, MemoryStore, NoopStore, ProviderStore, open_store};
