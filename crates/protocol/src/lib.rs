//! Wire and data types shared by every skybridge role.
//!
//! The broker coordinates four actors - host skapp, bridge, router, and
//! provider - that only ever exchange serialized values. This crate holds the
//! types those exchanges are made of:
//!
//! - [`types`] - identity records (`SkappInfo`, `ProviderMetadata`, ...)
//! - [`calls`] - closed call enums per role (`HostCall`, `ProviderCall`)
//! - [`keys`] - the signaling-channel key schema and storage key builder
//!
//! No IO happens here; everything is plain serde.

pub mod calls;
pub mod keys;
pub mod types;

pub use calls::{HostCall, ProviderCall};
pub use types::{BridgeMetadata, InterfaceName, ProviderMetadata, RouterLaunch, SkappInfo};
