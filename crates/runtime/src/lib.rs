//! skybridge runtime - channels, frames, and signaling
//!
//! This crate provides the low-level infrastructure the bridge core builds
//! on. Every execution context (host, provider frame, router window) is an
//! independently-failing actor reachable only through narrow channels:
//!
//! - **Transport**: bidirectional message plumbing between two contexts
//! - **Connection**: SYN/ACK handshake with bounded retries, then
//!   request/response correlation and inbound method dispatch
//! - **Frame**: creating and destroying isolated provider contexts, with
//!   address normalization
//! - **Signal**: an origin-scoped broadcast key/value channel with
//!   consume-on-read delivery (the storage-event analog)
//!
//! The concrete environments live behind traits ([`FrameHost`],
//! [`Transport`]) so the broker core stays testable fully in-process.

pub mod connection;
pub mod error;
pub mod frame;
pub mod signal;
pub mod transport;

pub use connection::{Channel, EstablishOptions, Message, MethodHandler, RemoteErrorPayload};
pub use error::{Error, Result};
pub use frame::{FrameContext, FrameHandle, FrameHost, FrameManager, normalize_address};
pub use signal::{SignalBus, SignalEvent, SignalWatcher};
pub use transport::{PairTransport, Transport, TransportParts, TransportReceiver};
