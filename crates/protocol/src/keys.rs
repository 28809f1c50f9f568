//! Well-known keys on the signaling channel and in the persistence store.
//!
//! The bridge and the router exchange state through a broadcast key/value
//! channel scoped to the host origin. Every key is consumed on observation,
//! so each carries exactly one delivery.

use crate::types::InterfaceName;

/// Router resolved a provider address for the bridge.
pub const SUCCESS_ROUTER: &str = "success-router";
/// Router closed without the user choosing a provider.
pub const EVENT_ROUTER: &str = "event-router";
/// Router hit an internal error.
pub const ERROR_ROUTER: &str = "error-router";
/// Bridge delivered provider metadata back to the router.
pub const SUCCESS_BRIDGE: &str = "success-bridge";
/// Bridge failed after receiving the provider address.
pub const ERROR_BRIDGE: &str = "error-bridge";

/// Persistence-store key for an interface's provider record.
pub fn interface_key(name: &InterfaceName) -> String {
	format!("interface:{name}")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn interface_key_is_namespaced() {
		assert_eq!(interface_key(&"identity".into()), "interface:identity");
	}
}
