//! Closed call sets for each remote role.
//!
//! Channels carry `(method, params)` pairs. Rather than string-matching
//! method names at every dispatch site, each role's supported operations are
//! a closed enum that round-trips to the wire pair, so dispatch is exhaustive
//! at compile time and an unknown method fails in exactly one place.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{InterfaceName, SkappInfo};

/// Operations the bridge exposes to the host skapp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "camelCase")]
pub enum HostCall {
	/// Records host identity and returns static bridge metadata. Must be
	/// called before any login method.
	GetBridgeMetadata { skapp: SkappInfo },
	/// Full interactive login via the router.
	LoginPopup { interface: InterfaceName },
	/// Reconnect using the persisted provider record, no user interaction.
	LoginSilent { interface: InterfaceName },
	/// Disconnect and tear down the named session.
	Logout { interface: InterfaceName },
	/// Forward a capability call to the connected provider.
	CallInterface {
		interface: InterfaceName,
		call: String,
		#[serde(default)]
		args: Vec<Value>,
	},
}

/// Operations a provider exposes to the bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "camelCase")]
pub enum ProviderCall {
	/// Provider self-description, fetched right after the handshake.
	GetProviderMetadata,
	/// User-interactive connect.
	ConnectPopup { skapp: SkappInfo },
	/// Non-interactive connect for silent login.
	ConnectSilent { skapp: SkappInfo },
	/// Graceful disconnect before teardown.
	Disconnect,
	/// Capability call forwarded from the host.
	CallInterface {
		call: String,
		#[serde(default)]
		args: Vec<Value>,
	},
}

macro_rules! wire_impl {
	($ty:ty) => {
		impl $ty {
			/// Splits the call into the `(method, params)` pair a channel sends.
			pub fn to_wire(&self) -> (String, Value) {
				// The adjacently-tagged representation is exactly the wire shape.
				let value = serde_json::to_value(self).expect("call enums always serialize");
				let method = value["method"].as_str().expect("tag is a string").to_string();
				let params = value.get("params").cloned().unwrap_or(Value::Null);
				(method, params)
			}

			/// Reassembles a call from a received `(method, params)` pair.
			///
			/// Fails on unknown methods and malformed params.
			pub fn from_wire(method: &str, params: Value) -> Result<Self, serde_json::Error> {
				let envelope = if params.is_null() {
					serde_json::json!({ "method": method })
				} else {
					serde_json::json!({ "method": method, "params": params })
				};
				serde_json::from_value(envelope)
			}
		}
	};
}

wire_impl!(HostCall);
wire_impl!(ProviderCall);

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn host_call_wire_round_trip() {
		let call = HostCall::LoginPopup {
			interface: "identity".into(),
		};
		let (method, params) = call.to_wire();
		assert_eq!(method, "loginPopup");
		assert_eq!(params, json!({ "interface": "identity" }));

		let back = HostCall::from_wire(&method, params).unwrap();
		assert_eq!(back, call);
	}

	#[test]
	fn provider_call_without_params_round_trips() {
		let (method, params) = ProviderCall::Disconnect.to_wire();
		assert_eq!(method, "disconnect");
		assert_eq!(params, Value::Null);

		let back = ProviderCall::from_wire(&method, Value::Null).unwrap();
		assert_eq!(back, ProviderCall::Disconnect);
	}

	#[test]
	fn call_interface_defaults_missing_args() {
		let back = HostCall::from_wire(
			"callInterface",
			json!({ "interface": "identity", "call": "identity" }),
		)
		.unwrap();
		assert_eq!(
			back,
			HostCall::CallInterface {
				interface: "identity".into(),
				call: "identity".into(),
				args: vec![],
			}
		);
	}

	#[test]
	fn unknown_method_is_rejected() {
		assert!(HostCall::from_wire("launchMissiles", Value::Null).is_err());
	}
}
