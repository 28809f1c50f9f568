//! Identity records exchanged between host, bridge, router, and provider.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Logical capability slot a provider session is registered under.
///
/// Opaque to the broker; used as the key into the session registry and the
/// persistence store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InterfaceName(String);

impl InterfaceName {
	pub fn new(name: impl Into<String>) -> Self {
		Self(name.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for InterfaceName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for InterfaceName {
	fn from(name: &str) -> Self {
		Self(name.to_string())
	}
}

impl From<String> for InterfaceName {
	fn from(name: String) -> Self {
		Self(name)
	}
}

/// Identity of the host page embedding the bridge.
///
/// Attached once per bridge lifetime via `getBridgeMetadata`; required before
/// any login flow runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkappInfo {
	pub name: String,
	pub domain: String,
}

/// Self-description a provider returns immediately after connection.
///
/// This is the authoritative record persisted for silent logins. Connector
/// fields describe the provider's own user-interactive surface and are passed
/// through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderMetadata {
	pub name: String,
	pub url: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub relative_connector_path: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub connector_name: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub connector_w: Option<u32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub connector_h: Option<u32>,
}

impl ProviderMetadata {
	/// Minimal metadata with only the required fields set.
	pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			url: url.into(),
			relative_connector_path: None,
			connector_name: None,
			connector_w: None,
			connector_h: None,
		}
	}
}

/// Launch parameters for the router window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouterLaunch {
	/// Address the router window navigates to (host-origin-matching).
	pub address: String,
	pub window_title: String,
	pub width: u32,
	pub height: u32,
}

/// Static bridge configuration returned to the host.
///
/// Immutable after bridge construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeMetadata {
	/// Minimum capability set a provider must satisfy.
	pub required_methods: Vec<String>,
	/// How the host should launch the router window.
	pub router: RouterLaunch,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn interface_name_is_transparent_on_the_wire() {
		let name = InterfaceName::from("identity");
		let json = serde_json::to_string(&name).unwrap();
		assert_eq!(json, "\"identity\"");

		let back: InterfaceName = serde_json::from_str(&json).unwrap();
		assert_eq!(back, name);
	}

	#[test]
	fn provider_metadata_omits_absent_connector_fields() {
		let metadata = ProviderMetadata::new("crane", "https://crane.example.com");
		let value = serde_json::to_value(&metadata).unwrap();

		assert_eq!(value["name"], "crane");
		assert_eq!(value["url"], "https://crane.example.com");
		assert!(value.get("relativeConnectorPath").is_none());
		assert!(value.get("connectorW").is_none());
	}

	#[test]
	fn provider_metadata_round_trips_with_connector_fields() {
		let metadata = ProviderMetadata {
			connector_name: Some("connector.html".into()),
			relative_connector_path: Some("connector/".into()),
			connector_w: Some(400),
			connector_h: Some(500),
			..ProviderMetadata::new("crane", "https://crane.example.com")
		};

		let json = serde_json::to_string(&metadata).unwrap();
		let back: ProviderMetadata = serde_json::from_str(&json).unwrap();
		assert_eq!(back, metadata);
	}

	#[test]
	fn bridge_metadata_serializes_camel_case() {
		let metadata = BridgeMetadata {
			required_methods: vec!["identity".into()],
			router: RouterLaunch {
				address: "https://host.example.com/router.html".into(),
				window_title: "Choose a provider".into(),
				width: 500,
				height: 600,
			},
		};

		let value = serde_json::to_value(&metadata).unwrap();
		assert_eq!(value["requiredMethods"][0], "identity");
		assert_eq!(value["router"]["windowTitle"], "Choose a provider");
	}
}
