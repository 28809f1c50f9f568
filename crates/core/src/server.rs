//! Host-facing channel handler: dispatches `HostCall`s to a [`Bridge`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;
use skybridge_protocol::HostCall;
use skybridge_runtime::{
    Channel, EstablishOptions, Error as RuntimeError, MethodHandler, TransportParts,
};

use crate::bridge::Bridge;
use crate::error::BridgeError;

/// Serves a bridge over a channel to the host skapp.
pub struct BridgeServer {
    bridge: Arc<Bridge>,
}

impl BridgeServer {
    pub fn new(bridge: Arc<Bridge>) -> Self {
        Self { bridge }
    }

    /// Accepts the host's channel handshake and exposes the bridge on it.
    pub async fn serve(
        self,
        parts: TransportParts,
        options: EstablishOptions,
    ) -> skybridge_runtime::Result<Channel> {
        Channel::accept(parts, Some(Arc::new(self)), options).await
    }

    async fn dispatch(&self, call: HostCall) -> Result<Value, BridgeError> {
        match call {
            HostCall::GetBridgeMetadata { skapp } => {
                let metadata = self.bridge.get_bridge_metadata(skapp);
                Ok(serde_json::to_value(metadata)?)
            }
            HostCall::LoginPopup { interface } => {
                self.bridge.login_popup(&interface).await?;
                Ok(Value::Null)
            }
            HostCall::LoginSilent { interface } => {
                self.bridge.login_silent(&interface).await?;
                Ok(Value::Null)
            }
            HostCall::Logout { interface } => {
                self.bridge.logout(&interface).await?;
                Ok(Value::Null)
            }
            HostCall::CallInterface {
                interface,
                call,
                args,
            } => self.bridge.call_interface(&interface, &call, args).await,
        }
    }
}

impl MethodHandler for BridgeServer {
    fn handle(
        &self,
        method: &str,
        params: Value,
    ) -> Pin<Box<dyn Future<Output = skybridge_runtime::Result<Value>> + Send + '_>> {
        let call = HostCall::from_wire(method, params);
        Box::pin(async move {
            let call = call.map_err(|e| {
                RuntimeError::Protocol(format!("unsupported host call: {e}"))
            })?;
            self.dispatch(call).await.map_err(|e| RuntimeError::Remote {
                name: e.kind().to_string(),
                message: e.to_string(),
            })
        })
    }
}
