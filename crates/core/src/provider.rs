//! Typed client for the provider side of a channel.

use serde_json::Value;
use skybridge_protocol::{ProviderCall, ProviderMetadata, SkappInfo};
use skybridge_runtime::Channel;

use crate::error::Result;

/// Issues the provider operations over an established channel.
pub struct ProviderClient<'a> {
    channel: &'a Channel,
}

impl<'a> ProviderClient<'a> {
    pub fn new(channel: &'a Channel) -> Self {
        Self { channel }
    }

    /// Fetches the provider's self-description.
    pub async fn get_provider_metadata(&self) -> Result<ProviderMetadata> {
        let value = self.send(ProviderCall::GetProviderMetadata).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Runs the provider's interactive connect flow.
    pub async fn connect_popup(&self, skapp: &SkappInfo) -> Result<()> {
        self.send(ProviderCall::ConnectPopup {
            skapp: skapp.clone(),
        })
        .await?;
        Ok(())
    }

    /// Runs the provider's non-interactive connect flow.
    pub async fn connect_silent(&self, skapp: &SkappInfo) -> Result<()> {
        self.send(ProviderCall::ConnectSilent {
            skapp: skapp.clone(),
        })
        .await?;
        Ok(())
    }

    /// Asks the provider to disconnect gracefully.
    pub async fn disconnect(&self) -> Result<()> {
        self.send(ProviderCall::Disconnect).await?;
        Ok(())
    }

    /// Forwards a capability call, returning the provider's raw result.
    pub async fn call_interface(&self, call: &str, args: Vec<Value>) -> Result<Value> {
        self.send(ProviderCall::CallInterface {
            call: call.to_string(),
            args,
        })
        .await
    }

    async fn send(&self, call: ProviderCall) -> Result<Value> {
        let (method, params) = call.to_wire();
        Ok(self.channel.call(&method, params).await?)
    }
}
