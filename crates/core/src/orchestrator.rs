//! Login orchestration: the state machines behind popup and silent login.
//!
//! Both flows claim the interface name first, so a concurrent login for the
//! same name fails fast with `AlreadyLoaded`. The popup flow drives the
//! router protocol and mirrors its outcome back on the signaling medium; the
//! silent flow replays a persisted record with no user interaction and
//! collapses every failure into one opaque error.

use skybridge_protocol::{InterfaceName, ProviderMetadata, SkappInfo, keys};
use skybridge_runtime::{Channel, FrameContext, FrameHandle};

use crate::bridge::BridgeParts;
use crate::error::{BridgeError, Result};
use crate::provider::ProviderClient;
use crate::registry::ProviderSession;
use crate::router;

/// Full interactive login for `name`.
///
/// Opens the router, waits for the user's provider choice, launches the
/// chosen provider in a hidden frame, and runs its interactive connect. The
/// outcome is mirrored to the router over the signaling medium either way.
pub(crate) async fn login_popup(
    parts: &BridgeParts,
    name: &InterfaceName,
    skapp: &SkappInfo,
) -> Result<()> {
    let reservation = parts.registry.reserve(name)?;
    router::discard_stale_outcomes(&parts.bus);

    tracing::debug!(target: "skybridge.login", %name, "opening router");
    let window = parts.router.open(&parts.launch).await?;

    tracing::debug!(target: "skybridge.login", %name, "awaiting provider address");
    let address =
        router::request_provider_address(&parts.bus, window.as_ref(), parts.router_config).await?;

    tracing::debug!(target: "skybridge.login", %name, %address, "launching provider");
    let (channel, frame, metadata) = match launch(parts, &address).await {
        Ok(launched) => launched,
        Err(e) => {
            router::report_error(&parts.bus, &e);
            return Err(e);
        }
    };

    // The router shows the chosen provider's details while connect runs.
    router::report_success(&parts.bus, &metadata);

    tracing::debug!(target: "skybridge.login", %name, provider = %metadata.name, "awaiting provider connect");
    if let Err(e) = ProviderClient::new(&channel).connect_popup(skapp).await {
        // Past the launch stage nothing speaks back to the router; the
        // failure goes to the caller only. The provider surface stays up
        // (the user may retry inside it) and only the claim is released.
        return Err(BridgeError::PopupLogin {
            source: Box::new(e),
        });
    }

    tracing::info!(target: "skybridge.login", %name, provider = %metadata.name, "connected");
    parts.store.set(&keys::interface_key(name), &metadata);
    reservation.commit(ProviderSession::new(channel, metadata, frame));
    Ok(())
}

/// Reconnects `name` using the persisted provider record.
///
/// Any failure clears the stale record and surfaces as the single opaque
/// [`BridgeError::SilentLogin`]; the caller falls back to the popup flow.
pub(crate) async fn login_silent(
    parts: &BridgeParts,
    name: &InterfaceName,
    skapp: &SkappInfo,
) -> Result<()> {
    let reservation = parts.registry.reserve(name)?;
    let key = keys::interface_key(name);

    match try_silent(parts, &key, skapp).await {
        Ok((channel, frame, metadata)) => {
            tracing::info!(target: "skybridge.login", %name, provider = %metadata.name, "reconnected silently");
            parts.store.set(&key, &metadata);
            reservation.commit(ProviderSession::new(channel, metadata, frame));
            Ok(())
        }
        Err(e) => {
            tracing::debug!(target: "skybridge.login", %name, error = %e, "silent login failed");
            // The record led nowhere; drop it so the next visit goes
            // straight to the popup flow.
            parts.store.remove(&key);
            Err(BridgeError::SilentLogin)
        }
    }
}

async fn try_silent(
    parts: &BridgeParts,
    key: &str,
    skapp: &SkappInfo,
) -> Result<(Channel, FrameHandle, ProviderMetadata)> {
    let record = parts.store.get(key).ok_or(BridgeError::SilentLogin)?;
    let (channel, frame, metadata) = launch(parts, &record.url).await?;

    if let Err(e) = ProviderClient::new(&channel).connect_silent(skapp).await {
        channel.close();
        parts.frames.destroy(frame);
        return Err(e);
    }
    Ok((channel, frame, metadata))
}

/// Creates the provider frame, establishes its channel, and fetches the
/// provider's self-description.
async fn launch(
    parts: &BridgeParts,
    address: &str,
) -> Result<(Channel, FrameHandle, ProviderMetadata)> {
    let FrameContext { transport, handle } = parts.frames.create(address).await?;

    let channel = match Channel::establish(transport, None, parts.establish).await {
        Ok(channel) => channel,
        Err(e) => {
            parts.frames.destroy(handle);
            return Err(e.into());
        }
    };

    let metadata = match ProviderClient::new(&channel).get_provider_metadata().await {
        Ok(metadata) => metadata,
        Err(e) => {
            channel.close();
            parts.frames.destroy(handle);
            return Err(e);
        }
    };

    Ok((channel, handle, metadata))
}
