//! Provider frame lifecycle and address normalization.
//!
//! The bridge never touches the environment that actually hosts a provider;
//! it goes through a [`FrameHost`] that knows how to instantiate a hidden,
//! isolated context at a URL and hand back its messaging endpoint. The
//! manager's own job is address normalization and teardown bookkeeping.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::transport::TransportParts;

/// Environment capability that instantiates isolated provider contexts.
#[async_trait]
pub trait FrameHost: Send + Sync {
    /// Creates a hidden, isolated context navigated to `url` and returns its
    /// messaging endpoint plus a teardown handle. `url` is already
    /// normalized.
    async fn create(&self, url: &str) -> Result<FrameContext>;
}

/// A freshly created provider context.
pub struct FrameContext {
    /// Messaging endpoint into the context.
    pub transport: TransportParts,
    /// Teardown handle, owned by the session for its lifetime.
    pub handle: FrameHandle,
}

/// Handle to a live provider context.
///
/// Detaching releases the context's resources; the callback is supplied by
/// the [`FrameHost`] that created it.
pub struct FrameHandle {
    url: String,
    detach: Option<Box<dyn FnOnce() + Send>>,
}

impl FrameHandle {
    pub fn new(url: impl Into<String>, detach: impl FnOnce() + Send + 'static) -> Self {
        Self {
            url: url.into(),
            detach: Some(Box::new(detach)),
        }
    }

    /// Handle with no teardown action, for hosts with nothing to release.
    pub fn detached(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            detach: None,
        }
    }

    /// URL the context was navigated to.
    pub fn url(&self) -> &str {
        &self.url
    }

    fn detach(mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl fmt::Debug for FrameHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameHandle").field("url", &self.url).finish()
    }
}

/// Creates and destroys provider frames through an injected [`FrameHost`].
#[derive(Clone)]
pub struct FrameManager {
    host: Arc<dyn FrameHost>,
}

impl FrameManager {
    pub fn new(host: Arc<dyn FrameHost>) -> Self {
        Self { host }
    }

    /// Normalizes `address` and instantiates a provider context there.
    pub async fn create(&self, address: &str) -> Result<FrameContext> {
        let url = normalize_address(address);
        tracing::debug!(target: "skybridge.frame", %url, "creating provider frame");
        self.host.create(&url).await
    }

    /// Detaches a provider context, releasing its resources.
    pub fn destroy(&self, handle: FrameHandle) {
        tracing::debug!(target: "skybridge.frame", url = %handle.url(), "destroying provider frame");
        handle.detach();
    }
}

/// Normalizes a provider address for frame creation.
///
/// Prefixes `https://` when no scheme is present. Addresses in the naming
/// scheme's content-addressed subdomain form carry an extra label at index 1
/// (`name.<content-id>.portal.tld`); that label is dropped before use. This
/// is a pass-through quirk of the naming scheme, not interpretation of the
/// URL.
pub fn normalize_address(address: &str) -> String {
    let with_scheme = if address.contains("://") {
        address.to_string()
    } else {
        format!("https://{address}")
    };

    let Some(scheme_end) = with_scheme.find("://") else {
        return with_scheme;
    };
    let authority_start = scheme_end + 3;
    let authority_end = with_scheme[authority_start..]
        .find('/')
        .map(|i| authority_start + i)
        .unwrap_or(with_scheme.len());

    let host = &with_scheme[authority_start..authority_end];
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() < 3 {
        return with_scheme;
    }

    let mut kept = Vec::with_capacity(labels.len() - 1);
    for (i, label) in labels.iter().enumerate() {
        if i != 1 {
            kept.push(*label);
        }
    }

    format!(
        "{}{}{}",
        &with_scheme[..authority_start],
        kept.join("."),
        &with_scheme[authority_end..]
    )
}
