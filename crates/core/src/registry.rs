//! Session registry: at most one session per interface name.
//!
//! A login claims its interface name before any asynchronous work starts, so
//! two overlapping logins for the same name cannot both proceed. The claim is
//! an RAII reservation: committing it installs the session, dropping it
//! uncommitted releases the name.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use skybridge_protocol::{InterfaceName, ProviderMetadata};
use skybridge_runtime::{Channel, FrameHandle};

use crate::error::{BridgeError, Result};

/// A connected provider session.
pub struct ProviderSession {
    channel: Channel,
    metadata: ProviderMetadata,
    /// Frame handle, taken out once during teardown.
    frame: Mutex<Option<FrameHandle>>,
}

impl ProviderSession {
    pub fn new(channel: Channel, metadata: ProviderMetadata, frame: FrameHandle) -> Self {
        Self {
            channel,
            metadata,
            frame: Mutex::new(Some(frame)),
        }
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn metadata(&self) -> &ProviderMetadata {
        &self.metadata
    }

    /// Takes the frame handle for teardown. Returns `None` if already taken.
    pub fn take_frame(&self) -> Option<FrameHandle> {
        self.frame.lock().take()
    }
}

enum Slot {
    /// A login for this name is in flight.
    Pending,
    Active(Arc<ProviderSession>),
}

/// What the registry holds for a name.
pub enum Lookup {
    Missing,
    /// Login in flight, no session yet.
    Pending,
    Active(Arc<ProviderSession>),
}

/// Tracks provider sessions keyed by interface name.
#[derive(Default)]
pub struct SessionRegistry {
    slots: Mutex<HashMap<InterfaceName, Slot>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, name: &InterfaceName) -> bool {
        self.slots.lock().contains_key(name)
    }

    pub fn lookup(&self, name: &InterfaceName) -> Lookup {
        match self.slots.lock().get(name) {
            None => Lookup::Missing,
            Some(Slot::Pending) => Lookup::Pending,
            Some(Slot::Active(session)) => Lookup::Active(Arc::clone(session)),
        }
    }

    /// Claims `name` for an in-flight login.
    ///
    /// Fails with [`BridgeError::AlreadyLoaded`] when the name is taken,
    /// whether by an active session or another login still in flight.
    pub fn reserve(self: &Arc<Self>, name: &InterfaceName) -> Result<SlotReservation> {
        let mut slots = self.slots.lock();
        if slots.contains_key(name) {
            return Err(BridgeError::AlreadyLoaded { name: name.clone() });
        }
        slots.insert(name.clone(), Slot::Pending);
        tracing::debug!(target: "skybridge.registry", %name, "slot reserved");
        Ok(SlotReservation {
            registry: Arc::clone(self),
            name: name.clone(),
            committed: false,
        })
    }

    /// Removes the slot for `name`, returning the session if one was active.
    pub fn remove(&self, name: &InterfaceName) -> Option<Arc<ProviderSession>> {
        match self.slots.lock().remove(name) {
            Some(Slot::Active(session)) => Some(session),
            _ => None,
        }
    }
}

/// RAII claim on an interface name during login.
///
/// Dropping without [`SlotReservation::commit`] releases the name so a later
/// login can retry.
pub struct SlotReservation {
    registry: Arc<SessionRegistry>,
    name: InterfaceName,
    committed: bool,
}

impl SlotReservation {
    pub fn name(&self) -> &InterfaceName {
        &self.name
    }

    /// Installs the finished session into the claimed slot.
    pub fn commit(mut self, session: ProviderSession) {
        self.registry
            .slots
            .lock()
            .insert(self.name.clone(), Slot::Active(Arc::new(session)));
        self.committed = true;
        tracing::debug!(target: "skybridge.registry", name = %self.name, "session registered");
    }
}

impl fmt::Debug for SlotReservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotReservation")
            .field("name", &self.name)
            .field("committed", &self.committed)
            .finish()
    }
}

impl Drop for SlotReservation {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        let mut slots = self.registry.slots.lock();
        // Only release our own pending claim; an active session stays.
        if matches!(slots.get(&self.name), Some(Slot::Pending)) {
            slots.remove(&self.name);
            tracing::debug!(target: "skybridge.registry", name = %self.name, "slot released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserve_rejects_duplicate_names() {
        let registry = Arc::new(SessionRegistry::new());
        let name = InterfaceName::from("identity");

        let first = registry.reserve(&name).unwrap();
        let err = registry.reserve(&name).unwrap_err();
        assert!(matches!(err, BridgeError::AlreadyLoaded { .. }));
        drop(first);
    }

    #[test]
    fn dropped_reservation_releases_the_name() {
        let registry = Arc::new(SessionRegistry::new());
        let name = InterfaceName::from("identity");

        drop(registry.reserve(&name).unwrap());
        assert!(!registry.has(&name));
        assert!(registry.reserve(&name).is_ok());
    }

    #[test]
    fn pending_slot_is_visible_to_lookup() {
        let registry = Arc::new(SessionRegistry::new());
        let name = InterfaceName::from("identity");

        let reservation = registry.reserve(&name).unwrap();
        assert!(matches!(registry.lookup(&name), Lookup::Pending));
        drop(reservation);
        assert!(matches!(registry.lookup(&name), Lookup::Missing));
    }

    #[test]
    fn remove_on_missing_name_returns_none() {
        let registry = SessionRegistry::new();
        assert!(registry.remove(&"identity".into()).is_none());
    }
}
