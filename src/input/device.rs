//! Device registry: lifetime of every real and synthetic input source

use std::fmt;

use indexmap::IndexMap;
use tracing::{debug, trace};

use super::events::{EventPayload, KeyboardState, MouseState, RawEvent};

/// Process-unique device identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeviceId(pub u32);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "device#{}", self.0)
    }
}

/// What kind of input a device produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    /// Mouse or other pointing device
    Pointer,
    Keyboard,
    Touch,
}

/// Whether a device is backed by hardware or created by the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceOrigin {
    Real,
    Synthetic,
}

/// Device-change notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceChange {
    Added(DeviceId, DeviceKind),
    Removed(DeviceId, DeviceKind),
}

/// One registered input source
#[derive(Debug, Clone)]
pub struct Device {
    id: DeviceId,
    kind: DeviceKind,
    origin: DeviceOrigin,
    name: String,
    enabled: bool,
    mouse: Option<MouseState>,
    keyboard: Option<KeyboardState>,
}

impl Device {
    pub fn id(&self) -> DeviceId {
        self.id
    }

    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    pub fn origin(&self) -> DeviceOrigin {
        self.origin
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Disabled devices do not record state
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Latest mouse state delivered to this device
    pub fn mouse_state(&self) -> Option<&MouseState> {
        self.mouse.as_ref()
    }

    /// Latest keyboard state delivered to this device
    pub fn keyboard_state(&self) -> Option<&KeyboardState> {
        self.keyboard.as_ref()
    }
}

/// Registry of live devices
///
/// Pairing is not stored here; see [`super::InputUsers`], which owns the
/// registry so that removal and unpairing happen in one step.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: IndexMap<DeviceId, Device>,
    next_id: u32,
    changes: Vec<DeviceChange>,
}

impl DeviceRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a virtual device and makes it visible to the input layer
    pub fn create_synthetic(&mut self, kind: DeviceKind, name: impl Into<String>) -> DeviceId {
        self.insert(kind, DeviceOrigin::Synthetic, name.into())
    }

    /// Registers a hardware device reported by the platform
    pub fn adopt_real(&mut self, kind: DeviceKind, name: impl Into<String>) -> DeviceId {
        self.insert(kind, DeviceOrigin::Real, name.into())
    }

    fn insert(&mut self, kind: DeviceKind, origin: DeviceOrigin, name: String) -> DeviceId {
        let id = DeviceId(self.next_id);
        self.next_id += 1;
        debug!(device = %id, ?kind, ?origin, name = %name, "Device added");
        self.devices.insert(
            id,
            Device {
                id,
                kind,
                origin,
                name,
                enabled: true,
                mouse: None,
                keyboard: None,
            },
        );
        self.changes.push(DeviceChange::Added(id, kind));
        id
    }

    /// Removes a device; returns `None` if it was already gone
    pub(crate) fn remove(&mut self, id: DeviceId) -> Option<Device> {
        let device = self.devices.shift_remove(&id)?;
        debug!(device = %id, name = %device.name, "Device removed");
        self.changes.push(DeviceChange::Removed(id, device.kind));
        Some(device)
    }

    pub fn get(&self, id: DeviceId) -> Option<&Device> {
        self.devices.get(&id)
    }

    pub fn contains(&self, id: DeviceId) -> bool {
        self.devices.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Iterate devices in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Device> {
        self.devices.values()
    }

    /// First registered device of `kind` and `origin`
    pub fn first_of(&self, kind: DeviceKind, origin: DeviceOrigin) -> Option<DeviceId> {
        self.devices
            .values()
            .find(|device| device.kind == kind && device.origin == origin)
            .map(|device| device.id)
    }

    /// Enables or disables a device; returns false if the device is unknown
    pub(crate) fn set_enabled(&mut self, id: DeviceId, enabled: bool) -> bool {
        match self.devices.get_mut(&id) {
            Some(device) => {
                device.enabled = enabled;
                debug!(device = %id, enabled, "Device enabled state changed");
                true
            }
            None => false,
        }
    }

    /// Stores the state carried by `event` on its device
    pub(crate) fn record(&mut self, event: &RawEvent) {
        let Some(device) = self.devices.get_mut(&event.device) else {
            trace!(device = %event.device, "Dropping state for unknown device");
            return;
        };
        if !device.enabled {
            return;
        }
        match &event.payload {
            EventPayload::Mouse(state) => device.mouse = Some(*state),
            EventPayload::Keyboard(state) => device.keyboard = Some(state.clone()),
            EventPayload::Text(_) | EventPayload::Touch(_) => {}
        }
    }

    /// Takes pending added/removed notifications in the order they happened
    pub fn drain_changes(&mut self) -> Vec<DeviceChange> {
        std::mem::take(&mut self.changes)
    }
}

/// Devices created on behalf of one owning scope
///
/// The owner calls [`DeviceScope::release_all`] from its teardown path;
/// release is idempotent, so calling it again is a no-op.
#[derive(Debug, Default)]
pub struct DeviceScope {
    devices: Vec<DeviceId>,
}

impl DeviceScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a device to this scope and returns it
    pub fn track(&mut self, id: DeviceId) -> DeviceId {
        self.devices.push(id);
        id
    }

    pub fn devices(&self) -> &[DeviceId] {
        &self.devices
    }

    /// Releases every tracked device and forgets them
    pub fn release_all(&mut self, users: &mut super::InputUsers) {
        for id in self.devices.drain(..) {
            users.release_device(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_never_reused() {
        let mut registry = DeviceRegistry::new();
        let a = registry.create_synthetic(DeviceKind::Pointer, "a");
        registry.remove(a);
        let b = registry.create_synthetic(DeviceKind::Pointer, "b");
        assert_ne!(a, b);
        assert!(!registry.contains(a));
        assert!(registry.contains(b));
    }

    #[test]
    fn test_changes_are_reported_in_order() {
        let mut registry = DeviceRegistry::new();
        let keyboard = registry.adopt_real(DeviceKind::Keyboard, "Keyboard");
        registry.remove(keyboard);
        assert_eq!(
            registry.drain_changes(),
            vec![
                DeviceChange::Added(keyboard, DeviceKind::Keyboard),
                DeviceChange::Removed(keyboard, DeviceKind::Keyboard),
            ]
        );
        assert!(registry.drain_changes().is_empty());
    }

    #[test]
    fn test_first_of_respects_origin() {
        let mut registry = DeviceRegistry::new();
        let synthetic = registry.create_synthetic(DeviceKind::Pointer, "virtual");
        let real = registry.adopt_real(DeviceKind::Pointer, "Mouse");
        assert_eq!(
            registry.first_of(DeviceKind::Pointer, DeviceOrigin::Real),
            Some(real)
        );
        assert_eq!(
            registry.first_of(DeviceKind::Pointer, DeviceOrigin::Synthetic),
            Some(synthetic)
        );
        assert_eq!(registry.first_of(DeviceKind::Touch, DeviceOrigin::Real), None);
    }

    #[test]
    fn test_disabled_device_ignores_state() {
        let mut registry = DeviceRegistry::new();
        let mouse = registry.adopt_real(DeviceKind::Pointer, "Mouse");
        registry.set_enabled(mouse, false);
        registry.record(&RawEvent::mouse(mouse, 0.0, MouseState::at([1.0, 1.0])));
        assert!(registry.get(mouse).and_then(Device::mouse_state).is_none());
    }
}
