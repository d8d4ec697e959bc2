//! Device registry and user table kept behind one owner
//!
//! Every mutation of a pairing touches the registry-side owner map and the
//! user's device set inside the same `&mut self` call, so an ownership
//! lookup can never observe one updated without the other.

use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, warn};

use super::actions::ActionBindingSet;
use super::device::{DeviceChange, DeviceId, DeviceKind, DeviceRegistry};
use super::events::RawEvent;
use super::users::{User, UserId, UserIndexAllocator};
use crate::error::{InputError, Result};

/// Read-only ownership queries used on the per-frame path
pub trait OwnershipLookup {
    /// The user the device is paired to, if any
    fn owner_of(&self, device: DeviceId) -> Option<UserId>;

    /// Whether the user currently exists
    fn has_user(&self, user: UserId) -> bool;
}

/// Devices, users and the pairing between them
#[derive(Debug, Default)]
pub struct InputUsers {
    registry: DeviceRegistry,
    users: IndexMap<UserId, User>,
    owners: HashMap<DeviceId, UserId>,
}

impl InputUsers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a user with a fresh index and no paired devices
    pub fn create_user(&mut self, allocator: &mut UserIndexAllocator) -> UserId {
        let id = allocator.allocate();
        self.users.insert(id, User::new(id));
        debug!(user = %id, "User created");
        id
    }

    /// Removes a user, unpairing all of its devices
    pub fn remove_user(&mut self, id: UserId) -> Result<User> {
        let user = self
            .users
            .shift_remove(&id)
            .ok_or(InputError::UnknownUser(id))?;
        for device in &user.devices {
            self.owners.remove(device);
        }
        debug!(user = %id, devices = user.devices.len(), "User removed");
        Ok(user)
    }

    pub fn user(&self, id: UserId) -> Result<&User> {
        self.users.get(&id).ok_or(InputError::UnknownUser(id))
    }

    pub fn user_mut(&mut self, id: UserId) -> Result<&mut User> {
        self.users.get_mut(&id).ok_or(InputError::UnknownUser(id))
    }

    /// Iterate users in creation order
    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    /// Gives a user its private action clone
    pub fn associate_actions(&mut self, id: UserId, actions: ActionBindingSet) -> Result<()> {
        self.user_mut(id)?.actions = Some(actions);
        Ok(())
    }

    pub fn create_synthetic_device(&mut self, kind: DeviceKind, name: impl Into<String>) -> DeviceId {
        self.registry.create_synthetic(kind, name)
    }

    pub fn adopt_device(&mut self, kind: DeviceKind, name: impl Into<String>) -> DeviceId {
        self.registry.adopt_real(kind, name)
    }

    /// Removes a device and any pairing it has
    ///
    /// Returns false when the device was already released.
    pub fn release_device(&mut self, id: DeviceId) -> bool {
        if self.registry.remove(id).is_none() {
            return false;
        }
        if let Some(owner) = self.owners.remove(&id)
            && let Some(user) = self.users.get_mut(&owner)
        {
            user.devices.shift_remove(&id);
        }
        true
    }

    /// Pairs `device` to `user`, revoking any previous pairing of the device
    pub fn pair_device(&mut self, device: DeviceId, user: UserId) -> Result<()> {
        if !self.registry.contains(device) {
            return Err(InputError::InvalidDevice(device));
        }
        if !self.users.contains_key(&user) {
            return Err(InputError::UnknownUser(user));
        }
        if let Some(previous) = self.owners.insert(device, user)
            && previous != user
            && let Some(previous_user) = self.users.get_mut(&previous)
        {
            previous_user.devices.shift_remove(&device);
            debug!(device = %device, from = %previous, to = %user, "Device re-paired");
        }
        if let Some(user_entry) = self.users.get_mut(&user) {
            user_entry.devices.insert(device);
        }
        Ok(())
    }

    /// Removes the pairing between `device` and `user`
    ///
    /// Returns false if the device was not paired to that user.
    pub fn unpair_device(&mut self, device: DeviceId, user: UserId) -> Result<bool> {
        if !self.registry.contains(device) {
            return Err(InputError::InvalidDevice(device));
        }
        let entry = self
            .users
            .get_mut(&user)
            .ok_or(InputError::UnknownUser(user))?;
        if self.owners.get(&device) != Some(&user) {
            return Ok(false);
        }
        self.owners.remove(&device);
        entry.devices.shift_remove(&device);
        Ok(true)
    }

    /// Devices paired to `user`
    pub fn paired_devices(&self, user: UserId) -> Result<&IndexSet<DeviceId>> {
        Ok(&self.user(user)?.devices)
    }

    pub fn devices(&self) -> &DeviceRegistry {
        &self.registry
    }

    /// Enables or disables a device
    pub fn set_device_enabled(&mut self, device: DeviceId, enabled: bool) -> Result<()> {
        if self.registry.set_enabled(device, enabled) {
            Ok(())
        } else {
            Err(InputError::InvalidDevice(device))
        }
    }

    /// Stores the state carried by a delivered event on its device
    pub fn record(&mut self, event: &RawEvent) {
        self.registry.record(event);
    }

    pub fn drain_device_changes(&mut self) -> Vec<DeviceChange> {
        self.registry.drain_changes()
    }

    /// Pairs every device in `devices` to `user`, logging failures
    pub(crate) fn pair_all(&mut self, devices: &[DeviceId], user: UserId) {
        for &device in devices {
            if let Err(error) = self.pair_device(device, user) {
                warn!(%error, "Failed to pair device");
            }
        }
    }
}

impl OwnershipLookup for InputUsers {
    fn owner_of(&self, device: DeviceId) -> Option<UserId> {
        self.owners.get(&device).copied()
    }

    fn has_user(&self, user: UserId) -> bool {
        self.users.contains_key(&user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (InputUsers, UserIndexAllocator) {
        (InputUsers::new(), UserIndexAllocator::new())
    }

    #[test]
    fn test_pairing_is_exclusive() {
        let (mut users, mut allocator) = setup();
        let first = users.create_user(&mut allocator);
        let second = users.create_user(&mut allocator);
        let mouse = users.create_synthetic_device(DeviceKind::Pointer, "mouse");

        users.pair_device(mouse, first).unwrap();
        users.pair_device(mouse, second).unwrap();

        assert_eq!(users.owner_of(mouse), Some(second));
        assert!(!users.paired_devices(first).unwrap().contains(&mouse));
        assert!(users.paired_devices(second).unwrap().contains(&mouse));
    }

    #[test]
    fn test_pairing_unknown_device_fails() {
        let (mut users, mut allocator) = setup();
        let user = users.create_user(&mut allocator);
        let result = users.pair_device(DeviceId(42), user);
        assert!(matches!(result, Err(InputError::InvalidDevice(DeviceId(42)))));
    }

    #[test]
    fn test_pairing_unknown_user_fails() {
        let (mut users, _) = setup();
        let keyboard = users.create_synthetic_device(DeviceKind::Keyboard, "keyboard");
        let result = users.pair_device(keyboard, UserId(7));
        assert!(matches!(result, Err(InputError::UnknownUser(UserId(7)))));
        assert_eq!(users.owner_of(keyboard), None);
    }

    #[test]
    fn test_release_is_idempotent_and_unpairs() {
        let (mut users, mut allocator) = setup();
        let user = users.create_user(&mut allocator);
        let mouse = users.create_synthetic_device(DeviceKind::Pointer, "mouse");
        users.pair_device(mouse, user).unwrap();

        assert!(users.release_device(mouse));
        assert!(!users.release_device(mouse));
        assert_eq!(users.owner_of(mouse), None);
        assert!(users.paired_devices(user).unwrap().is_empty());
        assert!(!users.devices().contains(mouse));
    }

    #[test]
    fn test_remove_user_clears_ownership() {
        let (mut users, mut allocator) = setup();
        let user = users.create_user(&mut allocator);
        let mouse = users.create_synthetic_device(DeviceKind::Pointer, "mouse");
        users.pair_device(mouse, user).unwrap();

        users.remove_user(user).unwrap();
        assert_eq!(users.owner_of(mouse), None);
        assert!(!users.has_user(user));
        assert!(matches!(
            users.paired_devices(user),
            Err(InputError::UnknownUser(_))
        ));
    }

    #[test]
    fn test_unpair_only_affects_owner() {
        let (mut users, mut allocator) = setup();
        let first = users.create_user(&mut allocator);
        let second = users.create_user(&mut allocator);
        let mouse = users.create_synthetic_device(DeviceKind::Pointer, "mouse");
        users.pair_device(mouse, first).unwrap();

        assert!(!users.unpair_device(mouse, second).unwrap());
        assert_eq!(users.owner_of(mouse), Some(first));
        assert!(users.unpair_device(mouse, first).unwrap());
        assert_eq!(users.owner_of(mouse), None);
    }
}
