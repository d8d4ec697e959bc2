//! Logical users and their index allocation

use std::fmt;

use indexmap::IndexSet;

use super::actions::ActionBindingSet;
use super::device::DeviceId;

/// Logical player identity
///
/// The wrapped value is the user's index, assigned in creation order. It also
/// serves as the ownership token compared by the raycast filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UserId(pub u32);

impl UserId {
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "user#{}", self.0)
    }
}

/// Sequential user index assignment
///
/// One allocator is shared by every session in the process, so indices are
/// never reused while it lives. Tests create their own.
#[derive(Debug, Default)]
pub struct UserIndexAllocator {
    next: u32,
}

impl UserIndexAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands out the next index
    pub fn allocate(&mut self) -> UserId {
        let id = UserId(self.next);
        self.next += 1;
        id
    }

    /// The index the next call to [`Self::allocate`] returns
    pub fn peek(&self) -> UserId {
        UserId(self.next)
    }
}

/// One logical player
#[derive(Debug)]
pub struct User {
    pub(crate) id: UserId,
    pub(crate) devices: IndexSet<DeviceId>,
    pub(crate) actions: Option<ActionBindingSet>,
}

impl User {
    pub(crate) fn new(id: UserId) -> Self {
        Self {
            id,
            devices: IndexSet::new(),
            actions: None,
        }
    }

    pub fn id(&self) -> UserId {
        self.id
    }

    /// Devices paired to this user, in pairing order
    pub fn paired_devices(&self) -> &IndexSet<DeviceId> {
        &self.devices
    }

    /// This user's private action clone, if a template was configured
    pub fn actions(&self) -> Option<&ActionBindingSet> {
        self.actions.as_ref()
    }

    pub fn actions_mut(&mut self) -> Option<&mut ActionBindingSet> {
        self.actions.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocator_is_monotonic() {
        let mut allocator = UserIndexAllocator::new();
        assert_eq!(allocator.allocate(), UserId(0));
        assert_eq!(allocator.allocate(), UserId(1));
        assert_eq!(allocator.peek(), UserId(2));
    }
}
