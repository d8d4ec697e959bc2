//! Ownership filtering in front of a stock raycaster

use tracing::trace;

use super::graphic::GraphicRaycaster;
use super::physics::PhysicsRaycaster;
use super::physics2d::Physics2DRaycaster;
use super::{HitTester, PointerEvent, RaycastResult, Raycaster, RaycasterKind};
use crate::input::{OwnershipLookup, UserId};

/// Raycaster that only answers pointer events from its owner's devices
///
/// Events without a device pass through. Otherwise the device owner is
/// compared with the raycaster owner, so an unowned raycaster still sees
/// events from unpaired devices. A raycaster whose owner has been removed
/// sees nothing from any device.
#[derive(Debug, Clone)]
pub struct PerUserRaycaster<H> {
    inner: H,
    owner: Option<UserId>,
}

pub type PerUserPhysicsRaycaster = PerUserRaycaster<PhysicsRaycaster>;
pub type PerUserPhysics2DRaycaster = PerUserRaycaster<Physics2DRaycaster>;
pub type PerUserGraphicRaycaster = PerUserRaycaster<GraphicRaycaster>;

impl<H: HitTester> PerUserRaycaster<H> {
    pub fn new(inner: H, owner: Option<UserId>) -> Self {
        Self { inner, owner }
    }

    pub fn owner(&self) -> Option<UserId> {
        self.owner
    }

    pub fn set_owner(&mut self, owner: Option<UserId>) {
        self.owner = owner;
    }

    pub fn inner(&self) -> &H {
        &self.inner
    }

    fn admits(&self, owners: &dyn OwnershipLookup, event: &PointerEvent) -> bool {
        let Some(device) = event.device else {
            return true;
        };
        if let Some(owner) = self.owner
            && !owners.has_user(owner)
        {
            trace!(owner = %owner, device = %device, "Raycaster owner is gone");
            return false;
        }
        let device_owner = owners.owner_of(device);
        if device_owner != self.owner {
            trace!(
                kind = %self.inner.kind(),
                device = %device,
                device_owner = ?device_owner,
                owner = ?self.owner,
                "Filtered pointer event from another user"
            );
            return false;
        }
        true
    }
}

impl PerUserRaycaster<PhysicsRaycaster> {
    /// Per-user replacement carrying a copy of the stock configuration
    pub fn replacing(stock: &PhysicsRaycaster, owner: Option<UserId>) -> Self {
        Self::new(stock.copy_configuration(), owner)
    }
}

impl PerUserRaycaster<Physics2DRaycaster> {
    /// Per-user replacement carrying a copy of the stock configuration
    pub fn replacing(stock: &Physics2DRaycaster, owner: Option<UserId>) -> Self {
        Self::new(stock.copy_configuration(), owner)
    }
}

impl PerUserRaycaster<GraphicRaycaster> {
    /// Per-user replacement carrying a copy of the stock configuration
    pub fn replacing(stock: &GraphicRaycaster, owner: Option<UserId>) -> Self {
        Self::new(stock.copy_configuration(), owner)
    }
}

impl<H: HitTester> Raycaster for PerUserRaycaster<H> {
    fn kind(&self) -> RaycasterKind {
        self.inner.kind()
    }

    fn raycast(&self, owners: &dyn OwnershipLookup, event: &PointerEvent, results: &mut Vec<RaycastResult>) {
        if self.admits(owners, event) {
            self.inner.hit_test(event, results);
        }
    }
}

macro_rules! stock_raycaster {
    ($ty:ty) => {
        impl Raycaster for $ty {
            fn kind(&self) -> RaycasterKind {
                HitTester::kind(self)
            }

            fn raycast(&self, _owners: &dyn OwnershipLookup, event: &PointerEvent, results: &mut Vec<RaycastResult>) {
                self.hit_test(event, results);
            }
        }
    };
}

stock_raycaster!(PhysicsRaycaster);
stock_raycaster!(Physics2DRaycaster);
stock_raycaster!(GraphicRaycaster);
