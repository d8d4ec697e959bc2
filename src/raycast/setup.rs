//! One-time replacement of stock raycasters by ownership-aware ones
//!
//! Each player's rendering hierarchy ends up with at most one per-user
//! raycaster of each kind. Stock raycasters are replaced by a wrapper that
//! copies their configuration; duplicates are removed. Problems are collected
//! into a [`SetupReport`] and never abort the session.

use std::cmp::Reverse;
use std::fmt;

use itertools::Itertools;
use ordered_float::OrderedFloat;
use tracing::{debug, error, info, warn};

use super::filter::{PerUserGraphicRaycaster, PerUserPhysics2DRaycaster, PerUserPhysicsRaycaster};
use super::graphic::GraphicRaycaster;
use super::physics::PhysicsRaycaster;
use super::physics2d::Physics2DRaycaster;
use super::{PointerEvent, RaycastResult, Raycaster, RaycasterKind};
use crate::error::InputError;
use crate::input::{OwnershipLookup, UserId};

/// Severity of a setup issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => f.write_str("info"),
            Self::Warning => f.write_str("warning"),
            Self::Error => f.write_str("error"),
        }
    }
}

/// One problem found while setting up a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupIssue {
    pub severity: Severity,
    pub message: String,
}

/// Issues gathered during session setup, in the order they were found
#[derive(Debug, Clone, Default)]
pub struct SetupReport {
    issues: Vec<SetupIssue>,
}

impl SetupReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, severity: Severity, message: impl Into<String>) {
        self.issues.push(SetupIssue {
            severity,
            message: message.into(),
        });
    }

    /// Records a setup error as an issue
    pub fn push_error(&mut self, error: &InputError) {
        self.push(Severity::Error, error.to_string());
    }

    pub fn extend(&mut self, other: SetupReport) {
        self.issues.extend(other.issues);
    }

    pub fn issues(&self) -> &[SetupIssue] {
        &self.issues
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|issue| issue.severity == Severity::Error)
    }

    /// Highest severity present
    pub fn worst(&self) -> Option<Severity> {
        self.issues.iter().map(|issue| issue.severity).max()
    }
}

/// A raycaster found in the scene
#[derive(Debug, Clone)]
pub enum SceneRaycaster {
    Physics(PhysicsRaycaster),
    PerUserPhysics(PerUserPhysicsRaycaster),
    Physics2D(Physics2DRaycaster),
    PerUserPhysics2D(PerUserPhysics2DRaycaster),
    Graphic(GraphicRaycaster),
    PerUserGraphic(PerUserGraphicRaycaster),
}

impl SceneRaycaster {
    pub fn kind(&self) -> RaycasterKind {
        match self {
            Self::Physics(_) | Self::PerUserPhysics(_) => RaycasterKind::Physics3D,
            Self::Physics2D(_) | Self::PerUserPhysics2D(_) => RaycasterKind::Physics2D,
            Self::Graphic(_) | Self::PerUserGraphic(_) => RaycasterKind::Graphic,
        }
    }

    pub fn is_per_user(&self) -> bool {
        matches!(
            self,
            Self::PerUserPhysics(_) | Self::PerUserPhysics2D(_) | Self::PerUserGraphic(_)
        )
    }

    /// Owner of a per-user raycaster; stock raycasters have none
    pub fn owner(&self) -> Option<UserId> {
        match self {
            Self::PerUserPhysics(raycaster) => raycaster.owner(),
            Self::PerUserPhysics2D(raycaster) => raycaster.owner(),
            Self::PerUserGraphic(raycaster) => raycaster.owner(),
            _ => None,
        }
    }

    /// Ownership-aware version of this raycaster assigned to `owner`
    fn into_per_user(self, owner: Option<UserId>) -> Self {
        match self {
            Self::Physics(stock) => Self::PerUserPhysics(PerUserPhysicsRaycaster::replacing(&stock, owner)),
            Self::Physics2D(stock) => Self::PerUserPhysics2D(PerUserPhysics2DRaycaster::replacing(&stock, owner)),
            Self::Graphic(stock) => Self::PerUserGraphic(PerUserGraphicRaycaster::replacing(&stock, owner)),
            Self::PerUserPhysics(mut raycaster) => {
                raycaster.set_owner(owner);
                Self::PerUserPhysics(raycaster)
            }
            Self::PerUserPhysics2D(mut raycaster) => {
                raycaster.set_owner(owner);
                Self::PerUserPhysics2D(raycaster)
            }
            Self::PerUserGraphic(mut raycaster) => {
                raycaster.set_owner(owner);
                Self::PerUserGraphic(raycaster)
            }
        }
    }

    fn as_raycaster(&self) -> &dyn Raycaster {
        match self {
            Self::Physics(raycaster) => raycaster,
            Self::PerUserPhysics(raycaster) => raycaster,
            Self::Physics2D(raycaster) => raycaster,
            Self::PerUserPhysics2D(raycaster) => raycaster,
            Self::Graphic(raycaster) => raycaster,
            Self::PerUserGraphic(raycaster) => raycaster,
        }
    }
}

impl Raycaster for SceneRaycaster {
    fn kind(&self) -> RaycasterKind {
        SceneRaycaster::kind(self)
    }

    fn raycast(&self, owners: &dyn OwnershipLookup, event: &PointerEvent, results: &mut Vec<RaycastResult>) {
        self.as_raycaster().raycast(owners, event, results);
    }
}

/// Raycasters found under one player's camera and canvases
#[derive(Debug, Clone)]
pub struct PlayerHierarchy {
    pub name: String,
    pub user: UserId,
    pub raycasters: Vec<SceneRaycaster>,
}

impl PlayerHierarchy {
    pub fn new(name: impl Into<String>, user: UserId) -> Self {
        Self {
            name: name.into(),
            user,
            raycasters: Vec::new(),
        }
    }

    /// Builder: add a raycaster found in this hierarchy
    pub fn with_raycaster(mut self, raycaster: SceneRaycaster) -> Self {
        self.raycasters.push(raycaster);
        self
    }
}

/// The authoritative raycasters of one player
#[derive(Debug, Clone)]
pub struct PlayerRaycasters {
    pub user: UserId,
    pub physics: Option<PerUserPhysicsRaycaster>,
    pub physics_2d: Option<PerUserPhysics2DRaycaster>,
    pub graphic: Option<PerUserGraphicRaycaster>,
}

impl PlayerRaycasters {
    fn new(user: UserId) -> Self {
        Self {
            user,
            physics: None,
            physics_2d: None,
            graphic: None,
        }
    }

    fn install(&mut self, raycaster: SceneRaycaster) {
        match raycaster {
            SceneRaycaster::PerUserPhysics(raycaster) => self.physics = Some(raycaster),
            SceneRaycaster::PerUserPhysics2D(raycaster) => self.physics_2d = Some(raycaster),
            SceneRaycaster::PerUserGraphic(raycaster) => self.graphic = Some(raycaster),
            stock => warn!(kind = %stock.kind(), "Refusing to install a stock raycaster"),
        }
    }

    /// Number of installed raycasters
    pub fn len(&self) -> usize {
        usize::from(self.physics.is_some())
            + usize::from(self.physics_2d.is_some())
            + usize::from(self.graphic.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn raycasters(&self) -> impl Iterator<Item = &dyn Raycaster> {
        let physics = self.physics.as_ref().map(|r| r as &dyn Raycaster);
        let physics_2d = self.physics_2d.as_ref().map(|r| r as &dyn Raycaster);
        let graphic = self.graphic.as_ref().map(|r| r as &dyn Raycaster);
        [physics, physics_2d, graphic].into_iter().flatten()
    }
}

/// Every raycaster left in the scene after setup
#[derive(Debug, Clone, Default)]
pub struct InstalledRaycasters {
    pub players: Vec<PlayerRaycasters>,
    /// Raycasters no user could be deduced for; they carry no owner
    pub unassigned: Vec<SceneRaycaster>,
}

impl InstalledRaycasters {
    pub fn player(&self, user: UserId) -> Option<&PlayerRaycasters> {
        self.players.iter().find(|player| player.user == user)
    }

    /// Raycasts every installed raycaster and merges the hits
    ///
    /// Results are ordered by sorting order and depth (highest first), then
    /// by distance. Hits within one raycaster keep their relative order.
    pub fn raycast_all(&self, owners: &dyn OwnershipLookup, event: &PointerEvent) -> Vec<RaycastResult> {
        let mut results = Vec::new();
        for raycaster in self
            .players
            .iter()
            .flat_map(|player| player.raycasters())
            .chain(self.unassigned.iter().map(|r| r as &dyn Raycaster))
        {
            raycaster.raycast(owners, event, &mut results);
        }
        results.sort_by_key(|hit| {
            (
                Reverse(hit.sorting_order),
                Reverse(hit.depth),
                OrderedFloat(hit.distance),
            )
        });
        results
    }
}

fn report_replacement(multiplayer: bool, hierarchy: &str, kind: RaycasterKind) {
    if multiplayer {
        error!(hierarchy, %kind, "Stock raycaster replaced by a per-user raycaster; use the per-user raycaster in the scene instead");
    } else {
        info!(hierarchy, %kind, "Stock raycaster replaced by a per-user raycaster");
    }
}

/// Replaces stock raycasters and installs one per-user raycaster per kind per player
///
/// `loose` are raycasters found outside any player hierarchy. With a single
/// player they belong to that player; otherwise they stay unowned and are
/// reported. A hierarchy whose user is unknown to `owners` is reported as an
/// error; its raycasters are installed but answer no device events.
pub fn install_per_user_raycasters(
    owners: &dyn OwnershipLookup,
    hierarchies: Vec<PlayerHierarchy>,
    loose: Vec<SceneRaycaster>,
    player_count: usize,
) -> (InstalledRaycasters, SetupReport) {
    let multiplayer = player_count > 1;
    let mut report = SetupReport::new();
    let mut installed = InstalledRaycasters::default();

    let adopt_loose = hierarchies.len() == 1 && !multiplayer;
    let mut loose = Some(loose);

    for mut hierarchy in hierarchies {
        if adopt_loose && let Some(extra) = loose.take() {
            hierarchy.raycasters.extend(extra);
        }
        if !owners.has_user(hierarchy.user) {
            let error = InputError::UnknownUser(hierarchy.user);
            error!(hierarchy = %hierarchy.name, %error, "Raycasters cannot be assigned an owning user");
            report.push_error(&error);
        }
        let mut player = PlayerRaycasters::new(hierarchy.user);

        let mut by_kind = hierarchy.raycasters.into_iter().into_group_map_by(SceneRaycaster::kind);
        for kind in [RaycasterKind::Physics3D, RaycasterKind::Physics2D, RaycasterKind::Graphic] {
            let Some(mut candidates) = by_kind.remove(&kind) else {
                continue;
            };
            let keep = candidates
                .iter()
                .position(SceneRaycaster::is_per_user)
                .unwrap_or(0);
            let kept = candidates.remove(keep);

            if !kept.is_per_user() {
                report_replacement(multiplayer, &hierarchy.name, kind);
                report.push(
                    if multiplayer { Severity::Error } else { Severity::Info },
                    format!("{kind} raycaster on '{}' was replaced by a per-user raycaster", hierarchy.name),
                );
            } else if let Some(previous) = kept.owner()
                && previous != hierarchy.user
            {
                warn!(hierarchy = %hierarchy.name, %kind, from = %previous, to = %hierarchy.user, "Per-user raycaster reassigned");
                report.push(
                    Severity::Warning,
                    format!("{kind} raycaster on '{}' was assigned to {previous}, reassigned to {}", hierarchy.name, hierarchy.user),
                );
            }

            if !candidates.is_empty() {
                warn!(hierarchy = %hierarchy.name, %kind, removed = candidates.len(), "Duplicate raycasters removed");
                report.push(
                    Severity::Warning,
                    format!("removed {} duplicate {kind} raycaster(s) on '{}'", candidates.len(), hierarchy.name),
                );
            }

            player.install(kept.into_per_user(Some(hierarchy.user)));
        }

        debug!(user = %player.user, raycasters = player.len(), "Raycasters installed");
        installed.players.push(player);
    }

    let loose = loose.unwrap_or_default();
    for kind in [RaycasterKind::Physics3D, RaycasterKind::Physics2D, RaycasterKind::Graphic] {
        let count = loose.iter().filter(|raycaster| raycaster.kind() == kind).count();
        if count == 0 {
            continue;
        }
        error!(%kind, count, "Raycasters outside any player hierarchy cannot be assigned an owner");
        if count > 1 {
            report.push_error(&InputError::AmbiguousOwnership { kind, count });
        } else {
            report.push(
                Severity::Error,
                format!("{kind} raycaster outside any player hierarchy has no owning user"),
            );
        }
    }
    installed
        .unassigned
        .extend(loose.into_iter().map(|raycaster| raycaster.into_per_user(None)));

    (installed, report)
}
