//! Session lifecycle
//!
//! A [`Session`] turns a [`SessionConfig`] into users, per-user action
//! clones, device pairings and, when several players are simulated from one
//! mouse and keyboard, an [`EventRouter`]. It is driven by the frame loop:
//!
//! ```text
//! tick(probe)          poll focus, fire due connect timers, attach text listeners
//! handle_event(raw)*   route, record device state, collect typed text
//! raycast(pointer)*    per-user filtered hit testing
//! shutdown()           cancel timers, release devices, remove users
//! ```

mod cache;
mod timer;

use indexmap::IndexMap;
use tracing::{debug, error, info, trace, warn};

pub use cache::KeyedCache;
pub use timer::{FrameScheduler, TimerId};

use crate::config::{PlayerConfig, SessionConfig};
use crate::error::{InputError, Result};
use crate::host::Host;
use crate::input::{
    Action, ActionBindingSet, ActionId, ActionReference, DeviceId, DeviceKind, DeviceOrigin,
    DeviceScope, DisplayIndex, DisplayProbe, EventRouter, FocusTracker, InputUsers,
    OwnershipLookup, PlayerDevices, RawEvent, RouteOutcome, SharedDevices, TextInputListeners,
    UserId, UserIndexAllocator, clone_for_user,
};
use crate::raycast::{
    InstalledRaycasters, PlayerHierarchy, PointerEvent, RaycastResult, SceneRaycaster,
    SetupReport, Severity, install_per_user_raycasters,
};

/// How input reaches the players
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    /// At most one player; local devices belong to it directly
    SinglePlayer,
    /// Several players share the local mouse and keyboard through the router
    Simulated,
    /// Several players, each connected through its own stream
    Streamed,
}

/// Notifications produced by the frame loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    PlayerConnected(UserId),
    PlayerDisconnected(UserId),
    FocusChanged(DisplayIndex),
}

/// The first real devices found when the session started
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocalDevices {
    pub mouse: Option<DeviceId>,
    pub keyboard: Option<DeviceId>,
    pub touchscreen: Option<DeviceId>,
}

impl LocalDevices {
    fn detect(users: &InputUsers) -> Self {
        let registry = users.devices();
        Self {
            mouse: registry.first_of(DeviceKind::Pointer, DeviceOrigin::Real),
            keyboard: registry.first_of(DeviceKind::Keyboard, DeviceOrigin::Real),
            touchscreen: registry.first_of(DeviceKind::Touch, DeviceOrigin::Real),
        }
    }

    fn iter(&self) -> impl Iterator<Item = DeviceId> {
        [self.mouse, self.keyboard, self.touchscreen].into_iter().flatten()
    }
}

/// One configured player after setup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPlayer {
    pub name: String,
    pub user: UserId,
    pub display: DisplayIndex,
    pub streamed: bool,
    /// Name of the hierarchy holding the player's raycasters
    pub hierarchy: String,
    pub connected: bool,
}

/// Position of an action inside a binding set: map index, action index
type ActionSlot = (usize, usize);

/// A running multiplayer session
pub struct Session {
    mode: SessionMode,
    users: InputUsers,
    players: Vec<SessionPlayer>,
    local: LocalDevices,
    scope: DeviceScope,
    disabled: Vec<DeviceId>,
    router: Option<EventRouter>,
    focus: FocusTracker,
    text: TextInputListeners,
    connects: FrameScheduler<UserId>,
    action_slots: KeyedCache<(UserId, ActionId), Option<ActionSlot>>,
    raycasters: InstalledRaycasters,
    host: Box<dyn Host>,
    report: SetupReport,
    shut_down: bool,
}

impl Session {
    /// Builds a session from `config`
    ///
    /// `users` holds the real devices the platform reported; user indices are
    /// drawn from `allocator`. Misconfiguration is collected into
    /// [`Session::report`] and mitigated where possible.
    pub fn start(
        mut config: SessionConfig,
        users: InputUsers,
        allocator: &mut UserIndexAllocator,
        host: Box<dyn Host>,
    ) -> Self {
        let mut report = SetupReport::new();
        let mode = match config.players.len() {
            0 | 1 => SessionMode::SinglePlayer,
            _ if config.simulation.enabled => SessionMode::Simulated,
            _ => SessionMode::Streamed,
        };
        let multiplayer = mode != SessionMode::SinglePlayer;

        if config.players.is_empty() {
            warn!(profile = %config.profile, "No players configured");
            report.push(Severity::Warning, "no players configured");
        }
        if multiplayer && !config.has_distinct_displays() {
            for (player, from, to) in config.assign_distinct_displays() {
                report.push(
                    Severity::Warning,
                    format!("'{player}' shared display {from} and was moved to display {to}"),
                );
            }
        }

        let local = LocalDevices::detect(&users);
        let mut session = Self {
            mode,
            users,
            players: Vec::new(),
            local,
            scope: DeviceScope::new(),
            disabled: Vec::new(),
            router: None,
            focus: FocusTracker::new(),
            text: TextInputListeners::new(),
            connects: FrameScheduler::new(),
            action_slots: KeyedCache::new(),
            raycasters: InstalledRaycasters::default(),
            host,
            report,
            shut_down: false,
        };

        let templates: IndexMap<String, ActionBindingSet> = config
            .action_templates
            .iter()
            .map(|template| (template.name.clone(), template.build()))
            .collect();

        for player in &config.players {
            session.add_player(player, &templates, allocator);
        }

        match mode {
            SessionMode::SinglePlayer => session.setup_single_player(),
            SessionMode::Simulated => session.setup_simulation(),
            SessionMode::Streamed => {}
        }

        if config.simulation.enabled {
            for player in session.players.iter().filter(|player| !player.streamed) {
                session
                    .connects
                    .schedule(config.simulation.connect_delay_frames, player.user);
            }
        }

        info!(
            profile = %config.profile,
            ?mode,
            players = session.players.len(),
            issues = session.report.issues().len(),
            "Session started"
        );
        session
    }

    fn add_player(
        &mut self,
        config: &PlayerConfig,
        templates: &IndexMap<String, ActionBindingSet>,
        allocator: &mut UserIndexAllocator,
    ) {
        let user = self.users.create_user(allocator);
        if let Some(name) = &config.actions {
            match templates.get(name) {
                Some(template) => {
                    let clone = clone_for_user(template, user);
                    debug!(user = %user, actions = %clone.name(), "Actions cloned");
                    if let Err(error) = self.users.associate_actions(user, clone) {
                        warn!(%error, "Failed to associate actions");
                    }
                }
                None => {
                    let error = InputError::UnknownTemplate(name.clone());
                    warn!(user = %user, %error, "Player keeps no actions");
                    self.report.push(Severity::Warning, format!("'{}': {error}", config.name));
                }
            }
        }
        self.players.push(SessionPlayer {
            name: config.name.clone(),
            user,
            display: config.display,
            streamed: config.stream_in_editor,
            hierarchy: config.hierarchy.clone().unwrap_or_else(|| config.name.clone()),
            connected: false,
        });
    }

    fn setup_single_player(&mut self) {
        let Some(player) = self.players.first() else {
            return;
        };
        let user = player.user;
        let local: Vec<DeviceId> = self.local.iter().collect();
        if player.streamed {
            // Remote input only; the local devices would act for the same player
            for device in local {
                if self.users.set_device_enabled(device, false).is_ok() {
                    self.disabled.push(device);
                }
            }
            info!(user = %user, disabled = self.disabled.len(), "Local devices disabled for streamed player");
        } else {
            self.users.pair_all(&local, user);
            debug!(user = %user, devices = local.len(), "Local devices paired");
        }
    }

    fn setup_simulation(&mut self) {
        for device in self.local.iter() {
            if let Some(owner) = self.users.owner_of(device)
                && let Err(error) = self.users.unpair_device(device, owner)
            {
                error!(%error, device = %device, "Failed to unpair local device");
            }
        }
        if self.local.touchscreen.is_some() {
            warn!("Touchscreen input is not routed while simulating several players");
            self.report.push(
                Severity::Warning,
                "touchscreen input is not routed while simulating several players",
            );
        }

        let mut targets = IndexMap::new();
        for index in 0..self.players.len() {
            let player = &self.players[index];
            if player.streamed {
                continue;
            }
            let (user, display, name) = (player.user, player.display, player.name.clone());
            let mouse = self
                .scope
                .track(self.users.create_synthetic_device(DeviceKind::Pointer, format!("{name} Mouse")));
            let keyboard = self
                .scope
                .track(self.users.create_synthetic_device(DeviceKind::Keyboard, format!("{name} Keyboard")));
            self.users.pair_all(&[mouse, keyboard], user);
            targets.insert(
                display,
                PlayerDevices {
                    user,
                    mouse,
                    keyboard,
                },
            );
        }

        let shared = SharedDevices {
            mouse: self.local.mouse,
            keyboard: self.local.keyboard,
        };
        if shared.mouse.is_none() && shared.keyboard.is_none() {
            error!("No local mouse or keyboard to share between players");
            self.report
                .push(Severity::Error, "no local mouse or keyboard to share between players");
            return;
        }
        debug!(targets = targets.len(), "Event router installed");
        self.router = Some(EventRouter::new(shared, targets));
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    /// Issues found while setting up
    pub fn report(&self) -> &SetupReport {
        &self.report
    }

    pub fn players(&self) -> &[SessionPlayer] {
        &self.players
    }

    pub fn player(&self, user: UserId) -> Option<&SessionPlayer> {
        self.players.iter().find(|player| player.user == user)
    }

    pub fn player_on_display(&self, display: DisplayIndex) -> Option<&SessionPlayer> {
        self.players.iter().find(|player| player.display == display)
    }

    pub fn local_devices(&self) -> LocalDevices {
        self.local
    }

    pub fn input(&self) -> &InputUsers {
        &self.users
    }

    /// Mutable access for platform device hot-plugging
    pub fn input_mut(&mut self) -> &mut InputUsers {
        &mut self.users
    }

    pub fn router(&self) -> Option<&EventRouter> {
        self.router.as_ref()
    }

    pub fn focus(&self) -> Option<DisplayIndex> {
        self.focus.current()
    }

    /// Synthetic devices created by this session
    pub fn session_devices(&self) -> &[DeviceId] {
        self.scope.devices()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Runs the per-frame steps that precede event delivery
    pub fn tick(&mut self, probe: &dyn DisplayProbe) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        if self.shut_down {
            return events;
        }
        if self.router.is_some()
            && self.focus.poll(probe)
            && let Some(display) = self.focus.current()
        {
            events.push(SessionEvent::FocusChanged(display));
        }
        for user in self.connects.advance() {
            if let Some(player) = self.players.iter_mut().find(|player| player.user == user) {
                player.connected = true;
                info!(user = %user, player = %player.name, "Player connected");
                events.push(SessionEvent::PlayerConnected(user));
            }
        }
        self.sync_text_listeners();
        events
    }

    fn sync_text_listeners(&mut self) {
        for change in self.users.drain_device_changes() {
            self.text.on_device_change(change);
        }
    }

    /// Delivers one raw platform event
    ///
    /// Returns the events that reached a device, in delivery order: release
    /// events for a previously focused player come before the forwarded
    /// event.
    pub fn handle_event(&mut self, event: &RawEvent) -> Vec<RawEvent> {
        let mut delivered = Vec::new();
        if self.shut_down {
            return delivered;
        }
        self.sync_text_listeners();

        let outcome = match self.router.as_mut() {
            Some(router) => router.route(event, self.focus.current(), &mut delivered),
            None => RouteOutcome::NotShared,
        };
        if outcome == RouteOutcome::NotShared {
            match self.users.devices().get(event.device) {
                Some(device) if device.is_enabled() => delivered.push(event.clone()),
                Some(_) => trace!(device = %event.device, "Dropping event from disabled device"),
                None => trace!(device = %event.device, "Dropping event from unknown device"),
            }
        }

        for event in &delivered {
            self.users.record(event);
            // Only owned keyboards are ever drained through text_input
            if self.users.owner_of(event.device).is_some() {
                self.text.deliver(event);
            }
        }
        delivered
    }

    /// Creates a device for input arriving over a player's stream
    pub fn add_stream_device(&mut self, user: UserId, kind: DeviceKind, name: impl Into<String>) -> Result<DeviceId> {
        if !self.users.has_user(user) {
            return Err(InputError::UnknownUser(user));
        }
        let device = self.scope.track(self.users.create_synthetic_device(kind, name));
        self.users.pair_device(device, user)?;
        self.sync_text_listeners();
        Ok(device)
    }

    /// Text typed on the user's keyboards since the last call
    pub fn text_input(&mut self, user: UserId) -> Result<String> {
        let keyboards: Vec<DeviceId> = self.users.paired_devices(user)?.iter().copied().collect();
        Ok(keyboards
            .into_iter()
            .map(|device| self.text.take_text(device))
            .collect())
    }

    pub fn actions(&self, user: UserId) -> Result<Option<&ActionBindingSet>> {
        Ok(self.users.user(user)?.actions())
    }

    pub fn actions_mut(&mut self, user: UserId) -> Result<Option<&mut ActionBindingSet>> {
        Ok(self.users.user_mut(user)?.actions_mut())
    }

    /// Resolves a reference against the user's own action clone
    pub fn resolve(&mut self, user: UserId, reference: &ActionReference) -> Option<&Action> {
        let set = self.users.user(user).ok()?.actions()?;
        let slot = *self
            .action_slots
            .get_or_insert_with((user, reference.action), || locate(set, reference.action));
        let (map, action) = slot?;
        set.maps().get(map)?.actions().get(action)
    }

    /// Replaces stock raycasters in every player hierarchy
    pub fn install_raycasters(&mut self, hierarchies: Vec<PlayerHierarchy>, loose: Vec<SceneRaycaster>) -> &InstalledRaycasters {
        let (installed, report) = install_per_user_raycasters(&self.users, hierarchies, loose, self.players.len());
        self.report.extend(report);
        self.raycasters = installed;
        &self.raycasters
    }

    /// Empty hierarchy for the player whose hierarchy is named `name`
    pub fn hierarchy(&self, name: &str) -> Option<PlayerHierarchy> {
        self.players
            .iter()
            .find(|player| player.hierarchy == name)
            .map(|player| PlayerHierarchy::new(&player.hierarchy, player.user))
    }

    pub fn raycasters(&self) -> &InstalledRaycasters {
        &self.raycasters
    }

    /// Raycasts every installed raycaster with ownership filtering
    pub fn raycast(&self, event: &PointerEvent) -> Vec<RaycastResult> {
        self.raycasters.raycast_all(&self.users, event)
    }

    /// Asks the host to stop accepting players
    pub fn close_lobby(&mut self) {
        info!(host = %self.host.name(), "Closing lobby");
        self.host.close_lobby();
    }

    /// Tears the session down; later calls return nothing
    pub fn shutdown(&mut self) -> Vec<SessionEvent> {
        if self.shut_down {
            return Vec::new();
        }
        self.shut_down = true;

        let cancelled = self.connects.cancel_all();
        if !cancelled.is_empty() {
            debug!(cancelled = cancelled.len(), "Pending connects cancelled");
        }
        let mut events = Vec::new();
        for player in self.players.iter_mut().filter(|player| player.connected) {
            player.connected = false;
            info!(user = %player.user, player = %player.name, "Player disconnected");
            events.push(SessionEvent::PlayerDisconnected(player.user));
        }

        self.router = None;
        self.scope.release_all(&mut self.users);
        for device in self.disabled.drain(..) {
            if let Err(error) = self.users.set_device_enabled(device, true) {
                warn!(%error, "Failed to re-enable local device");
            }
        }
        for player in &self.players {
            let user = player.user;
            self.action_slots.remove_where(|(owner, _)| *owner == user);
            if let Err(error) = self.users.remove_user(user) {
                warn!(%error, "Failed to remove user");
            }
        }
        self.sync_text_listeners();
        info!(players = self.players.len(), "Session shut down");
        events
    }
}

fn locate(set: &ActionBindingSet, id: ActionId) -> Option<ActionSlot> {
    set.maps().iter().enumerate().find_map(|(map_index, map)| {
        map.actions()
            .iter()
            .position(|action| action.id() == id)
            .map(|action_index| (map_index, action_index))
    })
}

impl OwnershipLookup for Session {
    fn owner_of(&self, device: DeviceId) -> Option<UserId> {
        self.users.owner_of(device)
    }

    fn has_user(&self, user: UserId) -> bool {
        self.users.has_user(user)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}
