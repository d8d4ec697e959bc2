//! Event routing for several simulated players sharing one mouse and keyboard
//!
//! Every event from a shared real device is re-emitted onto the synthetic
//! device of the player whose display has pointer focus. When the focus
//! moves, the previously targeted devices are first returned to rest so no
//! button or key stays held on a display the pointer has left.

use std::collections::{BTreeSet, HashMap};

use indexmap::IndexMap;
use tracing::trace;

use super::device::DeviceId;
use super::events::{
    DisplayIndex, EventPayload, KeyCode, KeyboardState, MouseButtons, MouseState, RawEvent,
};
use super::users::UserId;

/// Synthetic devices owned by one simulated player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerDevices {
    pub user: UserId,
    pub mouse: DeviceId,
    pub keyboard: DeviceId,
}

/// Real devices whose events are redirected
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SharedDevices {
    pub mouse: Option<DeviceId>,
    pub keyboard: Option<DeviceId>,
}

impl SharedDevices {
    pub fn contains(&self, device: DeviceId) -> bool {
        self.mouse == Some(device) || self.keyboard == Some(device)
    }
}

/// What happened to one routed event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// The event is not from a shared device; deliver it unchanged
    NotShared,
    /// No focus target yet; the event reaches nobody
    Suppressed,
    /// The focus target has no player; the event reaches nobody
    Dropped,
    /// The event was re-emitted onto `target`
    Forwarded { target: DeviceId },
}

/// Redirects shared-device events by pointer focus
#[derive(Debug)]
pub struct EventRouter {
    shared: SharedDevices,
    targets: IndexMap<DisplayIndex, PlayerDevices>,
    routed_focus: Option<DisplayIndex>,
    real_buttons: MouseButtons,
    real_keys: KeyboardState,
    masked_buttons: MouseButtons,
    masked_keys: BTreeSet<KeyCode>,
    mouse_states: HashMap<DeviceId, MouseState>,
    keyboard_states: HashMap<DeviceId, KeyboardState>,
}

impl EventRouter {
    /// Creates a router for `shared` devices targeting one player per display
    pub fn new(shared: SharedDevices, targets: IndexMap<DisplayIndex, PlayerDevices>) -> Self {
        Self {
            shared,
            targets,
            routed_focus: None,
            real_buttons: MouseButtons::empty(),
            real_keys: KeyboardState::new(),
            masked_buttons: MouseButtons::empty(),
            masked_keys: BTreeSet::new(),
            mouse_states: HashMap::new(),
            keyboard_states: HashMap::new(),
        }
    }

    pub fn shared(&self) -> SharedDevices {
        self.shared
    }

    pub fn targets(&self) -> &IndexMap<DisplayIndex, PlayerDevices> {
        &self.targets
    }

    /// Display the last routed event was sent to
    pub fn routed_focus(&self) -> Option<DisplayIndex> {
        self.routed_focus
    }

    /// Routes one raw event, appending whatever must be delivered to `out`
    ///
    /// Release events for the previously focused player's devices are
    /// appended before the forwarded event.
    pub fn route(
        &mut self,
        event: &RawEvent,
        focus: Option<DisplayIndex>,
        out: &mut Vec<RawEvent>,
    ) -> RouteOutcome {
        if !self.shared.contains(event.device) {
            return RouteOutcome::NotShared;
        }
        let held_buttons = self.real_buttons;
        let held_keys: BTreeSet<KeyCode> = self.real_keys.keys().collect();
        self.observe_real(event);

        let Some(target_display) = focus else {
            trace!(device = %event.device, "No focus target, suppressing event");
            return RouteOutcome::Suppressed;
        };

        if self.routed_focus != Some(target_display) {
            if self.routed_focus.is_some() {
                self.release_previous(event.time, out);
                // Anything still held was pressed under the old focus
                self.masked_buttons = held_buttons & self.real_buttons;
                self.masked_keys = held_keys
                    .into_iter()
                    .filter(|key| self.real_keys.is_pressed(*key))
                    .collect();
            }
            self.routed_focus = Some(target_display);
        }

        let Some(target) = self.targets.get(&target_display).copied() else {
            trace!(target_display, "Focus target has no player, dropping event");
            return RouteOutcome::Dropped;
        };

        let forwarded = match &event.payload {
            EventPayload::Mouse(state) => {
                let mut state = *state;
                state.buttons.remove(self.masked_buttons);
                state.display_index = target_display;
                self.mouse_states.insert(target.mouse, state);
                RawEvent::mouse(target.mouse, event.time, state)
            }
            EventPayload::Keyboard(state) => {
                let state = state.without(&self.masked_keys);
                self.keyboard_states.insert(target.keyboard, state.clone());
                RawEvent::keyboard(target.keyboard, event.time, state)
            }
            EventPayload::Text(character) => {
                RawEvent::text(target.keyboard, event.time, *character)
            }
            EventPayload::Touch(_) => {
                trace!(device = %event.device, "Touch payload on a shared device, dropping");
                return RouteOutcome::Dropped;
            }
        };
        let target = forwarded.device;
        out.push(forwarded);
        RouteOutcome::Forwarded { target }
    }

    fn observe_real(&mut self, event: &RawEvent) {
        match &event.payload {
            EventPayload::Mouse(state) => {
                self.real_buttons = state.buttons;
                self.masked_buttons &= state.buttons;
            }
            EventPayload::Keyboard(state) => {
                self.real_keys = state.clone();
                self.masked_keys.retain(|key| state.is_pressed(*key));
            }
            EventPayload::Text(_) | EventPayload::Touch(_) => {}
        }
    }

    fn release_previous(&mut self, time: f64, out: &mut Vec<RawEvent>) {
        let Some(previous) = self.routed_focus else {
            return;
        };
        let Some(devices) = self.targets.get(&previous).copied() else {
            return;
        };

        if let Some(last) = self.mouse_states.get(&devices.mouse)
            && *last != last.released()
        {
            let released = last.released();
            trace!(device = %devices.mouse, "Releasing mouse after focus change");
            self.mouse_states.insert(devices.mouse, released);
            out.push(RawEvent::mouse(devices.mouse, time, released));
        }

        if let Some(last) = self.keyboard_states.get(&devices.keyboard)
            && !last.is_empty()
        {
            trace!(device = %devices.keyboard, "Releasing keyboard after focus change");
            self.keyboard_states
                .insert(devices.keyboard, KeyboardState::new());
            out.push(RawEvent::keyboard(devices.keyboard, time, KeyboardState::new()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REAL_MOUSE: DeviceId = DeviceId(0);
    const REAL_KEYBOARD: DeviceId = DeviceId(1);
    const MOUSE_0: DeviceId = DeviceId(10);
    const KEYBOARD_0: DeviceId = DeviceId(11);
    const MOUSE_1: DeviceId = DeviceId(20);
    const KEYBOARD_1: DeviceId = DeviceId(21);

    fn router() -> EventRouter {
        let mut targets = IndexMap::new();
        targets.insert(
            0,
            PlayerDevices {
                user: UserId(0),
                mouse: MOUSE_0,
                keyboard: KEYBOARD_0,
            },
        );
        targets.insert(
            1,
            PlayerDevices {
                user: UserId(1),
                mouse: MOUSE_1,
                keyboard: KEYBOARD_1,
            },
        );
        EventRouter::new(
            SharedDevices {
                mouse: Some(REAL_MOUSE),
                keyboard: Some(REAL_KEYBOARD),
            },
            targets,
        )
    }

    fn press(pos: [f32; 2]) -> RawEvent {
        RawEvent::mouse(REAL_MOUSE, 0.0, MouseState::at(pos).with_buttons(MouseButtons::LEFT))
    }

    #[test]
    fn test_unshared_devices_are_left_alone() {
        let mut router = router();
        let mut out = Vec::new();
        let event = RawEvent::mouse(DeviceId(99), 0.0, MouseState::at([0.0, 0.0]));
        assert_eq!(router.route(&event, Some(0), &mut out), RouteOutcome::NotShared);
        assert!(out.is_empty());
    }

    #[test]
    fn test_no_focus_suppresses() {
        let mut router = router();
        let mut out = Vec::new();
        assert_eq!(router.route(&press([1.0, 1.0]), None, &mut out), RouteOutcome::Suppressed);
        assert!(out.is_empty());
    }

    #[test]
    fn test_unknown_display_drops() {
        let mut router = router();
        let mut out = Vec::new();
        assert_eq!(router.route(&press([1.0, 1.0]), Some(7), &mut out), RouteOutcome::Dropped);
        assert!(out.is_empty());
    }

    #[test]
    fn test_forwarded_mouse_is_tagged_with_display() {
        let mut router = router();
        let mut out = Vec::new();
        let outcome = router.route(&press([5.0, 6.0]), Some(1), &mut out);
        assert_eq!(outcome, RouteOutcome::Forwarded { target: MOUSE_1 });
        assert_eq!(out.len(), 1);
        let state = out[0].as_mouse().unwrap();
        assert_eq!(out[0].device, MOUSE_1);
        assert_eq!(state.display_index, 1);
        assert_eq!(state.position, [5.0, 6.0]);
        assert!(state.buttons.contains(MouseButtons::LEFT));
    }

    #[test]
    fn test_focus_change_releases_before_forwarding() {
        let mut router = router();
        let mut out = Vec::new();
        router.route(&press([1.0, 1.0]), Some(0), &mut out);
        out.clear();

        let drag = RawEvent::mouse(
            REAL_MOUSE,
            0.1,
            MouseState::at([2.0, 1.0])
                .with_buttons(MouseButtons::LEFT)
                .with_delta([1.0, 0.0]),
        );
        router.route(&drag, Some(1), &mut out);

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].device, MOUSE_0);
        assert!(out[0].as_mouse().unwrap().buttons.is_empty());
        assert_eq!(out[0].as_mouse().unwrap().delta, [0.0, 0.0]);
        assert_eq!(out[1].device, MOUSE_1);
        // The held button belongs to the old display
        assert!(out[1].as_mouse().unwrap().buttons.is_empty());
    }

    #[test]
    fn test_mask_clears_once_released() {
        let mut router = router();
        let mut out = Vec::new();
        router.route(&press([1.0, 1.0]), Some(0), &mut out);
        router.route(&press([2.0, 1.0]), Some(1), &mut out);

        let release = RawEvent::mouse(REAL_MOUSE, 0.2, MouseState::at([2.0, 1.0]));
        router.route(&release, Some(1), &mut out);
        out.clear();

        router.route(&press([2.0, 1.0]), Some(1), &mut out);
        assert!(out[0].as_mouse().unwrap().buttons.contains(MouseButtons::LEFT));
    }

    #[test]
    fn test_keys_are_released_on_focus_change() {
        let mut router = router();
        let mut out = Vec::new();
        let held = RawEvent::keyboard(
            REAL_KEYBOARD,
            0.0,
            KeyboardState::with_keys([KeyCode::Letter('w')]),
        );
        router.route(&held, Some(0), &mut out);
        out.clear();

        router.route(&held, Some(1), &mut out);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].device, KEYBOARD_0);
        assert!(out[0].as_keyboard().unwrap().is_empty());
        assert_eq!(out[1].device, KEYBOARD_1);
        assert!(out[1].as_keyboard().unwrap().is_empty());
    }

    #[test]
    fn test_text_goes_to_focused_keyboard() {
        let mut router = router();
        let mut out = Vec::new();
        let typed = RawEvent::text(REAL_KEYBOARD, 0.0, 'q');
        assert_eq!(
            router.route(&typed, Some(1), &mut out),
            RouteOutcome::Forwarded { target: KEYBOARD_1 }
        );
        assert_eq!(out[0].payload, EventPayload::Text('q'));
    }
}
