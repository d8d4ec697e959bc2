//! Raw low-level input events as delivered by the platform input layer

use std::collections::BTreeSet;

use bitflags::bitflags;

use super::device::DeviceId;

/// Index of a display / viewport a camera renders to
pub type DisplayIndex = u16;

bitflags! {
    /// Pressed mouse buttons
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MouseButtons: u8 {
        const LEFT = 1 << 0;
        const RIGHT = 1 << 1;
        const MIDDLE = 1 << 2;
        const BACK = 1 << 3;
        const FORWARD = 1 << 4;
    }
}

/// Full mouse state carried by a mouse state event
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MouseState {
    /// Pointer position in display pixels
    pub position: [f32; 2],
    /// Movement since the previous state event
    pub delta: [f32; 2],
    /// Scroll delta (x, y)
    pub scroll: [f32; 2],
    /// Buttons held in this state
    pub buttons: MouseButtons,
    /// Display the state was produced on
    pub display_index: DisplayIndex,
}

impl MouseState {
    /// Mouse state at `position` with nothing held
    pub fn at(position: [f32; 2]) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Builder: set the held buttons
    pub fn with_buttons(mut self, buttons: MouseButtons) -> Self {
        self.buttons = buttons;
        self
    }

    /// Builder: set the movement delta
    pub fn with_delta(mut self, delta: [f32; 2]) -> Self {
        self.delta = delta;
        self
    }

    /// The same pointer at rest: no buttons, no movement, no scroll
    pub fn released(&self) -> Self {
        Self {
            position: self.position,
            delta: [0.0, 0.0],
            scroll: [0.0, 0.0],
            buttons: MouseButtons::empty(),
            display_index: self.display_index,
        }
    }
}

/// Key identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyCode {
    Space,
    Enter,
    Escape,
    Backspace,
    Tab,
    LeftShift,
    RightShift,
    LeftCtrl,
    RightCtrl,
    LeftAlt,
    RightAlt,
    Left,
    Right,
    Up,
    Down,
    /// Letter key, `'a'..='z'`
    Letter(char),
    /// Digit key, `0..=9`
    Digit(u8),
    /// Function key, `F1..=F12`
    Function(u8),
    /// Anything else, by platform scan code
    Other(u16),
}

/// Set of keys held in a keyboard state event
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyboardState {
    pressed: BTreeSet<KeyCode>,
}

impl KeyboardState {
    /// Creates a state with no keys held
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a state with the given keys held
    pub fn with_keys(keys: impl IntoIterator<Item = KeyCode>) -> Self {
        Self {
            pressed: keys.into_iter().collect(),
        }
    }

    pub fn press(&mut self, key: KeyCode) {
        self.pressed.insert(key);
    }

    pub fn release(&mut self, key: KeyCode) {
        self.pressed.remove(&key);
    }

    pub fn is_pressed(&self, key: KeyCode) -> bool {
        self.pressed.contains(&key)
    }

    /// Returns true if no key is held
    pub fn is_empty(&self) -> bool {
        self.pressed.is_empty()
    }

    /// Iterate the held keys in key order
    pub fn keys(&self) -> impl Iterator<Item = KeyCode> + '_ {
        self.pressed.iter().copied()
    }

    /// This state with every key in `masked` removed
    pub fn without(&self, masked: &BTreeSet<KeyCode>) -> Self {
        Self {
            pressed: self.pressed.difference(masked).copied().collect(),
        }
    }
}

/// Touch contact phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchPhase {
    Began,
    Moved,
    Stationary,
    Ended,
    Canceled,
}

/// One touch contact
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchState {
    pub touch_id: u32,
    pub position: [f32; 2],
    pub phase: TouchPhase,
}

/// Payload of a raw event
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    /// Full mouse state snapshot
    Mouse(MouseState),
    /// Full keyboard state snapshot
    Keyboard(KeyboardState),
    /// A typed character
    Text(char),
    /// Touch contact update
    Touch(TouchState),
}

/// A raw input event tagged with the device that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent {
    /// Originating (or, after routing, destination) device
    pub device: DeviceId,
    /// Platform timestamp in seconds
    pub time: f64,
    pub payload: EventPayload,
}

impl RawEvent {
    pub fn mouse(device: DeviceId, time: f64, state: MouseState) -> Self {
        Self {
            device,
            time,
            payload: EventPayload::Mouse(state),
        }
    }

    pub fn keyboard(device: DeviceId, time: f64, state: KeyboardState) -> Self {
        Self {
            device,
            time,
            payload: EventPayload::Keyboard(state),
        }
    }

    pub fn text(device: DeviceId, time: f64, character: char) -> Self {
        Self {
            device,
            time,
            payload: EventPayload::Text(character),
        }
    }

    pub fn touch(device: DeviceId, time: f64, state: TouchState) -> Self {
        Self {
            device,
            time,
            payload: EventPayload::Touch(state),
        }
    }

    /// Returns the mouse state if this is a mouse event
    pub fn as_mouse(&self) -> Option<&MouseState> {
        match &self.payload {
            EventPayload::Mouse(state) => Some(state),
            _ => None,
        }
    }

    /// Returns the keyboard state if this is a keyboard event
    pub fn as_keyboard(&self) -> Option<&KeyboardState> {
        match &self.payload {
            EventPayload::Keyboard(state) => Some(state),
            _ => None,
        }
    }
}
