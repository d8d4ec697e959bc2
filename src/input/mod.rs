//! Per-user input demultiplexing
//!
//! Tracks input devices, the users they are paired to, each user's private
//! copy of the action bindings, and redirects events from shared devices
//! when several players are simulated in one process.
//!
//! # Architecture
//!
//! ```text
//! Raw events (platform) ──► EventRouter ──► synthetic per-player devices
//!                              ▲
//!                        FocusTracker ◄── DisplayProbe (viewport under pointer)
//!
//! InputUsers = DeviceRegistry + user table + pairings
//! ```

mod actions;
mod device;
mod events;
mod focus;
mod pairing;
mod router;
mod text;
mod users;

pub use actions::{Action, ActionBindingSet, ActionId, ActionMap, ActionReference, Binding, clone_for_user};
pub use device::{Device, DeviceChange, DeviceId, DeviceKind, DeviceOrigin, DeviceRegistry, DeviceScope};
pub use events::{
    DisplayIndex, EventPayload, KeyCode, KeyboardState, MouseButtons, MouseState, RawEvent,
    TouchPhase, TouchState,
};
pub use focus::{DisplayProbe, FocusTracker, Rect, ViewportLayout};
pub use pairing::{InputUsers, OwnershipLookup};
pub use router::{EventRouter, PlayerDevices, RouteOutcome, SharedDevices};
pub use text::TextInputListeners;
pub use users::{User, UserId, UserIndexAllocator};
