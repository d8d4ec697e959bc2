//! Per-keyboard text input listeners

use indexmap::IndexMap;
use tracing::debug;

use super::device::{DeviceChange, DeviceId, DeviceKind};
use super::events::{EventPayload, RawEvent};

/// Collects typed characters for every keyboard that is currently attached
///
/// Listeners follow device-change notifications: a keyboard gets a listener
/// when it is added and loses it (and any unread text) when removed.
#[derive(Debug, Default)]
pub struct TextInputListeners {
    buffers: IndexMap<DeviceId, String>,
}

impl TextInputListeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach or detach a listener for a device change
    pub fn on_device_change(&mut self, change: DeviceChange) {
        match change {
            DeviceChange::Added(id, DeviceKind::Keyboard) => {
                debug!(device = %id, "Text listener attached");
                self.buffers.entry(id).or_default();
            }
            DeviceChange::Removed(id, DeviceKind::Keyboard) => {
                if self.buffers.shift_remove(&id).is_some() {
                    debug!(device = %id, "Text listener detached");
                }
            }
            DeviceChange::Added(..) | DeviceChange::Removed(..) => {}
        }
    }

    /// Feeds a delivered event; returns true if it was a character for a listened keyboard
    pub fn deliver(&mut self, event: &RawEvent) -> bool {
        let EventPayload::Text(character) = event.payload else {
            return false;
        };
        match self.buffers.get_mut(&event.device) {
            Some(buffer) => {
                buffer.push(character);
                true
            }
            None => false,
        }
    }

    pub fn is_listening(&self, device: DeviceId) -> bool {
        self.buffers.contains_key(&device)
    }

    /// Takes the unread text typed on `device`
    pub fn take_text(&mut self, device: DeviceId) -> String {
        self.buffers
            .get_mut(&device)
            .map(std::mem::take)
            .unwrap_or_default()
    }
}
