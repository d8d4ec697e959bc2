//! Pointer focus: which display currently owns the shared pointer

use indexmap::IndexMap;
use tracing::debug;

use super::events::DisplayIndex;

/// Rectangular area for viewport hit testing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Check if a point is inside this rectangle
    pub fn contains(&self, pos: [f32; 2]) -> bool {
        pos[0] >= self.x
            && pos[0] <= self.x + self.width
            && pos[1] >= self.y
            && pos[1] <= self.y + self.height
    }
}

/// Source of the "which display is under the pointer" answer
pub trait DisplayProbe {
    /// The display under the system pointer, or `None` when unknown
    fn display_under_pointer(&self) -> Option<DisplayIndex>;
}

/// Viewports laid out on one desktop, each showing one display
#[derive(Debug, Default)]
pub struct ViewportLayout {
    viewports: IndexMap<DisplayIndex, ViewportInfo>,
    pointer: Option<[f32; 2]>,
}

#[derive(Debug, Clone)]
struct ViewportInfo {
    rect: Rect,
    name: String,
}

impl ViewportLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the viewport that shows `display`
    pub fn register_viewport(&mut self, display: DisplayIndex, rect: Rect, name: impl Into<String>) {
        self.viewports.insert(
            display,
            ViewportInfo {
                rect,
                name: name.into(),
            },
        );
    }

    pub fn clear_viewports(&mut self) {
        self.viewports.clear();
    }

    /// Update the system pointer position; `None` when it left every window
    pub fn set_pointer(&mut self, pointer: Option<[f32; 2]>) {
        self.pointer = pointer;
    }

    pub fn viewport_rect(&self, display: DisplayIndex) -> Option<Rect> {
        self.viewports.get(&display).map(|info| info.rect)
    }

    pub fn viewport_name(&self, display: DisplayIndex) -> Option<&str> {
        self.viewports.get(&display).map(|info| info.name.as_str())
    }

    /// Converts a desktop position into pixels local to the display's viewport
    pub fn to_local(&self, display: DisplayIndex, pos: [f32; 2]) -> Option<[f32; 2]> {
        let rect = self.viewport_rect(display)?;
        Some([pos[0] - rect.x, pos[1] - rect.y])
    }
}

impl DisplayProbe for ViewportLayout {
    fn display_under_pointer(&self) -> Option<DisplayIndex> {
        let pointer = self.pointer?;
        // Registration order decides overlaps
        self.viewports
            .iter()
            .find(|(_, info)| info.rect.contains(pointer))
            .map(|(display, _)| *display)
    }
}

/// Polled focus state
///
/// Only valid, changed answers are written; an unknown answer leaves the
/// previous focus in place.
#[derive(Debug, Default)]
pub struct FocusTracker {
    current: Option<DisplayIndex>,
    changes: u64,
}

impl FocusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Poll once; returns true when the focus changed
    pub fn poll(&mut self, probe: &dyn DisplayProbe) -> bool {
        let Some(target_display) = probe.display_under_pointer() else {
            return false;
        };
        if self.current == Some(target_display) {
            return false;
        }
        debug!(from = ?self.current, to = target_display, "Pointer focus moved");
        self.current = Some(target_display);
        self.changes += 1;
        true
    }

    /// Current focus target
    pub fn current(&self) -> Option<DisplayIndex> {
        self.current
    }

    /// How many times the focus has changed
    pub fn changes(&self) -> u64 {
        self.changes
    }
}
