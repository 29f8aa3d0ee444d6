//! Outbound remote-input events.
//!
//! Every event that leaves the client is an [`InputEvent`]: a
//! timestamp plus a closed [`InputEventKind`] carrying only the fields
//! its variant needs. Dispatch code matches exhaustively, so adding a
//! variant is a compile error everywhere it must be handled.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

// ── Modifiers ────────────────────────────────────────────────────

bitflags! {
    /// Keyboard modifiers held while a key event fired.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct KeyModifiers: u8 {
        const SHIFT = 0b0000_0001;
        const CONTROL = 0b0000_0010;
        const ALT = 0b0000_0100;
        const META = 0b0000_1000;
    }
}

// ── Buttons ──────────────────────────────────────────────────────

/// Remote pointer button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointerButton {
    Left,
    Right,
    Middle,
}

// ── Gestures ─────────────────────────────────────────────────────

/// Multi-touch gesture family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GestureKind {
    Pinch,
    Rotate,
    Swipe,
}

/// A multi-touch gesture forwarded as-is to the remote side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GestureEvent {
    pub kind: GestureKind,
    /// Gesture centroid in remote pixels.
    pub x: i32,
    pub y: i32,
    /// Relative scale since gesture start (pinch).
    pub scale: f32,
    /// Rotation since gesture start, radians (rotate).
    pub rotation: f32,
    /// Centroid velocity in remote pixels per second (swipe).
    pub velocity: f32,
}

// ── InputEvent ───────────────────────────────────────────────────

/// What happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InputEventKind {
    Key {
        code: u16,
        pressed: bool,
        modifiers: KeyModifiers,
    },
    PointerMove {
        x: i32,
        y: i32,
    },
    PointerDown {
        x: i32,
        y: i32,
        button: PointerButton,
        /// Click count: 1 for a click, 2 for the second half of a
        /// double-click.
        clicks: u8,
    },
    PointerUp {
        x: i32,
        y: i32,
        button: PointerButton,
        clicks: u8,
    },
    Gesture(GestureEvent),
}

/// Dispatch class of an event within a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventPriority {
    /// User intents: key and button transitions, gestures. Never
    /// dropped while a continuous sample can go instead.
    Discrete = 0,
    /// Pointer motion samples; superseded by the next one anyway.
    Continuous = 1,
}

/// A timestamped remote-input event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputEvent {
    /// Microseconds since the session epoch.
    pub timestamp_us: u64,
    pub kind: InputEventKind,
}

impl InputEvent {
    pub fn new(timestamp_us: u64, kind: InputEventKind) -> Self {
        Self { timestamp_us, kind }
    }

    pub fn key(timestamp_us: u64, code: u16, pressed: bool, modifiers: KeyModifiers) -> Self {
        Self::new(
            timestamp_us,
            InputEventKind::Key {
                code,
                pressed,
                modifiers,
            },
        )
    }

    pub fn pointer_move(timestamp_us: u64, x: i32, y: i32) -> Self {
        Self::new(timestamp_us, InputEventKind::PointerMove { x, y })
    }

    pub fn pointer_down(timestamp_us: u64, x: i32, y: i32, button: PointerButton, clicks: u8) -> Self {
        Self::new(
            timestamp_us,
            InputEventKind::PointerDown {
                x,
                y,
                button,
                clicks,
            },
        )
    }

    pub fn pointer_up(timestamp_us: u64, x: i32, y: i32, button: PointerButton, clicks: u8) -> Self {
        Self::new(
            timestamp_us,
            InputEventKind::PointerUp {
                x,
                y,
                button,
                clicks,
            },
        )
    }

    pub fn priority(&self) -> EventPriority {
        match self.kind {
            InputEventKind::PointerMove { .. } => EventPriority::Continuous,
            InputEventKind::Key { .. }
            | InputEventKind::PointerDown { .. }
            | InputEventKind::PointerUp { .. }
            | InputEventKind::Gesture(_) => EventPriority::Discrete,
        }
    }

    pub fn is_continuous(&self) -> bool {
        self.priority() == EventPriority::Continuous
    }
}

// ── InputBatch ───────────────────────────────────────────────────

/// Events drained on one batch tick, already priority-ordered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputBatch {
    /// Monotonic per-session batch number; acknowledged by the remote
    /// side to measure round-trip latency.
    pub sequence: u64,
    pub events: Vec<InputEvent>,
}

impl InputBatch {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}
