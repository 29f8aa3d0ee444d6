//! Local → remote geometry and touch gesture classification.
//!
//! ```text
//!                  ┌──────────── GestureTranslator ────────────┐
//! RawInput ──────► │ Touch ─► state machine ─┐                 │
//!  (platform)      │ Pointer ───────────────►├► CoordinateMapper ├─► Vec<InputEvent>
//!                  │ Key ────────────────────┘                 │    (→ InputOptimizer)
//!                  └───────────────────────────────────────────┘
//! ```
//!
//! Touch state machine:
//!
//! ```text
//!   Idle ──start──► Touching ──release (short, still)──► Idle   tap / double-tap
//!                      │      ──release (long, still)───► Idle   long-press
//!                      └─move > threshold─► Dragging ──release──► Idle   pointer-up
//! ```
//!
//! The translator never talks to the transport; it only produces
//! events for the input queue.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::GestureConfig;
use crate::input::event::{
    GestureEvent, InputEvent, InputEventKind, KeyModifiers, PointerButton,
};

// ── RemoteViewport ───────────────────────────────────────────────

/// Largest remote surface edge accepted from the wire, in pixels.
pub const MAX_REMOTE_DIMENSION: u32 = 16_384;

/// Local view size and remote desktop size, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteViewport {
    pub local_width: u32,
    pub local_height: u32,
    pub remote_width: u32,
    pub remote_height: u32,
}

impl RemoteViewport {
    pub fn new(local_width: u32, local_height: u32, remote_width: u32, remote_height: u32) -> Self {
        Self {
            local_width: local_width.max(1),
            local_height: local_height.max(1),
            remote_width: remote_width.max(1),
            remote_height: remote_height.max(1),
        }
    }

    /// Whether a remote size is one a real desktop could report.
    pub fn is_plausible_remote(width: u32, height: u32) -> bool {
        let range = 1..=MAX_REMOTE_DIMENSION;
        range.contains(&width) && range.contains(&height)
    }
}

/// Largest valid coordinate on an edge of `len` pixels.
fn last_pixel(len: u32) -> i32 {
    i32::try_from(len).unwrap_or(i32::MAX).saturating_sub(1).max(0)
}

// ── CoordinateMapper ─────────────────────────────────────────────

/// Linear scaling between local screen pixels and remote pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    viewport: RemoteViewport,
}

impl CoordinateMapper {
    pub fn new(viewport: RemoteViewport) -> Self {
        Self { viewport }
    }

    pub fn viewport(&self) -> RemoteViewport {
        self.viewport
    }

    /// Swap in a renegotiated viewport.
    pub fn set_viewport(&mut self, viewport: RemoteViewport) {
        self.viewport = viewport;
    }

    /// Scale a local point onto a `remote_w × remote_h` surface,
    /// rounding to the nearest pixel.
    pub fn screen_to_remote(&self, x: f64, y: f64, remote_w: u32, remote_h: u32) -> (i32, i32) {
        let sx = remote_w as f64 / self.viewport.local_width.max(1) as f64;
        let sy = remote_h as f64 / self.viewport.local_height.max(1) as f64;
        ((x * sx).round() as i32, (y * sy).round() as i32)
    }

    /// Inverse of [`screen_to_remote`](Self::screen_to_remote).
    pub fn remote_to_screen(&self, x: i32, y: i32, remote_w: u32, remote_h: u32) -> (i32, i32) {
        let sx = self.viewport.local_width as f64 / remote_w.max(1) as f64;
        let sy = self.viewport.local_height as f64 / remote_h.max(1) as f64;
        ((x as f64 * sx).round() as i32, (y as f64 * sy).round() as i32)
    }

    /// Map a local point onto the current remote surface, clamped to
    /// its bounds.
    pub fn to_remote(&self, x: f64, y: f64) -> (i32, i32) {
        let vp = self.viewport;
        let (rx, ry) = self.screen_to_remote(x, y, vp.remote_width, vp.remote_height);
        (
            rx.clamp(0, last_pixel(vp.remote_width)),
            ry.clamp(0, last_pixel(vp.remote_height)),
        )
    }

    /// Map a remote point back to local screen pixels.
    pub fn to_screen(&self, x: i32, y: i32) -> (i32, i32) {
        let vp = self.viewport;
        self.remote_to_screen(x, y, vp.remote_width, vp.remote_height)
    }
}

// ── Raw platform input ───────────────────────────────────────────

/// One finger, in local screen pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchPoint {
    pub id: u64,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchPhase {
    Start,
    Move,
    End,
    Cancel,
}

/// A touch sample as delivered by the platform.
#[derive(Debug, Clone, PartialEq)]
pub struct TouchSample {
    pub phase: TouchPhase,
    /// Active touch points, oldest contact first.
    pub points: Vec<TouchPoint>,
    pub timestamp: Instant,
}

/// Mouse-style pointer activity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerAction {
    Move,
    Down(PointerButton),
    Up(PointerButton),
}

/// Raw input from the platform input source.
#[derive(Debug, Clone, PartialEq)]
pub enum RawInput {
    Touch(TouchSample),
    Pointer {
        action: PointerAction,
        x: f64,
        y: f64,
        timestamp: Instant,
    },
    Key {
        code: u16,
        pressed: bool,
        modifiers: KeyModifiers,
        timestamp: Instant,
    },
}

// ── Multi-touch extension point ──────────────────────────────────

/// Hook for turning multi-finger samples into [`GestureEvent`]s.
///
/// Without a handler, the newest touch point of a multi-finger sample
/// drives the single-pointer state machine.
pub trait MultiTouchHandler: Send {
    /// Inspect a sample with two or more points. Returning `Some`
    /// consumes the sample; `None` falls back to single-pointer
    /// handling.
    fn on_multi_touch(
        &mut self,
        sample: &TouchSample,
        mapper: &CoordinateMapper,
    ) -> Option<GestureEvent>;
}

// ── GestureTranslator ────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
enum TouchState {
    Idle,
    Touching {
        started: Instant,
        start: (f64, f64),
        last: (f64, f64),
    },
    Dragging {
        last: (f64, f64),
    },
}

/// A completed tap, remembered for double-tap detection.
#[derive(Debug, Clone, Copy)]
struct LastTap {
    at: Instant,
    pos: (f64, f64),
}

/// What a released touch was classified as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    Tap,
    DoubleTap,
    LongPress,
    DragStart,
    DragEnd,
}

/// Converts raw platform input into remote [`InputEvent`]s.
pub struct GestureTranslator {
    mapper: CoordinateMapper,
    config: GestureConfig,
    epoch: Instant,
    state: TouchState,
    last_tap: Option<LastTap>,
    last_gesture: Option<Gesture>,
    multi_touch: Option<Box<dyn MultiTouchHandler>>,
}

impl GestureTranslator {
    pub fn new(viewport: RemoteViewport, config: GestureConfig) -> Self {
        Self::with_epoch(viewport, config, Instant::now())
    }

    /// Timestamps are reported relative to `epoch`.
    pub fn with_epoch(viewport: RemoteViewport, config: GestureConfig, epoch: Instant) -> Self {
        Self {
            mapper: CoordinateMapper::new(viewport),
            config,
            epoch,
            state: TouchState::Idle,
            last_tap: None,
            last_gesture: None,
            multi_touch: None,
        }
    }

    /// Install a multi-touch handler.
    pub fn set_multi_touch_handler(&mut self, handler: Box<dyn MultiTouchHandler>) {
        self.multi_touch = Some(handler);
    }

    pub fn mapper(&self) -> &CoordinateMapper {
        &self.mapper
    }

    /// Replace the viewport after a remote resolution change.
    pub fn set_viewport(&mut self, viewport: RemoteViewport) {
        self.mapper.set_viewport(viewport);
    }

    /// Classification of the most recent touch gesture.
    pub fn last_gesture(&self) -> Option<Gesture> {
        self.last_gesture
    }

    pub fn is_idle(&self) -> bool {
        self.state == TouchState::Idle
    }

    /// Translate one raw input into zero or more remote events.
    pub fn translate(&mut self, input: RawInput) -> Vec<InputEvent> {
        match input {
            RawInput::Key {
                code,
                pressed,
                modifiers,
                timestamp,
            } => vec![InputEvent::key(self.stamp(timestamp), code, pressed, modifiers)],
            RawInput::Pointer {
                action,
                x,
                y,
                timestamp,
            } => {
                let ts = self.stamp(timestamp);
                let (rx, ry) = self.mapper.to_remote(x, y);
                let event = match action {
                    PointerAction::Move => InputEvent::pointer_move(ts, rx, ry),
                    PointerAction::Down(button) => InputEvent::pointer_down(ts, rx, ry, button, 1),
                    PointerAction::Up(button) => InputEvent::pointer_up(ts, rx, ry, button, 1),
                };
                vec![event]
            }
            RawInput::Touch(sample) => self.on_touch(sample),
        }
    }

    fn on_touch(&mut self, sample: TouchSample) -> Vec<InputEvent> {
        if sample.points.len() > 1 {
            if let Some(handler) = self.multi_touch.as_mut() {
                if let Some(gesture) = handler.on_multi_touch(&sample, &self.mapper) {
                    let ts = self.stamp(sample.timestamp);
                    return vec![InputEvent::new(ts, InputEventKind::Gesture(gesture))];
                }
            }
        }

        // The newest contact is authoritative when several are down.
        let pos = sample.points.last().map(|p| (p.x, p.y));
        let now = sample.timestamp;

        match (sample.phase, pos) {
            (TouchPhase::Start, Some(pos)) => self.on_start(now, pos),
            (TouchPhase::Move, Some(pos)) => self.on_move(now, pos),
            (TouchPhase::End, pos) => self.on_release(now, pos),
            (TouchPhase::Cancel, _) => self.on_cancel(now),
            (_, None) => Vec::new(),
        }
    }

    fn on_start(&mut self, now: Instant, pos: (f64, f64)) -> Vec<InputEvent> {
        match self.state {
            TouchState::Idle => {
                self.state = TouchState::Touching {
                    started: now,
                    start: pos,
                    last: pos,
                };
                Vec::new()
            }
            // Another finger landed mid-gesture: follow it.
            TouchState::Touching { .. } | TouchState::Dragging { .. } => self.on_move(now, pos),
        }
    }

    fn on_move(&mut self, now: Instant, pos: (f64, f64)) -> Vec<InputEvent> {
        match self.state {
            TouchState::Idle => Vec::new(),
            TouchState::Touching { started, start, .. } => {
                if distance(start, pos) <= self.config.drag_threshold_px {
                    self.state = TouchState::Touching {
                        started,
                        start,
                        last: pos,
                    };
                    return Vec::new();
                }
                self.state = TouchState::Dragging { last: pos };
                self.last_gesture = Some(Gesture::DragStart);
                self.last_tap = None;
                let ts = self.stamp(now);
                let (sx, sy) = self.mapper.to_remote(start.0, start.1);
                let (rx, ry) = self.mapper.to_remote(pos.0, pos.1);
                trace!(sx, sy, "drag started");
                vec![
                    InputEvent::pointer_down(ts, sx, sy, PointerButton::Left, 1),
                    InputEvent::pointer_move(ts, rx, ry),
                ]
            }
            TouchState::Dragging { .. } => {
                self.state = TouchState::Dragging { last: pos };
                let (rx, ry) = self.mapper.to_remote(pos.0, pos.1);
                vec![InputEvent::pointer_move(self.stamp(now), rx, ry)]
            }
        }
    }

    fn on_release(&mut self, now: Instant, pos: Option<(f64, f64)>) -> Vec<InputEvent> {
        let state = std::mem::replace(&mut self.state, TouchState::Idle);
        let ts = self.stamp(now);

        match state {
            TouchState::Idle => Vec::new(),
            TouchState::Dragging { last } => {
                let (x, y) = pos.unwrap_or(last);
                let (rx, ry) = self.mapper.to_remote(x, y);
                self.last_gesture = Some(Gesture::DragEnd);
                vec![InputEvent::pointer_up(ts, rx, ry, PointerButton::Left, 1)]
            }
            TouchState::Touching { started, start, last } => {
                let end = pos.unwrap_or(last);
                if distance(start, end) > self.config.drag_threshold_px {
                    // Moved too far between samples to be a tap; treat
                    // as a drag that started and ended in one step.
                    let (sx, sy) = self.mapper.to_remote(start.0, start.1);
                    let (rx, ry) = self.mapper.to_remote(end.0, end.1);
                    self.last_gesture = Some(Gesture::DragEnd);
                    self.last_tap = None;
                    return vec![
                        InputEvent::pointer_down(ts, sx, sy, PointerButton::Left, 1),
                        InputEvent::pointer_move(ts, rx, ry),
                        InputEvent::pointer_up(ts, rx, ry, PointerButton::Left, 1),
                    ];
                }

                let held = now.saturating_duration_since(started);
                let (rx, ry) = self.mapper.to_remote(start.0, start.1);

                if held >= Duration::from_millis(self.config.long_press_ms) {
                    self.last_gesture = Some(Gesture::LongPress);
                    self.last_tap = None;
                    return click(ts, rx, ry, PointerButton::Right, 1);
                }

                if self.is_double_tap(now, start) {
                    self.last_gesture = Some(Gesture::DoubleTap);
                    self.last_tap = None;
                    return click(ts, rx, ry, PointerButton::Left, 2);
                }

                self.last_gesture = Some(Gesture::Tap);
                self.last_tap = Some(LastTap { at: now, pos: start });
                click(ts, rx, ry, PointerButton::Left, 1)
            }
        }
    }

    fn on_cancel(&mut self, now: Instant) -> Vec<InputEvent> {
        let state = std::mem::replace(&mut self.state, TouchState::Idle);
        match state {
            TouchState::Dragging { last } => {
                let (rx, ry) = self.mapper.to_remote(last.0, last.1);
                self.last_gesture = Some(Gesture::DragEnd);
                vec![InputEvent::pointer_up(self.stamp(now), rx, ry, PointerButton::Left, 1)]
            }
            TouchState::Idle | TouchState::Touching { .. } => Vec::new(),
        }
    }

    fn is_double_tap(&self, now: Instant, pos: (f64, f64)) -> bool {
        self.last_tap.is_some_and(|tap| {
            now.saturating_duration_since(tap.at)
                < Duration::from_millis(self.config.double_tap_window_ms)
                && distance(tap.pos, pos) <= self.config.double_tap_distance_px
        })
    }

    fn stamp(&self, at: Instant) -> u64 {
        at.saturating_duration_since(self.epoch).as_micros() as u64
    }
}

fn click(ts: u64, x: i32, y: i32, button: PointerButton, clicks: u8) -> Vec<InputEvent> {
    vec![
        InputEvent::pointer_down(ts, x, y, button, clicks),
        InputEvent::pointer_up(ts, x, y, button, clicks),
    ]
}

fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    (a.0 - b.0).hypot(a.1 - b.1)
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> RemoteViewport {
        // Phone in landscape viewing a 1080p desktop.
        RemoteViewport::new(960, 540, 1920, 1080)
    }

    struct Harness {
        translator: GestureTranslator,
        t0: Instant,
    }

    impl Harness {
        fn new() -> Self {
            let t0 = Instant::now();
            Self {
                translator: GestureTranslator::with_epoch(viewport(), GestureConfig::default(), t0),
                t0,
            }
        }

        fn touch(&mut self, phase: TouchPhase, ms: u64, points: &[(f64, f64)]) -> Vec<InputEvent> {
            let sample = TouchSample {
                phase,
                points: points
                    .iter()
                    .enumerate()
                    .map(|(i, &(x, y))| TouchPoint { id: i as u64, x, y })
                    .collect(),
                timestamp: self.t0 + Duration::from_millis(ms),
            };
            self.translator.translate(RawInput::Touch(sample))
        }

        fn tap(&mut self, at_ms: u64, pos: (f64, f64)) -> Vec<InputEvent> {
            assert!(self.touch(TouchPhase::Start, at_ms, &[pos]).is_empty());
            self.touch(TouchPhase::End, at_ms + 80, &[pos])
        }
    }

    #[test]
    fn screen_to_remote_scales_and_rounds() {
        let mapper = CoordinateMapper::new(viewport());
        assert_eq!(mapper.screen_to_remote(100.0, 50.0, 1920, 1080), (200, 100));
        assert_eq!(mapper.screen_to_remote(10.3, 10.7, 1920, 1080), (21, 21));
        assert_eq!(mapper.remote_to_screen(200, 100, 1920, 1080), (100, 50));
    }

    #[test]
    fn round_trip_within_one_pixel() {
        let viewports = [
            RemoteViewport::new(960, 540, 1920, 1080),
            RemoteViewport::new(2340, 1080, 1920, 1080),
            RemoteViewport::new(1080, 2340, 2560, 1440),
            RemoteViewport::new(1366, 768, 1024, 768),
        ];
        for vp in viewports {
            let mapper = CoordinateMapper::new(vp);
            for x in (0..vp.local_width).step_by(7) {
                for y in (0..vp.local_height).step_by(11) {
                    let (rx, ry) = mapper.screen_to_remote(x as f64, y as f64, vp.remote_width, vp.remote_height);
                    let (bx, by) = mapper.remote_to_screen(rx, ry, vp.remote_width, vp.remote_height);
                    assert!((bx - x as i32).abs() <= 1, "{vp:?}: x {x} → {rx} → {bx}");
                    assert!((by - y as i32).abs() <= 1, "{vp:?}: y {y} → {ry} → {by}");
                }
            }
        }
    }

    #[test]
    fn to_remote_clamps_to_surface() {
        let mapper = CoordinateMapper::new(viewport());
        assert_eq!(mapper.to_remote(-5.0, 9_999.0), (0, 1079));
    }

    #[test]
    fn to_remote_survives_unbounded_viewport() {
        // Public fields bypass `RemoteViewport::new`.
        let mapper = CoordinateMapper::new(RemoteViewport {
            local_width: 0,
            local_height: 540,
            remote_width: u32::MAX,
            remote_height: 0,
        });
        let (x, y) = mapper.to_remote(10.0, 10.0);
        assert!(x >= 0);
        assert_eq!(y, 0);
    }

    #[test]
    fn implausible_remote_sizes() {
        assert!(RemoteViewport::is_plausible_remote(3840, 2160));
        assert!(RemoteViewport::is_plausible_remote(MAX_REMOTE_DIMENSION, 1));
        assert!(!RemoteViewport::is_plausible_remote(0, 1080));
        assert!(!RemoteViewport::is_plausible_remote(u32::MAX, 1080));
    }

    #[test]
    fn tap_emits_left_click() {
        let mut h = Harness::new();
        let events = h.tap(0, (100.0, 50.0));
        assert_eq!(
            events.iter().map(|e| e.kind.clone()).collect::<Vec<_>>(),
            vec![
                InputEventKind::PointerDown { x: 200, y: 100, button: PointerButton::Left, clicks: 1 },
                InputEventKind::PointerUp { x: 200, y: 100, button: PointerButton::Left, clicks: 1 },
            ]
        );
        assert_eq!(h.translator.last_gesture(), Some(Gesture::Tap));
        assert!(h.translator.is_idle());
    }

    #[test]
    fn small_jitter_still_taps() {
        let mut h = Harness::new();
        h.touch(TouchPhase::Start, 0, &[(100.0, 100.0)]);
        assert!(h.touch(TouchPhase::Move, 20, &[(104.0, 103.0)]).is_empty());
        let events = h.touch(TouchPhase::End, 60, &[(104.0, 103.0)]);
        assert_eq!(events.len(), 2);
        assert_eq!(h.translator.last_gesture(), Some(Gesture::Tap));
    }

    #[test]
    fn long_press_emits_right_click() {
        let mut h = Harness::new();
        h.touch(TouchPhase::Start, 0, &[(10.0, 10.0)]);
        let events = h.touch(TouchPhase::End, 650, &[(10.0, 10.0)]);
        assert!(matches!(
            events[0].kind,
            InputEventKind::PointerDown { button: PointerButton::Right, .. }
        ));
        assert!(matches!(
            events[1].kind,
            InputEventKind::PointerUp { button: PointerButton::Right, .. }
        ));
        assert_eq!(h.translator.last_gesture(), Some(Gesture::LongPress));
    }

    #[test]
    fn two_quick_taps_become_double_click() {
        let mut h = Harness::new();
        let first = h.tap(0, (300.0, 200.0));
        assert!(matches!(first[0].kind, InputEventKind::PointerDown { clicks: 1, .. }));

        let second = h.tap(200, (305.0, 204.0));
        assert!(matches!(
            second[0].kind,
            InputEventKind::PointerDown { clicks: 2, button: PointerButton::Left, .. }
        ));
        assert_eq!(h.translator.last_gesture(), Some(Gesture::DoubleTap));

        // A third tap starts a fresh sequence.
        let third = h.tap(400, (305.0, 204.0));
        assert!(matches!(third[0].kind, InputEventKind::PointerDown { clicks: 1, .. }));
    }

    #[test]
    fn slow_or_distant_second_tap_is_single() {
        let mut h = Harness::new();
        h.tap(0, (300.0, 200.0));
        let late = h.tap(500, (300.0, 200.0));
        assert!(matches!(late[0].kind, InputEventKind::PointerDown { clicks: 1, .. }));

        let far = h.tap(700, (500.0, 200.0));
        assert!(matches!(far[0].kind, InputEventKind::PointerDown { clicks: 1, .. }));
    }

    #[test]
    fn drag_emits_down_moves_up() {
        let mut h = Harness::new();
        h.touch(TouchPhase::Start, 0, &[(100.0, 100.0)]);
        let start = h.touch(TouchPhase::Move, 16, &[(130.0, 100.0)]);
        assert_eq!(start.len(), 2);
        assert!(matches!(start[0].kind, InputEventKind::PointerDown { x: 200, y: 200, .. }));
        assert!(matches!(start[1].kind, InputEventKind::PointerMove { x: 260, y: 200 }));

        let mid = h.touch(TouchPhase::Move, 32, &[(150.0, 110.0)]);
        assert_eq!(mid.len(), 1);
        assert!(matches!(mid[0].kind, InputEventKind::PointerMove { x: 300, y: 220 }));

        let end = h.touch(TouchPhase::End, 48, &[(150.0, 110.0)]);
        assert_eq!(end.len(), 1);
        assert!(matches!(
            end[0].kind,
            InputEventKind::PointerUp { x: 300, y: 220, button: PointerButton::Left, .. }
        ));
        assert!(h.translator.is_idle());
        assert_eq!(h.translator.last_gesture(), Some(Gesture::DragEnd));
    }

    #[test]
    fn cancel_mid_drag_releases_button() {
        let mut h = Harness::new();
        h.touch(TouchPhase::Start, 0, &[(0.0, 0.0)]);
        h.touch(TouchPhase::Move, 10, &[(50.0, 0.0)]);
        let events = h.touch(TouchPhase::Cancel, 20, &[]);
        assert!(matches!(events[0].kind, InputEventKind::PointerUp { .. }));
        assert!(h.translator.is_idle());
    }

    #[test]
    fn multi_touch_without_handler_follows_latest_point() {
        let mut h = Harness::new();
        h.touch(TouchPhase::Start, 0, &[(10.0, 10.0)]);
        let events = h.touch(TouchPhase::Move, 10, &[(10.0, 10.0), (400.0, 300.0)]);
        assert!(matches!(events[1].kind, InputEventKind::PointerMove { x: 800, y: 600 }));
    }

    #[test]
    fn multi_touch_handler_emits_gesture() {
        struct PinchDetector;
        impl MultiTouchHandler for PinchDetector {
            fn on_multi_touch(
                &mut self,
                sample: &TouchSample,
                mapper: &CoordinateMapper,
            ) -> Option<GestureEvent> {
                let (a, b) = (sample.points[0], sample.points[1]);
                let (x, y) = mapper.to_remote((a.x + b.x) / 2.0, (a.y + b.y) / 2.0);
                Some(GestureEvent {
                    kind: crate::input::event::GestureKind::Pinch,
                    x,
                    y,
                    scale: 2.0,
                    rotation: 0.0,
                    velocity: 0.0,
                })
            }
        }

        let mut h = Harness::new();
        h.translator.set_multi_touch_handler(Box::new(PinchDetector));
        let events = h.touch(TouchPhase::Move, 5, &[(100.0, 100.0), (200.0, 100.0)]);
        assert_eq!(events.len(), 1);
        match &events[0].kind {
            InputEventKind::Gesture(g) => assert_eq!((g.x, g.y), (300, 200)),
            other => panic!("expected gesture, got {other:?}"),
        }
    }

    #[test]
    fn pointer_and_key_pass_through() {
        let mut h = Harness::new();
        let ts = h.t0 + Duration::from_millis(3);
        let events = h.translator.translate(RawInput::Pointer {
            action: PointerAction::Down(PointerButton::Middle),
            x: 480.0,
            y: 270.0,
            timestamp: ts,
        });
        assert_eq!(events[0].timestamp_us, 3_000);
        assert!(matches!(
            events[0].kind,
            InputEventKind::PointerDown { x: 960, y: 540, button: PointerButton::Middle, clicks: 1 }
        ));

        let events = h.translator.translate(RawInput::Key {
            code: 0x1C,
            pressed: true,
            modifiers: KeyModifiers::ALT,
            timestamp: ts,
        });
        assert!(matches!(events[0].kind, InputEventKind::Key { code: 0x1C, pressed: true, .. }));
    }

    #[test]
    fn viewport_renegotiation_changes_mapping() {
        let mut h = Harness::new();
        h.translator.set_viewport(RemoteViewport::new(960, 540, 3840, 2160));
        let events = h.tap(0, (100.0, 50.0));
        assert!(matches!(events[0].kind, InputEventKind::PointerDown { x: 400, y: 200, .. }));
    }
}
