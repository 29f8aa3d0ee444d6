//! Remote input: event model, gesture translation and batching.
//!
//! | Module      | Role                                                    |
//! |-------------|---------------------------------------------------------|
//! | `event`     | `InputEvent`, `InputEventKind`, `InputBatch`, modifiers |
//! | `gesture`   | `CoordinateMapper`, `GestureTranslator`, `RawInput`     |
//! | `optimizer` | `InputOptimizer`: bounded priority queue + latency      |

pub mod event;
pub mod gesture;
pub mod optimizer;

pub use event::{
    EventPriority, GestureEvent, GestureKind, InputBatch, InputEvent, InputEventKind,
    KeyModifiers, PointerButton,
};
pub use gesture::{
    CoordinateMapper, Gesture, GestureTranslator, MultiTouchHandler, PointerAction, RawInput,
    RemoteViewport, TouchPhase, TouchPoint, TouchSample,
};
pub use optimizer::{InputOptimizer, InputQueueStats};
