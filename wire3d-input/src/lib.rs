/// wire3d Input - Pointer polling for camera control
///
/// A [`Pointer`] owns one pointing-device backend and, while polling,
/// a background thread that folds device events into position, button,
/// wheel and activity counters the render loop can read at any time.

pub mod backend;
pub mod pointer;
pub mod terminal;

pub use backend::{
    BackendError, DeviceEvent, EventKind, InitScript, PointerBackend, ScriptHandle,
    ScriptedBackend,
};
pub use pointer::{
    BoundsError, Button, PollError, Pointer, PointerSnapshot, PollerState, DEFAULT_POLL_INTERVAL,
};
pub use terminal::TerminalMouse;
