/// Pointing-device backend interface
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

/// Motion event item for the horizontal axis
pub const AXIS_X: u32 = 0;
/// Motion event item for the vertical axis
pub const AXIS_Y: u32 = 1;
/// Scroll event item for the vertical wheel
pub const WHEEL_VERTICAL: u32 = 0;
/// Scroll event item for the horizontal wheel
pub const WHEEL_HORIZONTAL: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Absolute position on the axis named by `item`
    AbsMotion,
    /// Relative movement along the axis named by `item`
    RelMotion,
    /// Button `item` pressed (`value != 0`) or released
    Button,
    /// Wheel `item` turned by `value` notches
    Scroll,
    Disconnect,
}

/// One raw event reported by a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceEvent {
    pub kind: EventKind,
    pub device: u32,
    pub item: u32,
    pub value: i32,
}

impl DeviceEvent {
    pub fn new(kind: EventKind, item: u32, value: i32) -> Self {
        Self {
            kind,
            device: 0,
            item,
            value,
        }
    }

    pub fn on_device(mut self, device: u32) -> Self {
        self.device = device;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct BackendError(pub String);

/// Source of pointer events.
///
/// `init` returns the number of devices found. Only device 0 is consumed.
pub trait PointerBackend: Send + 'static {
    fn init(&mut self) -> Result<usize, BackendError>;

    /// Next pending event, `None` once the queue is drained
    fn poll_event(&mut self) -> Option<DeviceEvent>;

    fn quit(&mut self);
}

/// What a [`ScriptedBackend`] reports from `init`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitScript {
    Devices(usize),
    Fail(String),
}

/// Backend that replays events pushed through a [`ScriptHandle`].
///
/// Useful for tests and headless runs where no terminal is attached.
pub struct ScriptedBackend {
    init: InitScript,
    handle: ScriptHandle,
}

/// Shared side of a [`ScriptedBackend`]: queue events and observe calls
#[derive(Clone, Default)]
pub struct ScriptHandle {
    queue: Arc<Mutex<VecDeque<DeviceEvent>>>,
    inits: Arc<AtomicUsize>,
    quits: Arc<AtomicUsize>,
}

impl ScriptedBackend {
    pub fn new(init: InitScript) -> (Self, ScriptHandle) {
        let handle = ScriptHandle::default();
        let backend = Self {
            init,
            handle: handle.clone(),
        };
        (backend, handle)
    }
}

impl ScriptHandle {
    pub fn push(&self, event: DeviceEvent) {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(event);
    }

    pub fn extend<I: IntoIterator<Item = DeviceEvent>>(&self, events: I) {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(events);
    }

    pub fn pending(&self) -> usize {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn inits(&self) -> usize {
        self.inits.load(Ordering::SeqCst)
    }

    pub fn quits(&self) -> usize {
        self.quits.load(Ordering::SeqCst)
    }
}

impl PointerBackend for ScriptedBackend {
    fn init(&mut self) -> Result<usize, BackendError> {
        self.handle.inits.fetch_add(1, Ordering::SeqCst);
        match &self.init {
            InitScript::Devices(n) => Ok(*n),
            InitScript::Fail(msg) => Err(BackendError(msg.clone())),
        }
    }

    fn poll_event(&mut self) -> Option<DeviceEvent> {
        self.handle
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    fn quit(&mut self) {
        self.handle.quits.fetch_add(1, Ordering::SeqCst);
    }
}
