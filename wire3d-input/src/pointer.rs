/// Background pointer polling with clamped or wrapped coordinates
use std::io;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::mpsc::{self, SyncSender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;

use crate::backend::{
    BackendError, DeviceEvent, EventKind, PointerBackend, AXIS_X, AXIS_Y, WHEEL_HORIZONTAL,
    WHEEL_VERTICAL,
};

/// Activity added per event kind, in milliseconds
const MOTION_WEIGHT: i32 = 1000;
const BUTTON_WEIGHT: i32 = 500;
const SCROLL_WEIGHT: i32 = 300;
/// Ceiling the activity timer decays from
const ACTIVITY_CAP: i32 = 1000;

/// Default interval between background polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Left = 0,
    Right = 1,
    Middle = 2,
    Back = 3,
    Forward = 4,
}

impl Button {
    /// Bit for this button in [`Pointer::buttons`]
    pub fn mask(self) -> i32 {
        1 << self as i32
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoundsError {
    #[error("clamp needs max > min on both axes (x: {x_min}..{x_max}, y: {y_min}..{y_max})")]
    Clamp {
        x_max: i32,
        y_max: i32,
        x_min: i32,
        y_min: i32,
    },
    #[error("modulus needs both values non-zero or both zero (got {x}, {y})")]
    Modulus { x: i32, y: i32 },
}

#[derive(Debug, Error)]
pub enum PollError {
    #[error("polling is already running")]
    AlreadyRunning,
    #[error("manual poll is not allowed while background polling runs")]
    Busy,
    #[error("no pointing device found")]
    NoDevice,
    #[error("backend initialization failed: {0}")]
    Backend(#[from] BackendError),
    #[error("failed to spawn poll thread: {0}")]
    Spawn(#[source] io::Error),
}

/// Lifecycle of the background poll thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Starting,
    Running,
    Stopped,
}

/// Plain copy of the pointer fields.
///
/// Fields are read one at a time, so a snapshot taken while the poll
/// thread is writing may mix values from two poll cycles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PointerSnapshot {
    pub x: i32,
    pub y: i32,
    pub active: i32,
    pub buttons: i32,
    pub wheel_vertical: i32,
    pub wheel_horizontal: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Clamp {
    x_max: i32,
    y_max: i32,
    x_min: i32,
    y_min: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Modulus {
    x: i32,
    y: i32,
}

#[derive(Debug, Clone, Copy, Default)]
struct Limits {
    clamp: Option<Clamp>,
    modulus: Option<Modulus>,
}

impl Limits {
    /// Modulus takes precedence over clamping
    fn apply(&self, x: i32, y: i32) -> (i32, i32) {
        if let Some(m) = self.modulus {
            (x.wrapping_rem(m.x), y.wrapping_rem(m.y))
        } else if let Some(c) = self.clamp {
            (x.clamp(c.x_min, c.x_max), y.clamp(c.y_min, c.y_max))
        } else {
            (x, y)
        }
    }
}

/// Field-wise relaxed pointer state, written only by whoever polls
#[derive(Default)]
struct PointerState {
    x: AtomicI32,
    y: AtomicI32,
    active: AtomicI32,
    buttons: AtomicI32,
    wheel_vertical: AtomicI32,
    wheel_horizontal: AtomicI32,
}

impl PointerState {
    fn reset(&self) {
        for field in [
            &self.x,
            &self.y,
            &self.active,
            &self.buttons,
            &self.wheel_vertical,
            &self.wheel_horizontal,
        ] {
            field.store(0, Ordering::Relaxed);
        }
    }

    fn bump_active(&self, weight: i32) {
        let _ = self
            .active
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |a| {
                Some(a.saturating_add(weight))
            });
    }

    fn decay(&self, elapsed_ms: i32) {
        let _ = self
            .active
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |a| {
                (a != 0).then(|| a.saturating_sub(elapsed_ms).clamp(0, ACTIVITY_CAP))
            });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MotionMode {
    Absolute,
    Relative,
}

/// Backend plus the tracking state that survives between polls
struct Device<B> {
    backend: B,
    open: bool,
    motion: MotionMode,
}

impl<B: PointerBackend> Device<B> {
    fn open(&mut self) -> Result<(), PollError> {
        if self.open {
            return Ok(());
        }
        match self.backend.init() {
            Ok(0) => {
                self.backend.quit();
                Err(PollError::NoDevice)
            }
            Ok(count) => {
                log::debug!("pointer backend ready with {count} device(s)");
                self.open = true;
                Ok(())
            }
            Err(e) => {
                self.backend.quit();
                Err(e.into())
            }
        }
    }

    fn close(&mut self) {
        if self.open {
            self.backend.quit();
            self.open = false;
        }
    }

    /// Drain pending events into `state`, then apply `limits` to the position
    fn drain(&mut self, state: &PointerState, limits: Limits) {
        let mut x = state.x.load(Ordering::Relaxed);
        let mut y = state.y.load(Ordering::Relaxed);

        while let Some(event) = self.backend.poll_event() {
            // Only the first device is tracked
            if event.device != 0 {
                continue;
            }
            self.apply(state, event, &mut x, &mut y);
        }

        let (x, y) = limits.apply(x, y);
        state.x.store(x, Ordering::Relaxed);
        state.y.store(y, Ordering::Relaxed);
    }

    fn apply(&mut self, state: &PointerState, event: DeviceEvent, x: &mut i32, y: &mut i32) {
        match event.kind {
            EventKind::AbsMotion => {
                state.bump_active(MOTION_WEIGHT);
                self.motion = MotionMode::Absolute;
                match event.item {
                    AXIS_X => *x = event.value,
                    AXIS_Y => *y = event.value,
                    _ => {}
                }
            }
            EventKind::RelMotion => {
                state.bump_active(MOTION_WEIGHT);
                if self.motion != MotionMode::Relative {
                    self.motion = MotionMode::Relative;
                    *x = 0;
                    *y = 0;
                }
                // Devices report downward motion as positive
                match event.item {
                    AXIS_X => *x = x.wrapping_add(event.value),
                    AXIS_Y => *y = y.wrapping_sub(event.value),
                    _ => {}
                }
            }
            EventKind::Button => {
                state.bump_active(BUTTON_WEIGHT);
                let Some(bit) = 1i32.checked_shl(event.item) else {
                    return;
                };
                if event.value != 0 {
                    state.buttons.fetch_or(bit, Ordering::Relaxed);
                } else {
                    state.buttons.fetch_and(!bit, Ordering::Relaxed);
                }
            }
            EventKind::Scroll => {
                state.bump_active(SCROLL_WEIGHT);
                match event.item {
                    WHEEL_VERTICAL => {
                        state.wheel_vertical.fetch_add(event.value, Ordering::Relaxed);
                    }
                    WHEEL_HORIZONTAL => {
                        state.wheel_horizontal.fetch_add(event.value, Ordering::Relaxed);
                    }
                    _ => {}
                }
            }
            EventKind::Disconnect => state.active.store(0, Ordering::Relaxed),
        }
    }
}

struct Shared<B> {
    state: PointerState,
    limits: Mutex<Limits>,
    running: AtomicBool,
    device: Mutex<Device<B>>,
}

impl<B: PointerBackend> Shared<B> {
    fn poll_once(&self) {
        let limits = *lock(&self.limits);
        lock(&self.device).drain(&self.state, limits);
    }
}

struct Control {
    phase: PollerState,
    thread: Option<JoinHandle<()>>,
}

impl Control {
    /// Join a thread that was stopped without waiting for it. It may still
    /// be finishing its sleep, and it closes the backend on the way out.
    fn reap(&mut self) {
        if let Some(previous) = self.thread.take() {
            if previous.join().is_err() {
                log::error!("previous poll thread panicked");
            }
        }
    }
}

/// Handle to a single pointing device.
///
/// The position, activity, button and wheel readers are lock-free and each
/// field is updated independently: a reader may see `x` from one poll cycle
/// and `y` from the next. Camera steering tolerates this.
pub struct Pointer<B: PointerBackend> {
    shared: Arc<Shared<B>>,
    control: Mutex<Control>,
}

impl<B: PointerBackend> Pointer<B> {
    pub fn new(backend: B) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: PointerState::default(),
                limits: Mutex::new(Limits::default()),
                running: AtomicBool::new(false),
                device: Mutex::new(Device {
                    backend,
                    open: false,
                    motion: MotionMode::Relative,
                }),
            }),
            control: Mutex::new(Control {
                phase: PollerState::Idle,
                thread: None,
            }),
        }
    }

    /// Clamp each axis to `-max..=max`. All zero disables clamping.
    pub fn set_clamp(&self, x_max: i32, y_max: i32) -> Result<(), BoundsError> {
        self.set_clamp_bounds(x_max, y_max, x_max.saturating_neg(), y_max.saturating_neg())
    }

    /// Clamp to explicit bounds. All zero disables clamping.
    pub fn set_clamp_bounds(
        &self,
        x_max: i32,
        y_max: i32,
        x_min: i32,
        y_min: i32,
    ) -> Result<(), BoundsError> {
        let disable = x_max == 0 && y_max == 0 && x_min == 0 && y_min == 0;
        if !disable && !(x_max > x_min && y_max > y_min) {
            return Err(BoundsError::Clamp {
                x_max,
                y_max,
                x_min,
                y_min,
            });
        }
        lock(&self.shared.limits).clamp = (!disable).then_some(Clamp {
            x_max,
            y_max,
            x_min,
            y_min,
        });
        Ok(())
    }

    /// Wrap each axis into `(-|m|, |m|)` by truncated remainder. The sign
    /// of `m` does not matter. Overrides clamping while set. Both zero
    /// disables it.
    pub fn set_modulus(&self, x_mod: i32, y_mod: i32) -> Result<(), BoundsError> {
        let modulus = match (x_mod, y_mod) {
            (0, 0) => None,
            (x, y) if x != 0 && y != 0 => Some(Modulus { x, y }),
            (x, y) => return Err(BoundsError::Modulus { x, y }),
        };
        lock(&self.shared.limits).modulus = modulus;
        Ok(())
    }

    /// Spawn the poll thread and wait for the backend to come up.
    ///
    /// Pointer state is reset once the backend reports a device.
    pub fn start_polling(&self, interval: Duration) -> Result<(), PollError> {
        let mut control = lock(&self.control);
        if self.shared.running.load(Ordering::Acquire) {
            return Err(PollError::AlreadyRunning);
        }

        control.reap();
        control.phase = PollerState::Starting;
        self.shared.running.store(true, Ordering::Release);

        let (ready_tx, ready_rx) = mpsc::sync_channel(1);
        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name("wire3d-pointer".into())
            .spawn(move || poll_loop(shared, interval, ready_tx));

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                self.shared.running.store(false, Ordering::Release);
                control.phase = PollerState::Stopped;
                return Err(PollError::Spawn(e));
            }
        };

        let outcome = ready_rx.recv().unwrap_or_else(|_| {
            Err(PollError::Backend(BackendError(
                "poll thread exited during initialization".into(),
            )))
        });

        match outcome {
            Ok(()) => {
                log::debug!("pointer polling started every {interval:?}");
                control.phase = PollerState::Running;
                control.thread = Some(handle);
                Ok(())
            }
            Err(e) => {
                log::warn!("pointer polling failed to start: {e}");
                if handle.join().is_err() {
                    log::error!("poll thread panicked during initialization");
                }
                control.phase = PollerState::Stopped;
                Err(e)
            }
        }
    }

    /// Signal the poll thread to exit, optionally waiting for it.
    ///
    /// The thread notices within one poll interval.
    pub fn stop_polling(&self, join: bool) {
        let mut control = lock(&self.control);
        self.shared.running.store(false, Ordering::Release);
        if join {
            if let Some(handle) = control.thread.take() {
                if handle.join().is_err() {
                    log::error!("poll thread panicked");
                }
            }
        }
        if control.phase != PollerState::Idle {
            control.phase = PollerState::Stopped;
        }
    }

    pub fn state(&self) -> PollerState {
        let control = lock(&self.control);
        match control.phase {
            PollerState::Running if !self.shared.running.load(Ordering::Acquire) => {
                PollerState::Stopped
            }
            phase => phase,
        }
    }

    pub fn is_polling(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Drain pending events once on the calling thread.
    ///
    /// Opens the backend on first use. Fails with [`PollError::Busy`] while
    /// background polling runs, and waits out a poll thread that is still
    /// shutting down after an unjoined stop.
    pub fn poll(&self) -> Result<(), PollError> {
        let mut control = lock(&self.control);
        if self.is_polling() {
            return Err(PollError::Busy);
        }
        control.reap();
        drop(control);

        let limits = *lock(&self.shared.limits);
        let mut device = lock(&self.shared.device);
        device.open()?;
        device.drain(&self.shared.state, limits);
        Ok(())
    }

    /// Zero position, activity, buttons and wheels
    pub fn reset(&self) {
        self.shared.state.reset();
    }

    pub fn x(&self) -> i32 {
        self.shared.state.x.load(Ordering::Relaxed)
    }

    pub fn y(&self) -> i32 {
        self.shared.state.y.load(Ordering::Relaxed)
    }

    /// Recent-activity timer in milliseconds.
    ///
    /// Decays toward zero while polling; bursts of events may push it past
    /// 1000 until the next decay.
    pub fn active(&self) -> i32 {
        self.shared.state.active.load(Ordering::Relaxed)
    }

    /// Pressed buttons as a bitfield, see [`Button::mask`]
    pub fn buttons(&self) -> i32 {
        self.shared.state.buttons.load(Ordering::Relaxed)
    }

    pub fn is_pressed(&self, button: Button) -> bool {
        self.buttons() & button.mask() != 0
    }

    pub fn wheel_vertical(&self) -> i32 {
        self.shared.state.wheel_vertical.load(Ordering::Relaxed)
    }

    pub fn wheel_horizontal(&self) -> i32 {
        self.shared.state.wheel_horizontal.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> PointerSnapshot {
        PointerSnapshot {
            x: self.x(),
            y: self.y(),
            active: self.active(),
            buttons: self.buttons(),
            wheel_vertical: self.wheel_vertical(),
            wheel_horizontal: self.wheel_horizontal(),
        }
    }
}

impl<B: PointerBackend> Drop for Pointer<B> {
    fn drop(&mut self) {
        self.stop_polling(true);
        lock(&self.shared.device).close();
    }
}

fn poll_loop<B: PointerBackend>(
    shared: Arc<Shared<B>>,
    interval: Duration,
    ready: SyncSender<Result<(), PollError>>,
) {
    if let Err(e) = lock(&shared.device).open() {
        shared.running.store(false, Ordering::Release);
        let _ = ready.send(Err(e));
        return;
    }

    shared.state.reset();
    let _ = ready.send(Ok(()));

    let elapsed_ms = i32::try_from(interval.as_millis()).unwrap_or(i32::MAX);
    while shared.running.load(Ordering::Acquire) {
        shared.poll_once();
        thread::sleep(interval);
        shared.state.decay(elapsed_ms);
    }

    lock(&shared.device).close();
    log::debug!("pointer polling stopped");
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
