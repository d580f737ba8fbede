/// Pointer backend driven by the terminal's own mouse reporting
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, MouseButton, MouseEvent,
        MouseEventKind,
    },
    execute,
};
use std::collections::VecDeque;
use std::io::stdout;
use std::sync::mpsc::Sender;
use std::time::Duration;

use crate::backend::{
    BackendError, DeviceEvent, EventKind, PointerBackend, AXIS_X, AXIS_Y, WHEEL_HORIZONTAL,
    WHEEL_VERTICAL,
};

/// Reads mouse reports from the terminal as a single absolute device.
///
/// Once polling starts this backend owns the terminal event stream. Key,
/// resize and focus events are handed to the forwarding channel, if any,
/// so the application can still react to the keyboard.
pub struct TerminalMouse {
    forward: Option<Sender<Event>>,
    pending: VecDeque<DeviceEvent>,
    capturing: bool,
}

impl TerminalMouse {
    pub fn new() -> Self {
        Self {
            forward: None,
            pending: VecDeque::new(),
            capturing: false,
        }
    }

    /// Forward every non-mouse terminal event to `tx`
    pub fn with_forwarding(mut self, tx: Sender<Event>) -> Self {
        self.forward = Some(tx);
        self
    }

    fn forward(&mut self, event: Event) {
        if let Some(tx) = &self.forward {
            if tx.send(event).is_err() {
                self.forward = None;
            }
        }
    }
}

impl Default for TerminalMouse {
    fn default() -> Self {
        Self::new()
    }
}

impl PointerBackend for TerminalMouse {
    fn init(&mut self) -> Result<usize, BackendError> {
        execute!(stdout(), EnableMouseCapture)
            .map_err(|e| BackendError(format!("cannot enable mouse capture: {e}")))?;
        self.capturing = true;
        Ok(1)
    }

    fn poll_event(&mut self) -> Option<DeviceEvent> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(event);
            }
            match event::poll(Duration::ZERO) {
                Ok(true) => {}
                Ok(false) => return None,
                Err(e) => {
                    log::warn!("terminal event poll failed: {e}");
                    return None;
                }
            }
            match event::read() {
                Ok(Event::Mouse(mouse)) => translate(&mouse, &mut self.pending),
                Ok(other) => self.forward(other),
                Err(e) => {
                    log::warn!("terminal event read failed: {e}");
                    return None;
                }
            }
        }
    }

    fn quit(&mut self) {
        if self.capturing {
            if let Err(e) = execute!(stdout(), DisableMouseCapture) {
                log::warn!("cannot disable mouse capture: {e}");
            }
            self.capturing = false;
        }
        self.pending.clear();
    }
}

fn button_item(button: MouseButton) -> u32 {
    match button {
        MouseButton::Left => 0,
        MouseButton::Right => 1,
        MouseButton::Middle => 2,
    }
}

fn push_position(mouse: &MouseEvent, out: &mut VecDeque<DeviceEvent>) {
    out.push_back(DeviceEvent::new(EventKind::AbsMotion, AXIS_X, i32::from(mouse.column)));
    out.push_back(DeviceEvent::new(EventKind::AbsMotion, AXIS_Y, i32::from(mouse.row)));
}

/// Expand one terminal mouse report into device events
fn translate(mouse: &MouseEvent, out: &mut VecDeque<DeviceEvent>) {
    match mouse.kind {
        MouseEventKind::Moved | MouseEventKind::Drag(_) => push_position(mouse, out),
        MouseEventKind::Down(button) => {
            push_position(mouse, out);
            out.push_back(DeviceEvent::new(EventKind::Button, button_item(button), 1));
        }
        MouseEventKind::Up(button) => {
            push_position(mouse, out);
            out.push_back(DeviceEvent::new(EventKind::Button, button_item(button), 0));
        }
        MouseEventKind::ScrollUp => {
            out.push_back(DeviceEvent::new(EventKind::Scroll, WHEEL_VERTICAL, 1));
        }
        MouseEventKind::ScrollDown => {
            out.push_back(DeviceEvent::new(EventKind::Scroll, WHEEL_VERTICAL, -1));
        }
        MouseEventKind::ScrollLeft => {
            out.push_back(DeviceEvent::new(EventKind::Scroll, WHEEL_HORIZONTAL, -1));
        }
        MouseEventKind::ScrollRight => {
            out.push_back(DeviceEvent::new(EventKind::Scroll, WHEEL_HORIZONTAL, 1));
        }
    }
}
