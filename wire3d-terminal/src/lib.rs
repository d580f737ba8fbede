/// Terminal wireframe renderer and mouse-steered viewer
use anyhow::{Context, Result};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{self},
};
use nalgebra::Point3;
use std::io::{self, stdout};
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};
use wire3d_core::{to_hlines, Bounds, HLine, Line, Palette, Preset, Transform};
use wire3d_input::{Pointer, PointerSnapshot, TerminalMouse, DEFAULT_POLL_INTERVAL};

pub mod frame;
pub mod raster;
pub mod renderer;

pub use frame::Frame;
pub use raster::Raster;
pub use renderer::{RenderError, RenderState, Renderer, RendererConfig};

/// Palettes cycled through with `p`
const PRESETS: [Preset; 6] = [
    Preset::Braille,
    Preset::BrailleDithered,
    Preset::Ascii,
    Preset::Blocks,
    Preset::BlocksDithered,
    Preset::Combined,
];

/// Side length models are scaled to before rendering
const MODEL_SIZE: f32 = 2.0;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub renderer: RendererConfig,
    pub poll_interval: Duration,
    /// Target time per application frame
    pub frame_time: Duration,
    /// Eye rotation around the up axis per frame, in radians
    pub orbit_step: f32,
    /// Camera depth offset per wheel notch
    pub zoom_step: f32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            renderer: RendererConfig::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            frame_time: Duration::from_millis(1000 / 30), // 30 FPS target
            orbit_step: 0.05,
            zoom_step: 0.1,
        }
    }
}

/// Camera target for a pointer position on a `width` × `height` grid.
///
/// The grid center maps to the origin and the edges to ±0.5; screen rows
/// grow downward so y is flipped. Each wheel notch moves the target by
/// `zoom_step` along z.
pub fn steering_target(
    pointer: &PointerSnapshot,
    width: usize,
    height: usize,
    zoom_step: f32,
) -> Point3<f32> {
    let (w, h) = (width.max(1) as f32, height.max(1) as f32);
    Point3::new(
        (pointer.x as f32 - w / 2.0) / w,
        (h / 2.0 - pointer.y as f32) / h,
        pointer.wheel_vertical as f32 * zoom_step,
    )
}

/// Main application struct for terminal wireframe viewing
pub struct TerminalApp {
    lines: Vec<HLine>,
    renderer: Renderer,
    pointer: Pointer<TerminalMouse>,
    events: Receiver<Event>,
    config: AppConfig,
    pointer_live: bool,
    paused: bool,
    preset: usize,
    running: bool,
}

impl TerminalApp {
    /// Build a viewer for `lines`, centered and scaled to fit the view
    pub fn new(lines: &[Line], config: AppConfig) -> Result<Self> {
        let lines = match Bounds::of_lines(lines) {
            Some(bounds) => Transform::apply(&Transform::fit_matrix(&bounds, MODEL_SIZE), lines),
            None => Vec::new(),
        };

        let renderer =
            Renderer::new(config.renderer.clone()).context("failed to create renderer")?;
        renderer.set_eye(Point3::new(0.0, 0.0, 1.0));
        renderer.set_center(Point3::origin());

        let (tx, events) = mpsc::channel();
        let pointer = Pointer::new(TerminalMouse::new().with_forwarding(tx));
        let (w, h) = (renderer.width() as i32, renderer.height() as i32);
        if let Err(e) = pointer.set_clamp_bounds(w - 1, h - 1, 0, 0) {
            log::warn!("pointer left unclamped: {e}");
        }

        let preset = PRESETS
            .iter()
            .position(|&p| config.renderer.palette == Palette::from(p))
            .unwrap_or(0);

        Ok(Self {
            lines: to_hlines(&lines),
            renderer,
            pointer,
            events,
            config,
            pointer_live: false,
            paused: false,
            preset,
            running: true,
        })
    }

    pub fn lines(&self) -> &[HLine] {
        &self.lines
    }

    pub fn run(&mut self) -> Result<()> {
        terminal::enable_raw_mode()?;
        execute!(stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;

        let result = self.main_loop();

        // Cleanup
        self.pointer.stop_polling(true);
        self.renderer.stop();
        terminal::disable_raw_mode()?;
        execute!(stdout(), terminal::LeaveAlternateScreen, cursor::Show)?;

        result
    }

    fn main_loop(&mut self) -> Result<()> {
        self.renderer.start(stdout())?;

        match self.pointer.start_polling(self.config.poll_interval) {
            Ok(()) => self.pointer_live = true,
            Err(e) => log::warn!("mouse steering disabled: {e}"),
        }

        while self.running {
            let frame_start = Instant::now();

            self.handle_input()?;
            self.update();
            self.render();

            let elapsed = frame_start.elapsed();
            if elapsed < self.config.frame_time {
                std::thread::sleep(self.config.frame_time - elapsed);
            }
        }

        Ok(())
    }

    fn handle_input(&mut self) -> io::Result<()> {
        if self.pointer_live {
            // The poll thread owns the terminal event stream
            while let Ok(event) = self.events.try_recv() {
                self.on_event(&event);
            }
        } else {
            while event::poll(Duration::ZERO)? {
                let event = event::read()?;
                self.on_event(&event);
            }
        }
        Ok(())
    }

    fn on_event(&mut self, event: &Event) {
        let Event::Key(KeyEvent {
            code,
            kind: KeyEventKind::Press,
            ..
        }) = event
        else {
            return;
        };
        match code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.running = false;
            }
            KeyCode::Char(' ') => {
                self.paused = !self.paused;
            }
            KeyCode::Char('p') => {
                self.preset = (self.preset + 1) % PRESETS.len();
                self.renderer.use_palette(PRESETS[self.preset].into());
            }
            _ => {}
        }
    }

    fn update(&mut self) {
        if self.pointer_live && self.pointer.active() > 0 {
            let target = steering_target(
                &self.pointer.snapshot(),
                self.renderer.width(),
                self.renderer.height(),
                self.config.zoom_step,
            );
            self.renderer.set_center(target);
        }

        if !self.paused {
            let eye = Transform::orbit(
                &self.renderer.eye(),
                &self.renderer.center(),
                &self.renderer.up(),
                self.config.orbit_step,
            );
            self.renderer.set_eye(eye);
        }
    }

    fn render(&mut self) {
        self.renderer.clear_back();
        self.renderer.draw_lines(&self.lines);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wire3d_core::Mesh;

    #[test]
    fn test_steering_target() {
        let snapshot = PointerSnapshot {
            x: 50,
            y: 20,
            wheel_vertical: -3,
            ..PointerSnapshot::default()
        };
        let target = steering_target(&snapshot, 100, 40, 0.1);
        assert!(target.x.abs() < 1e-6);
        assert!(target.y.abs() < 1e-6);
        assert!((target.z + 0.3).abs() < 1e-6);

        let corner = PointerSnapshot::default();
        let target = steering_target(&corner, 100, 40, 0.1);
        assert_eq!((target.x, target.y), (-0.5, 0.5));
    }

    #[test]
    fn test_app_fits_model() {
        let lines = Mesh::cube(40.0).edges();
        let app = TerminalApp::new(&lines, AppConfig::default()).unwrap();
        assert_eq!(app.lines().len(), lines.len());
        for line in app.lines() {
            for p in [line.start, line.end] {
                assert!(p.xyz().iter().all(|c| c.abs() <= 1.0 + 1e-5));
                assert_eq!(p.w, 1.0);
            }
        }
    }

    #[test]
    fn test_app_with_no_lines() {
        let app = TerminalApp::new(&[], AppConfig::default()).unwrap();
        assert!(app.lines().is_empty());
    }
}
