/// Double-buffered wireframe renderer with a background display thread
use crossterm::{cursor, queue, style::Print};
use nalgebra::{Matrix4, Point3, Vector3};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;
use wire3d_core::{Camera, HLine, Palette};

use crate::frame::Frame;
use crate::raster::Raster;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("grid must be at least 1x1 and fit a terminal (got {width}x{height})")]
    InvalidSize { width: usize, height: usize },
    #[error("render thread can only be started from idle (currently {0:?})")]
    NotIdle(RenderState),
    #[error("failed to spawn render thread: {0}")]
    Spawn(#[source] io::Error),
}

/// Lifecycle of the display thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    Idle,
    Running,
    Stopped,
}

#[derive(Debug, Clone)]
pub struct RendererConfig {
    pub width: usize,
    pub height: usize,
    /// Pause between two display flushes
    pub interval: Duration,
    pub palette: Palette,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            width: 100,
            height: 40,
            interval: Duration::from_millis(5),
            palette: Palette::default(),
        }
    }
}

/// Active palette and the rasterizer sized for it
struct Glyphs {
    palette: Palette,
    raster: Raster,
}

/// State shared with the display thread.
///
/// Lock order: `glyphs` → `back` → `front`. `camera` is never held
/// together with the others.
struct Shared {
    camera: Mutex<Camera>,
    glyphs: Mutex<Glyphs>,
    back: Mutex<Frame>,
    front: Mutex<Frame>,
    running: AtomicBool,
}

impl Shared {
    /// Serialize the front buffer, one `\n`-terminated line per row
    fn compose(&self, out: &mut String) {
        let glyphs = lock(&self.glyphs);
        let front = lock(&self.front);
        out.clear();
        front.write_glyphs(&glyphs.palette, out);
    }
}

/// Renders homogeneous line segments into a character grid.
///
/// Geometry is accumulated into a back buffer by [`Renderer::draw_lines`]
/// and swapped to the front when the pass completes. Once started, a
/// display thread writes the front buffer to its sink at a fixed interval,
/// independent of how fast frames are produced.
pub struct Renderer {
    shared: Arc<Shared>,
    width: usize,
    height: usize,
    interval: Duration,
    state: RenderState,
    thread: Option<JoinHandle<()>>,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Result<Self, RenderError> {
        let RendererConfig {
            width,
            height,
            interval,
            palette,
        } = config;
        let fits_terminal = u16::try_from(width).is_ok() && u16::try_from(height).is_ok();
        if width == 0 || height == 0 || !fits_terminal {
            return Err(RenderError::InvalidSize { width, height });
        }

        let raster = Raster::new(width, height, palette.len());
        Ok(Self {
            shared: Arc::new(Shared {
                camera: Mutex::new(Camera::default()),
                glyphs: Mutex::new(Glyphs { palette, raster }),
                back: Mutex::new(Frame::new(width, height)),
                front: Mutex::new(Frame::new(width, height)),
                running: AtomicBool::new(false),
            }),
            width,
            height,
            interval,
            state: RenderState::Idle,
            thread: None,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn state(&self) -> RenderState {
        self.state
    }

    /// Spawn the display thread writing to `sink`
    pub fn start<W>(&mut self, sink: W) -> Result<(), RenderError>
    where
        W: Write + Send + 'static,
    {
        if self.state != RenderState::Idle {
            return Err(RenderError::NotIdle(self.state));
        }

        self.shared.running.store(true, Ordering::Release);
        let shared = Arc::clone(&self.shared);
        let interval = self.interval;
        let handle = thread::Builder::new()
            .name("wire3d-render".into())
            .spawn(move || render_loop(&shared, interval, sink))
            .map_err(|e| {
                self.shared.running.store(false, Ordering::Release);
                RenderError::Spawn(e)
            })?;

        log::debug!(
            "render thread started ({}x{}, every {:?})",
            self.width,
            self.height,
            self.interval
        );
        self.thread = Some(handle);
        self.state = RenderState::Running;
        Ok(())
    }

    /// Signal the display thread and wait for it. Takes at most one
    /// interval. Does nothing unless running.
    pub fn stop(&mut self) {
        if self.state != RenderState::Running {
            return;
        }
        self.shared.running.store(false, Ordering::Release);
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                log::error!("render thread panicked");
            }
        }
        self.state = RenderState::Stopped;
        log::debug!("render thread stopped");
    }

    pub fn set_eye(&self, eye: Point3<f32>) {
        lock(&self.shared.camera).set_eye(eye);
    }

    pub fn set_center(&self, center: Point3<f32>) {
        lock(&self.shared.camera).set_center(center);
    }

    pub fn set_up(&self, up: Vector3<f32>) {
        lock(&self.shared.camera).set_up(up);
    }

    pub fn eye(&self) -> Point3<f32> {
        lock(&self.shared.camera).eye()
    }

    pub fn center(&self) -> Point3<f32> {
        lock(&self.shared.camera).center()
    }

    pub fn up(&self) -> Vector3<f32> {
        lock(&self.shared.camera).up()
    }

    /// Times the view matrix has been rebuilt
    pub fn view_recomputations(&self) -> u64 {
        lock(&self.shared.camera).recomputations()
    }

    /// Replace the glyph palette. Clears the back buffer, since its indices
    /// were quantized for the old palette length.
    pub fn use_palette(&self, palette: Palette) {
        let mut glyphs = lock(&self.shared.glyphs);
        glyphs.raster = Raster::new(self.width, self.height, palette.len());
        glyphs.palette = palette;
        lock(&self.shared.back).clear();
    }

    pub fn palette(&self) -> Palette {
        lock(&self.shared.glyphs).palette.clone()
    }

    /// Reset the pending frame to background
    pub fn clear_back(&self) {
        lock(&self.shared.back).clear();
    }

    /// Rasterize `lines` into the back buffer, then swap it to the front.
    ///
    /// The back buffer is not cleared first: call [`Renderer::clear_back`]
    /// between frames unless compositing is wanted. After the swap the back
    /// buffer holds the previously displayed frame.
    pub fn draw_lines(&self, lines: &[HLine]) {
        let view: Matrix4<f32> = lock(&self.shared.camera).refresh();

        let glyphs = lock(&self.shared.glyphs);
        let mut back = lock(&self.shared.back);
        for line in lines {
            glyphs.raster.draw_line(&mut back, &view, line);
        }

        let mut front = lock(&self.shared.front);
        std::mem::swap(&mut *back, &mut *front);
    }

    /// Copy of the frame currently on display
    pub fn front_frame(&self) -> Frame {
        lock(&self.shared.front).clone()
    }

    /// Copy of the frame being accumulated
    pub fn back_frame(&self) -> Frame {
        lock(&self.shared.back).clone()
    }

    /// Front buffer as text, exactly as the display thread composes it
    pub fn render_front(&self) -> String {
        let mut out = String::new();
        self.shared.compose(&mut out);
        out
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn render_loop<W: Write>(shared: &Shared, interval: Duration, mut sink: W) {
    let mut text = String::new();
    while shared.running.load(Ordering::Acquire) {
        shared.compose(&mut text);
        if let Err(e) = write_frame(&mut sink, &text) {
            log::error!("display write failed, render thread exiting: {e}");
            break;
        }
        thread::sleep(interval);
    }
}

/// Position each row explicitly so output is correct in raw mode
fn write_frame<W: Write>(sink: &mut W, text: &str) -> io::Result<()> {
    for (row, line) in text.lines().enumerate() {
        let row = u16::try_from(row).unwrap_or(u16::MAX);
        queue!(sink, cursor::MoveTo(0, row), Print(line))?;
    }
    sink.flush()
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Instant;
    use wire3d_core::{to_hlines, Line, Preset};

    /// Cloneable in-memory display
    #[derive(Clone, Default)]
    struct Screen(Arc<Mutex<Vec<u8>>>);

    impl Screen {
        fn text(&self) -> String {
            String::from_utf8_lossy(&lock(&self.0)).into_owned()
        }
    }

    impl Write for Screen {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            lock(&self.0).extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct BrokenScreen;

    impl Write for BrokenScreen {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn renderer(width: usize, height: usize, palette: Palette) -> Renderer {
        Renderer::new(RendererConfig {
            width,
            height,
            interval: Duration::from_millis(1),
            palette,
        })
        .unwrap()
    }

    fn line(a: [f32; 3], b: [f32; 3]) -> Line {
        Line::new(Point3::from(a), Point3::from(b))
    }

    #[test]
    fn test_invalid_size() {
        let config = RendererConfig {
            width: 0,
            ..RendererConfig::default()
        };
        assert!(matches!(
            Renderer::new(config),
            Err(RenderError::InvalidSize { width: 0, height: 40 })
        ));
    }

    #[test]
    fn test_diagonal_end_to_end() {
        let palette = Palette::new([" ", "o", "#"]).unwrap();
        let renderer = renderer(10, 10, palette);
        renderer.set_eye(Point3::new(0.0, 0.0, 1.0));
        renderer.set_center(Point3::new(0.0, 0.0, -1.0));
        renderer.set_up(Vector3::new(0.0, 1.0, 0.0));

        renderer.draw_lines(&to_hlines(&[line([-1.0, -1.0, -1.0], [1.0, 1.0, 1.0])]));

        let front = renderer.front_frame();
        let lit: Vec<_> = front.lit_cells().collect();
        assert!(!lit.is_empty());
        assert!(lit.iter().all(|&(x, y, _)| (8..=10).contains(&(x + y))));
        assert!(renderer.back_frame().is_blank());
    }

    #[test]
    fn test_view_recomputed_lazily() {
        let renderer = renderer(8, 8, Preset::Ascii.into());
        renderer.draw_lines(&[]);
        assert_eq!(renderer.view_recomputations(), 0);

        renderer.set_eye(Point3::new(0.0, 0.5, 2.0));
        renderer.draw_lines(&[]);
        assert_eq!(renderer.view_recomputations(), 1);

        renderer.draw_lines(&[]);
        renderer.draw_lines(&[]);
        assert_eq!(renderer.view_recomputations(), 1);

        renderer.set_up(Vector3::new(0.1, 1.0, 0.0));
        renderer.draw_lines(&[]);
        assert_eq!(renderer.view_recomputations(), 2);

        renderer.set_center(Point3::new(0.0, 0.0, -2.0));
        renderer.draw_lines(&[]);
        assert_eq!(renderer.view_recomputations(), 3);
        assert_eq!(renderer.center(), Point3::new(0.0, 0.0, -2.0));
    }

    #[test]
    fn test_palette_switch_clears_back_buffer() {
        let renderer = renderer(10, 10, Preset::Braille.into());
        let lines = to_hlines(&[line([-0.5, 0.0, 0.0], [0.5, 0.0, 0.0])]);

        // Two passes leave geometry in both buffers
        renderer.draw_lines(&lines);
        renderer.draw_lines(&lines);
        assert!(!renderer.back_frame().is_blank());

        renderer.use_palette(Preset::Blocks.into());
        assert!(renderer.back_frame().is_blank());
        assert_eq!(renderer.palette().len(), 5);

        renderer.draw_lines(&lines);
        assert!(renderer.front_frame().lit_cells().all(|(_, _, d)| d < 5));
    }

    #[test]
    fn test_accumulating_without_clear_composites() {
        let renderer = renderer(10, 10, Preset::Ascii.into());
        let horizontal = to_hlines(&[line([-0.9, 0.5, 0.0], [0.9, 0.5, 0.0])]);
        let vertical = to_hlines(&[line([0.5, -0.9, 0.0], [0.5, 0.9, 0.0])]);

        renderer.draw_lines(&horizontal);
        let single = renderer.front_frame().lit_cells().count();

        // Back now holds the old front (empty); draw twice into the same buffer
        renderer.clear_back();
        renderer.draw_lines(&horizontal);
        renderer.draw_lines(&vertical);
        renderer.draw_lines(&vertical);
        let composite = renderer.front_frame().lit_cells().count();
        assert!(composite > single);

        renderer.clear_back();
        renderer.draw_lines(&vertical);
        assert!(renderer.front_frame().lit_cells().count() < composite);
    }

    #[test]
    fn test_render_front_text() {
        let palette = Palette::new([".", "#"]).unwrap();
        let renderer = renderer(4, 2, palette);
        renderer.set_eye(Point3::new(0.0, 0.0, 0.0));
        renderer.set_center(Point3::new(0.0, 0.0, -1.0));
        renderer.draw_lines(&to_hlines(&[line([-1.0, 0.5, 0.0], [1.0, 0.5, 0.0])]));

        assert_eq!(renderer.render_front(), "####\n....\n");
    }

    #[test]
    fn test_display_thread_lifecycle() {
        let palette = Palette::new([" ", "@"]).unwrap();
        let mut renderer = renderer(6, 3, palette);
        renderer.set_eye(Point3::origin());
        renderer.set_center(Point3::new(0.0, 0.0, -1.0));
        renderer.draw_lines(&to_hlines(&[line([-1.0, 0.0, 0.0], [1.2, 0.0, 0.0])]));

        let screen = Screen::default();
        assert_eq!(renderer.state(), RenderState::Idle);
        renderer.start(screen.clone()).unwrap();
        assert_eq!(renderer.state(), RenderState::Running);
        assert!(matches!(
            renderer.start(Screen::default()),
            Err(RenderError::NotIdle(RenderState::Running))
        ));

        let deadline = Instant::now() + Duration::from_secs(2);
        while !screen.text().contains("@@@@@@") && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        renderer.stop();
        assert_eq!(renderer.state(), RenderState::Stopped);
        assert!(screen.text().contains("@@@@@@"));

        renderer.stop();
        assert!(matches!(
            renderer.start(Screen::default()),
            Err(RenderError::NotIdle(RenderState::Stopped))
        ));
    }

    #[test]
    fn test_display_write_failure_ends_thread() {
        let mut renderer = renderer(2, 2, Preset::Ascii.into());
        renderer.start(BrokenScreen).unwrap();
        // The thread exits on its own; stop only joins it
        renderer.stop();
        assert_eq!(renderer.state(), RenderState::Stopped);
    }
}
