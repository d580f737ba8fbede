/// wire3d Core Library - Shared geometry, camera and mesh loading
///
/// This library provides the stateless building blocks for wireframe
/// rendering: line segments, glyph palettes, the look-at camera and
/// STL loading.

pub mod camera;
pub mod geometry;
pub mod palette;
pub mod stl;
pub mod transform;

// Re-export commonly used types
pub use camera::Camera;
pub use geometry::{dedup_lines, to_hlines, Bounds, HLine, Line, LineKey, Mesh, Triangle};
pub use palette::{Palette, PaletteError, Preset};
pub use transform::Transform;
