/// Geometry primitives for wireframe rendering
use nalgebra::{Point3, Vector4};
use std::collections::HashSet;

/// A 3D line segment between two points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    pub start: Point3<f32>,
    pub end: Point3<f32>,
}

impl Line {
    pub fn new(start: Point3<f32>, end: Point3<f32>) -> Self {
        Self { start, end }
    }

    /// Positional key over the exact endpoint bits, in endpoint order.
    ///
    /// `(a, b)` and `(b, a)` produce different keys, so reversed duplicates
    /// survive deduplication.
    pub fn key(&self) -> LineKey {
        let s = self.start;
        let e = self.end;
        LineKey([
            s.x.to_bits(),
            s.y.to_bits(),
            s.z.to_bits(),
            e.x.to_bits(),
            e.y.to_bits(),
            e.z.to_bits(),
        ])
    }

    /// Lift into homogeneous form with `w = 1.0` on both endpoints
    pub fn to_hline(&self) -> HLine {
        HLine {
            start: self.start.to_homogeneous(),
            end: self.end.to_homogeneous(),
        }
    }
}

/// Hashable identity of a [`Line`], used only for deduplication
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineKey([u32; 6]);

/// A line segment in homogeneous coordinates, the form consumed by the rasterizer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HLine {
    pub start: Vector4<f32>,
    pub end: Vector4<f32>,
}

/// Convert a list of 3D lines into homogeneous lines, preserving order
pub fn to_hlines(lines: &[Line]) -> Vec<HLine> {
    lines.iter().map(Line::to_hline).collect()
}

/// Drop exact positional duplicates, keeping the first occurrence
pub fn dedup_lines<I>(lines: I) -> Vec<Line>
where
    I: IntoIterator<Item = Line>,
{
    let mut seen = HashSet::new();
    lines
        .into_iter()
        .filter(|line| seen.insert(line.key()))
        .collect()
}

/// A triangle face defined by three corner points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub vertices: [Point3<f32>; 3],
}

impl Triangle {
    pub fn new(v0: Point3<f32>, v1: Point3<f32>, v2: Point3<f32>) -> Self {
        Self {
            vertices: [v0, v1, v2],
        }
    }

    /// The three edges in winding order: v0→v1, v1→v2, v2→v0
    pub fn edges(&self) -> [Line; 3] {
        let [v0, v1, v2] = self.vertices;
        [Line::new(v0, v1), Line::new(v1, v2), Line::new(v2, v0)]
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl Bounds {
    /// Smallest box holding every point, `None` if there are none
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Point3<f32>>,
    {
        let mut points = points.into_iter();
        let first = points.next()?;
        let bounds = points.fold(
            Bounds {
                min: first,
                max: first,
            },
            |b, p| Bounds {
                min: b.min.inf(&p),
                max: b.max.sup(&p),
            },
        );
        Some(bounds)
    }

    /// Bounds of every line endpoint
    pub fn of_lines(lines: &[Line]) -> Option<Self> {
        Self::from_points(lines.iter().flat_map(|l| [l.start, l.end]))
    }

    pub fn center(&self) -> Point3<f32> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Length of the longest side
    pub fn extent(&self) -> f32 {
        let size = self.max - self.min;
        size.x.max(size.y).max(size.z)
    }
}

/// A 3D mesh composed of triangles
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub triangles: Vec<Triangle>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            triangles: Vec::with_capacity(capacity),
        }
    }

    pub fn add_triangle(&mut self, triangle: Triangle) {
        self.triangles.push(triangle);
    }

    /// Deduplicated wireframe edges of every triangle
    pub fn edges(&self) -> Vec<Line> {
        dedup_lines(self.triangles.iter().flat_map(Triangle::edges))
    }

    /// Bounding box of all vertices, `None` for an empty mesh
    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(self.triangles.iter().flat_map(|t| t.vertices))
    }

    /// Create a cube mesh centered on the origin
    pub fn cube(size: f32) -> Self {
        let h = size / 2.0;
        let c = |x: f32, y: f32, z: f32| Point3::new(x * h, y * h, z * h);
        let quads = [
            // Front, back
            [c(-1., -1., 1.), c(1., -1., 1.), c(1., 1., 1.), c(-1., 1., 1.)],
            [c(-1., -1., -1.), c(-1., 1., -1.), c(1., 1., -1.), c(1., -1., -1.)],
            // Top, bottom
            [c(-1., 1., -1.), c(-1., 1., 1.), c(1., 1., 1.), c(1., 1., -1.)],
            [c(-1., -1., -1.), c(1., -1., -1.), c(1., -1., 1.), c(-1., -1., 1.)],
            // Right, left
            [c(1., -1., -1.), c(1., 1., -1.), c(1., 1., 1.), c(1., -1., 1.)],
            [c(-1., -1., -1.), c(-1., -1., 1.), c(-1., 1., 1.), c(-1., 1., -1.)],
        ];

        let mut mesh = Self::with_capacity(quads.len() * 2);
        for [v0, v1, v2, v3] in quads {
            mesh.add_triangle(Triangle::new(v0, v1, v2));
            mesh.add_triangle(Triangle::new(v0, v2, v3));
        }
        mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f32, y: f32, z: f32) -> Point3<f32> {
        Point3::new(x, y, z)
    }

    #[test]
    fn test_to_hlines_preserves_order_and_adds_w() {
        let lines = vec![
            Line::new(p(1.0, 2.0, 3.0), p(4.0, 5.0, 6.0)),
            Line::new(p(-1.0, 0.5, 0.0), p(0.0, 0.0, -7.0)),
            Line::new(p(9.0, 9.0, 9.0), p(1.0, 1.0, 1.0)),
        ];
        let hlines = to_hlines(&lines);

        assert_eq!(hlines.len(), lines.len());
        for (line, hline) in lines.iter().zip(&hlines) {
            assert_eq!(hline.start.xyz(), line.start.coords);
            assert_eq!(hline.end.xyz(), line.end.coords);
            assert_eq!(hline.start.w, 1.0);
            assert_eq!(hline.end.w, 1.0);
        }
    }

    #[test]
    fn test_to_hlines_empty() {
        assert!(to_hlines(&[]).is_empty());
    }

    #[test]
    fn test_dedup_keeps_first_and_reversed() {
        let a = Line::new(p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0));
        let reversed = Line::new(a.end, a.start);
        let lines = dedup_lines(vec![a, a, reversed, a]);
        assert_eq!(lines, vec![a, reversed]);
    }

    #[test]
    fn test_cube_edges() {
        let cube = Mesh::cube(2.0);
        assert_eq!(cube.triangles.len(), 12);
        // Reversed duplicates are kept, so the count depends on winding
        let edges = cube.edges();
        assert!(edges.len() <= 36);
        assert!(edges.len() >= 18);
    }

    #[test]
    fn test_bounds() {
        let cube = Mesh::cube(4.0);
        let bounds = cube.bounds().unwrap();
        assert_eq!(bounds.min, p(-2.0, -2.0, -2.0));
        assert_eq!(bounds.max, p(2.0, 2.0, 2.0));
        assert_eq!(bounds.center(), p(0.0, 0.0, 0.0));
        assert_eq!(bounds.extent(), 4.0);
        assert!(Mesh::new().bounds().is_none());
        assert_eq!(Bounds::of_lines(&cube.edges()), Some(bounds));
    }
}
