/// Look-at camera with a lazily recomputed view matrix
use nalgebra::{Matrix4, Point3, Vector3};

/// Camera position, target and orientation.
///
/// Setters only record the new vector and mark the view matrix dirty.
/// [`Camera::refresh`] rebuilds the matrix at most once per change.
#[derive(Debug, Clone)]
pub struct Camera {
    eye: Point3<f32>,
    center: Point3<f32>,
    up: Vector3<f32>,
    view: Matrix4<f32>,
    dirty: bool,
    recomputations: u64,
}

impl Camera {
    pub fn new(eye: Point3<f32>, center: Point3<f32>, up: Vector3<f32>) -> Self {
        Self {
            eye,
            center,
            up,
            view: Matrix4::look_at_rh(&eye, &center, &up),
            dirty: false,
            recomputations: 0,
        }
    }

    pub fn eye(&self) -> Point3<f32> {
        self.eye
    }

    pub fn center(&self) -> Point3<f32> {
        self.center
    }

    pub fn up(&self) -> Vector3<f32> {
        self.up
    }

    pub fn set_eye(&mut self, eye: Point3<f32>) {
        self.eye = eye;
        self.dirty = true;
    }

    pub fn set_center(&mut self, center: Point3<f32>) {
        self.center = center;
        self.dirty = true;
    }

    pub fn set_up(&mut self, up: Vector3<f32>) {
        self.up = up;
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Number of times the view matrix has been rebuilt since construction
    pub fn recomputations(&self) -> u64 {
        self.recomputations
    }

    /// Rebuild the view matrix if any vector changed, then return it.
    ///
    /// Degenerate setups (eye == center, up parallel to the view direction)
    /// produce a NaN-filled matrix.
    pub fn refresh(&mut self) -> Matrix4<f32> {
        if self.dirty {
            self.view = Matrix4::look_at_rh(&self.eye, &self.center, &self.up);
            self.dirty = false;
            self.recomputations += 1;
        }
        self.view
    }

    /// Last computed view matrix, possibly stale
    pub fn view_matrix(&self) -> Matrix4<f32> {
        self.view
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(0.0, 0.0, -1.0),
            Vector3::new(0.0, 1.0, 0.0),
        )
    }
}
