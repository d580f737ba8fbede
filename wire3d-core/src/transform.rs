/// Model and camera transformation helpers
use nalgebra::{Matrix4, Point3, Rotation3, Unit, Vector3};

use crate::geometry::{Bounds, Line};

/// Transform builder for 3D transformations
pub struct Transform;

impl Transform {
    /// Create a translation matrix
    pub fn translation_matrix(x: f32, y: f32, z: f32) -> Matrix4<f32> {
        Matrix4::new_translation(&Vector3::new(x, y, z))
    }

    /// Create a uniform scale matrix
    pub fn scale_matrix(s: f32) -> Matrix4<f32> {
        Matrix4::new_scaling(s)
    }

    /// Matrix that centers `bounds` on the origin and scales its longest
    /// side to `size`. Flat or empty bounds are only centered.
    pub fn fit_matrix(bounds: &Bounds, size: f32) -> Matrix4<f32> {
        let center = bounds.center();
        let extent = bounds.extent();
        let scale = if extent > f32::EPSILON { size / extent } else { 1.0 };
        Self::scale_matrix(scale) * Self::translation_matrix(-center.x, -center.y, -center.z)
    }

    /// Apply a model matrix to both endpoints of every line
    pub fn apply(matrix: &Matrix4<f32>, lines: &[Line]) -> Vec<Line> {
        lines
            .iter()
            .map(|line| {
                Line::new(
                    matrix.transform_point(&line.start),
                    matrix.transform_point(&line.end),
                )
            })
            .collect()
    }

    /// Rotate `eye` about `center` around `axis` by `angle` radians.
    ///
    /// A zero axis leaves the eye where it is.
    pub fn orbit(
        eye: &Point3<f32>,
        center: &Point3<f32>,
        axis: &Vector3<f32>,
        angle: f32,
    ) -> Point3<f32> {
        let Some(axis) = Unit::try_new(*axis, f32::EPSILON) else {
            return *eye;
        };
        let rotation = Rotation3::from_axis_angle(&axis, angle);
        *center + rotation * (*eye - *center)
    }
}
