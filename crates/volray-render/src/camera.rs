//! Camera used to view the volume.

use glam::{DVec3, Mat4, Vec3};

/// What the mapper needs from a camera.
///
/// Matrices are handed out row-major; the mapper converts them to the layout
/// the shader reads.
pub trait CameraView {
    /// Camera position in world space.
    fn position(&self) -> DVec3;

    /// Near and far clipping distances.
    fn clipping_range(&self) -> [f64; 2];

    /// World-to-eye transform, row-major.
    fn view_matrix(&self) -> [[f64; 4]; 4];

    /// Eye-to-clip transform for a viewport of the given aspect ratio,
    /// row-major.
    fn projection_matrix(&self, aspect: f64) -> [[f64; 4]; 4];
}

/// Converts a column-major glam matrix into row-major rows.
#[must_use]
pub fn row_major(matrix: Mat4) -> [[f64; 4]; 4] {
    matrix.as_dmat4().transpose().to_cols_array_2d()
}

/// A perspective look-at camera.
#[derive(Debug, Clone)]
pub struct Camera {
    /// Camera position in world space.
    pub position: Vec3,
    /// Point the camera is looking at.
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    /// Creates a camera on the +Z axis looking at the origin.
    #[must_use]
    pub fn new() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 3.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov: std::f32::consts::FRAC_PI_4,
            near: 0.01,
            far: 1000.0,
        }
    }

    /// Frames the box `[min, max]` from the +Z side, far enough back that
    /// the whole box fits the vertical field of view.
    pub fn look_at_box(&mut self, min: Vec3, max: Vec3) {
        let center = (min + max) * 0.5;
        let radius = ((max - min).length() * 0.5).max(1e-3);
        let distance = radius / (self.fov * 0.5).sin();

        self.target = center;
        self.position = center + Vec3::new(0.0, 0.0, distance);
        self.near = (distance - radius).max(radius * 0.01);
        self.far = distance + radius * 2.0;
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraView for Camera {
    fn position(&self) -> DVec3 {
        self.position.as_dvec3()
    }

    fn clipping_range(&self) -> [f64; 2] {
        [f64::from(self.near), f64::from(self.far)]
    }

    fn view_matrix(&self) -> [[f64; 4]; 4] {
        row_major(Mat4::look_at_rh(self.position, self.target, self.up))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn projection_matrix(&self, aspect: f64) -> [[f64; 4]; 4] {
        row_major(Mat4::perspective_rh(
            self.fov,
            aspect as f32,
            self.near,
            self.far,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_matrix_is_row_major() {
        let camera = Camera::new();
        let rows = camera.view_matrix();
        // Translation sits in the last column of each row.
        assert!((rows[2][3] + 3.0).abs() < 1e-6);
        assert!(rows[3][2].abs() < 1e-6);
    }

    #[test]
    fn test_projection_is_perspective() {
        let rows = Camera::new().projection_matrix(1.5);
        assert!((rows[3][2] + 1.0).abs() < 1e-6);
        assert!(rows[3][3].abs() < 1e-6);
    }

    #[test]
    fn test_look_at_box_keeps_box_between_planes() {
        let mut camera = Camera::new();
        camera.look_at_box(Vec3::ZERO, Vec3::splat(2.0));
        assert_eq!(camera.target, Vec3::ONE);

        let radius = 3.0_f32.sqrt();
        let distance = camera.position.distance(camera.target);
        assert!(distance > radius);
        let [near, far] = camera.clipping_range();
        assert!(near > 0.0);
        assert!(near <= f64::from(distance - radius) + 1e-4);
        assert!(far >= f64::from(distance + radius));
    }
}
