//! Scene camera and serialized viewports

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// Camera state as stored in view files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub near_plane: f32,
    pub far_plane: f32,
    pub eye_position: [f32; 3],
    pub target_position: [f32; 3],
    pub up_vector: [f32; 3],
    /// Vertical field of view in degrees
    #[serde(default = "default_view_angle")]
    pub view_angle: f32,
}

fn default_view_angle() -> f32 {
    40.0
}

impl Viewport {
    /// Parse a viewport from a view document
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }

    /// A viewport the camera can actually use
    pub fn is_valid(&self) -> bool {
        let eye = Vec3::from(self.eye_position);
        let target = Vec3::from(self.target_position);
        let up = Vec3::from(self.up_vector);
        eye.is_finite()
            && target.is_finite()
            && up.length_squared() > 0.0
            && eye.distance_squared(target) > 0.0
            && self.near_plane > 0.0
            && self.far_plane > self.near_plane
    }
}

/// Perspective camera looking at a target
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Camera {
    /// Create a new camera with default parameters
    pub fn new(aspect: f32) -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 5.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov: 40.0_f32.to_radians(),
            aspect,
            near: 0.1,
            far: 100000.0,
        }
    }

    /// Update aspect ratio
    pub fn update_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
    }

    /// Distance from the eye to the target
    pub fn distance(&self) -> f32 {
        self.position.distance(self.target)
    }

    /// Distance from the eye to a world-space point
    pub fn distance_to(&self, point: Vec3) -> f32 {
        self.position.distance(point)
    }

    /// Set field of view in degrees
    pub fn set_fov_degrees(&mut self, fov_degrees: f32) {
        self.fov = fov_degrees.clamp(1.0, 179.0).to_radians();
    }

    /// Get field of view in degrees
    pub fn fov_degrees(&self) -> f32 {
        self.fov.to_degrees()
    }

    /// Apply a stored viewport, returns false if it is unusable
    pub fn apply_viewport(&mut self, viewport: &Viewport) -> bool {
        if !viewport.is_valid() {
            return false;
        }
        self.position = Vec3::from(viewport.eye_position);
        self.target = Vec3::from(viewport.target_position);
        self.up = Vec3::from(viewport.up_vector).normalize();
        self.near = viewport.near_plane;
        self.far = viewport.far_plane;
        self.set_fov_degrees(viewport.view_angle);
        true
    }

    /// Current state as a viewport
    pub fn viewport(&self) -> Viewport {
        Viewport {
            near_plane: self.near,
            far_plane: self.far,
            eye_position: self.position.to_array(),
            target_position: self.target.to_array(),
            up_vector: self.up.to_array(),
            view_angle: self.fov_degrees(),
        }
    }

    /// Fit camera to show the given bounding sphere
    ///
    /// Keeps the current viewing direction and moves the eye back far
    /// enough for the sphere to fill the view.
    pub fn fit_all(&mut self, center: Vec3, radius: f32) {
        let direction = (self.position - self.target).try_normalize().unwrap_or(Vec3::Z);
        let distance = (radius * 2.5).max(1.0);
        self.target = center;
        self.position = center + direction * distance;
        self.near = (distance - radius * 1.5).max(distance * 0.01);
        self.far = (distance + radius * 1.5).max(self.near + 1.0);
    }

    /// Get view matrix
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    /// Get projection matrix
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Project a world-space point into normalized device coordinates
    pub fn project_to_ndc(&self, point: Vec3) -> Vec3 {
        self.view_projection().project_point3(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn viewport() -> Viewport {
        Viewport {
            near_plane: 0.5,
            far_plane: 500.0,
            eye_position: [0.0, 0.0, 100.0],
            target_position: [0.0, 0.0, 0.0],
            up_vector: [0.0, 1.0, 0.0],
            view_angle: 45.0,
        }
    }

    #[test]
    fn test_viewport_from_json() {
        let value = serde_json::json!({
            "farPlane": 500.0,
            "nearPlane": 0.5,
            "eyePosition": [0.0, 0.0, 100.0],
            "targetPosition": [0.0, 0.0, 0.0],
            "upVector": [0.0, 1.0, 0.0]
        });
        let parsed = Viewport::from_json(&value).unwrap();
        assert_eq!(parsed.view_angle, 40.0);
        assert!(Viewport::from_json(&serde_json::json!({"farPlane": 1})).is_none());
    }

    #[test]
    fn test_apply_viewport() {
        let mut camera = Camera::default();
        assert!(camera.apply_viewport(&viewport()));
        assert_eq!(camera.position, Vec3::new(0.0, 0.0, 100.0));
        assert_relative_eq!(camera.fov_degrees(), 45.0, epsilon = 1e-4);

        let mut degenerate = viewport();
        degenerate.target_position = degenerate.eye_position;
        assert!(!camera.apply_viewport(&degenerate));
    }

    #[test]
    fn test_fit_all_targets_center() {
        let mut camera = Camera::default();
        camera.fit_all(Vec3::new(1.0, 2.0, 3.0), 4.0);
        assert_eq!(camera.target, Vec3::new(1.0, 2.0, 3.0));
        assert_relative_eq!(camera.distance(), 10.0, epsilon = 1e-4);
    }

    #[test]
    fn test_project_target_to_center() {
        let mut camera = Camera::default();
        camera.apply_viewport(&viewport());
        let ndc = camera.project_to_ndc(Vec3::ZERO);
        assert_relative_eq!(ndc.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(ndc.y, 0.0, epsilon = 1e-5);
        let near = camera.project_to_ndc(Vec3::new(0.0, 0.0, 90.0)).z;
        let far = camera.project_to_ndc(Vec3::new(0.0, 0.0, -90.0)).z;
        assert!(near < far);
    }
}
