//! Screen-space markers and depth banding

use glam::Vec3;

use crate::camera::Camera;
use crate::constants::{MARKER_RENDER_ORDER, MARKER_SIZE};

/// How an object decides whether to show its marker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MarkerMode {
    On,
    Off,
    /// Follow the scene-wide marker display flag
    #[default]
    Inherited,
}

impl MarkerMode {
    /// Parse `"on"`/`"off"`, anything else is inherited
    pub fn from_name(name: &str) -> Self {
        match name {
            "on" => MarkerMode::On,
            "off" => MarkerMode::Off,
            _ => MarkerMode::Inherited,
        }
    }

    pub fn is_enabled(&self, display_markers: bool) -> bool {
        match self {
            MarkerMode::On => true,
            MarkerMode::Off => false,
            MarkerMode::Inherited => display_markers,
        }
    }
}

/// Screen-space indicator placed at an object's representative vertex
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    /// World-space position
    pub position: Vec3,
    enabled: bool,
    ndc_depth: f32,
    scale: f32,
    opacity: f32,
}

impl Default for Marker {
    fn default() -> Self {
        Self::new()
    }
}

impl Marker {
    pub fn new() -> Self {
        Self {
            position: Vec3::ZERO,
            enabled: false,
            ndc_depth: 0.0,
            scale: 1.0,
            opacity: 1.0,
        }
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    /// Recompute the normalized depth, clamped to `[0, 1]`
    pub fn update_ndc(&mut self, camera: &Camera) -> f32 {
        let ndc = camera.project_to_ndc(self.position);
        self.ndc_depth = if ndc.z.is_finite() {
            ndc.z.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.ndc_depth
    }

    pub fn ndc_depth(&self) -> f32 {
        self.ndc_depth
    }

    /// Band scale and opacity by depth within `[min, max]`
    ///
    /// Nearest markers are drawn full size and opaque, farthest at half
    /// size and 60% opacity.
    pub fn update_visual(&mut self, min: f32, max: f32) {
        let (scale, opacity) = if min != max {
            let proportion = 1.0 - (self.ndc_depth - min) / (max - min);
            (0.5 + proportion * 0.5, 0.6 + proportion * 0.4)
        } else {
            (1.0, 1.0)
        };
        self.scale = scale;
        self.opacity = opacity;
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    /// Sprite size after depth scaling
    pub fn sprite_size(&self) -> [f32; 2] {
        [MARKER_SIZE[0] * self.scale, MARKER_SIZE[1] * self.scale]
    }

    pub fn render_order(&self) -> i32 {
        MARKER_RENDER_ORDER
    }
}

/// Scene-wide recomputation of marker depth banding
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkerCluster {
    pub marker_update_required: bool,
    range: Option<(f32, f32)>,
}

impl MarkerCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Depth range used by the last recomputation
    pub fn range(&self) -> Option<(f32, f32)> {
        self.range
    }

    /// Band every enabled marker by its depth among the others
    ///
    /// Only applies when more than one marker is enabled.
    pub fn calculate<'a>(&mut self, markers: impl IntoIterator<Item = &'a mut Marker>) {
        let mut enabled: Vec<&mut Marker> =
            markers.into_iter().filter(|m| m.is_enabled()).collect();
        self.marker_update_required = false;
        if enabled.len() < 2 {
            self.range = None;
            return;
        }
        let (min, max) = enabled.iter().fold((f32::MAX, f32::MIN), |(lo, hi), m| {
            (lo.min(m.ndc_depth()), hi.max(m.ndc_depth()))
        });
        for marker in &mut enabled {
            marker.update_visual(min, max);
        }
        self.range = Some((min, max));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn marker_at_depth(depth: f32) -> Marker {
        let mut marker = Marker::new();
        marker.ndc_depth = depth;
        marker.enable();
        marker
    }

    #[test]
    fn test_marker_mode() {
        assert!(MarkerMode::On.is_enabled(false));
        assert!(!MarkerMode::Off.is_enabled(true));
        assert!(MarkerMode::Inherited.is_enabled(true));
        assert!(!MarkerMode::Inherited.is_enabled(false));
        assert_eq!(MarkerMode::from_name("sometimes"), MarkerMode::Inherited);
    }

    #[test]
    fn test_cluster_bands_by_depth() {
        let mut near = marker_at_depth(0.2);
        let mut mid = marker_at_depth(0.5);
        let mut far = marker_at_depth(0.8);
        let mut hidden = marker_at_depth(0.9);
        hidden.disable();

        let mut cluster = MarkerCluster {
            marker_update_required: true,
            ..Default::default()
        };
        cluster.calculate([&mut near, &mut mid, &mut far, &mut hidden]);

        assert!(!cluster.marker_update_required);
        assert_eq!(cluster.range(), Some((0.2, 0.8)));
        assert_relative_eq!(near.scale(), 1.0);
        assert_relative_eq!(near.opacity(), 1.0);
        assert_relative_eq!(mid.scale(), 0.75, epsilon = 1e-5);
        assert_relative_eq!(far.scale(), 0.5);
        assert_relative_eq!(far.opacity(), 0.6);
        assert_relative_eq!(hidden.scale(), 1.0);
    }

    #[test]
    fn test_single_marker_untouched() {
        let mut only = marker_at_depth(0.4);
        only.scale = 0.7;
        let mut cluster = MarkerCluster::new();
        cluster.calculate([&mut only]);
        assert_eq!(cluster.range(), None);
        assert_eq!(only.scale(), 0.7);
    }

    #[test]
    fn test_equal_depths_full_size() {
        let mut marker = marker_at_depth(0.3);
        marker.update_visual(0.3, 0.3);
        assert_eq!(marker.sprite_size(), MARKER_SIZE);
    }
}
