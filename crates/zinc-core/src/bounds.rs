//! World-space extents of primitives and regions

use glam::{Mat4, Vec3};

/// Axis-aligned box around a primitive's current vertices
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Box around vertex positions, `None` for an empty vertex list
    pub fn from_positions(positions: &[[f32; 3]]) -> Option<Self> {
        let (first, rest) = positions.split_first()?;
        let start = Vec3::from(*first);
        Some(rest.iter().fold(Self::new(start, start), |bbox, p| {
            bbox.including(Vec3::from(*p))
        }))
    }

    fn including(self, point: Vec3) -> Self {
        Self::new(self.min.min(point), self.max.max(point))
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Radius of the sphere through the corners, used for camera fitting
    /// and level-of-detail distances
    pub fn radius(&self) -> f32 {
        self.center().distance(self.max)
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        Self::new(self.min.min(other.min), self.max.max(other.max))
    }

    /// Box around the eight corners after applying `transform`
    pub fn transform(&self, transform: &Mat4) -> BoundingBox {
        let corner = |i: usize| {
            Vec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            )
        };
        let start = transform.transform_point3(corner(0));
        (1..8).fold(Self::new(start, start), |bbox, i| {
            bbox.including(transform.transform_point3(corner(i)))
        })
    }
}

/// Union where either side may be missing (hidden or empty primitives)
pub(crate) fn union_option(acc: Option<BoundingBox>, next: Option<BoundingBox>) -> Option<BoundingBox> {
    match (acc, next) {
        (Some(a), Some(b)) => Some(a.union(&b)),
        (a, b) => a.or(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_from_positions() {
        assert!(BoundingBox::from_positions(&[]).is_none());
        let bbox = BoundingBox::from_positions(&[[0.0, 0.0, 0.0], [10.0, 1.0, 1.0]]).unwrap();
        assert_eq!(bbox.center(), Vec3::new(5.0, 0.5, 0.5));
        let single = BoundingBox::from_positions(&[[1.0, 2.0, 3.0]]).unwrap();
        assert_eq!(single.min, single.max);
        assert_eq!(single.radius(), 0.0);
    }

    #[test]
    fn test_transform_rotation_grows_box() {
        let bbox = BoundingBox::new(Vec3::ZERO, Vec3::new(2.0, 1.0, 1.0));
        let moved = bbox.transform(&Mat4::from_translation(Vec3::new(2.0, 0.0, 0.0)));
        assert_eq!(moved.min, Vec3::new(2.0, 0.0, 0.0));

        let turned = bbox.transform(&Mat4::from_rotation_z(std::f32::consts::FRAC_PI_2));
        assert_relative_eq!(turned.min.x, -1.0, epsilon = 1e-5);
        assert_relative_eq!(turned.max.y, 2.0, epsilon = 1e-5);
    }

    #[test]
    fn test_union_option() {
        let a = BoundingBox::new(Vec3::ZERO, Vec3::ONE);
        let b = BoundingBox::new(Vec3::splat(-1.0), Vec3::ZERO);
        assert_eq!(union_option(None, Some(a)), Some(a));
        assert_eq!(union_option(Some(a), None), Some(a));
        assert_eq!(union_option(None, None), None);
        let u = union_option(Some(a), Some(b)).unwrap();
        assert_eq!(u.min, Vec3::splat(-1.0));
        assert_eq!(u.max, Vec3::ONE);
    }
}
