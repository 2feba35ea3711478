//! Visibility queries for the render consumer.
//!
//! The world only needs a position (for back-to-front sorting) and an AABB
//! test. Two implementations are provided: a radius check for headless use
//! and a view-frustum test for real cameras.

use strata_shared::{Aabb, Vec3};

/// What the world asks of a camera when drawing.
pub trait Camera {
    /// Eye position in world space.
    fn position(&self) -> Vec3;

    /// Whether any part of the box may be on screen.
    fn is_box_visible(&self, min: Vec3, max: Vec3) -> bool;
}

/// Sees every box within `radius` of `position`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceCamera {
    /// Eye position.
    pub position: Vec3,
    /// View distance in world units.
    pub radius: f32,
}

impl Camera for DistanceCamera {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn is_box_visible(&self, min: Vec3, max: Vec3) -> bool {
        // Closest point of the box to the eye
        let p = self.position;
        let closest = Vec3::new(p.x.clamp(min.x, max.x), p.y.clamp(min.y, max.y), p.z.clamp(min.z, max.z));
        closest.distance_squared(p) <= self.radius * self.radius
    }
}

/// A plane `a*x + b*y + c*z + d = 0`, normal pointing inside the frustum.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Plane {
    normal: Vec3,
    d: f32,
}

impl Plane {
    fn normalized(normal: Vec3, d: f32) -> Self {
        let len = normal.length_squared().sqrt();
        if len > 0.0 {
            Self {
                normal: normal * (1.0 / len),
                d: d / len,
            }
        } else {
            Self { normal, d }
        }
    }

    fn distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.d
    }
}

/// Camera culling against the six planes of a view-projection matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrustumCamera {
    position: Vec3,
    planes: [Plane; 6],
}

impl FrustumCamera {
    /// Extracts the frustum from a column-major view-projection matrix
    /// with a `0..1` depth range.
    #[must_use]
    pub fn from_view_projection(position: Vec3, m: &[[f32; 4]; 4]) -> Self {
        let row = |r: usize| [m[0][r], m[1][r], m[2][r], m[3][r]];
        let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));
        let plane = |a: [f32; 4], sign: f32, b: [f32; 4]| {
            Plane::normalized(
                Vec3::new(a[0] + sign * b[0], a[1] + sign * b[1], a[2] + sign * b[2]),
                a[3] + sign * b[3],
            )
        };

        let planes = [
            plane(r3, 1.0, r0),  // left
            plane(r3, -1.0, r0), // right
            plane(r3, 1.0, r1),  // bottom
            plane(r3, -1.0, r1), // top
            plane(r2, 0.0, r2),  // near
            plane(r3, -1.0, r2), // far
        ];
        Self { position, planes }
    }

    /// Tests an AABB against every plane.
    #[must_use]
    pub fn test_aabb(&self, aabb: &Aabb) -> bool {
        let center = aabb.center();
        let half = (aabb.max - aabb.min) * 0.5;
        self.planes.iter().all(|plane| {
            let r = half.x * plane.normal.x.abs()
                + half.y * plane.normal.y.abs()
                + half.z * plane.normal.z.abs();
            plane.distance_to_point(center) >= -r
        })
    }
}

impl Camera for FrustumCamera {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn is_box_visible(&self, min: Vec3, max: Vec3) -> bool {
        self.test_aabb(&Aabb::new(min, max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDENTITY: [[f32; 4]; 4] = [
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ];

    #[test]
    fn test_distance_camera_uses_closest_point() {
        let camera = DistanceCamera {
            position: Vec3::ZERO,
            radius: 2.0,
        };
        assert!(camera.is_box_visible(Vec3::new(1.5, -1.0, -1.0), Vec3::new(10.0, 1.0, 1.0)));
        assert!(!camera.is_box_visible(Vec3::new(2.5, 0.0, 0.0), Vec3::new(3.0, 1.0, 1.0)));
    }

    #[test]
    fn test_identity_frustum_is_clip_volume() {
        let camera = FrustumCamera::from_view_projection(Vec3::ZERO, &IDENTITY);
        assert!(camera.is_box_visible(Vec3::new(-0.5, -0.5, 0.2), Vec3::new(0.5, 0.5, 0.8)));
        // Straddling a plane still counts
        assert!(camera.is_box_visible(Vec3::new(0.9, 0.0, 0.5), Vec3::new(3.0, 0.1, 0.6)));
        assert!(!camera.is_box_visible(Vec3::new(2.0, 0.0, 0.5), Vec3::new(3.0, 0.1, 0.6)));
        assert!(!camera.is_box_visible(Vec3::new(0.0, 0.0, -3.0), Vec3::new(0.1, 0.1, -2.0)));
    }
}
