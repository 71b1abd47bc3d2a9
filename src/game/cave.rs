//! Cave boundary geometry
//!
//! The traversable space is a tube around a polyline of weighted circles:
//! each control node carries a position and an allowed radius, and the
//! radius between adjacent nodes is linearly interpolated. The ship's
//! integrated position is clamped against this tube every tick.

use serde::{Deserialize, Serialize};

use crate::game::rng::GameRng;
use crate::util::vec3::Vec3;

/// One control point of the cave centerline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CaveNode {
    pub position: Vec3,
    /// Allowed distance from the centerline at this node.
    pub radius: f32,
}

/// Result of a nearest-point query against the centerline.
#[derive(Debug, Clone, Copy)]
pub struct PathSample {
    /// Closest point on the centerline polyline.
    pub point: Vec3,
    /// Allowed radius at that point (lerped between the segment's nodes).
    pub radius: f32,
    /// Unit tangent of the segment the sample lies on.
    pub tangent: Vec3,
    /// Index of the segment's first node.
    pub segment: usize,
}

/// Result of clamping a position into the tube.
#[derive(Debug, Clone, Copy)]
pub struct ClampResult {
    pub position: Vec3,
    /// Outward surface normal at the contact point. Zero when not clamped.
    pub normal: Vec3,
    pub tangent: Vec3,
    pub was_clamped: bool,
}

/// Static tube-shaped traversable path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CavePath {
    nodes: Vec<CaveNode>,
}

impl CavePath {
    /// Build a path from explicit nodes. Panics on fewer than two nodes
    /// since a polyline needs at least one segment; callers construct paths
    /// from generation, not user input.
    pub fn new(nodes: Vec<CaveNode>) -> Self {
        assert!(nodes.len() >= 2, "cave path needs at least two nodes");
        Self { nodes }
    }

    /// Generate a winding tube from a seeded stream. Identical seeds yield
    /// identical paths.
    pub fn generate(rng: &mut GameRng, node_count: usize) -> Self {
        let count = node_count.max(2);
        let mut nodes = Vec::with_capacity(count);
        let mut position = Vec3::ZERO;
        let mut heading = Vec3::X;

        for _ in 0..count {
            let radius = rng.range_f32(18.0, 30.0);
            nodes.push(CaveNode { position, radius });

            // Drift the heading a little each step, keeping the tube mostly
            // forward so segments never double back on themselves.
            let yaw = rng.range_f32(-0.35, 0.35);
            let pitch = rng.range_f32(-0.25, 0.25);
            let drift = Vec3::new(0.0, pitch, yaw);
            heading = (heading + drift).normalize();
            if heading.x < 0.3 {
                heading = Vec3::new(0.5, heading.y, heading.z).normalize();
            }
            position += heading * rng.range_f32(35.0, 50.0);
        }

        Self { nodes }
    }

    pub fn nodes(&self) -> &[CaveNode] {
        &self.nodes
    }

    /// Spawn point for a fresh ship: first node's center.
    pub fn start(&self) -> Vec3 {
        self.nodes[0].position
    }

    /// Closest point on the centerline to `p`, with the locally
    /// interpolated allowed radius and segment tangent.
    pub fn nearest(&self, p: Vec3) -> PathSample {
        let mut best: Option<(f32, PathSample)> = None;

        for i in 0..self.nodes.len() - 1 {
            let a = self.nodes[i];
            let b = self.nodes[i + 1];
            let ab = b.position - a.position;
            let len_sq = ab.length_sq();
            let t = if len_sq > 0.0 {
                ((p - a.position).dot(ab) / len_sq).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let point = a.position + ab * t;
            let dist_sq = p.distance_sq_to(point);

            if best.map_or(true, |(d, _)| dist_sq < d) {
                best = Some((
                    dist_sq,
                    PathSample {
                        point,
                        radius: a.radius + (b.radius - a.radius) * t,
                        tangent: ab.normalize(),
                        segment: i,
                    },
                ));
            }
        }

        // At least one segment exists by construction
        best.expect("cave path has no segments").1
    }

    /// Clamp `p` into the tube. Positions inside the allowed radius pass
    /// through unchanged; positions outside are projected onto the boundary.
    pub fn clamp(&self, p: Vec3) -> ClampResult {
        let sample = self.nearest(p);
        let offset = p - sample.point;
        let dist = offset.length();

        if dist <= sample.radius {
            return ClampResult {
                position: p,
                normal: Vec3::ZERO,
                tangent: sample.tangent,
                was_clamped: false,
            };
        }

        // Exactly on the centerline with zero offset cannot exceed the
        // radius, so `dist > 0` here and the normal is well defined.
        let normal = offset * (1.0 / dist);
        ClampResult {
            position: sample.point + normal * sample.radius,
            normal,
            tangent: sample.tangent,
            was_clamped: true,
        }
    }

    /// Distance from `p` to the centerline.
    pub fn centerline_distance(&self, p: Vec3) -> f32 {
        p.distance_to(self.nearest(p).point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn straight_path() -> CavePath {
        CavePath::new(vec![
            CaveNode { position: Vec3::ZERO, radius: 10.0 },
            CaveNode { position: Vec3::new(100.0, 0.0, 0.0), radius: 20.0 },
        ])
    }

    #[test]
    fn test_nearest_interpolates_radius() {
        let path = straight_path();
        let sample = path.nearest(Vec3::new(50.0, 5.0, 0.0));
        assert!(sample.point.approx_eq(Vec3::new(50.0, 0.0, 0.0), 1e-4));
        assert!((sample.radius - 15.0).abs() < 1e-4);
        assert!(sample.tangent.approx_eq(Vec3::X, 1e-6));
    }

    #[test]
    fn test_nearest_clamps_to_segment_ends() {
        let path = straight_path();
        let sample = path.nearest(Vec3::new(-50.0, 3.0, 0.0));
        assert!(sample.point.approx_eq(Vec3::ZERO, 1e-4));
        assert!((sample.radius - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_clamp_inside_is_identity() {
        let path = straight_path();
        let p = Vec3::new(50.0, 8.0, 0.0);
        let result = path.clamp(p);
        assert!(!result.was_clamped);
        assert!(result.position.approx_eq(p, 1e-6));
    }

    #[test]
    fn test_clamp_projects_to_boundary() {
        let path = straight_path();
        let result = path.clamp(Vec3::new(50.0, 40.0, 0.0));
        assert!(result.was_clamped);
        // At x=50 the allowed radius is 15
        assert!(result.position.approx_eq(Vec3::new(50.0, 15.0, 0.0), 1e-3));
        assert!(result.normal.approx_eq(Vec3::Y, 1e-4));
    }

    #[test]
    fn test_clamped_position_satisfies_boundary_invariant() {
        let mut rng = GameRng::new(77);
        let path = CavePath::generate(&mut rng, 24);
        let mut probe = GameRng::new(78);
        for _ in 0..200 {
            let p = Vec3::new(
                probe.range_f32(-200.0, 1500.0),
                probe.range_f32(-300.0, 300.0),
                probe.range_f32(-300.0, 300.0),
            );
            let clamped = path.clamp(p).position;
            let sample = path.nearest(clamped);
            assert!(clamped.distance_to(sample.point) <= sample.radius + 1e-3);
        }
    }

    #[test]
    fn test_generate_deterministic() {
        let a = CavePath::generate(&mut GameRng::new(1234), 16);
        let b = CavePath::generate(&mut GameRng::new(1234), 16);
        assert_eq!(a.nodes.len(), b.nodes.len());
        for (na, nb) in a.nodes.iter().zip(b.nodes.iter()) {
            assert!(na.position.approx_eq(nb.position, 1e-9));
            assert!((na.radius - nb.radius).abs() < 1e-9);
        }
    }

    #[test]
    fn test_generate_moves_forward() {
        let path = CavePath::generate(&mut GameRng::new(5), 16);
        let nodes = path.nodes();
        assert!(nodes.last().unwrap().position.x > nodes[0].position.x);
    }
}
