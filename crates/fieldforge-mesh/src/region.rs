//! Axis-aligned meshing region derived from a Bounds Controller.

use glam::{DMat4, DVec3};

/// World-space box the mesher samples.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeshRegion {
    pub min: DVec3,
    pub max: DVec3,
}

impl MeshRegion {
    pub fn new(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    /// Transforms the eight corners of the unit cube `[-1, 1]^3` by the bounds
    /// world matrix and takes their per-axis min and max.
    pub fn from_bounds_matrix(matrix: &DMat4) -> Self {
        let mut min = DVec3::splat(f64::INFINITY);
        let mut max = DVec3::splat(f64::NEG_INFINITY);
        for i in 0..8 {
            let corner = DVec3::new(
                if i & 1 == 0 { -1.0 } else { 1.0 },
                if i & 2 == 0 { -1.0 } else { 1.0 },
                if i & 4 == 0 { -1.0 } else { 1.0 },
            );
            let world = matrix.transform_point3(corner);
            min = min.min(world);
            max = max.max(world);
        }
        Self { min, max }
    }

    pub fn size(&self) -> DVec3 {
        self.max - self.min
    }

    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    pub fn contains(&self, point: DVec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }
}
