use glam::DVec3;

use crate::{element::VH, error::Error};

/// Projects points onto the reference surface the patch is attached to.
pub trait SurfaceSnapOracle {
    /// Find where the line through `origin` along `direction` meets the
    /// surface. The search distance is `tolerance_ratio` times the size of
    /// the surface. If `prefer_closest` is set, the hit closest to `origin`
    /// is returned, otherwise the first hit in front of it.
    fn query(
        &self,
        origin: DVec3,
        direction: DVec3,
        tolerance_ratio: f64,
        prefer_closest: bool,
    ) -> Option<DVec3>;
}

/// A triangle soup used as the reference surface.
#[derive(Debug, Clone)]
pub struct TriangleSurface {
    points: Vec<DVec3>,
    triangles: Vec<[u32; 3]>,
    diagonal: f64,
}

impl TriangleSurface {
    /// Create a surface from points and triangles that index into them.
    pub fn new(points: Vec<DVec3>, triangles: Vec<[u32; 3]>) -> Result<Self, Error> {
        if let Some(i) = triangles
            .iter()
            .flatten()
            .find(|i| **i as usize >= points.len())
        {
            return Err(Error::InvalidVertex(VH::from(i)));
        }
        let (min, max) = points.iter().fold(
            (DVec3::splat(f64::INFINITY), DVec3::splat(f64::NEG_INFINITY)),
            |(min, max), p| (min.min(*p), max.max(*p)),
        );
        let diagonal = if points.is_empty() {
            0.0
        } else {
            min.distance(max)
        };
        Ok(TriangleSurface {
            points,
            triangles,
            diagonal,
        })
    }

    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    /// Length of the diagonal of the bounding box.
    pub fn diagonal(&self) -> f64 {
        self.diagonal
    }

    /// Möller-Trumbore. Returns the signed line parameter of the hit.
    fn intersect(&self, tri: &[u32; 3], origin: DVec3, dir: DVec3) -> Option<f64> {
        const EPS: f64 = 1e-12;
        let [a, b, c] = tri.map(|i| self.points[i as usize]);
        let (e1, e2) = (b - a, c - a);
        let p = dir.cross(e2);
        let det = e1.dot(p);
        if det.abs() < EPS {
            return None;
        }
        let inv = 1.0 / det;
        let s = origin - a;
        let u = s.dot(p) * inv;
        if !(-EPS..=1.0 + EPS).contains(&u) {
            return None;
        }
        let q = s.cross(e1);
        let v = dir.dot(q) * inv;
        if v < -EPS || u + v > 1.0 + EPS {
            return None;
        }
        Some(e2.dot(q) * inv)
    }
}

impl SurfaceSnapOracle for TriangleSurface {
    fn query(
        &self,
        origin: DVec3,
        direction: DVec3,
        tolerance_ratio: f64,
        prefer_closest: bool,
    ) -> Option<DVec3> {
        let dir = direction.normalize_or_zero();
        if dir == DVec3::ZERO {
            return None;
        }
        let limit = tolerance_ratio * self.diagonal;
        let hits = self
            .triangles
            .iter()
            .filter_map(|tri| self.intersect(tri, origin, dir))
            .filter(|t| t.abs() <= limit);
        let best = if prefer_closest {
            hits.min_by(|a, b| a.abs().total_cmp(&b.abs()))
        } else {
            hits.fold(None, |best: Option<f64>, t| match best {
                None => Some(t),
                // Forward hits beat backward hits, then nearer beats farther.
                Some(b) if (t >= 0.0) != (b >= 0.0) => Some(if t >= 0.0 { t } else { b }),
                Some(b) => Some(if t.abs() < b.abs() { t } else { b }),
            })
        };
        best.map(|t| origin + dir * t)
    }
}
