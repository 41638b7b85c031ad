use glam::DVec3;

use crate::{
    element::VH,
    error::Error,
    math::{centroid, mean_segment_length, newell_normal},
    mesh::MeshBuilder,
};

/// One side of a patch: a chain of vertices from one corner to the next.
/// Consecutive sides share their end points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundarySide {
    verts: Vec<VH>,
}

impl BoundarySide {
    pub fn new(verts: Vec<VH>) -> Self {
        BoundarySide { verts }
    }

    /// Number of segments, i.e. one less than the number of vertices.
    pub fn len(&self) -> usize {
        self.verts.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn vertices(&self) -> &[VH] {
        &self.verts
    }

    pub fn first(&self) -> Option<VH> {
        self.verts.first().copied()
    }

    pub fn last(&self) -> Option<VH> {
        self.verts.last().copied()
    }

    /// The side walked in the opposite direction.
    pub fn reversed(&self) -> Self {
        BoundarySide {
            verts: self.verts.iter().rev().copied().collect(),
        }
    }

    /// Sub-chain covering the segments `from..to`.
    pub(crate) fn segments(&self, from: usize, to: usize) -> Self {
        BoundarySide {
            verts: self.verts[from..=to].to_vec(),
        }
    }

    pub(crate) fn replace_vertex(&mut self, from: VH, to: VH) {
        for v in self.verts.iter_mut() {
            if *v == from {
                *v = to;
            }
        }
        self.verts.dedup();
    }

    pub(crate) fn insert(&mut self, index: usize, v: VH) {
        self.verts.insert(index, v);
    }
}

impl From<Vec<VH>> for BoundarySide {
    fn from(verts: Vec<VH>) -> Self {
        BoundarySide::new(verts)
    }
}

/// Check that the sides form a closed loop of at least three non-empty
/// sides made of live vertices.
pub fn validate<M: MeshBuilder>(mesh: &M, sides: &[BoundarySide]) -> Result<(), Error> {
    if sides.len() < 3 {
        return Err(Error::TooFewSides(sides.len()));
    }
    for (i, side) in sides.iter().enumerate() {
        if side.is_empty() {
            return Err(Error::EmptySide(i));
        }
        if let Some(v) = side.vertices().iter().find(|v| !mesh.is_valid_vertex(**v)) {
            return Err(Error::InvalidVertex(*v));
        }
        let prev = &sides[(i + sides.len() - 1) % sides.len()];
        if prev.last() != side.first() {
            return Err(Error::DisconnectedSides(i));
        }
    }
    Ok(())
}

/// The closed loop of vertices around the sides, without repeating the
/// shared corners.
pub fn boundary_loop(sides: &[BoundarySide]) -> Vec<VH> {
    sides
        .iter()
        .flat_map(|s| s.vertices().iter().take(s.len()).copied())
        .collect()
}

/// Positions of the vertices of the loop.
pub(crate) fn loop_points<M: MeshBuilder>(mesh: &M, verts: &[VH]) -> Result<Vec<DVec3>, Error> {
    verts.iter().map(|v| mesh.position(*v)).collect()
}

/// Centroid, Newell normal and mean segment length of the loop around the
/// sides.
pub(crate) fn loop_frame<M: MeshBuilder>(
    mesh: &M,
    sides: &[BoundarySide],
) -> Result<(DVec3, DVec3, f64), Error> {
    let points = loop_points(mesh, &boundary_loop(sides))?;
    Ok((
        centroid(points.iter().copied()),
        newell_normal(points.iter().copied()),
        mean_segment_length(&points),
    ))
}
