use std::collections::HashMap;

use arrayvec::ArrayVec;
use glam::DVec3;

use crate::{
    element::{EH, FH, Handle, VH},
    error::Error,
    math::newell_normal,
    status::Status,
};

/// The mesh editing operations the patch kernel needs. The kernel never
/// owns the mesh, it only mutates it through this interface.
pub trait MeshBuilder {
    /// Add a vertex at the given position.
    fn new_vertex(&mut self, pos: DVec3) -> VH;

    /// Add an explicit edge between two vertices. If the edge already
    /// exists, it is returned instead.
    fn new_edge(&mut self, a: VH, b: VH) -> Result<EH, Error>;

    /// Add a quad with the given corners in counter-clockwise order. Missing
    /// edges are created implicitly.
    fn new_quad(&mut self, verts: [VH; 4]) -> Result<FH, Error>;

    /// Delete faces. Implicit edges that are no longer used by any face are
    /// deleted with them.
    fn delete_faces(&mut self, faces: &[FH]) -> Result<(), Error>;

    /// Delete edges, along with the faces incident on them.
    fn delete_edges(&mut self, edges: &[EH]) -> Result<(), Error>;

    /// Delete vertices, along with the edges and faces incident on them.
    fn delete_vertices(&mut self, verts: &[VH]) -> Result<(), Error>;

    /// Merge all given vertices into the first one, and move it to
    /// `pos`. Returns the surviving vertex.
    fn point_merge(&mut self, verts: &[VH], pos: DVec3) -> Result<VH, Error>;

    /// Laplacian smoothing of the given vertices. Vertices not in the list
    /// do not move.
    fn smooth(&mut self, verts: &[VH], iterations: usize, factor: f64) -> Result<(), Error>;

    fn is_valid_vertex(&self, v: VH) -> bool;

    fn is_valid_edge(&self, e: EH) -> bool;

    fn is_valid_face(&self, f: FH) -> bool;

    fn position(&self, v: VH) -> Result<DVec3, Error>;

    fn set_position(&mut self, v: VH, pos: DVec3) -> Result<(), Error>;

    /// Unit normal of the face. Zero if the face is degenerate.
    fn face_normal(&self, f: FH) -> Result<DVec3, Error>;

    fn flip_face_normal(&mut self, f: FH) -> Result<(), Error>;
}

fn edge_key(a: VH, b: VH) -> (VH, VH) {
    if a < b { (a, b) } else { (b, a) }
}

fn face_edges(verts: &[VH]) -> impl Iterator<Item = (VH, VH)> + '_ {
    verts
        .iter()
        .zip(verts.iter().cycle().skip(1))
        .map(|(a, b)| (*a, *b))
}

fn remove_item<T: PartialEq>(list: &mut Vec<T>, item: T) {
    list.retain(|x| *x != item);
}

/// A simple vertex / edge / face store that implements [`MeshBuilder`].
///
/// Elements are never re-indexed. Deleting an element only sets its status
/// flag, so handles stay stable for the life time of the mesh.
#[derive(Debug, Clone, Default)]
pub struct QuadMesh {
    pub(crate) points: Vec<DVec3>,
    pub(crate) vstatus: Vec<Status>,
    pub(crate) vert_faces: Vec<Vec<FH>>,
    pub(crate) vert_edges: Vec<Vec<EH>>,
    pub(crate) edges: Vec<[VH; 2]>,
    pub(crate) estatus: Vec<Status>,
    pub(crate) edge_map: HashMap<(VH, VH), EH>,
    pub(crate) faces: Vec<ArrayVec<VH, 4>>,
    pub(crate) fstatus: Vec<Status>,
}

impl QuadMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_vertices(&self) -> usize {
        self.vstatus.iter().filter(|s| !s.deleted()).count()
    }

    pub fn num_edges(&self) -> usize {
        self.estatus.iter().filter(|s| !s.deleted()).count()
    }

    pub fn num_faces(&self) -> usize {
        self.fstatus.iter().filter(|s| !s.deleted()).count()
    }

    pub fn vertices(&self) -> impl Iterator<Item = VH> + '_ {
        (0..self.points.len())
            .map(VH::from)
            .filter(|v| !self.vstatus[v.index() as usize].deleted())
    }

    pub fn edges(&self) -> impl Iterator<Item = EH> + '_ {
        (0..self.edges.len())
            .map(EH::from)
            .filter(|e| !self.estatus[e.index() as usize].deleted())
    }

    pub fn faces(&self) -> impl Iterator<Item = FH> + '_ {
        (0..self.faces.len())
            .map(FH::from)
            .filter(|f| !self.fstatus[f.index() as usize].deleted())
    }

    pub fn face_vertices(&self, f: FH) -> Result<&[VH], Error> {
        if !self.is_valid_face(f) {
            return Err(Error::InvalidFace(f));
        }
        Ok(&self.faces[f.index() as usize])
    }

    pub fn edge_vertices(&self, e: EH) -> Result<[VH; 2], Error> {
        if !self.is_valid_edge(e) {
            return Err(Error::InvalidEdge(e));
        }
        Ok(self.edges[e.index() as usize])
    }

    /// Find the edge between the two vertices, in either direction.
    pub fn find_edge(&self, a: VH, b: VH) -> Option<EH> {
        self.edge_map.get(&edge_key(a, b)).copied()
    }

    /// Whether the edge was created explicitly, rather than implicitly by
    /// adding a face.
    pub fn is_feature_edge(&self, e: EH) -> bool {
        self.is_valid_edge(e) && self.estatus[e.index() as usize].feature()
    }

    /// Faces that use the edge between `a` and `b`, in either direction.
    pub fn edge_faces(&self, a: VH, b: VH) -> impl Iterator<Item = FH> + '_ {
        self.vert_faces
            .get(a.index() as usize)
            .into_iter()
            .flatten()
            .copied()
            .filter(move |f| {
                face_edges(&self.faces[f.index() as usize])
                    .any(|(x, y)| (x == a && y == b) || (x == b && y == a))
            })
    }

    fn check_vertex(&self, v: VH) -> Result<(), Error> {
        if self.is_valid_vertex(v) {
            Ok(())
        } else {
            Err(Error::InvalidVertex(v))
        }
    }

    fn add_edge(&mut self, a: VH, b: VH, feature: bool) -> EH {
        if let Some(e) = self.find_edge(a, b) {
            if feature {
                self.estatus[e.index() as usize].set_feature(true);
            }
            return e;
        }
        let e: EH = self.edges.len().into();
        let mut status = Status::default();
        status.set_feature(feature);
        self.edges.push([a, b]);
        self.estatus.push(status);
        self.edge_map.insert(edge_key(a, b), e);
        self.vert_edges[a.index() as usize].push(e);
        self.vert_edges[b.index() as usize].push(e);
        e
    }

    fn remove_edge(&mut self, e: EH) {
        let ei = e.index() as usize;
        if self.estatus[ei].deleted() {
            return;
        }
        let [a, b] = self.edges[ei];
        self.estatus[ei].set_deleted(true);
        if self.edge_map.get(&edge_key(a, b)) == Some(&e) {
            self.edge_map.remove(&edge_key(a, b));
        }
        remove_item(&mut self.vert_edges[a.index() as usize], e);
        remove_item(&mut self.vert_edges[b.index() as usize], e);
    }

    fn remove_face(&mut self, f: FH) {
        let fi = f.index() as usize;
        if self.fstatus[fi].deleted() {
            return;
        }
        self.fstatus[fi].set_deleted(true);
        let verts = self.faces[fi].clone();
        for v in &verts {
            remove_item(&mut self.vert_faces[v.index() as usize], f);
        }
        // Implicit edges left without a face go with it.
        for (a, b) in face_edges(&verts) {
            if let Some(e) = self.find_edge(a, b) {
                if !self.estatus[e.index() as usize].feature()
                    && self.edge_faces(a, b).next().is_none()
                {
                    self.remove_edge(e);
                }
            }
        }
    }

    /// Replace `from` with `to` in every edge incident on `from`.
    fn merge_edges(&mut self, from: VH, to: VH) {
        let incident = std::mem::take(&mut self.vert_edges[from.index() as usize]);
        for e in incident {
            let ei = e.index() as usize;
            let [a, b] = self.edges[ei];
            self.edge_map.remove(&edge_key(a, b));
            let (a, b) = (
                if a == from { to } else { a },
                if b == from { to } else { b },
            );
            let other = if a == to { b } else { a };
            if a == b {
                // Collapsed onto itself.
                self.estatus[ei].set_deleted(true);
                remove_item(&mut self.vert_edges[to.index() as usize], e);
                continue;
            }
            match self.edge_map.get(&edge_key(a, b)).copied() {
                Some(existing) => {
                    if self.estatus[ei].feature() {
                        self.estatus[existing.index() as usize].set_feature(true);
                    }
                    self.estatus[ei].set_deleted(true);
                    remove_item(&mut self.vert_edges[other.index() as usize], e);
                }
                None => {
                    self.edges[ei] = [a, b];
                    self.edge_map.insert(edge_key(a, b), e);
                    self.vert_edges[to.index() as usize].push(e);
                }
            }
        }
    }

    /// Replace `from` with `to` in every face incident on `from`.
    fn merge_faces(&mut self, from: VH, to: VH) {
        let incident = std::mem::take(&mut self.vert_faces[from.index() as usize]);
        for f in incident {
            let fi = f.index() as usize;
            let fverts = &mut self.faces[fi];
            for v in fverts.iter_mut() {
                if *v == from {
                    *v = to;
                }
            }
            // Drop consecutive duplicates, including the wrap around.
            let mut dedup: ArrayVec<VH, 4> = ArrayVec::new();
            for v in fverts.iter() {
                if dedup.last() != Some(v) {
                    dedup.push(*v);
                }
            }
            while dedup.len() > 1 && dedup.first() == dedup.last() {
                dedup.pop();
            }
            *fverts = dedup;
            let tfaces = &mut self.vert_faces[to.index() as usize];
            if !tfaces.contains(&f) {
                tfaces.push(f);
            }
            if self.faces[fi].len() < 3 {
                self.remove_face(f);
            }
        }
    }
}

impl MeshBuilder for QuadMesh {
    fn new_vertex(&mut self, pos: DVec3) -> VH {
        let v: VH = self.points.len().into();
        self.points.push(pos);
        self.vstatus.push(Status::default());
        self.vert_faces.push(Vec::new());
        self.vert_edges.push(Vec::new());
        v
    }

    fn new_edge(&mut self, a: VH, b: VH) -> Result<EH, Error> {
        self.check_vertex(a)?;
        self.check_vertex(b)?;
        if a == b {
            return Err(Error::DegenerateFace);
        }
        Ok(self.add_edge(a, b, true))
    }

    fn new_quad(&mut self, verts: [VH; 4]) -> Result<FH, Error> {
        for (i, v) in verts.iter().enumerate() {
            self.check_vertex(*v)?;
            if verts[(i + 1)..].contains(v) {
                return Err(Error::DegenerateFace);
            }
        }
        let f: FH = self.faces.len().into();
        self.faces.push(ArrayVec::from(verts));
        self.fstatus.push(Status::default());
        for v in verts {
            self.vert_faces[v.index() as usize].push(f);
        }
        for (a, b) in face_edges(&verts) {
            self.add_edge(a, b, false);
        }
        Ok(f)
    }

    fn delete_faces(&mut self, faces: &[FH]) -> Result<(), Error> {
        for f in faces {
            if !self.is_valid_face(*f) {
                return Err(Error::InvalidFace(*f));
            }
            self.remove_face(*f);
        }
        Ok(())
    }

    fn delete_edges(&mut self, edges: &[EH]) -> Result<(), Error> {
        for e in edges {
            let [a, b] = self.edge_vertices(*e)?;
            let incident: Vec<FH> = self.edge_faces(a, b).collect();
            for f in incident {
                self.remove_face(f);
            }
            self.remove_edge(*e);
        }
        Ok(())
    }

    fn delete_vertices(&mut self, verts: &[VH]) -> Result<(), Error> {
        for v in verts {
            self.check_vertex(*v)?;
            let vi = v.index() as usize;
            let faces = self.vert_faces[vi].clone();
            for f in faces {
                self.remove_face(f);
            }
            let edges = self.vert_edges[vi].clone();
            for e in edges {
                self.remove_edge(e);
            }
            self.vstatus[vi].set_deleted(true);
        }
        Ok(())
    }

    fn point_merge(&mut self, verts: &[VH], pos: DVec3) -> Result<VH, Error> {
        let keep = match verts.first() {
            Some(v) => *v,
            None => return Err(Error::TemplateAssembly("Nothing to merge")),
        };
        for v in verts {
            self.check_vertex(*v)?;
        }
        for v in verts.iter().skip(1).copied() {
            if v == keep || self.vstatus[v.index() as usize].deleted() {
                continue;
            }
            self.merge_edges(v, keep);
            self.merge_faces(v, keep);
            self.vstatus[v.index() as usize].set_deleted(true);
        }
        self.points[keep.index() as usize] = pos;
        Ok(keep)
    }

    fn smooth(&mut self, verts: &[VH], iterations: usize, factor: f64) -> Result<(), Error> {
        for v in verts {
            self.check_vertex(*v)?;
        }
        let mut targets = Vec::with_capacity(verts.len());
        for _ in 0..iterations {
            targets.clear();
            targets.extend(verts.iter().map(|v| {
                let vi = v.index() as usize;
                let (count, total) = self.vert_edges[vi].iter().fold(
                    (0usize, DVec3::ZERO),
                    |(count, total), e| {
                        let [a, b] = self.edges[e.index() as usize];
                        let other = if a == *v { b } else { a };
                        (count + 1, total + self.points[other.index() as usize])
                    },
                );
                let current = self.points[vi];
                if count == 0 {
                    current
                } else {
                    current + (total / count as f64 - current) * factor
                }
            }));
            for (v, pos) in verts.iter().zip(targets.iter()) {
                self.points[v.index() as usize] = *pos;
            }
        }
        Ok(())
    }

    fn is_valid_vertex(&self, v: VH) -> bool {
        self.vstatus
            .get(v.index() as usize)
            .is_some_and(|s| !s.deleted())
    }

    fn is_valid_edge(&self, e: EH) -> bool {
        self.estatus
            .get(e.index() as usize)
            .is_some_and(|s| !s.deleted())
    }

    fn is_valid_face(&self, f: FH) -> bool {
        self.fstatus
            .get(f.index() as usize)
            .is_some_and(|s| !s.deleted())
    }

    fn position(&self, v: VH) -> Result<DVec3, Error> {
        self.check_vertex(v)?;
        Ok(self.points[v.index() as usize])
    }

    fn set_position(&mut self, v: VH, pos: DVec3) -> Result<(), Error> {
        self.check_vertex(v)?;
        self.points[v.index() as usize] = pos;
        Ok(())
    }

    fn face_normal(&self, f: FH) -> Result<DVec3, Error> {
        Ok(newell_normal(
            self.face_vertices(f)?
                .iter()
                .map(|v| self.points[v.index() as usize]),
        ))
    }

    fn flip_face_normal(&mut self, f: FH) -> Result<(), Error> {
        if !self.is_valid_face(f) {
            return Err(Error::InvalidFace(f));
        }
        self.faces[f.index() as usize].reverse();
        Ok(())
    }
}
