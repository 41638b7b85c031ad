use std::collections::HashMap;

use crate::{
    element::{EH, FH, Handle},
    error::Error,
    mesh::{MeshBuilder, QuadMesh},
};

fn check_edges(mesh: &QuadMesh) -> Result<(), Error> {
    for e in mesh.edges() {
        let [a, b] = mesh.edges[e.index() as usize];
        if !mesh.is_valid_vertex(a) {
            return Err(Error::InvalidVertex(a));
        }
        if !mesh.is_valid_vertex(b) {
            return Err(Error::InvalidVertex(b));
        }
        // The lookup table must agree with the edge.
        if a == b || mesh.find_edge(a, b) != Some(e) {
            return Err(Error::InvalidEdge(e));
        }
    }
    Ok(())
}

fn check_faces(mesh: &QuadMesh) -> Result<(), Error> {
    // Number of incident faces, and the direction of the first one.
    let mut incidence: HashMap<EH, (usize, bool)> = HashMap::new();
    for f in mesh.faces() {
        let fverts = &mesh.faces[f.index() as usize];
        if fverts.len() < 3 {
            return Err(Error::InvalidFace(f));
        }
        for (i, v) in fverts.iter().enumerate() {
            if !mesh.is_valid_vertex(*v) {
                return Err(Error::InvalidVertex(*v));
            }
            if fverts[(i + 1)..].contains(v) {
                return Err(Error::DuplicateFaceVertex(*v, f));
            }
            if !mesh.vert_faces[v.index() as usize].contains(&f) {
                return Err(Error::InvalidFace(f));
            }
        }
        for (a, b) in fverts.iter().zip(fverts.iter().cycle().skip(1)) {
            let e = match mesh.find_edge(*a, *b) {
                Some(e) if mesh.is_valid_edge(e) => e,
                _ => return Err(Error::MissingFaceEdge(f)),
            };
            let forward = mesh.edges[e.index() as usize][0] == *a;
            let entry = incidence.entry(e).or_insert((0, forward));
            entry.0 += 1;
            if entry.0 > 2 {
                return Err(Error::ComplexEdge(e));
            }
            if entry.0 == 2 && entry.1 == forward {
                return Err(Error::InconsistentOrientation(e));
            }
        }
    }
    Ok(())
}

impl QuadMesh {
    /// Check the topology of the mesh.
    ///
    /// Every face must reference live vertices without repeating any of
    /// them, every face edge must exist, and an edge can be shared by at most
    /// two faces that traverse it in opposite directions.
    pub fn check_topology(&self) -> Result<(), Error> {
        check_edges(self)?;
        check_faces(self)?;
        Ok(())
    }

    /// Faces incident on the edge, if the edge is valid.
    pub fn edge_face_count(&self, e: EH) -> Result<usize, Error> {
        let [a, b] = self.edge_vertices(e)?;
        Ok(self.edge_faces(a, b).count())
    }

    /// Whether the face uses the given edge.
    pub fn face_has_edge(&self, f: FH, e: EH) -> Result<bool, Error> {
        let [a, b] = self.edge_vertices(e)?;
        Ok(self.edge_faces(a, b).any(|g| g == f))
    }
}
