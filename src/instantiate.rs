use glam::{DVec2, DVec3};
use log::{debug, trace};

use crate::{
    boundary::{boundary_loop, loop_points},
    config::Config,
    element::{Handle, NH, VH},
    error::Error,
    math::{centroid, cmul, fit_rotation, mean_segment_length, newell_normal},
    mesh::MeshBuilder,
    template::Template,
    tree::{PatchNode, PatchTree},
};

/// Find the rotation that maps template side `i` onto node side `(i +
/// rotation) % K`, sweeping over all offsets starting from `hint`.
pub(crate) fn align(template: &[usize], node: &[usize], hint: usize) -> Result<usize, Error> {
    let k = node.len();
    if template.len() != k || k == 0 {
        return Err(Error::AlignmentFailed { sides: k });
    }
    (0..k)
        .map(|step| (hint + step) % k)
        .find(|r| (0..k).all(|i| template[i] == node[(i + r) % k]))
        .ok_or(Error::AlignmentFailed { sides: k })
}

/// Maps template coordinates into the plane of a node.
struct Frame {
    origin: DVec3,
    u: DVec3,
    v: DVec3,
    center: DVec2,
    rotation: DVec2,
    scale: f64,
}

impl Frame {
    fn to_world(&self, p: DVec2) -> DVec3 {
        let q = cmul(self.rotation, (p - self.center) * self.scale);
        self.origin + self.u * q.x + self.v * q.y
    }
}

impl PatchTree {
    /// Create the quads of every leaf and weld them to the patch boundaries.
    /// Leaves are filled in reverse creation order, i.e. the deepest residual
    /// first. Afterwards the placeholder vertex, if any, is merged away.
    pub fn instantiate<M: MeshBuilder>(
        &mut self,
        mesh: &mut M,
        config: &Config,
    ) -> Result<(), Error> {
        let leaves: Vec<NH> = self.leaves().collect();
        for nh in leaves.into_iter().rev() {
            if !self.nodes[nh.index() as usize].owned_faces.is_empty() {
                continue; // Already filled.
            }
            self.instantiate_leaf(mesh, nh, config)?;
        }
        self.remove_placeholder(mesh)?;
        debug!(
            "Instantiated {} leaves with {} faces",
            self.leaves().count(),
            self.faces().len()
        );
        Ok(())
    }

    fn instantiate_leaf<M: MeshBuilder>(
        &mut self,
        mesh: &mut M,
        nh: NH,
        config: &Config,
    ) -> Result<(), Error> {
        let node = &self.nodes[nh.index() as usize];
        let k = node.num_sides();
        let signature = node
            .signature
            .ok_or_else(|| Error::Unclassified {
                sides: k,
                lengths: node.side_lengths.clone(),
            })?;
        let template = Template::with_params(
            k,
            signature.pattern_id,
            config.alternative_topology_index,
            signature.param_a,
            signature.param_b,
        )?;
        let tsides = template.sides()?;
        let tlengths: Vec<usize> = tsides.iter().map(|s| s.len() - 1).collect();
        let rotation = align(&tlengths, &node.side_lengths, signature.rotation)?;
        // Template boundary slot -> node boundary vertex, each boundary vertex
        // once.
        let mut pairs: Vec<(usize, VH)> = Vec::with_capacity(template.boundary().len());
        for (i, tside) in tsides.iter().enumerate() {
            let nside = node.sides[(i + rotation) % k].vertices();
            if nside.len() != tside.len() {
                return Err(Error::SideMismatch {
                    side: i,
                    expected: nside.len() - 1,
                    actual: tside.len() - 1,
                });
            }
            pairs.extend(
                tside
                    .iter()
                    .zip(nside.iter())
                    .take(tside.len() - 1)
                    .map(|(t, n)| (*t, *n)),
            );
        }
        let frame = self.node_frame(mesh, node, &template, &pairs, config)?;
        // Recorded as they are created, so a failure midway can be released.
        let mut verts = Vec::with_capacity(template.points().len());
        for p in template.points() {
            let v = mesh.new_vertex(frame.to_world(*p));
            self.nodes[nh.index() as usize].owned_vertices.push(v);
            verts.push(v);
        }
        for f in template.faces() {
            let fh = mesh.new_quad([verts[f[0]], verts[f[1]], verts[f[2]], verts[f[3]]])?;
            self.nodes[nh.index() as usize].owned_faces.push(fh);
        }
        for (t, v) in &pairs {
            let pos = mesh.position(*v)?;
            mesh.point_merge(&[*v, verts[*t]], pos)?;
            trace!("Welded template vertex {} into {v}", verts[*t]);
        }
        let welded: Vec<VH> = template.boundary().iter().map(|b| verts[*b]).collect();
        let node = &mut self.nodes[nh.index() as usize];
        node.owned_vertices.retain(|v| !welded.contains(v));
        debug!(
            "Filled {nh} with pattern {} of {k} sides, rotation {rotation}: {} vertices, {} faces",
            signature.pattern_id,
            node.owned_vertices.len(),
            node.owned_faces.len()
        );
        Ok(())
    }

    /// Frame that places the template over the node: centered on the node,
    /// in the plane of its boundary, scaled by the mean segment length and
    /// rotated to best fit the boundary slots onto the boundary vertices.
    fn node_frame<M: MeshBuilder>(
        &self,
        mesh: &M,
        node: &PatchNode,
        template: &Template,
        pairs: &[(usize, VH)],
        config: &Config,
    ) -> Result<Frame, Error> {
        let points = loop_points(mesh, &boundary_loop(&node.sides))?;
        let origin = centroid(points.iter().copied());
        let normal = match newell_normal(points.iter().copied()) {
            n if n == DVec3::ZERO => self.reference_normal,
            n => n,
        };
        let (u, v) = normal.any_orthonormal_pair();
        let tpoints = template.points();
        let tloop: Vec<DVec3> = template
            .boundary()
            .iter()
            .map(|i| tpoints[*i].extend(0.0))
            .collect();
        let center = tloop.iter().fold(DVec2::ZERO, |acc, p| acc + p.truncate())
            / tloop.len().max(1) as f64;
        let tmean = mean_segment_length(&tloop);
        let scale = if tmean > 0.0 {
            config.output_scale * mean_segment_length(&points) / tmean
        } else {
            config.output_scale
        };
        let mut src = Vec::with_capacity(pairs.len());
        let mut dst = Vec::with_capacity(pairs.len());
        for (t, vh) in pairs {
            let d = mesh.position(*vh)? - origin;
            src.push((tpoints[*t] - center) * scale);
            dst.push(DVec2::new(d.dot(u), d.dot(v)));
        }
        Ok(Frame {
            origin,
            u,
            v,
            center,
            rotation: fit_rotation(&src, &dst),
            scale,
        })
    }

    /// Merge the placeholder into the first vertex of the boundary, and drop
    /// it from all sides and dividing lines.
    fn remove_placeholder<M: MeshBuilder>(&mut self, mesh: &mut M) -> Result<(), Error> {
        let Some(ph) = self.placeholder.take() else {
            return Ok(());
        };
        let target = match self
            .nodes
            .first()
            .and_then(|n| n.sides.first())
            .and_then(|s| s.first())
        {
            Some(v) => v,
            None => return Err(Error::EmptySide(0)),
        };
        let pos = mesh.position(target)?;
        mesh.point_merge(&[target, ph], pos)?;
        for node in self.nodes.iter_mut() {
            for side in node.sides.iter_mut() {
                side.replace_vertex(ph, target);
            }
            for v in node.divide_line.iter_mut() {
                if *v == ph {
                    *v = target;
                }
            }
            node.divide_line.dedup();
        }
        trace!("Merged placeholder {ph} into {target}");
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::align;
    use crate::{
        config::Config,
        error::Error,
        macros::assert_f64_eq,
        element::{EH, FH, VH},
        mesh::{MeshBuilder, QuadMesh},
        tree::{PatchTree, test::polygon},
    };
    use glam::DVec3;

    /// Build and fill a convex polygon with the given side lengths.
    fn fill(lengths: &[usize], config: &Config) -> (QuadMesh, PatchTree) {
        let mut mesh = QuadMesh::new();
        let sides = polygon(&mut mesh, lengths);
        let mut tree = PatchTree::build(&mut mesh, sides).expect("Cannot build tree");
        tree.instantiate(&mut mesh, config)
            .expect("Cannot instantiate tree");
        (mesh, tree)
    }

    /// The input boundary edges have one face, all other edges have two.
    /// The result is a topological disk.
    fn check_filled(mesh: &QuadMesh, tree: &PatchTree) {
        mesh.check_topology().expect("Topological errors found");
        let boundary = crate::boundary::boundary_loop(tree.boundary());
        let n = boundary.len();
        let is_boundary = |a, b| {
            (0..n).any(|i| {
                let (x, y) = (boundary[i], boundary[(i + 1) % n]);
                (x == a && y == b) || (x == b && y == a)
            })
        };
        for e in mesh.edges() {
            let [a, b] = mesh.edge_vertices(e).expect("Edge must exist");
            let count = mesh.edge_faces(a, b).count();
            if is_boundary(a, b) {
                assert_eq!(count, 1, "Boundary edge {a} - {b}");
            } else {
                assert_eq!(count, 2, "Interior edge {a} - {b}");
            }
        }
        for i in 0..n {
            assert!(mesh.find_edge(boundary[i], boundary[(i + 1) % n]).is_some());
        }
        let euler = mesh.num_vertices() as i64 - mesh.num_edges() as i64 + mesh.num_faces() as i64;
        assert_eq!(euler, 1);
    }

    #[test]
    fn t_align() {
        assert_eq!(align(&[3, 1, 1, 1], &[1, 3, 1, 1], 1).expect("Must align"), 1);
        assert_eq!(align(&[3, 1, 1, 1], &[1, 3, 1, 1], 0).expect("Must align"), 1);
        assert_eq!(align(&[2, 2, 2, 2], &[2, 2, 2, 2], 3).expect("Must align"), 3);
        assert!(matches!(
            align(&[3, 1, 1, 1], &[2, 2, 1, 1], 0),
            Err(Error::AlignmentFailed { sides: 4 })
        ));
    }

    #[test]
    fn t_unit_triangle() {
        let (mesh, tree) = fill(&[2, 1, 1], &Config::default());
        assert_eq!(tree.num_nodes(), 1);
        assert_eq!(mesh.num_vertices(), 4);
        assert_eq!(mesh.num_faces(), 1);
        check_filled(&mesh, &tree);
    }

    #[test]
    fn t_long_triangle() {
        let (mesh, tree) = fill(&[4, 1, 1], &Config::default());
        let root = tree.node(tree.root()).expect("Root must exist");
        assert_eq!(root.signature().map(|s| s.pattern_id), Some(10));
        assert_eq!(mesh.num_vertices(), 7);
        assert_eq!(mesh.num_faces(), 3);
        assert_eq!(root.owned_vertices().len(), 1);
        check_filled(&mesh, &tree);
    }

    #[test]
    fn t_grid() {
        let (mesh, tree) = fill(&[2, 2, 2, 2], &Config::default());
        assert_eq!(mesh.num_vertices(), 9);
        assert_eq!(mesh.num_faces(), 4);
        assert_eq!(tree.faces().len(), 4);
        // The center vertex sits in the middle of the diamond.
        let root = tree.node(tree.root()).expect("Root must exist");
        let center = mesh
            .position(root.owned_vertices()[0])
            .expect("Vertex must exist");
        assert!(center.length() < 1e-9);
        for f in mesh.faces() {
            assert!(mesh.face_normal(f).expect("Face must exist").z > 0.0);
        }
        check_filled(&mesh, &tree);
    }

    #[test]
    fn t_reduced_patches() {
        for lengths in [
            &[4, 3, 2, 1][..],
            &[5, 3, 2, 4, 2, 2],
            &[3, 2, 3, 1, 1],
            &[6, 2, 2, 2, 4],
            &[7, 1, 1, 3, 2, 2],
        ] {
            let (mesh, tree) = fill(lengths, &Config::default());
            for nh in tree.leaves() {
                let leaf = tree.node(nh).expect("Leaf must exist");
                assert!(!leaf.owned_faces().is_empty(), "{lengths:?}");
            }
            check_filled(&mesh, &tree);
        }
    }

    #[test]
    fn t_alternative_topologies() {
        let mut results = Vec::new();
        for index in 0..3 {
            let config = Config::default().with_alternative_topology_index(index);
            let (mesh, tree) = fill(&[1, 1, 1, 1, 1, 1], &config);
            assert_eq!(mesh.num_faces(), 2);
            check_filled(&mesh, &tree);
            let diagonal = mesh
                .edges()
                .filter_map(|e| mesh.edge_vertices(e).ok())
                .find(|[a, b]| mesh.edge_faces(*a, *b).count() == 2)
                .expect("The two quads must share an edge");
            results.push(diagonal);
        }
        assert_ne!(results[0], results[1]);
        assert_ne!(results[1], results[2]);
    }

    #[test]
    fn t_odd_perimeter() {
        let (mesh, tree) = fill(&[2, 2, 2, 1], &Config::default());
        assert!(tree.placeholder().is_none());
        check_filled(&mesh, &tree);
        // The quad next to the placeholder lost a corner.
        let triangles = mesh
            .faces()
            .filter(|f| mesh.face_vertices(*f).map_or(0, |v| v.len()) == 3)
            .count();
        assert_eq!(triangles, 1);
        let root = tree.node(tree.root()).expect("Root must exist");
        assert_eq!(root.sides()[0], tree.boundary()[0]);
    }

    #[test]
    fn t_output_scale() {
        let distance = |scale: f64| {
            let (mesh, tree) = fill(&[4, 1, 1], &Config::default().with_output_scale(scale));
            let root = tree.node(tree.root()).expect("Root must exist");
            let centroid = crate::math::centroid(
                crate::boundary::boundary_loop(tree.boundary())
                    .iter()
                    .map(|v| mesh.position(*v).expect("Vertex must exist")),
            );
            mesh.position(root.owned_vertices()[0])
                .expect("Vertex must exist")
                .distance(centroid)
        };
        assert_f64_eq!(distance(2.0), 2.0 * distance(1.0), 1e-9);
    }

    #[test]
    fn t_release_restores_mesh() {
        for lengths in [&[5, 3, 2, 4, 2, 2][..], &[2, 2, 2, 1]] {
            let mut mesh = QuadMesh::new();
            let sides = polygon(&mut mesh, lengths);
            let (nverts, nedges) = (mesh.num_vertices(), mesh.num_edges());
            let mut tree = PatchTree::build(&mut mesh, sides).expect("Cannot build tree");
            tree.instantiate(&mut mesh, &Config::default())
                .expect("Cannot instantiate tree");
            tree.release(&mut mesh).expect("Cannot release tree");
            assert_eq!(mesh.num_faces(), 0);
            assert_eq!(mesh.num_vertices(), nverts);
            assert_eq!(mesh.num_edges(), nedges);
        }
    }

    /// Mesh whose point merges start failing after a fixed number of them.
    struct FailingMerge {
        mesh: QuadMesh,
        merges: usize,
    }

    impl MeshBuilder for FailingMerge {
        fn new_vertex(&mut self, pos: DVec3) -> VH {
            self.mesh.new_vertex(pos)
        }

        fn new_edge(&mut self, a: VH, b: VH) -> Result<EH, Error> {
            self.mesh.new_edge(a, b)
        }

        fn new_quad(&mut self, verts: [VH; 4]) -> Result<FH, Error> {
            self.mesh.new_quad(verts)
        }

        fn delete_faces(&mut self, faces: &[FH]) -> Result<(), Error> {
            self.mesh.delete_faces(faces)
        }

        fn delete_edges(&mut self, edges: &[EH]) -> Result<(), Error> {
            self.mesh.delete_edges(edges)
        }

        fn delete_vertices(&mut self, verts: &[VH]) -> Result<(), Error> {
            self.mesh.delete_vertices(verts)
        }

        fn point_merge(&mut self, verts: &[VH], pos: DVec3) -> Result<VH, Error> {
            if self.merges == 0 {
                return Err(Error::TemplateAssembly("Merge refused"));
            }
            self.merges -= 1;
            self.mesh.point_merge(verts, pos)
        }

        fn smooth(&mut self, verts: &[VH], iterations: usize, factor: f64) -> Result<(), Error> {
            self.mesh.smooth(verts, iterations, factor)
        }

        fn is_valid_vertex(&self, v: VH) -> bool {
            self.mesh.is_valid_vertex(v)
        }

        fn is_valid_edge(&self, e: EH) -> bool {
            self.mesh.is_valid_edge(e)
        }

        fn is_valid_face(&self, f: FH) -> bool {
            self.mesh.is_valid_face(f)
        }

        fn position(&self, v: VH) -> Result<DVec3, Error> {
            self.mesh.position(v)
        }

        fn set_position(&mut self, v: VH, pos: DVec3) -> Result<(), Error> {
            self.mesh.set_position(v, pos)
        }

        fn face_normal(&self, f: FH) -> Result<DVec3, Error> {
            self.mesh.face_normal(f)
        }

        fn flip_face_normal(&mut self, f: FH) -> Result<(), Error> {
            self.mesh.flip_face_normal(f)
        }
    }

    #[test]
    fn t_release_after_failed_weld() {
        for (lengths, merges) in [(&[2, 2, 2, 2][..], 3), (&[5, 3, 2, 4, 2, 2], 10)] {
            let mut mesh = FailingMerge {
                mesh: QuadMesh::new(),
                merges,
            };
            let sides = polygon(&mut mesh.mesh, lengths);
            let (nverts, nedges) = (mesh.mesh.num_vertices(), mesh.mesh.num_edges());
            let mut tree = PatchTree::build(&mut mesh, sides).expect("Cannot build tree");
            assert!(matches!(
                tree.instantiate(&mut mesh, &Config::default()),
                Err(Error::TemplateAssembly(_))
            ));
            assert!(mesh.mesh.num_faces() > 0);
            tree.release(&mut mesh).expect("Cannot release tree");
            assert_eq!(mesh.mesh.num_faces(), 0);
            assert_eq!(mesh.mesh.num_vertices(), nverts);
            assert_eq!(mesh.mesh.num_edges(), nedges);
        }
    }
}
