use glam::DVec3;
use log::{debug, warn};

use crate::{
    boundary::{self, BoundarySide},
    element::{EH, FH, Handle, NH, VH},
    error::Error,
    mesh::MeshBuilder,
    pattern::{PatternSignature, classify},
};

/// A node of the patch tree. Leaves carry a pattern signature and, once
/// instantiated, the geometry of their template. Inner nodes own the
/// dividing line that splits them into two children.
#[derive(Debug, Clone)]
pub struct PatchNode {
    pub(crate) sides: Vec<BoundarySide>,
    pub(crate) side_lengths: Vec<usize>,
    pub(crate) signature: Option<PatternSignature>,
    pub(crate) left: Option<NH>,
    pub(crate) right: Option<NH>,
    pub(crate) divide_line: Vec<VH>,
    pub(crate) owned_vertices: Vec<VH>,
    pub(crate) owned_edges: Vec<EH>,
    pub(crate) owned_faces: Vec<FH>,
    pub(crate) depth: usize,
}

impl PatchNode {
    fn new(sides: Vec<BoundarySide>, depth: usize) -> Self {
        let side_lengths = sides.iter().map(|s| s.len()).collect();
        PatchNode {
            sides,
            side_lengths,
            signature: None,
            left: None,
            right: None,
            divide_line: Vec::new(),
            owned_vertices: Vec::new(),
            owned_edges: Vec::new(),
            owned_faces: Vec::new(),
            depth,
        }
    }

    pub fn sides(&self) -> &[BoundarySide] {
        &self.sides
    }

    pub fn side_lengths(&self) -> &[usize] {
        &self.side_lengths
    }

    pub fn num_sides(&self) -> usize {
        self.sides.len()
    }

    pub fn signature(&self) -> Option<PatternSignature> {
        self.signature
    }

    /// The residual child, that keeps being reduced.
    pub fn left(&self) -> Option<NH> {
        self.left
    }

    /// The regular rectangle cut off by the dividing line.
    pub fn right(&self) -> Option<NH> {
        self.right
    }

    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }

    pub fn divide_line(&self) -> &[VH] {
        &self.divide_line
    }

    pub fn owned_vertices(&self) -> &[VH] {
        &self.owned_vertices
    }

    pub fn owned_faces(&self) -> &[FH] {
        &self.owned_faces
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// First vertex of every side.
    pub fn corners(&self) -> Vec<VH> {
        self.sides.iter().filter_map(|s| s.first()).collect()
    }
}

/// Result of scanning a node for the best dividing line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Reduction {
    pub side: usize,
    pub depth: usize,
}

/// For every side `i`, the dividing line parallel to it can be placed
/// `min(L[i - 1], L[i + 1]) - 1` segments deep. Returns the first side with
/// the deepest line.
pub(crate) fn best_reduction(lengths: &[usize]) -> Reduction {
    let k = lengths.len();
    (0..k)
        .map(|i| Reduction {
            side: i,
            depth: lengths[(i + k - 1) % k]
                .min(lengths[(i + 1) % k])
                .saturating_sub(1),
        })
        .fold(Reduction { side: 0, depth: 0 }, |best, r| {
            if r.depth > best.depth { r } else { best }
        })
}

/// Binary tree of patches that fill a closed boundary with quads.
///
/// The root covers the whole boundary. Reducing a node cuts a regular
/// rectangle (right child) off one of its sides, leaving a smaller patch
/// (left child) with the same number of sides. Reduction stops when the
/// patch matches a family of the template library.
///
/// ```text
///     +---------------------------+
///     |                           |
///     |       left child          |
///     |                           |
///     +===========================+  <- dividing line
///     |                           |
///     |   right child (regular)   |
///     |                           |
///     +---------------------------+
/// ```
#[derive(Debug, Clone)]
pub struct PatchTree {
    pub(crate) nodes: Vec<PatchNode>,
    pub(crate) boundary: Vec<BoundarySide>,
    pub(crate) placeholder: Option<VH>,
    pub(crate) reference_normal: DVec3,
    pub(crate) centroid: DVec3,
    pub(crate) mean_segment: f64,
}

impl PatchTree {
    /// Validate the boundary and decompose it into patches that all match a
    /// pattern of the template library. The only geometry created here are
    /// the dividing lines, and the placeholder vertex when the number of
    /// boundary segments is odd. On failure, all of it is removed again.
    pub fn build<M: MeshBuilder>(mesh: &mut M, sides: Vec<BoundarySide>) -> Result<Self, Error> {
        boundary::validate(mesh, &sides)?;
        let (centroid, reference_normal, mean_segment) = boundary::loop_frame(mesh, &sides)?;
        let mut tree = PatchTree {
            nodes: Vec::new(),
            boundary: sides.clone(),
            placeholder: None,
            reference_normal,
            centroid,
            mean_segment,
        };
        let mut root = sides;
        let perimeter: usize = root.iter().map(|s| s.len()).sum();
        if perimeter % 2 == 1 {
            // Split the first segment to make the perimeter even.
            let (a, b) = match root[0].vertices() {
                [a, b, ..] => (*a, *b),
                _ => return Err(Error::EmptySide(0)),
            };
            let mid = (mesh.position(a)? + mesh.position(b)?) * 0.5;
            let v = mesh.new_vertex(mid);
            root[0].insert(1, v);
            tree.placeholder = Some(v);
        }
        debug!(
            "Building patch tree for {} sides with {} segments",
            root.len(),
            perimeter + tree.placeholder.map_or(0, |_| 1)
        );
        tree.nodes.push(PatchNode::new(root, 0));
        if let Err(e) = tree.reduce(mesh) {
            if let Err(release_err) = tree.release(mesh) {
                warn!("Failed to clean up after a failed build: {release_err}");
            }
            return Err(e);
        }
        Ok(tree)
    }

    /// Reduce the root until the residual patch matches a pattern.
    fn reduce<M: MeshBuilder>(&mut self, mesh: &mut M) -> Result<(), Error> {
        let mut current = self.root();
        loop {
            let node = &self.nodes[current.index() as usize];
            if (3..=6).contains(&node.num_sides()) {
                if let Ok(signature) = classify(&node.side_lengths) {
                    self.nodes[current.index() as usize].signature = Some(signature);
                    return Ok(());
                }
            }
            let reduction = best_reduction(&node.side_lengths);
            if reduction.depth == 0 {
                // Terminal, and nothing matched.
                let signature = classify(&node.side_lengths)?;
                self.nodes[current.index() as usize].signature = Some(signature);
                return Ok(());
            }
            current = self.split(mesh, current, reduction)?;
        }
    }

    /// Cut a regular rectangle off the node. Returns the residual child.
    fn split<M: MeshBuilder>(
        &mut self,
        mesh: &mut M,
        nh: NH,
        reduction: Reduction,
    ) -> Result<NH, Error> {
        let node = &self.nodes[nh.index() as usize];
        let k = node.num_sides();
        let Reduction { side: m, depth: d } = reduction;
        let (ip, inext) = ((m + k - 1) % k, (m + 1) % k);
        let prev = &node.sides[ip];
        let next = &node.sides[inext];
        let len = node.side_lengths[m];
        let start = prev.vertices()[prev.len() - d];
        let end = next.vertices()[d];
        // Dividing line, parallel to side m.
        let (p0, p1) = (mesh.position(start)?, mesh.position(end)?);
        let mut line = Vec::with_capacity(len + 1);
        line.push(start);
        let mut owned_vertices = Vec::with_capacity(len.saturating_sub(1));
        for i in 1..len {
            let v = mesh.new_vertex(p0.lerp(p1, i as f64 / len as f64));
            owned_vertices.push(v);
            line.push(v);
        }
        line.push(end);
        let mut owned_edges = Vec::with_capacity(len);
        for pair in line.windows(2) {
            owned_edges.push(mesh.new_edge(pair[0], pair[1])?);
        }
        let divider = BoundarySide::new(line.clone());
        let right_sides = vec![
            prev.segments(prev.len() - d, prev.len()),
            node.sides[m].clone(),
            next.segments(0, d),
            divider.reversed(),
        ];
        let mut left_sides = node.sides.clone();
        left_sides[ip] = prev.segments(0, prev.len() - d);
        left_sides[m] = divider;
        left_sides[inext] = next.segments(d, next.len());
        let depth = node.depth + 1;
        debug!(
            "Split {nh} along side {m} at depth {d}: {:?}",
            node.side_lengths
        );
        let mut right = PatchNode::new(right_sides, depth);
        right.signature = Some(PatternSignature::rectangle(d - 1, len - 1));
        let left = PatchNode::new(left_sides, depth);
        let rh: NH = self.nodes.len().into();
        let lh: NH = (self.nodes.len() + 1).into();
        self.nodes.push(right);
        self.nodes.push(left);
        let node = &mut self.nodes[nh.index() as usize];
        node.divide_line = line;
        node.owned_vertices = owned_vertices;
        node.owned_edges = owned_edges;
        node.right = Some(rh);
        node.left = Some(lh);
        Ok(lh)
    }

    /// Delete all geometry created by the tree: template faces and interior
    /// vertices, dividing lines and the placeholder vertex. The input
    /// boundary is left untouched.
    pub fn release<M: MeshBuilder>(mut self, mesh: &mut M) -> Result<(), Error> {
        let mut nfaces = 0usize;
        for node in self.nodes.iter_mut() {
            let faces: Vec<FH> = node
                .owned_faces
                .drain(..)
                .filter(|f| mesh.is_valid_face(*f))
                .collect();
            nfaces += faces.len();
            mesh.delete_faces(&faces)?;
        }
        for node in self.nodes.iter_mut() {
            let edges: Vec<EH> = node
                .owned_edges
                .drain(..)
                .filter(|e| mesh.is_valid_edge(*e))
                .collect();
            mesh.delete_edges(&edges)?;
            let verts: Vec<VH> = node
                .owned_vertices
                .drain(..)
                .filter(|v| mesh.is_valid_vertex(*v))
                .collect();
            mesh.delete_vertices(&verts)?;
        }
        if let Some(v) = self.placeholder.take() {
            if mesh.is_valid_vertex(v) {
                mesh.delete_vertices(&[v])?;
            }
        }
        debug!("Released {} nodes and {nfaces} faces", self.nodes.len());
        Ok(())
    }

    pub fn root(&self) -> NH {
        0u32.into()
    }

    pub fn node(&self, nh: NH) -> Option<&PatchNode> {
        self.nodes.get(nh.index() as usize)
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NH, &PatchNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NH::from(i), n))
    }

    pub fn leaves(&self) -> impl Iterator<Item = NH> + '_ {
        self.nodes().filter(|(_, n)| n.is_leaf()).map(|(nh, _)| nh)
    }

    /// Depth of the deepest node, i.e. the number of times the root was
    /// split.
    pub fn depth(&self) -> usize {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }

    /// Normal of the input boundary loop. The loop is counter-clockwise
    /// around it.
    pub fn reference_normal(&self) -> DVec3 {
        self.reference_normal
    }

    /// The input boundary, as it was passed in.
    pub fn boundary(&self) -> &[BoundarySide] {
        &self.boundary
    }

    /// All faces owned by the leaves.
    pub fn faces(&self) -> Vec<FH> {
        self.nodes
            .iter()
            .flat_map(|n| n.owned_faces.iter().copied())
            .collect()
    }

    /// The vertex inserted to make the perimeter even, until it is merged
    /// away during instantiation.
    pub fn placeholder(&self) -> Option<VH> {
        self.placeholder
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::{PatchTree, Reduction, best_reduction};
    use crate::{
        boundary::BoundarySide,
        element::VH,
        error::Error,
        mesh::{MeshBuilder, QuadMesh},
        pattern::{PatternSignature, classify},
    };
    use glam::{DVec3, dvec3};

    /// Lay out a boundary with the given side lengths as a convex polygon in
    /// the XY plane, counter-clockwise around +Z.
    pub(crate) fn polygon(mesh: &mut QuadMesh, lengths: &[usize]) -> Vec<BoundarySide> {
        let total: usize = lengths.iter().sum();
        let k = lengths.len();
        // Corners on a circle, spaced by their side lengths, segments on the
        // chords between them.
        let mut corners = Vec::with_capacity(k);
        let mut acc = 0usize;
        for l in lengths {
            let angle = std::f64::consts::TAU * acc as f64 / total as f64;
            corners.push(dvec3(angle.cos(), angle.sin(), 0.0) * total as f64 * 0.25);
            acc += l;
        }
        let first = mesh.new_vertex(corners[0]);
        let mut prev = first;
        let mut sides = Vec::with_capacity(k);
        for (i, l) in lengths.iter().enumerate() {
            let (a, b) = (corners[i], corners[(i + 1) % k]);
            let mut verts: Vec<VH> = vec![prev];
            for j in 1..*l {
                verts.push(mesh.new_vertex(a.lerp(b, j as f64 / *l as f64)));
            }
            let last = if i + 1 == k { first } else { mesh.new_vertex(b) };
            verts.push(last);
            prev = last;
            sides.push(BoundarySide::new(verts));
        }
        sides
    }

    fn lengths_of(sides: &[BoundarySide]) -> Vec<usize> {
        sides.iter().map(|s| s.len()).collect()
    }

    #[test]
    fn t_best_reduction() {
        assert_eq!(best_reduction(&[2, 1, 1]), Reduction { side: 0, depth: 0 });
        assert_eq!(best_reduction(&[3, 4, 3, 1]), Reduction { side: 1, depth: 2 });
        assert_eq!(best_reduction(&[5, 2, 5, 2]), Reduction { side: 1, depth: 4 });
        assert_eq!(
            best_reduction(&[1, 3, 1, 3, 1, 1, 1]),
            Reduction { side: 2, depth: 2 }
        );
    }

    /// Every terminal shape with 3 to 6 sides must match a family.
    #[test]
    fn t_terminal_shapes_classify() {
        for k in 3..=6usize {
            let mut lengths = vec![1usize; k];
            'outer: loop {
                let perimeter: usize = lengths.iter().sum();
                if perimeter % 2 == 0 && best_reduction(&lengths).depth == 0 {
                    classify(&lengths)
                        .unwrap_or_else(|e| panic!("{lengths:?} is not classified: {e}"));
                }
                for l in lengths.iter_mut() {
                    if *l < 9 {
                        *l += 1;
                        continue 'outer;
                    }
                    *l = 1;
                }
                break;
            }
        }
    }

    #[test]
    fn t_reject_bad_boundary() {
        let mut mesh = QuadMesh::new();
        let sides = polygon(&mut mesh, &[2, 2]);
        assert!(matches!(
            PatchTree::build(&mut mesh, sides),
            Err(Error::TooFewSides(2))
        ));
        let mut sides = polygon(&mut mesh, &[2, 1, 1]);
        sides[1] = BoundarySide::new(vec![sides[0].last().expect("Side must not be empty")]);
        assert!(matches!(
            PatchTree::build(&mut mesh, sides),
            Err(Error::EmptySide(1))
        ));
    }

    #[test]
    fn t_terminal_root() {
        let mut mesh = QuadMesh::new();
        let sides = polygon(&mut mesh, &[2, 2, 2, 2]);
        let nverts = mesh.num_vertices();
        let tree = PatchTree::build(&mut mesh, sides).expect("Cannot build tree");
        assert_eq!(tree.num_nodes(), 1);
        assert_eq!(tree.depth(), 0);
        let root = tree.node(tree.root()).expect("Root must exist");
        assert!(root.is_leaf());
        assert_eq!(root.signature(), Some(PatternSignature::rectangle(1, 1)));
        assert_eq!(mesh.num_vertices(), nverts);
        let normal = tree.reference_normal();
        assert!((normal - DVec3::Z).length() < 1e-12);
    }

    #[test]
    fn t_reduce_once() {
        let mut mesh = QuadMesh::new();
        let sides = polygon(&mut mesh, &[4, 3, 2, 1]);
        let nverts = mesh.num_vertices();
        let tree = PatchTree::build(&mut mesh, sides).expect("Cannot build tree");
        assert_eq!(tree.num_nodes(), 3);
        assert_eq!(tree.depth(), 1);
        let root = tree.node(tree.root()).expect("Root must exist");
        assert!(!root.is_leaf());
        assert!(root.signature().is_none());
        // Dividing line parallel to the side of length 3.
        let line = root.divide_line();
        assert_eq!(line.len(), 4);
        assert_eq!(line[0], root.sides()[0].vertices()[3]);
        assert_eq!(line[3], root.sides()[2].vertices()[1]);
        assert_eq!(root.owned_vertices(), &line[1..3]);
        assert_eq!(mesh.num_vertices(), nverts + 2);
        assert_eq!(mesh.num_edges(), 3);
        let right = tree
            .node(root.right().expect("Root must be split"))
            .expect("Child must exist");
        assert_eq!(lengths_of(right.sides()), vec![1, 3, 1, 3]);
        assert_eq!(right.signature(), Some(PatternSignature::rectangle(0, 2)));
        let left = tree
            .node(root.left().expect("Root must be split"))
            .expect("Child must exist");
        assert_eq!(lengths_of(left.sides()), vec![3, 3, 1, 1]);
        assert_eq!(left.signature().map(|s| s.pattern_id), Some(1));
        assert_eq!(tree.leaves().count(), 2);
    }

    #[test]
    fn t_reduce_repeatedly() {
        let mut mesh = QuadMesh::new();
        let sides = polygon(&mut mesh, &[5, 3, 2, 4, 2, 2]);
        let tree = PatchTree::build(&mut mesh, sides).expect("Cannot build tree");
        assert_eq!(tree.depth(), 4);
        for (_, node) in tree.nodes() {
            assert_eq!(node.is_leaf(), node.signature().is_some());
            // Sides are connected.
            let k = node.num_sides();
            for i in 0..k {
                assert_eq!(node.sides()[i].first(), node.sides()[(i + k - 1) % k].last());
            }
            if let Some(rh) = node.right() {
                // The right children are regular rectangles.
                let right = tree.node(rh).expect("Child must exist");
                let l = lengths_of(right.sides());
                assert_eq!(l[0], l[2]);
                assert_eq!(l[1], l[3]);
                assert_eq!(
                    right.signature(),
                    Some(PatternSignature::rectangle(l[0] - 1, l[1] - 1))
                );
                // The residual keeps the number of sides.
                let left = tree
                    .node(node.left().expect("Must be split"))
                    .expect("Child must exist");
                assert_eq!(left.num_sides(), k);
                assert_eq!(left.depth(), node.depth() + 1);
            }
        }
    }

    #[test]
    fn t_idempotent_build() {
        let lengths = [5, 3, 2, 4, 2, 2];
        let shape = |lengths: &[usize]| {
            let mut mesh = QuadMesh::new();
            let sides = polygon(&mut mesh, lengths);
            let tree = PatchTree::build(&mut mesh, sides).expect("Cannot build tree");
            tree.nodes()
                .map(|(_, n)| (n.signature(), n.left(), n.right(), n.side_lengths().to_vec()))
                .collect::<Vec<_>>()
        };
        assert_eq!(shape(&lengths), shape(&lengths));
    }

    #[test]
    fn t_odd_perimeter_placeholder() {
        let mut mesh = QuadMesh::new();
        let sides = polygon(&mut mesh, &[2, 2, 2, 1]);
        let nverts = mesh.num_vertices();
        let tree = PatchTree::build(&mut mesh, sides).expect("Cannot build tree");
        let ph = tree.placeholder().expect("Perimeter is odd");
        assert_eq!(tree.node(tree.root()).expect("Root").side_lengths()[0], 3);
        assert_eq!(tree.boundary()[0].len(), 2);
        assert!(mesh.is_valid_vertex(ph));
        assert!(mesh.num_vertices() > nverts);
    }

    #[test]
    fn t_failed_build_cleans_up() {
        // Seven sides reduce to a seven sided leaf, which has no pattern.
        let mut mesh = QuadMesh::new();
        let sides = polygon(&mut mesh, &[3, 2, 3, 1, 1, 1, 1]);
        let (nverts, nedges) = (mesh.num_vertices(), mesh.num_edges());
        assert!(matches!(
            PatchTree::build(&mut mesh, sides),
            Err(Error::Unclassified { sides: 7, .. })
        ));
        assert_eq!(mesh.num_vertices(), nverts);
        assert_eq!(mesh.num_edges(), nedges);
    }
}
