/*!
Fill closed boundary loops with quadrilaterals.

Given a closed loop of 3 or more sides, each already subdivided into a known
number of segments, this crate fills the interior with quads that match the
boundary exactly, and keeps the result attached to a reference surface.

# Overview

+ The boundary is decomposed into a binary [`PatchTree`]. Each split cuts a
  regular rectangle off the patch along a dividing line, until the remaining
  patch has 3 to 6 sides and side lengths that match one of a small, closed
  set of pattern families. See [`classify`].

+ Every leaf of the tree is filled by a [`Template`]: a fixed quad layout
  with edge loops inserted to realize the integer parameters of the pattern.
  Templates are placed in the plane of their patch and welded onto the
  boundary and dividing line vertices, so neighbouring leaves join into one
  watertight mesh.

+ A post-processing step relaxes the new vertices, repairs face orientation
  and snaps the result onto the reference surface through a
  [`SurfaceSnapOracle`].

The kernel does not own the mesh. It edits it through the [`MeshBuilder`]
trait. [`QuadMesh`] is a simple implementation of it, and
[`TriangleSurface`] is a simple snap oracle that can be loaded from OBJ
files with the `obj` feature.

```
use quadfill::{BoundarySide, Config, MeshBuilder, QuadMesh, TriangleSurface};
use glam::dvec3;

let mut mesh = QuadMesh::new();
// A 2 x 1 rectangle, with 2 segments on the long sides.
let v: Vec<_> = [
    (0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (2.0, 1.0), (1.0, 1.0), (0.0, 1.0),
]
.iter()
.map(|(x, y)| mesh.new_vertex(dvec3(*x, *y, 0.0)))
.collect();
let boundary = vec![
    BoundarySide::new(vec![v[0], v[1], v[2]]),
    BoundarySide::new(vec![v[2], v[3]]),
    BoundarySide::new(vec![v[3], v[4], v[5]]),
    BoundarySide::new(vec![v[5], v[0]]),
];
let surface = TriangleSurface::new(
    vec![dvec3(-5.0, -5.0, 0.0), dvec3(5.0, -5.0, 0.0), dvec3(0.0, 5.0, 0.0)],
    vec![[0, 1, 2]],
)
.unwrap();
let tree = quadfill::build_and_instantiate(&mut mesh, &surface, boundary, &Config::default())
    .unwrap();
assert_eq!(mesh.num_faces(), 2);
// Tear it down to regenerate after the boundary changes.
quadfill::release(&mut mesh, tree).unwrap();
assert_eq!(mesh.num_faces(), 0);
```
*/

mod boundary;
mod check;
mod config;
mod element;
mod error;
mod instantiate;
mod macros;
mod math;
mod mesh;
mod pattern;
mod postprocess;
mod status;
mod surface;
mod template;
mod tree;

#[cfg(feature = "obj")]
mod obj;

use log::warn;

pub use boundary::{BoundarySide, boundary_loop, validate};
pub use config::Config;
pub use element::{EH, FH, Handle, NH, VH};
pub use error::Error;
pub use mesh::{MeshBuilder, QuadMesh};
pub use pattern::{PatternSignature, canonical_rotation, classify, rotate_lengths};
pub use status::Status;
pub use surface::{SurfaceSnapOracle, TriangleSurface};
pub use template::Template;
pub use tree::{PatchNode, PatchTree};

/// Build the patch tree for the boundary, fill it with quads and
/// post-process the result. If anything fails, the geometry created so far
/// is removed from the mesh before the error is returned.
pub fn build_and_instantiate<M, S>(
    mesh: &mut M,
    surface: &S,
    boundary: Vec<BoundarySide>,
    config: &Config,
) -> Result<PatchTree, Error>
where
    M: MeshBuilder,
    S: SurfaceSnapOracle + ?Sized,
{
    let mut tree = PatchTree::build(mesh, boundary)?;
    let result = match tree.instantiate(mesh, config) {
        Ok(()) => tree.post_process(mesh, surface, config),
        Err(e) => Err(e),
    };
    match result {
        Ok(()) => Ok(tree),
        Err(e) => {
            if let Err(release_err) = tree.release(mesh) {
                warn!("Failed to clean up after a failed instantiation: {release_err}");
            }
            Err(e)
        }
    }
}

/// Remove all geometry created for the tree. The input boundary stays.
pub fn release<M: MeshBuilder>(mesh: &mut M, tree: PatchTree) -> Result<(), Error> {
    tree.release(mesh)
}

#[cfg(test)]
mod test {
    use crate::{
        Config, Error, MeshBuilder, QuadMesh, build_and_instantiate, release,
        surface::test::two_planes, tree::test::polygon,
    };

    #[test]
    fn t_regenerate() {
        let mut mesh = QuadMesh::new();
        let surface = two_planes();
        let sides = polygon(&mut mesh, &[4, 3, 2, 1]);
        let config = Config::default();
        let first = build_and_instantiate(&mut mesh, &surface, sides.clone(), &config)
            .expect("Cannot fill patch");
        let nfaces = mesh.num_faces();
        let signatures: Vec<_> = first.nodes().map(|(_, n)| n.signature()).collect();
        release(&mut mesh, first).expect("Cannot release tree");
        assert_eq!(mesh.num_faces(), 0);
        let second = build_and_instantiate(&mut mesh, &surface, sides, &config)
            .expect("Cannot fill patch");
        assert_eq!(mesh.num_faces(), nfaces);
        assert_eq!(
            second.nodes().map(|(_, n)| n.signature()).collect::<Vec<_>>(),
            signatures
        );
        mesh.check_topology().expect("Topological errors found");
        // Everything ends up on the bottom plane.
        for v in mesh.vertices() {
            assert!(mesh.position(v).expect("Vertex must exist").z.abs() < 1e-9);
        }
    }

    #[test]
    fn t_failure_leaves_mesh_untouched() {
        let mut mesh = QuadMesh::new();
        let sides = polygon(&mut mesh, &[3, 2, 3, 1, 1, 1, 1]);
        let (nverts, nedges) = (mesh.num_vertices(), mesh.num_edges());
        let result = build_and_instantiate(&mut mesh, &two_planes(), sides, &Config::default());
        assert!(matches!(result, Err(Error::Unclassified { .. })));
        assert_eq!(mesh.num_vertices(), nverts);
        assert_eq!(mesh.num_edges(), nedges);
        assert_eq!(mesh.num_faces(), 0);
    }
}
