use glam::DVec3;
use log::{debug, trace, warn};

use crate::{
    boundary::boundary_loop,
    config::Config,
    element::{FH, Handle, NH, VH},
    error::Error,
    math::{centroid, line_plane_intersection, newell_normal},
    mesh::MeshBuilder,
    surface::SurfaceSnapOracle,
    tree::PatchTree,
};

/// Number of times the smooth, repair and snap sequence is applied.
const PASSES: usize = 2;
/// Faces whose normal is less aligned with the reference normal than this
/// are flipped.
const NORMAL_THRESHOLD: f64 = 0.1;
/// Search distance of snapping rays, relative to the size of the surface.
const SNAP_TOLERANCE: f64 = 0.5;
/// Snapped vertices closer than this to the surface stay where they are.
const MIN_SNAP_DISPLACEMENT: f64 = 1e-6;
/// Points closer than this to the tube axis, relative to the mean boundary
/// segment, snap along the reference normal.
const AXIS_TOLERANCE: f64 = 1e-9;

impl PatchTree {
    /// Relax and repair the generated quads and pull them onto the reference
    /// surface. Each pass smooths the owned vertices, flips faces that point
    /// away from the reference normal, then snaps vertices to the surface.
    pub fn post_process<M, S>(
        &self,
        mesh: &mut M,
        surface: &S,
        config: &Config,
    ) -> Result<(), Error>
    where
        M: MeshBuilder,
        S: SurfaceSnapOracle + ?Sized,
    {
        let smooth_set = self.smoothing_vertices(mesh, config);
        let snap_set = self.snapping_vertices(mesh, config)?;
        for pass in 0..PASSES {
            debug!(
                "Post-processing pass {pass}: smoothing {} vertices, snapping {}",
                smooth_set.len(),
                snap_set.len()
            );
            if config.smoothing_iterations > 0 && !smooth_set.is_empty() {
                mesh.smooth(
                    &smooth_set,
                    config.smoothing_iterations,
                    config.smoothing_factor,
                )?;
            }
            self.repair_normals(mesh)?;
            self.snap(mesh, surface, config, &snap_set)?;
        }
        Ok(())
    }

    /// Interior vertices of the leaves, and of the dividing lines if
    /// enabled.
    fn smoothing_vertices<M: MeshBuilder>(&self, mesh: &M, config: &Config) -> Vec<VH> {
        self.nodes
            .iter()
            .filter(|n| n.is_leaf() || config.smooth_preexisting_enabled)
            .flat_map(|n| n.owned_vertices.iter().copied())
            .filter(|v| mesh.is_valid_vertex(*v))
            .collect()
    }

    /// Vertices to snap, with the node whose corners give the fallback
    /// plane.
    fn snapping_vertices<M: MeshBuilder>(
        &self,
        mesh: &M,
        config: &Config,
    ) -> Result<Vec<(VH, NH)>, Error> {
        let mut out = Vec::new();
        if config.snap_enabled {
            for (nh, node) in self.nodes() {
                out.extend(
                    node.owned_vertices
                        .iter()
                        .filter(|v| mesh.is_valid_vertex(**v))
                        .map(|v| (*v, nh)),
                );
            }
        }
        if config.snap_boundary_enabled {
            let root = self.root();
            for v in boundary_loop(&self.boundary) {
                if !mesh.is_valid_vertex(v) {
                    return Err(Error::InvalidVertex(v));
                }
                out.push((v, root));
            }
        }
        Ok(out)
    }

    /// Flip the leaf faces that point away from the reference normal.
    /// Returns the number of flipped faces.
    pub(crate) fn repair_normals<M: MeshBuilder>(&self, mesh: &mut M) -> Result<usize, Error> {
        let faces: Vec<FH> = self
            .faces()
            .into_iter()
            .filter(|f| mesh.is_valid_face(*f))
            .collect();
        let mut flipped = 0usize;
        for f in faces {
            let n = mesh.face_normal(f)?;
            if n == DVec3::ZERO {
                continue;
            }
            if n.dot(self.reference_normal) < NORMAL_THRESHOLD {
                mesh.flip_face_normal(f)?;
                flipped += 1;
            }
        }
        if flipped > 0 {
            warn!("Flipped {flipped} faces to match the reference normal");
        }
        Ok(flipped)
    }

    /// Direction along which the vertex at `pos` is snapped.
    pub(crate) fn snap_direction(&self, pos: DVec3, config: &Config) -> DVec3 {
        if !config.tube_mode {
            return self.reference_normal;
        }
        let d = pos - self.centroid;
        let radial = d - self.reference_normal * d.dot(self.reference_normal);
        // On the axis the radial direction is just noise.
        if radial.length() <= AXIS_TOLERANCE * self.mean_segment {
            self.reference_normal
        } else {
            radial.normalize()
        }
    }

    /// Plane through the corners of the node.
    fn corner_plane<M: MeshBuilder>(&self, mesh: &M, nh: NH) -> Result<(DVec3, DVec3), Error> {
        let corners = self.nodes[nh.index() as usize]
            .corners()
            .into_iter()
            .map(|v| mesh.position(v))
            .collect::<Result<Vec<_>, Error>>()?;
        Ok((
            centroid(corners.iter().copied()),
            newell_normal(corners.iter().copied()),
        ))
    }

    fn snap<M, S>(
        &self,
        mesh: &mut M,
        surface: &S,
        config: &Config,
        verts: &[(VH, NH)],
    ) -> Result<(), Error>
    where
        M: MeshBuilder,
        S: SurfaceSnapOracle + ?Sized,
    {
        let (mut nsnapped, mut nmissed) = (0usize, 0usize);
        for (v, nh) in verts {
            let pos = mesh.position(*v)?;
            let dir = self.snap_direction(pos, config);
            let target = match surface.query(pos, dir, SNAP_TOLERANCE, true) {
                Some(hit) => {
                    nsnapped += 1;
                    Some(hit)
                }
                None => {
                    // Keep the vertex on the plane of its patch.
                    nmissed += 1;
                    let (point, normal) = self.corner_plane(mesh, *nh)?;
                    line_plane_intersection(pos, dir, point, normal)
                }
            };
            if let Some(target) = target {
                if target.distance(pos) > MIN_SNAP_DISPLACEMENT {
                    mesh.set_position(*v, target)?;
                    trace!("Snapped {v} from {pos} to {target}");
                }
            }
        }
        debug!("Snapped {nsnapped} vertices, {nmissed} missed the surface");
        Ok(())
    }
}
