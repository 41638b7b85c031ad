/*!
Quad layouts for the terminal patches.

Every layout is assembled from three literal primitives: the single quad,
the 3-to-1 transition and the corner. A family of layouts is described by a
recipe that names one or two parts, how they are glued together and which
of their corners remain corners of the result. The free parameters of a
family are realized by inserting edge loops along the rings of the layout.
*/

mod library;
mod primitive;
mod ring;

use glam::DVec2;

use crate::{
    error::Error,
    math::{cdiv, cmul},
};

pub(crate) use library::families;
use library::{Recipe, Source};

/// Which parameter of a pattern signature drives a ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Slot {
    A,
    B,
}

/// A quad layout in local 2d coordinates. Faces and the boundary loop are
/// counter-clockwise, corners are vertex indices in boundary order.
#[derive(Debug, Clone)]
pub(crate) struct LocalPatch {
    pub points: Vec<DVec2>,
    pub faces: Vec<[usize; 4]>,
    pub boundary: Vec<usize>,
    pub corners: Vec<usize>,
    pub rings: Vec<((usize, usize), Slot)>,
}

impl LocalPatch {
    fn boundary_position(&self, v: usize) -> Result<usize, Error> {
        self.boundary
            .iter()
            .position(|b| *b == v)
            .ok_or(Error::TemplateAssembly("Corner is not on the boundary"))
    }

    /// Vertices of side `i`, from its first corner to the next one.
    pub fn side(&self, i: usize) -> Result<Vec<usize>, Error> {
        let k = self.corners.len();
        if k == 0 {
            return Err(Error::TemplateAssembly("Layout has no corners"));
        }
        let m = self.boundary.len();
        let start = self.boundary_position(self.corners[i % k])?;
        let end = self.boundary_position(self.corners[(i + 1) % k])?;
        let len = (end + m - start) % m;
        Ok((0..=len).map(|j| self.boundary[(start + j) % m]).collect())
    }

    pub fn sides(&self) -> Result<Vec<Vec<usize>>, Error> {
        (0..self.corners.len()).map(|i| self.side(i)).collect()
    }

    /// Reassign the slots of the rings. Rings whose slot maps to nothing are
    /// frozen.
    fn with_slots(mut self, mapping: [Option<Slot>; 2]) -> Self {
        self.rings = self
            .rings
            .into_iter()
            .filter_map(|(edge, slot)| {
                let target = match slot {
                    Slot::A => mapping[0],
                    Slot::B => mapping[1],
                };
                target.map(|s| (edge, s))
            })
            .collect();
        self
    }

    /// Glue side `sb` of `other` onto side `sa` of this layout. The other
    /// layout is moved into place with a similarity transform, so that the
    /// two sides coincide with opposite orientations. Returns the combined
    /// layout, and the new index of every vertex of `other`.
    fn glue(
        &self,
        sa: usize,
        other: &LocalPatch,
        sb: usize,
    ) -> Result<(LocalPatch, Vec<usize>), Error> {
        let side_a = self.side(sa)?;
        let side_b = other.side(sb)?;
        if side_a.len() != side_b.len() || side_a.len() < 2 {
            return Err(Error::TemplateAssembly("Glued sides differ in length"));
        }
        let n = side_a.len() - 1;
        let (a_s, a_e) = (self.points[side_a[0]], self.points[side_a[n]]);
        let (b_s, b_e) = (other.points[side_b[0]], other.points[side_b[n]]);
        let alpha = cdiv(a_s - a_e, b_e - b_s);
        let beta = a_e - cmul(alpha, b_s);
        let mut points = self.points.clone();
        let remap: Vec<usize> = other
            .points
            .iter()
            .enumerate()
            .map(|(vb, p)| match side_b.iter().position(|x| *x == vb) {
                Some(k) => side_a[n - k],
                None => {
                    points.push(cmul(alpha, *p) + beta);
                    points.len() - 1
                }
            })
            .collect();
        let faces = self
            .faces
            .iter()
            .copied()
            .chain(other.faces.iter().map(|f| f.map(|v| remap[v])))
            .collect();
        // Walk around this layout from the end of the glued side to its
        // start, then around the other layout the same way.
        let ma = self.boundary.len();
        let mb = other.boundary.len();
        let pa = self.boundary_position(side_a[n])?;
        let pb = other.boundary_position(side_b[n])?;
        let boundary = (0..=(ma - n))
            .map(|j| self.boundary[(pa + j) % ma])
            .chain((1..(mb - n)).map(|j| remap[other.boundary[(pb + j) % mb]]))
            .collect();
        let rings = self
            .rings
            .iter()
            .copied()
            .chain(
                other
                    .rings
                    .iter()
                    .map(|((u, v), slot)| ((remap[*u], remap[*v]), *slot)),
            )
            .collect();
        Ok((
            LocalPatch {
                points,
                faces,
                boundary,
                corners: Vec::new(),
                rings,
            },
            remap,
        ))
    }

    /// Assemble the layout described by the recipe.
    fn assemble(recipe: &Recipe) -> Result<LocalPatch, Error> {
        let parts = recipe
            .parts
            .iter()
            .map(|part| {
                let patch = match part.source {
                    Source::Quad => primitive::quad(),
                    Source::Transition => primitive::transition(),
                    Source::Ell => primitive::ell(),
                    Source::Family(sides, pattern) => build(sides, pattern, 0)?,
                };
                Ok(patch.with_slots(part.slots))
            })
            .collect::<Result<Vec<_>, Error>>()?;
        let (mut patch, remap) = match (parts.as_slice(), recipe.glue) {
            ([single], None) => (single.clone(), Vec::new()),
            ([first, second], Some((sa, sb))) => first.glue(sa, second, sb)?,
            _ => return Err(Error::TemplateAssembly("Recipe parts do not match its glue")),
        };
        patch.corners = recipe
            .corners
            .iter()
            .map(|(pi, ci)| {
                let corner = parts
                    .get(*pi)
                    .and_then(|part| part.corners.get(*ci))
                    .copied()
                    .ok_or(Error::TemplateAssembly("Recipe names a missing corner"))?;
                Ok(if *pi == 0 { corner } else { remap[corner] })
            })
            .collect::<Result<Vec<_>, Error>>()?;
        // Start the boundary loop at the first corner.
        let first = patch.corners.first().copied().unwrap_or_default();
        let start = patch.boundary_position(first)?;
        patch.boundary.rotate_left(start);
        Ok(patch)
    }
}

fn build(sides: usize, pattern: u8, variant: usize) -> Result<LocalPatch, Error> {
    let family = library::family(sides, pattern)?;
    let recipe = &family.variants[variant % family.variants.len()];
    let patch = LocalPatch::assemble(recipe)?;
    if patch.corners.len() != sides {
        return Err(Error::TemplateAssembly("Wrong number of corners"));
    }
    Ok(patch)
}

/// The quad layout of one pattern, in local 2d coordinates.
///
/// Side `i` of the template runs counter-clockwise from corner `i` to corner
/// `i + 1`.
#[derive(Debug, Clone)]
pub struct Template {
    sides: usize,
    pattern: u8,
    patch: LocalPatch,
}

impl Template {
    /// The base layout of the pattern, before any edge loops are inserted.
    /// Patterns with alternative topologies pick one with `variant`, modulo
    /// the number of alternatives.
    pub fn new(sides: usize, pattern: u8, variant: usize) -> Result<Self, Error> {
        Ok(Template {
            sides,
            pattern,
            patch: build(sides, pattern, variant)?,
        })
    }

    /// The layout of the pattern with the given parameters, i.e. with
    /// `param_a` and `param_b` edge loops inserted along the corresponding
    /// rings.
    pub fn with_params(
        sides: usize,
        pattern: u8,
        variant: usize,
        param_a: usize,
        param_b: usize,
    ) -> Result<Self, Error> {
        let mut template = Self::new(sides, pattern, variant)?;
        template.patch.subdivide(param_a, param_b)?;
        Ok(template)
    }

    /// Number of alternative topologies registered for the pattern.
    pub fn num_variants(sides: usize, pattern: u8) -> Result<usize, Error> {
        Ok(library::family(sides, pattern)?.variants.len())
    }

    pub fn num_sides(&self) -> usize {
        self.sides
    }

    pub fn pattern_id(&self) -> u8 {
        self.pattern
    }

    pub fn points(&self) -> &[DVec2] {
        &self.patch.points
    }

    pub fn faces(&self) -> &[[usize; 4]] {
        &self.patch.faces
    }

    /// The boundary loop, starting at corner 0.
    pub fn boundary(&self) -> &[usize] {
        &self.patch.boundary
    }

    /// Vertices of every side, including both corners.
    pub fn sides(&self) -> Result<Vec<Vec<usize>>, Error> {
        self.patch.sides()
    }

    pub fn side_lengths(&self) -> Result<Vec<usize>, Error> {
        Ok(self.sides()?.iter().map(|s| s.len() - 1).collect())
    }
}

#[cfg(test)]
impl LocalPatch {
    pub fn side_lengths(&self) -> Vec<usize> {
        self.sides()
            .expect("Invalid sides")
            .iter()
            .map(|s| s.len() - 1)
            .collect()
    }

    /// Faces must be counter-clockwise, interior edges must be shared by
    /// exactly two faces, and the remaining edges must form the boundary
    /// loop.
    pub fn check(&self) -> Result<(), String> {
        use std::collections::{HashMap, HashSet};
        let mut directed: HashMap<(usize, usize), usize> = HashMap::new();
        for (fi, f) in self.faces.iter().enumerate() {
            let area: f64 = (0..4)
                .map(|i| self.points[f[i]].perp_dot(self.points[f[(i + 1) % 4]]))
                .sum();
            if area <= 0.0 {
                return Err(format!("Face {fi} is not counter-clockwise"));
            }
            for i in 0..4 {
                *directed.entry((f[i], f[(i + 1) % 4])).or_default() += 1;
            }
        }
        if let Some(e) = directed.iter().find(|(_, count)| **count > 1) {
            return Err(format!("Directed edge {:?} is used twice", e.0));
        }
        let open: HashSet<(usize, usize)> = directed
            .keys()
            .filter(|(a, b)| !directed.contains_key(&(*b, *a)))
            .copied()
            .collect();
        let m = self.boundary.len();
        let expected: HashSet<(usize, usize)> = (0..m)
            .map(|i| (self.boundary[i], self.boundary[(i + 1) % m]))
            .collect();
        if open != expected || expected.len() != m {
            return Err(format!("Open edges {open:?} do not match the boundary"));
        }
        let used: HashSet<usize> = self.faces.iter().flatten().copied().collect();
        if used.len() != self.points.len() {
            return Err("Some points are not used by any face".to_string());
        }
        Ok(())
    }
}
