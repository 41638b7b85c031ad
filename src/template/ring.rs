use std::collections::HashMap;

use super::{LocalPatch, Slot};
use crate::error::Error;

/// Position of the undirected edge `(a, b)` in the face, as the index of
/// its first vertex when walking the face counter-clockwise.
fn edge_position(face: &[usize; 4], a: usize, b: usize) -> Option<usize> {
    (0..4).find(|i| {
        let (u, v) = (face[*i], face[(i + 1) % 4]);
        (u == a && v == b) || (u == b && v == a)
    })
}

fn edge_key(a: usize, b: usize) -> (usize, usize) {
    if a < b { (a, b) } else { (b, a) }
}

impl LocalPatch {
    fn faces_with_edge(&self, a: usize, b: usize) -> impl Iterator<Item = usize> + '_ {
        self.faces
            .iter()
            .enumerate()
            .filter(move |(_, f)| edge_position(f, a, b).is_some())
            .map(|(fi, _)| fi)
    }

    /// Walk the quad strip starting at face `fi`, entering through the edge
    /// `(a, b)`. Pushes every crossed face, and the position of the edge
    /// through which it was entered.
    fn walk_strip(
        &self,
        mut fi: usize,
        (mut a, mut b): (usize, usize),
        strip: &mut Vec<(usize, usize)>,
    ) -> Result<(), Error> {
        loop {
            if strip.iter().any(|(f, _)| *f == fi) {
                return Err(Error::TemplateAssembly("Ring does not reach the boundary"));
            }
            let face = &self.faces[fi];
            let pos = edge_position(face, a, b)
                .ok_or(Error::TemplateAssembly("Ring strip is broken"))?;
            strip.push((fi, pos));
            (a, b) = (face[(pos + 2) % 4], face[(pos + 3) % 4]);
            match self.faces_with_edge(a, b).find(|f| *f != fi) {
                Some(next) => fi = next,
                None => return Ok(()),
            }
        }
    }

    /// Insert `n` edge loops along the ring that crosses the edge `(a, b)`.
    /// Every edge crossed by the ring is split into `n + 1` segments, and
    /// every face crossed by the ring is split into `n + 1` faces.
    pub(crate) fn subdivide_ring(&mut self, (a, b): (usize, usize), n: usize) -> Result<(), Error> {
        if n == 0 {
            return Ok(());
        }
        let mut strip = Vec::new();
        let (first, second) = {
            let mut adjacent = self.faces_with_edge(a, b);
            (adjacent.next(), adjacent.next())
        };
        let first = first.ok_or(Error::TemplateAssembly("Ring start is not an edge"))?;
        self.walk_strip(first, (a, b), &mut strip)?;
        if let Some(second) = second {
            // The start edge is interior, walk the other way too.
            self.walk_strip(second, (a, b), &mut strip)?;
        }
        // New points along every crossed edge, ordered from the smaller
        // index to the larger one.
        let mut splits: HashMap<(usize, usize), Vec<usize>> = HashMap::new();
        for (fi, pos) in &strip {
            let face = self.faces[*fi];
            for (u, v) in [
                (face[*pos], face[(pos + 1) % 4]),
                (face[(pos + 2) % 4], face[(pos + 3) % 4]),
            ] {
                let key = edge_key(u, v);
                if splits.contains_key(&key) {
                    continue;
                }
                let (p, q) = (self.points[key.0], self.points[key.1]);
                let start = self.points.len();
                self.points.extend(
                    (1..=n).map(|k| p.lerp(q, k as f64 / (n + 1) as f64)),
                );
                splits.insert(key, (start..(start + n)).collect());
            }
        }
        let fetch = |u: usize, v: usize| -> Vec<usize> {
            let mut pts = splits.get(&edge_key(u, v)).cloned().unwrap_or_default();
            if u > v {
                pts.reverse();
            }
            pts
        };
        for (fi, pos) in &strip {
            let face = self.faces[*fi];
            let (f0, f1, f2, f3) = (
                face[*pos],
                face[(pos + 1) % 4],
                face[(pos + 2) % 4],
                face[(pos + 3) % 4],
            );
            let rail0: Vec<usize> = std::iter::once(f0)
                .chain(fetch(f0, f1))
                .chain(std::iter::once(f1))
                .collect();
            let rail1: Vec<usize> = std::iter::once(f3)
                .chain(fetch(f3, f2))
                .chain(std::iter::once(f2))
                .collect();
            for k in 0..=n {
                let quad = [rail0[k], rail0[k + 1], rail1[k + 1], rail1[k]];
                if k == 0 {
                    self.faces[*fi] = quad;
                } else {
                    self.faces.push(quad);
                }
            }
        }
        let mut boundary = Vec::with_capacity(self.boundary.len() + 2 * n);
        for (i, u) in self.boundary.iter().enumerate() {
            let v = self.boundary[(i + 1) % self.boundary.len()];
            boundary.push(*u);
            boundary.extend(fetch(*u, v));
        }
        self.boundary = boundary;
        Ok(())
    }

    /// Subdivide every ring by the parameter of its slot.
    pub(crate) fn subdivide(&mut self, param_a: usize, param_b: usize) -> Result<(), Error> {
        let rings = std::mem::take(&mut self.rings);
        for (slot, n) in [(Slot::A, param_a), (Slot::B, param_b)] {
            for (edge, _) in rings.iter().filter(|(_, s)| *s == slot) {
                self.subdivide_ring(*edge, n)?;
            }
        }
        self.rings = rings;
        Ok(())
    }
}
