use glam::{DVec2, DVec3};

/// Compute the normal of a closed polygon using Newell's method. The polygon
/// is counter-clockwise around the returned normal. Degenerate polygons
/// produce a zero vector.
pub fn newell_normal<I>(points: I) -> DVec3
where
    I: IntoIterator<Item = DVec3>,
{
    let mut iter = points.into_iter();
    let first = match iter.next() {
        Some(p) => p,
        None => return DVec3::ZERO,
    };
    let (nverts, last, total) = iter.fold(
        (1usize, first, DVec3::ZERO),
        |(nverts, prev, total), pn| (nverts + 1, pn, total + newell_term(prev, pn)),
    );
    if nverts < 3 {
        // Guard against degenerate cases.
        return DVec3::ZERO;
    }
    (total + newell_term(last, first)).normalize_or_zero()
}

fn newell_term(pc: DVec3, pn: DVec3) -> DVec3 {
    let (a, b) = (pc - pn, pc + pn);
    DVec3::new(a.y * b.z, a.z * b.x, a.x * b.y)
}

/// Average of the given points. Returns the origin if there are none.
pub fn centroid<I>(points: I) -> DVec3
where
    I: IntoIterator<Item = DVec3>,
{
    let (count, total) = points
        .into_iter()
        .fold((0usize, DVec3::ZERO), |(count, total), p| (count + 1, total + p));
    if count == 0 {
        DVec3::ZERO
    } else {
        total / count as f64
    }
}

/// Intersect the line through `origin` along `dir` with the plane through
/// `point` with `normal`. Returns `None` when the line is parallel to the
/// plane.
pub fn line_plane_intersection(
    origin: DVec3,
    dir: DVec3,
    point: DVec3,
    normal: DVec3,
) -> Option<DVec3> {
    let denom = dir.dot(normal);
    if denom.abs() < 1e-12 {
        return None;
    }
    let t = (point - origin).dot(normal) / denom;
    Some(origin + dir * t)
}

/// Complex multiplication of 2d vectors.
pub fn cmul(a: DVec2, b: DVec2) -> DVec2 {
    DVec2::new(a.x * b.x - a.y * b.y, a.x * b.y + a.y * b.x)
}

/// Complex division of 2d vectors. Division by zero returns zero.
pub fn cdiv(a: DVec2, b: DVec2) -> DVec2 {
    let denom = b.length_squared();
    if denom == 0.0 {
        return DVec2::ZERO;
    }
    cmul(a, DVec2::new(b.x, -b.y)) / denom
}

/// Find the rotation (as a unit complex number) that best maps the centered
/// points `src` onto the centered points `dst`, in the least squares
/// sense. The slices are expected to be of the same length.
pub fn fit_rotation(src: &[DVec2], dst: &[DVec2]) -> DVec2 {
    let total = src
        .iter()
        .zip(dst.iter())
        .fold(DVec2::ZERO, |total, (s, d)| {
            total + cmul(DVec2::new(s.x, -s.y), *d)
        });
    if total.length_squared() < 1e-24 {
        DVec2::X
    } else {
        total.normalize()
    }
}

/// Mean length of the segments of the closed loop of points.
pub fn mean_segment_length(points: &[DVec3]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    let total: f64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.distance(*b))
        .sum();
    total / points.len() as f64
}
