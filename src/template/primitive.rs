use glam::{DVec2, dvec2};

use super::{LocalPatch, Slot};

fn patch(
    points: &[DVec2],
    faces: &[[usize; 4]],
    nboundary: usize,
    corners: &[usize],
    rings: &[(usize, usize)],
) -> LocalPatch {
    LocalPatch {
        points: points.to_vec(),
        faces: faces.to_vec(),
        // Boundary vertices come first, in counter-clockwise order.
        boundary: (0..nboundary).collect(),
        corners: corners.to_vec(),
        rings: rings
            .iter()
            .zip([Slot::A, Slot::B])
            .map(|(edge, slot)| (*edge, slot))
            .collect(),
    }
}

/**
 * The single quad. Both rings run across the quad, the first one from side 0
 * to side 2 and the second from side 1 to side 3.
 *
 * ```text
 * 3-----2
 * |     |
 * |     |
 * 0-----1
 * ```
 */
pub(crate) fn quad() -> LocalPatch {
    patch(
        &[
            dvec2(0.0, 0.0),
            dvec2(1.0, 0.0),
            dvec2(1.0, 1.0),
            dvec2(0.0, 1.0),
        ],
        &[[0, 1, 2, 3]],
        4,
        &[0, 1, 2, 3],
        &[(0, 1), (1, 2)],
    )
}

/**
 * Transition from three segments to one, with side lengths (3, 1, 1, 1). The
 * first ring turns around and enters side 0 twice, the second runs from side
 * 0 to side 2.
 *
 * ```text
 *     5-----------4
 *    /|           |\
 *   / 6-----------7 \
 *  /  |           |  \
 * 0---1-----------2---3
 * ```
 */
pub(crate) fn transition() -> LocalPatch {
    patch(
        &[
            dvec2(0.0, 0.0),
            dvec2(1.0, 0.0),
            dvec2(2.0, 0.0),
            dvec2(3.0, 0.0),
            dvec2(2.5, 2.0),
            dvec2(0.5, 2.0),
            dvec2(1.0, 1.0),
            dvec2(2.0, 1.0),
        ],
        &[[0, 1, 6, 5], [1, 2, 7, 6], [2, 3, 4, 7], [6, 7, 4, 5]],
        6,
        &[0, 3, 4, 5],
        &[(0, 1), (1, 2)],
    )
}

/**
 * Corner with side lengths (2, 2, 1, 1). The ring runs from side 0 to side 1.
 *
 * ```text
 * 5-----------4
 * |           |
 * |     6-----3
 * |     |     |
 * 0-----1-----2
 * ```
 */
pub(crate) fn ell() -> LocalPatch {
    patch(
        &[
            dvec2(0.0, 0.0),
            dvec2(1.0, 0.0),
            dvec2(2.0, 0.0),
            dvec2(2.0, 1.0),
            dvec2(2.0, 2.0),
            dvec2(0.0, 2.0),
            dvec2(1.0, 1.0),
        ],
        &[[0, 1, 6, 5], [1, 2, 3, 6], [6, 3, 4, 5]],
        6,
        &[0, 2, 4, 5],
        &[(0, 1)],
    )
}
