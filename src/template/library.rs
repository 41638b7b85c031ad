use super::Slot::{self, A, B};
use crate::error::Error;

/// Where a part of a recipe comes from.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Source {
    Quad,
    Transition,
    Ell,
    /// The base layout of another family, given by side count and pattern.
    Family(usize, u8),
}

#[derive(Debug)]
pub(crate) struct Part {
    pub source: Source,
    /// New slot for the rings of the part that are in slot A and slot B
    /// respectively.
    pub slots: [Option<Slot>; 2],
}

#[derive(Debug)]
pub(crate) struct Recipe {
    pub parts: &'static [Part],
    /// Side of the first part glued to a side of the second part.
    pub glue: Option<(usize, usize)>,
    /// Corners of the result, as (part, corner of that part).
    pub corners: &'static [(usize, usize)],
}

/// A family of terminal patches, recognized by a closed form relation on
/// the canonicalized side lengths.
pub(crate) struct Family {
    pub sides: usize,
    pub id: u8,
    /// Returns the parameters of the family, or `None` if the side lengths
    /// are not in the family.
    pub params: fn(&[usize]) -> Option<(usize, usize)>,
    /// Alternative topologies. All of them have the same side lengths.
    pub variants: &'static [Recipe],
}

const FROZEN: [Option<Slot>; 2] = [None, None];
const TO_A: [Option<Slot>; 2] = [Some(A), None];
const TO_B: [Option<Slot>; 2] = [Some(B), None];
const TO_AB: [Option<Slot>; 2] = [Some(A), Some(B)];

macro_rules! part {
    ($source:expr, $slots:expr) => {
        Part {
            source: $source,
            slots: $slots,
        }
    };
}

macro_rules! single {
    ($parts:expr, $corners:expr) => {
        Recipe {
            parts: $parts,
            glue: None,
            corners: $corners,
        }
    };
}

macro_rules! glued {
    ($parts:expr, $glue:expr, $corners:expr $(,)?) => {
        Recipe {
            parts: $parts,
            glue: Some($glue),
            corners: $corners,
        }
    };
}

fn ones(lengths: &[usize]) -> bool {
    lengths.iter().all(|l| *l == 1)
}

fn even(l: usize) -> bool {
    l % 2 == 0
}

// Triangles.

fn tri_unit(l: &[usize]) -> Option<(usize, usize)> {
    (l == [2, 1, 1]).then_some((0, 0))
}

fn tri_long(l: &[usize]) -> Option<(usize, usize)> {
    (l[0] >= 4 && even(l[0]) && ones(&l[1..])).then(|| ((l[0] - 4) / 2, 0))
}

// Quadrilaterals.

fn quad_grid(l: &[usize]) -> Option<(usize, usize)> {
    (l[0] == l[2] && l[1] == l[3]).then(|| (l[0] - 1, l[1] - 1))
}

fn quad_ell(l: &[usize]) -> Option<(usize, usize)> {
    (l[0] >= 2 && l[0] == l[1] && ones(&l[2..])).then(|| (l[0] - 2, 0))
}

fn quad_transition(l: &[usize]) -> Option<(usize, usize)> {
    (l[0] >= 3 && !even(l[0]) && ones(&l[1..])).then(|| ((l[0] - 3) / 2, 0))
}

fn quad_wide(l: &[usize]) -> Option<(usize, usize)> {
    (l[1] >= 2 && l[0] == l[1] + 2 && ones(&l[2..])).then(|| (l[1] - 2, 0))
}

fn quad_wider(l: &[usize]) -> Option<(usize, usize)> {
    (l[1] >= 2 && l[0] >= l[1] + 4 && even(l[0] - l[1]) && ones(&l[2..]))
        .then(|| ((l[0] - l[1] - 4) / 2, l[1] - 2))
}

fn quad_tall(l: &[usize]) -> Option<(usize, usize)> {
    (l[0] >= 2 && l[1] == l[0] + 2 && ones(&l[2..])).then(|| (l[0] - 2, 0))
}

fn quad_taller(l: &[usize]) -> Option<(usize, usize)> {
    (l[0] >= 2 && l[1] >= l[0] + 4 && even(l[1] - l[0]) && ones(&l[2..]))
        .then(|| (l[0] - 2, (l[1] - l[0] - 4) / 2))
}

// Pentagons. The last three sides are always unit length.

fn penta(l: &[usize], first: fn(usize) -> bool, second: fn(usize) -> bool) -> bool {
    first(l[0]) && second(l[1]) && ones(&l[2..])
}

fn penta_unit(l: &[usize]) -> Option<(usize, usize)> {
    penta(l, |a| a == 2, |b| b == 1).then_some((0, 0))
}

fn penta_long(l: &[usize]) -> Option<(usize, usize)> {
    penta(l, |a| a >= 4 && even(a), |b| b == 1).then(|| ((l[0] - 4) / 2, 0))
}

fn penta_unit_odd(l: &[usize]) -> Option<(usize, usize)> {
    penta(l, |a| a == 2, |b| b >= 3 && !even(b)).then(|| ((l[1] - 3) / 2, 0))
}

fn penta_long_odd(l: &[usize]) -> Option<(usize, usize)> {
    penta(l, |a| a >= 4 && even(a), |b| b >= 3 && !even(b))
        .then(|| ((l[0] - 4) / 2, (l[1] - 3) / 2))
}

fn penta_odd_unit(l: &[usize]) -> Option<(usize, usize)> {
    penta(l, |a| a >= 3 && !even(a), |b| b == 2).then(|| ((l[0] - 3) / 2, 0))
}

fn penta_odd_long(l: &[usize]) -> Option<(usize, usize)> {
    penta(l, |a| a >= 3 && !even(a), |b| b >= 4 && even(b))
        .then(|| ((l[0] - 3) / 2, (l[1] - 4) / 2))
}

// Hexagons.

fn hexa_unit(l: &[usize]) -> Option<(usize, usize)> {
    ones(l).then_some((0, 0))
}

/// A quadrilateral shape (a, b, 1, 1) with an extra quad on its third side.
fn hexa_extended(
    l: &[usize],
    quad: fn(&[usize]) -> Option<(usize, usize)>,
) -> Option<(usize, usize)> {
    if ones(&l[2..]) {
        quad(&[l[0], l[1], 1, 1])
    } else {
        None
    }
}

macro_rules! hexa_extended {
    ($name:ident, $quad:ident) => {
        fn $name(l: &[usize]) -> Option<(usize, usize)> {
            hexa_extended(l, $quad)
        }
    };
}

hexa_extended!(hexa_ell, quad_ell);
hexa_extended!(hexa_transition, quad_transition);
hexa_extended!(hexa_wide, quad_wide);
hexa_extended!(hexa_wider, quad_wider);
hexa_extended!(hexa_tall, quad_tall);
hexa_extended!(hexa_taller, quad_taller);

/// Two long sides facing each other: (a, 1, 1, b, 1, 1).
fn hexa_opposite(l: &[usize]) -> bool {
    ones(&l[1..3]) && ones(&l[4..])
}

fn hexa_strip(l: &[usize]) -> Option<(usize, usize)> {
    (hexa_opposite(l) && l[0] == l[3]).then(|| (l[0] - 1, 0))
}

fn hexa_strip_narrowing(l: &[usize]) -> Option<(usize, usize)> {
    (hexa_opposite(l) && l[0] > l[3] && even(l[0] - l[3]))
        .then(|| ((l[0] - l[3] - 2) / 2, l[3] - 1))
}

fn hexa_strip_widening(l: &[usize]) -> Option<(usize, usize)> {
    (hexa_opposite(l) && l[0] < l[3] && even(l[3] - l[0]))
        .then(|| ((l[3] - l[0] - 2) / 2, l[0] - 1))
}

const QUAD_CORNERS: &[(usize, usize)] = &[(0, 0), (0, 1), (0, 2), (0, 3)];
const TRI_CORNERS: &[(usize, usize)] = &[(0, 0), (0, 2), (0, 3)];
const HEXA_EXTENDED_CORNERS: &[(usize, usize)] = &[(0, 0), (0, 1), (0, 2), (1, 1), (1, 2), (1, 3)];
const HEXA_STACKED_CORNERS: &[(usize, usize)] = &[(0, 0), (0, 1), (0, 2), (1, 2), (1, 3), (0, 3)];

static FAMILIES: &[Family] = &[
    // Triangles.
    Family {
        sides: 3,
        id: 0,
        params: tri_unit,
        variants: &[single!(&[part!(Source::Quad, FROZEN)], TRI_CORNERS)],
    },
    Family {
        sides: 3,
        id: 10,
        params: tri_long,
        variants: &[single!(&[part!(Source::Ell, TO_A)], TRI_CORNERS)],
    },
    // Quadrilaterals.
    Family {
        sides: 4,
        id: 0,
        params: quad_grid,
        variants: &[single!(&[part!(Source::Quad, TO_AB)], QUAD_CORNERS)],
    },
    Family {
        sides: 4,
        id: 1,
        params: quad_ell,
        variants: &[single!(&[part!(Source::Ell, TO_A)], QUAD_CORNERS)],
    },
    Family {
        sides: 4,
        id: 2,
        params: quad_transition,
        variants: &[single!(&[part!(Source::Transition, TO_A)], QUAD_CORNERS)],
    },
    Family {
        sides: 4,
        id: 3,
        params: quad_wide,
        variants: &[glued!(
            &[part!(Source::Family(3, 0), FROZEN), part!(Source::Ell, TO_A)],
            (1, 3),
            &[(0, 0), (1, 1), (1, 2), (0, 2)],
        )],
    },
    Family {
        sides: 4,
        id: 4,
        params: quad_wider,
        variants: &[glued!(
            &[part!(Source::Family(3, 10), TO_A), part!(Source::Ell, TO_B)],
            (1, 3),
            &[(0, 0), (1, 1), (1, 2), (0, 2)],
        )],
    },
    Family {
        sides: 4,
        id: 5,
        params: quad_tall,
        variants: &[glued!(
            &[part!(Source::Ell, TO_A), part!(Source::Family(3, 0), FROZEN)],
            (2, 2),
            &[(0, 0), (0, 1), (1, 1), (1, 2)],
        )],
    },
    Family {
        sides: 4,
        id: 6,
        params: quad_taller,
        variants: &[glued!(
            &[part!(Source::Ell, TO_A), part!(Source::Family(3, 10), TO_B)],
            (2, 2),
            &[(0, 0), (0, 1), (1, 1), (1, 2)],
        )],
    },
    // Pentagons.
    Family {
        sides: 5,
        id: 0,
        params: penta_unit,
        variants: &[glued!(
            &[part!(Source::Quad, FROZEN), part!(Source::Quad, FROZEN)],
            (3, 1),
            &[(1, 0), (0, 1), (0, 2), (0, 3), (1, 3)],
        )],
    },
    Family {
        sides: 5,
        id: 1,
        params: penta_long,
        variants: &[glued!(
            &[part!(Source::Transition, TO_A), part!(Source::Quad, FROZEN)],
            (1, 3),
            &[(0, 0), (1, 1), (1, 2), (1, 3), (0, 3)],
        )],
    },
    Family {
        sides: 5,
        id: 2,
        params: penta_unit_odd,
        variants: &[glued!(
            &[part!(Source::Family(3, 0), FROZEN), part!(Source::Transition, TO_A)],
            (1, 3),
            &[(0, 0), (0, 1), (1, 1), (1, 2), (1, 3)],
        )],
    },
    Family {
        sides: 5,
        id: 3,
        params: penta_long_odd,
        variants: &[glued!(
            &[part!(Source::Family(3, 10), TO_A), part!(Source::Transition, TO_B)],
            (1, 3),
            &[(0, 0), (0, 1), (1, 1), (1, 2), (1, 3)],
        )],
    },
    Family {
        sides: 5,
        id: 4,
        params: penta_odd_unit,
        variants: &[glued!(
            &[part!(Source::Transition, TO_A), part!(Source::Family(3, 0), FROZEN)],
            (1, 2),
            &[(0, 0), (0, 1), (1, 1), (1, 2), (0, 3)],
        )],
    },
    Family {
        sides: 5,
        id: 5,
        params: penta_odd_long,
        variants: &[glued!(
            &[part!(Source::Transition, TO_A), part!(Source::Family(3, 10), TO_B)],
            (1, 2),
            &[(0, 0), (0, 1), (1, 1), (1, 2), (0, 3)],
        )],
    },
    // Hexagons.
    Family {
        sides: 6,
        id: 0,
        params: hexa_unit,
        variants: &[
            glued!(
                &[part!(Source::Quad, FROZEN), part!(Source::Quad, FROZEN)],
                (3, 3),
                &[(0, 0), (0, 1), (0, 2), (0, 3), (1, 1), (1, 2)],
            ),
            glued!(
                &[part!(Source::Quad, FROZEN), part!(Source::Quad, FROZEN)],
                (3, 3),
                &[(1, 2), (0, 0), (0, 1), (0, 2), (0, 3), (1, 1)],
            ),
            glued!(
                &[part!(Source::Quad, FROZEN), part!(Source::Quad, FROZEN)],
                (3, 3),
                &[(1, 1), (1, 2), (0, 0), (0, 1), (0, 2), (0, 3)],
            ),
        ],
    },
    Family {
        variants: &[glued!(
            &[part!(Source::Family(4, 1), TO_AB), part!(Source::Quad, FROZEN)],
            (2, 3),
            HEXA_EXTENDED_CORNERS,
        )],
        sides: 6,
        id: 1,
        params: hexa_ell,
    },
    Family {
        variants: &[glued!(
            &[part!(Source::Family(4, 2), TO_AB), part!(Source::Quad, FROZEN)],
            (2, 3),
            HEXA_EXTENDED_CORNERS,
        )],
        sides: 6,
        id: 2,
        params: hexa_transition,
    },
    Family {
        variants: &[glued!(
            &[part!(Source::Family(4, 3), TO_AB), part!(Source::Quad, FROZEN)],
            (2, 3),
            HEXA_EXTENDED_CORNERS,
        )],
        sides: 6,
        id: 3,
        params: hexa_wide,
    },
    Family {
        variants: &[glued!(
            &[part!(Source::Family(4, 4), TO_AB), part!(Source::Quad, FROZEN)],
            (2, 3),
            HEXA_EXTENDED_CORNERS,
        )],
        sides: 6,
        id: 4,
        params: hexa_wider,
    },
    Family {
        variants: &[glued!(
            &[part!(Source::Family(4, 5), TO_AB), part!(Source::Quad, FROZEN)],
            (2, 3),
            HEXA_EXTENDED_CORNERS,
        )],
        sides: 6,
        id: 5,
        params: hexa_tall,
    },
    Family {
        variants: &[glued!(
            &[part!(Source::Family(4, 6), TO_AB), part!(Source::Quad, FROZEN)],
            (2, 3),
            HEXA_EXTENDED_CORNERS,
        )],
        sides: 6,
        id: 6,
        params: hexa_taller,
    },
    Family {
        sides: 6,
        id: 7,
        params: hexa_strip,
        variants: &[glued!(
            &[part!(Source::Quad, TO_A), part!(Source::Quad, FROZEN)],
            (2, 0),
            HEXA_STACKED_CORNERS,
        )],
    },
    Family {
        sides: 6,
        id: 8,
        params: hexa_strip_narrowing,
        variants: &[glued!(
            &[part!(Source::Transition, TO_AB), part!(Source::Quad, FROZEN)],
            (2, 0),
            HEXA_STACKED_CORNERS,
        )],
    },
    Family {
        sides: 6,
        id: 9,
        params: hexa_strip_widening,
        variants: &[glued!(
            &[part!(Source::Quad, FROZEN), part!(Source::Transition, TO_AB)],
            (2, 2),
            &[(0, 0), (0, 1), (0, 2), (1, 0), (1, 1), (1, 2)],
        )],
    },
];

/// All families, in the order they are tested during classification.
pub(crate) fn families() -> &'static [Family] {
    FAMILIES
}

pub(crate) fn family(sides: usize, pattern: u8) -> Result<&'static Family, Error> {
    FAMILIES
        .iter()
        .find(|f| f.sides == sides && f.id == pattern)
        .ok_or(Error::UnknownPattern { sides, pattern })
}
