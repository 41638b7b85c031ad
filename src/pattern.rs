use log::debug;

use crate::{error::Error, template::families};

/// Identifies the template of a terminal patch, how it is rotated onto the
/// patch, and its integer parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PatternSignature {
    pub pattern_id: u8,
    /// Template side `i` maps to patch side `(i + rotation) % K`.
    pub rotation: usize,
    pub param_a: usize,
    pub param_b: usize,
}

impl PatternSignature {
    /// The regular grid of quads with `a + 1` by `b + 1` faces.
    pub fn rectangle(a: usize, b: usize) -> Self {
        PatternSignature {
            pattern_id: 0,
            rotation: 0,
            param_a: a,
            param_b: b,
        }
    }
}

/// Number of steps the side lengths must be rotated so that the first side
/// is longer than 1 and the last side is exactly 1. Returns 0 if there is no
/// such rotation, i.e. when all sides have unit length or none do.
///
/// ```
/// use quadfill::canonical_rotation;
///
/// assert_eq!(canonical_rotation(&[1, 3, 1, 1]), 1);
/// assert_eq!(canonical_rotation(&[2, 2, 2, 2]), 0);
/// ```
pub fn canonical_rotation(lengths: &[usize]) -> usize {
    let k = lengths.len();
    if k < 3 {
        return 0;
    }
    (0..k)
        .find(|r| lengths[*r] != 1 && lengths[(r + k - 1) % k] == 1)
        .unwrap_or(0)
}

/// `rotated[i] == lengths[(i + rotation) % K]`.
pub fn rotate_lengths(lengths: &[usize], rotation: usize) -> Vec<usize> {
    let k = lengths.len();
    (0..k).map(|i| lengths[(i + rotation) % k]).collect()
}

/// Match the side lengths of a terminal patch against the families of the
/// template library. The first family that accepts the canonicalized
/// lengths wins.
pub fn classify(lengths: &[usize]) -> Result<PatternSignature, Error> {
    let rotation = canonical_rotation(lengths);
    let canonical = rotate_lengths(lengths, rotation);
    let signature = families()
        .iter()
        .filter(|f| f.sides == canonical.len())
        .find_map(|f| {
            (f.params)(&canonical).map(|(param_a, param_b)| PatternSignature {
                pattern_id: f.id,
                rotation,
                param_a,
                param_b,
            })
        })
        .ok_or_else(|| Error::Unclassified {
            sides: lengths.len(),
            lengths: lengths.to_vec(),
        })?;
    debug!("Classified side lengths {lengths:?} as {signature:?}");
    Ok(signature)
}
