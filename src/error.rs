use crate::element::{EH, FH, VH};

/// Everything that can go wrong while building, instantiating or releasing a
/// patch tree.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // Boundary.
    #[error("A patch needs at least 3 sides, got {0}")]
    TooFewSides(usize),
    #[error("Side {0} of the boundary has no segments")]
    EmptySide(usize),
    #[error("Side {0} does not start where the previous side ends")]
    DisconnectedSides(usize),
    // Mesh.
    #[error("Invalid or deleted vertex {0}")]
    InvalidVertex(VH),
    #[error("Invalid or deleted edge {0}")]
    InvalidEdge(EH),
    #[error("Invalid or deleted face {0}")]
    InvalidFace(FH),
    #[error("A face cannot use the same vertex twice")]
    DegenerateFace,
    #[error("Vertex {0} appears more than once in face {1}")]
    DuplicateFaceVertex(VH, FH),
    #[error("Edge {0} has more than two incident faces")]
    ComplexEdge(EH),
    #[error("Faces incident on edge {0} are not consistently oriented")]
    InconsistentOrientation(EH),
    #[error("Face {0} has an edge that is missing from the edge list")]
    MissingFaceEdge(FH),
    // Classification.
    #[error("No pattern matches a {sides} sided patch with side lengths {lengths:?}")]
    Unclassified { sides: usize, lengths: Vec<usize> },
    #[error("There is no pattern {pattern} for {sides} sided patches")]
    UnknownPattern { sides: usize, pattern: u8 },
    // Instantiation.
    #[error("Could not align a {sides} sided template with its patch")]
    AlignmentFailed { sides: usize },
    #[error("Template side {side} has {actual} segments, the patch needs {expected}")]
    SideMismatch {
        side: usize,
        expected: usize,
        actual: usize,
    },
    #[error("Template assembly failed: {0}")]
    TemplateAssembly(&'static str),
    // Obj.
    #[error("Failed to load obj: {0}")]
    ObjLoadFailed(String),
    #[error("Obj mesh has {0} coordinates, which is not a multiple of 3")]
    IncorrectNumberOfCoordinates(usize),
}
