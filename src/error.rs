use thiserror::Error;

use crate::element::{CH, FH, VH};

/// Unified error type for all datastructure operations.
///
/// Every validation failure is raised synchronously at the offending call,
/// before any adjacency is touched. Non-fatal conditions such as a manifold
/// predicate turning false are reported through boolean queries, never
/// through this type.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    // Keys.
    #[error("key {0} is already in use")]
    KeyCollision(u64),
    // Entities.
    #[error("vertex {0} does not exist")]
    VertexNotFound(VH),
    #[error("node {0} does not exist")]
    NodeNotFound(VH),
    #[error("face {0} does not exist")]
    FaceNotFound(FH),
    #[error("cell {0} does not exist")]
    CellNotFound(CH),
    #[error("edge ({0}, {1}) does not exist")]
    EdgeNotFound(VH, VH),
    // Topology.
    #[error("halfedge ({0}, {1}) is already bound to a face")]
    NonManifoldHalfedge(VH, VH),
    #[error("halfface ({}, {}, {}) is already bound to a cell", .0[0], .0[1], .0[2])]
    NonManifoldHalfface([VH; 3]),
    #[error("face cycle of length {0} is degenerate")]
    DegenerateFace(usize),
    #[error("vertex {0} repeats in the face cycle")]
    RepeatedVertex(VH),
    #[error("cell shell is not closed at edge ({0}, {1})")]
    OpenCellShell(VH, VH),
    #[error("collapsing edge ({0}, {1}) would change the topology")]
    IllegalCollapse(VH, VH),
    #[error("faces {0} and {1} do not share exactly one edge")]
    FacesNotAdjacent(FH, FH),
    #[error("cannot split face {0} between cycle vertices {1} and {2}")]
    InvalidChord(FH, VH, VH),
    // Attributes.
    #[error("attribute '{0}' is not set and has no default")]
    AttributeNotFound(String),
    // Construction.
    #[error("vertex index {0} is out of range")]
    IndexOutOfRange(usize),
}
