//! Error types for the Blaze engine

use thiserror::Error;

/// Main error type for engine operations
#[derive(Error, Debug)]
pub enum BlazeError {
    #[error("Invalid DoF index {0} - only DoFs 0 through 5 allowed")]
    InvalidDof(i32),

    #[error("Node {node_id}: DoF {dof} is both restrained and loaded")]
    LoadedRestrainedDof { node_id: u32, dof: usize },

    #[error("Expected {dofs} loaded DoFs but got {loads} load magnitudes")]
    MismatchedDofsLoads { dofs: usize, loads: usize },

    #[error("Node {0} not found in {1} node vectors")]
    NodeNotFound(u32, &'static str),

    #[error("Element {0} not found in mesh")]
    ElementNotFound(u32),

    #[error("Element {elem_id} references unknown node {node_id}")]
    UnknownElementNode { elem_id: u32, node_id: u32 },

    #[error("Halo exchange with rank {neighbour} expected {expected} nodes but got {got}")]
    HaloCountMismatch {
        neighbour: usize,
        expected: usize,
        got: usize,
    },

    #[error("Factorisation of {matrix} ({rows}x{cols}) failed: {reason}")]
    SingularMatrix {
        matrix: &'static str,
        rows: usize,
        cols: usize,
        reason: &'static str,
    },

    #[error("Residual vector contains non-finite entries at load factor {load_factor}")]
    NonFiniteResidual { load_factor: f64 },

    #[error("Collective operation failed: {0}")]
    CollectiveFailure(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Result type for engine operations
pub type BlazeResult<T> = Result<T, BlazeError>;
