//! Numerical type aliases and sparse-assembly helpers
//!
//! Global matrices are assembled from triplets gathered across elements and
//! nodes, so the `Triplet` type is the common currency between the element
//! kernels and the assembler.

use nalgebra::{DMatrix, DVector, SMatrix, SVector};
use nalgebra_sparse::{CooMatrix, CsrMatrix};
use serde::{Deserialize, Serialize};

/// Dense dynamically-sized matrix
pub type Mat = DMatrix<f64>;
/// Dense dynamically-sized vector
pub type Vec = DVector<f64>;

/// 2-vector of generalised strain/stress (axial, curvature) / (N, M)
pub type Vec2 = SVector<f64, 2>;
/// 3-vector of deformational freedoms (delta, theta1, theta2)
pub type Vec3 = SVector<f64, 3>;
/// Element-level global displacement / resistance vector
pub type Vec12 = SVector<f64, 12>;

/// 2x2 constitutive matrix
pub type Mat2 = SMatrix<f64, 2, 2>;
/// 3x3 local stiffness of the corotational elements
pub type Mat3 = SMatrix<f64, 3, 3>;
/// 12x12 element contribution to the global stiffness
pub type Mat12 = SMatrix<f64, 12, 12>;
/// 3x12 corotational transformation (d over U)
pub type Mat3x12 = SMatrix<f64, 3, 12>;
/// 6x12 small-rotation transformation of the linear element
pub type Mat6x12 = SMatrix<f64, 6, 12>;

/// A single sparse matrix/vector contribution
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Triplet {
    pub row: usize,
    pub col: usize,
    pub value: f64,
}

impl Triplet {
    pub fn new(row: usize, col: usize, value: f64) -> Self {
        Self { row, col, value }
    }
}

/// Build a CSR matrix of the given dimensions from accumulated triplets
pub fn csr_from_triplets(nrows: usize, ncols: usize, triplets: &[Triplet]) -> CsrMatrix<f64> {
    let mut coo = CooMatrix::new(nrows, ncols);
    for t in triplets {
        coo.push(t.row, t.col, t.value);
    }
    CsrMatrix::from(&coo)
}

/// Accumulate row-indexed triplets into a dense vector of the given length
pub fn vec_from_triplets(len: usize, triplets: &[Triplet]) -> Vec {
    let mut v = Vec::zeros(len);
    for t in triplets {
        v[t.row] += t.value;
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csr_accumulates_duplicates() {
        let triplets = vec![
            Triplet::new(0, 0, 1.0),
            Triplet::new(0, 0, 2.0),
            Triplet::new(1, 0, -1.0),
        ];
        let csr = csr_from_triplets(2, 2, &triplets);
        let dense = DMatrix::from(&csr);
        assert_eq!(dense[(0, 0)], 3.0);
        assert_eq!(dense[(1, 0)], -1.0);
        assert_eq!(dense[(1, 1)], 0.0);
    }

    #[test]
    fn test_vec_from_triplets() {
        let triplets = vec![Triplet::new(2, 0, 4.0), Triplet::new(2, 0, -1.0)];
        let v = vec_from_triplets(4, &triplets);
        assert_eq!(v[2], 3.0);
        assert_eq!(v.len(), 4);
    }
}
