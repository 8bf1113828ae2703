//! Nodal load - a reference load pattern scaled by the load factor

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{BlazeError, BlazeResult};

/// A reference load applied to a set of similarly-loaded nodes.
///
/// The magnitudes are the full reference values; the solution procedure
/// applies them in `delta-lambda`-sized increments through
/// [`NodalLoad::increments`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodalLoad {
    /// Record ids of loaded nodes, filtered to the owning rank at creation
    node_record_ids: BTreeSet<u32>,
    loaded_dofs: BTreeSet<usize>,
    magnitudes: [f64; 6],
}

impl NodalLoad {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pair DoFs with reference magnitudes, one-to-one in order.
    pub fn assign_dofs_loads(&mut self, dofs: &[usize], loads: &[f64]) -> BlazeResult<()> {
        if dofs.len() != loads.len() {
            return Err(BlazeError::MismatchedDofsLoads {
                dofs: dofs.len(),
                loads: loads.len(),
            });
        }
        for (dof, load) in dofs.iter().zip(loads.iter()) {
            if *dof >= 6 {
                return Err(BlazeError::InvalidDof(*dof as i32));
            }
            self.loaded_dofs.insert(*dof);
            self.magnitudes[*dof] = *load;
        }
        Ok(())
    }

    pub fn assign_nodes_by_record_id<I: IntoIterator<Item = u32>>(&mut self, node_ids: I) {
        self.node_record_ids.extend(node_ids);
    }

    pub fn node_record_ids(&self) -> &BTreeSet<u32> {
        &self.node_record_ids
    }

    pub fn loaded_dofs(&self) -> &BTreeSet<usize> {
        &self.loaded_dofs
    }

    pub fn magnitudes(&self) -> [f64; 6] {
        self.magnitudes
    }

    /// The `(node, dof, increment)` stream for a load-factor increment.
    pub fn increments(
        &self,
        load_factor_increment: f64,
    ) -> impl Iterator<Item = (u32, usize, f64)> + '_ {
        self.node_record_ids.iter().flat_map(move |node_id| {
            self.loaded_dofs
                .iter()
                .map(move |dof| (*node_id, *dof, self.magnitudes[*dof] * load_factor_increment))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mismatched_lengths_rejected() {
        let mut load = NodalLoad::new();
        let result = load.assign_dofs_loads(&[2, 5], &[1.0]);
        assert!(matches!(
            result,
            Err(BlazeError::MismatchedDofsLoads { dofs: 2, loads: 1 })
        ));
    }

    #[test]
    fn test_increments_scale_by_load_factor() {
        let mut load = NodalLoad::new();
        load.assign_dofs_loads(&[2], &[-1e5]).unwrap();
        load.assign_nodes_by_record_id([3, 7]);
        let increments: Vec<_> = load.increments(0.1).collect();
        assert_eq!(increments, vec![(3, 2, -1e4), (7, 2, -1e4)]);
    }
}
