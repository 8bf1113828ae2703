//! Nodal restraints and their manager
//!
//! A restraint groups a set of similarly-fixed nodes with the freedoms it
//! removes. Applying it moves those freedoms to the nodes' inactive sets;
//! the mesh then recounts and re-exchanges the DoF numbering, because
//! removing a row and column shifts every index behind it.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::comms::Collective;
use crate::error::BlazeResult;
use crate::mesh::{GlobalMesh, Ownership};

/// Restraint conditions for a set of similarly-restrained nodes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodalRestraint {
    node_record_ids: BTreeSet<u32>,
    restrained_dofs: BTreeSet<usize>,
    /// Negative DoF shorthand: fix all six freedoms
    fix_all: bool,
}

impl NodalRestraint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign the freedoms this restraint removes. A negative index means
    /// "all six".
    pub fn assign_dofs<I: IntoIterator<Item = i32>>(&mut self, dofs: I) {
        for dof in dofs {
            if dof < 0 {
                self.fix_all = true;
            } else {
                self.restrained_dofs.insert(dof as usize);
            }
        }
    }

    /// Assign the nodes this restraint applies to, by record id.
    pub fn assign_nodes_by_record_id<I: IntoIterator<Item = u32>>(&mut self, node_ids: I) {
        self.node_record_ids.extend(node_ids);
    }

    pub fn restrained_dofs(&self) -> &BTreeSet<usize> {
        &self.restrained_dofs
    }

    pub fn node_record_ids(&self) -> &BTreeSet<u32> {
        &self.node_record_ids
    }

    /// Fix the listed freedoms on every copy of the listed nodes present on
    /// this rank. Halo copies must mirror the parent's active set so that
    /// column mapping agrees across ranks, so the id filter spans owned and
    /// interface nodes alike.
    pub fn apply(&self, mesh: &mut GlobalMesh) -> BlazeResult<()> {
        let present = mesh.filter_node_ids(self.node_record_ids.iter().copied(), Ownership::All);
        for record_id in present {
            if self.fix_all {
                mesh.fix_node(record_id, -1)?;
            } else {
                for dof in &self.restrained_dofs {
                    mesh.fix_node(record_id, *dof as i32)?;
                }
            }
        }
        Ok(())
    }
}

/// Creates restraints and applies them to the mesh in one pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RestraintManager {
    restraints: Vec<NodalRestraint>,
}

impl RestraintManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, restraint: NodalRestraint) {
        self.restraints.push(restraint);
    }

    /// Build and register a restraint in one call.
    pub fn create_a_nodal_restraint<D, N>(&mut self, dofs: D, node_ids: N)
    where
        D: IntoIterator<Item = i32>,
        N: IntoIterator<Item = u32>,
    {
        let mut restraint = NodalRestraint::new();
        restraint.assign_dofs(dofs);
        restraint.assign_nodes_by_record_id(node_ids);
        self.restraints.push(restraint);
    }

    pub fn restraints(&self) -> &[NodalRestraint] {
        &self.restraints
    }

    /// Apply every restraint, then recount and re-exchange the distributed
    /// DoF numbering.
    pub fn apply_restraints(
        &self,
        mesh: &mut GlobalMesh,
        comm: &dyn Collective,
    ) -> BlazeResult<()> {
        for restraint in &self.restraints {
            restraint.apply(mesh)?;
        }
        mesh.count_and_exchange_distributed_dofs(comm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_dof_means_fix_all() {
        let mut restraint = NodalRestraint::new();
        restraint.assign_dofs([-1]);
        assert!(restraint.fix_all);
        assert!(restraint.restrained_dofs().is_empty());
    }

    #[test]
    fn test_dof_collection() {
        let mut restraint = NodalRestraint::new();
        restraint.assign_dofs([1, 3, 4, 3]);
        assert_eq!(
            restraint.restrained_dofs().iter().copied().collect::<Vec<_>>(),
            vec![1, 3, 4]
        );
    }

    #[test]
    fn test_manager_applies_and_recounts() {
        use crate::comms::SerialCollective;
        use crate::elements::section::{BasicSection, Section};
        use crate::elements::ElementType;

        let mut mesh = GlobalMesh::new(
            ElementType::LinearElastic,
            Section::Basic(BasicSection::new(1.0, 1.0, 1.0)),
        );
        mesh.create_line_mesh(2, [[0.0; 3], [2.0, 0.0, 0.0]], &SerialCollective)
            .unwrap();

        let mut manager = RestraintManager::new();
        manager.create_a_nodal_restraint([-1], [1u32]);
        manager.create_a_nodal_restraint([1, 3, 4], [2u32, 3]);
        manager
            .apply_restraints(&mut mesh, &SerialCollective)
            .unwrap();

        // 18 freedoms minus a full clamp and two out-of-plane sets
        assert_eq!(mesh.ndofs(), 6);
        let node3 = mesh
            .node_by_record_id(3, Ownership::Owned)
            .unwrap();
        assert_eq!(node3.nz_i(), 3);
    }
}
