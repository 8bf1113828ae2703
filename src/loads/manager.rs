//! Load manager - creates nodal loads and drives their incrementation

use crate::error::BlazeResult;
use crate::loads::NodalLoad;
use crate::mesh::{GlobalMesh, Ownership};

/// Creates [`NodalLoad`] objects against the mesh and increments them as the
/// load factor advances.
#[derive(Debug, Clone, Default)]
pub struct LoadManager {
    nodal_loads: Vec<NodalLoad>,
}

impl LoadManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a nodal load from a user id list. Only ids owned by the
    /// calling rank are kept; loads live on the rank that owns the node.
    pub fn create_a_nodal_load_by_id(
        &mut self,
        node_ids: &[u32],
        dofs: &[usize],
        loads: &[f64],
        mesh: &GlobalMesh,
    ) -> BlazeResult<()> {
        let owned_ids = mesh.filter_node_ids(node_ids.iter().copied(), Ownership::Owned);
        let mut nodal_load = NodalLoad::new();
        nodal_load.assign_dofs_loads(dofs, loads)?;
        nodal_load.assign_nodes_by_record_id(owned_ids);
        self.nodal_loads.push(nodal_load);
        Ok(())
    }

    pub fn nodal_loads(&self) -> &[NodalLoad] {
        &self.nodal_loads
    }

    /// Register every loaded DoF with a zero load so incrementation never
    /// has to special-case the first step.
    pub fn initialise_loads(&self, mesh: &mut GlobalMesh) -> BlazeResult<()> {
        for nodal_load in &self.nodal_loads {
            for (node_id, dof, _) in nodal_load.increments(0.0) {
                mesh.load_node(node_id, dof, 0.0)?;
            }
        }
        Ok(())
    }

    /// Scale every reference load by the load-factor increment and push it
    /// onto the owning nodes.
    pub fn increment_loads(
        &self,
        load_factor_increment: f64,
        mesh: &mut GlobalMesh,
    ) -> BlazeResult<()> {
        for nodal_load in &self.nodal_loads {
            for (node_id, dof, increment) in nodal_load.increments(load_factor_increment) {
                mesh.increment_node_load(node_id, dof, increment)?;
            }
        }
        Ok(())
    }
}
