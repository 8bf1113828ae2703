//! Displacement history: records and the scribe that fills them
//!
//! Each record tracks one node's chosen freedoms; the scribe samples every
//! record once per converged load step. Records are keyed by the node's
//! stable record id, not the renumbered id, so histories from different
//! rank counts line up.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{BlazeError, BlazeResult};
use crate::mesh::{GlobalMesh, Ownership};

/// Displacement samples of one tracked node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    tracked_node_record_id: u32,
    tracked_dofs: BTreeSet<usize>,
    /// One sample vector per freedom
    recorded_data: [Vec<f64>; 6],
}

impl Record {
    fn new(tracked_node_record_id: u32, tracked_dofs: BTreeSet<usize>) -> Self {
        Self {
            tracked_node_record_id,
            tracked_dofs,
            recorded_data: Default::default(),
        }
    }

    pub fn tracked_node_record_id(&self) -> u32 {
        self.tracked_node_record_id
    }

    pub fn tracked_dofs(&self) -> &BTreeSet<usize> {
        &self.tracked_dofs
    }

    /// The ordered displacement samples of one freedom.
    pub fn dof_history(&self, dof: usize) -> &[f64] {
        &self.recorded_data[dof]
    }

    fn write(&mut self, mesh: &GlobalMesh) -> BlazeResult<()> {
        let node = mesh.node_by_record_id(self.tracked_node_record_id, Ownership::Owned)?;
        for dof in &self.tracked_dofs {
            self.recorded_data[*dof].push(node.nodal_displacement(*dof));
        }
        Ok(())
    }
}

/// Samples tracked freedoms into records at each converged step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scribe {
    record_library: Vec<Record>,
}

impl Scribe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a set of freedoms on the listed nodes. Ids not owned by this
    /// rank are skipped; their parent rank tracks them.
    pub fn track_nodes_by_id<I, D>(&mut self, node_ids: I, dofs: D, mesh: &GlobalMesh)
    where
        I: IntoIterator<Item = u32>,
        D: IntoIterator<Item = usize>,
    {
        let dofs: BTreeSet<usize> = dofs.into_iter().collect();
        let owned = mesh.filter_node_ids(node_ids, Ownership::Owned);
        for node_id in owned {
            self.record_library.push(Record::new(node_id, dofs.clone()));
        }
        self.record_library
            .sort_by_key(|r| r.tracked_node_record_id);
    }

    /// Sample every record from the current nodal displacements.
    pub fn write_to_records(&mut self, mesh: &GlobalMesh) -> BlazeResult<()> {
        for record in &mut self.record_library {
            record.write(mesh)?;
        }
        Ok(())
    }

    pub fn record_library(&self) -> &[Record] {
        &self.record_library
    }

    /// The record of one node, by record id.
    pub fn record_for(&self, node_record_id: u32) -> BlazeResult<&Record> {
        self.record_library
            .iter()
            .find(|r| r.tracked_node_record_id == node_record_id)
            .ok_or(BlazeError::NodeNotFound(node_record_id, "record library"))
    }

    pub fn clear_record_library(&mut self) {
        self.record_library.clear();
    }
}
