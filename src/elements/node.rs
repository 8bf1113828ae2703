//! Node - a mesh point with controllable degrees of freedom
//!
//! Each node carries six freedoms indexed 0..=5 and ordered
//! `(u_x, th_x, u_y, th_y, u_z, th_z)`, so the in-plane freedoms of a 2D
//! frame are {0, 2, 5} and the out-of-plane freedoms are {1, 3, 4}.
//! Restraining a freedom moves it from the active to the inactive set; only
//! active freedoms occupy rows and columns of the global matrices.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{BlazeError, BlazeResult};
use crate::math::Triplet;

/// Number of freedoms per node
pub const DOFS_PER_NODE: usize = 6;

/// A mesh node with distributed-ownership metadata.
///
/// A node keeps two identifiers: `record_id` is the stable id it was read in
/// with, and `id` is the contiguous id assigned after partitioning. Interface
/// copies of a node on a non-parent rank carry the parent's `id` and `nz_i`
/// but never emit row contributions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Stable id from the input sequences
    record_id: u32,
    /// Distributable id assigned during renumbering
    id: u32,
    /// x, y, z coordinates
    coordinates: [f64; 3],
    /// Freedoms that occupy global rows/columns
    active_dofs: BTreeSet<usize>,
    /// Freedoms removed by restraints
    inactive_dofs: BTreeSet<usize>,
    /// Freedoms with an applied load
    loaded_dofs: BTreeSet<usize>,
    /// Current applied load per freedom
    nodal_loads: [f64; 6],
    /// Current displacement per freedom
    nodal_displacements: [f64; 6],
    /// First global row occupied by this node's active freedoms
    nz_i: usize,
    /// Rank that owns this node's freedoms
    parent_rank: usize,
    /// Whether the rank holding this copy is the parent rank
    on_parent_rank: bool,
    /// Ids of elements connected to this node
    connected_elements: BTreeSet<u32>,
    /// Load contributions to the global load vector
    #[serde(skip)]
    load_triplets: Vec<Triplet>,
}

impl Node {
    /// Create a new node with all six freedoms active.
    pub fn new(record_id: u32, coordinates: [f64; 3]) -> Self {
        Self {
            record_id,
            id: record_id,
            coordinates,
            active_dofs: (0..DOFS_PER_NODE).collect(),
            inactive_dofs: BTreeSet::new(),
            loaded_dofs: BTreeSet::new(),
            nodal_loads: [0.0; 6],
            nodal_displacements: [0.0; 6],
            nz_i: 0,
            parent_rank: 0,
            on_parent_rank: true,
            connected_elements: BTreeSet::new(),
            load_triplets: Vec::new(),
        }
    }

    pub fn record_id(&self) -> u32 {
        self.record_id
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn set_id(&mut self, id: u32) {
        self.id = id;
    }

    pub fn coords(&self) -> [f64; 3] {
        self.coordinates
    }

    /// Distance to another node
    pub fn distance_to(&self, other: &Node) -> f64 {
        let dx = other.coordinates[0] - self.coordinates[0];
        let dy = other.coordinates[1] - self.coordinates[1];
        let dz = other.coordinates[2] - self.coordinates[2];
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Number of active freedoms
    pub fn ndof(&self) -> usize {
        self.active_dofs.len()
    }

    pub fn active_dofs(&self) -> &BTreeSet<usize> {
        &self.active_dofs
    }

    pub fn inactive_dofs(&self) -> &BTreeSet<usize> {
        &self.inactive_dofs
    }

    fn check_dof(dof: usize) -> BlazeResult<()> {
        if dof < DOFS_PER_NODE {
            Ok(())
        } else {
            Err(BlazeError::InvalidDof(dof as i32))
        }
    }

    /// Deactivate a freedom, removing its row and column everywhere.
    pub fn fix_dof(&mut self, dof: usize) -> BlazeResult<()> {
        Self::check_dof(dof)?;
        self.active_dofs.remove(&dof);
        self.inactive_dofs.insert(dof);
        Ok(())
    }

    /// Reactivate a freedom.
    pub fn free_dof(&mut self, dof: usize) -> BlazeResult<()> {
        Self::check_dof(dof)?;
        self.inactive_dofs.remove(&dof);
        self.active_dofs.insert(dof);
        Ok(())
    }

    /// Fix several freedoms at once.
    pub fn fix_dofs<I: IntoIterator<Item = usize>>(&mut self, dofs: I) -> BlazeResult<()> {
        for dof in dofs {
            self.fix_dof(dof)?;
        }
        Ok(())
    }

    /// Free several freedoms at once.
    pub fn free_dofs<I: IntoIterator<Item = usize>>(&mut self, dofs: I) -> BlazeResult<()> {
        for dof in dofs {
            self.free_dof(dof)?;
        }
        Ok(())
    }

    pub fn fix_all_dofs(&mut self) {
        self.inactive_dofs.extend(0..DOFS_PER_NODE);
        self.active_dofs.clear();
    }

    pub fn free_all_dofs(&mut self) {
        self.active_dofs.extend(0..DOFS_PER_NODE);
        self.inactive_dofs.clear();
    }

    /// Set the applied load on a freedom.
    pub fn add_nodal_load(&mut self, load: f64, dof: usize) -> BlazeResult<()> {
        Self::check_dof(dof)?;
        self.nodal_loads[dof] = load;
        self.loaded_dofs.insert(dof);
        Ok(())
    }

    /// Add a load increment to an already-loaded freedom.
    pub fn increment_nodal_load(&mut self, increment: f64, dof: usize) -> BlazeResult<()> {
        Self::check_dof(dof)?;
        self.nodal_loads[dof] += increment;
        self.loaded_dofs.insert(dof);
        Ok(())
    }

    pub fn clear_nodal_loads(&mut self) {
        self.nodal_loads = [0.0; 6];
        self.loaded_dofs.clear();
    }

    pub fn loaded_dofs(&self) -> &BTreeSet<usize> {
        &self.loaded_dofs
    }

    pub fn nodal_loads(&self) -> [f64; 6] {
        self.nodal_loads
    }

    /// Fail if any freedom is both restrained and loaded.
    pub fn check_loads(&self) -> BlazeResult<()> {
        for dof in &self.loaded_dofs {
            if self.inactive_dofs.contains(dof) {
                return Err(BlazeError::LoadedRestrainedDof {
                    node_id: self.record_id,
                    dof: *dof,
                });
            }
        }
        Ok(())
    }

    pub fn set_nz_i(&mut self, nz_i: usize) {
        self.nz_i = nz_i;
    }

    pub fn increment_nz_i(&mut self, shift: usize) {
        self.nz_i += shift;
    }

    pub fn nz_i(&self) -> usize {
        self.nz_i
    }

    /// Record which rank owns this node's freedoms and which rank holds this
    /// copy.
    pub fn set_parent_rank(&mut self, parent_rank: usize, current_rank: usize) {
        self.parent_rank = parent_rank;
        self.on_parent_rank = parent_rank == current_rank;
    }

    pub fn parent_rank(&self) -> usize {
        self.parent_rank
    }

    pub fn is_on_parent_rank(&self) -> bool {
        self.on_parent_rank
    }

    /// Global row/column indices of the active freedoms, in sorted-DoF order.
    pub fn dofs_numbers(&self) -> Vec<usize> {
        (0..self.ndof()).map(|i| self.nz_i + i).collect()
    }

    pub fn set_nodal_displacement(&mut self, dof: usize, value: f64) -> BlazeResult<()> {
        Self::check_dof(dof)?;
        self.nodal_displacements[dof] = value;
        Ok(())
    }

    pub fn nodal_displacement(&self, dof: usize) -> f64 {
        self.nodal_displacements[dof]
    }

    pub fn nodal_displacements(&self) -> [f64; 6] {
        self.nodal_displacements
    }

    pub fn add_connected_element(&mut self, element_id: u32) {
        self.connected_elements.insert(element_id);
    }

    pub fn connected_elements(&self) -> &BTreeSet<u32> {
        &self.connected_elements
    }

    /// Convert the applied loads into load-vector triplets.
    ///
    /// Each active loaded freedom emits `(nz_i + position-in-active-set, 0,
    /// load)`. Interface copies emit nothing; their parent rank owns the rows.
    pub fn compute_load_triplets(&mut self) {
        self.load_triplets.clear();
        if !self.on_parent_rank {
            return;
        }
        for (position, dof) in self.active_dofs.iter().enumerate() {
            if self.loaded_dofs.contains(dof) {
                self.load_triplets
                    .push(Triplet::new(self.nz_i + position, 0, self.nodal_loads[*dof]));
            }
        }
    }

    pub fn load_triplets(&self) -> &[Triplet] {
        &self.load_triplets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_node_has_six_active_dofs() {
        let node = Node::new(1, [1.0, 2.0, 3.0]);
        assert_eq!(node.ndof(), 6);
        assert!(node.inactive_dofs().is_empty());
        assert_eq!(node.coords(), [1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_fix_and_free_dof() {
        let mut node = Node::new(1, [0.0; 3]);
        node.fix_dof(2).unwrap();
        assert_eq!(node.ndof(), 5);
        assert!(node.inactive_dofs().contains(&2));
        node.free_dof(2).unwrap();
        assert_eq!(node.ndof(), 6);
    }

    #[test]
    fn test_invalid_dof_rejected() {
        let mut node = Node::new(1, [0.0; 3]);
        assert!(matches!(node.fix_dof(6), Err(BlazeError::InvalidDof(6))));
        assert!(matches!(
            node.add_nodal_load(1.0, 9),
            Err(BlazeError::InvalidDof(9))
        ));
    }

    #[test]
    fn test_loaded_restrained_dof_detected() {
        let mut node = Node::new(4, [0.0; 3]);
        node.add_nodal_load(-1e3, 2).unwrap();
        node.fix_dof(2).unwrap();
        assert!(matches!(
            node.check_loads(),
            Err(BlazeError::LoadedRestrainedDof { node_id: 4, dof: 2 })
        ));
    }

    #[test]
    fn test_load_triplets_respect_active_positions() {
        let mut node = Node::new(1, [0.0; 3]);
        // out-of-plane freedoms fixed, load on th_z which becomes the third
        // active freedom (after u_x and u_y)
        node.fix_dofs([1, 3, 4]).unwrap();
        node.add_nodal_load(5.0, 5).unwrap();
        node.set_nz_i(10);
        node.compute_load_triplets();
        let triplets = node.load_triplets();
        assert_eq!(triplets.len(), 1);
        assert_eq!(triplets[0].row, 12);
        assert_eq!(triplets[0].value, 5.0);
    }

    #[test]
    fn test_interface_copy_emits_no_load_triplets() {
        let mut node = Node::new(1, [0.0; 3]);
        node.add_nodal_load(5.0, 0).unwrap();
        node.set_parent_rank(1, 0);
        node.compute_load_triplets();
        assert!(node.load_triplets().is_empty());
    }

    #[test]
    fn test_dofs_numbers_are_consecutive() {
        let mut node = Node::new(1, [0.0; 3]);
        node.fix_dofs([1, 3, 4]).unwrap();
        node.set_nz_i(7);
        assert_eq!(node.dofs_numbers(), vec![7, 8, 9]);
    }
}
