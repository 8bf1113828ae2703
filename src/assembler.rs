//! Assembler: gathers element and nodal triplets into the global system
//!
//! Per Newton iteration the assembler pushes the current displacements into
//! the nodes, collects the stiffness and resistance triplets the elements
//! emitted, builds the load vector from the nodal load triplets, and forms
//! the out-of-balance vector `G = R - P`. The displacement vector `U` is
//! replicated at full length on every rank, so mapping it back into owned
//! and interface nodes needs no further communication; `K`, `P`, and `R`
//! hold only the rows this rank owns.

use crate::comms::Collective;
use crate::error::{BlazeError, BlazeResult};
use crate::math::{vec_from_triplets, Triplet};
use crate::mesh::GlobalMesh;

type DVec = crate::math::Vec;

/// Per-rank global matrices and vectors of the incremental solution.
#[derive(Debug)]
pub struct Assembler {
    ndofs: usize,
    /// Stiffness triplets for the rows this rank owns
    k_triplets: Vec<Triplet>,
    /// Load vector (owned rows)
    p: DVec,
    /// Resistance vector (owned rows)
    r: DVec,
    /// Out-of-balance vector G = R - P (owned rows)
    g: DVec,
    /// Displacement vector, full length, replicated on every rank
    u: DVec,
    /// Last solution increment
    du: DVec,
    /// Global l2 norm of G from the last convergence check
    g_max: f64,
}

impl Default for Assembler {
    fn default() -> Self {
        Self {
            ndofs: 0,
            k_triplets: Vec::new(),
            p: DVec::zeros(0),
            r: DVec::zeros(0),
            g: DVec::zeros(0),
            u: DVec::zeros(0),
            du: DVec::zeros(0),
            g_max: 0.0,
        }
    }
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Size the global vectors for the mesh's DoF count. Call once the
    /// restraints are final, and again after any fixity change.
    pub fn initialise_global_matrices(&mut self, mesh: &GlobalMesh) {
        self.ndofs = mesh.ndofs();
        self.p = DVec::zeros(self.ndofs);
        self.r = DVec::zeros(self.ndofs);
        self.g = DVec::zeros(self.ndofs);
        self.u = DVec::zeros(self.ndofs);
        self.du = DVec::zeros(self.ndofs);
        self.k_triplets.clear();
    }

    /// Copy the replicated `U` into the nodal displacement arrays of owned
    /// and interface nodes alike, in sorted-active-DoF order.
    pub fn map_u_to_nodes(&self, mesh: &mut GlobalMesh) -> BlazeResult<()> {
        for node in mesh.nodes_mut() {
            let nz_i = node.nz_i();
            let dofs: Vec<usize> = node.active_dofs().iter().copied().collect();
            for (position, dof) in dofs.into_iter().enumerate() {
                node.set_nodal_displacement(dof, self.u[nz_i + position])?;
            }
        }
        for node in mesh.interface_nodes_mut() {
            let nz_i = node.nz_i();
            let dofs: Vec<usize> = node.active_dofs().iter().copied().collect();
            for (position, dof) in dofs.into_iter().enumerate() {
                node.set_nodal_displacement(dof, self.u[nz_i + position])?;
            }
        }
        Ok(())
    }

    /// Collect the stiffness, resistance, and load triplets of this rank
    /// into `K`, `R`, and `P`.
    pub fn assemble_global_contributions(&mut self, mesh: &mut GlobalMesh) {
        mesh.calc_nodal_contributions_to_p();

        let expected: usize = mesh.elements().iter().map(|e| e.stiffness_map_len()).sum();
        self.k_triplets.clear();
        self.k_triplets.reserve(expected);
        let mut r_triplets = Vec::new();
        for elem in mesh.elements() {
            self.k_triplets.extend_from_slice(elem.stiffness_triplets());
            r_triplets.extend_from_slice(elem.resistance_triplets());
        }
        self.r = vec_from_triplets(self.ndofs, &r_triplets);

        let mut p_triplets = Vec::new();
        for node in mesh.nodes() {
            p_triplets.extend_from_slice(node.load_triplets());
        }
        self.p = vec_from_triplets(self.ndofs, &p_triplets);
    }

    /// Form G = R - P on the owned rows.
    pub fn calculate_out_of_balance(&mut self) {
        self.g = &self.r - &self.p;
    }

    /// Compute the global l2 norm of G from all-gathered per-rank partial
    /// sums, so every rank takes the same convergence decision.
    pub fn check_convergence(
        &mut self,
        tolerance: f64,
        load_factor: f64,
        comm: &dyn Collective,
    ) -> BlazeResult<bool> {
        let partial = self.g.norm_squared();
        let partials = comm.all_gather_f64(partial)?;
        let total: f64 = partials.iter().sum();
        self.g_max = total.sqrt();
        if !self.g_max.is_finite() {
            return Err(BlazeError::NonFiniteResidual { load_factor });
        }
        Ok(self.g_max < tolerance)
    }

    /// Apply the last solution increment.
    pub fn increment_u(&mut self) {
        self.u += &self.du;
    }

    /// Out-of-balance triplets of the rows in this rank's range, for the
    /// gather to the solving rank.
    pub fn g_triplets(&self, row_start: usize, row_count: usize) -> Vec<Triplet> {
        (row_start..row_start + row_count)
            .map(|row| Triplet::new(row, 0, self.g[row]))
            .collect()
    }

    pub fn k_triplets(&self) -> &[Triplet] {
        &self.k_triplets
    }

    pub fn set_du(&mut self, du: Vec<f64>) {
        self.du = DVec::from_vec(du);
    }

    pub fn ndofs(&self) -> usize {
        self.ndofs
    }

    pub fn u(&self) -> &DVec {
        &self.u
    }

    pub fn du(&self) -> &DVec {
        &self.du
    }

    pub fn p(&self) -> &DVec {
        &self.p
    }

    pub fn r(&self) -> &DVec {
        &self.r
    }

    pub fn g(&self) -> &DVec {
        &self.g
    }

    pub fn g_max(&self) -> f64 {
        self.g_max
    }

    /// Reset displacements and increments, keeping the sizing. Used when
    /// re-running an analysis on the same mesh.
    pub fn reset_solution(&mut self) {
        self.u.fill(0.0);
        self.du.fill(0.0);
        self.g_max = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comms::SerialCollective;
    use crate::elements::section::{BasicSection, Section};
    use crate::elements::ElementType;

    fn small_mesh() -> GlobalMesh {
        let mut mesh = GlobalMesh::new(
            ElementType::LinearElastic,
            Section::Basic(BasicSection::new(2.06e11, 0.0125, 4.57e-4)),
        );
        mesh.create_line_mesh(2, [[0.0; 3], [2.0, 0.0, 0.0]], &SerialCollective)
            .unwrap();
        mesh
    }

    #[test]
    fn test_load_vector_assembly() {
        let mut mesh = small_mesh();
        mesh.load_node(3, 2, -1000.0).unwrap();
        mesh.map_element_stiffnesses();
        mesh.update_elements_states();

        let mut assembler = Assembler::new();
        assembler.initialise_global_matrices(&mesh);
        assembler.assemble_global_contributions(&mut mesh);
        // node 3 starts at nz_i = 12; dof 2 is its third active freedom
        assert_eq!(assembler.p()[14], -1000.0);
        assert_eq!(assembler.p().iter().filter(|v| **v != 0.0).count(), 1);
    }

    #[test]
    fn test_out_of_balance_equals_load_at_zero_displacement() {
        let mut mesh = small_mesh();
        mesh.load_node(3, 2, -1000.0).unwrap();
        mesh.map_element_stiffnesses();
        mesh.update_elements_states();

        let mut assembler = Assembler::new();
        assembler.initialise_global_matrices(&mesh);
        assembler.assemble_global_contributions(&mut mesh);
        assembler.calculate_out_of_balance();
        let converged = assembler
            .check_convergence(1e-6, 0.1, &SerialCollective)
            .unwrap();
        assert!(!converged);
        assert!((assembler.g_max() - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_map_u_to_nodes_respects_active_order() {
        let mut mesh = small_mesh();
        mesh.fix_node(2, 1).unwrap();
        mesh.fix_node(2, 3).unwrap();
        mesh.count_and_exchange_distributed_dofs(&SerialCollective)
            .unwrap();

        let mut assembler = Assembler::new();
        assembler.initialise_global_matrices(&mesh);
        let ndofs = assembler.ndofs();
        assert_eq!(ndofs, 16);
        assembler.set_du((0..ndofs).map(|i| i as f64).collect());
        assembler.increment_u();
        assembler.map_u_to_nodes(&mut mesh).unwrap();

        let node2 = mesh.node_by_record_id(2, crate::mesh::Ownership::Owned).unwrap();
        // node 2 has active freedoms {0, 2, 4, 5} starting at nz_i = 6
        assert_eq!(node2.nodal_displacement(0), 6.0);
        assert_eq!(node2.nodal_displacement(2), 7.0);
        assert_eq!(node2.nodal_displacement(4), 8.0);
        assert_eq!(node2.nodal_displacement(5), 9.0);
        assert_eq!(node2.nodal_displacement(1), 0.0);
    }
}
