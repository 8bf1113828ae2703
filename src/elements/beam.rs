//! Beam-column elements: linear, nonlinear elastic, and nonlinear plastic
//!
//! All three kinds share one struct and dispatch on [`ElementType`]. A 2D
//! beam-column carries 3 deformational freedoms (stretch and two end
//! rotations); the linear element works with the classic 6-freedom local
//! vector instead. Either way the element maps to the 12 global freedoms of
//! its two nodes, and emits sparse triplets for the rows its parent-rank
//! nodes own.

use nalgebra::{SMatrix, SVector};
use serde::{Deserialize, Serialize};

use crate::elements::node::{Node, DOFS_PER_NODE};
use crate::elements::section::Section;
use crate::elements::transform::CorotationalTransform;
use crate::error::{BlazeError, BlazeResult};
use crate::math::{Mat, Mat12, Triplet, Vec12, Vec2};

type DVec = crate::math::Vec;

/// Element formulation selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementType {
    /// Small-displacement Euler-Bernoulli element
    LinearElastic,
    /// Corotational Euler-Bernoulli element
    NonlinearElastic,
    /// Corotational element with fibre-section plasticity at Gauss points
    NonlinearPlastic,
}

/// Non-owning handle to a node in one of the mesh arenas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeSlot {
    /// Index into the rank-owned node vector
    Owned(usize),
    /// Index into the interface (halo) node vector
    Interface(usize),
}

impl NodeSlot {
    pub fn resolve<'a>(&self, owned: &'a [Node], interface: &'a [Node]) -> &'a Node {
        match self {
            NodeSlot::Owned(i) => &owned[*i],
            NodeSlot::Interface(i) => &interface[*i],
        }
    }
}

/// A two-node beam-column element.
#[derive(Debug, Clone)]
pub struct BeamElement {
    id: u32,
    kind: ElementType,
    node_slots: [NodeSlot; 2],
    initial_length: f64,
    transform: CorotationalTransform,
    /// One section copy per Gauss point
    sections: Vec<Section>,
    /// Gauss point locations, scaled to the initial length
    gauss_points_x: Vec<f64>,
    /// Gauss point weights, scaled to the initial length
    gauss_points_w: Vec<f64>,

    global_ele_u: Vec12,
    local_d: DVec,
    local_eps: Vec<Vec2>,
    local_stresses: Vec<Vec2>,
    b_matrices: Vec<Mat>,
    local_f: DVec,
    local_mat_stiffness: Mat,
    local_geom_stiffness: Mat,
    local_tangent_stiffness: Mat,
    external_geom_stiffness: Mat12,
    elem_global_stiffness: Mat12,
    global_resistance_forces: Vec12,

    /// `(local_row, local_col, global_row, global_col)` quadruples
    stiffness_map: Vec<[usize; 4]>,
    stiffness_triplets: Vec<Triplet>,
    resistance_triplets: Vec<Triplet>,
}

impl BeamElement {
    /// Create an element between two node handles.
    ///
    /// The plastic formulation requires a fibre section; the elastic
    /// formulations accept either variant through its E·A / E·I surface.
    pub fn new(
        id: u32,
        kind: ElementType,
        node_slots: [NodeSlot; 2],
        end_coords: [[f64; 3]; 2],
        section: &Section,
    ) -> BlazeResult<Self> {
        if matches!(kind, ElementType::NonlinearPlastic) && !matches!(section, Section::Fibre(_)) {
            return Err(BlazeError::InvalidInput(format!(
                "element {id}: the plastic formulation requires a fibre section"
            )));
        }

        let transform = CorotationalTransform::initialise(end_coords[0], end_coords[1]);
        let initial_length = transform.initial_length();
        if initial_length < 1e-12 {
            return Err(BlazeError::InvalidInput(format!(
                "element {id} has zero length"
            )));
        }

        let (gauss_points_x, gauss_points_w) = match kind {
            // midpoint evaluation for the elastic formulations
            ElementType::LinearElastic | ElementType::NonlinearElastic => {
                (vec![0.5 * initial_length], vec![initial_length])
            }
            // two-point Gauss over (0, L0)
            ElementType::NonlinearPlastic => {
                let a = 0.5 * (1.0 - 1.0 / 3f64.sqrt()) * initial_length;
                let b = 0.5 * (1.0 + 1.0 / 3f64.sqrt()) * initial_length;
                (vec![a, b], vec![0.5 * initial_length, 0.5 * initial_length])
            }
        };

        let ngauss = gauss_points_x.len();
        let local_ndofs = match kind {
            ElementType::LinearElastic => 6,
            _ => 3,
        };
        let b_cols = local_ndofs;

        Ok(Self {
            id,
            kind,
            node_slots,
            initial_length,
            transform,
            sections: vec![section.clone(); ngauss],
            gauss_points_x,
            gauss_points_w,
            global_ele_u: Vec12::zeros(),
            local_d: DVec::zeros(local_ndofs),
            local_eps: vec![Vec2::zeros(); ngauss],
            local_stresses: vec![Vec2::zeros(); ngauss],
            b_matrices: vec![Mat::zeros(2, b_cols); ngauss],
            local_f: DVec::zeros(local_ndofs),
            local_mat_stiffness: Mat::zeros(local_ndofs, local_ndofs),
            local_geom_stiffness: Mat::zeros(local_ndofs, local_ndofs),
            local_tangent_stiffness: Mat::zeros(local_ndofs, local_ndofs),
            external_geom_stiffness: Mat12::zeros(),
            elem_global_stiffness: Mat12::zeros(),
            global_resistance_forces: Vec12::zeros(),
            stiffness_map: Vec::new(),
            stiffness_triplets: Vec::new(),
            resistance_triplets: Vec::new(),
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn kind(&self) -> ElementType {
        self.kind
    }

    pub fn node_slots(&self) -> [NodeSlot; 2] {
        self.node_slots
    }

    pub fn initial_length(&self) -> f64 {
        self.initial_length
    }

    pub fn current_length(&self) -> f64 {
        self.transform.length()
    }

    /// Recompute strain, stress, force, and stiffness state from the current
    /// nodal displacements, then refresh the triplet buffers.
    pub fn update_state(&mut self, owned: &[Node], interface: &[Node]) {
        self.pull_u_from_nodes(owned, interface);
        match self.kind {
            ElementType::LinearElastic => self.update_linear(),
            ElementType::NonlinearElastic => self.update_nonlinear_elastic(),
            ElementType::NonlinearPlastic => self.update_nonlinear_plastic(),
        }
        self.populate_resistance_triplets(owned, interface);
        self.populate_stiffness_triplets();
    }

    fn pull_u_from_nodes(&mut self, owned: &[Node], interface: &[Node]) {
        for (node_i, slot) in self.node_slots.iter().enumerate() {
            let disp = slot.resolve(owned, interface).nodal_displacements();
            for (dof, value) in disp.iter().enumerate() {
                self.global_ele_u[node_i * DOFS_PER_NODE + dof] = *value;
            }
        }
    }

    // ---- linear kernel --------------------------------------------------

    fn update_linear(&mut self) {
        let l = self.initial_length;
        let lin_t = self.transform.linear_t();
        let d: SVector<f64, 6> = lin_t * self.global_ele_u;
        self.local_d = DVec::from_column_slice(d.as_slice());

        let x = self.gauss_points_x[0];
        let mut b = Mat::zeros(2, 6);
        b[(0, 0)] = -1.0 / l;
        b[(0, 3)] = 1.0 / l;
        b[(1, 1)] = -6.0 / (l * l) + 12.0 * x / (l * l * l);
        b[(1, 2)] = -4.0 / l + 6.0 * x / (l * l);
        b[(1, 4)] = 6.0 / (l * l) - 12.0 * x / (l * l * l);
        b[(1, 5)] = -2.0 / l + 6.0 * x / (l * l);

        let eps = &b * &self.local_d;
        self.local_eps[0] = Vec2::new(eps[0], eps[1]);
        self.b_matrices[0] = b;

        let d_t = self.sections[0].tangent_matrix();
        self.local_stresses[0] = d_t * self.local_eps[0];

        let ea = self.sections[0].ea();
        let ei = self.sections[0].ei();
        let mut k = Mat::zeros(6, 6);
        k[(0, 0)] = ea / l;
        k[(0, 3)] = -ea / l;
        k[(3, 0)] = -ea / l;
        k[(3, 3)] = ea / l;
        k[(1, 1)] = 12.0 * ei / l.powi(3);
        k[(1, 2)] = 6.0 * ei / l.powi(2);
        k[(1, 4)] = -12.0 * ei / l.powi(3);
        k[(1, 5)] = 6.0 * ei / l.powi(2);
        k[(2, 1)] = 6.0 * ei / l.powi(2);
        k[(2, 2)] = 4.0 * ei / l;
        k[(2, 4)] = -6.0 * ei / l.powi(2);
        k[(2, 5)] = 2.0 * ei / l;
        k[(4, 1)] = -12.0 * ei / l.powi(3);
        k[(4, 2)] = -6.0 * ei / l.powi(2);
        k[(4, 4)] = 12.0 * ei / l.powi(3);
        k[(4, 5)] = -6.0 * ei / l.powi(2);
        k[(5, 1)] = 6.0 * ei / l.powi(2);
        k[(5, 2)] = 2.0 * ei / l;
        k[(5, 4)] = -6.0 * ei / l.powi(2);
        k[(5, 5)] = 4.0 * ei / l;

        self.local_mat_stiffness = k;
        self.local_geom_stiffness = Mat::zeros(6, 6);
        self.local_tangent_stiffness = self.local_mat_stiffness.clone();

        self.local_f = &self.local_tangent_stiffness * &self.local_d;
        let f: SVector<f64, 6> = SVector::from_column_slice(self.local_f.as_slice());
        self.global_resistance_forces = lin_t.transpose() * f;

        let k_fixed: SMatrix<f64, 6, 6> =
            SMatrix::from_iterator(self.local_tangent_stiffness.iter().copied());
        self.external_geom_stiffness = Mat12::zeros();
        self.elem_global_stiffness = lin_t.transpose() * k_fixed * lin_t;
    }

    // ---- corotational kernels -------------------------------------------

    /// Midpoint generalised strain of the corotational formulation.
    fn corotational_eps(&self, x: f64) -> Vec2 {
        let l0 = self.initial_length;
        let delta = self.local_d[0];
        let theta1 = self.local_d[1];
        let theta2 = self.local_d[2];
        let axial = delta / l0
            + (2.0 * theta1 * theta1 - theta1 * theta2 + 2.0 * theta2 * theta2) / 30.0;
        let curvature = (-4.0 / l0 + 6.0 * x / (l0 * l0)) * theta1
            + (-2.0 / l0 + 6.0 * x / (l0 * l0)) * theta2;
        Vec2::new(axial, curvature)
    }

    /// The closed-form 3x3 geometric stiffness template of the rotational
    /// block.
    fn geometric_stiffness_template(&self, axial_force: f64) -> Mat {
        let fl = axial_force * self.initial_length;
        let mut k = Mat::zeros(3, 3);
        k[(1, 1)] = 4.0 * fl / 30.0;
        k[(2, 2)] = 4.0 * fl / 30.0;
        k[(1, 2)] = -fl / 30.0;
        k[(2, 1)] = -fl / 30.0;
        k
    }

    /// External geometric stiffness from the second derivatives of the
    /// deformational freedoms, with coefficients g1..g5 scaled by the local
    /// force components.
    fn external_geometric_stiffness(&self) -> Mat12 {
        let g1 = self.transform.g1();
        let g2 = self.transform.g2();
        let g3 = self.transform.g3();
        let g4 = self.transform.g4();
        let g5 = self.transform.g5();

        let mut d2delta = Mat12::zeros();
        d2delta[(0, 0)] = g5;
        d2delta[(0, 2)] = -g4;
        d2delta[(0, 6)] = -g5;
        d2delta[(0, 8)] = g4;
        d2delta[(2, 0)] = -g4;
        d2delta[(2, 2)] = g3;
        d2delta[(2, 6)] = g4;
        d2delta[(2, 8)] = -g3;
        d2delta[(6, 0)] = -g5;
        d2delta[(6, 2)] = g4;
        d2delta[(6, 6)] = g5;
        d2delta[(6, 8)] = -g4;
        d2delta[(8, 0)] = g4;
        d2delta[(8, 2)] = -g3;
        d2delta[(8, 6)] = -g4;
        d2delta[(8, 8)] = g3;

        let mut d2theta = Mat12::zeros();
        d2theta[(0, 0)] = -g1;
        d2theta[(0, 2)] = g2;
        d2theta[(0, 6)] = g1;
        d2theta[(0, 8)] = -g2;
        d2theta[(2, 0)] = g2;
        d2theta[(2, 2)] = g1;
        d2theta[(2, 6)] = -g2;
        d2theta[(2, 8)] = -g1;
        d2theta[(6, 0)] = g1;
        d2theta[(6, 2)] = -g2;
        d2theta[(6, 6)] = -g1;
        d2theta[(6, 8)] = g2;
        d2theta[(8, 0)] = -g2;
        d2theta[(8, 2)] = -g1;
        d2theta[(8, 6)] = g2;
        d2theta[(8, 8)] = g1;

        d2delta * self.local_f[0] + d2theta * (self.local_f[1] + self.local_f[2])
    }

    fn assemble_corotational_global(&mut self) {
        let nl_t = self.transform.nl_t();
        let k_t: SMatrix<f64, 3, 3> =
            SMatrix::from_iterator(self.local_tangent_stiffness.iter().copied());
        self.external_geom_stiffness = self.external_geometric_stiffness();
        self.elem_global_stiffness =
            nl_t.transpose() * k_t * nl_t + self.external_geom_stiffness;

        let f: SVector<f64, 3> = SVector::from_column_slice(self.local_f.as_slice());
        self.global_resistance_forces = nl_t.transpose() * f;
    }

    fn update_nonlinear_elastic(&mut self) {
        self.transform.update(&self.global_ele_u);
        let d = self.transform.deformational_displacements();
        self.local_d = DVec::from_column_slice(d.as_slice());

        let l0 = self.initial_length;
        let ea = self.sections[0].ea();
        let ei = self.sections[0].ei();
        let theta1 = self.local_d[1];
        let theta2 = self.local_d[2];

        let eps = self.corotational_eps(self.gauss_points_x[0]);
        self.local_eps[0] = eps;
        self.local_stresses[0] = self.sections[0].tangent_matrix() * eps;

        // closed-form local forces; the moment rows use the freshly computed
        // axial force
        let axial_force = ea * eps[0];
        let m1 = (4.0 * ei / l0 + 2.0 * axial_force * l0 / 15.0) * theta1
            + (2.0 * ei / l0 - axial_force * l0 / 30.0) * theta2;
        let m2 = (2.0 * ei / l0 - axial_force * l0 / 30.0) * theta1
            + (4.0 * ei / l0 + 2.0 * axial_force * l0 / 15.0) * theta2;
        self.local_f = DVec::from_column_slice(&[axial_force, m1, m2]);

        // material stiffness: rotational block plus EA L0 V V^T
        let v = DVec::from_column_slice(&[
            1.0 / l0,
            2.0 * theta1 / 15.0 - theta2 / 30.0,
            -theta1 / 30.0 + 2.0 * theta2 / 15.0,
        ]);
        let mut k_m = Mat::zeros(3, 3);
        k_m[(1, 1)] = 4.0 * ei / l0;
        k_m[(2, 2)] = 4.0 * ei / l0;
        k_m[(1, 2)] = 2.0 * ei / l0;
        k_m[(2, 1)] = 2.0 * ei / l0;
        k_m += (&v * v.transpose()) * (ea * l0);

        self.local_mat_stiffness = k_m;
        self.local_geom_stiffness = self.geometric_stiffness_template(axial_force);
        self.local_tangent_stiffness = &self.local_mat_stiffness + &self.local_geom_stiffness;

        self.assemble_corotational_global();
    }

    fn update_nonlinear_plastic(&mut self) {
        self.transform.update(&self.global_ele_u);
        let d = self.transform.deformational_displacements();
        self.local_d = DVec::from_column_slice(d.as_slice());

        let l0 = self.initial_length;
        let theta1 = self.local_d[1];
        let theta2 = self.local_d[2];

        for i in 0..self.gauss_points_x.len() {
            let x = self.gauss_points_x[i];
            let mut b = Mat::zeros(2, 3);
            b[(0, 0)] = 1.0 / l0;
            b[(0, 1)] = 2.0 * theta1 / 15.0 - theta2 / 30.0;
            b[(0, 2)] = -theta1 / 30.0 + 2.0 * theta2 / 15.0;
            b[(1, 1)] = -4.0 / l0 + 6.0 * x / (l0 * l0);
            b[(1, 2)] = -2.0 / l0 + 6.0 * x / (l0 * l0);

            let eps = self.corotational_eps(x);
            self.local_eps[i] = eps;
            self.sections[i].update_section_state(&eps);
            self.local_stresses[i] = match &self.sections[i] {
                Section::Fibre(s) => s.generalised_stress(),
                Section::Basic(_) => self.sections[i].tangent_matrix() * eps,
            };
            self.b_matrices[i] = b;
        }

        // numerical integration of force and material stiffness
        let mut f = DVec::zeros(3);
        let mut k_m = Mat::zeros(3, 3);
        for i in 0..self.gauss_points_x.len() {
            let w = self.gauss_points_w[i];
            let b = &self.b_matrices[i];
            let sigma = DVec::from_column_slice(self.local_stresses[i].as_slice());
            let d_t = self.sections[i].tangent_matrix();
            let d_t = Mat::from_iterator(2, 2, d_t.iter().copied());
            f += b.transpose() * sigma * w;
            k_m += b.transpose() * d_t * b * w;
        }
        self.local_f = f;
        self.local_mat_stiffness = k_m;

        let axial_force = self.local_f[0];
        self.local_geom_stiffness = self.geometric_stiffness_template(axial_force);
        self.local_tangent_stiffness = &self.local_mat_stiffness + &self.local_geom_stiffness;

        self.assemble_corotational_global();
    }

    /// Commit the Gauss-point section states after a converged step.
    pub fn update_section_starting_state(&mut self) {
        if matches!(self.kind, ElementType::NonlinearPlastic) {
            for section in &mut self.sections {
                section.commit_state();
            }
        }
    }

    // ---- local-global mapping -------------------------------------------

    /// Precompute the `(local_row, local_col, global_row, global_col)`
    /// quadruples from nodal activity and ownership.
    ///
    /// Rows come only from nodes on their parent rank; columns come from all
    /// nodes, because the owning rank of a halo node will receive the row
    /// contribution that references this column.
    pub fn map_stiffness(&mut self, owned: &[Node], interface: &[Node]) {
        let mut local_rows = Vec::new();
        let mut global_rows = Vec::new();
        let mut local_cols = Vec::new();
        let mut global_cols = Vec::new();

        for (node_i, slot) in self.node_slots.iter().enumerate() {
            let node = slot.resolve(owned, interface);
            if node.is_on_parent_rank() {
                for (position, dof) in node.active_dofs().iter().enumerate() {
                    local_rows.push(node_i * DOFS_PER_NODE + dof);
                    global_rows.push(node.nz_i() + position);
                }
            }
        }
        for (node_i, slot) in self.node_slots.iter().enumerate() {
            let node = slot.resolve(owned, interface);
            for (position, dof) in node.active_dofs().iter().enumerate() {
                local_cols.push(node_i * DOFS_PER_NODE + dof);
                global_cols.push(node.nz_i() + position);
            }
        }

        self.stiffness_map.clear();
        self.stiffness_map.reserve(local_rows.len() * local_cols.len());
        for (local_row, global_row) in local_rows.iter().zip(global_rows.iter()) {
            for (local_col, global_col) in local_cols.iter().zip(global_cols.iter()) {
                self.stiffness_map
                    .push([*local_row, *local_col, *global_row, *global_col]);
            }
        }
    }

    fn populate_stiffness_triplets(&mut self) {
        self.stiffness_triplets.clear();
        self.stiffness_triplets.reserve(self.stiffness_map.len());
        for quad in &self.stiffness_map {
            let value = self.elem_global_stiffness[(quad[0], quad[1])];
            self.stiffness_triplets.push(Triplet::new(quad[2], quad[3], value));
        }
    }

    fn populate_resistance_triplets(&mut self, owned: &[Node], interface: &[Node]) {
        self.resistance_triplets.clear();
        for (node_i, slot) in self.node_slots.iter().enumerate() {
            let node = slot.resolve(owned, interface);
            if !node.is_on_parent_rank() {
                continue;
            }
            for (position, dof) in node.active_dofs().iter().enumerate() {
                let value = self.global_resistance_forces[node_i * DOFS_PER_NODE + dof];
                self.resistance_triplets
                    .push(Triplet::new(node.nz_i() + position, 0, value));
            }
        }
    }

    pub fn stiffness_triplets(&self) -> &[Triplet] {
        &self.stiffness_triplets
    }

    pub fn resistance_triplets(&self) -> &[Triplet] {
        &self.resistance_triplets
    }

    pub fn stiffness_map_len(&self) -> usize {
        self.stiffness_map.len()
    }

    // ---- state readout ---------------------------------------------------

    pub fn local_d(&self) -> &DVec {
        &self.local_d
    }

    pub fn local_f(&self) -> &DVec {
        &self.local_f
    }

    pub fn eps(&self, gauss_point: usize) -> Vec2 {
        self.local_eps[gauss_point]
    }

    pub fn local_stresses(&self, gauss_point: usize) -> Vec2 {
        self.local_stresses[gauss_point]
    }

    pub fn local_mat_stiffness(&self) -> &Mat {
        &self.local_mat_stiffness
    }

    pub fn local_geom_stiffness(&self) -> &Mat {
        &self.local_geom_stiffness
    }

    pub fn local_tangent_stiffness(&self) -> &Mat {
        &self.local_tangent_stiffness
    }

    pub fn external_geom_stiffness(&self) -> &Mat12 {
        &self.external_geom_stiffness
    }

    pub fn elem_global_stiffness(&self) -> &Mat12 {
        &self.elem_global_stiffness
    }

    pub fn resistance_forces(&self) -> &Vec12 {
        &self.global_resistance_forces
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }
}
