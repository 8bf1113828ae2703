//! Corotational transformation between global and deformational freedoms
//!
//! The transform captures the base configuration of an element once, then
//! tracks the current chord (length L and angle phi) as the nodes move. The
//! rigid-body rotation psi = phi - phi0 is removed from the end rotations,
//! leaving the three deformational freedoms d = (L - L0, theta1 - psi,
//! theta2 - psi). It also supplies the 3x12 Jacobian d(d)/d(U) and the
//! trigonometric invariants g1..g5 that feed the direct second-derivative
//! terms of the global geometric stiffness.

use crate::math::{Mat3x12, Mat6x12, Vec12, Vec3};

/// Corotational transform of a two-node element in the x-y plane.
#[derive(Debug, Clone)]
pub struct CorotationalTransform {
    // base configuration
    x21_base: f64,
    y21_base: f64,
    initial_length: f64,
    base_angle: f64,

    // current configuration
    x21: f64,
    y21: f64,
    length: f64,
    phi: f64,
    psi: f64,
    cos_phi: f64,
    sin_phi: f64,

    // end displacements extracted from the last update
    theta1: f64,
    theta2: f64,

    nl_t: Mat3x12,
}

impl Default for CorotationalTransform {
    fn default() -> Self {
        Self {
            x21_base: 0.0,
            y21_base: 0.0,
            initial_length: 0.0,
            base_angle: 0.0,
            x21: 0.0,
            y21: 0.0,
            length: 0.0,
            phi: 0.0,
            psi: 0.0,
            cos_phi: 1.0,
            sin_phi: 0.0,
            theta1: 0.0,
            theta2: 0.0,
            nl_t: Mat3x12::zeros(),
        }
    }
}

impl CorotationalTransform {
    /// Capture the base configuration from the element end coordinates.
    pub fn initialise(pt1: [f64; 3], pt2: [f64; 3]) -> Self {
        let x21_base = pt2[0] - pt1[0];
        let y21_base = pt2[1] - pt1[1];
        let initial_length = (x21_base * x21_base + y21_base * y21_base).sqrt();
        let base_angle = y21_base.atan2(x21_base);
        let mut transform = Self {
            x21_base,
            y21_base,
            initial_length,
            base_angle,
            ..Default::default()
        };
        transform.update(&Vec12::zeros());
        transform
    }

    /// Recompute the current configuration from the element's global
    /// displacement vector.
    pub fn update(&mut self, global_ele_u: &Vec12) {
        // in-plane freedoms: u_x at 0/6, u_y at 2/8, th_z at 5/11
        let ux1 = global_ele_u[0];
        let ux2 = global_ele_u[6];
        let uy1 = global_ele_u[2];
        let uy2 = global_ele_u[8];
        self.theta1 = global_ele_u[5];
        self.theta2 = global_ele_u[11];

        self.x21 = self.x21_base + ux2 - ux1;
        self.y21 = self.y21_base + uy2 - uy1;
        self.length = (self.x21 * self.x21 + self.y21 * self.y21).sqrt();

        self.phi = self.y21.atan2(self.x21);
        self.cos_phi = self.phi.cos();
        self.sin_phi = self.phi.sin();
        self.psi = self.phi - self.base_angle;

        self.calc_nl_t();
    }

    /// Deformational freedoms d = (L - L0, theta1 - psi, theta2 - psi).
    pub fn deformational_displacements(&self) -> Vec3 {
        Vec3::new(
            self.length - self.initial_length,
            self.theta1 - self.psi,
            self.theta2 - self.psi,
        )
    }

    fn calc_nl_t(&mut self) {
        let c = self.cos_phi;
        let s = self.sin_phi;
        let l = self.length;
        let mut t = Mat3x12::zeros();

        t[(0, 0)] = -c;
        t[(0, 2)] = -s;
        t[(0, 6)] = c;
        t[(0, 8)] = s;

        t[(1, 0)] = -s / l;
        t[(1, 2)] = c / l;
        t[(1, 5)] = 1.0;
        t[(1, 6)] = s / l;
        t[(1, 8)] = -c / l;

        t[(2, 0)] = -s / l;
        t[(2, 2)] = c / l;
        t[(2, 6)] = s / l;
        t[(2, 8)] = -c / l;
        t[(2, 11)] = 1.0;

        self.nl_t = t;
    }

    /// The 3x12 Jacobian d(d)/d(U) at the current configuration.
    pub fn nl_t(&self) -> Mat3x12 {
        self.nl_t
    }

    /// The small-rotation 6x12 transformation built from the base angle.
    /// Retained for the linear pipeline; the corotational elements assemble
    /// K_e and R exclusively through [`Self::nl_t`].
    pub fn linear_t(&self) -> Mat6x12 {
        let c = self.base_angle.cos();
        let s = self.base_angle.sin();
        let mut t = Mat6x12::zeros();
        t[(0, 0)] = c;
        t[(0, 2)] = s;
        t[(1, 0)] = -s;
        t[(1, 2)] = c;
        t[(2, 5)] = 1.0;
        t[(3, 6)] = c;
        t[(3, 8)] = s;
        t[(4, 6)] = -s;
        t[(4, 8)] = c;
        t[(5, 11)] = 1.0;
        t
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn initial_length(&self) -> f64 {
        self.initial_length
    }

    pub fn psi(&self) -> f64 {
        self.psi
    }

    pub fn g1(&self) -> f64 {
        2.0 * self.cos_phi * self.sin_phi / (self.length * self.length)
    }

    pub fn g2(&self) -> f64 {
        (self.cos_phi * self.cos_phi - self.sin_phi * self.sin_phi) / (self.length * self.length)
    }

    pub fn g3(&self) -> f64 {
        self.cos_phi * self.cos_phi / self.length
    }

    pub fn g4(&self) -> f64 {
        self.cos_phi * self.sin_phi / self.length
    }

    pub fn g5(&self) -> f64 {
        self.sin_phi * self.sin_phi / self.length
    }
}
