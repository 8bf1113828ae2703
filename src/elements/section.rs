//! Cross-sections: constant-rigidity and fibre-discretised
//!
//! Both variants answer the same questions: axial and bending rigidity, the
//! tangent constitutive matrix, and the generalised stress conjugate to the
//! generalised strain (axial strain, curvature).

use serde::{Deserialize, Serialize};

use crate::elements::material::ElasticPlasticMaterial;
use crate::math::{Mat2, Vec2};

/// Elastic section defined directly by E, A, and I.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasicSection {
    e: f64,
    a: f64,
    i: f64,
}

impl BasicSection {
    pub fn new(e: f64, a: f64, i: f64) -> Self {
        Self { e, a, i }
    }

    pub fn e(&self) -> f64 {
        self.e
    }

    pub fn a(&self) -> f64 {
        self.a
    }

    pub fn i(&self) -> f64 {
        self.i
    }
}

/// A single fibre: a material state at a y-offset with a tributary area.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fibre {
    material: ElasticPlasticMaterial,
    area: f64,
    y: f64,
}

impl Fibre {
    pub fn material(&self) -> &ElasticPlasticMaterial {
        &self.material
    }

    pub fn area(&self) -> f64 {
        self.area
    }

    pub fn y(&self) -> f64 {
        self.y
    }
}

/// Fibre-discretised section for spreading plasticity.
///
/// Each fibre sees the strain `eps_axial - y * kappa`; the section
/// aggregates fibre stresses into (N, M) and fibre tangent moduli into the
/// 2x2 tangent constitutive matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FibreSection {
    fibres: Vec<Fibre>,
    tangent: Mat2,
    generalised_stress: Vec2,
}

impl Default for FibreSection {
    fn default() -> Self {
        Self {
            fibres: Vec::new(),
            tangent: Mat2::zeros(),
            generalised_stress: Vec2::zeros(),
        }
    }
}

impl FibreSection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add fibres sharing one material definition.
    pub fn add_fibres(&mut self, material: &ElasticPlasticMaterial, areas: &[f64], ys: &[f64]) {
        for (area, y) in areas.iter().zip(ys.iter()) {
            self.fibres.push(Fibre {
                material: material.clone(),
                area: *area,
                y: *y,
            });
        }
        self.refresh_aggregates();
    }

    /// Build a section from `(E, f_y, b, area, y)` fibre rows.
    pub fn from_fibre_rows(rows: &[(f64, f64, f64, f64, f64)]) -> Self {
        let mut section = Self::new();
        for (e, fy, b, area, y) in rows {
            section.fibres.push(Fibre {
                material: ElasticPlasticMaterial::new(*e, *fy, *b),
                area: *area,
                y: *y,
            });
        }
        section.refresh_aggregates();
        section
    }

    pub fn fibres(&self) -> &[Fibre] {
        &self.fibres
    }

    /// Elastic axial rigidity sum E_i A_i
    pub fn ea(&self) -> f64 {
        self.fibres.iter().map(|f| f.material.e() * f.area).sum()
    }

    /// Elastic bending rigidity sum E_i A_i y_i^2
    pub fn ei(&self) -> f64 {
        self.fibres
            .iter()
            .map(|f| f.material.e() * f.area * f.y * f.y)
            .sum()
    }

    /// Push a generalised strain through every fibre and refresh the tangent
    /// and generalised stress aggregates.
    pub fn update_section_state(&mut self, eps: &Vec2) {
        let eps_axial = eps[0];
        let kappa = eps[1];
        for fibre in &mut self.fibres {
            fibre.material.update_state(eps_axial - fibre.y * kappa);
        }
        self.refresh_aggregates();
    }

    fn refresh_aggregates(&mut self) {
        let mut tangent = Mat2::zeros();
        let mut stress = Vec2::zeros();
        for fibre in &self.fibres {
            let et_a = fibre.material.tangent_modulus() * fibre.area;
            tangent[(0, 0)] += et_a;
            tangent[(0, 1)] -= et_a * fibre.y;
            tangent[(1, 0)] -= et_a * fibre.y;
            tangent[(1, 1)] += et_a * fibre.y * fibre.y;

            let force = fibre.material.stress() * fibre.area;
            stress[0] += force;
            stress[1] -= force * fibre.y;
        }
        self.tangent = tangent;
        self.generalised_stress = stress;
    }

    pub fn tangent_matrix(&self) -> Mat2 {
        self.tangent
    }

    pub fn generalised_stress(&self) -> Vec2 {
        self.generalised_stress
    }

    /// Promote every fibre's state to its committed state.
    pub fn commit_state(&mut self) {
        for fibre in &mut self.fibres {
            fibre.material.commit_state();
        }
    }
}

/// Section variants accepted by the element factory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Section {
    Basic(BasicSection),
    Fibre(FibreSection),
}

impl Section {
    /// Axial rigidity E·A
    pub fn ea(&self) -> f64 {
        match self {
            Section::Basic(s) => s.e() * s.a(),
            Section::Fibre(s) => s.ea(),
        }
    }

    /// Bending rigidity E·I
    pub fn ei(&self) -> f64 {
        match self {
            Section::Basic(s) => s.e() * s.i(),
            Section::Fibre(s) => s.ei(),
        }
    }

    /// Tangent constitutive matrix
    pub fn tangent_matrix(&self) -> Mat2 {
        match self {
            Section::Basic(s) => Mat2::new(s.e() * s.a(), 0.0, 0.0, s.e() * s.i()),
            Section::Fibre(s) => s.tangent_matrix(),
        }
    }

    /// Push a generalised strain through the section state. A no-op for the
    /// stateless basic section.
    pub fn update_section_state(&mut self, eps: &Vec2) {
        match self {
            Section::Basic(_) => {}
            Section::Fibre(s) => s.update_section_state(eps),
        }
    }

    /// Promote current state to committed state after a converged step.
    pub fn commit_state(&mut self) {
        if let Section::Fibre(s) = self {
            s.commit_state();
        }
    }
}

/// Build the fibre layout of an I-section: both flanges and the web split
/// into equal-area strips about `offset`.
pub fn i_section_fibres(
    material: &ElasticPlasticMaterial,
    offset: f64,
    flange_thickness: f64,
    flange_width: f64,
    web_thickness: f64,
    depth: f64,
    flange_divisions: usize,
    web_divisions: usize,
) -> FibreSection {
    let tf = flange_thickness;
    let b = flange_width;
    let tw = web_thickness;
    let h = depth;
    let web_depth = h - 2.0 * tf;

    let mut areas = Vec::new();
    let mut ys = Vec::new();

    // bottom flange strips, measured from the section base at `offset`
    let strip = tf / flange_divisions as f64;
    let mut y = offset - 0.5 * strip;
    for _ in 0..flange_divisions {
        y += strip;
        areas.push(b * strip);
        ys.push(y);
    }
    // web strips
    let strip = web_depth / web_divisions as f64;
    let mut y = offset + tf - 0.5 * strip;
    for _ in 0..web_divisions {
        y += strip;
        areas.push(tw * strip);
        ys.push(y);
    }
    // top flange strips
    let strip = tf / flange_divisions as f64;
    let mut y = offset + (h - tf) - 0.5 * strip;
    for _ in 0..flange_divisions {
        y += strip;
        areas.push(b * strip);
        ys.push(y);
    }

    let mut section = FibreSection::new();
    section.add_fibres(material, &areas, &ys);
    section
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn rectangle_section(e: f64, width: f64, depth: f64, strips: usize) -> FibreSection {
        // strips centred about mid-depth
        let material = ElasticPlasticMaterial::new(e, 1e30, 0.0);
        let strip = depth / strips as f64;
        let areas = vec![width * strip; strips];
        let ys: Vec<f64> = (0..strips)
            .map(|i| -0.5 * depth + (i as f64 + 0.5) * strip)
            .collect();
        let mut section = FibreSection::new();
        section.add_fibres(&material, &areas, &ys);
        section
    }

    #[test]
    fn test_fibre_rigidities_match_rectangle() {
        let e = 2.0e11;
        let section = rectangle_section(e, 0.2, 0.4, 400);
        assert_relative_eq!(section.ea(), e * 0.2 * 0.4, max_relative = 1e-9);
        // discretised I converges to bh^3/12 from below
        let exact_i = 0.2 * 0.4_f64.powi(3) / 12.0;
        assert_relative_eq!(section.ei(), e * exact_i, max_relative = 1e-5);
    }

    #[test]
    fn test_generalised_stress_pure_axial() {
        let e = 2.0e11;
        let mut section = rectangle_section(e, 0.2, 0.4, 100);
        let eps = Vec2::new(1e-4, 0.0);
        section.update_section_state(&eps);
        let stress = section.generalised_stress();
        assert_relative_eq!(stress[0], e * 0.2 * 0.4 * 1e-4, max_relative = 1e-9);
        assert_relative_eq!(stress[1], 0.0, epsilon = 1e-3);
    }

    #[test]
    fn test_generalised_stress_pure_bending() {
        let e = 2.0e11;
        let mut section = rectangle_section(e, 0.2, 0.4, 400);
        let kappa = 1e-3;
        let eps = Vec2::new(0.0, kappa);
        section.update_section_state(&eps);
        let stress = section.generalised_stress();
        assert_relative_eq!(stress[0], 0.0, epsilon = 1e-2);
        assert_relative_eq!(stress[1], section.ei() * kappa, max_relative = 1e-9);
    }

    #[test]
    fn test_tangent_softens_after_yield() {
        let material = ElasticPlasticMaterial::new(2.0e11, 250e6, 0.0);
        let mut section = FibreSection::new();
        section.add_fibres(&material, &[0.01, 0.01], &[-0.1, 0.1]);
        let elastic_ea = section.tangent_matrix()[(0, 0)];
        // strain well past yield in pure axial
        section.update_section_state(&Vec2::new(0.1, 0.0));
        assert!(section.tangent_matrix()[(0, 0)] < 1e-9 * elastic_ea);
        assert_relative_eq!(
            section.generalised_stress()[0],
            250e6 * 0.02,
            max_relative = 1e-9
        );
    }

    #[test]
    fn test_basic_section_tangent() {
        let section = Section::Basic(BasicSection::new(2.0e11, 0.0125, 4.57e-4));
        let d = section.tangent_matrix();
        assert_relative_eq!(d[(0, 0)], 2.0e11 * 0.0125);
        assert_relative_eq!(d[(1, 1)], 2.0e11 * 4.57e-4);
        assert_eq!(d[(0, 1)], 0.0);
    }

    #[test]
    fn test_i_section_area_and_inertia() {
        let material = ElasticPlasticMaterial::new(2.06e11, 550e6, 0.0);
        let (tf, tw, b, h) = (19.6e-3, 11.4e-3, 192.8e-3, 467.2e-3);
        // centre the section on the reference axis
        let section = i_section_fibres(&material, -h / 2.0, tf, b, tw, h, 10, 40);
        let area: f64 = section.fibres().iter().map(|f| f.area()).sum();
        let exact_area = 2.0 * tf * b + (h - 2.0 * tf) * tw;
        assert_relative_eq!(area, exact_area, max_relative = 1e-9);

        let exact_i = tw * (h - 2.0 * tf).powi(3) / 12.0
            + 2.0 * b * tf.powi(3) / 12.0
            + 2.0 * (tf * b) * (0.5 * h - 0.5 * tf).powi(2);
        assert_relative_eq!(section.ei() / 2.06e11, exact_i, max_relative = 2e-2);
    }
}
