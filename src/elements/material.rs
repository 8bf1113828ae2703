//! Bilinear elastoplastic uniaxial material
//!
//! The return map always starts from the committed state of the last
//! converged load step, so re-evaluating the same strain inside an
//! equilibrium iteration is idempotent.

use serde::{Deserialize, Serialize};

/// Uniaxial bilinear elastoplastic material with state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElasticPlasticMaterial {
    /// Young's modulus
    e: f64,
    /// Yield stress
    yield_strength: f64,
    /// Ratio of the post-yield slope to the elastic slope
    hardening_ratio: f64,

    /// Current strain
    strain: f64,
    /// Current stress
    stress: f64,
    /// Current plastic strain
    plastic_strain: f64,
    /// Current tangent modulus
    tangent_modulus: f64,
    /// Plastic strain committed at the last converged step
    committed_plastic_strain: f64,
}

impl ElasticPlasticMaterial {
    pub fn new(e: f64, yield_strength: f64, hardening_ratio: f64) -> Self {
        Self {
            e,
            yield_strength,
            hardening_ratio,
            strain: 0.0,
            stress: 0.0,
            plastic_strain: 0.0,
            tangent_modulus: e,
            committed_plastic_strain: 0.0,
        }
    }

    pub fn e(&self) -> f64 {
        self.e
    }

    pub fn yield_strength(&self) -> f64 {
        self.yield_strength
    }

    pub fn hardening_ratio(&self) -> f64 {
        self.hardening_ratio
    }

    pub fn strain(&self) -> f64 {
        self.strain
    }

    pub fn stress(&self) -> f64 {
        self.stress
    }

    pub fn plastic_strain(&self) -> f64 {
        self.plastic_strain
    }

    pub fn tangent_modulus(&self) -> f64 {
        self.tangent_modulus
    }

    /// Bilinear return map from the committed state.
    ///
    /// The trial stress is elastic from the committed plastic strain; the
    /// yield limit hardens with the accumulated plastic strain. Beyond the
    /// limit the state is projected back onto the hardened surface and the
    /// tangent drops to the post-yield slope.
    pub fn update_state(&mut self, strain: f64) {
        self.strain = strain;
        let e = self.e;
        let b = self.hardening_ratio;
        let ep0 = self.committed_plastic_strain;

        let trial_stress = e * (strain - ep0);
        let yield_limit = self.yield_strength + b * e * ep0.abs();

        if trial_stress.abs() <= yield_limit {
            self.stress = trial_stress;
            self.plastic_strain = ep0;
            self.tangent_modulus = e;
        } else {
            let direction = trial_stress.signum();
            let plastic_multiplier = (trial_stress.abs() - yield_limit) / (e * (1.0 + b));
            self.plastic_strain = ep0 + direction * plastic_multiplier;
            self.stress = e * (strain - self.plastic_strain);
            self.tangent_modulus = b * e;
        }
    }

    /// Promote the current state to the committed state. Called only after a
    /// load step has converged.
    pub fn commit_state(&mut self) {
        self.committed_plastic_strain = self.plastic_strain;
    }
}
