//! Incremental load-factor procedure with Newton-Raphson iteration
//!
//! Each load step raises the load factor by one increment, then iterates:
//! map U into the nodes, update element states, rebuild K, R, and G, check
//! the residual, and if not converged solve for the increment and update U.
//! Assembly always happens at least once before a convergence decision.
//! Non-convergence ends the analysis cleanly with a diagnostic; partial
//! history written by the scribe survives.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::assembler::Assembler;
use crate::comms::Collective;
use crate::error::BlazeResult;
use crate::history::Scribe;
use crate::loads::LoadManager;
use crate::mesh::GlobalMesh;
use crate::solver::BasicSolver;

/// Parameters of the incremental solution.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SolverParams {
    /// Final value of the load factor
    pub max_load_factor: f64,
    /// Number of equal load increments
    pub num_steps: usize,
    /// Convergence tolerance on the l2 norm of G
    pub tolerance: f64,
    /// Iteration cap per load step
    pub max_iter: usize,
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            max_load_factor: 1.0,
            num_steps: 100,
            tolerance: 1e-4,
            max_iter: 30,
        }
    }
}

/// What the analysis achieved.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SolutionSummary {
    /// Whether every load step converged
    pub completed: bool,
    /// Load factor at exit
    pub last_load_factor: f64,
    /// Residual norm at exit
    pub last_residual: f64,
    /// Number of converged steps
    pub steps_completed: usize,
}

/// The outer load-stepping loop.
#[derive(Debug, Default)]
pub struct SolutionProcedure {
    load_factor: f64,
    params: SolverParams,
}

impl SolutionProcedure {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initialise_solution_parameters(&mut self, params: SolverParams) {
        self.params = params;
        self.load_factor = 0.0;
    }

    pub fn load_factor(&self) -> f64 {
        self.load_factor
    }

    /// Run the incremental analysis to `max_load_factor` or to the first
    /// non-converged step.
    #[allow(clippy::too_many_arguments)]
    pub fn solve(
        &mut self,
        mesh: &mut GlobalMesh,
        assembler: &mut Assembler,
        solver: &BasicSolver,
        load_manager: &LoadManager,
        scribe: &mut Scribe,
        comm: &dyn Collective,
    ) -> BlazeResult<SolutionSummary> {
        let dlf = self.params.max_load_factor / self.params.num_steps as f64;
        let mut steps_completed = 0;

        // count steps rather than compare accumulated load factors, so the
        // final increment lands exactly on the last step
        for step in 1..=self.params.num_steps {
            self.load_factor += dlf;
            load_manager.increment_loads(dlf, mesh)?;
            info!(
                "load step {step}: load factor {:.6} of {:.6}",
                self.load_factor, self.params.max_load_factor
            );

            let mut converged;
            let mut iter = 1;
            loop {
                assembler.map_u_to_nodes(mesh)?;
                mesh.update_elements_states();
                assembler.assemble_global_contributions(mesh);
                assembler.calculate_out_of_balance();
                converged =
                    assembler.check_convergence(self.params.tolerance, self.load_factor, comm)?;
                if converged {
                    info!(
                        "step {step} converged after {iter} iteration(s), |G| = {:.3e}",
                        assembler.g_max()
                    );
                    break;
                }
                if iter >= self.params.max_iter {
                    break;
                }
                solver.solve_for_delta_u(assembler, mesh, comm)?;
                assembler.increment_u();
                iter += 1;
            }

            if !converged {
                warn!(
                    "analysis incomplete: no convergence at load factor {:.6}, |G| = {:.3e}",
                    self.load_factor,
                    assembler.g_max()
                );
                return Ok(SolutionSummary {
                    completed: false,
                    last_load_factor: self.load_factor,
                    last_residual: assembler.g_max(),
                    steps_completed,
                });
            }

            mesh.update_element_sections_starting_states();
            scribe.write_to_records(mesh)?;
            steps_completed += 1;
        }

        info!(
            "analysis complete at load factor {:.6}, |G| = {:.3e}",
            self.load_factor,
            assembler.g_max()
        );
        Ok(SolutionSummary {
            completed: true,
            last_load_factor: self.load_factor,
            last_residual: assembler.g_max(),
            steps_completed,
        })
    }
}
