//! Model facade: wires the mesh, managers, assembler, solver, and scribe
//! into one analysis object

use std::sync::Arc;

use crate::assembler::Assembler;
use crate::comms::{Collective, SerialCollective};
use crate::elements::restraint::NodalRestraint;
use crate::elements::section::Section;
use crate::elements::ElementType;
use crate::error::BlazeResult;
use crate::history::Scribe;
use crate::loads::LoadManager;
use crate::mesh::frame::FrameMesh;
use crate::mesh::GlobalMesh;
use crate::procedure::{SolutionProcedure, SolutionSummary, SolverParams};
use crate::solver::BasicSolver;

/// A complete analysis: mesh, boundary conditions, loads, trackers, and the
/// incremental solution machinery. On a multi-rank collective each rank
/// builds the same `Model` and the mesh decomposes itself.
pub struct Model {
    pub glob_mesh: GlobalMesh,
    pub assembler: Assembler,
    pub solver: BasicSolver,
    pub solution_procedure: SolutionProcedure,
    pub load_manager: LoadManager,
    pub scribe: Scribe,
    pub restraints: Vec<NodalRestraint>,
    comm: Arc<dyn Collective>,
}

impl Model {
    /// Single-process model.
    pub fn new(element_type: ElementType, section: Section) -> Self {
        Self::with_collective(element_type, section, Arc::new(SerialCollective))
    }

    /// Model bound to a rank of a collective group.
    pub fn with_collective(
        element_type: ElementType,
        section: Section,
        comm: Arc<dyn Collective>,
    ) -> Self {
        Self {
            glob_mesh: GlobalMesh::new(element_type, section),
            assembler: Assembler::new(),
            solver: BasicSolver::new(),
            solution_procedure: SolutionProcedure::new(),
            load_manager: LoadManager::new(),
            scribe: Scribe::new(),
            restraints: Vec::new(),
            comm,
        }
    }

    pub fn comm(&self) -> &dyn Collective {
        self.comm.as_ref()
    }

    /// Mesh a straight line of `divisions` elements between two points.
    pub fn create_line_mesh(
        &mut self,
        divisions: u32,
        end_coords: [[f64; 3]; 2],
    ) -> BlazeResult<()> {
        self.glob_mesh
            .create_line_mesh(divisions, end_coords, self.comm.as_ref())
    }

    /// Mesh a regular plane frame.
    pub fn create_frame_mesh(&mut self, frame: &FrameMesh) -> BlazeResult<()> {
        self.glob_mesh.create_frame_mesh(frame, self.comm.as_ref())
    }

    /// Apply the restraints, register the loads, and size the global
    /// matrices and element stiffness maps. Call once the model is fully
    /// described and before [`Model::solve`].
    pub fn initialise_restraints_n_loads(&mut self) -> BlazeResult<()> {
        for restraint in &self.restraints {
            restraint.apply(&mut self.glob_mesh)?;
        }
        self.glob_mesh
            .count_and_exchange_distributed_dofs(self.comm.as_ref())?;

        self.load_manager.initialise_loads(&mut self.glob_mesh)?;
        self.glob_mesh.check_nodal_loads()?;

        self.assembler.initialise_global_matrices(&self.glob_mesh);
        self.glob_mesh.map_element_stiffnesses();
        Ok(())
    }

    pub fn initialise_solution_parameters(&mut self, params: SolverParams) {
        self.solution_procedure.initialise_solution_parameters(params);
    }

    /// Run the incremental analysis.
    pub fn solve(&mut self) -> BlazeResult<SolutionSummary> {
        self.solution_procedure.solve(
            &mut self.glob_mesh,
            &mut self.assembler,
            &self.solver,
            &self.load_manager,
            &mut self.scribe,
            self.comm.as_ref(),
        )
    }
}
