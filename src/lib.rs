//! Blaze - a distributed nonlinear finite element engine for 2D framed
//! structures
//!
//! Blaze performs geometrically and materially nonlinear static analysis of
//! beam-column assemblies, solving the incremental equilibrium equations
//! `K_t dU = -G` with `G = R(U) - lambda P_ref` under an incremental
//! load-factor procedure with Newton-Raphson iteration per step. The mesh
//! decomposes over an MPI-like collective: each rank owns a contiguous id
//! range of nodes, duplicates the boundary elements it shares with its
//! neighbours, and mirrors the remaining element nodes as read-only
//! interface copies.
//!
//! ## Example
//! ```no_run
//! use blaze::prelude::*;
//!
//! let section = Section::Basic(BasicSection::new(2.06e11, 0.0125, 4.57e-4));
//! let mut model = Model::new(ElementType::NonlinearElastic, section);
//!
//! // a 10-element cantilever along x
//! model.create_line_mesh(10, [[0.0, 0.0, 0.0], [10.0, 0.0, 0.0]]).unwrap();
//!
//! // clamp the first node, keep the rest in-plane
//! let mut clamp = NodalRestraint::new();
//! clamp.assign_dofs([-1]);
//! clamp.assign_nodes_by_record_id([1]);
//! model.restraints.push(clamp);
//! let mut in_plane = NodalRestraint::new();
//! in_plane.assign_dofs([1, 3, 4]);
//! in_plane.assign_nodes_by_record_id(2..=11);
//! model.restraints.push(in_plane);
//!
//! // transverse tip load, tracked at the tip
//! model
//!     .load_manager
//!     .create_a_nodal_load_by_id(&[11], &[2], &[-1.0e5], &model.glob_mesh)
//!     .unwrap();
//! model.scribe.track_nodes_by_id([11], [2], &model.glob_mesh);
//!
//! model.initialise_restraints_n_loads().unwrap();
//! model.initialise_solution_parameters(SolverParams {
//!     max_load_factor: 1.0,
//!     num_steps: 100,
//!     tolerance: 1e-4,
//!     max_iter: 30,
//! });
//! let summary = model.solve().unwrap();
//! assert!(summary.completed);
//! ```

pub mod assembler;
pub mod comms;
pub mod elements;
pub mod error;
pub mod history;
pub mod loads;
pub mod math;
pub mod mesh;
pub mod model;
pub mod procedure;
pub mod solver;

// Re-export common types
pub mod prelude {
    pub use crate::assembler::Assembler;
    pub use crate::comms::{Collective, SerialCollective, ThreadCollective};
    pub use crate::elements::{
        BasicSection, BeamElement, ElasticPlasticMaterial, ElementType, FibreSection,
        NodalRestraint, Node, RestraintManager, Section,
    };
    pub use crate::error::{BlazeError, BlazeResult};
    pub use crate::history::{Record, Scribe};
    pub use crate::loads::{LoadManager, NodalLoad};
    pub use crate::mesh::frame::FrameMesh;
    pub use crate::mesh::{map_a_line_mesh, GlobalMesh, Ownership};
    pub use crate::model::Model;
    pub use crate::procedure::{SolutionProcedure, SolutionSummary, SolverParams};
    pub use crate::solver::{BasicSolver, SparseLu};
}
