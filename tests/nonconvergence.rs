//! The non-convergence guard: a run that cannot meet the tolerance inside
//! the iteration cap must end cleanly with a diagnostic, keeping whatever
//! history converged before.

use blaze::prelude::*;

fn cantilever() -> Model {
    let divisions = 4;
    let tip_node = divisions + 1;
    let mut model = Model::new(
        ElementType::NonlinearElastic,
        Section::Basic(BasicSection::new(2.06e11, 0.0125, 4.57e-4)),
    );
    model
        .create_line_mesh(divisions, [[0.0, 0.0, 0.0], [10.0, 0.0, 0.0]])
        .unwrap();

    let mut clamp = NodalRestraint::new();
    clamp.assign_dofs([-1]);
    clamp.assign_nodes_by_record_id([1]);
    model.restraints.push(clamp);

    let mut out_of_plane = NodalRestraint::new();
    out_of_plane.assign_dofs([1, 3, 4]);
    out_of_plane.assign_nodes_by_record_id(2..=tip_node);
    model.restraints.push(out_of_plane);

    model
        .load_manager
        .create_a_nodal_load_by_id(&[tip_node], &[2], &[-1.0e5], &model.glob_mesh)
        .unwrap();
    model
        .scribe
        .track_nodes_by_id([tip_node], [2], &model.glob_mesh);
    model
}

#[test]
fn unreachable_tolerance_terminates_with_diagnostic() {
    let mut model = cantilever();
    model.initialise_restraints_n_loads().unwrap();
    model.initialise_solution_parameters(SolverParams {
        max_load_factor: 1.0,
        num_steps: 2,
        tolerance: 1e-300,
        max_iter: 3,
    });

    let summary = model.solve().unwrap();
    assert!(!summary.completed);
    assert_eq!(summary.steps_completed, 0);
    // the diagnostic carries the load factor of the failed step and the
    // residual that was left
    assert!((summary.last_load_factor - 0.5).abs() < 1e-12);
    assert!(summary.last_residual.is_finite());
    assert!(summary.last_residual > 0.0);
    // nothing converged, so nothing was recorded
    let record = model.scribe.record_for(5).unwrap();
    assert!(record.dof_history(2).is_empty());
}

#[test]
fn history_survives_a_later_failed_analysis() {
    let mut model = cantilever();
    model.initialise_restraints_n_loads().unwrap();
    model.initialise_solution_parameters(SolverParams {
        max_load_factor: 1.0,
        num_steps: 10,
        tolerance: 1e-2,
        max_iter: 30,
    });
    let summary = model.solve().unwrap();
    assert!(summary.completed);
    assert_eq!(summary.steps_completed, 10);

    // push the same model further with an unreachable tolerance: the failed
    // continuation must not crash, and must not disturb what the scribe
    // already holds
    model.initialise_solution_parameters(SolverParams {
        max_load_factor: 1.0,
        num_steps: 2,
        tolerance: 1e-300,
        max_iter: 3,
    });
    let summary = model.solve().unwrap();
    assert!(!summary.completed);
    assert_eq!(summary.steps_completed, 0);

    let record = model.scribe.record_for(5).unwrap();
    assert_eq!(record.dof_history(2).len(), 10);
}
