//! Closed-form verification of the elastic beam scenarios: cantilever tip
//! load, simply supported point load, and simply supported UDL.

use blaze::prelude::*;

const YOUNGS_MODULUS: f64 = 2.06e11;
const SECTION_AREA: f64 = 0.0125;
const SECTION_I: f64 = 4.57e-4;
const PERCENT_TOLERANCE: f64 = 0.02;

fn basic_section() -> Section {
    Section::Basic(BasicSection::new(YOUNGS_MODULUS, SECTION_AREA, SECTION_I))
}

fn cantilever_model(element_type: ElementType, divisions: u32, beam_length: f64) -> Model {
    let mut model = Model::new(element_type, basic_section());
    model
        .create_line_mesh(divisions, [[0.0, 0.0, 0.0], [beam_length, 0.0, 0.0]])
        .unwrap();

    let mut end_restraint = NodalRestraint::new();
    end_restraint.assign_dofs([-1]);
    end_restraint.assign_nodes_by_record_id([1]);
    model.restraints.push(end_restraint);

    let mut out_of_plane = NodalRestraint::new();
    out_of_plane.assign_dofs([1, 3, 4]);
    out_of_plane.assign_nodes_by_record_id(2..=divisions + 1);
    model.restraints.push(out_of_plane);

    model
}

#[test]
fn cantilever_tip_load_matches_beam_theory() {
    let divisions = 10;
    let beam_length = 10.0;
    let y_load = -1.0e5;
    let tip_node = divisions + 1;

    let mut model = cantilever_model(ElementType::LinearElastic, divisions, beam_length);
    model
        .load_manager
        .create_a_nodal_load_by_id(&[tip_node], &[2], &[y_load], &model.glob_mesh)
        .unwrap();
    model.scribe.track_nodes_by_id([tip_node], [2], &model.glob_mesh);

    model.initialise_restraints_n_loads().unwrap();
    model.initialise_solution_parameters(SolverParams {
        max_load_factor: 1.0,
        num_steps: 10,
        tolerance: 1e-2,
        max_iter: 30,
    });
    let summary = model.solve().unwrap();
    assert!(summary.completed);

    let record = model.scribe.record_for(tip_node).unwrap();
    let tip_history = record.dof_history(2);
    assert_eq!(tip_history.len(), 10);

    let correct = y_load * beam_length.powi(3) / (3.0 * YOUNGS_MODULUS * SECTION_I);
    let last = *tip_history.last().unwrap();
    assert!(
        (last - correct).abs() < PERCENT_TOLERANCE * correct.abs(),
        "tip displacement {last} vs beam theory {correct}"
    );
}

#[test]
fn simply_supported_point_load_matches_beam_theory() {
    let divisions = 10;
    let beam_length = 10.0;
    let y_load = -1.0e5;
    let mid_node = divisions / 2 + 1;

    let mut model = Model::new(ElementType::NonlinearElastic, basic_section());
    model
        .create_line_mesh(divisions, [[0.0, 0.0, 0.0], [beam_length, 0.0, 0.0]])
        .unwrap();

    // pin one end, roller the other, keep the rest in plane
    let mut pinned = NodalRestraint::new();
    pinned.assign_dofs([0, 1, 2, 3, 4]);
    pinned.assign_nodes_by_record_id([1]);
    model.restraints.push(pinned);

    let mut roller = NodalRestraint::new();
    roller.assign_dofs([1, 2, 3, 4]);
    roller.assign_nodes_by_record_id([divisions + 1]);
    model.restraints.push(roller);

    let mut out_of_plane = NodalRestraint::new();
    out_of_plane.assign_dofs([1, 3, 4]);
    out_of_plane.assign_nodes_by_record_id(2..=divisions);
    model.restraints.push(out_of_plane);

    model
        .load_manager
        .create_a_nodal_load_by_id(&[mid_node], &[2], &[y_load], &model.glob_mesh)
        .unwrap();
    model.scribe.track_nodes_by_id([mid_node], [2], &model.glob_mesh);

    model.initialise_restraints_n_loads().unwrap();
    model.initialise_solution_parameters(SolverParams {
        max_load_factor: 1.0,
        num_steps: 10,
        tolerance: 1e-2,
        max_iter: 30,
    });
    let summary = model.solve().unwrap();
    assert!(summary.completed);

    let record = model.scribe.record_for(mid_node).unwrap();
    let last = *record.dof_history(2).last().unwrap();
    let correct = y_load * beam_length.powi(3) / (48.0 * YOUNGS_MODULUS * SECTION_I);
    assert!(
        (last - correct).abs() < PERCENT_TOLERANCE * correct.abs(),
        "mid-span displacement {last} vs beam theory {correct}"
    );
}

#[test]
fn simply_supported_udl_matches_beam_theory() {
    let divisions = 100;
    let beam_length = 5.0;
    let y_udl = -1.0e4; // N/m
    let mid_node = divisions / 2 + 1;

    let mut model = Model::new(ElementType::NonlinearElastic, basic_section());
    model
        .create_line_mesh(divisions, [[0.0, 0.0, 0.0], [beam_length, 0.0, 0.0]])
        .unwrap();

    let mut pinned = NodalRestraint::new();
    pinned.assign_dofs([0, 1, 2, 3, 4]);
    pinned.assign_nodes_by_record_id([1]);
    model.restraints.push(pinned);

    let mut roller = NodalRestraint::new();
    roller.assign_dofs([1, 2, 3, 4]);
    roller.assign_nodes_by_record_id([divisions + 1]);
    model.restraints.push(roller);

    let interior: Vec<u32> = (2..=divisions).collect();
    let mut out_of_plane = NodalRestraint::new();
    out_of_plane.assign_dofs([1, 3, 4]);
    out_of_plane.assign_nodes_by_record_id(interior.iter().copied());
    model.restraints.push(out_of_plane);

    // the UDL becomes equal loads at the interior nodes
    let nodal_load = y_udl * beam_length / divisions as f64;
    model
        .load_manager
        .create_a_nodal_load_by_id(&interior, &[2], &[nodal_load], &model.glob_mesh)
        .unwrap();
    model.scribe.track_nodes_by_id([mid_node], [2], &model.glob_mesh);

    model.initialise_restraints_n_loads().unwrap();
    model.initialise_solution_parameters(SolverParams {
        max_load_factor: 1.0,
        num_steps: 10,
        tolerance: 1e-2,
        max_iter: 30,
    });
    let summary = model.solve().unwrap();
    assert!(summary.completed);

    let record = model.scribe.record_for(mid_node).unwrap();
    let last = *record.dof_history(2).last().unwrap();
    let correct = 5.0 * y_udl * beam_length.powi(4) / (384.0 * YOUNGS_MODULUS * SECTION_I);
    assert!(
        (last - correct).abs() < PERCENT_TOLERANCE * correct.abs(),
        "mid-span displacement {last} vs beam theory {correct}"
    );
}

#[test]
fn repeated_analysis_is_idempotent() {
    let run = || {
        let divisions = 10;
        let tip_node = divisions + 1;
        let mut model = cantilever_model(ElementType::NonlinearElastic, divisions, 10.0);
        model
            .load_manager
            .create_a_nodal_load_by_id(&[tip_node], &[2], &[-1.0e5], &model.glob_mesh)
            .unwrap();
        model.scribe.track_nodes_by_id([tip_node], [2], &model.glob_mesh);
        model.initialise_restraints_n_loads().unwrap();
        model.initialise_solution_parameters(SolverParams {
            max_load_factor: 1.0,
            num_steps: 10,
            tolerance: 1e-3,
            max_iter: 30,
        });
        model.solve().unwrap();
        model
            .scribe
            .record_for(tip_node)
            .unwrap()
            .dof_history(2)
            .to_vec()
    };

    let first = run();
    let second = run();
    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(second.iter()) {
        assert!((a - b).abs() < 1e-10, "histories differ: {a} vs {b}");
    }
}
