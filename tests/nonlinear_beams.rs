//! Geometrically and materially nonlinear scenarios: the MacNeal slender
//! cantilever under an end moment, and fibre-plastic beams in their elastic
//! range.

use blaze::prelude::*;
use std::f64::consts::PI;

/// A slender cantilever under a tip moment curls into an arc of radius
/// EI/M; at M = 0.25 (2 pi EI / L) the tip has dropped to about -2L/pi, and
/// at half the full-circle moment it sits at the same height again.
#[test]
fn macneal_slender_beam_curls_under_end_moment() {
    let divisions = 200;
    let beam_length = 10.0;
    let e = 1.2e6;
    let width = 1.0;
    let height: f64 = 0.1;
    let area = width * height;
    let inertia = width * height.powi(3) / 12.0;
    let tip_node = divisions + 1;
    let reference_moment = -20.0 * PI; // full-circle moment 2 pi EI / L

    let mut model = Model::new(
        ElementType::NonlinearElastic,
        Section::Basic(BasicSection::new(e, area, inertia)),
    );
    model
        .create_line_mesh(divisions, [[0.0, 0.0, 0.0], [beam_length, 0.0, 0.0]])
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
        .create_a_nodal_load_by_id(&[tip_node], &[5], &[reference_moment], &model.glob_mesh)
        .unwrap();
    model.scribe.track_nodes_by_id([tip_node], [2], &model.glob_mesh);

    model.initialise_restraints_n_loads().unwrap();
    model.initialise_solution_parameters(SolverParams {
        max_load_factor: 0.5,
        num_steps: 50,
        tolerance: 1e-6,
        max_iter: 60,
    });
    let summary = model.solve().unwrap();
    assert!(summary.completed);

    let history = model
        .scribe
        .record_for(tip_node)
        .unwrap()
        .dof_history(2)
        .to_vec();
    assert!(history.len() >= 50);

    // quarter of the full-circle moment, reached at step 25
    let at_quarter = history[24];
    assert!(
        (-7.0..-6.0).contains(&at_quarter),
        "tip displacement at quarter moment: {at_quarter}"
    );
    // half the full-circle moment: the beam has curled into a half circle
    // and the tip height is back at -2R = -L·2/pi
    let at_half = history[49];
    assert!(
        (-7.0..-6.0).contains(&at_half),
        "tip displacement at half moment: {at_half}"
    );
}

fn elastic_range_fibre_section(e: f64, width: f64, height: f64, strips: usize) -> Section {
    // rectangle discretised into strips with an unreachable yield stress
    let rows: Vec<(f64, f64, f64, f64, f64)> = (0..strips)
        .map(|i| {
            let strip = height / strips as f64;
            let y = -0.5 * height + (i as f64 + 0.5) * strip;
            (e, 1e30, 0.0, width * strip, y)
        })
        .collect();
    Section::Fibre(FibreSection::from_fibre_rows(&rows))
}

/// In the elastic range the fibre-plastic element must match beam theory the
/// same way the resultant-section element does.
#[test]
fn plastic_cantilever_matches_beam_theory_in_elastic_range() {
    let divisions = 10;
    let beam_length = 5.0;
    let e = 2.0e11;
    let width = 0.2;
    let height = 0.4;
    let strips = 200;
    let tip_node = divisions + 1;
    let y_load = -1.0e4;

    let section = elastic_range_fibre_section(e, width, height, strips);
    let inertia_fibre = section.ei() / e;

    let mut model = Model::new(ElementType::NonlinearPlastic, section);
    model
        .create_line_mesh(divisions, [[0.0, 0.0, 0.0], [beam_length, 0.0, 0.0]])
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
        .create_a_nodal_load_by_id(&[tip_node], &[2], &[y_load], &model.glob_mesh)
        .unwrap();
    model.scribe.track_nodes_by_id([tip_node], [2], &model.glob_mesh);

    model.initialise_restraints_n_loads().unwrap();
    model.initialise_solution_parameters(SolverParams {
        max_load_factor: 1.0,
        num_steps: 10,
        tolerance: 1e-3,
        max_iter: 30,
    });
    let summary = model.solve().unwrap();
    assert!(summary.completed);

    let last = *model
        .scribe
        .record_for(tip_node)
        .unwrap()
        .dof_history(2)
        .last()
        .unwrap();
    let correct = y_load * beam_length.powi(3) / (3.0 * e * inertia_fibre);
    assert!(
        (last - correct).abs() < 0.02 * correct.abs(),
        "tip displacement {last} vs beam theory {correct}"
    );
}

/// Push a fibre cantilever well past first yield: the response must soften
/// relative to the elastic prediction, and the run must still converge with
/// section states committed step by step.
#[test]
fn plastic_cantilever_softens_past_yield() {
    let divisions = 8;
    let beam_length = 2.0;
    let e = 2.0e11;
    let fy = 250e6;
    let width = 0.1;
    let height = 0.2;
    let strips = 40;
    let tip_node = divisions + 1;

    let rows: Vec<(f64, f64, f64, f64, f64)> = (0..strips)
        .map(|i| {
            let strip = height / strips as f64;
            let y = -0.5 * height + (i as f64 + 0.5) * strip;
            (e, fy, 0.01, width * strip, y)
        })
        .collect();
    let section = Section::Fibre(FibreSection::from_fibre_rows(&rows));
    let inertia = section.ei() / e;

    // elastic moment capacity of the section, and a tip load that takes the
    // root moment to 1.35 times that - well past first yield, clear of the
    // 1.5 plastic limit of a rectangle
    let elastic_moment = fy * inertia / (height / 2.0);
    let y_load = -1.35 * elastic_moment / beam_length;

    let mut model = Model::new(ElementType::NonlinearPlastic, section);
    model
        .create_line_mesh(divisions, [[0.0, 0.0, 0.0], [beam_length, 0.0, 0.0]])
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
        .create_a_nodal_load_by_id(&[tip_node], &[2], &[y_load], &model.glob_mesh)
        .unwrap();
    model.scribe.track_nodes_by_id([tip_node], [2], &model.glob_mesh);

    model.initialise_restraints_n_loads().unwrap();
    model.initialise_solution_parameters(SolverParams {
        max_load_factor: 1.0,
        num_steps: 40,
        tolerance: 1e-2 * y_load.abs(),
        max_iter: 60,
    });
    let summary = model.solve().unwrap();
    assert!(summary.completed);

    let history = model
        .scribe
        .record_for(tip_node)
        .unwrap()
        .dof_history(2)
        .to_vec();
    let elastic_prediction = y_load * beam_length.powi(3) / (3.0 * e * inertia);
    let last = *history.last().unwrap();
    // softening: the plastic tip displacement exceeds the elastic prediction
    assert!(
        last < 1.05 * elastic_prediction,
        "expected softening: plastic {last} vs elastic {elastic_prediction}"
    );
    // and the early, elastic part of the history still tracks the prediction
    let tenth = history[3];
    let elastic_tenth = elastic_prediction * 4.0 / 40.0;
    assert!(
        (tenth - elastic_tenth).abs() < 0.05 * elastic_tenth.abs(),
        "elastic range mismatch: {tenth} vs {elastic_tenth}"
    );
}
