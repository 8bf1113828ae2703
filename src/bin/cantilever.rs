//! Cantilever demo: builds a 10-element cantilever with a transverse tip
//! load, runs the incremental analysis, and prints the tip displacement
//! history as JSON.

use anyhow::Result;
use blaze::prelude::*;
use log::info;

fn main() -> Result<()> {
    env_logger::init();

    let divisions = 10;
    let beam_length = 10.0;
    let tip_node = divisions + 1;
    let tip_load = -1.0e5;

    let section = Section::Basic(BasicSection::new(2.06e11, 0.0125, 4.57e-4));
    let mut model = Model::new(ElementType::NonlinearElastic, section);
    model.create_line_mesh(divisions, [[0.0, 0.0, 0.0], [beam_length, 0.0, 0.0]])?;

    let mut clamp = NodalRestraint::new();
    clamp.assign_dofs([-1]);
    clamp.assign_nodes_by_record_id([1]);
    model.restraints.push(clamp);

    let mut in_plane = NodalRestraint::new();
    in_plane.assign_dofs([1, 3, 4]);
    in_plane.assign_nodes_by_record_id(2..=tip_node);
    model.restraints.push(in_plane);

    model
        .load_manager
        .create_a_nodal_load_by_id(&[tip_node], &[2], &[tip_load], &model.glob_mesh)?;
    model.scribe.track_nodes_by_id([tip_node], [2], &model.glob_mesh);

    model.initialise_restraints_n_loads()?;
    model.initialise_solution_parameters(SolverParams {
        max_load_factor: 1.0,
        num_steps: 100,
        tolerance: 1e-4,
        max_iter: 30,
    });

    let summary = model.solve()?;
    info!(
        "finished: completed = {}, load factor = {:.3}",
        summary.completed, summary.last_load_factor
    );

    let record = model.scribe.record_for(tip_node)?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    println!("{}", serde_json::to_string(&record.dof_history(2))?);
    Ok(())
}
