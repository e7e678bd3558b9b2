use clap::Parser;
use macroquad::prelude::*;
use optisim::settings::{self, CliArgs};
use optisim::simulation::Simulation;
use optisim::viewer::{draw_axes, draw_lenses, draw_trajectories, ViewPort};

/// Samples revealed per frame.
const SPEED: usize = 2;

#[macroquad::main("optisim viewer")]
async fn main() {
    let args = CliArgs::parse();
    let settings = match settings::load_config(&args) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            std::process::exit(1);
        }
    };

    let mut simulation = match Simulation::new(settings) {
        Ok(simulation) => simulation,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            std::process::exit(1);
        }
    };
    if let Err(err) = simulation.solve_rays() {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }

    let grid = simulation.tracer.grid();
    let render = &simulation.settings.render;
    let view = ViewPort::new((grid.start(), grid.end()), (render.y_min, render.y_max));
    let num_samples = grid.len();

    let mut shown = 1;
    let mut paused = false;

    loop {
        clear_background(WHITE);

        draw_axes(&view);
        draw_lenses(simulation.tracer.lenses(), &view);
        draw_trajectories(&simulation.trajectories, shown, &view);
        draw_text(
            "space: pause   r: restart   esc: quit",
            10.0,
            20.0,
            20.0,
            DARKGRAY,
        );

        if is_key_pressed(KeyCode::Space) {
            paused = !paused;
        }
        if is_key_pressed(KeyCode::R) {
            shown = 1;
        }
        if is_key_pressed(KeyCode::Escape) {
            break;
        }
        if !paused && shown < num_samples {
            shown = (shown + SPEED).min(num_samples);
        }

        next_frame().await;
    }
}
