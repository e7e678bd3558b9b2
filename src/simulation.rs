//! End-to-end simulation runs.
//!
//! This module ties the two independent pipelines together for a single run:
//! the Jones calculus evaluation of the configured element sequence, and the
//! parallel ray trace through the configured lens system. All inputs are
//! validated when the [`Simulation`] is built, so `solve` cannot fail on bad
//! optics, and all outputs go to the directory named in the settings.
//!
//! # Key Features
//!
//! - [`Simulation`]: owns the settings, the tracer, the ray bundle and the results
//! - Parallel ray tracing with a progress bar
//! - Timing of the trace
//! - Data files, plots and animation written by `writeup`

use std::time::Instant;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};

use crate::{
    config::{POLARIZATION_DIR, RAY_TRACING_DIR},
    jones::{Polarization, Stokes},
    output::{self, PolarizationSummary, Summary},
    ray::{RayBundle, Trajectory},
    render::Renderer,
    settings::Settings,
    tracer::RayTracer,
};


/// A complete run: polarization pipeline plus ray trace.
#[derive(Debug)]
pub struct Simulation {
    pub settings: Settings,
    pub tracer: RayTracer,
    pub rays: RayBundle,
    pub polarization: Option<Polarization>,
    pub trajectories: Vec<Trajectory>,
}

impl Simulation {
    /// Builds the lens system, sampling grid and ray bundle from the settings.
    ///
    /// **Context**: Every input error must surface before any ray is traced,
    /// so a degenerate lens or grid never yields a partial trajectory.
    ///
    /// **How it Works**: Validates and constructs each component, attaching
    /// the offending part of the configuration to the error.
    pub fn new(settings: Settings) -> Result<Self> {
        let tracer = settings.tracer().context("Failed to build ray tracer")?;
        let rays = settings.ray_bundle().context("Failed to build ray bundle")?;

        Ok(Self {
            settings,
            tracer,
            rays,
            polarization: None,
            trajectories: Vec::new(),
        })
    }

    /// Clears all results, keeping the inputs.
    pub fn reset(&mut self) {
        self.polarization = None;
        self.trajectories.clear();
    }

    /// Runs both pipelines.
    pub fn solve(&mut self) -> Result<()> {
        let polarization = self.solve_polarization();
        info!(
            "Polarization output: {}",
            Stokes::from_jones(&polarization.output)
        );
        self.solve_rays()
    }

    /// Evaluates the configured Jones calculus pipeline.
    pub fn solve_polarization(&mut self) -> &Polarization {
        let polarization = Polarization::evaluate(
            self.settings.polarization_input(),
            self.settings.polarization.elements.clone(),
        );
        self.polarization.insert(polarization)
    }

    /// Traces every ray in parallel, showing progress per ray.
    pub fn solve_rays(&mut self) -> Result<()> {
        let start = Instant::now();
        info!(
            "Tracing {} rays through {} lenses...",
            self.rays.len(),
            self.tracer.lenses().len()
        );

        let pb = ProgressBar::new(self.rays.len() as u64);
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] {bar:40.green/blue} {pos:>5}/{len:5} {msg}",
            )?
            .progress_chars("█▇▆▅▄▃▂▁"),
        );
        pb.set_message("rays");

        self.trajectories = self.tracer.trace_with_progress(&self.rays, pb.clone());
        pb.finish_and_clear();

        let duration = start.elapsed();
        info!(
            "Time taken: {:.2?}, Time per ray: {:.2?}",
            duration,
            duration / self.rays.len().max(1) as u32
        );
        Ok(())
    }

    /// Writes data files, plots and the animation to the configured directory.
    pub fn writeup(&self) -> Result<()> {
        let directory = &self.settings.directory;
        let ray_dir = directory.join(RAY_TRACING_DIR);
        let pol_dir = directory.join(POLARIZATION_DIR);

        output::write_trajectories(&self.trajectories, &ray_dir)?;
        match &self.polarization {
            Some(polarization) => {
                output::write_polarization(polarization, &pol_dir)?;
            }
            None => warn!("Polarization not evaluated, skipping polarization output"),
        }
        output::write_summary(&self.summary(), directory)?;
        output::write_settings(&self.settings, directory)?;

        if !self.settings.render.enabled {
            info!("Rendering disabled, skipping plots and animation");
            return Ok(());
        }

        let renderer = Renderer::new(self.settings.render.clone(), self.tracer.grid());
        let lenses = self.tracer.lenses();
        renderer.write_ray_plot(&self.trajectories, lenses, &ray_dir)?;
        renderer.write_ray_animation(&self.trajectories, lenses, &ray_dir)?;
        if let Some(polarization) = &self.polarization {
            renderer.write_polarization_plot(polarization, &pol_dir)?;
        }
        Ok(())
    }

    pub fn summary(&self) -> Summary {
        Summary {
            timestamp: chrono::Local::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            num_rays: self.rays.len(),
            num_samples: self.tracer.grid().len(),
            num_lenses: self.tracer.lenses().len(),
            propagation: self.tracer.propagation(),
            final_heights: self
                .trajectories
                .iter()
                .filter_map(|t| t.last().map(|(_, height)| height))
                .collect(),
            polarization: self.polarization.as_ref().map(PolarizationSummary::new),
        }
    }
}
