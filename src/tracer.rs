//! Paraxial ray tracing through thin lens systems.
//!
//! Each ray is advanced across a shared [`SamplingGrid`]. On every step the
//! height is propagated first, then every lens crossed by the step refracts
//! the ray using that propagated height. Rays never share mutable state, so
//! a bundle is traced in parallel with rayon and collected in submission
//! order.

use indicatif::{ParallelProgressIterator, ProgressBar};
use log::debug;
use rayon::prelude::*;

use crate::{
    grid::SamplingGrid,
    lens::LensSystem,
    ray::{Propagation, RayBundle, RayState, Trajectory},
};

#[cfg(test)]
mod tests {

    use super::*;

    const HEIGHT_TOLERANCE: f64 = 1e-9;

    fn tracer(lenses: &[(f64, f64)], grid: Vec<f64>) -> RayTracer {
        RayTracer::new(
            LensSystem::from_pairs(lenses).unwrap(),
            SamplingGrid::new(grid).unwrap(),
        )
    }

    #[test]
    fn single_lens_scenario() {
        let tracer = tracer(&[(5.0, 2.0)], vec![0.0, 5.0, 10.0, 15.0]);
        let trajectory = tracer.trace_ray(2.0);
        let heights: Vec<f64> = trajectory.heights().collect();
        let positions: Vec<f64> = trajectory.positions().collect();

        assert_eq!(positions, vec![0.0, 5.0, 10.0, 15.0]);
        assert_eq!(heights[0], 2.0);
        assert_eq!(heights[1], 2.0);
        assert!((heights[2] - -5.787).abs() < 1e-3, "got {}", heights[2]);
        assert!((heights[3] - -13.574).abs() < 1e-3, "got {}", heights[3]);
    }

    #[test]
    fn slope_after_refraction_is_tangent_of_angle() {
        let tracer = tracer(&[(5.0, 4.0)], vec![0.0, 5.0, 6.0, 7.0]);
        let heights: Vec<f64> = tracer.trace_ray(1.0).heights().collect();
        // angle after the lens is -1/4
        let slope = (-0.25f64).tan();
        assert!((heights[2] - heights[1] - slope).abs() < HEIGHT_TOLERANCE);
        assert!((heights[3] - heights[2] - slope).abs() < HEIGHT_TOLERANCE);
    }

    #[test]
    fn two_lenses_in_one_step_share_height() {
        let tracer = tracer(&[(4.0, 2.0), (6.0, 4.0)], vec![0.0, 10.0, 20.0]);
        let heights: Vec<f64> = tracer.trace_ray(1.0).heights().collect();

        // both lenses refract at height 1: angle = -1/2 - 1/4
        let expected = 1.0 + 10.0 * (-0.75f64).tan();
        assert_eq!(heights[1], 1.0);
        assert!((heights[2] - expected).abs() < HEIGHT_TOLERANCE);
    }

    #[test]
    fn opposite_lenses_in_one_step_cancel() {
        // the diverging lens is listed first but sits behind the converging one
        let tracer = tracer(&[(6.0, -2.0), (4.0, 2.0)], vec![0.0, 10.0, 20.0]);
        let heights: Vec<f64> = tracer.trace_ray(1.5).heights().collect();
        assert_eq!(heights, vec![1.5, 1.5, 1.5]);
    }

    #[test]
    fn axial_ray_never_bends() {
        let tracer = RayTracer::new(
            LensSystem::from_pairs(&[(5.0, 2.0), (10.0, 3.0), (12.0, -1.0)]).unwrap(),
            SamplingGrid::linspace(0.0, 15.0, 500).unwrap(),
        );
        assert!(tracer.trace_ray(0.0).heights().all(|h| h == 0.0));
    }

    #[test]
    fn no_lenses_straight_line() {
        let tracer = RayTracer::new(
            LensSystem::default(),
            SamplingGrid::linspace(0.0, 15.0, 100).unwrap(),
        );
        let bundle = RayBundle::linspace(-2.0, 2.0, 5).unwrap();
        for (trajectory, &h) in tracer.trace(&bundle).iter().zip(bundle.heights()) {
            assert!(trajectory.heights().all(|y| y == h));
        }
    }

    #[test]
    fn single_sample_grid() {
        let tracer = tracer(&[(0.0, 1.0)], vec![0.0]);
        let trajectory = tracer.trace_ray(3.0);
        assert_eq!(trajectory.samples(), &[(0.0, 3.0)]);
    }

    #[test]
    fn lens_at_grid_start_not_crossed() {
        let tracer = tracer(&[(0.0, 1.0)], vec![0.0, 1.0, 2.0]);
        let heights: Vec<f64> = tracer.trace_ray(3.0).heights().collect();
        assert_eq!(heights, vec![3.0, 3.0, 3.0]);
    }

    #[test]
    fn trajectory_length_matches_grid() {
        let tracer = RayTracer::new(
            LensSystem::from_pairs(&[(5.0, 2.0), (10.0, 3.0)]).unwrap(),
            SamplingGrid::linspace(0.0, 15.0, 337).unwrap(),
        );
        let bundle = RayBundle::linspace(-2.0, 2.0, 11).unwrap();
        let trajectories = tracer.trace(&bundle);
        assert_eq!(trajectories.len(), 11);
        assert!(trajectories.iter().all(|t| t.len() == 337));
    }

    #[test]
    fn parallel_trace_matches_sequential_order() {
        let tracer = RayTracer::new(
            LensSystem::from_pairs(&[(5.0, 2.0), (10.0, 3.0)]).unwrap(),
            SamplingGrid::linspace(0.0, 15.0, 500).unwrap(),
        );
        let bundle = RayBundle::linspace(-2.0, 2.0, 41).unwrap();
        let parallel = tracer.trace(&bundle);
        let sequential: Vec<Trajectory> = bundle
            .heights()
            .iter()
            .map(|&h| tracer.trace_ray(h))
            .collect();
        assert_eq!(parallel, sequential);
        assert_eq!(parallel, tracer.trace(&bundle));
    }

    #[test]
    fn progress_counts_every_ray() {
        let tracer = tracer(&[(5.0, 2.0)], vec![0.0, 5.0, 10.0]);
        let bundle = RayBundle::linspace(-1.0, 1.0, 7).unwrap();
        let progress = ProgressBar::hidden();
        progress.set_length(bundle.len() as u64);

        let trajectories = tracer.trace_with_progress(&bundle, progress.clone());
        assert_eq!(trajectories, tracer.trace(&bundle));
        assert_eq!(progress.position(), 7);
    }

    #[test]
    fn small_angle_variant() {
        let tracer =
            tracer(&[(5.0, 2.0)], vec![0.0, 5.0, 10.0]).with_propagation(Propagation::SmallAngle);
        let heights: Vec<f64> = tracer.trace_ray(2.0).heights().collect();
        assert_eq!(heights, vec![2.0, 2.0, -3.0]);
    }
}

/// Traces rays through a fixed lens system over a fixed sampling grid.
#[derive(Debug, Clone, PartialEq)]
pub struct RayTracer {
    lenses: LensSystem,
    grid: SamplingGrid,
    propagation: Propagation,
}

impl RayTracer {
    /// Creates a tracer using exact-tangent propagation.
    pub fn new(lenses: LensSystem, grid: SamplingGrid) -> Self {
        Self {
            lenses,
            grid,
            propagation: Propagation::default(),
        }
    }

    pub fn with_propagation(mut self, propagation: Propagation) -> Self {
        self.propagation = propagation;
        self
    }

    pub fn lenses(&self) -> &LensSystem {
        &self.lenses
    }

    pub fn grid(&self) -> &SamplingGrid {
        &self.grid
    }

    pub fn propagation(&self) -> Propagation {
        self.propagation
    }

    /// Traces a single ray starting parallel to the axis at `initial_height`.
    ///
    /// The returned trajectory holds exactly one sample per grid position.
    pub fn trace_ray(&self, initial_height: f64) -> Trajectory {
        let mut trajectory = Trajectory::with_capacity(self.grid.len());
        let mut ray = RayState::new(self.grid.start(), initial_height);
        trajectory.push(ray.position, ray.height);

        for (_, x_next) in self.grid.steps() {
            ray.propagate(x_next, self.propagation);
            // crossings are tested against the start of the step
            for lens in self.lenses.crossed(ray.position, x_next) {
                ray.refract(lens);
            }
            ray.position = x_next;
            trajectory.push(ray.position, ray.height);
        }

        trajectory
    }

    /// Traces every ray of the bundle in parallel.
    /// Trajectories are returned in the order of the bundle's heights.
    pub fn trace(&self, rays: &RayBundle) -> Vec<Trajectory> {
        self.trace_with_progress(rays, ProgressBar::hidden())
    }

    /// Same as [`RayTracer::trace`], advancing `progress` once per finished ray.
    pub fn trace_with_progress(&self, rays: &RayBundle, progress: ProgressBar) -> Vec<Trajectory> {
        debug!(
            "tracing {} rays over {} samples through {} lenses",
            rays.len(),
            self.grid.len(),
            self.lenses.len()
        );
        rays.heights()
            .par_iter()
            .progress_with(progress)
            .map(|&height| self.trace_ray(height))
            .collect()
    }
}
