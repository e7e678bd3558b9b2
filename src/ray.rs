//! Per-ray integration state and recorded trajectories.
//!
//! [`RayState`] is the transient, exclusively owned state of a single ray
//! while it is being traced. [`Trajectory`] is what the trace leaves behind:
//! one `(position, height)` sample per grid position. [`RayBundle`] holds
//! the validated initial heights of every ray in a run.

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::{
    error::{OpticsError, Result},
    lens::Lens,
};

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn tangent_and_small_angle_slopes() {
        assert_eq!(Propagation::Tangent.slope(0.0), 0.0);
        assert_eq!(Propagation::SmallAngle.slope(-1.0), -1.0);
        assert!((Propagation::Tangent.slope(-1.0) + 1.5574077).abs() < 1e-6);
    }

    #[test]
    fn propagate_then_refract() {
        let mut ray = RayState::new(0.0, 2.0);
        ray.propagate(5.0, Propagation::Tangent);
        assert_eq!(ray.height, 2.0);
        assert_eq!(ray.position, 0.0);
        ray.refract(&Lens::new(5.0, 2.0));
        assert_eq!(ray.angle, -1.0);
    }

    #[test]
    fn bundle_linspace() {
        let bundle = RayBundle::linspace(-2.0, 2.0, 11).unwrap();
        assert_eq!(bundle.len(), 11);
        assert_eq!(bundle.heights()[0], -2.0);
        assert!(bundle.heights()[5].abs() < 1e-5);
        assert!((bundle.heights()[10] - 2.0).abs() < 1e-5);
    }

    #[test]
    fn bundle_rejects_non_finite() {
        assert!(RayBundle::new(vec![0.0, f64::NAN]).is_err());
        assert!(RayBundle::linspace(f64::NEG_INFINITY, 2.0, 3).is_err());
    }

    #[test]
    fn trajectory_truncation() {
        let mut trajectory = Trajectory::with_capacity(3);
        trajectory.push(0.0, 1.0);
        trajectory.push(1.0, 2.0);
        trajectory.push(2.0, 3.0);
        assert_eq!(trajectory.truncated(2), &[(0.0, 1.0), (1.0, 2.0)]);
        assert_eq!(trajectory.truncated(10).len(), 3);
        assert_eq!(trajectory.last(), Some((2.0, 3.0)));
    }
}

/// How a ray's height advances between two grid positions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Propagation {
    /// `height += dx * tan(angle)`
    #[default]
    Tangent,
    /// `height += dx * angle`, the strictly linearised variant.
    SmallAngle,
}

impl Propagation {
    /// Height change per unit of axial distance at `angle`.
    pub fn slope(&self, angle: f64) -> f64 {
        match self {
            Propagation::Tangent => angle.tan(),
            Propagation::SmallAngle => angle,
        }
    }
}

/// Mutable state of one ray during a trace.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayState {
    pub position: f64, // current axial position
    pub height: f64,   // current transverse height
    pub angle: f64,    // angle to the optical axis in radians
}

impl RayState {
    /// A ray starting at `position` parallel to the optical axis.
    pub fn new(position: f64, height: f64) -> Self {
        Self {
            position,
            height,
            angle: 0.0,
        }
    }

    /// Updates the height for straight-line travel to `x_next`.
    /// The position is left untouched so lens crossings can still be tested
    /// against the start of the step.
    pub fn propagate(&mut self, x_next: f64, propagation: Propagation) {
        let dx = x_next - self.position;
        self.height += dx * propagation.slope(self.angle);
    }

    /// Applies the thin lens angle update at the current height.
    pub fn refract(&mut self, lens: &Lens) {
        self.angle = lens.refract(self.angle, self.height);
    }
}

/// Recorded `(position, height)` samples of one ray.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Trajectory {
    samples: Vec<(f64, f64)>,
}

impl Trajectory {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, position: f64, height: f64) {
        self.samples.push((position, height));
    }

    pub fn samples(&self) -> &[(f64, f64)] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn heights(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|&(_, height)| height)
    }

    pub fn positions(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|&(position, _)| position)
    }

    pub fn last(&self) -> Option<(f64, f64)> {
        self.samples.last().copied()
    }

    /// The first `n` samples, or all of them if there are fewer.
    pub fn truncated(&self, n: usize) -> &[(f64, f64)] {
        &self.samples[..n.min(self.samples.len())]
    }
}

/// Validated initial heights of the rays in one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RayBundle {
    heights: Vec<f64>,
}

impl RayBundle {
    pub fn new(heights: Vec<f64>) -> Result<Self> {
        if let Some(index) = heights.iter().position(|h| !h.is_finite()) {
            return Err(OpticsError::InvalidRays(format!(
                "initial height at index {} is not finite",
                index
            )));
        }
        Ok(Self { heights })
    }

    /// `count` heights evenly spread from `start` to `end` inclusive.
    pub fn linspace(start: f64, end: f64, count: usize) -> Result<Self> {
        if !start.is_finite() || !end.is_finite() {
            return Err(OpticsError::InvalidRays(format!(
                "height bounds must be finite, got {} to {}",
                start, end
            )));
        }
        Self::new(Array1::linspace(start, end, count).to_vec())
    }

    pub fn heights(&self) -> &[f64] {
        &self.heights
    }

    pub fn len(&self) -> usize {
        self.heights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heights.is_empty()
    }
}
