use itertools::Itertools;
use ndarray::Array1;

use crate::error::{OpticsError, Result};

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn linspace_includes_endpoints() {
        let grid = SamplingGrid::linspace(0.0, 15.0, 500).unwrap();
        assert_eq!(grid.len(), 500);
        assert_eq!(grid.start(), 0.0);
        assert!((grid.end() - 15.0).abs() < 1e-5);
    }

    #[test]
    fn single_sample() {
        let grid = SamplingGrid::linspace(2.0, 1.0, 1).unwrap();
        assert_eq!(grid.positions(), &[2.0]);
        assert_eq!(grid.steps().count(), 0);
    }

    #[test]
    fn rejects_bad_grids() {
        assert!(SamplingGrid::new(vec![]).is_err());
        assert!(SamplingGrid::new(vec![0.0, 1.0, 1.0]).is_err());
        assert!(SamplingGrid::new(vec![0.0, 2.0, 1.0]).is_err());
        assert!(SamplingGrid::new(vec![0.0, f64::NAN]).is_err());
        assert!(SamplingGrid::linspace(0.0, 1.0, 0).is_err());
        assert!(SamplingGrid::linspace(1.0, 1.0, 3).is_err());
        assert!(SamplingGrid::linspace(0.0, f64::INFINITY, 3).is_err());
    }

    #[test]
    fn fine_grid_far_from_origin() {
        let grid = SamplingGrid::linspace(1e6, 1e6 + 1.0, 100).unwrap();
        assert_eq!(grid.len(), 100);
        assert!(grid.steps().all(|(a, b)| b > a));
        assert!((grid.end() - (1e6 + 1.0)).abs() < 1e-6);
    }

    #[test]
    fn error_names_offending_index() {
        let err = SamplingGrid::new(vec![0.0, 5.0, 4.0]).unwrap_err();
        assert_eq!(
            err,
            OpticsError::InvalidGrid("position 4 at index 2 does not exceed 5".to_string())
        );
    }

    #[test]
    fn steps_pair_neighbours() {
        let grid = SamplingGrid::new(vec![0.0, 5.0, 10.0]).unwrap();
        let steps: Vec<(f64, f64)> = grid.steps().collect();
        assert_eq!(steps, vec![(0.0, 5.0), (5.0, 10.0)]);
    }
}

/// Strictly increasing axial positions at which ray heights are recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingGrid {
    positions: Vec<f64>,
}

impl SamplingGrid {
    /// Creates a grid from explicit positions.
    pub fn new(positions: Vec<f64>) -> Result<Self> {
        if positions.is_empty() {
            return Err(OpticsError::InvalidGrid(
                "grid must contain at least one position".to_string(),
            ));
        }
        if let Some(index) = positions.iter().position(|x| !x.is_finite()) {
            return Err(OpticsError::InvalidGrid(format!(
                "position at index {} is not finite",
                index
            )));
        }
        if let Some((index, (prev, next))) = positions
            .iter()
            .tuple_windows()
            .enumerate()
            .find(|(_, (prev, next))| next <= prev)
        {
            return Err(OpticsError::InvalidGrid(format!(
                "position {} at index {} does not exceed {}",
                next,
                index + 1,
                prev
            )));
        }
        Ok(Self { positions })
    }

    /// Creates `num_samples` evenly spaced positions from `start` to `end` inclusive.
    pub fn linspace(start: f64, end: f64, num_samples: usize) -> Result<Self> {
        if num_samples == 0 {
            return Err(OpticsError::InvalidGrid(
                "number of samples must be positive".to_string(),
            ));
        }
        if !start.is_finite() || !end.is_finite() {
            return Err(OpticsError::InvalidGrid(format!(
                "grid bounds must be finite, got {} to {}",
                start, end
            )));
        }
        if num_samples == 1 {
            return Self::new(vec![start]);
        }
        if end <= start {
            return Err(OpticsError::InvalidGrid(format!(
                "grid end {} must exceed start {}",
                end, start
            )));
        }
        Self::new(Array1::linspace(start, end, num_samples).to_vec())
    }

    pub fn positions(&self) -> &[f64] {
        &self.positions
    }

    pub fn start(&self) -> f64 {
        self.positions[0]
    }

    pub fn end(&self) -> f64 {
        self.positions[self.positions.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Always false, a grid holds at least one position.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Consecutive `(from, to)` pairs.
    pub fn steps(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.positions.iter().copied().tuple_windows()
    }
}
