//! Thin lenses and ordered lens systems.
//!
//! A [`LensSystem`] is validated once at construction and never mutated
//! afterwards, so every ray of a trace run sees the same optics.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{OpticsError, Result};


/// An idealised lens of negligible thickness.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Lens {
    pub position: f64,     // axial coordinate
    pub focal_length: f64, // positive is converging
}

impl Lens {
    pub fn new(position: f64, focal_length: f64) -> Self {
        Self {
            position,
            focal_length,
        }
    }

    /// Returns the ray angle after crossing the lens at `height`.
    pub fn refract(&self, angle: f64, height: f64) -> f64 {
        angle - height / self.focal_length
    }

    fn validate(&self, index: usize) -> Result<()> {
        if !self.position.is_finite() {
            return Err(OpticsError::InvalidLens {
                index,
                reason: format!("position {} is not finite", self.position),
            });
        }
        if !self.focal_length.is_finite() {
            return Err(OpticsError::InvalidLens {
                index,
                reason: format!("focal length {} is not finite", self.focal_length),
            });
        }
        if self.focal_length == 0.0 {
            return Err(OpticsError::InvalidLens {
                index,
                reason: "focal length must be nonzero".to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Lens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x = {:.3}, f = {:.3}", self.position, self.focal_length)
    }
}

/// Ordered, immutable set of thin lenses for one trace run.
///
/// **Context**: Lens positions need not be sorted. When several lenses are
/// crossed within a single grid step they refract in construction order.
///
/// **How it Works**: Every lens is validated up front, so a degenerate
/// focal length is reported before any ray is traced rather than turning
/// into a non-finite angle mid-trajectory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LensSystem {
    lenses: Vec<Lens>,
}

impl LensSystem {
    /// Creates a lens system, failing on the first degenerate lens.
    pub fn new(lenses: Vec<Lens>) -> Result<Self> {
        for (index, lens) in lenses.iter().enumerate() {
            lens.validate(index)?;
        }
        Ok(Self { lenses })
    }

    /// Creates a lens system from `(position, focal_length)` pairs.
    pub fn from_pairs(pairs: &[(f64, f64)]) -> Result<Self> {
        Self::new(
            pairs
                .iter()
                .map(|&(position, focal_length)| Lens::new(position, focal_length))
                .collect(),
        )
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Lens> {
        self.lenses.iter()
    }

    pub fn lenses(&self) -> &[Lens] {
        &self.lenses
    }

    pub fn get(&self, index: usize) -> Option<&Lens> {
        self.lenses.get(index)
    }

    pub fn len(&self) -> usize {
        self.lenses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lenses.is_empty()
    }

    /// Lenses crossed by a step from `from` to `to`, in construction order.
    /// A lens counts as crossed if `from < position <= to`.
    pub fn crossed(&self, from: f64, to: f64) -> impl Iterator<Item = &Lens> + '_ {
        self.lenses
            .iter()
            .filter(move |lens| from < lens.position && lens.position <= to)
    }
}

impl<'a> IntoIterator for &'a LensSystem {
    type Item = &'a Lens;
    type IntoIter = std::slice::Iter<'a, Lens>;

    fn into_iter(self) -> Self::IntoIter {
        self.lenses.iter()
    }
}
