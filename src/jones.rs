//! Jones calculus for fully polarized light.
//!
//! This module represents polarization states as 2-component complex Jones
//! vectors and optical elements as 2x2 complex Jones matrices. A beam passing
//! through a sequence of elements is transformed by the product of their
//! matrices, applied in the order the beam meets them.
//!
//! The module provides:
//! - Standard input states (horizontal, vertical, linear at an angle)
//! - Quarter waveplate, half waveplate and linear polarizer matrices
//! - Evaluation of an output state from an input and an element list
//! - Intensity and Stokes parameters of a state
//!
//! All angles are given in degrees, measured from the horizontal axis.

use nalgebra::{Matrix2, Vector2};
use num_complex::Complex32;
use serde::{Deserialize, Serialize};
use std::fmt;


/// Column vector `(Ex, Ey)` of a fully polarized state.
pub type JonesVector = Vector2<Complex32>;
/// 2x2 transformation matrix of an optical element.
pub type JonesMatrix = Matrix2<Complex32>;

fn real(value: f32) -> Complex32 {
    Complex32::new(value, 0.0)
}

pub fn horizontal() -> JonesVector {
    JonesVector::new(real(1.0), real(0.0))
}

pub fn vertical() -> JonesVector {
    JonesVector::new(real(0.0), real(1.0))
}

/// Linear polarization at `theta_deg` from the horizontal.
pub fn linear(theta_deg: f32) -> JonesVector {
    let theta = theta_deg.to_radians();
    JonesVector::new(real(theta.cos()), real(theta.sin()))
}

/// Quarter waveplate with its fast axis at `theta_deg`.
pub fn quarter_waveplate(theta_deg: f32) -> JonesMatrix {
    let theta = theta_deg.to_radians();
    let (s, c) = theta.sin_cos();
    let off = Complex32::new(1.0, -1.0) * s * c;
    JonesMatrix::new(
        Complex32::new(c * c, s * s),
        off,
        off,
        Complex32::new(s * s, c * c),
    )
}

/// Half waveplate with its fast axis at `theta_deg`.
pub fn half_waveplate(theta_deg: f32) -> JonesMatrix {
    let (s, c) = (2.0 * theta_deg.to_radians()).sin_cos();
    JonesMatrix::new(real(c), real(s), real(s), real(-c))
}

/// Ideal linear polarizer with its transmission axis at `theta_deg`.
pub fn polarizer(theta_deg: f32) -> JonesMatrix {
    let (s, c) = theta_deg.to_radians().sin_cos();
    JonesMatrix::new(real(c * c), real(c * s), real(c * s), real(s * s))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    QuarterWaveplate,
    HalfWaveplate,
    Polarizer,
}

/// An optical element with its axis angle in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Element {
    pub kind: ElementKind,
    pub angle: f32,
}

impl Element {
    pub fn new(kind: ElementKind, angle: f32) -> Self {
        Self { kind, angle }
    }

    pub fn matrix(&self) -> JonesMatrix {
        match self.kind {
            ElementKind::QuarterWaveplate => quarter_waveplate(self.angle),
            ElementKind::HalfWaveplate => half_waveplate(self.angle),
            ElementKind::Polarizer => polarizer(self.angle),
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.kind {
            ElementKind::QuarterWaveplate => "QWP",
            ElementKind::HalfWaveplate => "HWP",
            ElementKind::Polarizer => "POL",
        };
        write!(f, "{}({}°)", name, self.angle)
    }
}

/// Applies `elements` to `input` in order, returning `M_n ... M_1 input`.
pub fn evaluate(input: &JonesVector, elements: &[Element]) -> JonesVector {
    elements
        .iter()
        .fold(*input, |field, element| element.matrix() * field)
}

/// Combined matrix `M_n ... M_1` of an element sequence.
pub fn system_matrix(elements: &[Element]) -> JonesMatrix {
    elements
        .iter()
        .fold(JonesMatrix::identity(), |acc, element| element.matrix() * acc)
}

/// Total intensity `|Ex|^2 + |Ey|^2`.
pub fn intensity(field: &JonesVector) -> f32 {
    field.iter().map(|c| c.norm_sqr()).sum()
}

/// Stokes parameters of a fully polarized state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Stokes {
    pub s0: f32,
    pub s1: f32,
    pub s2: f32,
    pub s3: f32,
}

impl Stokes {
    pub fn from_jones(field: &JonesVector) -> Self {
        let (ex, ey) = (field[0], field[1]);
        let cross = ex.conj() * ey;
        Self {
            s0: ex.norm_sqr() + ey.norm_sqr(),
            s1: ex.norm_sqr() - ey.norm_sqr(),
            s2: 2.0 * cross.re,
            s3: 2.0 * cross.im,
        }
    }

    /// Orientation of the polarization ellipse in degrees.
    pub fn orientation_angle(&self) -> f32 {
        0.5 * self.s2.atan2(self.s1).to_degrees()
    }

    /// Ellipticity angle in degrees, 0 for linear and ±45 for circular light.
    pub fn ellipticity_angle(&self) -> f32 {
        if self.s0 == 0.0 {
            return 0.0;
        }
        0.5 * (self.s3 / self.s0).clamp(-1.0, 1.0).asin().to_degrees()
    }
}

impl fmt::Display for Stokes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "S = ({:.4}, {:.4}, {:.4}, {:.4})",
            self.s0, self.s1, self.s2, self.s3
        )
    }
}

/// Input state, element sequence and resulting output of one evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Polarization {
    pub input: JonesVector,
    pub elements: Vec<Element>,
    pub output: JonesVector,
}

impl Polarization {
    pub fn evaluate(input: JonesVector, elements: Vec<Element>) -> Self {
        let output = evaluate(&input, &elements);
        Self {
            input,
            elements,
            output,
        }
    }

    /// Fraction of the input intensity that reaches the output.
    pub fn transmission(&self) -> f32 {
        let input = intensity(&self.input);
        if input == 0.0 {
            return 0.0;
        }
        intensity(&self.output) / input
    }
}
