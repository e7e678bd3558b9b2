//! Thin lens ray tracing and Jones calculus polarization.
//!
//! Two independent pipelines share this crate:
//! - [`tracer`]: paraxial propagation of rays through a [`lens::LensSystem`]
//!   sampled on a [`grid::SamplingGrid`], producing one [`ray::Trajectory`] per ray.
//! - [`jones`]: transformation of a polarization state through a sequence of
//!   waveplates and polarizers.
//!
//! [`simulation::Simulation`] runs both from [`settings::Settings`] and hands
//! the results to [`output`] and [`render`].

pub mod config;
pub mod error;
pub mod grid;
pub mod jones;
pub mod lens;
pub mod output;
pub mod ray;
pub mod render;
pub mod settings;
pub mod simulation;
pub mod tracer;
#[cfg(feature = "visualization")]
pub mod viewer;
