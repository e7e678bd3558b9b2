use thiserror::Error;

/// Errors raised while building the inputs of a trace run.
///
/// All of these surface at construction time, so a trace never starts on
/// input that could corrupt a partial trajectory.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OpticsError {
    /// A lens is physically degenerate, e.g. zero focal length.
    #[error("invalid lens at index {index}: {reason}")]
    InvalidLens { index: usize, reason: String },
    /// The sampling grid is empty, non-finite or not strictly increasing.
    #[error("invalid sampling grid: {0}")]
    InvalidGrid(String),
    /// An initial ray height is not a finite number.
    #[error("invalid rays: {0}")]
    InvalidRays(String),
}

pub type Result<T> = std::result::Result<T, OpticsError>;
