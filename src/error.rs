//! Construction-time errors.
//!
//! The physics core has no runtime error channel: every tunable is checked
//! once when a grid or world is built and rejected here instead of producing
//! NaN positions later.

use thiserror::Error;

/// Errors raised while validating a simulation configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("grid must have at least one row and one column (got {rows}x{cols})")]
    EmptyGrid { rows: u32, cols: u32 },

    #[error("world size must be positive whole units (got {width}x{height})")]
    InvalidWorldSize { width: f32, height: f32 },

    #[error("grid {rows}x{cols} does not evenly divide world {width}x{height}")]
    NonDividingGrid {
        width: f32,
        height: f32,
        rows: u32,
        cols: u32,
    },

    #[error("sub-step count must be at least 1")]
    InvalidSubSteps,

    #[error("invalid value for `{name}`: {value}")]
    InvalidParameter { name: &'static str, value: f32 },

    #[error("failed to start worker pool: {0}")]
    WorkerPool(String),
}
