//! Default tunables and the per-world [`SimulationConfig`].
//!
//! Constants here are only defaults. A world copies them into its own
//! immutable [`SimulationConfig`] at construction; nothing reads them as
//! mutable global state.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default gravity (screen space, Y-down).
pub const DEFAULT_GRAVITY: [f32; 2] = [0.0, 98.1];

/// Default world extent in world units.
pub const DEFAULT_WORLD_SIZE: [f32; 2] = [1280.0, 720.0];

/// Default grid rows. Together with [`DEFAULT_GRID_COLS`] this yields 10x10 cells
/// over [`DEFAULT_WORLD_SIZE`].
pub const DEFAULT_GRID_ROWS: u32 = 72;

/// Default grid columns.
pub const DEFAULT_GRID_COLS: u32 = 128;

/// Velocity-proportional damping term of the Verlet update.
///
/// The term is `displacement * DAMPING * dt²`, so its effective drag rate
/// scales with the sub-step length. Larger values bleed energy faster.
pub const DEFAULT_DAMPING: f32 = 40.0;

/// Aggressiveness of the positional collision response.
///
/// Each pass separates an overlapping pair by `RESPONSE_COEF * penetration / (rA + rB)`.
/// Values above the combined radius overshoot (pairs end up apart after one pass);
/// lower values converge over several passes with less jitter.
pub const DEFAULT_RESPONSE_COEF: f32 = 4.0;

/// Squared-distance floor below which a pair is treated as coincident and skipped.
pub const DEFAULT_EPSILON: f32 = 0.001;

/// Distance kept between particle centres and the world edge.
pub const DEFAULT_MARGIN: f32 = 4.0;

/// Number of populate/resolve/integrate passes per `step`.
pub const DEFAULT_SUB_STEPS: u32 = 4;

/// Frame budget used for overrun warnings, in milliseconds. `0.0` disables the check.
pub const DEFAULT_FRAME_BUDGET_MS: f32 = 16.6;

/// How pairs seen from two neighbouring cells are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PairMode {
    /// Every cell scans its full 3x3 block, so a pair straddling two cells (or
    /// sharing one) is visited from both sides and corrected twice.
    #[default]
    Symmetric,
    /// Each unordered pair is corrected at most once per pass: neighbour cells
    /// are only scanned when their id is greater than the home cell's, and
    /// members of the same cell only against later members.
    Deduplicated,
}

/// Collision backend. Chosen once when the world is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResolverKind {
    /// Array-of-structures storage, resolution split across the worker pool.
    #[default]
    Scalar,
    /// Structure-of-arrays storage, 4-lane vectorized pair tests.
    Simd,
}

/// Immutable tunables of one [`crate::ParticleWorld`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub world_size: Vec2,
    pub grid_rows: u32,
    pub grid_cols: u32,
    pub gravity: Vec2,
    pub damping: f32,
    pub response_coef: f32,
    pub epsilon: f32,
    pub margin: f32,
    pub sub_steps: u32,
    pub pair_mode: PairMode,
    pub resolver: ResolverKind,
    /// Worker threads for the scalar backend. `0` uses the available parallelism.
    pub worker_threads: usize,
    pub parallel: bool,
    pub frame_budget_ms: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            world_size: Vec2::from_array(DEFAULT_WORLD_SIZE),
            grid_rows: DEFAULT_GRID_ROWS,
            grid_cols: DEFAULT_GRID_COLS,
            gravity: Vec2::from_array(DEFAULT_GRAVITY),
            damping: DEFAULT_DAMPING,
            response_coef: DEFAULT_RESPONSE_COEF,
            epsilon: DEFAULT_EPSILON,
            margin: DEFAULT_MARGIN,
            sub_steps: DEFAULT_SUB_STEPS,
            pair_mode: PairMode::default(),
            resolver: ResolverKind::default(),
            worker_threads: 0,
            parallel: cfg!(feature = "parallel"),
            frame_budget_ms: DEFAULT_FRAME_BUDGET_MS,
        }
    }
}

impl SimulationConfig {
    /// Default tunables over a custom world and grid.
    pub fn new(world_width: f32, world_height: f32, rows: u32, cols: u32) -> Self {
        Self {
            world_size: Vec2::new(world_width, world_height),
            grid_rows: rows,
            grid_cols: cols,
            ..Self::default()
        }
    }

    pub fn with_gravity(mut self, gravity: Vec2) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn with_damping(mut self, damping: f32) -> Self {
        self.damping = damping;
        self
    }

    pub fn with_response_coef(mut self, response_coef: f32) -> Self {
        self.response_coef = response_coef;
        self
    }

    pub fn with_margin(mut self, margin: f32) -> Self {
        self.margin = margin;
        self
    }

    pub fn with_sub_steps(mut self, sub_steps: u32) -> Self {
        self.sub_steps = sub_steps;
        self
    }

    pub fn with_pair_mode(mut self, pair_mode: PairMode) -> Self {
        self.pair_mode = pair_mode;
        self
    }

    pub fn with_resolver(mut self, resolver: ResolverKind) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_worker_threads(mut self, worker_threads: usize) -> Self {
        self.worker_threads = worker_threads;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Checks every tunable. Grid geometry is checked by
    /// [`crate::collision::grid::GridLayout::new`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        crate::collision::grid::GridLayout::new(
            self.world_size.x,
            self.world_size.y,
            self.grid_rows,
            self.grid_cols,
        )?;

        if self.sub_steps == 0 {
            return Err(ConfigError::InvalidSubSteps);
        }
        if !self.gravity.is_finite() {
            return Err(ConfigError::InvalidParameter {
                name: "gravity",
                value: if self.gravity.x.is_finite() {
                    self.gravity.y
                } else {
                    self.gravity.x
                },
            });
        }

        check_non_negative("damping", self.damping)?;
        check_non_negative("epsilon", self.epsilon)?;
        check_non_negative("frame_budget_ms", self.frame_budget_ms)?;
        check_non_negative("margin", self.margin)?;
        if self.response_coef <= 0.0 || !self.response_coef.is_finite() {
            return Err(ConfigError::InvalidParameter {
                name: "response_coef",
                value: self.response_coef,
            });
        }
        if 2.0 * self.margin >= self.world_size.min_element() {
            return Err(ConfigError::InvalidParameter {
                name: "margin",
                value: self.margin,
            });
        }

        Ok(())
    }
}

fn check_non_negative(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value < 0.0 || !value.is_finite() {
        return Err(ConfigError::InvalidParameter { name, value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(SimulationConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_zero_sub_steps() {
        let config = SimulationConfig::default().with_sub_steps(0);
        assert_eq!(config.validate(), Err(ConfigError::InvalidSubSteps));
    }

    #[test]
    fn rejects_margin_wider_than_world() {
        let config = SimulationConfig::new(100.0, 100.0, 10, 10).with_margin(50.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidParameter { name: "margin", .. })
        ));
    }

    #[test]
    fn rejects_non_positive_response() {
        let config = SimulationConfig::default().with_response_coef(0.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidParameter {
                name: "response_coef",
                ..
            })
        ));
    }

    #[test]
    fn rejects_non_dividing_grid() {
        let config = SimulationConfig::new(100.0, 100.0, 3, 10);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonDividingGrid { rows: 3, .. })
        ));
    }
}
