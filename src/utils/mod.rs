//! Utility helpers: worker pool, scoped timing, and step profiling.

pub mod logging;
pub mod pool;
pub mod profiling;

pub use logging::{warn_if_frame_budget_exceeded, ScopedTimer};
pub use pool::{PoolStats, Task, WorkerPool};
pub use profiling::StepProfiler;
