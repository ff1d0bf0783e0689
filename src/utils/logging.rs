use log::{log_enabled, trace, warn, Level};
use std::time::{Duration, Instant};

/// Scoped timer around a simulation phase.
///
/// Emits `trace!` spans when tracing is enabled and, when given a sink, adds
/// the elapsed time to it on drop.
pub struct ScopedTimer<'a> {
    label: &'static str,
    start: Instant,
    sink: Option<&'a mut Duration>,
}

impl<'a> ScopedTimer<'a> {
    pub fn new(label: &'static str) -> Self {
        if log_enabled!(Level::Trace) {
            trace!("start {label}");
        }
        Self {
            label,
            start: Instant::now(),
            sink: None,
        }
    }

    /// Same as [`ScopedTimer::new`], also accumulating into `sink`.
    pub fn accumulate(label: &'static str, sink: &'a mut Duration) -> Self {
        let mut timer = Self::new(label);
        timer.sink = Some(sink);
        timer
    }
}

impl Drop for ScopedTimer<'_> {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        if let Some(sink) = self.sink.as_deref_mut() {
            *sink += elapsed;
        }
        if log_enabled!(Level::Trace) {
            trace!("end {} ({} µs)", self.label, elapsed.as_micros());
        }
    }
}

/// Warns when a step took longer than `budget_ms`. A zero budget disables the
/// check. Returns whether the budget was exceeded.
pub fn warn_if_frame_budget_exceeded(duration: Duration, budget_ms: f32) -> bool {
    let elapsed_ms = duration.as_secs_f32() * 1000.0;
    if budget_ms <= 0.0 || elapsed_ms <= budget_ms {
        return false;
    }
    warn!("step exceeded budget: {elapsed_ms:.2} ms > {budget_ms:.2} ms");
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_accumulates_into_sink() {
        let mut total = Duration::ZERO;
        {
            let _timer = ScopedTimer::accumulate("test", &mut total);
            std::thread::sleep(Duration::from_millis(2));
        }
        assert!(total >= Duration::from_millis(2));
    }

    #[test]
    fn zero_budget_never_warns() {
        assert!(!warn_if_frame_budget_exceeded(Duration::from_secs(1), 0.0));
        assert!(warn_if_frame_budget_exceeded(Duration::from_millis(20), 16.6));
        assert!(!warn_if_frame_budget_exceeded(Duration::from_millis(5), 16.6));
    }
}
