use std::time::Duration;

/// Phase timings and counters of the last `step`, summed over its sub-steps.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct StepProfiler {
    pub populate_time: Duration,
    pub resolve_time: Duration,
    pub integrate_time: Duration,
    pub total_frame_time: Duration,

    pub particle_count: usize,
    pub sub_steps: u32,
    /// Corrected pairs across all sub-steps.
    pub contact_count: usize,
}

impl StepProfiler {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Logs a one-step breakdown at `info` level.
    pub fn report(&self) {
        let total_us = self.total_frame_time.as_micros() as f32;
        if total_us < 1.0 {
            return;
        }

        let share = |phase: Duration| (phase.as_micros() as f32 / total_us) * 100.0;
        log::info!(
            "particles: {}, contacts: {}, sub-steps: {}, total: {:.2} ms \
             (populate {:.1}%, resolve {:.1}%, integrate {:.1}%)",
            self.particle_count,
            self.contact_count,
            self.sub_steps,
            self.total_frame_time.as_secs_f32() * 1000.0,
            share(self.populate_time),
            share(self.resolve_time),
            share(self.integrate_time),
        );
    }
}
