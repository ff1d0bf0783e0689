//! Fixed-size worker pool with submit-then-barrier semantics.
//!
//! The collision core only needs two capabilities from a pool: hand it a batch
//! of independent tasks, and block until every one of them has finished.
//! Tasks return nothing and have no error channel.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::error::ConfigError;

/// A unit of work. Borrows from the caller are allowed; the barrier in
/// [`WorkerPool::submit_and_wait`] keeps them alive for the task's duration.
pub type Task<'env> = Box<dyn FnOnce() + Send + 'env>;

/// Cumulative counters over the pool's lifetime.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct PoolStats {
    pub batches: u64,
    pub tasks: u64,
    /// Sum of task run times across all workers.
    pub busy_time: Duration,
}

/// Worker pool sized to the hardware by default.
pub struct WorkerPool {
    #[cfg(feature = "parallel")]
    pool: rayon::ThreadPool,
    threads: usize,
    stats: Mutex<PoolStats>,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("threads", &self.threads)
            .field("stats", &*self.stats.lock())
            .finish()
    }
}

impl WorkerPool {
    /// Starts `threads` workers; `0` means one per available hardware thread.
    pub fn new(threads: usize) -> Result<Self, ConfigError> {
        let threads = if threads == 0 {
            std::thread::available_parallelism().map_or(1, |n| n.get())
        } else {
            threads
        };

        #[cfg(feature = "parallel")]
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|index| format!("collider-worker-{index}"))
            .build()
            .map_err(|err| ConfigError::WorkerPool(err.to_string()))?;

        log::debug!("worker pool started with {threads} threads");

        Ok(Self {
            #[cfg(feature = "parallel")]
            pool,
            threads,
            stats: Mutex::new(PoolStats::default()),
        })
    }

    #[inline]
    pub fn thread_count(&self) -> usize {
        self.threads
    }

    pub fn stats(&self) -> PoolStats {
        *self.stats.lock()
    }

    /// Submits every task and returns once all of them have completed.
    ///
    /// Tasks of one batch may run concurrently in any order. Nothing from the
    /// next call starts before this one returns.
    pub fn submit_and_wait<'env>(&self, tasks: Vec<Task<'env>>) {
        let count = tasks.len() as u64;
        let stats = &self.stats;
        let run = move |task: Task<'env>| {
            let start = Instant::now();
            task();
            stats.lock().busy_time += start.elapsed();
        };

        #[cfg(feature = "parallel")]
        self.pool.scope(|scope| {
            for task in tasks {
                scope.spawn(move |_| run(task));
            }
        });

        #[cfg(not(feature = "parallel"))]
        for task in tasks {
            run(task);
        }

        let mut stats = self.stats.lock();
        stats.batches += 1;
        stats.tasks += count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn zero_threads_uses_available_parallelism() {
        let pool = WorkerPool::new(0).expect("pool starts");
        assert!(pool.thread_count() >= 1);
    }

    #[test]
    fn barrier_waits_for_every_task() {
        let pool = WorkerPool::new(4).expect("pool starts");
        let counter = AtomicUsize::new(0);
        let tasks: Vec<Task<'_>> = (0..32)
            .map(|_| {
                let counter = &counter;
                Box::new(move || {
                    counter.fetch_add(1, Ordering::Relaxed);
                }) as Task<'_>
            })
            .collect();

        pool.submit_and_wait(tasks);
        assert_eq!(counter.load(Ordering::Relaxed), 32);

        let stats = pool.stats();
        assert_eq!(stats.batches, 1);
        assert_eq!(stats.tasks, 32);
    }

    #[test]
    fn tasks_can_write_disjoint_borrowed_slices() {
        let pool = WorkerPool::new(3).expect("pool starts");
        let mut data = vec![0u32; 12];
        let tasks: Vec<Task<'_>> = data
            .chunks_mut(4)
            .enumerate()
            .map(|(i, chunk)| {
                Box::new(move || chunk.iter_mut().for_each(|v| *v = i as u32)) as Task<'_>
            })
            .collect();
        pool.submit_and_wait(tasks);
        assert_eq!(data, vec![0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2]);
    }
}
