//! Caller-owned worker pool for impact propagation.

use crate::error::{CiaError, Result};

/// Bounded rayon pool passed explicitly to the operations that fan out work.
#[derive(Debug)]
pub struct WorkerPool {
    pool: rayon::ThreadPool,
}

impl WorkerPool {
    /// Build a pool with `threads` workers, or one per available core.
    ///
    /// # Errors
    ///
    /// `InvalidSettings` for zero threads, `ThreadPool` if rayon cannot
    /// spawn the workers.
    pub fn new(threads: Option<usize>) -> Result<Self> {
        let mut builder = rayon::ThreadPoolBuilder::new().thread_name(|i| format!("cia-worker-{}", i));
        match threads {
            Some(0) => {
                return Err(CiaError::InvalidSettings {
                    message: "threads must be at least 1".to_string(),
                })
            }
            Some(n) => builder = builder.num_threads(n),
            None => {}
        }
        let pool = builder.build().map_err(|e| CiaError::ThreadPool {
            message: e.to_string(),
        })?;
        Ok(Self { pool })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run `op` inside the pool; parallel iterators used by `op` execute on
    /// the pool's workers.
    pub fn install<OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(op)
    }
}
