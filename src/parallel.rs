//! Worker pool sizing for the per-document stages.

use rayon::ThreadPoolBuilder;
use tracing::warn;

/// Runs `op` on a pool of `workers` threads. Parallel iterators inside `op`
/// use that pool; when it cannot be built they fall back to rayon's global pool.
pub(crate) fn with_workers<R, F>(workers: usize, op: F) -> R
where
    R: Send,
    F: FnOnce() -> R + Send,
{
    match ThreadPoolBuilder::new().num_threads(workers.max(1)).build() {
        Ok(pool) => pool.install(op),
        Err(e) => {
            warn!(workers, error = %e, "Could not build worker pool, using the global pool");
            op()
        }
    }
}
