//! Order-preserving parallel map over independently-owned items.
//!
//! The annotation core itself is single-threaded and pure; parallelism in
//! the surrounding system comes from mapping over disjoint Track/Activity
//! graphs (one per clip) and merging afterward. The worker count is always
//! an explicit argument, never ambient global state.

use crate::{Error, Result};
use rayon::prelude::*;
use tracing::debug;

/// Map `f` over `items` on a scoped thread pool of exactly `workers`
/// threads, preserving input order.
///
/// `workers == 1` still runs on a pool but is effectively sequential.
/// `workers == 0` is a configuration error.
pub fn batch_map<T, U, F>(items: Vec<T>, workers: usize, f: F) -> Result<Vec<U>>
where
    T: Send,
    U: Send,
    F: Fn(T) -> U + Send + Sync,
{
    if workers == 0 {
        return Err(Error::InvalidConfig(
            "batch_map requires at least one worker".to_string(),
        ));
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|e| Error::InvalidConfig(format!("failed to build worker pool: {}", e)))?;

    debug!(workers, items = items.len(), "dispatching batch map");
    Ok(pool.install(|| items.into_par_iter().map(f).collect()))
}
