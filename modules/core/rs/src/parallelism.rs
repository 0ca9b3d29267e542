use std::cmp::Ordering;
use std::thread::available_parallelism;

use eyre::Result;
use rayon::{ThreadPool, ThreadPoolBuilder};

// Negative values count back from the number of available cores: -1 means all of them,
// -2 all but one, and so on. Zero is treated as a request for a single thread.
fn normalize(requested: isize, max: isize) -> usize {
    match requested.cmp(&0) {
        Ordering::Less => (max + requested + 1).max(1) as usize,
        Ordering::Equal => 1,
        Ordering::Greater => requested.min(max) as usize,
    }
}

pub fn available(requested: isize) -> Result<usize> {
    let max = available_parallelism()?.get() as isize;
    Ok(normalize(requested, max))
}

/// Build a bounded worker pool for the screening engine.
pub fn pool(requested: isize) -> Result<ThreadPool> {
    let threads = available(requested)?;
    let pool = ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|ind| format!("varsieve-worker-{ind}"))
        .build()?;
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_count_normalization() {
        for (threads, max, expected) in [
            (0, 8, 1),
            (1, 8, 1),
            (6, 8, 6),
            (8, 8, 8),
            (64, 8, 8),
            (-1, 8, 8),
            (-3, 8, 6),
            (-8, 8, 1),
            (-100, 8, 1),
        ] {
            assert_eq!(normalize(threads, max), expected, "requested {threads} of {max}");
        }
    }

    #[test]
    fn test_pool_is_bounded() -> Result<()> {
        let pool = pool(1)?;
        assert_eq!(pool.current_num_threads(), 1);
        Ok(())
    }
}
