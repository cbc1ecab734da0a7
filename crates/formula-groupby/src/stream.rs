//! Ordered execution streams.
//!
//! A [`Stream`] is the queue every kernel of an aggregation is issued on. Kernels run in issue
//! order; each one fans its rows (or groups) out across the stream's thread pool and joins before
//! the next kernel starts. Submission is synchronous in this implementation, so work issued on a
//! stream has completed by the time the submitting call returns and [`Stream::synchronize`] is a
//! no-op fence.
//!
//! Rayon normally uses a **global** thread pool, whose initialization panics if the OS refuses to
//! spawn threads. Streams own crate-local pools instead and fall back to serial execution when no
//! pool can be built.

#[cfg(feature = "parallel")]
use rayon::prelude::*;
#[cfg(feature = "parallel")]
use rayon::ThreadPool;
use std::fmt;
#[cfg(feature = "parallel")]
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

/// Below this many items a kernel runs inline on the calling thread.
#[cfg(feature = "parallel")]
const MIN_PARALLEL_LEN: usize = 4096;

static DEFAULT_STREAM: OnceLock<Stream> = OnceLock::new();

fn next_stream_id() -> u64 {
    static NEXT_ID: AtomicU64 = AtomicU64::new(1);
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

#[cfg(feature = "parallel")]
fn desired_threads() -> usize {
    let from_env = std::env::var("RAYON_NUM_THREADS")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|&n| n > 0);
    from_env.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    })
}

#[cfg(feature = "parallel")]
fn build_pool(requested: usize) -> Option<ThreadPool> {
    let try_build = |n| rayon::ThreadPoolBuilder::new().num_threads(n).build();

    match try_build(requested) {
        Ok(pool) => Some(pool),
        Err(err) if requested > 1 => {
            log::warn!("failed to build {requested}-thread pool ({err}); retrying with 1 thread");
            try_build(1).ok()
        }
        Err(err) => {
            log::warn!("failed to build thread pool ({err}); stream runs serially");
            None
        }
    }
}

/// Handle to an ordered execution queue. Cloning yields another handle to the same queue.
#[derive(Clone)]
pub struct Stream {
    id: u64,
    #[cfg(feature = "parallel")]
    pool: Option<Arc<ThreadPool>>,
}

impl Stream {
    /// The process-wide stream, sized from `RAYON_NUM_THREADS` or the available parallelism.
    pub fn default_stream() -> &'static Stream {
        DEFAULT_STREAM.get_or_init(|| {
            #[cfg(feature = "parallel")]
            {
                Stream::with_threads(desired_threads())
            }
            #[cfg(not(feature = "parallel"))]
            {
                Stream::serial()
            }
        })
    }

    /// A stream with its own pool of `threads` workers.
    pub fn with_threads(threads: usize) -> Self {
        #[cfg(feature = "parallel")]
        {
            Self {
                id: next_stream_id(),
                pool: build_pool(threads.max(1)).map(Arc::new),
            }
        }
        #[cfg(not(feature = "parallel"))]
        {
            let _ = threads;
            Self::serial()
        }
    }

    /// A stream that executes every kernel on the calling thread.
    pub fn serial() -> Self {
        Self {
            id: next_stream_id(),
            #[cfg(feature = "parallel")]
            pool: None,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Number of worker lanes kernels on this stream fan out to.
    pub fn lanes(&self) -> usize {
        #[cfg(feature = "parallel")]
        {
            self.pool.as_ref().map_or(1, |p| p.current_num_threads())
        }
        #[cfg(not(feature = "parallel"))]
        {
            1
        }
    }

    /// Block until all work issued on this stream has drained.
    pub fn synchronize(&self) {}

    /// Evaluate `f` for every index in `0..len`, collecting results in index order.
    pub(crate) fn map<T, F>(&self, len: usize, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        #[cfg(feature = "parallel")]
        if let Some(pool) = self.pool.as_ref().filter(|_| len >= MIN_PARALLEL_LEN) {
            return pool.install(|| {
                (0..len)
                    .into_par_iter()
                    .with_min_len(MIN_PARALLEL_LEN / 4)
                    .map(f)
                    .collect()
            });
        }
        (0..len).map(f).collect()
    }

    /// Split `0..len` into contiguous chunks, one per lane (at least `min_chunk` long), and map
    /// each `(chunk index, range)`. Results are in chunk order.
    pub(crate) fn map_chunks<T, F>(&self, len: usize, min_chunk: usize, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize, std::ops::Range<usize>) -> T + Sync + Send,
    {
        let chunk = len.div_ceil(self.lanes()).max(min_chunk).max(1);
        let chunks = len.div_ceil(chunk);
        let range = |i: usize| (i * chunk)..((i + 1) * chunk).min(len);

        #[cfg(feature = "parallel")]
        if let Some(pool) = self.pool.as_ref().filter(|_| chunks > 1) {
            return pool.install(|| (0..chunks).into_par_iter().map(|i| f(i, range(i))).collect());
        }
        (0..chunks).map(|i| f(i, range(i))).collect()
    }
}

impl Default for Stream {
    fn default() -> Self {
        Self::default_stream().clone()
    }
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("id", &self.id)
            .field("lanes", &self.lanes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn map_preserves_index_order() {
        for stream in [Stream::serial(), Stream::with_threads(4)] {
            let out = stream.map(10_000, |i| i * 2);
            assert_eq!(out.len(), 10_000);
            assert!(out.iter().enumerate().all(|(i, v)| *v == i * 2));
        }
    }

    #[test]
    fn map_chunks_covers_range_contiguously() {
        let stream = Stream::with_threads(4);
        let ranges = stream.map_chunks(1_001, 10, |_, r| r);
        assert_eq!(ranges.first().map(|r| r.start), Some(0));
        assert_eq!(ranges.last().map(|r| r.end), Some(1_001));
        assert!(ranges.windows(2).all(|w| w[0].end == w[1].start));

        assert!(Stream::serial().map_chunks(0, 10, |_, r| r).is_empty());
    }

    #[test]
    fn streams_have_distinct_ids() {
        assert_ne!(Stream::serial().id(), Stream::serial().id());
        assert_eq!(Stream::default_stream().id(), Stream::default().id());
    }
}
