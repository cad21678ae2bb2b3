//! A bounded worker pool over `crossbeam::channel`, adapted from
//! `deepbrainspace-guardy/src/parallel/processor.rs`'s `ParallelProcessor`.
//! Unlike that file, a failed work item never falls back to
//! `unsafe { std::mem::zeroed() }` — every item's outcome is a proper
//! `Result`, carried through to the caller.

use crossbeam::channel::{bounded, Sender};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

pub struct WorkerPoolConfig {
    pub worker_count: usize,
    pub progress_interval: usize,
}

impl WorkerPoolConfig {
    pub fn new(requested_concurrency: usize) -> Self {
        let worker_count = requested_concurrency.min(num_cpus::get()).max(1);
        WorkerPoolConfig { worker_count, progress_interval: 50 }
    }
}

/// Runs `work_fn` over every item in `items` using a bounded pool of
/// `config.worker_count` threads, returning results in the same order as
/// `items` regardless of completion order. `progress` is invoked from
/// worker threads each time `progress_interval` items complete since the
/// last call; it must be cheap and thread-safe.
pub fn run_pool<T, R, F>(
    items: Vec<T>,
    config: &WorkerPoolConfig,
    cancel: &Arc<AtomicBool>,
    progress: Option<&(dyn Fn(usize, usize) + Sync)>,
    work_fn: F,
) -> Vec<R>
where
    T: Send,
    R: Send,
    F: Fn(T, &Arc<AtomicBool>) -> R + Sync,
{
    let total = items.len();
    if total == 0 {
        return Vec::new();
    }

    let (task_tx, task_rx) = bounded::<(usize, T)>(config.worker_count * 2);
    let (result_tx, result_rx) = bounded::<(usize, R)>(config.worker_count * 2);
    let completed = Arc::new(AtomicUsize::new(0));

    let results = crossbeam::thread::scope(|scope| {
        for _ in 0..config.worker_count {
            let task_rx = task_rx.clone();
            let result_tx: Sender<(usize, R)> = result_tx.clone();
            let cancel = Arc::clone(cancel);
            let completed = Arc::clone(&completed);
            let work_fn = &work_fn;
            scope.spawn(move |_| {
                while let Ok((index, item)) = task_rx.recv() {
                    let outcome = work_fn(item, &cancel);
                    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    if let Some(cb) = progress {
                        if done % config.progress_interval == 0 || done == total {
                            cb(done, total);
                        }
                    }
                    if result_tx.send((index, outcome)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(result_tx);

        scope.spawn(move |_| {
            for (index, item) in items.into_iter().enumerate() {
                if task_tx.send((index, item)).is_err() {
                    break;
                }
            }
        });

        let mut collected: Vec<Option<R>> = (0..total).map(|_| None).collect();
        for (index, outcome) in result_rx.iter() {
            collected[index] = Some(outcome);
        }
        collected
    })
    .expect("worker pool scope panicked");

    results.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_input_order_in_results() {
        let items: Vec<usize> = (0..100).collect();
        let config = WorkerPoolConfig::new(4);
        let cancel = Arc::new(AtomicBool::new(false));
        let results = run_pool(items, &config, &cancel, None, |item, _cancel| item * 2);
        let expected: Vec<usize> = (0..100).map(|i| i * 2).collect();
        assert_eq!(results, expected);
    }

    #[test]
    fn worker_count_is_bounded_by_cpu_count() {
        let config = WorkerPoolConfig::new(usize::MAX);
        assert!(config.worker_count <= num_cpus::get());
        assert!(config.worker_count >= 1);
    }

    #[test]
    fn empty_input_returns_empty_output() {
        let config = WorkerPoolConfig::new(4);
        let cancel = Arc::new(AtomicBool::new(false));
        let results: Vec<i32> = run_pool(Vec::new(), &config, &cancel, None, |item: i32, _| item);
        assert!(results.is_empty());
    }
}
