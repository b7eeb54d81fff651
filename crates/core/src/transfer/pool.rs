//! Bounded worker pool for batch transfers
//!
//! One producer submits jobs into a bounded channel whose capacity equals
//! the worker count, so enumeration never runs far ahead of the workers.
//! [`WorkerPool::finish`] closes the channel and joins every worker; it is
//! the only barrier.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_channel::Sender;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use super::error_log::ErrorLog;
use crate::error::{Error, Result};

/// Upper bound on concurrent workers
pub const MAX_WORKERS: usize = 10;

/// Clamp a requested worker count into `[1, MAX_WORKERS]`
pub fn clamp_workers(requested: usize) -> usize {
    requested.clamp(1, MAX_WORKERS)
}

/// What a job did when it finished without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Done,
    Skipped,
}

/// Aggregate result of a batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BatchReport {
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

impl std::fmt::Display for BatchReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} attempted, {} succeeded, {} skipped, {} failed",
            self.attempted, self.succeeded, self.skipped, self.failed
        )
    }
}

#[derive(Debug, Default)]
struct Counters {
    attempted: AtomicUsize,
    succeeded: AtomicUsize,
    skipped: AtomicUsize,
    failed: AtomicUsize,
}

impl Counters {
    fn report(&self) -> BatchReport {
        BatchReport {
            attempted: self.attempted.load(Ordering::SeqCst),
            succeeded: self.succeeded.load(Ordering::SeqCst),
            skipped: self.skipped.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
        }
    }
}

/// Fixed set of tokio workers draining a bounded queue
pub struct WorkerPool<J> {
    sender: Sender<J>,
    workers: Vec<JoinHandle<()>>,
    counters: Arc<Counters>,
    error_log: Option<Arc<ErrorLog>>,
}

impl<J> WorkerPool<J>
where
    J: Display + Send + 'static,
{
    /// Spawn `workers` tasks that run `handler` for every submitted job
    pub fn spawn<F, Fut>(workers: usize, error_log: Option<Arc<ErrorLog>>, handler: F) -> Self
    where
        F: Fn(J) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<JobOutcome>> + Send + 'static,
    {
        let workers = clamp_workers(workers);
        let (sender, receiver) = async_channel::bounded::<J>(workers);
        let handler = Arc::new(handler);
        let counters = Arc::new(Counters::default());

        let handles = (0..workers)
            .map(|worker| {
                let receiver = receiver.clone();
                let handler = Arc::clone(&handler);
                let counters = Arc::clone(&counters);
                let error_log = error_log.clone();

                tokio::spawn(async move {
                    while let Ok(job) = receiver.recv().await {
                        let label = job.to_string();
                        counters.attempted.fetch_add(1, Ordering::SeqCst);

                        match handler(job).await {
                            Ok(JobOutcome::Done) => {
                                counters.succeeded.fetch_add(1, Ordering::SeqCst);
                            }
                            Ok(JobOutcome::Skipped) => {
                                counters.skipped.fetch_add(1, Ordering::SeqCst);
                            }
                            Err(Error::Cancelled) => {
                                counters.failed.fetch_add(1, Ordering::SeqCst);
                                debug!(worker, job = %label, "job cancelled");
                            }
                            Err(e) => {
                                counters.failed.fetch_add(1, Ordering::SeqCst);
                                warn!(worker, job = %label, error = %e, "job failed");
                                if let Some(log) = &error_log {
                                    log.record(&format!("{label}: {e}")).await;
                                }
                            }
                        }
                    }
                    debug!(worker, "worker finished");
                })
            })
            .collect();

        Self {
            sender,
            workers: handles,
            counters,
            error_log,
        }
    }

    /// Queue a job, waiting while every worker is busy
    pub async fn submit(&self, job: J) -> Result<()> {
        self.sender
            .send(job)
            .await
            .map_err(|_| Error::General("worker pool is closed".into()))
    }

    /// Count a failure that happened before a job could be queued
    pub async fn record_failure(&self, what: &str, err: &Error) {
        self.counters.attempted.fetch_add(1, Ordering::SeqCst);
        self.counters.failed.fetch_add(1, Ordering::SeqCst);
        warn!(item = %what, error = %err, "item failed");
        if let Some(log) = &self.error_log {
            log.record(&format!("{what}: {err}")).await;
        }
    }

    /// Close the queue and wait for every worker to drain it
    pub async fn finish(self) -> BatchReport {
        self.sender.close();
        for handle in self.workers {
            if let Err(e) = handle.await {
                error!(error = %e, "transfer worker panicked");
            }
        }
        self.counters.report()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::time::Duration;

    #[test]
    fn test_clamp_workers() {
        assert_eq!(clamp_workers(0), 1);
        assert_eq!(clamp_workers(5), 5);
        assert_eq!(clamp_workers(64), MAX_WORKERS);
    }

    #[tokio::test]
    async fn test_every_job_runs_once() {
        for workers in [1, 2, 10, 64] {
            for jobs in [0, workers.min(MAX_WORKERS) - 1, 3 * workers + 7] {
                let seen = Arc::new(Mutex::new(Vec::new()));
                let sink = Arc::clone(&seen);
                let pool = WorkerPool::spawn(workers, None, move |job: usize| {
                    let sink = Arc::clone(&sink);
                    async move {
                        tokio::task::yield_now().await;
                        sink.lock().push(job);
                        Ok(JobOutcome::Done)
                    }
                });

                for job in 0..jobs {
                    pool.submit(job).await.unwrap();
                }
                let report = pool.finish().await;

                let mut seen = seen.lock().clone();
                seen.sort();
                assert_eq!(
                    seen,
                    (0..jobs).collect::<Vec<_>>(),
                    "{workers} workers, {jobs} jobs"
                );
                assert_eq!(report.attempted, jobs);
                assert_eq!(report.succeeded, jobs);
            }
        }
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (a, p) = (Arc::clone(&active), Arc::clone(&peak));

        let pool = WorkerPool::spawn(2, None, move |_job: u32| {
            let (active, peak) = (Arc::clone(&a), Arc::clone(&p));
            async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                active.fetch_sub(1, Ordering::SeqCst);
                Ok(JobOutcome::Done)
            }
        });

        for job in 0..10 {
            pool.submit(job).await.unwrap();
        }
        pool.finish().await;
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_failures_are_counted_and_logged() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("errors.log");
        let log = Arc::new(ErrorLog::open(&log_path).await.unwrap());

        let pool = WorkerPool::spawn(2, Some(log), |job: u32| async move {
            match job % 3 {
                0 => Err(Error::TransferFailed(format!("job {job} broke"))),
                1 => Ok(JobOutcome::Skipped),
                _ => Ok(JobOutcome::Done),
            }
        });
        for job in 0..6 {
            pool.submit(job).await.unwrap();
        }
        let report = pool.finish().await;

        assert_eq!(
            report,
            BatchReport {
                attempted: 6,
                succeeded: 2,
                skipped: 2,
                failed: 2
            }
        );
        let contents = std::fs::read_to_string(&log_path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.contains("job 3 broke"));
    }
}
