//! Bounded-concurrency thumbnail scheduling.
//!
//! A single coordinator task owns the job registry: a FIFO of queued jobs
//! and the set of jobs currently processing. Handles talk to it through an
//! unbounded submission channel; every spawned job reports back on a
//! completion channel. After each message the coordinator runs the
//! admission loop, promoting queued jobs until `max_concurrent` are
//! processing or the queue is empty, so a finished job is replaced
//! immediately rather than waiting for a whole batch.
//!
//! ```text
//!  submit() ──▶ [queue] ──admit──▶ [processing ≤ limit] ──▶ FrameExtractor
//!                  ▲                        │
//!                  └──── completion ◀───────┘
//! ```
//!
//! Every published [`SchedulerStats`] snapshot is taken after admission has
//! reached its fixpoint: `processing == min(limit, queued + processing)`.
//!
//! There is no retry and no cancellation. A failed job is logged and
//! counted; its destination file simply never appears.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::error::{CatalogError, Result};
use crate::thumbnail::{FrameExtractor, ThumbnailError};

pub type JobId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Queued,
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone)]
pub struct ThumbnailJob {
    pub id: JobId,
    pub source: PathBuf,
    pub dest: PathBuf,
    pub state: JobState,
}

/// Point-in-time view of the registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub queued: usize,
    pub processing: usize,
    pub completed: u64,
    pub failed: u64,
}

impl SchedulerStats {
    /// Jobs that reached a terminal state.
    pub fn finished(&self) -> u64 {
        self.completed + self.failed
    }

    /// Jobs not yet in a terminal state.
    pub fn remaining(&self) -> usize {
        self.queued + self.processing
    }
}

struct Completion {
    id: JobId,
    result: std::result::Result<(), ThumbnailError>,
}

/// Handle to the coordinator. Cheap to clone; the coordinator keeps running
/// until every handle is dropped and all submitted jobs have finished.
#[derive(Clone)]
pub struct ThumbnailScheduler {
    submissions: mpsc::UnboundedSender<ThumbnailJob>,
    stats: watch::Receiver<SchedulerStats>,
    next_id: Arc<AtomicU64>,
    max_concurrent: usize,
}

impl ThumbnailScheduler {
    /// Spawn the coordinator on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// If `max_concurrent` is zero, or when called outside a tokio runtime.
    pub fn spawn(max_concurrent: usize, extractor: Arc<dyn FrameExtractor>) -> Self {
        assert!(max_concurrent > 0, "max_concurrent must be > 0");

        let (submissions_tx, submissions_rx) = mpsc::unbounded_channel();
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        let (stats_tx, stats_rx) = watch::channel(SchedulerStats::default());

        let coordinator = Coordinator {
            max_concurrent,
            extractor,
            queue: VecDeque::new(),
            processing: HashMap::new(),
            stats: SchedulerStats::default(),
            stats_tx,
            completions_tx,
        };
        tokio::spawn(coordinator.run(submissions_rx, completions_rx));

        Self {
            submissions: submissions_tx,
            stats: stats_rx,
            next_id: Arc::new(AtomicU64::new(0)),
            max_concurrent,
        }
    }

    /// Enqueue one thumbnail job. Never blocks.
    pub fn submit(&self, source: PathBuf, dest: PathBuf) -> Result<JobId> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let job = ThumbnailJob {
            id,
            source,
            dest,
            state: JobState::Queued,
        };
        self.submissions
            .send(job)
            .map_err(|_| CatalogError::SchedulerClosed)?;
        Ok(id)
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Number of jobs handed to [`submit`](Self::submit) so far.
    pub fn submitted(&self) -> u64 {
        self.next_id.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> SchedulerStats {
        *self.stats.borrow()
    }

    /// A receiver that is notified on every registry change.
    pub fn subscribe(&self) -> watch::Receiver<SchedulerStats> {
        self.stats.clone()
    }

    /// Wait until every job submitted before this call has finished.
    ///
    /// Ingestion never calls this; it exists for callers that want to
    /// report on thumbnails before exiting.
    pub async fn drain(&self) -> SchedulerStats {
        let target = self.submitted();
        let mut rx = self.stats.clone();
        let result = rx
            .wait_for(|stats| stats.finished() >= target)
            .await
            .map(|stats| *stats);
        match result {
            Ok(stats) => stats,
            // Coordinator gone: nothing more will ever finish.
            Err(_) => *rx.borrow(),
        }
    }
}

struct Coordinator {
    max_concurrent: usize,
    extractor: Arc<dyn FrameExtractor>,
    queue: VecDeque<ThumbnailJob>,
    processing: HashMap<JobId, ThumbnailJob>,
    stats: SchedulerStats,
    stats_tx: watch::Sender<SchedulerStats>,
    completions_tx: mpsc::UnboundedSender<Completion>,
}

impl Coordinator {
    async fn run(
        mut self,
        mut submissions: mpsc::UnboundedReceiver<ThumbnailJob>,
        mut completions: mpsc::UnboundedReceiver<Completion>,
    ) {
        let mut accepting = true;

        loop {
            if !accepting && self.queue.is_empty() && self.processing.is_empty() {
                break;
            }

            tokio::select! {
                job = submissions.recv(), if accepting => match job {
                    Some(job) => self.enqueue(job),
                    None => accepting = false,
                },
                Some(done) = completions.recv() => self.complete(done),
            }

            self.admit();
            self.publish();
        }

        // Every handle dropped and the registry empty.
        info!(
            completed = self.stats.completed,
            failed = self.stats.failed,
            "all queued thumbnails finished"
        );
    }

    fn enqueue(&mut self, job: ThumbnailJob) {
        debug!(job = job.id, source = %job.source.display(), "thumbnail job queued");
        self.queue.push_back(job);
    }

    /// Promote queued jobs until the limit is reached or the queue is empty.
    fn admit(&mut self) {
        while self.processing.len() < self.max_concurrent {
            let Some(mut job) = self.queue.pop_front() else {
                break;
            };
            job.state = JobState::Processing;
            self.start(&job);
            self.processing.insert(job.id, job);
        }
    }

    fn start(&self, job: &ThumbnailJob) {
        debug!(job = job.id, source = %job.source.display(), "thumbnail job started");

        let extractor = Arc::clone(&self.extractor);
        let completions = self.completions_tx.clone();
        let id = job.id;
        let source = job.source.clone();
        let dest = job.dest.clone();

        tokio::spawn(async move {
            let result = extractor.extract_first_frame(&source, &dest).await;
            // The coordinator owns the receiver and outlives every job.
            let _ = completions.send(Completion { id, result });
        });
    }

    fn complete(&mut self, done: Completion) {
        let Some(mut job) = self.processing.remove(&done.id) else {
            warn!(job = done.id, "completion for unknown thumbnail job");
            return;
        };

        match done.result {
            Ok(()) => {
                job.state = JobState::Completed;
                self.stats.completed += 1;
                debug!(job = job.id, dest = %job.dest.display(), "thumbnail written");
            }
            Err(e) => {
                job.state = JobState::Failed;
                self.stats.failed += 1;
                let err = CatalogError::ThumbnailGeneration {
                    source_path: job.source.clone(),
                    reason: e.to_string(),
                };
                warn!(job = job.id, "{}", err);
            }
        }
    }

    fn publish(&mut self) {
        self.stats.queued = self.queue.len();
        self.stats.processing = self.processing.len();
        self.stats_tx.send_replace(self.stats);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::Semaphore;

    /// Blocks every job until the test hands out a permit, and records the
    /// highest number of jobs that were ever running at once.
    struct GatedExtractor {
        gate: Semaphore,
        running: AtomicUsize,
        peak: AtomicUsize,
        fail_names: Vec<&'static str>,
        started: Mutex<Vec<PathBuf>>,
    }

    impl GatedExtractor {
        fn new(fail_names: Vec<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                gate: Semaphore::new(0),
                running: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                fail_names,
                started: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl FrameExtractor for GatedExtractor {
        async fn extract_first_frame(
            &self,
            source: &Path,
            _dest: &Path,
        ) -> std::result::Result<(), ThumbnailError> {
            self.started.lock().unwrap().push(source.to_path_buf());
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            self.gate.acquire().await.unwrap().forget();

            self.running.fetch_sub(1, Ordering::SeqCst);
            let name = source.file_name().unwrap().to_str().unwrap();
            if self.fail_names.contains(&name) {
                Err(ThumbnailError::Other(format!("cannot decode {}", name)))
            } else {
                Ok(())
            }
        }
    }

    fn submit_n(scheduler: &ThumbnailScheduler, n: usize) {
        for i in 0..n {
            scheduler
                .submit(
                    PathBuf::from(format!("/src/{}.gif", i)),
                    PathBuf::from(format!("/thumbs/{}.jpg", i)),
                )
                .unwrap();
        }
    }

    async fn wait_until(
        scheduler: &ThumbnailScheduler,
        pred: impl FnMut(&SchedulerStats) -> bool,
    ) -> SchedulerStats {
        let mut rx = scheduler.subscribe();
        let stats = tokio::time::timeout(Duration::from_secs(10), rx.wait_for(pred))
            .await
            .expect("scheduler did not reach expected state")
            .unwrap();
        *stats
    }

    #[tokio::test]
    async fn never_exceeds_the_limit_and_refills_as_jobs_finish() {
        let extractor = GatedExtractor::new(vec![]);
        let scheduler = ThumbnailScheduler::spawn(3, extractor.clone());
        submit_n(&scheduler, 10);

        let stats = wait_until(&scheduler, |s| s.queued + s.processing == 10).await;
        assert_eq!(stats.processing, 3);
        assert_eq!(stats.queued, 7);

        // One finished job is replaced by exactly one queued job.
        extractor.gate.add_permits(1);
        let stats = wait_until(&scheduler, |s| s.completed == 1).await;
        assert_eq!(stats.processing, 3);
        assert_eq!(stats.queued, 6);

        extractor.gate.add_permits(9);
        let stats = scheduler.drain().await;
        assert_eq!(stats.completed, 10);
        assert_eq!(stats.remaining(), 0);
        assert!(extractor.peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn every_snapshot_is_at_admission_fixpoint() {
        let extractor = GatedExtractor::new(vec![]);
        let scheduler = ThumbnailScheduler::spawn(4, extractor.clone());
        let mut rx = scheduler.subscribe();

        let observer = tokio::spawn(async move {
            let mut seen = Vec::new();
            while rx.changed().await.is_ok() {
                let stats = *rx.borrow_and_update();
                seen.push(stats);
                if stats.finished() == 25 {
                    break;
                }
            }
            seen
        });

        submit_n(&scheduler, 25);
        extractor.gate.add_permits(25);
        scheduler.drain().await;

        let seen = observer.await.unwrap();
        assert!(!seen.is_empty());
        for stats in seen {
            assert!(stats.processing <= 4);
            assert_eq!(stats.processing, stats.remaining().min(4));
        }
    }

    #[tokio::test]
    async fn fewer_jobs_than_limit_all_run_at_once() {
        let extractor = GatedExtractor::new(vec![]);
        let scheduler = ThumbnailScheduler::spawn(20, extractor.clone());
        submit_n(&scheduler, 5);

        let stats = wait_until(&scheduler, |s| s.processing == 5).await;
        assert_eq!(stats.queued, 0);

        extractor.gate.add_permits(5);
        assert_eq!(scheduler.drain().await.completed, 5);
    }

    #[tokio::test]
    async fn failures_are_counted_not_retried() {
        let extractor = GatedExtractor::new(vec!["1.gif", "3.gif"]);
        let scheduler = ThumbnailScheduler::spawn(2, extractor.clone());
        submit_n(&scheduler, 5);
        extractor.gate.add_permits(5);

        let stats = scheduler.drain().await;
        assert_eq!(stats.completed, 3);
        assert_eq!(stats.failed, 2);
        assert_eq!(extractor.started.lock().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn jobs_start_in_submission_order() {
        let extractor = GatedExtractor::new(vec![]);
        let scheduler = ThumbnailScheduler::spawn(1, extractor.clone());
        submit_n(&scheduler, 4);
        extractor.gate.add_permits(4);
        scheduler.drain().await;

        let started = extractor.started.lock().unwrap().clone();
        let expected: Vec<PathBuf> = (0..4)
            .map(|i| PathBuf::from(format!("/src/{}.gif", i)))
            .collect();
        assert_eq!(started, expected);
    }

    #[tokio::test]
    async fn idle_registry_between_submissions_keeps_running() {
        let extractor = GatedExtractor::new(vec![]);
        let scheduler = ThumbnailScheduler::spawn(2, extractor.clone());

        submit_n(&scheduler, 1);
        extractor.gate.add_permits(1);
        let stats = scheduler.drain().await;
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.remaining(), 0);

        // A slow scan submits again after the registry went empty.
        scheduler
            .submit(PathBuf::from("/src/late.gif"), PathBuf::from("/thumbs/late.jpg"))
            .unwrap();
        extractor.gate.add_permits(1);
        let stats = scheduler.drain().await;
        assert_eq!(stats.completed, 2);
        assert_eq!(scheduler.submitted(), 2);
    }

    #[tokio::test]
    async fn drain_with_nothing_submitted_returns_immediately() {
        let scheduler = ThumbnailScheduler::spawn(2, GatedExtractor::new(vec![]));
        let stats = scheduler.drain().await;
        assert_eq!(stats, SchedulerStats::default());
    }

    #[tokio::test]
    async fn queued_jobs_finish_after_handles_are_dropped() {
        let extractor = GatedExtractor::new(vec![]);
        let scheduler = ThumbnailScheduler::spawn(2, extractor.clone());
        let mut rx = scheduler.subscribe();
        submit_n(&scheduler, 6);
        drop(scheduler);

        extractor.gate.add_permits(6);
        let result = tokio::time::timeout(
            Duration::from_secs(10),
            rx.wait_for(|s| s.finished() == 6),
        )
        .await
        .expect("jobs did not finish")
        .map(|s| *s);
        let stats = match result {
            Ok(stats) => stats,
            Err(_) => *rx.borrow(),
        };
        assert_eq!(stats.completed, 6);
    }
}
