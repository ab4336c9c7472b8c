//! Single-flight publication worker.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::application::dto::{PublicationReport, PublicationRequest};
use crate::application::use_cases::PublicationPipeline;
use crate::domain::errors::PublishError;

/// What to do with a trigger that arrives while a publication is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusyPolicy {
    /// Wait in FIFO order behind the running publication.
    #[default]
    Queue,
    /// Refuse immediately.
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerConfig {
    pub policy: BusyPolicy,
    pub queue_capacity: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            policy: BusyPolicy::Queue,
            queue_capacity: 8,
        }
    }
}

/// Why a publication was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("the bot is shutting down")]
    ShuttingDown,

    #[error("another publication is in progress")]
    Busy,

    #[error("too many publications are waiting")]
    QueueFull,
}

/// Resolves once the submitted publication has finished.
pub type PendingPublication = oneshot::Receiver<Result<PublicationReport, PublishError>>;

struct Job {
    request: PublicationRequest,
    reply: oneshot::Sender<Result<PublicationReport, PublishError>>,
}

/// Submission side of the worker.
#[derive(Clone)]
pub struct WorkerHandle {
    job_tx: mpsc::Sender<Job>,
    shutdown_tx: Arc<watch::Sender<bool>>,
    busy: Arc<AtomicBool>,
    policy: BusyPolicy,
}

impl WorkerHandle {
    /// Hands a publication to the worker.
    ///
    /// # Errors
    /// Returns `SubmitError` if the worker refuses the request under its busy
    /// policy or has been shut down.
    pub fn submit(&self, request: PublicationRequest) -> Result<PendingPublication, SubmitError> {
        if *self.shutdown_tx.borrow() {
            return Err(SubmitError::ShuttingDown);
        }

        if self.policy == BusyPolicy::Reject
            && self
                .busy
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
        {
            debug!(filename = %request.filename(), "Publication refused, worker busy");
            return Err(SubmitError::Busy);
        }

        let (reply, pending) = oneshot::channel();
        let job = Job { request, reply };

        self.job_tx.try_send(job).map_err(|e| {
            if self.policy == BusyPolicy::Reject {
                self.busy.store(false, Ordering::Release);
            }
            match e {
                mpsc::error::TrySendError::Full(_) => SubmitError::QueueFull,
                mpsc::error::TrySendError::Closed(_) => SubmitError::ShuttingDown,
            }
        })?;

        Ok(pending)
    }

    /// Whether a publication is running.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Closes the intake. The running publication finishes, queued ones are
    /// dropped and their submitters see the worker go away.
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }
}

/// Owns the pipeline and runs one publication at a time.
pub struct PublicationWorker {
    pipeline: PublicationPipeline,
    job_rx: mpsc::Receiver<Job>,
    shutdown_rx: watch::Receiver<bool>,
    busy: Arc<AtomicBool>,
}

impl PublicationWorker {
    /// Spawns the worker task.
    #[must_use]
    pub fn spawn(pipeline: PublicationPipeline, config: WorkerConfig) -> (WorkerHandle, JoinHandle<()>) {
        let (job_tx, job_rx) = mpsc::channel(config.queue_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let busy = Arc::new(AtomicBool::new(false));

        let worker = Self {
            pipeline,
            job_rx,
            shutdown_rx,
            busy: Arc::clone(&busy),
        };
        let handle = WorkerHandle {
            job_tx,
            shutdown_tx: Arc::new(shutdown_tx),
            busy,
            policy: config.policy,
        };

        (handle, tokio::spawn(worker.run()))
    }

    async fn run(mut self) {
        info!("Publication worker started");
        loop {
            tokio::select! {
                biased;

                changed = self.shutdown_rx.changed() => {
                    if changed.is_err() || *self.shutdown_rx.borrow() {
                        break;
                    }
                }

                job = self.job_rx.recv() => {
                    let Some(job) = job else { break };
                    self.process(job).await;
                }
            }
        }

        self.job_rx.close();
        let dropped = self.job_rx.len();
        if dropped > 0 {
            warn!(dropped, "Discarding queued publications");
        }

        self.pipeline.close().await;
        info!("Publication worker stopped");
    }

    async fn process(&mut self, job: Job) {
        self.busy.store(true, Ordering::Release);
        let result = self.pipeline.publish(&job.request).await;
        self.busy.store(false, Ordering::Release);

        if let Err(e) = &result {
            warn!(filename = %job.request.filename(), error = %e, "Publication failed");
        }
        if job.reply.send(result).is_err() {
            debug!("Publication submitter went away");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dto::CommitOrder;
    use crate::application::services::{CacheLayout, ManifestSynchronizer};
    use crate::application::use_cases::PipelineDeps;
    use crate::domain::entities::{Attachment, RemoteLayout};
    use crate::domain::ports::mocks::{MockFetcher, MockPreviewGenerator, MockTransferSession};
    use tempfile::TempDir;

    const MANIFEST_URL: &str = "https://gallery.test/database.json";

    fn pipeline(dir: &TempDir, fetcher: &MockFetcher, remote: &MockTransferSession) -> PublicationPipeline {
        let cache = CacheLayout {
            download_dir: dir.path().join("image_downloads"),
            preview_dir: dir.path().join("image_previews"),
            manifest_path: dir.path().join("database.json"),
        };
        cache.ensure().unwrap();
        let layout = RemoteLayout::default();

        let deps = PipelineDeps {
            fetcher: Arc::new(fetcher.clone()),
            previews: Arc::new(MockPreviewGenerator::new()),
            manifest: ManifestSynchronizer::new(
                Arc::new(fetcher.clone()),
                MANIFEST_URL,
                cache.manifest_path.clone(),
                layout.clone(),
            ),
            layout,
            cache,
            order: CommitOrder::ManifestFirst,
        };
        PublicationPipeline::new(deps, Box::new(remote.clone()))
    }

    fn setup() -> (TempDir, MockFetcher, MockTransferSession) {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = MockFetcher::new().with_body(MANIFEST_URL, r#"{"imageCount":0,"posts":[]}"#);
        for name in ["a.png", "b.jpg", "c.png"] {
            fetcher.set_body(&format!("https://cdn.test/{name}"), b"img".to_vec());
        }
        let remote = MockTransferSession::with_dirs(&["subdomain-sinon/images/gallery/preview"]);
        (dir, fetcher, remote)
    }

    fn request(name: &str) -> PublicationRequest {
        PublicationRequest::from_attachment(&Attachment::new(format!("https://cdn.test/{name}"), name))
            .unwrap()
    }

    #[tokio::test]
    async fn test_queued_publications_run_in_order() {
        let (dir, fetcher, remote) = setup();
        let (handle, task) = PublicationWorker::spawn(
            pipeline(&dir, &fetcher, &remote),
            WorkerConfig::default(),
        );

        let pending: Vec<_> = ["a.png", "b.jpg", "c.png"]
            .into_iter()
            .map(|name| handle.submit(request(name)).unwrap())
            .collect();

        for rx in pending {
            let report = rx.await.unwrap().unwrap();
            assert_eq!(report.image_count, 1);
        }

        let stored: Vec<String> = remote
            .log()
            .into_iter()
            .filter(|op| op.starts_with("STOR") && op != "STOR database.json")
            .collect();
        assert_eq!(
            stored,
            vec![
                "STOR a.png",
                "STOR a.png",
                "STOR b.jpg",
                "STOR b.jpg",
                "STOR c.png",
                "STOR c.png",
            ]
        );
        assert_eq!(remote.cwd_now(), "/");

        handle.shutdown();
        task.await.unwrap();
        assert!(remote.has_quit());
    }

    #[tokio::test]
    async fn test_reject_policy_refuses_while_busy() {
        let (dir, fetcher, remote) = setup();
        let (handle, _task) = PublicationWorker::spawn(
            pipeline(&dir, &fetcher, &remote),
            WorkerConfig {
                policy: BusyPolicy::Reject,
                queue_capacity: 8,
            },
        );

        let first = handle.submit(request("a.png")).unwrap();
        assert_eq!(handle.submit(request("b.jpg")).unwrap_err(), SubmitError::Busy);

        first.await.unwrap().unwrap();
        assert!(!handle.is_busy());
        assert!(handle.submit(request("c.png")).is_ok());
    }

    #[tokio::test]
    async fn test_full_queue_rejects() {
        let (dir, fetcher, remote) = setup();
        let (handle, _task) = PublicationWorker::spawn(
            pipeline(&dir, &fetcher, &remote),
            WorkerConfig {
                policy: BusyPolicy::Queue,
                queue_capacity: 1,
            },
        );

        let _first = handle.submit(request("a.png")).unwrap();
        assert_eq!(
            handle.submit(request("b.jpg")).unwrap_err(),
            SubmitError::QueueFull
        );
    }

    #[tokio::test]
    async fn test_shutdown_drops_queued_and_quits_session() {
        let (dir, fetcher, remote) = setup();
        let (handle, task) = PublicationWorker::spawn(
            pipeline(&dir, &fetcher, &remote),
            WorkerConfig::default(),
        );

        let queued = handle.submit(request("a.png")).unwrap();
        handle.shutdown();
        task.await.unwrap();

        assert!(queued.await.is_err());
        assert_eq!(remote.file_count(), 0);
        assert!(remote.has_quit());
        assert_eq!(
            handle.submit(request("b.jpg")).unwrap_err(),
            SubmitError::ShuttingDown
        );
    }
}
