use crate::summarizer::SummarizationWorker;
use crate::types::{PipelineError, Result};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Default)]
struct QueueCounters {
    scheduled: AtomicUsize,
    published: AtomicUsize,
    failed: AtomicUsize,
    skipped: AtomicUsize,
}

/// Point-in-time view of the summary queue counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub scheduled: usize,
    pub published: usize,
    pub failed: usize,
    /// Jobs that ended without a status change (no content, already running,
    /// article gone).
    pub skipped: usize,
}

impl QueueStats {
    pub fn completed(&self) -> usize {
        self.published + self.failed + self.skipped
    }
}

/// Cloneable handle used to enqueue summarization jobs.
#[derive(Clone)]
pub struct SummaryScheduler {
    sender: mpsc::UnboundedSender<Uuid>,
    counters: Arc<QueueCounters>,
}

impl SummaryScheduler {
    /// Enqueue `article_id`; returns immediately.
    pub fn schedule(&self, article_id: Uuid) -> Result<()> {
        self.sender
            .send(article_id)
            .map_err(|_| PipelineError::QueueClosed)?;
        self.counters.scheduled.fetch_add(1, Ordering::SeqCst);
        debug!("Scheduled summarization for article {}", article_id);
        Ok(())
    }
}

/// Background summarization: an unbounded job channel drained by a dispatcher
/// that runs at most `concurrency` [`SummarizationWorker::summarize`] calls at
/// once.
pub struct SummaryQueue {
    scheduler: SummaryScheduler,
    counters: Arc<QueueCounters>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    dispatcher: Option<JoinHandle<()>>,
}

impl SummaryQueue {
    pub fn start(worker: Arc<SummarizationWorker>, concurrency: usize) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let counters = Arc::new(QueueCounters::default());

        let dispatcher = tokio::spawn(Self::dispatch(
            worker,
            receiver,
            shutdown_rx,
            counters.clone(),
            concurrency.max(1),
        ));

        info!("Summary queue started with {} workers", concurrency.max(1));

        Self {
            scheduler: SummaryScheduler {
                sender,
                counters: counters.clone(),
            },
            counters,
            shutdown_tx: Some(shutdown_tx),
            dispatcher: Some(dispatcher),
        }
    }

    pub fn scheduler(&self) -> SummaryScheduler {
        self.scheduler.clone()
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            scheduled: self.counters.scheduled.load(Ordering::SeqCst),
            published: self.counters.published.load(Ordering::SeqCst),
            failed: self.counters.failed.load(Ordering::SeqCst),
            skipped: self.counters.skipped.load(Ordering::SeqCst),
        }
    }

    /// Stop accepting jobs, run everything already queued, and wait for
    /// in-flight jobs to finish.
    pub async fn shutdown(mut self) -> QueueStats {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(dispatcher) = self.dispatcher.take() {
            if let Err(e) = dispatcher.await {
                warn!("Summary dispatcher ended abnormally: {}", e);
            }
        }
        let stats = self.stats();
        info!(
            "Summary queue stopped: {} scheduled, {} published, {} failed, {} skipped",
            stats.scheduled, stats.published, stats.failed, stats.skipped
        );
        stats
    }

    async fn dispatch(
        worker: Arc<SummarizationWorker>,
        mut receiver: mpsc::UnboundedReceiver<Uuid>,
        mut shutdown_rx: oneshot::Receiver<()>,
        counters: Arc<QueueCounters>,
        concurrency: usize,
    ) {
        let permits = Arc::new(Semaphore::new(concurrency));
        let mut jobs = JoinSet::new();
        let mut shutting_down = false;

        loop {
            let next = if shutting_down {
                receiver.recv().await
            } else {
                tokio::select! {
                    next = receiver.recv() => next,
                    _ = &mut shutdown_rx => {
                        // Buffered ids are still delivered after close().
                        receiver.close();
                        shutting_down = true;
                        continue;
                    }
                }
            };

            let Some(article_id) = next else { break };

            let permit = match permits.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            let worker = worker.clone();
            let counters = counters.clone();

            jobs.spawn(async move {
                let _permit = permit;
                match worker.summarize(article_id).await {
                    Ok(_) => {
                        counters.published.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(
                        e @ (PipelineError::NoContent { .. }
                        | PipelineError::SummaryInProgress { .. }
                        | PipelineError::ArticleNotFound { .. }),
                    ) => {
                        debug!("Summarization skipped for {}: {}", article_id, e);
                        counters.skipped.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(e) => {
                        warn!("Summarization job for {} failed: {}", article_id, e);
                        counters.failed.fetch_add(1, Ordering::SeqCst);
                    }
                }
            });

            // Reap finished jobs so the set does not grow without bound.
            while jobs.try_join_next().is_some() {}
        }

        while jobs.join_next().await.is_some() {}
    }
}
