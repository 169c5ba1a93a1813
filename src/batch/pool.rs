// ABOUTME: Throttled submitter: releases one queued worker per tick into a bounded pool.
// ABOUTME: Stops ticking when the queue drains or the stop token fires.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

use super::log::RunLog;
use super::worker::{ChatWorker, WorkerOutcome};
use crate::chat::ChatDispatch;

pub(super) type WorkerQueue = Arc<Mutex<VecDeque<ChatWorker>>>;

pub(super) struct Submitter {
    pub queue: WorkerQueue,
    pub stop: CancellationToken,
    pub interval: Duration,
    pub semaphore: Arc<Semaphore>,
    pub client: Arc<dyn ChatDispatch>,
    pub outcomes: UnboundedSender<WorkerOutcome>,
    pub log: Arc<RunLog>,
}

impl Submitter {
    /// Start the tick loop. Each tick dequeues at most one worker and hands it
    /// to the execution pool; concurrency is bounded by the semaphore.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = self.stop.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let next = self.queue.lock().unwrap().pop_front();
                let Some(worker) = next else { break };

                self.log.trace(format!(
                    "{}: {} started",
                    worker.index,
                    worker
                        .image
                        .as_ref()
                        .map(|image| image.display().to_string())
                        .unwrap_or_default()
                ));

                let semaphore = self.semaphore.clone();
                let client = self.client.clone();
                let outcomes = self.outcomes.clone();
                tokio::spawn(async move {
                    // The semaphore is never closed; a failed acquire only
                    // drops the bound, never the worker.
                    let _permit = semaphore.acquire_owned().await.ok();
                    worker.run(client, &outcomes).await;
                });
            }
        })
    }
}
