// ABOUTME: Cancellable unit of work: one screenshot sent through the chat client.
// ABOUTME: Exactly one terminal outcome fires per worker; cancellation is advisory only.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

use crate::chat::{ChatDispatch, ChatRequest};
use crate::error::ChatError;

/// A worker's final, immutable status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalStatus {
    Finished,
    Failed,
    Canceled,
}

/// Terminal outcome with its payload, reported to the completion barrier.
#[derive(Debug)]
pub enum WorkStatus {
    Finished(String),
    Failed(ChatError),
    Canceled,
}

impl WorkStatus {
    pub fn terminal(&self) -> TerminalStatus {
        match self {
            WorkStatus::Finished(_) => TerminalStatus::Finished,
            WorkStatus::Failed(_) => TerminalStatus::Failed,
            WorkStatus::Canceled => TerminalStatus::Canceled,
        }
    }
}

/// Event emitted exactly once per worker.
#[derive(Debug)]
pub struct WorkerOutcome {
    pub index: usize,
    pub image: PathBuf,
    pub status: WorkStatus,
}

/// Shared lifecycle handle: the advisory cancel flag plus a set-once terminal
/// slot. The first terminal write wins; later writes are no-ops.
#[derive(Debug, Default)]
pub struct WorkerState {
    alive: AtomicBool,
    terminal: Mutex<Option<TerminalStatus>>,
    cancel: CancellationToken,
}

impl WorkerState {
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    pub fn status(&self) -> Option<TerminalStatus> {
        *self.terminal.lock().unwrap()
    }

    /// Advisory cancellation. Idempotent; never changes an already-terminal
    /// worker's status.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn set_terminal(&self, status: TerminalStatus) -> bool {
        let mut slot = self.terminal.lock().unwrap();
        if slot.is_none() {
            *slot = Some(status);
            true
        } else {
            false
        }
    }
}

/// One chat request against one screenshot.
pub struct ChatWorker {
    pub index: usize,
    pub image: Option<PathBuf>,
    pub system: Option<String>,
    pub text: Option<String>,
    state: Arc<WorkerState>,
}

impl ChatWorker {
    pub fn new(
        index: usize,
        image: Option<PathBuf>,
        system: Option<String>,
        text: Option<String>,
    ) -> Self {
        Self {
            index,
            image,
            system,
            text,
            state: Arc::new(WorkerState::default()),
        }
    }

    pub fn state(&self) -> Arc<WorkerState> {
        self.state.clone()
    }

    /// Run the worker to a terminal outcome. The cancel flag is checked before
    /// dispatch and again after the call returns; a response that arrives after
    /// cancellation is discarded.
    pub async fn run(self, client: Arc<dyn ChatDispatch>, outcomes: &UnboundedSender<WorkerOutcome>) {
        self.state.alive.store(true, Ordering::Release);
        let status = self.execute(client.as_ref()).await;
        self.report(status, outcomes);
    }

    async fn execute(&self, client: &dyn ChatDispatch) -> WorkStatus {
        if self.state.is_cancel_requested() {
            return WorkStatus::Canceled;
        }

        let has_text = self.text.as_deref().is_some_and(|text| !text.is_empty());
        if !has_text && self.image.is_none() {
            return WorkStatus::Failed(ChatError::Validation(format!(
                "worker {}: missing text and image configuration",
                self.index
            )));
        }

        let request = ChatRequest {
            system: self.system.clone(),
            text: self.text.clone().into_iter().collect(),
            images: self.image.clone().into_iter().collect(),
            timeout: None,
        };

        match client.chat(request).await {
            Ok(response) => {
                if self.state.is_cancel_requested() {
                    WorkStatus::Canceled
                } else {
                    WorkStatus::Finished(response)
                }
            }
            Err(err) => WorkStatus::Failed(err),
        }
    }

    /// Mark a never-started worker canceled. It still reports a terminal
    /// outcome so the batch counts sum to the worker total.
    pub fn cancel_unstarted(self, outcomes: &UnboundedSender<WorkerOutcome>) {
        self.state.cancel();
        self.report(WorkStatus::Canceled, outcomes);
    }

    fn report(&self, status: WorkStatus, outcomes: &UnboundedSender<WorkerOutcome>) {
        if self.state.set_terminal(status.terminal()) {
            let _ = outcomes.send(WorkerOutcome {
                index: self.index,
                image: self.image.clone().unwrap_or_default(),
                status,
            });
        }
        self.state.alive.store(false, Ordering::Release);
    }
}
