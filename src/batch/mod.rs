// ABOUTME: Batch engine: plans one worker per screenshot and runs them through the
// ABOUTME: throttled pool with advisory cancellation and one-shot aggregation.

pub mod log;
pub mod pool;
pub mod run;
pub mod worker;

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::chat::ChatDispatch;
use crate::constants;
use crate::detail::Detail;
use crate::extract::extract_code_blocks;
use crate::media::is_supported_image;
use self::log::{LogLine, RunLog};
use self::pool::Submitter;
use self::run::{BatchSummary, CompletionBarrier};
use self::worker::{ChatWorker, WorkStatus, WorkerOutcome, WorkerState};

/// The two batch workflows sharing this engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKind {
    /// Generate a content description per screenshot; overwrites `content`.
    Content,
    /// Generate test code per screenshot; appends extracted blocks to `code`.
    Code,
}

impl BatchKind {
    pub fn log_prefix(self) -> &'static str {
        match self {
            BatchKind::Content => "batch_content",
            BatchKind::Code => "batch_code",
        }
    }

    /// Cadence of the throttled submitter. Code batches carry larger payloads
    /// and get the slower tick.
    pub fn start_interval(self) -> Duration {
        match self {
            BatchKind::Content => Duration::from_millis(500),
            BatchKind::Code => Duration::from_millis(1000),
        }
    }

    pub fn default_prompt(self) -> &'static str {
        match self {
            BatchKind::Content => constants::PROMPT_CONTENT,
            BatchKind::Code => constants::PROMPT_CODE,
        }
    }

    fn apply(self, detail: &mut Detail, output: &str) {
        match self {
            BatchKind::Content => detail.content = Some(output.to_string()),
            BatchKind::Code => detail.code.extend(extract_code_blocks(output)),
        }
    }
}

/// Configuration for one batch run.
pub struct BatchOptions {
    pub kind: BatchKind,
    pub folder: PathBuf,
    /// Explicit file names within `folder`; `None` scans for every supported image.
    pub selection: Option<Vec<String>>,
    pub system_prompt: String,
    /// Code batches only: append the annotated source file to the prompt.
    pub upload_code: bool,
    pub log_dir: PathBuf,
    pub start_interval: Option<Duration>,
    pub concurrency: Option<usize>,
}

impl BatchOptions {
    pub fn new(kind: BatchKind, folder: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            folder: folder.into(),
            selection: None,
            system_prompt: kind.default_prompt().to_string(),
            upload_code: true,
            log_dir: PathBuf::from("."),
            start_interval: None,
            concurrency: None,
        }
    }
}

/// Enumerate the images a batch will process, in name order.
pub fn plan_images(folder: &Path, selection: Option<&[String]>) -> Vec<PathBuf> {
    match selection {
        Some(names) => names
            .iter()
            .map(|name| folder.join(name))
            .filter(|path| is_supported_image(path))
            .collect(),
        None => {
            let mut images: Vec<PathBuf> = std::fs::read_dir(folder)
                .map(|entries| {
                    entries
                        .flatten()
                        .map(|entry| entry.path())
                        .filter(|path| is_supported_image(path))
                        .collect()
                })
                .unwrap_or_default();
            images.sort();
            images
        }
    }
}

fn plan_worker(options: &BatchOptions, index: usize, image: PathBuf) -> std::io::Result<ChatWorker> {
    match options.kind {
        BatchKind::Content => Ok(ChatWorker::new(
            index,
            Some(image),
            Some(options.system_prompt.clone()),
            None,
        )),
        BatchKind::Code => {
            let sidecar = Detail::sidecar_path(&image);
            let detail = Detail::load_or_default(&sidecar);
            let mut text = detail.context_text();
            if options.upload_code {
                if let (Some(project), Some(location)) =
                    (detail.project.as_deref(), detail.location.as_deref())
                {
                    if !project.is_empty() && !location.is_empty() {
                        let source = Path::new(project).join(location);
                        if source.exists() {
                            let code = std::fs::read_to_string(&source)?;
                            text.push_str(&format!("\nSource Code:\n{}", code));
                        }
                    }
                }
            }
            Ok(ChatWorker::new(
                index,
                Some(image),
                Some(options.system_prompt.clone()),
                Some(text),
            ))
        }
    }
}

/// Clonable abort surface: stops the submitter, advisorily cancels started
/// workers, and drains the queue. A no-op once the run has settled.
#[derive(Clone)]
pub struct BatchAborter {
    stop: CancellationToken,
    queue: pool::WorkerQueue,
    states: Arc<Vec<Arc<WorkerState>>>,
    outcomes: UnboundedSender<WorkerOutcome>,
    running: Arc<AtomicBool>,
    log: Arc<RunLog>,
}

impl BatchAborter {
    pub fn abort(&self) {
        if !self.running.load(Ordering::Acquire) {
            return;
        }
        self.stop.cancel();
        for state in self.states.iter() {
            state.cancel();
        }
        let drained: Vec<ChatWorker> = self.queue.lock().unwrap().drain(..).collect();
        for worker in drained {
            worker.cancel_unstarted(&self.outcomes);
        }
        self.log.warning("User aborted...");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Handle to a running batch: console lines, abort, and the one-shot summary.
pub struct BatchHandle {
    pub id: Uuid,
    aborter: BatchAborter,
    console: Option<UnboundedReceiver<LogLine>>,
    summary_rx: oneshot::Receiver<BatchSummary>,
    barrier: Arc<CompletionBarrier>,
    log_path: PathBuf,
    #[allow(dead_code)]
    pub(crate) states: Arc<Vec<Arc<WorkerState>>>,
}

impl BatchHandle {
    pub fn aborter(&self) -> BatchAborter {
        self.aborter.clone()
    }

    pub fn abort(&self) {
        self.aborter.abort();
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Take the console receiver; available once.
    pub fn console(&mut self) -> Option<UnboundedReceiver<LogLine>> {
        self.console.take()
    }

    /// Wait for the run to settle and return its one-shot summary.
    pub async fn wait(self) -> BatchSummary {
        match self.summary_rx.await {
            Ok(summary) => summary,
            Err(_) => BatchSummary {
                id: self.id,
                total: self.barrier.total(),
                counts: self.barrier.counts(),
                log_path: self.log_path,
            },
        }
    }
}

/// Start a batch run. Planning failures skip the single image and the batch
/// proceeds; the returned handle owns the run-scoped log context.
pub fn start_batch(
    client: Arc<dyn ChatDispatch>,
    options: BatchOptions,
) -> std::io::Result<BatchHandle> {
    let id = Uuid::new_v4();
    let (log, console_rx) = RunLog::create(&options.log_dir, options.kind.log_prefix())?;
    let log = Arc::new(log);
    let log_path = log.path().to_path_buf();
    log.info(format!(
        "Starting... Log file is saved to {}",
        log_path.display()
    ));

    let images = plan_images(&options.folder, options.selection.as_deref());
    log.info(format!("Found {} images to process", images.len()));

    let mut workers = Vec::new();
    for (index, image) in images.into_iter().enumerate() {
        match plan_worker(&options, index, image) {
            Ok(worker) => workers.push(worker),
            Err(err) => log.error(format!("Failed to initialize worker {}: {}", index, err)),
        }
    }

    let total = workers.len();
    let states: Arc<Vec<Arc<WorkerState>>> =
        Arc::new(workers.iter().map(|worker| worker.state()).collect());
    let queue: pool::WorkerQueue = Arc::new(Mutex::new(VecDeque::from(workers)));
    let barrier = Arc::new(CompletionBarrier::new(total));
    let running = Arc::new(AtomicBool::new(true));
    let stop = CancellationToken::new();
    let (outcomes_tx, outcomes_rx) = unbounded_channel();
    let (summary_tx, summary_rx) = oneshot::channel();

    let aborter = BatchAborter {
        stop: stop.clone(),
        queue: queue.clone(),
        states: states.clone(),
        outcomes: outcomes_tx.clone(),
        running: running.clone(),
        log: log.clone(),
    };

    if total == 0 {
        log.error("No valid workers created!");
        if barrier.claim_empty() {
            running.store(false, Ordering::Release);
            log.info("All tasks completed!");
            let _ = summary_tx.send(BatchSummary {
                id,
                total,
                counts: barrier.counts(),
                log_path: log_path.clone(),
            });
        }
    } else {
        log.info(format!("Starting {} workers...", total));
        spawn_collector(
            options.kind,
            id,
            log.clone(),
            barrier.clone(),
            running.clone(),
            summary_tx,
            outcomes_rx,
            log_path.clone(),
        );
        let concurrency = options.concurrency.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(4)
        });
        Submitter {
            queue: queue.clone(),
            stop: stop.clone(),
            interval: options
                .start_interval
                .unwrap_or_else(|| options.kind.start_interval()),
            semaphore: Arc::new(Semaphore::new(concurrency)),
            client,
            outcomes: outcomes_tx,
            log: log.clone(),
        }
        .spawn();
    }

    Ok(BatchHandle {
        id,
        aborter,
        console: Some(console_rx),
        summary_rx,
        barrier,
        log_path,
        states,
    })
}

#[allow(clippy::too_many_arguments)]
fn spawn_collector(
    kind: BatchKind,
    id: Uuid,
    log: Arc<RunLog>,
    barrier: Arc<CompletionBarrier>,
    running: Arc<AtomicBool>,
    summary_tx: oneshot::Sender<BatchSummary>,
    mut outcomes_rx: UnboundedReceiver<WorkerOutcome>,
    log_path: PathBuf,
) {
    tokio::spawn(async move {
        let mut outputs: Vec<(PathBuf, String)> = Vec::new();
        while let Some(outcome) = outcomes_rx.recv().await {
            match &outcome.status {
                WorkStatus::Finished(_) => log.success(format!(
                    "{}: {} finished!",
                    outcome.index,
                    outcome.image.display()
                )),
                WorkStatus::Failed(err) => log.error(format!(
                    "{}: {} failed! Error: {}",
                    outcome.index,
                    outcome.image.display(),
                    err
                )),
                WorkStatus::Canceled => log.warning(format!(
                    "{}: {} canceled!",
                    outcome.index,
                    outcome.image.display()
                )),
            }

            let terminal = outcome.status.terminal();
            if let WorkStatus::Finished(text) = outcome.status {
                outputs.push((outcome.image, text));
            }

            if barrier.record(terminal) {
                running.store(false, Ordering::Release);
                for (image, text) in &outputs {
                    persist(kind, image, text, &log);
                }
                log.info("All tasks completed!");
                let _ = summary_tx.send(BatchSummary {
                    id,
                    total: barrier.total(),
                    counts: barrier.counts(),
                    log_path,
                });
                break;
            }
        }
    });
}

fn persist(kind: BatchKind, image: &Path, output: &str, log: &RunLog) {
    let sidecar = Detail::sidecar_path(image);
    let mut detail = Detail::load_or_default(&sidecar);
    kind.apply(&mut detail, output);
    if let Err(err) = detail.save(&sidecar) {
        log.error(format!("Failed to save {}: {}", sidecar.display(), err));
    }
}
