//! Script Engine
//!
//! Evaluates `FindProxyForURL(url, host)` in an embedded JavaScript
//! interpreter. The interpreter is not thread-safe, so each engine owns one
//! worker thread and evaluations queue up behind it, one at a time.

mod bindings;
mod runtime;

pub use bindings::global_names;
pub use runtime::ScriptRuntime;

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn};

use crate::config::EngineConfig;
use crate::error::PacError;
use crate::predicates::PredicateLibrary;

/// Jobs waiting for a worker before callers start to block
const QUEUE_DEPTH: usize = 64;

struct Job {
    script: Arc<str>,
    url: String,
    host: String,
    reply: oneshot::Sender<Result<String, PacError>>,
}

/// The live worker plus the library each replacement starts from
#[derive(Debug)]
struct Worker {
    generation: u64,
    jobs: mpsc::Sender<Job>,
    library: PredicateLibrary,
}

/// Handle to a single-threaded evaluation worker.
///
/// A worker whose job overruns the evaluation timeout is abandoned and a
/// fresh one takes its place, so a wedged script cannot hold up later
/// calls. The abandoned thread exits once the interpreter gives control
/// back. Dropping the handle closes the queue and lets the current worker
/// exit after its job.
#[derive(Debug)]
pub struct ScriptEngine {
    config: EngineConfig,
    worker: Mutex<Worker>,
}

impl ScriptEngine {
    pub fn new(library: PredicateLibrary, config: &EngineConfig) -> Result<Self, PacError> {
        let jobs = spawn_worker(library.clone(), config, 0)?;
        Ok(Self {
            config: config.clone(),
            worker: Mutex::new(Worker {
                generation: 0,
                jobs,
                library,
            }),
        })
    }

    pub fn evaluation_timeout(&self) -> Duration {
        self.config.evaluation_timeout
    }

    /// Workers started so far, counting the first
    pub fn workers_started(&self) -> u64 {
        self.lock_worker().generation + 1
    }

    /// Evaluate `script` for one request and return the raw answer string.
    ///
    /// Takes at most the configured evaluation timeout, queueing included.
    pub async fn evaluate(&self, script: Arc<str>, url: &str, host: &str) -> Result<String, PacError> {
        let (generation, jobs) = {
            let worker = self.lock_worker();
            (worker.generation, worker.jobs.clone())
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        let job = Job {
            script,
            url: url.to_string(),
            host: host.to_string(),
            reply: reply_tx,
        };

        let exchange = async {
            if jobs.send(job).await.is_err() {
                return Err(PacError::Evaluation("PAC engine worker is not running".to_string()));
            }
            match reply_rx.await {
                Ok(result) => result,
                Err(_) => Err(PacError::Evaluation(
                    "PAC engine worker dropped the evaluation".to_string(),
                )),
            }
        };

        match tokio::time::timeout(self.config.evaluation_timeout, exchange).await {
            Ok(result) => {
                if jobs.is_closed() {
                    self.replace_worker(generation);
                }
                result
            }
            Err(_) => {
                self.replace_worker(generation);
                Err(PacError::Evaluation(format!(
                    "evaluation timed out after {}",
                    humantime::format_duration(self.config.evaluation_timeout)
                )))
            }
        }
    }

    /// Swap in a fresh worker unless another caller already replaced `stale`
    fn replace_worker(&self, stale: u64) {
        let mut worker = self.lock_worker();
        if worker.generation != stale {
            return;
        }

        let generation = stale + 1;
        match spawn_worker(worker.library.clone(), &self.config, generation) {
            Ok(jobs) => {
                warn!(
                    retired = stale,
                    generation, "PAC engine worker unresponsive, started a replacement"
                );
                worker.generation = generation;
                worker.jobs = jobs;
            }
            Err(e) => error!(error = %e, "Failed to replace PAC engine worker"),
        }
    }

    fn lock_worker(&self) -> std::sync::MutexGuard<'_, Worker> {
        self.worker.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Start a worker thread owning its own interpreter and wait until it is ready
fn spawn_worker(
    library: PredicateLibrary,
    config: &EngineConfig,
    generation: u64,
) -> Result<mpsc::Sender<Job>, PacError> {
    let (jobs_tx, mut jobs_rx) = mpsc::channel::<Job>(QUEUE_DEPTH);
    let (ready_tx, ready_rx) = std::sync::mpsc::sync_channel(1);
    let worker_config = config.clone();

    std::thread::Builder::new()
        .name(format!("pac-engine-{generation}"))
        .spawn(move || {
            let mut runtime = match ScriptRuntime::new(library, &worker_config) {
                Ok(runtime) => {
                    let _ = ready_tx.send(Ok(()));
                    runtime
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };

            while let Some(job) = jobs_rx.blocking_recv() {
                // Skip work nobody is waiting for any more.
                if job.reply.is_closed() {
                    continue;
                }
                let started = Instant::now();
                let result = runtime.evaluate(&job.script, &job.url, &job.host);
                debug!(
                    host = %job.host,
                    elapsed = ?started.elapsed(),
                    ok = result.is_ok(),
                    "Evaluated FindProxyForURL"
                );
                // The caller may have timed out and gone away.
                let _ = job.reply.send(result);
            }
            debug!(generation, "PAC engine worker stopped");
        })
        .map_err(|e| PacError::Config(format!("failed to start PAC engine thread: {e}")))?;

    ready_rx.recv().map_err(|_| {
        error!("PAC engine worker exited during start-up");
        PacError::Evaluation("PAC engine worker exited during start-up".to_string())
    })??;

    Ok(jobs_tx)
}
