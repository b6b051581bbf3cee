use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use anyhow::anyhow;
use command_executor::command::Command;
use command_executor::shutdown_mode::ShutdownMode;
use command_executor::thread_pool::ThreadPool;
use command_executor::thread_pool_builder::ThreadPoolBuilder;

use crate::config::Config;
use crate::error::SortError;

/// Outcome bookkeeping shared between a [Phase] and the commands it runs.
///
/// The first failure aborts the phase: commands that did not start yet skip their work.
pub(crate) struct PhaseState {
    aborted: AtomicBool,
    completed: AtomicUsize,
    skipped: AtomicUsize,
    failures: Mutex<Vec<(String, anyhow::Error)>>,
}

impl PhaseState {
    fn new() -> PhaseState {
        PhaseState {
            aborted: AtomicBool::new(false),
            completed: AtomicUsize::new(0),
            skipped: AtomicUsize::new(0),
            failures: Mutex::new(Vec::new()),
        }
    }

    /// Run `work` as task `task` unless the phase was aborted, recording its outcome.
    pub(crate) fn run<F>(&self, task: &str, work: F)
        where F: FnOnce() -> Result<(), anyhow::Error> {
        if self.aborted.load(Ordering::Acquire) {
            log::debug!("Skip task {} of an aborted phase", task);
            self.skipped.fetch_add(1, Ordering::AcqRel);
            return;
        }

        match work() {
            Ok(()) => {
                self.completed.fetch_add(1, Ordering::AcqRel);
            }
            Err(e) => {
                log::error!("Task {} failed, thread: {}, error: {:#}", task, thread::current().name().unwrap_or("unnamed"), e);
                self.aborted.store(true, Ordering::Release);
                match self.failures.lock() {
                    Ok(mut failures) => failures.push((task.to_string(), e)),
                    Err(poisoned) => poisoned.into_inner().push((task.to_string(), e)),
                }
            }
        }
    }
}

/// A set of independent tasks running on a worker pool, followed by a barrier.
///
/// [Phase::wait] returns only after every submitted task has completed, failed or been skipped.
pub(crate) struct Phase {
    name: String,
    pool: ThreadPool,
    state: Arc<PhaseState>,
    submitted: usize,
}

impl Phase {
    pub(crate) fn new(name: &str, config: &Config) -> Result<Phase, anyhow::Error> {
        let mut thread_pool_builder = ThreadPoolBuilder::new();
        let pool = thread_pool_builder
            .with_name(name.to_string())
            .with_tasks(config.tasks())
            .with_queue_size(config.queue_size())
            .with_shutdown_mode(ShutdownMode::CompletePending)
            .build()?;
        log::info!("Start phase {}", name);
        Ok(
            Phase {
                name: name.to_string(),
                pool,
                state: Arc::new(PhaseState::new()),
                submitted: 0,
            }
        )
    }

    /// Shared state to hand to the commands of this phase
    pub(crate) fn state(&self) -> Arc<PhaseState> {
        self.state.clone()
    }

    pub(crate) fn submit(&mut self, command: Box<dyn Command + Send + Sync>) {
        self.submitted += 1;
        self.pool.submit(command);
    }

    /// Wait for all submitted tasks. Fails with [SortError::PhaseFailure] when any task failed,
    /// the first failure is the source of the returned error.
    pub(crate) fn wait(self) -> Result<(), anyhow::Error> {
        let Phase { name, mut pool, state, submitted } = self;
        pool.shutdown();
        pool.join()?;

        let mut failures = match state.failures.lock() {
            Ok(mut failures) => std::mem::take(&mut *failures),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        let completed = state.completed.load(Ordering::Acquire);
        let skipped = state.skipped.load(Ordering::Acquire);

        if failures.is_empty() {
            if completed != submitted {
                return Err(anyhow!("phase {}: {} tasks submitted, {} completed", name, submitted, completed));
            }
            log::info!("Finish phase {}, tasks: {}", name, completed);
            Ok(())
        } else {
            log::error!("Phase {} failed, failed: {}, completed: {}, skipped: {}", name, failures.len(), completed, skipped);
            let failed: Vec<String> = failures.iter().map(|(task, _)| task.clone()).collect();
            let (_, first) = failures.remove(0);
            Err(first.context(SortError::PhaseFailure { phase: name, failed }))
        }
    }
}
