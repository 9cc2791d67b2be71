//! Process-wide session state: configuration written by the UI layer
//! before a run, results and run status owned by the orchestrator
//! while one is active.

use std::sync::{Arc, Mutex, RwLock};

use promptlab_core::error::{ConfigError, Result};

use crate::config::{PromptConfig, ScorerConfig};
use crate::record::ResultRecord;

/// Lifecycle of the single evaluation run a session allows at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Failed,
}

impl RunState {
    pub fn is_running(&self) -> bool {
        matches!(self, RunState::Running)
    }
}

/// Holds prompt and scorer configuration plus the shared results
/// collection. Results are behind a lock so a rendering layer can read
/// a partially populated collection during an active run; only the
/// orchestrator writes.
pub struct SessionState {
    pub prompts: Vec<PromptConfig>,
    pub scorers: Vec<ScorerConfig>,
    results: Arc<RwLock<Vec<ResultRecord>>>,
    state: Arc<Mutex<RunState>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            prompts: Vec::new(),
            scorers: Vec::new(),
            results: Arc::new(RwLock::new(Vec::new())),
            state: Arc::new(Mutex::new(RunState::Idle)),
        }
    }

    pub fn state(&self) -> RunState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Snapshot of the results collected so far.
    pub fn results(&self) -> Vec<ResultRecord> {
        self.results
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Shared handle for a renderer that polls during a run.
    pub fn results_handle(&self) -> Arc<RwLock<Vec<ResultRecord>>> {
        Arc::clone(&self.results)
    }

    pub(crate) fn clear_results(&self) {
        self.results.write().unwrap_or_else(|e| e.into_inner()).clear();
    }

    pub(crate) fn push_result(&self, record: ResultRecord) {
        self.results
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(record);
    }

    /// Transition Idle/Completed/Failed → Running, or fail if a run is
    /// already active. The returned guard resolves the final state; if
    /// it is dropped unresolved (early error, panic) the session falls
    /// back to Idle so a new run can always be started.
    pub(crate) fn try_begin_run(&self) -> Result<RunGuard> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.is_running() {
            return Err(ConfigError::RunInProgress.into());
        }
        *state = RunState::Running;
        Ok(RunGuard {
            state: Arc::clone(&self.state),
            resolved: false,
        })
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub(crate) struct RunGuard {
    state: Arc<Mutex<RunState>>,
    resolved: bool,
}

impl RunGuard {
    fn resolve(mut self, target: RunState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = target;
        self.resolved = true;
    }

    pub(crate) fn complete(self) {
        self.resolve(RunState::Completed);
    }

    pub(crate) fn fail(self) {
        self.resolve(RunState::Failed);
    }

    pub(crate) fn idle(self) {
        self.resolve(RunState::Idle);
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if !self.resolved {
            *self.state.lock().unwrap_or_else(|e| e.into_inner()) = RunState::Idle;
        }
    }
}
