//! Deferred cleanup scheduling.
//!
//! Teardown of a finished recording must not run inside the code path that
//! observed its completion. Tasks are queued here and drained by the
//! control loop on its next iteration, after the triggering message has
//! been fully handled. Tasks are idempotent; running one twice is safe.

use crossbeam_channel::{unbounded, Receiver, Sender};

/// Work deferred to the next control-loop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupTask {
    /// Tear the drained recording sub-graph out of the live graph.
    TeardownRecording,
}

/// Unbounded queue of deferred cleanup tasks.
pub struct CleanupScheduler {
    tx: Sender<CleanupTask>,
    rx: Receiver<CleanupTask>,
}

impl CleanupScheduler {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn schedule(&self, task: CleanupTask) {
        tracing::debug!("scheduled cleanup task {:?}", task);
        let _ = self.tx.send(task);
    }

    /// Pop the next pending task, if any.
    pub fn try_next(&self) -> Option<CleanupTask> {
        self.rx.try_recv().ok()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Default for CleanupScheduler {
    fn default() -> Self {
        Self::new()
    }
}
