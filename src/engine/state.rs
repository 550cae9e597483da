use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use log::debug;
use tokio::sync::mpsc;

use crate::engine::models::{NewsEntry, PatchNoteEntry, ServerState};

pub const READY_STATUS: &str = "Ready to check for updates";

/// Long-running operations guarded by the busy flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Verifying,
    Downloading,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationState {
    Idle,
    Busy(Operation),
}

/// Whether a trigger call ran or was turned away because another operation holds the flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionOutcome {
    Completed,
    Rejected,
}

// Change notifications for whoever renders the session.
#[derive(Clone, Debug, PartialEq)]
pub enum LauncherEvent {
    Progress(f32),
    Status(String),
    OperationChanged(OperationState),
    ServerStateChanged(ServerState),
    NewsReplaced(Vec<NewsEntry>),
    PatchNotesReplaced(Vec<PatchNoteEntry>),
    ExecutableAvailability(bool),
}

// The central source of truth for the caller.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionState {
    pub progress: f32,
    pub status: String,
    pub operation: OperationState,
    pub server_state: ServerState,
    pub news: Vec<NewsEntry>,
    pub patch_notes: Vec<PatchNoteEntry>,
    pub executable_available: bool,
}

impl SessionState {
    pub fn is_busy(&self) -> bool {
        matches!(self.operation, OperationState::Busy(_))
    }
}

/// Shared handle over the session state that emits an event for every change.
#[derive(Clone)]
pub struct Session {
    state: Arc<Mutex<SessionState>>,
    busy: Arc<AtomicBool>,
    updates: mpsc::UnboundedSender<LauncherEvent>,
}

impl Session {
    pub fn new(initial: SessionState, updates: mpsc::UnboundedSender<LauncherEvent>) -> Self {
        let busy = Arc::new(AtomicBool::new(initial.is_busy()));
        Self {
            state: Arc::new(Mutex::new(initial)),
            busy,
            updates,
        }
    }

    pub fn snapshot(&self) -> SessionState {
        self.lock().clone()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Claim the busy flag for `operation`, or `None` if it is already held.
    pub fn try_begin(&self, operation: Operation) -> Option<BusyGuard> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("session: rejected {operation:?}; another operation is running");
            return None;
        }
        self.set_operation(OperationState::Busy(operation));
        Some(BusyGuard {
            session: self.clone(),
        })
    }

    pub fn set_progress(&self, progress: f32) {
        let progress = progress.clamp(0.0, 100.0);
        {
            let mut state = self.lock();
            if (state.progress - progress).abs() < 0.001 {
                return;
            }
            state.progress = progress;
        }
        self.emit(LauncherEvent::Progress(progress));
    }

    pub fn set_status(&self, status: impl Into<String>) {
        let status = status.into();
        {
            let mut state = self.lock();
            if state.status == status {
                return;
            }
            state.status = status.clone();
        }
        debug!("session: status \"{status}\"");
        self.emit(LauncherEvent::Status(status));
    }

    pub fn set_server_state(&self, server_state: ServerState) {
        {
            let mut state = self.lock();
            if state.server_state == server_state {
                return;
            }
            state.server_state = server_state;
        }
        self.emit(LauncherEvent::ServerStateChanged(server_state));
    }

    pub fn set_executable_available(&self, available: bool) {
        {
            let mut state = self.lock();
            if state.executable_available == available {
                return;
            }
            state.executable_available = available;
        }
        self.emit(LauncherEvent::ExecutableAvailability(available));
    }

    pub fn replace_news(&self, news: Vec<NewsEntry>) {
        self.lock().news = news.clone();
        self.emit(LauncherEvent::NewsReplaced(news));
    }

    pub fn replace_patch_notes(&self, notes: Vec<PatchNoteEntry>) {
        self.lock().patch_notes = notes.clone();
        self.emit(LauncherEvent::PatchNotesReplaced(notes));
    }

    fn set_operation(&self, operation: OperationState) {
        self.lock().operation = operation;
        self.emit(LauncherEvent::OperationChanged(operation));
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        // A panic while holding the lock leaves plain data behind; keep using it.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, event: LauncherEvent) {
        // The receiver may be gone during shutdown.
        let _ = self.updates.send(event);
    }
}

/// Returns the session to idle when dropped, whatever way the operation ended.
pub struct BusyGuard {
    session: Session,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.session.set_operation(OperationState::Idle);
        self.session.busy.store(false, Ordering::SeqCst);
    }
}
