use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::errors::Result;
use crate::transport::Transport;

/// Creates the network session on first need
pub type TransportFactory = Arc<dyn Fn() -> Result<Arc<dyn Transport>> + Send + Sync>;

struct SessionState {
    transport: Option<Arc<dyn Transport>>,
    ref_count: usize,
    opened: u64,
}

/// Reference-counted owner of the shared network session
///
/// Every client built from the same context shares this manager. Entering a
/// scope takes a reference; the session is closed when the last scope exits.
pub struct SessionManager {
    factory: TransportFactory,
    state: Mutex<SessionState>,
}

impl SessionManager {
    pub fn new(factory: TransportFactory) -> Self {
        Self { factory, state: Mutex::new(SessionState { transport: None, ref_count: 0, opened: 0 }) }
    }

    /// Enter a scope: take a reference and make sure the session exists
    ///
    /// The returned guard releases the reference when dropped, including on
    /// early return or unwinding.
    pub fn enter(self: &Arc<Self>) -> Result<SessionGuard> {
        let mut state = self.state.lock();
        self.open_locked(&mut state)?;
        state.ref_count += 1;
        debug!(ref_count = state.ref_count, "Entered session scope");

        Ok(SessionGuard { manager: Arc::clone(self) })
    }

    /// The shared session, opened lazily
    pub fn transport(&self) -> Result<Arc<dyn Transport>> {
        let mut state = self.state.lock();
        self.open_locked(&mut state)
    }

    fn open_locked(&self, state: &mut SessionState) -> Result<Arc<dyn Transport>> {
        if let Some(transport) = &state.transport {
            return Ok(Arc::clone(transport));
        }

        let transport = (self.factory)()?;
        state.transport = Some(Arc::clone(&transport));
        state.opened += 1;
        debug!(sessions_opened = state.opened, "Opened network session");

        Ok(transport)
    }

    pub fn increment_ref(&self) {
        self.state.lock().ref_count += 1;
    }

    /// Drop a reference, closing the session when none remain
    ///
    /// Never goes below zero.
    pub fn decrement_ref(&self) {
        let mut state = self.state.lock();
        if state.ref_count == 0 {
            return;
        }

        state.ref_count -= 1;
        if state.ref_count == 0 && state.transport.take().is_some() {
            debug!("Closed network session");
        }
    }

    pub fn ref_count(&self) -> usize {
        self.state.lock().ref_count
    }

    /// True when no scope holds the session
    pub fn should_close(&self) -> bool {
        self.ref_count() == 0
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().transport.is_some()
    }

    /// Number of sessions opened over the manager's lifetime
    pub fn sessions_opened(&self) -> u64 {
        self.state.lock().opened
    }
}

/// Scope holding one session reference
#[must_use = "the session reference is released when the guard is dropped"]
pub struct SessionGuard {
    manager: Arc<SessionManager>,
}

impl SessionGuard {
    pub fn transport(&self) -> Result<Arc<dyn Transport>> {
        self.manager.transport()
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.manager.decrement_ref();
    }
}
