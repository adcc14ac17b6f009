//! Timeout Controller
//!
//! Two independent single-shot timers per session: an idle clock that is
//! reset by activity, and a hard clock counted from session creation that
//! is never extended. Firings are delivered over a channel; the receiver
//! decides what a firing means for the session.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Which of the two per-session clocks fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutKind {
    Idle,
    Hard,
}

impl TimeoutKind {
    fn suffix(self) -> &'static str {
        match self {
            TimeoutKind::Idle => "idle",
            TimeoutKind::Hard => "hard",
        }
    }
}

/// A timer firing, delivered to the session reaper.
#[derive(Debug)]
pub struct TimeoutFired {
    pub connection_id: String,
    pub kind: TimeoutKind,
}

/// Answers whether a session is still live and not closing. Injected at
/// construction so the controller never re-arms a clock for a session
/// that is already being torn down.
pub type SessionProbe = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Owns the timer table for all live sessions.
///
/// Keys are `<connection_id>:idle` and `<connection_id>:hard`, so a
/// session holds at most two active timers at any moment.
pub struct TimeoutController {
    idle: Duration,
    hard: Duration,
    timers: DashMap<String, JoinHandle<()>>,
    fired_tx: mpsc::UnboundedSender<TimeoutFired>,
    liveness: SessionProbe,
}

impl TimeoutController {
    /// Create a controller and the receiving end for its firings.
    pub fn new(
        idle: Duration,
        hard: Duration,
        liveness: SessionProbe,
    ) -> (Self, mpsc::UnboundedReceiver<TimeoutFired>) {
        let (fired_tx, fired_rx) = mpsc::unbounded_channel();
        (
            Self {
                idle,
                hard,
                timers: DashMap::new(),
                fired_tx,
                liveness,
            },
            fired_rx,
        )
    }

    /// Arm both clocks for a freshly admitted session.
    pub fn start(&self, connection_id: &str) {
        self.arm(connection_id, TimeoutKind::Idle);
        self.arm(connection_id, TimeoutKind::Hard);
    }

    /// Activity observed: replace the idle timer with a fresh one of full
    /// duration. The hard timer is untouched.
    ///
    /// A reset racing a fired timer or a teardown must not resurrect
    /// timers, so sessions that are gone or already closing are refused.
    pub fn reset_idle(&self, connection_id: &str) {
        if !(self.liveness)(connection_id) {
            return;
        }
        self.arm(connection_id, TimeoutKind::Idle);
    }

    /// Cancel both timers for a session. Safe to call repeatedly.
    pub fn cancel(&self, connection_id: &str) {
        for kind in [TimeoutKind::Hard, TimeoutKind::Idle] {
            if let Some((_, handle)) = self.timers.remove(&key(connection_id, kind)) {
                handle.abort();
            }
        }
    }

    /// Cancel every timer. Used on shutdown.
    pub fn cancel_all(&self) {
        self.timers.retain(|_, handle| {
            handle.abort();
            false
        });
    }

    fn arm(&self, connection_id: &str, kind: TimeoutKind) {
        let duration = match kind {
            TimeoutKind::Idle => self.idle,
            TimeoutKind::Hard => self.hard,
        };
        let fired_tx = self.fired_tx.clone();
        let id = connection_id.to_string();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            debug!(connection_id = %id, kind = ?kind, "Session timer fired");
            let _ = fired_tx.send(TimeoutFired {
                connection_id: id,
                kind,
            });
        });

        if let Some(previous) = self.timers.insert(key(connection_id, kind), handle) {
            previous.abort();
        }
    }
}

fn key(connection_id: &str, kind: TimeoutKind) -> String {
    format!("{}:{}", connection_id, kind.suffix())
}
