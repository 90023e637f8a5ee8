use crate::infrastructure::auth::AuthProvider;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{info, trace, warn};

/// User interaction that counts as activity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActivityKind {
    PointerMove,
    KeyPress,
    Scroll,
    TouchStart,
}

impl ActivityKind {
    pub const ALL: [ActivityKind; 4] = [
        ActivityKind::PointerMove,
        ActivityKind::KeyPress,
        ActivityKind::Scroll,
        ActivityKind::TouchStart,
    ];

    /// Maps a DOM event name onto an activity kind.
    pub fn from_event_name(name: &str) -> Option<Self> {
        match name {
            "mousemove" | "pointermove" => Some(ActivityKind::PointerMove),
            "keydown" => Some(ActivityKind::KeyPress),
            "scroll" => Some(ActivityKind::Scroll),
            "touchstart" => Some(ActivityKind::TouchStart),
            _ => None,
        }
    }
}

#[derive(Debug)]
enum SessionSignal {
    Activity(ActivityKind),
    PageTeardown,
}

/// Handle used by the UI layer to feed events into a [`SessionMonitor`].
#[derive(Clone)]
pub struct ActivityReporter {
    signals: mpsc::UnboundedSender<SessionSignal>,
}

impl ActivityReporter {
    /// Returns false once the monitor has stopped.
    pub fn report(&self, kind: ActivityKind) -> bool {
        self.signals.send(SessionSignal::Activity(kind)).is_ok()
    }

    pub fn page_teardown(&self) -> bool {
        self.signals.send(SessionSignal::PageTeardown).is_ok()
    }
}

/// Signs the user out after a period without interaction, or when the page
/// goes away.
///
/// One task owns the single pending deadline. Every activity event replaces
/// it with `now + idle_timeout`, so deadlines never pile up. The deadline is
/// armed as soon as the monitor starts.
pub struct SessionMonitor {
    reporter: ActivityReporter,
    deadline: Arc<watch::Sender<Option<Instant>>>,
    task: JoinHandle<()>,
}

impl SessionMonitor {
    pub fn start<A: AuthProvider + 'static>(auth: Arc<A>, idle_timeout: Duration) -> Self {
        let (signals_tx, signals_rx) = mpsc::unbounded_channel();
        let (deadline, _) = watch::channel(None);
        let deadline = Arc::new(deadline);

        let task = tokio::spawn(run(auth, idle_timeout, signals_rx, Arc::clone(&deadline)));
        SessionMonitor {
            reporter: ActivityReporter { signals: signals_tx },
            deadline,
            task,
        }
    }

    pub fn reporter(&self) -> ActivityReporter {
        self.reporter.clone()
    }

    /// The pending sign-out deadline, if one is armed.
    pub fn deadline(&self) -> Option<Instant> {
        *self.deadline.borrow()
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stops listening and cancels the pending deadline.
    pub fn dispose(self) {
        drop(self);
    }
}

impl Drop for SessionMonitor {
    fn drop(&mut self) {
        self.task.abort();
        self.deadline.send_replace(None);
    }
}

async fn run<A: AuthProvider + 'static>(
    auth: Arc<A>,
    idle_timeout: Duration,
    mut signals: mpsc::UnboundedReceiver<SessionSignal>,
    deadline_tx: Arc<watch::Sender<Option<Instant>>>,
) {
    let mut deadline = Some(Instant::now() + idle_timeout);
    deadline_tx.send_replace(deadline);

    loop {
        tokio::select! {
            signal = signals.recv() => match signal {
                Some(SessionSignal::Activity(kind)) => {
                    trace!(?kind, "Activity; re-arming session deadline");
                    deadline = Some(Instant::now() + idle_timeout);
                }
                Some(SessionSignal::PageTeardown) => {
                    // fire-and-forget, the page is going away
                    let auth = Arc::clone(&auth);
                    tokio::spawn(async move {
                        match auth.sign_out().await {
                            Ok(()) => info!("Signed out on page teardown"),
                            Err(e) => warn!(error = %e, "Sign-out error on page teardown"),
                        }
                    });
                    break;
                }
                None => break,
            },
            _ = wait_until(deadline) => {
                info!("Session expired due to inactivity");
                deadline = None;
                if let Err(e) = auth.sign_out().await {
                    warn!(error = %e, "Sign-out after inactivity failed");
                }
            }
        }
        deadline_tx.send_replace(deadline);
    }
    deadline_tx.send_replace(None);
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
