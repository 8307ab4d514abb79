//! Graceful shutdown.
//!
//! A [`ShutdownSignal`] is shared by the accept loop and every connection
//! task. When it fires, the accept loop stops, each connection finishes its
//! in-flight request, and the server waits for the [`ConnectionTracker`] to
//! reach zero, bounded by the configured timeout.
//!
//! Both types are thin wrappers over a `tokio::sync::watch` channel, so a
//! late subscriber still observes the current state.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

/// A cloneable, one-shot shutdown trigger.
///
/// # Example
///
/// ```
/// use courier_server::ShutdownSignal;
///
/// let shutdown = ShutdownSignal::new();
/// let handle = shutdown.clone();
///
/// shutdown.trigger();
/// assert!(handle.is_triggered());
/// ```
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    state: Arc<watch::Sender<bool>>,
}

impl ShutdownSignal {
    /// Creates an untriggered signal.
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(false);
        Self {
            state: Arc::new(state),
        }
    }

    /// Fires the signal. Later calls do nothing.
    pub fn trigger(&self) {
        let fired = self.state.send_if_modified(|triggered| !std::mem::replace(triggered, true));
        if fired {
            tracing::debug!("shutdown triggered");
        }
    }

    /// Returns `true` once the signal has fired.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        *self.state.borrow()
    }

    /// Completes when the signal fires, or at once if it already has.
    pub fn recv(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut state = self.state.subscribe();
        async move {
            // Err means every sender is gone; nothing can fire the signal
            // any more, so treat it as fired.
            let _ = state.wait_for(|triggered| *triggered).await;
        }
    }

    /// Creates a signal fired by SIGTERM or SIGINT (ctrl-c elsewhere).
    ///
    /// Must be called inside a Tokio runtime.
    #[must_use]
    pub fn with_os_signals() -> Self {
        let signal = Self::new();
        let handle = signal.clone();

        tokio::spawn(async move {
            os_signal().await;
            handle.trigger();
        });

        signal
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
async fn os_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(mut term), Ok(mut int)) => tokio::select! {
            _ = term.recv() => tracing::info!(signal = "SIGTERM", "stopping"),
            _ = int.recv() => tracing::info!(signal = "SIGINT", "stopping"),
        },
        (Err(e), _) | (_, Err(e)) => {
            tracing::error!(error = %e, "cannot install signal handlers, using ctrl-c");
            ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn os_signal() {
    ctrl_c().await;
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        // Only ShutdownSignal::trigger can stop the server now.
        tracing::error!(error = %e, "cannot listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!(signal = "ctrl-c", "stopping");
}

/// Counts open connections so shutdown can wait for them.
///
/// # Example
///
/// ```
/// use courier_server::shutdown::ConnectionTracker;
///
/// let tracker = ConnectionTracker::new();
/// let guard = tracker.open();
/// assert_eq!(tracker.open_connections(), 1);
///
/// drop(guard);
/// assert_eq!(tracker.open_connections(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionTracker {
    open: Arc<watch::Sender<usize>>,
}

impl ConnectionTracker {
    /// Creates a tracker with no connections.
    #[must_use]
    pub fn new() -> Self {
        let (open, _) = watch::channel(0);
        Self { open: Arc::new(open) }
    }

    /// Counts a connection until the returned guard drops.
    #[must_use]
    pub fn open(&self) -> ConnectionGuard {
        self.open.send_modify(|n| *n += 1);
        ConnectionGuard {
            open: Arc::clone(&self.open),
        }
    }

    /// Returns the number of open connections.
    #[must_use]
    pub fn open_connections(&self) -> usize {
        *self.open.borrow()
    }

    /// Completes once no connection is open.
    pub async fn drained(&self) {
        let mut open = self.open.subscribe();
        // The tracker holds a sender, so the channel cannot close here.
        let _ = open.wait_for(|n| *n == 0).await;
    }
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// One open connection; closes on drop.
#[derive(Debug)]
pub struct ConnectionGuard {
    open: Arc<watch::Sender<usize>>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.open.send_modify(|n| *n = n.saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_trigger_twice() {
        let signal = ShutdownSignal::new();
        assert!(!signal.is_triggered());

        signal.trigger();
        signal.trigger();
        assert!(signal.is_triggered());
    }

    #[tokio::test]
    async fn test_recv_wakes_on_trigger() {
        let signal = ShutdownSignal::new();
        let waiter = tokio::spawn(signal.recv());

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        signal.trigger();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_recv_after_trigger_completes_at_once() {
        let signal = ShutdownSignal::new();
        signal.trigger();

        tokio::time::timeout(Duration::from_millis(10), signal.recv())
            .await
            .unwrap();
    }

    #[test]
    fn test_guards_count_connections() {
        let tracker = ConnectionTracker::new();
        let first = tracker.open();
        let second = tracker.clone().open();
        assert_eq!(tracker.open_connections(), 2);

        drop(first);
        assert_eq!(tracker.open_connections(), 1);
        drop(second);
        assert_eq!(tracker.open_connections(), 0);
    }

    #[tokio::test]
    async fn test_drained_waits_for_last_guard() {
        let tracker = ConnectionTracker::new();
        let guard = tracker.open();

        let waiter = {
            let tracker = tracker.clone();
            tokio::spawn(async move { tracker.drained().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_drained_with_nothing_open() {
        let tracker = ConnectionTracker::new();
        tokio::time::timeout(Duration::from_millis(10), tracker.drained())
            .await
            .unwrap();
    }
}
