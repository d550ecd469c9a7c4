use crate::error::{OpsError, Result};
use crate::output;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Shutdown request shared by the signal listener and the launch sequence.
///
/// Signals only request shutdown; the launch sequence owns the teardown.
#[derive(Clone, Default)]
pub struct Shutdown {
    token: CancellationToken,
    reason: Arc<Mutex<Option<String>>>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self, reason: &str) {
        if let Ok(mut r) = self.reason.lock() {
            r.get_or_insert_with(|| reason.to_string());
        }
        self.token.cancel();
    }

    pub fn is_requested(&self) -> bool {
        self.token.is_cancelled()
    }

    pub async fn requested(&self) {
        self.token.cancelled().await
    }

    pub fn reason(&self) -> String {
        self.reason
            .lock()
            .ok()
            .and_then(|r| r.clone())
            .unwrap_or_else(|| "shutdown".to_string())
    }

    /// Fail with `Interrupted` if shutdown was already requested.
    pub fn check(&self) -> Result<()> {
        if self.is_requested() {
            Err(OpsError::interrupted(self.reason()))
        } else {
            Ok(())
        }
    }

    /// Run `fut` unless shutdown is requested first.
    pub async fn guard<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(OpsError::interrupted(self.reason())),
            res = fut => res,
        }
    }

    /// Record a received signal. The first one requests shutdown; any later one
    /// means the user wants out now.
    pub fn on_signal(&self, name: &str) -> SignalAction {
        if self.is_requested() {
            SignalAction::ForceExit
        } else {
            self.request(name);
            SignalAction::Requested
        }
    }

    /// Turn interrupt, quit and terminate signals into a shutdown request. A second
    /// signal while teardown is still running exits with status 130.
    pub fn listen_for_signals(&self) -> JoinHandle<()> {
        let shutdown = self.clone();
        tokio::spawn(async move {
            let mut signals = match Signals::install() {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!("could not install signal handlers: {e}");
                    return;
                }
            };
            while let Some(name) = signals.next().await {
                tracing::debug!("received {name}");
                if shutdown.on_signal(name) == SignalAction::ForceExit {
                    output::warn(&format!("Received {name} again, exiting without cleanup."));
                    std::process::exit(130);
                }
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    Requested,
    ForceExit,
}

#[cfg(unix)]
struct Signals {
    interrupt: tokio::signal::unix::Signal,
    quit: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl Signals {
    fn install() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Signals {
            interrupt: signal(SignalKind::interrupt())?,
            quit: signal(SignalKind::quit())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    async fn next(&mut self) -> Option<&'static str> {
        tokio::select! {
            Some(()) = self.interrupt.recv() => Some("SIGINT"),
            Some(()) = self.quit.recv() => Some("SIGQUIT"),
            Some(()) = self.terminate.recv() => Some("SIGTERM"),
            else => None,
        }
    }
}

#[cfg(not(unix))]
struct Signals;

#[cfg(not(unix))]
impl Signals {
    fn install() -> std::io::Result<Self> {
        Ok(Signals)
    }

    async fn next(&mut self) -> Option<&'static str> {
        tokio::signal::ctrl_c().await.ok().map(|()| "ctrl-c")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn guard_passes_through_when_not_requested() {
        let shutdown = Shutdown::new();
        let v = shutdown.guard(async { Ok::<_, OpsError>(7) }).await.unwrap();
        assert_eq!(v, 7);
    }

    #[tokio::test]
    async fn guard_interrupts_pending_work() {
        let shutdown = Shutdown::new();
        let trigger = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.request("SIGTERM");
        });

        let err = shutdown
            .guard(async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok::<_, OpsError>(())
            })
            .await
            .unwrap_err();
        assert!(err.is_interrupted());
        assert!(err.to_string().contains("SIGTERM"));
    }

    #[test]
    fn repeated_signal_forces_exit() {
        let shutdown = Shutdown::new();
        assert_eq!(shutdown.on_signal("SIGINT"), SignalAction::Requested);
        assert_eq!(shutdown.on_signal("SIGINT"), SignalAction::ForceExit);
        assert_eq!(shutdown.reason(), "SIGINT");
    }

    #[test]
    fn first_reason_wins() {
        let shutdown = Shutdown::new();
        shutdown.request("SIGINT");
        shutdown.request("SIGTERM");
        assert_eq!(shutdown.reason(), "SIGINT");
        assert!(shutdown.check().unwrap_err().is_interrupted());
    }
}
