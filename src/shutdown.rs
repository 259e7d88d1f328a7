//! Graceful shutdown coordination
//!
//! Signals only flip a flag. The assistant loop polls it once per cycle, so a
//! cycle that is already underway always runs to completion.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::task::JoinHandle;

/// Process-wide shutdown request flag
#[derive(Debug, Default)]
pub struct Shutdown {
    requested: AtomicBool,
}

impl Shutdown {
    /// Create a coordinator with no shutdown requested
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Request a graceful shutdown
    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    /// Check whether shutdown has been requested
    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Spawn a task that requests shutdown on SIGINT or SIGTERM
    ///
    /// # Errors
    ///
    /// Returns error if the signal handlers cannot be registered
    pub fn listen_for_signals(self: &Arc<Self>) -> std::io::Result<JoinHandle<()>> {
        let shutdown = Arc::clone(self);

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};

            let mut interrupt = signal(SignalKind::interrupt())?;
            let mut terminate = signal(SignalKind::terminate())?;

            Ok(tokio::spawn(async move {
                loop {
                    let name = tokio::select! {
                        Some(()) = interrupt.recv() => "SIGINT",
                        Some(()) = terminate.recv() => "SIGTERM",
                        else => break,
                    };
                    tracing::info!(signal = name, "received signal, initiating graceful shutdown");
                    shutdown.request();
                }
            }))
        }

        #[cfg(not(unix))]
        {
            Ok(tokio::spawn(async move {
                while tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!(signal = "ctrl-c", "received signal, initiating graceful shutdown");
                    shutdown.request();
                }
            }))
        }
    }
}
