//! Conversation session state
//!
//! The session is either waiting for the wake word or inside a conversation
//! window. The conversation window carries the time of the last successful
//! interaction, so an inactivity timestamp exists exactly when a conversation
//! does.

use std::time::Duration;

use tokio::time::Instant;

/// Default inactivity window before a conversation ends
pub const CONVERSATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Listening mode of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Passive listening for the wake word
    WakeWaiting,
    /// Every utterance is a command for the agent
    Conversation {
        /// Time of the last wake acknowledgment or completed command
        last_interaction: Instant,
    },
}

impl Mode {
    /// Short label used in logs and traces
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::WakeWaiting => "wake_waiting",
            Self::Conversation { .. } => "conversation",
        }
    }
}

/// The long-lived interaction session
#[derive(Debug, Clone)]
pub struct Session {
    mode: Mode,
    timeout: Duration,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(CONVERSATION_TIMEOUT)
    }
}

impl Session {
    /// Create a session waiting for the wake word
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self {
            mode: Mode::WakeWaiting,
            timeout,
        }
    }

    /// Current mode
    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    /// Inactivity window for conversations
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Whether a conversation is active
    #[must_use]
    pub const fn is_conversation(&self) -> bool {
        matches!(self.mode, Mode::Conversation { .. })
    }

    /// Time of the last interaction, if in a conversation
    #[must_use]
    pub const fn last_interaction(&self) -> Option<Instant> {
        match self.mode {
            Mode::WakeWaiting => None,
            Mode::Conversation { last_interaction } => Some(last_interaction),
        }
    }

    /// Enter conversation mode after the wake word was heard
    pub fn wake(&mut self, now: Instant) {
        tracing::info!(from = self.mode.label(), "entering conversation mode");
        self.mode = Mode::Conversation {
            last_interaction: now,
        };
    }

    /// Record a completed command, restarting the inactivity window
    ///
    /// Has no effect while waiting for the wake word
    pub fn record_interaction(&mut self, now: Instant) {
        if let Mode::Conversation { last_interaction } = &mut self.mode {
            *last_interaction = now;
        }
    }

    /// Whether the conversation has been idle for longer than the timeout
    #[must_use]
    pub fn is_idle(&self, now: Instant) -> bool {
        self.last_interaction()
            .is_some_and(|last| now.saturating_duration_since(last) > self.timeout)
    }

    /// Return to wake word mode if the conversation has gone idle
    ///
    /// Returns true if the session transitioned
    pub fn expire_if_idle(&mut self, now: Instant) -> bool {
        if !self.is_idle(now) {
            return false;
        }

        tracing::info!(
            timeout_secs = self.timeout.as_secs(),
            "no input in conversation mode, returning to wake word mode"
        );
        self.mode = Mode::WakeWaiting;
        true
    }
}
