//! The listen/respond loop
//!
//! Each cycle captures one phrase, transcribes it and then either checks it
//! for the wake word or hands it to the responder, depending on the session
//! mode. Failures inside a cycle are classified and recovered from here; only
//! failing to acquire the microphone ends the loop with an error.

use std::time::Duration;

use tokio::time::Instant;

use crate::agent::Responder;
use crate::config::{AssistantConfig, CaptureConfig};
use crate::session::{Mode, Session};
use crate::shutdown::Shutdown;
use crate::voice::{AudioSample, InputDevice, SpeechCapture, Speaker, Transcriber, WakeWord};
use crate::{Error, Result};

/// Default listen timeout per capture
pub const LISTEN_TIMEOUT: Duration = Duration::from_secs(10);

/// Default pause after an unexpected cycle error
pub const ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// One recognized phrase
#[derive(Debug)]
pub struct Utterance {
    /// Captured audio
    pub audio: AudioSample,
    /// Transcript
    pub text: String,
}

/// Voice assistant driving capture, transcription, response and speech
pub struct Assistant {
    transcriber: Box<dyn Transcriber>,
    responder: Box<dyn Responder>,
    speaker: Box<dyn Speaker>,
    wake_word: WakeWord,
    session: Session,
    name: String,
    acknowledgment: String,
    listen_timeout: Duration,
    error_backoff: Duration,
}

impl Assistant {
    /// Create an assistant with default settings
    #[must_use]
    pub fn new(
        transcriber: Box<dyn Transcriber>,
        responder: Box<dyn Responder>,
        speaker: Box<dyn Speaker>,
    ) -> Self {
        Self {
            transcriber,
            responder,
            speaker,
            wake_word: WakeWord::new("jarvis"),
            session: Session::default(),
            name: "Jarvis".to_string(),
            acknowledgment: "Yes sir?".to_string(),
            listen_timeout: LISTEN_TIMEOUT,
            error_backoff: ERROR_BACKOFF,
        }
    }

    /// Apply assistant and capture settings
    #[must_use]
    pub fn with_config(mut self, assistant: &AssistantConfig, capture: &CaptureConfig) -> Self {
        self.wake_word = WakeWord::with_mode(&assistant.wake_word, assistant.wake_word_mode);
        self.session = Session::new(assistant.conversation_timeout);
        self.name.clone_from(&assistant.name);
        self.acknowledgment.clone_from(&assistant.acknowledgment);
        self.error_backoff = assistant.error_backoff;
        self.listen_timeout = capture.listen_timeout;
        self
    }

    /// Set how long the conversation stays open without input
    #[must_use]
    pub const fn with_conversation_timeout(mut self, timeout: Duration) -> Self {
        self.session = Session::new(timeout);
        self
    }

    /// Set the pause after an unexpected cycle error
    #[must_use]
    pub const fn with_error_backoff(mut self, backoff: Duration) -> Self {
        self.error_backoff = backoff;
        self
    }

    /// Current session state
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Run until shutdown is requested
    ///
    /// The input device is opened once and released before returning, on
    /// every path. Completion is logged whether or not the run failed.
    ///
    /// # Errors
    ///
    /// Returns error if the input device cannot be opened or calibrated
    #[allow(clippy::future_not_send)]
    pub async fn run(&mut self, device: &dyn InputDevice, shutdown: &Shutdown) -> Result<()> {
        let result = self.serve(device, shutdown).await;
        tracing::info!(name = %self.name, "shutdown complete");
        result
    }

    #[allow(clippy::future_not_send)]
    async fn serve(&mut self, device: &dyn InputDevice, shutdown: &Shutdown) -> Result<()> {
        let mut capture = device.open().inspect_err(|e| {
            tracing::error!(severity = "critical", error = %e, "failed to open microphone");
        })?;

        if let Err(e) = capture.calibrate().await {
            tracing::error!(severity = "critical", error = %e, "microphone calibration failed");
            drop(capture);
            tracing::info!("cleaning up resources");
            return Err(e);
        }

        tracing::info!(wake_word = self.wake_word.phrase(), "listening for wake word");

        while !shutdown.is_requested() {
            self.cycle(capture.as_mut()).await;
        }

        tracing::info!("shutdown requested");
        drop(capture);
        tracing::info!("cleaning up resources");
        Ok(())
    }

    /// Run one capture cycle and recover from any failure in it
    #[allow(clippy::future_not_send)]
    pub async fn cycle(&mut self, capture: &mut dyn SpeechCapture) {
        if let Err(e) = self.try_cycle(capture).await {
            self.recover(e).await;
        }
    }

    #[allow(clippy::future_not_send)]
    async fn try_cycle(&mut self, capture: &mut dyn SpeechCapture) -> Result<()> {
        match self.session.mode() {
            Mode::WakeWaiting => tracing::debug!("waiting for wake word"),
            Mode::Conversation { .. } => tracing::debug!("listening for command"),
        }

        let audio = capture.listen(self.listen_timeout).await?;
        let text = self.transcriber.transcribe(&audio).await?;
        let utterance = Utterance { audio, text };

        tracing::info!(
            transcript = %utterance.text,
            secs = utterance.audio.duration().as_secs_f32(),
            "heard"
        );

        if self.session.is_conversation() {
            self.dispatch(&utterance.text).await;
        } else {
            self.check_wake_word(&utterance.text).await;
        }

        Ok(())
    }

    #[allow(clippy::future_not_send)]
    async fn check_wake_word(&mut self, text: &str) {
        if !self.wake_word.is_triggered(text) {
            tracing::debug!(transcript = %text, "no wake word");
            return;
        }

        tracing::info!(wake_word = self.wake_word.phrase(), "wake word detected");
        self.speaker.speak(&self.acknowledgment).await;
        self.session.wake(Instant::now());
    }

    #[allow(clippy::future_not_send)]
    async fn dispatch(&mut self, command: &str) {
        tracing::info!(command, "command received");

        match self.responder.respond(command).await {
            Ok(reply) => {
                tracing::info!(response_len = reply.len(), "agent replied");
                println!("{}: {reply}", self.name);
                self.speaker.speak(&reply).await;
                self.session.record_interaction(Instant::now());
            }
            Err(e) => {
                tracing::error!(error = %e, "agent failed to respond");
            }
        }
    }

    #[allow(clippy::future_not_send)]
    async fn recover(&mut self, error: Error) {
        if !error.is_quiet() {
            tracing::error!(error = %error, "voice cycle failed");
            tokio::time::sleep(self.error_backoff).await;
            return;
        }

        // Only silence counts toward the inactivity timeout
        if matches!(error, Error::CaptureTimeout) {
            tracing::warn!(mode = self.session.mode().label(), "no speech detected");
            self.session.expire_if_idle(Instant::now());
        } else {
            tracing::warn!("could not understand audio");
        }
    }
}

impl std::fmt::Debug for Assistant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assistant")
            .field("wake_word", &self.wake_word)
            .field("session", &self.session)
            .field("name", &self.name)
            .field("listen_timeout", &self.listen_timeout)
            .finish_non_exhaustive()
    }
}
