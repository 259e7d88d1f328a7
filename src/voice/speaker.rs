//! Spoken output
//!
//! Speaking never fails from the caller's point of view: synthesis and playback
//! errors are logged and dropped here.

use std::time::Duration;

use async_trait::async_trait;

use super::{AudioPlayback, TextToSpeech};

/// Says text out loud
#[async_trait(?Send)]
pub trait Speaker {
    /// Speak `text`, swallowing any failure
    async fn speak(&mut self, text: &str);
}

/// Speaker backed by a TTS service and the default output device
pub struct VoiceSpeaker {
    tts: TextToSpeech,
    playback: AudioPlayback,
    pause: Duration,
}

impl VoiceSpeaker {
    /// Combine synthesis and playback
    ///
    /// `pause` is slept after each utterance so the microphone does not pick up
    /// the tail of our own output
    #[must_use]
    pub const fn new(tts: TextToSpeech, playback: AudioPlayback, pause: Duration) -> Self {
        Self {
            tts,
            playback,
            pause,
        }
    }

    async fn try_speak(&self, text: &str) -> crate::Result<()> {
        let audio = self.tts.synthesize(text).await?;
        self.playback.play_mp3(&audio).await
    }
}

#[async_trait(?Send)]
impl Speaker for VoiceSpeaker {
    async fn speak(&mut self, text: &str) {
        if text.trim().is_empty() {
            return;
        }

        tracing::debug!(text, "speaking");

        if let Err(e) = self.try_speak(text).await {
            tracing::error!(error = %e, "TTS failed");
            return;
        }

        tokio::time::sleep(self.pause).await;
    }
}
