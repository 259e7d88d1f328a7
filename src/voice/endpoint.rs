//! Energy-based utterance endpointing
//!
//! Splits a live sample stream into phrases: speech starts when frame energy
//! rises above the threshold and ends after a run of silence.

use super::SAMPLE_RATE;

/// Default minimum audio energy to consider speech
pub const DEFAULT_ENERGY_THRESHOLD: f32 = 0.03;

/// Minimum speech length to count as a phrase (0.3 seconds)
const MIN_SPEECH_SAMPLES: usize = SAMPLE_RATE as usize * 3 / 10;

/// Silence that ends a phrase (0.8 seconds)
const PAUSE_SAMPLES: usize = SAMPLE_RATE as usize * 8 / 10;

/// Where the detector is within the current phrase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointState {
    /// No speech yet
    Idle,
    /// Speech started, accumulating
    Speaking,
    /// Phrase finished (pause or length limit)
    Complete,
}

/// Tracks speech start and end over streamed audio
#[derive(Debug)]
pub struct UtteranceDetector {
    threshold: f32,
    max_samples: usize,
    state: EndpointState,
    buffer: Vec<f32>,
    silence_counter: usize,
}

impl UtteranceDetector {
    /// Create a detector with the given energy threshold and phrase length cap
    #[must_use]
    pub const fn new(threshold: f32, max_samples: usize) -> Self {
        Self {
            threshold,
            max_samples,
            state: EndpointState::Idle,
            buffer: Vec::new(),
            silence_counter: 0,
        }
    }

    /// Feed a chunk of samples and return the updated state
    pub fn process(&mut self, samples: &[f32]) -> EndpointState {
        let energy = calculate_energy(samples);
        let is_speech = energy > self.threshold;

        match self.state {
            EndpointState::Idle => {
                if is_speech {
                    self.state = EndpointState::Speaking;
                    self.buffer.clear();
                    self.buffer.extend_from_slice(samples);
                    self.silence_counter = 0;
                    tracing::trace!(energy, "speech started");
                }
            }
            EndpointState::Speaking => {
                self.buffer.extend_from_slice(samples);

                if is_speech {
                    self.silence_counter = 0;
                } else {
                    self.silence_counter += samples.len();
                }

                let speech_len = self.buffer.len().saturating_sub(self.silence_counter);

                if self.silence_counter > PAUSE_SAMPLES {
                    if speech_len > MIN_SPEECH_SAMPLES {
                        tracing::debug!(samples = self.buffer.len(), "phrase complete");
                        self.state = EndpointState::Complete;
                    } else {
                        // Too short to be speech, likely a click or bump
                        tracing::trace!(speech_len, "discarding short noise burst");
                        self.reset();
                    }
                } else if self.buffer.len() >= self.max_samples {
                    tracing::debug!(samples = self.buffer.len(), "phrase length limit reached");
                    self.state = EndpointState::Complete;
                }
            }
            EndpointState::Complete => {}
        }

        self.state
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> EndpointState {
        self.state
    }

    /// Whether speech has started
    #[must_use]
    pub fn has_speech(&self) -> bool {
        self.state != EndpointState::Idle
    }

    /// Energy threshold in use
    #[must_use]
    pub const fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Take the phrase buffer and reset to idle
    pub fn take_phrase(&mut self) -> Vec<f32> {
        let phrase = std::mem::take(&mut self.buffer);
        self.reset();
        phrase
    }

    /// Reset to idle, discarding any buffered audio
    pub fn reset(&mut self) {
        self.state = EndpointState::Idle;
        self.buffer.clear();
        self.silence_counter = 0;
    }
}

/// Calculate RMS energy of audio samples
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn calculate_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}
