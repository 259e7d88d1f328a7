//! Audio capture from microphone

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, Stream, StreamConfig};
use tokio::time::Instant;

use super::endpoint::{
    DEFAULT_ENERGY_THRESHOLD, EndpointState, UtteranceDetector, calculate_energy,
};
use crate::{Error, Result};

/// Sample rate for audio capture (16kHz for speech)
pub const SAMPLE_RATE: u32 = 16000;

/// Audio processing chunk size (100ms at 16kHz)
const CHUNK_SIZE: usize = 1600;

/// How often the capture buffer is drained while listening
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Ambient sampling window used for calibration
const CALIBRATION_WINDOW: Duration = Duration::from_secs(1);

/// Threshold multiplier over the ambient noise floor
const NOISE_FLOOR_MARGIN: f32 = 1.5;

/// Listen deadline used when the requested timeout does not fit in an `Instant`
const MAX_LISTEN_WAIT: Duration = Duration::from_secs(86_400 * 365);

/// A bounded recording of one spoken phrase
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSample {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl AudioSample {
    /// Wrap mono f32 samples
    #[must_use]
    pub const fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Raw samples
    #[must_use]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Sample rate in Hz
    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Length of the recording
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / f64::from(self.sample_rate))
    }

    /// Encode as 16-bit PCM WAV
    ///
    /// # Errors
    ///
    /// Returns error if WAV encoding fails
    pub fn to_wav(&self) -> Result<Vec<u8>> {
        samples_to_wav(&self.samples, self.sample_rate)
    }
}

/// Source of spoken phrases
///
/// Implementations hold an open input stream; dropping the value releases it
#[async_trait(?Send)]
pub trait SpeechCapture {
    /// Adjust to the ambient noise level before the first listen
    ///
    /// # Errors
    ///
    /// Returns error if the input stream cannot be sampled
    async fn calibrate(&mut self) -> Result<()> {
        Ok(())
    }

    /// Wait for one phrase
    ///
    /// # Errors
    ///
    /// Returns `Error::CaptureTimeout` if no speech starts within `timeout`
    async fn listen(&mut self, timeout: Duration) -> Result<AudioSample>;
}

/// An input device that can be opened for the lifetime of the assistant loop
pub trait InputDevice {
    /// Acquire the device
    ///
    /// # Errors
    ///
    /// Returns error if the device cannot be opened
    fn open(&self) -> Result<Box<dyn SpeechCapture>>;
}

/// Captures audio from an input device
pub struct AudioCapture {
    device: Device,
    config: StreamConfig,
    buffer: Arc<Mutex<Vec<f32>>>,
    stream: Option<Stream>,
}

impl AudioCapture {
    /// Create a capture on the default input device
    ///
    /// # Errors
    ///
    /// Returns error if audio device cannot be opened
    pub fn new() -> Result<Self> {
        Self::with_device_index(None)
    }

    /// Create a capture on the input device at `index`, or the default device
    ///
    /// # Errors
    ///
    /// Returns error if audio device cannot be opened
    pub fn with_device_index(index: Option<usize>) -> Result<Self> {
        let host = cpal::default_host();

        let device = match index {
            Some(index) => host
                .input_devices()
                .map_err(|e| Error::Audio(e.to_string()))?
                .nth(index)
                .ok_or_else(|| Error::Audio(format!("no input device at index {index}")))?,
            None => host
                .default_input_device()
                .ok_or_else(|| Error::Audio("no input device available".to_string()))?,
        };

        let supported_config = device
            .supported_input_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(SAMPLE_RATE)
            })
            .ok_or_else(|| Error::Audio("no suitable audio config found".to_string()))?;

        let config = supported_config
            .with_sample_rate(SampleRate(SAMPLE_RATE))
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = SAMPLE_RATE,
            channels = config.channels,
            "audio capture initialized"
        );

        Ok(Self {
            device,
            config,
            buffer: Arc::new(Mutex::new(Vec::new())),
            stream: None,
        })
    }

    /// Start capturing audio
    ///
    /// # Errors
    ///
    /// Returns error if capture fails
    pub fn start(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let buffer = Arc::clone(&self.buffer);

        let stream = self
            .device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buf) = buffer.lock() {
                        buf.extend_from_slice(data);
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio capture error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;
        self.stream = Some(stream);

        tracing::debug!("audio capture started");
        Ok(())
    }

    /// Stop capturing audio
    pub fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            tracing::debug!("audio capture stopped");
        }
    }

    /// Get captured audio buffer and clear it
    #[must_use]
    pub fn take_buffer(&self) -> Vec<f32> {
        self.buffer
            .lock()
            .map(|mut buf| std::mem::take(&mut *buf))
            .unwrap_or_default()
    }

    /// Clear the audio buffer
    pub fn clear_buffer(&self) {
        if let Ok(mut buf) = self.buffer.lock() {
            buf.clear();
        }
    }

    /// Check if currently capturing
    #[must_use]
    pub const fn is_capturing(&self) -> bool {
        self.stream.is_some()
    }

    /// Get the sample rate
    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }
}

/// Microphone opened for phrase capture
///
/// Stops the input stream when dropped
pub struct Microphone {
    capture: AudioCapture,
    detector: UtteranceDetector,
    max_samples: usize,
}

impl Microphone {
    /// Open and start the input device
    ///
    /// # Errors
    ///
    /// Returns error if the device cannot be opened or started
    pub fn open(index: Option<usize>, phrase_time_limit: Duration) -> Result<Self> {
        let mut capture = AudioCapture::with_device_index(index)?;
        capture.start()?;

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let max_samples = (phrase_time_limit.as_secs_f64() * f64::from(SAMPLE_RATE)) as usize;

        tracing::info!(device_index = ?index, "microphone acquired");

        Ok(Self {
            capture,
            detector: UtteranceDetector::new(DEFAULT_ENERGY_THRESHOLD, max_samples),
            max_samples,
        })
    }

    /// Energy threshold currently used to detect speech
    #[must_use]
    pub const fn energy_threshold(&self) -> f32 {
        self.detector.threshold()
    }
}

impl Drop for Microphone {
    fn drop(&mut self) {
        self.capture.stop();
        tracing::info!("microphone released");
    }
}

#[async_trait(?Send)]
impl SpeechCapture for Microphone {
    async fn calibrate(&mut self) -> Result<()> {
        if !self.capture.is_capturing() {
            return Err(Error::Audio("microphone is not capturing".to_string()));
        }

        self.capture.clear_buffer();
        tokio::time::sleep(CALIBRATION_WINDOW).await;
        let ambient = calculate_energy(&self.capture.take_buffer());

        let threshold = (ambient * NOISE_FLOOR_MARGIN).max(DEFAULT_ENERGY_THRESHOLD);
        self.detector = UtteranceDetector::new(threshold, self.max_samples);

        tracing::info!(ambient, threshold, "calibrated for ambient noise");
        Ok(())
    }

    async fn listen(&mut self, timeout: Duration) -> Result<AudioSample> {
        self.capture.clear_buffer();
        self.detector.reset();

        let deadline = listen_deadline(Instant::now(), timeout);

        loop {
            tokio::time::sleep(POLL_INTERVAL).await;

            let samples = self.capture.take_buffer();
            for chunk in samples.chunks(CHUNK_SIZE) {
                if self.detector.process(chunk) == EndpointState::Complete {
                    break;
                }
            }

            if self.detector.state() == EndpointState::Complete {
                let phrase = self.detector.take_phrase();
                tracing::debug!(samples = phrase.len(), "captured phrase");
                return Ok(AudioSample::new(phrase, SAMPLE_RATE));
            }

            if !self.detector.has_speech() && Instant::now() >= deadline {
                return Err(Error::CaptureTimeout);
            }
        }
    }
}

/// When a listen with `timeout` gives up; saturates instead of overflowing
fn listen_deadline(start: Instant, timeout: Duration) -> Instant {
    start
        .checked_add(timeout)
        .or_else(|| start.checked_add(MAX_LISTEN_WAIT))
        .unwrap_or(start)
}

/// Opens the configured microphone
#[derive(Debug, Clone)]
pub struct MicrophoneDevice {
    index: Option<usize>,
    phrase_time_limit: Duration,
}

impl MicrophoneDevice {
    /// Describe the input device to open
    #[must_use]
    pub const fn new(index: Option<usize>, phrase_time_limit: Duration) -> Self {
        Self {
            index,
            phrase_time_limit,
        }
    }
}

impl InputDevice for MicrophoneDevice {
    fn open(&self) -> Result<Box<dyn SpeechCapture>> {
        Ok(Box::new(Microphone::open(
            self.index,
            self.phrase_time_limit,
        )?))
    }
}

/// List input device names in index order
///
/// # Errors
///
/// Returns error if devices cannot be enumerated
pub fn input_device_names() -> Result<Vec<String>> {
    let host = cpal::default_host();
    let devices = host
        .input_devices()
        .map_err(|e| Error::Audio(e.to_string()))?;

    Ok(devices
        .map(|d| d.name().unwrap_or_else(|_| "<unknown>".to_string()))
        .collect())
}

/// Convert f32 samples to WAV bytes for STT APIs
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Audio(e.to_string()))?;

        for &sample in samples {
            // Convert f32 [-1.0, 1.0] to i16
            #[allow(clippy::cast_possible_truncation)]
            let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer
                .write_sample(sample_i16)
                .map_err(|e| Error::Audio(e.to_string()))?;
        }

        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}
