//! Shared test utilities
//!
//! Scripted stand-ins for the microphone, transcriber, agent and speaker so
//! the assistant loop can run without audio hardware or network access.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use jarvis::voice::{AudioSample, InputDevice, SAMPLE_RATE, SpeechCapture, Speaker, Transcriber};
use jarvis::{Error, Responder, Result, Shutdown};
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt::MakeWriter;

/// One scripted capture outcome
#[derive(Debug, Clone)]
pub enum Step {
    /// A phrase that transcribes to the given text
    Say(&'static str),
    /// A phrase the transcriber cannot make out
    Mumble,
    /// A phrase whose transcription fails with a service error
    SttDown,
    /// No speech for the given time, then a capture timeout
    Silence(Duration),
    /// A phrase during which a shutdown signal arrives
    SayThenSignal(&'static str),
}

/// What the fake transcriber should report for the next phrase
#[derive(Debug)]
enum Heard {
    Text(String),
    Noise,
    Outage,
}

/// Text channel from the fake microphone to the fake transcriber
#[derive(Debug, Clone, Default)]
pub struct Ear(Arc<Mutex<VecDeque<Heard>>>);

/// Input device that replays a script
pub struct ScriptedDevice {
    steps: Mutex<Option<VecDeque<Step>>>,
    ear: Ear,
    shutdown: Option<Arc<Shutdown>>,
    calibration_fails: bool,
    opened: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
}

impl ScriptedDevice {
    pub fn new(steps: Vec<Step>, ear: &Ear) -> Self {
        Self {
            steps: Mutex::new(Some(steps.into())),
            ear: ear.clone(),
            shutdown: None,
            calibration_fails: false,
            opened: Arc::default(),
            released: Arc::default(),
        }
    }

    /// Request shutdown when the script runs out (and on `SayThenSignal`)
    pub fn with_shutdown(mut self, shutdown: &Arc<Shutdown>) -> Self {
        self.shutdown = Some(Arc::clone(shutdown));
        self
    }

    /// Open successfully, then fail to calibrate
    pub fn with_failing_calibration(mut self) -> Self {
        self.calibration_fails = true;
        self
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

impl InputDevice for ScriptedDevice {
    fn open(&self) -> Result<Box<dyn SpeechCapture>> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        let steps = self
            .steps
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| Error::Audio("device already open".to_string()))?;

        Ok(Box::new(ScriptedCapture {
            steps,
            ear: self.ear.clone(),
            shutdown: self.shutdown.clone(),
            calibration_fails: self.calibration_fails,
            released: Arc::clone(&self.released),
        }))
    }
}

/// Open capture handle replaying a script
pub struct ScriptedCapture {
    steps: VecDeque<Step>,
    ear: Ear,
    shutdown: Option<Arc<Shutdown>>,
    calibration_fails: bool,
    released: Arc<AtomicUsize>,
}

impl ScriptedCapture {
    fn phrase(&self, heard: Heard) -> AudioSample {
        self.ear.0.lock().unwrap().push_back(heard);
        AudioSample::new(vec![0.1; SAMPLE_RATE as usize / 2], SAMPLE_RATE)
    }
}

#[async_trait(?Send)]
impl SpeechCapture for ScriptedCapture {
    async fn calibrate(&mut self) -> Result<()> {
        if self.calibration_fails {
            return Err(Error::Audio("input stream stopped".to_string()));
        }
        Ok(())
    }

    async fn listen(&mut self, _timeout: Duration) -> Result<AudioSample> {
        match self.steps.pop_front() {
            Some(Step::Say(text)) => Ok(self.phrase(Heard::Text(text.to_string()))),
            Some(Step::Mumble) => Ok(self.phrase(Heard::Noise)),
            Some(Step::SttDown) => Ok(self.phrase(Heard::Outage)),
            Some(Step::Silence(duration)) => {
                tokio::time::sleep(duration).await;
                Err(Error::CaptureTimeout)
            }
            Some(Step::SayThenSignal(text)) => {
                if let Some(shutdown) = &self.shutdown {
                    shutdown.request();
                }
                Ok(self.phrase(Heard::Text(text.to_string())))
            }
            None => {
                if let Some(shutdown) = &self.shutdown {
                    shutdown.request();
                }
                Err(Error::CaptureTimeout)
            }
        }
    }
}

impl Drop for ScriptedCapture {
    fn drop(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Transcriber that reports whatever the scripted microphone "heard"
pub struct FakeTranscriber {
    ear: Ear,
}

impl FakeTranscriber {
    pub fn new(ear: &Ear) -> Self {
        Self { ear: ear.clone() }
    }
}

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, _audio: &AudioSample) -> Result<String> {
        match self.ear.0.lock().unwrap().pop_front() {
            Some(Heard::Text(text)) => Ok(text),
            Some(Heard::Noise) | None => Err(Error::Unrecognized),
            Some(Heard::Outage) => Err(Error::Stt("service unavailable".to_string())),
        }
    }
}

/// Responder that answers with a fixed reply, or always fails
#[derive(Clone)]
pub struct FakeResponder {
    reply: Option<String>,
    commands: Arc<Mutex<Vec<String>>>,
}

impl FakeResponder {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            commands: Arc::default(),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            commands: Arc::default(),
        }
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }
}

#[async_trait]
impl Responder for FakeResponder {
    async fn respond(&self, command: &str) -> Result<String> {
        self.commands.lock().unwrap().push(command.to_string());
        self.reply
            .clone()
            .ok_or_else(|| Error::Agent("model unavailable".to_string()))
    }
}

/// Speaker that records what it was asked to say
#[derive(Clone, Default)]
pub struct RecordingSpeaker {
    spoken: Arc<Mutex<Vec<String>>>,
}

impl RecordingSpeaker {
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

#[async_trait(?Send)]
impl Speaker for RecordingSpeaker {
    async fn speak(&mut self, text: &str) {
        self.spoken.lock().unwrap().push(text.to_string());
    }
}

/// Failing input device
pub struct BrokenDevice;

impl InputDevice for BrokenDevice {
    fn open(&self) -> Result<Box<dyn SpeechCapture>> {
        Err(Error::Audio("no input device available".to_string()))
    }
}

/// Log lines written by the assistant while a guard is held
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    /// Route this thread's tracing output into the buffer
    pub fn install(&self) -> DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
