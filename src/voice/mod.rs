//! Voice processing module
//!
//! Handles audio capture, phrase endpointing, wake word matching, STT, TTS and
//! playback.

mod capture;
mod endpoint;
mod playback;
mod speaker;
mod stt;
mod tts;
mod wake_word;

pub use capture::{
    AudioCapture, AudioSample, InputDevice, Microphone, MicrophoneDevice, SAMPLE_RATE,
    SpeechCapture, input_device_names, samples_to_wav,
};
pub use endpoint::{DEFAULT_ENERGY_THRESHOLD, EndpointState, UtteranceDetector, calculate_energy};
pub use playback::{AudioPlayback, PLAYBACK_SAMPLE_RATE, decode_mp3};
pub use speaker::{Speaker, VoiceSpeaker};
pub use stt::{SpeechToText, SttProvider, Transcriber};
pub use tts::{TextToSpeech, TtsProvider};
pub use wake_word::{MatchMode, WakeWord};
