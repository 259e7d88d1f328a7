//! Configuration management for Jarvis
//!
//! Values come from built-in defaults, then an optional `jarvis.toml`, then
//! environment variables.

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;

use crate::agent::{DEFAULT_OLLAMA_URL, DEFAULT_SYSTEM_PROMPT};
use crate::voice::{MatchMode, SttProvider, TtsProvider};
use crate::{Error, Result};

/// Name of the config file looked up in the platform config directory
pub const CONFIG_FILE_NAME: &str = "jarvis.toml";

/// Jarvis configuration
#[derive(Debug)]
pub struct Config {
    /// Session and wake word behaviour
    pub assistant: AssistantConfig,

    /// Microphone settings
    pub capture: CaptureConfig,

    /// Speech-to-text settings
    pub stt: SttConfig,

    /// Text-to-speech settings
    pub tts: TtsConfig,

    /// Language model agent settings
    pub agent: AgentConfig,

    /// API keys
    pub api_keys: ApiKeys,
}

/// Session and wake word behaviour
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    /// Name shown in the transcript
    pub name: String,

    /// Trigger phrase
    pub wake_word: String,

    /// How the trigger phrase is matched
    pub wake_word_mode: MatchMode,

    /// Spoken when the wake word is heard
    pub acknowledgment: String,

    /// Inactivity window before leaving conversation mode
    pub conversation_timeout: Duration,

    /// Pause after an unexpected cycle error
    pub error_backoff: Duration,
}

/// Microphone settings
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Input device index (default device when unset)
    pub mic_index: Option<usize>,

    /// How long to wait for speech to start
    pub listen_timeout: Duration,

    /// Longest phrase recorded in one listen
    pub phrase_time_limit: Duration,
}

/// Speech-to-text settings
#[derive(Debug, Clone)]
pub struct SttConfig {
    /// Provider backend
    pub provider: SttProvider,

    /// Model identifier
    pub model: String,

    /// API root override
    pub base_url: Option<String>,
}

/// Text-to-speech settings
#[derive(Debug, Clone)]
pub struct TtsConfig {
    /// Provider backend
    pub provider: TtsProvider,

    /// Voice identifier
    pub voice: String,

    /// Speed multiplier (0.25 to 4.0)
    pub speed: f32,

    /// Model identifier
    pub model: String,

    /// API root override
    pub base_url: Option<String>,

    /// Silence after each spoken reply
    pub pause: Duration,
}

/// Language model agent settings
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Ollama server URL
    pub url: String,

    /// Model name
    pub model: String,

    /// Whether the model may emit reasoning
    pub think: bool,

    /// Maximum model/tool round trips per command
    pub max_iterations: u32,

    /// Fixed system instruction
    pub system_prompt: String,
}

/// API keys for external services
#[derive(Debug, Default)]
pub struct ApiKeys {
    /// `OpenAI` API key (Whisper and TTS)
    pub openai: Option<SecretString>,

    /// Deepgram API key (optional STT)
    pub deepgram: Option<SecretString>,

    /// `ElevenLabs` API key (optional TTS)
    pub elevenlabs: Option<SecretString>,
}

/// On-disk configuration; every field is optional
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub assistant_name: Option<String>,
    pub wake_word: Option<String>,
    pub wake_word_boundary: Option<bool>,
    pub acknowledgment: Option<String>,
    pub conversation_timeout_secs: Option<u64>,
    pub listen_timeout_secs: Option<u64>,
    pub phrase_time_limit_secs: Option<u64>,
    pub error_backoff_ms: Option<u64>,
    pub mic_index: Option<usize>,
    pub stt: FileStt,
    pub tts: FileTts,
    pub agent: FileAgent,
}

/// `[stt]` table
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileStt {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
}

/// `[tts]` table
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileTts {
    pub provider: Option<String>,
    pub voice: Option<String>,
    pub speed: Option<f32>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub pause_ms: Option<u64>,
}

/// `[agent]` table
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileAgent {
    pub url: Option<String>,
    pub model: Option<String>,
    pub think: Option<bool>,
    pub max_iterations: Option<u32>,
    pub system_prompt: Option<String>,
}

impl FileConfig {
    /// Read and parse a TOML config file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed
    pub fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), "loaded config file");
        Ok(config)
    }
}

/// Default location of the config file (`~/.config/jarvis/jarvis.toml` on Linux)
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "omni", "jarvis")
        .map(|d| d.config_dir().join(CONFIG_FILE_NAME))
}

impl Config {
    /// Load configuration from the given file (or the default location) and
    /// the process environment
    ///
    /// # Errors
    ///
    /// Returns error if an explicit config file is missing or any value is invalid
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => FileConfig::read(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => FileConfig::read(&path)?,
                _ => FileConfig::default(),
            },
        };

        Self::from_sources(file, |key| std::env::var(key).ok())
    }

    /// Build configuration from a parsed file and an environment lookup
    ///
    /// # Errors
    ///
    /// Returns error if any value is invalid
    #[allow(clippy::too_many_lines, clippy::needless_pass_by_value)]
    pub fn from_sources(file: FileConfig, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let boundary = parse_bool(&env, "JARVIS_WAKE_WORD_BOUNDARY")?
            .or(file.wake_word_boundary)
            .unwrap_or(false);

        let assistant = AssistantConfig {
            name: env("JARVIS_NAME")
                .or(file.assistant_name)
                .unwrap_or_else(|| "Jarvis".to_string()),
            wake_word: env("JARVIS_WAKE_WORD")
                .or(file.wake_word)
                .unwrap_or_else(|| "jarvis".to_string()),
            wake_word_mode: if boundary {
                MatchMode::WordBoundary
            } else {
                MatchMode::Substring
            },
            acknowledgment: env("JARVIS_ACKNOWLEDGMENT")
                .or(file.acknowledgment)
                .unwrap_or_else(|| "Yes sir?".to_string()),
            conversation_timeout: bounded_secs(
                "JARVIS_CONVERSATION_TIMEOUT",
                parse_var(&env, "JARVIS_CONVERSATION_TIMEOUT")?
                    .or(file.conversation_timeout_secs)
                    .unwrap_or(30),
            )?,
            error_backoff: Duration::from_millis(
                parse_var(&env, "JARVIS_ERROR_BACKOFF_MS")?
                    .or(file.error_backoff_ms)
                    .unwrap_or(1000),
            ),
        };

        if assistant.wake_word.trim().is_empty() {
            return Err(Error::Config("wake word must not be empty".to_string()));
        }

        let capture = CaptureConfig {
            mic_index: parse_var(&env, "JARVIS_MIC_INDEX")?.or(file.mic_index),
            listen_timeout: bounded_secs(
                "JARVIS_LISTEN_TIMEOUT",
                parse_var(&env, "JARVIS_LISTEN_TIMEOUT")?
                    .or(file.listen_timeout_secs)
                    .unwrap_or(10),
            )?,
            phrase_time_limit: bounded_secs(
                "JARVIS_PHRASE_TIME_LIMIT",
                parse_var(&env, "JARVIS_PHRASE_TIME_LIMIT")?
                    .or(file.phrase_time_limit_secs)
                    .unwrap_or(15),
            )?,
        };

        let stt_provider = SttProvider::parse(
            &env("JARVIS_STT_PROVIDER")
                .or(file.stt.provider)
                .unwrap_or_else(|| "whisper".to_string()),
        )?;
        let stt = SttConfig {
            provider: stt_provider,
            model: env("JARVIS_STT_MODEL")
                .or(file.stt.model)
                .unwrap_or_else(|| stt_provider.default_model().to_string()),
            base_url: env("JARVIS_STT_URL").or(file.stt.base_url),
        };

        let tts_provider = TtsProvider::parse(
            &env("JARVIS_TTS_PROVIDER")
                .or(file.tts.provider)
                .unwrap_or_else(|| "openai".to_string()),
        )?;
        let speed: f32 = parse_var(&env, "JARVIS_TTS_SPEED")?
            .or(file.tts.speed)
            .unwrap_or(1.0);
        if !(0.25..=4.0).contains(&speed) {
            return Err(Error::Config(format!(
                "TTS speed must be between 0.25 and 4.0, got {speed}"
            )));
        }
        let tts = TtsConfig {
            provider: tts_provider,
            voice: env("JARVIS_TTS_VOICE")
                .or(file.tts.voice)
                .unwrap_or_else(|| "alloy".to_string()),
            speed,
            model: env("JARVIS_TTS_MODEL")
                .or(file.tts.model)
                .unwrap_or_else(|| tts_provider.default_model().to_string()),
            base_url: env("JARVIS_TTS_URL").or(file.tts.base_url),
            pause: Duration::from_millis(
                parse_var(&env, "JARVIS_TTS_PAUSE_MS")?
                    .or(file.tts.pause_ms)
                    .unwrap_or(300),
            ),
        };

        let agent = AgentConfig {
            url: env("OLLAMA_HOST")
                .or(file.agent.url)
                .map_or_else(|| DEFAULT_OLLAMA_URL.to_string(), |url| normalize_url(&url)),
            model: env("JARVIS_MODEL")
                .or(file.agent.model)
                .unwrap_or_else(|| "qwen3:1.7b".to_string()),
            think: parse_bool(&env, "JARVIS_THINK")?
                .or(file.agent.think)
                .unwrap_or(false),
            max_iterations: parse_var(&env, "JARVIS_MAX_ITERATIONS")?
                .or(file.agent.max_iterations)
                .unwrap_or(5),
            system_prompt: env("JARVIS_SYSTEM_PROMPT")
                .or(file.agent.system_prompt)
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
        };

        let api_keys = ApiKeys {
            openai: secret(&env, "OPENAI_API_KEY"),
            deepgram: secret(&env, "DEEPGRAM_API_KEY"),
            elevenlabs: secret(&env, "ELEVENLABS_API_KEY"),
        };

        Ok(Self {
            assistant,
            capture,
            stt,
            tts,
            agent,
            api_keys,
        })
    }
}

/// Parse an optional environment value
fn parse_var<T>(env: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    env(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|e| Error::Config(format!("invalid {key}={raw:?}: {e}")))
        })
        .transpose()
}

/// Longest accepted timeout, one day
const MAX_TIMEOUT_SECS: u64 = 86_400;

/// Seconds to a `Duration`, rejecting values above `MAX_TIMEOUT_SECS`
fn bounded_secs(key: &str, secs: u64) -> Result<Duration> {
    if secs > MAX_TIMEOUT_SECS {
        return Err(Error::Config(format!(
            "{key} must be at most {MAX_TIMEOUT_SECS} seconds, got {secs}"
        )));
    }
    Ok(Duration::from_secs(secs))
}

/// Parse an optional boolean flag (`1`/`true`/`yes`, `0`/`false`/`no`)
fn parse_bool(env: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<bool>> {
    env(key)
        .map(|raw| match raw.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" => Ok(false),
            _ => Err(Error::Config(format!("invalid {key}={raw:?}: expected true or false"))),
        })
        .transpose()
}

/// Read a non-empty secret
fn secret(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<SecretString> {
    env(key)
        .filter(|v| !v.trim().is_empty())
        .map(SecretString::from)
}

/// `OLLAMA_HOST` may omit the scheme (`127.0.0.1:11434`)
fn normalize_url(url: &str) -> String {
    let url = url.trim().trim_end_matches('/');
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("http://{url}")
    }
}
