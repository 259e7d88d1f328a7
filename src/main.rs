use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use secrecy::{ExposeSecret, SecretString};
use tracing_subscriber::EnvFilter;

use jarvis::agent::{OllamaAgent, Responder};
use jarvis::tools::ToolRegistry;
use jarvis::voice::{
    AudioCapture, AudioPlayback, MicrophoneDevice, SpeechToText, SttProvider, TextToSpeech,
    TtsProvider, VoiceSpeaker, calculate_energy, input_device_names,
};
use jarvis::{Assistant, Config, Shutdown};

/// Jarvis - wake-word voice assistant backed by a local language model
#[derive(Parser)]
#[command(name = "jarvis", version, about)]
struct Cli {
    /// Config file (defaults to jarvis.toml in the user config directory)
    #[arg(short, long, env = "JARVIS_CONFIG")]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
    /// Test TTS output
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the text to speech system.")]
        text: String,
    },
    /// Send one command to the agent and print the reply
    Ask {
        /// Command text
        text: String,
    },
    /// List audio input devices
    ListDevices,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info",
        1 => "info,jarvis=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    let load_config = || {
        let config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
        tracing::debug!(?config, "loaded configuration");
        anyhow::Ok(config)
    };

    match cli.command {
        Some(Command::TestMic { duration }) => return test_mic(duration).await,
        Some(Command::TestSpeaker) => return test_speaker().await,
        Some(Command::ListDevices) => return list_devices(),
        Some(Command::TestTts { text }) => return test_tts(&load_config()?, &text).await,
        Some(Command::Ask { text }) => return ask(&load_config()?, &text).await,
        None => {}
    }

    let config = load_config()?;

    let transcriber = build_stt(&config)?;
    let speaker = VoiceSpeaker::new(build_tts(&config)?, AudioPlayback::new()?, config.tts.pause);
    let agent = build_agent(&config)?;

    let shutdown = Shutdown::new();
    let _signals = shutdown.listen_for_signals()?;

    let mut assistant = Assistant::new(Box::new(transcriber), Box::new(agent), Box::new(speaker))
        .with_config(&config.assistant, &config.capture);
    let microphone =
        MicrophoneDevice::new(config.capture.mic_index, config.capture.phrase_time_limit);

    tracing::info!(
        wake_word = %config.assistant.wake_word,
        model = %config.agent.model,
        "jarvis ready"
    );

    assistant.run(&microphone, &shutdown).await?;
    Ok(())
}

fn require_key(key: Option<&SecretString>, name: &str) -> anyhow::Result<SecretString> {
    key.map(|k| SecretString::from(k.expose_secret().to_owned()))
        .with_context(|| format!("{name} is not set"))
}

fn build_stt(config: &Config) -> anyhow::Result<SpeechToText> {
    let key = match config.stt.provider {
        SttProvider::Whisper => require_key(config.api_keys.openai.as_ref(), "OPENAI_API_KEY")?,
        SttProvider::Deepgram => {
            require_key(config.api_keys.deepgram.as_ref(), "DEEPGRAM_API_KEY")?
        }
    };

    let stt = SpeechToText::new(config.stt.provider, key, config.stt.model.clone())?;
    Ok(match &config.stt.base_url {
        Some(url) => stt.with_base_url(url),
        None => stt,
    })
}

fn build_tts(config: &Config) -> anyhow::Result<TextToSpeech> {
    let tts = match config.tts.provider {
        TtsProvider::OpenAI => TextToSpeech::new_openai_with_model(
            require_key(config.api_keys.openai.as_ref(), "OPENAI_API_KEY")?,
            config.tts.voice.clone(),
            config.tts.speed,
            config.tts.model.clone(),
        )?,
        TtsProvider::ElevenLabs => TextToSpeech::new_elevenlabs_with_model(
            require_key(config.api_keys.elevenlabs.as_ref(), "ELEVENLABS_API_KEY")?,
            config.tts.voice.clone(),
            config.tts.model.clone(),
        )?,
    };

    Ok(match &config.tts.base_url {
        Some(url) => tts.with_base_url(url),
        None => tts,
    })
}

fn build_agent(config: &Config) -> anyhow::Result<OllamaAgent> {
    let agent = OllamaAgent::new(
        &config.agent.url,
        &config.agent.model,
        &config.agent.system_prompt,
        ToolRegistry::with_defaults(),
    )?
    .with_think(config.agent.think)
    .with_max_iterations(config.agent.max_iterations);
    Ok(agent)
}

/// Send one command to the agent
async fn ask(config: &Config, text: &str) -> anyhow::Result<()> {
    let agent = build_agent(config)?;
    let reply = agent.respond(text).await?;
    println!("{}: {reply}", config.assistant.name);
    Ok(())
}

/// List input devices with their indices
fn list_devices() -> anyhow::Result<()> {
    let names = input_device_names()?;
    if names.is_empty() {
        println!("No input devices found");
    }
    for (index, name) in names.iter().enumerate() {
        println!("[{index}] {name}");
    }
    println!("\nSet JARVIS_MIC_INDEX to pick a device");
    Ok(())
}

/// Test microphone input
#[allow(clippy::future_not_send)]
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut capture = AudioCapture::new()?;
    capture.start()?;

    println!("Sample rate: {} Hz", capture.sample_rate());
    println!("---");

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = capture.take_buffer();
        let energy = calculate_energy(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter = "#".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!("[{:2}s] RMS: {energy:.4} | Peak: {peak:.4} | [{meter}]", i + 1);
    }

    capture.stop();

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working!");
    println!("If RMS stayed near 0, check:");
    println!("  1. Is your mic plugged in?");
    println!("  2. Run: jarvis list-devices");
    println!("  3. Try another device with JARVIS_MIC_INDEX");

    Ok(())
}

/// Test speaker output with a sine wave
async fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let playback = AudioPlayback::new()?;

    let sample_rate = jarvis::voice::PLAYBACK_SAMPLE_RATE;
    let frequency = 440.0_f32;
    let num_samples = sample_rate as usize * 2;

    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3
        })
        .collect();

    println!("Playing {} samples at {sample_rate} Hz...", samples.len());
    playback.play(samples).await?;

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");

    Ok(())
}

/// Test the configured TTS provider
async fn test_tts(config: &Config, text: &str) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\"\n");

    let tts = build_tts(config)?;

    println!("Synthesizing speech...");
    let mp3_data = tts.synthesize(text).await?;
    println!("Got {} bytes of audio data", mp3_data.len());

    println!("Playing audio...");
    AudioPlayback::new()?.play_mp3(&mp3_data).await?;

    println!("\n---");
    println!("If you heard the speech, TTS is working!");

    Ok(())
}
