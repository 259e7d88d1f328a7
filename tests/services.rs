//! HTTP adapter integration tests
//!
//! Runs the agent, STT and TTS clients against in-process mock servers.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use jarvis::voice::{AudioSample, SAMPLE_RATE, SpeechToText, SttProvider, TextToSpeech, Transcriber};
use jarvis::{Error, OllamaAgent, Responder, ToolRegistry};

/// Serve `app` on an ephemeral port and return its base URL
async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn key() -> SecretString {
    SecretString::from("test-key".to_string())
}

fn phrase() -> AudioSample {
    AudioSample::new(vec![0.2; SAMPLE_RATE as usize / 4], SAMPLE_RATE)
}

#[derive(Clone, Default)]
struct Calls(Arc<AtomicUsize>);

async fn ollama_with_tool_round(State(calls): State<Calls>, Json(body): Json<Value>) -> Json<Value> {
    let n = calls.0.fetch_add(1, Ordering::SeqCst);
    assert_eq!(body["stream"], false);
    assert_eq!(body["think"], false);
    assert_eq!(body["tools"][0]["function"]["name"], "get_time");

    if n == 0 {
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "what time is it");
        return Json(json!({
            "model": "qwen3:1.7b",
            "message": {
                "role": "assistant",
                "content": "",
                "tool_calls": [{"function": {"name": "get_time", "arguments": {}}}]
            },
            "done": true
        }));
    }

    let tool_reply = &body["messages"][3];
    assert_eq!(tool_reply["role"], "tool");
    assert_eq!(tool_reply["tool_name"], "get_time");
    assert!(!tool_reply["content"].as_str().unwrap().starts_with("Error"));

    Json(json!({
        "model": "qwen3:1.7b",
        "message": {
            "role": "assistant",
            "content": "<think>\nthe tool said so\n</think>\n\nIt is just past two, sir."
        },
        "done": true
    }))
}

#[tokio::test]
async fn test_agent_runs_tool_then_answers() {
    let calls = Calls::default();
    let app = Router::new()
        .route("/api/chat", post(ollama_with_tool_round))
        .with_state(calls.clone());
    let url = serve(app).await;

    let agent = OllamaAgent::new(&url, "qwen3:1.7b", "You are Jarvis.", ToolRegistry::with_defaults())
        .unwrap();
    let reply = agent.respond("what time is it").await.unwrap();

    assert_eq!(reply, "It is just past two, sir.");
    assert_eq!(calls.0.load(Ordering::SeqCst), 2);
}

async fn ollama_unknown_tool(State(calls): State<Calls>, Json(body): Json<Value>) -> Json<Value> {
    calls.0.fetch_add(1, Ordering::SeqCst);
    let last = body["messages"].as_array().unwrap().last().unwrap().clone();

    if last["role"] == "tool" {
        assert!(last["content"].as_str().unwrap().starts_with("Error:"));
        return Json(json!({"message": {"role": "assistant", "content": "I can't do that."}}));
    }

    Json(json!({
        "message": {
            "role": "assistant",
            "content": "",
            "tool_calls": [{"function": {"name": "open_pod_bay_doors", "arguments": {}}}]
        }
    }))
}

#[tokio::test]
async fn test_agent_reports_tool_errors_to_model() {
    let calls = Calls::default();
    let app = Router::new()
        .route("/api/chat", post(ollama_unknown_tool))
        .with_state(calls.clone());
    let url = serve(app).await;

    let agent = OllamaAgent::new(&url, "qwen3:1.7b", "", ToolRegistry::with_defaults()).unwrap();

    assert_eq!(agent.respond("open the doors").await.unwrap(), "I can't do that.");
    assert_eq!(calls.0.load(Ordering::SeqCst), 2);
}

async fn ollama_tool_forever() -> Json<Value> {
    Json(json!({
        "message": {
            "role": "assistant",
            "content": "",
            "tool_calls": [{"function": {"name": "get_time", "arguments": {}}}]
        }
    }))
}

#[tokio::test]
async fn test_agent_gives_up_after_max_iterations() {
    let app = Router::new().route("/api/chat", post(ollama_tool_forever));
    let url = serve(app).await;

    let agent = OllamaAgent::new(&url, "qwen3:1.7b", "", ToolRegistry::with_defaults())
        .unwrap()
        .with_max_iterations(2);

    let result = agent.respond("loop").await;
    assert!(matches!(result, Err(Error::Agent(_))));
}

#[tokio::test]
async fn test_agent_surfaces_ollama_error() {
    let app = Router::new().route(
        "/api/chat",
        post(|| async {
            (
                StatusCode::NOT_FOUND,
                Json(json!({"error": "model 'qwen3:1.7b' not found"})),
            )
        }),
    );
    let url = serve(app).await;

    let agent = OllamaAgent::new(&url, "qwen3:1.7b", "", ToolRegistry::new()).unwrap();

    match agent.respond("hello").await {
        Err(Error::Agent(msg)) => assert!(msg.contains("not found"), "{msg}"),
        other => panic!("expected agent error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_agent_rejects_empty_reply() {
    let app = Router::new().route(
        "/api/chat",
        post(|| async {
            Json(json!({"message": {"role": "assistant", "content": "<think>...</think>"}}))
        }),
    );
    let url = serve(app).await;

    let agent = OllamaAgent::new(&url, "qwen3:1.7b", "", ToolRegistry::new()).unwrap();
    assert!(matches!(agent.respond("hello").await, Err(Error::Agent(_))));
}

#[tokio::test]
async fn test_agent_unreachable() {
    let agent = OllamaAgent::new("http://127.0.0.1:9", "qwen3:1.7b", "", ToolRegistry::new())
        .unwrap();
    assert!(matches!(agent.respond("hello").await, Err(Error::Agent(_))));
}

#[tokio::test]
async fn test_whisper_transcribes() {
    let app = Router::new().route(
        "/audio/transcriptions",
        post(|| async { Json(json!({"text": "  What time is it?  "})) }),
    );
    let url = serve(app).await;

    let stt = SpeechToText::new(SttProvider::Whisper, key(), "whisper-1".to_string())
        .unwrap()
        .with_base_url(&url);

    let text = tokio_test::assert_ok!(stt.transcribe(&phrase()).await);
    assert_eq!(text, "What time is it?");
}

#[tokio::test]
async fn test_whisper_blank_transcript_is_unrecognized() {
    let app = Router::new().route(
        "/audio/transcriptions",
        post(|| async { Json(json!({"text": " ... "})) }),
    );
    let url = serve(app).await;

    let stt = SpeechToText::new(SttProvider::Whisper, key(), "whisper-1".to_string())
        .unwrap()
        .with_base_url(&url);

    assert!(matches!(stt.transcribe(&phrase()).await, Err(Error::Unrecognized)));
}

#[tokio::test]
async fn test_whisper_server_error_is_stt_failure() {
    let app = Router::new().route(
        "/audio/transcriptions",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "overloaded") }),
    );
    let url = serve(app).await;

    let stt = SpeechToText::new(SttProvider::Whisper, key(), "whisper-1".to_string())
        .unwrap()
        .with_base_url(&url);

    let err = stt.transcribe(&phrase()).await.unwrap_err();
    assert!(matches!(err, Error::Stt(_)));
    assert!(!err.is_quiet());
}

#[tokio::test]
async fn test_deepgram_transcribes() {
    let app = Router::new().route(
        "/listen",
        post(|| async {
            Json(json!({
                "results": {
                    "channels": [{"alternatives": [{"transcript": "jarvis"}]}]
                }
            }))
        }),
    );
    let url = serve(app).await;

    let stt = SpeechToText::new(SttProvider::Deepgram, key(), "nova-2".to_string())
        .unwrap()
        .with_base_url(&url);

    assert_eq!(stt.transcribe(&phrase()).await.unwrap(), "jarvis");
}

#[tokio::test]
async fn test_openai_tts_returns_audio_bytes() {
    let app = Router::new().route(
        "/audio/speech",
        post(|Json(body): Json<Value>| async move {
            assert_eq!(body["input"], "Yes sir?");
            assert_eq!(body["voice"], "alloy");
            vec![0xFF_u8, 0xFB, 0x90, 0x00]
        }),
    );
    let url = serve(app).await;

    let tts = TextToSpeech::new_openai(key(), "alloy".to_string(), 1.0)
        .unwrap()
        .with_base_url(&url);

    assert_eq!(tts.synthesize("Yes sir?").await.unwrap(), vec![0xFF, 0xFB, 0x90, 0x00]);
}

#[tokio::test]
async fn test_tts_error_status() {
    let app = Router::new().route(
        "/audio/speech",
        post(|| async { (StatusCode::UNAUTHORIZED, "bad key") }),
    );
    let url = serve(app).await;

    let tts = TextToSpeech::new_openai(key(), "alloy".to_string(), 1.0)
        .unwrap()
        .with_base_url(&url);

    assert!(matches!(tts.synthesize("hello").await, Err(Error::Tts(_))));
}
