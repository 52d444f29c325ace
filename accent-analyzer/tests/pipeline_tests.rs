//! Pipeline Integration Tests
//!
//! Drive `AnalysisPipeline` end to end against a local audio server and a
//! counting mock model.

mod helpers;

use accent_analyzer::models::{
    Accent, AnalysisRequest, AnalysisSource, AudioRequest, ConfidenceBand,
};
use accent_analyzer::services::{CacheKey, CacheStore};
use accent_analyzer::{AnalysisError, ErrorKind};
use helpers::{generate_test_wav, AudioConfig, AudioServer, MockBehavior, MockModel, ServedFile, TestApp};
use std::sync::Arc;
use std::time::Duration;

fn request(url: &str) -> AudioRequest {
    AudioRequest::validate(AnalysisRequest {
        url: url.to_string(),
        auth_token: None,
        language: "en".to_string(),
    })
    .unwrap()
}

#[tokio::test]
async fn test_same_url_fresh_then_cache() {
    let server = AudioServer::start(vec![(
        "clips/speech.wav",
        ServedFile::wav(generate_test_wav(&AudioConfig::default())),
    )])
    .await;
    let app = TestApp::new(MockModel::answering("British", 91.25));
    let req = request(&server.url("clips/speech.wav"));

    let first = app.state.pipeline.analyze(&req).await.unwrap();
    let second = app.state.pipeline.analyze(&req).await.unwrap();

    assert_eq!(first.source, AnalysisSource::Fresh);
    assert_eq!(second.source, AnalysisSource::Cache);
    assert_eq!(first.result, second.result);

    assert_eq!(first.result.accent, Accent::British);
    assert_eq!(first.result.confidence_band, ConfidenceBand::High);
    assert_eq!(
        first.result.summary,
        "This audio has 91.25% confidence of being British English"
    );
    assert!(!first.result.details.cached);

    // Second request touched neither the audio host nor the model
    assert_eq!(server.hits(), 1);
    assert_eq!(app.model.calls(), 1);
}

#[tokio::test]
async fn test_identical_audio_under_two_urls_classified_once() {
    let wav = generate_test_wav(&AudioConfig::default());
    let server = AudioServer::start(vec![
        ("a/first.wav", ServedFile::wav(wav.clone())),
        ("b/second.wav", ServedFile::wav(wav)),
    ])
    .await;
    let app = TestApp::new(MockModel::answering("American", 77.0));

    let first = app.state.pipeline.analyze(&request(&server.url("a/first.wav"))).await.unwrap();
    let second = app.state.pipeline.analyze(&request(&server.url("b/second.wav"))).await.unwrap();

    // Different URL keys, so both are fresh; the content key avoided a second model call
    assert_eq!(first.source, AnalysisSource::Fresh);
    assert_eq!(second.source, AnalysisSource::Fresh);
    assert_eq!(first.result.accent, second.result.accent);
    assert_eq!(first.result.confidence, second.result.confidence);
    assert!(second.result.details.cached);
    assert_eq!(app.model.calls(), 1);
    assert_eq!(server.hits(), 2);
}

#[tokio::test]
async fn test_model_always_failing_gets_exactly_three_attempts() {
    let server = AudioServer::start(vec![(
        "speech.wav",
        ServedFile::wav(generate_test_wav(&AudioConfig::default())),
    )])
    .await;
    let app = TestApp::new(MockModel::new(MockBehavior::AlwaysUnavailable));
    let req = request(&server.url("speech.wav"));

    let err = app.state.pipeline.analyze(&req).await.unwrap_err();

    assert!(matches!(err, AnalysisError::InferenceFailed { attempts: 3, .. }));
    assert_eq!(err.kind(), ErrorKind::Terminal);
    assert_eq!(app.model.calls(), 3);

    // Nothing was cached for the URL
    let cached = app.store.get(CacheKey::for_url(req.url()).as_str()).await.unwrap();
    assert!(cached.is_none());
}

#[tokio::test]
async fn test_transient_failures_then_success() {
    let server = AudioServer::start(vec![(
        "speech.wav",
        ServedFile::wav(generate_test_wav(&AudioConfig::default())),
    )])
    .await;
    let app = TestApp::new(MockModel::new(MockBehavior::FlakyThenSucceed {
        failures: 2,
        label: "Australian".to_string(),
        confidence: 45.0,
    }));

    let response = app
        .state
        .pipeline
        .analyze(&request(&server.url("speech.wav")))
        .await
        .unwrap();

    assert_eq!(response.result.accent, Accent::Australian);
    assert_eq!(response.result.confidence_band, ConfidenceBand::Low);
    assert_eq!(app.model.calls(), 3);
}

#[tokio::test]
async fn test_unsupported_accent_is_validation_error() {
    let server = AudioServer::start(vec![(
        "speech.wav",
        ServedFile::wav(generate_test_wav(&AudioConfig::default())),
    )])
    .await;
    let app = TestApp::new(MockModel::answering("Scottish", 88.0));

    let err = app
        .state
        .pipeline
        .analyze(&request(&server.url("speech.wav")))
        .await
        .unwrap_err();

    assert!(matches!(err, AnalysisError::UnsupportedAccent { ref label, .. } if label == "Scottish"));
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(app.store.is_empty().await);
}

#[tokio::test]
async fn test_html_page_is_unsupported_content() {
    let server = AudioServer::start(vec![(
        "speech.wav",
        ServedFile::html("<html><body>not audio</body></html>"),
    )])
    .await;
    let app = TestApp::new(MockModel::answering("British", 90.0));

    let err = app
        .state
        .pipeline
        .analyze(&request(&server.url("speech.wav")))
        .await
        .unwrap_err();

    assert!(matches!(err, AnalysisError::UnsupportedContent(_)));
    assert_eq!(app.model.calls(), 0);
}

#[tokio::test]
async fn test_missing_file_is_unsupported_content() {
    let server = AudioServer::start(vec![]).await;
    let app = TestApp::new(MockModel::answering("British", 90.0));

    let err = app
        .state
        .pipeline
        .analyze(&request(&server.url("missing.wav")))
        .await
        .unwrap_err();

    assert!(matches!(err, AnalysisError::UnsupportedContent(_)));
    assert_eq!(server.hits(), 1);
}

#[tokio::test]
async fn test_undecodable_audio_fails_and_cleans_staging() {
    let server = AudioServer::start(vec![(
        "broken.wav",
        ServedFile::wav(b"definitely not a wav file".to_vec()),
    )])
    .await;
    let app = TestApp::new(MockModel::answering("British", 90.0));

    let err = app
        .state
        .pipeline
        .analyze(&request(&server.url("broken.wav")))
        .await
        .unwrap_err();

    assert!(matches!(err, AnalysisError::AudioProcessing(_)));
    assert_eq!(err.public_message(), "Analysis failed");
    assert_eq!(app.model.calls(), 0);
    assert_eq!(app.staged_files(), 0);
}

#[tokio::test]
async fn test_successful_analysis_cleans_staging() {
    let server = AudioServer::start(vec![(
        "speech.wav",
        ServedFile::wav(generate_test_wav(&AudioConfig::default())),
    )])
    .await;
    let app = TestApp::new(MockModel::answering("British", 90.0));

    app.state
        .pipeline
        .analyze(&request(&server.url("speech.wav")))
        .await
        .unwrap();

    assert_eq!(app.staged_files(), 0);
}

#[tokio::test]
async fn test_concurrent_identical_requests_coalesce() {
    let server = AudioServer::start(vec![(
        "speech.wav",
        ServedFile::wav(generate_test_wav(&AudioConfig::default())),
    )])
    .await;
    let app = Arc::new(TestApp::new(MockModel::new(MockBehavior::Slow {
        delay: Duration::from_millis(100),
        label: "American".to_string(),
        confidence: 82.0,
    })));
    let url = server.url("speech.wav");

    let mut handles = Vec::new();
    for _ in 0..4 {
        let app = app.clone();
        let req = request(&url);
        handles.push(tokio::spawn(async move { app.state.pipeline.analyze(&req).await }));
    }

    let mut sources = Vec::new();
    for handle in handles {
        sources.push(handle.await.unwrap().unwrap().source);
    }

    assert_eq!(sources.iter().filter(|s| **s == AnalysisSource::Fresh).count(), 1);
    assert_eq!(server.hits(), 1);
    assert_eq!(app.model.calls(), 1);
}
