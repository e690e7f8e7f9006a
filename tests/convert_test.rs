//! HTTP tests for the conversion endpoint.
//!
//! The orchestrator runs a fake transcoder, so these tests cover request
//! parsing, error mapping, response headers and scratch cleanup without
//! needing ffmpeg installed.

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use stillcast::config::ImagePolicy;
use tower::ServiceExt;

use common::{FakeOutcome, Form, TestHarness};

async fn body_json(body: Body) -> serde_json::Value {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn arg_after<'a>(args: &'a [String], flag: &str) -> Vec<&'a str> {
    args.windows(2)
        .filter(|w| w[0] == flag)
        .map(|w| w[1].as_str())
        .collect()
}

#[tokio::test]
async fn root_returns_welcome_message() {
    let harness = TestHarness::new();
    let response = harness
        .router()
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response.into_body()).await;
    assert!(json["message"].as_str().unwrap().contains("/convert"));
}

#[tokio::test]
async fn health_returns_ok() {
    let harness = TestHarness::new();
    let response = harness
        .router()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn audio_only_upload_returns_mp4_attachment() {
    let harness = TestHarness::new();
    let request = Form::new()
        .file("audio_file", "My Song.aac", b"aac-bytes")
        .post("/convert");

    let response = harness.router().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers[header::CONTENT_TYPE], "video/mp4");
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"converted_My_Song.mp4\""
    );
    assert_eq!(headers[header::CONTENT_LENGTH], "8");
    assert!(headers.contains_key("x-request-id"));

    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"fake-mp4");

    // Delivered, so nothing is left behind.
    assert!(harness.scratch_entries().is_empty());
}

#[tokio::test]
async fn fallback_image_is_used_when_none_uploaded() {
    let harness = TestHarness::new();
    let request = Form::new()
        .file("audio_file", "clip.mp3", b"mp3")
        .post("/convert");

    let response = harness.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let _ = response.into_body().collect().await.unwrap();

    let calls = harness.ffmpeg.calls();
    assert_eq!(calls.len(), 1);
    let inputs = arg_after(&calls[0], "-i");
    assert_eq!(inputs.len(), 2);
    assert!(inputs[0].ends_with("logo.png"));
    assert_eq!(arg_after(&calls[0], "-c:v"), vec!["libx264"]);
    assert_eq!(arg_after(&calls[0], "-c:a"), vec!["copy"]);
}

#[tokio::test]
async fn trailing_slash_route_is_accepted() {
    let harness = TestHarness::new();
    let request = Form::new()
        .file("audio_file", "clip.aac", b"aac")
        .post("/convert/");

    let response = harness.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn uploaded_image_and_soft_subtitle_are_muxed() {
    let harness = TestHarness::new();
    let request = Form::new()
        .file("audio_file", "clip.aac", b"aac")
        .file("image_file", "cover.jpg", b"jpg")
        .file("subtitle_file", "lyrics.srt", b"1\n00:00:00,000 --> 00:00:01,000\nhi\n")
        .text("subtitle_mode", "soft")
        .text("unrelated", "ignored")
        .post("/convert");

    let response = harness.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let _ = response.into_body().collect().await.unwrap();

    let args = &harness.ffmpeg.calls()[0];
    let inputs = arg_after(args, "-i");
    assert_eq!(inputs.len(), 3);
    assert!(inputs[0].ends_with("image_cover.jpg"));
    assert!(inputs[1].ends_with("audio_clip.aac"));
    assert!(inputs[2].ends_with("subtitle_lyrics.srt"));
    assert_eq!(arg_after(args, "-c:s"), vec!["mov_text"]);
    assert_eq!(arg_after(args, "-map"), vec!["0:v", "1:a", "2:s"]);
    assert!(harness.scratch_entries().is_empty());
}

#[tokio::test]
async fn hard_subtitle_is_default_mode() {
    let harness = TestHarness::new();
    let request = Form::new()
        .file("audio_file", "clip.aac", b"aac")
        .file("subtitle_file", "lyrics.srt", b"srt")
        .post("/convert");

    let response = harness.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let _ = response.into_body().collect().await.unwrap();

    let args = &harness.ffmpeg.calls()[0];
    let filter = arg_after(args, "-vf");
    assert_eq!(filter.len(), 1);
    assert!(filter[0].starts_with("subtitles="));
    assert!(arg_after(args, "-c:s").is_empty());
}

#[tokio::test]
async fn empty_file_part_counts_as_absent() {
    let harness = TestHarness::with(
        ImagePolicy::NoImageSupport,
        FakeOutcome::Succeed(b"m4a".to_vec()),
    );
    let request = Form::new()
        .file("audio_file", "clip.aac", b"aac")
        .file("image_file", "", b"")
        .post("/convert");

    let response = harness.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let _ = response.into_body().collect().await.unwrap();

    let args = &harness.ffmpeg.calls()[0];
    assert_eq!(arg_after(args, "-i").len(), 1);
    assert!(args.contains(&"-vn".to_string()));
}

#[tokio::test]
async fn missing_audio_is_rejected() {
    let harness = TestHarness::new();
    let request = Form::new()
        .file("image_file", "cover.jpg", b"jpg")
        .post("/convert");

    let response = harness.router().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response.into_body()).await;
    assert_eq!(json["detail"], "audio_file is required");
    assert_eq!(json["code"], "validation_error");
    assert!(harness.ffmpeg.calls().is_empty());
    assert!(harness.scratch_entries().is_empty());
}

#[tokio::test]
async fn unknown_subtitle_mode_is_rejected() {
    let harness = TestHarness::new();
    let request = Form::new()
        .file("audio_file", "clip.aac", b"aac")
        .file("subtitle_file", "lyrics.srt", b"srt")
        .text("subtitle_mode", "burned")
        .post("/convert");

    let response = harness.router().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response.into_body()).await;
    assert!(json["detail"].as_str().unwrap().contains("burned"));
    assert!(harness.ffmpeg.calls().is_empty());
}

#[tokio::test]
async fn subtitle_without_image_is_rejected_before_any_write() {
    let harness = TestHarness::with(
        ImagePolicy::NoImageSupport,
        FakeOutcome::Succeed(b"m4a".to_vec()),
    );
    let request = Form::new()
        .file("audio_file", "clip.aac", b"aac")
        .file("subtitle_file", "lyrics.srt", b"srt")
        .post("/convert");

    let response = harness.router().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(harness.ffmpeg.calls().is_empty());
    assert!(harness.scratch_entries().is_empty());
}

#[tokio::test]
async fn transcode_failure_returns_500_with_stderr_and_cleans_up() {
    let harness = TestHarness::with(
        ImagePolicy::OptionalWithFixedFallback,
        FakeOutcome::Fail("clip.aac: Invalid data found when processing input".into()),
    );
    let mut request = Form::new()
        .file("audio_file", "clip.aac", b"not-audio")
        .file("image_file", "cover.png", b"png")
        .post("/convert");
    request
        .headers_mut()
        .insert("x-request-id", "req-42".parse().unwrap());

    let response = harness.router().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.headers()["x-request-id"], "req-42");
    let json = body_json(response.into_body()).await;
    assert_eq!(
        json["detail"],
        "ffmpeg conversion failed: clip.aac: Invalid data found when processing input"
    );
    assert_eq!(json["code"], "transcode_error");
    assert_eq!(json["request_id"], "req-42");
    assert!(harness.scratch_entries().is_empty());
}

#[tokio::test]
async fn abandoned_download_still_cleans_up() {
    let harness = TestHarness::with(
        ImagePolicy::OptionalWithFixedFallback,
        FakeOutcome::Succeed(vec![0u8; 256 * 1024]),
    );
    let request = Form::new()
        .file("audio_file", "clip.aac", b"aac")
        .post("/convert");

    let response = harness.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let mut body = response.into_body();
    let first = body.frame().await.unwrap().unwrap();
    assert!(first.is_data());
    assert!(!harness.scratch_entries().is_empty());

    // Client goes away mid-transfer.
    drop(body);
    assert!(harness.scratch_entries().is_empty());
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let harness = TestHarness::with_config(
        ImagePolicy::OptionalWithFixedFallback,
        FakeOutcome::Succeed(b"mp4".to_vec()),
        |config| config.server.max_upload_mb = 1,
    );
    let request = Form::new()
        .file("audio_file", "big.aac", &vec![1u8; 2 * 1024 * 1024])
        .post("/convert");

    let response = harness.router().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(harness.ffmpeg.calls().is_empty());
    assert!(harness.scratch_entries().is_empty());
}

#[tokio::test]
async fn concurrent_requests_do_not_share_files() {
    let harness = TestHarness::new();
    let app = harness.router();

    let requests = (0..8).map(|i| {
        let app = app.clone();
        async move {
            let request = Form::new()
                .file("audio_file", "same-name.aac", format!("aac-{i}").as_bytes())
                .post("/convert");
            let response = app.oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            response.into_body().collect().await.unwrap().to_bytes()
        }
    });
    let bodies = futures::future::join_all(requests).await;
    assert!(bodies.iter().all(|b| &b[..] == b"fake-mp4"));

    let calls = harness.ffmpeg.calls();
    let mut outputs: Vec<&String> = calls.iter().filter_map(|args| args.last()).collect();
    outputs.sort();
    outputs.dedup();
    assert_eq!(outputs.len(), 8);
    assert!(harness.scratch_entries().is_empty());
}
