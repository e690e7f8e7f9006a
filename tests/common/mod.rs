//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], which owns a temporary scratch directory, a
//! default image and an [`AppContext`] whose orchestrator runs a
//! [`FakeFfmpeg`] instead of the real transcoder. [`Form`] builds
//! `multipart/form-data` request bodies.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request};
use axum::Router;
use parking_lot::Mutex;
use tempfile::TempDir;

use stillcast::config::{Config, ImagePolicy, Settings};
use stillcast::conversion::Orchestrator;
use stillcast::server::{create_router, AppContext};
use stillcast_av::{ArtifactStore, ProcessResult, ProcessRunner};
use stillcast_common::Result;

/// What the fake transcoder does when it is run.
#[derive(Debug, Clone)]
pub enum FakeOutcome {
    /// Write these bytes to the output path and exit 0.
    Succeed(Vec<u8>),
    /// Write a partial output and exit 1 with this stderr.
    Fail(String),
}

/// Stand-in for ffmpeg that records every argument vector it receives.
pub struct FakeFfmpeg {
    outcome: FakeOutcome,
    calls: Mutex<Vec<Vec<String>>>,
}

impl FakeFfmpeg {
    pub fn new(outcome: FakeOutcome) -> Self {
        Self {
            outcome,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl ProcessRunner for FakeFfmpeg {
    fn tool_name(&self) -> &str {
        "ffmpeg"
    }

    async fn run(&self, args: &[String]) -> Result<ProcessResult> {
        self.calls.lock().push(args.to_vec());
        let output = args.last().expect("output path is the last argument");

        match &self.outcome {
            FakeOutcome::Succeed(bytes) => {
                tokio::fs::write(output, bytes).await?;
                Ok(ProcessResult {
                    success: true,
                    code: Some(0),
                    stdout: String::new(),
                    stderr: String::new(),
                })
            }
            FakeOutcome::Fail(stderr) => {
                tokio::fs::write(output, b"partial").await?;
                Ok(ProcessResult {
                    success: false,
                    code: Some(1),
                    stdout: String::new(),
                    stderr: stderr.clone(),
                })
            }
        }
    }
}

/// Test harness wrapping a fully constructed [`AppContext`].
pub struct TestHarness {
    pub dir: TempDir,
    pub ctx: AppContext,
    pub ffmpeg: Arc<FakeFfmpeg>,
}

impl TestHarness {
    /// Default policy, fake ffmpeg that succeeds with a small payload.
    pub fn new() -> Self {
        Self::with(
            ImagePolicy::OptionalWithFixedFallback,
            FakeOutcome::Succeed(b"fake-mp4".to_vec()),
        )
    }

    pub fn with(policy: ImagePolicy, outcome: FakeOutcome) -> Self {
        Self::with_config(policy, outcome, |_| {})
    }

    /// Build a harness, letting the caller adjust the config first.
    pub fn with_config(
        policy: ImagePolicy,
        outcome: FakeOutcome,
        adjust: impl FnOnce(&mut Config),
    ) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let logo = dir.path().join("logo.png");
        std::fs::write(&logo, b"png").expect("failed to write logo");

        let mut config = Config::default();
        config.server.host = "127.0.0.1".to_string();
        config.storage.scratch_dir = dir.path().join("scratch");
        config.image.policy = policy;
        config.image.default_image = logo.clone();
        adjust(&mut config);

        let settings = Settings {
            ffmpeg: PathBuf::from("ffmpeg"),
            timeout: None,
            store: ArtifactStore::open(&config.storage.scratch_dir)
                .expect("failed to open scratch dir"),
            image_policy: policy,
            default_image: policy.uses_fixed_image().then_some(logo),
            subtitle_language: config.subtitles.language.clone(),
        };

        let ffmpeg = Arc::new(FakeFfmpeg::new(outcome));
        let orchestrator = Orchestrator::with_runner(settings, ffmpeg.clone());
        let ctx = AppContext::new(config, orchestrator);

        Self { dir, ctx, ffmpeg }
    }

    pub fn router(&self) -> Router {
        create_router(self.ctx.clone())
    }

    pub fn scratch_dir(&self) -> PathBuf {
        self.dir.path().join("scratch")
    }

    /// Files currently left in the scratch directory.
    pub fn scratch_entries(&self) -> Vec<PathBuf> {
        list_dir(&self.scratch_dir())
    }
}

pub fn list_dir(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .map(|entries| entries.filter_map(|e| e.ok()).map(|e| e.path()).collect())
        .unwrap_or_default()
}

const BOUNDARY: &str = "stillcast-test-boundary";

/// Minimal `multipart/form-data` body builder.
#[derive(Default)]
pub struct Form {
    body: Vec<u8>,
}

impl Form {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, name: &str, file_name: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    /// `POST` this form to `uri`.
    pub fn post(mut self, uri: &str) -> Request<Body> {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .header(header::CONTENT_LENGTH, self.body.len())
            .body(Body::from(self.body))
            .unwrap()
    }
}
