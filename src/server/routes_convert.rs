//! Conversion endpoint.
//!
//! `POST /convert` takes a `multipart/form-data` body:
//!
//! | field           | required | meaning                         |
//! |-----------------|----------|---------------------------------|
//! | `audio_file`    | yes      | audio track, copied unchanged   |
//! | `image_file`    | no       | still picture for the video     |
//! | `subtitle_file` | no       | subtitle file                   |
//! | `subtitle_mode` | no       | `hard` (default) or `soft`      |
//!
//! and answers with the MP4 as an attachment. The response body is streamed
//! from scratch storage and the job's files are removed once it has been sent.

use axum::{
    body::Body,
    extract::{multipart::MultipartError, Multipart, State},
    http::{header, StatusCode},
    response::Response,
    routing::post,
    Extension, Router,
};
use stillcast_av::SubtitleMode;
use stillcast_common::{Error, Result};

use super::error::AppError;
use super::request_id::RequestId;
use super::AppContext;
use crate::conversion::{ConversionRequest, Upload};

pub fn convert_routes() -> Router<AppContext> {
    Router::new()
        .route("/convert", post(convert))
        .route("/convert/", post(convert))
}

async fn convert(
    State(ctx): State<AppContext>,
    request_id: Option<Extension<RequestId>>,
    multipart: Multipart,
) -> std::result::Result<Response, AppError> {
    handle_convert(ctx, multipart).await.map_err(|e| {
        let err = AppError::new(e);
        match request_id {
            Some(Extension(RequestId(id))) => err.with_request_id(id),
            None => err,
        }
    })
}

async fn handle_convert(ctx: AppContext, multipart: Multipart) -> Result<Response> {
    let request = read_form(multipart).await?;

    tracing::info!(
        audio = %request.audio.file_name,
        image = request.image.is_some(),
        subtitle = request.subtitle.is_some(),
        mode = %request.subtitle_mode,
        "Conversion requested"
    );

    let media = ctx.orchestrator.convert(request).await?;
    let size = media.size();
    let disposition = format!("attachment; filename=\"{}\"", media.download_name());
    let stream = media.into_stream().await?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "video/mp4")
        .header(header::CONTENT_DISPOSITION, disposition)
        .header(header::CONTENT_LENGTH, size)
        .body(Body::from_stream(stream))
        .map_err(|e| Error::Internal(format!("failed to build response: {e}")))
}

/// Collect the multipart fields into a [`ConversionRequest`].
async fn read_form(mut multipart: Multipart) -> Result<ConversionRequest> {
    let mut audio = None;
    let mut image = None;
    let mut subtitle = None;
    let mut subtitle_mode = SubtitleMode::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "audio_file" | "image_file" | "subtitle_file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await.map_err(multipart_error)?;

                // Browsers send an empty part for a file input left blank.
                if file_name.is_empty() && data.is_empty() {
                    continue;
                }
                let file_name = if file_name.is_empty() {
                    name.trim_end_matches("_file").to_string()
                } else {
                    file_name
                };

                let upload = Some(Upload::new(file_name, data));
                match name.as_str() {
                    "audio_file" => audio = upload,
                    "image_file" => image = upload,
                    _ => subtitle = upload,
                }
            }
            "subtitle_mode" => {
                let text = field.text().await.map_err(multipart_error)?;
                if !text.trim().is_empty() {
                    subtitle_mode = text.parse()?;
                }
            }
            other => {
                tracing::debug!(field = other, "Ignoring unknown form field");
            }
        }
    }

    let audio = audio.ok_or_else(|| Error::Validation("audio_file is required".into()))?;

    Ok(ConversionRequest {
        audio,
        image,
        subtitle,
        subtitle_mode,
    })
}

fn multipart_error(e: MultipartError) -> Error {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Error::PayloadTooLarge(e.body_text())
    } else {
        Error::Validation(format!("malformed multipart body: {}", e.body_text()))
    }
}
