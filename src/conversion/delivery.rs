//! Handing a finished job's output to the caller.
//!
//! The output file has to stay readable while it is being sent, so its
//! cleanup cannot happen inside the orchestrator. [`ConvertedMedia`] carries
//! the job's [`CleanupGuard`] out; [`CleanupStream`] discharges it after the
//! last chunk is read, or when the stream is dropped because the client went
//! away, whichever happens first.

use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use stillcast_av::CleanupGuard;
use stillcast_common::{Error, JobId, Result};
use tokio::fs::File;
use tokio_util::io::ReaderStream;

/// A successfully converted MP4 and the obligation to delete its job files.
#[derive(Debug)]
pub struct ConvertedMedia {
    job: JobId,
    path: PathBuf,
    size: u64,
    download_name: String,
    guard: CleanupGuard,
}

impl ConvertedMedia {
    pub(crate) fn new(
        job: JobId,
        path: PathBuf,
        size: u64,
        download_name: String,
        guard: CleanupGuard,
    ) -> Self {
        Self {
            job,
            path,
            size,
            download_name,
            guard,
        }
    }

    pub fn job_id(&self) -> JobId {
        self.job
    }

    /// Scratch path of the output file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Output size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// File name to offer the client, e.g. `converted_song.mp4`.
    pub fn download_name(&self) -> &str {
        &self.download_name
    }

    /// Open the output for streaming.
    ///
    /// The returned stream owns the cleanup obligation. If the file cannot be
    /// opened the job's files are deleted before the error is returned.
    pub async fn into_stream(self) -> Result<CleanupStream<ReaderStream<File>>> {
        let file = File::open(&self.path).await.map_err(|e| {
            Error::Internal(format!("cannot open output {}: {e}", self.path.display()))
        })?;

        Ok(CleanupStream {
            job: self.job,
            inner: Some(ReaderStream::new(file)),
            guard: Some(self.guard),
        })
    }

    /// Copy the output to `dest` and delete the job's files.
    pub async fn save_to(self, dest: &Path) -> Result<u64> {
        let copied = tokio::fs::copy(&self.path, dest).await?;
        tracing::debug!(job_id = %self.job, dest = %dest.display(), "Output saved");
        Ok(copied)
    }
}

/// Byte stream that deletes its job's files once it is finished or dropped.
pub struct CleanupStream<S> {
    job: JobId,
    inner: Option<S>,
    guard: Option<CleanupGuard>,
}

impl<S> CleanupStream<S> {
    fn finish(&mut self) {
        // Close the file before deleting it.
        self.inner = None;
        if let Some(guard) = self.guard.take() {
            tracing::debug!(job_id = %self.job, "Delivery finished; removing job files");
            guard.run();
        }
    }
}

impl<S> Stream for CleanupStream<S>
where
    S: Stream<Item = io::Result<Bytes>> + Unpin,
{
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let Some(inner) = self.inner.as_mut() else {
            return Poll::Ready(None);
        };

        let polled = Pin::new(inner).poll_next(cx);
        match &polled {
            Poll::Ready(None) => self.finish(),
            Poll::Ready(Some(Err(e))) => {
                tracing::warn!(job_id = %self.job, "Reading output failed mid-delivery: {e}");
                self.finish();
            }
            _ => {}
        }
        polled
    }
}

impl<S> Drop for CleanupStream<S> {
    fn drop(&mut self) {
        if self.guard.is_some() {
            tracing::debug!(job_id = %self.job, "Delivery abandoned; removing job files");
        }
        self.finish();
    }
}
