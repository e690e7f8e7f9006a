//! Scratch storage for in-flight jobs.
//!
//! An [`ArtifactStore`] owns one process-wide directory. Every job gets paths
//! of the form `<root>/<job id>_<safe name>`, so two jobs uploading the same
//! file name never touch the same file. A [`CleanupGuard`], obtained from
//! [`ArtifactStore::guard`], records the paths a job may have created and
//! hands them to [`ArtifactStore::cleanup`] exactly once, either when asked or
//! when it is dropped.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use stillcast_common::{JobId, Result};

/// Process-wide scratch directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Open the store, creating `root` (and its parents) if needed.
    ///
    /// Opening an existing directory is a no-op, so this is safe to call from
    /// several places at startup.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// The backing directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Return a scratch path unique to `job` for a file originally called
    /// `original_name`. Nothing is created on disk.
    pub fn allocate(&self, job: JobId, original_name: &str) -> PathBuf {
        self.root
            .join(format!("{job}_{}", sanitize_file_name(original_name)))
    }

    /// Delete every path that exists; missing paths are ignored.
    ///
    /// Failures other than "not found" are logged and swallowed so a job's
    /// own error is never masked.
    pub fn cleanup<I, P>(&self, paths: I)
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        for path in paths {
            let path = path.as_ref();
            match std::fs::remove_file(path) {
                Ok(()) => tracing::trace!(path = %path.display(), "Removed scratch file"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), "Failed to remove scratch file: {e}");
                }
            }
        }
    }

    /// Start an empty cleanup obligation discharged through this store.
    pub fn guard(&self) -> CleanupGuard {
        CleanupGuard {
            store: self.clone(),
            paths: Vec::new(),
        }
    }
}

/// Longest sanitized name kept, extension included.
const MAX_NAME_LEN: usize = 128;
/// Extensions longer than this are not treated as extensions when shortening.
const MAX_EXTENSION_LEN: usize = 16;

/// Reduce a client-supplied file name to a safe basename.
///
/// Directory components are dropped and anything outside `[A-Za-z0-9._-]`
/// becomes `_`. Names longer than 128 bytes are shortened, keeping a short
/// extension. An empty result falls back to `upload`.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        shorten(cleaned)
    }
}

/// Cap `name` at [`MAX_NAME_LEN`] bytes. `name` is ASCII.
fn shorten(name: String) -> String {
    if name.len() <= MAX_NAME_LEN {
        return name;
    }

    let extension = match name.rfind('.') {
        Some(dot) if dot > 0 && name.len() - dot <= MAX_EXTENSION_LEN + 1 => &name[dot..],
        _ => "",
    };
    let stem_len = MAX_NAME_LEN - extension.len();
    format!("{}{extension}", &name[..stem_len])
}

/// Cleanup obligation for one job's scratch files.
///
/// Paths are tracked *before* they are created so a failure half-way through
/// a write still gets cleaned up. The files are deleted once, through the
/// owning store's [`ArtifactStore::cleanup`]: by [`CleanupGuard::run`], or on
/// drop if `run` was never called.
#[derive(Debug)]
#[must_use = "dropping the guard deletes the tracked files immediately"]
pub struct CleanupGuard {
    store: ArtifactStore,
    paths: Vec<PathBuf>,
}

impl CleanupGuard {
    /// Add a path to the set deleted by this guard.
    pub fn track(&mut self, path: impl Into<PathBuf>) {
        self.paths.push(path.into());
    }

    /// Paths currently tracked.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Delete the tracked files now.
    pub fn run(mut self) {
        self.discharge();
    }

    fn discharge(&mut self) {
        let paths = std::mem::take(&mut self.paths);
        if !paths.is_empty() {
            self.store.cleanup(paths);
        }
    }
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        self.discharge();
    }
}
