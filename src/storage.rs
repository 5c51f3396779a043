//! # Transient Upload Storage
//!
//! Each submission's audio is written to a temporary file for the duration of
//! one analysis, then removed.
//!
//! ## Lifecycle:
//! 1. [`TempAudioStore::persist`] writes the bytes and returns a [`StoredAudio`]
//! 2. The analyzer reads the file through [`StoredAudio::path`]
//! 3. [`StoredAudio::discard`] removes the file
//!
//! If step 3 never runs (an early `?` return, a timeout, a panic in the
//! analyzer) the guard's `Drop` impl removes the file instead, so nothing is
//! left behind on any exit path.
//!
//! ## Rust Concepts:
//! - **RAII**: the file's lifetime is tied to a value; when the value goes out
//!   of scope, `Drop::drop` runs and the file is deleted.
//! - **Consuming methods**: `discard(self)` takes ownership, so a guard cannot
//!   be used after its file is gone.

use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Name used when the upload carries no usable file name.
const FALLBACK_FILENAME: &str = "recording.wav";

/// Reduce an untrusted client file name to a safe basename.
///
/// - drops any directory part (both `/` and `\` separators)
/// - replaces whitespace with `_`
/// - keeps only ASCII letters, digits, `.`, `_` and `-`
/// - strips leading dots and underscores, so the result is never hidden and
///   never `.` or `..`
///
/// Returns an empty string when nothing survives.
pub fn secure_filename(name: &str) -> String {
    let basename = name.rsplit(['/', '\\']).next().unwrap_or("");

    let cleaned: String = basename
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();

    cleaned.trim_start_matches(['.', '_']).to_string()
}

/// Directory where in-flight uploads are written.
#[derive(Debug, Clone)]
pub struct TempAudioStore {
    dir: PathBuf,
}

impl TempAudioStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `bytes` to a new file named after the sanitized client name.
    ///
    /// Every call gets a fresh UUID prefix, so two identical submissions never
    /// share a file. The directory is created on first use.
    pub async fn persist(&self, client_name: Option<&str>, bytes: &[u8]) -> io::Result<StoredAudio> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let sanitized = client_name.map(secure_filename).unwrap_or_default();
        let sanitized = if sanitized.is_empty() {
            FALLBACK_FILENAME.to_string()
        } else {
            sanitized
        };

        let path = self
            .dir
            .join(format!("{}_{}", Uuid::new_v4().simple(), sanitized));

        // The guard exists before the write, so a failed or partial write is
        // still cleaned up.
        let stored = StoredAudio {
            path,
            released: false,
        };
        tokio::fs::write(&stored.path, bytes).await?;

        debug!(path = %stored.path.display(), size_bytes = bytes.len(), "Stored upload");
        Ok(stored)
    }
}

/// A temporary audio file that is removed when this value is discarded or
/// dropped.
#[derive(Debug)]
pub struct StoredAudio {
    path: PathBuf,
    released: bool,
}

impl StoredAudio {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the file now. A file that is already gone is not an error.
    pub async fn discard(mut self) -> io::Result<()> {
        self.released = true;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!(path = %self.path.display(), "Removed upload");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl Drop for StoredAudio {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Removed upload on drop"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to remove upload"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_count(dir: &Path) -> usize {
        match std::fs::read_dir(dir) {
            Ok(entries) => entries.count(),
            Err(_) => 0,
        }
    }

    #[test]
    fn test_secure_filename() {
        assert_eq!(secure_filename("talaawa.wav"), "talaawa.wav");
        assert_eq!(secure_filename("my recording.webm"), "my_recording.webm");
        assert_eq!(secure_filename("../../etc/passwd"), "passwd");
        assert_eq!(secure_filename("..\\..\\windows\\win.ini"), "win.ini");
        assert_eq!(secure_filename(".hidden"), "hidden");
        assert_eq!(secure_filename("tilāwa (1).wav"), "tilwa_1.wav");
        assert_eq!(secure_filename("تلاوة.wav"), "wav");
        assert_eq!(secure_filename(".."), "");
        assert_eq!(secure_filename("dir/"), "");
    }

    #[tokio::test]
    async fn test_persist_and_discard() {
        let tmp = tempfile::tempdir().unwrap();
        let store = TempAudioStore::new(tmp.path().join("uploads"));

        let stored = store.persist(Some("talaawa.wav"), b"RIFF").await.unwrap();
        assert!(stored.path().starts_with(store.dir()));
        assert!(stored.path().to_string_lossy().ends_with("_talaawa.wav"));
        assert_eq!(std::fs::read(stored.path()).unwrap(), b"RIFF");

        let path = stored.path().to_path_buf();
        stored.discard().await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_drop_removes_file() {
        let tmp = tempfile::tempdir().unwrap();
        let store = TempAudioStore::new(tmp.path());

        let path = {
            let stored = store.persist(None, b"abc").await.unwrap();
            assert!(stored.path().to_string_lossy().ends_with(FALLBACK_FILENAME));
            stored.path().to_path_buf()
        };
        assert!(!path.exists());
        assert_eq!(file_count(tmp.path()), 0);
    }

    #[tokio::test]
    async fn test_identical_uploads_get_distinct_files() {
        let tmp = tempfile::tempdir().unwrap();
        let store = TempAudioStore::new(tmp.path());

        let first = store.persist(Some("a.wav"), b"same").await.unwrap();
        let second = store.persist(Some("a.wav"), b"same").await.unwrap();
        assert_ne!(first.path(), second.path());
        assert_eq!(file_count(tmp.path()), 2);

        first.discard().await.unwrap();
        assert!(second.path().exists());
        second.discard().await.unwrap();
        assert_eq!(file_count(tmp.path()), 0);
    }

    #[tokio::test]
    async fn test_discard_tolerates_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let store = TempAudioStore::new(tmp.path());

        let stored = store.persist(None, b"x").await.unwrap();
        std::fs::remove_file(stored.path()).unwrap();
        assert!(stored.discard().await.is_ok());
    }
}
