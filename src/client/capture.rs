//! # Audio Capture
//!
//! The client never talks to a microphone directly. It asks an
//! [`AudioCapture`] for a [`Recording`], and the recording owns the device
//! until it is stopped.
//!
//! ## Device ownership:
//! - `AudioCapture::start` acquires the device (or fails with permission denied)
//! - `Recording::stop` consumes the recording, releases the device and
//!   returns the captured bytes
//! - Dropping a recording without stopping it also releases the device
//!
//! Because `stop` takes `self: Box<Self>`, a recording cannot be stopped
//! twice, so the device is released exactly once per recording.

use std::fmt;
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// The host refused access to the capture device.
    PermissionDenied(String),
    /// No capture device exists.
    Unavailable(String),
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::PermissionDenied(msg) => write!(f, "capture permission denied: {}", msg),
            CaptureError::Unavailable(msg) => write!(f, "capture device unavailable: {}", msg),
        }
    }
}

impl std::error::Error for CaptureError {}

/// Source of recordings (a microphone, a file, a test fake).
pub trait AudioCapture {
    fn start(&mut self) -> Result<Box<dyn Recording>, CaptureError>;
}

/// An in-progress recording holding the capture device.
pub trait Recording: Send {
    /// Finish recording, release the device, and return the audio.
    fn stop(self: Box<Self>) -> Vec<u8>;
}

/// Treats an audio file on disk as the recording.
///
/// Used by the `recite` binary, where there is no browser microphone: the
/// "recording" is whatever the file contains when recording starts. An
/// unreadable file is reported as a permission failure, the same way a
/// denied microphone would be.
#[derive(Debug, Clone)]
pub struct FileCapture {
    path: PathBuf,
}

impl FileCapture {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl AudioCapture for FileCapture {
    fn start(&mut self) -> Result<Box<dyn Recording>, CaptureError> {
        let bytes = std::fs::read(&self.path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                CaptureError::Unavailable(format!("{}: {}", self.path.display(), e))
            }
            _ => CaptureError::PermissionDenied(format!("{}: {}", self.path.display(), e)),
        })?;
        debug!(path = %self.path.display(), size_bytes = bytes.len(), "Opened file capture");
        Ok(Box::new(FileRecording { bytes }))
    }
}

struct FileRecording {
    bytes: Vec<u8>,
}

impl Recording for FileRecording {
    fn stop(self: Box<Self>) -> Vec<u8> {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_capture_reads_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("take.wav");
        std::fs::write(&path, b"RIFF").unwrap();

        let recording = FileCapture::new(&path).start().unwrap();
        assert_eq!(recording.stop(), b"RIFF");
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        let tmp = tempfile::tempdir().unwrap();
        let err = FileCapture::new(tmp.path().join("none.wav"))
            .start()
            .err()
            .unwrap();
        assert!(matches!(err, CaptureError::Unavailable(_)));
    }
}
