//! # Recitation Analysis
//!
//! The seam between the gateway and whatever actually judges a recitation.
//!
//! The gateway only knows the [`RecitationAnalyzer`] trait: give it the
//! reference ayah and the stored recording, get back a three-section
//! [`TajweedReport`]. Speech recognition and Tajweed rule evaluation live
//! behind this trait and are not part of this crate; the shipped
//! [`CannedAnalyzer`] returns a fixed report so the full request path can be
//! exercised end to end.
//!
//! ## Adding a backend:
//! 1. Implement `RecitationAnalyzer` for your type
//! 2. Add its name to `config::KNOWN_BACKENDS`
//! 3. Build it in [`build_analyzer`]

pub mod canned;

pub use canned::CannedAnalyzer;

use crate::audio::AudioInfo;
use crate::config::AnalysisConfig;
use crate::report::TajweedReport;
use crate::submission::ReferenceText;
use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Everything an analyzer receives for one submission.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisRequest<'a> {
    pub reference: &'a ReferenceText,
    /// Temporary file holding the recording; removed after `analyze` returns
    pub audio_path: &'a Path,
    pub audio: &'a AudioInfo,
}

/// Why an analyzer could not produce a report.
#[derive(Debug)]
pub enum AnalysisError {
    /// The stored recording could not be read
    Io(std::io::Error),
    /// The backend failed or returned something unusable
    Backend(String),
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::Io(err) => write!(f, "failed to read recording: {}", err),
            AnalysisError::Backend(msg) => write!(f, "analysis backend error: {}", msg),
        }
    }
}

impl std::error::Error for AnalysisError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AnalysisError::Io(err) => Some(err),
            AnalysisError::Backend(_) => None,
        }
    }
}

impl From<std::io::Error> for AnalysisError {
    fn from(err: std::io::Error) -> Self {
        AnalysisError::Io(err)
    }
}

/// Produces a Tajweed feedback report for one recitation.
///
/// Implementations must be `Send + Sync`: one instance is shared by every
/// actix worker through `AppState`.
#[async_trait]
pub trait RecitationAnalyzer: Send + Sync {
    /// Backend identifier shown by `/health`.
    fn name(&self) -> &'static str;

    async fn analyze(&self, request: AnalysisRequest<'_>) -> Result<TajweedReport, AnalysisError>;
}

/// Build the analyzer named by `config.backend`.
pub fn build_analyzer(config: &AnalysisConfig) -> anyhow::Result<Arc<dyn RecitationAnalyzer>> {
    match config.backend.as_str() {
        "canned" => Ok(Arc::new(CannedAnalyzer::default())),
        other => Err(anyhow::anyhow!("Unknown analysis backend '{}'", other)),
    }
}
