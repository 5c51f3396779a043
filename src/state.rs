//! # Application State Management
//!
//! This module manages state that every HTTP worker shares: the runtime
//! configuration, request metrics, and the analyzer.
//!
//! ## Key Rust Concepts:
//!
//! ### Arc (Atomically Reference Counted)
//! - **Purpose**: Allows multiple parts of the program to safely share ownership of data
//! - **Why needed**: actix-web runs one `App` per worker thread and every one
//!   of them needs the same configuration and counters
//!
//! ### RwLock (Reader-Writer Lock)
//! - **Purpose**: Allows multiple readers OR one writer at a time
//! - **Why needed**: Every request reads the config, only `PUT /api/v1/config` writes it
//!
//! ### Arc<dyn Trait>
//! - The analyzer is stored as a trait object so the backend can be chosen
//!   from configuration at startup
//!
//! Nothing here is per-submission. Each request's reference text, audio and
//! temporary file live only inside its own handler call.

use crate::analysis::{build_analyzer, RecitationAnalyzer};
use crate::config::AppConfig;
use crate::storage::TempAudioStore;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

/// The state shared across all HTTP request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration (can be updated at runtime)
    pub config: Arc<RwLock<AppConfig>>,

    /// Request and analysis counters
    pub metrics: Arc<RwLock<AppMetrics>>,

    /// The analysis backend, built once at startup
    pub analyzer: Arc<dyn RecitationAnalyzer>,

    /// When the server started
    pub start_time: Instant,
}

/// Metrics collected across all HTTP requests.
///
/// ## Why these metrics matter:
/// - **request_count / error_count**: load and reliability monitoring
/// - **analyses_completed / analyses_failed**: health of the analysis backend
/// - **submissions_rejected**: how often clients send incomplete submissions
/// - **uploads_too_large**: requests refused for exceeding the body limit
/// - **analyses_in_flight**: current concurrent analyses
#[derive(Debug, Default, Clone)]
pub struct AppMetrics {
    pub request_count: u64,
    pub error_count: u64,
    pub analyses_completed: u64,
    pub analyses_failed: u64,
    pub submissions_rejected: u64,
    pub uploads_too_large: u64,
    pub analyses_in_flight: u32,

    /// Key: endpoint name (e.g., "POST /analyze-tajweed")
    pub endpoint_metrics: HashMap<String, EndpointMetric>,
}

/// Detailed performance metrics for a specific API endpoint.
#[derive(Debug, Default, Clone)]
pub struct EndpointMetric {
    pub request_count: u64,
    /// Total time spent processing all requests to this endpoint (milliseconds)
    pub total_duration_ms: u64,
    pub error_count: u64,
}

impl AppState {
    /// Create state with the analyzer named in `config.analysis.backend`.
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let analyzer = build_analyzer(&config.analysis)?;
        Ok(Self::with_analyzer(config, analyzer))
    }

    /// Create state around an already-built analyzer.
    pub fn with_analyzer(config: AppConfig, analyzer: Arc<dyn RecitationAnalyzer>) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            metrics: Arc::new(RwLock::new(AppMetrics::default())),
            analyzer,
            start_time: Instant::now(),
        }
    }

    /// Get a copy of the current configuration.
    ///
    /// Cloning releases the lock immediately, so other threads aren't blocked.
    /// A poisoned lock still holds a valid config, so it is read anyway.
    pub fn get_config(&self) -> AppConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the configuration after validating it.
    pub fn update_config(&self, new_config: AppConfig) -> Result<(), String> {
        new_config.validate().map_err(|e| e.to_string())?;
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = new_config;
        Ok(())
    }

    /// Storage for this request's upload, following the current config.
    pub fn upload_store(&self) -> TempAudioStore {
        TempAudioStore::new(self.get_config().upload.temp_dir_path())
    }

    fn with_metrics(&self, update: impl FnOnce(&mut AppMetrics)) {
        let mut metrics = self.metrics.write().unwrap_or_else(PoisonError::into_inner);
        update(&mut metrics);
    }

    pub fn increment_request_count(&self) {
        self.with_metrics(|m| m.request_count += 1);
    }

    pub fn increment_error_count(&self) {
        self.with_metrics(|m| m.error_count += 1);
    }

    pub fn record_endpoint_request(&self, endpoint: &str, duration_ms: u64, is_error: bool) {
        self.with_metrics(|m| {
            let endpoint_metric = m.endpoint_metrics.entry(endpoint.to_string()).or_default();
            endpoint_metric.request_count += 1;
            endpoint_metric.total_duration_ms += duration_ms;
            if is_error {
                endpoint_metric.error_count += 1;
            }
        });
    }

    pub fn record_rejected_submission(&self) {
        self.with_metrics(|m| m.submissions_rejected += 1);
    }

    pub fn record_oversized_upload(&self) {
        self.with_metrics(|m| m.uploads_too_large += 1);
    }

    /// Mark an analysis as started. The returned guard records the outcome
    /// and decrements the in-flight counter when it is dropped.
    pub fn begin_analysis(&self) -> AnalysisTracker {
        self.with_metrics(|m| m.analyses_in_flight += 1);
        AnalysisTracker {
            state: self.clone(),
            succeeded: false,
        }
    }

    /// Get a snapshot of current metrics (used for the /metrics endpoint).
    pub fn get_metrics_snapshot(&self) -> AppMetrics {
        self.metrics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

/// Tracks one in-flight analysis. Counts as failed unless
/// [`AnalysisTracker::succeed`] is called before it drops.
pub struct AnalysisTracker {
    state: AppState,
    succeeded: bool,
}

impl AnalysisTracker {
    pub fn succeed(mut self) {
        self.succeeded = true;
    }
}

impl Drop for AnalysisTracker {
    fn drop(&mut self) {
        let succeeded = self.succeeded;
        self.state.with_metrics(|m| {
            m.analyses_in_flight = m.analyses_in_flight.saturating_sub(1);
            if succeeded {
                m.analyses_completed += 1;
            } else {
                m.analyses_failed += 1;
            }
        });
    }
}

impl EndpointMetric {
    pub fn average_duration_ms(&self) -> f64 {
        if self.request_count > 0 {
            self.total_duration_ms as f64 / self.request_count as f64
        } else {
            0.0
        }
    }

    pub fn error_rate(&self) -> f64 {
        if self.request_count > 0 {
            self.error_count as f64 / self.request_count as f64
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> AppState {
        AppState::new(AppConfig::default()).unwrap()
    }

    #[test]
    fn test_analysis_tracker_counts_outcomes() {
        let state = state();

        let tracker = state.begin_analysis();
        assert_eq!(state.get_metrics_snapshot().analyses_in_flight, 1);
        tracker.succeed();

        drop(state.begin_analysis());

        let metrics = state.get_metrics_snapshot();
        assert_eq!(metrics.analyses_in_flight, 0);
        assert_eq!(metrics.analyses_completed, 1);
        assert_eq!(metrics.analyses_failed, 1);
    }

    #[test]
    fn test_endpoint_metrics() {
        let state = state();
        state.record_endpoint_request("POST /analyze-tajweed", 30, false);
        state.record_endpoint_request("POST /analyze-tajweed", 10, true);

        let metrics = state.get_metrics_snapshot();
        let endpoint = &metrics.endpoint_metrics["POST /analyze-tajweed"];
        assert_eq!(endpoint.request_count, 2);
        assert_eq!(endpoint.average_duration_ms(), 20.0);
        assert_eq!(endpoint.error_rate(), 0.5);
    }

    #[test]
    fn test_update_config_validates() {
        let state = state();
        let mut config = state.get_config();
        config.server.port = 0;
        assert!(state.update_config(config).is_err());
        assert_eq!(state.get_config().server.port, 8080);
    }
}
