//! # Recitation Analysis Endpoint
//!
//! ## Endpoint: `POST /analyze-tajweed`
//!
//! ## Request:
//! `multipart/form-data` with
//! - `ayah`: the reference passage (text, at least 5 characters after trimming)
//! - `audio_file`: the recording (binary attachment)
//!
//! ## Responses:
//! - `200 {"status": "success", "report": "1. **الخطأ:** ...", "sections": [...]}`
//! - `400 {"status": "error", "message": "...", "code": "invalid_reference" | "missing_audio" | "bad_request"}`
//! - `413 {"status": "error", "message": "...", "code": "payload_too_large"}`
//! - `500 {"status": "error", "message": "...", "code": "storage_unavailable" | "analysis_failed" | "analysis_timeout"}`
//!
//! ## Pipeline:
//! 1. Read the form (streaming, capped at `upload.max_body_bytes`)
//! 2. Validate the reference text, then the audio
//! 3. Write the audio to a temporary file
//! 4. Run the analyzer under `analysis.timeout_seconds`
//! 5. Remove the temporary file, whatever step 4 returned
//! 6. Answer with the report, or with the uniform error body

use crate::analysis::AnalysisRequest;
use crate::audio::probe;
use crate::error::{AppError, AppResult, FailureCode};
use crate::report::AnalysisResponse;
use crate::state::AppState;
use crate::submission::{ReferenceText, AUDIO_FIELD, REFERENCE_FIELD};
use actix_multipart::{Field, Multipart};
use actix_web::{web, HttpResponse};
use futures_util::StreamExt;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// The audio attachment exactly as uploaded.
#[derive(Debug, Clone)]
pub struct UploadedAudio {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Raw form fields before validation.
#[derive(Debug, Default)]
pub struct SubmissionForm {
    pub ayah: Option<String>,
    pub audio: Option<UploadedAudio>,
}

impl SubmissionForm {
    /// Drain a multipart stream into its two known fields.
    ///
    /// Unknown fields are read and discarded. The total number of bytes read
    /// across all fields is capped at `max_bytes`.
    pub async fn read(mut payload: Multipart, max_bytes: usize) -> AppResult<Self> {
        let mut form = SubmissionForm::default();
        let mut total = 0usize;

        while let Some(item) = payload.next().await {
            let mut field: Field =
                item.map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?;

            let content_disposition = field
                .content_disposition()
                .ok_or_else(|| AppError::BadRequest("Missing content disposition".to_string()))?;
            let field_name = content_disposition.get_name().unwrap_or_default().to_string();
            let filename = content_disposition.get_filename().map(str::to_string);
            let content_type = field.content_type().map(|mime| mime.to_string());

            let bytes = read_field(&mut field, &mut total, max_bytes).await?;

            match field_name.as_str() {
                REFERENCE_FIELD => {
                    let text = String::from_utf8(bytes).map_err(|_| {
                        AppError::BadRequest("The reference text must be valid UTF-8".to_string())
                    })?;
                    form.ayah = Some(text);
                }
                AUDIO_FIELD => {
                    form.audio = Some(UploadedAudio {
                        filename,
                        content_type,
                        bytes,
                    });
                }
                _ => {}
            }
        }

        Ok(form)
    }
}

async fn read_field(field: &mut Field, total: &mut usize, max_bytes: usize) -> AppResult<Vec<u8>> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?;
        *total += chunk.len();
        if *total > max_bytes {
            return Err(AppError::PayloadTooLarge { limit: max_bytes });
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

/// Check the form against the input contract.
///
/// The reference text is checked first, so a submission missing both fields
/// reports the reference problem.
pub fn validate_form(form: SubmissionForm) -> AppResult<(ReferenceText, UploadedAudio)> {
    let reference = ReferenceText::parse(form.ayah.as_deref().unwrap_or_default())?;

    let audio = match form.audio {
        Some(audio) if !audio.bytes.is_empty() => audio,
        _ => return Err(AppError::MissingAudio),
    };

    Ok((reference, audio))
}

/// Handle one recitation submission.
pub async fn analyze_tajweed(
    state: web::Data<AppState>,
    payload: Multipart,
) -> AppResult<HttpResponse> {
    let started = Instant::now();
    let config = state.get_config();

    let form = SubmissionForm::read(payload, config.upload.max_body_bytes).await?;
    let (reference, audio) = validate_form(form).map_err(|err| {
        warn!(error = %err, "Rejected submission");
        state.record_rejected_submission();
        err
    })?;

    let info = probe(&audio.bytes);
    info!(
        reference_chars = reference.char_count(),
        audio_bytes = info.size_bytes,
        container = info.container.as_str(),
        declared_type = audio.content_type.as_deref().unwrap_or("none"),
        duration_ms = info.wav.as_ref().and_then(|w| w.duration_ms),
        "Accepted submission"
    );

    let tracker = state.begin_analysis();

    let stored = state
        .upload_store()
        .persist(audio.filename.as_deref(), &audio.bytes)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to store upload");
            AppError::analysis(FailureCode::StorageUnavailable, e)
        })?;
    drop(audio);

    let request = AnalysisRequest {
        reference: &reference,
        audio_path: stored.path(),
        audio: &info,
    };
    let timeout = Duration::from_secs(config.analysis.timeout_seconds);
    let outcome = tokio::time::timeout(timeout, state.analyzer.analyze(request)).await;

    if let Err(e) = stored.discard().await {
        warn!(error = %e, "Failed to remove upload");
    }

    let report = match outcome {
        Ok(Ok(report)) => report,
        Ok(Err(e)) => {
            error!(analyzer = state.analyzer.name(), error = %e, "Analysis failed");
            return Err(AppError::analysis(FailureCode::AnalysisFailed, e));
        }
        Err(_) => {
            error!(
                analyzer = state.analyzer.name(),
                timeout_seconds = config.analysis.timeout_seconds,
                "Analysis timed out"
            );
            return Err(AppError::analysis(
                FailureCode::AnalysisTimedOut,
                format!("no result after {}s", config.analysis.timeout_seconds),
            ));
        }
    };

    tracker.succeed();
    info!(
        analyzer = state.analyzer.name(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Analysis completed"
    );

    Ok(HttpResponse::Ok().json(AnalysisResponse::success(&report)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{AnalysisError, RecitationAnalyzer};
    use crate::audio::probe::tests::wav_bytes;
    use crate::config::AppConfig;
    use crate::report::TajweedReport;
    use crate::submission::ReferenceError;
    use actix_web::{http::StatusCode, test as actix_test, App};
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    const BOUNDARY: &str = "----recitation-boundary";

    fn multipart_body(ayah: Option<&str>, audio: Option<&[u8]>) -> Vec<u8> {
        let mut body = Vec::new();
        if let Some(ayah) = ayah {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"ayah\"\r\n\r\n{ayah}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some(audio) = audio {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"audio_file\"; filename=\"../talaawa.wav\"\r\nContent-Type: audio/wav\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(audio);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn post(body: Vec<u8>) -> actix_test::TestRequest {
        actix_test::TestRequest::post()
            .uri("/analyze-tajweed")
            .insert_header((
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            ))
            .set_payload(body)
    }

    /// Records the path it was given and checks the file is there.
    #[derive(Default)]
    struct SpyAnalyzer {
        seen: Mutex<Vec<PathBuf>>,
    }

    #[async_trait]
    impl RecitationAnalyzer for SpyAnalyzer {
        fn name(&self) -> &'static str {
            "spy"
        }

        async fn analyze(&self, request: AnalysisRequest<'_>) -> Result<TajweedReport, AnalysisError> {
            assert!(request.audio_path.exists());
            self.seen.lock().unwrap().push(request.audio_path.to_path_buf());
            Ok(TajweedReport::new("a", "b", "c"))
        }
    }

    fn test_state(tmp: &tempfile::TempDir, analyzer: Arc<dyn RecitationAnalyzer>) -> AppState {
        let mut config = AppConfig::default();
        config.upload.temp_dir = tmp.path().to_string_lossy().to_string();
        AppState::with_analyzer(config, analyzer)
    }

    #[actix_web::test]
    async fn test_file_exists_during_analysis_and_is_removed_after() {
        let tmp = tempfile::tempdir().unwrap();
        let spy = Arc::new(SpyAnalyzer::default());
        let state = test_state(&tmp, spy.clone());
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .route("/analyze-tajweed", web::post().to(analyze_tajweed)),
        )
        .await;

        let body = multipart_body(Some("بسم الله الرحمن الرحيم"), Some(wav_bytes(16_000, 1, 800).as_slice()));
        let resp = actix_test::call_service(&app, post(body).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let seen = spy.seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].starts_with(tmp.path()));
        // Directory part of the client file name was stripped
        assert!(seen[0].to_string_lossy().ends_with("_talaawa.wav"));
        assert!(!seen[0].exists());

        let metrics = state.get_metrics_snapshot();
        assert_eq!(metrics.analyses_completed, 1);
        assert_eq!(metrics.analyses_in_flight, 0);
    }

    #[actix_web::test]
    async fn test_rejection_counts_and_writes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let spy = Arc::new(SpyAnalyzer::default());
        let state = test_state(&tmp, spy.clone());
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .route("/analyze-tajweed", web::post().to(analyze_tajweed)),
        )
        .await;

        let resp = actix_test::call_service(&app, post(multipart_body(Some("abcd"), Some(&b"RIFF"[..]))).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        assert!(spy.seen.lock().unwrap().is_empty());
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
        assert_eq!(state.get_metrics_snapshot().submissions_rejected, 1);
    }

    #[actix_web::test]
    async fn test_streaming_cap() {
        let tmp = tempfile::tempdir().unwrap();
        let state = test_state(&tmp, Arc::new(SpyAnalyzer::default()));
        state
            .update_config({
                let mut config = state.get_config();
                config.upload.max_body_bytes = 64;
                config
            })
            .unwrap();
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .route("/analyze-tajweed", web::post().to(analyze_tajweed)),
        )
        .await;

        // No body-limit middleware here, so the reader itself must stop
        let body = multipart_body(Some("بسم الله"), Some(&[7u8; 256][..]));
        let resp = actix_test::call_service(&app, post(body).to_request()).await;
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[actix_web::test]
    async fn test_not_multipart_is_bad_request() {
        let tmp = tempfile::tempdir().unwrap();
        let state = test_state(&tmp, Arc::new(SpyAnalyzer::default()));
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .route("/analyze-tajweed", web::post().to(analyze_tajweed)),
        )
        .await;

        let req = actix_test::TestRequest::post()
            .uri("/analyze-tajweed")
            .insert_header(("content-type", "application/json"))
            .set_payload(r#"{"ayah":"بسم الله"}"#)
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: serde_json::Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["status"], "error");
        assert_eq!(body["code"], "bad_request");
    }

    #[test]
    fn test_validate_form_order() {
        let err = validate_form(SubmissionForm::default()).unwrap_err();
        assert!(matches!(err, AppError::InvalidReference(ReferenceError::Empty)));

        let form = SubmissionForm {
            ayah: Some("  بسم الله  ".to_string()),
            audio: None,
        };
        assert!(matches!(validate_form(form).unwrap_err(), AppError::MissingAudio));

        let form = SubmissionForm {
            ayah: Some("بسم الله".to_string()),
            audio: Some(UploadedAudio {
                filename: None,
                content_type: None,
                bytes: Vec::new(),
            }),
        };
        assert!(matches!(validate_form(form).unwrap_err(), AppError::MissingAudio));
    }

    #[test]
    fn test_validate_form_trims_reference() {
        let form = SubmissionForm {
            ayah: Some("\n abcde \t".to_string()),
            audio: Some(UploadedAudio {
                filename: Some("x.wav".to_string()),
                content_type: None,
                bytes: vec![1],
            }),
        };
        let (reference, audio) = validate_form(form).unwrap();
        assert_eq!(reference.as_str(), "abcde");
        assert_eq!(audio.bytes, vec![1]);
    }
}
