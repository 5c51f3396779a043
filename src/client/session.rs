//! # Recitation Client
//!
//! One value holds the whole client: the reference text, the recording in
//! progress, and the current state. There is no other client state.
//!
//! ## States:
//! ```text
//! Idle --begin_recording--> Recording --end_recording--> Analyzing --> Idle
//! ```
//! Every attempt ends in `Idle`, whatever the outcome, with the audio
//! payload dropped. The trigger is disabled for the whole of `Analyzing`.
//!
//! ## Rust Concepts:
//! - **Generics over traits**: capture, transport and view are type
//!   parameters, so tests plug in fakes without any dynamic dispatch
//! - **Move semantics**: the payload moves into the `Submission`, then into
//!   the transport, so it cannot outlive the attempt

use super::capture::{AudioCapture, CaptureError, Recording};
use super::render::RenderedReport;
use super::transport::{GatewayReply, SubmissionTransport, TransportError};
use super::view::{ClientView, StatusTone};
use crate::report::AnalysisResponse;
use crate::submission::{LocalValidationError, Submission};
use std::fmt;
use tracing::{debug, info, warn};

pub const TRIGGER_START: &str = "ابدأ التسجيل والتحليل";
pub const TRIGGER_STOP: &str = "إيقاف التسجيل";
pub const TRIGGER_ANALYZING: &str = "جاري التحليل...";

const STATUS_READY: &str = "جاهز للبدء. الرجاء إدخال الآية.";
const STATUS_RECORDING: &str = "🟢 جاري التسجيل. انقر للإيقاف.";
const STATUS_ANALYZING: &str = "جاري التحليل... (🔴)";
const STATUS_DONE: &str = "✅ اكتمل التحليل بنجاح!";
const STATUS_MIC_DENIED: &str = "❌ فشل الوصول للميكروفون. يرجى السماح بالوصول.";
const STATUS_CONNECTIVITY: &str = "❌ فشل الاتصال بالخادم. تحقق من الرابط.";
const STATUS_FAILED: &str = "❌ لم يكتمل التحليل.";

/// Shown for a failed reply that carries no message of its own.
pub const GENERIC_SERVER_ERROR: &str = "حدث خطأ في الخادم.";
/// Shown for a 2xx reply that is neither a report nor an error.
pub const UNEXPECTED_RESPONSE: &str = "وصل رد غير متوقع من الخادم.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Idle,
    Recording,
    Analyzing,
}

#[derive(Debug)]
pub enum ClientError {
    /// The capture device could not be opened.
    PermissionDenied(CaptureError),
    /// An analysis is already in flight.
    Busy,
    /// `end_recording` without a recording in progress.
    NotRecording,
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::PermissionDenied(e) => write!(f, "{}", e),
            ClientError::Busy => write!(f, "an analysis is already in progress"),
            ClientError::NotRecording => write!(f, "no recording in progress"),
        }
    }
}

impl std::error::Error for ClientError {}

/// How one submission attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// The gateway returned a report.
    Report(RenderedReport),
    /// The gateway answered with an error.
    Rejected { status: u16, message: String },
    /// No reply was received.
    Connectivity(String),
    /// Validation failed before anything was sent.
    LocalValidation(LocalValidationError),
    /// A 2xx reply that could not be understood.
    Unexpected { status: u16 },
}

impl SubmissionOutcome {
    pub fn is_report(&self) -> bool {
        matches!(self, SubmissionOutcome::Report(_))
    }
}

pub struct RecitationClient<C, T, V> {
    capture: C,
    transport: T,
    view: V,
    reference_text: String,
    state: ClientState,
    recording: Option<Box<dyn Recording>>,
}

impl<C, T, V> RecitationClient<C, T, V>
where
    C: AudioCapture,
    T: SubmissionTransport,
    V: ClientView,
{
    pub fn new(capture: C, transport: T, mut view: V) -> Self {
        view.set_trigger(TRIGGER_START, true);
        view.show_status(STATUS_READY, StatusTone::Neutral);

        Self {
            capture,
            transport,
            view,
            reference_text: String::new(),
            state: ClientState::Idle,
            recording: None,
        }
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn set_reference_text(&mut self, text: impl Into<String>) {
        self.reference_text = text.into();
    }

    pub fn reference_text(&self) -> &str {
        &self.reference_text
    }

    /// What pressing the single trigger does in the current state.
    ///
    /// Returns the outcome when the press ended a recording.
    pub async fn press_trigger(&mut self) -> Result<Option<SubmissionOutcome>, ClientError> {
        match self.state {
            ClientState::Idle => self.begin_recording().map(|_| None),
            ClientState::Recording => self.end_recording().await.map(Some),
            ClientState::Analyzing => Err(ClientError::Busy),
        }
    }

    /// Open the capture device and start recording.
    pub fn begin_recording(&mut self) -> Result<(), ClientError> {
        if self.state != ClientState::Idle {
            return Err(ClientError::Busy);
        }

        // A new attempt replaces whatever the last one showed
        self.view.clear_report();

        match self.capture.start() {
            Ok(recording) => {
                self.recording = Some(recording);
                self.state = ClientState::Recording;
                self.view.set_trigger(TRIGGER_STOP, true);
                self.view.show_status(STATUS_RECORDING, StatusTone::Active);
                info!("Recording started");
                Ok(())
            }
            Err(e) => {
                warn!("Capture device unavailable: {}", e);
                self.view.show_status(STATUS_MIC_DENIED, StatusTone::Failure);
                Err(ClientError::PermissionDenied(e))
            }
        }
    }

    /// Stop recording, release the device, and submit straight away.
    pub async fn end_recording(&mut self) -> Result<SubmissionOutcome, ClientError> {
        let recording = match (self.state, self.recording.take()) {
            (ClientState::Recording, Some(recording)) => recording,
            (ClientState::Analyzing, _) => return Err(ClientError::Busy),
            _ => return Err(ClientError::NotRecording),
        };

        self.enter_analyzing();
        let audio = recording.stop();
        debug!(audio_bytes = audio.len(), "Recording stopped, device released");

        Ok(self.submit(Some(audio)).await)
    }

    /// Validate locally, then send one request.
    ///
    /// Nothing is sent when validation fails. The client is `Idle` when
    /// this returns.
    pub async fn submit(&mut self, audio: Option<Vec<u8>>) -> SubmissionOutcome {
        let submission = match Submission::new(&self.reference_text, audio) {
            Ok(submission) => submission,
            Err(e) => {
                warn!("Submission rejected locally: {}", e);
                let message = e.to_string();
                self.view.show_status(&format!("❌ {}", message), StatusTone::Failure);
                self.view.show_error(&message);
                self.finish();
                return SubmissionOutcome::LocalValidation(e);
            }
        };

        // Already analyzing when called from `end_recording`
        if self.state != ClientState::Analyzing {
            self.enter_analyzing();
        }
        let outcome = match self.transport.send(submission).await {
            Ok(reply) => interpret(reply),
            Err(e) => connectivity(e),
        };

        self.present(&outcome);
        self.finish();
        outcome
    }

    fn enter_analyzing(&mut self) {
        self.state = ClientState::Analyzing;
        self.view.set_trigger(TRIGGER_ANALYZING, false);
        self.view.show_status(STATUS_ANALYZING, StatusTone::Active);
    }

    fn present(&mut self, outcome: &SubmissionOutcome) {
        match outcome {
            SubmissionOutcome::Report(report) => {
                self.view.show_report(report);
                self.view.show_status(STATUS_DONE, StatusTone::Success);
            }
            SubmissionOutcome::Rejected { message, .. } => {
                self.view.show_error(message);
                self.view.show_status(STATUS_FAILED, StatusTone::Failure);
            }
            SubmissionOutcome::Connectivity(_) => {
                self.view.show_status(STATUS_CONNECTIVITY, StatusTone::Failure);
            }
            SubmissionOutcome::Unexpected { .. } => {
                self.view.show_error(UNEXPECTED_RESPONSE);
                self.view.show_status(STATUS_FAILED, StatusTone::Failure);
            }
            // Shown before anything was sent
            SubmissionOutcome::LocalValidation(_) => {}
        }
    }

    fn finish(&mut self) {
        self.recording = None;
        self.state = ClientState::Idle;
        self.view.set_trigger(TRIGGER_START, true);
    }
}

fn connectivity(e: TransportError) -> SubmissionOutcome {
    warn!("Gateway unreachable: {}", e);
    SubmissionOutcome::Connectivity(e.to_string())
}

fn interpret(reply: GatewayReply) -> SubmissionOutcome {
    let status = reply.status;
    match (reply.is_success(), reply.body) {
        (true, Some(AnalysisResponse::Success { report, sections })) => {
            SubmissionOutcome::Report(RenderedReport::from_response(&report, &sections))
        }
        (true, Some(AnalysisResponse::Error { message, .. })) => {
            SubmissionOutcome::Rejected { status, message }
        }
        (true, None) => SubmissionOutcome::Unexpected { status },
        (false, Some(AnalysisResponse::Error { message, .. })) if !message.is_empty() => {
            SubmissionOutcome::Rejected { status, message }
        }
        (false, _) => SubmissionOutcome::Rejected {
            status,
            message: GENERIC_SERVER_ERROR.to_string(),
        },
    }
}
