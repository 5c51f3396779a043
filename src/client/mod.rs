//! # Submission Client
//!
//! Records one recitation, validates it against the reference text, posts
//! it to the gateway and renders the reply.
//!
//! ## Module Organization:
//! - **capture**: the capture device abstraction
//! - **transport**: sending a submission (HTTP multipart)
//! - **render**: report → headed blocks
//! - **view**: where status, reports and errors are shown
//! - **session**: the `RecitationClient` state machine tying it together

pub mod capture;
pub mod render;
pub mod session;
pub mod transport;
pub mod view;

pub use capture::{AudioCapture, CaptureError, FileCapture, Recording};
pub use render::{RenderedBlock, RenderedReport};
pub use session::{ClientError, ClientState, RecitationClient, SubmissionOutcome};
pub use transport::{GatewayReply, HttpTransport, SubmissionTransport, TransportError};
pub use view::{ClientView, StatusTone, TerminalView};
