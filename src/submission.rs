//! # Submission Contract
//!
//! Types shared by the submission client and the analysis gateway. Both sides
//! apply exactly the same rules to a recitation submission, so the rules live
//! here once:
//!
//! - **Reference text**: the ayah the user is reciting. It must contain at
//!   least [`MIN_REFERENCE_CHARS`] characters once surrounding whitespace is
//!   trimmed.
//! - **Audio payload**: the recorded take. It must be present and non-empty.
//!
//! ## Rust Concepts:
//! - **Newtype pattern**: `ReferenceText` wraps a `String` so that a value of
//!   this type is always valid. The only way to build one is `ReferenceText::parse`.
//! - **Owned vs borrowed**: `parse` borrows the raw input (`&str`) and only
//!   allocates once the text is known to be valid.

use std::fmt;

/// Minimum number of characters a trimmed reference text must contain.
///
/// Characters are counted as Unicode scalar values, so `"بسم"` is 3 characters
/// even though it takes 6 bytes in UTF-8.
pub const MIN_REFERENCE_CHARS: usize = 5;

/// Multipart field carrying the reference text.
pub const REFERENCE_FIELD: &str = "ayah";

/// Multipart field carrying the recorded audio.
pub const AUDIO_FIELD: &str = "audio_file";

/// File name the client attaches to every recording it uploads.
pub const AUDIO_FILENAME: &str = "talaawa.wav";

/// MIME type the client declares for every recording it uploads.
pub const AUDIO_MIME: &str = "audio/wav";

/// Why a reference text was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    /// Nothing left after trimming.
    Empty,
    /// Some text, but fewer than [`MIN_REFERENCE_CHARS`] characters.
    TooShort { chars: usize },
}

impl fmt::Display for ReferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceError::Empty => write!(f, "reference text is empty"),
            ReferenceError::TooShort { chars } => write!(
                f,
                "reference text has {} characters, at least {} required",
                chars, MIN_REFERENCE_CHARS
            ),
        }
    }
}

impl std::error::Error for ReferenceError {}

/// A trimmed reference passage that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceText(String);

impl ReferenceText {
    /// Trim `raw` and check it against the minimum length rule.
    ///
    /// ## Example:
    /// ```
    /// use tajweed_gateway::submission::ReferenceText;
    ///
    /// assert!(ReferenceText::parse("  بسم الله  ").is_ok());
    /// assert!(ReferenceText::parse("بسم").is_err());
    /// ```
    pub fn parse(raw: &str) -> Result<Self, ReferenceError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ReferenceError::Empty);
        }

        let chars = trimmed.chars().count();
        if chars < MIN_REFERENCE_CHARS {
            return Err(ReferenceError::TooShort { chars });
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of characters (not bytes) in the passage.
    pub fn char_count(&self) -> usize {
        self.0.chars().count()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ReferenceText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Local validation failures detected by the client before any network call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalValidationError {
    /// Reference text missing or shorter than the minimum.
    Reference(ReferenceError),
    /// No recording is held (or it was empty).
    MissingAudio,
}

impl fmt::Display for LocalValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocalValidationError::Reference(_) => {
                write!(f, "Please enter the complete reference ayah.")
            }
            LocalValidationError::MissingAudio => write!(f, "No audio was recorded."),
        }
    }
}

impl std::error::Error for LocalValidationError {}

impl From<ReferenceError> for LocalValidationError {
    fn from(err: ReferenceError) -> Self {
        LocalValidationError::Reference(err)
    }
}

/// A validated, ready-to-send submission.
///
/// Holding a `Submission` means both fields passed local validation. It is
/// consumed by the transport, so one recording is sent at most once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    reference: ReferenceText,
    audio: Vec<u8>,
}

impl Submission {
    /// Validate a reference text and an optional recording.
    ///
    /// The reference text is checked first, matching the order the gateway
    /// applies.
    pub fn new(reference_text: &str, audio: Option<Vec<u8>>) -> Result<Self, LocalValidationError> {
        let reference = ReferenceText::parse(reference_text)?;
        let audio = match audio {
            Some(bytes) if !bytes.is_empty() => bytes,
            _ => return Err(LocalValidationError::MissingAudio),
        };
        Ok(Self { reference, audio })
    }

    pub fn reference(&self) -> &ReferenceText {
        &self.reference
    }

    pub fn audio(&self) -> &[u8] {
        &self.audio
    }

    pub fn into_parts(self) -> (ReferenceText, Vec<u8>) {
        (self.reference, self.audio)
    }
}
