//! # Audio Handling
//!
//! Inspection of uploaded recordings before they reach the analyzer.
//!
//! The gateway accepts whatever the browser recorded. Nothing here rejects a
//! submission; probing only tells the logs and the analyzer what arrived.

pub mod probe;

pub use probe::{probe, AudioContainer, AudioInfo, WavFormat};
