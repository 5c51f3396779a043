//! # Feedback Report and Response Schema
//!
//! The gateway answers every submission with an [`AnalysisResponse`]:
//!
//! ```json
//! { "status": "success", "report": "1. **الخطأ:** ...", "sections": [ ... ] }
//! { "status": "error", "message": "No audio recording was provided.", "code": "missing_audio" }
//! ```
//!
//! A successful report always has three sections in a fixed order:
//! error identified, practical correction, applicable rule. The sections are
//! sent twice: as the numbered marker string (`report`) that older renderers
//! split on, and as a typed list (`sections`) that needs no string matching.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The three report sections, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    ErrorIdentified,
    PracticalCorrection,
    ApplicableRule,
}

impl SectionKind {
    pub const ORDER: [SectionKind; 3] = [
        SectionKind::ErrorIdentified,
        SectionKind::PracticalCorrection,
        SectionKind::ApplicableRule,
    ];

    /// 1-based position in the report.
    pub fn number(self) -> usize {
        match self {
            SectionKind::ErrorIdentified => 1,
            SectionKind::PracticalCorrection => 2,
            SectionKind::ApplicableRule => 3,
        }
    }

    /// Heading shown to the reciter.
    pub fn label(self) -> &'static str {
        match self {
            SectionKind::ErrorIdentified => "الخطأ",
            SectionKind::PracticalCorrection => "التصحيح العملي",
            SectionKind::ApplicableRule => "القاعدة التجويدية",
        }
    }

    /// Literal marker that opens this section in the report string,
    /// e.g. `2. **التصحيح العملي:**`.
    pub fn marker(self) -> String {
        format!("{}. **{}:**", self.number(), self.label())
    }
}

/// One labelled section as sent on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSection {
    pub kind: SectionKind,
    pub label: String,
    pub text: String,
}

/// A complete three-section Tajweed feedback report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TajweedReport {
    pub error_identified: String,
    pub practical_correction: String,
    pub applicable_rule: String,
}

/// The report string did not contain the three markers in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFormatError {
    pub missing: SectionKind,
}

impl fmt::Display for ReportFormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "report is missing section marker `{}`", self.missing.marker())
    }
}

impl std::error::Error for ReportFormatError {}

impl TajweedReport {
    pub fn new(
        error_identified: impl Into<String>,
        practical_correction: impl Into<String>,
        applicable_rule: impl Into<String>,
    ) -> Self {
        Self {
            error_identified: error_identified.into(),
            practical_correction: practical_correction.into(),
            applicable_rule: applicable_rule.into(),
        }
    }

    pub fn text(&self, kind: SectionKind) -> &str {
        match kind {
            SectionKind::ErrorIdentified => &self.error_identified,
            SectionKind::PracticalCorrection => &self.practical_correction,
            SectionKind::ApplicableRule => &self.applicable_rule,
        }
    }

    /// Sections in display order.
    pub fn sections(&self) -> Vec<ReportSection> {
        SectionKind::ORDER
            .iter()
            .map(|&kind| ReportSection {
                kind,
                label: kind.label().to_string(),
                text: self.text(kind).to_string(),
            })
            .collect()
    }

    /// Render the numbered marker form, one section per line.
    pub fn to_marked_text(&self) -> String {
        SectionKind::ORDER
            .iter()
            .map(|&kind| format!("{} {}", kind.marker(), self.text(kind)))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Split a marker-formatted report back into its three sections.
    ///
    /// Markers must appear in order. Text before the first marker is ignored;
    /// each section body runs up to the next marker and is trimmed.
    pub fn parse_marked(text: &str) -> Result<Self, ReportFormatError> {
        let mut bodies: Vec<String> = Vec::with_capacity(3);
        let mut rest = text;

        for (index, &kind) in SectionKind::ORDER.iter().enumerate() {
            let marker = kind.marker();
            let start = rest
                .find(&marker)
                .ok_or(ReportFormatError { missing: kind })?;
            let after = &rest[start + marker.len()..];

            let end = match SectionKind::ORDER.get(index + 1) {
                Some(next) => after
                    .find(&next.marker())
                    .ok_or(ReportFormatError { missing: *next })?,
                None => after.len(),
            };

            bodies.push(after[..end].trim().to_string());
            rest = &after[end..];
        }

        let mut bodies = bodies.into_iter();
        Ok(Self {
            error_identified: bodies.next().unwrap_or_default(),
            practical_correction: bodies.next().unwrap_or_default(),
            applicable_rule: bodies.next().unwrap_or_default(),
        })
    }

    /// Rebuild a report from a typed section list.
    ///
    /// Returns `None` unless the list holds exactly the three kinds in order.
    pub fn from_sections(sections: &[ReportSection]) -> Option<Self> {
        if sections.len() != SectionKind::ORDER.len() {
            return None;
        }
        let in_order = sections
            .iter()
            .zip(SectionKind::ORDER.iter())
            .all(|(section, kind)| section.kind == *kind);
        if !in_order {
            return None;
        }
        Some(Self::new(
            sections[0].text.clone(),
            sections[1].text.clone(),
            sections[2].text.clone(),
        ))
    }
}

/// Body of every `/analyze-tajweed` response.
///
/// The `status` tag decides which payload exists, so a response can never
/// carry both a report and a message, or neither.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum AnalysisResponse {
    Success {
        report: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        sections: Vec<ReportSection>,
    },
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },
}

impl AnalysisResponse {
    pub fn success(report: &TajweedReport) -> Self {
        AnalysisResponse::Success {
            report: report.to_marked_text(),
            sections: report.sections(),
        }
    }

    pub fn error(message: impl Into<String>, code: Option<&str>) -> Self {
        AnalysisResponse::Error {
            message: message.into(),
            code: code.map(str::to_string),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AnalysisResponse::Success { .. })
    }

    pub fn report(&self) -> Option<&str> {
        match self {
            AnalysisResponse::Success { report, .. } => Some(report),
            AnalysisResponse::Error { .. } => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            AnalysisResponse::Success { .. } => None,
            AnalysisResponse::Error { message, .. } => Some(message),
        }
    }
}
