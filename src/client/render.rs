//! Turns a successful response into headed blocks for display.
//!
//! Structured `sections` are preferred. Older gateways only send the marker
//! string, so that is parsed next; if the markers are not all there the
//! report is shown as one block rather than silently mangled.

use crate::report::{ReportSection, SectionKind, TajweedReport};
use tracing::debug;

pub const REPORT_TITLE: &str = "تقرير المحفظ الذكي";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedBlock {
    pub heading: Option<String>,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedReport {
    pub title: String,
    pub blocks: Vec<RenderedBlock>,
}

impl RenderedReport {
    pub fn from_response(report: &str, sections: &[ReportSection]) -> Self {
        if let Some(parsed) = TajweedReport::from_sections(sections) {
            return Self::from_report(&parsed);
        }

        match TajweedReport::parse_marked(report) {
            Ok(parsed) => Self::from_report(&parsed),
            Err(e) => {
                debug!(missing = ?e.missing, "Report markers incomplete, rendering as plain text");
                Self {
                    title: REPORT_TITLE.to_string(),
                    blocks: vec![RenderedBlock {
                        heading: None,
                        body: report.trim().to_string(),
                    }],
                }
            }
        }
    }

    pub fn from_report(report: &TajweedReport) -> Self {
        let blocks = SectionKind::ORDER
            .iter()
            .map(|&kind| RenderedBlock {
                heading: Some(heading(kind)),
                body: report.text(kind).to_string(),
            })
            .collect();

        Self {
            title: REPORT_TITLE.to_string(),
            blocks,
        }
    }

    /// Plain-text layout for terminals and logs.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.title);
        out.push('\n');
        for block in &self.blocks {
            out.push('\n');
            if let Some(heading) = &block.heading {
                out.push_str(heading);
                out.push('\n');
            }
            out.push_str(&block.body);
            out.push('\n');
        }
        out
    }
}

fn heading(kind: SectionKind) -> String {
    format!("{}. {}:", kind.number(), kind.label())
}
