//! # Client View
//!
//! Everything the client shows goes through [`ClientView`]: the trigger
//! control, a one-line status, and the report area (a report or an error).
//! A browser page, a terminal, or a test recorder can sit behind it.

use super::render::RenderedReport;
use std::io::Write;
use tracing::warn;

/// Colour hint for the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTone {
    Neutral,
    Active,
    Success,
    Failure,
}

pub trait ClientView {
    /// Update the single start/stop trigger.
    fn set_trigger(&mut self, label: &str, enabled: bool);
    fn show_status(&mut self, text: &str, tone: StatusTone);
    fn show_report(&mut self, report: &RenderedReport);
    fn show_error(&mut self, message: &str);
    fn clear_report(&mut self);
}

/// Writes view updates as lines to any `Write` sink (usually stdout).
pub struct TerminalView<W: Write> {
    out: W,
}

impl<W: Write> TerminalView<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{}", text) {
            warn!("Failed to write to terminal: {}", e);
        }
    }
}

impl<W: Write> ClientView for TerminalView<W> {
    // A terminal has nothing to press; the trigger only matters to a UI.
    fn set_trigger(&mut self, _label: &str, _enabled: bool) {}

    fn show_status(&mut self, text: &str, tone: StatusTone) {
        let prefix = match tone {
            StatusTone::Neutral => "   ",
            StatusTone::Active => "...",
            StatusTone::Success => "[ok]",
            StatusTone::Failure => "[!!]",
        };
        self.line(&format!("{} {}", prefix, text));
    }

    fn show_report(&mut self, report: &RenderedReport) {
        self.line("");
        self.line(report.to_text().trim_end());
    }

    fn show_error(&mut self, message: &str) {
        self.line(&format!("❌ خطأ: {}", message));
    }

    fn clear_report(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::TajweedReport;

    #[test]
    fn test_terminal_view_writes_report_and_error() {
        let mut view = TerminalView::new(Vec::new());
        view.show_status("done", StatusTone::Success);
        view.show_report(&RenderedReport::from_report(&TajweedReport::new("a", "b", "c")));
        view.show_error("boom");

        let text = String::from_utf8(view.into_inner()).unwrap();
        assert!(text.contains("[ok] done"));
        assert!(text.contains("2. التصحيح العملي:\nb"));
        assert!(text.ends_with("❌ خطأ: boom\n"));
    }
}
