//! Fixed-response analyzer.
//!
//! Stands in for a real recognition backend. It checks that the stored
//! recording exists and is non-empty, then answers with the same report for
//! every submission.

use super::{AnalysisError, AnalysisRequest, RecitationAnalyzer};
use crate::report::TajweedReport;
use async_trait::async_trait;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct CannedAnalyzer {
    report: TajweedReport,
}

impl CannedAnalyzer {
    pub fn new(report: TajweedReport) -> Self {
        Self { report }
    }
}

impl Default for CannedAnalyzer {
    fn default() -> Self {
        Self::new(TajweedReport::new(
            "نطق حرف \"الراء\" كان مفخمًا في كلمة \"الرحيم\" بينما يجب أن يكون مرققًا.",
            "انطق حرف \"الراء\" مرققًا (خفيفًا) في كلمة \"الرحيم\" دون تفخيم، وأبقِ اللسان قريبًا من الأسنان الأمامية.",
            "قاعدة الترقيق: يُرقق حرف الراء إذا جاء مكسورًا أو جاء بعد كسر أصلي غير مفصول بحرف استعلاء. في \"الرَّحِيمِ\" الراء مكسورة، لذا يجب ترقيقها.",
        ))
    }
}

#[async_trait]
impl RecitationAnalyzer for CannedAnalyzer {
    fn name(&self) -> &'static str {
        "canned"
    }

    async fn analyze(&self, request: AnalysisRequest<'_>) -> Result<TajweedReport, AnalysisError> {
        let metadata = tokio::fs::metadata(request.audio_path).await?;
        if metadata.len() == 0 {
            return Err(AnalysisError::Backend("recording is empty".to_string()));
        }

        debug!(
            reference_chars = request.reference.char_count(),
            container = request.audio.container.as_str(),
            size_bytes = metadata.len(),
            "Returning canned report"
        );

        Ok(self.report.clone())
    }
}
