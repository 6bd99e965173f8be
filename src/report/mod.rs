//! Report export flow
//!
//! Drives the chatbot's report tool, exports the resulting report to PDF and
//! resolves downloads of the last produced artifact.

pub mod html;
pub mod naming;
pub mod pdf;

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::collaborator::{parse_tool_reply, ChatbotEngine, ReportId, ReportToolRequest, ReportType};
use crate::error::{EsgError, Result};
use crate::filter::{Category, Period};

pub use html::HandlebarsReportBuilder;
pub use pdf::{CommandPdfRenderer, ReportPipeline};

/// A generated PDF and its display title
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportArtifact {
    pub path: PathBuf,
    pub title: String,
}

impl ReportArtifact {
    pub fn from_path(path: PathBuf) -> Self {
        let title = naming::report_title(&path);
        Self { path, title }
    }
}

/// `comprehensive` unless a specific ESG category is selected
pub fn report_type_for(category: Option<Category>) -> ReportType {
    match category {
        None | Some(Category::All) => ReportType::Comprehensive,
        Some(_) => ReportType::CategorySpecific,
    }
}

/// Generate a report through the chatbot's tool and export it to PDF
pub async fn generate_and_export(
    chatbot: &dyn ChatbotEngine,
    cmp_num: &str,
    category: Option<Category>,
    period: Option<Period>,
) -> Result<ReportArtifact> {
    let request = ReportToolRequest {
        cmp_num: cmp_num.to_string(),
        report_type: report_type_for(category),
        period,
    };
    tracing::info!(cmp_num, report_type = ?request.report_type, ?period, "generating report");

    let raw = chatbot.generate_report_tool(request).await?;
    let reply = parse_tool_reply(&raw)?;

    if !reply.is_success() {
        let message = reply
            .message
            .unwrap_or_else(|| format!("tool returned status '{}'", reply.status));
        return Err(EsgError::ReportGeneration(message));
    }
    let report_id = reply
        .report_id
        .ok_or_else(|| EsgError::ReportGeneration("No report id was returned".to_string()))?;

    export(chatbot, report_id).await
}

/// Export an existing report to PDF
pub async fn export(chatbot: &dyn ChatbotEngine, report_id: ReportId) -> Result<ReportArtifact> {
    let path = chatbot.export_report_to_pdf(report_id).await?;
    tracing::info!(%report_id, path = %path.display(), "report exported");
    Ok(ReportArtifact::from_path(path))
}

/// The file to transfer for a download request
pub async fn resolve_download(last_report: Option<&Path>) -> Result<PathBuf> {
    let Some(path) = last_report else {
        return Err(EsgError::DownloadUnavailable(
            "No report has been generated yet.".to_string(),
        ));
    };
    match tokio::fs::try_exists(path).await {
        Ok(true) => Ok(path.to_path_buf()),
        _ => Err(EsgError::DownloadUnavailable(format!(
            "Report file not found: {}",
            path.display()
        ))),
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    use super::*;
    use crate::collaborator::{ChatSessionId, StreamOutcome};
    use crate::filter::UiContext;
    use async_trait::async_trait;
    use futures::stream::BoxStream;
    use std::sync::Mutex;

    /// Chatbot whose replies are scripted per test
    pub struct ScriptedChatbot {
        pub chunks: Vec<std::result::Result<String, String>>,
        pub outcome: StreamOutcome,
        pub tool_reply: String,
        pub export_path: PathBuf,
        pub export_fails: bool,
        pub exports: Mutex<Vec<ReportId>>,
        pub tool_requests: Mutex<Vec<ReportToolRequest>>,
        pub queries: Mutex<Vec<(String, UiContext)>>,
    }

    impl Default for ScriptedChatbot {
        fn default() -> Self {
            Self {
                chunks: Vec::new(),
                outcome: StreamOutcome::default(),
                tool_reply: r#"{"status":"success","report_id":1}"#.to_string(),
                export_path: PathBuf::from("generated_reports/ESG_Report_Acme_2025-01-02_03-04-05.pdf"),
                export_fails: false,
                exports: Mutex::new(Vec::new()),
                tool_requests: Mutex::new(Vec::new()),
                queries: Mutex::new(Vec::new()),
            }
        }
    }

    impl ScriptedChatbot {
        pub fn export_count(&self) -> usize {
            self.exports.lock().map(|e| e.len()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl ChatbotEngine for ScriptedChatbot {
        async fn create_session(&self) -> Result<ChatSessionId> {
            Ok(ChatSessionId("scripted".to_string()))
        }

        fn stream_response(
            &self,
            text: &str,
            _session: &ChatSessionId,
            context: &UiContext,
        ) -> BoxStream<'static, Result<String>> {
            if let Ok(mut q) = self.queries.lock() {
                q.push((text.to_string(), *context));
            }
            let items: Vec<Result<String>> = self
                .chunks
                .iter()
                .map(|c| c.clone().map_err(EsgError::Streaming))
                .collect();
            Box::pin(futures::stream::iter(items))
        }

        async fn get_last_outcome(&self, _session: &ChatSessionId) -> StreamOutcome {
            self.outcome
        }

        async fn export_report_to_pdf(&self, report_id: ReportId) -> Result<PathBuf> {
            if let Ok(mut e) = self.exports.lock() {
                e.push(report_id);
            }
            if self.export_fails {
                return Err(EsgError::Pdf("renderer unavailable".to_string()));
            }
            Ok(self.export_path.clone())
        }

        async fn generate_report_tool(&self, request: ReportToolRequest) -> Result<String> {
            if let Ok(mut r) = self.tool_requests.lock() {
                r.push(request);
            }
            Ok(self.tool_reply.clone())
        }
    }
}
