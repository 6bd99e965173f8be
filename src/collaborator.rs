//! Collaborator contracts
//!
//! The page and the report flow only see these traits: the chatbot engine,
//! the ESG data source, the HTML builder and the PDF renderer. Concrete
//! implementations live in [`crate::engine`], [`crate::report`] and
//! [`crate::database`].

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{EsgError, Result};
use crate::filter::{Period, UiContext};
use crate::models::{
    CompanyInfo, ComprehensiveReport, DashboardAggregates, EnvironmentalMetrics,
    GovernanceMetrics, ReportSummary, SocialMetrics,
};

/// Chatbot conversation handle, minted by the engine
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatSessionId(pub String);

impl fmt::Display for ChatSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a generated (not yet exported) report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportId(pub u64);

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What happened during the last streamed response
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamOutcome {
    pub report_generated: bool,
    pub report_id: Option<ReportId>,
}

impl StreamOutcome {
    /// The report to export, if the outcome carries one
    pub fn exportable_report(&self) -> Option<ReportId> {
        if self.report_generated {
            self.report_id
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    Comprehensive,
    CategorySpecific,
}

/// Arguments of the report generation tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportToolRequest {
    pub cmp_num: String,
    pub report_type: ReportType,
    /// Period printed on the report; current year when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<Period>,
}

/// JSON reply of the report generation tool
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportToolReply {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_id: Option<ReportId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ReportToolReply {
    pub fn success(report_id: ReportId) -> Self {
        Self {
            status: "success".to_string(),
            report_id: Some(report_id),
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            report_id: None,
            message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Conversational engine behind the chat page
#[async_trait]
pub trait ChatbotEngine: Send + Sync {
    async fn create_session(&self) -> Result<ChatSessionId>;

    /// Finite stream of text chunks answering `text`
    fn stream_response(
        &self,
        text: &str,
        session: &ChatSessionId,
        context: &UiContext,
    ) -> BoxStream<'static, Result<String>>;

    /// Outcome of the most recent response for `session`
    async fn get_last_outcome(&self, session: &ChatSessionId) -> StreamOutcome;

    async fn export_report_to_pdf(&self, report_id: ReportId) -> Result<PathBuf>;

    /// Report tool; replies with a JSON document (`status`, `report_id`, `message`)
    async fn generate_report_tool(&self, request: ReportToolRequest) -> Result<String>;

    /// Release whatever the engine keeps for `session`
    async fn end_session(&self, _session: &ChatSessionId) {}
}

/// Source of the comprehensive ESG report
#[async_trait]
pub trait EsgDataSource: Send + Sync {
    /// Domain failures are reported through `ComprehensiveReport::error`
    async fn generate_comprehensive_report(&self, cmp_num: &str) -> Result<ComprehensiveReport>;
}

/// Raw aggregates for the dashboard
#[async_trait]
pub trait MetricsSource: Send + Sync {
    async fn dashboard_aggregates(&self, cmp_num: &str) -> Result<Option<DashboardAggregates>>;
}

pub trait ReportHtmlBuilder: Send + Sync {
    fn build_report_html(
        &self,
        company_info: &CompanyInfo,
        period_label: &str,
        summary: &ReportSummary,
        environmental: &EnvironmentalMetrics,
        social: &SocialMetrics,
        governance: &GovernanceMetrics,
    ) -> Result<String>;
}

/// HTML to PDF conversion. The returned path may differ from `out_path`.
#[async_trait]
pub trait PdfRenderer: Send + Sync {
    async fn html_to_pdf(&self, html: &str, out_path: &Path) -> Result<PathBuf>;
}

// ============================================================================
// Adapters
// ============================================================================

/// Any metrics source is also a report data source
pub struct AggregateDataSource<M> {
    metrics: M,
}

impl<M: MetricsSource> AggregateDataSource<M> {
    pub fn new(metrics: M) -> Self {
        Self { metrics }
    }
}

#[async_trait]
impl<M: MetricsSource> EsgDataSource for AggregateDataSource<M> {
    async fn generate_comprehensive_report(&self, cmp_num: &str) -> Result<ComprehensiveReport> {
        match self.metrics.dashboard_aggregates(cmp_num).await? {
            Some(aggregates) => Ok(ComprehensiveReport::from_aggregates(cmp_num, &aggregates)),
            None => Ok(ComprehensiveReport::error(format!(
                "No data registered for company {}",
                cmp_num
            ))),
        }
    }
}

#[async_trait]
impl<T: MetricsSource + ?Sized> MetricsSource for Arc<T> {
    async fn dashboard_aggregates(&self, cmp_num: &str) -> Result<Option<DashboardAggregates>> {
        (**self).dashboard_aggregates(cmp_num).await
    }
}

/// In-memory metrics, keyed by company number
#[derive(Default, Clone)]
pub struct InMemoryMetrics {
    companies: Arc<RwLock<HashMap<String, DashboardAggregates>>>,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, cmp_num: impl Into<String>, aggregates: DashboardAggregates) {
        self.companies.write().await.insert(cmp_num.into(), aggregates);
    }
}

#[async_trait]
impl MetricsSource for InMemoryMetrics {
    async fn dashboard_aggregates(&self, cmp_num: &str) -> Result<Option<DashboardAggregates>> {
        Ok(self.companies.read().await.get(cmp_num).cloned())
    }
}

/// Parse a report tool reply; malformed JSON is a report generation failure
pub fn parse_tool_reply(raw: &str) -> Result<ReportToolReply> {
    serde_json::from_str(raw)
        .map_err(|e| EsgError::ReportGeneration(format!("Malformed tool reply: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EmployeeAggregates;

    #[test]
    fn outcome_requires_flag_and_id() {
        let id = ReportId(3);
        assert_eq!(
            StreamOutcome { report_generated: true, report_id: Some(id) }.exportable_report(),
            Some(id)
        );
        assert_eq!(
            StreamOutcome { report_generated: true, report_id: None }.exportable_report(),
            None
        );
        assert_eq!(
            StreamOutcome { report_generated: false, report_id: Some(id) }.exportable_report(),
            None
        );
    }

    #[test]
    fn tool_reply_parsing() {
        let ok = parse_tool_reply(r#"{"status":"success","report_id":7}"#).unwrap();
        assert!(ok.is_success());
        assert_eq!(ok.report_id, Some(ReportId(7)));

        let failed = parse_tool_reply(r#"{"status":"error","message":"no data"}"#).unwrap();
        assert!(!failed.is_success());
        assert_eq!(failed.message.as_deref(), Some("no data"));

        assert!(matches!(
            parse_tool_reply("not json"),
            Err(EsgError::ReportGeneration(_))
        ));
    }

    #[test]
    fn tool_request_wire_shape() {
        let req = ReportToolRequest {
            cmp_num: "1".into(),
            report_type: ReportType::CategorySpecific,
            period: None,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["report_type"], "category_specific");
        assert!(json.get("period").is_none());

        let req: ReportToolRequest =
            serde_json::from_str(r#"{"cmp_num":"1","report_type":"comprehensive","period":"all_time"}"#).unwrap();
        assert_eq!(req.period, Some(Period::AllTime));
    }

    #[tokio::test]
    async fn aggregate_source_reports_unknown_company() {
        let source = AggregateDataSource::new(InMemoryMetrics::new());
        let report = source.generate_comprehensive_report("42").await.unwrap();
        assert_eq!(report.error.as_deref(), Some("No data registered for company 42"));
    }

    #[tokio::test]
    async fn aggregate_source_builds_report() {
        let metrics = InMemoryMetrics::new();
        metrics
            .insert(
                "42",
                DashboardAggregates {
                    company: Some(CompanyInfo {
                        cmp_num: "42".into(),
                        name: Some("Answer Inc".into()),
                        industry: None,
                        sector: None,
                        address: None,
                        external_directors: None,
                        ethics_policy: false,
                        compliance_policy: true,
                    }),
                    employees: EmployeeAggregates {
                        total: 4,
                        female: 1,
                        male: 3,
                        ..Default::default()
                    },
                    environment: vec![],
                },
            )
            .await;
        let source = AggregateDataSource::new(metrics);
        let report = source.generate_comprehensive_report("42").await.unwrap();
        assert!(report.error.is_none());
        assert_eq!(report.esg_metrics.social.female_ratio, 25.0);
    }
}
