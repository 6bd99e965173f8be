//! Built-in reporting chatbot
//!
//! A deterministic [`ChatbotEngine`] over the report pipeline. Intent comes
//! from the selected filter when there is one, otherwise from keywords in the
//! message. Answers are assembled from the comprehensive report and streamed
//! word by word. Generated reports are kept in memory until exported, and at
//! most [`MAX_PENDING_REPORTS`] of them at a time.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::collaborator::{
    ChatSessionId, ChatbotEngine, ReportId, ReportToolReply, ReportToolRequest, ReportType,
    StreamOutcome,
};
use crate::error::{EsgError, Result};
use crate::filter::{Category, Intent, Period, UiContext};
use crate::models::ComprehensiveReport;
use crate::report::ReportPipeline;

/// Unexported reports kept before the oldest is evicted
pub const MAX_PENDING_REPORTS: usize = 32;

/// What a message asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatIntent {
    Filter(Intent),
    General,
}

/// Intent from the selected filter, else from message keywords
pub fn classify(text: &str, context: &UiContext) -> ChatIntent {
    if let Some(intent) = context.selected_intent {
        return ChatIntent::Filter(intent);
    }
    let lower = text.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| lower.contains(w));

    if has(&["gap", "missing", "completeness"]) {
        ChatIntent::Filter(Intent::DataGaps)
    } else if has(&["report", "generate"]) {
        ChatIntent::Filter(Intent::ReportGeneration)
    } else if has(&["analy", "trend", "compare", "benchmark"]) {
        ChatIntent::Filter(Intent::AnalysisRequest)
    } else if has(&["data", "show", "status", "metric"]) {
        ChatIntent::Filter(Intent::DataQuery)
    } else {
        ChatIntent::General
    }
}

#[derive(Debug, Clone)]
struct StoredReport {
    cmp_num: String,
    report_type: ReportType,
    period: Period,
    report: ComprehensiveReport,
    created_at: DateTime<Utc>,
}

struct EngineInner {
    pipeline: ReportPipeline,
    cmp_num: String,
    outcomes: RwLock<HashMap<ChatSessionId, StreamOutcome>>,
    reports: RwLock<HashMap<ReportId, StoredReport>>,
    next_report_id: AtomicU64,
}

/// Deterministic chatbot for one company
#[derive(Clone)]
pub struct ReportingChatbot {
    inner: Arc<EngineInner>,
}

impl ReportingChatbot {
    pub fn new(pipeline: ReportPipeline, cmp_num: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                pipeline,
                cmp_num: cmp_num.into(),
                outcomes: RwLock::new(HashMap::new()),
                reports: RwLock::new(HashMap::new()),
                next_report_id: AtomicU64::new(1),
            }),
        }
    }

    pub async fn session_count(&self) -> usize {
        self.inner.outcomes.read().await.len()
    }

    /// Reports generated but not yet exported
    pub async fn pending_reports(&self) -> usize {
        self.inner.reports.read().await.len()
    }
}

impl EngineInner {
    async fn store_report(
        &self,
        cmp_num: &str,
        report_type: ReportType,
        period: Period,
    ) -> Result<ReportId> {
        let report = self.pipeline.fetch(cmp_num).await?;
        let id = ReportId(self.next_report_id.fetch_add(1, Ordering::SeqCst));
        let mut reports = self.reports.write().await;
        reports.insert(
            id,
            StoredReport {
                cmp_num: cmp_num.to_string(),
                report_type,
                period,
                report,
                created_at: Utc::now(),
            },
        );
        while reports.len() > MAX_PENDING_REPORTS {
            // Ids are handed out in order, so the smallest is the oldest
            let Some(oldest) = reports.keys().min().copied() else {
                break;
            };
            reports.remove(&oldest);
            tracing::warn!(report_id = %oldest, "unexported report evicted");
        }
        tracing::info!(report_id = %id, cmp_num, ?report_type, ?period, "report stored");
        Ok(id)
    }

    /// Record `outcome` for a session that is still open
    async fn record_outcome(&self, session: &ChatSessionId, outcome: StreamOutcome) {
        if let Some(slot) = self.outcomes.write().await.get_mut(session) {
            *slot = outcome;
        }
    }

    async fn answer(&self, text: &str, session: &ChatSessionId, context: &UiContext) -> Result<String> {
        self.record_outcome(session, StreamOutcome::default()).await;

        let intent = classify(text, context);
        tracing::debug!(%session, ?intent, "answering");

        let report = match self.pipeline.fetch(&self.cmp_num).await {
            Ok(report) => report,
            Err(EsgError::UpstreamData(message)) => {
                tracing::warn!(cmp_num = %self.cmp_num, %message, "no company data");
                return Ok(no_data_text(&self.cmp_num));
            }
            Err(e) => return Err(e),
        };

        let answer = match intent {
            ChatIntent::Filter(Intent::ReportGeneration) => {
                let report_type = crate::report::report_type_for(Some(context.selected_category));
                let id = self
                    .store_report(&self.cmp_num, report_type, context.selected_period)
                    .await?;
                self.record_outcome(
                    session,
                    StreamOutcome {
                        report_generated: true,
                        report_id: Some(id),
                    },
                )
                .await;
                format!(
                    "The ESG report for {} has been generated (report #{}).",
                    company_name(&report),
                    id
                )
            }
            ChatIntent::Filter(Intent::DataQuery) => data_text(&report, context.selected_category),
            ChatIntent::Filter(Intent::AnalysisRequest) | ChatIntent::Filter(Intent::Benchmarking) => {
                analysis_text(&report, context.selected_category)
            }
            ChatIntent::Filter(Intent::DataGaps) => gaps_text(&report),
            ChatIntent::General => general_text(&report),
        };
        Ok(answer)
    }
}

#[async_trait]
impl ChatbotEngine for ReportingChatbot {
    async fn create_session(&self) -> Result<ChatSessionId> {
        let id = ChatSessionId(Uuid::new_v4().to_string());
        self.inner
            .outcomes
            .write()
            .await
            .insert(id.clone(), StreamOutcome::default());
        Ok(id)
    }

    fn stream_response(
        &self,
        text: &str,
        session: &ChatSessionId,
        context: &UiContext,
    ) -> BoxStream<'static, Result<String>> {
        let inner = self.inner.clone();
        let text = text.to_string();
        let session = session.clone();
        let context = *context;

        stream::once(async move { inner.answer(&text, &session, &context).await })
            .flat_map(|answer| match answer {
                Ok(answer) => {
                    let words: Vec<Result<String>> = answer
                        .split_inclusive(' ')
                        .map(|w| Ok(w.to_string()))
                        .collect();
                    stream::iter(words).boxed()
                }
                Err(e) => stream::iter(vec![Err(e)]).boxed(),
            })
            .boxed()
    }

    async fn get_last_outcome(&self, session: &ChatSessionId) -> StreamOutcome {
        self.inner
            .outcomes
            .read()
            .await
            .get(session)
            .copied()
            .unwrap_or_default()
    }

    async fn export_report_to_pdf(&self, report_id: ReportId) -> Result<PathBuf> {
        let stored = self
            .inner
            .reports
            .read()
            .await
            .get(&report_id)
            .cloned()
            .ok_or_else(|| EsgError::ReportGeneration(format!("Report {} not found", report_id)))?;

        tracing::info!(
            %report_id,
            cmp_num = %stored.cmp_num,
            report_type = ?stored.report_type,
            created_at = %stored.created_at,
            "exporting report"
        );
        let path = self
            .inner
            .pipeline
            .render(&stored.cmp_num, &stored.report, stored.period)
            .await?;
        self.inner.reports.write().await.remove(&report_id);
        Ok(path)
    }

    async fn generate_report_tool(&self, request: ReportToolRequest) -> Result<String> {
        let reply = match self
            .inner
            .store_report(
                &request.cmp_num,
                request.report_type,
                request.period.unwrap_or_default(),
            )
            .await
        {
            Ok(id) => ReportToolReply::success(id),
            Err(e) => {
                tracing::warn!(cmp_num = %request.cmp_num, error = %e, "report tool failed");
                ReportToolReply::failure(e.to_string())
            }
        };
        Ok(serde_json::to_string(&reply)?)
    }

    async fn end_session(&self, session: &ChatSessionId) {
        if self.inner.outcomes.write().await.remove(session).is_some() {
            tracing::debug!(%session, "chat session ended");
        }
    }
}

// ============================================================================
// Answer text
// ============================================================================

fn company_name(report: &ComprehensiveReport) -> String {
    report
        .company_info
        .as_ref()
        .map(|c| c.display_name().to_string())
        .unwrap_or_else(|| "the company".to_string())
}

fn no_data_text(cmp_num: &str) -> String {
    format!(
        "No ESG data is registered for company {}. Please register company, employee \
         and environmental data before asking again.",
        cmp_num
    )
}

fn fmt_opt(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{:.0} {}", v, unit),
        None => "N/A".to_string(),
    }
}

fn data_text(report: &ComprehensiveReport, category: Category) -> String {
    let m = &report.esg_metrics;
    let mut out = format!("ESG data for {}:\n", company_name(report));
    if matches!(category, Category::All | Category::Environmental) {
        let _ = writeln!(
            out,
            "Environmental: energy use {} (year {}), emissions {}.",
            fmt_opt(m.environmental.energy_use, "kWh"),
            m.environmental
                .latest_year
                .map(|y| y.to_string())
                .unwrap_or_else(|| "N/A".to_string()),
            fmt_opt(m.environmental.green_use, "tCO2e"),
        );
    }
    if matches!(category, Category::All | Category::Social) {
        let _ = writeln!(
            out,
            "Social: {} active employees, {:.1}% female, {} accidents ({:.2}%).",
            m.social.total_employees,
            m.social.female_ratio,
            m.social.total_accidents,
            m.social.accident_rate,
        );
    }
    if matches!(category, Category::All | Category::Governance) {
        let _ = writeln!(
            out,
            "Governance: {} board members, {} external directors, ethics policy {}, compliance policy {}.",
            m.governance.board_members,
            m.governance
                .external_directors
                .map(|n| n.to_string())
                .unwrap_or_else(|| "N/A".to_string()),
            yes_no(m.governance.ethics_policy),
            yes_no(m.governance.compliance_policy),
        );
    }
    out.trim_end().to_string()
}

fn analysis_text(report: &ComprehensiveReport, category: Category) -> String {
    let m = &report.esg_metrics;
    let mut out = format!("ESG analysis for {}:\n", company_name(report));
    if matches!(category, Category::All | Category::Environmental) {
        match m.environmental.energy_trend {
            Some(trend) if trend < 0.0 => {
                let _ = writeln!(out, "Energy use fell {:.1}% against the previous year.", -trend);
            }
            Some(trend) => {
                let _ = writeln!(out, "Energy use rose {:.1}% against the previous year.", trend);
            }
            None => {
                let _ = writeln!(out, "Not enough environmental history for a trend.");
            }
        }
    }
    if matches!(category, Category::All | Category::Social) {
        let safety = if m.social.total_accidents == 0 {
            "an accident-free workplace".to_string()
        } else {
            format!("an accident rate of {:.2}%", m.social.accident_rate)
        };
        let _ = writeln!(
            out,
            "Workforce diversity stands at {:.1}% female with {}.",
            m.social.female_ratio, safety
        );
    }
    if matches!(category, Category::All | Category::Governance) {
        let policies = report.summary.policies.len();
        let _ = writeln!(out, "{} of 2 governance policies are in operation.", policies);
    }
    out.trim_end().to_string()
}

fn gaps_text(report: &ComprehensiveReport) -> String {
    let mut gaps = Vec::new();
    match &report.company_info {
        Some(company) => {
            if company.industry.is_none() {
                gaps.push("company industry");
            }
            if company.sector.is_none() {
                gaps.push("company sector");
            }
            if company.external_directors.is_none() {
                gaps.push("number of external directors");
            }
        }
        None => gaps.push("company information"),
    }
    let m = &report.esg_metrics;
    if m.social.total_employees == 0 {
        gaps.push("employee records");
    }
    if m.environmental.yearly.is_empty() {
        gaps.push("environmental data");
    } else if m.environmental.energy_use.is_none() {
        gaps.push("latest energy use");
    }

    if gaps.is_empty() {
        format!("No data gaps found for {}. All core ESG metrics are present.", company_name(report))
    } else {
        format!(
            "Data gaps for {}: {}.",
            company_name(report),
            gaps.join(", ")
        )
    }
}

fn general_text(report: &ComprehensiveReport) -> String {
    format!(
        "I can show ESG data, analyze trends, check data completeness and generate reports for {}. \
         Try asking to \"show ESG data\" or \"generate a report\".",
        company_name(report)
    )
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborator::{parse_tool_reply, AggregateDataSource, InMemoryMetrics};
    use crate::models::{CompanyInfo, DashboardAggregates, EmployeeAggregates, EnvironmentalYear};
    use crate::report::pdf::fakes::{FilePdf, StubHtml};
    use futures::TryStreamExt;

    async fn engine(dir: &std::path::Path, with_data: bool) -> ReportingChatbot {
        let metrics = InMemoryMetrics::new();
        if with_data {
            metrics
                .insert(
                    "6182618882",
                    DashboardAggregates {
                        company: Some(CompanyInfo {
                            cmp_num: "6182618882".into(),
                            name: Some("Acme".into()),
                            industry: Some("Steel".into()),
                            sector: None,
                            address: None,
                            external_directors: Some(2),
                            ethics_policy: true,
                            compliance_policy: true,
                        }),
                        employees: EmployeeAggregates {
                            total: 100,
                            male: 60,
                            female: 40,
                            board_members: 5,
                            accidents: 0,
                        },
                        environment: vec![EnvironmentalYear {
                            year: 2024,
                            energy_use: Some(5000.0),
                            green_use: None,
                            renewable: false,
                            renewable_ratio: None,
                        }],
                    },
                )
                .await;
        }
        let pipeline = ReportPipeline::new(
            Arc::new(AggregateDataSource::new(metrics)),
            Arc::new(StubHtml),
            Arc::new(FilePdf::default()),
            dir,
        );
        ReportingChatbot::new(pipeline, "6182618882")
    }

    async fn collect(engine: &ReportingChatbot, text: &str, context: UiContext) -> (ChatSessionId, String) {
        let session = engine.create_session().await.unwrap();
        let chunks: Vec<String> = engine
            .stream_response(text, &session, &context)
            .try_collect()
            .await
            .unwrap();
        (session, chunks.concat())
    }

    #[test]
    fn keyword_classification() {
        let ctx = UiContext::default();
        assert_eq!(classify("Identify data gaps", &ctx), ChatIntent::Filter(Intent::DataGaps));
        assert_eq!(
            classify("Generate a ESG report for all", &ctx),
            ChatIntent::Filter(Intent::ReportGeneration)
        );
        assert_eq!(classify("Analyze trends", &ctx), ChatIntent::Filter(Intent::AnalysisRequest));
        assert_eq!(classify("show me the data", &ctx), ChatIntent::Filter(Intent::DataQuery));
        assert_eq!(classify("hello there", &ctx), ChatIntent::General);

        let selected = UiContext {
            selected_intent: Some(Intent::Benchmarking),
            ..Default::default()
        };
        assert_eq!(classify("hello", &selected), ChatIntent::Filter(Intent::Benchmarking));
    }

    #[tokio::test]
    async fn sessions_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path(), true).await;
        let a = engine.create_session().await.unwrap();
        let b = engine.create_session().await.unwrap();
        assert_ne!(a, b);
        assert_eq!(engine.session_count().await, 2);
    }

    #[tokio::test]
    async fn data_query_streams_words() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path(), true).await;
        let (session, text) = collect(&engine, "show ESG data", UiContext::default()).await;
        assert!(text.starts_with("ESG data for Acme:"));
        assert!(text.contains("100 active employees"));
        assert_eq!(engine.get_last_outcome(&session).await, StreamOutcome::default());
    }

    #[tokio::test]
    async fn missing_company_yields_guidance() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path(), false).await;
        let (_, text) = collect(&engine, "show data", UiContext::default()).await;
        assert!(text.starts_with("No ESG data is registered for company 6182618882."));
    }

    #[tokio::test]
    async fn report_intent_records_outcome_and_exports() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path(), true).await;
        let (session, text) = collect(&engine, "please generate a report", UiContext::default()).await;
        assert!(text.contains("report #1"));

        let outcome = engine.get_last_outcome(&session).await;
        assert_eq!(outcome.exportable_report(), Some(ReportId(1)));

        assert_eq!(engine.pending_reports().await, 1);
        let path = engine.export_report_to_pdf(ReportId(1)).await.unwrap();
        assert!(path.exists());
        assert!(path.to_string_lossy().contains("ESG_Report_Acme_"));
        assert_eq!(engine.pending_reports().await, 0);
    }

    #[tokio::test]
    async fn ended_session_is_released_and_stays_gone() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path(), true).await;
        let session = engine.create_session().await.unwrap();
        assert_eq!(engine.session_count().await, 1);

        engine.end_session(&session).await;
        assert_eq!(engine.session_count().await, 0);

        // An answer still in flight must not bring the session back
        let chunks: Vec<String> = engine
            .stream_response("please generate a report", &session, &UiContext::default())
            .try_collect()
            .await
            .unwrap();
        assert!(chunks.concat().contains("report #1"));
        assert_eq!(engine.session_count().await, 0);
        assert_eq!(engine.get_last_outcome(&session).await, StreamOutcome::default());
    }

    #[tokio::test]
    async fn report_tool_uses_requested_period() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path(), true).await;
        let raw = engine
            .generate_report_tool(ReportToolRequest {
                cmp_num: "6182618882".into(),
                report_type: ReportType::Comprehensive,
                period: Some(Period::AllTime),
            })
            .await
            .unwrap();
        let id = parse_tool_reply(&raw).unwrap().report_id.unwrap();

        let stored = engine.inner.reports.read().await.get(&id).cloned().unwrap();
        assert_eq!(stored.period, Period::AllTime);
    }

    #[tokio::test]
    async fn unexported_reports_are_capped() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path(), true).await;
        for _ in 0..MAX_PENDING_REPORTS + 3 {
            engine
                .generate_report_tool(ReportToolRequest {
                    cmp_num: "6182618882".into(),
                    report_type: ReportType::Comprehensive,
                    period: None,
                })
                .await
                .unwrap();
        }
        assert_eq!(engine.pending_reports().await, MAX_PENDING_REPORTS);
        assert!(engine.export_report_to_pdf(ReportId(1)).await.is_err());
        let newest = ReportId(MAX_PENDING_REPORTS as u64 + 3);
        assert!(engine.export_report_to_pdf(newest).await.is_ok());
    }

    #[tokio::test]
    async fn report_tool_contract() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path(), true).await;

        let ok = engine
            .generate_report_tool(ReportToolRequest {
                cmp_num: "6182618882".into(),
                report_type: ReportType::Comprehensive,
                period: None,
            })
            .await
            .unwrap();
        let ok = parse_tool_reply(&ok).unwrap();
        assert!(ok.is_success());
        assert_eq!(ok.report_id, Some(ReportId(1)));

        let failed = engine
            .generate_report_tool(ReportToolRequest {
                cmp_num: "0000".into(),
                report_type: ReportType::Comprehensive,
                period: None,
            })
            .await
            .unwrap();
        let failed = parse_tool_reply(&failed).unwrap();
        assert_eq!(failed.status, "error");
        assert!(failed.message.unwrap().contains("0000"));
    }

    #[tokio::test]
    async fn unknown_report_export_fails() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path(), true).await;
        let err = engine.export_report_to_pdf(ReportId(42)).await.unwrap_err();
        assert!(matches!(err, EsgError::ReportGeneration(_)));
    }

    #[tokio::test]
    async fn gaps_are_listed() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path(), true).await;
        let ctx = UiContext {
            selected_intent: Some(Intent::DataGaps),
            ..Default::default()
        };
        let (_, text) = collect(&engine, "Identify data gaps", ctx).await;
        assert_eq!(text, "Data gaps for Acme: company sector.");
    }
}
