//! PDF generation pipeline
//!
//! Data source → HTML builder → PDF renderer, writing one timestamped
//! artifact per run under the reports directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Local;
use tokio::process::Command;

use super::naming;
use crate::collaborator::{EsgDataSource, PdfRenderer, ReportHtmlBuilder};
use crate::error::{EsgError, Result};
use crate::filter::Period;
use crate::models::{CompanyInfo, ComprehensiveReport};

/// Renders HTML by running an external `wkhtmltopdf`-compatible command as
/// `<program> [args..] <input.html> <output.pdf>`.
pub struct CommandPdfRenderer {
    program: String,
    args: Vec<String>,
}

impl CommandPdfRenderer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: vec!["--quiet".to_string(), "--encoding".to_string(), "utf-8".to_string()],
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }
}

#[async_trait]
impl PdfRenderer for CommandPdfRenderer {
    async fn html_to_pdf(&self, html: &str, out_path: &Path) -> Result<PathBuf> {
        let html_path = out_path.with_extension("html");
        tokio::fs::write(&html_path, html).await?;

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(&html_path)
            .arg(out_path)
            .output()
            .await;

        if let Err(e) = tokio::fs::remove_file(&html_path).await {
            tracing::warn!(path = %html_path.display(), error = %e, "failed to remove intermediate HTML");
        }

        let output = output.map_err(|e| EsgError::Pdf(format!("{}: {}", self.program, e)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EsgError::Pdf(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }
        Ok(out_path.to_path_buf())
    }
}

/// Data source, HTML builder and renderer wired together
#[derive(Clone)]
pub struct ReportPipeline {
    data: Arc<dyn EsgDataSource>,
    html: Arc<dyn ReportHtmlBuilder>,
    pdf: Arc<dyn PdfRenderer>,
    reports_dir: PathBuf,
}

impl ReportPipeline {
    pub fn new(
        data: Arc<dyn EsgDataSource>,
        html: Arc<dyn ReportHtmlBuilder>,
        pdf: Arc<dyn PdfRenderer>,
        reports_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            data,
            html,
            pdf,
            reports_dir: reports_dir.into(),
        }
    }

    pub fn reports_dir(&self) -> &Path {
        &self.reports_dir
    }

    /// Comprehensive report for `cmp_num`; a domain error becomes `UpstreamData`
    pub async fn fetch(&self, cmp_num: &str) -> Result<ComprehensiveReport> {
        let report = self.data.generate_comprehensive_report(cmp_num).await?;
        match report.error {
            Some(message) => Err(EsgError::UpstreamData(message)),
            None => Ok(report),
        }
    }

    /// Render an already fetched report to a new artifact
    pub async fn render(
        &self,
        cmp_num: &str,
        report: &ComprehensiveReport,
        period: Period,
    ) -> Result<PathBuf> {
        let company = report.company_info.clone().unwrap_or_else(|| CompanyInfo {
            cmp_num: cmp_num.to_string(),
            name: None,
            industry: None,
            sector: None,
            address: None,
            external_directors: None,
            ethics_policy: false,
            compliance_policy: false,
        });
        let metrics = &report.esg_metrics;

        let html = self.html.build_report_html(
            &company,
            period.report_label(),
            &report.summary,
            &metrics.environmental,
            &metrics.social,
            &metrics.governance,
        )?;

        tokio::fs::create_dir_all(&self.reports_dir).await?;
        let label = naming::company_label(company.name.as_deref(), cmp_num);
        let out_path = naming::artifact_path(&self.reports_dir, &label, Local::now().naive_local());

        let path = self.pdf.html_to_pdf(&html, &out_path).await?;
        tracing::info!(cmp_num, path = %path.display(), "report PDF written");
        Ok(path)
    }

    /// Fetch, build and render in one go
    pub async fn generate_esg_pdf(&self, cmp_num: &str, period: Period) -> Result<PathBuf> {
        let report = self.fetch(cmp_num).await?;
        self.render(cmp_num, &report, period).await
    }
}
