//! Report HTML built from handlebars templates
//!
//! One base document plus a section template per ESG category. Sections are
//! rendered first and spliced into the base unescaped.

use chrono::Utc;
use handlebars::Handlebars;
use serde_json::{json, Value};

use crate::collaborator::ReportHtmlBuilder;
use crate::error::Result;
use crate::models::{
    CompanyInfo, EnvironmentalMetrics, GovernanceMetrics, ReportSummary, SocialMetrics,
};

const BASE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>ESG Report - {{company.name}}</title>
<style>
  body { font-family: sans-serif; margin: 32px; color: #1f2937; }
  h1 { margin-bottom: 4px; }
  .meta { color: #6b7280; font-size: 12px; }
  .summary td { padding: 4px 12px 4px 0; }
  .section { page-break-before: always; }
  table.metrics { border-collapse: collapse; width: 100%; }
  table.metrics td, table.metrics th { border-bottom: 1px solid #e5e7eb; padding: 6px; text-align: left; }
</style>
</head>
<body>
<h1>ESG Report</h1>
<h2>{{company.name}}</h2>
<p class="meta">
  Company number {{company.cmp_num}}{{#if company.industry}} &middot; {{company.industry}}{{/if}}{{#if company.sector}} &middot; {{company.sector}}{{/if}}<br>
  Period: {{period_label}} &middot; Generated {{generated_at}}
</p>
<h3>Summary</h3>
<table class="summary">
  <tr><td>Active employees</td><td>{{number summary.total_employees}}</td></tr>
  <tr><td>Female ratio</td><td>{{percent summary.female_ratio}}</td></tr>
  <tr><td>Accident rate</td><td>{{percent summary.accident_rate}}</td></tr>
  <tr><td>Latest energy use</td><td>{{number summary.latest_energy_use}} kWh</td></tr>
  <tr><td>Policies</td><td>{{#each summary.policies}}{{this}}{{#unless @last}}, {{/unless}}{{else}}None reported{{/each}}</td></tr>
</table>
{{{env_html}}}
{{{soc_html}}}
{{{gov_html}}}
</body>
</html>
"#;

const ENVIRONMENTAL_TEMPLATE: &str = r#"<div class="section">
<h3>{{title}}</h3>
{{#if metrics.latest_year}}
<p>Latest year {{metrics.latest_year}}: {{number metrics.energy_use}} kWh energy use, {{number metrics.green_use}} greenhouse gas emissions.</p>
{{#if metrics.energy_trend}}<p>Energy change vs previous year: {{percent metrics.energy_trend}}</p>{{/if}}
{{#if metrics.renewable}}<p>Renewable energy in use ({{percent metrics.renewable_ratio}}).</p>{{/if}}
<table class="metrics">
  <tr><th>Year</th><th>Energy (kWh)</th><th>Emissions</th><th>Renewable</th></tr>
  {{#each metrics.yearly}}
  <tr><td>{{year}}</td><td>{{number energy_use}}</td><td>{{number green_use}}</td><td>{{#if renewable}}Yes{{else}}No{{/if}}</td></tr>
  {{/each}}
</table>
{{else}}
<p>No environmental data available.</p>
{{/if}}
</div>
"#;

const SOCIAL_TEMPLATE: &str = r#"<div class="section">
<h3>{{title}}</h3>
<table class="metrics">
  <tr><td>Active employees</td><td>{{number metrics.total_employees}}</td></tr>
  <tr><td>Male / female</td><td>{{number metrics.male_employees}} / {{number metrics.female_employees}}</td></tr>
  <tr><td>Female ratio</td><td>{{percent metrics.female_ratio}}</td></tr>
  <tr><td>Board members</td><td>{{number metrics.board_members}}</td></tr>
  <tr><td>Accidents</td><td>{{number metrics.total_accidents}} ({{percent metrics.accident_rate}})</td></tr>
</table>
</div>
"#;

const GOVERNANCE_TEMPLATE: &str = r#"<div class="section">
<h3>{{title}}</h3>
<table class="metrics">
  <tr><td>External directors</td><td>{{number metrics.external_directors}}</td></tr>
  <tr><td>Board members</td><td>{{number metrics.board_members}}</td></tr>
  <tr><td>Ethics management policy</td><td>{{#if metrics.ethics_policy}}In operation{{else}}Not reported{{/if}}</td></tr>
  <tr><td>Compliance policy</td><td>{{#if metrics.compliance_policy}}In operation{{else}}Not reported{{/if}}</td></tr>
</table>
</div>
"#;

/// [`ReportHtmlBuilder`] backed by the embedded templates
pub struct HandlebarsReportBuilder {
    handlebars: Handlebars<'static>,
}

impl HandlebarsReportBuilder {
    pub fn new() -> Result<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.register_helper("number", Box::new(number_helper));
        handlebars.register_helper("percent", Box::new(percent_helper));

        handlebars.register_template_string("base", BASE_TEMPLATE)?;
        handlebars.register_template_string("environmental", ENVIRONMENTAL_TEMPLATE)?;
        handlebars.register_template_string("social", SOCIAL_TEMPLATE)?;
        handlebars.register_template_string("governance", GOVERNANCE_TEMPLATE)?;

        Ok(Self { handlebars })
    }

    fn section(&self, template: &str, title: &str, metrics: Value) -> Result<String> {
        Ok(self
            .handlebars
            .render(template, &json!({ "title": title, "metrics": metrics }))?)
    }
}

impl ReportHtmlBuilder for HandlebarsReportBuilder {
    fn build_report_html(
        &self,
        company_info: &CompanyInfo,
        period_label: &str,
        summary: &ReportSummary,
        environmental: &EnvironmentalMetrics,
        social: &SocialMetrics,
        governance: &GovernanceMetrics,
    ) -> Result<String> {
        let env_html = self.section(
            "environmental",
            "Environmental",
            serde_json::to_value(environmental)?,
        )?;
        let soc_html = self.section("social", "Social", serde_json::to_value(social)?)?;
        let gov_html = self.section("governance", "Governance", serde_json::to_value(governance)?)?;

        let mut company = serde_json::to_value(company_info)?;
        company["name"] = Value::String(company_info.display_name().to_string());

        let data = json!({
            "company": company,
            "period_label": period_label,
            "generated_at": Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string(),
            "summary": summary,
            "env_html": env_html,
            "soc_html": soc_html,
            "gov_html": gov_html,
        });
        Ok(self.handlebars.render("base", &data)?)
    }
}

/// Group an integer part with thousands separators
pub(crate) fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if value < 0 {
        out.insert(0, '-');
    }
    out
}

// Handlebars helpers

fn number_helper(
    h: &handlebars::Helper,
    _: &Handlebars,
    _: &handlebars::Context,
    _: &mut handlebars::RenderContext,
    out: &mut dyn handlebars::Output,
) -> handlebars::HelperResult {
    let text = match h.param(0).and_then(|v| v.value().as_f64()) {
        Some(n) => group_thousands(n.round() as i64),
        None => "N/A".to_string(),
    };
    out.write(&text)?;
    Ok(())
}

fn percent_helper(
    h: &handlebars::Helper,
    _: &Handlebars,
    _: &handlebars::Context,
    _: &mut handlebars::RenderContext,
    out: &mut dyn handlebars::Output,
) -> handlebars::HelperResult {
    let text = match h.param(0).and_then(|v| v.value().as_f64()) {
        Some(n) => format!("{:.1}%", n),
        None => "N/A".to_string(),
    };
    out.write(&text)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn company() -> CompanyInfo {
        CompanyInfo {
            cmp_num: "6182618882".into(),
            name: Some("Green & Co".into()),
            industry: Some("Energy".into()),
            sector: None,
            address: None,
            external_directors: Some(2),
            ethics_policy: true,
            compliance_policy: true,
        }
    }

    #[test]
    fn thousands_grouping() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1234567), "1,234,567");
        assert_eq!(group_thousands(-1000), "-1,000");
    }

    #[test]
    fn renders_all_sections() {
        let builder = HandlebarsReportBuilder::new().unwrap();
        let summary = ReportSummary {
            total_employees: 1200,
            female_ratio: 41.26,
            policies: vec!["Compliance".into()],
            ..Default::default()
        };
        let html = builder
            .build_report_html(
                &company(),
                "Current Year",
                &summary,
                &EnvironmentalMetrics::default(),
                &SocialMetrics::default(),
                &GovernanceMetrics::default(),
            )
            .unwrap();

        assert!(html.contains("Green &amp; Co"));
        assert!(html.contains("Period: Current Year"));
        assert!(html.contains("1,200"));
        assert!(html.contains("41.3%"));
        assert!(html.contains("No environmental data available."));
        assert!(html.contains("<h3>Social</h3>"));
        assert!(html.contains("<h3>Governance</h3>"));
    }
}
