//! ESG data shapes shared by the store, the dashboard and report generation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Company master record (`cmp_info`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyInfo {
    pub cmp_num: String,
    pub name: Option<String>,
    pub industry: Option<String>,
    pub sector: Option<String>,
    pub address: Option<String>,
    /// Number of external (outside) directors
    pub external_directors: Option<i32>,
    pub ethics_policy: bool,
    pub compliance_policy: bool,
}

impl CompanyInfo {
    /// Name for display and file naming; falls back to the company number
    pub fn display_name(&self) -> &str {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name,
            _ => &self.cmp_num,
        }
    }
}

/// Headcount aggregates over active employees (`emp_info`, `emp_endyn = 'Y'`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeAggregates {
    pub total: i64,
    pub male: i64,
    pub female: i64,
    pub board_members: i64,
    pub accidents: i64,
}

impl EmployeeAggregates {
    /// Female share of headcount, in percent. 0 for an empty company.
    pub fn female_ratio(&self) -> f64 {
        percent(self.female, self.total)
    }

    /// Accidents per head, in percent. 0 for an empty company.
    pub fn accident_rate(&self) -> f64 {
        percent(self.accidents, self.total)
    }
}

fn percent(part: i64, whole: i64) -> f64 {
    if whole > 0 {
        part as f64 / whole as f64 * 100.0
    } else {
        0.0
    }
}

/// One row of the `env` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentalYear {
    pub year: i32,
    /// kWh
    pub energy_use: Option<f64>,
    /// Greenhouse gas emissions
    pub green_use: Option<f64>,
    pub renewable: bool,
    pub renewable_ratio: Option<f64>,
}

/// Everything the dashboard and reports read for one company
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardAggregates {
    pub company: Option<CompanyInfo>,
    pub employees: EmployeeAggregates,
    /// Most recent year first
    pub environment: Vec<EnvironmentalYear>,
}

impl DashboardAggregates {
    pub fn latest_environment(&self) -> Option<&EnvironmentalYear> {
        self.environment.first()
    }
}

// ============================================================================
// Comprehensive report
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentalMetrics {
    pub latest_year: Option<i32>,
    pub energy_use: Option<f64>,
    pub green_use: Option<f64>,
    pub renewable: bool,
    pub renewable_ratio: Option<f64>,
    /// Energy change from the previous year, percent
    pub energy_trend: Option<f64>,
    pub yearly: Vec<EnvironmentalYear>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialMetrics {
    pub total_employees: i64,
    pub male_employees: i64,
    pub female_employees: i64,
    pub female_ratio: f64,
    pub board_members: i64,
    pub total_accidents: i64,
    pub accident_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernanceMetrics {
    pub external_directors: Option<i32>,
    pub board_members: i64,
    pub ethics_policy: bool,
    pub compliance_policy: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EsgMetrics {
    pub environmental: EnvironmentalMetrics,
    pub social: SocialMetrics,
    pub governance: GovernanceMetrics,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSummary {
    pub total_employees: i64,
    pub female_ratio: f64,
    pub accident_rate: f64,
    pub latest_energy_use: Option<f64>,
    pub policies: Vec<String>,
}

/// Full report payload, or a domain error from the data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComprehensiveReport {
    #[serde(default)]
    pub company_info: Option<CompanyInfo>,
    #[serde(default)]
    pub summary: ReportSummary,
    #[serde(default)]
    pub esg_metrics: EsgMetrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub generated_at: DateTime<Utc>,
}

impl ComprehensiveReport {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            company_info: None,
            summary: ReportSummary::default(),
            esg_metrics: EsgMetrics::default(),
            error: Some(message.into()),
            generated_at: Utc::now(),
        }
    }

    /// Derive the report from raw aggregates.
    ///
    /// A missing company record yields an error report.
    pub fn from_aggregates(cmp_num: &str, aggregates: &DashboardAggregates) -> Self {
        let Some(company) = aggregates.company.clone() else {
            return Self::error(format!("Company {} not found", cmp_num));
        };
        let employees = aggregates.employees;

        let environmental = match aggregates.environment.as_slice() {
            [] => EnvironmentalMetrics::default(),
            [latest, rest @ ..] => {
                let energy_trend = match (latest.energy_use, rest.first().and_then(|p| p.energy_use)) {
                    (Some(now), Some(prev)) if prev != 0.0 => Some((now - prev) / prev * 100.0),
                    _ => None,
                };
                EnvironmentalMetrics {
                    latest_year: Some(latest.year),
                    energy_use: latest.energy_use,
                    green_use: latest.green_use,
                    renewable: latest.renewable,
                    renewable_ratio: latest.renewable_ratio,
                    energy_trend,
                    yearly: aggregates.environment.clone(),
                }
            }
        };

        let social = SocialMetrics {
            total_employees: employees.total,
            male_employees: employees.male,
            female_employees: employees.female,
            female_ratio: employees.female_ratio(),
            board_members: employees.board_members,
            total_accidents: employees.accidents,
            accident_rate: employees.accident_rate(),
        };

        let governance = GovernanceMetrics {
            external_directors: company.external_directors,
            board_members: employees.board_members,
            ethics_policy: company.ethics_policy,
            compliance_policy: company.compliance_policy,
        };

        let mut policies = Vec::new();
        if company.ethics_policy {
            policies.push("Ethics management".to_string());
        }
        if company.compliance_policy {
            policies.push("Compliance".to_string());
        }

        Self {
            summary: ReportSummary {
                total_employees: employees.total,
                female_ratio: social.female_ratio,
                accident_rate: social.accident_rate,
                latest_energy_use: environmental.energy_use,
                policies,
            },
            company_info: Some(company),
            esg_metrics: EsgMetrics {
                environmental,
                social,
                governance,
            },
            error: None,
            generated_at: Utc::now(),
        }
    }
}

// ============================================================================
// Database rows
// ============================================================================

#[cfg(feature = "database")]
pub mod rows {
    use super::{CompanyInfo, EnvironmentalYear};

    fn flag(value: &Option<String>) -> bool {
        value.as_deref().map(str::trim) == Some("Y")
    }

    #[derive(Debug, Clone, sqlx::FromRow)]
    pub struct CmpInfoRow {
        pub cmp_num: String,
        pub cmp_nm: Option<String>,
        pub cmp_industry: Option<String>,
        pub cmp_sector: Option<String>,
        pub cmp_addr: Option<String>,
        pub cmp_extemp: Option<i32>,
        pub cmp_ethics_yn: Option<String>,
        pub cmp_comp_yn: Option<String>,
    }

    impl From<CmpInfoRow> for CompanyInfo {
        fn from(row: CmpInfoRow) -> Self {
            Self {
                ethics_policy: flag(&row.cmp_ethics_yn),
                compliance_policy: flag(&row.cmp_comp_yn),
                cmp_num: row.cmp_num,
                name: row.cmp_nm,
                industry: row.cmp_industry,
                sector: row.cmp_sector,
                address: row.cmp_addr,
                external_directors: row.cmp_extemp,
            }
        }
    }

    #[derive(Debug, Clone, sqlx::FromRow)]
    pub struct EnvRow {
        pub year: i32,
        pub energy_use: Option<f64>,
        pub green_use: Option<f64>,
        pub renewable_yn: Option<String>,
        pub renewable_ratio: Option<f64>,
    }

    impl From<EnvRow> for EnvironmentalYear {
        fn from(row: EnvRow) -> Self {
            Self {
                renewable: flag(&row.renewable_yn),
                year: row.year,
                energy_use: row.energy_use,
                green_use: row.green_use,
                renewable_ratio: row.renewable_ratio,
            }
        }
    }

    /// Output of the headcount aggregate query
    #[derive(Debug, Clone, Copy, Default, sqlx::FromRow)]
    pub struct EmployeeAggregateRow {
        pub total: i64,
        pub male: i64,
        pub female: i64,
        pub board_members: i64,
        pub accidents: i64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn company() -> CompanyInfo {
        CompanyInfo {
            cmp_num: "6182618882".into(),
            name: Some("Acme Korea".into()),
            industry: Some("Manufacturing".into()),
            sector: None,
            address: None,
            external_directors: Some(3),
            ethics_policy: true,
            compliance_policy: false,
        }
    }

    fn env(year: i32, energy: f64) -> EnvironmentalYear {
        EnvironmentalYear {
            year,
            energy_use: Some(energy),
            green_use: None,
            renewable: false,
            renewable_ratio: None,
        }
    }

    #[test]
    fn ratios_are_zero_without_headcount() {
        let e = EmployeeAggregates {
            accidents: 4,
            ..Default::default()
        };
        assert_eq!(e.female_ratio(), 0.0);
        assert_eq!(e.accident_rate(), 0.0);
    }

    #[test]
    fn ratios_use_active_headcount() {
        let e = EmployeeAggregates {
            total: 200,
            male: 150,
            female: 50,
            board_members: 7,
            accidents: 3,
        };
        assert!((e.female_ratio() - 25.0).abs() < f64::EPSILON);
        assert!((e.accident_rate() - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn display_name_falls_back_to_number() {
        let mut c = company();
        assert_eq!(c.display_name(), "Acme Korea");
        c.name = Some("   ".into());
        assert_eq!(c.display_name(), "6182618882");
    }

    #[test]
    fn report_from_aggregates() {
        let aggregates = DashboardAggregates {
            company: Some(company()),
            employees: EmployeeAggregates {
                total: 10,
                male: 6,
                female: 4,
                board_members: 2,
                accidents: 0,
            },
            environment: vec![env(2024, 1100.0), env(2023, 1000.0)],
        };
        let report = ComprehensiveReport::from_aggregates("6182618882", &aggregates);
        assert!(report.error.is_none());
        assert_eq!(report.summary.total_employees, 10);
        assert_eq!(report.summary.policies, vec!["Ethics management".to_string()]);
        assert_eq!(report.esg_metrics.environmental.latest_year, Some(2024));
        let trend = report.esg_metrics.environmental.energy_trend.unwrap();
        assert!((trend - 10.0).abs() < 1e-9);
        assert_eq!(report.esg_metrics.governance.external_directors, Some(3));
    }

    #[test]
    fn missing_company_is_an_error_report() {
        let report = ComprehensiveReport::from_aggregates("123", &DashboardAggregates::default());
        assert_eq!(report.error.as_deref(), Some("Company 123 not found"));
    }

    #[test]
    fn missing_sections_deserialize_to_defaults() {
        let report: ComprehensiveReport =
            serde_json::from_str(r#"{"generated_at":"2025-01-01T00:00:00Z"}"#).unwrap();
        assert_eq!(report.esg_metrics, EsgMetrics::default());
        assert!(report.company_info.is_none());
    }
}
