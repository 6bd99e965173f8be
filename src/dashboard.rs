//! Dashboard projection
//!
//! Read-only: turns the aggregates of one company into a header, four
//! overview cards and per-category details.

use serde::Serialize;

use crate::collaborator::MetricsSource;
use crate::error::Result;
use crate::models::{CompanyInfo, DashboardAggregates};
use crate::report::html::group_thousands;

pub const DEFAULT_COMPANY: &str = "6182618882";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CardTone {
    Blue,
    Purple,
    Orange,
    Green,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricCard {
    pub title: String,
    pub value: String,
    pub subtitle: String,
    pub trend: Option<String>,
    pub tone: CardTone,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanyHeader {
    pub cmp_num: String,
    pub name: String,
    pub industry: Option<String>,
    pub sector: Option<String>,
}

impl From<&CompanyInfo> for CompanyHeader {
    fn from(company: &CompanyInfo) -> Self {
        Self {
            cmp_num: company.cmp_num.clone(),
            name: company.display_name().to_string(),
            industry: company.industry.clone(),
            sector: company.sector.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnergyLine {
    pub year: i32,
    pub energy_use: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EnvironmentalDetails {
    /// Up to three most recent years
    pub years: Vec<EnergyLine>,
    pub renewable_note: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SocialDetails {
    pub male_employees: i64,
    pub female_employees: i64,
    pub accident_free: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GovernanceDetails {
    pub external_directors: Option<i32>,
    pub policies: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryDetails {
    pub environmental: EnvironmentalDetails,
    pub social: SocialDetails,
    pub governance: GovernanceDetails,
}

/// Whole dashboard for one company
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Dashboard {
    Found {
        company: CompanyHeader,
        cards: Vec<MetricCard>,
        details: CategoryDetails,
    },
    CompanyNotFound {
        cmp_num: String,
    },
}

/// Load and project the dashboard; `None` selects the default company
pub async fn load_dashboard(source: &dyn MetricsSource, cmp_num: Option<&str>) -> Result<Dashboard> {
    let cmp_num = cmp_num
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(DEFAULT_COMPANY);
    let aggregates = source.dashboard_aggregates(cmp_num).await?;
    Ok(project(cmp_num, aggregates.as_ref()))
}

pub fn project(cmp_num: &str, aggregates: Option<&DashboardAggregates>) -> Dashboard {
    let Some((aggregates, company)) =
        aggregates.and_then(|a| a.company.as_ref().map(|c| (a, c)))
    else {
        return Dashboard::CompanyNotFound {
            cmp_num: cmp_num.to_string(),
        };
    };

    Dashboard::Found {
        company: CompanyHeader::from(company),
        cards: overview_cards(aggregates),
        details: category_details(aggregates, company),
    }
}

fn energy_kwh(value: Option<f64>) -> Option<String> {
    value
        .filter(|v| *v != 0.0)
        .map(|v| format!("{}kWh", group_thousands(v.round() as i64)))
}

fn overview_cards(aggregates: &DashboardAggregates) -> Vec<MetricCard> {
    let employees = &aggregates.employees;
    let latest = aggregates.latest_environment();
    let energy_trend = match aggregates.environment.as_slice() {
        [now, prev, ..] => match (now.energy_use, prev.energy_use) {
            (Some(n), Some(p)) if p != 0.0 => Some(format!("{:+.0}%", (n - p) / p * 100.0)),
            _ => None,
        },
        _ => None,
    };

    vec![
        MetricCard {
            title: "Employees".to_string(),
            value: group_thousands(employees.total),
            subtitle: format!("Female ratio: {:.1}%", employees.female_ratio()),
            trend: None,
            tone: CardTone::Blue,
        },
        MetricCard {
            title: "Board".to_string(),
            value: employees.board_members.to_string(),
            subtitle: "Employees serving on the board".to_string(),
            trend: None,
            tone: CardTone::Purple,
        },
        MetricCard {
            title: "Safety".to_string(),
            value: format!("{:.2}%", employees.accident_rate()),
            subtitle: format!("{} accidents in total", employees.accidents),
            trend: None,
            tone: CardTone::Orange,
        },
        MetricCard {
            title: "Environment".to_string(),
            value: energy_kwh(latest.and_then(|e| e.energy_use)).unwrap_or_else(|| "N/A".to_string()),
            subtitle: latest
                .map(|e| format!("As of {}", e.year))
                .unwrap_or_else(|| "No data".to_string()),
            trend: energy_trend,
            tone: CardTone::Green,
        },
    ]
}

fn category_details(aggregates: &DashboardAggregates, company: &CompanyInfo) -> CategoryDetails {
    let environmental = EnvironmentalDetails {
        years: aggregates
            .environment
            .iter()
            .take(3)
            .map(|e| EnergyLine {
                year: e.year,
                energy_use: e.energy_use.map(|v| format!("{} kWh", group_thousands(v.round() as i64))),
            })
            .collect(),
        renewable_note: aggregates
            .latest_environment()
            .filter(|e| e.renewable)
            .map(|e| format!("{:.1}% renewable energy in use", e.renewable_ratio.unwrap_or(0.0))),
    };

    let social = SocialDetails {
        male_employees: aggregates.employees.male,
        female_employees: aggregates.employees.female,
        accident_free: aggregates.employees.accidents == 0,
    };

    let mut policies = Vec::new();
    if company.ethics_policy {
        policies.push("Ethics management".to_string());
    }
    if company.compliance_policy {
        policies.push("Compliance".to_string());
    }
    let governance = GovernanceDetails {
        external_directors: company.external_directors.filter(|n| *n > 0),
        policies,
    };

    CategoryDetails {
        environmental,
        social,
        governance,
    }
}
