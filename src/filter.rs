//! Guided filter form: intent → category → period
//!
//! The three selects are dependent. Choosing an intent invalidates any
//! category/period already picked, and the execute action is only available
//! once all three are set. Option sets are closed enums; wire values are the
//! snake_case keys used by the browser client.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EsgError, Result};

// ============================================================================
// Options
// ============================================================================

/// What the user wants the assistant to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    DataQuery,
    AnalysisRequest,
    ReportGeneration,
    Benchmarking,
    /// Only reachable through the health-check quick action
    DataGaps,
}

impl Intent {
    /// Intents offered in the intent select
    pub fn selectable() -> &'static [Intent] {
        &[
            Intent::DataQuery,
            Intent::AnalysisRequest,
            Intent::ReportGeneration,
            Intent::Benchmarking,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::DataQuery => "data_query",
            Intent::AnalysisRequest => "analysis_request",
            Intent::ReportGeneration => "report_generation",
            Intent::Benchmarking => "benchmarking",
            Intent::DataGaps => "data_gaps",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Intent::DataQuery => "View ESG Data",
            Intent::AnalysisRequest => "Analyze Trends",
            Intent::ReportGeneration => "Generate Report",
            Intent::Benchmarking => "Compare Performance",
            Intent::DataGaps => "Check Data Completeness",
        }
    }
}

impl FromStr for Intent {
    type Err = EsgError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "data_query" => Ok(Intent::DataQuery),
            "analysis_request" => Ok(Intent::AnalysisRequest),
            "report_generation" => Ok(Intent::ReportGeneration),
            "benchmarking" => Ok(Intent::Benchmarking),
            "data_gaps" => Ok(Intent::DataGaps),
            other => Err(EsgError::UserInput(format!("Unknown intent '{}'", other))),
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ESG category filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    #[default]
    All,
    Environmental,
    Social,
    Governance,
}

impl Category {
    pub fn all() -> &'static [Category] {
        &[
            Category::All,
            Category::Environmental,
            Category::Social,
            Category::Governance,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::All => "all",
            Category::Environmental => "environmental",
            Category::Social => "social",
            Category::Governance => "governance",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::All => "All Categories",
            Category::Environmental => "Environmental (E)",
            Category::Social => "Social (S)",
            Category::Governance => "Governance (G)",
        }
    }
}

impl FromStr for Category {
    type Err = EsgError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "all" => Ok(Category::All),
            "environmental" => Ok(Category::Environmental),
            "social" => Ok(Category::Social),
            "governance" => Ok(Category::Governance),
            other => Err(EsgError::UserInput(format!("Unknown category '{}'", other))),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reporting period filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    #[default]
    CurrentYear,
    LastYear,
    #[serde(rename = "last_3_years")]
    LastThreeYears,
    AllTime,
}

impl Period {
    pub fn all() -> &'static [Period] {
        &[
            Period::CurrentYear,
            Period::LastYear,
            Period::LastThreeYears,
            Period::AllTime,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::CurrentYear => "current_year",
            Period::LastYear => "last_year",
            Period::LastThreeYears => "last_3_years",
            Period::AllTime => "all_time",
        }
    }

    /// Label printed on generated reports
    pub fn report_label(&self) -> &'static str {
        match self {
            Period::CurrentYear => "Current Year",
            Period::LastYear => "Previous Year",
            Period::LastThreeYears => "Last 3 Years",
            Period::AllTime => "All Available Data",
        }
    }

    /// Period as it appears inside a structured query.
    ///
    /// Relative years resolve against `current_year`; the wider ranges keep
    /// their raw key.
    pub fn query_label(&self, current_year: i32) -> String {
        match self {
            Period::CurrentYear => current_year.to_string(),
            Period::LastYear => (current_year - 1).to_string(),
            other => other.as_str().to_string(),
        }
    }
}

impl FromStr for Period {
    type Err = EsgError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "current_year" => Ok(Period::CurrentYear),
            "last_year" => Ok(Period::LastYear),
            "last_3_years" => Ok(Period::LastThreeYears),
            "all_time" => Ok(Period::AllTime),
            other => Err(EsgError::UserInput(format!("Unknown period '{}'", other))),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the three form fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterField {
    Intent,
    Category,
    Period,
}

// ============================================================================
// Selection state
// ============================================================================

/// Result of applying one field change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// Category and period were cleared because the intent changed
    pub cascaded: bool,
    /// Completeness after the change
    pub complete: bool,
}

/// Current state of the guided form for one client
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSelection {
    pub intent: Option<Intent>,
    pub category: Option<Category>,
    pub period: Option<Period>,
}

impl FilterSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fully populated selection, as used by the quick actions
    pub fn complete(intent: Intent, category: Category, period: Period) -> Self {
        Self {
            intent: Some(intent),
            category: Some(category),
            period: Some(period),
        }
    }

    /// Set or clear the intent.
    ///
    /// A new intent always drops category and period; clearing the intent
    /// leaves them alone.
    pub fn set_intent(&mut self, intent: Option<Intent>) -> Transition {
        let cascaded = intent.is_some();
        self.intent = intent;
        if cascaded {
            self.category = None;
            self.period = None;
        }
        Transition {
            cascaded,
            complete: self.is_complete(),
        }
    }

    pub fn set_category(&mut self, category: Option<Category>) -> Transition {
        self.category = category;
        Transition {
            cascaded: false,
            complete: self.is_complete(),
        }
    }

    pub fn set_period(&mut self, period: Option<Period>) -> Transition {
        self.period = period;
        Transition {
            cascaded: false,
            complete: self.is_complete(),
        }
    }

    /// Apply a raw wire value to a field. Empty strings clear the field.
    pub fn apply(&mut self, field: FilterField, raw: Option<&str>) -> Result<Transition> {
        let raw = raw.map(str::trim).filter(|v| !v.is_empty());
        let transition = match field {
            FilterField::Intent => self.set_intent(raw.map(str::parse).transpose()?),
            FilterField::Category => self.set_category(raw.map(str::parse).transpose()?),
            FilterField::Period => self.set_period(raw.map(str::parse).transpose()?),
        };
        Ok(transition)
    }

    /// All three fields chosen
    pub fn is_complete(&self) -> bool {
        self.intent.is_some() && self.category.is_some() && self.period.is_some()
    }

    /// Context handed to the chatbot alongside the query
    pub fn ui_context(&self) -> UiContext {
        UiContext {
            selected_intent: self.intent,
            selected_category: self.category.unwrap_or_default(),
            selected_period: self.period.unwrap_or_default(),
        }
    }

    /// Synthesize the natural-language query for this selection.
    ///
    /// Returns `None` when no intent is chosen.
    pub fn structured_query(&self, current_year: i32) -> Option<String> {
        let intent = self.intent?;
        let category = self.category.unwrap_or_default();
        let period = self.period.unwrap_or_default().query_label(current_year);

        let query = match intent {
            Intent::DataQuery => format!("Show me {} ESG data for {}", category, period),
            Intent::AnalysisRequest => format!("Analyze {} ESG trends for {}", category, period),
            Intent::ReportGeneration => {
                format!("Generate a ESG report for {} covering {}", category, period)
            }
            Intent::DataGaps => {
                format!("Identify data gaps in {} ESG metrics for {}", category, period)
            }
            Intent::Benchmarking => {
                format!("Compare our {} ESG performance for {}", category, period)
            }
        };
        Some(query)
    }
}

/// Selection context forwarded to the chatbot collaborator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiContext {
    pub selected_intent: Option<Intent>,
    pub selected_category: Category,
    pub selected_period: Period,
}

// ============================================================================
// Quick actions
// ============================================================================

/// One-click presets that fill the form and execute immediately
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuickAction {
    Report,
    Status,
    HealthCheck,
}

impl QuickAction {
    pub fn selection(&self) -> FilterSelection {
        let intent = match self {
            QuickAction::Report => Intent::ReportGeneration,
            QuickAction::Status => Intent::DataQuery,
            QuickAction::HealthCheck => Intent::DataGaps,
        };
        FilterSelection::complete(intent, Category::All, Period::CurrentYear)
    }
}

impl FromStr for QuickAction {
    type Err = EsgError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "report" => Ok(QuickAction::Report),
            "status" => Ok(QuickAction::Status),
            "health_check" => Ok(QuickAction::HealthCheck),
            other => Err(EsgError::UserInput(format!(
                "Unknown quick action '{}'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intent_change_clears_dependents() {
        let mut s = FilterSelection::new();
        s.set_intent(Some(Intent::DataQuery));
        s.set_category(Some(Category::Social));
        s.set_period(Some(Period::LastYear));
        assert!(s.is_complete());

        let t = s.set_intent(Some(Intent::Benchmarking));
        assert!(t.cascaded);
        assert!(!t.complete);
        assert_eq!(s.category, None);
        assert_eq!(s.period, None);
    }

    #[test]
    fn clearing_intent_keeps_dependents() {
        let mut s = FilterSelection::complete(Intent::DataQuery, Category::Social, Period::AllTime);
        let t = s.apply(FilterField::Intent, Some("")).unwrap();
        assert!(!t.cascaded);
        assert_eq!(s.intent, None);
        assert_eq!(s.category, Some(Category::Social));
        assert_eq!(s.period, Some(Period::AllTime));
    }

    #[test]
    fn apply_parses_wire_values() {
        let mut s = FilterSelection::new();
        s.apply(FilterField::Intent, Some("analysis_request")).unwrap();
        s.apply(FilterField::Category, Some("governance")).unwrap();
        let t = s.apply(FilterField::Period, Some("last_3_years")).unwrap();
        assert!(t.complete);
        assert_eq!(s.period, Some(Period::LastThreeYears));
    }

    #[test]
    fn apply_rejects_unknown_values() {
        let mut s = FilterSelection::new();
        let err = s.apply(FilterField::Category, Some("economic")).unwrap_err();
        assert!(matches!(err, EsgError::UserInput(_)));
        assert_eq!(s.category, None);
    }

    #[test]
    fn completeness_check_is_idempotent() {
        let s = FilterSelection::complete(Intent::DataQuery, Category::All, Period::CurrentYear);
        assert_eq!(s.is_complete(), s.is_complete());
        let partial = FilterSelection {
            category: Some(Category::All),
            period: Some(Period::AllTime),
            ..Default::default()
        };
        assert!(!partial.is_complete());
        assert!(!partial.is_complete());
    }

    #[test]
    fn structured_query_templates() {
        let year = 2025;
        let q = |intent, category, period| {
            FilterSelection::complete(intent, category, period)
                .structured_query(year)
                .unwrap()
        };

        assert_eq!(
            q(Intent::DataQuery, Category::All, Period::CurrentYear),
            "Show me all ESG data for 2025"
        );
        assert_eq!(
            q(Intent::AnalysisRequest, Category::Social, Period::LastYear),
            "Analyze social ESG trends for 2024"
        );
        assert_eq!(
            q(Intent::ReportGeneration, Category::Governance, Period::AllTime),
            "Generate a ESG report for governance covering all_time"
        );
        assert_eq!(
            q(Intent::DataGaps, Category::All, Period::LastThreeYears),
            "Identify data gaps in all ESG metrics for last_3_years"
        );
        assert_eq!(
            q(Intent::Benchmarking, Category::Environmental, Period::CurrentYear),
            "Compare our environmental ESG performance for 2025"
        );
    }

    #[test]
    fn structured_query_defaults_missing_fields() {
        let s = FilterSelection {
            intent: Some(Intent::DataQuery),
            ..Default::default()
        };
        assert_eq!(
            s.structured_query(2030).as_deref(),
            Some("Show me all ESG data for 2030")
        );
        assert_eq!(FilterSelection::new().structured_query(2030), None);
    }

    #[test]
    fn ui_context_defaults() {
        let s = FilterSelection {
            intent: Some(Intent::Benchmarking),
            ..Default::default()
        };
        let ctx = s.ui_context();
        assert_eq!(ctx.selected_intent, Some(Intent::Benchmarking));
        assert_eq!(ctx.selected_category, Category::All);
        assert_eq!(ctx.selected_period, Period::CurrentYear);

        let json = serde_json::to_value(ctx).unwrap();
        assert_eq!(json["selected_intent"], "benchmarking");
        assert_eq!(json["selected_period"], "current_year");
    }

    #[test]
    fn data_gaps_is_not_selectable() {
        assert!(!Intent::selectable().contains(&Intent::DataGaps));
        assert_eq!(
            QuickAction::HealthCheck.selection().intent,
            Some(Intent::DataGaps)
        );
    }

    #[test]
    fn quick_actions_produce_complete_selections() {
        for action in [QuickAction::Report, QuickAction::Status, QuickAction::HealthCheck] {
            assert!(action.selection().is_complete());
        }
        assert_eq!("health_check".parse::<QuickAction>().unwrap(), QuickAction::HealthCheck);
    }

    #[test]
    fn period_serde_key_matches_wire() {
        let json = serde_json::to_string(&Period::LastThreeYears).unwrap();
        assert_eq!(json, "\"last_3_years\"");
        for p in Period::all() {
            assert_eq!(p.as_str().parse::<Period>().unwrap(), *p);
        }
    }
}
