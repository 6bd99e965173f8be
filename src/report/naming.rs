//! Artifact file naming

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

/// Timestamp layout used in artifact names, e.g. `2025-09-26_16-30-45`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Keep alphanumerics, spaces, underscores and hyphens; trim trailing whitespace
pub fn safe_name(name: &str) -> String {
    let kept: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '_' | '-'))
        .collect();
    kept.trim_end().to_string()
}

/// Name used in the artifact: company name, else company number, else "company"
pub fn company_label(company_name: Option<&str>, cmp_num: &str) -> String {
    [company_name.unwrap_or_default(), cmp_num]
        .into_iter()
        .map(safe_name)
        .find(|s| !s.is_empty())
        .unwrap_or_else(|| "company".to_string())
}

pub fn artifact_file_name(company: &str, at: NaiveDateTime) -> String {
    format!("ESG_Report_{}_{}.pdf", company, at.format(TIMESTAMP_FORMAT))
}

pub fn artifact_path(dir: &Path, company: &str, at: NaiveDateTime) -> PathBuf {
    dir.join(artifact_file_name(company, at))
}

/// Display title for a report file: the stem with underscores as spaces
pub fn report_title(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().replace('_', " "))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 9, 26)
            .unwrap()
            .and_hms_opt(16, 30, 45)
            .unwrap()
    }

    #[test]
    fn safe_name_strips_punctuation() {
        assert_eq!(safe_name("A&B Co. (Korea)!"), "AB Co Korea");
        assert_eq!(safe_name("east-west_ltd  "), "east-west_ltd");
        assert_eq!(safe_name("그린에너지(주)"), "그린에너지주");
    }

    #[test]
    fn company_label_fallbacks() {
        assert_eq!(company_label(Some("Acme!"), "123"), "Acme");
        assert_eq!(company_label(Some("!!!"), "123"), "123");
        assert_eq!(company_label(None, "123"), "123");
        assert_eq!(company_label(None, ""), "company");
    }

    #[test]
    fn artifact_naming() {
        let path = artifact_path(Path::new("generated_reports"), "AB Co Korea", at());
        assert_eq!(
            path,
            PathBuf::from("generated_reports/ESG_Report_AB Co Korea_2025-09-26_16-30-45.pdf")
        );
        assert_eq!(
            report_title(&path),
            "ESG Report AB Co Korea 2025-09-26 16-30-45"
        );
    }
}
