//! Application configuration
//!
//! Read from the process environment after `.env` has been loaded with
//! dotenvy. Every setting has a default so the server starts with an empty
//! environment.

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::dashboard::DEFAULT_COMPANY;

const DEFAULT_DATABASE_URL: &str = "postgresql://localhost:5432/esg_reporter";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub app_name: String,
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub database_pool_size: u32,
    /// Where generated PDFs are written
    pub reports_dir: PathBuf,
    /// Company served when a request names none
    pub default_company: String,
    /// `wkhtmltopdf`-compatible converter
    pub pdf_command: String,
    /// Optional directory of static front-end assets
    pub static_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: "ESG Reporter".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8080,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            database_pool_size: 10,
            reports_dir: PathBuf::from("generated_reports"),
            default_company: DEFAULT_COMPANY.to_string(),
            pdf_command: "wkhtmltopdf".to_string(),
            static_dir: None,
        }
    }
}

impl AppConfig {
    /// Load `.env` (if any) and read the environment
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unparseable numbers fall back to
    /// their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = match get("PORT").map(|p| p.parse::<u16>()) {
            Some(Ok(port)) => port,
            Some(Err(e)) => {
                tracing::warn!(error = %e, "invalid PORT, using {}", defaults.port);
                defaults.port
            }
            None => defaults.port,
        };

        Self {
            app_name: get("APP_NAME").unwrap_or(defaults.app_name),
            host: get("HOST").unwrap_or(defaults.host),
            port,
            database_url: get("DATABASE_URL").unwrap_or(defaults.database_url),
            database_pool_size: get("DATABASE_POOL_SIZE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.database_pool_size),
            reports_dir: get("REPORTS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.reports_dir),
            default_company: get("DEFAULT_COMPANY").unwrap_or(defaults.default_company),
            pdf_command: get("PDF_COMMAND").unwrap_or(defaults.pdf_command),
            static_dir: get("STATIC_DIR").map(PathBuf::from),
        }
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = AppConfig::from_lookup(|_| None);
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.port, 8080);
        assert_eq!(config.default_company, "6182618882");
        assert_eq!(config.reports_dir, PathBuf::from("generated_reports"));
    }

    #[test]
    fn environment_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "9000"),
            ("DATABASE_POOL_SIZE", "3"),
            ("REPORTS_DIR", "/tmp/reports"),
            ("DEFAULT_COMPANY", "1234567890"),
            ("STATIC_DIR", "web"),
        ]));
        assert_eq!(config.bind_addr().unwrap().to_string(), "127.0.0.1:9000");
        assert_eq!(config.database_pool_size, 3);
        assert_eq!(config.reports_dir, PathBuf::from("/tmp/reports"));
        assert_eq!(config.default_company, "1234567890");
        assert_eq!(config.static_dir, Some(PathBuf::from("web")));
    }

    #[test]
    fn bad_numbers_fall_back() {
        let config = AppConfig::from_lookup(lookup(&[("PORT", "http"), ("DATABASE_POOL_SIZE", "-1")]));
        assert_eq!(config.port, 8080);
        assert_eq!(config.database_pool_size, 10);
    }
}
