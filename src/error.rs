//! Error handling for the ESG reporter
//!
//! One taxonomy for the whole crate, built with thiserror. Variants map onto
//! how a failure is surfaced to the user: inline chat blocks for report and
//! streaming failures, transient notices for input and download problems.

use thiserror::Error;

use crate::session::ClientId;
use crate::view::NoticeLevel;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, EsgError>;

/// Main error type for the ESG reporter
#[derive(Error, Debug)]
pub enum EsgError {
    /// The data source reported a domain error (e.g. unknown company)
    #[error("Upstream data error: {0}")]
    UpstreamData(String),

    /// The report tool failed or violated its reply contract
    #[error("Report generation failed: {0}")]
    ReportGeneration(String),

    /// Consuming the chatbot response stream failed
    #[error("Streaming error: {0}")]
    Streaming(String),

    /// Empty submission, incomplete selection, unknown option value
    #[error("{0}")]
    UserInput(String),

    /// No stored report path, or the file is gone
    #[error("{0}")]
    DownloadUnavailable(String),

    #[error("Unknown client: {0}")]
    UnknownClient(ClientId),

    #[error("PDF rendering failed: {0}")]
    Pdf(String),

    #[error("Template error: {0}")]
    Template(#[from] handlebars::RenderError),

    #[error("Template syntax error: {0}")]
    TemplateSyntax(#[from] handlebars::TemplateError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[cfg(feature = "database")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl EsgError {
    /// Notice level used when the error is shown as a transient notification
    pub fn notice_level(&self) -> NoticeLevel {
        match self {
            EsgError::UserInput(_) => NoticeLevel::Warning,
            _ => NoticeLevel::Negative,
        }
    }

    /// True for errors that belong in a notification rather than a chat block
    pub fn is_user_facing_notice(&self) -> bool {
        matches!(
            self,
            EsgError::UserInput(_) | EsgError::DownloadUnavailable(_)
        )
    }
}
