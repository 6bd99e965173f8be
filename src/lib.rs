//! ESG Reporter
//!
//! Web service for Environmental, Social and Governance reporting: a
//! read-only metrics dashboard and a guided chat page that answers ESG
//! questions and exports PDF reports.
//!
//! ## Flow
//! HTTP command -> per-client inbox -> PageController -> ResponseOrchestrator
//! -> ChatbotEngine -> view events over SSE
//!
//! ## Quick Start
//!
//! ```rust
//! use esg_reporter::filter::{FilterField, FilterSelection};
//!
//! let mut selection = FilterSelection::new();
//! selection.apply(FilterField::Intent, Some("data_query")).unwrap();
//! selection.apply(FilterField::Category, Some("social")).unwrap();
//! let t = selection.apply(FilterField::Period, Some("all_time")).unwrap();
//! assert!(t.complete);
//! assert_eq!(
//!     selection.structured_query(2025).as_deref(),
//!     Some("Show me social ESG data for all_time")
//! );
//! ```

// Core error handling
pub mod error;
pub mod config;

// Domain model
pub mod filter;
pub mod models;
pub mod dashboard;

// Chat page
pub mod collaborator;
pub mod view;
pub mod session;
pub mod stream;
pub mod page;

// Report generation and the built-in chatbot
pub mod report;
pub mod engine;

// Database integration (when enabled)
#[cfg(feature = "database")]
pub mod database;

// REST + SSE surface
#[cfg(feature = "server")]
pub mod api;

pub use collaborator::{ChatbotEngine, EsgDataSource, MetricsSource, PdfRenderer, ReportHtmlBuilder};
pub use config::AppConfig;
pub use dashboard::{load_dashboard, Dashboard};
pub use engine::ReportingChatbot;
pub use error::{EsgError, Result};
pub use filter::{Category, FilterField, FilterSelection, Intent, Period, QuickAction};
pub use page::PageController;
pub use report::{ReportArtifact, ReportPipeline};
pub use session::{ClientId, SessionRegistry};
pub use view::{ChannelView, ViewEvent, ViewSurface};

#[cfg(feature = "database")]
pub use database::{DatabaseConfig, DatabaseManager, EsgRepository};

#[cfg(feature = "server")]
pub use api::{create_esg_router, AppState};
