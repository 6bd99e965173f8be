//! ESG Reporter web server
//!
//! Serves the dashboard and chat APIs over HTTP/SSE, backed by PostgreSQL.
//!
//! # Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost:5432/esg esg_server --port 8080
//! esg_server --static-dir web/dist --reports-dir /var/lib/esg/reports
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use esg_reporter::collaborator::{AggregateDataSource, ChatbotEngine, MetricsSource};
use esg_reporter::report::{CommandPdfRenderer, HandlebarsReportBuilder};
use esg_reporter::{
    create_esg_router, AppConfig, AppState, DatabaseConfig, DatabaseManager, PageController,
    ReportPipeline, ReportingChatbot, SessionRegistry,
};

#[derive(Parser, Debug)]
#[command(name = "esg_server")]
#[command(about = "ESG reporting dashboard and chat server")]
struct Args {
    /// Bind host (overrides HOST)
    #[arg(long)]
    host: Option<String>,

    /// Bind port (overrides PORT)
    #[arg(long, short)]
    port: Option<u16>,

    /// Company served by default (overrides DEFAULT_COMPANY)
    #[arg(long)]
    company: Option<String>,

    /// Output directory for generated PDFs (overrides REPORTS_DIR)
    #[arg(long)]
    reports_dir: Option<PathBuf>,

    /// Static front-end assets (overrides STATIC_DIR)
    #[arg(long)]
    static_dir: Option<PathBuf>,
}

impl Args {
    fn apply(self, config: &mut AppConfig) {
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(company) = self.company {
            config.default_company = company;
        }
        if let Some(dir) = self.reports_dir {
            config.reports_dir = dir;
        }
        if self.static_dir.is_some() {
            config.static_dir = self.static_dir;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut config = AppConfig::from_env();
    Args::parse().apply(&mut config);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("esg_reporter=info,esg_server=info,tower_http=debug")),
        )
        .init();

    info!("Starting {} v{}", config.app_name, env!("CARGO_PKG_VERSION"));

    // Database
    let db = DatabaseManager::new(DatabaseConfig::from(&config))
        .await
        .context("failed to connect to database")?;
    db.test_connection().await.context("database health check failed")?;
    let missing = db.missing_tables().await?;
    if !missing.is_empty() {
        warn!("Dashboard and reports will be empty until these tables exist: {:?}", missing);
    }
    let metrics: Arc<dyn MetricsSource> = Arc::new(db.esg_repository());

    // Report pipeline and chatbot
    let pipeline = ReportPipeline::new(
        Arc::new(AggregateDataSource::new(metrics.clone())),
        Arc::new(HandlebarsReportBuilder::new()?),
        Arc::new(CommandPdfRenderer::new(config.pdf_command.clone())),
        config.reports_dir.clone(),
    );
    let chatbot: Arc<dyn ChatbotEngine> =
        Arc::new(ReportingChatbot::new(pipeline, config.default_company.clone()));

    let controller = Arc::new(PageController::new(
        SessionRegistry::new(),
        chatbot,
        config.default_company.clone(),
    ));
    let state = AppState::new(controller, metrics, config.default_company.clone());

    let mut app = create_esg_router(state);
    if let Some(dir) = &config.static_dir {
        info!("Serving static files from {}", dir.display());
        app = app.fallback_service(ServeDir::new(dir));
    }
    let app = app.layer(
        ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        ),
    );

    let addr = config.bind_addr().context("invalid HOST/PORT")?;
    info!("Listening on {}", addr);
    info!("Reports directory: {}", config.reports_dir.display());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
