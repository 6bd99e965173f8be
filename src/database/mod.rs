//! Database connection and management module
//!
//! Connection pooling for the PostgreSQL store holding `cmp_info`,
//! `emp_info` and `env`. Queries are runtime-checked.

use sqlx::Row;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use tracing::{info, warn};

use crate::config::AppConfig;

pub mod esg_repository;

pub use esg_repository::EsgRepository;

/// Tables the application reads
const REQUIRED_TABLES: [&str; 3] = ["cmp_info", "emp_info", "env"];

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub connection_timeout: Duration,
    pub idle_timeout: Option<Duration>,
    pub max_lifetime: Option<Duration>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::from(&AppConfig::from_lookup(|key| std::env::var(key).ok()))
    }
}

impl From<&AppConfig> for DatabaseConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            database_url: config.database_url.clone(),
            max_connections: config.database_pool_size,
            connection_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(600)),
            max_lifetime: Some(Duration::from_secs(1800)),
        }
    }
}

/// Database connection manager
pub struct DatabaseManager {
    pool: PgPool,
}

impl DatabaseManager {
    /// Create a new database manager with the given configuration
    pub async fn new(config: DatabaseConfig) -> Result<Self, sqlx::Error> {
        info!(
            "Connecting to database: {}",
            mask_database_url(&config.database_url)
        );

        let mut pool_options = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connection_timeout);

        if let Some(idle_timeout) = config.idle_timeout {
            pool_options = pool_options.idle_timeout(idle_timeout);
        }

        if let Some(max_lifetime) = config.max_lifetime {
            pool_options = pool_options.max_lifetime(max_lifetime);
        }

        let pool = pool_options
            .connect(&config.database_url)
            .await
            .map_err(|e| {
                warn!("Failed to connect to database: {}", e);
                e
            })?;

        info!("Database connection pool created successfully");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn esg_repository(&self) -> EsgRepository {
        EsgRepository::new(self.pool.clone())
    }

    pub async fn test_connection(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| ())
    }

    /// Names of required tables missing from the current schema
    pub async fn missing_tables(&self) -> Result<Vec<String>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT table_name::text AS table_name
            FROM information_schema.tables
            WHERE table_schema = current_schema()
            AND table_name = ANY($1)
            "#,
        )
        .bind(REQUIRED_TABLES.map(String::from).to_vec())
        .fetch_all(&self.pool)
        .await?;

        let present: Vec<String> = rows.iter().map(|r| r.get("table_name")).collect();
        let missing: Vec<String> = REQUIRED_TABLES
            .iter()
            .filter(|t| !present.iter().any(|p| p == *t))
            .map(|t| t.to_string())
            .collect();

        if !missing.is_empty() {
            warn!("Expected database tables not found: {}", missing.join(", "));
        }
        Ok(missing)
    }
}

fn mask_database_url(url: &str) -> String {
    if let Ok(parsed) = url::Url::parse(url) {
        let mut masked = parsed.clone();
        if parsed.password().is_some() {
            let _ = masked.set_password(Some("***"));
        }
        masked.to_string()
    } else if url.chars().count() > 20 {
        let head: String = url.chars().take(10).collect();
        let tail_start = url
            .char_indices()
            .rev()
            .nth(9)
            .map(|(i, _)| i)
            .unwrap_or(0);
        format!("{}***{}", head, &url[tail_start..])
    } else {
        "***".to_string()
    }
}
