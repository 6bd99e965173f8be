//! Repository over the ESG tables
//!
//! `cmp_info` is keyed by company number, headcounts come from `emp_info`
//! restricted to active employees, and `env` holds one row per year for the
//! whole store.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, instrument};

use crate::collaborator::MetricsSource;
use crate::error::Result;
use crate::models::rows::{CmpInfoRow, EmployeeAggregateRow, EnvRow};
use crate::models::{CompanyInfo, DashboardAggregates, EmployeeAggregates, EnvironmentalYear};

#[derive(Clone)]
pub struct EsgRepository {
    pool: PgPool,
}

impl EsgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_company(&self, cmp_num: &str) -> Result<Option<CompanyInfo>> {
        let row = sqlx::query_as::<_, CmpInfoRow>(
            r#"
            SELECT cmp_num, cmp_nm, cmp_industry, cmp_sector, cmp_addr,
                   cmp_extemp::INT4 AS cmp_extemp, cmp_ethics_yn, cmp_comp_yn
            FROM cmp_info
            WHERE cmp_num = $1
            "#,
        )
        .bind(cmp_num)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(CompanyInfo::from))
    }

    /// Headcount aggregates over employees with `emp_endyn = 'Y'`
    pub async fn employee_aggregates(&self, cmp_num: &str) -> Result<EmployeeAggregates> {
        let row = sqlx::query_as::<_, EmployeeAggregateRow>(
            r#"
            SELECT
                COUNT(*)::BIGINT AS total,
                COUNT(*) FILTER (WHERE emp_gender = '1')::BIGINT AS male,
                COUNT(*) FILTER (WHERE emp_gender = '2')::BIGINT AS female,
                COUNT(*) FILTER (WHERE emp_board_yn = 'Y')::BIGINT AS board_members,
                COALESCE(SUM(emp_acident_cnt), 0)::BIGINT AS accidents
            FROM emp_info
            WHERE emp_comp = $1 AND emp_endyn = 'Y'
            "#,
        )
        .bind(cmp_num)
        .fetch_one(&self.pool)
        .await?;

        Ok(EmployeeAggregates {
            total: row.total,
            male: row.male,
            female: row.female,
            board_members: row.board_members,
            accidents: row.accidents,
        })
    }

    /// Environmental history, most recent year first
    pub async fn environment_history(&self) -> Result<Vec<EnvironmentalYear>> {
        let rows = sqlx::query_as::<_, EnvRow>(
            r#"
            SELECT year::INT4 AS year,
                   energy_use::FLOAT8 AS energy_use,
                   green_use::FLOAT8 AS green_use,
                   renewable_yn,
                   renewable_ratio::FLOAT8 AS renewable_ratio
            FROM env
            ORDER BY year DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(EnvironmentalYear::from).collect())
    }
}

#[async_trait]
impl MetricsSource for EsgRepository {
    #[instrument(skip(self))]
    async fn dashboard_aggregates(&self, cmp_num: &str) -> Result<Option<DashboardAggregates>> {
        let Some(company) = self.find_company(cmp_num).await? else {
            debug!("company not found");
            return Ok(None);
        };

        let (employees, environment) =
            tokio::try_join!(self.employee_aggregates(cmp_num), self.environment_history())?;

        Ok(Some(DashboardAggregates {
            company: Some(company),
            employees,
            environment,
        }))
    }
}
