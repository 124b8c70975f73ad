use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

use crate::engine::status::{LeaveStatus, TaskStatus};

const REQUIRED_TABLES: [&str; 6] = [
    "audit_events",
    "leave_requests",
    "shift_assignments",
    "shift_records",
    "staff",
    "tasks",
];

/// Backs the one-active-shift rule in `PgStore::open_shift`.
const OPEN_SHIFT_INDEX: &str = "one_open_shift_per_staff";

pub struct Database {
    pub pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self> {
        log::info!("🔗 Connecting to database...");

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await
            .context("Failed to connect to the database")?;

        log::info!("✅ Database connection established");
        Ok(Database { pool })
    }

    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("Database did not answer a trivial query")?;
        Ok(())
    }

    /// Reports missing tables and the missing open-shift index. Neither
    /// stops startup.
    pub async fn verify_schema(&self) -> Result<SchemaReport> {
        log::info!("📋 Checking database schema...");

        let found: Vec<String> = sqlx::query(
            "SELECT table_name FROM information_schema.tables \
             WHERE table_schema = 'public' AND table_name = ANY($1)",
        )
        .bind(&REQUIRED_TABLES[..])
        .fetch_all(&self.pool)
        .await
        .context("Failed to list database tables")?
        .iter()
        .map(|row| row.try_get::<String, _>("table_name"))
        .collect::<Result<_, _>>()?;

        let missing_tables: Vec<String> = REQUIRED_TABLES
            .iter()
            .filter(|table| !found.iter().any(|f| f == *table))
            .map(|table| table.to_string())
            .collect();

        let open_shift_index = sqlx::query("SELECT 1 FROM pg_indexes WHERE indexname = $1")
            .bind(OPEN_SHIFT_INDEX)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to look up shift indexes")?
            .is_some();

        let report = SchemaReport {
            missing_tables,
            open_shift_index,
        };
        report.log();
        Ok(report)
    }

    pub async fn get_stats(&self) -> Result<DatabaseStats> {
        let counts = sqlx::query(
            "SELECT \
                (SELECT COUNT(*) FROM staff) AS staff_count, \
                (SELECT COUNT(*) FROM tasks) AS task_count, \
                (SELECT COUNT(*) FROM shift_records WHERE clock_out IS NULL) AS open_shift_count",
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to count records")?;

        // Status columns may hold legacy spellings, so group in SQL and
        // canonicalise here.
        let mut awaiting_review = 0;
        for row in self.count_by_status("tasks").await? {
            if row.0.parse::<TaskStatus>().ok() == Some(TaskStatus::Submitted) {
                awaiting_review += row.1;
            }
        }
        let mut pending_leave = 0;
        for row in self.count_by_status("leave_requests").await? {
            if row.0.parse::<LeaveStatus>().ok() == Some(LeaveStatus::Pending) {
                pending_leave += row.1;
            }
        }

        Ok(DatabaseStats {
            staff: counts.try_get("staff_count")?,
            tasks: counts.try_get("task_count")?,
            awaiting_review,
            open_shifts: counts.try_get("open_shift_count")?,
            pending_leave,
        })
    }

    async fn count_by_status(&self, table: &str) -> Result<Vec<(String, i64)>> {
        let rows = sqlx::query(&format!("SELECT status, COUNT(*) AS n FROM {} GROUP BY status", table))
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to count {} by status", table))?;

        rows.iter()
            .map(|row| -> Result<(String, i64)> { Ok((row.try_get("status")?, row.try_get("n")?)) })
            .collect()
    }
}

#[derive(Debug)]
pub struct SchemaReport {
    pub missing_tables: Vec<String>,
    pub open_shift_index: bool,
}

impl SchemaReport {
    fn log(&self) {
        if self.missing_tables.is_empty() {
            log::info!("✅ All required tables exist");
        } else {
            log::warn!("⚠️  Missing tables: {:?}", self.missing_tables);
            log::warn!("   Run fieldops_db.sql against the database");
        }
        if !self.open_shift_index {
            log::warn!(
                "⚠️  Index {} is missing; concurrent clock-ins may open two shifts",
                OPEN_SHIFT_INDEX
            );
        }
    }
}

#[derive(Debug, serde::Serialize, utoipa::ToSchema)]
pub struct DatabaseStats {
    pub staff: i64,
    pub tasks: i64,
    pub awaiting_review: i64,
    pub open_shifts: i64,
    pub pending_leave: i64,
}

impl DatabaseStats {
    pub fn log_stats(&self) {
        log::info!("📈 Database Statistics:");
        log::info!("   👥 Staff: {}", self.staff);
        log::info!("   📋 Tasks: {} ({} awaiting review)", self.tasks, self.awaiting_review);
        log::info!("   ⏱️  Open shifts: {}", self.open_shifts);
        log::info!("   🌴 Pending leave requests: {}", self.pending_leave);
    }
}
