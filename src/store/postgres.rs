use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};

use crate::engine::audit::AuditSink;
use crate::engine::error::EngineError;
use crate::engine::status::{LeaveStatus, ShiftStatus, TaskStatus};
use crate::models::audit::AuditEvent;
use crate::models::auth::{Role, StaffMember};
use crate::models::leave::{DateRange, LeaveRequest, LeaveType, NewLeaveRequest};
use crate::models::shift::{Schedule, ShiftAssignment, ShiftRecord};
use crate::models::task::{CustomerInfo, NewTask, Submission, Task, TaskCategory, TaskRevision};
use crate::store::{LeaveStore, NewShiftRecord, ShiftStore, StaffDirectory, TaskFilter, TaskStore};

const TASK_COLUMNS: &str = "id, title, description, category, subtype, customer, assigned_to, assigned_by, \
     branch_id, status, deadline, submission, assigned_at, started_at, submitted_at, reviewed_at, \
     reviewer_id, review_note";

const SHIFT_COLUMNS: &str =
    "id, staff_id, work_date, scheduled_start, scheduled_end, clock_in, clock_out, status";

const LEAVE_COLUMNS: &str = "id, staff_id, start_date, end_date, leave_type, description, status, \
     reviewer_id, review_message, reviewed_at, acknowledged_at, created_at";

/// Postgres-backed store. Status columns may hold any historical spelling;
/// every read goes through the canonicalizer and every write stores the
/// canonical form.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn store_error(what: &str, raw: &str) -> EngineError {
    log::error!("Unreadable {} value in database: {:?}", what, raw);
    EngineError::Store(format!("unreadable {} value", what))
}

fn staff_from_row(row: &PgRow) -> Result<StaffMember, EngineError> {
    let role: String = row.try_get("role")?;
    Ok(StaffMember {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        role: Role::parse(&role).ok_or_else(|| store_error("role", &role))?,
        branch_id: row.try_get("branch_id")?,
        manager_id: row.try_get("manager_id")?,
        phone: row.try_get("phone")?,
    })
}

fn task_from_row(row: &PgRow) -> Result<Task, EngineError> {
    let category: String = row.try_get("category")?;
    let status: String = row.try_get("status")?;
    let customer: Option<Json<CustomerInfo>> = row.try_get("customer")?;
    let submission: Option<Json<Submission>> = row.try_get("submission")?;

    Ok(Task {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        category: TaskCategory::parse(&category).ok_or_else(|| store_error("category", &category))?,
        subtype: row.try_get("subtype")?,
        customer: customer.map(|c| c.0),
        assigned_to: row.try_get("assigned_to")?,
        assigned_by: row.try_get("assigned_by")?,
        branch_id: row.try_get("branch_id")?,
        status: status.parse::<TaskStatus>()?,
        deadline: row.try_get("deadline")?,
        submission: submission.map(|s| s.0),
        assigned_at: row.try_get("assigned_at")?,
        started_at: row.try_get("started_at")?,
        submitted_at: row.try_get("submitted_at")?,
        reviewed_at: row.try_get("reviewed_at")?,
        reviewer_id: row.try_get("reviewer_id")?,
        review_note: row.try_get("review_note")?,
    })
}

fn shift_from_row(row: &PgRow) -> Result<ShiftRecord, EngineError> {
    let status: String = row.try_get("status")?;
    Ok(ShiftRecord {
        id: row.try_get("id")?,
        staff_id: row.try_get("staff_id")?,
        work_date: row.try_get("work_date")?,
        scheduled_start: row.try_get("scheduled_start")?,
        scheduled_end: row.try_get("scheduled_end")?,
        clock_in: row.try_get("clock_in")?,
        clock_out: row.try_get("clock_out")?,
        is_active: status.parse::<ShiftStatus>()? == ShiftStatus::Active,
    })
}

fn leave_from_row(row: &PgRow) -> Result<LeaveRequest, EngineError> {
    let leave_type: String = row.try_get("leave_type")?;
    let status: String = row.try_get("status")?;
    Ok(LeaveRequest {
        id: row.try_get("id")?,
        staff_id: row.try_get("staff_id")?,
        range: DateRange {
            start: row.try_get("start_date")?,
            end: row.try_get("end_date")?,
        },
        leave_type: LeaveType::parse(&leave_type).ok_or_else(|| store_error("leave type", &leave_type))?,
        description: row.try_get("description")?,
        status: status.parse::<LeaveStatus>()?,
        reviewer_id: row.try_get("reviewer_id")?,
        review_message: row.try_get("review_message")?,
        reviewed_at: row.try_get("reviewed_at")?,
        acknowledged_at: row.try_get("acknowledged_at")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl StaffDirectory for PgStore {
    async fn find_staff(&self, id: i32) -> Result<Option<StaffMember>, EngineError> {
        let row = sqlx::query("SELECT id, name, role, branch_id, manager_id, phone FROM staff WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(staff_from_row).transpose()
    }
}

#[async_trait]
impl TaskStore for PgStore {
    async fn insert_task(&self, task: NewTask) -> Result<Task, EngineError> {
        let row = sqlx::query(&format!(
            "INSERT INTO tasks (title, description, category, subtype, customer, assigned_to, assigned_by, \
             branch_id, status, deadline, assigned_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {}",
            TASK_COLUMNS
        ))
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.category.as_str())
        .bind(&task.subtype)
        .bind(task.customer.as_ref().map(Json))
        .bind(task.assigned_to)
        .bind(task.assigned_by)
        .bind(task.branch_id)
        .bind(TaskStatus::Assigned.as_str())
        .bind(task.deadline)
        .bind(task.assigned_at)
        .fetch_one(&self.pool)
        .await?;

        task_from_row(&row)
    }

    async fn find_task(&self, id: i32) -> Result<Option<Task>, EngineError> {
        let row = sqlx::query(&format!("SELECT {} FROM tasks WHERE id = $1", TASK_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(task_from_row).transpose()
    }

    async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, EngineError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM tasks \
             WHERE ($1::INT IS NULL OR assigned_to = $1) \
             AND ($2::TEXT IS NULL OR category = $2) \
             ORDER BY assigned_at DESC, id DESC",
            TASK_COLUMNS
        ))
        .bind(filter.assigned_to)
        .bind(filter.category.map(|c| c.as_str()))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(task_from_row).collect()
    }

    async fn swap_task(&self, expected: TaskRevision, task: &Task) -> Result<(), EngineError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT status, submitted_at FROM tasks WHERE id = $1 FOR UPDATE")
            .bind(task.id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("task {}", task.id)))?;
        let stored: String = row.try_get("status")?;
        let current = TaskRevision {
            status: stored.parse::<TaskStatus>()?,
            submitted_at: row.try_get("submitted_at")?,
        };
        if current != expected {
            return Err(EngineError::conflict(expected, current));
        }

        sqlx::query(
            "UPDATE tasks SET status = $2, description = $3, submission = $4, started_at = $5, \
             submitted_at = $6, reviewed_at = $7, reviewer_id = $8, review_note = $9, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(task.id)
        .bind(task.status.as_str())
        .bind(&task.description)
        .bind(task.submission.as_ref().map(Json))
        .bind(task.started_at)
        .bind(task.submitted_at)
        .bind(task.reviewed_at)
        .bind(task.reviewer_id)
        .bind(&task.review_note)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl ShiftStore for PgStore {
    async fn find_assignment(&self, staff_id: i32) -> Result<Option<ShiftAssignment>, EngineError> {
        let row = sqlx::query(
            "SELECT staff_id, schedule, updated_by, updated_at FROM shift_assignments WHERE staff_id = $1",
        )
        .bind(staff_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| -> Result<ShiftAssignment, EngineError> {
            let schedule: Json<Schedule> = row.try_get("schedule")?;
            Ok(ShiftAssignment {
                staff_id: row.try_get("staff_id")?,
                schedule: schedule.0,
                updated_by: row.try_get("updated_by")?,
                updated_at: row.try_get("updated_at")?,
            })
        })
        .transpose()
    }

    async fn save_assignment(&self, assignment: &ShiftAssignment) -> Result<(), EngineError> {
        sqlx::query(
            "INSERT INTO shift_assignments (staff_id, schedule, updated_by, updated_at) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (staff_id) DO UPDATE \
             SET schedule = EXCLUDED.schedule, updated_by = EXCLUDED.updated_by, updated_at = EXCLUDED.updated_at",
        )
        .bind(assignment.staff_id)
        .bind(Json(&assignment.schedule))
        .bind(assignment.updated_by)
        .bind(assignment.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn active_shift(&self, staff_id: i32) -> Result<Option<ShiftRecord>, EngineError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM shift_records WHERE staff_id = $1 AND clock_out IS NULL",
            SHIFT_COLUMNS
        ))
        .bind(staff_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(shift_from_row).transpose()
    }

    async fn open_shift(&self, record: NewShiftRecord) -> Result<ShiftRecord, EngineError> {
        let result = sqlx::query(&format!(
            "INSERT INTO shift_records (staff_id, work_date, scheduled_start, scheduled_end, clock_in, status) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {}",
            SHIFT_COLUMNS
        ))
        .bind(record.staff_id)
        .bind(record.work_date)
        .bind(record.scheduled_start)
        .bind(record.scheduled_end)
        .bind(record.clock_in)
        .bind(ShiftStatus::Active.as_str())
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => shift_from_row(&row),
            // one_open_shift_per_staff
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(EngineError::AlreadyActive(record.staff_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn close_shift(&self, staff_id: i32, clock_out: DateTime<Utc>) -> Result<ShiftRecord, EngineError> {
        let row = sqlx::query(&format!(
            "UPDATE shift_records SET clock_out = $2, status = $3 \
             WHERE staff_id = $1 AND clock_out IS NULL \
             RETURNING {}",
            SHIFT_COLUMNS
        ))
        .bind(staff_id)
        .bind(clock_out)
        .bind(ShiftStatus::Ended.as_str())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(EngineError::NotActive(staff_id))?;

        shift_from_row(&row)
    }
}

#[async_trait]
impl LeaveStore for PgStore {
    async fn insert_leave(&self, request: NewLeaveRequest) -> Result<LeaveRequest, EngineError> {
        let row = sqlx::query(&format!(
            "INSERT INTO leave_requests (staff_id, start_date, end_date, leave_type, description, status, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {}",
            LEAVE_COLUMNS
        ))
        .bind(request.staff_id)
        .bind(request.range.start)
        .bind(request.range.end)
        .bind(request.leave_type.as_str())
        .bind(&request.description)
        .bind(LeaveStatus::Pending.as_str())
        .bind(request.created_at)
        .fetch_one(&self.pool)
        .await?;

        leave_from_row(&row)
    }

    async fn find_leave(&self, id: i32) -> Result<Option<LeaveRequest>, EngineError> {
        let row = sqlx::query(&format!("SELECT {} FROM leave_requests WHERE id = $1", LEAVE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(leave_from_row).transpose()
    }

    async fn list_leaves(&self, staff_id: Option<i32>) -> Result<Vec<LeaveRequest>, EngineError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM leave_requests \
             WHERE ($1::INT IS NULL OR staff_id = $1) \
             ORDER BY created_at DESC, id DESC",
            LEAVE_COLUMNS
        ))
        .bind(staff_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(leave_from_row).collect()
    }

    async fn swap_leave(&self, expected: LeaveStatus, request: &LeaveRequest) -> Result<(), EngineError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT status FROM leave_requests WHERE id = $1 FOR UPDATE")
            .bind(request.id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("leave request {}", request.id)))?;
        let stored: String = row.try_get("status")?;
        let current = stored.parse::<LeaveStatus>()?;
        if current != expected {
            return Err(EngineError::conflict(expected, current));
        }

        sqlx::query(
            "UPDATE leave_requests SET status = $2, reviewer_id = $3, review_message = $4, \
             reviewed_at = $5, acknowledged_at = $6 \
             WHERE id = $1",
        )
        .bind(request.id)
        .bind(request.status.as_str())
        .bind(request.reviewer_id)
        .bind(&request.review_message)
        .bind(request.reviewed_at)
        .bind(request.acknowledged_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn acknowledge_rejections(
        &self,
        staff_id: i32,
        up_to: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> Result<u64, EngineError> {
        // Legacy rows may spell the status differently, so filter after
        // canonicalising instead of in SQL.
        let candidates = sqlx::query(
            "SELECT id, status FROM leave_requests \
             WHERE staff_id = $1 AND acknowledged_at IS NULL AND reviewed_at <= $2",
        )
        .bind(staff_id)
        .bind(up_to)
        .fetch_all(&self.pool)
        .await?;

        let mut ids = Vec::new();
        for row in &candidates {
            let status: String = row.try_get("status")?;
            if status.parse::<LeaveStatus>()? == LeaveStatus::Rejected {
                ids.push(row.try_get::<i32, _>("id")?);
            }
        }
        if ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(
            "UPDATE leave_requests SET acknowledged_at = $2 \
             WHERE id = ANY($1) AND acknowledged_at IS NULL",
        )
        .bind(&ids)
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl AuditSink for PgStore {
    async fn record(&self, event: &AuditEvent) -> Result<(), EngineError> {
        sqlx::query(
            "INSERT INTO audit_events (id, kind, subject, subject_id, actor_id, from_status, to_status, detail, occurred_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(event.id)
        .bind(event.kind.as_str())
        .bind(event.subject.as_str())
        .bind(event.subject_id)
        .bind(event.actor_id)
        .bind(&event.from_status)
        .bind(&event.to_status)
        .bind(Json(&event.detail))
        .bind(event.occurred_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
