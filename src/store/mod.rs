//! Persistence seams.
//!
//! Every status-changing write is a compare-and-swap: the record is replaced
//! only while its stored status still canonicalises to the expected
//! pre-state, otherwise the call fails with `StateConflict`. Task writes also
//! require the same `submitted_at`, so a write computed from an earlier
//! submission round cannot land on a resubmitted task.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::engine::error::EngineError;
use crate::engine::status::LeaveStatus;
use crate::models::auth::StaffMember;
use crate::models::leave::{LeaveRequest, NewLeaveRequest};
use crate::models::shift::{ShiftAssignment, ShiftRecord};
use crate::models::task::{NewTask, Task, TaskCategory, TaskRevision};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub assigned_to: Option<i32>,
    pub category: Option<TaskCategory>,
}

#[derive(Debug, Clone)]
pub struct NewShiftRecord {
    pub staff_id: i32,
    pub work_date: NaiveDate,
    pub scheduled_start: Option<NaiveDateTime>,
    pub scheduled_end: Option<NaiveDateTime>,
    pub clock_in: DateTime<Utc>,
}

#[async_trait]
pub trait StaffDirectory: Send + Sync {
    async fn find_staff(&self, id: i32) -> Result<Option<StaffMember>, EngineError>;
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn insert_task(&self, task: NewTask) -> Result<Task, EngineError>;
    async fn find_task(&self, id: i32) -> Result<Option<Task>, EngineError>;
    async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, EngineError>;
    async fn swap_task(&self, expected: TaskRevision, task: &Task) -> Result<(), EngineError>;
}

#[async_trait]
pub trait ShiftStore: Send + Sync {
    async fn find_assignment(&self, staff_id: i32) -> Result<Option<ShiftAssignment>, EngineError>;
    async fn save_assignment(&self, assignment: &ShiftAssignment) -> Result<(), EngineError>;
    async fn active_shift(&self, staff_id: i32) -> Result<Option<ShiftRecord>, EngineError>;
    /// Fails with `AlreadyActive` if the staff member has an open record.
    async fn open_shift(&self, record: NewShiftRecord) -> Result<ShiftRecord, EngineError>;
    /// Fails with `NotActive` if the staff member has no open record.
    async fn close_shift(&self, staff_id: i32, clock_out: DateTime<Utc>) -> Result<ShiftRecord, EngineError>;
}

#[async_trait]
pub trait LeaveStore: Send + Sync {
    async fn insert_leave(&self, request: NewLeaveRequest) -> Result<LeaveRequest, EngineError>;
    async fn find_leave(&self, id: i32) -> Result<Option<LeaveRequest>, EngineError>;
    async fn list_leaves(&self, staff_id: Option<i32>) -> Result<Vec<LeaveRequest>, EngineError>;
    async fn swap_leave(&self, expected: LeaveStatus, request: &LeaveRequest) -> Result<(), EngineError>;
    /// Marks every unacknowledged rejection of `staff_id` reviewed at or
    /// before `up_to` as seen. Returns how many were marked.
    async fn acknowledge_rejections(
        &self,
        staff_id: i32,
        up_to: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> Result<u64, EngineError>;
}
