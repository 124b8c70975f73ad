use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::engine::audit::AuditSink;
use crate::engine::error::EngineError;
use crate::engine::status::LeaveStatus;
use crate::models::audit::AuditEvent;
use crate::models::auth::StaffMember;
use crate::models::leave::{LeaveRequest, NewLeaveRequest};
use crate::models::shift::{ShiftAssignment, ShiftRecord};
use crate::models::task::{NewTask, Task, TaskRevision};
use crate::store::{
    LeaveStore, NewShiftRecord, ShiftStore, StaffDirectory, TaskFilter, TaskStore,
};

#[derive(Default)]
struct State {
    next_id: i32,
    staff: HashMap<i32, StaffMember>,
    tasks: HashMap<i32, Task>,
    assignments: HashMap<i32, ShiftAssignment>,
    shifts: Vec<ShiftRecord>,
    leaves: HashMap<i32, LeaveRequest>,
    audit: Vec<AuditEvent>,
}

impl State {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }
}

/// Process-local store. Each method holds the lock for its whole
/// check-then-set, which gives the same compare-and-swap guarantees as the
/// Postgres store.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, EngineError> {
        self.state
            .lock()
            .map_err(|_| EngineError::Store("memory store lock poisoned".to_string()))
    }

    pub fn add_staff(&self, member: StaffMember) {
        if let Ok(mut state) = self.lock() {
            state.staff.insert(member.id, member);
        }
    }

    pub fn audit_events(&self) -> Vec<AuditEvent> {
        self.lock().map(|state| state.audit.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl StaffDirectory for MemoryStore {
    async fn find_staff(&self, id: i32) -> Result<Option<StaffMember>, EngineError> {
        Ok(self.lock()?.staff.get(&id).cloned())
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn insert_task(&self, task: NewTask) -> Result<Task, EngineError> {
        let mut state = self.lock()?;
        let task = task.into_task(state.next_id());
        state.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn find_task(&self, id: i32) -> Result<Option<Task>, EngineError> {
        Ok(self.lock()?.tasks.get(&id).cloned())
    }

    async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, EngineError> {
        let state = self.lock()?;
        let mut tasks: Vec<Task> = state
            .tasks
            .values()
            .filter(|t| filter.assigned_to.map_or(true, |id| t.assigned_to == id))
            .filter(|t| filter.category.map_or(true, |c| t.category == c))
            .cloned()
            .collect();
        tasks.sort_by(|a, b| b.assigned_at.cmp(&a.assigned_at).then(b.id.cmp(&a.id)));
        Ok(tasks)
    }

    async fn swap_task(&self, expected: TaskRevision, task: &Task) -> Result<(), EngineError> {
        let mut state = self.lock()?;
        let current = state
            .tasks
            .get_mut(&task.id)
            .ok_or_else(|| EngineError::NotFound(format!("task {}", task.id)))?;
        if current.revision() != expected {
            return Err(EngineError::conflict(expected, current.revision()));
        }
        *current = task.clone();
        Ok(())
    }
}

#[async_trait]
impl ShiftStore for MemoryStore {
    async fn find_assignment(&self, staff_id: i32) -> Result<Option<ShiftAssignment>, EngineError> {
        Ok(self.lock()?.assignments.get(&staff_id).cloned())
    }

    async fn save_assignment(&self, assignment: &ShiftAssignment) -> Result<(), EngineError> {
        self.lock()?
            .assignments
            .insert(assignment.staff_id, assignment.clone());
        Ok(())
    }

    async fn active_shift(&self, staff_id: i32) -> Result<Option<ShiftRecord>, EngineError> {
        Ok(self
            .lock()?
            .shifts
            .iter()
            .find(|r| r.staff_id == staff_id && r.is_active)
            .cloned())
    }

    async fn open_shift(&self, record: NewShiftRecord) -> Result<ShiftRecord, EngineError> {
        let mut state = self.lock()?;
        if state
            .shifts
            .iter()
            .any(|r| r.staff_id == record.staff_id && r.is_active)
        {
            return Err(EngineError::AlreadyActive(record.staff_id));
        }
        let opened = ShiftRecord {
            id: state.next_id(),
            staff_id: record.staff_id,
            work_date: record.work_date,
            scheduled_start: record.scheduled_start,
            scheduled_end: record.scheduled_end,
            clock_in: record.clock_in,
            clock_out: None,
            is_active: true,
        };
        state.shifts.push(opened.clone());
        Ok(opened)
    }

    async fn close_shift(&self, staff_id: i32, clock_out: DateTime<Utc>) -> Result<ShiftRecord, EngineError> {
        let mut state = self.lock()?;
        let record = state
            .shifts
            .iter_mut()
            .find(|r| r.staff_id == staff_id && r.is_active)
            .ok_or(EngineError::NotActive(staff_id))?;
        record.is_active = false;
        record.clock_out = Some(clock_out);
        Ok(record.clone())
    }
}

#[async_trait]
impl LeaveStore for MemoryStore {
    async fn insert_leave(&self, request: NewLeaveRequest) -> Result<LeaveRequest, EngineError> {
        let mut state = self.lock()?;
        let request = request.into_request(state.next_id());
        state.leaves.insert(request.id, request.clone());
        Ok(request)
    }

    async fn find_leave(&self, id: i32) -> Result<Option<LeaveRequest>, EngineError> {
        Ok(self.lock()?.leaves.get(&id).cloned())
    }

    async fn list_leaves(&self, staff_id: Option<i32>) -> Result<Vec<LeaveRequest>, EngineError> {
        let state = self.lock()?;
        let mut leaves: Vec<LeaveRequest> = state
            .leaves
            .values()
            .filter(|l| staff_id.map_or(true, |id| l.staff_id == id))
            .cloned()
            .collect();
        leaves.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(leaves)
    }

    async fn swap_leave(&self, expected: LeaveStatus, request: &LeaveRequest) -> Result<(), EngineError> {
        let mut state = self.lock()?;
        let current = state
            .leaves
            .get_mut(&request.id)
            .ok_or_else(|| EngineError::NotFound(format!("leave request {}", request.id)))?;
        if current.status != expected {
            return Err(EngineError::conflict(expected, current.status));
        }
        *current = request.clone();
        Ok(())
    }

    async fn acknowledge_rejections(
        &self,
        staff_id: i32,
        up_to: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> Result<u64, EngineError> {
        let mut state = self.lock()?;
        let mut marked = 0;
        for leave in state.leaves.values_mut() {
            let due = leave.staff_id == staff_id
                && leave.status == LeaveStatus::Rejected
                && leave.acknowledged_at.is_none()
                && leave.reviewed_at.is_some_and(|reviewed| reviewed <= up_to);
            if due {
                leave.acknowledged_at = Some(at);
                marked += 1;
            }
        }
        Ok(marked)
    }
}

#[async_trait]
impl AuditSink for MemoryStore {
    async fn record(&self, event: &AuditEvent) -> Result<(), EngineError> {
        self.lock()?.audit.push(event.clone());
        Ok(())
    }
}
