use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    TaskAssigned,
    TaskStarted,
    TaskSubmitted,
    ManagerApproval,
    ManagerRejection,
    SupervisorOverride,
    DecisionSuperseded,
    ScheduleSaved,
    ShiftStarted,
    ShiftEnded,
    LeaveRequested,
    LeaveApproved,
    LeaveRejected,
}

impl AuditKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditKind::TaskAssigned => "task_assigned",
            AuditKind::TaskStarted => "task_started",
            AuditKind::TaskSubmitted => "task_submitted",
            AuditKind::ManagerApproval => "manager_approval",
            AuditKind::ManagerRejection => "manager_rejection",
            AuditKind::SupervisorOverride => "supervisor_override",
            AuditKind::DecisionSuperseded => "decision_superseded",
            AuditKind::ScheduleSaved => "schedule_saved",
            AuditKind::ShiftStarted => "shift_started",
            AuditKind::ShiftEnded => "shift_ended",
            AuditKind::LeaveRequested => "leave_requested",
            AuditKind::LeaveApproved => "leave_approved",
            AuditKind::LeaveRejected => "leave_rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSubject {
    Task,
    Leave,
    Shift,
    Schedule,
}

impl AuditSubject {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditSubject::Task => "task",
            AuditSubject::Leave => "leave",
            AuditSubject::Shift => "shift",
            AuditSubject::Schedule => "schedule",
        }
    }
}

/// Immutable record of one transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: Uuid,
    pub kind: AuditKind,
    pub subject: AuditSubject,
    pub subject_id: i32,
    pub actor_id: i32,
    pub from_status: Option<String>,
    pub to_status: Option<String>,
    pub detail: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
}
