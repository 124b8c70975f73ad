//! Task lifecycle.
//!
//! ```text
//! ASSIGNED -> IN_PROGRESS -> SUBMITTED -> APPROVED
//!                 ^                   \-> REJECTED
//!                 \-------------------------/
//! ```
//!
//! Transitions are computed here without side effects. The caller persists
//! [`Transition::task`] with a compare-and-swap on [`Transition::base`].

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::engine::authority::{Action, Authority, Target};
use crate::engine::error::{EngineError, FieldError};
use crate::engine::margin::margin;
use crate::engine::router::{delivery_description, validate_submission};
use crate::engine::status::TaskStatus;
use crate::models::audit::AuditKind;
use crate::models::auth::{Actor, StaffMember};
use crate::models::task::{OverrideDecision, Submission, Task, TaskCategory, TaskRevision};

#[derive(Debug, Clone)]
pub enum TaskEvent {
    Start,
    Submit(Submission),
    Approve,
    Reject { reason: String },
    Override {
        decision: OverrideDecision,
        reason: Option<String>,
    },
}

/// A review outcome replaced by a supervisor override.
#[derive(Debug, Clone, PartialEq)]
pub struct PriorDecision {
    pub status: TaskStatus,
    pub reviewer_id: Option<i32>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_note: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Transition {
    pub task: Task,
    pub from: TaskStatus,
    /// Stored state the transition was computed from.
    pub base: TaskRevision,
    pub kind: AuditKind,
    pub superseded: Option<PriorDecision>,
}

#[derive(Debug, Clone, Copy)]
pub struct TaskStateMachine {
    authority: Authority,
}

impl TaskStateMachine {
    pub fn new(authority: Authority) -> Self {
        Self { authority }
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    pub fn transition(
        &self,
        task: &Task,
        assignee: &StaffMember,
        event: TaskEvent,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<Transition, EngineError> {
        let target = Target::Task { task, assignee };
        let mut next = task.clone();

        let (kind, superseded) = match event {
            TaskEvent::Start => {
                if actor.id != task.assigned_to {
                    return Err(EngineError::AuthorityDenied);
                }
                match task.status {
                    TaskStatus::Assigned | TaskStatus::Rejected => {}
                    found => return Err(EngineError::conflict("ASSIGNED|REJECTED", found)),
                }
                next.status = TaskStatus::InProgress;
                next.started_at = next.started_at.or(Some(now));
                (AuditKind::TaskStarted, None)
            }

            TaskEvent::Submit(payload) => {
                self.authority.check(actor, Action::Submit, target)?;
                let submission = prepare_submission(task, payload);
                validate_submission(task.category, &submission).into_result()?;

                // ASSIGNED and REJECTED pass through IN_PROGRESS.
                next.started_at = next.started_at.or(Some(now));
                next.status = TaskStatus::Submitted;
                next.submission = Some(submission);
                next.submitted_at = Some(now);
                next.reviewer_id = None;
                next.reviewed_at = None;
                next.review_note = None;
                (AuditKind::TaskSubmitted, None)
            }

            TaskEvent::Approve => {
                self.authority.check(actor, Action::Approve, target)?;
                record_review(&mut next, TaskStatus::Approved, actor, None, now);
                (AuditKind::ManagerApproval, None)
            }

            TaskEvent::Reject { reason } => {
                self.authority.check(actor, Action::Reject, target)?;
                let reason = required_reason(Some(reason))?;
                record_review(&mut next, TaskStatus::Rejected, actor, Some(reason), now);
                (AuditKind::ManagerRejection, None)
            }

            TaskEvent::Override { decision, reason } => {
                self.authority.check(actor, Action::Override, target)?;
                let (status, note) = match decision {
                    OverrideDecision::Approve => (TaskStatus::Approved, clean(reason)),
                    OverrideDecision::Reject => (TaskStatus::Rejected, Some(required_reason(reason)?)),
                };
                let superseded = match task.status {
                    TaskStatus::Approved | TaskStatus::Rejected => Some(PriorDecision {
                        status: task.status,
                        reviewer_id: task.reviewer_id,
                        reviewed_at: task.reviewed_at,
                        review_note: task.review_note.clone(),
                    }),
                    _ => None,
                };
                record_review(&mut next, status, actor, note, now);
                (AuditKind::SupervisorOverride, superseded)
            }
        };

        Ok(Transition {
            task: next,
            from: task.status,
            base: task.revision(),
            kind,
            superseded,
        })
    }
}

/// Normalises a payload before validation: unsaved price rows are dropped,
/// saved rows get their margin re-derived, and delivery descriptions are
/// generated when left blank.
fn prepare_submission(task: &Task, mut payload: Submission) -> Submission {
    if task.category == TaskCategory::PriceResearch {
        payload.price_rows.retain(|row| row.saved);
        for row in &mut payload.price_rows {
            // Out-of-range rows are reported by the router's row checks.
            row.margin = margin(row.our_price, &row.observations).unwrap_or(Decimal::ZERO);
        }
    } else {
        payload.price_rows.clear();
    }

    if task.category == TaskCategory::Delivery && payload.description.trim().is_empty() {
        payload.description = delivery_description(task);
    }
    payload
}

fn record_review(task: &mut Task, status: TaskStatus, actor: &Actor, note: Option<String>, now: DateTime<Utc>) {
    task.status = status;
    task.reviewer_id = Some(actor.id);
    task.reviewed_at = Some(now);
    task.review_note = note;
}

fn clean(reason: Option<String>) -> Option<String> {
    reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty())
}

fn required_reason(reason: Option<String>) -> Result<String, EngineError> {
    clean(reason).ok_or_else(|| {
        EngineError::Validation(vec![FieldError::required("reason", "a rejection needs a reason")])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::auth::Role;
    use crate::models::task::NewTask;

    const STAFF: Actor = Actor { id: 10, role: Role::Staff, branch_id: 1 };
    const MANAGER: Actor = Actor { id: 2, role: Role::Manager, branch_id: 1 };
    const SUPERVIZOR: Actor = Actor { id: 1, role: Role::Supervizor, branch_id: 1 };

    fn assignee() -> StaffMember {
        StaffMember {
            id: 10,
            name: "Mehmet".to_string(),
            role: Role::Staff,
            branch_id: 1,
            manager_id: Some(2),
            phone: None,
        }
    }

    fn new_task() -> Task {
        NewTask {
            title: "Fix freezer door".to_string(),
            description: None,
            category: TaskCategory::TechnicalTask,
            subtype: Some("Maintenance".to_string()),
            customer: None,
            assigned_to: 10,
            assigned_by: 2,
            branch_id: 1,
            deadline: None,
            assigned_at: Utc::now(),
        }
        .into_task(1)
    }

    fn report() -> Submission {
        Submission {
            description: "Replaced the seal".to_string(),
            ..Default::default()
        }
    }

    fn apply(machine: &TaskStateMachine, task: &Task, event: TaskEvent, actor: &Actor) -> Result<Task, EngineError> {
        machine
            .transition(task, &assignee(), event, actor, Utc::now())
            .map(|t| t.task)
    }

    #[test]
    fn happy_path_to_approved() {
        let machine = TaskStateMachine::new(Authority::new(true));
        let task = new_task();

        let task = apply(&machine, &task, TaskEvent::Start, &STAFF).unwrap();
        assert_eq!(task.status, TaskStatus::InProgress);
        assert!(task.started_at.is_some());

        let task = apply(&machine, &task, TaskEvent::Submit(report()), &STAFF).unwrap();
        assert_eq!(task.status, TaskStatus::Submitted);
        assert!(task.submitted_at.is_some());

        let transition = machine
            .transition(&task, &assignee(), TaskEvent::Approve, &MANAGER, Utc::now())
            .unwrap();
        assert_eq!(transition.from, TaskStatus::Submitted);
        assert_eq!(transition.kind, AuditKind::ManagerApproval);
        assert_eq!(transition.task.status, TaskStatus::Approved);
        assert_eq!(transition.task.reviewer_id, Some(MANAGER.id));
    }

    #[test]
    fn only_assignee_starts() {
        let machine = TaskStateMachine::new(Authority::new(true));
        assert!(matches!(
            apply(&machine, &new_task(), TaskEvent::Start, &MANAGER),
            Err(EngineError::AuthorityDenied)
        ));
    }

    #[test]
    fn rejected_task_can_be_resubmitted() {
        let machine = TaskStateMachine::new(Authority::new(true));
        let task = apply(&machine, &new_task(), TaskEvent::Submit(report()), &STAFF).unwrap();

        let reject = TaskEvent::Reject { reason: "Photo missing".to_string() };
        let task = apply(&machine, &task, reject, &MANAGER).unwrap();
        assert_eq!(task.status, TaskStatus::Rejected);
        assert_eq!(task.review_note.as_deref(), Some("Photo missing"));

        let task = apply(&machine, &task, TaskEvent::Start, &STAFF).unwrap();
        assert_eq!(task.status, TaskStatus::InProgress);

        let task = apply(&machine, &task, TaskEvent::Submit(report()), &STAFF).unwrap();
        assert_eq!(task.status, TaskStatus::Submitted);
        assert!(task.review_note.is_none());
    }

    #[test]
    fn reject_needs_a_reason() {
        let machine = TaskStateMachine::new(Authority::new(true));
        let task = apply(&machine, &new_task(), TaskEvent::Submit(report()), &STAFF).unwrap();

        let result = apply(&machine, &task, TaskEvent::Reject { reason: "  ".to_string() }, &MANAGER);
        assert!(matches!(result, Err(EngineError::Validation(_))));
    }

    #[test]
    fn approved_is_a_sink_except_for_override() {
        let machine = TaskStateMachine::new(Authority::new(true));
        let task = apply(&machine, &new_task(), TaskEvent::Submit(report()), &STAFF).unwrap();
        let task = apply(&machine, &task, TaskEvent::Approve, &MANAGER).unwrap();

        assert!(apply(&machine, &task, TaskEvent::Start, &STAFF).is_err());
        assert!(apply(&machine, &task, TaskEvent::Submit(report()), &STAFF).is_err());
        assert!(apply(&machine, &task, TaskEvent::Approve, &MANAGER).is_err());
        assert!(apply(&machine, &task, TaskEvent::Reject { reason: "late".into() }, &SUPERVIZOR).is_err());

        let event = TaskEvent::Override {
            decision: OverrideDecision::Reject,
            reason: Some("Wrong store".to_string()),
        };
        let transition = machine
            .transition(&task, &assignee(), event, &SUPERVIZOR, Utc::now())
            .unwrap();
        assert_eq!(transition.kind, AuditKind::SupervisorOverride);
        assert_eq!(transition.task.status, TaskStatus::Rejected);
        let prior = transition.superseded.unwrap();
        assert_eq!(prior.status, TaskStatus::Approved);
        assert_eq!(prior.reviewer_id, Some(MANAGER.id));
    }

    #[test]
    fn override_of_approved_follows_policy() {
        let machine = TaskStateMachine::new(Authority::new(false));
        let task = apply(&machine, &new_task(), TaskEvent::Submit(report()), &STAFF).unwrap();
        let task = apply(&machine, &task, TaskEvent::Approve, &MANAGER).unwrap();

        let event = TaskEvent::Override { decision: OverrideDecision::Reject, reason: Some("x".into()) };
        assert!(matches!(
            apply(&machine, &task, event, &SUPERVIZOR),
            Err(EngineError::AuthorityDenied)
        ));
    }

    #[test]
    fn override_from_in_progress_supersedes_nothing() {
        let machine = TaskStateMachine::new(Authority::new(true));
        let task = apply(&machine, &new_task(), TaskEvent::Start, &STAFF).unwrap();

        let event = TaskEvent::Override { decision: OverrideDecision::Approve, reason: None };
        let transition = machine
            .transition(&task, &assignee(), event, &SUPERVIZOR, Utc::now())
            .unwrap();
        assert_eq!(transition.task.status, TaskStatus::Approved);
        assert!(transition.superseded.is_none());
        assert!(matches!(
            apply(&machine, &task, TaskEvent::Override { decision: OverrideDecision::Approve, reason: None }, &MANAGER),
            Err(EngineError::AuthorityDenied)
        ));
    }

    #[test]
    fn invalid_payload_keeps_task_untouched() {
        let machine = TaskStateMachine::new(Authority::new(true));
        let task = new_task();
        let result = apply(&machine, &task, TaskEvent::Submit(Submission::default()), &STAFF);

        assert!(matches!(result, Err(EngineError::Validation(ref errors)) if errors[0].field == "description"));
        assert_eq!(task.status, TaskStatus::Assigned);
    }
}
