//! Manager and supervisor decisions on submitted work.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use crate::engine::audit::AuditEmitter;
use crate::engine::error::EngineError;
use crate::engine::state_machine::{TaskEvent, TaskStateMachine, Transition};
use crate::engine::tasks::{commit, load_task};
use crate::models::audit::{AuditEvent, AuditKind, AuditSubject};
use crate::models::auth::Actor;
use crate::models::task::{OverrideDecision, Task};
use crate::notify::Notifier;
use crate::store::{StaffDirectory, TaskStore};

#[derive(Clone)]
pub struct ApprovalWorkflow {
    tasks: Arc<dyn TaskStore>,
    staff: Arc<dyn StaffDirectory>,
    machine: TaskStateMachine,
    audit: AuditEmitter,
    notifier: Arc<dyn Notifier>,
}

impl ApprovalWorkflow {
    pub fn new(
        tasks: Arc<dyn TaskStore>,
        staff: Arc<dyn StaffDirectory>,
        machine: TaskStateMachine,
        audit: AuditEmitter,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            tasks,
            staff,
            machine,
            audit,
            notifier,
        }
    }

    pub async fn approve(&self, actor: &Actor, task_id: i32) -> Result<Task, EngineError> {
        let transition = self.decide(actor, task_id, TaskEvent::Approve).await?;
        let task = transition.task;

        self.notifier
            .notify(task.assigned_to, &format!("Your task \"{}\" was approved", task.title))
            .await;
        log::info!("Task {} approved by {}", task.id, actor.id);
        Ok(task)
    }

    pub async fn reject(&self, actor: &Actor, task_id: i32, reason: String) -> Result<Task, EngineError> {
        let transition = self.decide(actor, task_id, TaskEvent::Reject { reason }).await?;
        let task = transition.task;

        self.notifier
            .notify(
                task.assigned_to,
                &format!(
                    "Your task \"{}\" was rejected: {}",
                    task.title,
                    task.review_note.as_deref().unwrap_or_default()
                ),
            )
            .await;
        log::info!("Task {} rejected by {}", task.id, actor.id);
        Ok(task)
    }

    /// Supervisor decision that bypasses the manager guard. Audited as
    /// `supervisor_override`; a replaced earlier decision is audited as
    /// `decision_superseded`.
    pub async fn override_decision(
        &self,
        actor: &Actor,
        task_id: i32,
        decision: OverrideDecision,
        reason: Option<String>,
    ) -> Result<Task, EngineError> {
        let transition = self
            .decide(actor, task_id, TaskEvent::Override { decision, reason })
            .await?;

        if let Some(prior) = &transition.superseded {
            self.audit
                .emit(
                    AuditEvent::new(AuditKind::DecisionSuperseded, AuditSubject::Task, task_id, actor.id)
                        .statuses(Some(prior.status.as_str()), transition.task.status.as_str())
                        .detail(json!({
                            "prior_status": prior.status,
                            "prior_reviewer_id": prior.reviewer_id,
                            "prior_reviewed_at": prior.reviewed_at,
                            "prior_review_note": prior.review_note,
                        })),
                )
                .await;
        }

        let task = transition.task;
        let verdict = match decision {
            OverrideDecision::Approve => "approved",
            OverrideDecision::Reject => "rejected",
        };
        self.notifier
            .notify(
                task.assigned_to,
                &format!("Your task \"{}\" was {} by a supervisor", task.title, verdict),
            )
            .await;
        log::info!(
            "Task {} {} by supervisor override ({}), superseding {:?}",
            task.id,
            verdict,
            actor.id,
            transition.superseded.as_ref().map(|p| p.status)
        );
        Ok(task)
    }

    async fn decide(&self, actor: &Actor, task_id: i32, event: TaskEvent) -> Result<Transition, EngineError> {
        let (task, assignee) = load_task(self.tasks.as_ref(), self.staff.as_ref(), task_id).await?;
        let transition = self.machine.transition(&task, &assignee, event, actor, Utc::now())?;
        commit(self.tasks.as_ref(), &self.audit, actor, &transition).await?;
        Ok(transition)
    }
}
