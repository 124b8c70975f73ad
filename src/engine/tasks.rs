use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;

use crate::config::EnginePolicy;
use crate::engine::audit::AuditEmitter;
use crate::engine::authority::{can_manage, Action, Target};
use crate::engine::error::EngineError;
use crate::engine::shift::ShiftScheduler;
use crate::engine::state_machine::{TaskEvent, TaskStateMachine, Transition};
use crate::engine::status::TaskStatus;
use crate::models::audit::{AuditEvent, AuditKind, AuditSubject};
use crate::models::auth::{Actor, StaffMember};
use crate::models::task::{AssignTaskRequest, DeadlineRule, NewTask, Submission, Task, TaskQuery};
use crate::notify::Notifier;
use crate::store::{StaffDirectory, TaskFilter, TaskStore};

/// Loads a task together with its assignee.
pub(crate) async fn load_task(
    tasks: &dyn TaskStore,
    staff: &dyn StaffDirectory,
    task_id: i32,
) -> Result<(Task, StaffMember), EngineError> {
    let task = tasks
        .find_task(task_id)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("task {}", task_id)))?;
    let assignee = staff
        .find_staff(task.assigned_to)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("staff {}", task.assigned_to)))?;
    Ok((task, assignee))
}

/// Persists a computed transition with a compare-and-swap on its pre-state
/// and records the audit event.
pub(crate) async fn commit(
    tasks: &dyn TaskStore,
    audit: &AuditEmitter,
    actor: &Actor,
    transition: &Transition,
) -> Result<(), EngineError> {
    if let Err(e) = tasks.swap_task(transition.base, &transition.task).await {
        if let EngineError::StateConflict { .. } = e {
            log::warn!(
                "Task {} changed underneath actor {} ({}): {}",
                transition.task.id,
                actor.id,
                transition.kind.as_str(),
                e
            );
        }
        return Err(e);
    }

    audit
        .emit(
            AuditEvent::new(transition.kind, AuditSubject::Task, transition.task.id, actor.id)
                .statuses(Some(transition.from.as_str()), transition.task.status.as_str())
                .detail(json!({ "review_note": transition.task.review_note })),
        )
        .await;
    Ok(())
}

#[derive(Clone)]
pub struct TaskService {
    tasks: Arc<dyn TaskStore>,
    staff: Arc<dyn StaffDirectory>,
    scheduler: ShiftScheduler,
    machine: TaskStateMachine,
    audit: AuditEmitter,
    notifier: Arc<dyn Notifier>,
    policy: EnginePolicy,
}

impl TaskService {
    pub fn new(
        tasks: Arc<dyn TaskStore>,
        staff: Arc<dyn StaffDirectory>,
        scheduler: ShiftScheduler,
        machine: TaskStateMachine,
        audit: AuditEmitter,
        notifier: Arc<dyn Notifier>,
        policy: EnginePolicy,
    ) -> Self {
        Self {
            tasks,
            staff,
            scheduler,
            machine,
            audit,
            notifier,
            policy,
        }
    }

    pub async fn assign(&self, actor: &Actor, req: AssignTaskRequest) -> Result<Task, EngineError> {
        let assignee = self
            .staff
            .find_staff(req.assigned_to)
            .await?
            .ok_or_else(|| EngineError::invalid("assigned_to", "unknown staff member"))?;
        if !can_manage(actor, &assignee) {
            return Err(EngineError::AuthorityDenied);
        }

        let now = Utc::now();
        let rule = req.deadline.unwrap_or(DeadlineRule::Hours {
            hours: self.policy.default_task_hours,
        });
        let deadline = match rule {
            DeadlineRule::Hours { hours } if hours <= 0 => {
                return Err(EngineError::invalid("deadline.hours", "must be positive"));
            }
            DeadlineRule::Hours { hours } => Some(
                Duration::try_hours(hours)
                    .and_then(|span| now.checked_add_signed(span))
                    .ok_or_else(|| EngineError::invalid("deadline.hours", "deadline is too far in the future"))?,
            ),
            DeadlineRule::ShiftEnd => {
                let today = self.scheduler.local_date(now);
                self.scheduler
                    .window_for(assignee.id, today)
                    .await?
                    .bounds()
                    .map(|(_, end)| {
                        let offset = Duration::minutes(i64::from(self.policy.utc_offset_minutes));
                        (end - offset).and_utc()
                    })
            }
        };

        let task = self
            .tasks
            .insert_task(NewTask {
                title: req.title.trim().to_string(),
                description: req.description,
                category: req.category,
                subtype: req.subtype,
                customer: req.customer,
                assigned_to: assignee.id,
                assigned_by: actor.id,
                branch_id: assignee.branch_id,
                deadline,
                assigned_at: now,
            })
            .await?;

        self.audit
            .emit(
                AuditEvent::new(AuditKind::TaskAssigned, AuditSubject::Task, task.id, actor.id)
                    .statuses(None, TaskStatus::Assigned.as_str())
                    .detail(json!({ "assigned_to": task.assigned_to, "deadline": task.deadline })),
            )
            .await;
        self.notifier
            .notify(task.assigned_to, &format!("New task assigned: {}", task.title))
            .await;

        log::info!("Task {} assigned to staff {} by {}", task.id, task.assigned_to, actor.id);
        Ok(task)
    }

    /// Tasks `actor` may see, optionally narrowed by assignee and category.
    pub async fn list(&self, actor: &Actor, query: &TaskQuery) -> Result<Vec<Task>, EngineError> {
        let filter = TaskFilter {
            assigned_to: query.staff,
            category: query.category,
        };
        let candidates = self.tasks.list_tasks(&filter).await?;

        let mut assignees: HashMap<i32, Option<StaffMember>> = HashMap::new();
        let mut visible = Vec::with_capacity(candidates.len());
        for task in candidates {
            if !assignees.contains_key(&task.assigned_to) {
                let member = self.staff.find_staff(task.assigned_to).await?;
                assignees.insert(task.assigned_to, member);
            }
            let Some(Some(assignee)) = assignees.get(&task.assigned_to) else {
                log::warn!("Task {} has unknown assignee {}", task.id, task.assigned_to);
                continue;
            };
            let target = Target::Task { task: &task, assignee };
            if self.machine.authority().can_act(actor, Action::View, target) {
                visible.push(task);
            }
        }
        Ok(visible)
    }

    pub async fn get(&self, actor: &Actor, task_id: i32) -> Result<Task, EngineError> {
        let (task, assignee) = load_task(self.tasks.as_ref(), self.staff.as_ref(), task_id).await?;
        self.machine
            .authority()
            .check(actor, Action::View, Target::Task { task: &task, assignee: &assignee })?;
        Ok(task)
    }

    pub async fn start(&self, actor: &Actor, task_id: i32) -> Result<Task, EngineError> {
        self.apply(actor, task_id, TaskEvent::Start).await
    }

    pub async fn submit(&self, actor: &Actor, task_id: i32, payload: Submission) -> Result<Task, EngineError> {
        let task = self.apply(actor, task_id, TaskEvent::Submit(payload)).await?;
        self.notifier
            .notify(task.assigned_by, &format!("Task submitted for review: {}", task.title))
            .await;
        Ok(task)
    }

    async fn apply(&self, actor: &Actor, task_id: i32, event: TaskEvent) -> Result<Task, EngineError> {
        let (task, assignee) = load_task(self.tasks.as_ref(), self.staff.as_ref(), task_id).await?;
        let transition = self.machine.transition(&task, &assignee, event, actor, Utc::now())?;
        commit(self.tasks.as_ref(), &self.audit, actor, &transition).await?;

        log::info!(
            "Task {} moved {} -> {} by {}",
            task_id,
            transition.from,
            transition.task.status,
            actor.id
        );
        Ok(transition.task)
    }
}
