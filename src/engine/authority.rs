//! Role & authority resolution.
//!
//! Pure predicates; nothing here reads or writes a store. The state machine
//! and the workflows call [`Authority::check`] as their guard, and listing
//! filters with [`Authority::can_act`].

use crate::engine::error::EngineError;
use crate::engine::status::{LeaveStatus, TaskStatus};
use crate::models::auth::{Actor, Role, StaffMember};
use crate::models::leave::LeaveRequest;
use crate::models::task::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    View,
    Submit,
    Approve,
    Reject,
    Override,
}

/// A record together with the staff member who owns it.
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    Task {
        task: &'a Task,
        assignee: &'a StaffMember,
    },
    Leave {
        request: &'a LeaveRequest,
        staff: &'a StaffMember,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct Authority {
    allow_override_of_approved: bool,
}

impl Authority {
    pub fn new(allow_override_of_approved: bool) -> Self {
        Self {
            allow_override_of_approved,
        }
    }

    pub fn can_act(&self, actor: &Actor, action: Action, target: Target<'_>) -> bool {
        self.check(actor, action, target).is_ok()
    }

    /// Same decision as [`can_act`](Self::can_act), but says why: a missing
    /// standing is `AuthorityDenied`, a wrong current status is `StateConflict`.
    pub fn check(&self, actor: &Actor, action: Action, target: Target<'_>) -> Result<(), EngineError> {
        match target {
            Target::Task { task, assignee } => self.check_task(actor, action, task, assignee),
            Target::Leave { request, staff } => check_leave(actor, action, request, staff),
        }
    }

    fn check_task(
        &self,
        actor: &Actor,
        action: Action,
        task: &Task,
        assignee: &StaffMember,
    ) -> Result<(), EngineError> {
        let standing = match action {
            Action::View => match actor.role {
                Role::Staff => task.assigned_to == actor.id,
                Role::Manager => manages(actor, assignee) || task.assigned_by == actor.id,
                Role::Supervizor => true,
            },
            Action::Submit => task.assigned_to == actor.id,
            Action::Approve | Action::Reject => {
                actor.role == Role::Supervizor || (actor.role == Role::Manager && manages(actor, assignee))
            }
            Action::Override => {
                actor.role == Role::Supervizor
                    && (task.status != TaskStatus::Approved || self.allow_override_of_approved)
            }
        };
        if !standing {
            return Err(EngineError::AuthorityDenied);
        }

        match action {
            Action::View | Action::Override => Ok(()),
            Action::Submit => match task.status {
                TaskStatus::Assigned | TaskStatus::InProgress | TaskStatus::Rejected => Ok(()),
                found => Err(EngineError::conflict("ASSIGNED|IN_PROGRESS|REJECTED", found)),
            },
            Action::Approve | Action::Reject => match task.status {
                TaskStatus::Submitted => Ok(()),
                found => Err(EngineError::conflict(TaskStatus::Submitted, found)),
            },
        }
    }
}

fn check_leave(
    actor: &Actor,
    action: Action,
    request: &LeaveRequest,
    staff: &StaffMember,
) -> Result<(), EngineError> {
    let standing = match action {
        Action::View => request.staff_id == actor.id || actor.role >= Role::Manager,
        // Nobody reviews their own leave.
        Action::Approve | Action::Reject => actor.role >= Role::Manager && staff.id != actor.id,
        Action::Submit | Action::Override => false,
    };
    if !standing {
        return Err(EngineError::AuthorityDenied);
    }

    match action {
        Action::Approve | Action::Reject if request.status != LeaveStatus::Pending => {
            Err(EngineError::conflict(LeaveStatus::Pending, request.status))
        }
        _ => Ok(()),
    }
}

/// Whether `actor` may write schedules for, and assign tasks to, `staff`.
pub fn can_manage(actor: &Actor, staff: &StaffMember) -> bool {
    actor.role == Role::Supervizor || (actor.role == Role::Manager && manages(actor, staff))
}

/// Whether `actor` may read `staff`'s shift records and expected windows.
pub fn can_view_staff(actor: &Actor, staff: &StaffMember) -> bool {
    actor.id == staff.id || can_manage(actor, staff)
}

fn manages(actor: &Actor, staff: &StaffMember) -> bool {
    staff.manager_id == Some(actor.id)
}
