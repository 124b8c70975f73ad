//! Leave requests: filing, review, and the rejection notice shown to staff.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use crate::engine::audit::AuditEmitter;
use crate::engine::authority::{Action, Authority, Target};
use crate::engine::error::{EngineError, FieldError};
use crate::engine::status::LeaveStatus;
use crate::models::audit::{AuditEvent, AuditKind, AuditSubject};
use crate::models::auth::{Actor, Role, StaffMember};
use crate::models::leave::{
    CreateLeaveRequest, DateRange, LeaveDecision, LeaveRequest, LeaveRequested, LeaveWarning, NewLeaveRequest,
};
use crate::notify::Notifier;
use crate::store::{LeaveStore, StaffDirectory};

/// Requests of the same staff member that still count against `range`.
pub fn overlapping(range: &DateRange, existing: &[LeaveRequest]) -> Vec<LeaveWarning> {
    existing
        .iter()
        .filter(|leave| leave.status != LeaveStatus::Rejected && leave.range.overlaps(range))
        .map(|leave| LeaveWarning::OverlapsLeave { leave_id: leave.id })
        .collect()
}

/// Applies a decision to a pending request. The caller has already checked
/// authority.
pub fn decide(
    request: &LeaveRequest,
    decision: LeaveDecision,
    message: &str,
    reviewer: &Actor,
) -> Result<LeaveRequest, EngineError> {
    if request.status != LeaveStatus::Pending {
        return Err(EngineError::conflict(LeaveStatus::Pending, request.status));
    }

    let message = message.trim();
    if decision == LeaveDecision::Rejected && message.is_empty() {
        return Err(EngineError::Validation(vec![FieldError::required(
            "message",
            "a rejection needs a message",
        )]));
    }

    let mut next = request.clone();
    next.status = match decision {
        LeaveDecision::Approved => LeaveStatus::Approved,
        LeaveDecision::Rejected => LeaveStatus::Rejected,
    };
    next.reviewer_id = Some(reviewer.id);
    next.review_message = (!message.is_empty()).then(|| message.to_string());
    next.reviewed_at = Some(Utc::now());
    Ok(next)
}

#[derive(Clone)]
pub struct LeaveWorkflow {
    leaves: Arc<dyn LeaveStore>,
    staff: Arc<dyn StaffDirectory>,
    authority: Authority,
    audit: AuditEmitter,
    notifier: Arc<dyn Notifier>,
}

impl LeaveWorkflow {
    pub fn new(
        leaves: Arc<dyn LeaveStore>,
        staff: Arc<dyn StaffDirectory>,
        authority: Authority,
        audit: AuditEmitter,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            leaves,
            staff,
            authority,
            audit,
            notifier,
        }
    }

    async fn staff_member(&self, staff_id: i32) -> Result<StaffMember, EngineError> {
        self.staff
            .find_staff(staff_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("staff {}", staff_id)))
    }

    pub async fn request(&self, actor: &Actor, req: CreateLeaveRequest) -> Result<LeaveRequested, EngineError> {
        if req.start > req.end {
            return Err(EngineError::invalid("end", "end date must not be before start date"));
        }
        let range = DateRange {
            start: req.start,
            end: req.end,
        };

        let existing = self.leaves.list_leaves(Some(actor.id)).await?;
        let warnings = overlapping(&range, &existing);

        let request = self
            .leaves
            .insert_leave(NewLeaveRequest {
                staff_id: actor.id,
                range,
                leave_type: req.leave_type,
                description: req.description.trim().to_string(),
                created_at: Utc::now(),
            })
            .await?;

        self.audit
            .emit(
                AuditEvent::new(AuditKind::LeaveRequested, AuditSubject::Leave, request.id, actor.id)
                    .statuses(None, LeaveStatus::Pending.as_str())
                    .detail(json!({
                        "leave_type": request.leave_type,
                        "range": request.range,
                        "warnings": &warnings,
                    })),
            )
            .await;

        if let Some(manager_id) = self.staff_member(actor.id).await?.manager_id {
            self.notifier
                .notify(
                    manager_id,
                    &format!(
                        "Leave request {} from staff {}: {} to {}",
                        request.id, actor.id, request.range.start, request.range.end
                    ),
                )
                .await;
        }

        if !warnings.is_empty() {
            log::warn!("Leave request {} overlaps {:?}", request.id, warnings);
        }
        log::info!("Leave request {} filed by staff {}", request.id, actor.id);
        Ok(LeaveRequested { request, warnings })
    }

    pub async fn review(
        &self,
        actor: &Actor,
        leave_id: i32,
        decision: LeaveDecision,
        message: &str,
    ) -> Result<LeaveRequest, EngineError> {
        let request = self
            .leaves
            .find_leave(leave_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("leave request {}", leave_id)))?;
        let owner = self.staff_member(request.staff_id).await?;

        let action = match decision {
            LeaveDecision::Approved => Action::Approve,
            LeaveDecision::Rejected => Action::Reject,
        };
        self.authority.check(actor, action, Target::Leave {
            request: &request,
            staff: &owner,
        })?;

        let next = decide(&request, decision, message, actor)?;
        self.leaves.swap_leave(request.status, &next).await?;

        let kind = match decision {
            LeaveDecision::Approved => AuditKind::LeaveApproved,
            LeaveDecision::Rejected => AuditKind::LeaveRejected,
        };
        self.audit
            .emit(
                AuditEvent::new(kind, AuditSubject::Leave, next.id, actor.id)
                    .statuses(Some(request.status.as_str()), next.status.as_str())
                    .detail(json!({ "message": next.review_message })),
            )
            .await;
        self.notifier
            .notify(
                next.staff_id,
                &format!(
                    "Your leave request for {} to {} was {}",
                    next.range.start,
                    next.range.end,
                    next.status.as_str().to_lowercase()
                ),
            )
            .await;

        log::info!("Leave request {} {} by {}", next.id, next.status, actor.id);
        Ok(next)
    }

    /// Staff see their own requests; managers and supervisors see everyone's,
    /// optionally narrowed to one staff member.
    pub async fn list(&self, actor: &Actor, staff: Option<i32>) -> Result<Vec<LeaveRequest>, EngineError> {
        let staff_id = match actor.role {
            Role::Staff => match staff {
                Some(id) if id != actor.id => return Err(EngineError::AuthorityDenied),
                _ => Some(actor.id),
            },
            Role::Manager | Role::Supervizor => staff,
        };
        self.leaves.list_leaves(staff_id).await
    }

    pub async fn get(&self, actor: &Actor, leave_id: i32) -> Result<LeaveRequest, EngineError> {
        let request = self
            .leaves
            .find_leave(leave_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("leave request {}", leave_id)))?;
        let owner = self.staff_member(request.staff_id).await?;
        self.authority.check(actor, Action::View, Target::Leave {
            request: &request,
            staff: &owner,
        })?;
        Ok(request)
    }

    /// Most recent rejection the actor has not acknowledged yet.
    pub async fn rejection_notice(&self, actor: &Actor) -> Result<Option<LeaveRequest>, EngineError> {
        let notice = self
            .leaves
            .list_leaves(Some(actor.id))
            .await?
            .into_iter()
            .filter(|leave| leave.status == LeaveStatus::Rejected && leave.acknowledged_at.is_none())
            .max_by_key(|leave| (leave.reviewed_at, leave.id));
        Ok(notice)
    }

    /// Dismisses the rejection notice for `leave_id` and any older one.
    pub async fn acknowledge(&self, actor: &Actor, leave_id: i32) -> Result<u64, EngineError> {
        let request = self
            .leaves
            .find_leave(leave_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("leave request {}", leave_id)))?;
        if request.staff_id != actor.id {
            return Err(EngineError::AuthorityDenied);
        }
        let reviewed_at = match (request.status, request.reviewed_at) {
            (LeaveStatus::Rejected, Some(at)) => at,
            (status, _) => return Err(EngineError::conflict(LeaveStatus::Rejected, status)),
        };

        let marked = self
            .leaves
            .acknowledge_rejections(actor.id, reviewed_at, Utc::now())
            .await?;
        log::info!("Staff {} acknowledged {} rejected leave request(s)", actor.id, marked);
        Ok(marked)
    }
}
