use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::engine::error::{FieldError, ValidationCode};
use crate::engine::status::{LeaveStatus, TaskStatus};
use crate::handlers::{auth, health, leave, shift, task};
use crate::models::auth::{Actor, CurrentUser, ErrorResponse, Role, StaffMember};
use crate::models::leave::{
    CreateLeaveRequest, DateRange, LeaveDecision, LeaveRequest, LeaveRequested, LeaveType, LeaveWarning,
    ReviewLeaveRequest,
};
use crate::models::price::{Observation, ObservationStatus, PriceRow, PriceRowView, UnitPrice};
use crate::models::shift::{
    CurrentShift, ExpectedWindow, OffReason, SaveScheduleRequest, Schedule, ScheduleSaved, ScheduleWarning,
    ShiftRecord, ToggleAction, ToggleShiftRequest,
};
use crate::models::task::{
    AssignTaskRequest, CustomerInfo, DeadlineRule, OverrideDecision, OverrideRequest, RejectTaskRequest, Submission,
    SubmitTaskRequest, Task, TaskCategory,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Field Operations API",
        description = "Task assignment, review, price research, shifts and leave for field staff"
    ),
    paths(
        health::health_check,
        auth::get_me,
        task::list_tasks,
        task::get_task,
        task::assign_task,
        task::start_task,
        task::submit_task,
        task::approve_task,
        task::reject_task,
        task::override_task,
        task::commit_price_row,
        task::get_unit_price,
        shift::toggle_shift,
        shift::current_shift,
        shift::expected_window,
        shift::save_schedule,
        leave::create_leave_request,
        leave::list_leave_requests,
        leave::get_leave_request,
        leave::review_leave_request,
        leave::rejection_notice,
        leave::acknowledge_rejection,
    ),
    components(schemas(
        Actor, Role, StaffMember, CurrentUser, ErrorResponse, FieldError, ValidationCode,
        Task, TaskStatus, TaskCategory, CustomerInfo, Submission, DeadlineRule,
        AssignTaskRequest, SubmitTaskRequest, RejectTaskRequest, OverrideRequest, OverrideDecision,
        PriceRow, Observation, ObservationStatus, PriceRowView, UnitPrice,
        ShiftRecord, Schedule, ScheduleWarning, ScheduleSaved, ExpectedWindow, OffReason,
        ToggleShiftRequest, ToggleAction, SaveScheduleRequest, CurrentShift,
        LeaveRequest, LeaveStatus, LeaveType, DateRange, LeaveWarning, LeaveRequested,
        CreateLeaveRequest, ReviewLeaveRequest, LeaveDecision,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Service health"),
        (name = "auth", description = "Identity behind the bearer token"),
        (name = "tasks", description = "Task assignment and submission"),
        (name = "approvals", description = "Manager review and supervisor override"),
        (name = "price research", description = "Competitor price rows"),
        (name = "shifts", description = "Schedules and clock-in/out"),
        (name = "leave", description = "Leave requests")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
