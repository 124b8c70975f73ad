use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::engine::status::LeaveStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeaveType {
    Annual,
    Health,
    Excuse,
}

impl LeaveType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaveType::Annual => "ANNUAL",
            LeaveType::Health => "HEALTH",
            LeaveType::Excuse => "EXCUSE",
        }
    }

    pub fn parse(raw: &str) -> Option<LeaveType> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "ANNUAL" | "YILLIK" => Some(LeaveType::Annual),
            "HEALTH" | "SAGLIK" | "RAPOR" => Some(LeaveType::Health),
            "EXCUSE" | "MAZERET" => Some(LeaveType::Excuse),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LeaveRequest {
    pub id: i32,
    pub staff_id: i32,
    pub range: DateRange,
    pub leave_type: LeaveType,
    pub description: String,
    pub status: LeaveStatus,
    pub reviewer_id: Option<i32>,
    pub review_message: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    /// Set once the staff member has seen the outcome of a rejection.
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewLeaveRequest {
    pub staff_id: i32,
    pub range: DateRange,
    pub leave_type: LeaveType,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl NewLeaveRequest {
    pub fn into_request(self, id: i32) -> LeaveRequest {
        LeaveRequest {
            id,
            staff_id: self.staff_id,
            range: self.range,
            leave_type: self.leave_type,
            description: self.description,
            status: LeaveStatus::Pending,
            reviewer_id: None,
            review_message: None,
            reviewed_at: None,
            acknowledged_at: None,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LeaveWarning {
    /// Another pending or approved request of the same staff member covers
    /// part of the range.
    OverlapsLeave { leave_id: i32 },
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LeaveRequested {
    pub request: LeaveRequest,
    pub warnings: Vec<LeaveWarning>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateLeaveRequest {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub leave_type: LeaveType,
    #[validate(length(max = 2000))]
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeaveDecision {
    Approved,
    Rejected,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ReviewLeaveRequest {
    pub decision: LeaveDecision,
    #[validate(length(max = 2000))]
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct LeaveQuery {
    pub staff: Option<i32>,
}
