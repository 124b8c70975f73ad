use std::fmt;

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::engine::status::TaskStatus;
use crate::models::price::PriceRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskCategory {
    Delivery,
    MarketTask,
    PriceResearch,
    TechnicalTask,
}

impl TaskCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskCategory::Delivery => "DELIVERY",
            TaskCategory::MarketTask => "MARKET_TASK",
            TaskCategory::PriceResearch => "PRICE_RESEARCH",
            TaskCategory::TechnicalTask => "TECHNICAL_TASK",
        }
    }

    pub fn parse(raw: &str) -> Option<TaskCategory> {
        match raw.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "DELIVERY" => Some(TaskCategory::Delivery),
            "MARKET_TASK" => Some(TaskCategory::MarketTask),
            "PRICE_RESEARCH" => Some(TaskCategory::PriceResearch),
            "TECHNICAL_TASK" => Some(TaskCategory::TechnicalTask),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema, Validate)]
pub struct CustomerInfo {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
}

/// Proof of completion attached to a task.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, ToSchema)]
pub struct Submission {
    #[serde(default)]
    pub description: String,
    /// Object-storage URLs, in capture order.
    #[serde(default)]
    pub photos: Vec<String>,
    #[serde(default)]
    pub price_rows: Vec<PriceRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Task {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub category: TaskCategory,
    /// Free-form subtype tag such as Bug, Feature or Maintenance.
    pub subtype: Option<String>,
    pub customer: Option<CustomerInfo>,
    pub assigned_to: i32,
    pub assigned_by: i32,
    pub branch_id: i32,
    pub status: TaskStatus,
    pub deadline: Option<DateTime<Utc>>,
    pub submission: Option<Submission>,
    pub assigned_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewer_id: Option<i32>,
    pub review_note: Option<String>,
}

impl Task {
    pub fn revision(&self) -> TaskRevision {
        TaskRevision {
            status: self.status,
            submitted_at: self.submitted_at,
        }
    }
}

/// Stored state a task write is conditional on. `submitted_at` tells
/// successive SUBMITTED rounds of one task apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskRevision {
    pub status: TaskStatus,
    pub submitted_at: Option<DateTime<Utc>>,
}

impl fmt::Display for TaskRevision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.submitted_at {
            Some(at) => write!(f, "{} (submitted {})", self.status, at.to_rfc3339()),
            None => write!(f, "{}", self.status),
        }
    }
}

/// Fields of a task before the store assigns it an id.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub category: TaskCategory,
    pub subtype: Option<String>,
    pub customer: Option<CustomerInfo>,
    pub assigned_to: i32,
    pub assigned_by: i32,
    pub branch_id: i32,
    pub deadline: Option<DateTime<Utc>>,
    pub assigned_at: DateTime<Utc>,
}

impl NewTask {
    pub fn into_task(self, id: i32) -> Task {
        Task {
            id,
            title: self.title,
            description: self.description,
            category: self.category,
            subtype: self.subtype,
            customer: self.customer,
            assigned_to: self.assigned_to,
            assigned_by: self.assigned_by,
            branch_id: self.branch_id,
            status: TaskStatus::Assigned,
            deadline: self.deadline,
            submission: None,
            assigned_at: self.assigned_at,
            started_at: None,
            submitted_at: None,
            reviewed_at: None,
            reviewer_id: None,
            review_note: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeadlineRule {
    /// Fixed number of hours after assignment.
    Hours { hours: i64 },
    /// End of the assignee's expected shift on the assignment day.
    ShiftEnd,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct AssignTaskRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub description: Option<String>,
    pub category: TaskCategory,
    pub subtype: Option<String>,
    #[validate(nested)]
    pub customer: Option<CustomerInfo>,
    pub assigned_to: i32,
    pub deadline: Option<DeadlineRule>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitTaskRequest {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub photos: Vec<String>,
    #[serde(default)]
    pub price_rows: Vec<PriceRow>,
}

impl From<SubmitTaskRequest> for Submission {
    fn from(req: SubmitTaskRequest) -> Self {
        Submission {
            description: req.description,
            photos: req.photos,
            price_rows: req.price_rows,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct RejectTaskRequest {
    #[validate(length(min = 1, max = 2000))]
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverrideDecision {
    Approve,
    Reject,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct OverrideRequest {
    pub decision: OverrideDecision,
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct TaskQuery {
    pub staff: Option<i32>,
    pub category: Option<TaskCategory>,
}
