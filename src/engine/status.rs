//! Canonical status vocabulary.
//!
//! Records written over the years carry two naming schemes for the same
//! lifecycle stage (English identifiers and Turkish labels, with or
//! without diacritics). Everything past the ingestion boundary compares
//! only the enums defined here.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::engine::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Assigned,
    InProgress,
    Submitted,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShiftStatus {
    Active,
    Ended,
}

/// Which status space a raw value belongs to. The spaces never share values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusDomain {
    Task,
    Leave,
    Shift,
}

impl fmt::Display for StatusDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusDomain::Task => write!(f, "task"),
            StatusDomain::Leave => write!(f, "leave"),
            StatusDomain::Shift => write!(f, "shift"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanonicalStatus {
    Task(TaskStatus),
    Leave(LeaveStatus),
    Shift(ShiftStatus),
}

// Spellings are stored folded: lowercase ASCII, '_' separators.
const TASK_SPELLINGS: &[(TaskStatus, &[&str])] = &[
    (TaskStatus::Assigned, &["assigned", "pending", "atandi", "bekliyor", "beklemede"]),
    (
        TaskStatus::InProgress,
        &["in_progress", "started", "devam_ediyor", "basladi", "yapiliyor"],
    ),
    (
        TaskStatus::Submitted,
        &["submitted", "completed", "gonderildi", "tamamlandi", "onay_bekliyor"],
    ),
    (TaskStatus::Approved, &["approved", "onaylandi"]),
    (TaskStatus::Rejected, &["rejected", "reddedildi"]),
];

const LEAVE_SPELLINGS: &[(LeaveStatus, &[&str])] = &[
    (LeaveStatus::Pending, &["pending", "bekliyor", "beklemede"]),
    (LeaveStatus::Approved, &["approved", "onaylandi"]),
    (LeaveStatus::Rejected, &["rejected", "reddedildi"]),
];

const SHIFT_SPELLINGS: &[(ShiftStatus, &[&str])] = &[
    (ShiftStatus::Active, &["active", "aktif", "started", "basladi"]),
    (ShiftStatus::Ended, &["ended", "inactive", "pasif", "bitti", "tamamlandi"]),
];

/// Lowercases, strips Turkish diacritics and normalises separators.
pub(crate) fn fold(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| match c {
            'ı' | 'İ' | 'I' => 'i',
            'ş' | 'Ş' => 's',
            'ğ' | 'Ğ' => 'g',
            'ç' | 'Ç' => 'c',
            'ö' | 'Ö' => 'o',
            'ü' | 'Ü' => 'u',
            ' ' | '-' => '_',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}

fn lookup<S: Copy>(table: &[(S, &[&str])], folded: &str) -> Option<S> {
    table
        .iter()
        .find(|(_, spellings)| spellings.contains(&folded))
        .map(|(status, _)| *status)
}

fn unrecognized(domain: StatusDomain, raw: &str) -> EngineError {
    log::error!("Unrecognized {} status value: {:?}", domain, raw);
    EngineError::UnrecognizedStatus {
        domain,
        raw: raw.to_string(),
    }
}

pub fn canonicalize(raw: &str, domain: StatusDomain) -> Result<CanonicalStatus, EngineError> {
    match domain {
        StatusDomain::Task => raw.parse().map(CanonicalStatus::Task),
        StatusDomain::Leave => raw.parse().map(CanonicalStatus::Leave),
        StatusDomain::Shift => raw.parse().map(CanonicalStatus::Shift),
    }
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Assigned => "ASSIGNED",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Submitted => "SUBMITTED",
            TaskStatus::Approved => "APPROVED",
            TaskStatus::Rejected => "REJECTED",
        }
    }
}

impl LeaveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaveStatus::Pending => "PENDING",
            LeaveStatus::Approved => "APPROVED",
            LeaveStatus::Rejected => "REJECTED",
        }
    }
}

impl ShiftStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShiftStatus::Active => "ACTIVE",
            ShiftStatus::Ended => "ENDED",
        }
    }
}

impl FromStr for TaskStatus {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        lookup(TASK_SPELLINGS, &fold(s)).ok_or_else(|| unrecognized(StatusDomain::Task, s))
    }
}

impl FromStr for LeaveStatus {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        lookup(LEAVE_SPELLINGS, &fold(s)).ok_or_else(|| unrecognized(StatusDomain::Leave, s))
    }
}

impl FromStr for ShiftStatus {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        lookup(SHIFT_SPELLINGS, &fold(s)).ok_or_else(|| unrecognized(StatusDomain::Shift, s))
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for LeaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
