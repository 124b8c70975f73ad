use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::engine::error::FieldError;

/// Staff roles, ordered from least to most authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
pub enum Role {
    #[serde(rename = "STAFF")]
    Staff,
    #[serde(rename = "MANAGER")]
    Manager,
    #[serde(rename = "SUPERVIZOR", alias = "SUPERVISOR")]
    Supervizor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Staff => "STAFF",
            Role::Manager => "MANAGER",
            Role::Supervizor => "SUPERVIZOR",
        }
    }

    pub fn parse(raw: &str) -> Option<Role> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "STAFF" | "PERSONEL" => Some(Role::Staff),
            "MANAGER" | "MUDUR" => Some(Role::Manager),
            "SUPERVIZOR" | "SUPERVISOR" => Some(Role::Supervizor),
            _ => None,
        }
    }
}

/// The identity tuple supplied by the identity provider for every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Actor {
    pub id: i32,
    pub role: Role,
    pub branch_id: i32,
}

impl Actor {
    pub fn new(id: i32, role: Role, branch_id: i32) -> Self {
        Self { id, role, branch_id }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // actor id
    pub role: Role,
    pub branch_id: i32,
    pub exp: usize,
    pub iat: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StaffMember {
    pub id: i32,
    pub name: String,
    pub role: Role,
    pub branch_id: i32,
    pub manager_id: Option<i32>,
    pub phone: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(message: &str, data: T) -> Self {
        Self {
            status: "success".to_string(),
            message: message.to_string(),
            data: Some(data),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub status: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CurrentUser {
    pub actor: Actor,
    pub staff: StaffMember,
}
