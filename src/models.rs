use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Roles ---

/// Role
///
/// Closed set of staff roles. Serialized as the uppercase label ("ADMIN").
/// There is no ordering between roles: an ADMIN is not implicitly a MANAGER.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum Role {
    Admin,
    Manager,
    Waiter,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Manager, Role::Waiter];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Manager => "MANAGER",
            Role::Waiter => "WAITER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown role `{0}`")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    /// Exact match against the stored label; "admin" is not ADMIN.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// Staff account record from the `users` table. Never serialized directly;
/// responses use `UserProfile` so the password hash cannot leak.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    // Stored as the uppercase label; parsed into `Role` when an identity is built.
    pub role: String,
    pub created_at: DateTime<Utc>,
}

/// NewUser
///
/// Insert payload for `Repository::create_user`, with the password already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// MenuItem
///
/// A dish or drink from the `menu_items` table. Items are created unapproved and
/// only become visible to waiters once an admin approves them.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct MenuItem {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub category: Option<String>,
    pub is_approved: bool,
    pub approved_by: Option<Uuid>,
    pub created_by: Uuid,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Report
///
/// A shift or incident report submitted by a manager (`reports` table).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Report {
    pub id: i64,
    pub submitted_by: Uuid,
    pub title: String,
    pub content: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

// --- Request Payloads (Input Schemas) ---

/// RegisterRequest
///
/// Input payload for POST /register. `role` defaults to WAITER when omitted.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

/// LoginRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// CreateMenuItemRequest
///
/// Input payload for POST /menu.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateMenuItemRequest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// UpdateMenuItemRequest
///
/// Partial update payload for PUT /menu/{id}. Only the provided fields change.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateMenuItemRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// SubmitReportRequest
///
/// Input payload for POST /reports.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct SubmitReportRequest {
    pub title: String,
    pub content: String,
}

// --- Output Schemas ---

/// UserProfile
///
/// Public view of a user, returned by /register and embedded in the login response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl TryFrom<User> for UserProfile {
    type Error = UnknownRole;

    fn try_from(user: User) -> Result<Self, Self::Error> {
        Ok(UserProfile {
            role: user.role.parse()?,
            id: user.id,
            name: user.name,
            email: user.email,
        })
    }
}

/// LoginResponse
///
/// Bearer token plus the profile it was issued for. `expires_in` is in seconds.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: UserProfile,
}
