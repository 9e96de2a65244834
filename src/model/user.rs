use serde::Serialize;
use utoipa::ToSchema;

use crate::model::role::Role;

/// Identity record as the leave core sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    /// Activation gate; employees start unapproved.
    pub approved: bool,
}

impl User {
    pub fn is_employee(&self) -> bool {
        self.role == Role::Employee
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub approved: bool,
}

/// Public view of an employee account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct EmployeeSummary {
    #[schema(example = 2)]
    pub id: u64,
    #[schema(example = "alice")]
    pub username: String,
}

impl From<&User> for EmployeeSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
        }
    }
}

/// Approved employee with a count of their leave requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct EmployeeStats {
    #[schema(example = 2)]
    pub id: u64,
    #[schema(example = "alice")]
    pub username: String,
    pub approved: bool,
    #[schema(example = 4)]
    pub total_leaves: u64,
    #[schema(example = 1)]
    pub pending_leaves: u64,
}
