use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{LeaveError, LeaveResult};
use crate::model::leave_request::LeaveCategory;

/// Starting quota for a freshly materialised balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceDefaults {
    pub sick_casual: u32,
    pub medical: u32,
    pub privileged: u32,
}

impl Default for BalanceDefaults {
    fn default() -> Self {
        Self {
            sick_casual: 10,
            medical: 20,
            privileged: 18,
        }
    }
}

/// Per-employee leave quota. Counters are unsigned, so they can never go negative;
/// `debit` refuses instead of wrapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[schema(example = json!({
    "employee_id": 2,
    "sick_casual": 10,
    "medical": 20,
    "privileged": 18
}))]
pub struct LeaveBalance {
    pub employee_id: u64,
    pub sick_casual: u32,
    pub medical: u32,
    pub privileged: u32,
}

impl LeaveBalance {
    pub fn new(employee_id: u64, defaults: &BalanceDefaults) -> Self {
        Self {
            employee_id,
            sick_casual: defaults.sick_casual,
            medical: defaults.medical,
            privileged: defaults.privileged,
        }
    }

    pub fn available(&self, category: LeaveCategory) -> u32 {
        match category {
            LeaveCategory::Sick => self.sick_casual,
            LeaveCategory::Medical => self.medical,
            LeaveCategory::Privileged => self.privileged,
        }
    }

    fn counter_mut(&mut self, category: LeaveCategory) -> &mut u32 {
        match category {
            LeaveCategory::Sick => &mut self.sick_casual,
            LeaveCategory::Medical => &mut self.medical,
            LeaveCategory::Privileged => &mut self.privileged,
        }
    }

    /// Check-then-decrement. Leaves the balance untouched on failure.
    pub fn debit(&mut self, category: LeaveCategory, amount: u32) -> LeaveResult<()> {
        if amount == 0 {
            return Err(LeaveError::validation("amount"));
        }
        let counter = self.counter_mut(category);
        if amount > *counter {
            return Err(LeaveError::InsufficientBalance {
                category,
                requested: amount,
                available: *counter,
            });
        }
        *counter -= amount;
        Ok(())
    }

    pub fn credit(&mut self, category: LeaveCategory, amount: u32) -> LeaveResult<()> {
        if amount == 0 {
            return Err(LeaveError::validation("amount"));
        }
        let counter = self.counter_mut(category);
        *counter = counter.saturating_add(amount);
        Ok(())
    }
}

/// Balance joined with the owner's username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct EmployeeBalance {
    #[schema(example = "alice")]
    pub username: String,
    #[serde(flatten)]
    pub balance: LeaveBalance,
}
