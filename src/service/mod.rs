pub mod ledger;
pub mod leave;
pub mod onboarding;
pub mod workflow;

use crate::model::leave_balance::BalanceDefaults;

/// Knobs shared by the ledger and the approval workflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LeavePolicy {
    pub defaults: BalanceDefaults,
    /// Lets a manager move an approved request back out of `Approved`, crediting the days.
    pub allow_revoke: bool,
}
