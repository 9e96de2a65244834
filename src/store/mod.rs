pub mod memory;
pub mod mysql;

use async_trait::async_trait;

use crate::error::LeaveResult;
use crate::model::leave_balance::{BalanceDefaults, EmployeeBalance, LeaveBalance};
use crate::model::leave_request::{
    LeaveRequest, LeaveStatistics, LeaveWithEmployee, NewLeaveRequest,
};
use crate::model::user::{NewUser, User};
use crate::service::LeavePolicy;
use crate::service::workflow::{Decision, DecisionOutcome};

/// Persistence for identities, leave requests and balances.
///
/// Methods that change more than one record (`activate_employee`, `commit_decision`)
/// are single transactions. The balance row is locked for the whole check-then-write,
/// so concurrent callers for the same employee serialize instead of reading stale counters.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn find_user(&self, id: u64) -> LeaveResult<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> LeaveResult<Option<User>>;

    /// Fails with `Conflict` when the username is taken.
    async fn insert_user(&self, user: NewUser) -> LeaveResult<u64>;

    /// Employee accounts, optionally filtered on the activation flag.
    async fn list_employees(&self, approved: Option<bool>) -> LeaveResult<Vec<User>>;

    async fn usernames(&self) -> LeaveResult<Vec<String>>;

    /// Marks an employee approved and materialises their balance in one unit.
    async fn activate_employee(
        &self,
        user_id: u64,
        defaults: &BalanceDefaults,
    ) -> LeaveResult<(User, LeaveBalance)>;

    async fn find_balance(&self, employee_id: u64) -> LeaveResult<Option<LeaveBalance>>;

    async fn list_balances(&self) -> LeaveResult<Vec<EmployeeBalance>>;

    async fn insert_leave(&self, leave: NewLeaveRequest) -> LeaveResult<u64>;

    async fn find_leave(&self, id: u64) -> LeaveResult<Option<LeaveRequest>>;

    async fn leaves_for_employee(&self, employee_id: u64) -> LeaveResult<Vec<LeaveRequest>>;

    async fn leaves_with_employee(&self) -> LeaveResult<Vec<LeaveWithEmployee>>;

    /// Removes a request that is still `Pending`; anything else is `InvalidState`.
    async fn delete_pending_leave(&self, id: u64) -> LeaveResult<()>;

    async fn leave_statistics(&self, employee_id: Option<u64>) -> LeaveResult<LeaveStatistics>;

    /// Locks the request (and the balance when needed), settles the decision and
    /// persists status, remarks and ledger change together.
    async fn commit_decision(
        &self,
        leave_id: u64,
        decision: &Decision,
        policy: &LeavePolicy,
    ) -> LeaveResult<DecisionOutcome>;
}
