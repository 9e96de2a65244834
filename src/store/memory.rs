use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::{LeaveError, LeaveResult};
use crate::model::leave_balance::{BalanceDefaults, EmployeeBalance, LeaveBalance};
use crate::model::leave_request::{
    LeaveRequest, LeaveStatistics, LeaveStatus, LeaveWithEmployee, NewLeaveRequest,
};
use crate::model::role::Role;
use crate::model::user::{NewUser, User};
use crate::service::LeavePolicy;
use crate::service::workflow::{self, Decision, DecisionOutcome};

use super::RecordStore;

#[derive(Debug, Default)]
struct State {
    users: BTreeMap<u64, User>,
    leaves: BTreeMap<u64, LeaveRequest>,
    balances: HashMap<u64, LeaveBalance>,
    next_user_id: u64,
    next_leave_id: u64,
}

impl State {
    fn username(&self, id: u64) -> String {
        self.users
            .get(&id)
            .map(|u| u.username.clone())
            .unwrap_or_default()
    }
}

/// Process-local record store.
///
/// Every operation runs under one mutex, which makes each call a serializable
/// transaction. Used by the test suite and when no `DATABASE_URL` is configured.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> LeaveResult<MutexGuard<'_, State>> {
        self.state.lock().map_err(|_| {
            tracing::error!("In-memory store lock poisoned");
            LeaveError::StorageUnavailable
        })
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn find_user(&self, id: u64) -> LeaveResult<Option<User>> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> LeaveResult<Option<User>> {
        Ok(self
            .lock()?
            .users
            .values()
            .find(|u| u.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    async fn insert_user(&self, user: NewUser) -> LeaveResult<u64> {
        let mut state = self.lock()?;
        if state
            .users
            .values()
            .any(|u| u.username.eq_ignore_ascii_case(&user.username))
        {
            return Err(LeaveError::Conflict("Username already exists".to_string()));
        }
        state.next_user_id += 1;
        let id = state.next_user_id;
        state.users.insert(
            id,
            User {
                id,
                username: user.username,
                password_hash: user.password_hash,
                role: user.role,
                approved: user.approved,
            },
        );
        Ok(id)
    }

    async fn list_employees(&self, approved: Option<bool>) -> LeaveResult<Vec<User>> {
        Ok(self
            .lock()?
            .users
            .values()
            .filter(|u| u.role == Role::Employee)
            .filter(|u| approved.is_none_or(|a| u.approved == a))
            .cloned()
            .collect())
    }

    async fn usernames(&self) -> LeaveResult<Vec<String>> {
        Ok(self
            .lock()?
            .users
            .values()
            .map(|u| u.username.clone())
            .collect())
    }

    async fn activate_employee(
        &self,
        user_id: u64,
        defaults: &BalanceDefaults,
    ) -> LeaveResult<(User, LeaveBalance)> {
        let mut state = self.lock()?;
        let user = match state.users.get_mut(&user_id) {
            Some(user) if user.is_employee() => {
                user.approved = true;
                user.clone()
            }
            _ => return Err(LeaveError::NotFound("employee")),
        };
        let balance = state
            .balances
            .entry(user_id)
            .or_insert_with(|| LeaveBalance::new(user_id, defaults))
            .clone();
        Ok((user, balance))
    }

    async fn find_balance(&self, employee_id: u64) -> LeaveResult<Option<LeaveBalance>> {
        Ok(self.lock()?.balances.get(&employee_id).cloned())
    }

    async fn list_balances(&self) -> LeaveResult<Vec<EmployeeBalance>> {
        let state = self.lock()?;
        let mut rows: Vec<EmployeeBalance> = state
            .balances
            .values()
            .filter(|b| {
                state
                    .users
                    .get(&b.employee_id)
                    .is_some_and(User::is_employee)
            })
            .map(|b| EmployeeBalance {
                username: state.username(b.employee_id),
                balance: b.clone(),
            })
            .collect();
        rows.sort_by_key(|r| r.balance.employee_id);
        Ok(rows)
    }

    async fn insert_leave(&self, leave: NewLeaveRequest) -> LeaveResult<u64> {
        let mut state = self.lock()?;
        state.next_leave_id += 1;
        let id = state.next_leave_id;
        state.leaves.insert(
            id,
            LeaveRequest {
                id,
                employee_id: leave.employee_id,
                leave_type: leave.leave_type.as_ref().to_string(),
                reason: leave.reason,
                start_date: leave.start_date,
                end_date: leave.end_date,
                status: LeaveStatus::Pending,
                remarks: leave.remarks,
            },
        );
        Ok(id)
    }

    async fn find_leave(&self, id: u64) -> LeaveResult<Option<LeaveRequest>> {
        Ok(self.lock()?.leaves.get(&id).cloned())
    }

    async fn leaves_for_employee(&self, employee_id: u64) -> LeaveResult<Vec<LeaveRequest>> {
        Ok(self
            .lock()?
            .leaves
            .values()
            .filter(|l| l.employee_id == employee_id)
            .cloned()
            .collect())
    }

    async fn leaves_with_employee(&self) -> LeaveResult<Vec<LeaveWithEmployee>> {
        let state = self.lock()?;
        Ok(state
            .leaves
            .values()
            .map(|l| LeaveWithEmployee {
                employee_name: state.username(l.employee_id),
                leave: l.clone(),
            })
            .collect())
    }

    async fn delete_pending_leave(&self, id: u64) -> LeaveResult<()> {
        let mut state = self.lock()?;
        let leave = state
            .leaves
            .get(&id)
            .ok_or(LeaveError::NotFound("leave request"))?;
        leave.ensure_deletable()?;
        state.leaves.remove(&id);
        Ok(())
    }

    async fn leave_statistics(&self, employee_id: Option<u64>) -> LeaveResult<LeaveStatistics> {
        let state = self.lock()?;
        let mut stats = LeaveStatistics::default();
        state
            .leaves
            .values()
            .filter(|l| employee_id.is_none_or(|id| l.employee_id == id))
            .for_each(|l| stats.record(l.status));
        Ok(stats)
    }

    async fn commit_decision(
        &self,
        leave_id: u64,
        decision: &Decision,
        policy: &LeavePolicy,
    ) -> LeaveResult<DecisionOutcome> {
        let mut state = self.lock()?;
        let leave = state
            .leaves
            .get(&leave_id)
            .cloned()
            .ok_or(LeaveError::NotFound("leave request"))?;

        let outcome = workflow::settle(leave, decision, policy, |employee_id| {
            Ok(state.balances.get(&employee_id).cloned())
        })?;

        if outcome.changed {
            if let Some(balance) = &outcome.balance {
                state.balances.insert(balance.employee_id, balance.clone());
            }
            state.leaves.insert(leave_id, outcome.leave.clone());
        }
        Ok(outcome)
    }
}
