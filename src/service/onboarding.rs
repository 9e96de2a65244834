use tracing::{error, info, instrument};

use crate::auth::password::hash_password;
use crate::error::{LeaveError, LeaveResult};
use crate::model::leave_balance::{BalanceDefaults, EmployeeBalance, LeaveBalance};
use crate::model::role::Role;
use crate::model::user::{EmployeeStats, EmployeeSummary, NewUser, User};
use crate::store::RecordStore;
use crate::utils::username_index::UsernameIndex;

/// Employee activation. The only place a balance is first materialised for an
/// employee outside of an approval.
pub struct OnboardingGate<'a> {
    store: &'a dyn RecordStore,
    defaults: &'a BalanceDefaults,
    usernames: &'a UsernameIndex,
}

impl<'a> OnboardingGate<'a> {
    pub fn new(
        store: &'a dyn RecordStore,
        defaults: &'a BalanceDefaults,
        usernames: &'a UsernameIndex,
    ) -> Self {
        Self {
            store,
            defaults,
            usernames,
        }
    }

    /// Creates an employee account awaiting manager approval.
    #[instrument(name = "employee_register", skip(self, password))]
    pub async fn register_employee(&self, username: &str, password: &str) -> LeaveResult<u64> {
        let username = username.trim();
        if username.is_empty() {
            return Err(LeaveError::validation("username"));
        }
        if password.is_empty() {
            return Err(LeaveError::validation("password"));
        }

        if !self.usernames.is_available(username, self.store).await? {
            return Err(LeaveError::Conflict("Username already exists".to_string()));
        }

        let password_hash = hash_password(password).map_err(|e| {
            error!(error = %e, "Failed to hash password");
            LeaveError::StorageUnavailable
        })?;

        let id = self
            .store
            .insert_user(NewUser {
                username: username.to_string(),
                password_hash,
                role: Role::Employee,
                approved: false,
            })
            .await?;
        self.usernames.mark_taken(username).await;

        info!(user_id = id, "Employee registered, awaiting approval");
        Ok(id)
    }

    /// Activates an employee and materialises their default balance.
    /// Repeating it is harmless: the existing balance is kept as is.
    #[instrument(name = "employee_approve", skip(self))]
    pub async fn approve_employee(&self, user_id: u64) -> LeaveResult<(User, LeaveBalance)> {
        let (user, balance) = self.store.activate_employee(user_id, self.defaults).await?;
        info!(user_id, username = %user.username, "Employee approved");
        Ok((user, balance))
    }

    pub async fn list_pending_employees(&self) -> LeaveResult<Vec<EmployeeSummary>> {
        Ok(self
            .store
            .list_employees(Some(false))
            .await?
            .iter()
            .map(EmployeeSummary::from)
            .collect())
    }

    pub async fn list_employees_with_stats(&self) -> LeaveResult<Vec<EmployeeStats>> {
        let employees = self.store.list_employees(Some(true)).await?;
        let mut out = Vec::with_capacity(employees.len());
        for employee in employees {
            let stats = self.store.leave_statistics(Some(employee.id)).await?;
            out.push(EmployeeStats {
                id: employee.id,
                username: employee.username,
                approved: employee.approved,
                total_leaves: stats.total,
                pending_leaves: stats.pending,
            });
        }
        Ok(out)
    }

    pub async fn list_balances(&self) -> LeaveResult<Vec<EmployeeBalance>> {
        self.store.list_balances().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::LeavePolicy;
    use crate::service::leave::{LeaveApplication, LeaveRequests};
    use crate::service::workflow::ApprovalWorkflow;
    use crate::store::memory::InMemoryStore;

    struct Fixture {
        store: InMemoryStore,
        policy: LeavePolicy,
        usernames: UsernameIndex,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                store: InMemoryStore::new(),
                policy: LeavePolicy::default(),
                usernames: UsernameIndex::new(),
            }
        }

        fn gate(&self) -> OnboardingGate<'_> {
            OnboardingGate::new(&self.store, &self.policy.defaults, &self.usernames)
        }
    }

    fn sick_leave(start: &str, end: &str) -> LeaveApplication {
        LeaveApplication {
            leave_type: Some("sick".into()),
            reason: Some("Cold".into()),
            start_date: Some(start.into()),
            end_date: Some(end.into()),
            remarks: None,
        }
    }

    #[actix_web::test]
    async fn registration_validates_and_rejects_duplicates() {
        let fx = Fixture::new();
        let gate = fx.gate();

        assert_eq!(
            gate.register_employee("  ", "pw").await,
            Err(LeaveError::validation("username"))
        );
        assert_eq!(
            gate.register_employee("frank", "").await,
            Err(LeaveError::validation("password"))
        );

        let id = gate.register_employee("frank", "pw").await.unwrap();
        let user = fx.store.find_user(id).await.unwrap().unwrap();
        assert!(user.is_employee());
        assert!(!user.approved);
        assert_ne!(user.password_hash, "pw");

        assert!(matches!(
            gate.register_employee("Frank", "other").await,
            Err(LeaveError::Conflict(_))
        ));
    }

    #[actix_web::test]
    async fn approval_moves_employee_out_of_pending_with_default_balance() {
        let fx = Fixture::new();
        let gate = fx.gate();
        let id = gate.register_employee("gina", "pw").await.unwrap();

        assert_eq!(gate.list_pending_employees().await.unwrap().len(), 1);
        let (user, balance) = gate.approve_employee(id).await.unwrap();
        assert!(user.approved);
        assert_eq!(
            (balance.sick_casual, balance.medical, balance.privileged),
            (10, 20, 18)
        );
        assert!(gate.list_pending_employees().await.unwrap().is_empty());

        // Approving again keeps the balance as it is.
        let leave = LeaveRequests::new(&fx.store)
            .create(id, &sick_leave("2024-04-02", "2024-04-02"))
            .await
            .unwrap();
        ApprovalWorkflow::new(&fx.store, &fx.policy)
            .decide(leave, "Approved", None)
            .await
            .unwrap();
        let (_, again) = gate.approve_employee(id).await.unwrap();
        assert_eq!(again.sick_casual, 9);
    }

    #[actix_web::test]
    async fn approving_unknown_user_is_not_found() {
        let fx = Fixture::new();
        assert_eq!(
            fx.gate().approve_employee(77).await,
            Err(LeaveError::NotFound("employee"))
        );
    }

    #[actix_web::test]
    async fn stats_count_total_and_pending_per_approved_employee() {
        let fx = Fixture::new();
        let gate = fx.gate();
        let hank = gate.register_employee("hank", "pw").await.unwrap();
        gate.register_employee("ivy", "pw").await.unwrap();
        gate.approve_employee(hank).await.unwrap();

        let leaves = LeaveRequests::new(&fx.store);
        let first = leaves
            .create(hank, &sick_leave("2024-01-01", "2024-01-03"))
            .await
            .unwrap();
        leaves
            .create(hank, &sick_leave("2024-02-01", "2024-02-01"))
            .await
            .unwrap();
        ApprovalWorkflow::new(&fx.store, &fx.policy)
            .decide(first, "Approved", None)
            .await
            .unwrap();

        let stats = gate.list_employees_with_stats().await.unwrap();
        assert_eq!(
            stats,
            vec![EmployeeStats {
                id: hank,
                username: "hank".into(),
                approved: true,
                total_leaves: 2,
                pending_leaves: 1,
            }]
        );

        let balances = gate.list_balances().await.unwrap();
        assert_eq!(balances.len(), 1);
        assert_eq!(balances[0].username, "hank");
        assert_eq!(balances[0].balance.sick_casual, 7);
    }
}
