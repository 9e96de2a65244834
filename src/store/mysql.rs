use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{FromRow, MySql, MySqlPool, Transaction};
use tracing::debug;

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

const USER_COLUMNS: &str = "id, username, password_hash, role, approved";
const LEAVE_COLUMNS: &str =
    "id, employee_id, leave_type, reason, start_date, end_date, status, remarks";
const BALANCE_COLUMNS: &str = "employee_id, sick_casual, medical, privileged";

#[derive(FromRow)]
struct UserRow {
    id: u64,
    username: String,
    password_hash: String,
    role: String,
    approved: bool,
}

impl TryFrom<UserRow> for User {
    type Error = LeaveError;

    fn try_from(row: UserRow) -> LeaveResult<Self> {
        let role = Role::from_name(&row.role).ok_or_else(|| {
            LeaveError::invalid_state(format!("unrecognised role '{}' on user {}", row.role, row.id))
        })?;
        Ok(User {
            id: row.id,
            username: row.username,
            password_hash: row.password_hash,
            role,
            approved: row.approved,
        })
    }
}

#[derive(FromRow)]
struct LeaveRow {
    id: u64,
    employee_id: u64,
    leave_type: String,
    reason: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    status: String,
    remarks: Option<String>,
}

impl TryFrom<LeaveRow> for LeaveRequest {
    type Error = LeaveError;

    fn try_from(row: LeaveRow) -> LeaveResult<Self> {
        let status = row.status.parse().map_err(|_| {
            LeaveError::invalid_state(format!(
                "unrecognised status '{}' on leave {}",
                row.status, row.id
            ))
        })?;
        Ok(LeaveRequest {
            id: row.id,
            employee_id: row.employee_id,
            leave_type: row.leave_type,
            reason: row.reason,
            start_date: row.start_date,
            end_date: row.end_date,
            status,
            remarks: row.remarks,
        })
    }
}

#[derive(FromRow)]
struct BalanceRow {
    employee_id: u64,
    sick_casual: u32,
    medical: u32,
    privileged: u32,
}

impl From<BalanceRow> for LeaveBalance {
    fn from(row: BalanceRow) -> Self {
        LeaveBalance {
            employee_id: row.employee_id,
            sick_casual: row.sick_casual,
            medical: row.medical,
            privileged: row.privileged,
        }
    }
}

#[derive(FromRow)]
struct EmployeeBalanceRow {
    username: String,
    #[sqlx(flatten)]
    balance: BalanceRow,
}

#[derive(FromRow)]
struct LeaveWithNameRow {
    employee_name: String,
    #[sqlx(flatten)]
    leave: LeaveRow,
}

/// MySQL-backed record store. Multi-record writes run in one transaction with the
/// touched rows locked via `SELECT ... FOR UPDATE`.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn lock_balance(
        tx: &mut Transaction<'_, MySql>,
        employee_id: u64,
    ) -> LeaveResult<Option<LeaveBalance>> {
        let row = sqlx::query_as::<_, BalanceRow>(&format!(
            "SELECT {BALANCE_COLUMNS} FROM leave_balances WHERE employee_id = ? FOR UPDATE"
        ))
        .bind(employee_id)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(row.map(LeaveBalance::from))
    }

    /// Inserts the default balance if none exists; a no-op otherwise.
    async fn insert_default_balance(
        tx: &mut Transaction<'_, MySql>,
        employee_id: u64,
        defaults: &BalanceDefaults,
    ) -> LeaveResult<()> {
        sqlx::query(
            r#"
            INSERT INTO leave_balances (employee_id, sick_casual, medical, privileged)
            VALUES (?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE employee_id = employee_id
            "#,
        )
        .bind(employee_id)
        .bind(defaults.sick_casual)
        .bind(defaults.medical)
        .bind(defaults.privileged)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn write_balance(
        tx: &mut Transaction<'_, MySql>,
        balance: &LeaveBalance,
    ) -> LeaveResult<()> {
        sqlx::query(
            r#"
            UPDATE leave_balances
            SET sick_casual = ?, medical = ?, privileged = ?
            WHERE employee_id = ?
            "#,
        )
        .bind(balance.sick_casual)
        .bind(balance.medical)
        .bind(balance.privileged)
        .bind(balance.employee_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MySqlStore {
    async fn find_user(&self, id: u64) -> LeaveResult<Option<User>> {
        sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn find_user_by_username(&self, username: &str) -> LeaveResult<Option<User>> {
        sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }

    async fn insert_user(&self, user: NewUser) -> LeaveResult<u64> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (username, password_hash, role, approved)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.role.as_ref())
        .bind(user.approved)
        .execute(&self.pool)
        .await
        .map_err(|e| match LeaveError::from(e) {
            LeaveError::Conflict(_) => LeaveError::Conflict("Username already exists".into()),
            other => other,
        })?;
        Ok(result.last_insert_id())
    }

    async fn list_employees(&self, approved: Option<bool>) -> LeaveResult<Vec<User>> {
        sqlx::query_as::<_, UserRow>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE role = 'employee'
            AND (? IS NULL OR approved = ?)
            ORDER BY id
            "#
        ))
        .bind(approved)
        .bind(approved)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(User::try_from)
        .collect()
    }

    async fn usernames(&self) -> LeaveResult<Vec<String>> {
        Ok(sqlx::query_scalar::<_, String>("SELECT username FROM users")
            .fetch_all(&self.pool)
            .await?)
    }

    async fn activate_employee(
        &self,
        user_id: u64,
        defaults: &BalanceDefaults,
    ) -> LeaveResult<(User, LeaveBalance)> {
        let mut tx = self.pool.begin().await?;

        let user: User = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ? FOR UPDATE"
        ))
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .map(User::try_from)
        .transpose()?
        .filter(User::is_employee)
        .ok_or(LeaveError::NotFound("employee"))?;

        sqlx::query("UPDATE users SET approved = TRUE WHERE id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        Self::insert_default_balance(&mut tx, user_id, defaults).await?;
        let balance = Self::lock_balance(&mut tx, user_id)
            .await?
            .ok_or(LeaveError::NotFound("leave balance"))?;

        tx.commit().await?;
        Ok((User { approved: true, ..user }, balance))
    }

    async fn find_balance(&self, employee_id: u64) -> LeaveResult<Option<LeaveBalance>> {
        let row = sqlx::query_as::<_, BalanceRow>(&format!(
            "SELECT {BALANCE_COLUMNS} FROM leave_balances WHERE employee_id = ?"
        ))
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(LeaveBalance::from))
    }

    async fn list_balances(&self) -> LeaveResult<Vec<EmployeeBalance>> {
        let rows = sqlx::query_as::<_, EmployeeBalanceRow>(
            r#"
            SELECT u.username, b.employee_id, b.sick_casual, b.medical, b.privileged
            FROM leave_balances b
            JOIN users u ON u.id = b.employee_id
            WHERE u.role = 'employee'
            ORDER BY b.employee_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| EmployeeBalance {
                username: r.username,
                balance: r.balance.into(),
            })
            .collect())
    }

    async fn insert_leave(&self, leave: NewLeaveRequest) -> LeaveResult<u64> {
        let result = sqlx::query(
            r#"
            INSERT INTO leave_requests
                (employee_id, leave_type, reason, start_date, end_date, status, remarks)
            VALUES (?, ?, ?, ?, ?, 'Pending', ?)
            "#,
        )
        .bind(leave.employee_id)
        .bind(leave.leave_type.as_ref())
        .bind(&leave.reason)
        .bind(leave.start_date)
        .bind(leave.end_date)
        .bind(&leave.remarks)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_id())
    }

    async fn find_leave(&self, id: u64) -> LeaveResult<Option<LeaveRequest>> {
        sqlx::query_as::<_, LeaveRow>(&format!(
            "SELECT {LEAVE_COLUMNS} FROM leave_requests WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(LeaveRequest::try_from)
        .transpose()
    }

    async fn leaves_for_employee(&self, employee_id: u64) -> LeaveResult<Vec<LeaveRequest>> {
        sqlx::query_as::<_, LeaveRow>(&format!(
            "SELECT {LEAVE_COLUMNS} FROM leave_requests WHERE employee_id = ? ORDER BY id"
        ))
        .bind(employee_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(LeaveRequest::try_from)
        .collect()
    }

    async fn leaves_with_employee(&self) -> LeaveResult<Vec<LeaveWithEmployee>> {
        let rows = sqlx::query_as::<_, LeaveWithNameRow>(
            r#"
            SELECT
                l.id, l.employee_id, l.leave_type, l.reason,
                l.start_date, l.end_date, l.status, l.remarks,
                u.username AS employee_name
            FROM leave_requests l
            JOIN users u ON u.id = l.employee_id
            ORDER BY l.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                Ok(LeaveWithEmployee {
                    employee_name: r.employee_name,
                    leave: r.leave.try_into()?,
                })
            })
            .collect()
    }

    async fn delete_pending_leave(&self, id: u64) -> LeaveResult<()> {
        let mut tx = self.pool.begin().await?;
        let leave: LeaveRequest = sqlx::query_as::<_, LeaveRow>(&format!(
            "SELECT {LEAVE_COLUMNS} FROM leave_requests WHERE id = ? FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(LeaveError::NotFound("leave request"))?
        .try_into()?;

        leave.ensure_deletable()?;

        sqlx::query("DELETE FROM leave_requests WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn leave_statistics(&self, employee_id: Option<u64>) -> LeaveResult<LeaveStatistics> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT status, COUNT(*)
            FROM leave_requests
            WHERE (? IS NULL OR employee_id = ?)
            GROUP BY status
            "#,
        )
        .bind(employee_id)
        .bind(employee_id)
        .fetch_all(&self.pool)
        .await?;

        let mut stats = LeaveStatistics::default();
        for (status, count) in rows {
            let count = u64::try_from(count).unwrap_or_default();
            stats.total += count;
            match status.parse() {
                Ok(LeaveStatus::Pending) => stats.pending += count,
                Ok(LeaveStatus::Approved) => stats.approved += count,
                Ok(LeaveStatus::Rejected) => stats.rejected += count,
                Err(_) => debug!(status = %status, "Skipping unrecognised leave status"),
            }
        }
        Ok(stats)
    }

    async fn commit_decision(
        &self,
        leave_id: u64,
        decision: &Decision,
        policy: &LeavePolicy,
    ) -> LeaveResult<DecisionOutcome> {
        let mut tx = self.pool.begin().await?;

        let leave: LeaveRequest = sqlx::query_as::<_, LeaveRow>(&format!(
            "SELECT {LEAVE_COLUMNS} FROM leave_requests WHERE id = ? FOR UPDATE"
        ))
        .bind(leave_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(LeaveError::NotFound("leave request"))?
        .try_into()?;

        // The ledger only needs locking when the plan touches it; look it up first
        // so the settle step below stays synchronous.
        let needs_ledger = matches!(
            workflow::plan(&leave, decision.status, policy)?,
            workflow::Plan::Record { ledger: Some(_) }
        );
        let balance = if needs_ledger {
            Self::insert_default_balance(&mut tx, leave.employee_id, &policy.defaults).await?;
            Self::lock_balance(&mut tx, leave.employee_id).await?
        } else {
            None
        };

        let outcome = workflow::settle(leave, decision, policy, |_| Ok(balance))?;

        if !outcome.changed {
            return Ok(outcome);
        }

        if let Some(balance) = &outcome.balance {
            Self::write_balance(&mut tx, balance).await?;
        }
        sqlx::query("UPDATE leave_requests SET status = ?, remarks = ? WHERE id = ?")
            .bind(outcome.leave.status.as_ref())
            .bind(&outcome.leave.remarks)
            .bind(leave_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(outcome)
    }
}
