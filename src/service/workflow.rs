use serde::Serialize;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use crate::error::{LeaveError, LeaveResult};
use crate::model::leave_balance::LeaveBalance;
use crate::model::leave_request::{LeaveCategory, LeaveRequest, LeaveStatus, normalize_remarks};
use crate::service::LeavePolicy;
use crate::service::ledger::LockedBalance;
use crate::store::RecordStore;

/// A manager's verdict on a leave request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub status: LeaveStatus,
    pub remarks: Option<String>,
}

impl Decision {
    pub fn parse(status: &str, remarks: Option<&str>) -> LeaveResult<Self> {
        let status = status
            .trim()
            .parse()
            .map_err(|_| LeaveError::validation("status"))?;
        Ok(Self {
            status,
            remarks: normalize_remarks(remarks),
        })
    }

    fn apply_to(&self, leave: &mut LeaveRequest) {
        leave.status = self.status;
        leave.remarks = self.remarks.clone();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerEffect {
    Debit { category: LeaveCategory, days: u32 },
    Credit { category: LeaveCategory, days: u32 },
}

/// What committing a decision has to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plan {
    /// Repeat of the current terminal status: nothing is written.
    Unchanged,
    Record { ledger: Option<LedgerEffect> },
}

/// Transition table for a request currently in `leave.status` moving to `target`.
///
/// A debit is only ever planned when entering `Approved` from a non-approved state,
/// so repeating an approval cannot charge the balance twice. Leaving `Approved` is
/// refused unless the policy allows revocation, in which case the days are credited back.
pub fn plan(leave: &LeaveRequest, target: LeaveStatus, policy: &LeavePolicy) -> LeaveResult<Plan> {
    use LeaveStatus::*;

    match (leave.status, target) {
        (from, to) if from == to && from.is_terminal() => Ok(Plan::Unchanged),
        (Pending, Approved) | (Rejected, Approved) => {
            let category = leave.category()?;
            let days = leave.duration()?;
            Ok(Plan::Record {
                ledger: Some(LedgerEffect::Debit { category, days }),
            })
        }
        (Approved, Pending) | (Approved, Rejected) => {
            if !policy.allow_revoke {
                return Err(LeaveError::invalid_state(format!(
                    "Leave {} is already approved and its balance has been debited",
                    leave.id
                )));
            }
            let category = leave.category()?;
            let days = leave.duration()?;
            Ok(Plan::Record {
                ledger: Some(LedgerEffect::Credit { category, days }),
            })
        }
        _ => Ok(Plan::Record { ledger: None }),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionOutcome {
    pub leave: LeaveRequest,
    /// Balance after the ledger effect, when there was one.
    pub balance: Option<LeaveBalance>,
    pub changed: bool,
}

/// Runs the in-memory half of a decision on records the store has already locked.
///
/// `balance_for` is only called when the plan touches the ledger and returns the
/// employee's locked balance row, if there is one. Nothing is mutated unless every
/// step succeeds; the caller persists whatever comes back.
pub fn settle<F>(
    mut leave: LeaveRequest,
    decision: &Decision,
    policy: &LeavePolicy,
    balance_for: F,
) -> LeaveResult<DecisionOutcome>
where
    F: FnOnce(u64) -> LeaveResult<Option<LeaveBalance>>,
{
    let ledger = match plan(&leave, decision.status, policy)? {
        Plan::Unchanged => {
            return Ok(DecisionOutcome {
                leave,
                balance: None,
                changed: false,
            });
        }
        Plan::Record { ledger } => ledger,
    };

    let balance = match ledger {
        Some(effect) => {
            let found = balance_for(leave.employee_id)?;
            let mut account = LockedBalance::ensure(leave.employee_id, found, &policy.defaults);
            account.post(effect)?;
            Some(account.into_inner())
        }
        None => None,
    };

    decision.apply_to(&mut leave);
    Ok(DecisionOutcome {
        leave,
        balance,
        changed: true,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct DecisionResponse {
    pub message: String,
    pub status: LeaveStatus,
}

/// Approval workflow: the only path that moves a request out of `Pending`.
pub struct ApprovalWorkflow<'a> {
    store: &'a dyn RecordStore,
    policy: &'a LeavePolicy,
}

impl<'a> ApprovalWorkflow<'a> {
    pub fn new(store: &'a dyn RecordStore, policy: &'a LeavePolicy) -> Self {
        Self { store, policy }
    }

    /// Applies `status` and `remarks` to a request, debiting the ledger on approval.
    /// Status and ledger change commit together or not at all.
    #[instrument(name = "leave_decide", skip(self, remarks))]
    pub async fn decide(
        &self,
        leave_id: u64,
        status: &str,
        remarks: Option<&str>,
    ) -> LeaveResult<LeaveStatus> {
        let decision = Decision::parse(status, remarks)?;

        let outcome = match self
            .store
            .commit_decision(leave_id, &decision, self.policy)
            .await
        {
            Ok(outcome) => outcome,
            Err(e @ LeaveError::InsufficientBalance { .. }) => {
                warn!(leave_id, error = %e, "Approval refused");
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        if outcome.changed {
            info!(
                leave_id,
                employee_id = outcome.leave.employee_id,
                status = %outcome.leave.status,
                balance = ?outcome.balance,
                "Leave decision committed"
            );
        } else {
            info!(leave_id, status = %outcome.leave.status, "Repeated decision ignored");
        }

        Ok(outcome.leave.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::leave_balance::BalanceDefaults;
    use crate::model::leave_request::{LeaveStatistics, NewLeaveRequest};
    use crate::model::role::Role;
    use crate::model::user::NewUser;
    use crate::store::memory::InMemoryStore;
    use chrono::NaiveDate;
    use futures::future::join_all;

    fn leave(status: LeaveStatus) -> LeaveRequest {
        LeaveRequest {
            id: 9,
            employee_id: 4,
            leave_type: "sick".into(),
            reason: "Flu".into(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
            status,
            remarks: None,
        }
    }

    fn debit(days: u32) -> Option<LedgerEffect> {
        Some(LedgerEffect::Debit {
            category: LeaveCategory::Sick,
            days,
        })
    }

    #[test]
    fn transition_table() {
        use LeaveStatus::*;
        let policy = LeavePolicy::default();

        let cases = [
            (Pending, Approved, Ok(Plan::Record { ledger: debit(3) })),
            (Pending, Rejected, Ok(Plan::Record { ledger: None })),
            (Pending, Pending, Ok(Plan::Record { ledger: None })),
            (Rejected, Approved, Ok(Plan::Record { ledger: debit(3) })),
            (Rejected, Pending, Ok(Plan::Record { ledger: None })),
            (Approved, Approved, Ok(Plan::Unchanged)),
            (Rejected, Rejected, Ok(Plan::Unchanged)),
        ];
        for (from, to, expected) in cases {
            assert_eq!(plan(&leave(from), to, &policy), expected, "{from} -> {to}");
        }

        for to in [Pending, Rejected] {
            assert!(matches!(
                plan(&leave(Approved), to, &policy),
                Err(LeaveError::InvalidState(_))
            ));
        }
    }

    #[test]
    fn revocation_credits_when_enabled() {
        let policy = LeavePolicy {
            allow_revoke: true,
            ..LeavePolicy::default()
        };
        assert_eq!(
            plan(&leave(LeaveStatus::Approved), LeaveStatus::Rejected, &policy),
            Ok(Plan::Record {
                ledger: Some(LedgerEffect::Credit {
                    category: LeaveCategory::Sick,
                    days: 3
                })
            })
        );
    }

    #[test]
    fn corrupted_leave_type_aborts_approval() {
        let mut bad = leave(LeaveStatus::Pending);
        bad.leave_type = "annual".into();
        assert_eq!(
            plan(&bad, LeaveStatus::Approved, &LeavePolicy::default()),
            Err(LeaveError::InvalidLeaveType("annual".into()))
        );
        // Rejecting does not need the category at all.
        assert!(plan(&bad, LeaveStatus::Rejected, &LeavePolicy::default()).is_ok());
    }

    #[test]
    fn settle_leaves_request_untouched_on_insufficient_balance() {
        let policy = LeavePolicy::default();
        let decision = Decision::parse("Approved", Some("ok")).unwrap();
        let err = settle(leave(LeaveStatus::Pending), &decision, &policy, |id| {
            let mut bal = LeaveBalance::new(id, &BalanceDefaults::default());
            bal.sick_casual = 1;
            Ok(Some(bal))
        })
        .unwrap_err();
        assert!(matches!(err, LeaveError::InsufficientBalance { available: 1, .. }));
    }

    #[test]
    fn settle_skips_the_ledger_when_rejecting() {
        let decision = Decision::parse("Rejected", Some("  busy week ")).unwrap();
        let outcome = settle(
            leave(LeaveStatus::Pending),
            &decision,
            &LeavePolicy::default(),
            |_| panic!("ledger must not be touched"),
        )
        .unwrap();
        assert!(outcome.changed);
        assert_eq!(outcome.balance, None);
        assert_eq!(outcome.leave.status, LeaveStatus::Rejected);
        assert_eq!(outcome.leave.remarks.as_deref(), Some("busy week"));
    }

    #[test]
    fn unknown_status_is_a_validation_error() {
        assert_eq!(
            Decision::parse("Cancelled", None),
            Err(LeaveError::validation("status"))
        );
        assert_eq!(Decision::parse("approved", Some("")).unwrap().remarks, None);
    }

    async fn seeded(days_back: u32) -> (InMemoryStore, u64) {
        let store = InMemoryStore::new();
        let employee_id = store
            .insert_user(NewUser {
                username: "alice".into(),
                password_hash: "x".into(),
                role: Role::Employee,
                approved: true,
            })
            .await
            .unwrap();
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let leave_id = store
            .insert_leave(NewLeaveRequest {
                employee_id,
                leave_type: LeaveCategory::Medical,
                reason: "Surgery".into(),
                start_date: start,
                end_date: start + chrono::Days::new(u64::from(days_back) - 1),
                remarks: None,
            })
            .await
            .unwrap();
        (store, leave_id)
    }

    #[actix_web::test]
    async fn approving_twice_debits_once() {
        let (store, leave_id) = seeded(5).await;
        let policy = LeavePolicy::default();
        let workflow = ApprovalWorkflow::new(&store, &policy);

        assert_eq!(
            workflow.decide(leave_id, "Approved", Some("ok")).await,
            Ok(LeaveStatus::Approved)
        );
        assert_eq!(
            workflow.decide(leave_id, "Approved", Some("again")).await,
            Ok(LeaveStatus::Approved)
        );

        let leave = store.find_leave(leave_id).await.unwrap().unwrap();
        let balance = store.find_balance(leave.employee_id).await.unwrap().unwrap();
        assert_eq!(balance.medical, 15);
        assert_eq!(leave.remarks.as_deref(), Some("ok"));
    }

    #[actix_web::test]
    async fn unknown_leave_is_not_found() {
        let store = InMemoryStore::new();
        let policy = LeavePolicy::default();
        let workflow = ApprovalWorkflow::new(&store, &policy);
        assert_eq!(
            workflow.decide(404, "Rejected", None).await,
            Err(LeaveError::NotFound("leave request"))
        );
    }

    #[actix_web::test]
    async fn approved_request_cannot_be_reopened_by_default() {
        let (store, leave_id) = seeded(2).await;
        let policy = LeavePolicy::default();
        let workflow = ApprovalWorkflow::new(&store, &policy);

        workflow.decide(leave_id, "Approved", None).await.unwrap();
        assert!(matches!(
            workflow.decide(leave_id, "Rejected", None).await,
            Err(LeaveError::InvalidState(_))
        ));
        let stats = store.leave_statistics(None).await.unwrap();
        assert_eq!(
            stats,
            LeaveStatistics {
                total: 1,
                pending: 0,
                approved: 1,
                rejected: 0
            }
        );
    }

    #[actix_web::test]
    async fn revocation_returns_the_days() {
        let (store, leave_id) = seeded(4).await;
        let policy = LeavePolicy {
            allow_revoke: true,
            ..LeavePolicy::default()
        };
        let workflow = ApprovalWorkflow::new(&store, &policy);

        workflow.decide(leave_id, "Approved", None).await.unwrap();
        workflow.decide(leave_id, "Rejected", Some("cancelled")).await.unwrap();

        let leave = store.find_leave(leave_id).await.unwrap().unwrap();
        let balance = store.find_balance(leave.employee_id).await.unwrap().unwrap();
        assert_eq!(balance.medical, 20);
        assert_eq!(leave.status, LeaveStatus::Rejected);
    }

    #[actix_web::test]
    async fn concurrent_approvals_never_overdraw() {
        let (store, other) = seeded(1).await;
        let employee_id = store.find_leave(other).await.unwrap().unwrap().employee_id;
        let start = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let mut ids = Vec::new();
        for week in 0..5u64 {
            let from = start + chrono::Days::new(week * 7);
            let id = store
                .insert_leave(NewLeaveRequest {
                    employee_id,
                    leave_type: LeaveCategory::Sick,
                    reason: "Cold".into(),
                    start_date: from,
                    end_date: from + chrono::Days::new(2),
                    remarks: None,
                })
                .await
                .unwrap();
            ids.push(id);
        }

        let policy = LeavePolicy::default();
        let workflow = ApprovalWorkflow::new(&store, &policy);
        let results = join_all(
            ids.iter()
                .flat_map(|&id| [id, id])
                .map(|id| workflow.decide(id, "Approved", None)),
        )
        .await;

        let granted = results.iter().filter(|r| r.is_ok()).count();
        let refused: Vec<_> = results.iter().filter_map(|r| r.as_ref().err()).collect();
        assert_eq!(granted, 6);
        assert_eq!(refused.len(), 4);
        for err in refused {
            assert_eq!(
                *err,
                LeaveError::InsufficientBalance {
                    category: LeaveCategory::Sick,
                    requested: 3,
                    available: 1,
                }
            );
        }

        let balance = store.find_balance(employee_id).await.unwrap().unwrap();
        let approved = store.leave_statistics(Some(employee_id)).await.unwrap().approved;
        assert_eq!(approved, 3);
        assert_eq!(balance.sick_casual, 10 - 3 * approved as u32);
    }
}
