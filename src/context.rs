use std::sync::Arc;

use crate::service::LeavePolicy;
use crate::service::leave::LeaveRequests;
use crate::service::ledger::BalanceLedger;
use crate::service::onboarding::OnboardingGate;
use crate::service::workflow::ApprovalWorkflow;
use crate::store::RecordStore;
use crate::utils::username_index::UsernameIndex;

/// Everything an operation needs, built once at startup and shared with every worker.
pub struct AppContext {
    pub store: Arc<dyn RecordStore>,
    pub policy: LeavePolicy,
    pub usernames: UsernameIndex,
}

impl AppContext {
    pub fn new(store: Arc<dyn RecordStore>, policy: LeavePolicy) -> Self {
        Self {
            store,
            policy,
            usernames: UsernameIndex::new(),
        }
    }

    pub fn ledger(&self) -> BalanceLedger<'_> {
        BalanceLedger::new(self.store.as_ref())
    }

    pub fn leaves(&self) -> LeaveRequests<'_> {
        LeaveRequests::new(self.store.as_ref())
    }

    pub fn workflow(&self) -> ApprovalWorkflow<'_> {
        ApprovalWorkflow::new(self.store.as_ref(), &self.policy)
    }

    pub fn onboarding(&self) -> OnboardingGate<'_> {
        OnboardingGate::new(self.store.as_ref(), &self.policy.defaults, &self.usernames)
    }
}
