use tracing::info;

use crate::error::{LeaveError, LeaveResult};
use crate::model::leave_balance::{BalanceDefaults, LeaveBalance};
use crate::model::leave_request::LeaveCategory;
use crate::service::workflow::LedgerEffect;
use crate::store::RecordStore;

/// Read side of the per-employee quota counters.
pub struct BalanceLedger<'a> {
    store: &'a dyn RecordStore,
}

impl<'a> BalanceLedger<'a> {
    pub fn new(store: &'a dyn RecordStore) -> Self {
        Self { store }
    }

    pub async fn read(&self, employee_id: u64) -> LeaveResult<LeaveBalance> {
        self.store
            .find_balance(employee_id)
            .await?
            .ok_or(LeaveError::NotFound("leave balance"))
    }
}

/// A balance row held under the store's lock for the current transaction.
///
/// Every debit and credit goes through here. The caller persists
/// [`LockedBalance::into_inner`] only once the whole transaction has succeeded.
#[derive(Debug)]
pub struct LockedBalance {
    balance: LeaveBalance,
}

impl LockedBalance {
    /// Takes the locked row, or a fresh one at `defaults` when the employee has none yet.
    pub fn ensure(
        employee_id: u64,
        found: Option<LeaveBalance>,
        defaults: &BalanceDefaults,
    ) -> Self {
        let balance = found.unwrap_or_else(|| LeaveBalance::new(employee_id, defaults));
        Self { balance }
    }

    pub fn debit(&mut self, category: &str, amount: u32) -> LeaveResult<()> {
        let category = LeaveCategory::parse(category)?;
        self.balance.debit(category, amount)?;
        info!(
            employee_id = self.balance.employee_id,
            %category,
            amount,
            remaining = self.balance.available(category),
            "Balance debited"
        );
        Ok(())
    }

    pub fn credit(&mut self, category: &str, amount: u32) -> LeaveResult<()> {
        let category = LeaveCategory::parse(category)?;
        self.balance.credit(category, amount)?;
        info!(
            employee_id = self.balance.employee_id,
            %category,
            amount,
            remaining = self.balance.available(category),
            "Balance credited"
        );
        Ok(())
    }

    pub fn post(&mut self, effect: LedgerEffect) -> LeaveResult<()> {
        match effect {
            LedgerEffect::Debit { category, days } => self.debit(category.as_ref(), days),
            LedgerEffect::Credit { category, days } => self.credit(category.as_ref(), days),
        }
    }

    pub fn into_inner(self) -> LeaveBalance {
        self.balance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryStore;

    #[actix_web::test]
    async fn read_without_record_is_not_found() {
        let store = InMemoryStore::new();
        let ledger = BalanceLedger::new(&store);
        assert_eq!(ledger.read(1).await, Err(LeaveError::NotFound("leave balance")));
    }

    #[test]
    fn ensure_keeps_an_existing_row() {
        let defaults = BalanceDefaults::default();
        let mut existing = LeaveBalance::new(5, &defaults);
        existing.medical = 4;

        let kept = LockedBalance::ensure(5, Some(existing.clone()), &defaults).into_inner();
        assert_eq!(kept, existing);

        let fresh = LockedBalance::ensure(5, None, &defaults).into_inner();
        assert_eq!(fresh, LeaveBalance::new(5, &defaults));
    }

    #[test]
    fn debit_validates_category_and_amount() {
        let mut account = LockedBalance::ensure(1, None, &BalanceDefaults::default());

        assert_eq!(
            account.debit("annual", 1),
            Err(LeaveError::UnknownCategory("annual".into()))
        );
        assert_eq!(account.debit("sick", 0), Err(LeaveError::validation("amount")));
        account.debit("Sick", 4).unwrap();
        account.credit("sick", 1).unwrap();
        assert_eq!(account.into_inner().sick_casual, 7);
    }

    #[test]
    fn refused_post_leaves_the_row_as_it_was() {
        let mut account = LockedBalance::ensure(2, None, &BalanceDefaults::default());
        let effect = LedgerEffect::Debit {
            category: LeaveCategory::Privileged,
            days: 19,
        };
        assert_eq!(
            account.post(effect),
            Err(LeaveError::InsufficientBalance {
                category: LeaveCategory::Privileged,
                requested: 19,
                available: 18,
            })
        );
        assert_eq!(account.into_inner().privileged, 18);
    }
}
