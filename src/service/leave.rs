use serde::Deserialize;
use tracing::{info, instrument};
use utoipa::ToSchema;

use crate::error::{LeaveError, LeaveResult};
use crate::model::leave_request::{
    LeaveCategory, LeaveRequest, LeaveStatistics, LeaveStatus, LeaveWithEmployee,
    NewLeaveRequest, normalize_remarks, parse_leave_date,
};
use crate::store::RecordStore;

/// Leave application as submitted by an employee. Every field is checked here, so
/// missing values surface as a validation error naming the field.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct LeaveApplication {
    #[schema(example = "sick")]
    pub leave_type: Option<String>,
    #[schema(example = "Flu")]
    pub reason: Option<String>,
    /// `YYYY-MM-DD` or `DD-MM-YYYY`
    #[schema(example = "2024-01-01")]
    pub start_date: Option<String>,
    #[schema(example = "2024-01-03")]
    pub end_date: Option<String>,
    #[schema(example = "Back on Thursday")]
    pub remarks: Option<String>,
}

fn required<'a>(field: &str, value: &'a Option<String>) -> LeaveResult<&'a str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| LeaveError::validation(field))
}

impl LeaveApplication {
    fn validate(&self, employee_id: u64) -> LeaveResult<NewLeaveRequest> {
        let leave_type = required("leave_type", &self.leave_type)?;
        let reason = required("reason", &self.reason)?;
        let start = required("start_date", &self.start_date)?;
        let end = required("end_date", &self.end_date)?;

        let leave_type =
            LeaveCategory::parse(leave_type).map_err(|_| LeaveError::validation("leave_type"))?;
        let start_date = parse_leave_date("start_date", start)?;
        let end_date = parse_leave_date("end_date", end)?;
        if end_date < start_date {
            return Err(LeaveError::validation("end_date"));
        }

        Ok(NewLeaveRequest {
            employee_id,
            leave_type,
            reason: reason.to_string(),
            start_date,
            end_date,
            remarks: normalize_remarks(self.remarks.as_deref()),
        })
    }
}

/// Creation, lookup and removal of leave requests.
pub struct LeaveRequests<'a> {
    store: &'a dyn RecordStore,
}

impl<'a> LeaveRequests<'a> {
    pub fn new(store: &'a dyn RecordStore) -> Self {
        Self { store }
    }

    #[instrument(name = "leave_create", skip(self, application))]
    pub async fn create(&self, employee_id: u64, application: &LeaveApplication) -> LeaveResult<u64> {
        let leave = application.validate(employee_id)?;

        let employee = self
            .store
            .find_user(employee_id)
            .await?
            .filter(|u| u.is_employee())
            .ok_or(LeaveError::EmployeeNotFound)?;
        if !employee.approved {
            return Err(LeaveError::EmployeeNotApproved);
        }

        let id = self.store.insert_leave(leave).await?;
        info!(leave_id = id, employee_id, "Leave request submitted");
        Ok(id)
    }

    pub async fn get(&self, id: u64) -> LeaveResult<LeaveRequest> {
        self.store
            .find_leave(id)
            .await?
            .ok_or(LeaveError::NotFound("leave request"))
    }

    pub async fn list_by_employee(&self, employee_id: u64) -> LeaveResult<Vec<LeaveRequest>> {
        self.store.leaves_for_employee(employee_id).await
    }

    /// Every request with its owner's name, optionally only those in `status`.
    pub async fn list_all(&self, status: Option<&str>) -> LeaveResult<Vec<LeaveWithEmployee>> {
        let status: Option<LeaveStatus> = status
            .map(|s| s.trim().parse().map_err(|_| LeaveError::validation("status")))
            .transpose()?;
        let mut all = self.store.leaves_with_employee().await?;
        if let Some(status) = status {
            all.retain(|l| l.leave.status == status);
        }
        Ok(all)
    }

    #[instrument(name = "leave_delete", skip(self))]
    pub async fn delete(&self, id: u64) -> LeaveResult<()> {
        self.store.delete_pending_leave(id).await?;
        info!(leave_id = id, "Leave request deleted");
        Ok(())
    }

    pub async fn statistics(&self) -> LeaveResult<LeaveStatistics> {
        self.store.leave_statistics(None).await
    }
}
