use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::error::{LeaveError, LeaveResult};

/// Accepted input formats for leave dates, tried in order.
pub const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d-%m-%Y"];

/// The fixed set of leave categories. `sick` draws on the sick/casual counter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, Display, EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LeaveCategory {
    Sick,
    Medical,
    Privileged,
}

impl LeaveCategory {
    /// Parses user input; anything outside the fixed set is an unknown category.
    pub fn parse(value: &str) -> LeaveResult<Self> {
        let value = value.trim();
        value
            .parse()
            .map_err(|_| LeaveError::UnknownCategory(value.to_string()))
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, Display, EnumString,
    AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

impl LeaveStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, LeaveStatus::Pending)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct LeaveRequest {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 2)]
    pub employee_id: u64,
    /// Stored as text; checked against the category set when a decision needs it.
    #[schema(example = "sick")]
    pub leave_type: String,
    #[schema(example = "Flu")]
    pub reason: String,
    #[schema(example = "2024-01-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2024-01-03", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    pub status: LeaveStatus,
    #[schema(nullable = true)]
    pub remarks: Option<String>,
}

impl LeaveRequest {
    /// Inclusive day count between start and end.
    pub fn duration(&self) -> LeaveResult<u32> {
        leave_duration(self.start_date, self.end_date)
    }

    pub fn category(&self) -> LeaveResult<LeaveCategory> {
        self.leave_type
            .parse()
            .map_err(|_| LeaveError::InvalidLeaveType(self.leave_type.clone()))
    }

    pub fn ensure_deletable(&self) -> LeaveResult<()> {
        if self.status != LeaveStatus::Pending {
            return Err(LeaveError::invalid_state(format!(
                "Cannot delete leave with status '{}'",
                self.status
            )));
        }
        Ok(())
    }
}

/// A validated leave application, ready to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLeaveRequest {
    pub employee_id: u64,
    pub leave_type: LeaveCategory,
    pub reason: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub remarks: Option<String>,
}

/// A leave request joined with its owner's display name (manager views).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct LeaveWithEmployee {
    #[serde(flatten)]
    pub leave: LeaveRequest,
    #[schema(example = "alice")]
    pub employee_name: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct LeaveStatistics {
    pub total: u64,
    pub pending: u64,
    pub approved: u64,
    pub rejected: u64,
}

impl LeaveStatistics {
    pub fn record(&mut self, status: LeaveStatus) {
        self.total += 1;
        match status {
            LeaveStatus::Pending => self.pending += 1,
            LeaveStatus::Approved => self.approved += 1,
            LeaveStatus::Rejected => self.rejected += 1,
        }
    }
}

pub fn parse_leave_date(field: &str, value: &str) -> LeaveResult<NaiveDate> {
    let value = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .ok_or_else(|| LeaveError::validation(field))
}

pub fn leave_duration(start: NaiveDate, end: NaiveDate) -> LeaveResult<u32> {
    let days = (end - start).num_days() + 1;
    u32::try_from(days)
        .ok()
        .filter(|d| *d >= 1)
        .ok_or_else(|| LeaveError::validation("end_date"))
}

/// Trims optional free text; blank becomes `None`.
pub fn normalize_remarks(remarks: Option<&str>) -> Option<String> {
    remarks
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn request(status: LeaveStatus, leave_type: &str) -> LeaveRequest {
        LeaveRequest {
            id: 1,
            employee_id: 2,
            leave_type: leave_type.to_string(),
            reason: "Flu".to_string(),
            start_date: date(2024, 1, 1),
            end_date: date(2024, 1, 3),
            status,
            remarks: None,
        }
    }

    #[test]
    fn duration_is_inclusive_of_both_ends() {
        assert_eq!(leave_duration(date(2024, 1, 1), date(2024, 1, 3)), Ok(3));
        assert_eq!(leave_duration(date(2024, 1, 1), date(2024, 1, 1)), Ok(1));
        assert_eq!(leave_duration(date(2024, 2, 28), date(2024, 3, 1)), Ok(3));
    }

    #[test]
    fn reversed_range_has_no_duration() {
        assert_eq!(
            leave_duration(date(2024, 1, 3), date(2024, 1, 1)),
            Err(LeaveError::validation("end_date"))
        );
    }

    #[test]
    fn dates_accept_iso_then_day_first() {
        assert_eq!(parse_leave_date("start_date", "2024-01-05"), Ok(date(2024, 1, 5)));
        assert_eq!(parse_leave_date("start_date", " 05-01-2024 "), Ok(date(2024, 1, 5)));
        assert_eq!(
            parse_leave_date("end_date", "01/05/2024"),
            Err(LeaveError::validation("end_date"))
        );
    }

    #[test]
    fn category_parsing_is_case_insensitive() {
        assert_eq!(LeaveCategory::parse("SICK"), Ok(LeaveCategory::Sick));
        assert_eq!(LeaveCategory::parse(" Privileged "), Ok(LeaveCategory::Privileged));
        assert_eq!(LeaveCategory::Medical.as_ref(), "medical");
        assert_eq!(
            LeaveCategory::parse("annual"),
            Err(LeaveError::UnknownCategory("annual".into()))
        );
    }

    #[test]
    fn stored_category_is_checked_on_use() {
        assert_eq!(request(LeaveStatus::Pending, "sick").category(), Ok(LeaveCategory::Sick));
        assert_eq!(
            request(LeaveStatus::Pending, "vacation").category(),
            Err(LeaveError::InvalidLeaveType("vacation".into()))
        );
    }

    #[test]
    fn only_pending_requests_are_deletable() {
        assert!(request(LeaveStatus::Pending, "sick").ensure_deletable().is_ok());
        for status in [LeaveStatus::Approved, LeaveStatus::Rejected] {
            assert!(matches!(
                request(status, "sick").ensure_deletable(),
                Err(LeaveError::InvalidState(_))
            ));
        }
    }

    #[test]
    fn status_round_trips_through_text() {
        assert_eq!("approved".parse::<LeaveStatus>(), Ok(LeaveStatus::Approved));
        assert_eq!(LeaveStatus::Rejected.to_string(), "Rejected");
        assert!("Cancelled".parse::<LeaveStatus>().is_err());
    }
}
