use crate::api::employee::ApprovedEmployeeResponse;
use crate::model::leave_balance::{EmployeeBalance, LeaveBalance};
use crate::model::leave_request::{
    LeaveCategory, LeaveRequest, LeaveStatistics, LeaveStatus, LeaveWithEmployee,
};
use crate::model::user::{EmployeeStats, EmployeeSummary};
use crate::models::{LoginReqDto, LoginResponse, UpdateLeaveStatus, UserReq};
use crate::service::leave::LeaveApplication;
use crate::service::workflow::DecisionResponse;
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Leave Ledger API",
        version = "1.0.0",
        description = r#"
## Leave Request Lifecycle & Balance Ledger

Employees apply for leave, managers approve or reject, and every approval debits the
employee's per-category balance in the same transaction as the status change.

### Key Features
- **Leave requests**: apply, list, view and delete while pending
- **Approval workflow**: `Pending`, `Approved`, `Rejected` with at-most-once debit
- **Balances**: `sick_casual`, `medical` and `privileged` day counters per employee
- **Onboarding**: self registration, manager activation, default balance on approval

### Security
Endpoints under the API prefix require a **JWT Bearer** token from `/auth/login`.
Manager-only operations are marked in each endpoint's description.
"#,
    ),
    paths(
        crate::api::health,

        crate::auth::handlers::login,
        crate::auth::handlers::register,

        crate::api::leave_request::create_leave,
        crate::api::leave_request::leave_list,
        crate::api::leave_request::my_leaves,
        crate::api::leave_request::leave_stats,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::delete_leave,
        crate::api::leave_request::update_leave_status,

        crate::api::employee::list_employees,
        crate::api::employee::pending_employees,
        crate::api::employee::approve_employee,

        crate::api::balance::list_balances,
        crate::api::balance::get_balance
    ),
    components(
        schemas(
            UserReq,
            LoginReqDto,
            LoginResponse,
            LeaveApplication,
            UpdateLeaveStatus,
            DecisionResponse,
            LeaveCategory,
            LeaveStatus,
            LeaveRequest,
            LeaveWithEmployee,
            LeaveStatistics,
            LeaveBalance,
            EmployeeBalance,
            EmployeeSummary,
            EmployeeStats,
            ApprovedEmployeeResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login and employee self registration"),
        (name = "Leave", description = "Leave request lifecycle APIs"),
        (name = "Employee", description = "Employee onboarding APIs"),
        (name = "Balance", description = "Leave balance ledger APIs"),
        (name = "Health", description = "Liveness"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
