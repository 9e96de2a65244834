use crate::auth::auth::AuthUser;
use crate::context::AppContext;
use crate::model::leave_balance::LeaveBalance;
use crate::model::user::EmployeeSummary;
use actix_web::{HttpResponse, web};
use serde::Serialize;
use tracing::instrument;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct ApprovedEmployeeResponse {
    #[schema(example = "Employee approved")]
    pub message: String,
    pub employee: EmployeeSummary,
    pub balance: LeaveBalance,
}

/// Approved employees with their request counts
#[utoipa::path(
    get,
    path = "/api/employee",
    responses(
        (status = 200, description = "Approved employees with leave counts", body = [crate::model::user::EmployeeStats]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Manager only")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn list_employees(
    auth: AuthUser,
    ctx: web::Data<AppContext>,
) -> actix_web::Result<HttpResponse> {
    auth.require_manager()?;
    Ok(HttpResponse::Ok().json(ctx.onboarding().list_employees_with_stats().await?))
}

/// Employees waiting for activation
#[utoipa::path(
    get,
    path = "/api/employee/pending",
    responses(
        (status = 200, description = "Unapproved employees", body = [EmployeeSummary]),
        (status = 403, description = "Manager only")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn pending_employees(
    auth: AuthUser,
    ctx: web::Data<AppContext>,
) -> actix_web::Result<HttpResponse> {
    auth.require_manager()?;
    Ok(HttpResponse::Ok().json(ctx.onboarding().list_pending_employees().await?))
}

/// Approve Employee
#[utoipa::path(
    put,
    path = "/api/employee/{id}/approve",
    params(("id" = u64, Path, description = "User ID of the employee")),
    responses(
        (status = 200, description = "Employee activated with a leave balance", body = ApprovedEmployeeResponse),
        (status = 403, description = "Manager only"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
#[instrument(name = "api_approve_employee", skip(ctx, path), fields(user_id = auth.user_id))]
pub async fn approve_employee(
    auth: AuthUser,
    ctx: web::Data<AppContext>,
    path: web::Path<u64>,
) -> actix_web::Result<HttpResponse> {
    auth.require_manager()?;
    let (user, balance) = ctx.onboarding().approve_employee(path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(ApprovedEmployeeResponse {
        message: "Employee approved".to_string(),
        employee: EmployeeSummary::from(&user),
        balance,
    }))
}
