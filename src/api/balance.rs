use crate::auth::auth::AuthUser;
use crate::context::AppContext;
use actix_web::{HttpResponse, web};

#[utoipa::path(
    get,
    path = "/api/balance",
    responses(
        (status = 200, description = "Every employee balance", body = [crate::model::leave_balance::EmployeeBalance]),
        (status = 403, description = "Manager only")
    ),
    tag = "Balance",
    security(("bearer_auth" = []))
)]
pub async fn list_balances(
    auth: AuthUser,
    ctx: web::Data<AppContext>,
) -> actix_web::Result<HttpResponse> {
    auth.require_manager()?;
    Ok(HttpResponse::Ok().json(ctx.onboarding().list_balances().await?))
}

#[utoipa::path(
    get,
    path = "/api/balance/{employee_id}",
    params(("employee_id" = u64, Path, description = "Employee user ID")),
    responses(
        (status = 200, description = "Remaining days per category", body = crate::model::leave_balance::LeaveBalance),
        (status = 403, description = "Not your balance"),
        (status = 404, description = "No balance yet")
    ),
    tag = "Balance",
    security(("bearer_auth" = []))
)]
pub async fn get_balance(
    auth: AuthUser,
    ctx: web::Data<AppContext>,
    path: web::Path<u64>,
) -> actix_web::Result<HttpResponse> {
    let employee_id = path.into_inner();
    auth.require_self_or_manager(employee_id)?;
    Ok(HttpResponse::Ok().json(ctx.ledger().read(employee_id).await?))
}
