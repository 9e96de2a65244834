use crate::auth::auth::AuthUser;
use crate::context::AppContext;
use crate::models::UpdateLeaveStatus;
use crate::service::leave::LeaveApplication;
use crate::service::workflow::DecisionResponse;
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;
use utoipa::IntoParams;

#[derive(Deserialize, IntoParams)]
pub struct LeaveFilter {
    /// Only requests in this status: Pending, Approved or Rejected
    pub status: Option<String>,
}

/* =========================
Create leave request
========================= */
#[utoipa::path(
    post,
    path = "/api/leave",
    request_body(
        content = LeaveApplication,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave request submitted",
         body = Object,
         example = json!({
            "message": "Leave request submitted",
            "id": 1,
            "status": "Pending"
         })
        ),
        (status = 400, description = "Missing or invalid field"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not an approved employee")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
#[instrument(name = "api_create_leave", skip(ctx, payload), fields(user_id = auth.user_id))]
pub async fn create_leave(
    auth: AuthUser,
    ctx: web::Data<AppContext>,
    payload: web::Json<LeaveApplication>,
) -> actix_web::Result<HttpResponse> {
    let employee_id = auth.require_employee()?;
    let id = ctx.leaves().create(employee_id, &payload).await?;

    Ok(HttpResponse::Created().json(json!({
        "message": "Leave request submitted",
        "id": id,
        "status": "Pending"
    })))
}

/* =========================
List all leave requests (manager)
========================= */
#[utoipa::path(
    get,
    path = "/api/leave",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Every leave request with its owner's name", body = [crate::model::leave_request::LeaveWithEmployee]),
        (status = 400, description = "Unknown status filter"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Manager only")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    ctx: web::Data<AppContext>,
    query: web::Query<LeaveFilter>,
) -> actix_web::Result<HttpResponse> {
    auth.require_manager()?;
    let leaves = ctx.leaves().list_all(query.status.as_deref()).await?;
    Ok(HttpResponse::Ok().json(leaves))
}

#[utoipa::path(
    get,
    path = "/api/leave/mine",
    responses(
        (status = 200, description = "The caller's own leave requests", body = [crate::model::leave_request::LeaveRequest]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Employee only")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn my_leaves(
    auth: AuthUser,
    ctx: web::Data<AppContext>,
) -> actix_web::Result<HttpResponse> {
    let employee_id = auth.require_employee()?;
    Ok(HttpResponse::Ok().json(ctx.leaves().list_by_employee(employee_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/leave/stats",
    responses(
        (status = 200, description = "Request counts by status", body = crate::model::leave_request::LeaveStatistics),
        (status = 403, description = "Manager only")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn leave_stats(
    auth: AuthUser,
    ctx: web::Data<AppContext>,
) -> actix_web::Result<HttpResponse> {
    auth.require_manager()?;
    Ok(HttpResponse::Ok().json(ctx.leaves().statistics().await?))
}

#[utoipa::path(
    get,
    path = "/api/leave/{leave_id}",
    params(("leave_id" = u64, Path, description = "Leave request ID")),
    responses(
        (status = 200, description = "Leave request", body = crate::model::leave_request::LeaveRequest),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Leave request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    ctx: web::Data<AppContext>,
    path: web::Path<u64>,
) -> actix_web::Result<HttpResponse> {
    let leave = ctx.leaves().get(path.into_inner()).await?;
    auth.require_self_or_manager(leave.employee_id)?;
    Ok(HttpResponse::Ok().json(leave))
}

/* =========================
Delete a pending leave request
========================= */
#[utoipa::path(
    delete,
    path = "/api/leave/{leave_id}",
    params(("leave_id" = u64, Path, description = "Leave request ID")),
    responses(
        (status = 200, description = "Leave request deleted", body = Object,
         example = json!({"message": "Leave request deleted"})),
        (status = 400, description = "Only pending requests can be deleted"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Leave request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
#[instrument(name = "api_delete_leave", skip(ctx, path), fields(user_id = auth.user_id))]
pub async fn delete_leave(
    auth: AuthUser,
    ctx: web::Data<AppContext>,
    path: web::Path<u64>,
) -> actix_web::Result<HttpResponse> {
    let leaves = ctx.leaves();
    let leave = leaves.get(path.into_inner()).await?;
    auth.require_self_or_manager(leave.employee_id)?;
    leaves.delete(leave.id).await?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Leave request deleted" })))
}

/* =========================
Approve / reject (manager)
========================= */
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/status",
    params(("leave_id" = u64, Path, description = "Leave request ID")),
    request_body = UpdateLeaveStatus,
    responses(
        (status = 200, description = "Status applied", body = DecisionResponse),
        (status = 400, description = "Unknown status, invalid transition or insufficient balance"),
        (status = 403, description = "Manager only"),
        (status = 404, description = "Leave request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
#[instrument(name = "api_update_leave_status", skip(ctx, path, payload), fields(user_id = auth.user_id))]
pub async fn update_leave_status(
    auth: AuthUser,
    ctx: web::Data<AppContext>,
    path: web::Path<u64>,
    payload: web::Json<UpdateLeaveStatus>,
) -> actix_web::Result<HttpResponse> {
    auth.require_manager()?;

    let status = ctx
        .workflow()
        .decide(path.into_inner(), &payload.status, payload.remarks.as_deref())
        .await?;

    Ok(HttpResponse::Ok().json(DecisionResponse {
        message: format!("Leave request {status}"),
        status,
    }))
}
