pub mod balance;
pub mod employee;
pub mod leave_request;

use actix_web::{HttpResponse, Responder, get};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = Object,
        example = json!({"status": "ok"}))),
    tag = "Health"
)]
#[get("/health")]
pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}
