use crate::auth::auth::AuthUser;
use crate::auth::jwt::verify_token;
use crate::config::Config;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};
use serde_json::json;
use tracing::debug;

fn reject(req: ServiceRequest, message: &str) -> ServiceResponse<BoxBody> {
    debug!(path = %req.path(), reason = message, "Request rejected by auth middleware");
    let resp = HttpResponse::Unauthorized().json(json!({ "error": message }));
    req.into_response(resp.map_into_boxed_body())
}

/// Verifies the bearer token and stores the caller as an `AuthUser` extension.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .cloned()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?;

    let header_value = match req.headers().get("Authorization") {
        Some(h) => match h.to_str() {
            Ok(v) => v.to_owned(),
            Err(_) => return Ok(reject(req, "Invalid Authorization header encoding")),
        },
        None => return Ok(reject(req, "Missing Authorization header")),
    };

    let token = match header_value.strip_prefix("Bearer ") {
        Some(t) => t,
        None => return Ok(reject(req, "Authorization header must start with Bearer")),
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) => c,
        Err(_) => return Ok(reject(req, "Invalid or expired token")),
    };

    req.extensions_mut().insert(AuthUser {
        user_id: claims.user_id,
        username: claims.sub,
        role: claims.role,
    });

    next.call(req).await
}
