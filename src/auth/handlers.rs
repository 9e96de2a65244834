use crate::{
    auth::{jwt::generate_access_token, password::verify_password},
    config::Config,
    context::AppContext,
    error::LeaveError,
    models::{LoginReqDto, LoginResponse, UserReq},
};
use actix_web::{HttpResponse, web};
use serde_json::json;
use tracing::{debug, error, info, instrument};

/// User registration handler
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = UserReq,
    responses(
        (status = 201, description = "Employee registered, awaiting manager approval", body = Object,
         example = json!({"message": "Registration successful, awaiting manager approval", "id": 2})),
        (status = 400, description = "Empty username or password"),
        (status = 409, description = "Username already exists")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_register", skip(ctx, user), fields(username = %user.username))]
pub async fn register(
    user: web::Json<UserReq>,
    ctx: web::Data<AppContext>,
) -> actix_web::Result<HttpResponse> {
    let id = ctx
        .onboarding()
        .register_employee(&user.username, &user.password)
        .await?;

    Ok(HttpResponse::Created().json(json!({
        "message": "Registration successful, awaiting manager approval",
        "id": id
    })))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Access token issued", body = LoginResponse),
        (status = 400, description = "Username or password missing"),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Employee not approved yet")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(ctx, config, user),
    fields(username = %user.username)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    ctx: web::Data<AppContext>,
    config: web::Data<Config>,
) -> actix_web::Result<HttpResponse> {
    info!("Login request received");

    if user.username.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty username or password");
        return Err(LeaveError::validation("username/password").into());
    }

    debug!("Fetching user from store");

    let account = match ctx.store.find_user_by_username(user.username.trim()).await? {
        Some(account) => account,
        None => {
            info!("Invalid credentials: user not found");
            return Err(LeaveError::Unauthorized("Invalid credentials").into());
        }
    };

    if let Err(e) = verify_password(&user.password, &account.password_hash) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Err(LeaveError::Unauthorized("Invalid credentials").into());
    }

    if account.is_employee() && !account.approved {
        info!(user_id = account.id, "Login refused: employee not approved");
        return Err(LeaveError::EmployeeNotApproved.into());
    }

    let access_token = generate_access_token(&account, &config.jwt_secret, config.access_token_ttl)
        .map_err(|e| {
            error!(error = %e, "Failed to sign access token");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    info!(user_id = account.id, "Login successful");

    Ok(HttpResponse::Ok().json(LoginResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: config.access_token_ttl,
        role: account.role.to_string(),
    }))
}
