use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::error::{LeaveError, LeaveResult};
use crate::model::role::Role;
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, web::Data};
use futures::future::{Ready, ready};

/// Caller identity, placed in request extensions by `auth_middleware`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,
}

fn from_header(req: &HttpRequest) -> actix_web::Result<AuthUser> {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or(LeaveError::Unauthorized("Missing token"))?;

    let config = req.app_data::<Data<Config>>().ok_or_else(|| {
        tracing::error!("Config not registered as app data");
        actix_web::error::ErrorInternalServerError("App config missing")
    })?;

    let claims =
        verify_token(token, &config.jwt_secret).map_err(|_| LeaveError::Unauthorized("Invalid token"))?;

    Ok(AuthUser {
        user_id: claims.user_id,
        username: claims.sub,
        role: claims.role,
    })
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }
        ready(from_header(req))
    }
}

impl AuthUser {
    pub fn require_manager(&self) -> LeaveResult<()> {
        if self.role == Role::Manager {
            Ok(())
        } else {
            Err(LeaveError::Forbidden("Manager only"))
        }
    }

    /// Returns the caller's employee id.
    pub fn require_employee(&self) -> LeaveResult<u64> {
        if self.role == Role::Employee {
            Ok(self.user_id)
        } else {
            Err(LeaveError::Forbidden("Employee only"))
        }
    }

    pub fn require_self_or_manager(&self, employee_id: u64) -> LeaveResult<()> {
        if self.role == Role::Manager || self.user_id == employee_id {
            Ok(())
        } else {
            Err(LeaveError::Forbidden("Not allowed to access another employee's records"))
        }
    }
}
