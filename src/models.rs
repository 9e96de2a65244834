use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::role::Role;

#[derive(Deserialize, ToSchema)]
pub struct UserReq {
    #[schema(example = "alice")]
    pub username: String,
    #[schema(example = "s3cret")]
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginReqDto {
    #[schema(example = "manager")]
    pub username: String,
    #[schema(example = "manager123")]
    pub password: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    #[schema(example = "Bearer")]
    pub token_type: String,
    #[schema(example = 900)]
    pub expires_in: usize,
    #[schema(example = "employee")]
    pub role: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: u64,
    pub sub: String,
    pub role: Role,
    pub exp: usize,
    pub jti: String,
}

/// Manager decision on a leave request.
#[derive(Deserialize, ToSchema)]
pub struct UpdateLeaveStatus {
    /// `Approved`, `Rejected` or `Pending`
    #[schema(example = "Approved")]
    pub status: String,
    #[schema(example = "Enjoy the break")]
    pub remarks: Option<String>,
}
