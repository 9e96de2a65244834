use anyhow::{Context, anyhow};
use tracing::info;

use crate::auth::password::hash_password;
use crate::error::LeaveError;
use crate::model::role::Role;
use crate::model::user::NewUser;
use crate::store::RecordStore;
use crate::utils::username_index::UsernameIndex;

/// Creates the manager account if it does not exist yet. Safe to run on every start.
pub async fn seed_manager(
    store: &dyn RecordStore,
    usernames: &UsernameIndex,
    username: &str,
    password: &str,
) -> anyhow::Result<bool> {
    if store.find_user_by_username(username).await?.is_some() {
        info!(username, "Manager account already present");
        return Ok(false);
    }

    let password_hash =
        hash_password(password).map_err(|e| anyhow!("Failed to hash manager password: {e}"))?;

    match store
        .insert_user(NewUser {
            username: username.to_string(),
            password_hash,
            role: Role::Manager,
            approved: true,
        })
        .await
    {
        Ok(id) => {
            usernames.mark_taken(username).await;
            info!(user_id = id, username, "Manager account seeded");
            Ok(true)
        }
        // Another instance seeded it between our lookup and insert.
        Err(LeaveError::Conflict(_)) => Ok(false),
        Err(e) => Err(e).context("Failed to seed manager account"),
    }
}
