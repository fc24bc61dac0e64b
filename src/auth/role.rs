use serde::{Deserialize, Serialize};

use crate::auth::gate::Identity;
use crate::error::ApiError;

/// Closed set of permission levels. Stored as the Postgres enum `user_role`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum Role {
    Admin,
    Moderator,
    User,
}

pub const ADMIN_ONLY: &[Role] = &[Role::Admin];

/// Role gate. Runs strictly after a successful `authenticate`; pure and
/// synchronous. Re-authenticating cannot turn a `Forbidden` into a success,
/// which is why it is surfaced distinctly from `Unauthenticated`.
pub fn authorize(identity: &Identity, allowed: &[Role]) -> Result<(), ApiError> {
    if allowed.contains(&identity.role) {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}
