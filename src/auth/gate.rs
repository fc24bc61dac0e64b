use std::time::Duration;

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use serde::Serialize;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::auth::repo::UserRecord;
use crate::auth::role::Role;
use crate::auth::session::issued_after_password_change;
use crate::auth::token::TokenKeys;
use crate::error::{ApiError, AuthFailure};
use crate::state::AppState;

const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Request-scoped principal, derived from a verified token plus a store
/// lookup. Carries only what downstream handlers may see; the password hash
/// and `password_changed_at` stay behind this boundary.
#[derive(Debug, Clone, Serialize)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

/// Lookup contract of the credential store. A store-level failure is not an
/// authentication verdict; the gate maps it to `Unavailable`.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<UserRecord>>;
}

#[async_trait]
impl CredentialStore for PgPool {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<UserRecord>> {
        UserRecord::find_by_id(self, id).await
    }
}

/// The per-request authentication pipeline. Checks run in order and
/// short-circuit: a token that fails to decode never reaches the store.
///
/// 1. extract the bearer credential from the Authorization header;
/// 2. decode and verify it (signature, expiry, issuer, audience);
/// 3. load the subject from the credential store;
/// 4. reject tokens issued before the last password change;
/// 5. hand back the Identity.
pub async fn authenticate<S: CredentialStore>(
    authorization: Option<&str>,
    keys: &TokenKeys,
    store: &S,
) -> Result<Identity, ApiError> {
    let token = authorization
        .and_then(|header| {
            header
                .strip_prefix("Bearer ")
                .or_else(|| header.strip_prefix("bearer "))
        })
        .ok_or(ApiError::Unauthenticated(AuthFailure::MissingToken))?;

    let claims = keys
        .verify(token)
        .map_err(|_| ApiError::Unauthenticated(AuthFailure::InvalidToken))?;

    let user = tokio::time::timeout(LOOKUP_TIMEOUT, store.find_by_id(claims.sub))
        .await
        .map_err(|elapsed| ApiError::Unavailable(elapsed.into()))?
        .map_err(ApiError::Unavailable)?
        .ok_or(ApiError::Unauthenticated(AuthFailure::UnknownUser))?;

    if !issued_after_password_change(claims.iat, user.password_changed_at) {
        return Err(ApiError::Unauthenticated(AuthFailure::PasswordChanged));
    }

    debug!(user_id = %user.id, role = ?user.role, "request authenticated");
    Ok(Identity {
        id: user.id,
        email: user.email,
        role: user.role,
    })
}

#[async_trait]
impl FromRequestParts<AppState> for Identity {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Fast path when the middleware already connected this request.
        let pool = state
            .db
            .ensure_connected()
            .await
            .map_err(ApiError::Unavailable)?;

        let authorization = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok());

        authenticate(authorization, &state.keys, &pool).await
    }
}
