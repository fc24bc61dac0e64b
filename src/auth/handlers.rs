use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, ChangePasswordRequest, LoginRequest, PublicUser},
        gate::Identity,
        password::{hash_password, verify_password},
        repo::UserRecord,
        role::{authorize, ADMIN_ONLY},
    },
    error::{ApiError, AuthFailure},
    state::AppState,
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/password", post(change_password))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(me))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new().route("/admin/users", get(list_users))
}

fn public(user: &UserRecord) -> PublicUser {
    PublicUser {
        id: user.id,
        email: user.email.clone(),
        role: user.role,
    }
}

/// Mints a bearer token for valid credentials. Unknown email and wrong
/// password collapse to the same generic response.
#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "login with malformed email");
        return Err(ApiError::Unauthenticated(AuthFailure::BadCredentials));
    }

    let pool = state
        .db
        .ensure_connected()
        .await
        .map_err(ApiError::Unavailable)?;

    let user = UserRecord::find_by_email(&pool, &payload.email)
        .await
        .map_err(ApiError::Unavailable)?
        .ok_or_else(|| {
            warn!(email = %payload.email, "login with unknown email");
            ApiError::Unauthenticated(AuthFailure::BadCredentials)
        })?;

    let matches =
        verify_password(&payload.password, &user.password_hash).map_err(ApiError::Internal)?;
    if !matches {
        warn!(user_id = %user.id, "login with wrong password");
        return Err(ApiError::Unauthenticated(AuthFailure::BadCredentials));
    }

    let token = state.keys.sign(user.id).map_err(ApiError::Internal)?;
    info!(user_id = %user.id, "user logged in");
    Ok(Json(AuthResponse {
        token,
        user: public(&user),
    }))
}

/// Changes the caller's password. Stamping `password_changed_at` revokes
/// every token minted before this request, including the one that
/// authenticated it.
#[instrument(skip(state, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<PublicUser>, ApiError> {
    let pool = state
        .db
        .ensure_connected()
        .await
        .map_err(ApiError::Unavailable)?;

    let user = UserRecord::find_by_id(&pool, identity.id)
        .await
        .map_err(ApiError::Unavailable)?
        .ok_or(ApiError::Unauthenticated(AuthFailure::UnknownUser))?;

    let matches = verify_password(&payload.current_password, &user.password_hash)
        .map_err(ApiError::Internal)?;
    if !matches {
        warn!(user_id = %user.id, "password change with wrong current password");
        return Err(ApiError::Unauthenticated(AuthFailure::BadCredentials));
    }

    let new_hash = hash_password(&payload.new_password).map_err(ApiError::Internal)?;
    UserRecord::update_password(&pool, user.id, &new_hash)
        .await
        .map_err(ApiError::Unavailable)?;

    info!(user_id = %user.id, "password changed, earlier tokens revoked");
    Ok(Json(public(&user)))
}

#[instrument(skip(identity))]
pub async fn me(identity: Identity) -> Json<Identity> {
    Json(identity)
}

#[instrument(skip(state, identity))]
pub async fn list_users(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<Vec<PublicUser>>, ApiError> {
    authorize(&identity, ADMIN_ONLY)?;

    let pool = state
        .db
        .ensure_connected()
        .await
        .map_err(ApiError::Unavailable)?;
    let users = UserRecord::list(&pool).await.map_err(ApiError::Unavailable)?;
    Ok(Json(users.iter().map(public).collect()))
}
