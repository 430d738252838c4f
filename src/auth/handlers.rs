use axum::{
    extract::{rejection::JsonRejection, FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, RegisterRequest, VerifyResponse},
        jwt::{BearerClaims, JwtKeys},
        password::{hash_password, verify_password},
        repo_types::NewUser,
        validate::{normalize_email, run_checks, LOGIN_CHECKS, REGISTER_CHECKS},
    },
    error::AuthError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register).fallback(method_not_allowed))
        .route("/auth/login", post(login).fallback(method_not_allowed))
        .route("/auth/verify", get(verify).fallback(method_not_allowed))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), AuthError> {
    let Json(payload) = payload.map_err(malformed_body)?;
    run_checks(&payload, REGISTER_CHECKS)?;

    let username = payload.username.unwrap_or_default().trim().to_string();
    let email = normalize_email(&payload.email.unwrap_or_default());
    let password = payload.password.unwrap_or_default();

    if state.users.find_by_username(&username).await?.is_some() {
        warn!(%username, "username already registered");
        return Err(AuthError::Conflict("Username already exists"));
    }
    if state.users.find_by_email(&email).await?.is_some() {
        warn!(%email, "email already registered");
        return Err(AuthError::Conflict("Email already registered"));
    }

    let password_hash = hash_password(&password)?;
    // The unique constraints still catch a concurrent registration here.
    let user = state
        .users
        .insert(NewUser {
            username,
            email,
            password_hash,
        })
        .await?;

    let token = JwtKeys::from_ref(&state).sign(&user)?;

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            success: true,
            message: "User registered",
            token,
            user: user.into(),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, AuthError> {
    let Json(payload) = payload.map_err(malformed_body)?;
    run_checks(&payload, LOGIN_CHECKS)?;

    let login = payload.username.unwrap_or_default().trim().to_string();
    let password = payload.password.unwrap_or_default();

    let Some(mut user) = state.users.find_by_login(&login).await? else {
        warn!(%login, "login unknown user");
        return Err(AuthError::InvalidCredentials);
    };

    if !verify_password(&password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AuthError::InvalidCredentials);
    }

    match state.users.touch_last_login(user.id).await {
        Ok(at) => user.last_login = Some(at),
        Err(e) => warn!(error = %e, user_id = %user.id, "last_login update failed"),
    }

    let token = JwtKeys::from_ref(&state).sign(&user)?;

    info!(user_id = %user.id, username = %user.username, "user logged in");
    Ok(Json(AuthResponse {
        success: true,
        message: "Login successful",
        token,
        user: user.into(),
    }))
}

#[instrument(skip_all)]
pub async fn verify(
    State(state): State<AppState>,
    BearerClaims(claims): BearerClaims,
) -> Result<Json<VerifyResponse>, AuthError> {
    let user = state.users.find_by_id(claims.sub).await?.ok_or_else(|| {
        warn!(user_id = %claims.sub, "token subject no longer exists");
        AuthError::UserNotFound
    })?;

    Ok(Json(VerifyResponse {
        valid: true,
        user: user.into(),
    }))
}

async fn method_not_allowed() -> AuthError {
    AuthError::MethodNotAllowed
}

fn malformed_body(rejection: JsonRejection) -> AuthError {
    AuthError::Internal(anyhow::anyhow!(
        "malformed request body: {}",
        rejection.body_text()
    ))
}
