use axum::{
    extract::{FromRef, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::jwt::{AuthUser, JwtKeys},
    error::{ApiError, ApiResult},
    state::AppState,
    users::{
        dto::{
            AuthResponse, ForgotPasswordRequest, LoginRequest, MessageResponse, PublicUser,
            RefreshRequest, RegisterRequest, ResetPasswordRequest, UpdateProfileRequest,
        },
        repo_types::{NewUser, User},
        services::{
            hash_password_blocking, is_valid_email, issue_reset_token, rehash_if_changed,
            verify_against_dummy, verify_password_blocking,
        },
    },
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me).put(update_me))
}

fn sign_pair(state: &AppState, user: &User) -> ApiResult<(String, String)> {
    let keys = JwtKeys::from_ref(state);
    let access_token = keys.sign_access(user.id, user.role)?;
    let refresh_token = keys.sign_refresh(user.id, user.role)?;
    Ok((access_token, refresh_token))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> ApiResult<Json<AuthResponse>> {
    payload.email = payload.email.trim().to_lowercase();
    payload.name = payload.name.trim().to_string();
    payload.cnic = payload.cnic.trim().to_string();

    if payload.name.is_empty() {
        return Err(ApiError::Validation("Name is required".into()));
    }
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::Validation("Invalid email".into()));
    }
    if payload.cnic.is_empty() {
        return Err(ApiError::Validation("CNIC is required".into()));
    }
    if payload.password.len() < 8 {
        warn!("password too short");
        return Err(ApiError::Validation("Password too short".into()));
    }

    // Plaintext is replaced before any durable write. Concurrent registrations
    // with the same email race on the unique constraint; exactly one wins.
    let password_hash = hash_password_blocking(payload.password).await?;

    let user = User::create(
        &state.db,
        &NewUser {
            name: payload.name,
            email: payload.email,
            cnic: payload.cnic,
            password_hash,
            phone: payload.phone,
            address: payload.address,
        },
    )
    .await?;

    let (access_token, refresh_token) = sign_pair(&state, &user)?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        user: user.into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::Validation("Invalid email".into()));
    }

    // Unknown email and wrong password produce the same response, so the
    // endpoint cannot be used to enumerate accounts.
    let user = match User::find_by_email(&state.db, &payload.email).await? {
        Some(u) => u,
        None => {
            warn!(email = %payload.email, "login unknown email");
            // Pay the same hashing cost as a real verification
            verify_against_dummy(payload.password).await;
            return Err(ApiError::Unauthorized("Invalid credentials".into()));
        }
    };

    let ok = verify_password_blocking(payload.password, user.password_hash.clone()).await?;
    if !ok {
        warn!(email = %payload.email, user_id = %user.id, "login invalid password");
        return Err(ApiError::Unauthorized("Invalid credentials".into()));
    }

    let (access_token, refresh_token) = sign_pair(&state, &user)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        user: user.into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| ApiError::Unauthorized(e.to_string()))?;

    // Reload so the new pair carries the current role
    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".into()))?;

    let (access_token, refresh_token) = sign_pair(&state, &user)?;

    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        user: user.into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(mut payload): Json<ForgotPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        return Err(ApiError::Validation("Invalid email".into()));
    }

    let (token, expiry) = issue_reset_token(state.config.reset_token_ttl_minutes);

    // The acknowledgement is identical whether or not the email is registered.
    match User::set_reset_token(&state.db, &payload.email, &token, expiry).await? {
        Some(user) => info!(user_id = %user.id, "reset token issued"),
        None => info!("reset requested for unknown email"),
    }

    Ok(Json(MessageResponse {
        message: "If that email is registered, a reset token has been issued.".into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    if payload.password.len() < 8 {
        return Err(ApiError::Validation("Password too short".into()));
    }

    let password_hash = hash_password_blocking(payload.password).await?;

    match User::consume_reset_token(&state.db, &payload.token, &password_hash).await? {
        Some(user) => {
            info!(user_id = %user.id, "password reset consumed");
            Ok(Json(MessageResponse {
                message: "Password has been reset.".into(),
            }))
        }
        None => {
            // Expired pairs are cleared together on detection
            let cleared = User::clear_expired_reset_token(&state.db, &payload.token).await?;
            if cleared > 0 {
                info!("expired reset token cleared");
            }
            Err(ApiError::ResetTokenInvalid)
        }
    }
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<PublicUser>> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".into()))?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, payload))]
pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> ApiResult<Json<PublicUser>> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".into()))?;

    if let Some(name) = &payload.name {
        if name.trim().is_empty() {
            return Err(ApiError::Validation("Name must not be empty".into()));
        }
    }

    // Hash-on-write guard: only a changed password field is rehashed.
    let password_hash = if let Some(submitted) = payload.password {
        if submitted != user.password_hash && submitted.len() < 8 {
            warn!("password too short");
            return Err(ApiError::Validation("Password too short".into()));
        }
        let stored = user.password_hash.clone();
        tokio::task::spawn_blocking(move || rehash_if_changed(&stored, &submitted))
            .await
            .map_err(anyhow::Error::from)??
    } else {
        None
    };

    let updated = User::update_profile(
        &state.db,
        user_id,
        payload.name.as_deref(),
        payload.phone.as_deref(),
        payload.address.as_deref(),
        password_hash.as_deref(),
    )
    .await?
    .ok_or_else(|| ApiError::Unauthorized("User not found".into()))?;

    info!(user_id = %updated.id, "profile updated");
    Ok(Json(updated.into()))
}
