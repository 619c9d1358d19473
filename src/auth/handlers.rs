use axum::{
    extract::{FromRef, State},
    http::header::SET_COOKIE,
    response::{AppendHeaders, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use cookie::{Cookie, SameSite};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            ForgotPasswordRequest, LoginRequest, MessageResponse, PublicUser,
            ResetPasswordRequest, SignupRequest, UserResponse, VerifyEmailRequest,
        },
        error::AuthError,
        repo_types::User,
        services::{
            hash_password, is_valid_email, send_account_email, verify_password, AuthUser,
            SessionKeys,
        },
    },
    mail::EmailKind,
    state::AppState,
};

const MIN_PASSWORD_LEN: usize = 6;

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/signup", post(signup))
        .route("/users/login", post(login))
        .route("/users/logout", post(logout))
        .route("/users/forgot-password", post(forgot_password))
        .route("/users/reset-password", post(reset_password))
        .route("/users/verifyemail", post(verify_email))
        .route("/users/me", get(me))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<Json<UserResponse>, AuthError> {
    if payload.username.trim().is_empty()
        || payload.email.trim().is_empty()
        || payload.password.is_empty()
    {
        warn!("signup with missing fields");
        return Err(AuthError::Validation("All fields are required".into()));
    }

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AuthError::Validation("Invalid email".into()));
    }

    if let Some(existing) =
        User::find_by_email_or_username(&state.db, &payload.email, &payload.username).await?
    {
        if existing.email == payload.email {
            warn!(email = %payload.email, "email already registered");
            return Err(AuthError::EmailTaken);
        }
        warn!(username = %payload.username, "username already taken");
        return Err(AuthError::UsernameTaken);
    }

    let hash = hash_password(&payload.password)?;
    let user = User::create(&state.db, &payload.username, &payload.email, &hash).await?;

    // Account creation and notification are decoupled: a mail outage must
    // never block signup, so the failure is logged and swallowed.
    if let Err(e) = send_account_email(&state, &user, EmailKind::Verify).await {
        warn!(error = %e, user_id = %user.id, "verification email failed");
    }

    info!(user_id = %user.id, email = %user.email, "user created");
    Ok(Json(UserResponse {
        message: "User created successfully".into(),
        success: true,
        user: PublicUser::from(&user),
    }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AuthError> {
    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(AuthError::Validation("Email and password are required".into()));
    }

    let user = match User::find_by_email(&state.db, &payload.email).await? {
        Some(u) => u,
        None => {
            warn!(email = %payload.email, "login unknown email");
            return Err(AuthError::InvalidCredentials);
        }
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AuthError::InvalidCredentials);
    }

    let keys = SessionKeys::from_ref(&state);
    let token = keys.sign(&user)?;

    let cookie = Cookie::build(("token", token))
        .http_only(true)
        .path("/")
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(keys.ttl.as_secs() as i64))
        .build();

    info!(user_id = %user.id, "user logged in");
    Ok((
        AppendHeaders([(SET_COOKIE, cookie.to_string())]),
        Json(UserResponse {
            message: "Login successful".into(),
            success: true,
            user: PublicUser::from(&user),
        }),
    ))
}

#[instrument]
pub async fn logout() -> impl IntoResponse {
    let cookie = Cookie::build(("token", ""))
        .http_only(true)
        .path("/")
        .max_age(time::Duration::ZERO)
        .build();

    (
        AppendHeaders([(SET_COOKIE, cookie.to_string())]),
        Json(MessageResponse::new("Logout successful")),
    )
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, AuthError> {
    if payload.email.trim().is_empty() {
        return Err(AuthError::Validation("Email is required".into()));
    }

    let user = match User::find_by_email(&state.db, &payload.email).await? {
        Some(u) => u,
        None => {
            warn!(email = %payload.email, "reset requested for unknown email");
            return Err(AuthError::AccountNotFound);
        }
    };

    // Unlike signup, a failed send here is a hard error: the caller is
    // waiting on this email to proceed.
    send_account_email(&state, &user, EmailKind::Reset).await?;

    info!(user_id = %user.id, "password reset link sent");
    Ok(Json(MessageResponse::new("Password reset link sent successfully")))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, AuthError> {
    if payload.token.is_empty() || payload.password.is_empty() {
        return Err(AuthError::Validation("Token and password are required".into()));
    }

    // Character count, not byte length: multibyte passwords must measure
    // the same as they do in the front end.
    if payload.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::Validation(
            "Password must be at least 6 characters long".into(),
        ));
    }

    let hash = hash_password(&payload.password)?;

    // Match-token, swap hash, and clear-token happen in one statement, so a
    // consumed or expired token can never be replayed.
    let user = User::consume_reset_token(&state.db, &payload.token, &hash)
        .await?
        .ok_or(AuthError::InvalidToken)?;

    info!(user_id = %user.id, "password reset");
    Ok(Json(MessageResponse::new("Password reset successfully")))
}

#[instrument(skip(state, payload))]
pub async fn verify_email(
    State(state): State<AppState>,
    Json(payload): Json<VerifyEmailRequest>,
) -> Result<Json<MessageResponse>, AuthError> {
    if payload.token.is_empty() {
        return Err(AuthError::InvalidToken);
    }

    let user = User::consume_verify_token(&state.db, &payload.token)
        .await?
        .ok_or(AuthError::InvalidToken)?;

    info!(user_id = %user.id, "email verified");
    Ok(Json(MessageResponse::new("Email verified successfully")))
}

#[instrument(skip(state))]
pub async fn me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<UserResponse>, AuthError> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or(AuthError::InvalidToken)?;

    Ok(Json(UserResponse {
        message: "User found".into(),
        success: true,
        user: PublicUser::from(&user),
    }))
}
