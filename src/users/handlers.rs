use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    routing::{get, patch, post, put},
    Json, Router,
};
use time::OffsetDateTime;
use tower_cookies::Cookies;
use tracing::{error, info, instrument, warn};

use super::{
    dto::{
        filled, AuthResponse, ChangePasswordRequest, ForgotPasswordRequest, LoginRequest,
        RegisterRequest, ResetPasswordRequest, UpdateProfileRequest,
    },
    repo_types::{NewUser, PublicUser},
    reset,
    services::{check_password_length, is_valid_email, merge_profile},
};
use crate::{
    auth::{
        cookies::{clear_session_cookie, session_token, set_session_cookie},
        password::{hash_password, verify_password},
        AuthUser, JwtKeys,
    },
    dto::MessageResponse,
    error::{AppError, AppResult},
    extract::JsonBody,
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(register))
        .route("/users/login", post(login))
        .route("/users/logout", get(logout))
        .route("/users/profile", get(get_profile))
        .route("/users/loggedin", get(login_status))
        .route("/users/update", patch(update_profile))
        .route("/users/changepassword", patch(change_password))
        .route("/users/forgotpassword", post(forgot_password))
        .route("/users/resetpassword/:reset_token", put(reset_password))
}

#[instrument(skip(state, cookies, payload))]
pub async fn register(
    State(state): State<AppState>,
    cookies: Cookies,
    JsonBody(payload): JsonBody<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let (Some(name), Some(email), Some(password)) = (
        filled(&payload.name),
        filled(&payload.email),
        payload.password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::validation("Please fill in all required fields"));
    };
    let email = email.trim();

    check_password_length(password)?;

    if !is_valid_email(email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::validation("Please enter a valid email"));
    }

    if state.users.find_by_email(email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::Conflict("User already exists".into()));
    }

    if payload.confirm_password.as_deref() != Some(password) {
        return Err(AppError::validation("Passwords don't match"));
    }

    let password_hash = hash_password(password)?;
    let user = state
        .users
        .create(NewUser {
            email: email.to_string(),
            name: name.trim().to_string(),
            password_hash,
            phone: filled(&payload.phone).map(str::to_string),
            bio: filled(&payload.bio).map(str::to_string),
        })
        .await?
        .ok_or_else(|| AppError::Conflict("User already exists".into()))?;

    let token = JwtKeys::from_ref(&state).sign(user.id)?;
    set_session_cookie(&cookies, &token);

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: user.into(),
            token,
        }),
    ))
}

#[instrument(skip(state, cookies, payload))]
pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let (Some(email), Some(password)) = (
        filled(&payload.email),
        payload.password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::validation("Please add email and password"));
    };
    let email = email.trim();

    let user = state
        .users
        .find_by_email(email)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    let password_ok = verify_password(password, &user.password_hash)?;

    // Legacy behaviour: the cookie goes out before the credentials are judged.
    let token = if password_ok || state.config.legacy_login_cookie {
        let token = JwtKeys::from_ref(&state).sign(user.id)?;
        set_session_cookie(&cookies, &token);
        Some(token)
    } else {
        None
    };

    match token {
        Some(token) if password_ok => {
            info!(user_id = %user.id, email = %user.email, "user logged in");
            Ok(Json(AuthResponse {
                user: user.into(),
                token,
            }))
        }
        _ => {
            warn!(user_id = %user.id, "login invalid password");
            Err(AppError::validation("Invalid user credentials"))
        }
    }
}

#[instrument(skip(cookies))]
pub async fn logout(cookies: Cookies) -> Json<MessageResponse> {
    clear_session_cookie(&cookies);
    Json(MessageResponse::new("Successfully logged out"))
}

#[instrument(skip(auth), fields(user_id = %auth.id))]
pub async fn get_profile(auth: AuthUser) -> AppResult<Json<PublicUser>> {
    Ok(Json(auth.require_user()?.clone()))
}

#[instrument(skip(state, cookies))]
pub async fn login_status(State(state): State<AppState>, cookies: Cookies) -> Json<bool> {
    let Some(token) = session_token(&cookies) else {
        return Json(false);
    };
    Json(JwtKeys::from_ref(&state).verify(&token).is_ok())
}

#[instrument(skip(state, auth, payload), fields(user_id = %auth.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    JsonBody(payload): JsonBody<UpdateProfileRequest>,
) -> AppResult<Json<PublicUser>> {
    let user = state
        .users
        .find_by_id(auth.id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    let update = merge_profile(&user, &payload);
    let updated = state
        .users
        .update_profile(user.id, update)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    info!("profile updated");
    Ok(Json(updated.into()))
}

#[instrument(skip(state, auth, payload), fields(user_id = %auth.id))]
pub async fn change_password(
    State(state): State<AppState>,
    auth: AuthUser,
    JsonBody(payload): JsonBody<ChangePasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    let user = state
        .users
        .find_by_id(auth.id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    let (Some(old_password), Some(password)) = (
        payload.old_password.as_deref().filter(|p| !p.is_empty()),
        payload.password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::validation(
            "Please fill in old password and new password",
        ));
    };

    if payload.confirm_password.as_deref() != Some(password) {
        return Err(AppError::validation("Passwords don't match"));
    }
    check_password_length(password)?;

    if !verify_password(old_password, &user.password_hash)? {
        warn!("old password mismatch");
        return Err(AppError::auth("Old password is incorrect"));
    }

    let hash = hash_password(password)?;
    if !state.users.update_password(user.id, &hash).await? {
        return Err(AppError::not_found("User not found"));
    }

    info!("password changed");
    Ok(Json(MessageResponse::new("Password changed successfully")))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<ForgotPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    let email = filled(&payload.email)
        .map(str::trim)
        .ok_or_else(|| AppError::validation("Please enter an email"))?;

    let user = state
        .users
        .find_by_email(email)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    let removed = state.reset_tokens.delete_for_user(user.id).await?;
    if removed > 0 {
        info!(user_id = %user.id, removed, "previous reset token discarded");
    }

    let secret = reset::generate_secret(user.id);
    let token = reset::new_token(user.id, &secret, OffsetDateTime::now_utc());
    state.reset_tokens.insert(&token).await?;

    let url = reset::reset_url(&state.config.frontend_url, &secret);
    let email = reset::reset_email(&user, &url, &state.config.mail_from);

    state.mailer.send(email).await.map_err(|e| {
        error!(error = ?e, user_id = %user.id, "reset email failed");
        AppError::Email("Email not sent, please try again".into())
    })?;

    info!(user_id = %user.id, "reset email sent");
    Ok(Json(MessageResponse::success("Reset Email Sent")))
}

#[instrument(skip_all)]
pub async fn reset_password(
    State(state): State<AppState>,
    Path(reset_token): Path<String>,
    JsonBody(payload): JsonBody<ResetPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    let token = state
        .reset_tokens
        .find_live(&reset::digest(&reset_token), OffsetDateTime::now_utc())
        .await?
        .ok_or_else(|| AppError::Token("Token invalid or expired".into()))?;

    let password = payload
        .password
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::validation("Please enter a new password"))?;
    check_password_length(password)?;

    let hash = hash_password(password)?;
    if !state.users.update_password(token.user_id, &hash).await? {
        return Err(AppError::not_found("User not found"));
    }
    state.reset_tokens.delete_for_user(token.user_id).await?;

    info!(user_id = %token.user_id, "password reset");
    Ok(Json(MessageResponse::new("Password Reset Successfully")))
}
