use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use tracing::{error, info, instrument};

use crate::{
    auth::AuthUser,
    dto::MessageResponse,
    error::{AppError, AppResult},
    extract::JsonBody,
    mail::OutgoingEmail,
    state::AppState,
    users::dto::filled,
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ContactRequest {
    pub subject: Option<String>,
    pub message: Option<String>,
}

pub fn contact_routes() -> Router<AppState> {
    Router::new().route("/contact", post(contact_us))
}

/// Relays a support message from the caller to the support mailbox.
#[instrument(skip(state, auth, payload), fields(user_id = %auth.id))]
pub async fn contact_us(
    State(state): State<AppState>,
    auth: AuthUser,
    JsonBody(payload): JsonBody<ContactRequest>,
) -> AppResult<Json<MessageResponse>> {
    let user = auth.require_user()?;

    let (Some(subject), Some(message)) = (filled(&payload.subject), filled(&payload.message))
    else {
        return Err(AppError::validation("Subject and message are required"));
    };

    let email = OutgoingEmail {
        subject: subject.to_string(),
        html: message.to_string(),
        to: state.config.support_email.clone(),
        from: state.config.mail_from.clone(),
        reply_to: Some(user.email.clone()),
    };

    state.mailer.send(email).await.map_err(|e| {
        error!(error = ?e, "contact email failed");
        AppError::Email("Email not sent, please try again".into())
    })?;

    info!("contact email sent");
    Ok(Json(MessageResponse::success("Email Sent")))
}
