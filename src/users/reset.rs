//! Password-reset secrets and the reset email.

use rand::RngCore;
use sha2::{Digest, Sha256};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use super::repo_types::{PasswordResetToken, User};
use crate::mail::OutgoingEmail;

pub const RESET_TOKEN_TTL: Duration = Duration::minutes(30);

/// Random hex secret suffixed with the user id. This is the value sent to
/// the user; only its digest is stored.
pub fn generate_secret(user_id: Uuid) -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("{}{}", hex::encode(bytes), user_id.simple())
}

pub fn digest(secret: &str) -> String {
    hex::encode(Sha256::digest(secret.as_bytes()))
}

pub fn new_token(user_id: Uuid, secret: &str, now: OffsetDateTime) -> PasswordResetToken {
    PasswordResetToken {
        user_id,
        token_hash: digest(secret),
        created_at: now,
        expires_at: now + RESET_TOKEN_TTL,
    }
}

pub fn reset_url(frontend_url: &str, secret: &str) -> String {
    format!("{frontend_url}/resetpassword/{secret}")
}

pub fn reset_email(user: &User, reset_url: &str, from: &str) -> OutgoingEmail {
    let html = format!(
        r#"
    <h2>Hello {name}</h2>
    <p>Please use the URL below to reset your password</p>
    <p>This reset link is valid for only 30 minutes.</p>

    <a href="{url}" clicktracking=off>{url}</a>

    <p>Regards...</p>
    <p>Pinvent Team</p>
    "#,
        name = user.name,
        url = reset_url,
    );
    OutgoingEmail {
        subject: "Password Reset Request".into(),
        html,
        to: user.email.clone(),
        from: from.to_string(),
        reply_to: None,
    }
}
