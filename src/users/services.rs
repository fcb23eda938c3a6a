use lazy_static::lazy_static;
use regex::Regex;

use super::{
    dto::{filled, UpdateProfileRequest},
    repo_types::{ProfileUpdate, User},
};
use crate::{auth::password::MIN_PASSWORD_LENGTH, error::AppError};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn check_password_length(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters long"
        )));
    }
    Ok(())
}

/// Blank or absent fields keep the stored value. Email is never touched.
pub(crate) fn merge_profile(current: &User, req: &UpdateProfileRequest) -> ProfileUpdate {
    let pick = |new: &Option<String>, old: &Option<String>| {
        filled(new).map(str::to_string).or_else(|| old.clone())
    };
    ProfileUpdate {
        name: filled(&req.name)
            .map(str::to_string)
            .unwrap_or_else(|| current.name.clone()),
        phone: pick(&req.phone, &current.phone),
        bio: pick(&req.bio, &current.bio),
        photo: pick(&req.photo, &current.photo),
    }
}
