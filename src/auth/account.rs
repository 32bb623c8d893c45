//! Endpoints for a logged in user to change their password and profile.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    auth::{
        DisplayName, PasswordHash, Session, UserProfile, ValidatedPassword, get_user_by_id,
        update_display_name, update_password,
    },
    db::lock_connection,
};

#[derive(Debug, Clone)]
pub struct AccountState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for AccountState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct ChangePasswordForm {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

/// Replace the password of the logged in user.
///
/// The current password must be provided and the new password must pass the
/// same checks as at registration.
pub async fn change_password(
    State(state): State<AccountState>,
    Extension(session): Extension<Session>,
    Json(form): Json<ChangePasswordForm>,
) -> Result<Json<UserProfile>, Error> {
    let user = {
        let connection = lock_connection(&state.db_connection)?;
        get_user_by_id(session.user_id, &connection)?
    };

    let is_current_password_valid = user
        .password_hash
        .verify(&form.current_password)
        .map_err(|error| Error::HashingError(error.to_string()))?;

    if !is_current_password_valid {
        return Err(Error::InvalidCredentials);
    }

    if form.new_password != form.confirm_password {
        return Err(Error::PasswordMismatch);
    }

    let password_hash = PasswordHash::new(
        ValidatedPassword::new(&form.new_password)?,
        PasswordHash::DEFAULT_COST,
    )?;

    let connection = lock_connection(&state.db_connection)?;
    update_password(user.id, &password_hash, &connection)?;
    tracing::info!("User {} changed their password", user.id);

    Ok(Json(user.into()))
}

#[derive(Serialize, Deserialize)]
pub struct ProfileForm {
    pub display_name: String,
}

/// Set the display name of the logged in user.
pub async fn update_profile(
    State(state): State<AccountState>,
    Extension(session): Extension<Session>,
    Json(form): Json<ProfileForm>,
) -> Result<Json<UserProfile>, Error> {
    let display_name = DisplayName::new(&form.display_name)?;

    let connection = lock_connection(&state.db_connection)?;
    update_display_name(session.user_id, &display_name, &connection)?;
    let user = get_user_by_id(session.user_id, &connection)?;

    Ok(Json(user.into()))
}
