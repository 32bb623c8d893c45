//! The session carried in the auth cookie and the endpoint that describes it.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    auth::{UserID, UserProfile, get_user_by_id},
    db::lock_connection,
};

/// The authenticated user a request is made on behalf of.
///
/// A session is stored as JSON in the private auth cookie, with the expiry
/// as a unix timestamp. [auth_guard](crate::auth::auth_guard) reads it back
/// and passes it to protected handlers as a request extension.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: UserID,
    #[serde(with = "time::serde::timestamp")]
    pub expires_at: OffsetDateTime,
}

impl Session {
    /// A session for `user_id` that lasts `duration` from now.
    ///
    /// # Errors
    ///
    /// Returns [Error::CookieError] if the expiry overflows.
    pub fn starting_now(user_id: UserID, duration: time::Duration) -> Result<Self, Error> {
        let expires_at = OffsetDateTime::now_utc()
            .checked_add(duration)
            .ok_or_else(|| Error::CookieError("session expiry overflowed".to_owned()))?;

        Ok(Self {
            user_id,
            expires_at,
        })
    }

    /// Whether the session has run out at `now`.
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires_at <= now
    }
}

/// The state needed to look up the session's user.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for SessionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Return the profile of the logged in user.
///
/// A session for a user that has since been removed is treated as logged out.
pub async fn get_session(
    State(state): State<SessionState>,
    Extension(session): Extension<Session>,
) -> Result<Json<UserProfile>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    match get_user_by_id(session.user_id, &connection) {
        Ok(user) => Ok(Json(user.into())),
        Err(Error::NotFound) => Err(Error::Unauthenticated),
        Err(error) => Err(error),
    }
}
