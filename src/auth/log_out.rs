//! Ends the current session.

use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};

use crate::{
    AppState,
    auth::{get_session_from_cookies, invalidate_auth_cookie},
    cache::CollectionCache,
    category::Category,
    person::Person,
};

/// The state needed to tear down a session.
#[derive(Debug, Clone)]
pub struct LogOutState {
    pub cookie_key: Key,
    pub person_cache: CollectionCache<Person>,
    pub category_cache: CollectionCache<Category>,
}

impl FromRef<AppState> for LogOutState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            person_cache: state.person_cache.clone(),
            category_cache: state.category_cache.clone(),
        }
    }
}

impl FromRef<LogOutState> for Key {
    fn from_ref(state: &LogOutState) -> Self {
        state.cookie_key.clone()
    }
}

/// Invalidate the auth cookie and drop the user's cached reference data.
///
/// Logging out without a valid session is not an error.
pub async fn post_log_out(State(state): State<LogOutState>, jar: PrivateCookieJar) -> Response {
    if let Ok(session) = get_session_from_cookies(&jar) {
        tracing::info!("User {} logged out", session.user_id);

        for result in [
            state.person_cache.invalidate(session.user_id),
            state.category_cache.invalidate(session.user_id),
        ] {
            if let Err(error) = result {
                tracing::warn!("Could not clear cache on log out: {error}");
            }
        }
    }

    (StatusCode::NO_CONTENT, invalidate_auth_cookie(jar)).into_response()
}
