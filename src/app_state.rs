//! Implements a struct that holds the state of the REST server.

use std::sync::{Arc, Mutex};

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use rusqlite::Connection;
use sha2::{Digest, Sha512};
use time::Duration;

use crate::{
    Error,
    auth::DEFAULT_COOKIE_DURATION,
    cache::{Collection, CollectionCache},
    category::Category,
    db::initialize,
    expense::RemainderPolicy,
    pagination::PaginationConfig,
    person::Person,
};

/// The state of the REST server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,

    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,

    /// The local timezone as a canonical timezone name, e.g. "America/Sao_Paulo".
    pub local_timezone: String,

    /// The config that controls how to split results into pages.
    pub pagination_config: PaginationConfig,

    /// How the total of an installment plan is divided between installments.
    pub installment_rounding: RemainderPolicy,

    /// The database connection
    pub db_connection: Arc<Mutex<Connection>>,

    /// The people visible to each user.
    pub person_cache: CollectionCache<Person>,

    /// The categories visible to each user.
    pub category_cache: CollectionCache<Category>,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for the domain models.
    /// `local_timezone` should be a valid, canonical timezone name, e.g. "America/Sao_Paulo".
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(
        db_connection: Connection,
        cookie_secret: &str,
        local_timezone: &str,
        pagination_config: PaginationConfig,
    ) -> Result<Self, Error> {
        initialize(&db_connection)?;

        let connection = Arc::new(Mutex::new(db_connection));

        Ok(Self {
            cookie_key: create_cookie_key(cookie_secret),
            cookie_duration: DEFAULT_COOKIE_DURATION,
            local_timezone: local_timezone.to_owned(),
            pagination_config,
            installment_rounding: RemainderPolicy::default(),
            db_connection: connection,
            person_cache: CollectionCache::new(Collection::People),
            category_cache: CollectionCache::new(Collection::Categories),
        })
    }

    /// Use `policy` to split installment plans.
    pub fn with_installment_rounding(mut self, policy: RemainderPolicy) -> Self {
        self.installment_rounding = policy;
        self
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

/// Create a signing key for cookies from a `secret`s string.
pub fn create_cookie_key(secret: &str) -> Key {
    let hash = Sha512::digest(secret);

    Key::from(&hash)
}
