//! Fynli is a web app for tracking personal and shared expenses.
//!
//! This library provides a JSON API for recording expenses (including
//! installment plans), managing the people and categories they are assigned
//! to and reading aggregated dashboard summaries.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde::Serialize;
use tokio::signal;

mod app_state;
mod auth;
mod cache;
mod category;
mod dashboard;
mod db;
mod endpoints;
mod expense;
mod logging;
mod pagination;
mod person;
mod routing;
mod timezone;

#[cfg(test)]
mod test_utils;

pub use app_state::AppState;
pub use auth::{
    Email, PasswordHash, User, UserID, ValidatedPassword, create_user, get_user_by_email,
    update_password,
};
pub use category::{CategoryIcon, CategoryName, create_category};
pub use db::initialize as initialize_db;
pub use expense::{
    ExpenseForm, ExpenseSubmission, InstallmentCount, NewExpense, PaymentMethod,
    ReimbursementStatus, RemainderPolicy, create_expenses, expand_installments,
};
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use pagination::PaginationConfig;
pub use person::{Color, PersonName, create_person};
pub use routing::build_router;
pub use timezone::get_local_offset;

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The description of an expense is too short or too long after trimming.
    #[error("description must be between 3 and 100 characters")]
    InvalidDescription,

    /// The amount of an expense is not positive or is too large.
    #[error("amount must be a positive number no greater than 1000000000000, got {0}")]
    InvalidAmount(f64),

    /// The number of installments is outside of the supported range.
    #[error("installments must be between 1 and 48, got {0}")]
    InvalidInstallmentCount(u32),

    /// A person or category name is too short or too long after trimming.
    #[error("name must be between 2 and 50 characters")]
    InvalidName,

    /// A person color is not a hex color code such as "#2563EB".
    #[error("\"{0}\" is not a valid hex color, expected a value like #2563EB")]
    InvalidColor(String),

    /// A category icon is not one of the supported icon names.
    #[error("\"{0}\" is not a supported icon")]
    InvalidIcon(String),

    /// The user provided an email address that could not be parsed.
    #[error("\"{0}\" is not a valid email address")]
    InvalidEmail(String),

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// The password and its confirmation do not match.
    #[error("passwords do not match")]
    PasswordMismatch,

    /// A display name is too short or too long after trimming.
    #[error("display name must be between 2 and 50 characters")]
    InvalidDisplayName,

    /// The dashboard period has a month outside of 0 to 12 or an unsupported year.
    #[error("invalid period {year}-{month}, month must be 0 (whole year) or 1 to 12")]
    InvalidPeriod {
        /// The requested year.
        year: i32,
        /// The requested month, where zero means the whole year.
        month: u8,
    },

    /// An installment would be dated outside the range of supported dates.
    #[error("installment date is out of range")]
    DateOutOfRange,

    /// The person ID used for an expense does not refer to a person visible to the user.
    #[error("the person ID does not refer to a valid person")]
    InvalidPerson(i64),

    /// The category ID used for an expense does not refer to a category visible to the user.
    #[error("the category ID does not refer to a valid category")]
    InvalidCategory(i64),

    /// Tried to update or delete a row that is shared with every user.
    #[error("global rows are read-only")]
    GlobalRowReadOnly,

    /// Tried to change the amount or date of an expense that is part of an
    /// installment plan.
    #[error("the amount and date of an installment are locked")]
    InstallmentFieldLocked,

    /// Tried to delete a person or category that is still used by expenses.
    #[error("the row is still referenced by one or more expenses")]
    ReferencedRow,

    /// The email address is already used by a registered user.
    #[error("the email address is already registered")]
    DuplicateEmail,

    /// An expense submission with the same token was already stored.
    ///
    /// Callers should fetch and return the stored expenses instead of
    /// inserting them again.
    #[error("the submission has already been stored")]
    DuplicateSubmission,

    /// The user provided an invalid combination of email and password.
    #[error("incorrect email or password")]
    InvalidCredentials,

    /// The request does not carry a valid session cookie.
    #[error("you must be logged in to do that")]
    Unauthenticated,

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// Could not acquire the database lock.
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// Could not acquire the lock for a collection cache.
    #[error("could not acquire the cache lock")]
    CacheLockError,

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// The auth cookie could not be created or read.
    #[error("cookie error: {0}")]
    CookieError(String),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.ends_with("user.email") =>
            {
                Error::DuplicateEmail
            }
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067
                    && desc.contains("expense_submission.submission_id") =>
            {
                Error::DuplicateSubmission
            }
            // Code 787 occurs when a FOREIGN KEY constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, _) if sql_error.extended_code == 787 => {
                Error::ReferencedRow
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidDescription
            | Error::InvalidAmount(_)
            | Error::InvalidInstallmentCount(_)
            | Error::InvalidName
            | Error::InvalidColor(_)
            | Error::InvalidIcon(_)
            | Error::InvalidEmail(_)
            | Error::TooWeak(_)
            | Error::PasswordMismatch
            | Error::InvalidDisplayName
            | Error::InvalidPeriod { .. }
            | Error::DateOutOfRange
            | Error::InvalidPerson(_)
            | Error::InvalidCategory(_)
            | Error::InstallmentFieldLocked => StatusCode::BAD_REQUEST,
            Error::InvalidCredentials | Error::Unauthenticated => StatusCode::UNAUTHORIZED,
            Error::GlobalRowReadOnly => StatusCode::FORBIDDEN,
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::ReferencedRow | Error::DuplicateEmail | Error::DuplicateSubmission => {
                StatusCode::CONFLICT
            }
            Error::SqlError(_)
            | Error::HashingError(_)
            | Error::DatabaseLockError
            | Error::CacheLockError
            | Error::InvalidTimezoneError(_)
            | Error::CookieError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status_code = self.status_code();

        let message = if status_code == StatusCode::INTERNAL_SERVER_ERROR {
            // Internal errors are not intended to be shown to the client.
            tracing::error!("An unexpected error occurred: {}", self);
            "An unexpected error occurred, check the server logs for more details.".to_owned()
        } else {
            self.to_string()
        };

        (status_code, Json(ErrorBody { error: message })).into_response()
    }
}

#[cfg(test)]
mod error_tests {
    use axum::{http::StatusCode, response::IntoResponse};

    use crate::Error;

    #[test]
    fn unique_email_violation_maps_to_duplicate_email() {
        let connection = rusqlite::Connection::open_in_memory().unwrap();
        connection
            .execute("CREATE TABLE user (email TEXT UNIQUE)", ())
            .unwrap();
        connection
            .execute("INSERT INTO user (email) VALUES ('a@example.com')", ())
            .unwrap();

        let error: Error = connection
            .execute("INSERT INTO user (email) VALUES ('a@example.com')", ())
            .unwrap_err()
            .into();

        assert_eq!(error, Error::DuplicateEmail);
    }

    #[test]
    fn no_rows_maps_to_not_found() {
        let error: Error = rusqlite::Error::QueryReturnedNoRows.into();

        assert_eq!(error, Error::NotFound);
    }

    #[test]
    fn status_codes() {
        let cases = [
            (Error::InvalidDescription, StatusCode::BAD_REQUEST),
            (Error::InstallmentFieldLocked, StatusCode::BAD_REQUEST),
            (Error::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (Error::GlobalRowReadOnly, StatusCode::FORBIDDEN),
            (Error::NotFound, StatusCode::NOT_FOUND),
            (Error::DuplicateEmail, StatusCode::CONFLICT),
            (Error::ReferencedRow, StatusCode::CONFLICT),
            (Error::DatabaseLockError, StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, want) in cases {
            let response = error.into_response();

            assert_eq!(response.status(), want);
        }
    }
}
