#![allow(missing_docs)]

use std::ops::Deref;

use axum_extra::extract::cookie::Cookie;
use axum_test::TestServer;
use rusqlite::Connection;
use serde_json::json;
use time::macros::date;

use crate::{
    AppState,
    auth::{SESSION_COOKIE, Email, PasswordHash, User, UserID, ValidatedPassword, create_user},
    build_router,
    category::CategoryId,
    db::initialize,
    endpoints,
    expense::{Expense, NewExpense, PaymentMethod, ReimbursementStatus, create_expenses},
    pagination::PaginationConfig,
    person::{Color, Person, PersonId, PersonName},
};

pub(crate) const TEST_EMAIL: &str = "test@example.com";
pub(crate) const TEST_PASSWORD: &str = "Quokka7-Marmalade-Tundra";

/// A bcrypt cost low enough to keep tests fast.
const TEST_HASH_COST: u32 = 4;

#[track_caller]
pub(crate) fn get_test_connection() -> Connection {
    let connection = Connection::open_in_memory().expect("Could not open database in memory.");
    initialize(&connection).expect("Could not initialize database.");
    connection
}

#[track_caller]
pub(crate) fn create_test_user(connection: &Connection) -> User {
    let password = ValidatedPassword::new(TEST_PASSWORD).expect("Test password is too weak.");
    let hash = PasswordHash::new(password, TEST_HASH_COST).expect("Could not hash password.");

    create_user(Email::new_unchecked(TEST_EMAIL), hash, connection)
        .expect("Could not create test user.")
}

/// The IDs of the global "Me" person and the global "Groceries" category.
#[track_caller]
pub(crate) fn get_global_ids(connection: &Connection) -> (PersonId, CategoryId) {
    let person_id = connection
        .query_row(
            "SELECT id FROM person WHERE user_id IS NULL AND name = 'Me'",
            (),
            |row| row.get(0),
        )
        .expect("Could not find global person.");
    let category_id = connection
        .query_row(
            "SELECT id FROM category WHERE user_id IS NULL AND name = 'Groceries'",
            (),
            |row| row.get(0),
        )
        .expect("Could not find global category.");

    (person_id, category_id)
}

/// A test server together with the state behind it.
pub(crate) struct TestApp {
    pub server: TestServer,
    pub state: AppState,
}

impl Deref for TestApp {
    type Target = TestServer;

    fn deref(&self) -> &Self::Target {
        &self.server
    }
}

#[track_caller]
pub(crate) fn get_test_server() -> TestApp {
    let connection = Connection::open_in_memory().expect("Could not open database in memory.");
    let state = AppState::new(connection, "42", "Etc/UTC", PaginationConfig::default())
        .expect("Could not create app state.");
    let server =
        TestServer::try_new(build_router(state.clone())).expect("Could not create test server.");

    TestApp { server, state }
}

#[track_caller]
pub(crate) fn get_test_server_with_user() -> (TestApp, User) {
    let app = get_test_server();
    let user = {
        let connection = app
            .state
            .db_connection
            .lock()
            .expect("Could not acquire database lock.");
        create_test_user(&connection)
    };

    (app, user)
}

/// Start a test server with a registered user and log them in.
pub(crate) async fn get_logged_in_test_server() -> (TestApp, Cookie<'static>, User) {
    let (app, user) = get_test_server_with_user();

    let response = app
        .post(endpoints::LOG_IN)
        .json(&json!({ "email": TEST_EMAIL, "password": TEST_PASSWORD }))
        .await;
    response.assert_status_ok();
    let cookie = response.cookie(SESSION_COOKIE);

    (app, cookie, user)
}

#[track_caller]
pub(crate) fn get_global_person(app: &TestApp) -> Person {
    let connection = app
        .state
        .db_connection
        .lock()
        .expect("Could not acquire database lock.");

    connection
        .query_row(
            "SELECT id, name, color FROM person WHERE user_id IS NULL ORDER BY id LIMIT 1",
            (),
            |row| {
                Ok(Person {
                    id: row.get(0)?,
                    user_id: None,
                    name: PersonName::new_unchecked(&row.get::<_, String>(1)?),
                    color: Color::new_unchecked(&row.get::<_, String>(2)?),
                    is_global: true,
                })
            },
        )
        .expect("Could not find global person.")
}

/// Store a single expense for `person_id`, filed under the global "Groceries" category.
#[track_caller]
pub(crate) fn create_test_expense_for_person(
    app: &TestApp,
    user_id: UserID,
    person_id: PersonId,
) -> Expense {
    let connection = app
        .state
        .db_connection
        .lock()
        .expect("Could not acquire database lock.");
    let (_, category_id) = get_global_ids(&connection);

    let expense = NewExpense {
        person_id,
        category_id,
        description: "Weekly groceries".to_owned(),
        amount: 84.5,
        date: date!(2025 - 01 - 15),
        payment_method: PaymentMethod::DebitCard,
        reimbursement_status: ReimbursementStatus::NotApplicable,
        installment_count: 1,
    };

    create_expenses(user_id, None, &[expense], &connection)
        .expect("Could not create test expense.")
        .remove(0)
}
