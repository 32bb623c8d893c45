//! Endpoints for recording, listing, editing and deleting expenses.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    AppState, Error,
    auth::{Session, UserID},
    category::{CategoryId, is_category_visible},
    db::lock_connection,
    expense::{
        Expense, ExpenseForm, ExpenseId, ExpenseSubmission, ExpenseUpdate, ExpenseUpdateForm,
        ExpenseWithRelations, RemainderPolicy,
        db::{
            ExpenseFilter, count_expenses, create_expenses, delete_expense, get_expense,
            get_expenses_by_submission, query_expenses, update_expense,
        },
        expand_installments,
    },
    pagination::PaginationConfig,
    person::{PersonId, is_person_visible},
};

/// The state needed by the expense endpoints.
#[derive(Debug, Clone)]
pub struct ExpenseState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub pagination_config: PaginationConfig,
    pub installment_rounding: RemainderPolicy,
}

impl FromRef<AppState> for ExpenseState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            pagination_config: state.pagination_config.clone(),
            installment_rounding: state.installment_rounding,
        }
    }
}

fn check_references(
    person_id: PersonId,
    category_id: CategoryId,
    owner: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    if !is_person_visible(person_id, owner, connection)? {
        return Err(Error::InvalidPerson(person_id));
    }

    if !is_category_visible(category_id, owner, connection)? {
        return Err(Error::InvalidCategory(category_id));
    }

    Ok(())
}

/// Record an expense, split into one record per installment.
///
/// Responds with 201 and the created records. If the submission carries a
/// `submission_id` that was already used, nothing is inserted and the
/// records from the first submission are returned with 200.
pub async fn create_expense_endpoint(
    State(state): State<ExpenseState>,
    Extension(session): Extension<Session>,
    Json(form): Json<ExpenseForm>,
) -> Result<Response, Error> {
    let submission = ExpenseSubmission::new(form)?;
    let records = expand_installments(&submission, state.installment_rounding)?;

    let connection = lock_connection(&state.db_connection)?;
    check_references(
        submission.person_id,
        submission.category_id,
        session.user_id,
        &connection,
    )?;

    match create_expenses(
        session.user_id,
        submission.submission_id,
        &records,
        &connection,
    ) {
        Ok(expenses) => {
            tracing::info!(
                "User {} recorded {} expense record(s)",
                session.user_id,
                expenses.len()
            );
            Ok((StatusCode::CREATED, Json(expenses)).into_response())
        }
        Err(Error::DuplicateSubmission) => {
            let Some(submission_id) = submission.submission_id else {
                return Err(Error::DuplicateSubmission);
            };
            tracing::debug!("Ignoring repeated submission {submission_id}");
            let expenses = get_expenses_by_submission(session.user_id, submission_id, &connection)?;

            Ok((StatusCode::OK, Json(expenses)).into_response())
        }
        Err(error) => Err(error),
    }
}

/// The query parameters for listing expenses.
#[derive(Debug, Default, Deserialize)]
pub struct ExpenseQuery {
    pub person_id: Option<PersonId>,
    pub category_id: Option<CategoryId>,
    pub from: Option<Date>,
    pub to: Option<Date>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

/// One page of expenses and the total number of matching expenses.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExpensePage {
    pub expenses: Vec<ExpenseWithRelations>,
    pub count: u64,
}

pub async fn list_expenses_endpoint(
    State(state): State<ExpenseState>,
    Extension(session): Extension<Session>,
    Query(query): Query<ExpenseQuery>,
) -> Result<Json<ExpensePage>, Error> {
    let page = state.pagination_config.resolve(query.page, query.per_page);
    let filter = ExpenseFilter {
        person_id: query.person_id,
        category_id: query.category_id,
        from: query.from,
        to: query.to,
    };

    let connection = lock_connection(&state.db_connection)?;
    let expenses = query_expenses(session.user_id, &filter, page, &connection)?;
    let count = count_expenses(session.user_id, &filter, &connection)?;

    Ok(Json(ExpensePage { expenses, count }))
}

pub async fn get_expense_endpoint(
    State(state): State<ExpenseState>,
    Extension(session): Extension<Session>,
    Path(expense_id): Path<ExpenseId>,
) -> Result<Json<ExpenseWithRelations>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_expense(expense_id, session.user_id, &connection).map(Json)
}

/// Edit a stored expense.
///
/// The amount and date of an installment cannot be changed.
pub async fn update_expense_endpoint(
    State(state): State<ExpenseState>,
    Extension(session): Extension<Session>,
    Path(expense_id): Path<ExpenseId>,
    Json(form): Json<ExpenseUpdateForm>,
) -> Result<Json<ExpenseWithRelations>, Error> {
    let update = ExpenseUpdate::new(form)?;

    let connection = lock_connection(&state.db_connection)?;
    check_references(
        update.person_id,
        update.category_id,
        session.user_id,
        &connection,
    )?;
    update_expense(expense_id, session.user_id, &update, &connection)?;

    get_expense(expense_id, session.user_id, &connection).map(Json)
}

pub async fn delete_expense_endpoint(
    State(state): State<ExpenseState>,
    Extension(session): Extension<Session>,
    Path(expense_id): Path<ExpenseId>,
) -> Result<StatusCode, Error> {
    let connection = lock_connection(&state.db_connection)?;
    delete_expense(expense_id, session.user_id, &connection)?;
    tracing::info!("User {} deleted expense {expense_id}", session.user_id);

    Ok(StatusCode::NO_CONTENT)
}
