//! Database operations for expenses.

use rusqlite::{Connection, Row, named_params};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::{
    Error,
    auth::UserID,
    category::CategoryId,
    expense::{
        Expense, ExpenseId, ExpenseUpdate, ExpenseWithRelations, NewExpense,
    },
    pagination::Page,
    person::PersonId,
};

/// Initialize the expense tables and indexes.
///
/// `expense_submission` records the submission tokens that have been used so
/// that a retried submission is only stored once.
pub fn create_expense_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS expense (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            person_id INTEGER NOT NULL,
            category_id INTEGER NOT NULL,
            description TEXT NOT NULL,
            amount REAL NOT NULL,
            date TEXT NOT NULL,
            payment_method TEXT NOT NULL,
            reimbursement_status TEXT NOT NULL,
            installment_count INTEGER NOT NULL DEFAULT 1,
            submission_id BLOB,
            created_at TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(person_id) REFERENCES person(id) ON UPDATE CASCADE ON DELETE RESTRICT,
            FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE RESTRICT
        );

        CREATE INDEX IF NOT EXISTS idx_expense_user_date ON expense(user_id, date);
        CREATE INDEX IF NOT EXISTS idx_expense_submission ON expense(user_id, submission_id);

        CREATE TABLE IF NOT EXISTS expense_submission (
            user_id INTEGER NOT NULL,
            submission_id BLOB NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE(user_id, submission_id),
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        );",
    )?;

    Ok(())
}

/// Insert all of `expenses` for `owner` in a single transaction.
///
/// Either every expense is stored or none are.
///
/// # Errors
///
/// Returns [Error::DuplicateSubmission] if `submission_id` has already been
/// used by `owner`, in which case nothing is inserted.
pub fn create_expenses(
    owner: UserID,
    submission_id: Option<Uuid>,
    expenses: &[NewExpense],
    connection: &Connection,
) -> Result<Vec<Expense>, Error> {
    let transaction = connection.unchecked_transaction()?;
    let created_at = OffsetDateTime::now_utc();

    if let Some(submission_id) = submission_id {
        transaction.execute(
            "INSERT INTO expense_submission (user_id, submission_id, created_at)
            VALUES (?1, ?2, ?3)",
            (owner.as_i64(), submission_id, created_at),
        )?;
    }

    let mut created = Vec::with_capacity(expenses.len());

    {
        let mut statement = transaction.prepare(
            "INSERT INTO expense (
                user_id, person_id, category_id, description, amount, date,
                payment_method, reimbursement_status, installment_count, submission_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )?;

        for expense in expenses {
            statement.execute((
                owner.as_i64(),
                expense.person_id,
                expense.category_id,
                &expense.description,
                expense.amount,
                expense.date,
                expense.payment_method,
                expense.reimbursement_status,
                expense.installment_count,
                submission_id,
                created_at,
            ))?;

            created.push(Expense {
                id: transaction.last_insert_rowid(),
                user_id: owner,
                person_id: expense.person_id,
                category_id: expense.category_id,
                description: expense.description.clone(),
                amount: expense.amount,
                date: expense.date,
                payment_method: expense.payment_method,
                reimbursement_status: expense.reimbursement_status,
                installment_count: expense.installment_count,
                submission_id,
                created_at,
            });
        }
    }

    transaction.commit()?;

    Ok(created)
}

const SELECT_EXPENSE: &str = "SELECT
        e.id, e.user_id, e.person_id, e.category_id, e.description, e.amount, e.date,
        e.payment_method, e.reimbursement_status, e.installment_count, e.submission_id,
        e.created_at, p.name, c.name, c.icon
    FROM expense e
    INNER JOIN person p ON p.id = e.person_id
    INNER JOIN category c ON c.id = e.category_id";

/// Retrieve the expenses stored for a submission token, in installment order.
pub fn get_expenses_by_submission(
    owner: UserID,
    submission_id: Uuid,
    connection: &Connection,
) -> Result<Vec<Expense>, Error> {
    connection
        .prepare(&format!(
            "{SELECT_EXPENSE} WHERE e.user_id = ?1 AND e.submission_id = ?2 ORDER BY e.id ASC"
        ))?
        .query_map((owner.as_i64(), submission_id), map_row)?
        .map(|maybe_expense| {
            maybe_expense
                .map(|expense| expense.expense)
                .map_err(|error| error.into())
        })
        .collect()
}

/// Retrieve a single expense owned by `owner`.
pub fn get_expense(
    expense_id: ExpenseId,
    owner: UserID,
    connection: &Connection,
) -> Result<ExpenseWithRelations, Error> {
    connection
        .prepare(&format!(
            "{SELECT_EXPENSE} WHERE e.id = ?1 AND e.user_id = ?2"
        ))?
        .query_row((expense_id, owner.as_i64()), map_row)
        .map_err(|error| error.into())
}

/// Filters for [query_expenses]. `None` fields do not filter.
///
/// `from` and `to` are inclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ExpenseFilter {
    pub person_id: Option<PersonId>,
    pub category_id: Option<CategoryId>,
    pub from: Option<Date>,
    pub to: Option<Date>,
}

const FILTER_CLAUSE: &str = "WHERE e.user_id = :user_id
        AND (:person_id IS NULL OR e.person_id = :person_id)
        AND (:category_id IS NULL OR e.category_id = :category_id)
        AND (:from IS NULL OR e.date >= :from)
        AND (:to IS NULL OR e.date <= :to)";

/// Retrieve one page of the expenses of `owner` that match `filter`, newest first.
pub fn query_expenses(
    owner: UserID,
    filter: &ExpenseFilter,
    page: Page,
    connection: &Connection,
) -> Result<Vec<ExpenseWithRelations>, Error> {
    let limit = i64::try_from(page.size).unwrap_or(i64::MAX);
    let offset = i64::try_from(page.offset()).unwrap_or(i64::MAX);

    connection
        .prepare(&format!(
            "{SELECT_EXPENSE} {FILTER_CLAUSE}
            ORDER BY e.date DESC, e.created_at DESC, e.id DESC
            LIMIT :limit OFFSET :offset"
        ))?
        .query_map(
            named_params! {
                ":user_id": owner.as_i64(),
                ":person_id": filter.person_id,
                ":category_id": filter.category_id,
                ":from": filter.from,
                ":to": filter.to,
                ":limit": limit,
                ":offset": offset,
            },
            map_row,
        )?
        .map(|maybe_expense| maybe_expense.map_err(|error| error.into()))
        .collect()
}

/// Count the expenses of `owner` that match `filter`.
pub fn count_expenses(
    owner: UserID,
    filter: &ExpenseFilter,
    connection: &Connection,
) -> Result<u64, Error> {
    connection
        .query_row(
            &format!("SELECT COUNT(e.id) FROM expense e {FILTER_CLAUSE}"),
            named_params! {
                ":user_id": owner.as_i64(),
                ":person_id": filter.person_id,
                ":category_id": filter.category_id,
                ":from": filter.from,
                ":to": filter.to,
            },
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

/// Apply `update` to the expense `expense_id` owned by `owner`.
///
/// Omitted amounts and dates keep their stored values.
///
/// # Errors
///
/// Returns [Error::NotFound] if the expense does not exist or belongs to
/// someone else and [Error::InstallmentFieldLocked] if the update changes the
/// amount or date of an installment.
pub fn update_expense(
    expense_id: ExpenseId,
    owner: UserID,
    update: &ExpenseUpdate,
    connection: &Connection,
) -> Result<(), Error> {
    let existing = get_expense(expense_id, owner, connection)?.expense;
    update.check_installment_lock(&existing)?;

    let amount = update
        .amount
        .map(|amount| amount.as_f64())
        .unwrap_or(existing.amount);
    let date = update.date.unwrap_or(existing.date);

    let rows_affected = connection.execute(
        "UPDATE expense SET
            person_id = ?1, category_id = ?2, description = ?3, amount = ?4, date = ?5,
            payment_method = ?6, reimbursement_status = ?7
        WHERE id = ?8 AND user_id = ?9",
        (
            update.person_id,
            update.category_id,
            update.description.as_ref(),
            amount,
            date,
            update.payment_method,
            update.reimbursement_status,
            expense_id,
            owner.as_i64(),
        ),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Delete a single expense owned by `owner`.
///
/// Other installments of the same plan are left untouched.
pub fn delete_expense(
    expense_id: ExpenseId,
    owner: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM expense WHERE id = ?1 AND user_id = ?2",
        (expense_id, owner.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

fn map_row(row: &Row) -> Result<ExpenseWithRelations, rusqlite::Error> {
    let expense = Expense {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        person_id: row.get(2)?,
        category_id: row.get(3)?,
        description: row.get(4)?,
        amount: row.get(5)?,
        date: row.get(6)?,
        payment_method: row.get(7)?,
        reimbursement_status: row.get(8)?,
        installment_count: row.get(9)?,
        submission_id: row.get(10)?,
        created_at: row.get(11)?,
    };

    Ok(ExpenseWithRelations {
        expense,
        person_name: row.get(12)?,
        category_name: row.get(13)?,
        category_icon: row.get(14)?,
    })
}
