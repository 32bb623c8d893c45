use std::{fmt::Display, str::FromStr};

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::{Error, auth::UserID, category::CategoryId, person::PersonId};

/// The database ID of an expense.
pub type ExpenseId = i64;

/// How an expense was paid for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard,
    DebitCard,
    Pix,
    Cash,
    Other,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::DebitCard => "debit_card",
            PaymentMethod::Pix => "pix",
            PaymentMethod::Cash => "cash",
            PaymentMethod::Other => "other",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "credit_card" => Ok(PaymentMethod::CreditCard),
            "debit_card" => Ok(PaymentMethod::DebitCard),
            "pix" => Ok(PaymentMethod::Pix),
            "cash" => Ok(PaymentMethod::Cash),
            "other" => Ok(PaymentMethod::Other),
            _ => Err(format!("unknown payment method \"{s}\"")),
        }
    }
}

/// Whether someone still owes the user for an expense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReimbursementStatus {
    Pending,
    Reimbursed,
    NotApplicable,
}

impl ReimbursementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReimbursementStatus::Pending => "pending",
            ReimbursementStatus::Reimbursed => "reimbursed",
            ReimbursementStatus::NotApplicable => "not_applicable",
        }
    }
}

impl FromStr for ReimbursementStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReimbursementStatus::Pending),
            "reimbursed" => Ok(ReimbursementStatus::Reimbursed),
            "not_applicable" => Ok(ReimbursementStatus::NotApplicable),
            _ => Err(format!("unknown reimbursement status \"{s}\"")),
        }
    }
}

macro_rules! impl_text_sql {
    ($type:ty) => {
        impl ToSql for $type {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $type {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|error: String| FromSqlError::Other(error.into()))
            }
        }

        impl Display for $type {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

impl_text_sql!(PaymentMethod);
impl_text_sql!(ReimbursementStatus);

/// The description of an expense, 3 to 100 characters with surrounding whitespace removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Description(String);

impl Description {
    /// # Errors
    ///
    /// Returns [Error::InvalidDescription] if the trimmed text is not 3 to 100 characters long.
    pub fn new(raw_description: &str) -> Result<Self, Error> {
        let trimmed = raw_description.trim();

        match trimmed.chars().count() {
            3..=100 => Ok(Self(trimmed.to_owned())),
            _ => Err(Error::InvalidDescription),
        }
    }
}

impl AsRef<str> for Description {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A positive amount of money no larger than [Amount::MAX].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Amount(f64);

impl Amount {
    /// The largest accepted amount. Its value in cents fits exactly in both
    /// an `f64` and an `i64`.
    pub const MAX: f64 = 1_000_000_000_000.0;

    /// # Errors
    ///
    /// Returns [Error::InvalidAmount] if `value` is not greater than zero or
    /// is greater than [Amount::MAX].
    pub fn new(value: f64) -> Result<Self, Error> {
        if value > 0.0 && value <= Self::MAX {
            Ok(Self(value))
        } else {
            Err(Error::InvalidAmount(value))
        }
    }

    pub fn as_f64(&self) -> f64 {
        self.0
    }
}

/// A stored expense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,
    pub user_id: UserID,
    pub person_id: PersonId,
    pub category_id: CategoryId,
    pub description: String,
    pub amount: f64,
    pub date: Date,
    pub payment_method: PaymentMethod,
    pub reimbursement_status: ReimbursementStatus,
    /// The number of installments in the plan this expense belongs to, 1 for
    /// a one-off expense.
    pub installment_count: u8,
    pub submission_id: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// An expense joined with the names of its person and category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseWithRelations {
    #[serde(flatten)]
    pub expense: Expense,
    pub person_name: String,
    pub category_name: String,
    pub category_icon: String,
}

/// The data submitted to record an expense.
///
/// `installments` defaults to 1. Clients may set `submission_id` to a
/// freshly generated UUID so that retrying the same submission does not
/// record the expense twice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseForm {
    pub person_id: PersonId,
    pub category_id: CategoryId,
    pub description: String,
    pub amount: f64,
    pub date: Date,
    pub payment_method: PaymentMethod,
    pub reimbursement_status: ReimbursementStatus,
    #[serde(default = "default_installments")]
    pub installments: u32,
    #[serde(default)]
    pub submission_id: Option<Uuid>,
}

fn default_installments() -> u32 {
    1
}

/// The data submitted to edit a stored expense.
///
/// `amount` and `date` may be omitted to keep the stored values. They cannot
/// be changed for an expense that is part of an installment plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseUpdateForm {
    pub person_id: PersonId,
    pub category_id: CategoryId,
    pub description: String,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub date: Option<Date>,
    pub payment_method: PaymentMethod,
    pub reimbursement_status: ReimbursementStatus,
}

/// Validated changes to a stored expense.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseUpdate {
    pub person_id: PersonId,
    pub category_id: CategoryId,
    pub description: Description,
    pub amount: Option<Amount>,
    pub date: Option<Date>,
    pub payment_method: PaymentMethod,
    pub reimbursement_status: ReimbursementStatus,
}

impl ExpenseUpdate {
    /// # Errors
    ///
    /// Returns an error if the description or amount is invalid.
    pub fn new(form: ExpenseUpdateForm) -> Result<Self, Error> {
        Ok(Self {
            person_id: form.person_id,
            category_id: form.category_id,
            description: Description::new(&form.description)?,
            amount: form.amount.map(Amount::new).transpose()?,
            date: form.date,
            payment_method: form.payment_method,
            reimbursement_status: form.reimbursement_status,
        })
    }

    /// Check that the update does not change a locked installment field of `expense`.
    ///
    /// # Errors
    ///
    /// Returns [Error::InstallmentFieldLocked] if `expense` is part of an
    /// installment plan and the update changes its amount or date.
    pub fn check_installment_lock(&self, expense: &Expense) -> Result<(), Error> {
        if expense.installment_count <= 1 {
            return Ok(());
        }

        let changes_amount = self
            .amount
            .is_some_and(|amount| amount.as_f64() != expense.amount);
        let changes_date = self.date.is_some_and(|date| date != expense.date);

        if changes_amount || changes_date {
            return Err(Error::InstallmentFieldLocked);
        }

        Ok(())
    }
}
