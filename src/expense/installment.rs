//! Splits a single expense submission into its installments.
//!
//! An expense paid in N installments becomes N records dated one calendar
//! month apart. The day of the month is kept, and when the target month is
//! too short the date rolls over into the following month, e.g. 31 January
//! plus one month is 3 March (2 March in a leap year).

use serde::{Deserialize, Serialize};
use time::{Date, Duration, Month};
use uuid::Uuid;

use crate::{
    Error,
    category::CategoryId,
    expense::{
        ExpenseForm,
        domain::{Amount, Description, PaymentMethod, ReimbursementStatus},
    },
    person::PersonId,
};

/// The most installments an expense can be split into.
pub const MAX_INSTALLMENTS: u8 = 48;

/// The number of installments in a plan, from 1 to [MAX_INSTALLMENTS].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallmentCount(u8);

impl InstallmentCount {
    /// # Errors
    ///
    /// Returns [Error::InvalidInstallmentCount] if `count` is zero or more than [MAX_INSTALLMENTS].
    pub fn new(count: u32) -> Result<Self, Error> {
        match u8::try_from(count) {
            Ok(count @ 1..=MAX_INSTALLMENTS) => Ok(Self(count)),
            _ => Err(Error::InvalidInstallmentCount(count)),
        }
    }

    pub fn get(&self) -> u8 {
        self.0
    }
}

/// How the total of an installment plan is divided between installments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemainderPolicy {
    /// Every installment gets the total divided by the count, without rounding.
    #[default]
    Even,
    /// Every installment gets the total divided by the count rounded down to
    /// whole cents, and the first installment also gets the cents left over.
    First,
}

/// A validated expense submission, before it is split into installments.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseSubmission {
    pub person_id: PersonId,
    pub category_id: CategoryId,
    pub description: Description,
    pub amount: Amount,
    pub date: Date,
    pub payment_method: PaymentMethod,
    pub reimbursement_status: ReimbursementStatus,
    pub installments: InstallmentCount,
    pub submission_id: Option<Uuid>,
}

impl ExpenseSubmission {
    /// Validate the fields of `form`.
    ///
    /// # Errors
    ///
    /// Returns an error if the description, amount or installment count is invalid.
    pub fn new(form: ExpenseForm) -> Result<Self, Error> {
        Ok(Self {
            person_id: form.person_id,
            category_id: form.category_id,
            description: Description::new(&form.description)?,
            amount: Amount::new(form.amount)?,
            date: form.date,
            payment_method: form.payment_method,
            reimbursement_status: form.reimbursement_status,
            installments: InstallmentCount::new(form.installments)?,
            submission_id: form.submission_id,
        })
    }
}

/// One record produced by [expand_installments], ready to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    pub person_id: PersonId,
    pub category_id: CategoryId,
    pub description: String,
    pub amount: f64,
    pub date: Date,
    pub payment_method: PaymentMethod,
    pub reimbursement_status: ReimbursementStatus,
    pub installment_count: u8,
}

/// Add `months` calendar months to `date`, rolling over into the next month
/// when the day does not exist in the target month.
///
/// Returns `None` if the result is outside the supported date range.
pub fn add_months(date: Date, months: u32) -> Option<Date> {
    let month_index = i64::from(date.month() as u8 - 1) + i64::from(months);
    let year = i64::from(date.year()) + month_index.div_euclid(12);
    let month = Month::try_from((month_index.rem_euclid(12) + 1) as u8).ok()?;

    let first_of_month = Date::from_calendar_date(i32::try_from(year).ok()?, month, 1).ok()?;

    first_of_month.checked_add(Duration::days(i64::from(date.day()) - 1))
}

/// Divide `total` into `count` installment amounts according to `policy`.
///
/// `total` is expected to be a valid [Amount], so its value in cents fits in
/// an `i64`.
pub fn split_amount(total: f64, count: u8, policy: RemainderPolicy) -> Vec<f64> {
    let count_usize = usize::from(count);

    match policy {
        RemainderPolicy::Even => vec![total / f64::from(count); count_usize],
        RemainderPolicy::First => {
            let total_cents = (total * 100.0).round() as i64;
            let base_cents = total_cents.div_euclid(i64::from(count));
            let remainder_cents = total_cents - base_cents * i64::from(count);

            let mut amounts = vec![base_cents as f64 / 100.0; count_usize];
            if let Some(first) = amounts.first_mut() {
                *first = (base_cents + remainder_cents) as f64 / 100.0;
            }
            amounts
        }
    }
}

/// Expand a submission into one record per installment.
///
/// A single installment produces one record with the description and amount
/// as submitted. Otherwise installment `i` (counting from zero) is dated `i`
/// months after the submitted date and its description gets a
/// " (i+1/N)" suffix.
///
/// # Errors
///
/// Returns [Error::DateOutOfRange] if an installment would fall outside the
/// supported date range.
pub fn expand_installments(
    submission: &ExpenseSubmission,
    policy: RemainderPolicy,
) -> Result<Vec<NewExpense>, Error> {
    let count = submission.installments.get();
    let description = submission.description.as_ref();

    if count == 1 {
        return Ok(vec![NewExpense {
            person_id: submission.person_id,
            category_id: submission.category_id,
            description: description.to_owned(),
            amount: submission.amount.as_f64(),
            date: submission.date,
            payment_method: submission.payment_method,
            reimbursement_status: submission.reimbursement_status,
            installment_count: 1,
        }]);
    }

    split_amount(submission.amount.as_f64(), count, policy)
        .into_iter()
        .zip(0..u32::from(count))
        .map(|(amount, index)| {
            let date = add_months(submission.date, index).ok_or(Error::DateOutOfRange)?;

            Ok(NewExpense {
                person_id: submission.person_id,
                category_id: submission.category_id,
                description: format!("{description} ({}/{count})", index + 1),
                amount,
                date,
                payment_method: submission.payment_method,
                reimbursement_status: submission.reimbursement_status,
                installment_count: count,
            })
        })
        .collect()
}
