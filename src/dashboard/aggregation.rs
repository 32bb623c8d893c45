//! Expense totals for the dashboard.
//!
//! Everything here only sums stored expense records. Installment plans have
//! already been expanded into one record per month when they were recorded,
//! so each installment counts towards the month it is dated in.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use time::{Date, Month};

use crate::{
    Error,
    auth::UserID,
    dashboard::period::Period,
    expense::{ExpenseFilter, ExpenseWithRelations, query_expenses},
    pagination::Page,
};

/// How many expenses [get_recent_expenses] returns.
pub const RECENT_EXPENSES_LIMIT: u64 = 5;

/// Headline numbers for a period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_in_period: f64,
    pub total_all_time: f64,
    /// The person with the highest total in the period, ties broken by name.
    pub top_person_name: Option<String>,
    pub top_person_amount: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyTotal {
    /// 1 to 12.
    pub month: u8,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonTotal {
    pub name: String,
    pub total: f64,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub name: String,
    pub total: f64,
}

/// The data behind the dashboard charts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    /// One entry per month of the period's year, months without expenses have a total of zero.
    pub monthly_expenses: Vec<MonthlyTotal>,
    /// Totals per person in the period, largest first.
    pub profile_distribution: Vec<PersonTotal>,
    /// Totals per category in the selected month, empty when the whole year is selected.
    pub category_distribution_for_month: Vec<CategoryTotal>,
}

/// A year that has expenses and the months of that year that have expenses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOption {
    pub year: i32,
    pub months: Vec<u8>,
}

fn sum_between(
    owner: UserID,
    start: Date,
    end: Date,
    connection: &Connection,
) -> Result<f64, Error> {
    connection
        .query_row(
            "SELECT COALESCE(SUM(amount), 0.0) FROM expense
            WHERE user_id = ?1 AND date BETWEEN ?2 AND ?3",
            (owner.as_i64(), start, end),
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

/// Summarise the expenses of `owner` in `period`.
pub fn get_dashboard_stats(
    owner: UserID,
    period: Period,
    connection: &Connection,
) -> Result<DashboardStats, Error> {
    let bounds = period.bounds()?;
    let total_in_period = sum_between(owner, *bounds.start(), *bounds.end(), connection)?;

    let total_all_time = connection.query_row(
        "SELECT COALESCE(SUM(amount), 0.0) FROM expense WHERE user_id = ?1",
        (owner.as_i64(),),
        |row| row.get(0),
    )?;

    let top_person: Option<(String, f64)> = connection
        .query_row(
            "SELECT p.name, SUM(e.amount) AS total
            FROM expense e
            INNER JOIN person p ON p.id = e.person_id
            WHERE e.user_id = ?1 AND e.date BETWEEN ?2 AND ?3
            GROUP BY p.id
            ORDER BY total DESC, p.name ASC
            LIMIT 1",
            (owner.as_i64(), bounds.start(), bounds.end()),
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let (top_person_name, top_person_amount) = top_person.unzip();

    Ok(DashboardStats {
        total_in_period,
        total_all_time,
        top_person_name,
        top_person_amount,
    })
}

/// Sums amounts by calendar month.
fn aggregate_by_month(expenses: &[(Date, f64)]) -> HashMap<Month, f64> {
    let mut totals = HashMap::new();

    for (date, amount) in expenses {
        *totals.entry(date.month()).or_insert(0.0) += amount;
    }

    totals
}

fn zero_filled_months(totals: &HashMap<Month, f64>) -> Vec<MonthlyTotal> {
    (1..=12u8)
        .filter_map(|month| Month::try_from(month).ok())
        .map(|month| MonthlyTotal {
            month: month as u8,
            total: totals.get(&month).copied().unwrap_or(0.0),
        })
        .collect()
}

/// Gather the chart data for `period`.
///
/// The monthly totals always cover the whole year of the period.
pub fn get_chart_data(
    owner: UserID,
    period: Period,
    connection: &Connection,
) -> Result<ChartData, Error> {
    let year = period.year_bounds()?;
    let expenses_in_year = connection
        .prepare(
            "SELECT date, amount FROM expense
            WHERE user_id = ?1 AND date BETWEEN ?2 AND ?3",
        )?
        .query_map((owner.as_i64(), year.start(), year.end()), |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?
        .collect::<Result<Vec<(Date, f64)>, rusqlite::Error>>()?;
    let monthly_expenses = zero_filled_months(&aggregate_by_month(&expenses_in_year));

    let bounds = period.bounds()?;
    let profile_distribution = connection
        .prepare(
            "SELECT p.name, SUM(e.amount) AS total, p.color
            FROM expense e
            INNER JOIN person p ON p.id = e.person_id
            WHERE e.user_id = ?1 AND e.date BETWEEN ?2 AND ?3
            GROUP BY p.id
            ORDER BY total DESC, p.name ASC",
        )?
        .query_map((owner.as_i64(), bounds.start(), bounds.end()), |row| {
            Ok(PersonTotal {
                name: row.get(0)?,
                total: row.get(1)?,
                color: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, rusqlite::Error>>()?;

    let category_distribution_for_month = match period.month() {
        None => Vec::new(),
        Some(_) => connection
            .prepare(
                "SELECT c.name, SUM(e.amount) AS total
                FROM expense e
                INNER JOIN category c ON c.id = e.category_id
                WHERE e.user_id = ?1 AND e.date BETWEEN ?2 AND ?3
                GROUP BY c.id
                ORDER BY total DESC, c.name ASC",
            )?
            .query_map((owner.as_i64(), bounds.start(), bounds.end()), |row| {
                Ok(CategoryTotal {
                    name: row.get(0)?,
                    total: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, rusqlite::Error>>()?,
    };

    Ok(ChartData {
        monthly_expenses,
        profile_distribution,
        category_distribution_for_month,
    })
}

/// List the years and months that have expenses, newest year first.
pub fn get_filter_options(
    owner: UserID,
    connection: &Connection,
) -> Result<Vec<FilterOption>, Error> {
    let dates = connection
        .prepare("SELECT DISTINCT date FROM expense WHERE user_id = ?1")?
        .query_map((owner.as_i64(),), |row| row.get(0))?
        .collect::<Result<Vec<Date>, rusqlite::Error>>()?;

    let mut months_by_year: BTreeMap<i32, BTreeSet<u8>> = BTreeMap::new();
    for date in dates {
        months_by_year
            .entry(date.year())
            .or_default()
            .insert(date.month() as u8);
    }

    Ok(months_by_year
        .into_iter()
        .rev()
        .map(|(year, months)| FilterOption {
            year,
            months: months.into_iter().collect(),
        })
        .collect())
}

/// The most recently dated expenses of `owner`, newest first.
pub fn get_recent_expenses(
    owner: UserID,
    connection: &Connection,
) -> Result<Vec<ExpenseWithRelations>, Error> {
    query_expenses(
        owner,
        &ExpenseFilter::default(),
        Page {
            number: 1,
            size: RECENT_EXPENSES_LIMIT,
        },
        connection,
    )
}
