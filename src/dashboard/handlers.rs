//! Dashboard endpoints.
//!
//! Every endpoint takes an optional `year` and `month` query parameter, where
//! a month of 0 selects the whole year. Missing values default to today's
//! year and month in the server's local timezone.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Query, State},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    auth::Session,
    dashboard::{
        aggregation::{
            ChartData, DashboardStats, FilterOption, get_chart_data, get_dashboard_stats,
            get_filter_options, get_recent_expenses,
        },
        period::Period,
    },
    db::lock_connection,
    expense::ExpenseWithRelations,
    timezone::local_today,
};

/// The state needed for the dashboard endpoints.
#[derive(Debug, Clone)]
pub struct DashboardState {
    /// The database connection for reading expenses.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "America/Sao_Paulo".
    pub local_timezone: String,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// The period selected by the dashboard query string.
#[derive(Debug, Default, Deserialize)]
pub struct PeriodQuery {
    pub year: Option<i32>,
    pub month: Option<u8>,
}

impl PeriodQuery {
    fn resolve(&self, local_timezone: &str) -> Result<Period, Error> {
        let (year, month) = match (self.year, self.month) {
            (Some(year), Some(month)) => (year, month),
            (year, month) => {
                let today = local_today(local_timezone)?;
                (
                    year.unwrap_or(today.year()),
                    month.unwrap_or(today.month() as u8),
                )
            }
        };

        Period::new(year, month)
    }
}

/// Everything the dashboard shows, in one response.
#[derive(Debug, Serialize, Deserialize)]
pub struct Dashboard {
    pub year: i32,
    /// 1 to 12, or 0 for the whole year.
    pub month: u8,
    pub stats: DashboardStats,
    pub charts: ChartData,
    pub filter_options: Vec<FilterOption>,
    pub recent_expenses: Vec<ExpenseWithRelations>,
}

pub async fn get_dashboard_endpoint(
    State(state): State<DashboardState>,
    Extension(session): Extension<Session>,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<Dashboard>, Error> {
    let period = query.resolve(&state.local_timezone)?;
    let connection = lock_connection(&state.db_connection)?;

    Ok(Json(Dashboard {
        year: period.year(),
        month: period.month().map(|month| month as u8).unwrap_or(0),
        stats: get_dashboard_stats(session.user_id, period, &connection)?,
        charts: get_chart_data(session.user_id, period, &connection)?,
        filter_options: get_filter_options(session.user_id, &connection)?,
        recent_expenses: get_recent_expenses(session.user_id, &connection)?,
    }))
}

pub async fn get_dashboard_stats_endpoint(
    State(state): State<DashboardState>,
    Extension(session): Extension<Session>,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<DashboardStats>, Error> {
    let period = query.resolve(&state.local_timezone)?;
    let connection = lock_connection(&state.db_connection)?;

    get_dashboard_stats(session.user_id, period, &connection).map(Json)
}

pub async fn get_chart_data_endpoint(
    State(state): State<DashboardState>,
    Extension(session): Extension<Session>,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<ChartData>, Error> {
    let period = query.resolve(&state.local_timezone)?;
    let connection = lock_connection(&state.db_connection)?;

    get_chart_data(session.user_id, period, &connection).map(Json)
}

pub async fn get_filter_options_endpoint(
    State(state): State<DashboardState>,
    Extension(session): Extension<Session>,
) -> Result<Json<Vec<FilterOption>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_filter_options(session.user_id, &connection).map(Json)
}

pub async fn get_recent_expenses_endpoint(
    State(state): State<DashboardState>,
    Extension(session): Extension<Session>,
) -> Result<Json<Vec<ExpenseWithRelations>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_recent_expenses(session.user_id, &connection).map(Json)
}

#[cfg(test)]
mod dashboard_endpoint_tests {
    use axum::http::StatusCode;
    use serde_json::json;
    use time::OffsetDateTime;

    use crate::{
        endpoints,
        test_utils::{create_test_expense_for_person, get_global_person, get_logged_in_test_server},
    };

    use super::{ChartData, Dashboard, DashboardStats};

    #[tokio::test]
    async fn dashboard_defaults_to_current_month() {
        let (server, cookie, _) = get_logged_in_test_server().await;
        let today = OffsetDateTime::now_utc().date();

        let response = server.get(endpoints::DASHBOARD).add_cookie(cookie).await;

        response.assert_status_ok();
        let dashboard = response.json::<Dashboard>();
        assert_eq!(dashboard.year, today.year());
        assert_eq!(dashboard.month, today.month() as u8);
        assert_eq!(dashboard.charts.monthly_expenses.len(), 12);
        assert!(dashboard.recent_expenses.is_empty());
        assert!(dashboard.filter_options.is_empty());
    }

    #[tokio::test]
    async fn stats_include_recorded_expense() {
        let (server, cookie, user) = get_logged_in_test_server().await;
        let person = get_global_person(&server);
        let expense = create_test_expense_for_person(&server, user.id, person.id);

        let response = server
            .get(endpoints::DASHBOARD_STATS)
            .add_query_param("year", expense.date.year())
            .add_query_param("month", expense.date.month() as u8)
            .add_cookie(cookie)
            .await;

        response.assert_status_ok();
        let stats = response.json::<DashboardStats>();
        assert_eq!(stats.total_in_period, expense.amount);
        assert_eq!(stats.top_person_name.as_deref(), Some("Me"));
    }

    #[tokio::test]
    async fn whole_year_charts_have_no_category_distribution() {
        let (server, cookie, user) = get_logged_in_test_server().await;
        let person = get_global_person(&server);
        let expense = create_test_expense_for_person(&server, user.id, person.id);

        let charts = server
            .get(endpoints::DASHBOARD_CHARTS)
            .add_query_param("year", expense.date.year())
            .add_query_param("month", 0)
            .add_cookie(cookie)
            .await
            .json::<ChartData>();

        assert!(charts.category_distribution_for_month.is_empty());
        assert_eq!(charts.profile_distribution.len(), 1);
    }

    #[tokio::test]
    async fn invalid_month_is_rejected() {
        let (server, cookie, _) = get_logged_in_test_server().await;

        let response = server
            .get(endpoints::DASHBOARD_STATS)
            .add_query_param("year", 2025)
            .add_query_param("month", 13)
            .add_cookie(cookie)
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        response.assert_json(&json!({
            "error": "invalid period 2025-13, month must be 0 (whole year) or 1 to 12"
        }));
    }

    #[tokio::test]
    async fn filter_options_and_recent_expenses() {
        let (server, cookie, user) = get_logged_in_test_server().await;
        let person = get_global_person(&server);
        let expense = create_test_expense_for_person(&server, user.id, person.id);

        server
            .get(endpoints::DASHBOARD_FILTER_OPTIONS)
            .add_cookie(cookie.clone())
            .await
            .assert_json(&json!([{
                "year": expense.date.year(),
                "months": [expense.date.month() as u8],
            }]));

        let recent = server
            .get(endpoints::DASHBOARD_RECENT)
            .add_cookie(cookie)
            .await
            .json::<Vec<serde_json::Value>>();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0]["person_name"], "Me");
    }

    #[tokio::test]
    async fn dashboard_requires_log_in() {
        let (server, _, _) = get_logged_in_test_server().await;

        server
            .get(endpoints::DASHBOARD)
            .await
            .assert_status_unauthorized();
    }
}
