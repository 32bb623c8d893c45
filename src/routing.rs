//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router, middleware,
    routing::{get, post, put},
};

use crate::{
    AppState, Error,
    auth::{
        auth_guard, change_password, get_session, post_log_in, post_log_out, register_user,
        update_profile,
    },
    category::{
        create_category_endpoint, delete_category_endpoint, list_categories_endpoint,
        update_category_endpoint,
    },
    dashboard::{
        get_chart_data_endpoint, get_dashboard_endpoint, get_dashboard_stats_endpoint,
        get_filter_options_endpoint, get_recent_expenses_endpoint,
    },
    endpoints,
    expense::{
        create_expense_endpoint, delete_expense_endpoint, get_expense_endpoint,
        list_expenses_endpoint, update_expense_endpoint,
    },
    person::{
        create_person_endpoint, delete_person_endpoint, list_people_endpoint,
        update_person_endpoint,
    },
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::USERS, post(register_user))
        .route(endpoints::LOG_IN, post(post_log_in))
        .route(endpoints::LOG_OUT, post(post_log_out));

    let protected_routes = Router::new()
        .route(endpoints::SESSION, get(get_session))
        .route(endpoints::PASSWORD, put(change_password))
        .route(endpoints::PROFILE, put(update_profile))
        .route(
            endpoints::PEOPLE,
            get(list_people_endpoint).post(create_person_endpoint),
        )
        .route(
            endpoints::PERSON,
            put(update_person_endpoint).delete(delete_person_endpoint),
        )
        .route(
            endpoints::CATEGORIES,
            get(list_categories_endpoint).post(create_category_endpoint),
        )
        .route(
            endpoints::CATEGORY,
            put(update_category_endpoint).delete(delete_category_endpoint),
        )
        .route(
            endpoints::EXPENSES,
            get(list_expenses_endpoint).post(create_expense_endpoint),
        )
        .route(
            endpoints::EXPENSE,
            get(get_expense_endpoint)
                .put(update_expense_endpoint)
                .delete(delete_expense_endpoint),
        )
        .route(endpoints::DASHBOARD, get(get_dashboard_endpoint))
        .route(endpoints::DASHBOARD_STATS, get(get_dashboard_stats_endpoint))
        .route(endpoints::DASHBOARD_CHARTS, get(get_chart_data_endpoint))
        .route(
            endpoints::DASHBOARD_FILTER_OPTIONS,
            get(get_filter_options_endpoint),
        )
        .route(endpoints::DASHBOARD_RECENT, get(get_recent_expenses_endpoint))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    protected_routes
        .merge(unprotected_routes)
        .fallback(get_404_not_found)
        .with_state(state)
}

async fn get_404_not_found() -> Error {
    Error::NotFound
}
