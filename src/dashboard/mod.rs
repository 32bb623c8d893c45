//! Dashboard module
//!
//! Summarises a user's expenses for a year or a single month: headline
//! totals, chart data, the periods that have data and the latest expenses.

mod aggregation;
mod handlers;
mod period;

pub use handlers::{
    get_chart_data_endpoint, get_dashboard_endpoint, get_dashboard_stats_endpoint,
    get_filter_options_endpoint, get_recent_expenses_endpoint,
};
