//! Spending categories that expenses are grouped by.

mod db;
mod domain;
mod handlers;

pub use db::{
    create_category, create_category_table, is_category_visible, seed_global_categories,
};
pub use domain::{Category, CategoryForm, CategoryIcon, CategoryId, CategoryName};
pub use handlers::{
    create_category_endpoint, delete_category_endpoint, list_categories_endpoint,
    update_category_endpoint,
};
