//! People that expenses are recorded for.

mod db;
mod domain;
mod handlers;

pub use db::{create_person, create_person_table, is_person_visible, seed_global_people};
pub use domain::{Color, Person, PersonForm, PersonId, PersonName};
pub use handlers::{
    create_person_endpoint, delete_person_endpoint, list_people_endpoint, update_person_endpoint,
};
