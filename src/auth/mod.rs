//! User identity, sessions and the endpoints that manage them.

mod account;
mod cookie;
mod log_in;
mod log_out;
mod middleware;
mod password;
mod register_user;
mod session;
mod user;

pub use account::{change_password, update_profile};
pub use cookie::{
    DEFAULT_COOKIE_DURATION, SESSION_COOKIE, get_session_from_cookies, invalidate_auth_cookie,
    set_auth_cookie,
};
pub use log_in::post_log_in;
pub use log_out::post_log_out;
pub use middleware::auth_guard;
pub use password::{PasswordHash, ValidatedPassword};
pub use register_user::register_user;
pub use session::{Session, get_session};
pub use user::{
    DisplayName, Email, User, UserID, UserProfile, create_user, create_user_table,
    get_user_by_email, get_user_by_id, update_display_name, update_password,
};
