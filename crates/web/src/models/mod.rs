//! Domain models for the web application.
//!
//! These are validated domain objects, separate from the row types the
//! repositories decode.

pub mod review;
pub mod session;
pub mod store;
pub mod user;

pub use review::Review;
pub use session::CurrentUser;
pub use store::Store;
pub use user::User;
