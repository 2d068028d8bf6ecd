pub mod auth;
pub mod errors;
pub mod reports;
pub mod session;
