pub mod aggregate;
pub mod api;
pub mod config;
pub mod dashboard;
pub mod render;
pub mod report;
pub mod server;
pub mod session;
pub mod state;
