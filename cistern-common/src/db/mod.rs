//! Database models and queries

pub mod blocklist;
pub mod builds;
pub mod init;
pub mod labels;
pub mod models;
pub mod projects;
pub mod submissions;
pub mod subprojects;
pub mod subscriptions;
pub mod users;

pub use init::{init_database, init_schema};
pub use models::*;
