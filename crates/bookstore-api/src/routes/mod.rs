//! API route modules.

pub mod auth;
pub mod branches;
pub mod catalog;
pub mod dashboard;
pub mod health;
pub mod summary;
pub mod users;
