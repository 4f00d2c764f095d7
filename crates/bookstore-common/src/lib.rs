//! # bookstore-common
//!
//! Shared types, configuration, error handling, and the query-feature parser used
//! across all bookstore crates. No database access and no HTTP routing here.

pub mod auth;
pub mod config;
pub mod error;
pub mod ids;
pub mod models;
pub mod permissions;
pub mod query;
pub mod serde_util;
pub mod validation;
