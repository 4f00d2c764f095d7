//! Repository layer: query functions organized by domain.

pub mod branches;
pub mod documents;
pub mod metrics;
pub mod users;
