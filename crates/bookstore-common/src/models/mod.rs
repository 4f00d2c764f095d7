//! Domain models shared by the database and API layers.
//!
//! Branches and staff users have typed rows because auth and branch routing read
//! them field by field. Catalog resources only need request bodies: their rows go
//! to clients as JSON documents built by the listing renderer.

pub mod branch;
pub mod catalog;
pub mod customer;
pub mod inventory;
pub mod user;

pub use branch::*;
pub use catalog::*;
pub use customer::*;
pub use inventory::*;
pub use user::*;
