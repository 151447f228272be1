//! Warden Core: domain models, repository and cache contracts, and the
//! error taxonomy shared by every Warden crate.

pub mod cache;
pub mod deadline;
pub mod error;
pub mod models;
pub mod patch;
pub mod repository;

pub use error::{WardenError, WardenResult};
pub use patch::Patch;
