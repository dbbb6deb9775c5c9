//! `service` crate — request workflows on top of the `db` crate.

pub mod error;
pub mod params;
pub mod requests;

pub use error::ServiceError;
pub use params::{CreateRequest, ItemInput, UpdateRequest};
pub use requests::RequestService;
