//! stillcast-common: shared error type and identifiers.
//!
//! Every stillcast crate funnels its failures into [`Error`] and namespaces
//! its scratch artifacts with a [`JobId`].

pub mod error;
pub mod ids;

pub use error::{Error, Result};
pub use ids::JobId;
