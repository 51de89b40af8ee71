//! The `utils` module holds the pieces shared by every other module of
//! `roomcast`: the crate-wide error type and logging initialisation.

pub mod error;
pub mod logging;

pub use error::{Error, Result};
