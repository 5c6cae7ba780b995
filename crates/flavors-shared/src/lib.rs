//! # flavors-shared
//!
//! Types and primitives shared by the Festival Flavors store and server:
//! the password digest scheme, submission constants, validation errors and
//! small value types such as [`types::Coordinates`].

pub mod constants;
pub mod error;
pub mod password;
pub mod types;

pub use error::ValidationError;
pub use types::Coordinates;
