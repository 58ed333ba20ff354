//! Transaction Validation
//!
//! Single entry point that turns an untyped request record into a validated
//! [`Transaction`] before any feature transformation runs.

mod error;
mod transaction;
mod validator;

pub use error::ValidationError;
pub use transaction::{
    Gender, HourCategory, RawTransaction, Transaction, DEFAULT_MERCHANT, KNOWN_CATEGORIES,
};
pub use validator::{ValidationConfig, Validator};
