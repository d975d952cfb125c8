//! Core types for Paperstack.

pub mod currency;
pub mod email;
pub mod id;
pub mod status;

pub use currency::CurrencyConfig;
pub use email::{Email, EmailError};
pub use id::*;
pub use status::OrderStatus;
