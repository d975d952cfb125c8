//! Paperstack Core - Shared types library.
//!
//! This crate provides the common types used by the storefront service:
//! newtype IDs, email addresses, currency configuration and price
//! formatting, and order status.
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no
//! clocks. Anything that talks to the network lives in the storefront
//! crate.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
