#![forbid(unsafe_code)]

//! Core types for the wssec WS-Security library: the shared error type,
//! namespace constants and algorithm URIs.

pub mod algorithm;
pub mod error;
pub mod ns;

pub use error::{Error, Result};
