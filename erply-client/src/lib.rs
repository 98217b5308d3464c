//! Erply bulk API client implementing the customer directory port.

pub mod client;
pub mod error;

pub use client::{ClientSettings, ErplyClient, RequestName};
pub use error::ClientError;
