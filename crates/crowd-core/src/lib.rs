//! # crowd-core
//!
//! Core types and utilities for talking to a Crowd user-management server.
//!
//! This crate provides the error taxonomy, the status-code-to-outcome mapping engine,
//! connection configuration, and HTTP settings shared by Crowd integrations.
//!
//! ## Modules
//!
//! - [`error`] - Error types and their programmatic kinds
//! - [`outcome`] - Table-driven mapping from HTTP status codes to typed outcomes
//! - [`config`] - Connection configuration and application credentials
//! - [`http`] - Timeouts, pooling and compression for the HTTP client
//! - [`query`] - Query strings addressing users and groups

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod http;
pub mod outcome;
pub mod query;

// Re-export commonly used types
pub use error::{Error, ErrorContext, ErrorKind, Result};
pub use outcome::Outcome;
