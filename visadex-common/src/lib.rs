//! # Visadex Common Library
//!
//! Shared code for the visadex backend:
//! - Database initialization and schema
//! - Domain models (countries, visa status records, cities)
//! - Error types
//! - Configuration loading

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
