//! Database access for visadex-api
//!
//! Query functions over the shared SQLite pool. Schema initialization lives
//! in `visadex_common::db`.

pub mod cities;
pub mod countries;
pub mod visa_status;

pub use visa_status::SqliteVisaStore;
