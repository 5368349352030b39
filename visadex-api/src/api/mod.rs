//! HTTP API handlers

pub mod cities;
pub mod countries;
pub mod health;
pub mod visas;

pub use cities::city_routes;
pub use countries::country_routes;
pub use health::health_routes;
pub use visas::visa_routes;
