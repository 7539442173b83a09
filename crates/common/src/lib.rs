pub mod client;
pub mod config;
pub mod observability;
pub mod store;
pub mod types;
