pub mod aggregator;
pub mod auto_select;
pub mod dashboard;
pub mod error;
pub mod metrics;
pub mod normalizer;
pub mod poller;
pub mod prefs;
pub mod reconcile;
pub mod selection;
pub mod tools;
pub mod transport;
pub mod types;
pub mod view;
pub mod wallets;

pub use dashboard::{DashboardEngine, EngineOptions};
pub use error::{EngineError, EngineResult};
