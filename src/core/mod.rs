//! Core business logic abstractions

pub mod alert;
pub mod automation;
pub mod cache;
pub mod config;
pub mod forecast;
pub mod log;
pub mod quote;

// Re-export main types for cleaner imports
pub use alert::{AlertOutcome, AlertRule, CooldownTracker, Notifier};
pub use forecast::{ForecastModel, ForecastPoint};
pub use quote::{Quote, QuoteProvider, QuoteSeries};
