//! Site monitor: probes configured sites on a schedule, confirms every
//! up/down change with a second probe, and notifies subscribed users.

pub mod app;
pub mod config;
pub mod database;
pub mod error;
pub mod monitoring;
pub mod notify;
pub mod pool;

pub use app::build_scheduler;
pub use config::Config;
