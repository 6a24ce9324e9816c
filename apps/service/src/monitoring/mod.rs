/// Monitoring engine module - decides when sites are checked and what a
/// check result means
///
/// This module is responsible for:
/// - Probing sites over HTTP/HTTPS
/// - Tracking each site's up/down state
/// - Confirming state changes before anyone is notified
/// - Scheduling checks without letting one site delay another
pub mod checker;
pub mod executor;
pub mod scheduler;
pub mod site;
pub mod types;

#[cfg(test)]
pub mod testing;

pub use checker::{HttpProbe, Probe};
pub use executor::{CheckOutcome, CheckPipeline};
pub use scheduler::MonitoringScheduler;
pub use site::Site;
pub use types::CheckResult;
