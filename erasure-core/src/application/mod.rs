pub mod action;
pub mod anonymization;
pub mod engine;
pub mod remediation;
pub mod services;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use action::{ServiceProvider, execute_action};
pub use anonymization::{AnonymizationReport, run_anonymization};
pub use remediation::{RemediationReport, run_remediation};
pub use services::LiveServices;
pub use session::Session;
