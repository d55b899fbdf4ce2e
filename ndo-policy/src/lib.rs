//! Policy kinds of the Nexus Dashboard Orchestrator fabric policy template,
//! and the lifecycle that converges them through the controller's REST API.

pub mod constants;
pub mod error;
pub mod framework;
pub mod kinds;
pub mod template;
pub mod transport;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
