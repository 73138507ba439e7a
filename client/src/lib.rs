//! Rebuilds and restarts the applications of a Cloud Foundry space.
//!
//! The sweep lists the apps in scope, keeps the ones in the requested state
//! whose droplet is old enough, and for each one stages a new build from the
//! current package, switches the app to the new droplet and restarts it.

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod poller;
pub mod report;
pub mod restage;
pub mod restart;
pub mod sweep;

#[cfg(test)]
mod fake;

pub use api::{CfClient, CurrentDroplet, PlatformApi, SharedApi};
pub use config::{RestageConfig, Target};
pub use error::{ConfigError, PlatformError, SweepError};
pub use sweep::{Sweep, SweepSummary};
