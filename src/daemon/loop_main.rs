//! Long-running entry points for server and client mode.

#![allow(missing_docs)]

use std::sync::Arc;

use crate::core::config::Config;
use crate::core::errors::Result;
use crate::escalation::RecoveryScripts;
use crate::logger::ActivityLogger;
use crate::monitor::clock::MonotonicClock;
use crate::net::client::HeartbeatClient;
use crate::net::server::WatchdogServer;

/// Validate, bind, and watch until the process is terminated.
///
/// Configuration and bind errors are returned before anything runs.
pub fn run_server(config: &Config, logger: ActivityLogger) -> Result<()> {
    let settings = config.server_settings()?;
    let scripts = RecoveryScripts::new(&config.script_dir, config.script_prefix.clone());
    #[cfg(feature = "daemon")]
    super::signals::install(logger.clone())?;
    let server = WatchdogServer::start(
        &settings,
        Arc::new(scripts),
        Arc::new(MonotonicClock),
        logger,
    )?;
    server.wait()
}

/// Send heartbeats until the process is terminated.
pub fn run_client(config: &Config, logger: ActivityLogger) -> Result<()> {
    let settings = config.client_settings()?;
    #[cfg(feature = "daemon")]
    super::signals::install(logger.clone())?;
    HeartbeatClient::new(settings, logger).run();
    Ok(())
}
