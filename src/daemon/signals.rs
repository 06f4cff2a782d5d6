//! Process signal handling for the long-running modes.

#![allow(missing_docs)]

use std::thread;

use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};
use signal_hook::iterator::Signals;

use crate::core::errors::{Result, WatchdogError};
use crate::logger::{ActivityEvent, ActivityLogger};

/// What the process does on a given signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    Exit,
    Ignore,
}

#[must_use]
pub fn action_for(signal: i32) -> SignalAction {
    match signal {
        SIGTERM | SIGINT => SignalAction::Exit,
        _ => SignalAction::Ignore,
    }
}

/// Log SIGTERM/SIGINT/SIGHUP; exit cleanly on the first two.
pub fn install(logger: ActivityLogger) -> Result<()> {
    let mut signals =
        Signals::new([SIGTERM, SIGINT, SIGHUP]).map_err(|err| WatchdogError::Runtime {
            details: format!("cannot register signal handlers: {err}"),
        })?;

    thread::Builder::new()
        .name("signals".to_string())
        .spawn(move || {
            for signal in signals.forever() {
                logger.log(ActivityEvent::SignalReceived { signal });
                if action_for(signal) == SignalAction::Exit {
                    std::process::exit(0);
                }
            }
        })
        .map_err(|err| WatchdogError::Runtime {
            details: format!("cannot start signal thread: {err}"),
        })?;
    Ok(())
}
