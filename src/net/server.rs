//! Heartbeat server: listener, accept loop, and the assembled watchdog.

#![allow(missing_docs)]

use std::net::{IpAddr, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::handler::handle_connection;
use crate::core::errors::{Result, WatchdogError};
use crate::escalation::EscalationAction;
use crate::logger::{ActivityEvent, ActivityLogger};
use crate::monitor::checker::DeadlineChecker;
use crate::monitor::clock::Clock;
use crate::monitor::state::HeartbeatState;

/// Immutable server inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub bind: IpAddr,
    pub port: u16,
    /// Heartbeat window; also the checker period.
    pub timeout: Duration,
    /// Consecutive misses before escalation.
    pub attempts: u32,
    pub key: String,
}

impl ServerSettings {
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

/// Bound listener plus what each connection handler needs.
pub struct HeartbeatServer {
    listener: TcpListener,
    key: Arc<str>,
    state: Arc<HeartbeatState>,
    clock: Arc<dyn Clock>,
    logger: ActivityLogger,
}

impl HeartbeatServer {
    /// Bind the listening socket. Failure here is a startup failure.
    pub fn bind(
        settings: &ServerSettings,
        state: Arc<HeartbeatState>,
        clock: Arc<dyn Clock>,
        logger: ActivityLogger,
    ) -> Result<Self> {
        let addr = settings.addr();
        let listener = TcpListener::bind(addr).map_err(|source| WatchdogError::Bind {
            addr: addr.to_string(),
            source,
        })?;
        Ok(Self {
            listener,
            key: Arc::from(settings.key.as_str()),
            state,
            clock,
            logger,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|err| WatchdogError::Runtime {
                details: format!("listener has no local address: {err}"),
            })
    }

    /// Accept forever. Accept errors are logged and skipped; each connection
    /// is served on its own thread.
    pub fn serve(&self) {
        for incoming in self.listener.incoming() {
            match incoming {
                Ok(stream) => self.dispatch(stream),
                Err(err) => self.logger.log(ActivityEvent::AcceptFailed {
                    error: err.to_string(),
                }),
            }
        }
    }

    fn dispatch(&self, stream: TcpStream) {
        let peer = stream
            .peer_addr()
            .map_or_else(|_| "unknown".to_string(), |addr| addr.to_string());
        let key = Arc::clone(&self.key);
        let state = Arc::clone(&self.state);
        let clock = Arc::clone(&self.clock);
        let logger = self.logger.clone();
        let handler_peer = peer.clone();

        let spawned = thread::Builder::new()
            .name("heartbeat-conn".to_string())
            .spawn(move || {
                handle_connection(stream, &handler_peer, &key, &state, clock.as_ref(), &logger);
            });
        if let Err(err) = spawned {
            self.logger.log(ActivityEvent::HandlerSpawnFailed {
                peer,
                error: err.to_string(),
            });
        }
    }
}

/// Running watchdog: accept loop and deadline checker on their own threads.
#[derive(Debug)]
pub struct WatchdogServer {
    addr: SocketAddr,
    state: Arc<HeartbeatState>,
    accept: JoinHandle<()>,
    checker: JoinHandle<()>,
}

impl WatchdogServer {
    /// Bind, start the checker, start accepting.
    ///
    /// The heartbeat clock starts now: the first window closes one timeout
    /// after startup.
    pub fn start(
        settings: &ServerSettings,
        escalation: Arc<dyn EscalationAction>,
        clock: Arc<dyn Clock>,
        logger: ActivityLogger,
    ) -> Result<Self> {
        let state = Arc::new(HeartbeatState::new(clock.now()));
        let server = HeartbeatServer::bind(
            settings,
            Arc::clone(&state),
            Arc::clone(&clock),
            logger.clone(),
        )?;
        let addr = server.local_addr()?;

        let checker = DeadlineChecker::new(
            Arc::clone(&state),
            clock,
            escalation,
            logger.clone(),
            settings.timeout,
            settings.attempts,
        )
        .spawn()
        .map_err(|err| WatchdogError::Runtime {
            details: format!("cannot start deadline checker: {err}"),
        })?;

        logger.log(ActivityEvent::ServerListening {
            addr: addr.to_string(),
        });
        let accept = thread::Builder::new()
            .name("heartbeat-accept".to_string())
            .spawn(move || server.serve())
            .map_err(|err| WatchdogError::Runtime {
                details: format!("cannot start accept loop: {err}"),
            })?;

        Ok(Self {
            addr,
            state,
            accept,
            checker,
        })
    }

    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    #[must_use]
    pub fn state(&self) -> &Arc<HeartbeatState> {
        &self.state
    }

    /// Block for the lifetime of the process.
    pub fn wait(self) -> Result<()> {
        let accept = self.accept.join();
        let checker = self.checker.join();
        if accept.is_err() || checker.is_err() {
            return Err(WatchdogError::Runtime {
                details: "watchdog thread panicked".to_string(),
            });
        }
        Ok(())
    }
}
