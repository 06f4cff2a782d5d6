//! Heartbeat client: dial, send the key, read one reply, hang up, sleep.
//!
//! Every cycle dials fresh. Dial, write and read failures are all logged
//! and handled the same way: sleep one interval and try again, forever.

#![allow(missing_docs)]

use std::io::{BufReader, Write as _};
use std::net::TcpStream;
use std::thread;
use std::time::Duration;

use super::protocol::{self, LineRead, Response};
use crate::logger::{ActivityEvent, ActivityLogger};

/// Immutable client inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub remote: String,
    pub port: u16,
    pub key: String,
    /// Pause between cycles, whatever their outcome.
    pub interval: Duration,
}

impl ClientSettings {
    /// `host:port` for display; IPv6 literals are bracketed.
    #[must_use]
    pub fn endpoint(&self) -> String {
        if self.remote.contains(':') && !self.remote.starts_with('[') {
            format!("[{}]:{}", self.remote, self.port)
        } else {
            format!("{}:{}", self.remote, self.port)
        }
    }
}

/// What one heartbeat cycle observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BeatOutcome {
    Acknowledged,
    /// Server answered with anything other than `OK`.
    Rejected(String),
    DialFailed,
    WriteFailed,
    ReadFailed,
}

#[derive(Debug, Clone)]
pub struct HeartbeatClient {
    settings: ClientSettings,
    endpoint: String,
    logger: ActivityLogger,
}

impl HeartbeatClient {
    #[must_use]
    pub fn new(settings: ClientSettings, logger: ActivityLogger) -> Self {
        let endpoint = settings.endpoint();
        Self {
            settings,
            endpoint,
            logger,
        }
    }

    /// One dial/send/receive exchange. Never sleeps.
    pub fn beat(&self) -> BeatOutcome {
        let mut stream =
            match TcpStream::connect((self.settings.remote.as_str(), self.settings.port)) {
                Ok(stream) => stream,
                Err(err) => {
                    self.logger.log(ActivityEvent::DialFailed {
                        remote: self.endpoint.clone(),
                        error: err.to_string(),
                    });
                    return BeatOutcome::DialFailed;
                }
            };

        let line = protocol::encode_heartbeat(&self.settings.key);
        if let Err(err) = stream.write_all(&line).and_then(|()| stream.flush()) {
            self.logger.log(ActivityEvent::HeartbeatWriteFailed {
                remote: self.endpoint.clone(),
                error: err.to_string(),
            });
            return BeatOutcome::WriteFailed;
        }

        let mut reader = BufReader::new(stream);
        let reply = match protocol::read_line(&mut reader) {
            Ok(LineRead::Line(reply)) => reply,
            Ok(LineRead::TooLong) => {
                return self.rejected("<oversized reply>".to_string());
            }
            Ok(LineRead::Eof) => {
                return self.read_failed("connection closed before reply".to_string());
            }
            Err(err) => return self.read_failed(err.to_string()),
        };

        match Response::parse(&reply) {
            Response::Ok => {
                self.logger.log(ActivityEvent::ServerAcknowledged {
                    remote: self.endpoint.clone(),
                });
                BeatOutcome::Acknowledged
            }
            Response::Error => self.rejected("ERROR".to_string()),
            Response::Other(other) => self.rejected(other),
        }
    }

    fn rejected(&self, response: String) -> BeatOutcome {
        self.logger.log(ActivityEvent::ServerRejected {
            remote: self.endpoint.clone(),
            response: response.clone(),
        });
        BeatOutcome::Rejected(response)
    }

    fn read_failed(&self, error: String) -> BeatOutcome {
        self.logger.log(ActivityEvent::ResponseReadFailed {
            remote: self.endpoint.clone(),
            error,
        });
        BeatOutcome::ReadFailed
    }

    /// Beat, sleep, repeat until the process ends.
    pub fn run(&self) {
        self.logger.log(ActivityEvent::ClientStarted {
            remote: self.endpoint.clone(),
        });
        loop {
            self.beat();
            thread::sleep(self.settings.interval);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, Write};
    use std::net::TcpListener;

    fn settings(port: u16) -> ClientSettings {
        ClientSettings {
            remote: "127.0.0.1".to_string(),
            port,
            key: "abc123".to_string(),
            interval: Duration::from_millis(10),
        }
    }

    /// Accepts one connection, records the request line, replies `reply`.
    fn one_shot_server(reply: &'static [u8]) -> (u16, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            reader.get_mut().write_all(reply).unwrap();
            line
        });
        (port, handle)
    }

    fn unused_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    #[test]
    fn ok_reply_is_acknowledged() {
        let (port, server) = one_shot_server(b"OK\n");
        let (logger, log) = ActivityLogger::memory();
        let client = HeartbeatClient::new(settings(port), logger);
        assert_eq!(client.beat(), BeatOutcome::Acknowledged);
        assert_eq!(server.join().unwrap(), "abc123\n");
        assert_eq!(
            log.count(|event| matches!(event, ActivityEvent::ServerAcknowledged { .. })),
            1
        );
    }

    #[test]
    fn error_reply_is_only_logged() {
        let (port, server) = one_shot_server(b"ERROR\n");
        let client = HeartbeatClient::new(settings(port), ActivityLogger::disabled());
        assert_eq!(client.beat(), BeatOutcome::Rejected("ERROR".to_string()));
        server.join().unwrap();
    }

    #[test]
    fn hang_up_without_reply_is_a_read_failure() {
        let (port, server) = one_shot_server(b"");
        let client = HeartbeatClient::new(settings(port), ActivityLogger::disabled());
        assert_eq!(client.beat(), BeatOutcome::ReadFailed);
        server.join().unwrap();
    }

    #[test]
    fn every_unreachable_cycle_logs_a_dial_failure() {
        let (logger, log) = ActivityLogger::memory();
        let client = HeartbeatClient::new(settings(unused_port()), logger);
        for _ in 0..5 {
            assert_eq!(client.beat(), BeatOutcome::DialFailed);
        }
        assert_eq!(
            log.count(|event| matches!(event, ActivityEvent::DialFailed { .. })),
            5
        );
    }

    #[test]
    fn endpoint_brackets_ipv6_literals() {
        let mut s = settings(4848);
        assert_eq!(s.endpoint(), "127.0.0.1:4848");
        s.remote = "::1".to_string();
        assert_eq!(s.endpoint(), "[::1]:4848");
    }
}
