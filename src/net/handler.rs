//! Per-connection heartbeat validation.

#![allow(missing_docs)]

use std::io::{self, BufReader, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use super::protocol::{self, ACK, LineRead, REJECT};
use crate::logger::{ActivityEvent, ActivityLogger};
use crate::monitor::clock::Clock;
use crate::monitor::state::HeartbeatState;

/// Upper bound on unread request bytes discarded after an oversized line.
const DRAIN_LIMIT: u64 = 1 << 20;
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Byte stream a single heartbeat request arrives on.
pub trait HeartbeatStream: Read + Write {
    /// Called after `ERROR` has been written for a line that was cut short.
    ///
    /// The peer may still be sending; closing with unread input would reset
    /// the connection and discard the reply.
    fn finish_rejected(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<T: HeartbeatStream + ?Sized> HeartbeatStream for &mut T {
    fn finish_rejected(&mut self) -> io::Result<()> {
        (**self).finish_rejected()
    }
}

impl HeartbeatStream for TcpStream {
    fn finish_rejected(&mut self) -> io::Result<()> {
        self.shutdown(Shutdown::Write)?;
        self.set_read_timeout(Some(DRAIN_TIMEOUT))?;
        // A timeout or reset here only ends the drain early.
        let _ = io::copy(&mut Read::take(&mut *self, DRAIN_LIMIT), &mut io::sink());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// Key matched; `OK` sent and state updated.
    Validated,
    /// Key mismatch or malformed line; `ERROR` sent.
    Rejected,
    /// Nothing usable arrived; no reply, no state change.
    ReadFailed,
}

/// Serve exactly one request on `stream`, then drop (close) it.
///
/// At most one write and one state update per call. The state lock is taken
/// only after the reply has been written and is never held across I/O.
pub fn handle_connection<S: HeartbeatStream>(
    stream: S,
    peer: &str,
    key: &str,
    state: &HeartbeatState,
    clock: &dyn Clock,
    logger: &ActivityLogger,
) -> HandlerOutcome {
    let mut reader = BufReader::new(stream);
    let mut truncated = false;
    let line = match protocol::read_line(&mut reader) {
        Ok(LineRead::Line(line)) => Some(line),
        Ok(LineRead::TooLong) => {
            truncated = true;
            None
        }
        Ok(LineRead::Eof) => {
            logger.log(ActivityEvent::ConnectionReadFailed {
                peer: peer.to_string(),
                error: "connection closed before end of line".to_string(),
            });
            return HandlerOutcome::ReadFailed;
        }
        Err(err) => {
            logger.log(ActivityEvent::ConnectionReadFailed {
                peer: peer.to_string(),
                error: err.to_string(),
            });
            return HandlerOutcome::ReadFailed;
        }
    };

    let valid = line
        .as_deref()
        .is_some_and(|line| protocol::key_matches(line, key));
    let reply = if valid { ACK } else { REJECT };
    let stream = reader.get_mut();
    let mut written = stream.write_all(reply).and_then(|()| stream.flush());
    if truncated {
        written = written.and_then(|()| stream.finish_rejected());
    }
    if let Err(err) = written {
        logger.log(ActivityEvent::ResponseWriteFailed {
            peer: peer.to_string(),
            error: err.to_string(),
        });
    }

    if valid {
        // The client proved liveness even if our reply was lost.
        state.record_heartbeat(clock.now());
        logger.log(ActivityEvent::HeartbeatReceived {
            peer: peer.to_string(),
        });
        HandlerOutcome::Validated
    } else {
        logger.log(ActivityEvent::HeartbeatRejected {
            peer: peer.to_string(),
        });
        HandlerOutcome::Rejected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::clock::ManualClock;
    use std::io::Cursor;
    use std::time::Duration;

    /// In-memory duplex stream: scripted input, captured output.
    struct Duplex {
        input: Cursor<Vec<u8>>,
        output: Vec<u8>,
        writes: usize,
        finished_rejected: bool,
    }

    impl Duplex {
        fn new(input: &[u8]) -> Self {
            Self {
                input: Cursor::new(input.to_vec()),
                output: Vec::new(),
                writes: 0,
                finished_rejected: false,
            }
        }
    }

    impl Read for Duplex {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.input.read(buf)
        }
    }

    impl Write for Duplex {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.writes += 1;
            self.output.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl HeartbeatStream for Duplex {
        fn finish_rejected(&mut self) -> std::io::Result<()> {
            self.finished_rejected = true;
            Ok(())
        }
    }

    struct Fixture {
        clock: ManualClock,
        state: HeartbeatState,
        logger: ActivityLogger,
        log: crate::logger::MemorySink,
    }

    fn fixture() -> Fixture {
        let clock = ManualClock::new();
        let state = HeartbeatState::new(clock.now());
        let (logger, log) = ActivityLogger::memory();
        Fixture {
            clock,
            state,
            logger,
            log,
        }
    }

    fn serve(fx: &Fixture, stream: &mut Duplex) -> HandlerOutcome {
        handle_connection(stream, "127.0.0.1:5555", "abc123", &fx.state, &fx.clock, &fx.logger)
    }

    #[test]
    fn valid_key_is_acknowledged_and_recorded() {
        let fx = fixture();
        fx.clock.advance(Duration::from_secs(5));
        let mut stream = Duplex::new(b"abc123\n");
        assert_eq!(serve(&fx, &mut stream), HandlerOutcome::Validated);
        assert_eq!(stream.output, b"OK\n");
        assert_eq!(stream.writes, 1);
        assert_eq!(fx.state.snapshot().last_seen, fx.clock.now());
        assert_eq!(
            fx.log
                .count(|event| matches!(event, ActivityEvent::HeartbeatReceived { .. })),
            1
        );
    }

    #[test]
    fn wrong_key_is_rejected_without_touching_state() {
        let fx = fixture();
        let before = fx.state.snapshot();
        fx.clock.advance(Duration::from_secs(5));
        let mut stream = Duplex::new(b"wrongkey\n");
        assert_eq!(serve(&fx, &mut stream), HandlerOutcome::Rejected);
        assert_eq!(stream.output, b"ERROR\n");
        assert_eq!(fx.state.snapshot(), before);
    }

    #[test]
    fn case_variant_is_rejected() {
        let fx = fixture();
        let mut stream = Duplex::new(b"ABC123\n");
        assert_eq!(serve(&fx, &mut stream), HandlerOutcome::Rejected);
    }

    #[test]
    fn eof_before_newline_gets_no_reply() {
        let fx = fixture();
        let before = fx.state.snapshot();
        let mut stream = Duplex::new(b"abc123");
        assert_eq!(serve(&fx, &mut stream), HandlerOutcome::ReadFailed);
        assert!(stream.output.is_empty());
        assert_eq!(fx.state.snapshot(), before);
        assert_eq!(
            fx.log
                .count(|event| matches!(event, ActivityEvent::ConnectionReadFailed { .. })),
            1
        );
    }

    #[test]
    fn oversized_line_is_rejected() {
        let fx = fixture();
        let mut stream = Duplex::new(&vec![b'x'; protocol::MAX_LINE_BYTES + 10]);
        assert_eq!(serve(&fx, &mut stream), HandlerOutcome::Rejected);
        assert_eq!(stream.output, b"ERROR\n");
        assert!(stream.finished_rejected);
    }

    #[test]
    fn complete_lines_close_without_draining() {
        let fx = fixture();
        let mut stream = Duplex::new(b"wrongkey\n");
        serve(&fx, &mut stream);
        assert!(!stream.finished_rejected);
    }

    #[test]
    fn valid_heartbeat_clears_misses() {
        let fx = fixture();
        fx.clock.advance(Duration::from_secs(3));
        fx.state
            .evaluate(fx.clock.now(), Duration::from_secs(2), 10);
        assert_eq!(fx.state.snapshot().miss_count, 1);
        let mut stream = Duplex::new(b"abc123\n");
        serve(&fx, &mut stream);
        assert_eq!(fx.state.snapshot().miss_count, 0);
    }
}
