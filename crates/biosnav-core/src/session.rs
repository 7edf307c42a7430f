//! Console session abstraction.
//!
//! The menu engine only ever writes key codes and waits for a pattern; the
//! caller owns the connection and lends it out for each operation.

use crate::SessionError;
use regex::Regex;
use std::time::Duration;
use tracing::trace;

/// A remote text console the engine can drive.
pub trait ConsoleSession {
    /// Transmit raw bytes (key codes) to the remote terminal.
    fn write(&mut self, bytes: &[u8]) -> Result<(), SessionError>;

    /// Block until `pattern` appears in the inbound stream, returning the
    /// buffered text up to and including the match.
    fn expect(&mut self, pattern: &Regex, timeout: Duration) -> Result<String, SessionError>;
}

impl<T: ConsoleSession + ?Sized> ConsoleSession for &mut T {
    fn write(&mut self, bytes: &[u8]) -> Result<(), SessionError> {
        (**self).write(bytes)
    }

    fn expect(&mut self, pattern: &Regex, timeout: Duration) -> Result<String, SessionError> {
        (**self).expect(pattern, timeout)
    }
}

/// Serves a previously captured console transcript.
///
/// `expect` consumes the transcript through the first match and reports a
/// timeout as soon as the remaining text cannot match. Written bytes are
/// recorded for inspection.
#[derive(Debug, Clone, Default)]
pub struct ReplaySession {
    transcript: String,
    position: usize,
    written: Vec<u8>,
}

impl ReplaySession {
    pub fn new(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            position: 0,
            written: Vec::new(),
        }
    }

    /// Everything written to the session so far.
    pub fn written(&self) -> &[u8] {
        &self.written
    }

    /// Transcript text not yet consumed by `expect`.
    pub fn remaining(&self) -> &str {
        &self.transcript[self.position..]
    }
}

impl ConsoleSession for ReplaySession {
    fn write(&mut self, bytes: &[u8]) -> Result<(), SessionError> {
        trace!(target: "biosnav::session", "Replay write {:?}", String::from_utf8_lossy(bytes));
        self.written.extend_from_slice(bytes);
        Ok(())
    }

    fn expect(&mut self, pattern: &Regex, timeout: Duration) -> Result<String, SessionError> {
        let remaining = &self.transcript[self.position..];
        match pattern.find(remaining) {
            Some(m) => {
                let matched = remaining[..m.end()].to_string();
                self.position += m.end();
                Ok(matched)
            }
            None => Err(SessionError::Timeout {
                pattern: pattern.as_str().to_string(),
                timeout,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replay_consumes_through_match() {
        let mut session = ReplaySession::new("first marker second marker tail");
        let re = Regex::new("marker").unwrap();

        assert_eq!(session.expect(&re, Duration::from_secs(1)).unwrap(), "first marker");
        assert_eq!(session.expect(&re, Duration::from_secs(1)).unwrap(), " second marker");
        assert_eq!(session.remaining(), " tail");
    }

    #[test]
    fn test_replay_timeout_when_no_match() {
        let mut session = ReplaySession::new("nothing here");
        let re = Regex::new("marker").unwrap();

        let err = session.expect(&re, Duration::from_secs(3)).unwrap_err();
        assert!(matches!(err, SessionError::Timeout { ref pattern, timeout } if pattern == "marker" && timeout == Duration::from_secs(3)));
        assert_eq!(session.remaining(), "nothing here");
    }

    #[test]
    fn test_replay_records_writes() {
        let mut session = ReplaySession::new("");
        session.write(b"\x1b[B").unwrap();
        session.write(b"\r").unwrap();
        assert_eq!(session.written(), b"\x1b[B\r");
    }

    #[test]
    fn test_session_usable_through_mut_ref() {
        fn drive(mut session: impl ConsoleSession) {
            session.write(b"x").unwrap();
        }

        let mut session = ReplaySession::new("");
        drive(&mut session);
        assert_eq!(session.written(), b"x");
    }
}
