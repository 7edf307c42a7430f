//! Telnet console client.
//!
//! Console servers speak telnet in front of the serial line. The client
//! refuses every option the server offers, strips negotiation from the
//! inbound stream, and buffers text until a pattern is expected.

use crate::session::ConsoleSession;
use crate::SessionError;
use regex::Regex;
use std::io::{ErrorKind, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

const IAC: u8 = 255;
const DONT: u8 = 254;
const DO: u8 = 253;
const WONT: u8 = 252;
const WILL: u8 = 251;
const SB: u8 = 250;
const SE: u8 = 240;

/// How long a single read may block before the expect deadline is checked.
const READ_SLICE: Duration = Duration::from_millis(200);

const READ_CHUNK: usize = 4096;

/// Position inside the telnet command stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TelnetState {
    Data,
    /// Saw IAC
    Command,
    /// Saw IAC DO/DONT/WILL/WONT, waiting for the option byte
    Negotiate(u8),
    /// Inside IAC SB ... IAC SE
    Subnegotiation,
    /// Saw IAC inside a subnegotiation
    SubnegotiationCommand,
}

/// Telnet session over any byte stream.
#[derive(Debug)]
pub struct TelnetSession<S: Read + Write> {
    stream: S,
    state: TelnetState,
    /// Decoded text not yet returned by `expect`
    buffer: String,
    /// Trailing bytes of a UTF-8 sequence split across reads
    pending: Vec<u8>,
}

impl TelnetSession<TcpStream> {
    /// Connect to a console server port.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Io`] when the host cannot be resolved or
    /// reached within `connect_timeout`.
    pub fn connect(host: &str, port: u16, connect_timeout: Duration) -> Result<Self, SessionError> {
        let addr = (host, port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| std::io::Error::new(ErrorKind::NotFound, format!("Cannot resolve {}", host)))?;

        let stream = TcpStream::connect_timeout(&addr, connect_timeout)?;
        stream.set_read_timeout(Some(READ_SLICE))?;
        stream.set_nodelay(true)?;
        info!(target: "biosnav::session", "Connected to console {}:{}", host, port);
        Ok(Self::new(stream))
    }
}

impl<S: Read + Write> TelnetSession<S> {
    /// Wrap an already connected stream.
    ///
    /// Reads on the stream should time out periodically so `expect` can
    /// honor its deadline.
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            state: TelnetState::Data,
            buffer: String::new(),
            pending: Vec::new(),
        }
    }

    /// Decoded text received but not yet consumed.
    pub fn buffered(&self) -> &str {
        &self.buffer
    }

    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Read one chunk from the stream. Returns the number of raw bytes read.
    fn fill(&mut self) -> Result<usize, SessionError> {
        let mut chunk = [0u8; READ_CHUNK];
        let read = self.stream.read(&mut chunk)?;
        if read == 0 {
            return Ok(0);
        }

        let (data, replies) = self.decode(&chunk[..read]);
        if !replies.is_empty() {
            trace!(target: "biosnav::session", "Refusing telnet options {:?}", replies);
            self.stream.write_all(&replies)?;
            self.stream.flush()?;
        }
        self.push_text(&data);
        Ok(read)
    }

    /// Append decoded bytes to the text buffer. An incomplete sequence at
    /// the end waits for the next read; invalid bytes become U+FFFD.
    fn push_text(&mut self, data: &[u8]) {
        self.pending.extend_from_slice(data);

        let mut start = 0;
        while start < self.pending.len() {
            match std::str::from_utf8(&self.pending[start..]) {
                Ok(text) => {
                    self.buffer.push_str(text);
                    start = self.pending.len();
                }
                Err(e) => {
                    let valid = start + e.valid_up_to();
                    self.buffer
                        .push_str(std::str::from_utf8(&self.pending[start..valid]).unwrap_or_default());
                    match e.error_len() {
                        Some(len) => {
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            start = valid + len;
                        }
                        None => {
                            start = valid;
                            break;
                        }
                    }
                }
            }
        }

        self.pending.drain(..start);
    }

    /// Separate text from telnet commands, producing refusals for every
    /// option request.
    fn decode(&mut self, raw: &[u8]) -> (Vec<u8>, Vec<u8>) {
        let mut data = Vec::with_capacity(raw.len());
        let mut replies = Vec::new();

        for &byte in raw {
            self.state = match (self.state, byte) {
                (TelnetState::Data, IAC) => TelnetState::Command,
                (TelnetState::Data, _) => {
                    data.push(byte);
                    TelnetState::Data
                }
                (TelnetState::Command, IAC) => {
                    data.push(IAC);
                    TelnetState::Data
                }
                (TelnetState::Command, DO | DONT | WILL | WONT) => TelnetState::Negotiate(byte),
                (TelnetState::Command, SB) => TelnetState::Subnegotiation,
                (TelnetState::Command, _) => TelnetState::Data,
                (TelnetState::Negotiate(verb), option) => {
                    match verb {
                        DO => replies.extend_from_slice(&[IAC, WONT, option]),
                        WILL => replies.extend_from_slice(&[IAC, DONT, option]),
                        _ => {}
                    }
                    TelnetState::Data
                }
                (TelnetState::Subnegotiation, IAC) => TelnetState::SubnegotiationCommand,
                (TelnetState::Subnegotiation, _) => TelnetState::Subnegotiation,
                (TelnetState::SubnegotiationCommand, SE) => TelnetState::Data,
                (TelnetState::SubnegotiationCommand, _) => TelnetState::Subnegotiation,
            };
        }

        (data, replies)
    }

    /// Remove and return the buffer up to and including the first match.
    fn take_match(&mut self, pattern: &Regex) -> Option<String> {
        let end = pattern.find(&self.buffer)?.end();
        let rest = self.buffer.split_off(end);
        Some(std::mem::replace(&mut self.buffer, rest))
    }
}

impl<S: Read + Write> ConsoleSession for TelnetSession<S> {
    fn write(&mut self, bytes: &[u8]) -> Result<(), SessionError> {
        let mut escaped = Vec::with_capacity(bytes.len());
        for &byte in bytes {
            escaped.push(byte);
            if byte == IAC {
                escaped.push(IAC);
            }
        }
        self.stream.write_all(&escaped)?;
        self.stream.flush()?;
        Ok(())
    }

    fn expect(&mut self, pattern: &Regex, timeout: Duration) -> Result<String, SessionError> {
        let deadline = Instant::now() + timeout;

        loop {
            if let Some(matched) = self.take_match(pattern) {
                trace!(target: "biosnav::session", "Matched {} after {} bytes", pattern, matched.len());
                return Ok(matched);
            }

            if Instant::now() >= deadline {
                debug!(target: "biosnav::session", "Timed out waiting for {}", pattern);
                return Err(SessionError::Timeout {
                    pattern: pattern.as_str().to_string(),
                    timeout,
                });
            }

            match self.fill() {
                Ok(0) => return Err(SessionError::Closed),
                Ok(_) => {}
                Err(SessionError::Io(e))
                    if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted) => {}
                Err(e) => return Err(e),
            }
        }
    }
}
