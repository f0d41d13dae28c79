//! # Transport
//!
//! Seam between the dispatcher and whatever carries text to and from the
//! external debugger process.
//!
//! Commands go out through [`Transport::send`]. Completed round-trips come
//! back as [`RawResponse`]s on a response channel, which the dispatcher drains
//! (see [`crate::dispatcher::Dispatcher::run_until_idle`]). Detecting a hung
//! or dead debugger is the transport's job; it signals that by failing `send`
//! with [`SymbridgeError::TransportLost`] or by dropping its sender.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::mpsc;

use symbridge_core::error::{Result, SymbridgeError};
use tracing::debug;

use crate::escape::{escape, unescape};

/// Outgoing half of a debugger connection.
pub trait Transport
{
    /// Send one command line.
    ///
    /// ## Errors
    ///
    /// [`SymbridgeError::TransportLost`] when the connection is gone.
    fn send(&mut self, command: &str) -> Result<()>;

    /// `true` if the connection was established (within the retry budget the
    /// transport was created with) and has not been lost since.
    fn is_connected(&self) -> bool;
}

/// One completed round-trip as it came off the wire, still escaped.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawResponse
{
    /// Echoed command text.
    pub echo: String,
    /// Output lines.
    pub lines: Vec<String>,
}

impl RawResponse
{
    pub fn new<I, S>(echo: impl Into<String>, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            echo: echo.into(),
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }
}

/// Sender side of the response channel.
pub type ResponseSender = mpsc::Sender<RawResponse>;
/// Receiver side of the response channel.
pub type ResponseReceiver = mpsc::Receiver<RawResponse>;

/// Create a new response channel.
#[must_use]
pub fn response_channel() -> (ResponseSender, ResponseReceiver)
{
    mpsc::channel()
}

/// Parse a recorded session transcript.
///
/// A line starting with `>` opens a response; the rest of it is the echoed
/// command (a bare `>` is the connect handshake). Following lines, up to the
/// next `>`, are that response's output in wire (escaped) form.
///
/// ```text
/// >
/// > disassemble main
/// Dump of assembler code for function main:
/// 0x00001000 <main+0>:\tmov eax,1
/// End of assembler dump.
/// ```
///
/// ## Errors
///
/// [`SymbridgeError::ParseError`] for output before the first `>` line.
pub fn parse_transcript(text: &str) -> Result<Vec<RawResponse>>
{
    let mut responses: Vec<RawResponse> = Vec::new();
    for line in text.lines() {
        if let Some(echo) = line.strip_prefix('>') {
            responses.push(RawResponse {
                echo: echo.trim().to_string(),
                lines: Vec::new(),
            });
            continue;
        }

        match responses.last_mut() {
            Some(current) => current.lines.push(line.to_string()),
            None if line.trim().is_empty() => {}
            None => return Err(SymbridgeError::parse(line, "output before the first '>' command line")),
        }
    }
    Ok(responses)
}

/// Read and parse a transcript file.
///
/// ## Errors
///
/// - [`SymbridgeError::Io`] if the file cannot be read
/// - [`SymbridgeError::ParseError`] as for [`parse_transcript`]
pub fn read_transcript(path: &Path) -> Result<Vec<RawResponse>>
{
    let text = std::fs::read_to_string(path)?;
    parse_transcript(&text)
}

/// Transport that answers from a recorded transcript instead of a live debugger.
///
/// Handshake entries (empty echo) are delivered as soon as the transport is
/// created. Every sent command is answered by the first unused entry with the
/// same echo, or by an empty response when the transcript has none.
#[derive(Debug)]
pub struct ScriptedTransport
{
    pending: VecDeque<RawResponse>,
    responses: ResponseSender,
    connected: bool,
    sent: Vec<String>,
}

impl ScriptedTransport
{
    /// Create a connected transport and deliver its handshake responses.
    ///
    /// ## Errors
    ///
    /// [`SymbridgeError::TransportLost`] if the response receiver is already gone.
    pub fn new(transcript: Vec<RawResponse>, responses: ResponseSender) -> Result<Self>
    {
        let (handshakes, pending): (Vec<_>, Vec<_>) = transcript
            .into_iter()
            .partition(|response| response.echo.is_empty());

        let transport = Self {
            pending: pending.into(),
            responses,
            connected: true,
            sent: Vec::new(),
        };
        for handshake in handshakes {
            transport.deliver(handshake)?;
        }
        Ok(transport)
    }

    /// A transport whose connection attempts all failed.
    pub fn offline(responses: ResponseSender) -> Self
    {
        Self {
            pending: VecDeque::new(),
            responses,
            connected: false,
            sent: Vec::new(),
        }
    }

    /// Commands sent so far, in order.
    pub fn sent(&self) -> &[String]
    {
        &self.sent
    }

    /// Transcript entries no command has asked for yet.
    pub fn remaining(&self) -> usize
    {
        self.pending.len()
    }

    fn deliver(&self, response: RawResponse) -> Result<()>
    {
        self.responses
            .send(response)
            .map_err(|_| SymbridgeError::TransportLost("response receiver dropped".to_string()))
    }
}

impl Transport for ScriptedTransport
{
    fn send(&mut self, command: &str) -> Result<()>
    {
        if !self.connected {
            return Err(SymbridgeError::TransportLost("not connected".to_string()));
        }
        self.sent.push(command.to_string());

        let response = match self.pending.iter().position(|entry| unescape(&entry.echo) == command) {
            Some(index) => self.pending.remove(index).unwrap_or_default(),
            None => {
                debug!("No scripted response for {:?}, answering empty", command);
                RawResponse::new(escape(command), Vec::<String>::new())
            }
        };

        if let Err(err) = self.deliver(response) {
            self.connected = false;
            return Err(err);
        }
        Ok(())
    }

    fn is_connected(&self) -> bool
    {
        self.connected
    }
}
