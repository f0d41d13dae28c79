//! # Response Dispatcher
//!
//! Drives one debugger session: sends commands strictly one at a time and
//! routes each response to the observer views by the kind of command it
//! answers.
//!
//! ## Lifecycle
//!
//! 1. Create a transport and a response channel
//! 2. Create the dispatcher: `Dispatcher::new(transport, views, config)`
//! 3. `start()` marks the target stopped and requests a full refresh
//! 4. `submit()` commands and feed responses back with `receive()` or
//!    `run_until_idle()`
//!
//! ## Routing
//!
//! | command | update |
//! |---|---|
//! | `info registers` | register view |
//! | handshake (empty) | none |
//! | `disassemble` | disassembly view, after framing |
//! | `symbol-file`, `set`, `target` | none |
//! | `delete` | breakpoint view, deleted |
//! | `stepi`, `nexti`, `continue` | status `Stopped`, full refresh |
//! | `where` | call stack view |
//! | `break` | breakpoint view, added |
//!
//! Anything else is reported to the error sink as
//! [`SymbridgeError::UnrecognizedCommand`].

use std::collections::VecDeque;
use std::fmt;

use symbridge_core::error::{Result, SymbridgeError};
use symbridge_core::types::Address;
use tracing::{debug, error};

use crate::command::DebuggerCommand;
use crate::disassembly::{frame_disassembly, MalformedLinePolicy};
use crate::observer::Views;
use crate::reports::{parse_backtrace, parse_breakpoint_acks, parse_registers};
use crate::response::{parse_response, ParsedResponse};
use crate::transport::{RawResponse, ResponseReceiver, Transport};

/// Whether the debugged target is executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus
{
    Running,
    Stopped,
}

impl fmt::Display for RunStatus
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            Self::Running => write!(f, "Running"),
            Self::Stopped => write!(f, "Stopped"),
        }
    }
}

/// Request/response state of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState
{
    /// Nothing in flight; the next command may be sent.
    Idle,
    /// The given command was sent and its response has not arrived yet.
    AwaitingResponse(String),
    /// The connection is gone. Terminal.
    Disconnected,
}

/// Dispatcher settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherConfig
{
    /// What disassembly framing does with lines it cannot parse.
    pub malformed_lines: MalformedLinePolicy,
    /// Commands queued for a full refresh, after every stop.
    pub refresh_commands: Vec<String>,
}

impl Default for DispatcherConfig
{
    fn default() -> Self
    {
        Self {
            malformed_lines: MalformedLinePolicy::Abort,
            refresh_commands: vec!["info registers".to_string(), "where".to_string()],
        }
    }
}

/// Response dispatcher for one session.
pub struct Dispatcher<T: Transport>
{
    transport: T,
    views: Views,
    config: DispatcherConfig,
    state: SessionState,
    status: RunStatus,
    current_function: Option<String>,
    queue: VecDeque<String>,
}

impl<T: Transport> Dispatcher<T>
{
    pub fn new(transport: T, views: Views, config: DispatcherConfig) -> Self
    {
        Self {
            transport,
            views,
            config,
            state: SessionState::Idle,
            status: RunStatus::Stopped,
            current_function: None,
            queue: VecDeque::new(),
        }
    }

    pub fn state(&self) -> &SessionState
    {
        &self.state
    }

    pub fn status(&self) -> RunStatus
    {
        self.status
    }

    /// Function named by the most recent `disassemble` response.
    pub fn current_function(&self) -> Option<&str>
    {
        self.current_function.as_deref()
    }

    pub fn transport(&self) -> &T
    {
        &self.transport
    }

    /// Number of submitted commands not sent yet.
    pub fn queued(&self) -> usize
    {
        self.queue.len()
    }

    /// `true` when nothing is in flight and nothing is queued.
    pub fn is_idle(&self) -> bool
    {
        self.state == SessionState::Idle && self.queue.is_empty()
    }

    /// Begin the session on an established connection.
    ///
    /// ## Errors
    ///
    /// [`SymbridgeError::TransportLost`] if the transport never connected.
    pub fn start(&mut self) -> Result<()>
    {
        if !self.transport.is_connected() {
            self.state = SessionState::Disconnected;
            return Err(SymbridgeError::TransportLost("could not connect to debugger".to_string()));
        }
        debug!("Debugger connected, requesting initial refresh");
        self.set_status(RunStatus::Stopped);
        self.refresh()
    }

    /// Send a command right now.
    ///
    /// `stepi`, `nexti` and `continue` mark the target running before they go out.
    ///
    /// ## Errors
    ///
    /// - [`SymbridgeError::CommandInFlight`] while another command awaits its response
    /// - [`SymbridgeError::TransportLost`] once the session is disconnected
    pub fn send(&mut self, command: &str) -> Result<()>
    {
        match &self.state {
            SessionState::Idle => {}
            SessionState::AwaitingResponse(_) => return Err(SymbridgeError::CommandInFlight(command.to_string())),
            SessionState::Disconnected => {
                return Err(SymbridgeError::TransportLost("session is disconnected".to_string()));
            }
        }

        if DebuggerCommand::parse(command).is_ok_and(|parsed| parsed.resumes_target()) {
            self.set_status(RunStatus::Running);
        }

        debug!("Sending {:?}", command);
        self.state = SessionState::AwaitingResponse(command.to_string());
        if let Err(err) = self.transport.send(command) {
            self.state = if err.is_terminal() {
                SessionState::Disconnected
            } else {
                SessionState::Idle
            };
            return Err(err);
        }
        Ok(())
    }

    /// Send `command` now if the session is idle, otherwise queue it behind
    /// the pending response.
    pub fn submit(&mut self, command: impl Into<String>) -> Result<()>
    {
        let command = command.into();
        match self.state {
            SessionState::Disconnected => Err(SymbridgeError::TransportLost("session is disconnected".to_string())),
            SessionState::Idle if self.queue.is_empty() => self.send(&command),
            _ => {
                self.queue.push_back(command);
                Ok(())
            }
        }
    }

    pub fn step_into(&mut self) -> Result<()>
    {
        self.submit(DebuggerCommand::StepInstruction.to_string())
    }

    pub fn step_over(&mut self) -> Result<()>
    {
        self.submit(DebuggerCommand::NextInstruction.to_string())
    }

    pub fn resume(&mut self) -> Result<()>
    {
        self.submit(DebuggerCommand::Continue.to_string())
    }

    /// Request a disassembly of `label`; an empty label disassembles around the pc.
    pub fn disassemble(&mut self, label: &str) -> Result<()>
    {
        self.current_function = None;
        self.submit(
            DebuggerCommand::Disassemble {
                target: label.trim().to_string(),
            }
            .to_string(),
        )
    }

    /// Set a breakpoint on the instruction at `address`.
    pub fn break_at(&mut self, address: Address) -> Result<()>
    {
        self.submit(DebuggerCommand::break_at(address).to_string())
    }

    /// Queue every configured refresh command.
    pub fn refresh(&mut self) -> Result<()>
    {
        for command in self.config.refresh_commands.clone() {
            self.submit(command)?;
        }
        Ok(())
    }

    /// Handle one completed round-trip, then send the next queued command.
    ///
    /// Routing failures go to the error sink; only transport failures while
    /// sending the next command are returned.
    pub fn receive(&mut self, raw: RawResponse) -> Result<()>
    {
        let response = parse_response(&raw.echo, &raw.lines);
        if matches!(self.state, SessionState::AwaitingResponse(_)) {
            self.state = SessionState::Idle;
        }

        self.views.log.log(&response);
        if let Err(err) = self.dispatch(&response) {
            error!("Failed to handle response to {:?}: {}", response.command, err);
            self.views.errors.report(&err);
        }

        self.pump()
    }

    /// Route one parsed response to the views.
    ///
    /// ## Errors
    ///
    /// - [`SymbridgeError::UnrecognizedCommand`] for a command kind the bridge does not know
    /// - [`SymbridgeError::ParseError`] for a bad disassembly line under
    ///   [`MalformedLinePolicy::Abort`]
    pub fn dispatch(&mut self, response: &ParsedResponse) -> Result<()>
    {
        let command = DebuggerCommand::parse(&response.command)?;
        debug!("Routing {} response line(s) for {:?}", response.lines.len(), response.command);

        match command {
            DebuggerCommand::Handshake
            | DebuggerCommand::SymbolFile { .. }
            | DebuggerCommand::Set { .. }
            | DebuggerCommand::Target { .. } => {}
            DebuggerCommand::InfoRegisters => {
                self.views.registers.registers_updated(&parse_registers(&response.lines));
            }
            DebuggerCommand::Disassemble { .. } => {
                let listing = frame_disassembly(response, self.config.malformed_lines)?;
                self.current_function.clone_from(&listing.function);
                self.views.disassembly.disassembly_updated(&listing);
            }
            DebuggerCommand::Delete { selection } => self.views.breakpoints.breakpoints_deleted(&selection),
            DebuggerCommand::StepInstruction | DebuggerCommand::NextInstruction | DebuggerCommand::Continue => {
                self.set_status(RunStatus::Stopped);
                self.views.session.refresh_all();
                self.queue.extend(self.config.refresh_commands.iter().cloned());
            }
            DebuggerCommand::Where => {
                self.views.call_stack.call_stack_updated(&parse_backtrace(&response.lines));
            }
            DebuggerCommand::Break { location } => {
                self.views
                    .breakpoints
                    .breakpoint_added(&location, &parse_breakpoint_acks(&response.lines));
            }
        }
        Ok(())
    }

    /// Send the next queued command if the session is idle.
    pub fn pump(&mut self) -> Result<()>
    {
        if self.state != SessionState::Idle {
            return Ok(());
        }
        match self.queue.pop_front() {
            Some(next) => self.send(&next),
            None => Ok(()),
        }
    }

    /// Receive responses until nothing is in flight or queued.
    ///
    /// ## Errors
    ///
    /// [`SymbridgeError::TransportLost`] when the session is or becomes
    /// disconnected, including when the channel closes first.
    pub fn run_until_idle(&mut self, responses: &ResponseReceiver) -> Result<()>
    {
        while !self.is_idle() {
            if self.state == SessionState::Disconnected {
                return Err(SymbridgeError::TransportLost("session is disconnected".to_string()));
            }
            self.pump()?;
            if self.state == SessionState::Idle {
                continue;
            }
            match responses.recv() {
                Ok(raw) => self.receive(raw)?,
                Err(_) => {
                    self.state = SessionState::Disconnected;
                    return Err(SymbridgeError::TransportLost("response channel closed".to_string()));
                }
            }
        }
        Ok(())
    }

    /// Handle every response already waiting on the channel without blocking.
    pub fn drain(&mut self, responses: &ResponseReceiver) -> Result<()>
    {
        while let Ok(raw) = responses.try_recv() {
            self.receive(raw)?;
        }
        Ok(())
    }

    fn set_status(&mut self, status: RunStatus)
    {
        self.status = status;
        self.views.session.status_changed(status);
    }
}

impl<T: Transport + fmt::Debug> fmt::Debug for Dispatcher<T>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("Dispatcher")
            .field("transport", &self.transport)
            .field("state", &self.state)
            .field("status", &self.status)
            .field("current_function", &self.current_function)
            .field("queue", &self.queue)
            .finish_non_exhaustive()
    }
}
