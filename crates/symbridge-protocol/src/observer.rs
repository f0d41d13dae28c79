//! # Observer Views
//!
//! Sinks the dispatcher delivers typed updates to. The dispatcher knows
//! nothing about how a view presents its data: a console printer, a test
//! recorder and a full front end all plug in the same way.
//!
//! Every view is optional. [`Views::default`] wires a [`NoopView`] into each
//! slot, and the `with_*` builders replace individual slots:
//!
//! ```rust
//! use symbridge_protocol::observer::{LogView, Views};
//! use symbridge_protocol::response::ParsedResponse;
//!
//! struct PrintLog;
//!
//! impl LogView for PrintLog
//! {
//!     fn log(&mut self, response: &ParsedResponse)
//!     {
//!         println!("> {}", response.command);
//!     }
//! }
//!
//! let views = Views::default().with_log(PrintLog);
//! ```

use symbridge_core::error::SymbridgeError;

use crate::command::BreakpointSelection;
use crate::dispatcher::RunStatus;
use crate::disassembly::DisassemblyListing;
use crate::reports::{BacktraceFrame, BreakpointAck, RegisterValue};
use crate::response::ParsedResponse;

/// Receives `info registers` results.
pub trait RegisterView
{
    fn registers_updated(&mut self, registers: &[RegisterValue]);
}

/// Receives `where` results.
pub trait CallStackView
{
    fn call_stack_updated(&mut self, frames: &[BacktraceFrame]);
}

/// Receives breakpoint acknowledgements.
pub trait BreakpointView
{
    /// A `break` command was acknowledged.
    fn breakpoint_added(&mut self, location: &str, acks: &[BreakpointAck]);

    /// A `delete` command was acknowledged.
    fn breakpoints_deleted(&mut self, selection: &BreakpointSelection);
}

/// Receives framed `disassemble` results.
pub trait DisassemblyView
{
    fn disassembly_updated(&mut self, listing: &DisassemblyListing);
}

/// Receives every parsed response before it is routed.
pub trait LogView
{
    fn log(&mut self, response: &ParsedResponse);
}

/// Top-level sink for errors raised while dispatching a response.
pub trait ErrorSink
{
    fn report(&mut self, error: &SymbridgeError);
}

/// Receives session-wide state changes.
pub trait SessionView
{
    /// The target started running or stopped.
    fn status_changed(&mut self, status: RunStatus);

    /// Every view should be brought up to date with the stopped target.
    fn refresh_all(&mut self);
}

/// View that ignores every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopView;

impl RegisterView for NoopView
{
    fn registers_updated(&mut self, _registers: &[RegisterValue]) {}
}

impl CallStackView for NoopView
{
    fn call_stack_updated(&mut self, _frames: &[BacktraceFrame]) {}
}

impl BreakpointView for NoopView
{
    fn breakpoint_added(&mut self, _location: &str, _acks: &[BreakpointAck]) {}

    fn breakpoints_deleted(&mut self, _selection: &BreakpointSelection) {}
}

impl DisassemblyView for NoopView
{
    fn disassembly_updated(&mut self, _listing: &DisassemblyListing) {}
}

impl LogView for NoopView
{
    fn log(&mut self, _response: &ParsedResponse) {}
}

impl ErrorSink for NoopView
{
    fn report(&mut self, _error: &SymbridgeError) {}
}

impl SessionView for NoopView
{
    fn status_changed(&mut self, _status: RunStatus) {}

    fn refresh_all(&mut self) {}
}

/// The set of views one dispatcher publishes to.
pub struct Views
{
    pub registers: Box<dyn RegisterView>,
    pub call_stack: Box<dyn CallStackView>,
    pub breakpoints: Box<dyn BreakpointView>,
    pub disassembly: Box<dyn DisassemblyView>,
    pub log: Box<dyn LogView>,
    pub errors: Box<dyn ErrorSink>,
    pub session: Box<dyn SessionView>,
}

impl Default for Views
{
    fn default() -> Self
    {
        Self {
            registers: Box::new(NoopView),
            call_stack: Box::new(NoopView),
            breakpoints: Box::new(NoopView),
            disassembly: Box::new(NoopView),
            log: Box::new(NoopView),
            errors: Box::new(NoopView),
            session: Box::new(NoopView),
        }
    }
}

impl Views
{
    #[must_use]
    pub fn with_registers(mut self, view: impl RegisterView + 'static) -> Self
    {
        self.registers = Box::new(view);
        self
    }

    #[must_use]
    pub fn with_call_stack(mut self, view: impl CallStackView + 'static) -> Self
    {
        self.call_stack = Box::new(view);
        self
    }

    #[must_use]
    pub fn with_breakpoints(mut self, view: impl BreakpointView + 'static) -> Self
    {
        self.breakpoints = Box::new(view);
        self
    }

    #[must_use]
    pub fn with_disassembly(mut self, view: impl DisassemblyView + 'static) -> Self
    {
        self.disassembly = Box::new(view);
        self
    }

    #[must_use]
    pub fn with_log(mut self, view: impl LogView + 'static) -> Self
    {
        self.log = Box::new(view);
        self
    }

    #[must_use]
    pub fn with_errors(mut self, sink: impl ErrorSink + 'static) -> Self
    {
        self.errors = Box::new(sink);
        self
    }

    #[must_use]
    pub fn with_session(mut self, view: impl SessionView + 'static) -> Self
    {
        self.session = Box::new(view);
        self
    }
}

impl std::fmt::Debug for Views
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("Views").finish_non_exhaustive()
    }
}
