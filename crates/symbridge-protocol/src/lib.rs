//! # symbridge-protocol
//!
//! The debugger side of symbridge: talks to an external line-oriented
//! debugger (gdb) and turns its responses into typed updates.
//!
//! - [`escape`]: the wire escaping of tabs, newlines and backslashes
//! - [`response`]: unescaped echo + output lines for one round-trip
//! - [`disassembly`]: instruction line parsing and header/footer framing
//! - [`command`]: the closed set of command kinds
//! - [`reports`]: register, backtrace and breakpoint payloads
//! - [`observer`]: the views updates are delivered to
//! - [`transport`]: the connection seam and a scripted transport
//! - [`dispatcher`]: the request/response state machine tying it together

pub mod command;
pub mod disassembly;
pub mod dispatcher;
pub mod escape;
pub mod observer;
pub mod reports;
pub mod response;
pub mod transport;

pub use command::{BreakpointSelection, DebuggerCommand};
pub use disassembly::{frame_disassembly, parse_disassembly_line, DisassemblyLine, DisassemblyListing, MalformedLinePolicy};
pub use dispatcher::{Dispatcher, DispatcherConfig, RunStatus, SessionState};
pub use escape::{escape, unescape};
pub use observer::Views;
pub use response::{parse_response, ParsedResponse};
pub use transport::{parse_transcript, read_transcript, response_channel, RawResponse, ScriptedTransport, Transport};
