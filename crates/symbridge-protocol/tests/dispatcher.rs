//! Tests for the response dispatcher

use std::cell::RefCell;
use std::rc::Rc;

use symbridge_core::error::SymbridgeError;
use symbridge_core::types::Address;
use symbridge_protocol::command::BreakpointSelection;
use symbridge_protocol::disassembly::{DisassemblyListing, MalformedLinePolicy};
use symbridge_protocol::dispatcher::{Dispatcher, DispatcherConfig, RunStatus, SessionState};
use symbridge_protocol::observer::{
    BreakpointView, CallStackView, DisassemblyView, ErrorSink, LogView, RegisterView, SessionView, Views,
};
use symbridge_protocol::reports::{BacktraceFrame, BreakpointAck, RegisterValue};
use symbridge_protocol::response::{parse_response, ParsedResponse};
use symbridge_protocol::transport::{
    parse_transcript, response_channel, RawResponse, ResponseReceiver, ScriptedTransport, Transport,
};

/// Records every observer call as one line of text.
#[derive(Clone, Default)]
struct Recorder
{
    calls: Rc<RefCell<Vec<String>>>,
}

impl Recorder
{
    fn push(&self, call: String)
    {
        self.calls.borrow_mut().push(call);
    }

    fn calls(&self) -> Vec<String>
    {
        self.calls.borrow().clone()
    }

    fn clear(&self)
    {
        self.calls.borrow_mut().clear();
    }

    fn views(&self) -> Views
    {
        Views::default()
            .with_registers(self.clone())
            .with_call_stack(self.clone())
            .with_breakpoints(self.clone())
            .with_disassembly(self.clone())
            .with_errors(self.clone())
            .with_session(self.clone())
    }
}

impl RegisterView for Recorder
{
    fn registers_updated(&mut self, registers: &[RegisterValue])
    {
        let names: Vec<&str> = registers.iter().map(|r| r.name.as_str()).collect();
        self.push(format!("registers {}", names.join(",")));
    }
}

impl CallStackView for Recorder
{
    fn call_stack_updated(&mut self, frames: &[BacktraceFrame])
    {
        let names: Vec<&str> = frames.iter().map(|f| f.function.as_str()).collect();
        self.push(format!("call_stack {}", names.join(",")));
    }
}

impl BreakpointView for Recorder
{
    fn breakpoint_added(&mut self, location: &str, acks: &[BreakpointAck])
    {
        self.push(format!("breakpoint_added {} {}", location, acks.len()));
    }

    fn breakpoints_deleted(&mut self, selection: &BreakpointSelection)
    {
        self.push(format!("breakpoints_deleted {:?}", selection));
    }
}

impl DisassemblyView for Recorder
{
    fn disassembly_updated(&mut self, listing: &DisassemblyListing)
    {
        self.push(format!(
            "disassembly {} {}",
            listing.function.as_deref().unwrap_or("-"),
            listing.lines.len()
        ));
    }
}

impl LogView for Recorder
{
    fn log(&mut self, response: &ParsedResponse)
    {
        self.push(format!("log {:?}", response.command));
    }
}

impl ErrorSink for Recorder
{
    fn report(&mut self, error: &SymbridgeError)
    {
        self.push(format!("error {}", error));
    }
}

impl SessionView for Recorder
{
    fn status_changed(&mut self, status: RunStatus)
    {
        self.push(format!("status {}", status));
    }

    fn refresh_all(&mut self)
    {
        self.push("refresh_all".to_string());
    }
}

fn dispatcher(recorder: &Recorder, transcript: &str) -> (Dispatcher<ScriptedTransport>, ResponseReceiver)
{
    let (tx, rx) = response_channel();
    let transport = ScriptedTransport::new(parse_transcript(transcript).unwrap(), tx).unwrap();
    (Dispatcher::new(transport, recorder.views(), DispatcherConfig::default()), rx)
}

#[test]
fn test_disassembly_response_is_framed()
{
    let recorder = Recorder::default();
    let (mut dispatcher, _rx) = dispatcher(&recorder, "");

    let response = parse_response(
        "disassemble main",
        &[
            "Dump of assembler code for function main:",
            "0x00001000 <main+0>:\\tmov eax,1",
            "0x00001004 <main+4>:\\tret",
            "End of assembler dump.",
        ],
    );
    dispatcher.dispatch(&response).unwrap();

    assert_eq!(recorder.calls(), ["disassembly main 2"]);
    assert_eq!(dispatcher.current_function(), Some("main"));
}

#[test]
fn test_unrecognized_verb_is_an_error()
{
    let recorder = Recorder::default();
    let (mut dispatcher, _rx) = dispatcher(&recorder, "");

    let response = parse_response("foobar --now", &[] as &[&str]);
    match dispatcher.dispatch(&response) {
        Err(SymbridgeError::UnrecognizedCommand(text)) => assert_eq!(text, "foobar --now"),
        other => panic!("Expected UnrecognizedCommand, got {:?}", other),
    }
    assert!(recorder.calls().is_empty());
}

#[test]
fn test_unrecognized_verb_goes_to_error_sink()
{
    let recorder = Recorder::default();
    let (mut dispatcher, _rx) = dispatcher(&recorder, "");

    dispatcher.receive(RawResponse::new("foobar 1", ["x"])).unwrap();

    assert_eq!(recorder.calls(), ["error Unrecognized command response: foobar 1"]);
    assert_eq!(dispatcher.state(), &SessionState::Idle);
}

#[test]
fn test_empty_command_is_a_no_op()
{
    let recorder = Recorder::default();
    let (mut dispatcher, _rx) = dispatcher(&recorder, "");

    dispatcher.dispatch(&parse_response("", &["GNU gdb 7.2"])).unwrap();
    assert!(recorder.calls().is_empty());
}

#[test]
fn test_acknowledged_commands_make_no_update()
{
    let recorder = Recorder::default();
    let (mut dispatcher, _rx) = dispatcher(&recorder, "");

    for command in ["symbol-file kernel.obj", "set architecture i386", "target remote :8832"] {
        dispatcher.dispatch(&parse_response(command, &["ok"])).unwrap();
    }
    assert!(recorder.calls().is_empty());
}

#[test]
fn test_delete_forms_reach_breakpoint_view()
{
    let recorder = Recorder::default();
    let (mut dispatcher, _rx) = dispatcher(&recorder, "");

    for command in ["delete 1-3", "delete breakpoints 2", "delete", "delete $bpnum"] {
        dispatcher.dispatch(&parse_response(command, &[] as &[&str])).unwrap();
    }
    assert_eq!(
        recorder.calls(),
        [
            "breakpoints_deleted Numbers([1, 2, 3])",
            "breakpoints_deleted Numbers([2])",
            "breakpoints_deleted All",
            "breakpoints_deleted Other(\"$bpnum\")",
        ]
    );
}

#[test]
fn test_blank_command_is_unrecognized()
{
    let recorder = Recorder::default();
    let (mut dispatcher, _rx) = dispatcher(&recorder, "");

    assert!(matches!(
        dispatcher.dispatch(&parse_response("  ", &[] as &[&str])),
        Err(SymbridgeError::UnrecognizedCommand(_))
    ));
}

#[test]
fn test_handshake_while_awaiting_returns_to_idle()
{
    let recorder = Recorder::default();
    let (mut dispatcher, _rx) = dispatcher(&recorder, "");

    dispatcher.send("where").unwrap();
    assert_eq!(dispatcher.state(), &SessionState::AwaitingResponse("where".to_string()));

    dispatcher.receive(RawResponse::new("", Vec::<String>::new())).unwrap();
    assert_eq!(dispatcher.state(), &SessionState::Idle);
    assert!(recorder.calls().is_empty());
}

#[test]
fn test_stepi_stops_and_refreshes()
{
    let recorder = Recorder::default();
    let (mut dispatcher, rx) = dispatcher(&recorder, "> stepi\n0x00001004 in main ()\n");

    dispatcher.step_into().unwrap();
    assert_eq!(dispatcher.status(), RunStatus::Running);
    assert_eq!(dispatcher.state(), &SessionState::AwaitingResponse("stepi".to_string()));

    let raw = rx.recv().unwrap();
    dispatcher.receive(raw).unwrap();

    assert_eq!(dispatcher.status(), RunStatus::Stopped);
    assert_eq!(
        recorder.calls(),
        ["status Running", "status Stopped", "refresh_all"]
    );
    // The refresh commands follow, one at a time.
    assert_eq!(dispatcher.transport().sent(), ["stepi", "info registers"]);
    assert_eq!(dispatcher.queued(), 1);
}

#[test]
fn test_one_command_in_flight()
{
    let recorder = Recorder::default();
    let (mut dispatcher, rx) = dispatcher(&recorder, "");

    dispatcher.send("where").unwrap();
    assert!(matches!(dispatcher.send("stepi"), Err(SymbridgeError::CommandInFlight(_))));

    dispatcher.submit("stepi").unwrap();
    assert_eq!(dispatcher.queued(), 1);
    assert_eq!(dispatcher.transport().sent(), ["where"]);

    dispatcher.receive(rx.recv().unwrap()).unwrap();
    assert_eq!(dispatcher.transport().sent(), ["where", "stepi"]);
    assert_eq!(dispatcher.queued(), 0);
}

#[test]
fn test_session_run_routes_every_response()
{
    let transcript = "\
>
GNU gdb 7.2
> info registers
eax            0x1\\t1
eip            0x1004\\t0x1004 <main+4>
> where
#0  0x00001004 in main ()
#1  0x00002000 in Kernel_Start ()
> break *0x00001010
Breakpoint 1 at 0x1010
> delete 1
> disassemble main
Dump of assembler code for function main:
0x00001000 <main+0>:\\tmov eax,1
End of assembler dump.
";
    let recorder = Recorder::default();
    let (mut dispatcher, rx) = dispatcher(&recorder, transcript);

    dispatcher.drain(&rx).unwrap();
    dispatcher.start().unwrap();
    dispatcher.run_until_idle(&rx).unwrap();
    dispatcher.break_at(Address::new(0x1010)).unwrap();
    dispatcher.submit("delete 1").unwrap();
    dispatcher.disassemble(" main ").unwrap();
    dispatcher.run_until_idle(&rx).unwrap();

    assert_eq!(
        recorder.calls(),
        [
            "status Stopped",
            "registers eax,eip",
            "call_stack main,Kernel_Start",
            "breakpoint_added *0x00001010 1",
            "breakpoints_deleted Numbers([1])",
            "disassembly main 1",
        ]
    );
    assert_eq!(
        dispatcher.transport().sent(),
        ["info registers", "where", "break *0x00001010", "delete 1", "disassemble main"]
    );
    assert!(dispatcher.is_idle());
    assert_eq!(dispatcher.transport().remaining(), 0);
}

#[test]
fn test_log_view_sees_every_response()
{
    let recorder = Recorder::default();
    let (tx, rx) = response_channel();
    let transport = ScriptedTransport::new(parse_transcript(">\n> where\n").unwrap(), tx).unwrap();
    let views = Views::default().with_log(recorder.clone());
    let mut dispatcher = Dispatcher::new(transport, views, DispatcherConfig::default());

    dispatcher.drain(&rx).unwrap();
    dispatcher.send("where").unwrap();
    dispatcher.run_until_idle(&rx).unwrap();

    assert_eq!(recorder.calls(), ["log \"\"", "log \"where\""]);
}

#[test]
fn test_malformed_disassembly_policy()
{
    let lines = ["Dump of assembler code for function f:", "junk", "0x00000010:\\tret", "End of assembler dump."];

    let recorder = Recorder::default();
    let (mut strict, _rx) = dispatcher(&recorder, "");
    strict.receive(RawResponse::new("disassemble f", lines)).unwrap();
    assert!(recorder.calls()[0].starts_with("error Parse error"));

    recorder.clear();
    let (tx, _rx2) = response_channel();
    let transport = ScriptedTransport::new(Vec::new(), tx).unwrap();
    let config = DispatcherConfig {
        malformed_lines: MalformedLinePolicy::Skip,
        ..DispatcherConfig::default()
    };
    let mut lenient = Dispatcher::new(transport, recorder.views(), config);
    lenient.receive(RawResponse::new("disassemble f", lines)).unwrap();
    assert_eq!(recorder.calls(), ["disassembly f 1"]);
}

#[test]
fn test_start_without_connection()
{
    let recorder = Recorder::default();
    let (tx, _rx) = response_channel();
    let mut dispatcher = Dispatcher::new(ScriptedTransport::offline(tx), recorder.views(), DispatcherConfig::default());

    assert!(matches!(dispatcher.start(), Err(SymbridgeError::TransportLost(_))));
    assert_eq!(dispatcher.state(), &SessionState::Disconnected);
    assert!(matches!(dispatcher.submit("where"), Err(SymbridgeError::TransportLost(_))));
}

#[test]
fn test_closed_channel_disconnects_session()
{
    let recorder = Recorder::default();
    let (tx, rx) = response_channel();
    let transport = ScriptedTransport::new(Vec::new(), tx).unwrap();
    let mut dispatcher = Dispatcher::new(transport, recorder.views(), DispatcherConfig::default());

    dispatcher.send("where").unwrap();
    // Answer lost; the dispatcher now listens on a channel nobody can send to.
    let _ = rx.recv().unwrap();
    let (unused_tx, empty_rx) = response_channel();
    drop(unused_tx);

    assert!(matches!(dispatcher.run_until_idle(&empty_rx), Err(SymbridgeError::TransportLost(_))));
    assert_eq!(dispatcher.state(), &SessionState::Disconnected);
}

/// Accepts the first command, then reports the connection lost.
struct FailsAfterFirst
{
    sends: usize,
}

impl Transport for FailsAfterFirst
{
    fn send(&mut self, _command: &str) -> Result<(), SymbridgeError>
    {
        self.sends += 1;
        if self.sends > 1 {
            return Err(SymbridgeError::TransportLost("debugger exited".to_string()));
        }
        Ok(())
    }

    fn is_connected(&self) -> bool
    {
        self.sends <= 1
    }
}

#[test]
fn test_run_until_idle_stops_once_disconnected()
{
    let recorder = Recorder::default();
    let (tx, rx) = response_channel();
    let transport = FailsAfterFirst { sends: 0 };
    let mut dispatcher = Dispatcher::new(transport, recorder.views(), DispatcherConfig::default());

    dispatcher.send("where").unwrap();
    dispatcher.submit("stepi").unwrap();
    dispatcher.submit("nexti").unwrap();
    tx.send(RawResponse::new("where", ["#0  0x00001000 in main ()"])).unwrap();

    assert!(matches!(dispatcher.run_until_idle(&rx), Err(SymbridgeError::TransportLost(_))));
    assert_eq!(dispatcher.state(), &SessionState::Disconnected);
    assert_eq!(dispatcher.queued(), 1);

    // The sender is still alive, so a blocking receive would never return.
    assert!(matches!(dispatcher.run_until_idle(&rx), Err(SymbridgeError::TransportLost(_))));
}
