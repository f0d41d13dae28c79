//! Console views used by `symbridge replay`.

use symbridge_core::error::SymbridgeError;
use symbridge_core::labels::LabelTable;
use symbridge_core::store::DebugStore;
use symbridge_protocol::command::BreakpointSelection;
use symbridge_protocol::disassembly::{DisassemblyLine, DisassemblyListing};
use symbridge_protocol::dispatcher::RunStatus;
use symbridge_protocol::observer::{
    BreakpointView, CallStackView, DisassemblyView, ErrorSink, LogView, RegisterView, SessionView, Views,
};
use symbridge_protocol::reports::{BacktraceFrame, BreakpointAck, RegisterValue};
use symbridge_protocol::response::ParsedResponse;
use tracing::{debug, warn};

/// Prints every update to stdout (errors to stderr).
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleView;

impl ConsoleView
{
    /// All views on the console; disassembly lines annotated from `annotator` if given.
    pub fn views(annotator: Option<Annotator>) -> Views
    {
        Views::default()
            .with_registers(ConsoleView)
            .with_call_stack(ConsoleView)
            .with_breakpoints(ConsoleView)
            .with_log(ConsoleView)
            .with_errors(ConsoleView)
            .with_session(ConsoleView)
            .with_disassembly(ConsoleDisassembly { annotator })
    }
}

impl RegisterView for ConsoleView
{
    fn registers_updated(&mut self, registers: &[RegisterValue])
    {
        println!("registers:");
        for register in registers {
            println!("  {:<8} 0x{:08x}", register.name, register.value);
        }
    }
}

impl CallStackView for ConsoleView
{
    fn call_stack_updated(&mut self, frames: &[BacktraceFrame])
    {
        println!("call stack:");
        for frame in frames {
            match frame.address {
                Some(address) => println!("  #{:<3} {} {}", frame.level, address, frame.function),
                None => println!("  #{:<3} {:>10} {}", frame.level, "", frame.function),
            }
        }
    }
}

impl BreakpointView for ConsoleView
{
    fn breakpoint_added(&mut self, location: &str, acks: &[BreakpointAck])
    {
        if acks.is_empty() {
            println!("breakpoint requested at {location} (not acknowledged)");
        }
        for ack in acks {
            match ack.address {
                Some(address) => println!("breakpoint {} at {}", ack.number, address),
                None => println!("breakpoint {} at {}", ack.number, location),
            }
        }
    }

    fn breakpoints_deleted(&mut self, selection: &BreakpointSelection)
    {
        match selection {
            BreakpointSelection::All => println!("all breakpoints deleted"),
            BreakpointSelection::Numbers(numbers) => {
                let numbers: Vec<String> = numbers.iter().map(ToString::to_string).collect();
                println!("deleted breakpoint(s) {}", numbers.join(", "));
            }
            BreakpointSelection::Other(args) => println!("deleted breakpoint(s) {args}"),
        }
    }
}

impl LogView for ConsoleView
{
    fn log(&mut self, response: &ParsedResponse)
    {
        if response.is_handshake() {
            debug!("< handshake ({} lines)", response.lines.len());
        } else {
            debug!("< {:?} ({} lines)", response.command, response.lines.len());
        }
    }
}

impl ErrorSink for ConsoleView
{
    fn report(&mut self, error: &SymbridgeError)
    {
        eprintln!("error: {error}");
    }
}

impl SessionView for ConsoleView
{
    fn status_changed(&mut self, status: RunStatus)
    {
        println!("[{status}]");
    }

    fn refresh_all(&mut self) {}
}

/// Maps instruction addresses back to method symbols through the label table.
pub struct Annotator
{
    store: DebugStore,
    labels: LabelTable,
}

impl Annotator
{
    pub fn new(store: DebugStore) -> symbridge_core::Result<Self>
    {
        let labels = store.load_label_table()?;
        Ok(Self { store, labels })
    }

    /// Method symbol text for the label placed exactly at the line's address.
    pub fn annotate(&self, line: &DisassemblyLine) -> Option<String>
    {
        let label = self.labels.label_at(line.address)?;
        match self.store.read_method_symbol(label) {
            Ok(symbol) => symbol.map(|symbol| symbol.to_string()),
            Err(err) => {
                warn!("Symbol lookup for {} failed: {}", label, err);
                None
            }
        }
    }
}

struct ConsoleDisassembly
{
    annotator: Option<Annotator>,
}

impl DisassemblyView for ConsoleDisassembly
{
    fn disassembly_updated(&mut self, listing: &DisassemblyListing)
    {
        match &listing.function {
            Some(function) => println!("disassembly of {function}:"),
            None => {
                println!("no disassembly available");
                return;
            }
        }

        let current = listing.current_index();
        for (index, line) in listing.lines.iter().enumerate() {
            let marker = if current == Some(index) { "=>" } else { "" };
            match self.annotator.as_ref().and_then(|annotator| annotator.annotate(line)) {
                Some(symbol) => println!("{marker}{line}    ; {symbol}"),
                None => println!("{marker}{line}"),
            }
        }
    }
}

#[cfg(test)]
mod tests
{
    use symbridge_core::types::{AddressLabel, MethodSymbol};
    use symbridge_protocol::disassembly::parse_disassembly_line;

    use super::*;

    #[test]
    fn test_annotator_maps_address_to_il_offset()
    {
        let store = DebugStore::open_in_memory().unwrap();
        store
            .write_labels(&[AddressLabel::new(0x1004_u64, "M1_IL0005")])
            .unwrap();
        store
            .write_method_symbols(&[MethodSymbol {
                label_name: "M1_IL0005".to_string(),
                stack_difference: 0,
                assembly_file: "Kernel.il".to_string(),
                type_token: 1,
                method_token: 2,
                il_offset: 5,
                method_name: "Kernel.Main".to_string(),
            }])
            .unwrap();

        let annotator = Annotator::new(store).unwrap();
        let hit = parse_disassembly_line("0x00001004 <main+4>:\tret").unwrap();
        let miss = parse_disassembly_line("0x00001000 <main+0>:\tnop").unwrap();

        assert_eq!(annotator.annotate(&hit).as_deref(), Some("Kernel.Main IL_0005"));
        assert_eq!(annotator.annotate(&miss), None);
    }
}
