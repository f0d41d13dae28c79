//! # Disassembly
//!
//! Parsing of `disassemble` output into typed instruction lines.
//!
//! A listing arrives framed by a header and a footer:
//!
//! ```text
//! Dump of assembler code for function main:
//! 0x00001000 <main+0>:	mov eax,1
//! 0x00001004 <main+4>:	ret
//! End of assembler dump.
//! ```
//!
//! Only the lines strictly between the two are instructions.

use std::fmt;

use symbridge_core::error::{Result, SymbridgeError};
use symbridge_core::types::Address;
use tracing::warn;

use crate::response::ParsedResponse;

/// Marker gdb puts in front of the instruction at the program counter.
const CURRENT_MARKER: &str = "=>";

/// One disassembled instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisassemblyLine
{
    /// Instruction address (32-bit on the wire).
    pub address: Address,
    /// Symbolic annotation without brackets, e.g. `main+4`.
    pub label: Option<String>,
    /// Mnemonic.
    pub opcode: String,
    /// Operands joined with single spaces. May be empty.
    pub operands: String,
    /// The line carried the `=>` current-instruction marker.
    pub is_current: bool,
}

impl DisassemblyLine
{
    /// Breakpoint location string for this instruction, e.g. `*0x00001004`.
    pub fn breakpoint_location(&self) -> String
    {
        format!("*0x{:08X}", self.address)
    }
}

impl fmt::Display for DisassemblyLine
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        // The first column is left free for a breakpoint marker.
        let body = format!("{:08X}:  {} {}", self.address, self.opcode, self.operands);
        write!(f, "  {}", body.trim_end())
    }
}

/// Parse one instruction line.
///
/// The line splits on its first tab. The left part holds the hex address and
/// an optional `<symbol+offset>:` annotation; the right part holds the opcode
/// followed by its operands.
///
/// ## Errors
///
/// [`SymbridgeError::ParseError`] when the tab, the address or the opcode is
/// missing, or the address is not a 32-bit hex number.
///
/// ## Example
///
/// ```rust
/// use symbridge_protocol::disassembly::parse_disassembly_line;
///
/// let line = parse_disassembly_line("0x0056d2b9 <_end_data+0>:\tmov    DWORD PTR ds:0x550020,ebx\n")?;
/// assert_eq!(line.address.value(), 0x0056_d2b9);
/// assert_eq!(line.label.as_deref(), Some("_end_data+0"));
/// assert_eq!(line.opcode, "mov");
/// assert_eq!(line.operands, "DWORD PTR ds:0x550020,ebx");
/// # Ok::<(), symbridge_core::error::SymbridgeError>(())
/// ```
pub fn parse_disassembly_line(line: &str) -> Result<DisassemblyLine>
{
    let (location, instruction) = line
        .split_once('\t')
        .ok_or_else(|| SymbridgeError::parse(line, "missing tab between address and instruction"))?;

    let mut location = location.trim_start();
    let is_current = match location.strip_prefix(CURRENT_MARKER) {
        Some(rest) => {
            location = rest;
            true
        }
        None => false,
    };

    let mut location_tokens = location.split_whitespace();
    let address_token = location_tokens
        .next()
        .ok_or_else(|| SymbridgeError::parse(line, "missing address"))?;
    let address = parse_address(address_token).ok_or_else(|| SymbridgeError::parse(line, "invalid address"))?;
    let label = location_tokens
        .next()
        .map(|token| token.trim_matches(|c| c == '<' || c == '>' || c == ':').to_string())
        .filter(|label| !label.is_empty());

    let mut instruction_tokens = instruction.split_whitespace();
    let opcode = instruction_tokens
        .next()
        .ok_or_else(|| SymbridgeError::parse(line, "missing opcode"))?
        .to_string();
    let operands = instruction_tokens.collect::<Vec<_>>().join(" ");

    Ok(DisassemblyLine {
        address,
        label,
        opcode,
        operands,
        is_current,
    })
}

fn parse_address(token: &str) -> Option<Address>
{
    let digits = token.trim_end_matches(':');
    let digits = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
        .unwrap_or(digits);
    u32::from_str_radix(digits, 16).ok().map(Address::from)
}

/// What framing does with a line that fails to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MalformedLinePolicy
{
    /// Fail the whole listing with the line's [`SymbridgeError::ParseError`].
    #[default]
    Abort,
    /// Log a warning and leave the line out.
    Skip,
}

/// A framed `disassemble` result.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DisassemblyListing
{
    /// Function named in the header, `None` when nothing was disassembled.
    pub function: Option<String>,
    /// Instructions in listing order.
    pub lines: Vec<DisassemblyLine>,
}

impl DisassemblyListing
{
    /// Index of the instruction at `address`, used to highlight the program counter.
    pub fn index_of(&self, address: Address) -> Option<usize>
    {
        self.lines.iter().position(|line| line.address == address)
    }

    /// Index of the line gdb marked with `=>`.
    pub fn current_index(&self) -> Option<usize>
    {
        self.lines.iter().position(|line| line.is_current)
    }

    /// `true` if the listing has no instructions.
    pub fn is_empty(&self) -> bool
    {
        self.lines.is_empty()
    }
}

/// Strip header and footer from a `disassemble` response and parse the rest.
///
/// Fewer than three lines means no function was disassembled (typically no
/// symbols are loaded); that yields an empty listing, not an error.
pub fn frame_disassembly(response: &ParsedResponse, policy: MalformedLinePolicy) -> Result<DisassemblyListing>
{
    let [header, body @ .., _footer] = response.lines.as_slice() else {
        return Ok(DisassemblyListing::default());
    };
    if body.is_empty() {
        return Ok(DisassemblyListing::default());
    }

    let function = header
        .split_whitespace()
        .last()
        .map(|token| token.trim_end_matches(':').to_string())
        .filter(|name| !name.is_empty());

    let mut lines = Vec::with_capacity(body.len());
    for raw in body {
        match parse_disassembly_line(raw) {
            Ok(line) => lines.push(line),
            Err(err) if policy == MalformedLinePolicy::Skip => {
                warn!("Skipping malformed disassembly line: {}", err);
            }
            Err(err) => return Err(err),
        }
    }

    Ok(DisassemblyListing { function, lines })
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::response::parse_response;

    fn listing_response(body: &[&str]) -> ParsedResponse
    {
        let mut lines = vec!["Dump of assembler code for function main:"];
        lines.extend_from_slice(body);
        lines.push("End of assembler dump.");
        parse_response("disassemble main", &lines)
    }

    #[test]
    fn test_frame_extracts_function_and_lines()
    {
        let response = listing_response(&["0x00001000 <main+0>:\\tmov eax,1", "0x00001004 <main+4>:\\tret"]);
        let listing = frame_disassembly(&response, MalformedLinePolicy::Abort).unwrap();

        assert_eq!(listing.function.as_deref(), Some("main"));
        assert_eq!(listing.lines.len(), 2);
        assert_eq!(listing.lines[0].address, Address::new(0x1000));
        assert_eq!(listing.lines[1].address, Address::new(0x1004));
        assert_eq!(listing.lines[1].operands, "");
        assert_eq!(listing.index_of(Address::new(0x1004)), Some(1));
        assert_eq!(listing.index_of(Address::new(0x1008)), None);
    }

    #[test]
    fn test_short_response_is_empty_listing()
    {
        for lines in [vec![], vec!["No symbol table is loaded."], vec!["a", "b"]] {
            let response = parse_response("disassemble", &lines);
            let listing = frame_disassembly(&response, MalformedLinePolicy::Abort).unwrap();
            assert!(listing.is_empty());
            assert_eq!(listing.function, None);
        }
    }

    #[test]
    fn test_malformed_line_aborts_by_default()
    {
        let response = listing_response(&["0x00001000 <main+0>:\\tnop", "garbage without tab"]);
        let err = frame_disassembly(&response, MalformedLinePolicy::Abort).unwrap_err();
        assert!(matches!(err, SymbridgeError::ParseError { .. }));
    }

    #[test]
    fn test_malformed_line_skipped_on_request()
    {
        let response = listing_response(&["0x00001000 <main+0>:\\tnop", "garbage without tab", "0x00001001:\\tret"]);
        let listing = frame_disassembly(&response, MalformedLinePolicy::Skip).unwrap();
        let addresses: Vec<u64> = listing.lines.iter().map(|line| line.address.value()).collect();
        assert_eq!(addresses, [0x1000, 0x1001]);
    }

    #[test]
    fn test_current_marker_and_relative_label()
    {
        let line = parse_disassembly_line("=> 0x00001004 <+4>:\tret").unwrap();
        assert!(line.is_current);
        assert_eq!(line.label.as_deref(), Some("+4"));
        assert_eq!(line.opcode, "ret");
    }

    #[test]
    fn test_missing_address_is_parse_error()
    {
        assert!(parse_disassembly_line("   \tret").is_err());
        assert!(parse_disassembly_line("main:\tret").is_err());
        assert!(parse_disassembly_line("0x1_0000_0000\tret").is_err());
        assert!(parse_disassembly_line("0x00001000\t  ").is_err());
    }

    #[test]
    fn test_display_and_breakpoint_location()
    {
        let line = parse_disassembly_line("0x0056d2b9 <_end_data+0>:\tmov    DWORD PTR ds:0x550020,ebx").unwrap();
        assert_eq!(line.to_string(), "  0056D2B9:  mov DWORD PTR ds:0x550020,ebx");
        assert_eq!(line.breakpoint_location(), "*0x0056D2B9");

        let bare = parse_disassembly_line("0x00001004:\tret").unwrap();
        assert_eq!(bare.label, None);
        assert_eq!(bare.to_string(), "  00001004:  ret");
    }
}
