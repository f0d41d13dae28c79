//! Closed set of debugger commands the bridge sends and understands.

use std::fmt;

use symbridge_core::error::{Result, SymbridgeError};
use symbridge_core::types::Address;

/// A debugger command, either about to be sent or recovered from an echo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebuggerCommand
{
    /// Empty command echoed when the connection is established.
    Handshake,
    /// `info registers`
    InfoRegisters,
    /// `disassemble [target]`
    Disassemble
    {
        /// Label or address expression; empty disassembles around the pc.
        target: String,
    },
    /// `symbol-file <args>`
    SymbolFile
    {
        /// Raw arguments.
        args: String,
    },
    /// `set <args>`
    Set
    {
        /// Raw arguments.
        args: String,
    },
    /// `target <args>`
    Target
    {
        /// Raw arguments.
        args: String,
    },
    /// `delete [breakpoints] [n | a-b ...]`
    Delete
    {
        /// Which breakpoints the command removes.
        selection: BreakpointSelection,
    },
    /// `stepi`
    StepInstruction,
    /// `nexti`
    NextInstruction,
    /// `continue`
    Continue,
    /// `where`
    Where,
    /// `break <location>`
    Break
    {
        /// Location expression, e.g. `*0x00001004`.
        location: String,
    },
}

/// Breakpoints named by a `delete` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BreakpointSelection
{
    /// No arguments: every breakpoint.
    All,
    /// Breakpoint numbers, ranges expanded, in command order.
    Numbers(Vec<u32>),
    /// Arguments that are not a plain number list, kept as written.
    Other(String),
}

/// Largest `a-b` range expanded into numbers.
const MAX_RANGE_LEN: u32 = 1024;

impl BreakpointSelection
{
    /// Parse the arguments of `delete`.
    ///
    /// A leading `breakpoints`, `break` or `br` keyword is skipped. Ranges like
    /// `1-3` expand to every number they cover.
    ///
    /// ```rust
    /// use symbridge_protocol::command::BreakpointSelection;
    ///
    /// assert_eq!(BreakpointSelection::parse("breakpoints 2 4-5"), BreakpointSelection::Numbers(vec![2, 4, 5]));
    /// assert_eq!(BreakpointSelection::parse(""), BreakpointSelection::All);
    /// assert_eq!(BreakpointSelection::parse("$bpnum"), BreakpointSelection::Other("$bpnum".to_string()));
    /// ```
    pub fn parse(args: &str) -> Self
    {
        let mut tokens = args.split_whitespace().peekable();
        if tokens
            .peek()
            .is_some_and(|first| ["breakpoints", "break", "br"].iter().any(|kw| first.eq_ignore_ascii_case(kw)))
        {
            tokens.next();
        }

        let mut numbers = Vec::new();
        for token in tokens {
            match token.split_once('-') {
                None => match token.parse::<u32>() {
                    Ok(number) => numbers.push(number),
                    Err(_) => return Self::Other(args.trim().to_string()),
                },
                Some((start, end)) => match (start.parse::<u32>(), end.parse::<u32>()) {
                    (Ok(start), Ok(end)) if start <= end && end - start < MAX_RANGE_LEN => numbers.extend(start..=end),
                    _ => return Self::Other(args.trim().to_string()),
                },
            }
        }

        if numbers.is_empty() {
            Self::All
        } else {
            Self::Numbers(numbers)
        }
    }
}

impl fmt::Display for BreakpointSelection
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            Self::All => Ok(()),
            Self::Numbers(numbers) => {
                let numbers: Vec<String> = numbers.iter().map(ToString::to_string).collect();
                write!(f, "{}", numbers.join(" "))
            }
            Self::Other(args) => write!(f, "{args}"),
        }
    }
}

impl DebuggerCommand
{
    /// Recover the command kind from echoed command text.
    ///
    /// The verb is matched case-insensitively; `info registers` must match as a
    /// whole. Only the exactly empty text is the handshake.
    ///
    /// ## Errors
    ///
    /// [`SymbridgeError::UnrecognizedCommand`] with the full text for any other
    /// verb, blank text included.
    ///
    /// ## Example
    ///
    /// ```rust
    /// use symbridge_protocol::command::{BreakpointSelection, DebuggerCommand};
    ///
    /// assert_eq!(DebuggerCommand::parse("NEXTI")?, DebuggerCommand::NextInstruction);
    /// assert_eq!(
    ///     DebuggerCommand::parse("delete 1 3")?,
    ///     DebuggerCommand::Delete {
    ///         selection: BreakpointSelection::Numbers(vec![1, 3])
    ///     }
    /// );
    /// assert!(DebuggerCommand::parse("foobar 1").is_err());
    /// # Ok::<(), symbridge_core::error::SymbridgeError>(())
    /// ```
    pub fn parse(text: &str) -> Result<Self>
    {
        if text.is_empty() {
            return Ok(Self::Handshake);
        }

        let trimmed = text.trim();
        let (verb, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (trimmed, ""),
        };
        let verb = verb.to_lowercase();

        let command = match verb.as_str() {
            "info" if rest.eq_ignore_ascii_case("registers") => Self::InfoRegisters,
            "disassemble" => Self::Disassemble {
                target: rest.to_string(),
            },
            "symbol-file" => Self::SymbolFile { args: rest.to_string() },
            "set" => Self::Set { args: rest.to_string() },
            "target" => Self::Target { args: rest.to_string() },
            "delete" => Self::Delete {
                selection: BreakpointSelection::parse(rest),
            },
            "stepi" => Self::StepInstruction,
            "nexti" => Self::NextInstruction,
            "continue" => Self::Continue,
            "where" => Self::Where,
            "break" => Self::Break {
                location: rest.to_string(),
            },
            _ => return Err(SymbridgeError::UnrecognizedCommand(text.to_string())),
        };
        Ok(command)
    }

    /// `break` at an exact instruction address.
    pub fn break_at(address: Address) -> Self
    {
        Self::Break {
            location: format!("*0x{address:08X}"),
        }
    }

    /// `true` for commands that let the target run until it stops again.
    pub fn resumes_target(&self) -> bool
    {
        matches!(self, Self::StepInstruction | Self::NextInstruction | Self::Continue)
    }
}

impl fmt::Display for DebuggerCommand
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let (verb, args) = match self {
            Self::Handshake => return Ok(()),
            Self::InfoRegisters => ("info registers", String::new()),
            Self::Disassemble { target } => ("disassemble", target.clone()),
            Self::SymbolFile { args } => ("symbol-file", args.clone()),
            Self::Set { args } => ("set", args.clone()),
            Self::Target { args } => ("target", args.clone()),
            Self::Delete { selection } => ("delete", selection.to_string()),
            Self::StepInstruction => ("stepi", String::new()),
            Self::NextInstruction => ("nexti", String::new()),
            Self::Continue => ("continue", String::new()),
            Self::Where => ("where", String::new()),
            Self::Break { location } => ("break", location.clone()),
        };
        if args.is_empty() {
            write!(f, "{verb}")
        } else {
            write!(f, "{verb} {args}")
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_parse_every_verb()
    {
        let cases = [
            ("", DebuggerCommand::Handshake),
            ("info registers", DebuggerCommand::InfoRegisters),
            ("Info Registers", DebuggerCommand::InfoRegisters),
            (
                "disassemble Kernel_Main",
                DebuggerCommand::Disassemble {
                    target: "Kernel_Main".to_string(),
                },
            ),
            (
                "symbol-file kernel.obj",
                DebuggerCommand::SymbolFile {
                    args: "kernel.obj".to_string(),
                },
            ),
            (
                "set disassembly-flavor intel",
                DebuggerCommand::Set {
                    args: "disassembly-flavor intel".to_string(),
                },
            ),
            (
                "target remote :8832",
                DebuggerCommand::Target {
                    args: "remote :8832".to_string(),
                },
            ),
            (
                "delete",
                DebuggerCommand::Delete {
                    selection: BreakpointSelection::All,
                },
            ),
            ("stepi", DebuggerCommand::StepInstruction),
            ("nexti", DebuggerCommand::NextInstruction),
            ("Continue", DebuggerCommand::Continue),
            ("where", DebuggerCommand::Where),
            (
                "break *0x00001004",
                DebuggerCommand::Break {
                    location: "*0x00001004".to_string(),
                },
            ),
        ];

        for (text, expected) in cases {
            assert_eq!(DebuggerCommand::parse(text).unwrap(), expected, "parsing {:?}", text);
        }
    }

    #[test]
    fn test_unrecognized_verb_keeps_full_text()
    {
        match DebuggerCommand::parse("foobar --all now") {
            Err(SymbridgeError::UnrecognizedCommand(text)) => assert_eq!(text, "foobar --all now"),
            other => panic!("Expected UnrecognizedCommand, got {:?}", other),
        }
        assert!(matches!(
            DebuggerCommand::parse("info frame"),
            Err(SymbridgeError::UnrecognizedCommand(_))
        ));
    }

    #[test]
    fn test_blank_text_is_not_the_handshake()
    {
        match DebuggerCommand::parse("   ") {
            Err(SymbridgeError::UnrecognizedCommand(text)) => assert_eq!(text, "   "),
            other => panic!("Expected UnrecognizedCommand, got {:?}", other),
        }
    }

    #[test]
    fn test_delete_ranges_and_keyword()
    {
        let cases = [
            ("delete 1-3", BreakpointSelection::Numbers(vec![1, 2, 3])),
            ("delete breakpoints 2", BreakpointSelection::Numbers(vec![2])),
            ("DELETE Br 4 6-7", BreakpointSelection::Numbers(vec![4, 6, 7])),
            ("delete breakpoints", BreakpointSelection::All),
            ("delete 1 two", BreakpointSelection::Other("1 two".to_string())),
            ("delete 3-1", BreakpointSelection::Other("3-1".to_string())),
            ("delete display 2", BreakpointSelection::Other("display 2".to_string())),
        ];
        for (text, selection) in cases {
            assert_eq!(
                DebuggerCommand::parse(text).unwrap(),
                DebuggerCommand::Delete { selection },
                "parsing {:?}",
                text
            );
        }
    }

    #[test]
    fn test_huge_delete_range_is_kept_as_written()
    {
        assert_eq!(
            BreakpointSelection::parse("1-4000000000"),
            BreakpointSelection::Other("1-4000000000".to_string())
        );
    }

    #[test]
    fn test_render_round_trips_through_parse()
    {
        let commands = [
            DebuggerCommand::InfoRegisters,
            DebuggerCommand::Disassemble { target: String::new() },
            DebuggerCommand::Delete {
                selection: BreakpointSelection::Numbers(vec![2, 5]),
            },
            DebuggerCommand::break_at(Address::new(0x1004)),
            DebuggerCommand::Continue,
        ];
        for command in commands {
            assert_eq!(DebuggerCommand::parse(&command.to_string()).unwrap(), command);
        }
        assert_eq!(DebuggerCommand::Disassemble { target: String::new() }.to_string(), "disassemble");
        assert_eq!(DebuggerCommand::Handshake.to_string(), "");
    }

    #[test]
    fn test_resumes_target()
    {
        assert!(DebuggerCommand::StepInstruction.resumes_target());
        assert!(DebuggerCommand::Continue.resumes_target());
        assert!(!DebuggerCommand::Where.resumes_target());
    }
}
