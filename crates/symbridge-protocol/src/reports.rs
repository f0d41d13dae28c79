//! Typed payloads decoded from response lines for the observer views.
//!
//! Decoding is lenient: lines that do not have the expected shape (blank
//! lines, continuation lines, warnings) are skipped rather than reported.

use symbridge_core::types::Address;

/// One row of `info registers`, e.g. `eax  0x1  1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterValue
{
    pub name: String,
    pub value: u64,
}

/// One frame of `where`, e.g. `#1  0x00401234 in Kernel_Main (argc=1) at k.cs:12`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BacktraceFrame
{
    /// Frame number, 0 for the innermost frame.
    pub level: u32,
    /// Return address. gdb omits it when the frame sits at the start of a line.
    pub address: Option<Address>,
    pub function: String,
}

/// Acknowledgement of `break`, e.g. `Breakpoint 2 at 0x1004: file k.cs, line 7.`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakpointAck
{
    pub number: u32,
    pub address: Option<Address>,
}

/// Decode `info registers` output.
pub fn parse_registers(lines: &[String]) -> Vec<RegisterValue>
{
    lines
        .iter()
        .filter_map(|line| {
            let mut tokens = line.split_whitespace();
            let name = tokens.next()?;
            let value = Address::from_hex(tokens.next()?.strip_prefix("0x")?)?;
            Some(RegisterValue {
                name: name.to_string(),
                value: value.value(),
            })
        })
        .collect()
}

/// Decode `where` output.
pub fn parse_backtrace(lines: &[String]) -> Vec<BacktraceFrame>
{
    lines.iter().filter_map(|line| parse_frame(line)).collect()
}

fn parse_frame(line: &str) -> Option<BacktraceFrame>
{
    let mut tokens = line.split_whitespace().peekable();
    let level = tokens.next()?.strip_prefix('#')?.parse().ok()?;

    let address = if tokens.peek().is_some_and(|token| token.starts_with("0x")) {
        let address = tokens.next().and_then(Address::from_hex);
        if tokens.peek() == Some(&"in") {
            tokens.next();
        }
        address
    } else {
        None
    };

    let function = tokens.next()?;
    let function = function.split('(').next().unwrap_or(function);
    if function.is_empty() {
        return None;
    }

    Some(BacktraceFrame {
        level,
        address,
        function: function.to_string(),
    })
}

/// Decode the acknowledgement lines of `break`.
pub fn parse_breakpoint_acks(lines: &[String]) -> Vec<BreakpointAck>
{
    lines
        .iter()
        .filter_map(|line| {
            let mut tokens = line.split_whitespace();
            if tokens.next()? != "Breakpoint" {
                return None;
            }
            let number = tokens.next()?.parse().ok()?;
            let address = match (tokens.next(), tokens.next()) {
                (Some("at"), Some(token)) => Address::from_hex(token.trim_end_matches([':', ',', '.'])),
                _ => None,
            };
            Some(BreakpointAck { number, address })
        })
        .collect()
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String>
    {
        raw.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_parse_registers()
    {
        let regs = parse_registers(&lines(&[
            "eax            0x1\t1",
            "eip            0x1004\t0x1004 <main+4>",
            "eflags         0x246\t[ PF ZF IF ]",
            "",
            "The program has no registers now.",
        ]));
        assert_eq!(regs.len(), 3);
        assert_eq!(regs[1].name, "eip");
        assert_eq!(regs[1].value, 0x1004);
        assert_eq!(regs[2].value, 0x246);
    }

    #[test]
    fn test_parse_backtrace()
    {
        let frames = parse_backtrace(&lines(&[
            "#0  main () at kernel.cs:3",
            "#1  0x00401234 in Kernel_Main (argc=1) at kernel.cs:12",
            "Backtrace stopped: previous frame inner to this frame",
        ]));
        assert_eq!(
            frames,
            vec![
                BacktraceFrame {
                    level: 0,
                    address: None,
                    function: "main".to_string(),
                },
                BacktraceFrame {
                    level: 1,
                    address: Some(Address::new(0x0040_1234)),
                    function: "Kernel_Main".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_parse_breakpoint_acks()
    {
        let acks = parse_breakpoint_acks(&lines(&[
            "Breakpoint 2 at 0x1004: file kernel.cs, line 7.",
            "Breakpoint 3 at 0x2000",
            "Note: breakpoint 2 also set at pc 0x1004.",
        ]));
        assert_eq!(
            acks,
            vec![
                BreakpointAck {
                    number: 2,
                    address: Some(Address::new(0x1004)),
                },
                BreakpointAck {
                    number: 3,
                    address: Some(Address::new(0x2000)),
                },
            ]
        );
    }
}
