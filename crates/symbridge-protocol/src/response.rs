//! Parsed debugger responses.

use crate::escape::unescape;

/// One debugger round-trip: the echoed command and its output lines, both
/// already unescaped.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedResponse
{
    /// Command text as echoed back by the debugger. Empty for the handshake.
    pub command: String,
    /// Output lines in arrival order.
    pub lines: Vec<String>,
}

impl ParsedResponse
{
    /// `true` for the empty-command response sent on connect. A blank but
    /// non-empty echo is not a handshake.
    pub fn is_handshake(&self) -> bool
    {
        self.command.is_empty()
    }
}

/// Unescape an echoed command and its raw output lines.
pub fn parse_response<S: AsRef<str>>(command_echo: &str, output_lines: &[S]) -> ParsedResponse
{
    ParsedResponse {
        command: unescape(command_echo),
        lines: output_lines.iter().map(|line| unescape(line.as_ref())).collect(),
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_parse_response_unescapes_lines()
    {
        let response = parse_response("where", &["#0  0x00001000 in main ()\\n"]);
        assert_eq!(response.command, "where");
        assert_eq!(response.lines, ["#0  0x00001000 in main ()\n"]);
    }

    #[test]
    fn test_handshake()
    {
        assert!(parse_response("", &[] as &[String]).is_handshake());
        assert!(!parse_response(" ", &[] as &[String]).is_handshake());
        assert!(!parse_response("stepi", &[] as &[String]).is_handshake());
    }
}
