//! Single-character escaping used on the debugger wire.
//!
//! Output lines relayed from the debugger may themselves contain newlines and
//! tabs, so the transport encodes them with a backslash:
//!
//! | raw | wire |
//! |---|---|
//! | newline | `\n` |
//! | tab | `\t` |
//! | `\` | `\\` |

/// Escape character on the wire.
pub const ESCAPE: char = '\\';

/// Encode newlines, tabs and the escape character.
///
/// ```rust
/// use symbridge_protocol::escape::escape;
///
/// assert_eq!(escape("a\tb\\c\n"), "a\\tb\\\\c\\n");
/// ```
pub fn escape(raw: &str) -> String
{
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            ESCAPE => out.push_str("\\\\"),
            other => out.push(other),
        }
    }
    out
}

/// Decode text produced by [`escape`].
///
/// Unknown sequences such as `\x` are kept as-is, and so is a lone trailing
/// backslash. Nothing is ever dropped.
///
/// ```rust
/// use symbridge_protocol::escape::unescape;
///
/// assert_eq!(unescape("0x1000 <main>:\\tret"), "0x1000 <main>:\tret");
/// assert_eq!(unescape("c:\\qux\\"), "c:\\qux\\");
/// ```
pub fn unescape(wire: &str) -> String
{
    let mut out = String::with_capacity(wire.len());
    let mut chars = wire.chars();
    while let Some(ch) = chars.next() {
        if ch != ESCAPE {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(ESCAPE) => out.push(ESCAPE),
            Some(other) => {
                out.push(ESCAPE);
                out.push(other);
            }
            None => out.push(ESCAPE),
        }
    }
    out
}

#[cfg(test)]
mod tests
{
    use super::*;

    /// Deterministic corpus over an alphabet heavy in characters that need escaping.
    fn corpus() -> Vec<String>
    {
        const ALPHABET: [char; 8] = ['a', '\t', '\n', '\\', 'n', 't', ' ', 'é'];
        let mut state: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = move || {
            // xorshift64
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state
        };

        (0..500)
            .map(|_| {
                let len = usize::try_from(next() % 24).unwrap();
                (0..len)
                    .map(|_| ALPHABET[usize::try_from(next() % 8).unwrap()])
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_unescape_reverses_escape()
    {
        for raw in corpus() {
            assert_eq!(unescape(&escape(&raw)), raw, "raw {:?}", raw);
        }
    }

    #[test]
    fn test_escape_reverses_unescape_on_wire_text()
    {
        for raw in corpus() {
            let wire = escape(&raw);
            assert_eq!(escape(&unescape(&wire)), wire, "wire {:?}", wire);
        }
    }

    #[test]
    fn test_unknown_sequence_is_preserved()
    {
        assert_eq!(unescape("a\\qb"), "a\\qb");
        assert_eq!(unescape("\\"), "\\");
        assert_eq!(unescape("\\\\n"), "\\n");
    }

    #[test]
    fn test_plain_text_passes_through()
    {
        assert_eq!(unescape("mov eax,1"), "mov eax,1");
        assert_eq!(escape("mov eax,1"), "mov eax,1");
    }
}
