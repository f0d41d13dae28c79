//! Plain-text label files for `symbridge import-labels`.
//!
//! One `address label` pair per line. The address is hex, with or without
//! `0x`. Blank lines and lines starting with `#` are ignored.
//!
//! ```text
//! # kernel.map
//! 0x00001000 Kernel_Main
//! 00001010   Kernel_Main_Loop
//! ```

use std::path::Path;

use symbridge_core::error::{Result, SymbridgeError};
use symbridge_core::types::{Address, AddressLabel};

/// Read and parse a label file.
pub fn read_label_file(path: &Path) -> Result<Vec<AddressLabel>>
{
    let text = std::fs::read_to_string(path)?;
    parse_label_file(&text)
}

pub fn parse_label_file(text: &str) -> Result<Vec<AddressLabel>>
{
    let mut labels = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let mut tokens = trimmed.split_whitespace();
        let (Some(address), Some(label), None) = (tokens.next(), tokens.next(), tokens.next()) else {
            return Err(SymbridgeError::parse(line, "expected '<address> <label>'"));
        };
        let address = Address::from_hex(address).ok_or_else(|| SymbridgeError::parse(line, "invalid hex address"))?;
        labels.push(AddressLabel::new(address, label));
    }
    Ok(labels)
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_parse_label_file()
    {
        let labels = parse_label_file("# map\n\n0x00001000 main\n  1010\tloop  \n").unwrap();
        assert_eq!(
            labels,
            vec![AddressLabel::new(0x1000_u64, "main"), AddressLabel::new(0x1010_u64, "loop")]
        );
    }

    #[test]
    fn test_parse_label_file_rejects_bad_lines()
    {
        assert!(parse_label_file("0x1000").is_err());
        assert!(parse_label_file("0x1000 main extra").is_err());
        assert!(parse_label_file("main 0x1000").is_err());
    }

    #[test]
    fn test_missing_label_file_is_an_io_error()
    {
        let dir = tempfile::tempdir().unwrap();
        let result = read_label_file(&dir.path().join("missing.map"));
        assert!(matches!(result, Err(SymbridgeError::Io(_))));
    }
}
