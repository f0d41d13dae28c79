//! # Error Types
//!
//! General error handling for the symbol store and the debugger bridge.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.

use thiserror::Error;

/// Main error type for symbridge operations
///
/// ## Error Categories
///
/// 1. **Store errors**: StoreUnavailable, TransactionFailed, Storage
/// 2. **Lookup errors**: NotFound
/// 3. **Protocol errors**: ParseError, UnrecognizedCommand
/// 4. **Session errors**: CommandInFlight, TransportLost
/// 5. **I/O errors**: Io (for file operations, etc.)
#[derive(Error, Debug)]
pub enum SymbridgeError
{
    /// The store could not be opened, created, or is already closed
    ///
    /// This happens when:
    /// - The file cannot be created or opened (permissions, missing directory)
    /// - Another process holds a lock on the database
    /// - The file is not a valid store (corrupt schema)
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// A direct-key lookup that the caller expects to succeed found nothing
    ///
    /// Only some lookups fail this way. Lookups that are queried speculatively
    /// (method symbol by label, field group by type) return an empty result instead.
    #[error("{kind} not found: {key}")]
    NotFound
    {
        /// What kind of record was requested (e.g. "field layout")
        kind: &'static str,
        /// The key that was looked up
        key: String,
    },

    /// A batch write failed and was rolled back
    ///
    /// Nothing from the batch is visible in the store afterwards.
    #[error("Transaction failed during {operation}: {source}")]
    TransactionFailed
    {
        /// The store operation that opened the transaction
        operation: &'static str,
        /// Underlying SQLite error
        #[source]
        source: rusqlite::Error,
    },

    /// A read or an untransacted write failed in the storage engine
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Malformed protocol text from the external debugger
    #[error("Parse error in {line:?}: {reason}")]
    ParseError
    {
        /// The offending text (after unescaping)
        line: String,
        /// Why it could not be parsed
        reason: String,
    },

    /// The dispatcher saw a response for a command verb it does not handle
    ///
    /// Carries the full command text as echoed by the debugger.
    #[error("Unrecognized command response: {0}")]
    UnrecognizedCommand(String),

    /// A command was sent while another one is still awaiting its response
    ///
    /// ## Solution
    ///
    /// Use `submit()` to queue the command, or wait until the session is idle.
    #[error("Command {0:?} rejected: another command is awaiting a response")]
    CommandInFlight(String),

    /// The connection to the external debugger is gone
    ///
    /// This is terminal for the session. Nothing retries internally.
    #[error("Connection to debugger lost: {0}")]
    TransportLost(String),

    /// I/O error (for file operations, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SymbridgeError
{
    /// Build a [`SymbridgeError::ParseError`] from borrowed parts.
    pub fn parse(line: impl Into<String>, reason: impl Into<String>) -> Self
    {
        Self::ParseError {
            line: line.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` for errors after which the session cannot continue.
    #[must_use]
    pub fn is_terminal(&self) -> bool
    {
        matches!(self, Self::TransportLost(_) | Self::StoreUnavailable(_))
    }
}

/// Convenience type alias for `Result<T, SymbridgeError>`
///
/// ```rust
/// use symbridge_core::error::Result;
/// fn foo() -> Result<()>
/// {
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, SymbridgeError>;
