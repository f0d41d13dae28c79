//! # Settings
//!
//! Environment-driven defaults for the symbridge binaries. Command-line flags
//! override whatever is read here.
//!
//! | variable | meaning |
//! |---|---|
//! | `SYMBRIDGE_STORE` | default debug store path |
//! | `SYMBRIDGE_SKIP_MALFORMED` | skip unparsable disassembly lines instead of failing |
//! | `SYMBRIDGE_REFRESH` | comma-separated commands sent after every stop |

use std::env;
use std::path::PathBuf;

/// Environment variable naming the default store.
pub const STORE_ENV: &str = "SYMBRIDGE_STORE";
/// Environment variable enabling skip-and-continue for malformed disassembly lines.
pub const SKIP_MALFORMED_ENV: &str = "SYMBRIDGE_SKIP_MALFORMED";
/// Environment variable overriding the refresh command list.
pub const REFRESH_ENV: &str = "SYMBRIDGE_REFRESH";

/// Settings gathered from the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings
{
    /// Debug store to open when none is given on the command line.
    pub store: Option<PathBuf>,
    /// Skip malformed disassembly lines rather than failing the listing.
    pub skip_malformed: bool,
    /// Replacement refresh command list, `None` keeps the built-in one.
    pub refresh_commands: Option<Vec<String>>,
}

impl Settings
{
    /// Read settings from the process environment.
    ///
    /// ## Errors
    ///
    /// [`ConfigError::InvalidValue`] when a variable is set to something unusable.
    pub fn from_env() -> Result<Self, ConfigError>
    {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read settings through `lookup`, which returns the value of a variable if set.
    ///
    /// ```rust
    /// use symbridge_utils::config::Settings;
    ///
    /// let settings = Settings::from_lookup(|key| match key {
    ///     "SYMBRIDGE_REFRESH" => Some("info registers, where".to_string()),
    ///     _ => None,
    /// })?;
    /// assert_eq!(settings.refresh_commands.unwrap(), ["info registers", "where"]);
    /// # Ok::<(), symbridge_utils::config::ConfigError>(())
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let store = lookup(STORE_ENV).filter(|value| !value.trim().is_empty()).map(PathBuf::from);

        let skip_malformed = match lookup(SKIP_MALFORMED_ENV) {
            Some(value) => parse_flag(SKIP_MALFORMED_ENV, &value)?,
            None => false,
        };

        let refresh_commands = match lookup(REFRESH_ENV) {
            Some(value) => {
                let commands: Vec<String> = value
                    .split(',')
                    .map(str::trim)
                    .filter(|command| !command.is_empty())
                    .map(ToString::to_string)
                    .collect();
                if commands.is_empty() {
                    return Err(ConfigError::InvalidValue {
                        key: REFRESH_ENV,
                        value,
                    });
                }
                Some(commands)
            }
            None => None,
        };

        Ok(Self {
            store,
            skip_malformed,
            refresh_commands,
        })
    }
}

fn parse_flag(key: &'static str, value: &str) -> Result<bool, ConfigError>
{
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        }),
    }
}

/// Settings error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError
{
    /// A variable holds a value that cannot be used
    #[error("Invalid value {value:?} for {key}")]
    InvalidValue
    {
        /// Variable name
        key: &'static str,
        /// Offending value
        value: String,
    },
}

#[cfg(test)]
mod tests
{
    use std::collections::HashMap;

    use super::*;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings, ConfigError>
    {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_unset()
    {
        assert_eq!(settings(&[]).unwrap(), Settings::default());
    }

    #[test]
    fn test_reads_every_variable()
    {
        let settings = settings(&[
            (STORE_ENV, "/tmp/kernel.sym"),
            (SKIP_MALFORMED_ENV, "Yes"),
            (REFRESH_ENV, "where,,info registers "),
        ])
        .unwrap();

        assert_eq!(settings.store, Some(PathBuf::from("/tmp/kernel.sym")));
        assert!(settings.skip_malformed);
        assert_eq!(settings.refresh_commands.unwrap(), ["where", "info registers"]);
    }

    #[test]
    fn test_rejects_bad_values()
    {
        assert!(settings(&[(SKIP_MALFORMED_ENV, "maybe")]).is_err());
        assert!(settings(&[(REFRESH_ENV, " , ")]).is_err());
    }

    #[test]
    fn test_blank_store_is_unset()
    {
        assert_eq!(settings(&[(STORE_ENV, "  ")]).unwrap().store, None);
    }
}
