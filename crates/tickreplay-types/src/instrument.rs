//! Validated instrument identifiers.
//!
//! Each recorded instrument owns its own table in the tick log
//! (`stock_<instrument>_raw`). Because the identifier is interpolated into
//! the table name unquoted, it is restricted to lower-case ASCII letters,
//! digits and `_`. `PostgreSQL` folds unquoted identifiers to lower case,
//! so an upper-case code would silently name a different table.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Maximum length of an instrument identifier.
const MAX_INSTRUMENT_LEN: usize = 32;

/// Errors produced when validating an instrument identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InstrumentError {
    /// The identifier is empty.
    #[error("instrument identifier is empty")]
    Empty,

    /// The identifier exceeds the maximum length.
    #[error("instrument identifier exceeds {MAX_INSTRUMENT_LEN} characters: {0}")]
    TooLong(String),

    /// The identifier contains a character outside `[a-z0-9_]`.
    #[error("instrument identifier contains invalid characters: {0}")]
    InvalidCharacters(String),
}

/// An instrument identifier, e.g. the stock code `7974`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Instrument(String);

impl Instrument {
    /// Validate and wrap an instrument identifier.
    ///
    /// # Errors
    ///
    /// Returns [`InstrumentError`] if the identifier is empty, too long,
    /// or contains characters that are unsafe in a table name.
    pub fn new(code: &str) -> Result<Self, InstrumentError> {
        if code.is_empty() {
            return Err(InstrumentError::Empty);
        }
        if code.len() > MAX_INSTRUMENT_LEN {
            return Err(InstrumentError::TooLong(code.to_owned()));
        }
        if !code
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        {
            return Err(InstrumentError::InvalidCharacters(code.to_owned()));
        }
        Ok(Self(code.to_owned()))
    }

    /// Return the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return the name of the tick log table holding this instrument.
    pub fn table_name(&self) -> String {
        format!("stock_{}_raw", self.0)
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Instrument {
    type Error = InstrumentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Instrument> for String {
    fn from(value: Instrument) -> Self {
        value.0
    }
}
