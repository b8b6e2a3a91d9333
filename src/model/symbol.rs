use crate::error::Error;
use serde::Deserialize;
use std::convert::TryFrom;
use std::fmt;

const MAX_LEN: usize = 32;

#[derive(Clone, Debug, Eq, Hash, PartialEq, Deserialize)]
#[serde(try_from = "String")]
pub struct Symbol(String);

impl Symbol {
    pub fn new(code: &str) -> Result<Symbol, Error> {
        if is_safe_identifier(code) {
            Ok(Symbol(code.to_string()))
        } else {
            Err(Error::InvalidSymbol(code.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Symbols end up as column names, so they have to be safe to splice into DDL.
pub(crate) fn is_safe_identifier(code: &str) -> bool {
    let mut chars = code.chars();
    let first = match chars.next() {
        Some(first) => first,
        None => return false,
    };
    code.len() <= MAX_LEN
        && first.is_ascii_alphabetic()
        && chars.all(|it| it.is_ascii_alphanumeric() || it == '_')
}

impl TryFrom<String> for Symbol {
    type Error = Error;

    fn try_from(code: String) -> Result<Symbol, Error> {
        Symbol::new(&code)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
