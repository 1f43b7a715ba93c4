//! Safe SQL identifier handling.
//!
//! [`Ident`] is a single validated name (schema, table, alias or column).
//! Identifiers cannot be bound as parameters, so every name that does not come
//! from a `&'static str` inside this crate goes through [`Ident::parse`] before
//! it reaches a statement.
//!
//! - Unquoted names are validated against `[A-Za-z_][A-Za-z0-9_$]*`
//! - Quoted names (`"CamelCase"`) allow any character except NUL and escape `"` as `""`

use crate::error::{DbError, DbResult};
use std::fmt;

/// A validated SQL identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident {
    name: String,
    quoted: bool,
}

impl Ident {
    /// Parse an identifier, accepting either a plain name or a `"quoted"` one.
    pub fn parse(s: &str) -> DbResult<Self> {
        if s.is_empty() {
            return Err(DbError::validation("Identifier cannot be empty"));
        }
        if s.contains('\0') {
            return Err(DbError::validation(
                "Identifier cannot contain NUL character",
            ));
        }

        if let Some(inner) = s.strip_prefix('"') {
            let Some(inner) = inner.strip_suffix('"') else {
                return Err(DbError::validation("Unclosed quoted identifier"));
            };
            let mut name = String::with_capacity(inner.len());
            let mut chars = inner.chars().peekable();
            while let Some(c) = chars.next() {
                if c == '"' {
                    // Only `""` may appear inside a quoted identifier.
                    if chars.next() != Some('"') {
                        return Err(DbError::validation("Unescaped quote in identifier"));
                    }
                }
                name.push(c);
            }
            return Self::quoted(&name);
        }

        let mut chars = s.chars();
        if let Some(first) = chars.next() {
            if !(first == '_' || first.is_ascii_alphabetic()) {
                return Err(DbError::validation(format!(
                    "Invalid identifier start character: '{first}'"
                )));
            }
        }
        if let Some(c) = chars.find(|c| !(*c == '_' || *c == '$' || c.is_ascii_alphanumeric())) {
            return Err(DbError::validation(format!(
                "Invalid character in identifier: '{c}'"
            )));
        }

        Ok(Self {
            name: s.to_string(),
            quoted: false,
        })
    }

    /// Create a quoted identifier from a raw name.
    pub fn quoted(name: &str) -> DbResult<Self> {
        if name.is_empty() {
            return Err(DbError::validation("Empty quoted identifier"));
        }
        if name.contains('\0') {
            return Err(DbError::validation(
                "Identifier cannot contain NUL character",
            ));
        }
        Ok(Self {
            name: name.to_string(),
            quoted: true,
        })
    }

    /// An unquoted identifier from a name known to be valid at compile time.
    pub(crate) fn trusted(name: &'static str) -> Self {
        debug_assert!(Self::parse(name).is_ok_and(|i| !i.quoted));
        Self {
            name: name.to_string(),
            quoted: false,
        }
    }

    /// The raw name without quoting.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Render the identifier as SQL.
    pub fn to_sql(&self) -> String {
        let mut out = String::with_capacity(self.name.len() + 2);
        self.write_sql(&mut out);
        out
    }

    pub(crate) fn write_sql(&self, out: &mut String) {
        if !self.quoted {
            out.push_str(&self.name);
            return;
        }
        out.push('"');
        for ch in self.name.chars() {
            if ch == '"' {
                out.push('"');
            }
            out.push(ch);
        }
        out.push('"');
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}
