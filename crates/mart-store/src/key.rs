//! Composite keys.
//!
//! A composite key is a collection prefix followed by zero or more
//! attributes, each terminated by `U+0000`:
//!
//! ```text
//! \0trade_c\0<consumer>\0<tx id>\0
//! ```
//!
//! Encoding only a leading subset of the attributes yields a byte prefix of
//! every full key that shares them, which is what range scans rely on.

use std::fmt;

use crate::error::{Result, StoreError};

const DELIMITER: char = '\u{0}';

/// A `(prefix, attributes...)` key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CompositeKey {
    prefix: String,
    attrs: Vec<String>,
}

impl CompositeKey {
    /// Build a composite key.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidKey` if the prefix is empty or any
    /// component contains the delimiter.
    pub fn new<S: AsRef<str>>(prefix: &str, attrs: &[S]) -> Result<Self> {
        if prefix.is_empty() {
            return Err(StoreError::InvalidKey("prefix must not be empty".into()));
        }
        check_component(prefix)?;
        let attrs = attrs
            .iter()
            .map(|a| {
                check_component(a.as_ref())?;
                Ok(a.as_ref().to_string())
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            prefix: prefix.to_string(),
            attrs,
        })
    }

    /// Parse an encoded key.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidKey` if `encoded` is not a composite key.
    pub fn decode(encoded: &str) -> Result<Self> {
        let body = encoded
            .strip_prefix(DELIMITER)
            .and_then(|rest| rest.strip_suffix(DELIMITER))
            .ok_or_else(|| StoreError::InvalidKey(format!("not a composite key: {encoded:?}")))?;
        let mut parts = body.split(DELIMITER);
        let prefix = parts
            .next()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| StoreError::InvalidKey("missing prefix".into()))?;
        Ok(Self {
            prefix: prefix.to_string(),
            attrs: parts.map(str::to_string).collect(),
        })
    }

    /// The collection prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The attributes after the prefix.
    #[must_use]
    pub fn attrs(&self) -> &[String] {
        &self.attrs
    }

    /// Encode to the stored key form.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut out = String::with_capacity(
            2 + self.prefix.len() + self.attrs.iter().map(|a| a.len() + 1).sum::<usize>(),
        );
        out.push(DELIMITER);
        out.push_str(&self.prefix);
        out.push(DELIMITER);
        for attr in &self.attrs {
            out.push_str(attr);
            out.push(DELIMITER);
        }
        out
    }
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.prefix)?;
        for attr in &self.attrs {
            write!(f, "/{attr}")?;
        }
        Ok(())
    }
}

fn check_component(component: &str) -> Result<()> {
    if component.contains(DELIMITER) {
        return Err(StoreError::InvalidKey(format!(
            "component {component:?} contains U+0000"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_roundtrip() {
        let key = CompositeKey::new("trade_c", &["alice", "tx-1"]).unwrap();
        assert_eq!(key.encode(), "\u{0}trade_c\u{0}alice\u{0}tx-1\u{0}");
        assert_eq!(CompositeKey::decode(&key.encode()).unwrap(), key);
    }

    #[test]
    fn partial_key_is_byte_prefix_of_full_key() {
        let full = CompositeKey::new("trade_c", &["alice", "tx-1"]).unwrap().encode();
        let partial = CompositeKey::new("trade_c", &["alice"]).unwrap().encode();
        let other = CompositeKey::new("trade_c", &["alicex", "tx-1"]).unwrap().encode();
        assert!(full.starts_with(&partial));
        assert!(!other.starts_with(&partial));
    }

    #[test]
    fn prefix_only_key_has_no_attrs() {
        let key = CompositeKey::new::<&str>("listing", &[]).unwrap();
        let decoded = CompositeKey::decode(&key.encode()).unwrap();
        assert_eq!(decoded.prefix(), "listing");
        assert!(decoded.attrs().is_empty());
    }

    #[test]
    fn rejects_delimiter_in_component() {
        assert!(CompositeKey::new("trade_c", &["a\u{0}b"]).is_err());
        assert!(CompositeKey::new("", &["a"]).is_err());
    }

    #[test]
    fn decode_rejects_plain_key() {
        assert!(CompositeKey::decode("alice_coin").is_err());
    }

    #[test]
    fn display_is_slash_separated() {
        let key = CompositeKey::new("listing", &["bob", "tx-9"]).unwrap();
        assert_eq!(key.to_string(), "listing/bob/tx-9");
    }
}
