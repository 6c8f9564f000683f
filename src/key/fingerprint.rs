//! Fingerprints, key IDs and lookup handles.

use crate::error::{GpgReportError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of hex digits in a v4 fingerprint
pub const FINGERPRINT_HEX_LEN: usize = 40;

/// Number of hex digits in a long key ID
pub const KEY_ID_HEX_LEN: usize = 16;

/// A 40 hex digit OpenPGP fingerprint, stored upper case
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint(String);

/// A 16 hex digit key ID, always the tail of a fingerprint
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeyId(String);

/// Anything `find_key` accepts
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KeyHandle {
    Fingerprint(Fingerprint),
    KeyId(KeyId),
}

/// Strips whitespace and an optional `0x` prefix, upper-cases the rest
fn normalize_hex(input: &str) -> String {
    let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    let stripped = compact
        .strip_prefix("0x")
        .or_else(|| compact.strip_prefix("0X"))
        .unwrap_or(&compact);
    stripped.to_ascii_uppercase()
}

fn check_hex(value: &str, expected_len: usize, what: &str) -> Result<()> {
    if value.len() != expected_len {
        return Err(GpgReportError::fingerprint(format!(
            "{} must have {} hex digits, got {}",
            what,
            expected_len,
            value.len()
        )));
    }
    if !value.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(GpgReportError::fingerprint(format!(
            "{} contains non-hex characters: {}",
            what, value
        )));
    }
    Ok(())
}

impl Fingerprint {
    /// Parses a fingerprint, accepting spaced ("beautified") and lower-case forms
    pub fn parse(input: &str) -> Result<Self> {
        let value = normalize_hex(input);
        check_hex(&value, FINGERPRINT_HEX_LEN, "Fingerprint")?;
        Ok(Self(value))
    }

    /// Returns the fingerprint as upper-case hex
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the long key ID (last 16 hex digits)
    pub fn key_id(&self) -> KeyId {
        KeyId(self.0[FINGERPRINT_HEX_LEN - KEY_ID_HEX_LEN..].to_string())
    }

    /// Groups the fingerprint into blocks of five digits for display
    pub fn beautified(&self) -> String {
        let mut out = String::with_capacity(self.0.len() + self.0.len() / 5);
        for (i, c) in self.0.chars().enumerate() {
            if i != 0 && i % 5 == 0 {
                out.push(' ');
            }
            out.push(c);
        }
        out
    }
}

impl KeyId {
    /// Parses a 16 digit key ID
    pub fn parse(input: &str) -> Result<Self> {
        let value = normalize_hex(input);
        check_hex(&value, KEY_ID_HEX_LEN, "Key ID")?;
        Ok(Self(value))
    }

    /// Returns the key ID as upper-case hex
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl KeyHandle {
    /// Parses a fingerprint or a long key ID, decided by length
    pub fn parse(input: &str) -> Result<Self> {
        let value = normalize_hex(input);
        match value.len() {
            FINGERPRINT_HEX_LEN => Ok(Self::Fingerprint(Fingerprint::parse(&value)?)),
            KEY_ID_HEX_LEN => Ok(Self::KeyId(KeyId::parse(&value)?)),
            other => Err(GpgReportError::fingerprint(format!(
                "expected a fingerprint or long key ID, got {} hex digits",
                other
            ))),
        }
    }

    /// Returns the key ID this handle refers to
    pub fn key_id(&self) -> KeyId {
        match self {
            Self::Fingerprint(fpr) => fpr.key_id(),
            Self::KeyId(id) => id.clone(),
        }
    }

    /// Returns the fingerprint if this handle carries one
    pub fn fingerprint(&self) -> Option<&Fingerprint> {
        match self {
            Self::Fingerprint(fpr) => Some(fpr),
            Self::KeyId(_) => None,
        }
    }

    /// Returns true if this handle designates the given fingerprint
    pub fn matches(&self, fingerprint: &Fingerprint) -> bool {
        match self {
            Self::Fingerprint(fpr) => fpr == fingerprint,
            Self::KeyId(id) => &fingerprint.key_id() == id,
        }
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for KeyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fingerprint(fpr) => write!(f, "{}", fpr),
            Self::KeyId(id) => write!(f, "{}", id),
        }
    }
}

impl FromStr for Fingerprint {
    type Err = GpgReportError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl FromStr for KeyId {
    type Err = GpgReportError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl FromStr for KeyHandle {
    type Err = GpgReportError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = GpgReportError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Fingerprint> for String {
    fn from(value: Fingerprint) -> Self {
        value.0
    }
}

impl TryFrom<String> for KeyId {
    type Error = GpgReportError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<KeyId> for String {
    fn from(value: KeyId) -> Self {
        value.0
    }
}

impl From<Fingerprint> for KeyHandle {
    fn from(value: Fingerprint) -> Self {
        Self::Fingerprint(value)
    }
}

impl From<KeyId> for KeyHandle {
    fn from(value: KeyId) -> Self {
        Self::KeyId(value)
    }
}
