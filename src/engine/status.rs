//! Decoding of the engine's numeric status words.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error code carried by an engine result, with the error source bits removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    NoError,
    BadSignature,
    NoPublicKey,
    NoSecretKey,
    UnusablePublicKey,
    UnusableSecretKey,
    CertRevoked,
    WrongKeyUsage,
    DecryptFailed,
    KeyExpired,
    SigExpired,
    Other(u32),
}

impl ErrorCode {
    /// Mask selecting the code part of a gpg-error value
    pub const CODE_MASK: u64 = 0xFFFF;

    /// Decodes a raw gpg-error value
    pub fn from_raw(raw: u64) -> Self {
        match (raw & Self::CODE_MASK) as u32 {
            0 => Self::NoError,
            8 => Self::BadSignature,
            9 => Self::NoPublicKey,
            17 => Self::NoSecretKey,
            53 => Self::UnusablePublicKey,
            54 => Self::UnusableSecretKey,
            94 => Self::CertRevoked,
            125 => Self::WrongKeyUsage,
            152 => Self::DecryptFailed,
            153 => Self::KeyExpired,
            154 => Self::SigExpired,
            other => Self::Other(other),
        }
    }

    /// Returns the numeric code
    pub fn code(&self) -> u32 {
        match self {
            Self::NoError => 0,
            Self::BadSignature => 8,
            Self::NoPublicKey => 9,
            Self::NoSecretKey => 17,
            Self::UnusablePublicKey => 53,
            Self::UnusableSecretKey => 54,
            Self::CertRevoked => 94,
            Self::WrongKeyUsage => 125,
            Self::DecryptFailed => 152,
            Self::KeyExpired => 153,
            Self::SigExpired => 154,
            Self::Other(code) => *code,
        }
    }

    pub fn is_error(&self) -> bool {
        *self != Self::NoError
    }

    /// Short description in the engine's wording
    pub fn description(&self) -> String {
        match self {
            Self::NoError => "Success".to_string(),
            Self::BadSignature => "Bad signature".to_string(),
            Self::NoPublicKey => "No public key".to_string(),
            Self::NoSecretKey => "No secret key".to_string(),
            Self::UnusablePublicKey => "Unusable public key".to_string(),
            Self::UnusableSecretKey => "Unusable secret key".to_string(),
            Self::CertRevoked => "Certificate revoked".to_string(),
            Self::WrongKeyUsage => "Wrong key usage".to_string(),
            Self::DecryptFailed => "Decryption failed".to_string(),
            Self::KeyExpired => "Key expired".to_string(),
            Self::SigExpired => "Signature expired".to_string(),
            Self::Other(code) => format!("Engine error {}", code),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// The engine's per-signature summary bit set
///
/// Bits this crate does not name are kept as they are and never consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SignatureSummary(pub u32);

impl SignatureSummary {
    pub const VALID: u32 = 0x0001;
    pub const GREEN: u32 = 0x0002;
    pub const RED: u32 = 0x0004;
    pub const KEY_REVOKED: u32 = 0x0010;
    pub const KEY_EXPIRED: u32 = 0x0020;
    pub const SIG_EXPIRED: u32 = 0x0040;
    pub const KEY_MISSING: u32 = 0x0080;
    pub const CRL_MISSING: u32 = 0x0100;
    pub const CRL_TOO_OLD: u32 = 0x0200;
    pub const BAD_POLICY: u32 = 0x0400;
    pub const SYS_ERROR: u32 = 0x0800;
    pub const TOFU_CONFLICT: u32 = 0x1000;

    pub fn contains(&self, bit: u32) -> bool {
        self.0 & bit != 0
    }

    /// Names of the set bits, lowest first
    pub fn flag_names(&self) -> Vec<&'static str> {
        const NAMES: [(u32, &str); 12] = [
            (SignatureSummary::VALID, "valid"),
            (SignatureSummary::GREEN, "green"),
            (SignatureSummary::RED, "red"),
            (SignatureSummary::KEY_REVOKED, "key-revoked"),
            (SignatureSummary::KEY_EXPIRED, "key-expired"),
            (SignatureSummary::SIG_EXPIRED, "sig-expired"),
            (SignatureSummary::KEY_MISSING, "key-missing"),
            (SignatureSummary::CRL_MISSING, "crl-missing"),
            (SignatureSummary::CRL_TOO_OLD, "crl-too-old"),
            (SignatureSummary::BAD_POLICY, "bad-policy"),
            (SignatureSummary::SYS_ERROR, "sys-error"),
            (SignatureSummary::TOFU_CONFLICT, "tofu-conflict"),
        ];
        NAMES
            .iter()
            .filter(|(bit, _)| self.contains(*bit))
            .map(|(_, name)| *name)
            .collect()
    }
}

/// Signature mode used by a sign operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignMode {
    Normal,
    Detached,
    Clear,
    Unknown(u32),
}

impl SignMode {
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => Self::Normal,
            1 => Self::Detached,
            2 => Self::Clear,
            other => Self::Unknown(other),
        }
    }
}

impl fmt::Display for SignMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::Detached => write!(f, "detached"),
            Self::Clear => write!(f, "clear"),
            Self::Unknown(code) => write!(f, "unknown({})", code),
        }
    }
}
