//! Raw engine result records.
//!
//! These mirror the engine's native result objects field for field, copied
//! out eagerly once the operation finished. Every field is optional because
//! the engine omits whatever it did not compute, and the adapter must be
//! able to tell "absent" from any real value.

use crate::error::{GpgReportError, Result};
use crate::validation::Validator;
use serde::{Deserialize, Serialize};

/// Error field of an engine result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawEngineError {
    /// gpg-error value, source bits included
    pub code: Option<u64>,
    pub message: Option<String>,
}

/// One recipient of a decrypted message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawRecipient {
    pub keyid: Option<String>,
    pub pubkey_algo: Option<u32>,
    /// gpg-error value for this recipient
    pub status: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawDecryptResult {
    pub error: Option<RawEngineError>,
    pub recipients: Option<Vec<RawRecipient>>,
    pub file_name: Option<String>,
    pub symkey_algo: Option<u32>,
    pub is_mime: Option<bool>,
    pub legacy_cipher_nomdc: Option<bool>,
    pub integrity_protected: Option<bool>,
    pub unsupported_algorithm: Option<String>,
    pub wrong_key_usage: Option<bool>,
    /// Signatures found inside the decrypted payload
    pub verify: Option<RawVerifyResult>,
}

/// A key the engine refused to use
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawInvalidKey {
    pub fpr: Option<String>,
    /// gpg-error value explaining the refusal
    pub reason: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawEncryptResult {
    pub error: Option<RawEngineError>,
    /// Recipients the caller asked for, as fingerprints or key IDs
    pub recipients: Option<Vec<String>>,
    pub invalid_recipients: Option<Vec<RawInvalidKey>>,
    /// Symmetric (passphrase only) encryption
    pub symmetric: Option<bool>,
}

/// A signature created by a sign operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawNewSignature {
    /// Fingerprint of the subkey that signed
    pub fpr: Option<String>,
    /// 0 normal, 1 detached, 2 clear
    pub sig_type: Option<u32>,
    pub pubkey_algo: Option<u32>,
    pub hash_algo: Option<u32>,
    pub timestamp: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSignResult {
    pub error: Option<RawEngineError>,
    pub mode: Option<u32>,
    pub new_signatures: Option<Vec<RawNewSignature>>,
    pub invalid_signers: Option<Vec<RawInvalidKey>>,
}

/// One signature as reported by a verify operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSignature {
    pub summary: Option<u32>,
    /// Fingerprint, or only a key ID when the key is missing
    pub fpr: Option<String>,
    pub status: Option<u64>,
    pub timestamp: Option<u64>,
    /// 0 means the signature does not expire
    pub exp_timestamp: Option<u64>,
    pub validity: Option<i64>,
    pub validity_reason: Option<u64>,
    pub pubkey_algo: Option<u32>,
    pub hash_algo: Option<u32>,
    pub wrong_key_usage: Option<bool>,
    pub chain_model: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawVerifyResult {
    pub error: Option<RawEngineError>,
    pub file_name: Option<String>,
    pub is_mime: Option<bool>,
    pub signatures: Option<Vec<RawSignature>>,
    /// Number of signatures the engine claims to have found
    pub signature_count: Option<u64>,
}

/// A raw result of any operation, tagged by `"operation"`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum RawEngineResult {
    Decrypt(RawDecryptResult),
    Encrypt(RawEncryptResult),
    Sign(RawSignResult),
    Verify(RawVerifyResult),
}

impl RawEngineResult {
    /// Parses a JSON document produced by the engine bridge
    pub fn from_json(data: &[u8]) -> Result<Self> {
        Validator::validate_raw_result_size(data)?;
        serde_json::from_slice(data).map_err(|e| {
            GpgReportError::serialization(format!("Failed to parse raw engine result: {}", e))
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_json_parses() {
        let raw = RawEngineResult::from_json(br#"{"operation":"verify"}"#).unwrap();
        assert_eq!(raw, RawEngineResult::Verify(RawVerifyResult::default()));

        let raw = RawEngineResult::from_json(
            br#"{"operation":"verify","signatures":[{"fpr":"ABCD","summary":128}]}"#,
        )
        .unwrap();
        let RawEngineResult::Verify(verify) = raw else {
            panic!("expected verify result");
        };
        let sigs = verify.signatures.unwrap();
        assert_eq!(sigs[0].summary, Some(128));
        assert_eq!(sigs[0].status, None);
    }

    #[test]
    fn test_unknown_operation_rejected() {
        assert!(RawEngineResult::from_json(br#"{"operation":"keygen"}"#).is_err());
        assert!(RawEngineResult::from_json(b"not json").is_err());
    }
}
