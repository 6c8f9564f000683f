//! Raw result adapter.
//!
//! Turns raw engine records into typed intermediate records. Adapting never
//! fails: a field the engine left out, or sent in a form we cannot decode,
//! becomes [`Reported::Unknown`]. Lists are `Reported` as a whole so that an
//! empty list ("the engine found none") stays distinct from a missing one.

use super::raw::{
    RawDecryptResult, RawEncryptResult, RawEngineError, RawEngineResult, RawInvalidKey,
    RawNewSignature, RawRecipient, RawSignResult, RawSignature, RawVerifyResult,
};
use super::status::{ErrorCode, SignMode, SignatureSummary};
use crate::algorithm::{HashAlgorithm, PublicKeyAlgorithm, SymmetricAlgorithm};
use crate::key::KeyHandle;
use crate::trust::ValidityCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A value the engine either reported or did not
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Reported<T> {
    Known(T),
    Unknown,
}

impl<T> Reported<T> {
    pub fn from_option(value: Option<T>) -> Self {
        match value {
            Some(value) => Self::Known(value),
            None => Self::Unknown,
        }
    }

    pub fn known(&self) -> Option<&T> {
        match self {
            Self::Known(value) => Some(value),
            Self::Unknown => None,
        }
    }

    pub fn into_known(self) -> Option<T> {
        match self {
            Self::Known(value) => Some(value),
            Self::Unknown => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Reported<U> {
        match self {
            Self::Known(value) => Reported::Known(f(value)),
            Self::Unknown => Reported::Unknown,
        }
    }

    pub fn as_ref(&self) -> Reported<&T> {
        match self {
            Self::Known(value) => Reported::Known(value),
            Self::Unknown => Reported::Unknown,
        }
    }
}

impl<T: PartialEq> Reported<T> {
    /// True only when the value is known and equal to `other`
    pub fn is(&self, other: &T) -> bool {
        self.known() == Some(other)
    }
}

impl<T> From<Option<T>> for Reported<T> {
    fn from(value: Option<T>) -> Self {
        Self::from_option(value)
    }
}

/// The error field of an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineOutcome {
    pub code: Reported<ErrorCode>,
    pub message: Option<String>,
}

impl EngineOutcome {
    fn from_raw(raw: Option<&RawEngineError>) -> Self {
        match raw {
            Some(err) => Self {
                code: Reported::from_option(err.code.map(ErrorCode::from_raw)),
                message: err.message.clone(),
            },
            None => Self {
                code: Reported::Unknown,
                message: None,
            },
        }
    }

    /// The engine explicitly reported success
    pub fn is_no_error(&self) -> bool {
        self.code.is(&ErrorCode::NoError)
    }

    /// The reported error, if the engine reported one
    pub fn error(&self) -> Option<ErrorCode> {
        self.code.known().copied().filter(ErrorCode::is_error)
    }

    /// Success when the engine said so, or said nothing but left a usable result
    pub fn succeeded_given(&self, usable_result: bool) -> bool {
        match self.code {
            Reported::Known(code) => !code.is_error(),
            Reported::Unknown => usable_result,
        }
    }
}

/// A key reference as the engine wrote it, plus the handle it decodes to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRef {
    pub raw: Option<String>,
    pub handle: Reported<KeyHandle>,
}

impl KeyRef {
    pub fn from_raw(raw: Option<&str>) -> Self {
        let handle = match raw {
            Some(text) => match KeyHandle::parse(text) {
                Ok(handle) => Reported::Known(handle),
                Err(err) => {
                    debug!(key = text, error = %err, "engine key reference not decodable");
                    Reported::Unknown
                }
            },
            None => Reported::Unknown,
        };
        Self {
            raw: raw.map(str::to_string),
            handle,
        }
    }

    /// Best display form: the decoded handle, else whatever the engine sent
    pub fn display(&self) -> String {
        match (&self.handle, &self.raw) {
            (Reported::Known(handle), _) => handle.to_string(),
            (Reported::Unknown, Some(raw)) => raw.clone(),
            (Reported::Unknown, None) => "unknown".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientRecord {
    pub key: KeyRef,
    pub algorithm: Reported<PublicKeyAlgorithm>,
    pub status: Reported<ErrorCode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptRecord {
    pub outcome: EngineOutcome,
    pub recipients: Reported<Vec<RecipientRecord>>,
    pub file_name: Reported<String>,
    pub is_mime: Reported<bool>,
    pub integrity_protected: Reported<bool>,
    /// Session key cipher (`symkey_algo`)
    pub session_cipher: Reported<SymmetricAlgorithm>,
    pub unsupported_algorithm: Reported<String>,
    pub wrong_key_usage: Reported<bool>,
    pub verify: Option<VerifyRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidKeyRecord {
    pub key: KeyRef,
    pub reason: Reported<ErrorCode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptRecord {
    pub outcome: EngineOutcome,
    pub recipients: Reported<Vec<KeyRef>>,
    pub invalid_recipients: Reported<Vec<InvalidKeyRecord>>,
    pub symmetric: Reported<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSignatureRecord {
    /// The subkey the engine signed with
    pub subkey: KeyRef,
    pub mode: Reported<SignMode>,
    pub pubkey_algo: Reported<PublicKeyAlgorithm>,
    pub hash_algo: Reported<HashAlgorithm>,
    pub created: Reported<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignRecord {
    pub outcome: EngineOutcome,
    pub mode: Reported<SignMode>,
    pub new_signatures: Reported<Vec<NewSignatureRecord>>,
    pub invalid_signers: Reported<Vec<InvalidKeyRecord>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureRecord {
    pub signer: KeyRef,
    pub summary: Reported<SignatureSummary>,
    pub status: Reported<ErrorCode>,
    pub created: Reported<u64>,
    /// `Known(None)` when the signature does not expire
    pub expires: Reported<Option<u64>>,
    pub validity: Reported<ValidityCode>,
    pub validity_reason: Reported<ErrorCode>,
    pub pubkey_algo: Reported<PublicKeyAlgorithm>,
    pub hash_algo: Reported<HashAlgorithm>,
    pub wrong_key_usage: Reported<bool>,
    /// Validity was computed with the chain model
    pub chain_model: Reported<bool>,
}

impl SignatureRecord {
    /// True when the summary is known and has the bit set
    pub fn has_summary(&self, bit: u32) -> bool {
        self.summary.known().is_some_and(|summary| summary.contains(bit))
    }

    /// True when the status is known and equal to `code`
    pub fn has_status(&self, code: ErrorCode) -> bool {
        self.status.is(&code)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyRecord {
    pub outcome: EngineOutcome,
    pub file_name: Reported<String>,
    pub is_mime: Reported<bool>,
    pub signatures: Reported<Vec<SignatureRecord>>,
    /// Signature count the engine claims, checked against the list
    pub claimed_count: Reported<u64>,
}

/// Adapted result of any operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationRecord {
    Decrypt(DecryptRecord),
    Encrypt(EncryptRecord),
    Sign(SignRecord),
    Verify(VerifyRecord),
}

/// Adapts a raw engine result
pub fn adapt(raw: &RawEngineResult) -> OperationRecord {
    match raw {
        RawEngineResult::Decrypt(raw) => OperationRecord::Decrypt(adapt_decrypt(raw)),
        RawEngineResult::Encrypt(raw) => OperationRecord::Encrypt(adapt_encrypt(raw)),
        RawEngineResult::Sign(raw) => OperationRecord::Sign(adapt_sign(raw)),
        RawEngineResult::Verify(raw) => OperationRecord::Verify(adapt_verify(raw)),
    }
}

fn adapt_list<R, T>(raw: Option<&Vec<R>>, f: impl Fn(&R) -> T) -> Reported<Vec<T>> {
    Reported::from_option(raw.map(|items| items.iter().map(f).collect()))
}

fn adapt_recipient(raw: &RawRecipient) -> RecipientRecord {
    RecipientRecord {
        key: KeyRef::from_raw(raw.keyid.as_deref()),
        algorithm: raw.pubkey_algo.map(PublicKeyAlgorithm::from_id).into(),
        status: raw.status.map(ErrorCode::from_raw).into(),
    }
}

pub fn adapt_decrypt(raw: &RawDecryptResult) -> DecryptRecord {
    // Integrity: the explicit flag wins, otherwise the inverse of the legacy
    // no-MDC marker, otherwise not reported.
    let integrity_protected = match (raw.integrity_protected, raw.legacy_cipher_nomdc) {
        (Some(flag), _) => Reported::Known(flag),
        (None, Some(nomdc)) => Reported::Known(!nomdc),
        (None, None) => Reported::Unknown,
    };

    let record = DecryptRecord {
        outcome: EngineOutcome::from_raw(raw.error.as_ref()),
        recipients: adapt_list(raw.recipients.as_ref(), adapt_recipient),
        file_name: raw.file_name.clone().filter(|name| !name.is_empty()).into(),
        is_mime: raw.is_mime.into(),
        integrity_protected,
        session_cipher: raw.symkey_algo.map(SymmetricAlgorithm::from_id).into(),
        unsupported_algorithm: raw.unsupported_algorithm.clone().into(),
        wrong_key_usage: raw.wrong_key_usage.into(),
        verify: raw.verify.as_ref().map(adapt_verify),
    };

    debug!(
        error = ?record.outcome.code,
        recipients = record.recipients.known().map(Vec::len),
        integrity = ?record.integrity_protected,
        embedded_verify = record.verify.is_some(),
        "adapted decrypt result"
    );
    record
}

fn adapt_invalid_key(raw: &RawInvalidKey) -> InvalidKeyRecord {
    InvalidKeyRecord {
        key: KeyRef::from_raw(raw.fpr.as_deref()),
        reason: raw.reason.map(ErrorCode::from_raw).into(),
    }
}

pub fn adapt_encrypt(raw: &RawEncryptResult) -> EncryptRecord {
    let record = EncryptRecord {
        outcome: EngineOutcome::from_raw(raw.error.as_ref()),
        recipients: adapt_list(raw.recipients.as_ref(), |r| KeyRef::from_raw(Some(r.as_str()))),
        invalid_recipients: adapt_list(raw.invalid_recipients.as_ref(), adapt_invalid_key),
        symmetric: raw.symmetric.into(),
    };

    debug!(
        error = ?record.outcome.code,
        recipients = record.recipients.known().map(Vec::len),
        invalid = record.invalid_recipients.known().map(Vec::len),
        "adapted encrypt result"
    );
    record
}

fn adapt_new_signature(raw: &RawNewSignature) -> NewSignatureRecord {
    NewSignatureRecord {
        subkey: KeyRef::from_raw(raw.fpr.as_deref()),
        mode: raw.sig_type.map(SignMode::from_code).into(),
        pubkey_algo: raw.pubkey_algo.map(PublicKeyAlgorithm::from_id).into(),
        hash_algo: raw.hash_algo.map(HashAlgorithm::from_id).into(),
        created: raw.timestamp.into(),
    }
}

pub fn adapt_sign(raw: &RawSignResult) -> SignRecord {
    let record = SignRecord {
        outcome: EngineOutcome::from_raw(raw.error.as_ref()),
        mode: raw.mode.map(SignMode::from_code).into(),
        new_signatures: adapt_list(raw.new_signatures.as_ref(), adapt_new_signature),
        invalid_signers: adapt_list(raw.invalid_signers.as_ref(), adapt_invalid_key),
    };

    debug!(
        error = ?record.outcome.code,
        signatures = record.new_signatures.known().map(Vec::len),
        invalid = record.invalid_signers.known().map(Vec::len),
        "adapted sign result"
    );
    record
}

fn adapt_signature(raw: &RawSignature) -> SignatureRecord {
    SignatureRecord {
        signer: KeyRef::from_raw(raw.fpr.as_deref()),
        summary: raw.summary.map(SignatureSummary).into(),
        status: raw.status.map(ErrorCode::from_raw).into(),
        created: raw.timestamp.into(),
        expires: raw.exp_timestamp.map(|exp| (exp != 0).then_some(exp)).into(),
        validity: raw.validity.map(ValidityCode).into(),
        validity_reason: raw.validity_reason.map(ErrorCode::from_raw).into(),
        pubkey_algo: raw.pubkey_algo.map(PublicKeyAlgorithm::from_id).into(),
        hash_algo: raw.hash_algo.map(HashAlgorithm::from_id).into(),
        wrong_key_usage: raw.wrong_key_usage.into(),
        chain_model: raw.chain_model.into(),
    }
}

pub fn adapt_verify(raw: &RawVerifyResult) -> VerifyRecord {
    let record = VerifyRecord {
        outcome: EngineOutcome::from_raw(raw.error.as_ref()),
        file_name: raw.file_name.clone().filter(|name| !name.is_empty()).into(),
        is_mime: raw.is_mime.into(),
        signatures: adapt_list(raw.signatures.as_ref(), adapt_signature),
        claimed_count: raw.signature_count.into(),
    };

    debug!(
        error = ?record.outcome.code,
        signatures = record.signatures.known().map(Vec::len),
        claimed = ?record.claimed_count,
        "adapted verify result"
    );
    record
}
