//! The analysis report and everything it carries.
//!
//! A report is a plain value: built once by an analyzer, never mutated
//! afterwards, serializable as is. Findings keep the order of the items in
//! the engine result; general errors always come after the item findings.

use crate::algorithm::{HashAlgorithm, PublicKeyAlgorithm, SymmetricAlgorithm};
use crate::engine::{ErrorCode, Reported, SignMode};
use crate::error::Result;
use crate::key::{Fingerprint, KeyHandle, KeyId};
use crate::trust::TrustAssessment;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};
use std::fmt;

/// Operation a report describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    Decrypt,
    Encrypt,
    Sign,
    Verify,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Decrypt => "decrypt",
            Self::Encrypt => "encrypt",
            Self::Sign => "sign",
            Self::Verify => "verify",
        };
        write!(f, "{}", name)
    }
}

/// Request for the key-server collaborator to fetch a key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FetchKeyIntent {
    pub handle: KeyHandle,
}

/// Something the user can do to improve a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionHint {
    AdjustTrustLevel,
}

/// Terminal state of one verified signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureState {
    MissingKey,
    KeyRevoked,
    SignatureExpired,
    KeyExpired,
    Bad,
    GeneralError,
    Good,
}

impl SignatureState {
    pub fn description(&self) -> &'static str {
        match self {
            Self::MissingKey => "key missing, verification incomplete",
            Self::KeyRevoked => "signed by a revoked key",
            Self::SignatureExpired => "signature expired",
            Self::KeyExpired => "signing key expired",
            Self::Bad => "bad signature",
            Self::GeneralError => "verification error",
            Self::Good => "good signature",
        }
    }
}

/// Structured detail attached to a failed signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: Option<ErrorCode>,
    /// Summary flags the engine raised
    pub summary_flags: Vec<String>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureFinding {
    /// Signer as the engine named it
    pub signer: String,
    pub signer_key_id: Option<KeyId>,
    /// Primary fingerprint of the signing key when resolved, else the engine's fingerprint
    pub signer_fingerprint: Option<Fingerprint>,
    /// Primary user ID of the signing key, when resolved
    pub signer_user_id: Option<String>,
    pub created: Reported<u64>,
    pub expires: Reported<Option<u64>>,
    pub hash_algo: Reported<HashAlgorithm>,
    pub pubkey_algo: Reported<PublicKeyAlgorithm>,
    /// Engine's reason for the validity it assigned, when that reason is an error
    pub validity_reason: Option<ErrorCode>,
    pub chain_model: Reported<bool>,
    pub state: SignatureState,
    /// Present for good signatures
    pub trust: Option<TrustAssessment>,
    pub fully_valid: bool,
    pub hint: Option<ActionHint>,
    pub fetch: Option<FetchKeyIntent>,
    pub error: Option<ErrorDetail>,
}

impl SignatureFinding {
    /// Good and fully valid
    pub fn is_trusted(&self) -> bool {
        self.state == SignatureState::Good && self.fully_valid
    }
}

/// Status of one recipient of a decrypted message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecipientStatus {
    /// Key not present locally
    UnknownKey,
    /// The engine reported an error for this recipient
    EngineError(ErrorCode),
    Ok,
    /// Key present, engine status not reported
    StatusUnknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientFinding {
    pub key_id: String,
    /// Primary fingerprint of the resolved key
    pub key: Option<Fingerprint>,
    pub user_id: Option<String>,
    pub algorithm: Reported<PublicKeyAlgorithm>,
    pub status: RecipientStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvalidRecipientReason {
    NotUsableForEncryption,
    Expired,
    Revoked,
    NotFound,
}

impl InvalidRecipientReason {
    pub fn description(&self) -> &'static str {
        match self {
            Self::NotUsableForEncryption => "key not usable for encryption",
            Self::Expired => "key expired",
            Self::Revoked => "key revoked",
            Self::NotFound => "key not found",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecipientValidity {
    Valid,
    Invalid(InvalidRecipientReason),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptRecipientFinding {
    pub recipient: String,
    pub key: Option<Fingerprint>,
    pub user_id: Option<String>,
    pub validity: RecipientValidity,
    /// False for invalid recipients the engine reported that were not asked for
    pub intended: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerFinding {
    /// Primary fingerprint of the signing key, when resolved
    pub key: Option<Fingerprint>,
    pub user_id: Option<String>,
    /// Subkey that produced the signature, as the engine reported it
    pub subkey: String,
    pub subkey_id: Option<KeyId>,
    /// Whether the primary key signed; unknown when the key is not local
    pub is_primary: Option<bool>,
    pub mode: Reported<SignMode>,
    pub created: Reported<u64>,
    pub hash_algo: Reported<HashAlgorithm>,
    pub pubkey_algo: Reported<PublicKeyAlgorithm>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvalidSignerReason {
    NotUsableForSigning,
    NoSecretKey,
    Expired,
    Revoked,
}

impl InvalidSignerReason {
    pub fn description(&self) -> &'static str {
        match self {
            Self::NotUsableForSigning => "key not usable for signing",
            Self::NoSecretKey => "no secret key",
            Self::Expired => "key expired",
            Self::Revoked => "key revoked",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidSignerFinding {
    pub signer: String,
    pub key: Option<Fingerprint>,
    pub reason: InvalidSignerReason,
    pub engine_reason: Reported<ErrorCode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralErrorFinding {
    pub code: Option<ErrorCode>,
    pub message: String,
}

/// One entry of a report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Finding {
    Recipient(RecipientFinding),
    EncryptRecipient(EncryptRecipientFinding),
    Signer(SignerFinding),
    InvalidSigner(InvalidSignerFinding),
    Signature(SignatureFinding),
    GeneralError(GeneralErrorFinding),
}

/// Conditions that lower trust in a result without making it fail
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Warning {
    /// Decrypted data was not integrity protected, or the engine did not say
    NoIntegrityProtection,
    UnknownRecipientKey { recipient: String },
    UnsupportedAlgorithm { algorithm: String },
    WrongKeyUsage,
    TofuConflict { signer: String },
    /// Verification found no signatures at all
    NoSignatures,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoIntegrityProtection => {
                write!(f, "message was not integrity protected and may have been modified")
            }
            Self::UnknownRecipientKey { recipient } => {
                write!(f, "recipient key {} is not in the local keyring", recipient)
            }
            Self::UnsupportedAlgorithm { algorithm } => {
                write!(f, "unsupported algorithm: {}", algorithm)
            }
            Self::WrongKeyUsage => write!(f, "a key was used contrary to its usage flags"),
            Self::TofuConflict { signer } => write!(f, "TOFU conflict for signer {}", signer),
            Self::NoSignatures => write!(f, "no signatures found"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptDetails {
    pub file_name: Option<String>,
    pub is_mime: Reported<bool>,
    pub integrity_protected: Reported<bool>,
    /// Cipher protecting the session key's payload, for public-key and
    /// passphrase decryption alike
    pub session_cipher: Option<SymmetricAlgorithm>,
    /// Whether every embedded signature was good and fully valid, if any were checked
    pub signatures_verified: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptDetails {
    pub symmetric: Reported<bool>,
    pub intended_recipients: usize,
    pub invalid_recipients: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignDetails {
    pub mode: Reported<SignMode>,
    pub signatures: usize,
    pub invalid_signers: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyDetails {
    pub file_name: Option<String>,
    pub is_mime: Reported<bool>,
    pub signatures: usize,
    pub claimed_signatures: Reported<u64>,
}

/// Per-kind details
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationDetails {
    Decrypt(DecryptDetails),
    Encrypt(EncryptDetails),
    Sign(SignDetails),
    Verify(VerifyDetails),
}

/// Result of analyzing one engine operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub kind: OperationKind,
    pub success: bool,
    pub details: OperationDetails,
    pub findings: Vec<Finding>,
    pub warnings: Vec<Warning>,
    pub summary: String,
}

impl AnalysisReport {
    /// Signature findings in order
    pub fn signatures(&self) -> Vec<&SignatureFinding> {
        self.findings
            .iter()
            .filter_map(|finding| match finding {
                Finding::Signature(sig) => Some(sig),
                _ => None,
            })
            .collect()
    }

    /// Every fetch intent, in finding order
    pub fn fetch_intents(&self) -> Vec<&FetchKeyIntent> {
        self.signatures()
            .into_iter()
            .filter_map(|sig| sig.fetch.as_ref())
            .collect()
    }

    pub fn general_errors(&self) -> Vec<&GeneralErrorFinding> {
        self.findings
            .iter()
            .filter_map(|finding| match finding {
                Finding::GeneralError(err) => Some(err),
                _ => None,
            })
            .collect()
    }

    pub fn has_warning(&self, warning: &Warning) -> bool {
        self.warnings.contains(warning)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// SHA3-256 over the compact JSON form, hex encoded
    pub fn digest(&self) -> Result<String> {
        let canonical = serde_json::to_vec(self)?;
        Ok(hex::encode(Sha3_256::digest(&canonical)))
    }
}

/// Accumulates findings and warnings while an analyzer runs
#[derive(Debug, Default)]
pub(crate) struct ReportBuilder {
    findings: Vec<Finding>,
    general_errors: Vec<GeneralErrorFinding>,
    warnings: Vec<Warning>,
}

impl ReportBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn finding(&mut self, finding: Finding) {
        self.findings.push(finding);
    }

    pub(crate) fn general_error(&mut self, code: Option<ErrorCode>, message: impl Into<String>) {
        self.general_errors.push(GeneralErrorFinding {
            code,
            message: message.into(),
        });
    }

    /// Adds a warning once; repeats are dropped
    pub(crate) fn warning(&mut self, warning: Warning) {
        if !self.warnings.contains(&warning) {
            self.warnings.push(warning);
        }
    }

    /// Moves an analyzed sub-report's findings and warnings into this one
    pub(crate) fn merge(&mut self, report: AnalysisReport) {
        for finding in report.findings {
            match finding {
                Finding::GeneralError(err) => self.general_errors.push(err),
                other => self.findings.push(other),
            }
        }
        for warning in report.warnings {
            self.warning(warning);
        }
    }

    pub(crate) fn has_general_errors(&self) -> bool {
        !self.general_errors.is_empty()
    }

    pub(crate) fn build(
        self,
        kind: OperationKind,
        success: bool,
        details: OperationDetails,
        summary: String,
    ) -> AnalysisReport {
        let mut findings = self.findings;
        findings.extend(self.general_errors.into_iter().map(Finding::GeneralError));
        AnalysisReport {
            kind,
            success,
            details,
            findings,
            warnings: self.warnings,
            summary,
        }
    }
}
