//! Sign analyzer.
//!
//! Reports the subkey the engine actually signed with. Which subkey that
//! should have been is the engine's decision and is not second-guessed here.

use super::report::{
    AnalysisReport, Finding, InvalidSignerFinding, InvalidSignerReason, OperationDetails,
    OperationKind, ReportBuilder, SignDetails, SignerFinding,
};
use super::AnalysisContext;
use crate::engine::{
    ErrorCode, InvalidKeyRecord, NewSignatureRecord, Reported, SignMode, SignRecord,
};
use crate::key::Key;
use crate::keyring::KeyLookup;
use tracing::debug;

/// Analyzes the result of a sign operation
pub fn analyze_sign<L: KeyLookup + ?Sized>(
    record: &SignRecord,
    keys: &L,
    ctx: &AnalysisContext,
) -> AnalysisReport {
    let mut builder = ReportBuilder::new();

    if let Some(code) = record.outcome.error() {
        builder.general_error(
            Some(code),
            record
                .outcome
                .message
                .clone()
                .unwrap_or_else(|| code.description()),
        );
    }
    if !record.new_signatures.is_known() {
        builder.general_error(None, "engine did not report the created signatures");
    }

    let signatures = record
        .new_signatures
        .known()
        .map(Vec::as_slice)
        .unwrap_or(&[]);
    let invalid = record
        .invalid_signers
        .known()
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    for signature in signatures {
        builder.finding(Finding::Signer(signer_finding(signature, record.mode, keys)));
    }
    for entry in invalid {
        builder.finding(Finding::InvalidSigner(invalid_signer_finding(
            entry,
            keys,
            ctx.reference_time,
        )));
    }

    let success = record.outcome.succeeded_given(!signatures.is_empty())
        && invalid.is_empty()
        && !signatures.is_empty()
        && !builder.has_general_errors();

    debug!(
        signatures = signatures.len(),
        invalid = invalid.len(),
        success,
        "analyzed sign result"
    );

    let summary = if success {
        match signatures.len() {
            1 => "Signing succeeded with 1 key".to_string(),
            n => format!("Signing succeeded with {} keys", n),
        }
    } else if !invalid.is_empty() {
        format!(
            "Signing failed: {} signer{} could not be used",
            invalid.len(),
            if invalid.len() == 1 { "" } else { "s" }
        )
    } else {
        match record.outcome.error() {
            Some(code) => format!("Signing failed: {}", code),
            None => "Signing failed: no signature was created".to_string(),
        }
    };

    builder.build(
        OperationKind::Sign,
        success,
        OperationDetails::Sign(SignDetails {
            mode: record.mode,
            signatures: signatures.len(),
            invalid_signers: invalid.len(),
        }),
        summary,
    )
}

fn signer_finding<L: KeyLookup + ?Sized>(
    signature: &NewSignatureRecord,
    record_mode: Reported<SignMode>,
    keys: &L,
) -> SignerFinding {
    let handle = signature.subkey.handle.known();
    let key = handle.and_then(|handle| keys.find_key(handle));

    SignerFinding {
        key: key.map(|key| key.fingerprint().clone()),
        user_id: key
            .and_then(|key| key.primary_user_id())
            .map(|uid| uid.uid()),
        subkey: signature.subkey.display(),
        subkey_id: handle.map(|handle| handle.key_id()),
        is_primary: match (key, handle) {
            (Some(key), Some(handle)) => Some(handle.matches(key.fingerprint())),
            _ => None,
        },
        mode: match signature.mode {
            Reported::Known(mode) => Reported::Known(mode),
            Reported::Unknown => record_mode,
        },
        created: signature.created,
        hash_algo: signature.hash_algo,
        pubkey_algo: signature.pubkey_algo,
    }
}

fn invalid_signer_finding<L: KeyLookup + ?Sized>(
    entry: &InvalidKeyRecord,
    keys: &L,
    now: u64,
) -> InvalidSignerFinding {
    let key = entry
        .key
        .handle
        .known()
        .and_then(|handle| keys.find_key(handle));

    let reason = match entry.reason {
        Reported::Known(ErrorCode::KeyExpired) => InvalidSignerReason::Expired,
        Reported::Known(ErrorCode::CertRevoked) => InvalidSignerReason::Revoked,
        Reported::Known(ErrorCode::NoSecretKey | ErrorCode::UnusableSecretKey) => {
            InvalidSignerReason::NoSecretKey
        }
        Reported::Known(_) => InvalidSignerReason::NotUsableForSigning,
        Reported::Unknown => key_model_reason(key, now),
    };

    InvalidSignerFinding {
        signer: entry.key.display(),
        key: key.map(|key| key.fingerprint().clone()),
        reason,
        engine_reason: entry.reason,
    }
}

fn key_model_reason(key: Option<&Key>, now: u64) -> InvalidSignerReason {
    match key {
        Some(key) if key.is_revoked() => InvalidSignerReason::Revoked,
        Some(key) if key.is_expired_at(now) => InvalidSignerReason::Expired,
        Some(key) if !key.has_secret() => InvalidSignerReason::NoSecretKey,
        _ => InvalidSignerReason::NotUsableForSigning,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::{HashAlgorithm, PublicKeyAlgorithm};
    use crate::engine::adapter::adapt_sign;
    use crate::engine::{RawEngineError, RawInvalidKey, RawNewSignature, RawSignResult};
    use crate::key::{Fingerprint, KeyUsage, Subkey};

    fn signing_key() -> Key {
        let primary = Subkey::new(
            Fingerprint::parse(&"A".repeat(40)).unwrap(),
            PublicKeyAlgorithm::Ed25519,
            KeyUsage::certify_and_sign(),
            255,
            0,
        )
        .with_secret(true);
        let sub = Subkey::new(
            Fingerprint::parse(&"B".repeat(40)).unwrap(),
            PublicKeyAlgorithm::Ed25519,
            KeyUsage::sign_only(),
            255,
            10,
        )
        .with_secret(true);
        Key::new(primary, vec![sub], vec![]).unwrap()
    }

    fn ok() -> Option<RawEngineError> {
        Some(RawEngineError {
            code: Some(0),
            message: None,
        })
    }

    #[test]
    fn test_subkey_signature_is_attributed() {
        let raw = RawSignResult {
            error: ok(),
            mode: Some(1),
            new_signatures: Some(vec![RawNewSignature {
                fpr: Some("B".repeat(40)),
                sig_type: None,
                pubkey_algo: Some(27),
                hash_algo: Some(8),
                timestamp: Some(100),
            }]),
            invalid_signers: Some(vec![]),
        };
        let report = analyze_sign(&adapt_sign(&raw), &[signing_key()][..], &AnalysisContext::at(0));
        assert!(report.success);

        let Finding::Signer(signer) = &report.findings[0] else {
            panic!("expected signer finding");
        };
        assert_eq!(signer.key.as_ref().map(|f| f.as_str()), Some("A".repeat(40).as_str()));
        assert_eq!(signer.is_primary, Some(false));
        assert_eq!(signer.mode, Reported::Known(SignMode::Detached));
        assert_eq!(signer.hash_algo, Reported::Known(HashAlgorithm::Sha256));
    }

    #[test]
    fn test_invalid_signer_fails() {
        let raw = RawSignResult {
            error: ok(),
            mode: Some(0),
            new_signatures: Some(vec![RawNewSignature {
                fpr: Some("B".repeat(40)),
                ..RawNewSignature::default()
            }]),
            invalid_signers: Some(vec![RawInvalidKey {
                fpr: Some("C".repeat(40)),
                reason: Some(17),
            }]),
        };
        let report = analyze_sign(&adapt_sign(&raw), &[signing_key()][..], &AnalysisContext::at(0));
        assert!(!report.success);
        let Finding::InvalidSigner(invalid) = &report.findings[1] else {
            panic!("expected invalid signer finding");
        };
        assert_eq!(invalid.reason, InvalidSignerReason::NoSecretKey);
    }

    #[test]
    fn test_no_signatures_is_failure() {
        let raw = RawSignResult {
            error: ok(),
            new_signatures: Some(vec![]),
            ..RawSignResult::default()
        };
        let report = analyze_sign(&adapt_sign(&raw), &[] as &[Key], &AnalysisContext::at(0));
        assert!(!report.success);
    }

    #[test]
    fn test_invalid_signer_reason_from_key_model() {
        let mut key = signing_key();
        key.revoke();
        let raw = RawSignResult {
            invalid_signers: Some(vec![RawInvalidKey {
                fpr: Some("A".repeat(40)),
                reason: None,
            }]),
            ..RawSignResult::default()
        };
        let report = analyze_sign(&adapt_sign(&raw), &[key][..], &AnalysisContext::at(0));
        let Finding::InvalidSigner(invalid) = &report.findings[0] else {
            panic!("expected invalid signer finding");
        };
        assert_eq!(invalid.reason, InvalidSignerReason::Revoked);
    }
}
