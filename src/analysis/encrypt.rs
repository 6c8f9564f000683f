//! Encrypt analyzer.
//!
//! Fails closed: a single invalid recipient makes the whole operation
//! unsuccessful, whatever the engine says about completion.

use super::report::{
    AnalysisReport, EncryptDetails, EncryptRecipientFinding, Finding, InvalidRecipientReason,
    OperationDetails, OperationKind, RecipientValidity, ReportBuilder,
};
use super::AnalysisContext;
use crate::engine::{EncryptRecord, ErrorCode, InvalidKeyRecord, KeyRef, Reported};
use crate::key::Key;
use crate::keyring::KeyLookup;
use tracing::debug;

/// Analyzes the result of an encrypt operation
pub fn analyze_encrypt<L: KeyLookup + ?Sized>(
    record: &EncryptRecord,
    keys: &L,
    ctx: &AnalysisContext,
) -> AnalysisReport {
    let mut builder = ReportBuilder::new();

    let intended = record.recipients.known().map(Vec::as_slice).unwrap_or(&[]);
    let invalid = record
        .invalid_recipients
        .known()
        .map(Vec::as_slice)
        .unwrap_or(&[]);
    let symmetric = record.symmetric.is(&true);

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
    if !record.recipients.is_known() && !symmetric {
        builder.general_error(None, "engine did not report the intended recipients");
    }

    let mut matched = vec![false; invalid.len()];
    let mut invalid_count = 0;

    for recipient in intended {
        let engine_entry = invalid
            .iter()
            .position(|entry| same_key(&entry.key, recipient));
        if let Some(index) = engine_entry {
            matched[index] = true;
        }

        let key = find(recipient, keys);
        let validity = match engine_entry {
            Some(index) => RecipientValidity::Invalid(engine_reason(
                &invalid[index],
                key,
                ctx.reference_time,
            )),
            None => match key_model_reason(key, ctx.reference_time) {
                Some(reason) => RecipientValidity::Invalid(reason),
                None => RecipientValidity::Valid,
            },
        };
        if validity != RecipientValidity::Valid {
            invalid_count += 1;
        }

        builder.finding(Finding::EncryptRecipient(recipient_finding(
            recipient, key, validity, true,
        )));
    }

    // Invalid recipients the engine reported but the caller never asked for
    for (entry, _) in invalid.iter().zip(&matched).filter(|(_, seen)| !**seen) {
        let key = find(&entry.key, keys);
        let reason = engine_reason(entry, key, ctx.reference_time);
        invalid_count += 1;
        builder.finding(Finding::EncryptRecipient(recipient_finding(
            &entry.key,
            key,
            RecipientValidity::Invalid(reason),
            false,
        )));
    }

    let usable = !intended.is_empty() || symmetric;
    let success = record.outcome.succeeded_given(usable)
        && usable
        && invalid_count == 0
        && !builder.has_general_errors();

    debug!(
        intended = intended.len(),
        invalid = invalid_count,
        success,
        "analyzed encrypt result"
    );

    let summary = if success {
        match intended.len() {
            0 => "Encryption succeeded (symmetric)".to_string(),
            1 => "Encryption succeeded for 1 recipient".to_string(),
            n => format!("Encryption succeeded for {} recipients", n),
        }
    } else if invalid_count > 0 {
        format!(
            "Encryption failed: {} of {} recipient{} invalid",
            invalid_count,
            intended.len().max(invalid_count),
            if intended.len().max(invalid_count) == 1 { " is" } else { "s are" }
        )
    } else {
        match record.outcome.error() {
            Some(code) => format!("Encryption failed: {}", code),
            None => "Encryption failed".to_string(),
        }
    };

    builder.build(
        OperationKind::Encrypt,
        success,
        OperationDetails::Encrypt(EncryptDetails {
            symmetric: record.symmetric,
            intended_recipients: intended.len(),
            invalid_recipients: invalid_count,
        }),
        summary,
    )
}

fn find<'k, L: KeyLookup + ?Sized>(key: &KeyRef, keys: &'k L) -> Option<&'k Key> {
    key.handle.known().and_then(|handle| keys.find_key(handle))
}

/// Two engine references name the same key if their key IDs agree
fn same_key(a: &KeyRef, b: &KeyRef) -> bool {
    match (&a.handle, &b.handle) {
        (Reported::Known(a), Reported::Known(b)) => a.key_id() == b.key_id(),
        _ => a.raw.is_some() && a.raw == b.raw,
    }
}

/// The engine's reason wins; the key model only fills in when none was given
fn engine_reason(entry: &InvalidKeyRecord, key: Option<&Key>, now: u64) -> InvalidRecipientReason {
    match entry.reason {
        Reported::Known(ErrorCode::KeyExpired) => InvalidRecipientReason::Expired,
        Reported::Known(ErrorCode::CertRevoked) => InvalidRecipientReason::Revoked,
        Reported::Known(ErrorCode::NoPublicKey) => InvalidRecipientReason::NotFound,
        Reported::Known(_) => InvalidRecipientReason::NotUsableForEncryption,
        Reported::Unknown => key_model_reason(key, now)
            .unwrap_or(InvalidRecipientReason::NotUsableForEncryption),
    }
}

/// Checks in the order: not found, revoked, expired, no encryption subkey
fn key_model_reason(key: Option<&Key>, now: u64) -> Option<InvalidRecipientReason> {
    let Some(key) = key else {
        return Some(InvalidRecipientReason::NotFound);
    };
    if key.is_revoked() {
        Some(InvalidRecipientReason::Revoked)
    } else if key.is_expired_at(now) {
        Some(InvalidRecipientReason::Expired)
    } else if !key.can_encrypt_at(now) {
        Some(InvalidRecipientReason::NotUsableForEncryption)
    } else {
        None
    }
}

fn recipient_finding(
    recipient: &KeyRef,
    key: Option<&Key>,
    validity: RecipientValidity,
    intended: bool,
) -> EncryptRecipientFinding {
    EncryptRecipientFinding {
        recipient: recipient.display(),
        key: key.map(|key| key.fingerprint().clone()),
        user_id: key
            .and_then(|key| key.primary_user_id())
            .map(|uid| uid.uid()),
        validity,
        intended,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::PublicKeyAlgorithm;
    use crate::engine::adapter::adapt_encrypt;
    use crate::engine::{RawEncryptResult, RawEngineError, RawInvalidKey};
    use crate::key::{Fingerprint, KeyUsage, Subkey};

    const NOW: u64 = 1_700_000_000;

    fn key(c: char, sub: char) -> Key {
        let primary = Subkey::new(
            Fingerprint::parse(&c.to_string().repeat(40)).unwrap(),
            PublicKeyAlgorithm::Ed25519,
            KeyUsage::certify_and_sign(),
            255,
            0,
        );
        let enc = Subkey::new(
            Fingerprint::parse(&sub.to_string().repeat(40)).unwrap(),
            PublicKeyAlgorithm::X25519,
            KeyUsage::encrypt_only(),
            255,
            0,
        );
        Key::new(primary, vec![enc], vec![]).unwrap()
    }

    fn analyze(raw: &RawEncryptResult, keys: &[Key]) -> AnalysisReport {
        analyze_encrypt(&adapt_encrypt(raw), keys, &AnalysisContext::at(NOW))
    }

    fn validities(report: &AnalysisReport) -> Vec<RecipientValidity> {
        report
            .findings
            .iter()
            .filter_map(|f| match f {
                Finding::EncryptRecipient(r) => Some(r.validity),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_all_recipients_valid() {
        let raw = RawEncryptResult {
            error: Some(RawEngineError {
                code: Some(0),
                message: None,
            }),
            recipients: Some(vec!["A".repeat(40), "C".repeat(16)]),
            invalid_recipients: Some(vec![]),
            symmetric: Some(false),
        };
        let report = analyze(&raw, &[key('A', 'B'), key('C', 'D')]);
        assert!(report.success);
        assert_eq!(validities(&report), vec![RecipientValidity::Valid; 2]);
    }

    #[test]
    fn test_engine_reason_wins() {
        let raw = RawEncryptResult {
            error: Some(RawEngineError {
                code: Some(0),
                message: None,
            }),
            recipients: Some(vec!["A".repeat(40)]),
            invalid_recipients: Some(vec![RawInvalidKey {
                fpr: Some("A".repeat(40)),
                reason: Some(94),
            }]),
            symmetric: None,
        };
        let report = analyze(&raw, &[key('A', 'B')]);
        assert!(!report.success);
        assert_eq!(
            validities(&report),
            vec![RecipientValidity::Invalid(InvalidRecipientReason::Revoked)]
        );
    }

    #[test]
    fn test_key_model_catches_unflagged_recipient() {
        let mut revoked = key('A', 'B');
        revoked.revoke();
        let raw = RawEncryptResult {
            error: Some(RawEngineError {
                code: Some(0),
                message: None,
            }),
            recipients: Some(vec!["A".repeat(40), "E".repeat(40)]),
            invalid_recipients: Some(vec![]),
            symmetric: None,
        };
        let report = analyze(&raw, &[revoked]);
        assert!(!report.success);
        assert_eq!(
            validities(&report),
            vec![
                RecipientValidity::Invalid(InvalidRecipientReason::Revoked),
                RecipientValidity::Invalid(InvalidRecipientReason::NotFound),
            ]
        );
    }

    #[test]
    fn test_unrequested_invalid_recipient_is_reported() {
        let raw = RawEncryptResult {
            error: None,
            recipients: Some(vec!["A".repeat(40)]),
            invalid_recipients: Some(vec![RawInvalidKey {
                fpr: Some("C".repeat(40)),
                reason: Some(53),
            }]),
            symmetric: None,
        };
        let report = analyze(&raw, &[key('A', 'B')]);
        assert!(!report.success);
        let Finding::EncryptRecipient(extra) = &report.findings[1] else {
            panic!("expected encrypt recipient finding");
        };
        assert!(!extra.intended);
        assert_eq!(
            extra.validity,
            RecipientValidity::Invalid(InvalidRecipientReason::NotUsableForEncryption)
        );
    }

    #[test]
    fn test_symmetric_only() {
        let raw = RawEncryptResult {
            error: Some(RawEngineError {
                code: Some(0),
                message: None,
            }),
            recipients: None,
            invalid_recipients: None,
            symmetric: Some(true),
        };
        let report = analyze(&raw, &[]);
        assert!(report.success);
        assert!(report.findings.is_empty());
    }

    #[test]
    fn test_sparse_result_fails_closed() {
        let report = analyze(&RawEncryptResult::default(), &[]);
        assert!(!report.success);
        assert_eq!(report.general_errors().len(), 1);
    }
}
