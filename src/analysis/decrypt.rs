//! Decrypt analyzer.

use super::report::{
    AnalysisReport, DecryptDetails, Finding, OperationDetails, OperationKind, RecipientFinding,
    RecipientStatus, ReportBuilder, Warning,
};
use super::verify::analyze_verify;
use super::AnalysisContext;
use crate::engine::{DecryptRecord, RecipientRecord, Reported};
use crate::keyring::KeyLookup;
use tracing::debug;

/// Analyzes the result of a decrypt operation, including embedded signatures
pub fn analyze_decrypt<L: KeyLookup + ?Sized>(
    record: &DecryptRecord,
    keys: &L,
    ctx: &AnalysisContext,
) -> AnalysisReport {
    let mut builder = ReportBuilder::new();

    // A silent engine still counts as successful if it left a result behind
    let usable = record.recipients.is_known() || record.session_cipher.is_known();
    let success = record.outcome.succeeded_given(usable);

    if let Some(code) = record.outcome.error() {
        builder.general_error(
            Some(code),
            record
                .outcome
                .message
                .clone()
                .unwrap_or_else(|| code.description()),
        );
    } else if !success {
        builder.general_error(None, "engine reported neither an outcome nor a result");
    }

    let recipients = record.recipients.known().map(Vec::as_slice).unwrap_or(&[]);
    for recipient in recipients {
        let finding = analyze_recipient(recipient, keys);
        if finding.status == RecipientStatus::UnknownKey {
            builder.warning(Warning::UnknownRecipientKey {
                recipient: finding.key_id.clone(),
            });
        }
        builder.finding(Finding::Recipient(finding));
    }

    if success && !record.integrity_protected.is(&true) {
        debug!(
            integrity = ?record.integrity_protected,
            "decrypted data lacks integrity protection"
        );
        builder.warning(Warning::NoIntegrityProtection);
    }
    if let Reported::Known(algorithm) = &record.unsupported_algorithm {
        builder.warning(Warning::UnsupportedAlgorithm {
            algorithm: algorithm.clone(),
        });
    }
    if record.wrong_key_usage.is(&true) {
        builder.warning(Warning::WrongKeyUsage);
    }

    // An embedded verify result without signatures just means the payload was unsigned
    let mut signatures_verified = None;
    if let Some(verify) = &record.verify {
        let unsigned = verify.signatures.known().is_some_and(Vec::is_empty);
        if !unsigned {
            let embedded = analyze_verify(verify, keys, ctx);
            signatures_verified = Some(embedded.success);
            builder.merge(embedded);
        }
    }

    let summary = summarize(success, record, recipients.len(), signatures_verified);

    builder.build(
        OperationKind::Decrypt,
        success,
        OperationDetails::Decrypt(DecryptDetails {
            file_name: record.file_name.known().cloned(),
            is_mime: record.is_mime,
            integrity_protected: record.integrity_protected,
            session_cipher: record.session_cipher.known().copied(),
            signatures_verified,
        }),
        summary,
    )
}

fn analyze_recipient<L: KeyLookup + ?Sized>(
    recipient: &RecipientRecord,
    keys: &L,
) -> RecipientFinding {
    let key = recipient
        .key
        .handle
        .known()
        .and_then(|handle| keys.find_key(handle));

    let status = match (key, recipient.status) {
        (None, _) => RecipientStatus::UnknownKey,
        (Some(_), Reported::Known(code)) if code.is_error() => RecipientStatus::EngineError(code),
        (Some(_), Reported::Known(_)) => RecipientStatus::Ok,
        (Some(_), Reported::Unknown) => RecipientStatus::StatusUnknown,
    };

    RecipientFinding {
        key_id: recipient.key.display(),
        key: key.map(|key| key.fingerprint().clone()),
        user_id: key
            .and_then(|key| key.primary_user_id())
            .map(|uid| uid.uid()),
        algorithm: recipient.algorithm,
        status,
    }
}

fn summarize(
    success: bool,
    record: &DecryptRecord,
    recipients: usize,
    signatures_verified: Option<bool>,
) -> String {
    let mut summary = if success {
        "Decryption succeeded".to_string()
    } else {
        match record.outcome.error() {
            Some(code) => format!("Decryption failed: {}", code),
            None => "Decryption failed".to_string(),
        }
    };

    match recipients {
        0 => {}
        1 => summary.push_str(" (1 recipient)"),
        n => summary.push_str(&format!(" ({} recipients)", n)),
    }

    match signatures_verified {
        Some(true) => summary.push_str("; embedded signatures are good and fully valid"),
        Some(false) => summary.push_str("; embedded signatures need attention"),
        None => {}
    }
    summary
}
