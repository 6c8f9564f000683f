//! Verify analyzer.
//!
//! Every signature is classified into exactly one [`SignatureState`]. The
//! engine can raise several conditions at once, so the checks run in a fixed
//! order and the first one that holds decides:
//!
//! 1. missing key
//! 2. revoked key
//! 3. expired signature
//! 4. expired key
//! 5. bad signature
//! 6. any other error
//! 7. good
//!
//! All signatures are analyzed even after a failure.

use super::report::{
    ActionHint, AnalysisReport, ErrorDetail, FetchKeyIntent, Finding, OperationDetails,
    OperationKind, ReportBuilder, SignatureFinding, SignatureState, VerifyDetails, Warning,
};
use super::AnalysisContext;
use crate::engine::{ErrorCode, Reported, SignatureRecord, SignatureSummary, VerifyRecord};
use crate::key::{Key, Subkey};
use crate::keyring::KeyLookup;
use crate::trust::classify;
use tracing::{debug, warn};

/// Analyzes the result of a verify operation
pub fn analyze_verify<L: KeyLookup + ?Sized>(
    record: &VerifyRecord,
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

    let signatures = match &record.signatures {
        Reported::Known(signatures) => signatures.as_slice(),
        Reported::Unknown => {
            warn!("verify result carries no signature list");
            builder.general_error(None, "engine did not report a signature list");
            let details = details(record, 0);
            return builder.build(
                OperationKind::Verify,
                false,
                details,
                "Verification could not be analyzed: no signature list was reported".to_string(),
            );
        }
    };

    if let Reported::Known(claimed) = record.claimed_count {
        if claimed != signatures.len() as u64 {
            warn!(
                claimed,
                listed = signatures.len(),
                "engine signature count disagrees with signature list"
            );
            builder.general_error(
                None,
                format!(
                    "engine claimed {} signatures but listed {}",
                    claimed,
                    signatures.len()
                ),
            );
        }
    }

    let mut findings = Vec::with_capacity(signatures.len());
    for signature in signatures {
        let finding = analyze_signature(signature, keys, ctx);

        if signature.has_summary(SignatureSummary::TOFU_CONFLICT) {
            builder.warning(Warning::TofuConflict {
                signer: finding.signer.clone(),
            });
        }
        if signature.wrong_key_usage.is(&true) {
            builder.warning(Warning::WrongKeyUsage);
        }

        findings.push(finding);
    }

    if findings.is_empty() {
        builder.warning(Warning::NoSignatures);
    }

    let success = !findings.is_empty()
        && findings.iter().all(SignatureFinding::is_trusted)
        && !builder.has_general_errors();
    let summary = summarize(&findings);

    for finding in findings {
        builder.finding(Finding::Signature(finding));
    }

    builder.build(
        OperationKind::Verify,
        success,
        details(record, signatures.len()),
        summary,
    )
}

fn details(record: &VerifyRecord, signatures: usize) -> OperationDetails {
    OperationDetails::Verify(VerifyDetails {
        file_name: record.file_name.known().cloned(),
        is_mime: record.is_mime,
        signatures,
        claimed_signatures: record.claimed_count,
    })
}

fn analyze_signature<L: KeyLookup + ?Sized>(
    signature: &SignatureRecord,
    keys: &L,
    ctx: &AnalysisContext,
) -> SignatureFinding {
    let handle = signature.signer.handle.known();
    let key = handle.and_then(|handle| keys.find_key(handle));
    let subkey = match (key, handle) {
        (Some(key), Some(handle)) => key.subkey_by_handle(handle),
        _ => None,
    };

    let state = signature_state(signature, key, subkey, ctx.reference_time);

    let mut finding = SignatureFinding {
        signer: signature.signer.display(),
        signer_key_id: handle.map(|handle| handle.key_id()),
        signer_fingerprint: key
            .map(|key| key.fingerprint().clone())
            .or_else(|| handle.and_then(|handle| handle.fingerprint().cloned())),
        signer_user_id: key.and_then(Key::primary_user_id).map(|uid| uid.uid()),
        created: signature.created,
        expires: signature.expires,
        hash_algo: signature.hash_algo,
        pubkey_algo: signature.pubkey_algo,
        validity_reason: signature
            .validity_reason
            .known()
            .copied()
            .filter(ErrorCode::is_error),
        chain_model: signature.chain_model,
        state,
        trust: None,
        fully_valid: false,
        hint: None,
        fetch: None,
        error: None,
    };

    match (state, key) {
        (SignatureState::Good, Some(key)) => {
            let validity = signature
                .validity
                .known()
                .copied()
                .unwrap_or_else(|| key.validity());
            let assessment = classify(key.owner_trust(), validity);
            finding.fully_valid = assessment.fully_valid;
            if !assessment.fully_valid {
                finding.hint = Some(ActionHint::AdjustTrustLevel);
            }
            finding.trust = Some(assessment);
        }
        (SignatureState::MissingKey, _) => {
            finding.fetch = handle.map(|handle| FetchKeyIntent {
                handle: handle.clone(),
            });
            finding.error = Some(error_detail(signature, state));
        }
        _ => finding.error = Some(error_detail(signature, state)),
    }

    debug!(
        signer = %finding.signer,
        state = ?finding.state,
        fully_valid = finding.fully_valid,
        "classified signature"
    );
    finding
}

/// The ordered classification. The first condition that holds wins.
fn signature_state(
    signature: &SignatureRecord,
    key: Option<&Key>,
    subkey: Option<&Subkey>,
    now: u64,
) -> SignatureState {
    let key = match key {
        Some(key)
            if !signature.has_summary(SignatureSummary::KEY_MISSING)
                && !signature.has_status(ErrorCode::NoPublicKey) =>
        {
            key
        }
        _ => return SignatureState::MissingKey,
    };

    if key.is_revoked()
        || subkey.is_some_and(Subkey::is_revoked)
        || signature.has_summary(SignatureSummary::KEY_REVOKED)
        || signature.has_status(ErrorCode::CertRevoked)
    {
        return SignatureState::KeyRevoked;
    }

    if signature.has_summary(SignatureSummary::SIG_EXPIRED)
        || signature.has_status(ErrorCode::SigExpired)
        || matches!(signature.expires, Reported::Known(Some(exp)) if exp <= now)
    {
        return SignatureState::SignatureExpired;
    }

    if signature.has_summary(SignatureSummary::KEY_EXPIRED)
        || signature.has_status(ErrorCode::KeyExpired)
        || key.is_expired_at(now)
        || subkey.is_some_and(|subkey| subkey.is_expired_at(now))
    {
        return SignatureState::KeyExpired;
    }

    if signature.has_status(ErrorCode::BadSignature)
        || signature.has_summary(SignatureSummary::RED)
    {
        return SignatureState::Bad;
    }

    let status_failed = match signature.status {
        Reported::Known(code) => code.is_error(),
        Reported::Unknown => true,
    };
    if status_failed || signature.has_summary(SignatureSummary::SYS_ERROR) {
        return SignatureState::GeneralError;
    }

    SignatureState::Good
}

fn error_detail(signature: &SignatureRecord, state: SignatureState) -> ErrorDetail {
    let code = signature.status.known().copied().filter(ErrorCode::is_error);
    let message = match (state, signature.status) {
        (SignatureState::GeneralError, Reported::Unknown) => {
            "engine did not report a status for this signature".to_string()
        }
        (_, _) => match code {
            Some(code) => format!("{} ({})", state.description(), code),
            None => state.description().to_string(),
        },
    };

    ErrorDetail {
        code,
        summary_flags: signature
            .summary
            .known()
            .map(|summary| summary.flag_names().into_iter().map(str::to_string).collect())
            .unwrap_or_default(),
        message,
    }
}

fn summarize(findings: &[SignatureFinding]) -> String {
    if findings.is_empty() {
        return "No signatures found".to_string();
    }

    const ORDER: [SignatureState; 7] = [
        SignatureState::Good,
        SignatureState::MissingKey,
        SignatureState::KeyRevoked,
        SignatureState::SignatureExpired,
        SignatureState::KeyExpired,
        SignatureState::Bad,
        SignatureState::GeneralError,
    ];

    let parts: Vec<String> = ORDER
        .iter()
        .filter_map(|state| {
            let count = findings.iter().filter(|f| f.state == *state).count();
            (count > 0).then(|| format!("{} {}", count, state.description()))
        })
        .collect();

    let untrusted = findings
        .iter()
        .filter(|f| f.state == SignatureState::Good && !f.fully_valid)
        .count();

    let mut summary = format!(
        "{} signature{}: {}",
        findings.len(),
        if findings.len() == 1 { "" } else { "s" },
        parts.join(", ")
    );
    if untrusted > 0 {
        summary.push_str(&format!(
            "; {} good signature{} from keys that are not fully valid",
            untrusted,
            if untrusted == 1 { "" } else { "s" }
        ));
    }
    summary
}
