//! Report rendering.
//!
//! The UI collaborator renders reports through [`ReportRenderer`]. Two
//! renderers ship with the crate: plain text for terminals and JSON for
//! programs.

use crate::analysis::{
    AnalysisReport, EncryptRecipientFinding, Finding, OperationDetails, RecipientFinding,
    RecipientStatus, RecipientValidity, SignatureFinding, SignerFinding,
};
use crate::engine::Reported;
use crate::error::Result;
use crate::key::Fingerprint;

/// Turns a report into something displayable
pub trait ReportRenderer {
    type Output;

    fn render(&self, report: &AnalysisReport) -> Self::Output;
}

/// Human readable multi-line text
#[derive(Debug, Clone, Default)]
pub struct PlainTextRenderer {
    /// Print fingerprints grouped in blocks of five
    pub beautify_fingerprints: bool,
}

impl PlainTextRenderer {
    pub fn new() -> Self {
        Self {
            beautify_fingerprints: true,
        }
    }

    fn fingerprint(&self, fpr: &Fingerprint) -> String {
        if self.beautify_fingerprints {
            fpr.beautified()
        } else {
            fpr.to_string()
        }
    }

    fn recipient(&self, out: &mut String, r: &RecipientFinding) {
        let status = match r.status {
            RecipientStatus::Ok => "ok".to_string(),
            RecipientStatus::UnknownKey => "unknown key".to_string(),
            RecipientStatus::StatusUnknown => "status not reported".to_string(),
            RecipientStatus::EngineError(code) => code.to_string(),
        };
        out.push_str(&format!("  Recipient {}: {}\n", r.key_id, status));
        if let Some(uid) = &r.user_id {
            out.push_str(&format!("    {}\n", uid));
        }
    }

    fn encrypt_recipient(&self, out: &mut String, r: &EncryptRecipientFinding) {
        let validity = match r.validity {
            RecipientValidity::Valid => "valid".to_string(),
            RecipientValidity::Invalid(reason) => format!("invalid, {}", reason.description()),
        };
        let extra = if r.intended { "" } else { " (not requested)" };
        out.push_str(&format!("  Recipient {}{}: {}\n", r.recipient, extra, validity));
        if let Some(uid) = &r.user_id {
            out.push_str(&format!("    {}\n", uid));
        }
    }

    fn signer(&self, out: &mut String, s: &SignerFinding) {
        let role = match s.is_primary {
            Some(true) => "primary key",
            Some(false) => "subkey",
            None => "key",
        };
        out.push_str(&format!("  Signed with {} {}\n", role, s.subkey));
        if let Some(key) = &s.key {
            out.push_str(&format!("    Key: {}\n", self.fingerprint(key)));
        }
        if let Some(uid) = &s.user_id {
            out.push_str(&format!("    {}\n", uid));
        }
        if let (Reported::Known(hash), Reported::Known(algo)) = (&s.hash_algo, &s.pubkey_algo) {
            out.push_str(&format!("    Algorithms: {} / {}\n", algo, hash));
        }
    }

    fn signature(&self, out: &mut String, s: &SignatureFinding) {
        out.push_str(&format!(
            "  Signature by {}: {}\n",
            s.signer,
            s.state.description()
        ));
        if let Some(fpr) = &s.signer_fingerprint {
            out.push_str(&format!("    Fingerprint: {}\n", self.fingerprint(fpr)));
        }
        if let Some(uid) = &s.signer_user_id {
            out.push_str(&format!("    {}\n", uid));
        }
        if let Reported::Known(created) = s.created {
            out.push_str(&format!("    Created: {}\n", created));
        }
        if let Some(trust) = &s.trust {
            out.push_str(&format!(
                "    Trust: {} ({})\n",
                trust.level, trust.justification
            ));
        }
        if let Some(reason) = s.validity_reason {
            out.push_str(&format!("    Validity reason: {}\n", reason));
        }
        if s.chain_model.is(&true) {
            out.push_str("    Validity computed with the chain model\n");
        }
        if s.hint.is_some() {
            out.push_str("    Hint: adjust the trust level of this key\n");
        }
        if let Some(intent) = &s.fetch {
            out.push_str(&format!(
                "    Key {} can be fetched from a key server\n",
                intent.handle
            ));
        }
        if let Some(error) = &s.error {
            out.push_str(&format!("    Detail: {}\n", error.message));
        }
    }
}

impl ReportRenderer for PlainTextRenderer {
    type Output = String;

    fn render(&self, report: &AnalysisReport) -> String {
        let mut out = String::new();
        let status = if report.success { "OK" } else { "FAILED" };
        out.push_str(&format!("[{}] {}: {}\n", status, report.kind, report.summary));

        match &report.details {
            OperationDetails::Decrypt(details) => {
                if let Some(name) = &details.file_name {
                    out.push_str(&format!("  File name: {}\n", name));
                }
                if let Some(algo) = details.session_cipher {
                    out.push_str(&format!("  Session cipher: {}\n", algo));
                }
            }
            OperationDetails::Sign(details) => {
                if let Reported::Known(mode) = details.mode {
                    out.push_str(&format!("  Mode: {}\n", mode));
                }
            }
            OperationDetails::Verify(details) => {
                if let Some(name) = &details.file_name {
                    out.push_str(&format!("  File name: {}\n", name));
                }
            }
            OperationDetails::Encrypt(_) => {}
        }

        for finding in &report.findings {
            match finding {
                Finding::Recipient(r) => self.recipient(&mut out, r),
                Finding::EncryptRecipient(r) => self.encrypt_recipient(&mut out, r),
                Finding::Signer(s) => self.signer(&mut out, s),
                Finding::InvalidSigner(s) => out.push_str(&format!(
                    "  Invalid signer {}: {}\n",
                    s.signer,
                    s.reason.description()
                )),
                Finding::Signature(s) => self.signature(&mut out, s),
                Finding::GeneralError(e) => match e.code {
                    Some(code) => out.push_str(&format!("  Error: {} ({})\n", e.message, code)),
                    None => out.push_str(&format!("  Error: {}\n", e.message)),
                },
            }
        }

        for warning in &report.warnings {
            out.push_str(&format!("  Warning: {}\n", warning));
        }
        out
    }
}

/// Pretty printed JSON
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl ReportRenderer for JsonRenderer {
    type Output = Result<String>;

    fn render(&self, report: &AnalysisReport) -> Result<String> {
        report.to_json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{analyze, AnalysisContext};
    use crate::engine::{RawEngineResult, RawSignature, RawVerifyResult};
    use crate::key::Key;

    fn missing_key_report() -> AnalysisReport {
        let raw = RawEngineResult::Verify(RawVerifyResult {
            signatures: Some(vec![RawSignature {
                fpr: Some("0123456789ABCDEF0123456789ABCDEF01234567".to_string()),
                summary: Some(0x80),
                status: Some(9),
                ..RawSignature::default()
            }]),
            ..RawVerifyResult::default()
        });
        analyze(&raw, &[] as &[Key], &AnalysisContext::at(0))
    }

    #[test]
    fn test_plain_text_mentions_fetch() {
        let text = PlainTextRenderer::new().render(&missing_key_report());
        assert!(text.starts_with("[FAILED] verify:"));
        assert!(text.contains("key missing"));
        assert!(text.contains("01234 56789 ABCDE"));
        assert!(text.contains("can be fetched"));
    }

    #[test]
    fn test_plain_text_shows_validity_details() {
        let raw = RawEngineResult::Verify(RawVerifyResult {
            signatures: Some(vec![RawSignature {
                fpr: Some("0123456789ABCDEF0123456789ABCDEF01234567".to_string()),
                summary: Some(0x80),
                status: Some(9),
                validity_reason: Some(9),
                chain_model: Some(true),
                ..RawSignature::default()
            }]),
            ..RawVerifyResult::default()
        });
        let report = analyze(&raw, &[] as &[Key], &AnalysisContext::at(0));
        let text = PlainTextRenderer::new().render(&report);
        assert!(text.contains("Validity reason: "));
        assert!(text.contains("chain model"));
    }

    #[test]
    fn test_json_renderer() {
        let report = missing_key_report();
        let json = JsonRenderer.render(&report).unwrap();
        let parsed: AnalysisReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, report);
    }
}
