//! Command implementations for the gpgreport CLI.
//!
//! Each command returns the text to print so the dispatcher owns stdout.

use crate::analysis::{analyze as analyze_raw, AnalysisContext, AnalysisReport};
use crate::cli::utils::{format_timestamp, read_input};
use crate::config::OutputFormat;
use crate::edit::KeyEditIntent;
use crate::engine::RawEngineResult;
use crate::error::{GpgReportError, Result};
use crate::key::{Key, KeyHandle, TofuPolicy};
use crate::keyring::{KeyListing, KeyLookup, Keyring};
use crate::render::{JsonRenderer, PlainTextRenderer, ReportRenderer};
use crate::trust::{classify, OwnerTrust, ValidityCode};
use std::path::Path;
use tracing::{info, warn};

/// Execute analyze command
pub fn analyze(
    input_file: &Path,
    keyring: &Keyring,
    ctx: &AnalysisContext,
    format: OutputFormat,
) -> Result<String> {
    info!(file = %input_file.display(), "Analyzing engine result");

    let data = read_input(input_file)?;
    let raw = RawEngineResult::from_json(&data)?;
    let report = analyze_raw(&raw, keyring, ctx);

    if report.success {
        info!(kind = %report.kind, "Operation succeeded");
    } else {
        warn!(kind = %report.kind, summary = %report.summary, "Operation failed");
    }

    render_report(&report, format)
}

pub fn render_report(report: &AnalysisReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(PlainTextRenderer::new().render(report)),
        OutputFormat::Json => JsonRenderer.render(report),
    }
}

/// Execute classify command
pub fn classify_trust(
    owner_trust: OwnerTrust,
    validity: ValidityCode,
    format: OutputFormat,
) -> Result<String> {
    let assessment = classify(owner_trust, validity);
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&assessment)?),
        OutputFormat::Text => Ok(format!(
            "{} ({}{})",
            assessment.level,
            assessment.justification,
            if assessment.fully_valid { ", fully valid" } else { "" }
        )),
    }
}

/// Execute list-keys command
pub fn list_keys(keyring: &Keyring, now: u64, format: OutputFormat) -> Result<String> {
    let rows = keyring.listing(now);
    info!(keys = rows.len(), "Listing keys in keyring");

    if format == OutputFormat::Json {
        return Ok(serde_json::to_string_pretty(&rows)?);
    }
    if rows.is_empty() {
        return Ok("No keys found in keyring".to_string());
    }

    let mut out = String::new();
    for row in &rows {
        listing_line(&mut out, row);
    }
    Ok(out)
}

fn listing_line(out: &mut String, row: &KeyListing) {
    let mut flags = Vec::new();
    if row.has_secret {
        flags.push("secret");
    }
    if row.revoked {
        flags.push("revoked");
    }
    if row.expired {
        flags.push("expired");
    }

    out.push_str(&format!(
        "{} {}/{} {} [{}] trust:{} validity:{}",
        row.key_id,
        row.algorithm,
        row.length,
        format_timestamp(row.created),
        row.usable_for(),
        row.owner_trust,
        row.trust.level
    ));
    if row.tofu_policy != TofuPolicy::Unknown {
        out.push_str(&format!(" tofu:{}", row.tofu_policy));
    }
    if !flags.is_empty() {
        out.push_str(&format!(" ({})", flags.join(", ")));
    }
    out.push('\n');
    if let Some(uid) = &row.primary_user_id {
        out.push_str(&format!("    {}\n", uid));
    }
}

/// Execute show-key command
pub fn show_key(
    keyring: &Keyring,
    handle: &KeyHandle,
    now: u64,
    format: OutputFormat,
) -> Result<String> {
    let key = find(keyring, handle)?;
    if format == OutputFormat::Json {
        return Ok(serde_json::to_string_pretty(key)?);
    }

    let row = KeyListing::for_key(key, now);
    let mut out = format!("Fingerprint: {}\n", row.fingerprint.beautified());
    listing_line(&mut out, &row);
    if let Some(expires) = row.expires {
        out.push_str(&format!("  Expires: {}\n", format_timestamp(expires)));
    }
    out.push_str(&format!("  Trust: {}\n", row.trust.justification));

    for (index, subkey) in key.subkeys().iter().enumerate() {
        out.push_str(&format!(
            "  sub {} {} {}/{} [{}]{}\n",
            index + 1,
            subkey.key_id(),
            subkey.algorithm(),
            subkey.length(),
            subkey.usage(),
            if subkey.is_revoked() { " revoked" } else { "" }
        ));
    }
    for uid in key.user_ids() {
        out.push_str(&format!(
            "  uid {} ({} certifications)\n",
            uid,
            uid.effective_certifications(now)
        ));
    }
    Ok(out)
}

/// Execute set-trust command, returning the updated key
pub fn set_trust(keyring: &mut Keyring, handle: &KeyHandle, level: i64) -> Result<Key> {
    let intent = KeyEditIntent::set_owner_trust(find(keyring, handle)?, level)?;
    let key = keyring.apply_intent(&intent, 0)?;

    info!(key = %key.fingerprint(), trust = %key.owner_trust(), "Owner trust updated");
    Ok(key.clone())
}

fn find<'a>(keyring: &'a Keyring, handle: &KeyHandle) -> Result<&'a Key> {
    keyring
        .find_key(handle)
        .ok_or_else(|| GpgReportError::keyring(format!("No key matches {}", handle)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::PublicKeyAlgorithm;
    use crate::key::{Fingerprint, KeyUsage, Subkey, UserId};
    use crate::trust::TrustLevel;

    fn keyring() -> Keyring {
        let fpr = Fingerprint::parse(&"AB".repeat(20)).unwrap();
        let primary = Subkey::new(
            fpr,
            PublicKeyAlgorithm::Ed25519,
            KeyUsage::all(),
            255,
            1_700_000_000,
        );
        let uid = UserId::new("Alice", "alice@example.com", "");
        let key = Key::new(primary, vec![], vec![uid])
            .unwrap()
            .with_validity(ValidityCode::FULL);
        Keyring::from_keys([key]).unwrap()
    }

    #[test]
    fn test_classify_output() {
        let text =
            classify_trust(OwnerTrust::Full, ValidityCode::FULL, OutputFormat::Text).unwrap();
        assert!(text.starts_with("full ("));
        assert!(text.ends_with(", fully valid)"));

        let json =
            classify_trust(OwnerTrust::Marginal, ValidityCode(99), OutputFormat::Json).unwrap();
        assert!(json.contains("\"Unknown\""));
    }

    #[test]
    fn test_list_and_show() {
        let ring = keyring();
        let text = list_keys(&ring, 1_700_000_100, OutputFormat::Text).unwrap();
        assert!(text.contains("Alice <alice@example.com>"));
        assert!(text.contains("validity:full"));
        assert!(text.contains("2023-11-14 22:13:20 UTC"));

        let handle = KeyHandle::parse(&"AB".repeat(8)).unwrap();
        let shown = show_key(&ring, &handle, 1_700_000_100, OutputFormat::Text).unwrap();
        assert!(shown.starts_with("Fingerprint: ABABA BABAB"));

        let missing = KeyHandle::parse(&"CD".repeat(8)).unwrap();
        assert!(show_key(&ring, &missing, 0, OutputFormat::Text).is_err());
    }

    #[test]
    fn test_set_trust() {
        let mut ring = keyring();
        let handle = KeyHandle::parse(&"AB".repeat(20)).unwrap();
        let key = set_trust(&mut ring, &handle, 5).unwrap();
        assert_eq!(key.owner_trust(), OwnerTrust::Ultimate);
        assert_eq!(
            classify(key.owner_trust(), key.validity()).level,
            TrustLevel::Ultimate
        );
        assert!(set_trust(&mut ring, &handle, 7).is_err());
    }

    #[test]
    fn test_analyze_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("result.json");
        std::fs::write(
            &path,
            format!(
                r#"{{"operation":"encrypt","recipients":["{}"],"invalid_recipients":[],{}}}"#,
                "AB".repeat(20),
                r#""error":{"code":0}"#
            ),
        )
        .unwrap();

        let ctx = AnalysisContext::at(1_700_000_100);
        let text = analyze(&path, &keyring(), &ctx, OutputFormat::Text).unwrap();
        assert!(text.starts_with("[OK] encrypt:"));

        let json = analyze(&path, &Keyring::new(), &ctx, OutputFormat::Json).unwrap();
        let report: AnalysisReport = serde_json::from_str(&json).unwrap();
        assert!(!report.success);
    }
}
