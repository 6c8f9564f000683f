//! Result analysis engine.
//!
//! [`analyze`] is the entry point: it adapts a raw engine result and hands
//! the typed record to the analyzer for its operation. Analysis is a pure
//! function of the raw result, the key snapshot and the [`AnalysisContext`];
//! it performs no I/O, never fails and always returns a report.

use crate::engine::{adapt, OperationRecord, RawEngineResult};
use crate::keyring::KeyLookup;
use serde::{Deserialize, Serialize};

pub mod decrypt;
pub mod encrypt;
pub mod report;
pub mod sign;
pub mod verify;

pub use decrypt::analyze_decrypt;
pub use encrypt::analyze_encrypt;
pub use report::{
    ActionHint, AnalysisReport, DecryptDetails, EncryptDetails, EncryptRecipientFinding,
    ErrorDetail, FetchKeyIntent, Finding, GeneralErrorFinding, InvalidRecipientReason,
    InvalidSignerFinding, InvalidSignerReason, OperationDetails, OperationKind, RecipientFinding,
    RecipientStatus, RecipientValidity, SignDetails, SignatureFinding, SignatureState,
    SignerFinding, VerifyDetails, Warning,
};
pub use sign::analyze_sign;
pub use verify::analyze_verify;

/// Inputs to analysis that do not come from the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnalysisContext {
    /// Unix time expiry checks are made against
    pub reference_time: u64,
}

impl AnalysisContext {
    pub fn at(reference_time: u64) -> Self {
        Self { reference_time }
    }
}

/// Analyzes a raw engine result against a key snapshot
pub fn analyze<L: KeyLookup + ?Sized>(
    raw: &RawEngineResult,
    keys: &L,
    ctx: &AnalysisContext,
) -> AnalysisReport {
    analyze_record(&adapt(raw), keys, ctx)
}

/// Analyzes an already adapted record
pub fn analyze_record<L: KeyLookup + ?Sized>(
    record: &OperationRecord,
    keys: &L,
    ctx: &AnalysisContext,
) -> AnalysisReport {
    match record {
        OperationRecord::Decrypt(record) => analyze_decrypt(record, keys, ctx),
        OperationRecord::Encrypt(record) => analyze_encrypt(record, keys, ctx),
        OperationRecord::Sign(record) => analyze_sign(record, keys, ctx),
        OperationRecord::Verify(record) => analyze_verify(record, keys, ctx),
    }
}
