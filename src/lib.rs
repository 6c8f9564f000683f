//! # gpgreport - OpenPGP operation result analysis
//!
//! Turns the raw results of OpenPGP engine operations (decrypt, encrypt,
//! sign, verify) into structured reports a frontend can display, and
//! classifies the trust of the keys involved against a local key snapshot.
//!
//! ## Features
//!
//! - **Total analysis**: every raw result yields a report, however sparse or
//!   malformed; fields the engine left out are reported as unknown
//! - **One trust model**: verification and key listings share a single
//!   owner-trust/validity classifier
//! - **Fail closed**: encryption with any unusable recipient is a failure
//! - **Deterministic**: reports depend only on the raw result, the key
//!   snapshot and an explicit reference time
//!
//! ## Example
//!
//! ```rust
//! use gpgreport::analysis::{analyze, AnalysisContext};
//! use gpgreport::engine::{RawEngineResult, RawSignature, RawVerifyResult};
//! use gpgreport::key::Key;
//!
//! let raw = RawEngineResult::Verify(RawVerifyResult {
//!     signatures: Some(vec![RawSignature {
//!         fpr: Some("0123456789ABCDEF0123456789ABCDEF01234567".to_string()),
//!         summary: Some(0x80),
//!         status: Some(9),
//!         ..RawSignature::default()
//!     }]),
//!     ..RawVerifyResult::default()
//! });
//!
//! let keys: &[Key] = &[];
//! let report = analyze(&raw, keys, &AnalysisContext::at(1_700_000_000));
//! assert!(!report.success);
//! assert_eq!(report.fetch_intents().len(), 1);
//! ```

pub mod algorithm;
pub mod analysis;
pub mod cli;
pub mod config;
pub mod edit;
pub mod engine;
pub mod error;
pub mod key;
pub mod keyring;
pub mod render;
pub mod trust;
pub mod validation;

pub use analysis::{analyze, AnalysisContext, AnalysisReport};
pub use error::{GpgReportError, Result};
pub use key::{Fingerprint, Key, KeyHandle, KeyId};
pub use keyring::{KeyLookup, Keyring};
pub use trust::{classify, OwnerTrust, TrustLevel, ValidityCode};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
