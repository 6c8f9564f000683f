//! Boundary with the OpenPGP engine.
//!
//! [`raw`] holds the engine's result records as they arrive, [`status`]
//! decodes the numeric words inside them and [`adapter`] turns them into the
//! typed records the analyzers consume.

pub mod adapter;
pub mod raw;
pub mod status;

pub use adapter::{
    adapt, DecryptRecord, EncryptRecord, EngineOutcome, InvalidKeyRecord, KeyRef,
    NewSignatureRecord, OperationRecord, RecipientRecord, Reported, SignRecord, SignatureRecord,
    VerifyRecord,
};
pub use raw::{
    RawDecryptResult, RawEncryptResult, RawEngineError, RawEngineResult, RawInvalidKey,
    RawNewSignature, RawRecipient, RawSignResult, RawSignature, RawVerifyResult,
};
pub use status::{ErrorCode, SignMode, SignatureSummary};
