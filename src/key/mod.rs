//! Key model.
//!
//! A [`Key`] is a snapshot of one OpenPGP certificate as the key database
//! collaborator last saw it: a primary key, its subkeys, user IDs with their
//! certifications, and the trust and validity attached to it. The analysis
//! engine only ever reads keys. The mutators here (`revoke`, `set_expiry`,
//! `set_owner_trust`, ...) exist for the collaborator that owns the database.

use crate::algorithm::PublicKeyAlgorithm;
use crate::error::{GpgReportError, Result};
use crate::trust::{OwnerTrust, ValidityCode};
use crate::validation::Validator;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

pub mod fingerprint;

pub use fingerprint::{Fingerprint, KeyHandle, KeyId};

/// Key usage flags indicating how a key may be used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct KeyUsage {
    /// Key may be used to certify other keys
    pub certify: bool,
    /// Key may be used for digital signatures
    pub sign: bool,
    /// Key may be used for encryption
    pub encrypt: bool,
    /// Key may be used for authentication
    pub authenticate: bool,
}

impl KeyUsage {
    /// Creates a new KeyUsage with all permissions disabled
    pub fn none() -> Self {
        Self::default()
    }

    /// Creates a new KeyUsage for encryption only
    pub fn encrypt_only() -> Self {
        Self {
            encrypt: true,
            ..Self::default()
        }
    }

    /// Creates a new KeyUsage for signing only
    pub fn sign_only() -> Self {
        Self {
            sign: true,
            ..Self::default()
        }
    }

    /// Creates a new KeyUsage for certification and signing, the usual primary key set
    pub fn certify_and_sign() -> Self {
        Self {
            certify: true,
            sign: true,
            ..Self::default()
        }
    }

    /// Creates a new KeyUsage with all permissions enabled
    pub fn all() -> Self {
        Self {
            certify: true,
            sign: true,
            encrypt: true,
            authenticate: true,
        }
    }

    /// Parses a capability string such as `"scE"`; unknown letters are ignored
    pub fn from_capabilities(caps: &str) -> Self {
        let mut usage = Self::none();
        for c in caps.chars() {
            match c.to_ascii_lowercase() {
                'c' => usage.certify = true,
                's' => usage.sign = true,
                'e' => usage.encrypt = true,
                'a' => usage.authenticate = true,
                _ => {}
            }
        }
        usage
    }
}

impl fmt::Display for KeyUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flags = [
            (self.certify, 'C'),
            (self.sign, 'S'),
            (self.encrypt, 'E'),
            (self.authenticate, 'A'),
        ];
        for (set, letter) in flags {
            if set {
                write!(f, "{}", letter)?;
            }
        }
        Ok(())
    }
}

/// Trust-on-first-use policy attached to a user ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TofuPolicy {
    Auto,
    Good,
    Bad,
    Ask,
    #[default]
    Unknown,
}

impl fmt::Display for TofuPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Auto => "auto",
            Self::Good => "good",
            Self::Bad => "bad",
            Self::Ask => "ask",
            Self::Unknown => "unknown",
        };
        write!(f, "{}", name)
    }
}

/// A subkey, or the primary key viewed as a subkey
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subkey {
    fingerprint: Fingerprint,
    algorithm: PublicKeyAlgorithm,
    usage: KeyUsage,
    length: u32,
    created: u64,
    expires: Option<u64>,
    revoked: bool,
    secret_present: bool,
}

impl Subkey {
    /// Creates a subkey with no expiry, not revoked, without secret material
    pub fn new(
        fingerprint: Fingerprint,
        algorithm: PublicKeyAlgorithm,
        usage: KeyUsage,
        length: u32,
        created: u64,
    ) -> Self {
        Self {
            fingerprint,
            algorithm,
            usage,
            length,
            created,
            expires: None,
            revoked: false,
            secret_present: false,
        }
    }

    /// Sets the expiry time
    pub fn with_expiry(mut self, expires: Option<u64>) -> Self {
        self.expires = expires;
        self
    }

    /// Marks secret material as present locally
    pub fn with_secret(mut self, present: bool) -> Self {
        self.secret_present = present;
        self
    }

    /// Marks the subkey revoked
    pub fn with_revoked(mut self) -> Self {
        self.revoke();
        self
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Returns the key ID, derived from the fingerprint
    pub fn key_id(&self) -> KeyId {
        self.fingerprint.key_id()
    }

    pub fn algorithm(&self) -> PublicKeyAlgorithm {
        self.algorithm
    }

    pub fn usage(&self) -> KeyUsage {
        self.usage
    }

    pub fn length(&self) -> u32 {
        self.length
    }

    pub fn created(&self) -> u64 {
        self.created
    }

    pub fn expires(&self) -> Option<u64> {
        self.expires
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked
    }

    /// Whether secret material for this subkey exists locally
    pub fn has_secret(&self) -> bool {
        self.secret_present
    }

    /// Expired when the expiry is at or before `now`
    pub fn is_expired_at(&self, now: u64) -> bool {
        self.expires.is_some_and(|exp| exp <= now)
    }

    /// Revokes the subkey. There is no way back.
    pub fn revoke(&mut self) {
        self.revoked = true;
    }

    /// Extends, shortens or clears the expiry
    pub fn set_expiry(&mut self, expires: Option<u64>) {
        self.expires = expires;
    }

    /// Usable for signing at `now`
    pub fn can_sign_at(&self, now: u64) -> bool {
        self.usage.sign && !self.revoked && !self.is_expired_at(now)
    }

    /// Usable for encryption at `now`
    pub fn can_encrypt_at(&self, now: u64) -> bool {
        self.usage.encrypt && !self.revoked && !self.is_expired_at(now)
    }
}

/// A certification made over a user ID
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certification {
    /// Key ID of the certifying key
    pub signer: KeyId,
    /// Fingerprint of the certifying key, when the engine knows it
    pub signer_fingerprint: Option<Fingerprint>,
    /// Creation time (Unix timestamp)
    pub created: u64,
    /// Expiry time (Unix timestamp)
    pub expires: Option<u64>,
    /// Whether the certification was revoked
    pub revoked: bool,
    /// Whether the certification may be exported
    pub exportable: bool,
}

impl Certification {
    pub fn new(signer: KeyId, created: u64) -> Self {
        Self {
            signer,
            signer_fingerprint: None,
            created,
            expires: None,
            revoked: false,
            exportable: true,
        }
    }

    /// Counts towards validity at `now`
    pub fn is_effective_at(&self, now: u64) -> bool {
        !self.revoked && self.expires.map_or(true, |exp| exp > now)
    }
}

/// A user ID on a key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserId {
    pub name: String,
    pub email: String,
    pub comment: String,
    /// Whether this is the primary user ID
    pub primary: bool,
    /// Whether the user ID was revoked
    pub revoked: bool,
    /// Certifications in the order the engine listed them
    pub certifications: Vec<Certification>,
    pub tofu_policy: TofuPolicy,
}

impl UserId {
    pub fn new(name: &str, email: &str, comment: &str) -> Self {
        Self {
            name: name.to_string(),
            email: email.to_string(),
            comment: comment.to_string(),
            primary: false,
            revoked: false,
            certifications: Vec::new(),
            tofu_policy: TofuPolicy::Unknown,
        }
    }

    /// Parses `Name (comment) <email>`; every part is optional
    pub fn parse(uid: &str) -> Result<Self> {
        Validator::validate_user_id(uid)?;

        let mut rest = uid.trim();
        let mut email = "";
        if let (Some(open), true) = (rest.rfind('<'), rest.ends_with('>')) {
            email = rest[open + 1..rest.len() - 1].trim();
            rest = rest[..open].trim();
        }

        let mut comment = "";
        if let (Some(open), true) = (rest.rfind('('), rest.ends_with(')')) {
            comment = rest[open + 1..rest.len() - 1].trim();
            rest = rest[..open].trim();
        }

        Ok(Self::new(rest, email, comment))
    }

    /// Marks this as the primary user ID
    pub fn with_primary(mut self) -> Self {
        self.primary = true;
        self
    }

    /// Adds a certification
    pub fn with_certification(mut self, certification: Certification) -> Self {
        self.certifications.push(certification);
        self
    }

    /// Sets the TOFU policy
    pub fn with_tofu_policy(mut self, policy: TofuPolicy) -> Self {
        self.tofu_policy = policy;
        self
    }

    /// Renders the full `Name (comment) <email>` string
    pub fn uid(&self) -> String {
        let mut out = self.name.clone();
        if !self.comment.is_empty() {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(&format!("({})", self.comment));
        }
        if !self.email.is_empty() {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(&format!("<{}>", self.email));
        }
        out
    }

    /// Number of certifications still in force at `now`
    pub fn effective_certifications(&self, now: u64) -> usize {
        self.certifications
            .iter()
            .filter(|cert| cert.is_effective_at(now))
            .count()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uid())
    }
}

/// A complete key entry as held by the key database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key {
    primary: Subkey,
    subkeys: Vec<Subkey>,
    user_ids: Vec<UserId>,
    owner_trust: OwnerTrust,
    validity: ValidityCode,
    revoked: bool,
}

impl Key {
    /// Builds a key and checks its structural invariants
    pub fn new(primary: Subkey, subkeys: Vec<Subkey>, user_ids: Vec<UserId>) -> Result<Self> {
        let key = Self {
            primary,
            subkeys,
            user_ids,
            owner_trust: OwnerTrust::Unknown,
            validity: ValidityCode::UNKNOWN,
            revoked: false,
        };
        key.validate()?;
        Ok(key)
    }

    /// Re-checks invariants, e.g. after deserializing a snapshot
    pub fn validate(&self) -> Result<()> {
        let mut seen = BTreeSet::new();
        for subkey in self.all_subkeys() {
            if !seen.insert(subkey.fingerprint()) {
                return Err(GpgReportError::key(format!(
                    "Subkey {} appears more than once on key {}",
                    subkey.fingerprint(),
                    self.fingerprint()
                )));
            }
        }

        let primaries = self.user_ids.iter().filter(|uid| uid.primary).count();
        if primaries > 1 {
            return Err(GpgReportError::key(format!(
                "Key {} has {} primary user IDs",
                self.fingerprint(),
                primaries
            )));
        }

        for uid in &self.user_ids {
            Validator::validate_user_id(&uid.uid())?;
        }

        Ok(())
    }

    /// Sets the owner trust
    pub fn with_owner_trust(mut self, owner_trust: OwnerTrust) -> Self {
        self.owner_trust = owner_trust;
        self
    }

    /// Sets the computed validity
    pub fn with_validity(mut self, validity: ValidityCode) -> Self {
        self.validity = validity;
        self
    }

    /// Marks the whole key revoked
    pub fn with_revoked(mut self) -> Self {
        self.revoke();
        self
    }

    /// The key's fingerprint, which is the primary key's fingerprint
    pub fn fingerprint(&self) -> &Fingerprint {
        self.primary.fingerprint()
    }

    pub fn key_id(&self) -> KeyId {
        self.primary.key_id()
    }

    pub fn primary(&self) -> &Subkey {
        &self.primary
    }

    /// Additional subkeys, in engine order
    pub fn subkeys(&self) -> &[Subkey] {
        &self.subkeys
    }

    /// Primary key first, then the additional subkeys
    pub fn all_subkeys(&self) -> impl Iterator<Item = &Subkey> {
        std::iter::once(&self.primary).chain(self.subkeys.iter())
    }

    pub fn user_ids(&self) -> &[UserId] {
        &self.user_ids
    }

    /// The flagged primary user ID, or the first one if none is flagged
    pub fn primary_user_id(&self) -> Option<&UserId> {
        self.user_ids
            .iter()
            .find(|uid| uid.primary)
            .or_else(|| self.user_ids.first())
    }

    pub fn owner_trust(&self) -> OwnerTrust {
        self.owner_trust
    }

    pub fn validity(&self) -> ValidityCode {
        self.validity
    }

    pub fn created(&self) -> u64 {
        self.primary.created()
    }

    pub fn expires(&self) -> Option<u64> {
        self.primary.expires()
    }

    /// Revoked when the key itself or its primary key is revoked
    pub fn is_revoked(&self) -> bool {
        self.revoked || self.primary.is_revoked()
    }

    pub fn is_expired_at(&self, now: u64) -> bool {
        self.primary.is_expired_at(now)
    }

    /// Whether any secret material exists locally
    pub fn has_secret(&self) -> bool {
        self.all_subkeys().any(Subkey::has_secret)
    }

    /// Returns true if the handle names this key or one of its subkeys
    pub fn matches(&self, handle: &KeyHandle) -> bool {
        self.subkey_by_handle(handle).is_some()
    }

    /// Finds the subkey (or primary key) a handle designates
    pub fn subkey_by_handle(&self, handle: &KeyHandle) -> Option<&Subkey> {
        self.all_subkeys()
            .find(|subkey| handle.matches(subkey.fingerprint()))
    }

    /// Returns the subkey at `index`, counting the primary key as 0
    pub fn subkey_at(&self, index: usize) -> Option<&Subkey> {
        self.all_subkeys().nth(index)
    }

    /// Has a subkey usable for encryption at `now`, and is itself usable
    pub fn can_encrypt_at(&self, now: u64) -> bool {
        !self.is_revoked()
            && !self.is_expired_at(now)
            && self.all_subkeys().any(|subkey| subkey.can_encrypt_at(now))
    }

    /// Has a subkey usable for signing at `now`, and is itself usable
    pub fn can_sign_at(&self, now: u64) -> bool {
        !self.is_revoked()
            && !self.is_expired_at(now)
            && self.all_subkeys().any(|subkey| subkey.can_sign_at(now))
    }

    /// Revokes the whole key
    pub fn revoke(&mut self) {
        self.revoked = true;
    }

    pub fn set_owner_trust(&mut self, owner_trust: OwnerTrust) {
        self.owner_trust = owner_trust;
    }

    pub fn set_validity(&mut self, validity: ValidityCode) {
        self.validity = validity;
    }

    /// Changes the expiry of the primary key, or of the subkey with the given fingerprint
    pub fn set_expiry(&mut self, subkey: Option<&Fingerprint>, expires: Option<u64>) -> Result<()> {
        let target = match subkey {
            None => &mut self.primary,
            Some(fpr) => std::iter::once(&mut self.primary)
                .chain(self.subkeys.iter_mut())
                .find(|candidate| candidate.fingerprint() == fpr)
                .ok_or_else(|| {
                    GpgReportError::key(format!("Subkey {} not found on key", fpr))
                })?,
        };
        target.set_expiry(expires);
        Ok(())
    }

    /// Revokes the subkey at `index`; index 0 is the primary key
    pub fn revoke_subkey_at(&mut self, index: usize) -> Result<()> {
        match index {
            0 => self.primary.revoke(),
            n => self
                .subkeys
                .get_mut(n - 1)
                .ok_or_else(|| GpgReportError::key(format!("No subkey at index {}", n)))?
                .revoke(),
        }
        Ok(())
    }

    /// Removes the subkey at `index`. The primary key (index 0) cannot be removed.
    pub fn remove_subkey_at(&mut self, index: usize) -> Result<Subkey> {
        if index == 0 || index > self.subkeys.len() {
            return Err(GpgReportError::key(format!(
                "Cannot remove subkey at index {}",
                index
            )));
        }
        Ok(self.subkeys.remove(index - 1))
    }

    /// Adds a certification to the user ID rendering as `uid`
    pub fn add_certification(&mut self, uid: &str, certification: Certification) -> Result<()> {
        let target = self
            .user_ids
            .iter_mut()
            .find(|candidate| candidate.uid() == uid)
            .ok_or_else(|| GpgReportError::key(format!("User ID \"{}\" not found", uid)))?;
        target.certifications.push(certification);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRIMARY: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";
    const SUB: &str = "BBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBB";

    fn fpr(s: &str) -> Fingerprint {
        Fingerprint::parse(s).unwrap()
    }

    fn sample_key() -> Key {
        let primary = Subkey::new(
            fpr(PRIMARY),
            PublicKeyAlgorithm::Ed25519,
            KeyUsage::certify_and_sign(),
            255,
            1_600_000_000,
        )
        .with_secret(true);
        let sub = Subkey::new(
            fpr(SUB),
            PublicKeyAlgorithm::X25519,
            KeyUsage::encrypt_only(),
            255,
            1_600_000_100,
        )
        .with_expiry(Some(1_700_000_000));
        Key::new(
            primary,
            vec![sub],
            vec![UserId::parse("Alice (work) <alice@example.com>").unwrap()],
        )
        .unwrap()
    }

    #[test]
    fn test_key_ids_are_derived() {
        let key = sample_key();
        assert_eq!(key.fingerprint().as_str(), PRIMARY);
        assert_eq!(key.key_id().as_str(), &PRIMARY[24..]);
        assert_eq!(key.subkeys()[0].key_id().as_str(), &SUB[24..]);
    }

    #[test]
    fn test_subkey_lookup_by_handle() {
        let key = sample_key();
        let by_id = KeyHandle::parse(&SUB[24..]).unwrap();
        let sub = key.subkey_by_handle(&by_id).unwrap();
        assert_eq!(sub.fingerprint().as_str(), SUB);
        assert!(key.matches(&KeyHandle::parse(PRIMARY).unwrap()));
        assert_eq!(key.subkey_at(1).unwrap().fingerprint().as_str(), SUB);
        assert!(key.subkey_at(2).is_none());
    }

    #[test]
    fn test_duplicate_subkeys_rejected() {
        let primary = Subkey::new(fpr(PRIMARY), PublicKeyAlgorithm::Rsa, KeyUsage::all(), 3072, 0);
        let dup = primary.clone();
        assert!(Key::new(primary, vec![dup], vec![]).is_err());
    }

    #[test]
    fn test_two_primary_user_ids_rejected() {
        let primary = Subkey::new(fpr(PRIMARY), PublicKeyAlgorithm::Rsa, KeyUsage::all(), 3072, 0);
        let uids = vec![
            UserId::new("A", "a@example.com", "").with_primary(),
            UserId::new("B", "b@example.com", "").with_primary(),
        ];
        assert!(Key::new(primary, vec![], uids).is_err());
    }

    #[test]
    fn test_expiry_and_usability() {
        let mut key = sample_key();
        assert!(key.can_encrypt_at(1_650_000_000));
        // Encryption subkey expired
        assert!(!key.can_encrypt_at(1_700_000_000));
        assert!(key.can_sign_at(1_700_000_000));

        // Extending the subkey expiry restores encryption
        key.set_expiry(Some(&fpr(SUB)), None).unwrap();
        assert!(key.can_encrypt_at(1_800_000_000));
        assert!(key.set_expiry(Some(&fpr(&"C".repeat(40))), None).is_err());
    }

    #[test]
    fn test_revocation_is_monotonic() {
        let mut key = sample_key();
        assert!(!key.is_revoked());
        key.revoke();
        assert!(key.is_revoked());
        assert!(!key.can_sign_at(0));
    }

    #[test]
    fn test_user_id_rendering() {
        let uid = UserId::parse("Alice (work) <alice@example.com>").unwrap();
        assert_eq!(uid.name, "Alice");
        assert_eq!(uid.comment, "work");
        assert_eq!(uid.email, "alice@example.com");
        assert_eq!(uid.uid(), "Alice (work) <alice@example.com>");

        let bare = UserId::parse("<bob@example.com>").unwrap();
        assert_eq!(bare.uid(), "<bob@example.com>");
        assert!(UserId::parse("").is_err());
    }

    #[test]
    fn test_certification_effectiveness() {
        let signer = fpr(SUB).key_id();
        let mut cert = Certification::new(signer, 100);
        assert!(cert.is_effective_at(200));
        cert.expires = Some(150);
        assert!(!cert.is_effective_at(200));

        let uid = UserId::new("A", "", "").with_certification(cert);
        assert_eq!(uid.effective_certifications(120), 1);
        assert_eq!(uid.effective_certifications(200), 0);
    }

    #[test]
    fn test_capability_parsing() {
        let usage = KeyUsage::from_capabilities("scESCA");
        assert!(usage.sign && usage.certify && usage.encrypt && usage.authenticate);
        assert_eq!(KeyUsage::from_capabilities("e").to_string(), "E");
        assert_eq!(KeyUsage::from_capabilities("xyz"), KeyUsage::none());
    }
}
