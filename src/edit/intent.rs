//! Key-edit intents.
//!
//! An intent describes a change to the key database without performing it.
//! Construction validates the request against the current key so that the
//! collaborator executing it only ever sees well-formed edits.

use crate::error::{GpgReportError, Result};
use crate::key::{Certification, Fingerprint, Key};
use crate::trust::OwnerTrust;
use crate::validation::Validator;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Reason code attached to a subkey revocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RevocationReason {
    NoReason,
    Compromised,
    Superseded,
    NoLongerUsed,
}

impl RevocationReason {
    pub fn from_code(code: i64) -> Result<Self> {
        match code {
            0 => Ok(Self::NoReason),
            1 => Ok(Self::Compromised),
            2 => Ok(Self::Superseded),
            3 => Ok(Self::NoLongerUsed),
            other => Err(GpgReportError::intent(format!(
                "illegal revocation reason code: {}",
                other
            ))),
        }
    }

    /// Code as entered at the key editor's reason prompt
    pub fn code(&self) -> u8 {
        match self {
            Self::NoReason => 0,
            Self::Compromised => 1,
            Self::Superseded => 2,
            Self::NoLongerUsed => 3,
        }
    }
}

impl fmt::Display for RevocationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::NoReason => "no reason specified",
            Self::Compromised => "key has been compromised",
            Self::Superseded => "key is superseded",
            Self::NoLongerUsed => "key is no longer used",
        };
        write!(f, "{}", text)
    }
}

/// A validated change to one key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyEditIntent {
    SetOwnerTrust {
        key: Fingerprint,
        trust: OwnerTrust,
    },
    SetExpiry {
        key: Fingerprint,
        /// None targets the primary key
        subkey: Option<Fingerprint>,
        /// None removes the expiry
        expires: Option<u64>,
    },
    RevokeSubkey {
        key: Fingerprint,
        /// Position among the key's subkeys, the primary key being 0
        index: usize,
        reason: RevocationReason,
        /// Non-empty lines of the reason text
        text: Vec<String>,
    },
    DeleteSubkey {
        key: Fingerprint,
        index: usize,
    },
    CertifyUserId {
        key: Fingerprint,
        signers: Vec<Fingerprint>,
        user_id: String,
        expires: Option<u64>,
    },
}

fn check_subkey_index(key: &Key, index: usize) -> Result<()> {
    if index == 0 || index > key.subkeys().len() {
        warn!(index, subkeys = key.subkeys().len(), "illegal subkey index");
        return Err(GpgReportError::intent(format!(
            "illegal subkey index {}: key {} has {} subkeys",
            index,
            key.fingerprint(),
            key.subkeys().len()
        )));
    }
    Ok(())
}

impl KeyEditIntent {
    /// Owner trust levels 1 (undefined) to 5 (ultimate)
    pub fn set_owner_trust(key: &Key, level: i64) -> Result<Self> {
        if !(1..=5).contains(&level) {
            warn!(level, "illegal owner trust level");
            return Err(GpgReportError::intent(format!(
                "illegal owner trust level: {}",
                level
            )));
        }
        Ok(Self::SetOwnerTrust {
            key: key.fingerprint().clone(),
            trust: OwnerTrust::from_code(level),
        })
    }

    pub fn set_expiry(
        key: &Key,
        subkey: Option<&Fingerprint>,
        expires: Option<u64>,
    ) -> Result<Self> {
        let target = match subkey {
            Some(fpr) => key
                .all_subkeys()
                .find(|candidate| candidate.fingerprint() == fpr)
                .ok_or_else(|| {
                    GpgReportError::intent(format!(
                        "subkey {} does not belong to key {}",
                        fpr,
                        key.fingerprint()
                    ))
                })?,
            None => key.primary(),
        };

        if let Some(expires) = expires {
            if expires <= target.created() {
                return Err(GpgReportError::intent(
                    "expiry must be later than the key's creation time",
                ));
            }
        }

        Ok(Self::SetExpiry {
            key: key.fingerprint().clone(),
            subkey: subkey.cloned(),
            expires,
        })
    }

    pub fn revoke_subkey(
        key: &Key,
        index: usize,
        reason_code: i64,
        reason_text: &str,
    ) -> Result<Self> {
        check_subkey_index(key, index)?;
        let reason = RevocationReason::from_code(reason_code)?;
        let text = Validator::validate_reason_text(reason_text)?;
        Ok(Self::RevokeSubkey {
            key: key.fingerprint().clone(),
            index,
            reason,
            text,
        })
    }

    pub fn delete_subkey(key: &Key, index: usize) -> Result<Self> {
        check_subkey_index(key, index)?;
        Ok(Self::DeleteSubkey {
            key: key.fingerprint().clone(),
            index,
        })
    }

    /// Certify a user ID of `target` with every key in `signers`
    pub fn certify_user_id(
        target: &Key,
        signers: &[&Key],
        user_id: &str,
        expires: Option<u64>,
    ) -> Result<Self> {
        if signers.is_empty() {
            return Err(GpgReportError::intent("no signing keys selected"));
        }
        if let Some(signer) = signers.iter().find(|signer| !signer.has_secret()) {
            return Err(GpgReportError::intent(format!(
                "signing key {} has no secret material",
                signer.fingerprint()
            )));
        }
        if !target.user_ids().iter().any(|uid| uid.uid() == user_id) {
            return Err(GpgReportError::intent(format!(
                "user ID \"{}\" not found on key {}",
                user_id,
                target.fingerprint()
            )));
        }

        Ok(Self::CertifyUserId {
            key: target.fingerprint().clone(),
            signers: signers
                .iter()
                .map(|signer| signer.fingerprint().clone())
                .collect(),
            user_id: user_id.to_string(),
            expires,
        })
    }

    /// Fingerprint of the key this intent changes
    pub fn target(&self) -> &Fingerprint {
        match self {
            Self::SetOwnerTrust { key, .. }
            | Self::SetExpiry { key, .. }
            | Self::RevokeSubkey { key, .. }
            | Self::DeleteSubkey { key, .. }
            | Self::CertifyUserId { key, .. } => key,
        }
    }

    /// Applies the edit to a key snapshot, as the key database would after
    /// the engine confirmed it. `now` stamps new certifications.
    pub fn apply(&self, key: &mut Key, now: u64) -> Result<()> {
        if key.fingerprint() != self.target() {
            return Err(GpgReportError::intent(format!(
                "intent for key {} applied to key {}",
                self.target(),
                key.fingerprint()
            )));
        }

        match self {
            Self::SetOwnerTrust { trust, .. } => key.set_owner_trust(*trust),
            Self::SetExpiry { subkey, expires, .. } => key.set_expiry(subkey.as_ref(), *expires)?,
            Self::RevokeSubkey { index, .. } => key.revoke_subkey_at(*index)?,
            Self::DeleteSubkey { index, .. } => {
                key.remove_subkey_at(*index)?;
            }
            Self::CertifyUserId {
                signers,
                user_id,
                expires,
                ..
            } => {
                for signer in signers {
                    let mut certification = Certification::new(signer.key_id(), now);
                    certification.signer_fingerprint = Some(signer.clone());
                    certification.expires = *expires;
                    key.add_certification(user_id, certification)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::PublicKeyAlgorithm;
    use crate::key::{KeyUsage, Subkey, UserId};

    fn fpr(c: char) -> Fingerprint {
        Fingerprint::parse(&c.to_string().repeat(40)).unwrap()
    }

    fn key(primary: char, subs: &[char], secret: bool) -> Key {
        let primary = Subkey::new(
            fpr(primary),
            PublicKeyAlgorithm::Ed25519,
            KeyUsage::certify_and_sign(),
            255,
            100,
        )
        .with_secret(secret);
        let subkeys = subs
            .iter()
            .map(|c| {
                Subkey::new(
                    fpr(*c),
                    PublicKeyAlgorithm::X25519,
                    KeyUsage::encrypt_only(),
                    255,
                    100,
                )
            })
            .collect();
        Key::new(primary, subkeys, vec![UserId::new("Bob", "bob@example.com", "")]).unwrap()
    }

    #[test]
    fn test_owner_trust_range() {
        let k = key('A', &[], false);
        assert!(KeyEditIntent::set_owner_trust(&k, 0).is_err());
        assert!(KeyEditIntent::set_owner_trust(&k, 6).is_err());
        let intent = KeyEditIntent::set_owner_trust(&k, 5).unwrap();
        assert_eq!(
            intent,
            KeyEditIntent::SetOwnerTrust {
                key: fpr('A'),
                trust: OwnerTrust::Ultimate
            }
        );
    }

    #[test]
    fn test_subkey_index_range() {
        let k = key('A', &['B', 'C'], false);
        assert!(KeyEditIntent::delete_subkey(&k, 0).is_err());
        assert!(KeyEditIntent::delete_subkey(&k, 3).is_err());
        assert!(KeyEditIntent::delete_subkey(&k, 2).is_ok());
        assert!(KeyEditIntent::revoke_subkey(&k, 1, 4, "").is_err());
    }

    #[test]
    fn test_revocation_text_lines() {
        let k = key('A', &['B'], false);
        let intent = KeyEditIntent::revoke_subkey(&k, 1, 2, "moved to\n\nnew hardware").unwrap();
        let KeyEditIntent::RevokeSubkey { reason, text, .. } = intent else {
            panic!("expected revoke intent");
        };
        assert_eq!(reason, RevocationReason::Superseded);
        assert_eq!(text, vec!["moved to", "new hardware"]);
    }

    #[test]
    fn test_apply_revoke_and_delete() {
        let mut k = key('A', &['B', 'C'], false);
        KeyEditIntent::revoke_subkey(&k, 1, 1, "")
            .unwrap()
            .apply(&mut k, 0)
            .unwrap();
        assert!(k.subkeys()[0].is_revoked());

        KeyEditIntent::delete_subkey(&k, 2)
            .unwrap()
            .apply(&mut k, 0)
            .unwrap();
        assert_eq!(k.subkeys().len(), 1);

        let other = KeyEditIntent::set_owner_trust(&key('D', &[], false), 4).unwrap();
        assert!(other.apply(&mut k, 0).is_err());
    }

    #[test]
    fn test_certify_requires_secret_and_uid() {
        let mut target = key('A', &[], false);
        let signer = key('E', &[], true);
        let public_only = key('D', &[], false);

        let bob = "Bob <bob@example.com>";
        assert!(KeyEditIntent::certify_user_id(&target, &[], bob, None).is_err());
        assert!(KeyEditIntent::certify_user_id(&target, &[&public_only], bob, None).is_err());
        assert!(
            KeyEditIntent::certify_user_id(&target, &[&signer], "Eve <eve@example.com>", None)
                .is_err()
        );

        let intent = KeyEditIntent::certify_user_id(&target, &[&signer], bob, None).unwrap();
        intent.apply(&mut target, 500).unwrap();
        let certs = &target.user_ids()[0].certifications;
        assert_eq!(certs.len(), 1);
        assert_eq!(certs[0].signer, fpr('E').key_id());
        assert_eq!(certs[0].created, 500);
    }

    #[test]
    fn test_expiry_must_follow_creation() {
        let k = key('A', &['B'], false);
        assert!(KeyEditIntent::set_expiry(&k, None, Some(50)).is_err());
        assert!(KeyEditIntent::set_expiry(&k, Some(&fpr('B')), Some(500)).is_ok());
        assert!(KeyEditIntent::set_expiry(&k, Some(&fpr('F')), None).is_err());
        assert!(KeyEditIntent::set_expiry(&k, None, None).is_ok());
    }
}
