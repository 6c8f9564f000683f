//! Key listing rows for key-management views.

use crate::key::{Fingerprint, Key, KeyId, TofuPolicy};
use crate::trust::{classify, OwnerTrust, TrustAssessment};
use serde::{Deserialize, Serialize};

/// One row of a key listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyListing {
    pub fingerprint: Fingerprint,
    pub key_id: KeyId,
    /// Primary key algorithm name
    pub algorithm: String,
    pub length: u32,
    pub owner_trust: OwnerTrust,
    /// Validity as classified, identical to what verification reports
    pub trust: TrustAssessment,
    pub created: u64,
    pub expires: Option<u64>,
    /// Number of subkeys besides the primary key
    pub subkey_count: usize,
    pub primary_user_id: Option<String>,
    /// TOFU policy of the primary user ID
    pub tofu_policy: TofuPolicy,
    pub has_secret: bool,
    pub revoked: bool,
    pub expired: bool,
    pub can_sign: bool,
    pub can_encrypt: bool,
}

impl KeyListing {
    /// Builds the listing row for one key at `now`
    pub fn for_key(key: &Key, now: u64) -> Self {
        let primary = key.primary();
        Self {
            fingerprint: key.fingerprint().clone(),
            key_id: key.key_id(),
            algorithm: primary.algorithm().name(),
            length: primary.length(),
            owner_trust: key.owner_trust(),
            trust: classify(key.owner_trust(), key.validity()),
            created: key.created(),
            expires: key.expires(),
            subkey_count: key.subkeys().len(),
            primary_user_id: key.primary_user_id().map(|uid| uid.uid()),
            tofu_policy: key
                .primary_user_id()
                .map(|uid| uid.tofu_policy)
                .unwrap_or_default(),
            has_secret: key.has_secret(),
            revoked: key.is_revoked(),
            expired: key.is_expired_at(now),
            can_sign: key.can_sign_at(now),
            can_encrypt: key.can_encrypt_at(now),
        }
    }

    /// Rows for many keys, sorted by primary user ID then fingerprint
    pub fn for_keys<'a, I>(keys: I, now: u64) -> Vec<Self>
    where
        I: IntoIterator<Item = &'a Key>,
    {
        let mut rows: Vec<Self> = keys.into_iter().map(|key| Self::for_key(key, now)).collect();
        rows.sort_by(|a, b| {
            a.primary_user_id
                .cmp(&b.primary_user_id)
                .then_with(|| a.fingerprint.cmp(&b.fingerprint))
        });
        rows
    }

    /// Short usage string such as `SE`, empty when the key is unusable
    pub fn usable_for(&self) -> String {
        let mut out = String::new();
        if self.can_sign {
            out.push('S');
        }
        if self.can_encrypt {
            out.push('E');
        }
        out
    }
}
