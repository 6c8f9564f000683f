//! Key database snapshot and lookup.
//!
//! A [`Keyring`] is the local key database as seen by one analysis pass. The
//! analyzers only need [`KeyLookup::find_key`], which both a full keyring and
//! a plain slice of keys provide, so tests and callers holding a handful of
//! keys never need to build an index.

use crate::edit::KeyEditIntent;
use crate::error::{GpgReportError, Result};
use crate::key::{Fingerprint, Key, KeyHandle, KeyId};
use crate::validation::Validator;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

pub mod listing;

pub use listing::KeyListing;

/// Snapshot format version written by [`Keyring::save`]
pub const SNAPSHOT_VERSION: u32 = 1;

/// Read-only key lookup used during analysis. Must not block.
pub trait KeyLookup {
    /// Finds the key owning the primary key or subkey the handle designates
    fn find_key(&self, handle: &KeyHandle) -> Option<&Key>;
}

impl KeyLookup for [Key] {
    fn find_key(&self, handle: &KeyHandle) -> Option<&Key> {
        self.iter().find(|key| key.matches(handle))
    }
}

impl KeyLookup for Vec<Key> {
    fn find_key(&self, handle: &KeyHandle) -> Option<&Key> {
        self.as_slice().find_key(handle)
    }
}

/// Indexed key database snapshot
#[derive(Debug, Clone, Default)]
pub struct Keyring {
    /// Keys indexed by primary fingerprint
    keys: BTreeMap<Fingerprint, Key>,
    /// Fingerprint of every primary key and subkey, mapped to its owning key
    subkey_index: BTreeMap<Fingerprint, Fingerprint>,
    /// Key ID of every primary key and subkey, mapped to its owning key.
    /// On a key ID collision the lowest primary fingerprint wins.
    key_id_index: BTreeMap<KeyId, Fingerprint>,
}

/// On-disk form of a keyring
#[derive(Debug, Serialize, Deserialize)]
struct KeyringSnapshot {
    version: u32,
    keys: Vec<Key>,
}

fn is_json_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

impl Keyring {
    /// Create a new empty keyring
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a keyring from a list of keys, rejecting duplicates
    pub fn from_keys<I: IntoIterator<Item = Key>>(keys: I) -> Result<Self> {
        let mut keyring = Self::new();
        for key in keys {
            keyring.add_key(key)?;
        }
        Ok(keyring)
    }

    /// Add a key to the keyring
    pub fn add_key(&mut self, key: Key) -> Result<()> {
        let fingerprint = key.fingerprint().clone();

        if self.keys.contains_key(&fingerprint) {
            return Err(GpgReportError::keyring(format!(
                "Key {} already exists in keyring",
                fingerprint
            )));
        }

        for subkey in key.all_subkeys() {
            if let Some(owner) = self.subkey_index.get(subkey.fingerprint()) {
                return Err(GpgReportError::keyring(format!(
                    "Subkey {} of key {} already belongs to key {}",
                    subkey.fingerprint(),
                    fingerprint,
                    owner
                )));
            }
        }

        Validator::validate_keyring_size(self.keys.len() + 1)?;

        for subkey in key.all_subkeys() {
            self.subkey_index
                .insert(subkey.fingerprint().clone(), fingerprint.clone());
            self.key_id_index
                .entry(subkey.key_id())
                .and_modify(|owner| {
                    if fingerprint < *owner {
                        *owner = fingerprint.clone();
                    }
                })
                .or_insert_with(|| fingerprint.clone());
        }

        debug!(fingerprint = %fingerprint, "added key to keyring");
        self.keys.insert(fingerprint, key);
        Ok(())
    }

    /// Get a key by its primary fingerprint
    pub fn get_key(&self, fingerprint: &Fingerprint) -> Option<&Key> {
        self.keys.get(fingerprint)
    }

    /// Applies a confirmed edit to the key it targets and re-indexes.
    ///
    /// The edit runs on a copy, so a failed edit leaves the keyring as it was.
    pub fn apply_intent(&mut self, intent: &KeyEditIntent, now: u64) -> Result<&Key> {
        let fingerprint = intent.target().clone();
        let key = self.keys.get_mut(&fingerprint).ok_or_else(|| {
            GpgReportError::keyring(format!("Key {} not found", fingerprint))
        })?;

        let mut updated = key.clone();
        intent.apply(&mut updated, now)?;
        *key = updated;
        self.rebuild_indexes();

        debug!(fingerprint = %fingerprint, "applied key edit");
        self.keys
            .get(&fingerprint)
            .ok_or_else(|| GpgReportError::keyring(format!("Key {} not found", fingerprint)))
    }

    /// Remove a key from the keyring
    pub fn remove_key(&mut self, fingerprint: &Fingerprint) -> Result<Key> {
        let key = self
            .keys
            .remove(fingerprint)
            .ok_or_else(|| GpgReportError::keyring(format!("Key {} not found", fingerprint)))?;

        // A colliding key ID may now belong to another key
        self.rebuild_indexes();
        Ok(key)
    }

    fn rebuild_indexes(&mut self) {
        self.subkey_index.clear();
        self.key_id_index.clear();
        for (fingerprint, key) in &self.keys {
            for subkey in key.all_subkeys() {
                self.subkey_index
                    .insert(subkey.fingerprint().clone(), fingerprint.clone());
                self.key_id_index
                    .entry(subkey.key_id())
                    .or_insert_with(|| fingerprint.clone());
            }
        }
    }

    /// List all keys, ordered by fingerprint
    pub fn list_keys(&self) -> impl Iterator<Item = &Key> {
        self.keys.values()
    }

    /// Search for keys whose user IDs contain the pattern, case-insensitively
    pub fn search_keys(&self, pattern: &str) -> Vec<&Key> {
        let needle = pattern.to_lowercase();
        self.keys
            .values()
            .filter(|key| {
                key.user_ids()
                    .iter()
                    .any(|uid| uid.uid().to_lowercase().contains(&needle))
            })
            .collect()
    }

    /// Listing rows for every key, classified at `now`
    pub fn listing(&self, now: u64) -> Vec<KeyListing> {
        KeyListing::for_keys(self.keys.values(), now)
    }

    /// Get the number of keys in the keyring
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Check if the keyring is empty
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Save the keyring; JSON if the path ends in `.json`, bincode otherwise
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    GpgReportError::keyring(format!("Failed to create keyring directory: {}", e))
                })?;
            }
        }

        let snapshot = KeyringSnapshot {
            version: SNAPSHOT_VERSION,
            keys: self.keys.values().cloned().collect(),
        };

        let data = if is_json_path(path) {
            serde_json::to_vec_pretty(&snapshot).map_err(|e| {
                GpgReportError::serialization(format!("Failed to serialize keyring: {}", e))
            })?
        } else {
            bincode::serialize(&snapshot).map_err(|e| {
                GpgReportError::serialization(format!("Failed to serialize keyring: {}", e))
            })?
        };

        fs::write(path, data)
            .map_err(|e| GpgReportError::keyring(format!("Failed to write keyring: {}", e)))?;

        info!(path = %path.display(), keys = self.keys.len(), "saved keyring");
        Ok(())
    }

    /// Load a keyring written by [`Keyring::save`]
    ///
    /// Every key is re-validated and the lookup indexes are rebuilt, so a
    /// hand-edited snapshot cannot smuggle in duplicate subkeys.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path)
            .map_err(|e| GpgReportError::keyring(format!("Failed to read keyring: {}", e)))?;

        let snapshot: KeyringSnapshot = if is_json_path(path) {
            serde_json::from_slice(&data).map_err(|e| {
                GpgReportError::serialization(format!("Failed to deserialize keyring: {}", e))
            })?
        } else {
            bincode::deserialize(&data).map_err(|e| {
                GpgReportError::serialization(format!("Failed to deserialize keyring: {}", e))
            })?
        };

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(GpgReportError::keyring(format!(
                "Unsupported keyring snapshot version {}",
                snapshot.version
            )));
        }

        Validator::validate_keyring_size(snapshot.keys.len())?;

        let mut keyring = Self::new();
        for key in snapshot.keys {
            key.validate()?;
            keyring.add_key(key)?;
        }

        info!(path = %path.display(), keys = keyring.len(), "loaded keyring");
        Ok(keyring)
    }

    /// Load the keyring if the file exists, otherwise start empty
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            debug!(path = %path.display(), "no keyring file, starting empty");
            Ok(Self::new())
        }
    }
}

impl KeyLookup for Keyring {
    fn find_key(&self, handle: &KeyHandle) -> Option<&Key> {
        let owner = match handle {
            KeyHandle::Fingerprint(fpr) => self.subkey_index.get(fpr)?,
            KeyHandle::KeyId(id) => self.key_id_index.get(id)?,
        };
        self.keys.get(owner)
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

    fn test_key(primary: char, sub: char, uid: &str) -> Key {
        let primary = Subkey::new(
            fpr(primary),
            PublicKeyAlgorithm::Ed25519,
            KeyUsage::certify_and_sign(),
            255,
            1_600_000_000,
        );
        let sub = Subkey::new(
            fpr(sub),
            PublicKeyAlgorithm::X25519,
            KeyUsage::encrypt_only(),
            255,
            1_600_000_000,
        );
        Key::new(primary, vec![sub], vec![UserId::parse(uid).unwrap()]).unwrap()
    }

    #[test]
    fn test_keyring_operations() {
        let mut keyring = Keyring::new();
        assert!(keyring.is_empty());

        keyring
            .add_key(test_key('A', 'B', "Alice <alice@example.com>"))
            .unwrap();
        assert_eq!(keyring.len(), 1);
        assert!(keyring.get_key(&fpr('A')).is_some());

        // Adding the same key again fails
        let result = keyring.add_key(test_key('A', 'C', "Alice <alice@example.com>"));
        assert!(result.is_err());

        // A subkey shared with another key is rejected
        let result = keyring.add_key(test_key('D', 'B', "Dave <dave@example.com>"));
        assert!(result.is_err());
        assert_eq!(keyring.len(), 1);

        let removed = keyring.remove_key(&fpr('A')).unwrap();
        assert_eq!(removed.fingerprint(), &fpr('A'));
        assert!(keyring.is_empty());
        assert!(keyring.remove_key(&fpr('A')).is_err());
    }

    #[test]
    fn test_find_key_by_subkey_and_key_id() {
        let keyring =
            Keyring::from_keys([test_key('A', 'B', "Alice <alice@example.com>")]).unwrap();

        let by_sub = KeyHandle::Fingerprint(fpr('B'));
        assert_eq!(keyring.find_key(&by_sub).unwrap().fingerprint(), &fpr('A'));

        let by_id = KeyHandle::KeyId(fpr('B').key_id());
        assert_eq!(keyring.find_key(&by_id).unwrap().fingerprint(), &fpr('A'));

        assert!(keyring.find_key(&KeyHandle::Fingerprint(fpr('F'))).is_none());
    }

    #[test]
    fn test_slice_lookup_matches_keyring() {
        let keys = vec![
            test_key('A', 'B', "Alice <alice@example.com>"),
            test_key('C', 'D', "Carol <carol@example.com>"),
        ];
        let keyring = Keyring::from_keys(keys.clone()).unwrap();

        for c in ['A', 'B', 'C', 'D', 'E'] {
            let handle = KeyHandle::Fingerprint(fpr(c));
            assert_eq!(
                keys.find_key(&handle).map(Key::fingerprint),
                keyring.find_key(&handle).map(Key::fingerprint)
            );
        }
    }

    #[test]
    fn test_apply_intent_reindexes() {
        let mut keyring =
            Keyring::from_keys([test_key('A', 'B', "Alice <alice@example.com>")]).unwrap();
        let intent = KeyEditIntent::delete_subkey(keyring.get_key(&fpr('A')).unwrap(), 1).unwrap();

        let key = keyring.apply_intent(&intent, 0).unwrap();
        assert!(key.subkeys().is_empty());
        assert!(keyring.find_key(&KeyHandle::Fingerprint(fpr('B'))).is_none());
        assert!(keyring.find_key(&KeyHandle::KeyId(fpr('B').key_id())).is_none());
        assert!(keyring.find_key(&KeyHandle::Fingerprint(fpr('A'))).is_some());

        // The subkey is gone, so the same index is now out of range
        assert!(keyring.apply_intent(&intent, 0).is_err());
        assert_eq!(keyring.get_key(&fpr('A')).unwrap().subkeys().len(), 0);
    }

    #[test]
    fn test_search_keys() {
        let keyring = Keyring::from_keys([
            test_key('A', 'B', "Alice <alice@example.com>"),
            test_key('C', 'D', "Carol <carol@example.org>"),
        ])
        .unwrap();

        assert_eq!(keyring.search_keys("ALICE").len(), 1);
        assert_eq!(keyring.search_keys("example").len(), 2);
        assert!(keyring.search_keys("mallory").is_empty());
    }
}
