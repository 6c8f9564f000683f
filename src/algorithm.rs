//! OpenPGP algorithm identifiers.
//!
//! The engine reports algorithms as numeric RFC 4880 / RFC 9580 identifiers.
//! Each enum here is total over its input: an identifier we do not know is
//! kept as `Unknown(id)` instead of being folded into a real algorithm.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Public-key algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PublicKeyAlgorithm {
    /// RSA (encrypt or sign)
    Rsa,
    /// RSA encrypt-only (deprecated)
    RsaEncrypt,
    /// RSA sign-only (deprecated)
    RsaSign,
    /// Elgamal encrypt-only
    Elgamal,
    /// DSA
    Dsa,
    /// ECDH
    Ecdh,
    /// ECDSA
    Ecdsa,
    /// EdDSA (legacy Ed25519 encoding)
    EdDsa,
    /// X25519
    X25519,
    /// X448
    X448,
    /// Ed25519
    Ed25519,
    /// Ed448
    Ed448,
    /// Identifier not known to this crate
    Unknown(u32),
}

impl PublicKeyAlgorithm {
    /// Decodes an OpenPGP public-key algorithm identifier
    pub fn from_id(id: u32) -> Self {
        match id {
            1 => Self::Rsa,
            2 => Self::RsaEncrypt,
            3 => Self::RsaSign,
            16 | 20 => Self::Elgamal,
            17 => Self::Dsa,
            18 => Self::Ecdh,
            19 => Self::Ecdsa,
            22 => Self::EdDsa,
            25 => Self::X25519,
            26 => Self::X448,
            27 => Self::Ed25519,
            28 => Self::Ed448,
            other => Self::Unknown(other),
        }
    }

    /// Returns the algorithm name as shown to users
    pub fn name(&self) -> String {
        match self {
            Self::Rsa => "RSA".to_string(),
            Self::RsaEncrypt => "RSA-E".to_string(),
            Self::RsaSign => "RSA-S".to_string(),
            Self::Elgamal => "ELG".to_string(),
            Self::Dsa => "DSA".to_string(),
            Self::Ecdh => "ECDH".to_string(),
            Self::Ecdsa => "ECDSA".to_string(),
            Self::EdDsa => "EdDSA".to_string(),
            Self::X25519 => "X25519".to_string(),
            Self::X448 => "X448".to_string(),
            Self::Ed25519 => "Ed25519".to_string(),
            Self::Ed448 => "Ed448".to_string(),
            Self::Unknown(id) => format!("unknown({})", id),
        }
    }
}

impl fmt::Display for PublicKeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Hash algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashAlgorithm {
    Md5,
    Sha1,
    Ripemd160,
    Sha256,
    Sha384,
    Sha512,
    Sha224,
    Sha3_256,
    Sha3_512,
    /// Identifier not known to this crate
    Unknown(u32),
}

impl HashAlgorithm {
    /// Decodes an OpenPGP hash algorithm identifier
    pub fn from_id(id: u32) -> Self {
        match id {
            1 => Self::Md5,
            2 => Self::Sha1,
            3 => Self::Ripemd160,
            8 => Self::Sha256,
            9 => Self::Sha384,
            10 => Self::Sha512,
            11 => Self::Sha224,
            12 => Self::Sha3_256,
            14 => Self::Sha3_512,
            other => Self::Unknown(other),
        }
    }

    /// Returns the algorithm name as shown to users
    pub fn name(&self) -> String {
        match self {
            Self::Md5 => "MD5".to_string(),
            Self::Sha1 => "SHA1".to_string(),
            Self::Ripemd160 => "RIPEMD160".to_string(),
            Self::Sha256 => "SHA256".to_string(),
            Self::Sha384 => "SHA384".to_string(),
            Self::Sha512 => "SHA512".to_string(),
            Self::Sha224 => "SHA224".to_string(),
            Self::Sha3_256 => "SHA3-256".to_string(),
            Self::Sha3_512 => "SHA3-512".to_string(),
            Self::Unknown(id) => format!("unknown({})", id),
        }
    }

    /// Returns true for digests no longer considered collision resistant
    pub fn is_weak(&self) -> bool {
        matches!(self, Self::Md5 | Self::Sha1 | Self::Ripemd160)
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Symmetric ciphers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymmetricAlgorithm {
    Idea,
    TripleDes,
    Cast5,
    Blowfish,
    Aes128,
    Aes192,
    Aes256,
    Twofish,
    Camellia128,
    Camellia192,
    Camellia256,
    /// Identifier not known to this crate
    Unknown(u32),
}

impl SymmetricAlgorithm {
    /// Decodes an OpenPGP symmetric algorithm identifier
    pub fn from_id(id: u32) -> Self {
        match id {
            1 => Self::Idea,
            2 => Self::TripleDes,
            3 => Self::Cast5,
            4 => Self::Blowfish,
            7 => Self::Aes128,
            8 => Self::Aes192,
            9 => Self::Aes256,
            10 => Self::Twofish,
            11 => Self::Camellia128,
            12 => Self::Camellia192,
            13 => Self::Camellia256,
            other => Self::Unknown(other),
        }
    }

    /// Returns the algorithm name as shown to users
    pub fn name(&self) -> String {
        match self {
            Self::Idea => "IDEA".to_string(),
            Self::TripleDes => "3DES".to_string(),
            Self::Cast5 => "CAST5".to_string(),
            Self::Blowfish => "BLOWFISH".to_string(),
            Self::Aes128 => "AES128".to_string(),
            Self::Aes192 => "AES192".to_string(),
            Self::Aes256 => "AES256".to_string(),
            Self::Twofish => "TWOFISH".to_string(),
            Self::Camellia128 => "CAMELLIA128".to_string(),
            Self::Camellia192 => "CAMELLIA192".to_string(),
            Self::Camellia256 => "CAMELLIA256".to_string(),
            Self::Unknown(id) => format!("unknown({})", id),
        }
    }
}

impl fmt::Display for SymmetricAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
