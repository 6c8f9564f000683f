//! Trust and validity classification.
//!
//! Owner trust is what the user assigned to a key's owner; validity is what
//! the engine computed for the key from certifications or TOFU history.
//! [`classify`] folds the two into one canonical [`TrustLevel`] and is the
//! single place this decision is made: the verify analyzer and the key
//! listing both call it, so a key never shows two different trust levels.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Owner trust as assigned locally by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OwnerTrust {
    #[default]
    Unknown,
    Undefined,
    Never,
    Marginal,
    Full,
    Ultimate,
}

impl OwnerTrust {
    /// Decodes the engine's numeric owner trust; anything out of range is Unknown
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Self::Undefined,
            2 => Self::Never,
            3 => Self::Marginal,
            4 => Self::Full,
            5 => Self::Ultimate,
            _ => Self::Unknown,
        }
    }

    /// Decodes the owner trust column of a colon key listing
    pub fn from_colon_char(c: char) -> Self {
        match c {
            'q' => Self::Undefined,
            'n' => Self::Never,
            'm' => Self::Marginal,
            'f' => Self::Full,
            'u' => Self::Ultimate,
            _ => Self::Unknown,
        }
    }

    /// Returns the engine's numeric code
    pub fn code(&self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Undefined => 1,
            Self::Never => 2,
            Self::Marginal => 3,
            Self::Full => 4,
            Self::Ultimate => 5,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Undefined => "undefined",
            Self::Never => "never",
            Self::Marginal => "marginal",
            Self::Full => "full",
            Self::Ultimate => "ultimate",
        }
    }
}

impl fmt::Display for OwnerTrust {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A validity value exactly as the engine reported it
///
/// Kept raw so that codes this crate does not recognize survive until
/// classification, where they become [`TrustLevel::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ValidityCode(pub i64);

impl ValidityCode {
    pub const UNKNOWN: Self = Self(0);
    pub const UNDEFINED: Self = Self(1);
    pub const NEVER: Self = Self(2);
    pub const MARGINAL: Self = Self(3);
    pub const FULL: Self = Self(4);
    pub const ULTIMATE: Self = Self(5);
    /// Stand-in for listing characters with no numeric equivalent
    pub const UNRECOGNIZED: Self = Self(-1);

    /// Decodes the validity column of a colon key listing
    ///
    /// Expired (`e`), revoked (`r`), invalid (`i`, `d`) and `-` are states
    /// rather than validity levels and map to [`ValidityCode::UNRECOGNIZED`].
    pub fn from_colon_char(c: char) -> Self {
        match c {
            'o' => Self::UNKNOWN,
            'q' => Self::UNDEFINED,
            'n' => Self::NEVER,
            'm' => Self::MARGINAL,
            'f' => Self::FULL,
            'u' => Self::ULTIMATE,
            _ => Self::UNRECOGNIZED,
        }
    }

    /// Returns the level this code names, if it names one
    pub fn level(&self) -> Option<TrustLevel> {
        match self.0 {
            0 => Some(TrustLevel::Unknown),
            1 => Some(TrustLevel::Undefined),
            2 => Some(TrustLevel::Never),
            3 => Some(TrustLevel::Marginal),
            4 => Some(TrustLevel::Full),
            5 => Some(TrustLevel::Ultimate),
            _ => None,
        }
    }
}

/// Canonical trust level shared by every consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TrustLevel {
    Unknown,
    Undefined,
    Never,
    Marginal,
    Full,
    Ultimate,
}

impl TrustLevel {
    /// Full and Ultimate are the only levels trusted without confirmation
    pub fn is_fully_valid(&self) -> bool {
        matches!(self, Self::Full | Self::Ultimate)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Undefined => "undefined",
            Self::Never => "never",
            Self::Marginal => "marginal",
            Self::Full => "full",
            Self::Ultimate => "ultimate",
        }
    }
}

impl fmt::Display for TrustLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Result of [`classify`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustAssessment {
    /// Canonical trust level
    pub level: TrustLevel,
    /// True only for Full and Ultimate
    pub fully_valid: bool,
    /// Human-readable reason for the level
    pub justification: String,
}

/// Maps owner trust and a raw validity code to a canonical trust level.
///
/// Total over its inputs. An unrecognized validity code yields
/// [`TrustLevel::Unknown`] regardless of owner trust. Otherwise an ultimately
/// trusted owner (the user's own key) makes the key ultimately valid, and
/// every other owner trust leaves the engine's computed validity as is.
pub fn classify(owner_trust: OwnerTrust, validity: ValidityCode) -> TrustAssessment {
    let Some(computed) = validity.level() else {
        return TrustAssessment {
            level: TrustLevel::Unknown,
            fully_valid: false,
            justification: format!("engine reported unrecognized validity code {}", validity.0),
        };
    };

    let (level, justification) = if owner_trust == OwnerTrust::Ultimate {
        (
            TrustLevel::Ultimate,
            "the key is ultimately trusted by the local user".to_string(),
        )
    } else {
        let reason = match computed {
            TrustLevel::Unknown => "the validity of the key is unknown",
            TrustLevel::Undefined => "the validity of the key has not been determined",
            TrustLevel::Never => "the key is marked as never valid",
            TrustLevel::Marginal => "the key is only marginally valid",
            TrustLevel::Full => "the key is fully valid",
            TrustLevel::Ultimate => "the key is ultimately valid",
        };
        (computed, reason.to_string())
    };

    TrustAssessment {
        level,
        fully_valid: level.is_fully_valid(),
        justification,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_OWNER_TRUST: [OwnerTrust; 6] = [
        OwnerTrust::Unknown,
        OwnerTrust::Undefined,
        OwnerTrust::Never,
        OwnerTrust::Marginal,
        OwnerTrust::Full,
        OwnerTrust::Ultimate,
    ];

    #[test]
    fn test_fully_valid_only_for_full_and_ultimate() {
        for code in 0..=5 {
            let assessment = classify(OwnerTrust::Marginal, ValidityCode(code));
            assert_eq!(assessment.fully_valid, code >= 4, "validity code {}", code);
        }
    }

    #[test]
    fn test_unrecognized_code_is_unknown() {
        for owner in ALL_OWNER_TRUST {
            for code in [-1, 6, 42, i64::MAX, i64::MIN] {
                let assessment = classify(owner, ValidityCode(code));
                assert_eq!(assessment.level, TrustLevel::Unknown);
                assert!(!assessment.fully_valid);
                assert!(assessment.justification.contains("unrecognized"));
            }
        }
    }

    #[test]
    fn test_ultimate_owner_trust_lifts_validity() {
        let assessment = classify(OwnerTrust::Ultimate, ValidityCode::MARGINAL);
        assert_eq!(assessment.level, TrustLevel::Ultimate);
        assert!(assessment.fully_valid);

        let assessment = classify(OwnerTrust::Full, ValidityCode::MARGINAL);
        assert_eq!(assessment.level, TrustLevel::Marginal);
        assert!(!assessment.fully_valid);
    }

    #[test]
    fn test_colon_listing_chars() {
        assert_eq!(ValidityCode::from_colon_char('f'), ValidityCode::FULL);
        assert_eq!(ValidityCode::from_colon_char('e'), ValidityCode::UNRECOGNIZED);
        assert_eq!(OwnerTrust::from_colon_char('u'), OwnerTrust::Ultimate);
        assert_eq!(OwnerTrust::from_colon_char('-'), OwnerTrust::Unknown);
        assert_eq!(OwnerTrust::from_code(9), OwnerTrust::Unknown);
        assert_eq!(OwnerTrust::from_code(4).code(), 4);
    }
}
