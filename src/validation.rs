//! Input validation and size limits.
//!
//! These checks guard the places where outside data enters the crate: key
//! snapshots loaded from disk, user ID strings, revocation reason text and raw
//! engine result files read by the command line front end.

use crate::error::{GpgReportError, Result};

/// Maximum allowed User ID length (1KB)
pub const MAX_USER_ID_LENGTH: usize = 1024;

/// Maximum allowed number of keys in a keyring
pub const MAX_KEYS_PER_KEYRING: usize = 10000;

/// Maximum allowed size of a raw engine result document (4MB)
pub const MAX_RAW_RESULT_SIZE: usize = 4 * 1024 * 1024;

/// Maximum number of lines in a revocation reason text
pub const MAX_REASON_TEXT_LINES: usize = 32;

/// Validation functions for input data
pub struct Validator;

impl Validator {
    /// Validate User ID string
    pub fn validate_user_id(user_id: &str) -> Result<()> {
        if user_id.len() > MAX_USER_ID_LENGTH {
            return Err(GpgReportError::validation(format!(
                "User ID too long: {} bytes exceeds maximum of {} bytes",
                user_id.len(),
                MAX_USER_ID_LENGTH
            )));
        }

        if user_id.contains('\0') {
            return Err(GpgReportError::validation("User ID contains null bytes"));
        }

        // Tab is the only control character tolerated inside a UID
        if user_id.chars().any(|c| c.is_control() && c != '\t') {
            return Err(GpgReportError::validation(
                "User ID contains invalid control characters",
            ));
        }

        if user_id.trim().is_empty() {
            return Err(GpgReportError::validation("User ID cannot be empty"));
        }

        Ok(())
    }

    /// Validate keyring size
    pub fn validate_keyring_size(count: usize) -> Result<()> {
        if count > MAX_KEYS_PER_KEYRING {
            return Err(GpgReportError::validation(format!(
                "Too many keys in keyring: {} exceeds maximum of {}",
                count, MAX_KEYS_PER_KEYRING
            )));
        }
        Ok(())
    }

    /// Validate the size of a raw engine result document
    pub fn validate_raw_result_size(data: &[u8]) -> Result<()> {
        if data.len() > MAX_RAW_RESULT_SIZE {
            return Err(GpgReportError::validation(format!(
                "Raw result too large: {} bytes exceeds maximum of {} bytes",
                data.len(),
                MAX_RAW_RESULT_SIZE
            )));
        }
        Ok(())
    }

    /// Validate revocation reason text, returning its non-empty lines
    pub fn validate_reason_text(text: &str) -> Result<Vec<String>> {
        let lines: Vec<String> = text
            .split('\n')
            .map(|line| line.trim_end_matches('\r'))
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        if lines.len() > MAX_REASON_TEXT_LINES {
            return Err(GpgReportError::validation(format!(
                "Reason text has {} lines, maximum is {}",
                lines.len(),
                MAX_REASON_TEXT_LINES
            )));
        }

        if lines
            .iter()
            .any(|line| line.chars().any(|c| c.is_control() && c != '\t'))
        {
            return Err(GpgReportError::validation(
                "Reason text contains invalid control characters",
            ));
        }

        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_validation() {
        assert!(Validator::validate_user_id("Alice <alice@example.com>").is_ok());

        assert!(Validator::validate_user_id("").is_err());
        assert!(Validator::validate_user_id("   ").is_err());
        assert!(Validator::validate_user_id("Alice\0<alice@example.com>").is_err());
        assert!(Validator::validate_user_id("Alice\x01<alice@example.com>").is_err());

        let long_user_id = "A".repeat(MAX_USER_ID_LENGTH + 1);
        assert!(Validator::validate_user_id(&long_user_id).is_err());
    }

    #[test]
    fn test_keyring_size() {
        assert!(Validator::validate_keyring_size(MAX_KEYS_PER_KEYRING).is_ok());
        assert!(Validator::validate_keyring_size(MAX_KEYS_PER_KEYRING + 1).is_err());
    }

    #[test]
    fn test_reason_text_lines() {
        let lines = Validator::validate_reason_text("key lost\n\nreplaced by new key\r\n").unwrap();
        assert_eq!(lines, vec!["key lost", "replaced by new key"]);

        assert!(Validator::validate_reason_text("").unwrap().is_empty());
        assert!(Validator::validate_reason_text("bell\x07").is_err());

        let too_many = "x\n".repeat(MAX_REASON_TEXT_LINES + 1);
        assert!(Validator::validate_reason_text(&too_many).is_err());
    }

    #[test]
    fn test_raw_result_size() {
        assert!(Validator::validate_raw_result_size(&[0u8; 16]).is_ok());
        let large = vec![0u8; MAX_RAW_RESULT_SIZE + 1];
        assert!(Validator::validate_raw_result_size(&large).is_err());
    }
}
