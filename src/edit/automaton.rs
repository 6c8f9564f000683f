//! Key editor interaction automaton.
//!
//! The engine's interactive key editor asks questions through status lines
//! (`GET_LINE keyedit.prompt`, `GET_BOOL keyedit.save.okay`, ...). A
//! [`KeyEditSession`] answers them for one trust, delete or revoke edit. It
//! is a pure state machine: feed it each status and its arguments, send back
//! whatever response it returns.

use super::intent::{KeyEditIntent, RevocationReason};
use crate::error::{GpgReportError, Result};
use std::collections::VecDeque;
use tracing::{debug, warn};

const KEYEDIT_PROMPT: &str = "keyedit.prompt";
const KEYEDIT_SAVE_OKAY: &str = "keyedit.save.okay";
const OWNERTRUST_VALUE: &str = "edit_ownertrust.value";
const OWNERTRUST_SET_ULTIMATE: &str = "edit_ownertrust.set_ultimate.okay";
const REMOVE_SUBKEY_OKAY: &str = "keyedit.remove.subkey.okay";
const REVOKE_SUBKEY_OKAY: &str = "keyedit.revoke.subkey.okay";
const REASON_CODE: &str = "ask_revocation_reason.code";
const REASON_TEXT: &str = "ask_revocation_reason.text";
const REASON_OKAY: &str = "ask_revocation_reason.okay";

/// Where the session is in the editor dialogue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditState {
    Start,
    Select,
    Command,
    Value,
    Confirm,
    ReasonCode,
    ReasonText,
    Quit,
    Save,
    Error,
}

/// Questions the editor asks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prompt {
    Line,
    Bool,
}

impl Prompt {
    fn from_status(status: &str) -> Option<Self> {
        match status {
            "GET_LINE" => Some(Self::Line),
            "GET_BOOL" => Some(Self::Bool),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum EditProgram {
    Trust {
        level: u8,
    },
    Delete {
        index: usize,
    },
    Revoke {
        index: usize,
        reason: RevocationReason,
        lines: VecDeque<String>,
    },
}

/// One run of the key editor
#[derive(Debug, Clone)]
pub struct KeyEditSession {
    program: EditProgram,
    state: EditState,
    success: bool,
    saw_error: bool,
}

impl KeyEditSession {
    /// Builds a session for intents the key editor executes
    ///
    /// Expiry changes and certifications have direct engine calls and are
    /// rejected here.
    pub fn for_intent(intent: &KeyEditIntent) -> Result<Self> {
        let program = match intent {
            KeyEditIntent::SetOwnerTrust { trust, .. } => EditProgram::Trust {
                level: trust.code(),
            },
            KeyEditIntent::DeleteSubkey { index, .. } => EditProgram::Delete { index: *index },
            KeyEditIntent::RevokeSubkey {
                index,
                reason,
                text,
                ..
            } => EditProgram::Revoke {
                index: *index,
                reason: *reason,
                lines: text.iter().cloned().collect(),
            },
            KeyEditIntent::SetExpiry { .. } | KeyEditIntent::CertifyUserId { .. } => {
                return Err(GpgReportError::intent(
                    "intent is not executed through the key editor",
                ))
            }
        };

        Ok(Self {
            program,
            state: EditState::Start,
            success: false,
            saw_error: false,
        })
    }

    pub fn state(&self) -> EditState {
        self.state
    }

    /// The editor accepted the edit and saved it, without any unexpected prompt
    pub fn succeeded(&self) -> bool {
        self.success && !self.saw_error && self.state == EditState::Save
    }

    /// Handles one status line
    ///
    /// Returns the response to send, or `None` for informational statuses
    /// that expect no answer.
    pub fn step(&mut self, status: &str, args: &str) -> Option<String> {
        let prompt = Prompt::from_status(status)?;
        let next = self.next_state(prompt, args);
        if next == EditState::Error {
            warn!(from = ?self.state, status, args, "unexpected key editor prompt");
            self.saw_error = true;
        }
        debug!(from = ?self.state, to = ?next, status, args, "key editor transition");
        self.state = next;
        Some(self.action())
    }

    fn next_state(&self, prompt: Prompt, args: &str) -> EditState {
        use EditState::*;

        let line = |expected: &str| prompt == Prompt::Line && args == expected;
        let bool_ = |expected: &str| prompt == Prompt::Bool && args == expected;

        // Shared tail: quitting, saving and recovering from errors
        match self.state {
            Quit => return if bool_(KEYEDIT_SAVE_OKAY) { Save } else { Error },
            Error => return if line(KEYEDIT_PROMPT) { Quit } else { Error },
            Save => return Error,
            _ => {}
        }

        match &self.program {
            EditProgram::Trust { .. } => match self.state {
                Start if line(KEYEDIT_PROMPT) => Command,
                Command if line(OWNERTRUST_VALUE) => Value,
                Value if line(KEYEDIT_PROMPT) => Quit,
                Value if bool_(OWNERTRUST_SET_ULTIMATE) => Confirm,
                Confirm if line(KEYEDIT_PROMPT) => Quit,
                _ => Error,
            },
            EditProgram::Delete { .. } => match self.state {
                Start if line(KEYEDIT_PROMPT) => Select,
                Select if line(KEYEDIT_PROMPT) => Command,
                Command if line(KEYEDIT_PROMPT) => Quit,
                Command if bool_(REMOVE_SUBKEY_OKAY) => Confirm,
                Confirm if line(KEYEDIT_PROMPT) => Quit,
                _ => Error,
            },
            EditProgram::Revoke { .. } => match self.state {
                Start if line(KEYEDIT_PROMPT) => Select,
                Select if line(KEYEDIT_PROMPT) => Command,
                Command if line(KEYEDIT_PROMPT) => Quit,
                Command if bool_(REVOKE_SUBKEY_OKAY) => Confirm,
                Confirm if line(KEYEDIT_PROMPT) => Quit,
                Confirm if line(REASON_CODE) => ReasonCode,
                ReasonCode if line(KEYEDIT_PROMPT) => Quit,
                ReasonCode if line(REASON_TEXT) => ReasonText,
                ReasonText if line(KEYEDIT_PROMPT) => Quit,
                ReasonText if line(REASON_TEXT) => ReasonText,
                ReasonText if bool_(REASON_OKAY) => Confirm,
                _ => Error,
            },
        }
    }

    fn action(&mut self) -> String {
        match (&mut self.program, self.state) {
            (_, EditState::Quit) => "quit".to_string(),
            (_, EditState::Save) => {
                self.success = true;
                "Y".to_string()
            }
            (_, EditState::Start | EditState::Error) => String::new(),

            (EditProgram::Trust { .. }, EditState::Command) => "trust".to_string(),
            (EditProgram::Trust { level }, EditState::Value) => {
                let level = *level;
                self.success = true;
                level.to_string()
            }
            (EditProgram::Trust { .. }, EditState::Confirm) => {
                self.success = true;
                "Y".to_string()
            }

            (EditProgram::Delete { index }, EditState::Select) => format!("key {}", index),
            (EditProgram::Delete { .. }, EditState::Command) => "delkey".to_string(),
            (EditProgram::Delete { .. }, EditState::Confirm) => {
                self.success = true;
                "Y".to_string()
            }

            (EditProgram::Revoke { index, .. }, EditState::Select) => format!("key {}", index),
            (EditProgram::Revoke { .. }, EditState::Command) => "revkey".to_string(),
            (EditProgram::Revoke { reason, .. }, EditState::ReasonCode) => {
                reason.code().to_string()
            }
            (EditProgram::Revoke { lines, .. }, EditState::ReasonText) => {
                // An empty line ends the reason text
                lines.pop_front().unwrap_or_default()
            }
            (EditProgram::Revoke { .. }, EditState::Confirm) => "Y".to_string(),

            _ => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::PublicKeyAlgorithm;
    use crate::key::{Fingerprint, Key, KeyUsage, Subkey};

    fn key() -> Key {
        let fpr = |c: char| Fingerprint::parse(&c.to_string().repeat(40)).unwrap();
        let primary = Subkey::new(fpr('A'), PublicKeyAlgorithm::Rsa, KeyUsage::all(), 3072, 0);
        let sub = Subkey::new(fpr('B'), PublicKeyAlgorithm::Rsa, KeyUsage::encrypt_only(), 3072, 0);
        Key::new(primary, vec![sub], vec![]).unwrap()
    }

    fn run(session: &mut KeyEditSession, transcript: &[(&str, &str)]) -> Vec<String> {
        transcript
            .iter()
            .filter_map(|(status, args)| session.step(status, args))
            .collect()
    }

    #[test]
    fn test_set_ultimate_trust() {
        let intent = KeyEditIntent::set_owner_trust(&key(), 5).unwrap();
        let mut session = KeyEditSession::for_intent(&intent).unwrap();
        let responses = run(
            &mut session,
            &[
                ("GET_LINE", KEYEDIT_PROMPT),
                ("GET_LINE", OWNERTRUST_VALUE),
                ("GET_BOOL", OWNERTRUST_SET_ULTIMATE),
                ("GOT_IT", ""),
                ("GET_LINE", KEYEDIT_PROMPT),
                ("GET_BOOL", KEYEDIT_SAVE_OKAY),
            ],
        );
        assert_eq!(responses, vec!["trust", "5", "Y", "quit", "Y"]);
        assert_eq!(session.state(), EditState::Save);
        assert!(session.succeeded());
    }

    #[test]
    fn test_delete_subkey() {
        let intent = KeyEditIntent::delete_subkey(&key(), 1).unwrap();
        let mut session = KeyEditSession::for_intent(&intent).unwrap();
        let responses = run(
            &mut session,
            &[
                ("GET_LINE", KEYEDIT_PROMPT),
                ("GET_LINE", KEYEDIT_PROMPT),
                ("GET_BOOL", REMOVE_SUBKEY_OKAY),
                ("GET_LINE", KEYEDIT_PROMPT),
                ("GET_BOOL", KEYEDIT_SAVE_OKAY),
            ],
        );
        assert_eq!(responses, vec!["key 1", "delkey", "Y", "quit", "Y"]);
        assert!(session.succeeded());
    }

    #[test]
    fn test_revoke_subkey_with_reason_text() {
        let intent =
            KeyEditIntent::revoke_subkey(&key(), 1, 1, "stolen laptop\nrotate now").unwrap();
        let mut session = KeyEditSession::for_intent(&intent).unwrap();
        let responses = run(
            &mut session,
            &[
                ("GET_LINE", KEYEDIT_PROMPT),
                ("GET_LINE", KEYEDIT_PROMPT),
                ("GET_BOOL", REVOKE_SUBKEY_OKAY),
                ("GET_LINE", REASON_CODE),
                ("GET_LINE", REASON_TEXT),
                ("GET_LINE", REASON_TEXT),
                ("GET_LINE", REASON_TEXT),
                ("GET_BOOL", REASON_OKAY),
                ("GET_LINE", KEYEDIT_PROMPT),
                ("GET_BOOL", KEYEDIT_SAVE_OKAY),
            ],
        );
        assert_eq!(
            responses,
            vec![
                "key 1",
                "revkey",
                "Y",
                "1",
                "stolen laptop",
                "rotate now",
                "",
                "Y",
                "quit",
                "Y"
            ]
        );
        assert!(session.succeeded());
    }

    #[test]
    fn test_unexpected_prompt_errors() {
        let intent = KeyEditIntent::set_owner_trust(&key(), 3).unwrap();
        let mut session = KeyEditSession::for_intent(&intent).unwrap();
        session.step("GET_LINE", KEYEDIT_PROMPT);
        session.step("GET_BOOL", "keyedit.delsig.unknown");
        assert_eq!(session.state(), EditState::Error);

        // The editor can still be left cleanly, but the edit did not happen
        run(
            &mut session,
            &[("GET_LINE", KEYEDIT_PROMPT), ("GET_BOOL", KEYEDIT_SAVE_OKAY)],
        );
        assert_eq!(session.state(), EditState::Save);
        assert!(!session.succeeded());
    }

    #[test]
    fn test_expiry_not_run_through_editor() {
        let intent = KeyEditIntent::set_expiry(&key(), None, None).unwrap();
        assert!(KeyEditSession::for_intent(&intent).is_err());
    }
}
