//! Key-management edits.
//!
//! [`KeyEditIntent`] validates a requested change before anything touches
//! the key database. Trust, delete and revoke edits are carried out through
//! the engine's interactive key editor, driven by [`KeyEditSession`].

pub mod automaton;
pub mod intent;

pub use automaton::{EditState, KeyEditSession};
pub use intent::{KeyEditIntent, RevocationReason};
