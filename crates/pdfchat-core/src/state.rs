//! UI-agnostic conversation types
//!
//! Shared by the terminal UI and the one-shot CLI; nothing here depends on a
//! rendering framework.

use serde::{Deserialize, Serialize};

/// Shown in place of an answer when the ask request fails
pub const APOLOGY: &str = "Sorry, something went wrong. Please try again.";

/// One entry of the transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub text: String,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            role: Role::Bot,
            text: text.into(),
        }
    }
}

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
}
