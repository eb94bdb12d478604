//! Narrative turn and story response models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of choices offered to the player in a single turn.
pub const MAX_CHOICES: usize = 4;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    /// A predefined choice or free-text action submitted by the player
    UserChoice,
    /// A story beat produced by the story engine
    Narrator,
}

/// A single entry of a session's transcript.
///
/// Turns are never edited after creation; ids grow by one within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeTurn {
    pub id: u64,
    pub content: String,
    pub role: TurnRole,
    pub timestamp: DateTime<Utc>,
}

impl NarrativeTurn {
    pub fn new(id: u64, role: TurnRole, content: impl Into<String>) -> Self {
        Self {
            id,
            content: content.into(),
            role,
            timestamp: Utc::now(),
        }
    }

    pub fn is_user_choice(&self) -> bool {
        self.role == TurnRole::UserChoice
    }
}

/// Structured narrative turn recovered from model text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryResponse {
    /// Story text; never empty once recovered
    pub story: String,
    /// Up to [`MAX_CHOICES`] options; empty when the story has ended
    #[serde(default)]
    pub choices: Vec<String>,
    #[serde(default)]
    pub is_ending: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ending_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_prompt: Option<String>,
}

impl StoryResponse {
    /// Enforces the turn invariants: trimmed non-blank choices, at most
    /// [`MAX_CHOICES`] of them, none at all on an ending, and blank optional
    /// strings collapsed to `None`.
    pub fn normalized(mut self) -> Self {
        self.choices = self
            .choices
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .take(MAX_CHOICES)
            .collect();
        if self.is_ending {
            self.choices.clear();
        }
        self.ending_type = non_blank(self.ending_type);
        self.image_prompt = non_blank(self.image_prompt);
        self
    }
}

pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
