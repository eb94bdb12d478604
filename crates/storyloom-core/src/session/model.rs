//! Session record domain model.

use crate::error::{Result, StoryError};
use crate::story::{
    CharacterDetails, CustomizationAnswers, CustomizationQuestion, NarrativeTurn, TurnRole,
    character_profile,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Progress counters derived from the transcript.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Number of turns in the transcript
    pub total_parts: usize,
    /// Number of user choices made so far
    pub last_choice_index: usize,
}

/// Persisted state of one story playthrough.
///
/// A record is created with the opening turn, rewritten on every turn and
/// autosave, marked `completed` when a turn ends the story, and deleted only
/// on an explicit reset or when the player discards a finished story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Unique session identifier (UUID format)
    pub session_id: String,
    /// Owner of the record
    pub user_id: String,
    pub story_title: String,
    #[serde(default)]
    pub story_description: String,
    #[serde(default)]
    pub turns: Vec<NarrativeTurn>,
    /// Choices offered by the latest narrator turn
    #[serde(default)]
    pub pending_choices: Vec<String>,
    /// Accumulated narrative sent back to the engine on every continuation
    #[serde(default)]
    pub story_context: String,
    #[serde(default)]
    pub customization_answers: CustomizationAnswers,
    #[serde(default)]
    pub customization_questions: Vec<CustomizationQuestion>,
    /// Whether the player may submit the next choice
    #[serde(default)]
    pub awaiting_input: bool,
    #[serde(default)]
    pub completed: bool,
    /// Reference to the latest generated scene image, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene_image_ref: Option<String>,
    #[serde(default)]
    pub progress: Progress,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(
        session_id: impl Into<String>,
        user_id: impl Into<String>,
        story_title: impl Into<String>,
        story_description: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            user_id: user_id.into(),
            story_title: story_title.into(),
            story_description: story_description.into(),
            turns: Vec::new(),
            pending_choices: Vec::new(),
            story_context: String::new(),
            customization_answers: CustomizationAnswers::new(),
            customization_questions: Vec::new(),
            awaiting_input: false,
            completed: false,
            scene_image_ref: None,
            progress: Progress::default(),
            created_at: now,
            last_updated: now,
        }
    }

    /// Id for the next appended turn.
    pub fn next_turn_id(&self) -> u64 {
        self.turns.last().map_or(1, |turn| turn.id + 1)
    }

    /// Appends a turn with the next id and returns that id.
    pub fn push_turn(&mut self, role: TurnRole, content: impl Into<String>) -> u64 {
        let id = self.next_turn_id();
        self.turns.push(NarrativeTurn::new(id, role, content));
        id
    }

    pub fn user_choice_count(&self) -> usize {
        self.turns.iter().filter(|t| t.is_user_choice()).count()
    }

    /// Previous turn contents joined by blank lines.
    pub fn history(&self) -> String {
        self.turns
            .iter()
            .map(|t| t.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Whether the record holds a story worth offering to resume.
    pub fn has_progress(&self) -> bool {
        self.turns.len() > 1 || !self.pending_choices.is_empty()
    }

    pub fn character_details(&self) -> CharacterDetails {
        CharacterDetails::from_answers(&self.customization_questions, &self.customization_answers)
    }

    pub fn character_profile(&self) -> Vec<String> {
        character_profile(&self.customization_questions, &self.customization_answers)
    }

    /// Checks that the record can be resumed by `user_id`.
    pub fn validate(&self, user_id: &str) -> Result<()> {
        if self.session_id.trim().is_empty() {
            return Err(StoryError::validation("session record has an empty id"));
        }
        if self.user_id != user_id {
            return Err(StoryError::validation(format!(
                "session {} belongs to a different user",
                self.session_id
            )));
        }
        if self.turns.is_empty() {
            return Err(StoryError::validation(format!(
                "session {} has no turns",
                self.session_id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_with_turns(n: usize) -> SessionRecord {
        let mut record = SessionRecord::new("s-1", "u-1", "The Vault", "A heist");
        for i in 0..n {
            let role = if i % 2 == 0 {
                TurnRole::Narrator
            } else {
                TurnRole::UserChoice
            };
            record.push_turn(role, format!("turn {i}"));
        }
        record
    }

    #[test]
    fn test_turn_ids_increase_from_one() {
        let record = record_with_turns(3);
        let ids: Vec<_> = record.turns.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(record.next_turn_id(), 4);
        assert_eq!(record.user_choice_count(), 1);
        assert_eq!(record.history(), "turn 0\n\nturn 1\n\nturn 2");
    }

    #[test]
    fn test_has_progress() {
        let mut record = record_with_turns(1);
        assert!(!record.has_progress());
        record.pending_choices.push("Open the vault".to_string());
        assert!(record.has_progress());
        assert!(record_with_turns(3).has_progress());
    }

    #[test]
    fn test_validate() {
        assert!(record_with_turns(1).validate("u-1").is_ok());
        assert!(record_with_turns(1).validate("u-2").unwrap_err().is_validation());
        assert!(record_with_turns(0).validate("u-1").unwrap_err().is_validation());

        let mut blank = record_with_turns(1);
        blank.session_id = " ".to_string();
        assert!(blank.validate("u-1").unwrap_err().is_validation());
    }

    #[test]
    fn test_serde_defaults_for_sparse_documents() {
        let json = r#"{
            "session_id": "s-9",
            "user_id": "u-1",
            "story_title": "Sparse",
            "created_at": "2025-01-01T00:00:00Z",
            "last_updated": "2025-01-01T00:00:00Z"
        }"#;
        let record: SessionRecord = serde_json::from_str(json).unwrap();
        assert!(record.turns.is_empty());
        assert!(!record.completed);
        assert_eq!(record.progress, Progress::default());
    }
}
