//! Story engine abstraction.
//!
//! A `StoryEngine` turns prompts into raw model text. It never parses its
//! own output; callers run the text through the
//! [`ResponseRecoveryPipeline`](crate::recovery::ResponseRecoveryPipeline).

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Request for the opening scene of a new story.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpeningRequest {
    pub title: String,
    pub description: String,
    /// `question answer` lines from character customization
    pub character_profile: Vec<String>,
}

/// Request for the next story beat after a player choice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinuationRequest {
    pub title: String,
    /// Accumulated narrative so far
    pub story_context: String,
    /// Text of the choice or free-form action
    pub choice: String,
    /// Previous turn contents joined by blank lines
    pub history: String,
    /// Whether `choice` was typed by the player rather than picked
    pub is_custom_input: bool,
    /// Number of turns in the transcript, including the new choice
    pub story_parts: usize,
    /// Number of choices made so far, including the new one
    pub choices_made: usize,
    pub character_profile: Vec<String>,
}

/// Request for a conclusion to the current story.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndingRequest {
    pub title: String,
    pub history: String,
    /// Why the story is ending; engines default to a natural conclusion
    pub reason: Option<String>,
    pub character_profile: Vec<String>,
}

/// Generative backend producing raw story text.
#[async_trait]
pub trait StoryEngine: Send + Sync {
    async fn generate_opening(&self, request: &OpeningRequest) -> Result<String>;

    async fn continue_story(&self, request: &ContinuationRequest) -> Result<String>;

    async fn generate_ending(&self, request: &EndingRequest) -> Result<String>;

    /// Raw text expected to hold `{"questions": [...]}`.
    async fn generate_customization_questions(
        &self,
        title: &str,
        description: &str,
    ) -> Result<String>;
}
