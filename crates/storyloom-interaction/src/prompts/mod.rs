//! Jinja prompt templates for the Gemini story engine.

use minijinja::{Environment, context};
use storyloom_core::engine::{ContinuationRequest, EndingRequest, OpeningRequest};
use storyloom_core::error::{Result, StoryError};

const OPENING: &str = "opening.txt";
const CONTINUATION: &str = "continuation.txt";
const ENDING: &str = "ending.txt";
const QUESTIONS: &str = "questions.txt";

const DEFAULT_ENDING_REASON: &str = "natural conclusion";

/// Renders engine requests into prompt text.
pub struct PromptRenderer {
    env: Environment<'static>,
}

impl PromptRenderer {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        for (name, source) in [
            (OPENING, include_str!("opening.jinja")),
            (CONTINUATION, include_str!("continuation.jinja")),
            (ENDING, include_str!("ending.jinja")),
            (QUESTIONS, include_str!("questions.jinja")),
        ] {
            env.add_template(name, source).map_err(template_error)?;
        }
        Ok(Self { env })
    }

    pub fn opening(&self, request: &OpeningRequest) -> Result<String> {
        self.render(
            OPENING,
            context! {
                title => request.title,
                description => request.description,
                character_profile => request.character_profile,
            },
        )
    }

    pub fn continuation(&self, request: &ContinuationRequest) -> Result<String> {
        self.render(
            CONTINUATION,
            context! {
                title => request.title,
                story_context => request.story_context,
                choice => request.choice,
                is_custom_input => request.is_custom_input,
                story_parts => request.story_parts,
                choices_made => request.choices_made,
                history => request.history,
                character_profile => request.character_profile,
            },
        )
    }

    pub fn ending(&self, request: &EndingRequest) -> Result<String> {
        let reason = request
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_ENDING_REASON);
        self.render(
            ENDING,
            context! {
                title => request.title,
                reason => reason,
                history => request.history,
                character_profile => request.character_profile,
            },
        )
    }

    pub fn customization_questions(&self, title: &str, description: &str) -> Result<String> {
        self.render(
            QUESTIONS,
            context! { title => title, description => description },
        )
    }

    fn render(&self, name: &str, ctx: minijinja::Value) -> Result<String> {
        self.env
            .get_template(name)
            .and_then(|template| template.render(ctx))
            .map_err(template_error)
    }
}

fn template_error(err: minijinja::Error) -> StoryError {
    StoryError::internal(format!("prompt template: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer() -> PromptRenderer {
        PromptRenderer::new().unwrap()
    }

    #[test]
    fn test_opening_includes_profile_block_only_when_present() {
        let mut request = OpeningRequest {
            title: "The Sunken Temple".to_string(),
            description: "Ruins beneath the sea".to_string(),
            character_profile: Vec::new(),
        };
        let plain = renderer().opening(&request).unwrap();
        assert!(plain.contains("Title: \"The Sunken Temple\""));
        assert!(plain.contains("Description: \"Ruins beneath the sea\""));
        assert!(!plain.contains("CHARACTER CUSTOMIZATION"));

        request.character_profile = vec![
            "What is your name? Aria".to_string(),
            "Choose your gender: Female".to_string(),
        ];
        let profiled = renderer().opening(&request).unwrap();
        assert!(profiled.contains(
            "CHARACTER CUSTOMIZATION:\nWhat is your name? Aria\nChoose your gender: Female\n"
        ));
    }

    #[test]
    fn test_continuation_marks_custom_input() {
        let mut request = ContinuationRequest {
            title: "Quest".to_string(),
            story_context: "The gate opens.".to_string(),
            choice: "Climb the wall".to_string(),
            history: "The gate opens.\n\n> Climb the wall".to_string(),
            is_custom_input: false,
            story_parts: 2,
            choices_made: 1,
            character_profile: Vec::new(),
        };
        let picked = renderer().continuation(&request).unwrap();
        assert!(picked.contains("Player's choice: \"Climb the wall\""));
        assert!(picked.contains("Story parts so far: 2"));
        assert!(picked.contains("Player choices made: 1"));
        assert!(picked.ends_with("The gate opens.\n\n> Climb the wall"));

        request.is_custom_input = true;
        let typed = renderer().continuation(&request).unwrap();
        assert!(typed.contains("Player's own action: \"Climb the wall\""));
    }

    #[test]
    fn test_ending_reason_defaults_to_natural_conclusion() {
        let mut request = EndingRequest {
            title: "Quest".to_string(),
            history: "It was a long road.".to_string(),
            reason: None,
            character_profile: Vec::new(),
        };
        let natural = renderer().ending(&request).unwrap();
        assert!(natural.contains("Reason for ending: \"natural conclusion\""));

        request.reason = Some("player chose to stop".to_string());
        let chosen = renderer().ending(&request).unwrap();
        assert!(chosen.contains("Reason for ending: \"player chose to stop\""));
    }

    #[test]
    fn test_questions_prompt_names_the_story() {
        let prompt = renderer()
            .customization_questions("Space Pirates", "Raid the stars")
            .unwrap();
        assert!(prompt.contains("Story Title: \"Space Pirates\""));
        assert!(prompt.contains("\"multiple_choice\""));
    }
}
