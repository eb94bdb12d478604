//! Character customization questions and the details derived from answers.

use crate::recovery::strip_code_fences;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Answers keyed by the index of the question they answer.
pub type CustomizationAnswers = BTreeMap<usize, String>;

/// Input widget a customization question expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    #[default]
    Text,
    LongText,
    MultipleChoice,
}

/// A question asked before the story starts to personalize it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomizationQuestion {
    pub question: String,
    #[serde(rename = "type", default)]
    pub kind: QuestionKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(
        rename = "maxLength",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub max_length: Option<u32>,
}

impl CustomizationQuestion {
    pub fn text(question: impl Into<String>, max_length: u32) -> Self {
        Self {
            question: question.into(),
            kind: QuestionKind::Text,
            options: Vec::new(),
            max_length: Some(max_length),
        }
    }

    pub fn multiple_choice(question: impl Into<String>, options: &[&str]) -> Self {
        Self {
            question: question.into(),
            kind: QuestionKind::MultipleChoice,
            options: options.iter().map(|o| o.to_string()).collect(),
            max_length: None,
        }
    }
}

#[derive(Deserialize)]
struct QuestionsEnvelope {
    questions: Vec<CustomizationQuestion>,
}

/// Questions used when the engine's answer cannot be parsed.
pub fn fallback_questions() -> Vec<CustomizationQuestion> {
    vec![
        CustomizationQuestion::text("What is your character's name?", 30),
        CustomizationQuestion::multiple_choice(
            "Choose your character's gender:",
            &["Male", "Female", "Non-binary", "Prefer not to specify"],
        ),
        CustomizationQuestion::multiple_choice(
            "What motivates your character most?",
            &[
                "Adventure and excitement",
                "Helping others",
                "Knowledge and discovery",
                "Power and influence",
                "Love and relationships",
            ],
        ),
    ]
}

/// Parses `{"questions": [...]}` out of raw model text.
///
/// Unparsable or empty answers yield [`fallback_questions`].
pub fn parse_customization_questions(raw: &str) -> Vec<CustomizationQuestion> {
    match serde_json::from_str::<QuestionsEnvelope>(strip_code_fences(raw).as_str()) {
        Ok(envelope) => {
            let questions: Vec<_> = envelope
                .questions
                .into_iter()
                .filter(|q| !q.question.trim().is_empty())
                .collect();
            if questions.is_empty() {
                fallback_questions()
            } else {
                questions
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to parse customization questions, using fallback");
            fallback_questions()
        }
    }
}

/// Protagonist details used to personalize prompts and scene descriptions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterDetails {
    pub name: Option<String>,
    pub gender: Option<String>,
    pub appearance: Option<String>,
    pub profession: Option<String>,
}

impl CharacterDetails {
    /// Derives details by matching question wording against the answers.
    pub fn from_answers(
        questions: &[CustomizationQuestion],
        answers: &CustomizationAnswers,
    ) -> Self {
        let mut details = Self::default();

        for (index, question) in questions.iter().enumerate() {
            let Some(answer) = answers.get(&index) else {
                continue;
            };
            let answer = answer.trim();
            if answer.is_empty() {
                continue;
            }

            let question_text = question.question.to_lowercase();
            let answer_lower = answer.to_lowercase();

            if question_text.contains("name") {
                details.name = Some(answer.to_string());
            }
            // "female" contains "male", so one check covers both
            if question_text.contains("gender") || answer_lower.contains("male") {
                details.gender = Some(answer_lower.clone());
            }
            if question_text.contains("appearance") || question_text.contains("look") {
                details.appearance = Some(answer.to_string());
            }
            if question_text.contains("profession") || question_text.contains("job") {
                details.profession = Some(answer.to_string());
            }
        }

        details
    }
}

/// Renders the `question answer` lines handed to the story engine.
pub fn character_profile(
    questions: &[CustomizationQuestion],
    answers: &CustomizationAnswers,
) -> Vec<String> {
    questions
        .iter()
        .enumerate()
        .filter_map(|(index, question)| {
            let answer = answers.get(&index)?.trim();
            (!answer.is_empty()).then(|| format!("{} {}", question.question, answer))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answers(pairs: &[(usize, &str)]) -> CustomizationAnswers {
        pairs.iter().map(|(k, v)| (*k, v.to_string())).collect()
    }

    #[test]
    fn test_parse_questions_from_fenced_json() {
        let raw = "```json\n{\"questions\":[{\"question\":\"Your name?\",\"type\":\"text\",\"maxLength\":20},{\"question\":\"Pick a side\",\"type\":\"multiple_choice\",\"options\":[\"Light\",\"Dark\"]}]}\n```";
        let questions = parse_customization_questions(raw);

        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].max_length, Some(20));
        assert_eq!(questions[1].kind, QuestionKind::MultipleChoice);
        assert_eq!(questions[1].options, vec!["Light", "Dark"]);
    }

    #[test]
    fn test_parse_questions_falls_back_on_garbage() {
        let questions = parse_customization_questions("I would ask about names.");
        assert_eq!(questions, fallback_questions());
    }

    #[test]
    fn test_character_details_from_answers() {
        let questions = vec![
            CustomizationQuestion::text("What is your protagonist's name?", 30),
            CustomizationQuestion::multiple_choice("Choose a gender:", &["Male", "Female"]),
            CustomizationQuestion::text("Describe how you look", 100),
            CustomizationQuestion::text("What is your job?", 30),
        ];
        let details = CharacterDetails::from_answers(
            &questions,
            &answers(&[(0, "Aria"), (1, "Female"), (2, "  "), (3, "Blacksmith")]),
        );

        assert_eq!(details.name.as_deref(), Some("Aria"));
        assert_eq!(details.gender.as_deref(), Some("female"));
        assert_eq!(details.appearance, None);
        assert_eq!(details.profession.as_deref(), Some("Blacksmith"));
    }

    #[test]
    fn test_character_profile_skips_blank_answers() {
        let questions = fallback_questions();
        let lines = character_profile(&questions, &answers(&[(0, "Kai"), (2, "")]));
        assert_eq!(lines, vec!["What is your character's name? Kai"]);
    }
}
