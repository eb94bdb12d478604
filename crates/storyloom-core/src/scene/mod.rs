//! Image prompt synthesis from narrative text.
//!
//! Used whenever the story engine omits `imagePrompt`. Text is classified
//! along five independent axes (setting, action, mood, notable elements and
//! time/weather) by scanning ordered phrase tables, and the matches are
//! assembled into a fixed template. The result only depends on its inputs.

mod tables;

use crate::story::CharacterDetails;
use tables::PhraseTable;

/// Prompt returned for blank narrative text.
pub const BLANK_SCENE_PROMPT: &str =
    "fantasy scene with mysterious atmosphere, anime style, detailed digital art";

const DEFAULT_SETTING: &str = "fantasy landscape";
const DEFAULT_ACTION: &str = "standing with determined expression";
const DEFAULT_MOOD: &str = "dramatic and atmospheric mood";
const MAX_ELEMENTS: usize = 2;

/// Classification of a piece of narrative along each axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneAnalysis {
    pub setting: &'static str,
    pub action: &'static str,
    pub mood: &'static str,
    /// Every matched element, in table order
    pub elements: Vec<&'static str>,
    pub time_weather: Option<&'static str>,
}

impl SceneAnalysis {
    pub fn of(text: &str) -> Self {
        let text = text.to_lowercase();

        Self {
            setting: compound_match(tables::COMPOUND_SETTINGS, &text)
                .or_else(|| first_match(tables::SETTINGS, &text))
                .unwrap_or(DEFAULT_SETTING),
            action: first_match(tables::ACTIONS, &text).unwrap_or(DEFAULT_ACTION),
            mood: first_match(tables::MOODS, &text).unwrap_or(DEFAULT_MOOD),
            elements: tables::ELEMENTS
                .iter()
                .filter(|(phrase, _)| text.contains(phrase))
                .map(|(_, description)| *description)
                .collect(),
            time_weather: first_match(tables::TIME_WEATHER, &text),
        }
    }
}

/// Builds an image prompt for `story_text` featuring `character`.
pub fn synthesize(story_text: &str, character: &CharacterDetails) -> String {
    if story_text.trim().is_empty() {
        return BLANK_SCENE_PROMPT.to_string();
    }

    let scene = SceneAnalysis::of(story_text);
    let descriptor = character.gender.as_deref().unwrap_or("person");
    let name = character.name.as_deref().unwrap_or("protagonist");

    let mut prompt = format!(
        "{descriptor} named {name} {} in {}",
        scene.action, scene.setting
    );
    if !scene.elements.is_empty() {
        let shown: Vec<_> = scene.elements.iter().take(MAX_ELEMENTS).copied().collect();
        prompt.push_str(&format!(", {} visible", shown.join(", ")));
    }
    if let Some(time_weather) = scene.time_weather {
        prompt.push_str(", ");
        prompt.push_str(time_weather);
    }
    prompt.push_str(&format!(
        ", {}, anime style, detailed digital art, cinematic lighting",
        scene.mood
    ));

    prompt
}

fn first_match(table: PhraseTable, text: &str) -> Option<&'static str> {
    table
        .iter()
        .find(|(phrase, _)| text.contains(phrase))
        .map(|(_, description)| *description)
}

// "throne room" also matches "throneroom".
fn compound_match(table: PhraseTable, text: &str) -> Option<&'static str> {
    table
        .iter()
        .find(|(phrase, _)| text.contains(&phrase.replacen(' ', "", 1)) || text.contains(phrase))
        .map(|(_, description)| *description)
}
