//! Recovery of structured story turns from unreliable model output.
//!
//! Model text is supposed to be a JSON object but arrives wrapped in code
//! fences, truncated, sprinkled with raw control characters or with broken
//! quoting. [`ResponseRecoveryPipeline`] runs an explicit, ordered chain of
//! tiers over the text and stops at the first one that yields story text:
//!
//! 1. [`RecoveryTier::DirectParse`]: strip fences, parse as JSON
//! 2. [`RecoveryTier::StructuralClean`]: isolate the outermost object, repair
//!    whitespace, control characters and commas, parse again
//! 3. [`RecoveryTier::FieldExtraction`]: pull each field out with regexes
//! 4. [`RecoveryTier::SyntheticFallback`]: a fixed, always valid turn
//!
//! Every tier reports a [`TierOutcome`], so a [`RecoveryReport`] shows exactly
//! which strategies failed and why. The pipeline itself never fails.

mod coerce;
mod extract;
mod text;

pub use text::{clean_structure, find_object_span, strip_code_fences, unescape_json_string};

use crate::scene::synthesize;
use crate::story::{CharacterDetails, StoryResponse};
use std::fmt;
use thiserror::Error;

/// Story text of the synthetic fallback turn.
pub const FALLBACK_STORY: &str =
    "The story ran into a technical difficulty, but your adventure is not over. Please continue.";
/// Choices of the synthetic fallback turn.
pub const FALLBACK_CHOICES: [&str; 3] = ["Continue", "Try different approach", "Start over"];
/// Image prompt of the synthetic fallback turn.
pub const FALLBACK_IMAGE_PROMPT: &str = "error scene, technical difficulties";

/// One strategy in the ordered fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecoveryTier {
    DirectParse,
    StructuralClean,
    FieldExtraction,
    SyntheticFallback,
}

impl fmt::Display for RecoveryTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::DirectParse => "direct_parse",
            Self::StructuralClean => "structural_clean",
            Self::FieldExtraction => "field_extraction",
            Self::SyntheticFallback => "synthetic_fallback",
        };
        f.write_str(name)
    }
}

/// Why a tier could not produce a turn.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TierFailure {
    #[error("invalid JSON: {0}")]
    InvalidJson(String),
    #[error("JSON document is not an object")]
    NotAnObject,
    #[error("object has no story text")]
    MissingStory,
    #[error("no JSON object found")]
    NoObjectFound,
    #[error("no story field could be extracted")]
    NoStoryField,
}

/// Tagged result of a single tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TierOutcome {
    Success(StoryResponse),
    Failure(TierFailure),
}

impl From<Result<StoryResponse, TierFailure>> for TierOutcome {
    fn from(result: Result<StoryResponse, TierFailure>) -> Self {
        match result {
            Ok(response) => Self::Success(response),
            Err(failure) => Self::Failure(failure),
        }
    }
}

/// The recovered turn together with the path taken to get it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryReport {
    pub response: StoryResponse,
    /// Tier that produced `response`
    pub tier: RecoveryTier,
    /// Tiers tried before `tier`, in order, with their failures
    pub attempts: Vec<(RecoveryTier, TierFailure)>,
}

/// Turns raw model text into a valid [`StoryResponse`].
///
/// Character details personalize the image prompt synthesized when the model
/// did not supply one.
#[derive(Debug, Clone, Default)]
pub struct ResponseRecoveryPipeline {
    character: CharacterDetails,
}

impl ResponseRecoveryPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_character(character: CharacterDetails) -> Self {
        Self { character }
    }

    pub fn character(&self) -> &CharacterDetails {
        &self.character
    }

    /// Recovers a turn from `raw`. Total: any input yields a usable turn.
    pub fn recover(&self, raw: &str) -> StoryResponse {
        self.recover_detailed(raw).response
    }

    /// Recovers a turn and reports which tiers were attempted.
    pub fn recover_detailed(&self, raw: &str) -> RecoveryReport {
        self.run(raw, "")
    }

    /// Like [`recover`](Self::recover), but a synthesized image prompt
    /// describes `story` followed by `scene_hint` (for example `" final scene"`).
    pub fn recover_with_scene_hint(&self, raw: &str, scene_hint: &str) -> StoryResponse {
        self.run(raw, scene_hint).response
    }

    fn run(&self, raw: &str, scene_hint: &str) -> RecoveryReport {
        let stripped = strip_code_fences(raw);
        let cleaned = find_object_span(&stripped).map(clean_structure);

        let mut attempts = Vec::new();
        let tiers: [(RecoveryTier, &dyn Fn() -> TierOutcome); 3] = [
            (RecoveryTier::DirectParse, &|| direct_parse(&stripped)),
            (RecoveryTier::StructuralClean, &|| {
                structural_parse(cleaned.as_deref())
            }),
            (RecoveryTier::FieldExtraction, &|| {
                field_extraction(cleaned.as_deref(), &stripped)
            }),
        ];

        for (tier, attempt) in tiers {
            match attempt() {
                TierOutcome::Success(response) => {
                    let response = self.finish(response, scene_hint);
                    tracing::debug!(
                        %tier,
                        failed_tiers = attempts.len(),
                        "Recovered story response"
                    );
                    return RecoveryReport {
                        response,
                        tier,
                        attempts,
                    };
                }
                TierOutcome::Failure(failure) => {
                    tracing::debug!(%tier, %failure, "Recovery tier failed");
                    attempts.push((tier, failure));
                }
            }
        }

        tracing::warn!(
            raw_len = raw.len(),
            "All recovery tiers failed, using synthetic fallback"
        );
        RecoveryReport {
            response: synthetic_fallback(),
            tier: RecoveryTier::SyntheticFallback,
            attempts,
        }
    }

    fn finish(&self, response: StoryResponse, scene_hint: &str) -> StoryResponse {
        let mut response = response.normalized();
        if response.image_prompt.is_none() {
            let scene = format!("{}{scene_hint}", response.story);
            response.image_prompt = Some(synthesize(&scene, &self.character));
        }
        response
    }
}

/// Recovers a turn with an anonymous protagonist.
pub fn recover(raw: &str) -> StoryResponse {
    ResponseRecoveryPipeline::default().recover(raw)
}

/// The fixed turn returned when nothing else could be recovered.
pub fn synthetic_fallback() -> StoryResponse {
    StoryResponse {
        story: FALLBACK_STORY.to_string(),
        choices: FALLBACK_CHOICES.iter().map(|c| c.to_string()).collect(),
        is_ending: false,
        ending_type: None,
        image_prompt: Some(FALLBACK_IMAGE_PROMPT.to_string()),
    }
}

fn parse_json(candidate: &str) -> TierOutcome {
    serde_json::from_str(candidate)
        .map_err(|e| TierFailure::InvalidJson(e.to_string()))
        .and_then(coerce::response_from_value)
        .into()
}

fn direct_parse(stripped: &str) -> TierOutcome {
    parse_json(stripped)
}

fn structural_parse(cleaned: Option<&str>) -> TierOutcome {
    match cleaned {
        Some(candidate) => parse_json(candidate),
        None => TierOutcome::Failure(TierFailure::NoObjectFound),
    }
}

fn field_extraction(cleaned: Option<&str>, stripped: &str) -> TierOutcome {
    cleaned
        .and_then(|candidate| extract::extract_fields(candidate).ok())
        .map_or_else(|| extract::extract_fields(stripped), Ok)
        .into()
}
