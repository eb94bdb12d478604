//! Story domain module.
//!
//! # Module Structure
//!
//! - `model`: Narrative turns and the recovered `StoryResponse`
//! - `customization`: Pre-story questions and derived `CharacterDetails`

mod customization;
mod model;

pub use customization::{
    CharacterDetails, CustomizationAnswers, CustomizationQuestion, QuestionKind,
    character_profile, fallback_questions, parse_customization_questions,
};
pub use model::{MAX_CHOICES, NarrativeTurn, StoryResponse, TurnRole};

pub(crate) use model::non_blank;
