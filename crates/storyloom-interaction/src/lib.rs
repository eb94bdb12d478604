//! Generative backends for Storyloom.

pub mod gemini_story_engine;
pub mod prompts;

pub use gemini_story_engine::{DEFAULT_GEMINI_MODEL, GeminiStoryEngine};
pub use prompts::PromptRenderer;
