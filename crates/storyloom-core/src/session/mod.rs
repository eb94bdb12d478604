//! Session domain module.
//!
//! # Module Structure
//!
//! - `model`: Persisted session record (`SessionRecord`, `Progress`)
//! - `normalize`: Write-time normalization of records
//! - `repository`: Repository trait for session persistence

mod model;
mod normalize;
mod repository;

pub use model::{Progress, SessionRecord};
pub use normalize::normalize_record;
pub use repository::SessionRepository;
