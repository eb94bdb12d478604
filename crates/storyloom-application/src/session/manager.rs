//! Session continuation state machine.

use super::autosave::Autosaver;
use super::discovery::{ExistingSession, classify, resettable_ids, select_resumable};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use storyloom_core::config::SessionSettings;
use storyloom_core::engine::{ContinuationRequest, EndingRequest, OpeningRequest, StoryEngine};
use storyloom_core::error::{Result, StoryError};
use storyloom_core::recovery::ResponseRecoveryPipeline;
use storyloom_core::scene::synthesize;
use storyloom_core::session::{SessionRecord, SessionRepository};
use storyloom_core::story::{
    CustomizationAnswers, CustomizationQuestion, StoryResponse, TurnRole,
    parse_customization_questions,
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Appended to the story when the choice budget runs out.
pub const FORCED_CONCLUSION_SUFFIX: &str =
    "\n\n[The adventure concludes here, but your story continues in memory...]";
const FORCED_ENDING_TYPE: &str = "conclusion";
const NATURAL_ENDING_TYPE: &str = "natural";

/// Lifecycle state of a [`SessionContinuationManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NoSession,
    CheckingExisting,
    /// A resumable record was found; waiting for [`ContinuationDecision`]
    PromptingUser,
    /// Ready for customization and the opening scene
    Initializing,
    Active,
    /// Active with an autosave pending or in flight
    AutoSaving,
    Completed,
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NoSession => "no_session",
            Self::CheckingExisting => "checking_existing",
            Self::PromptingUser => "prompting_user",
            Self::Initializing => "initializing",
            Self::Active => "active",
            Self::AutoSaving => "auto_saving",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// The player's answer to the resume prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContinuationDecision {
    Resume,
    Reset,
}

/// The player's choice once a story is complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionChoice {
    DeleteSession,
    KeepAndExit,
}

/// Result of a submitted turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The story goes on; the response carries the next choices
    Continued(StoryResponse),
    /// The story ended with this turn
    Ended(StoryResponse),
}

impl TurnOutcome {
    pub fn response(&self) -> &StoryResponse {
        match self {
            Self::Continued(response) | Self::Ended(response) => response,
        }
    }

    pub fn is_ending(&self) -> bool {
        matches!(self, Self::Ended(_))
    }
}

/// Marks whether the owning session is still on screen.
///
/// Clones share one flag. After [`deactivate`](Self::deactivate) results of
/// in-flight requests are discarded instead of applied.
#[derive(Debug, Clone, Default)]
pub struct ActivityHandle {
    token: CancellationToken,
}

impl ActivityHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deactivate(&self) {
        self.token.cancel();
    }

    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
    }
}

/// Drives one playthrough of one story for one user.
///
/// The manager owns the active [`SessionRecord`] exclusively. Every completed
/// turn hands a snapshot to the session's [`Autosaver`]; the store only ever
/// receives normalized copies.
///
/// # State machine
///
/// ```text
/// NoSession -> CheckingExisting -> PromptingUser -> Active | Initializing
///                               \-> Initializing -> Active -> Completed
/// any request failure at start or resume -> Failed -> Initializing (retry)
/// ```
///
/// Must be created inside a tokio runtime.
pub struct SessionContinuationManager {
    user_id: String,
    story_title: String,
    story_description: String,
    engine: Arc<dyn StoryEngine>,
    repository: Arc<dyn SessionRepository>,
    settings: SessionSettings,
    autosaver: Autosaver,
    activity: ActivityHandle,
    state: SessionState,
    candidate: Option<SessionRecord>,
    /// Session whose resume failed; discarded by `retry_as_new_story`
    failed_session_id: Option<String>,
    record: Option<SessionRecord>,
    questions: Vec<CustomizationQuestion>,
    answers: CustomizationAnswers,
    current: Option<StoryResponse>,
    last_error: Option<StoryError>,
}

impl SessionContinuationManager {
    pub fn new(
        user_id: impl Into<String>,
        story_title: impl Into<String>,
        story_description: impl Into<String>,
        engine: Arc<dyn StoryEngine>,
        repository: Arc<dyn SessionRepository>,
        settings: SessionSettings,
    ) -> Self {
        let autosaver = Autosaver::spawn(Arc::clone(&repository), settings.autosave_delay());
        Self {
            user_id: user_id.into(),
            story_title: story_title.into(),
            story_description: story_description.into(),
            engine,
            repository,
            settings,
            autosaver,
            activity: ActivityHandle::new(),
            state: SessionState::NoSession,
            candidate: None,
            failed_session_id: None,
            record: None,
            questions: Vec::new(),
            answers: CustomizationAnswers::new(),
            current: None,
            last_error: None,
        }
    }

    // ============================================================================
    // Accessors
    // ============================================================================

    /// Current state. `Active` reads as `AutoSaving` while a save is pending.
    pub fn state(&self) -> SessionState {
        match self.state {
            SessionState::Active if self.autosaver.is_busy() => SessionState::AutoSaving,
            state => state,
        }
    }

    pub fn record(&self) -> Option<&SessionRecord> {
        self.record.as_ref()
    }

    /// The most recent narrator turn as recovered from the engine.
    pub fn current_response(&self) -> Option<&StoryResponse> {
        self.current.as_ref()
    }

    pub fn pending_choices(&self) -> &[String] {
        self.record
            .as_ref()
            .map(|record| record.pending_choices.as_slice())
            .unwrap_or(&[])
    }

    /// Reference to the image shown for the current scene.
    pub fn scene_image(&self) -> Option<&str> {
        self.record
            .as_ref()
            .and_then(|record| record.scene_image_ref.as_deref())
    }

    pub fn questions(&self) -> &[CustomizationQuestion] {
        &self.questions
    }

    /// Error that moved the session to `Failed`, if any.
    pub fn last_error(&self) -> Option<&StoryError> {
        self.last_error.as_ref()
    }

    /// A handle other tasks can use to mark this session as left.
    pub fn activity_handle(&self) -> ActivityHandle {
        self.activity.clone()
    }

    // ============================================================================
    // Discovery
    // ============================================================================

    /// Looks for an unfinished session of this story.
    ///
    /// Store failures are logged and treated as if nothing was found, so the
    /// player can still start a new story.
    pub async fn check_existing(&mut self) -> Result<ExistingSession> {
        self.expect_state("check for existing sessions", &[SessionState::NoSession])?;
        self.state = SessionState::CheckingExisting;

        let records = match self.repository.list_by_user(&self.user_id).await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(
                    user_id = %self.user_id,
                    error = %e,
                    "[SessionContinuationManager] Existing session check failed, starting new story"
                );
                Vec::new()
            }
        };

        let existing = classify(select_resumable(records, &self.story_title));
        match &existing {
            ExistingSession::Resumable(record) => {
                tracing::info!(
                    session_id = %record.session_id,
                    turns = record.turns.len(),
                    "[SessionContinuationManager] Found resumable session"
                );
                self.candidate = Some(record.clone());
                self.state = SessionState::PromptingUser;
            }
            ExistingSession::NoProgress(record) => {
                tracing::debug!(
                    session_id = %record.session_id,
                    "[SessionContinuationManager] Session has no progress, starting new story"
                );
                self.state = SessionState::Initializing;
            }
            ExistingSession::None => {
                self.state = SessionState::Initializing;
            }
        }

        Ok(existing)
    }

    /// Applies the player's answer to the resume prompt.
    pub async fn resolve(&mut self, decision: ContinuationDecision) -> Result<()> {
        self.expect_state("resolve the resume prompt", &[SessionState::PromptingUser])?;
        let candidate = self
            .candidate
            .take()
            .ok_or_else(|| StoryError::internal("resume prompt without a candidate"))?;

        let result = match decision {
            ContinuationDecision::Resume => self.resume(&candidate.session_id).await,
            ContinuationDecision::Reset => self.reset().await,
        };
        if result.is_err() && decision == ContinuationDecision::Resume {
            self.failed_session_id = Some(candidate.session_id);
        }
        result.inspect_err(|e| self.fail(e.clone()))
    }

    async fn resume(&mut self, session_id: &str) -> Result<()> {
        let record = self
            .repository
            .find_by_id(session_id)
            .await?
            .ok_or_else(|| StoryError::not_found("SessionRecord", session_id))?;
        record.validate(&self.user_id)?;

        self.questions = record.customization_questions.clone();
        self.answers = record.customization_answers.clone();
        self.current = None;
        self.state = if record.completed {
            SessionState::Completed
        } else {
            SessionState::Active
        };
        tracing::info!(
            session_id = %record.session_id,
            turns = record.turns.len(),
            completed = record.completed,
            "[SessionContinuationManager] Session resumed"
        );
        self.record = Some(record);
        Ok(())
    }

    async fn reset(&mut self) -> Result<()> {
        let records = self.repository.list_by_user(&self.user_id).await?;
        let ids = resettable_ids(&records, &self.story_title);
        for id in &ids {
            self.repository.delete(id).await?;
        }
        tracing::info!(
            deleted = ids.len(),
            story_title = %self.story_title,
            "[SessionContinuationManager] Existing sessions reset"
        );
        self.state = SessionState::Initializing;
        Ok(())
    }

    // ============================================================================
    // New story
    // ============================================================================

    /// Asks the engine for customization questions.
    ///
    /// Unusable answers, including engine failures, fall back to a generic
    /// question set; customization never blocks a story from starting.
    pub async fn prepare_customization(&mut self) -> Result<&[CustomizationQuestion]> {
        self.expect_state("prepare customization", &[SessionState::Initializing])?;

        let engine = Arc::clone(&self.engine);
        let raw = self
            .request(
                engine.generate_customization_questions(&self.story_title, &self.story_description),
            )
            .await;
        self.ensure_active()?;

        self.questions = match raw {
            Ok(raw) => parse_customization_questions(&raw),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "[SessionContinuationManager] Question generation failed, using fallback"
                );
                parse_customization_questions("")
            }
        };
        Ok(&self.questions)
    }

    pub fn set_customization_answers(&mut self, answers: CustomizationAnswers) -> Result<()> {
        self.expect_state("set customization answers", &[SessionState::Initializing])?;
        self.answers = answers;
        Ok(())
    }

    /// Requests the opening scene and creates the session record.
    pub async fn start_new(&mut self) -> Result<&StoryResponse> {
        self.expect_state("start a new story", &[SessionState::Initializing])?;

        let mut record = SessionRecord::new(
            Uuid::new_v4().to_string(),
            &self.user_id,
            &self.story_title,
            &self.story_description,
        );
        record.customization_questions = self.questions.clone();
        record.customization_answers = self.answers.clone();

        let request = OpeningRequest {
            title: self.story_title.clone(),
            description: self.story_description.clone(),
            character_profile: record.character_profile(),
        };
        let engine = Arc::clone(&self.engine);
        let raw = match self.request(engine.generate_opening(&request)).await {
            Ok(raw) => raw,
            Err(e) => {
                self.ensure_active()?;
                self.fail(e.clone());
                return Err(e);
            }
        };
        self.ensure_active()?;

        let response =
            ResponseRecoveryPipeline::with_character(record.character_details()).recover(&raw);
        record.push_turn(TurnRole::Narrator, response.story.as_str());
        record.story_context = response.story.clone();
        record.pending_choices = response.choices.clone();
        record.awaiting_input = !response.is_ending;
        record.completed = response.is_ending;

        tracing::info!(
            session_id = %record.session_id,
            story_title = %record.story_title,
            "[SessionContinuationManager] New story started"
        );
        self.state = if record.completed {
            SessionState::Completed
        } else {
            SessionState::Active
        };
        self.autosaver.schedule(record.clone());
        self.record = Some(record);
        Ok(self.current.insert(response))
    }

    /// Abandons a failed session and returns to `Initializing`.
    ///
    /// A stored record that failed validation on resume is deleted first.
    /// Customization is cleared, so the caller can run
    /// [`prepare_customization`](Self::prepare_customization) again before
    /// [`start_new`](Self::start_new).
    pub async fn retry_as_new_story(&mut self) -> Result<()> {
        self.expect_state("retry as a new story", &[SessionState::Failed])?;
        self.autosaver.discard().await;

        let invalid = self.last_error.as_ref().is_some_and(StoryError::is_validation);
        if let Some(session_id) = self.failed_session_id.take() {
            if invalid {
                if let Err(e) = self.repository.delete(&session_id).await {
                    self.failed_session_id = Some(session_id);
                    return Err(e);
                }
                tracing::info!(
                    session_id = %session_id,
                    "[SessionContinuationManager] Invalid session discarded"
                );
            }
        }

        self.record = None;
        self.current = None;
        self.last_error = None;
        self.questions.clear();
        self.answers.clear();
        self.state = SessionState::Initializing;
        Ok(())
    }

    /// Stores the reference of the image shown for the current scene.
    ///
    /// The reference is saved with the next autosave and restored on resume.
    pub fn set_scene_image(&mut self, reference: impl Into<String>) -> Result<()> {
        self.expect_state(
            "set the scene image",
            &[SessionState::Active, SessionState::Completed],
        )?;
        let record = self.active_record_mut()?;
        record.scene_image_ref = Some(reference.into());
        let snapshot = record.clone();
        self.autosaver.schedule(snapshot);
        Ok(())
    }

    // ============================================================================
    // Turns
    // ============================================================================

    /// Submits one of the pending choices by index.
    pub async fn submit_choice(&mut self, index: usize) -> Result<TurnOutcome> {
        self.expect_input("submit a choice")?;
        let choice = self
            .pending_choices()
            .get(index)
            .cloned()
            .ok_or_else(|| StoryError::validation(format!("no choice at index {index}")))?;
        self.submit(choice, false).await
    }

    /// Submits a free-form action typed by the player.
    pub async fn submit_text(&mut self, text: &str) -> Result<TurnOutcome> {
        self.expect_input("submit an action")?;
        let text = text.trim();
        if text.is_empty() {
            return Err(StoryError::validation("custom action is empty"));
        }
        self.submit(text.to_string(), true).await
    }

    async fn submit(&mut self, choice: String, is_custom_input: bool) -> Result<TurnOutcome> {
        let max_choice_points = self.settings.max_choice_points;
        let record = self.active_record_mut()?;
        let history = record.history();
        record.push_turn(TurnRole::UserChoice, choice.as_str());
        record.awaiting_input = false;

        let request = ContinuationRequest {
            title: record.story_title.clone(),
            story_context: record.story_context.clone(),
            choice: choice.clone(),
            history,
            is_custom_input,
            story_parts: record.turns.len(),
            choices_made: record.user_choice_count(),
            character_profile: record.character_profile(),
        };
        let character = record.character_details();

        let engine = Arc::clone(&self.engine);
        let result = self.request(engine.continue_story(&request)).await;
        let result = self.ensure_active().and(result);

        let record = self.active_record_mut()?;
        let raw = match result {
            Ok(raw) => raw,
            Err(e) => {
                record.turns.pop();
                record.awaiting_input = true;
                if matches!(e, StoryError::SessionInactive) {
                    tracing::debug!(
                        session_id = %record.session_id,
                        "[SessionContinuationManager] Discarding continuation for inactive session"
                    );
                } else {
                    tracing::warn!(
                        session_id = %record.session_id,
                        error = %e,
                        "[SessionContinuationManager] Continuation failed, choice rolled back"
                    );
                }
                return Err(e);
            }
        };

        let pipeline = ResponseRecoveryPipeline::with_character(character.clone());
        let mut response = pipeline.recover(&raw);
        if !response.is_ending && record.user_choice_count() >= max_choice_points {
            response.story.push_str(FORCED_CONCLUSION_SUFFIX);
            response.choices.clear();
            response.is_ending = true;
            response.ending_type = Some(FORCED_ENDING_TYPE.to_string());
            response.image_prompt = Some(synthesize(
                &format!("{} ending scene", response.story),
                &character,
            ));
            tracing::info!(
                session_id = %record.session_id,
                choices_made = request.choices_made,
                "[SessionContinuationManager] Choice budget reached, story concluded"
            );
        }

        record.push_turn(TurnRole::Narrator, response.story.as_str());
        record.story_context = format!(
            "{}\n\nUser chose: {}\n\n{}",
            record.story_context, choice, response.story
        );
        record.pending_choices = response.choices.clone();
        record.awaiting_input = !response.is_ending;
        record.completed = response.is_ending;

        let snapshot = record.clone();
        self.after_turn(snapshot, &response);
        self.current = Some(response.clone());

        Ok(if response.is_ending {
            TurnOutcome::Ended(response)
        } else {
            TurnOutcome::Continued(response)
        })
    }

    /// Asks the engine to conclude the story now.
    pub async fn request_ending(&mut self, reason: Option<&str>) -> Result<StoryResponse> {
        self.expect_state("request an ending", &[SessionState::Active])?;
        let record = self.active_record_mut()?;
        let request = EndingRequest {
            title: record.story_title.clone(),
            history: record.history(),
            reason: reason.map(str::to_string),
            character_profile: record.character_profile(),
        };
        let character = record.character_details();

        let engine = Arc::clone(&self.engine);
        let result = self.request(engine.generate_ending(&request)).await;
        self.ensure_active()?;
        let raw = result?;

        let mut response = ResponseRecoveryPipeline::with_character(character)
            .recover_with_scene_hint(&raw, " final scene");
        response.is_ending = true;
        response.choices.clear();
        if response.ending_type.is_none() {
            response.ending_type = Some(NATURAL_ENDING_TYPE.to_string());
        }

        let record = self.active_record_mut()?;
        record.push_turn(TurnRole::Narrator, response.story.as_str());
        record.story_context = format!("{}\n\n{}", record.story_context, response.story);
        record.pending_choices.clear();
        record.awaiting_input = false;
        record.completed = true;

        let snapshot = record.clone();
        self.after_turn(snapshot, &response);
        self.current = Some(response.clone());
        Ok(response)
    }

    fn after_turn(&mut self, snapshot: SessionRecord, response: &StoryResponse) {
        tracing::debug!(
            session_id = %snapshot.session_id,
            turns = snapshot.turns.len(),
            is_ending = response.is_ending,
            "[SessionContinuationManager] Turn applied"
        );
        if snapshot.completed {
            self.state = SessionState::Completed;
        }
        self.autosaver.schedule(snapshot);
    }

    // ============================================================================
    // Exit
    // ============================================================================

    /// Closes a completed story, optionally deleting its record.
    pub async fn finish(&mut self, choice: CompletionChoice) -> Result<()> {
        self.expect_state("finish the story", &[SessionState::Completed])?;
        match choice {
            CompletionChoice::DeleteSession => {
                self.autosaver.discard().await;
                if let Some(record) = &self.record {
                    self.repository.delete(&record.session_id).await?;
                    tracing::info!(
                        session_id = %record.session_id,
                        "[SessionContinuationManager] Completed session deleted"
                    );
                }
                self.close();
                Ok(())
            }
            CompletionChoice::KeepAndExit => self.leave().await,
        }
    }

    /// Leaves the session: flushes any pending save and deactivates it.
    ///
    /// A failed final save is returned once; the session is left regardless.
    pub async fn leave(&mut self) -> Result<()> {
        let flushed = self.autosaver.flush().await;
        if let Err(e) = &flushed {
            tracing::warn!(error = %e, "[SessionContinuationManager] Final save failed");
        }
        self.close();
        flushed
    }

    fn close(&mut self) {
        self.activity.deactivate();
        self.candidate = None;
        self.failed_session_id = None;
        self.state = SessionState::NoSession;
    }

    // ============================================================================
    // Helpers
    // ============================================================================

    async fn request<F>(&self, call: F) -> Result<String>
    where
        F: Future<Output = Result<String>>,
    {
        let limit = self.settings.request_timeout();
        tokio::time::timeout(limit, call)
            .await
            .map_err(|_| StoryError::Timeout {
                seconds: timeout_seconds(limit),
            })?
    }

    fn ensure_active(&self) -> Result<()> {
        if self.activity.is_active() {
            Ok(())
        } else {
            Err(StoryError::SessionInactive)
        }
    }

    fn expect_state(&self, operation: &'static str, allowed: &[SessionState]) -> Result<()> {
        self.ensure_active()?;
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(StoryError::invalid_state(operation, self.state()))
        }
    }

    fn expect_input(&self, operation: &'static str) -> Result<()> {
        self.expect_state(operation, &[SessionState::Active])?;
        match &self.record {
            Some(record) if record.awaiting_input => Ok(()),
            _ => Err(StoryError::invalid_state(operation, "waiting for the story engine")),
        }
    }

    fn active_record_mut(&mut self) -> Result<&mut SessionRecord> {
        self.record
            .as_mut()
            .ok_or_else(|| StoryError::internal("active session without a record"))
    }

    fn fail(&mut self, error: StoryError) {
        tracing::warn!(
            error = %error,
            story_title = %self.story_title,
            "[SessionContinuationManager] Session failed"
        );
        self.last_error = Some(error);
        self.state = SessionState::Failed;
    }
}

fn timeout_seconds(limit: Duration) -> u64 {
    limit.as_secs().max(1)
}
