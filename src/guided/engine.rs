//! The guided-mode engine: session lifecycle, per-step persistence, and
//! save-tag application.
//!
//! State machine per session:
//! `NotStarted -> StepActive(i) -> AwaitingConfirmation(i) -> Saved(i) ->
//! StepActive(i+1) | Completed`. Any active state may pause and later resume
//! at the same step with all saved steps intact. `Completed` or `Paused`
//! move to `Archived` only via explicit user action.
//!
//! A save tag whose payload fails to parse, or whose persistence write
//! fails, leaves the session in `AwaitingConfirmation`: nothing is marked
//! saved and the user is re-prompted. Commits are per step, never
//! all-or-nothing across a session.

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use std::sync::Arc;

use crate::guided::wheel::{self, DEFAULT_RIM_INTERVAL_DAYS};
use crate::guided::{GuidedMode, GuidedSession, SessionStatus, StepSpec};
use crate::save_tags::{scan_reply, ParsedTag, SaveTagKind};
use crate::store::DataStore;

/// Why a step failed to save. Both outcomes are recoverable: the session
/// stays in `AwaitingConfirmation` and the user is asked again.
#[derive(Debug, Clone)]
pub enum SaveFailure {
    /// The tag's payload did not parse or validate.
    Parse { tag: String, message: String },
    /// The store rejected the write.
    Persist { step_key: String, message: String },
}

/// What applying one assistant reply did to a session.
#[derive(Debug, Clone, Default)]
pub struct ReplyOutcome {
    /// Step keys saved by this reply, in order of application.
    pub saved_steps: Vec<String>,
    pub failures: Vec<SaveFailure>,
    /// The session reached `Completed` during this reply.
    pub completed: bool,
    /// A rim check-in was recorded (change process only).
    pub checkin_recorded: bool,
}

impl ReplyOutcome {
    pub fn needs_reprompt(&self) -> bool {
        !self.failures.is_empty()
    }
}

pub struct GuidedEngine {
    store: Arc<dyn DataStore>,
    rim_interval_days: i64,
}

impl GuidedEngine {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self::with_rim_interval(store, DEFAULT_RIM_INTERVAL_DAYS)
    }

    pub fn with_rim_interval(store: Arc<dyn DataStore>, rim_interval_days: i64) -> Self {
        Self {
            store,
            rim_interval_days,
        }
    }

    /// Create and persist a new session with its first step active.
    pub async fn start(
        &self,
        mode: GuidedMode,
        reference_id: Option<String>,
    ) -> Result<GuidedSession> {
        let mut session = GuidedSession::new(mode, reference_id);
        session.status = SessionStatus::Active;
        self.store
            .write_session(&session)
            .await
            .context("Failed to persist new guided session")?;
        tracing::info!("Started {} session {}", mode.as_db_str(), session.id);
        Ok(session)
    }

    /// The instruction block injected into the prompt base for this session,
    /// or `None` when the session has nothing to instruct (paused, archived,
    /// or completed with no open rim). A paused session must not instruct
    /// the assistant to emit save tags, since replies to it are ignored.
    pub fn step_instructions(&self, session: &GuidedSession) -> Option<String> {
        match session.status {
            SessionStatus::Archived | SessionStatus::Paused => None,
            SessionStatus::Completed => self.rim_instructions(session),
            _ => {
                let spec = session.current_step_spec()?;
                Some(render_step_block(session, spec))
            }
        }
    }

    fn rim_instructions(&self, session: &GuidedSession) -> Option<String> {
        let wheel = session.wheel.as_ref()?;
        if !wheel.rim_open(session.all_steps_filled()) {
            return None;
        }
        let mut block = format!(
            "You are running check-in number {} of the user's change process. \
             Revisit their commitment, ask what happened since last time, and \
             help them decide what to adjust.",
            wheel.rim_count + 1
        );
        if let Some(next) = wheel.next_rim_date {
            block.push_str(&format!(" This check-in was scheduled for {}.", next));
        }
        block.push_str(&format!(
            "\nWhen the user has reflected, {}.",
            SaveTagKind::RimCheckinSave.directive()
        ));
        Some(block)
    }

    /// Scan an assistant reply for save tags and apply them to the session.
    ///
    /// The session's persisted state is updated step by step; any failure
    /// leaves the session awaiting confirmation of the unsaved step.
    pub async fn apply_reply(
        &self,
        session: &mut GuidedSession,
        reply: &str,
    ) -> Result<ReplyOutcome> {
        let mut outcome = ReplyOutcome::default();

        if matches!(
            session.status,
            SessionStatus::Archived | SessionStatus::Paused
        ) {
            return Ok(outcome);
        }

        let scan = scan_reply(reply);

        for failure in &scan.failures {
            if self.tag_concerns_session(session, failure.kind) {
                outcome.failures.push(SaveFailure::Parse {
                    tag: failure.kind.tag_name(),
                    message: failure.error.clone(),
                });
            }
        }

        for tag in &scan.tags {
            self.apply_tag(session, tag, &mut outcome).await;
        }

        // No confirmed step content this reply: the current step is waiting
        // on the user.
        if session.status == SessionStatus::Active
            && outcome.saved_steps.is_empty()
            && !outcome.completed
        {
            session.status = SessionStatus::AwaitingConfirmation;
        }

        session.updated_at = Utc::now();
        self.store
            .write_session(session)
            .await
            .context("Failed to persist session state")?;

        Ok(outcome)
    }

    async fn apply_tag(
        &self,
        session: &mut GuidedSession,
        tag: &ParsedTag,
        outcome: &mut ReplyOutcome,
    ) {
        // Rim check-ins are a sub-process, not a step.
        if tag.kind == SaveTagKind::RimCheckinSave {
            self.apply_rim_checkin(session, tag, outcome).await;
            return;
        }

        let Some(target) = self.resolve_target_step(session, tag.kind) else {
            tracing::debug!(
                "Ignoring tag {} not applicable to session {} at step {}",
                tag.kind.tag_name(),
                session.id,
                session.current_step
            );
            return;
        };

        let step = &session.mode.steps()[target];
        if let Err(e) = self
            .store
            .write_step_data(&session.id, step.key, &tag.payload)
            .await
        {
            tracing::warn!(
                "Step write for {}/{} failed: {}",
                session.id,
                step.key,
                e
            );
            outcome.failures.push(SaveFailure::Persist {
                step_key: step.key.to_string(),
                message: e.to_string(),
            });
            // A failed re-save of an earlier step must not regress a
            // terminal state; only the current step blocks on confirmation.
            if target == session.current_step {
                session.status = SessionStatus::AwaitingConfirmation;
            }
            return;
        }

        session
            .step_data
            .insert(step.key.to_string(), tag.payload.clone());
        outcome.saved_steps.push(step.key.to_string());

        // Re-saving an earlier step never moves the cursor.
        if target == session.current_step {
            session.current_step += 1;
            if session.current_step >= session.mode.steps().len() {
                session.status = SessionStatus::Completed;
                outcome.completed = true;
                tracing::info!("Session {} completed", session.id);
            } else {
                session.status = SessionStatus::Active;
            }
        }
    }

    async fn apply_rim_checkin(
        &self,
        session: &mut GuidedSession,
        tag: &ParsedTag,
        outcome: &mut ReplyOutcome,
    ) {
        let all_filled = session.all_steps_filled();
        let Some(wheel) = session.wheel.as_ref() else {
            tracing::debug!("Ignoring rim check-in outside a change process");
            return;
        };
        if !wheel.rim_open(all_filled) {
            tracing::debug!(
                "Ignoring rim check-in for session {}: rim not open",
                session.id
            );
            return;
        }

        let checkin_date = tag
            .payload
            .get("date")
            .and_then(|v| v.as_str())
            .and_then(|raw| raw.parse::<NaiveDate>().ok())
            .unwrap_or_else(|| Utc::now().date_naive());

        let step_key = format!("rim_{}", wheel.rim_count + 1);
        if let Err(e) = self
            .store
            .write_step_data(&session.id, &step_key, &tag.payload)
            .await
        {
            outcome.failures.push(SaveFailure::Persist {
                step_key,
                message: e.to_string(),
            });
            return;
        }

        session
            .step_data
            .insert(step_key.clone(), tag.payload.clone());
        if let Some(wheel) = session.wheel.as_mut() {
            wheel.record_checkin(checkin_date, self.rim_interval_days);
        }
        outcome.saved_steps.push(step_key);
        outcome.checkin_recorded = true;
    }

    /// Which step index a tag applies to, if any.
    ///
    /// The current step always accepts its own expected tag. Spoke tags
    /// carry their own index and may re-save an earlier spoke; other modes
    /// that allow revisiting accept a tag matching an earlier step's kind.
    /// Steps ahead of the cursor are never writable: the index only moves
    /// forward.
    fn resolve_target_step(&self, session: &GuidedSession, kind: SaveTagKind) -> Option<usize> {
        let steps = session.mode.steps();

        if let SaveTagKind::SpokeSave(n) = kind {
            if session.mode != GuidedMode::ChangeProcess {
                return None;
            }
            let idx = usize::from(n) - 1;
            return if idx <= session.current_step {
                Some(idx)
            } else {
                None
            };
        }

        if let Some(spec) = steps.get(session.current_step) {
            if spec.expected_tag == Some(kind) {
                return Some(session.current_step);
            }
        }

        if session.mode.allows_revisit() {
            return steps
                .iter()
                .position(|s| s.expected_tag == Some(kind))
                .filter(|idx| *idx < session.current_step);
        }

        None
    }

    fn tag_concerns_session(&self, session: &GuidedSession, kind: SaveTagKind) -> bool {
        if kind == SaveTagKind::RimCheckinSave {
            return session.mode == GuidedMode::ChangeProcess;
        }
        self.resolve_target_step(session, kind).is_some()
    }

    /// User leaves mid-session. All saved steps stay intact.
    pub async fn pause(&self, session: &mut GuidedSession) -> Result<()> {
        match session.status {
            SessionStatus::Active | SessionStatus::AwaitingConfirmation => {
                session.status = SessionStatus::Paused;
                session.updated_at = Utc::now();
                self.store.write_session(session).await
            }
            _ => Ok(()),
        }
    }

    /// Resume at the same step the session paused on.
    pub async fn resume(&self, session: &mut GuidedSession) -> Result<()> {
        if session.status != SessionStatus::Paused {
            bail!(
                "Cannot resume a session in state {}",
                session.status.as_db_str()
            );
        }
        session.status = SessionStatus::Active;
        session.updated_at = Utc::now();
        self.store.write_session(session).await
    }

    /// Explicit user promotion past "ready": opens the rim sub-process.
    pub async fn promote_ready(&self, session: &mut GuidedSession) -> Result<()> {
        if !session.all_steps_filled() {
            bail!("Cannot promote: not all six spokes are filled");
        }
        let Some(wheel) = session.wheel.as_mut() else {
            bail!("Only change-process sessions can be promoted");
        };
        wheel.ready = true;
        if wheel.next_rim_date.is_none() {
            wheel.next_rim_date = Some(wheel::next_rim_date(
                Utc::now().date_naive(),
                self.rim_interval_days,
            ));
        }
        session.updated_at = Utc::now();
        self.store.write_session(session).await
    }

    /// Explicit user action only. Sessions are never deleted.
    pub async fn archive(&self, session: &mut GuidedSession) -> Result<()> {
        session.status = SessionStatus::Archived;
        session.updated_at = Utc::now();
        self.store.write_session(session).await
    }
}

fn render_step_block(session: &GuidedSession, spec: &StepSpec) -> String {
    let steps = session.mode.steps();
    let mut block = format!(
        "You are guiding the user through {} (step {} of {}: {}).\n{}",
        session.mode.label(),
        session.current_step + 1,
        steps.len(),
        spec.title,
        spec.instruction
    );
    if let Some(tag) = spec.expected_tag {
        block.push_str(&format!(
            "\nWhen the user confirms this step's content, {}.",
            tag.directive()
        ));
    }
    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextCategory;
    use crate::store::{ContextRecord, FetchFilter, SqliteStore};
    use serde_json::json;

    fn engine() -> (GuidedEngine, Arc<SqliteStore>) {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        (GuidedEngine::new(store.clone()), store)
    }

    fn spoke_reply(n: usize) -> String {
        format!(
            "Saving that now.\nSPOKE_{}_SAVE:{{\"title\": \"spoke {}\", \"detail\": \"detail {}\"}}",
            n, n, n
        )
    }

    #[tokio::test]
    async fn session_advances_one_step_per_confirmed_save() {
        let (engine, _store) = engine();
        let mut session = engine
            .start(GuidedMode::ChangeProcess, None)
            .await
            .unwrap();

        let outcome = engine
            .apply_reply(&mut session, &spoke_reply(1))
            .await
            .unwrap();
        assert_eq!(outcome.saved_steps, vec!["spoke_1".to_string()]);
        assert_eq!(session.current_step, 1);
        assert_eq!(session.status, SessionStatus::Active);
    }

    #[tokio::test]
    async fn reply_without_tags_moves_to_awaiting_confirmation() {
        let (engine, _store) = engine();
        let mut session = engine.start(GuidedMode::Declaration, None).await.unwrap();

        let outcome = engine
            .apply_reply(&mut session, "Tell me more about that.")
            .await
            .unwrap();
        assert!(outcome.saved_steps.is_empty());
        assert_eq!(session.status, SessionStatus::AwaitingConfirmation);
    }

    #[tokio::test]
    async fn malformed_spoke_tag_leaves_session_awaiting_with_no_payload() {
        let (engine, store) = engine();
        let mut session = engine
            .start(GuidedMode::ChangeProcess, None)
            .await
            .unwrap();

        let outcome = engine
            .apply_reply(&mut session, "SPOKE_1_SAVE:{not json}")
            .await
            .unwrap();
        assert!(outcome.needs_reprompt());
        assert!(matches!(outcome.failures[0], SaveFailure::Parse { .. }));
        assert_eq!(session.current_step, 0);
        assert_eq!(session.status, SessionStatus::AwaitingConfirmation);

        let loaded = store.read_session(&session.id).await.unwrap().unwrap();
        assert!(loaded.step_data.is_empty());
    }

    #[tokio::test]
    async fn pause_resume_round_trip_preserves_saved_steps() {
        let (engine, store) = engine();
        let mut session = engine
            .start(GuidedMode::ChangeProcess, None)
            .await
            .unwrap();

        for n in 1..=3 {
            engine
                .apply_reply(&mut session, &spoke_reply(n))
                .await
                .unwrap();
        }
        engine.pause(&mut session).await.unwrap();

        let mut resumed = store.read_session(&session.id).await.unwrap().unwrap();
        assert_eq!(resumed.status, SessionStatus::Paused);
        engine.resume(&mut resumed).await.unwrap();

        assert_eq!(resumed.current_step, 3);
        for n in 1..=3 {
            assert!(resumed.step_data.contains_key(&format!("spoke_{}", n)));
        }
        assert_eq!(resumed.status, SessionStatus::Active);
    }

    #[tokio::test]
    async fn paused_session_contributes_no_step_instructions() {
        let (engine, _store) = engine();
        let mut session = engine
            .start(GuidedMode::ChangeProcess, None)
            .await
            .unwrap();
        assert!(engine.step_instructions(&session).is_some());

        engine.pause(&mut session).await.unwrap();
        assert!(engine.step_instructions(&session).is_none());

        // A stray tag while paused is dropped, so the prompt must not
        // have asked for one.
        let outcome = engine
            .apply_reply(&mut session, &spoke_reply(1))
            .await
            .unwrap();
        assert!(outcome.saved_steps.is_empty());
        assert!(outcome.failures.is_empty());

        engine.resume(&mut session).await.unwrap();
        assert!(engine.step_instructions(&session).is_some());
    }

    #[tokio::test]
    async fn paused_session_ignores_replies() {
        let (engine, _store) = engine();
        let mut session = engine
            .start(GuidedMode::ChangeProcess, None)
            .await
            .unwrap();
        engine.pause(&mut session).await.unwrap();

        let outcome = engine
            .apply_reply(&mut session, &spoke_reply(1))
            .await
            .unwrap();
        assert!(outcome.saved_steps.is_empty());
        assert_eq!(session.status, SessionStatus::Paused);
    }

    #[tokio::test]
    async fn completing_all_spokes_does_not_open_the_rim_without_promotion() {
        let (engine, _store) = engine();
        let mut session = engine
            .start(GuidedMode::ChangeProcess, None)
            .await
            .unwrap();

        for n in 1..=6 {
            engine
                .apply_reply(&mut session, &spoke_reply(n))
                .await
                .unwrap();
        }
        assert_eq!(session.status, SessionStatus::Completed);
        assert!(engine.step_instructions(&session).is_none());

        // A check-in before promotion is ignored.
        let outcome = engine
            .apply_reply(
                &mut session,
                "RIM_CHECKIN_SAVE:{\"reflection\": \"early\"}",
            )
            .await
            .unwrap();
        assert!(!outcome.checkin_recorded);
        assert_eq!(session.wheel.as_ref().unwrap().rim_count, 0);
    }

    #[tokio::test]
    async fn promoted_wheel_records_checkins_and_schedules_the_next() {
        let (engine, _store) = engine();
        let mut session = engine
            .start(GuidedMode::ChangeProcess, None)
            .await
            .unwrap();
        for n in 1..=6 {
            engine
                .apply_reply(&mut session, &spoke_reply(n))
                .await
                .unwrap();
        }
        engine.promote_ready(&mut session).await.unwrap();
        assert!(engine.step_instructions(&session).is_some());

        let outcome = engine
            .apply_reply(
                &mut session,
                "RIM_CHECKIN_SAVE:{\"reflection\": \"kept at it\", \"date\": \"2024-01-01\"}",
            )
            .await
            .unwrap();
        assert!(outcome.checkin_recorded);

        let wheel = session.wheel.as_ref().unwrap();
        assert_eq!(wheel.rim_count, 1);
        assert_eq!(
            wheel.next_rim_date,
            NaiveDate::from_ymd_opt(2024, 1, 15)
        );
    }

    #[tokio::test]
    async fn earlier_spoke_can_be_resaved_without_moving_the_cursor() {
        let (engine, _store) = engine();
        let mut session = engine
            .start(GuidedMode::ChangeProcess, None)
            .await
            .unwrap();
        for n in 1..=3 {
            engine
                .apply_reply(&mut session, &spoke_reply(n))
                .await
                .unwrap();
        }

        let outcome = engine
            .apply_reply(
                &mut session,
                "SPOKE_2_SAVE:{\"title\": \"revised\", \"detail\": \"sharper\"}",
            )
            .await
            .unwrap();
        assert_eq!(outcome.saved_steps, vec!["spoke_2".to_string()]);
        assert_eq!(session.current_step, 3);
        assert_eq!(session.step_data["spoke_2"]["title"], "revised");
    }

    #[tokio::test]
    async fn future_spoke_tags_are_ignored() {
        let (engine, _store) = engine();
        let mut session = engine
            .start(GuidedMode::ChangeProcess, None)
            .await
            .unwrap();

        let outcome = engine
            .apply_reply(&mut session, &spoke_reply(5))
            .await
            .unwrap();
        assert!(outcome.saved_steps.is_empty());
        assert_eq!(session.current_step, 0);
    }

    #[tokio::test]
    async fn persist_failure_keeps_step_unsaved() {
        struct FailingStore(SqliteStore);

        #[async_trait::async_trait]
        impl DataStore for FailingStore {
            async fn fetch_many(
                &self,
                category: ContextCategory,
                filter: &FetchFilter,
            ) -> anyhow::Result<Vec<ContextRecord>> {
                self.0.fetch_many(category, filter).await
            }
            async fn write_step_data(
                &self,
                _: &str,
                _: &str,
                _: &serde_json::Value,
            ) -> anyhow::Result<()> {
                anyhow::bail!("disk full")
            }
            async fn read_session(
                &self,
                session_id: &str,
            ) -> anyhow::Result<Option<GuidedSession>> {
                self.0.read_session(session_id).await
            }
            async fn write_session(&self, session: &GuidedSession) -> anyhow::Result<()> {
                self.0.write_session(session).await
            }
        }

        let store = Arc::new(FailingStore(SqliteStore::open_in_memory().unwrap()));
        let engine = GuidedEngine::new(store);
        let mut session = engine
            .start(GuidedMode::ChangeProcess, None)
            .await
            .unwrap();

        let outcome = engine
            .apply_reply(&mut session, &spoke_reply(1))
            .await
            .unwrap();
        assert!(matches!(outcome.failures[0], SaveFailure::Persist { .. }));
        assert_eq!(session.current_step, 0);
        assert!(session.step_data.is_empty());
        assert_eq!(session.status, SessionStatus::AwaitingConfirmation);
    }

    #[tokio::test]
    async fn failed_resave_of_an_earlier_spoke_keeps_the_session_completed() {
        use std::sync::atomic::{AtomicBool, Ordering};

        struct FlakyStore {
            inner: SqliteStore,
            fail_writes: AtomicBool,
        }

        #[async_trait::async_trait]
        impl DataStore for FlakyStore {
            async fn fetch_many(
                &self,
                category: ContextCategory,
                filter: &FetchFilter,
            ) -> anyhow::Result<Vec<ContextRecord>> {
                self.inner.fetch_many(category, filter).await
            }
            async fn write_step_data(
                &self,
                session_id: &str,
                step_key: &str,
                payload: &serde_json::Value,
            ) -> anyhow::Result<()> {
                if self.fail_writes.load(Ordering::SeqCst) {
                    anyhow::bail!("disk full");
                }
                self.inner.write_step_data(session_id, step_key, payload).await
            }
            async fn read_session(
                &self,
                session_id: &str,
            ) -> anyhow::Result<Option<GuidedSession>> {
                self.inner.read_session(session_id).await
            }
            async fn write_session(&self, session: &GuidedSession) -> anyhow::Result<()> {
                self.inner.write_session(session).await
            }
        }

        let store = Arc::new(FlakyStore {
            inner: SqliteStore::open_in_memory().unwrap(),
            fail_writes: AtomicBool::new(false),
        });
        let engine = GuidedEngine::new(store.clone());
        let mut session = engine
            .start(GuidedMode::ChangeProcess, None)
            .await
            .unwrap();
        for n in 1..=6 {
            engine
                .apply_reply(&mut session, &spoke_reply(n))
                .await
                .unwrap();
        }
        assert_eq!(session.status, SessionStatus::Completed);

        store.fail_writes.store(true, Ordering::SeqCst);
        let outcome = engine
            .apply_reply(
                &mut session,
                "SPOKE_2_SAVE:{\"title\": \"revised\", \"detail\": \"sharper\"}",
            )
            .await
            .unwrap();
        assert!(matches!(outcome.failures[0], SaveFailure::Persist { .. }));
        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(session.step_data["spoke_2"]["title"], "spoke 2");
    }

    #[tokio::test]
    async fn processing_mode_persists_nothing() {
        let (engine, store) = engine();
        let mut session = engine.start(GuidedMode::Processing, None).await.unwrap();

        let outcome = engine
            .apply_reply(
                &mut session,
                "I'm here with you.\nINSIGHT_SAVE:{\"insight\": \"should be ignored\"}",
            )
            .await
            .unwrap();
        assert!(outcome.saved_steps.is_empty());

        let loaded = store.read_session(&session.id).await.unwrap().unwrap();
        assert!(loaded.step_data.is_empty());
    }

    #[tokio::test]
    async fn archive_is_explicit_and_terminal_for_instructions() {
        let (engine, _store) = engine();
        let mut session = engine.start(GuidedMode::Declaration, None).await.unwrap();
        engine.archive(&mut session).await.unwrap();
        assert_eq!(session.status, SessionStatus::Archived);
        assert!(engine.step_instructions(&session).is_none());
    }

    #[tokio::test]
    async fn step_instructions_name_the_current_step() {
        let (engine, _store) = engine();
        let session = engine
            .start(GuidedMode::ChangeProcess, None)
            .await
            .unwrap();

        let block = engine.step_instructions(&session).unwrap();
        assert!(block.contains("step 1 of 6"));
        assert!(block.contains("Name the change"));
        assert!(block.contains("SPOKE_1_SAVE"));
    }

    #[tokio::test]
    async fn multiple_tags_in_one_reply_apply_in_order() {
        let (engine, _store) = engine();
        let mut session = engine
            .start(GuidedMode::ChangeProcess, None)
            .await
            .unwrap();

        let reply = format!("{}\n{}", spoke_reply(1), spoke_reply(2));
        let outcome = engine.apply_reply(&mut session, &reply).await.unwrap();
        assert_eq!(
            outcome.saved_steps,
            vec!["spoke_1".to_string(), "spoke_2".to_string()]
        );
        assert_eq!(session.current_step, 2);
    }

    #[test]
    fn json_payload_is_preserved_verbatim() {
        let scan = crate::save_tags::scan_reply(
            "SPOKE_1_SAVE:{\"title\": \"t\", \"detail\": \"d\", \"extra\": 7}",
        );
        assert_eq!(scan.tags[0].payload, json!({"title": "t", "detail": "d", "extra": 7}));
    }
}
