//! The per-turn pipeline: relevance -> fetch -> format -> budget, with the
//! guided engine contributing step instructions to the prompt base and
//! consuming save tags from the reply.
//!
//! Every turn is processed once, end to end; there is no background work and
//! no process-wide mutable state. All tuning (priorities, truncation, tier
//! ceilings) is fixed configuration owned by the caller.

use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

use crate::context::budget::{self, AssembledPrompt, BudgetTier, TierCeilings};
use crate::context::fetcher::ContextFetcher;
use crate::context::format::format_all;
use crate::context::relevance::relevant_categories;
use crate::context::ContextCategory;
use crate::guided::engine::{GuidedEngine, ReplyOutcome};
use crate::guided::{GuidedSession, SessionStatus};
use crate::store::DataStore;

/// One incoming user message plus its surrounding situation.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub message: String,
    /// Identifier of the page the user is on (e.g. "crowsnest").
    pub page: String,
    /// The guided session this conversation is attached to, if any.
    pub session_id: Option<String>,
    pub tier: BudgetTier,
}

/// The assembled prompt for one turn, ready for the LLM provider.
#[derive(Debug)]
pub struct AssembledTurn {
    pub prompt: AssembledPrompt,
    pub relevant: Vec<ContextCategory>,
    /// Loaded session state, when the turn belongs to a guided conversation.
    pub session: Option<GuidedSession>,
}

pub struct ContextAssembler {
    store: Arc<dyn DataStore>,
    fetcher: ContextFetcher,
    engine: GuidedEngine,
    persona: String,
    ceilings: TierCeilings,
}

impl ContextAssembler {
    pub fn new(
        store: Arc<dyn DataStore>,
        persona: String,
        ceilings: TierCeilings,
        read_timeout: Duration,
        rim_interval_days: i64,
    ) -> Self {
        Self {
            fetcher: ContextFetcher::new(store.clone(), read_timeout),
            engine: GuidedEngine::with_rim_interval(store.clone(), rim_interval_days),
            store,
            persona,
            ceilings,
        }
    }

    pub fn engine(&self) -> &GuidedEngine {
        &self.engine
    }

    /// Build the prompt for one user message.
    ///
    /// A session that fails to load degrades to an unguided turn; missing
    /// context degrades to fewer sections. Nothing here aborts the turn.
    pub async fn assemble_turn(&self, request: &TurnRequest) -> Result<AssembledTurn> {
        let session = match &request.session_id {
            Some(id) => match self.store.read_session(id).await {
                Ok(session) => session,
                Err(e) => {
                    tracing::warn!("Failed to load session {}, proceeding unguided: {}", id, e);
                    None
                }
            },
            None => None,
        };

        let active_mode = session
            .as_ref()
            .filter(|s| {
                !matches!(
                    s.status,
                    SessionStatus::Archived | SessionStatus::NotStarted
                )
            })
            .map(|s| s.mode);

        let relevant = relevant_categories(&request.message, &request.page, active_mode);
        tracing::debug!(
            "Turn on page '{}' needs {} categories",
            request.page,
            relevant.len()
        );

        let fetched = self.fetcher.fetch_all(&relevant, Utc::now()).await;
        let sections = format_all(&relevant, &fetched);

        let base = self.base_text(session.as_ref());
        let prompt = budget::assemble(&base, &sections, self.ceilings.ceiling(request.tier));

        for category in &prompt.skipped {
            tracing::debug!(
                "Budget skipped section {} ({} tokens used)",
                category.as_db_str(),
                prompt.used_tokens
            );
        }

        Ok(AssembledTurn {
            prompt,
            relevant,
            session,
        })
    }

    /// Persona plus, when a session is active, the current step instructions.
    /// Always included in full; never trimmed by the budget.
    fn base_text(&self, session: Option<&GuidedSession>) -> String {
        let mut base = self.persona.clone();
        if let Some(session) = session {
            if let Some(instructions) = self.engine.step_instructions(session) {
                base.push_str("\n\n");
                base.push_str(&instructions);
            }
        }
        base
    }

    /// Feed the assistant's reply back through the guided engine.
    pub async fn ingest_reply(
        &self,
        session: &mut GuidedSession,
        reply: &str,
    ) -> Result<ReplyOutcome> {
        self.engine.apply_reply(session, reply).await
    }
}
