//! Context categories: the fixed vocabulary of background data the assistant
//! can pull into a prompt.
//!
//! Every category carries fixed configuration: a priority rank used by the
//! budget allocator, a per-record truncation length used by the formatter,
//! and a lookback window used by the fetcher. None of these are mutated at
//! runtime.

pub mod budget;
pub mod fetcher;
pub mod format;
pub mod relevance;

use serde::{Deserialize, Serialize};

/// A named kind of contextual information eligible for inclusion in a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextCategory {
    Principles,
    SelfKnowledge,
    RecentJournal,
    Victories,
    TasksToday,
    ProgressSummary,
    DashboardSummary,
    MorningBriefing,
    EveningBriefing,
    ChangeProcess,
    LifeInventory,
    Plans,
    PartnerContext,
    PeopleContext,
    SphereOfInfluence,
    Frameworks,
    KnowledgeLibrary,
    AppGuide,
}

/// How far back a category read looks when fetching records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookback {
    /// Records from the current calendar day only.
    Today,
    /// Records from the last N days.
    Days(u32),
    /// No date bound.
    All,
}

/// Deterministic ordering applied to records inside a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionOrder {
    /// Newest first, for log-like categories.
    ChronoDescending,
    /// Grouping key first, then explicit priority, for reference categories.
    KindThenPriority,
}

impl ContextCategory {
    /// All categories in fixed descending priority order. The allocator and
    /// the relevance table both iterate in this order.
    pub const ALL: [ContextCategory; 18] = [
        ContextCategory::Principles,
        ContextCategory::SelfKnowledge,
        ContextCategory::RecentJournal,
        ContextCategory::Victories,
        ContextCategory::TasksToday,
        ContextCategory::ProgressSummary,
        ContextCategory::DashboardSummary,
        ContextCategory::MorningBriefing,
        ContextCategory::EveningBriefing,
        ContextCategory::ChangeProcess,
        ContextCategory::LifeInventory,
        ContextCategory::Plans,
        ContextCategory::PartnerContext,
        ContextCategory::PeopleContext,
        ContextCategory::SphereOfInfluence,
        ContextCategory::Frameworks,
        ContextCategory::KnowledgeLibrary,
        ContextCategory::AppGuide,
    ];

    /// Fixed priority rank; lower is admitted first by the budget allocator.
    pub fn priority_rank(self) -> usize {
        Self::ALL
            .iter()
            .position(|c| *c == self)
            .unwrap_or(Self::ALL.len())
    }

    /// Maximum rendered length of a single record, in characters. Chosen so
    /// that a handful of records cannot dominate the budget.
    pub fn max_record_chars(self) -> usize {
        match self {
            ContextCategory::Principles => 200,
            ContextCategory::SelfKnowledge => 300,
            ContextCategory::RecentJournal => 400,
            ContextCategory::Victories => 160,
            ContextCategory::TasksToday => 80,
            ContextCategory::ProgressSummary => 160,
            ContextCategory::DashboardSummary => 240,
            ContextCategory::MorningBriefing => 300,
            ContextCategory::EveningBriefing => 300,
            ContextCategory::ChangeProcess => 400,
            ContextCategory::LifeInventory => 300,
            ContextCategory::Plans => 300,
            ContextCategory::PartnerContext => 300,
            ContextCategory::PeopleContext => 240,
            ContextCategory::SphereOfInfluence => 200,
            ContextCategory::Frameworks => 500,
            ContextCategory::KnowledgeLibrary => 500,
            ContextCategory::AppGuide => 400,
        }
    }

    pub fn lookback(self) -> Lookback {
        match self {
            ContextCategory::RecentJournal => Lookback::Days(7),
            ContextCategory::Victories => Lookback::Days(30),
            ContextCategory::TasksToday => Lookback::Today,
            ContextCategory::ProgressSummary => Lookback::Days(30),
            ContextCategory::DashboardSummary => Lookback::Today,
            ContextCategory::MorningBriefing => Lookback::Today,
            ContextCategory::EveningBriefing => Lookback::Today,
            ContextCategory::PartnerContext => Lookback::Days(90),
            ContextCategory::PeopleContext => Lookback::Days(90),
            _ => Lookback::All,
        }
    }

    pub fn section_order(self) -> SectionOrder {
        match self {
            ContextCategory::RecentJournal
            | ContextCategory::Victories
            | ContextCategory::TasksToday
            | ContextCategory::ProgressSummary
            | ContextCategory::DashboardSummary
            | ContextCategory::MorningBriefing
            | ContextCategory::EveningBriefing
            | ContextCategory::ChangeProcess
            | ContextCategory::PartnerContext
            | ContextCategory::PeopleContext => SectionOrder::ChronoDescending,
            _ => SectionOrder::KindThenPriority,
        }
    }

    /// Header line for the rendered section.
    pub fn header(self) -> &'static str {
        match self {
            ContextCategory::Principles => "## Guiding Principles",
            ContextCategory::SelfKnowledge => "## Self-Knowledge",
            ContextCategory::RecentJournal => "## Recent Journal",
            ContextCategory::Victories => "## Recent Victories",
            ContextCategory::TasksToday => "## Today's Tasks",
            ContextCategory::ProgressSummary => "## Progress Summary",
            ContextCategory::DashboardSummary => "## Dashboard Snapshot",
            ContextCategory::MorningBriefing => "## Morning Briefing",
            ContextCategory::EveningBriefing => "## Evening Briefing",
            ContextCategory::ChangeProcess => "## Change Process",
            ContextCategory::LifeInventory => "## Life Inventory",
            ContextCategory::Plans => "## Plans",
            ContextCategory::PartnerContext => "## Partner Context",
            ContextCategory::PeopleContext => "## People",
            ContextCategory::SphereOfInfluence => "## Sphere of Influence",
            ContextCategory::Frameworks => "## Frameworks",
            ContextCategory::KnowledgeLibrary => "## Knowledge Library",
            ContextCategory::AppGuide => "## App Guide",
        }
    }

    pub fn as_db_str(self) -> &'static str {
        match self {
            ContextCategory::Principles => "principles",
            ContextCategory::SelfKnowledge => "self_knowledge",
            ContextCategory::RecentJournal => "recent_journal",
            ContextCategory::Victories => "victories",
            ContextCategory::TasksToday => "tasks_today",
            ContextCategory::ProgressSummary => "progress_summary",
            ContextCategory::DashboardSummary => "dashboard_summary",
            ContextCategory::MorningBriefing => "morning_briefing",
            ContextCategory::EveningBriefing => "evening_briefing",
            ContextCategory::ChangeProcess => "change_process",
            ContextCategory::LifeInventory => "life_inventory",
            ContextCategory::Plans => "plans",
            ContextCategory::PartnerContext => "partner_context",
            ContextCategory::PeopleContext => "people_context",
            ContextCategory::SphereOfInfluence => "sphere_of_influence",
            ContextCategory::Frameworks => "frameworks",
            ContextCategory::KnowledgeLibrary => "knowledge_library",
            ContextCategory::AppGuide => "app_guide",
        }
    }

    pub fn from_db(raw: &str) -> Option<Self> {
        let needle = raw.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_db_str() == needle)
    }
}
