//! Relevance classification: which context categories a turn needs.
//!
//! One static table drives one generic predicate. Forced-by-page and
//! forced-by-mode rules always win and cannot be switched off by message
//! content; keyword matching is a case-insensitive substring test where
//! false positives are accepted by design (when in doubt, fetch it).

use crate::context::ContextCategory;
use crate::guided::{GuidedMode, MeetingKind};

pub struct RelevanceRule {
    pub category: ContextCategory,
    pub forced_pages: &'static [&'static str],
    pub forced_modes: &'static [GuidedMode],
    /// Lowercase keywords matched as substrings of the lowercased message.
    pub keywords: &'static [&'static str],
}

const ALL_MEETINGS: [GuidedMode; 3] = [
    GuidedMode::Meeting(MeetingKind::Daily),
    GuidedMode::Meeting(MeetingKind::Weekly),
    GuidedMode::Meeting(MeetingKind::Monthly),
];

/// The relevance table, ordered by category priority.
pub const RELEVANCE_RULES: [RelevanceRule; 18] = [
    RelevanceRule {
        category: ContextCategory::Principles,
        forced_pages: &[],
        forced_modes: &[
            GuidedMode::Declaration,
            GuidedMode::SelfDiscovery,
            GuidedMode::ChangeProcess,
        ],
        keywords: &["principle", "values", "believe in", "integrity", "who i am"],
    },
    RelevanceRule {
        category: ContextCategory::SelfKnowledge,
        forced_pages: &[],
        forced_modes: &[
            GuidedMode::Declaration,
            GuidedMode::SelfDiscovery,
            GuidedMode::Processing,
        ],
        keywords: &[
            "stressed",
            "anxious",
            "overwhelmed",
            "afraid",
            "feel",
            "pattern",
            "trigger",
            "why do i",
        ],
    },
    RelevanceRule {
        category: ContextCategory::RecentJournal,
        forced_pages: &["journal"],
        forced_modes: &[GuidedMode::Processing],
        keywords: &["journal", "wrote", "yesterday", "lately", "this week", "recently"],
    },
    RelevanceRule {
        category: ContextCategory::Victories,
        forced_pages: &["victories"],
        forced_modes: &[],
        keywords: &["victor", "win", "accomplish", "proud", "celebrate", "went well"],
    },
    RelevanceRule {
        category: ContextCategory::TasksToday,
        forced_pages: &["tasks"],
        forced_modes: &[GuidedMode::Meeting(MeetingKind::Daily)],
        keywords: &["task", "todo", "to-do", "today", "schedule", "priorit"],
    },
    RelevanceRule {
        category: ContextCategory::ProgressSummary,
        forced_pages: &[],
        forced_modes: &[
            GuidedMode::PlanBuilding,
            GuidedMode::Meeting(MeetingKind::Weekly),
            GuidedMode::Meeting(MeetingKind::Monthly),
        ],
        keywords: &["progress", "on track", "behind", "goal", "momentum"],
    },
    RelevanceRule {
        category: ContextCategory::DashboardSummary,
        forced_pages: &["crowsnest"],
        forced_modes: &[],
        keywords: &["dashboard", "overview", "big picture", "where do i stand"],
    },
    RelevanceRule {
        category: ContextCategory::MorningBriefing,
        forced_pages: &["briefing"],
        forced_modes: &[GuidedMode::Meeting(MeetingKind::Daily)],
        keywords: &["this morning", "start my day", "start the day"],
    },
    RelevanceRule {
        category: ContextCategory::EveningBriefing,
        forced_pages: &[],
        forced_modes: &[],
        keywords: &["tonight", "this evening", "end my day", "wind down"],
    },
    RelevanceRule {
        category: ContextCategory::ChangeProcess,
        forced_pages: &["wheel"],
        forced_modes: &[GuidedMode::ChangeProcess],
        keywords: &["change process", "spoke", "check-in", "checkin", "the wheel"],
    },
    RelevanceRule {
        category: ContextCategory::LifeInventory,
        forced_pages: &["inventory"],
        forced_modes: &[GuidedMode::LifeInventory],
        keywords: &["inventory", "life area", "take stock", "audit"],
    },
    RelevanceRule {
        category: ContextCategory::Plans,
        forced_pages: &["plans"],
        forced_modes: &[GuidedMode::PlanBuilding, GuidedMode::BrainDump],
        keywords: &["plan", "milestone", "roadmap", "deadline"],
    },
    RelevanceRule {
        category: ContextCategory::PartnerContext,
        forced_pages: &["partner"],
        forced_modes: &[GuidedMode::PartnerAction],
        keywords: &["partner", "marriage", "wife", "husband", "spouse", "relationship"],
    },
    RelevanceRule {
        category: ContextCategory::PeopleContext,
        forced_pages: &["people", "meetings"],
        forced_modes: &ALL_MEETINGS,
        keywords: &["meeting", "friend", "colleague", "boss", "family", "talked with"],
    },
    RelevanceRule {
        category: ContextCategory::SphereOfInfluence,
        forced_pages: &[],
        forced_modes: &[GuidedMode::Processing],
        keywords: &["control", "influence", "can't change", "out of my hands"],
    },
    RelevanceRule {
        category: ContextCategory::Frameworks,
        forced_pages: &[],
        forced_modes: &[GuidedMode::SelfDiscovery, GuidedMode::LifeInventory],
        keywords: &["framework", "model", "method", "approach"],
    },
    RelevanceRule {
        category: ContextCategory::KnowledgeLibrary,
        forced_pages: &["library"],
        forced_modes: &[],
        keywords: &["article", "book", "library", "reading", "reference"],
    },
    RelevanceRule {
        category: ContextCategory::AppGuide,
        forced_pages: &["guide"],
        forced_modes: &[],
        keywords: &["how do i", "how does", "where is", "help me use", "feature"],
    },
];

/// Pure predicate: categories needed this turn, in fixed priority order.
pub fn relevant_categories(
    message: &str,
    page: &str,
    active_mode: Option<GuidedMode>,
) -> Vec<ContextCategory> {
    let lowered = message.to_lowercase();
    RELEVANCE_RULES
        .iter()
        .filter(|rule| rule_matches(rule, &lowered, page, active_mode))
        .map(|rule| rule.category)
        .collect()
}

fn rule_matches(
    rule: &RelevanceRule,
    lowered_message: &str,
    page: &str,
    active_mode: Option<GuidedMode>,
) -> bool {
    if rule.forced_pages.iter().any(|p| *p == page) {
        return true;
    }
    if let Some(mode) = active_mode {
        if rule.forced_modes.contains(&mode) {
            return true;
        }
    }
    rule.keywords.iter().any(|k| lowered_message.contains(k))
}
