//! Token-budgeted prompt assembly.
//!
//! The estimate is a deliberate `ceil(len / 4)` character approximation, not
//! a tokenizer call; keeping the hot path free of network round trips is
//! worth the error bound. Admission is single-pass greedy in fixed priority
//! order and never reorders sections to fill the budget better.

use crate::context::format::FormattedSection;
use crate::context::ContextCategory;
use serde::{Deserialize, Serialize};

/// Named prompt-size ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetTier {
    Short,
    Medium,
    Long,
}

impl BudgetTier {
    pub fn from_str_loose(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "short" => Some(BudgetTier::Short),
            "medium" => Some(BudgetTier::Medium),
            "long" => Some(BudgetTier::Long),
            _ => None,
        }
    }
}

/// Configured ceilings per tier, fixed for the life of the process.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TierCeilings {
    pub short: usize,
    pub medium: usize,
    pub long: usize,
}

impl TierCeilings {
    pub fn ceiling(&self, tier: BudgetTier) -> usize {
        match tier {
            BudgetTier::Short => self.short,
            BudgetTier::Medium => self.medium,
            BudgetTier::Long => self.long,
        }
    }
}

impl Default for TierCeilings {
    fn default() -> Self {
        Self {
            short: 1_500,
            medium: 4_000,
            long: 8_000,
        }
    }
}

/// Cheap character-based token estimate: `ceil(len / 4)`.
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(4)
}

/// The assembled prompt plus an account of what made it in.
#[derive(Debug, Clone)]
pub struct AssembledPrompt {
    pub text: String,
    pub used_tokens: usize,
    pub admitted: Vec<ContextCategory>,
    pub skipped: Vec<ContextCategory>,
}

/// Greedy, priority-ordered, non-reordering admission under a token ceiling.
///
/// The base text (persona plus any active guided-step instructions) is
/// appended unconditionally, even when it alone exceeds the ceiling. Each
/// optional section is admitted iff the running total stays strictly below
/// the ceiling; a rejected section does not block later, smaller sections
/// from being tried.
pub fn assemble(
    base: &str,
    sections: &[FormattedSection],
    ceiling: usize,
) -> AssembledPrompt {
    let mut ordered: Vec<&FormattedSection> = sections.iter().collect();
    ordered.sort_by_key(|s| s.category.priority_rank());

    let mut cumulative = estimate_tokens(base);
    let mut parts = vec![base.to_string()];
    let mut admitted = Vec::new();
    let mut skipped = Vec::new();

    for section in ordered {
        if cumulative + section.estimated_tokens < ceiling {
            cumulative += section.estimated_tokens;
            parts.push(section.text.clone());
            admitted.push(section.category);
        } else {
            skipped.push(section.category);
        }
    }

    AssembledPrompt {
        text: parts.join("\n\n"),
        used_tokens: cumulative,
        admitted,
        skipped,
    }
}
