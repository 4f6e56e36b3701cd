//! Guided conversation modes.
//!
//! A guided mode is a named, multi-step structured conversation protocol.
//! The catalog is a closed enum so that adding a mode is a compile-time
//! checked change; every dispatch over modes is an exhaustive match.

pub mod engine;
pub mod wheel;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::save_tags::SaveTagKind;
use wheel::WheelState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingKind {
    Daily,
    Weekly,
    Monthly,
}

/// The fixed catalog of guided conversation protocols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuidedMode {
    /// Crafting a personal declaration statement.
    Declaration,
    /// Structured self-discovery: patterns, strengths, triggers.
    SelfDiscovery,
    /// The six-step change process (the "wheel").
    ChangeProcess,
    /// Auditing life areas and taking stock.
    LifeInventory,
    /// Building a concrete plan from an objective.
    PlanBuilding,
    /// A guided meeting of the given cadence.
    Meeting(MeetingKind),
    /// A concrete partner-relationship action.
    PartnerAction,
    /// Crisis-safe open processing. Never persists step data.
    Processing,
    /// Capture-everything triage that compiles into areas and plans.
    BrainDump,
}

/// One unit of a mode's fixed sequence.
#[derive(Debug, Clone, Copy)]
pub struct StepSpec {
    /// Stable key the step's payload is persisted under.
    pub key: &'static str,
    pub title: &'static str,
    /// Natural-language guidance injected into the prompt while this step is
    /// the current one.
    pub instruction: &'static str,
    /// The save tag that confirms this step, if the step persists anything.
    pub expected_tag: Option<SaveTagKind>,
}

const DECLARATION_STEPS: [StepSpec; 3] = [
    StepSpec {
        key: "explore",
        title: "Explore the ground",
        instruction: "Help the user surface the area of life this declaration speaks to \
                      and what they actually care about there. Reflect back what you hear \
                      until one theme is clearly named.",
        expected_tag: Some(SaveTagKind::InsightSave),
    },
    StepSpec {
        key: "draft",
        title: "Draft the declaration",
        instruction: "Work with the user toward a first-person, present-tense declaration \
                      of one or two sentences. Offer at most two variants at a time and \
                      let the user steer the wording.",
        expected_tag: Some(SaveTagKind::DeclarationSave),
    },
    StepSpec {
        key: "commit",
        title: "Commit",
        instruction: "Read the declaration back and ask the user to say it in their own \
                      words. Save the final wording only once they confirm it is theirs.",
        expected_tag: Some(SaveTagKind::DeclarationSave),
    },
];

const SELF_DISCOVERY_STEPS: [StepSpec; 4] = [
    StepSpec {
        key: "patterns",
        title: "Patterns",
        instruction: "Explore recurring patterns the user notices in their behavior or \
                      moods. Stay concrete: ask for recent examples rather than labels.",
        expected_tag: Some(SaveTagKind::InsightSave),
    },
    StepSpec {
        key: "strengths",
        title: "Strengths",
        instruction: "Draw out strengths the user relies on, including ones they \
                      discount. Anchor each in a specific situation.",
        expected_tag: Some(SaveTagKind::InsightSave),
    },
    StepSpec {
        key: "triggers",
        title: "Triggers",
        instruction: "Identify situations that reliably knock the user off balance and \
                      what the first bodily or mental sign tends to be.",
        expected_tag: Some(SaveTagKind::InsightSave),
    },
    StepSpec {
        key: "synthesis",
        title: "Synthesis",
        instruction: "Summarize what this session revealed in the user's own language \
                      and check whether it rings true before saving.",
        expected_tag: Some(SaveTagKind::InsightSave),
    },
];

const CHANGE_PROCESS_STEPS: [StepSpec; wheel::SPOKE_COUNT] = [
    StepSpec {
        key: "spoke_1",
        title: "Name the change",
        instruction: "Pin down the single specific change the user wants to make. \
                      Narrow until it is one behavior, not a theme.",
        expected_tag: Some(SaveTagKind::SpokeSave(1)),
    },
    StepSpec {
        key: "spoke_2",
        title: "Why it matters",
        instruction: "Connect the change to what the user cares about. Ask what staying \
                      the same would cost them a year from now.",
        expected_tag: Some(SaveTagKind::SpokeSave(2)),
    },
    StepSpec {
        key: "spoke_3",
        title: "Obstacles",
        instruction: "Name the obstacles honestly, including the user's own habits. \
                      For each, ask when it last actually got in the way.",
        expected_tag: Some(SaveTagKind::SpokeSave(3)),
    },
    StepSpec {
        key: "spoke_4",
        title: "Support",
        instruction: "Identify the people, structures, and environments that make the \
                      change easier, and one ask the user could make this week.",
        expected_tag: Some(SaveTagKind::SpokeSave(4)),
    },
    StepSpec {
        key: "spoke_5",
        title: "First actions",
        instruction: "Agree on the first two or three concrete actions, each small \
                      enough to finish within a few days.",
        expected_tag: Some(SaveTagKind::SpokeSave(5)),
    },
    StepSpec {
        key: "spoke_6",
        title: "Commitment",
        instruction: "Have the user state their commitment and when their first \
                      check-in should be. Save it in their exact words.",
        expected_tag: Some(SaveTagKind::SpokeSave(6)),
    },
];

const LIFE_INVENTORY_STEPS: [StepSpec; 4] = [
    StepSpec {
        key: "areas",
        title: "Map the areas",
        instruction: "List the life areas the user wants on the table (work, health, \
                      relationships, money, and anything they add). Save each as named.",
        expected_tag: Some(SaveTagKind::AreaSave),
    },
    StepSpec {
        key: "scores",
        title: "Take stock",
        instruction: "Walk through the areas one by one and ask the user to rate where \
                      things stand and say one sentence about why.",
        expected_tag: Some(SaveTagKind::AreaSave),
    },
    StepSpec {
        key: "reflections",
        title: "Reflect",
        instruction: "Ask what surprised them about the picture as a whole, and what \
                      the scores say together that none says alone.",
        expected_tag: Some(SaveTagKind::InsightSave),
    },
    StepSpec {
        key: "priorities",
        title: "Pick priorities",
        instruction: "Help the user choose at most two areas to focus on next and note \
                      why those two.",
        expected_tag: Some(SaveTagKind::AreaSave),
    },
];

const PLAN_BUILDING_STEPS: [StepSpec; 4] = [
    StepSpec {
        key: "objective",
        title: "Objective",
        instruction: "Define the outcome this plan exists for, phrased so the user will \
                      know unambiguously whether they got there.",
        expected_tag: Some(SaveTagKind::MilestoneSave),
    },
    StepSpec {
        key: "milestones",
        title: "Milestones",
        instruction: "Break the objective into three to five milestones. Save each as \
                      the user confirms it.",
        expected_tag: Some(SaveTagKind::MilestoneSave),
    },
    StepSpec {
        key: "schedule",
        title: "Schedule",
        instruction: "Attach a rough date to each milestone. Push back gently if the \
                      first milestone is more than two weeks out.",
        expected_tag: Some(SaveTagKind::MilestoneSave),
    },
    StepSpec {
        key: "compile",
        title: "Compile",
        instruction: "Review the collected milestones with the user, then request \
                      compilation into a plan they can see on their plans page.",
        expected_tag: Some(SaveTagKind::PlanCompileRequest),
    },
];

const MEETING_STEPS: [StepSpec; 2] = [
    StepSpec {
        key: "walkthrough",
        title: "Walkthrough",
        instruction: "Walk the agenda for this cadence: what happened since last time, \
                      what is ahead, and what needs a decision today.",
        expected_tag: Some(SaveTagKind::InsightSave),
    },
    StepSpec {
        key: "summary",
        title: "Summary",
        instruction: "Close with a short summary of decisions and carried-over items, \
                      and save it once the user agrees it is accurate.",
        expected_tag: Some(SaveTagKind::MeetingSummarySave),
    },
];

const PARTNER_ACTION_STEPS: [StepSpec; 2] = [
    StepSpec {
        key: "situation",
        title: "Situation",
        instruction: "Understand the situation with the user's partner from the user's \
                      side without assigning blame. Name what the user wants to be \
                      different.",
        expected_tag: Some(SaveTagKind::InsightSave),
    },
    StepSpec {
        key: "action",
        title: "Action",
        instruction: "Agree on one concrete, kind action the user will take, with a \
                      when. Keep it within the user's own control.",
        expected_tag: Some(SaveTagKind::MilestoneSave),
    },
];

const PROCESSING_STEPS: [StepSpec; 1] = [StepSpec {
    key: "hold",
    title: "Hold space",
    instruction: "The user is processing something difficult. Listen, reflect, and \
                  slow down. Do not push toward goals, steps, or saving anything. \
                  If the user mentions harming themselves or others, encourage them \
                  to contact local emergency services or a crisis line immediately.",
    expected_tag: None,
}];

const BRAIN_DUMP_STEPS: [StepSpec; 3] = [
    StepSpec {
        key: "dump",
        title: "Dump",
        instruction: "Let the user empty their head without structure. Capture, don't \
                      organize. Only mirror back to confirm you caught everything.",
        expected_tag: Some(SaveTagKind::AreaSave),
    },
    StepSpec {
        key: "triage",
        title: "Triage",
        instruction: "Sort what came out into areas with the user: act on, park, drop. \
                      Save each area bucket as they confirm it.",
        expected_tag: Some(SaveTagKind::AreaSave),
    },
    StepSpec {
        key: "compile",
        title: "Compile",
        instruction: "Offer to turn the act-on bucket into tasks and plans, and request \
                      compilation if the user wants that.",
        expected_tag: Some(SaveTagKind::PlanCompileRequest),
    },
];

impl GuidedMode {
    pub const ALL: [GuidedMode; 11] = [
        GuidedMode::Declaration,
        GuidedMode::SelfDiscovery,
        GuidedMode::ChangeProcess,
        GuidedMode::LifeInventory,
        GuidedMode::PlanBuilding,
        GuidedMode::Meeting(MeetingKind::Daily),
        GuidedMode::Meeting(MeetingKind::Weekly),
        GuidedMode::Meeting(MeetingKind::Monthly),
        GuidedMode::PartnerAction,
        GuidedMode::Processing,
        GuidedMode::BrainDump,
    ];

    pub fn steps(self) -> &'static [StepSpec] {
        match self {
            GuidedMode::Declaration => &DECLARATION_STEPS,
            GuidedMode::SelfDiscovery => &SELF_DISCOVERY_STEPS,
            GuidedMode::ChangeProcess => &CHANGE_PROCESS_STEPS,
            GuidedMode::LifeInventory => &LIFE_INVENTORY_STEPS,
            GuidedMode::PlanBuilding => &PLAN_BUILDING_STEPS,
            GuidedMode::Meeting(_) => &MEETING_STEPS,
            GuidedMode::PartnerAction => &PARTNER_ACTION_STEPS,
            GuidedMode::Processing => &PROCESSING_STEPS,
            GuidedMode::BrainDump => &BRAIN_DUMP_STEPS,
        }
    }

    /// Whether a tag matching an earlier, already-saved step may re-save that
    /// step. Other modes only ever write the current step.
    pub fn allows_revisit(self) -> bool {
        matches!(
            self,
            GuidedMode::ChangeProcess | GuidedMode::LifeInventory | GuidedMode::BrainDump
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            GuidedMode::Declaration => "declaration crafting",
            GuidedMode::SelfDiscovery => "self-discovery",
            GuidedMode::ChangeProcess => "the six-step change process",
            GuidedMode::LifeInventory => "a life inventory",
            GuidedMode::PlanBuilding => "plan building",
            GuidedMode::Meeting(MeetingKind::Daily) => "a daily meeting",
            GuidedMode::Meeting(MeetingKind::Weekly) => "a weekly meeting",
            GuidedMode::Meeting(MeetingKind::Monthly) => "a monthly meeting",
            GuidedMode::PartnerAction => "a partner action",
            GuidedMode::Processing => "open processing",
            GuidedMode::BrainDump => "a brain dump",
        }
    }

    pub fn as_db_str(self) -> &'static str {
        match self {
            GuidedMode::Declaration => "declaration",
            GuidedMode::SelfDiscovery => "self_discovery",
            GuidedMode::ChangeProcess => "change_process",
            GuidedMode::LifeInventory => "life_inventory",
            GuidedMode::PlanBuilding => "plan_building",
            GuidedMode::Meeting(MeetingKind::Daily) => "meeting_daily",
            GuidedMode::Meeting(MeetingKind::Weekly) => "meeting_weekly",
            GuidedMode::Meeting(MeetingKind::Monthly) => "meeting_monthly",
            GuidedMode::PartnerAction => "partner_action",
            GuidedMode::Processing => "processing",
            GuidedMode::BrainDump => "brain_dump",
        }
    }

    pub fn from_db(raw: &str) -> Option<Self> {
        let needle = raw.trim().to_ascii_lowercase();
        Self::ALL.iter().copied().find(|m| m.as_db_str() == needle)
    }
}

/// Lifecycle of a guided session.
///
/// Sessions are archived only by explicit user action and are never deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    NotStarted,
    Active,
    AwaitingConfirmation,
    Paused,
    Completed,
    Archived,
}

impl SessionStatus {
    pub fn as_db_str(self) -> &'static str {
        match self {
            SessionStatus::NotStarted => "not_started",
            SessionStatus::Active => "active",
            SessionStatus::AwaitingConfirmation => "awaiting_confirmation",
            SessionStatus::Paused => "paused",
            SessionStatus::Completed => "completed",
            SessionStatus::Archived => "archived",
        }
    }

    pub fn from_db(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "active" => SessionStatus::Active,
            "awaiting_confirmation" => SessionStatus::AwaitingConfirmation,
            "paused" => SessionStatus::Paused,
            "completed" => SessionStatus::Completed,
            "archived" => SessionStatus::Archived,
            _ => SessionStatus::NotStarted,
        }
    }
}

/// A resumable guided conversation with per-step persisted progress.
///
/// `step_data` entries, once written, are only replaced by an explicit
/// re-save of that same step; `current_step` only moves forward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuidedSession {
    pub id: String,
    pub mode: GuidedMode,
    /// The record this session is attached to (a wheel, a plan, a meeting).
    pub reference_id: Option<String>,
    pub current_step: usize,
    pub step_data: BTreeMap<String, Value>,
    pub status: SessionStatus,
    /// Present only for [`GuidedMode::ChangeProcess`].
    pub wheel: Option<WheelState>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GuidedSession {
    pub fn new(mode: GuidedMode, reference_id: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            mode,
            reference_id,
            current_step: 0,
            step_data: BTreeMap::new(),
            status: SessionStatus::NotStarted,
            wheel: match mode {
                GuidedMode::ChangeProcess => Some(WheelState::new()),
                _ => None,
            },
            created_at: now,
            updated_at: now,
        }
    }

    pub fn current_step_spec(&self) -> Option<&'static StepSpec> {
        self.mode.steps().get(self.current_step)
    }

    /// True once every step that persists data has a saved payload. For the
    /// change process this is exactly the six spoke slots.
    pub fn all_steps_filled(&self) -> bool {
        match self.mode {
            GuidedMode::ChangeProcess => wheel::all_spokes_filled(&self.step_data),
            _ => self
                .mode
                .steps()
                .iter()
                .filter(|s| s.expected_tag.is_some())
                .all(|s| self.step_data.contains_key(s.key)),
        }
    }
}
