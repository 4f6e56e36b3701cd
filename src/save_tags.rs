//! Reserved save-tag grammar.
//!
//! The assistant persists structured step content by emitting a line of the
//! form `TAG_NAME:{...json...}` inside an otherwise free-form reply. Parsing
//! is line-oriented: each line is checked against the fixed tag catalog, and
//! a recognized tag with an invalid payload fails only for that tag. No
//! regex; the grammar is simple enough for a direct scan.

use serde_json::Value;

/// The fixed catalog of reserved save tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveTagKind {
    /// `DECLARATION_SAVE` - a crafted declaration statement.
    DeclarationSave,
    /// `INSIGHT_SAVE` - a self-knowledge insight from discovery work.
    InsightSave,
    /// `SPOKE_1_SAVE` .. `SPOKE_6_SAVE` - one spoke of the change process.
    SpokeSave(u8),
    /// `RIM_CHECKIN_SAVE` - a recurring change-process check-in.
    RimCheckinSave,
    /// `MILESTONE_SAVE` - a plan milestone or committed action.
    MilestoneSave,
    /// `MEETING_SUMMARY_SAVE` - the summary of a guided meeting.
    MeetingSummarySave,
    /// `TEMPLATE_SAVE` - a reusable template the user approved.
    TemplateSave,
    /// `AREA_SAVE` - a life area entry (inventory, brain-dump triage).
    AreaSave,
    /// `PLAN_COMPILE_REQUEST` - a request to compile collected items into a plan.
    PlanCompileRequest,
}

impl SaveTagKind {
    /// The literal tag name as it appears at the start of a line.
    pub fn tag_name(self) -> String {
        match self {
            SaveTagKind::DeclarationSave => "DECLARATION_SAVE".to_string(),
            SaveTagKind::InsightSave => "INSIGHT_SAVE".to_string(),
            SaveTagKind::SpokeSave(n) => format!("SPOKE_{}_SAVE", n),
            SaveTagKind::RimCheckinSave => "RIM_CHECKIN_SAVE".to_string(),
            SaveTagKind::MilestoneSave => "MILESTONE_SAVE".to_string(),
            SaveTagKind::MeetingSummarySave => "MEETING_SUMMARY_SAVE".to_string(),
            SaveTagKind::TemplateSave => "TEMPLATE_SAVE".to_string(),
            SaveTagKind::AreaSave => "AREA_SAVE".to_string(),
            SaveTagKind::PlanCompileRequest => "PLAN_COMPILE_REQUEST".to_string(),
        }
    }

    pub fn from_tag_name(name: &str) -> Option<Self> {
        match name {
            "DECLARATION_SAVE" => Some(SaveTagKind::DeclarationSave),
            "INSIGHT_SAVE" => Some(SaveTagKind::InsightSave),
            "RIM_CHECKIN_SAVE" => Some(SaveTagKind::RimCheckinSave),
            "MILESTONE_SAVE" => Some(SaveTagKind::MilestoneSave),
            "MEETING_SUMMARY_SAVE" => Some(SaveTagKind::MeetingSummarySave),
            "TEMPLATE_SAVE" => Some(SaveTagKind::TemplateSave),
            "AREA_SAVE" => Some(SaveTagKind::AreaSave),
            "PLAN_COMPILE_REQUEST" => Some(SaveTagKind::PlanCompileRequest),
            _ => {
                let rest = name.strip_prefix("SPOKE_")?;
                let digit = rest.strip_suffix("_SAVE")?;
                let n: u8 = digit.parse().ok()?;
                if (1..=6).contains(&n) {
                    Some(SaveTagKind::SpokeSave(n))
                } else {
                    None
                }
            }
        }
    }

    /// Fields the payload object must carry for the tag to be accepted.
    pub fn required_fields(self) -> &'static [&'static str] {
        match self {
            SaveTagKind::DeclarationSave => &["statement"],
            SaveTagKind::InsightSave => &["insight"],
            SaveTagKind::SpokeSave(_) => &["title", "detail"],
            SaveTagKind::RimCheckinSave => &["reflection"],
            SaveTagKind::MilestoneSave => &["title"],
            SaveTagKind::MeetingSummarySave => &["summary"],
            SaveTagKind::TemplateSave => &["name", "body"],
            SaveTagKind::AreaSave => &["name"],
            SaveTagKind::PlanCompileRequest => &[],
        }
    }

    /// One-line emission directive injected into step instructions.
    pub fn directive(self) -> String {
        let fields = self.required_fields();
        if fields.is_empty() {
            format!("emit a single line `{}:{{}}`", self.tag_name())
        } else {
            let shape = fields
                .iter()
                .map(|f| format!("\"{}\": \"...\"", f))
                .collect::<Vec<_>>()
                .join(", ");
            format!("emit a single line `{}:{{{}}}`", self.tag_name(), shape)
        }
    }
}

/// A recognized tag with a validated payload.
#[derive(Debug, Clone)]
pub struct ParsedTag {
    pub kind: SaveTagKind,
    pub payload: Value,
}

/// A recognized tag whose payload could not be accepted.
#[derive(Debug, Clone)]
pub struct TagFailure {
    pub kind: SaveTagKind,
    pub error: String,
}

/// Result of scanning one assistant reply.
#[derive(Debug, Clone, Default)]
pub struct ReplyScan {
    pub tags: Vec<ParsedTag>,
    pub failures: Vec<TagFailure>,
}

impl ReplyScan {
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.failures.is_empty()
    }
}

/// Scan a reply line by line for reserved save tags.
///
/// Unrecognized lines are ignored. A recognized tag whose trailing JSON is
/// malformed, is not an object, or is missing required fields is reported as
/// a failure; other tags on other lines still parse independently.
pub fn scan_reply(reply: &str) -> ReplyScan {
    let mut scan = ReplyScan::default();

    for line in reply.lines() {
        let trimmed = line.trim();
        let Some(colon) = trimmed.find(':') else {
            continue;
        };
        let Some(kind) = SaveTagKind::from_tag_name(&trimmed[..colon]) else {
            continue;
        };

        let raw = trimmed[colon + 1..].trim();
        match serde_json::from_str::<Value>(raw) {
            Ok(payload) => match validate_payload(kind, &payload) {
                Ok(()) => scan.tags.push(ParsedTag { kind, payload }),
                Err(error) => scan.failures.push(TagFailure { kind, error }),
            },
            Err(e) => scan.failures.push(TagFailure {
                kind,
                error: format!("invalid JSON payload: {}", e),
            }),
        }
    }

    scan
}

fn validate_payload(kind: SaveTagKind, payload: &Value) -> Result<(), String> {
    let Some(object) = payload.as_object() else {
        return Err("payload must be a JSON object".to_string());
    };

    for field in kind.required_fields() {
        match object.get(*field) {
            Some(Value::String(s)) if !s.trim().is_empty() => {}
            Some(Value::String(_)) | None => {
                return Err(format!("missing required field '{}'", field));
            }
            // Non-string values are accepted as long as the field is present.
            Some(_) => {}
        }
    }

    Ok(())
}
