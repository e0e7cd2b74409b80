use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::json::{lenient_id, lenient_score};

// ── Inbound Ticket ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceTeam {
    pub id: i64,
    pub name: String,
}

/// Ticket payload posted by the intake integration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TicketRequest {
    pub ticket_id: i64,
    pub company_id: i64,
    pub company_name: Option<String>,
    pub contact_id: Option<i64>,
    pub contact_name: Option<String>,
    pub created_by: Option<String>,
    pub initial_description: Option<String>,
    pub summary: Option<String>,
    #[serde(rename = "type")]
    pub ticket_type: Option<String>,
    pub sub_type: Option<String>,
    pub item: Option<String>,
    pub priority: Option<String>,
    pub notes: Option<Vec<String>>,
    pub service_team: Option<ServiceTeam>,
    pub not_streamline_client: bool,
    pub it_glue_org_id: i64,
}

// ── Stage Outcomes ───────────────────────────────────────────────────────

pub const DECISION_SPAM: &str = "Spam";
pub const DECISION_TICKET: &str = "Ticket";
pub const DECISION_INFO_ALERT: &str = "Info-Alert";

/// Verdict of the first classification stage: spam-or-ticket for tickets
/// without an organization, info-alert-or-ticket for everything else.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriageDecision {
    pub decision: String,
    pub intent: Option<String>,
    pub reason: Option<String>,
    #[serde(deserialize_with = "lenient_score")]
    pub confidence_score: i32,
}

impl TriageDecision {
    pub fn is_spam(&self) -> bool {
        self.decision == DECISION_SPAM
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardDecision {
    pub intent: Option<String>,
    pub reason: Option<String>,
    #[serde(deserialize_with = "lenient_score")]
    pub confidence_score: i32,
    pub board_name: Option<String>,
    #[serde(deserialize_with = "lenient_id")]
    pub board_id: Option<i64>,
}

/// One of the type/subtype/item/priority picks. Either half may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TsiPick {
    #[serde(deserialize_with = "lenient_id")]
    pub id: Option<i64>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StructuredReason {
    #[serde(rename = "type")]
    pub type_reason: Option<String>,
    pub subtype: Option<String>,
    pub item: Option<String>,
    pub priority: Option<String>,
}

/// The TSI stage may explain itself with one sentence or with one sentence per field.
#[derive(Debug, Clone, PartialEq)]
pub enum TsiReason {
    Flat(String),
    Structured(StructuredReason),
}

impl TsiReason {
    /// Classify a decoded `reason` value. Objects only count as structured
    /// when they carry a `type` key; other shapes carry no usable reason.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self::Flat(s.clone())),
            Value::Object(map) if map.contains_key("type") => {
                let field = |k: &str| map.get(k).and_then(Value::as_str).map(str::to_string);
                Some(Self::Structured(StructuredReason {
                    type_reason: field("type"),
                    subtype: field("subtype"),
                    item: field("item"),
                    priority: field("priority"),
                }))
            },
            _ => None,
        }
    }

    /// Text form written to the decision log.
    pub fn to_log_text(&self) -> String {
        match self {
            Self::Flat(s) => s.clone(),
            Self::Structured(r) => serde_json::to_string(r).unwrap_or_default(),
        }
    }
}

fn tsi_reason<'de, D>(deserializer: D) -> Result<Option<TsiReason>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(TsiReason::from_value))
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TsiDecision {
    pub intent: Option<String>,
    #[serde(deserialize_with = "tsi_reason")]
    pub reason: Option<TsiReason>,
    #[serde(deserialize_with = "lenient_score")]
    pub confidence_score: i32,
    #[serde(rename = "type")]
    pub type_pick: Option<TsiPick>,
    pub subtype: Option<TsiPick>,
    pub item: Option<TsiPick>,
    pub priority: Option<TsiPick>,
    pub board_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryDecision {
    pub submitted_for: Option<String>,
    pub new_summary: Option<String>,
    pub reason: Option<String>,
    pub intent: Option<String>,
    #[serde(deserialize_with = "lenient_score")]
    pub confidence_score: i32,
}

// ── Completion metadata ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A decoded completion together with its accounting.
#[derive(Debug, Clone)]
pub struct Completion<T> {
    pub value: T,
    pub usage: TokenUsage,
    pub model: String,
}

// ── Ticketing records ────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactType {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: i64,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub types: Vec<ContactType>,
}

// ── Disposition ──────────────────────────────────────────────────────────

/// Why a run stopped before full classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    NoCompany,
    PossibleSpam,
    Spam,
    InfoAlert,
    LowBoardConfidence,
    NonServiceBoard,
}

impl ExitReason {
    pub fn message(self) -> &'static str {
        match self {
            Self::NoCompany => "Ticket moved to Triage Review - No Company",
            Self::PossibleSpam => "Ticket moved to Triage Review - Possible SPAM",
            Self::Spam => "Ticket closed - SPAM",
            Self::InfoAlert => "Ticket moved to Triage Review - Info-Alert",
            Self::LowBoardConfidence => "Ticket moved to Triage Review - Low Board Confidence",
            Self::NonServiceBoard => "Ticket moved to Triage Review - Non-Service Board",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletedRun {
    pub board_name: Option<String>,
    pub board_id: Option<i64>,
    pub type_name: Option<String>,
    pub type_id: Option<i64>,
    pub summary: String,
    pub is_vip: bool,
    pub proposed_note_sent: bool,
    /// Outcome string of the final mutation (`RETRY: ...`, `FALLBACK ...`, `ERROR: ...`).
    pub update_result: String,
}

/// Terminal result of one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub enum Disposition {
    EarlyExit(ExitReason),
    Completed(CompletedRun),
}

impl Disposition {
    pub fn message(&self) -> &'static str {
        match self {
            Self::EarlyExit(reason) => reason.message(),
            Self::Completed(_) => "Ticket processed successfully",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json::decode_case_insensitive;

    #[test]
    fn test_ticket_request_defaults_missing_fields() {
        let t: TicketRequest =
            decode_case_insensitive(r#"{"Ticket_Id": 42, "company_id": 7, "Service_Team": {"id": 3, "name": "Hydra"}}"#)
                .unwrap();
        assert_eq!(t.ticket_id, 42);
        assert_eq!(t.company_id, 7);
        assert!(!t.not_streamline_client);
        assert_eq!(t.service_team.unwrap().name, "Hydra");
        assert!(t.notes.is_none());
    }

    #[test]
    fn test_tsi_reason_flat() {
        let d: TsiDecision =
            decode_case_insensitive(r#"{"reason": "matched SOP", "confidence_score": 95}"#).unwrap();
        assert_eq!(d.reason, Some(TsiReason::Flat("matched SOP".into())));
    }

    #[test]
    fn test_tsi_reason_structured() {
        let d: TsiDecision = decode_case_insensitive(
            r#"{"reason": {"type": "t", "subtype": "s", "item": "i", "priority": "p"},
                "type": {"id": "7768", "name": "Incident"}, "item": {"id": "", "name": null}}"#,
        )
        .unwrap();
        let Some(TsiReason::Structured(r)) = d.reason else {
            panic!("expected structured reason");
        };
        assert_eq!(r.type_reason.as_deref(), Some("t"));
        assert_eq!(r.priority.as_deref(), Some("p"));
        assert_eq!(d.type_pick.unwrap().id, Some(7768));
        assert_eq!(d.item.unwrap().id, None);
        assert!(d.subtype.is_none());
    }

    #[test]
    fn test_tsi_reason_object_without_type_is_absent() {
        let d: TsiDecision = decode_case_insensitive(r#"{"reason": {"note": "x"}}"#).unwrap();
        assert!(d.reason.is_none());
    }

    #[test]
    fn test_board_id_as_string() {
        let d: BoardDecision =
            decode_case_insensitive(r#"{"board_id": "151", "confidence_score": "95", "board_name": "L2"}"#)
                .unwrap();
        assert_eq!(d.board_id, Some(151));
        assert_eq!(d.confidence_score, 95);
    }

    #[test]
    fn test_contact_decodes_camel_case() {
        let c: Contact = serde_json::from_str(
            r#"{"id": 9, "firstName": "Ada", "lastName": "Byron", "types": [{"id": 17, "name": "VIP"}]}"#,
        )
        .unwrap();
        assert_eq!(c.first_name.as_deref(), Some("Ada"));
        assert_eq!(c.types[0].id, 17);
    }
}
