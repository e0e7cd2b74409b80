//! System prompts for each stage. Pure string building over the catalog.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::constants::{CADUCEUS_BOARD_ID, CADUCEUS_HEALTH_COMPANY_ID, ROUTING_CANDIDATE_BOARDS};
use crate::schema::{BoardRoutingData, BoardSchema, SchemaCatalog};

const CONFIDENCE_GUIDE: &str = "\
- 100: clear match
- 95: very strong match
- 90: strong match
- 85: plausible match that needs human review
- 75-84: unclear match, needs human review
- below 75: poor match, needs human review";

const ID_RULES: &str = "\
CRITICAL: confidence_score MUST be an integer, 0-100, or -1 when no determination can be made.

CRITICAL: every id field (type.id, subtype.id, item.id, priority.id) is an integer or null. Never return an empty string for an id.

If confidence_score is -1, set the type and subtype ids and names to null.";

pub fn spam_prompt() -> String {
    format!(
        "Role: Incoming Ticket Classifier.

Classify the ticket from its summary, initial description and creator as Spam or Ticket.

Spam: not a real issue. Promotions, product offers, webinar invitations or announcements, survey requests. \
These arrive through email connectors and open tickets automatically. Score them 100.

Do NOT classify as Spam when a user reports or asks about spam or phishing (\"I received\", \"is this legitimate\", \
\"please review\", \"can you look at\", \"investigate\"). Those are Tickets.

Ticket: anything created by QuestAPI, any summary that already references a ticket number (RE: Ticket#), \
file sharing requests, and every legitimate issue that needs investigation or resolution.

Confidence guidelines, leaning confident:
{CONFIDENCE_GUIDE}

The intent field is REQUIRED. For spam, describe the content instead (\"Promotional content found\", \
\"Webinar invitation - no action required\", \"Survey request - no action required\"). Never return an empty intent.

No explanations. No markdown. Return only this JSON:

{{
  \"decision\": \"Spam | Ticket\",
  \"intent\": \"intent found in the ticket\",
  \"reason\": \"brief explanation\",
  \"confidence_score\": int between 1 and 100
}}"
    )
}

pub fn ticket_type_prompt() -> String {
    "Role: Incoming Ticket Classifier.

Classify the ticket from its summary, initial description and creator as Info-Alert or Ticket.

Info-Alert: an informational message that needs no action, such as routine self-tests, system notices or \
status updates. System alerts such as backup failures or IP conflicts are not Info-Alerts. \
A summary containing 'Alert' is an Info-Alert.

Ticket: anything created by QuestAPI, any summary that already references a ticket number (RE: Ticket#), \
and every legitimate issue that needs investigation or resolution.

No explanations. No markdown. Return only this JSON:

{
  \"decision\": \"Info-Alert | Ticket\",
  \"intent\": \"intent found in the ticket\",
  \"reason\": \"brief explanation\",
  \"confidence_score\": int between 1 and 100
}"
    .to_string()
}

pub fn summary_prompt() -> String {
    "Role: Dispatch Summary Writer.

Write a new summary for the ticket from the fields provided. Use the intent, when given, as the ticket's goal.

1. Review the ticket fields and notes.
2. If the request was submitted on someone else's behalf, return that person's name in submitted_for. \
Do not put names in the summary.
3. Keep new_summary under 100 characters and about the subject only.
4. Give a short reason for the change.

No explanations. No markdown. Return only this JSON:

{
  \"submitted_for\": name of the person the ticket was submitted for, if any,
  \"new_summary\": the new summary,
  \"reason\": reason for the change,
  \"confidence_score\": 0-100
}"
    .to_string()
}

fn compact<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string(value).context("failed to serialize prompt table")
}

/// Boards offered to the router. Caduceus Health sees only the candidate
/// boards; every other company sees everything except the Caduceus board.
pub fn routing_boards(catalog: &SchemaCatalog, company_id: i64) -> Vec<&BoardRoutingData> {
    catalog
        .board_routing
        .iter()
        .filter(|b| {
            if company_id == CADUCEUS_HEALTH_COMPANY_ID {
                ROUTING_CANDIDATE_BOARDS.contains(&b.board_id)
            } else {
                b.board_id != CADUCEUS_BOARD_ID
            }
        })
        .collect()
}

pub fn board_prompt(catalog: &SchemaCatalog, company_id: i64) -> Result<String> {
    let mut out = format!(
        "Role: Dispatch Ticket Router

Pick the board the ticket should be routed to. Use the intent, when given, as the ticket's goal.

Match a board rule first. If no rule applies, match the ticket content and intent to a board task. \
If the SOP below supports no decision, return confidence_score -1.

Read the notes ONLY for explicit instructions to route to a specific board, and follow them when present.

Default to 90 or above when the SOP match is clear; use 85 or below only when genuinely uncertain.
{CONFIDENCE_GUIDE}
- -1: not covered by the SOP

Software installs do not need to be named in the SOP.

SOP:

"
    );
    if company_id == CADUCEUS_HEALTH_COMPANY_ID {
        out.push_str(
            "Check the Caduceus board first. Only when none of its criteria match, route to the best matching board.\n\n",
        );
    }
    out.push_str(&compact(&routing_boards(catalog, company_id))?);
    out.push_str(
        "
No explanations. No markdown. Return only this JSON.

CRITICAL: confidence_score and board_id MUST be integers, never strings.

{
  \"reason\": reason for the decision,
  \"confidence_score\": 0-100 int or -1,
  \"board_name\": board_name from the SOP,
  \"board_id\": board_id from the SOP
}
",
    );
    Ok(out)
}

// ── TSI variants ─────────────────────────────────────────────────────────

/// Which TSI prompt a routed board gets, decided from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TsiVariant {
    Soc,
    Noc,
    Caduceus,
    Service,
}

impl TsiVariant {
    pub fn for_board(board_name: Option<&str>) -> Self {
        let Some(name) = board_name.map(str::to_lowercase) else {
            return Self::Service;
        };
        if name.contains("security") || name.contains("soc") {
            Self::Soc
        } else if name.contains("noc") || name.contains("network operations") {
            Self::Noc
        } else if name.contains("caduceus") || name.contains("caduseus") {
            Self::Caduceus
        } else {
            Self::Service
        }
    }
}

fn tsi_json_contract(item_line: &str, board_name: &str) -> String {
    format!(
        "No explanations. No markdown. Return only this JSON:

{{
  \"reason\": {{\"type\": \"why this type\", \"subtype\": \"why this subtype\", \"item\": \"why this item\", \"priority\": \"why this priority\"}},
  \"confidence_score\": 0-100 int, or -1,
  \"type\": {{\"id\": int from the Type schema, \"name\": \"type name\"}},
  \"subtype\": {{\"id\": int from the SubType schema (never an item id), \"name\": \"subtype name\"}},
  \"item\": {item_line},
  \"priority\": {{\"id\": int from the priority table, \"name\": \"priority name\"}},
  \"board_name\": \"{board_name}\"
}}"
    )
}

const NO_ITEM: &str = "{\"id\": null, \"name\": null}";

fn priority_fallback(catalog: &SchemaCatalog) -> Result<String> {
    Ok(format!(
        "Priority:

- Use the priority named by the keyword SOP when there is one.
- Otherwise use these priority definitions:

{}
",
        compact(&catalog.priority_definitions)?
    ))
}

fn types_and_subtypes(schema: &BoardSchema) -> Result<String> {
    Ok(format!(
        "Type:

{}

SubType (its typeAssociationIds must contain the chosen type id):

{}
",
        compact(&schema.types)?,
        compact(&schema.sub_types)?
    ))
}

fn require_schema(catalog: &SchemaCatalog, board_id: Option<i64>) -> Result<&BoardSchema> {
    catalog.board_schema(board_id).with_context(|| {
        let shown = board_id.map_or_else(|| "None".to_string(), |id| id.to_string());
        format!("board schema not found for board id {shown}")
    })
}

fn service_prompt(catalog: &SchemaCatalog, board_id: Option<i64>) -> Result<String> {
    let schema = require_schema(catalog, board_id)?;
    let mut out = String::from(
        "Role: Dispatch - Type, Subtype and Item Classifier

Decide only from the SOPs below. Use the intent, when given, as the ticket's goal.

If the ticket's current type, subtype and item are already correct, return them unchanged. \
Classify any that are missing.

",
    );
    out.push_str(&types_and_subtypes(schema)?);
    out.push_str(&format!(
        "
Pick an item only when one fits. The item's type and subtype must match the picks above:

{}

Return the item object from this board's items:

{}

",
        compact(&catalog.item_definitions)?,
        compact(&schema.board_items)?
    ));
    out.push_str(&priority_fallback(catalog)?);
    out.push_str(&format!(
        "
Before answering, check that the subtype's typeAssociationIds contains the type id and that the item \
matches the type and subtype. Never pick \"Software\" (16051) as the item of a Service Request.

{ID_RULES}

{}",
        tsi_json_contract(
            "{\"id\": int from the board items, \"name\": \"item name\"}",
            &schema.board_name
        )
    ));
    Ok(out)
}

fn soc_prompt(catalog: &SchemaCatalog, board_id: Option<i64>) -> Result<String> {
    let schema = require_schema(catalog, board_id)?;
    let mut out = format!(
        "Role: Dispatch - Type, Subtype and Priority Classifier

Use the intent, when given, as the ticket's goal. Apply the keyword SOP first: match keywords in the \
ticket and intent to pick the type and subtype.

{}

Take ids from the schemas below. If nothing matches, classify from the ticket content.

",
        compact(&catalog.soc_rules)?
    );
    out.push_str(&types_and_subtypes(schema)?);
    out.push('\n');
    out.push_str(&priority_fallback(catalog)?);
    out.push_str(&format!("\n{ID_RULES}\n\n{}", tsi_json_contract(NO_ITEM, &schema.board_name)));
    Ok(out)
}

fn noc_prompt(catalog: &SchemaCatalog) -> Result<String> {
    let mut out = String::from(
        "Role: Dispatch - Type, Subtype and Priority Classifier

Apply the keyword SOP to pick the type and subtype.

Backups. Keywords: backup, restoration, recovery, DR, disaster recovery, backup validation, missing file, \
Acronis, Datto, 'An Azure Backup failure alert has been activated'.
Type: {\"name\": \"Backups\", \"id\": 2799}
Subtype: {\"name\": \"Restore\", \"id\": 10371}

General NOC. Keywords: script, RMM access, ConnectWise access, ITGlue access, offboard workstation, remove RMM, \
GDAP, removal of monitoring tools, Auvik, CyberQP, ScreenConnect.
Type: {\"name\": \"Incident\", \"id\": 7911}

",
    );
    out.push_str(&priority_fallback(catalog)?);
    out.push_str(&format!(
        "\n{ID_RULES}\n\n{}",
        tsi_json_contract(NO_ITEM, "Network Operations Center")
    ));
    Ok(out)
}

fn caduceus_prompt(catalog: &SchemaCatalog, board_id: Option<i64>) -> Result<String> {
    let schema = require_schema(catalog, board_id)?;
    let mut out = String::from(
        "Role: Dispatch - Type, Subtype and Priority Classifier

Take ids from the schemas below. If nothing matches, classify from the ticket content.

",
    );
    out.push_str(&types_and_subtypes(schema)?);
    out.push('\n');
    out.push_str(&priority_fallback(catalog)?);
    out.push_str(&format!("\n{ID_RULES}\n\n{}", tsi_json_contract(NO_ITEM, &schema.board_name)));
    Ok(out)
}

/// TSI prompt for the routed board. Errors when the variant needs a board
/// schema the catalog does not have.
pub fn tsi_prompt(
    catalog: &SchemaCatalog,
    board_id: Option<i64>,
    board_name: Option<&str>,
) -> Result<String> {
    match TsiVariant::for_board(board_name) {
        TsiVariant::Soc => soc_prompt(catalog, board_id),
        TsiVariant::Noc => noc_prompt(catalog),
        TsiVariant::Caduceus => caduceus_prompt(catalog, board_id),
        TsiVariant::Service => service_prompt(catalog, board_id),
    }
}
