//! Internal-analysis notes and the display summary written back to the ticket.

use std::fmt::Write;

use crate::constants::SUMMARY_MAX_CHARS;
use crate::types::{BoardDecision, ExitReason, TriageDecision, TsiDecision, TsiPick, TsiReason};

/// Truncate to at most `max` characters, never splitting a character.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// `"{submitted_for} | {new_summary}"`, prefixed with `"VIP | "` for VIP contacts.
/// Without attribution the rewritten summary is used as is.
pub fn build_summary(submitted_for: Option<&str>, new_summary: &str, is_vip: bool) -> String {
    let full = match submitted_for.filter(|s| !s.is_empty()) {
        None => new_summary.to_string(),
        Some(sf) if is_vip => format!("VIP | {sf} | {new_summary}"),
        Some(sf) => format!("{sf} | {new_summary}"),
    };
    truncate_chars(&full, SUMMARY_MAX_CHARS).to_string()
}

fn intent_or_none(intent: Option<&str>) -> &str {
    intent.unwrap_or("None")
}

fn reason_or_empty(reason: &Option<String>) -> &str {
    reason.as_deref().unwrap_or("")
}

fn verdict_note(headline: &str, board: Option<&str>, intent: Option<&str>, reason: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{headline}\n");
    if let Some(board) = board {
        let _ = writeln!(out, "Board Classification: {board}\n");
    }
    let _ = writeln!(out, "Intent Found: {}\n", intent_or_none(intent));
    let _ = writeln!(out, "Reason for Decision: {reason}");
    out
}

const TRIAGE_REVIEW_PREFIX: &str = "This ticket is being moved to 'Triage Review' for verification due to";

pub fn spam_closed_note(spam: &TriageDecision, intent: Option<&str>) -> String {
    verdict_note(
        "This ticket is being closed due to the Confidence Score returned being 100% for a SPAM classification.",
        None,
        intent,
        reason_or_empty(&spam.reason),
    )
}

pub fn possible_spam_note(spam: &TriageDecision, intent: Option<&str>) -> String {
    verdict_note(
        &format!("{TRIAGE_REVIEW_PREFIX} the Confidence Score returned being 95% for a SPAM classification."),
        None,
        intent,
        reason_or_empty(&spam.reason),
    )
}

pub fn info_alert_note(verdict: &TriageDecision, intent: Option<&str>) -> String {
    verdict_note(
        &format!("{TRIAGE_REVIEW_PREFIX} the Confidence Score returned being 95% for an Info-Alert classification."),
        None,
        intent,
        reason_or_empty(&verdict.reason),
    )
}

pub fn low_board_confidence_note(board: &BoardDecision, intent: Option<&str>) -> String {
    verdict_note(
        &format!("{TRIAGE_REVIEW_PREFIX} the Confidence Score returned being less than 90% for a Board Classification."),
        Some(reason_or_empty(&board.board_name)),
        intent,
        reason_or_empty(&board.reason),
    )
}

pub fn non_service_board_note(board: &BoardDecision, intent: Option<&str>) -> String {
    verdict_note(
        &format!("{TRIAGE_REVIEW_PREFIX} the Board Classification resulting in a Non-Service board"),
        Some(reason_or_empty(&board.board_name)),
        intent,
        reason_or_empty(&board.reason),
    )
}

pub fn no_company_note() -> String {
    let lines = [
        "This ticket is being moved to 'Triage Review' for verification due to the Company Name not being able to be resolved.",
        "**Prior to dispatching a ticket, ensure the following steps are completed**",
        "**1. Handle Device - Generated Tickets:** If the ticket is generated via an alert from a device, identify the associated company and assign the ticket accordingly.",
        "    **1.** For the technician who works on this, please update the device to point to noc@sourcepass.com.",
        "**2. Verify Contact Legitimacy:** If the ticket is generated via an e-mail from a contact, confirm the legitimacy of the contact for the company by coordinating with the designated Point of Contact (POC).",
        "**3. Update Contact Information:** If the contact is verified and legitimate, add the contact details to ConnectWise Manage.",
        "**4. Dispatch Ticket:** Proceed with dispatching the ticket only after the contact has been successfully added to ConnectWise Manage and, if applicable, the company has been identified and assigned.",
    ];
    let mut out = lines.join("\n\n");
    out.push('\n');
    out
}

/// Stage outcomes an early-exit note may draw on.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoteInputs<'a> {
    pub spam: Option<&'a TriageDecision>,
    pub ticket_type: Option<&'a TriageDecision>,
    pub board: Option<&'a BoardDecision>,
    pub tsi: Option<&'a TsiDecision>,
    pub intent: Option<&'a str>,
}

/// Fixed template for an early exit. `None` when the outcome the template
/// quotes is missing.
pub fn exit_note(reason: ExitReason, inputs: &NoteInputs<'_>) -> Option<String> {
    let intent = inputs.intent;
    Some(match reason {
        ExitReason::NoCompany => no_company_note(),
        ExitReason::PossibleSpam => possible_spam_note(inputs.spam?, intent),
        ExitReason::Spam => spam_closed_note(inputs.spam?, intent),
        ExitReason::InfoAlert => info_alert_note(inputs.ticket_type?, intent),
        ExitReason::LowBoardConfidence => low_board_confidence_note(inputs.board?, intent),
        ExitReason::NonServiceBoard => non_service_board_note(inputs.board?, intent),
    })
}

fn push_pick(out: &mut String, label: &str, pick: Option<&TsiPick>, reason: Option<&str>) {
    let Some(pick) = pick else { return };
    let _ = writeln!(out, "\n**--{label}--**");
    let _ = writeln!(out, "**Decision:** {}", pick.name.as_deref().unwrap_or(""));
    if let Some(reason) = reason.filter(|r| !r.is_empty()) {
        let _ = writeln!(out, "**Reason for Decision:** {reason}");
    }
}

/// Composite note for a fully classified ticket, one section per stage
/// that produced an outcome.
pub fn success_note(inputs: &NoteInputs<'_>) -> String {
    let intent = intent_or_none(inputs.intent);
    let mut out = String::new();

    if let Some(spam) = inputs.spam {
        let _ = writeln!(out, "**--SPAM Classification--**\n");
        let _ = writeln!(out, "**Decision:** {}", spam.decision);
        let _ = writeln!(out, "**Intent Found:** {intent}");
        let _ = writeln!(out, "**Reason for Decision:** {}\n", reason_or_empty(&spam.reason));
    }

    if let Some(board) = inputs.board {
        let _ = writeln!(out, "**--Board Classification--**\n");
        let _ = writeln!(out, "**Decision:** {}", reason_or_empty(&board.board_name));
        let _ = writeln!(out, "**Intent Found:** {intent}");
        let _ = writeln!(out, "**Reason for Decision:** {}\n", reason_or_empty(&board.reason));
    }

    if let Some(tsi) = inputs.tsi {
        let _ = writeln!(out, "**--TSI Classifications--**\n");
        let _ = writeln!(out, "**Intent Found:** {intent}");

        let [type_reason, subtype_reason, item_reason, priority_reason] = match &tsi.reason {
            Some(TsiReason::Structured(r)) => [
                r.type_reason.as_deref(),
                r.subtype.as_deref(),
                r.item.as_deref(),
                r.priority.as_deref(),
            ],
            _ => [None; 4],
        };
        push_pick(&mut out, "Type", tsi.type_pick.as_ref(), type_reason);
        push_pick(&mut out, "Subtype", tsi.subtype.as_ref(), subtype_reason);
        push_pick(&mut out, "Item", tsi.item.as_ref(), item_reason);
        push_pick(&mut out, "Priority", tsi.priority.as_ref(), priority_reason);

        if let Some(TsiReason::Flat(text)) = &tsi.reason {
            if !text.is_empty() {
                let _ = writeln!(out, "\n**Reason:** {text}");
            }
        }
    }

    out
}
