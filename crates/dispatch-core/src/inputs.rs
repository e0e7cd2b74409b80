//! User-message builders for each classification stage.

use std::fmt::Write;

use crate::types::TicketRequest;

const SUMMARY_BOILERPLATE: [&str; 2] = ["Software Request: ", "My Issue is not listed here."];

fn strip_boilerplate(summary: &str) -> String {
    SUMMARY_BOILERPLATE
        .iter()
        .fold(summary.to_string(), |s, pat| s.replace(pat, ""))
}

/// Intake normalization, applied once before any stage runs.
pub fn clean_summary(mut ticket: TicketRequest) -> TicketRequest {
    if let Some(summary) = ticket.summary.as_deref().filter(|s| !s.is_empty()) {
        ticket.summary = Some(strip_boilerplate(summary));
    }
    ticket
}

fn text(field: &Option<String>) -> &str {
    field.as_deref().unwrap_or("")
}

fn push_intent(out: &mut String, intent: Option<&str>) {
    if let Some(intent) = intent.filter(|i| !i.trim().is_empty()) {
        let _ = writeln!(out, "Intent: {intent}");
        out.push('\n');
    }
}

/// Input for both spam-or-ticket and info-alert-or-ticket.
pub fn triage_input(ticket: &TicketRequest) -> String {
    let summary = strip_boilerplate(text(&ticket.summary));
    let mut out = String::new();
    let _ = writeln!(out, "Summary: {summary}");
    out.push('\n');
    let _ = writeln!(
        out,
        "Initial Description: {}",
        ticket.initial_description.as_deref().unwrap_or("None")
    );
    out.push('\n');
    let _ = writeln!(
        out,
        "Created By: {}",
        ticket.created_by.as_deref().unwrap_or("Unknown")
    );
    out
}

pub fn board_routing_input(ticket: &TicketRequest, intent: Option<&str>) -> String {
    let mut out = String::from("Initial Incoming Ticket Fields:\n\n");
    push_intent(&mut out, intent);
    let _ = writeln!(out, "Summary: {}", text(&ticket.summary));
    let _ = writeln!(out, "Issue Description: {}", text(&ticket.initial_description));
    let _ = writeln!(out, "Company: {}", text(&ticket.company_name));
    let _ = writeln!(out, "Type: {}", text(&ticket.ticket_type));
    let _ = writeln!(out, "Subtype: {}", text(&ticket.sub_type));
    let _ = writeln!(out, "Priority: {}", text(&ticket.priority));
    let _ = writeln!(out, "Item: {}", text(&ticket.item));
    let team = ticket.service_team.as_ref().map_or("", |t| t.name.as_str());
    let _ = writeln!(out, "Team: {team}");
    let notes = ticket.notes.as_deref().unwrap_or_default().join(" ");
    let _ = writeln!(out, "Notes: {notes}");
    out
}

pub fn tsi_input(ticket: &TicketRequest, intent: Option<&str>) -> String {
    let mut out = String::from("Incoming Fields\n\n");
    push_intent(&mut out, intent);
    let _ = writeln!(out, "Summary: {}", text(&ticket.summary));
    let _ = writeln!(out, "Initial Description: {}", text(&ticket.initial_description));
    let _ = writeln!(out, "Type: {}", text(&ticket.ticket_type));
    let _ = writeln!(out, "Subtype: {}", text(&ticket.sub_type));
    let _ = writeln!(out, "Item: {}", text(&ticket.item));
    let _ = writeln!(out, "Priority: {}", text(&ticket.priority));
    out
}

pub fn summary_input(ticket: &TicketRequest, intent: Option<&str>) -> String {
    let mut out = String::from("Initial Incoming Ticket Fields:\n\n");
    push_intent(&mut out, intent);
    let _ = writeln!(out, "Ticket ID: {}", ticket.ticket_id);
    let _ = writeln!(out, "Summary: {}", text(&ticket.summary));
    let _ = writeln!(out, "Issue Description: {}", text(&ticket.initial_description));
    let _ = writeln!(
        out,
        "Contact Name: {}",
        ticket.contact_name.as_deref().unwrap_or("No Contact Added")
    );
    out.push_str("\n-------------\n\nTicket Notes:\n\n");
    for note in ticket.notes.as_deref().unwrap_or_default() {
        let _ = writeln!(out, "{note}");
    }
    out
}
