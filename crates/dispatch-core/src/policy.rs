//! Routing thresholds and eligibility rules. No I/O.

use crate::constants::{
    BOARD_CONFIDENCE_THRESHOLD, L1_BOARD_ID, L2_BOARD_ID, L3_BOARD_ID, NON_SERVICE_BOARDS,
    TIERED_SERVICE_BOARDS, VIP_CONTACT_TYPE_ID,
};
use crate::types::{Contact, TicketRequest};

/// Service teams whose tickets get a proposed first note.
pub const PROPOSED_NOTE_TEAMS: [&str; 2] = ["Hydra", "Bootes"];

pub fn is_low_confidence(score: i32) -> bool {
    score < BOARD_CONFIDENCE_THRESHOLD
}

pub fn is_non_service_board(board_id: Option<i64>) -> bool {
    board_id.is_some_and(|id| NON_SERVICE_BOARDS.contains(&id))
}

pub fn is_vip(contact: Option<&Contact>) -> bool {
    contact.is_some_and(|c| c.types.iter().any(|t| t.id == VIP_CONTACT_TYPE_ID))
}

/// Result of the proposed-note check. `unmet` lists every failed condition,
/// in evaluation order, even when more than one fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eligibility {
    pub unmet: Vec<String>,
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        self.unmet.is_empty()
    }
}

pub fn proposed_note_eligibility(ticket: &TicketRequest, board_id: Option<i64>) -> Eligibility {
    let mut unmet = Vec::new();

    if !ticket.not_streamline_client {
        unmet.push("NotStreamlineClient is false".to_string());
    }
    match &ticket.service_team {
        None => unmet.push("ServiceTeam is null".to_string()),
        Some(team) if !PROPOSED_NOTE_TEAMS.contains(&team.name.as_str()) => unmet.push(format!(
            "ServiceTeam name '{}' is not 'Hydra' or 'Bootes'",
            team.name
        )),
        Some(_) => {},
    }
    if !board_id.is_some_and(|id| TIERED_SERVICE_BOARDS.contains(&id)) {
        let shown = board_id.map_or_else(|| "None".to_string(), |id| id.to_string());
        unmet.push(format!(
            "BoardId '{shown}' is not L1 ({L1_BOARD_ID}), L2 ({L2_BOARD_ID}), or L3 ({L3_BOARD_ID})"
        ));
    }

    Eligibility { unmet }
}
