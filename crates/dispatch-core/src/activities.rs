//! Sales activities that record classification outcomes on the ticket.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::constants::{
    ACTIVITY_ASSIGNEE_ID, ACTIVITY_CLOSED_STATUS_ID, ACTIVITY_LOCATION_ID, ACTIVITY_TYPE_BOARD_FAILURE,
    ACTIVITY_TYPE_BOARD_SUCCESS, ACTIVITY_TYPE_POSSIBLE_SPAM, ACTIVITY_TYPE_SPAM, CERTAIN_SPAM_CONFIDENCE,
    POSSIBLE_SPAM_CONFIDENCE,
};
use crate::mutation::Reference;
use crate::policy::is_low_confidence;
use crate::ticketing::TicketingApi;
use crate::types::{BoardDecision, TriageDecision};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub activity_type: Reference,
    pub notes: String,
    #[serde(rename = "where")]
    pub location: Reference,
    pub status: Reference,
    pub ticket: Reference,
    pub assign_to: Reference,
    pub date_start: String,
}

impl ActivityRequest {
    fn new(ticket_id: i64, name: &str, type_id: i64, notes: String, now: DateTime<Utc>) -> Self {
        Self {
            name: name.to_string(),
            activity_type: type_id.into(),
            notes,
            location: ACTIVITY_LOCATION_ID.into(),
            status: ACTIVITY_CLOSED_STATUS_ID.into(),
            ticket: ticket_id.into(),
            assign_to: ACTIVITY_ASSIGNEE_ID.into(),
            date_start: now.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        }
    }
}

/// Activities owed for the stage outcomes so far. The spam rules only fire
/// on an exact 95 or 100; the board rules fire whenever routing ran.
pub fn plan_activities(
    ticket_id: i64,
    spam: Option<&TriageDecision>,
    board: Option<&BoardDecision>,
    now: DateTime<Utc>,
) -> Vec<ActivityRequest> {
    let mut plan = Vec::new();

    if let Some(spam) = spam.filter(|s| s.is_spam()) {
        match spam.confidence_score {
            CERTAIN_SPAM_CONFIDENCE => plan.push(ActivityRequest::new(
                ticket_id,
                "SPAM Classification 100%",
                ACTIVITY_TYPE_SPAM,
                String::new(),
                now,
            )),
            POSSIBLE_SPAM_CONFIDENCE => plan.push(ActivityRequest::new(
                ticket_id,
                "Possible SPAM Classification",
                ACTIVITY_TYPE_POSSIBLE_SPAM,
                String::new(),
                now,
            )),
            _ => {},
        }
    }

    if let Some(board) = board {
        if is_low_confidence(board.confidence_score) {
            plan.push(ActivityRequest::new(
                ticket_id,
                "Unsuccessful Board Classification",
                ACTIVITY_TYPE_BOARD_FAILURE,
                String::new(),
                now,
            ));
        } else {
            let notes = board
                .board_name
                .as_deref()
                .map(|n| format!("Chosen Board: {n}"))
                .unwrap_or_default();
            plan.push(ActivityRequest::new(
                ticket_id,
                "Successful Board Classification",
                ACTIVITY_TYPE_BOARD_SUCCESS,
                notes,
                now,
            ));
        }
    }

    plan
}

/// Create each planned activity in turn. Individual failures are folded
/// into the returned description.
pub async fn create_activities(api: &dyn TicketingApi, plan: &[ActivityRequest]) -> String {
    let mut results = Vec::with_capacity(plan.len());
    for activity in plan {
        match api.create_activity(activity).await {
            Ok(()) => {
                info!(ticket_id = activity.ticket.id, name = %activity.name, "sales activity created");
                results.push(format!("Sales activity '{}' created", activity.name));
            },
            Err(e) => {
                warn!(ticket_id = activity.ticket.id, name = %activity.name, error = %e, "sales activity failed");
                results.push(format!("ERROR: Failed to create activity '{}': {e}", activity.name));
            },
        }
    }
    if results.is_empty() {
        "No activities created".to_string()
    } else {
        results.join("; ")
    }
}
