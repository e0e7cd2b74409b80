use async_trait::async_trait;
use tracing::{info, warn};

use crate::activities::ActivityRequest;
use crate::constants::NO_COMPANY_ID;
use crate::mutation::Mutation;
use crate::types::Contact;

#[derive(Debug, thiserror::Error)]
pub enum TicketingError {
    #[error("ticketing API returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("ticketing API transport error: {0}")]
    Transport(String),
    #[error("ticketing API response could not be decoded: {0}")]
    Decode(String),
}

impl TicketingError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_server_error(&self) -> bool {
        self.status().is_some_and(|s| (500..=599).contains(&s))
    }

    /// A 400 whose body names `field`, compared without regard to case.
    pub fn is_bad_request_mentioning(&self, field: &str) -> bool {
        match self {
            Self::Status { status: 400, body } => {
                body.to_lowercase().contains(&field.to_lowercase())
            },
            _ => false,
        }
    }
}

/// ConnectWise Manage operations the pipeline relies on.
#[async_trait]
pub trait TicketingApi: Send + Sync {
    async fn update_ticket(&self, ticket_id: i64, mutation: &Mutation) -> Result<(), TicketingError>;

    /// Append an internal-analysis note.
    async fn add_note(&self, ticket_id: i64, text: &str) -> Result<(), TicketingError>;

    async fn create_activity(&self, activity: &ActivityRequest) -> Result<(), TicketingError>;

    async fn get_contact(&self, contact_id: i64) -> Result<Contact, TicketingError>;

    async fn search_contacts(
        &self,
        first_name: &str,
        last_name: &str,
        company_id: i64,
    ) -> Result<Vec<Contact>, TicketingError>;
}

// ── Reporting wrappers ───────────────────────────────────────────────────

/// Single update without the fallback cascade, folded into a description string.
pub async fn update_ticket_reporting(
    api: &dyn TicketingApi,
    ticket_id: i64,
    mutation: &Mutation,
) -> String {
    match api.update_ticket(ticket_id, mutation).await {
        Ok(()) => {
            let desc = mutation.describe(ticket_id);
            info!(ticket_id, "{desc}");
            desc
        },
        Err(e) => {
            warn!(ticket_id, error = %e, "ticket update failed");
            format!("ERROR: Failed to update ticket {ticket_id}: {e}")
        },
    }
}

pub async fn add_note_reporting(api: &dyn TicketingApi, ticket_id: i64, text: &str) -> String {
    match api.add_note(ticket_id, text).await {
        Ok(()) => format!("Note added to ticket {ticket_id}"),
        Err(e) => {
            warn!(ticket_id, error = %e, "note append failed");
            format!("ERROR: Failed to add note to ticket {ticket_id}: {e}")
        },
    }
}

/// Resolve the person a ticket was submitted for by splitting the name on
/// its first space. Lookups that cannot succeed are skipped.
pub async fn find_contact_by_submitted_for(
    api: &dyn TicketingApi,
    submitted_for: &str,
    company_id: i64,
) -> Option<Contact> {
    let name = submitted_for.trim();
    if name.is_empty() || company_id == NO_COMPANY_ID {
        return None;
    }
    let (first, last) = name.split_once(' ')?;
    let (first, last) = (first.trim(), last.trim());
    if first.is_empty() || last.is_empty() {
        return None;
    }
    match api.search_contacts(first, last, company_id).await {
        Ok(contacts) => contacts.into_iter().next(),
        Err(e) => {
            warn!(company_id, submitted_for = name, error = %e, "contact search failed");
            None
        },
    }
}
