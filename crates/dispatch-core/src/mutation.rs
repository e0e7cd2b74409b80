//! Ticket field updates, their JSON-patch form, and the fallback cascade
//! applied to the final update.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::constants::{CLOSING_STATUS_ID, CONTINUAL_SERVICE_IMPROVEMENT_TYPE_ID, TRIAGE_REVIEW_STATUS_ID};
use crate::retry::RetryPolicy;
use crate::ticketing::{TicketingApi, TicketingError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub id: i64,
}

impl From<i64> for Reference {
    fn from(id: i64) -> Self {
        Self { id }
    }
}

/// Field replacements for one ticket. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mutation {
    pub summary: Option<String>,
    pub board: Option<Reference>,
    pub type_ref: Option<Reference>,
    pub subtype: Option<Reference>,
    pub item: Option<Reference>,
    pub priority: Option<Reference>,
    pub contact: Option<Reference>,
    pub status: Option<Reference>,
    pub skip_callback: Option<bool>,
}

fn type_name(id: i64) -> String {
    match id {
        CONTINUAL_SERVICE_IMPROVEMENT_TYPE_ID => "Continual Service Improvement".to_string(),
        _ => format!("TypeId-{id}"),
    }
}

fn status_name(id: i64) -> String {
    match id {
        TRIAGE_REVIEW_STATUS_ID => "Triage Review".to_string(),
        CLOSING_STATUS_ID => "Closing".to_string(),
        _ => format!("StatusId-{id}"),
    }
}

impl Mutation {
    pub fn status_only(status_id: i64) -> Self {
        Self {
            status: Some(status_id.into()),
            ..Default::default()
        }
    }

    /// `replace` operations for every present field, in ConnectWise field order.
    pub fn patch_ops(&self) -> Vec<Value> {
        fn op(path: &str, value: Value) -> Value {
            json!({ "op": "replace", "path": path, "value": value })
        }
        fn reference(path: &str, r: &Option<Reference>) -> Option<Value> {
            r.map(|r| op(path, json!({ "id": r.id })))
        }

        [
            self.summary.as_ref().map(|s| op("/summary", json!(s))),
            reference("/board", &self.board),
            reference("/type", &self.type_ref),
            reference("/subType", &self.subtype),
            reference("/item", &self.item),
            reference("/priority", &self.priority),
            reference("/contact", &self.contact),
            reference("/status", &self.status),
            self.skip_callback.map(|b| op("/skipCallback", json!(b))),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    pub fn without_item(&self) -> Self {
        Self {
            item: None,
            ..self.clone()
        }
    }

    /// Drops item and subtype; the type pick stays.
    pub fn type_only(&self) -> Self {
        Self {
            item: None,
            subtype: None,
            ..self.clone()
        }
    }

    /// Human-readable account of what a successful update changed.
    pub fn describe(&self, ticket_id: i64) -> String {
        let mut parts = vec![format!("Updated ticket {ticket_id}")];
        if let Some(s) = &self.summary {
            parts.push(format!("Summary: {s}"));
        }
        if let Some(r) = self.board {
            parts.push(format!("BoardId: {}", r.id));
        }
        if let Some(r) = self.type_ref {
            parts.push(format!("Type: {} (Id: {})", type_name(r.id), r.id));
        }
        if let Some(r) = self.subtype {
            parts.push(format!("SubtypeId: {}", r.id));
        }
        if let Some(r) = self.item {
            parts.push(format!("ItemId: {}", r.id));
        }
        if let Some(r) = self.priority {
            parts.push(format!("PriorityId: {}", r.id));
        }
        if let Some(r) = self.contact {
            parts.push(format!("ContactId: {}", r.id));
        }
        if let Some(r) = self.status {
            parts.push(format!("Status: {} (Id: {})", status_name(r.id), r.id));
        }
        if let Some(b) = self.skip_callback {
            parts.push(format!("SkipCallback: {b}"));
        }
        parts.join(", ")
    }
}

// ── Fallback cascade ─────────────────────────────────────────────────────

async fn attempt_fallback(
    api: &dyn TicketingApi,
    ticket_id: i64,
    mutation: &Mutation,
) -> Result<String, TicketingError> {
    api.update_ticket(ticket_id, mutation).await?;
    Ok(mutation.describe(ticket_id))
}

/// Apply the final update, degrading on known failure shapes:
/// a 5xx gets one delayed retry; a 400 naming `item` drops the item, and a
/// further 400 naming `subtype` drops the subtype as well.
///
/// Never fails; the returned string starts with `RETRY:`, `FALLBACK` or
/// `ERROR:` whenever the full update did not go through on the first try.
pub async fn apply_with_fallback(
    api: &dyn TicketingApi,
    ticket_id: i64,
    mutation: &Mutation,
    policy: RetryPolicy<TicketingError>,
) -> String {
    let outcome = policy
        .run("update_ticket", |_| api.update_ticket(ticket_id, mutation))
        .await;

    let retried = outcome.retried();
    let err = match outcome.result {
        Ok(()) if retried => return format!("RETRY: {}", mutation.describe(ticket_id)),
        Ok(()) => {
            let desc = mutation.describe(ticket_id);
            info!(ticket_id, "{desc}");
            return desc;
        },
        Err(e) => e,
    };

    if retried {
        error!(ticket_id, error = %err, "ticket update retry failed");
        return format!("ERROR: Retry failed for ticket {ticket_id}: {err}");
    }

    if !err.is_bad_request_mentioning("item") {
        error!(ticket_id, error = %err, "ticket update failed");
        return format!("ERROR: Failed to update ticket {ticket_id}: {err}");
    }

    warn!(ticket_id, error = %err, "item rejected, retrying without item");
    let err = match attempt_fallback(api, ticket_id, &mutation.without_item()).await {
        Ok(desc) => {
            info!(ticket_id, "fallback (no item) successful");
            return format!("FALLBACK (no item): {desc}");
        },
        Err(e) if e.is_bad_request_mentioning("subtype") => e,
        Err(e) => {
            error!(ticket_id, error = %e, "all fallback attempts failed");
            return format!("ERROR: All fallback attempts failed for ticket {ticket_id}: {e}");
        },
    };

    warn!(ticket_id, error = %err, "subtype rejected, retrying with type only");
    match attempt_fallback(api, ticket_id, &mutation.type_only()).await {
        Ok(desc) => {
            info!(ticket_id, "fallback (type only) successful");
            format!("FALLBACK (type only): {desc}")
        },
        Err(e) => {
            error!(ticket_id, error = %e, "all fallback attempts failed");
            format!("ERROR: All fallback attempts failed for ticket {ticket_id}: {e}")
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full() -> Mutation {
        Mutation {
            summary: Some("Jane Roe | Install Visio".into()),
            board: Some(151.into()),
            type_ref: Some(7768.into()),
            subtype: Some(2001.into()),
            item: Some(3001.into()),
            priority: Some(8.into()),
            contact: Some(77.into()),
            status: None,
            skip_callback: Some(true),
        }
    }

    #[test]
    fn test_patch_ops_in_field_order() {
        let paths: Vec<String> = full()
            .patch_ops()
            .iter()
            .map(|op| op["path"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(
            paths,
            [
                "/summary",
                "/board",
                "/type",
                "/subType",
                "/item",
                "/priority",
                "/contact",
                "/skipCallback"
            ]
        );
        let ops = full().patch_ops();
        assert_eq!(ops[1], json!({"op": "replace", "path": "/board", "value": {"id": 151}}));
        assert_eq!(ops[7]["value"], json!(true));
    }

    #[test]
    fn test_fallback_payloads_only_drop_fields() {
        let full_ops = full().patch_ops();
        let no_item: Vec<Value> = full_ops
            .iter()
            .filter(|op| op["path"] != "/item")
            .cloned()
            .collect();
        assert_eq!(
            serde_json::to_string(&full().without_item().patch_ops()).unwrap(),
            serde_json::to_string(&no_item).unwrap()
        );

        let type_only: Vec<Value> = full_ops
            .iter()
            .filter(|op| op["path"] != "/item" && op["path"] != "/subType")
            .cloned()
            .collect();
        assert_eq!(
            serde_json::to_string(&full().type_only().patch_ops()).unwrap(),
            serde_json::to_string(&type_only).unwrap()
        );
    }

    #[test]
    fn test_empty_mutation_has_no_ops() {
        assert!(Mutation::default().patch_ops().is_empty());
    }

    #[test]
    fn test_describe_names_known_ids() {
        let m = Mutation {
            type_ref: Some(CONTINUAL_SERVICE_IMPROVEMENT_TYPE_ID.into()),
            status: Some(CLOSING_STATUS_ID.into()),
            ..Default::default()
        };
        assert_eq!(
            m.describe(9),
            "Updated ticket 9, Type: Continual Service Improvement (Id: 7864), Status: Closing (Id: 163)"
        );
        assert_eq!(
            Mutation::status_only(1052).describe(9),
            "Updated ticket 9, Status: StatusId-1052 (Id: 1052)"
        );
    }

    #[test]
    fn test_describe_full_mutation() {
        assert_eq!(
            full().describe(42),
            "Updated ticket 42, Summary: Jane Roe | Install Visio, BoardId: 151, Type: TypeId-7768 (Id: 7768), \
             SubtypeId: 2001, ItemId: 3001, PriorityId: 8, ContactId: 77, SkipCallback: true"
        );
    }
}
