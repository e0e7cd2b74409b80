mod common;

use common::{FakeTicketing, Harness, RecordingDecisions, ScriptedCompletions};
use dispatch_core::audit::Stage;
use dispatch_core::completion::CompletionError;
use dispatch_core::constants::{
    CLOSING_STATUS_ID, CONTINUAL_SERVICE_IMPROVEMENT_TYPE_ID, NOC_IN_QUEUE_STATUS_ID, NO_COMPANY_ID,
    TRIAGE_REVIEW_STATUS_ID, VIP_CONTACT_TYPE_ID,
};
use dispatch_core::mutation::{Mutation, Reference};
use dispatch_core::notes::no_company_note;
use dispatch_core::{Contact, ContactType, Disposition, ExitReason, ServiceTeam, TicketRequest};

// ── helpers ──────────────────────────────────────────────────────────────

const TICKET_ID: i64 = 880_101;

fn company_ticket() -> TicketRequest {
    TicketRequest {
        ticket_id: TICKET_ID,
        company_id: 12,
        company_name: Some("Acme Dental".into()),
        summary: Some("Password reset".into()),
        initial_description: Some("Locked out of Outlook since this morning".into()),
        created_by: Some("jroe@acme.example".into()),
        ..Default::default()
    }
}

fn unresolved_ticket() -> TicketRequest {
    TicketRequest {
        company_id: NO_COMPANY_ID,
        company_name: None,
        ..company_ticket()
    }
}

const TICKET_VERDICT: &str =
    r#"{"decision": "Ticket", "intent": "Reset password", "reason": "user request", "confidence_score": 95}"#;
const L1_BOARD: &str = r#"{"intent": "ignored", "reason": "password reset is L1 work", "confidence_score": 95,
    "board_name": "L1 Service Desk", "board_id": 150}"#;
const L1_TSI: &str = r#"{"reason": "matched password reset",
    "confidence_score": 92,
    "type": {"id": 7768, "name": "Incident"},
    "subtype": {"id": 15522, "name": "Account"},
    "item": {"id": 15730, "name": "Password Reset"},
    "priority": {"id": 3, "name": "Priority 3 - Medium"}}"#;
const SUMMARY: &str = r#"{"submitted_for": "Jane Roe", "new_summary": "Outlook password reset",
    "reason": "from description", "confidence_score": 90}"#;

fn spam_verdict(score: i32) -> String {
    format!(r#"{{"decision": "Spam", "intent": "Sell SEO", "reason": "cold outreach", "confidence_score": {score}}}"#)
}

fn status_update(status: i64) -> Mutation {
    Mutation::status_only(status)
}

// ── no-company branch ────────────────────────────────────────────────────

#[tokio::test]
async fn test_certain_spam_is_closed() {
    let verdict = spam_verdict(100);
    let h = Harness::new(ScriptedCompletions::new(&[&verdict]), FakeTicketing::default());

    let out = h.pipeline().run(unresolved_ticket()).await.unwrap();

    assert_eq!(out, Disposition::EarlyExit(ExitReason::Spam));
    assert_eq!(out.message(), "Ticket closed - SPAM");
    assert_eq!(
        h.ticketing.updates(),
        vec![(
            TICKET_ID,
            Mutation {
                type_ref: Some(Reference {
                    id: CONTINUAL_SERVICE_IMPROVEMENT_TYPE_ID
                }),
                status: Some(Reference { id: CLOSING_STATUS_ID }),
                ..Default::default()
            }
        )]
    );
    let notes = h.ticketing.notes();
    assert_eq!(notes.len(), 1);
    assert!(notes[0].1.starts_with("This ticket is being closed"));
    assert!(notes[0].1.contains("Intent Found: Sell SEO"));
    assert_eq!(h.ticketing.activity_names(), vec!["SPAM Classification 100%"]);

    let records = h.decisions.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].company, "No Company");
    assert_eq!(records[0].classification.as_deref(), Some("SPAM"));
    assert_eq!(records[0].total_tokens, Some(120));
    assert_eq!(h.completions.requests().len(), 1);
}

#[tokio::test]
async fn test_possible_spam_goes_to_triage_review() {
    let verdict = spam_verdict(95);
    let h = Harness::new(ScriptedCompletions::new(&[&verdict]), FakeTicketing::default());

    let out = h.pipeline().run(unresolved_ticket()).await.unwrap();

    assert_eq!(out, Disposition::EarlyExit(ExitReason::PossibleSpam));
    assert_eq!(h.ticketing.updates(), vec![(TICKET_ID, status_update(TRIAGE_REVIEW_STATUS_ID))]);
    assert_eq!(h.ticketing.activity_names(), vec!["Possible SPAM Classification"]);
    assert!(h.ticketing.notes()[0].1.contains("95% for a SPAM classification"));
}

#[tokio::test]
async fn test_legitimate_ticket_without_company_goes_to_triage_review() {
    let h = Harness::new(ScriptedCompletions::new(&[TICKET_VERDICT]), FakeTicketing::default());

    let out = h.pipeline().run(unresolved_ticket()).await.unwrap();

    assert_eq!(out, Disposition::EarlyExit(ExitReason::NoCompany));
    assert_eq!(h.ticketing.updates(), vec![(TICKET_ID, status_update(TRIAGE_REVIEW_STATUS_ID))]);
    assert_eq!(h.ticketing.notes(), vec![(TICKET_ID, no_company_note())]);
    assert!(h.ticketing.activity_names().is_empty());
    assert_eq!(h.decisions.records()[0].classification.as_deref(), Some("Ticket"));
}

#[tokio::test]
async fn test_uncertain_spam_continues_to_full_classification() {
    let verdict = spam_verdict(90);
    let h = Harness::new(
        ScriptedCompletions::new(&[&verdict, L1_BOARD, L1_TSI, SUMMARY]),
        FakeTicketing::default(),
    );

    let out = h.pipeline().run(unresolved_ticket()).await.unwrap();

    let Disposition::Completed(run) = out else {
        panic!("expected a completed run, got {out:?}");
    };
    assert_eq!(run.board_id, Some(150));
    // Spam activities only fire on exact scores.
    assert_eq!(h.ticketing.activity_names(), vec!["Successful Board Classification"]);
    // Unresolved organization never searches contacts.
    assert!(h.ticketing.searches.lock().unwrap().is_empty());
    let stages: Vec<Stage> = h.decisions.records().iter().map(|r| r.stage).collect();
    assert_eq!(
        stages,
        vec![Stage::TicketType, Stage::BoardRouting, Stage::TsiClassification, Stage::Summary]
    );
}

// ── company branch exits ─────────────────────────────────────────────────

#[tokio::test]
async fn test_info_alert_exits_before_routing() {
    let verdict = r#"{"decision": "Info-Alert", "intent": "Webinar invite", "reason": "newsletter", "confidence_score": 97}"#;
    let h = Harness::new(ScriptedCompletions::new(&[verdict]), FakeTicketing::default());

    let out = h.pipeline().run(company_ticket()).await.unwrap();

    assert_eq!(out, Disposition::EarlyExit(ExitReason::InfoAlert));
    assert_eq!(h.ticketing.updates(), vec![(TICKET_ID, status_update(TRIAGE_REVIEW_STATUS_ID))]);
    assert!(h.ticketing.notes()[0].1.contains("Info-Alert classification"));
    assert!(h.ticketing.activity_names().is_empty());
    assert_eq!(h.completions.requests().len(), 1);
    assert_eq!(h.decisions.records()[0].company, "Acme Dental");
}

#[tokio::test]
async fn test_low_board_confidence_skips_tsi_and_summary() {
    let board = r#"{"reason": "unclear", "confidence_score": 85, "board_name": "L2 Service Desk", "board_id": 151}"#;
    let h = Harness::new(ScriptedCompletions::new(&[TICKET_VERDICT, board]), FakeTicketing::default());

    let out = h.pipeline().run(company_ticket()).await.unwrap();

    assert_eq!(out, Disposition::EarlyExit(ExitReason::LowBoardConfidence));
    assert_eq!(h.completions.requests().len(), 2);
    assert_eq!(h.ticketing.activity_names(), vec!["Unsuccessful Board Classification"]);
    assert_eq!(h.ticketing.updates(), vec![(TICKET_ID, status_update(TRIAGE_REVIEW_STATUS_ID))]);
    let note = &h.ticketing.notes()[0].1;
    assert!(note.contains("less than 90%"));
    assert!(note.contains("Board Classification: L2 Service Desk"));
    assert!(note.contains("Intent Found: Reset password"));
}

#[tokio::test]
async fn test_non_service_board_exits_after_activity() {
    let board = r#"{"reason": "hardware quote", "confidence_score": 96, "board_name": "Client Strategy", "board_id": 54}"#;
    let h = Harness::new(ScriptedCompletions::new(&[TICKET_VERDICT, board]), FakeTicketing::default());

    let out = h.pipeline().run(company_ticket()).await.unwrap();

    assert_eq!(out, Disposition::EarlyExit(ExitReason::NonServiceBoard));
    assert_eq!(h.ticketing.activity_names(), vec!["Successful Board Classification"]);
    assert!(h.ticketing.notes()[0].1.contains("Non-Service board"));
    assert_eq!(h.completions.requests().len(), 2);
}

// ── full classification ──────────────────────────────────────────────────

#[tokio::test]
async fn test_full_run_writes_classification_back() {
    let mut ticket = company_ticket();
    ticket.contact_id = Some(4411);
    let contact = Contact {
        id: 4411,
        first_name: Some("Jane".into()),
        last_name: Some("Roe".into()),
        types: vec![ContactType {
            id: VIP_CONTACT_TYPE_ID,
            name: Some("VIP".into()),
        }],
    };
    let h = Harness::new(
        ScriptedCompletions::new(&[TICKET_VERDICT, L1_BOARD, L1_TSI, SUMMARY]),
        FakeTicketing::default().with_contact(contact),
    );

    let out = h.pipeline().run(ticket).await.unwrap();

    let Disposition::Completed(run) = out else {
        panic!("expected a completed run, got {out:?}");
    };
    assert_eq!(run.summary, "VIP | Jane Roe | Outlook password reset");
    assert!(run.is_vip);
    assert_eq!(run.board_name.as_deref(), Some("L1 Service Desk"));
    assert_eq!(run.type_name.as_deref(), Some("Incident"));
    assert_eq!(run.type_id, Some(7768));
    assert!(!run.proposed_note_sent);
    assert!(run.update_result.starts_with("Updated ticket 880101"));

    let updates = h.ticketing.updates();
    assert_eq!(updates.len(), 1);
    let m = &updates[0].1;
    assert_eq!(m.summary.as_deref(), Some("VIP | Jane Roe | Outlook password reset"));
    assert_eq!(m.board, Some(Reference { id: 150 }));
    assert_eq!(m.item, Some(Reference { id: 15730 }));
    assert_eq!(m.priority, Some(Reference { id: 3 }));
    assert_eq!(m.contact, Some(Reference { id: 4411 }));
    assert_eq!(m.status, None);
    assert_eq!(m.skip_callback, Some(true));

    let note = &h.ticketing.notes()[0].1;
    assert!(note.contains("**Decision:** Password Reset"));

    let requests = h.completions.requests();
    let models: Vec<&str> = requests.iter().map(|r| r.model.as_str()).collect();
    assert_eq!(models, vec!["gpt-4o", "o3-mini", "o3-mini", "gpt-4o"]);
    assert_eq!(requests[2].max_tokens, Some(15000));
    assert_eq!(requests[3].max_tokens, Some(500));
    // Intent from the first stage is handed to every later stage.
    assert!(requests[1].user_input.contains("Intent: Reset password"));
    assert!(requests[3].user_input.contains("Intent: Reset password"));
}

#[tokio::test]
async fn test_contact_lookup_failure_is_not_fatal() {
    let mut ticket = company_ticket();
    ticket.contact_id = Some(999);
    let h = Harness::new(
        ScriptedCompletions::new(&[TICKET_VERDICT, L1_BOARD, L1_TSI, SUMMARY]),
        FakeTicketing::default(),
    );

    let out = h.pipeline().run(ticket).await.unwrap();

    let Disposition::Completed(run) = out else {
        panic!("expected a completed run, got {out:?}");
    };
    assert!(!run.is_vip);
    assert_eq!(run.summary, "Jane Roe | Outlook password reset");
    assert_eq!(h.ticketing.updates()[0].1.contact, None);
    assert!(h.ticketing.searches.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_contact_id_falls_back_to_submitted_for() {
    let found = Contact {
        id: 5150,
        first_name: Some("Jane".into()),
        last_name: Some("Roe".into()),
        types: vec![],
    };
    let h = Harness::new(
        ScriptedCompletions::new(&[TICKET_VERDICT, L1_BOARD, L1_TSI, SUMMARY]),
        FakeTicketing::default().with_searchable(found),
    );

    h.pipeline().run(company_ticket()).await.unwrap();

    assert_eq!(
        *h.ticketing.searches.lock().unwrap(),
        vec![("Jane".to_string(), "Roe".to_string(), 12)]
    );
    assert_eq!(h.ticketing.updates()[0].1.contact, Some(Reference { id: 5150 }));
}

#[tokio::test]
async fn test_hydra_l2_ticket_gets_proposed_note() {
    let mut ticket = company_ticket();
    ticket.not_streamline_client = true;
    ticket.it_glue_org_id = 3021;
    ticket.service_team = Some(ServiceTeam {
        id: 8,
        name: "Hydra".into(),
    });
    let board = r#"{"reason": "VPN", "confidence_score": 93, "board_name": "L2 Service Desk", "board_id": "151"}"#;
    let tsi = r#"{"reason": {"type": "t", "subtype": "s", "item": "i", "priority": "p"}, "confidence_score": 90,
        "type": {"id": 7768, "name": "Incident"}}"#;
    let h = Harness::new(
        ScriptedCompletions::new(&[TICKET_VERDICT, board, tsi, SUMMARY]),
        FakeTicketing::default(),
    );

    let Disposition::Completed(run) = h.pipeline().run(ticket).await.unwrap() else {
        panic!("expected a completed run");
    };

    assert!(run.proposed_note_sent);
    let sent = h.proposed.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].ticket_id, "880101");
    assert_eq!(sent[0].board, "L2 Service Desk");
    assert_eq!(sent[0].intent, "Reset password");
    assert_eq!(sent[0].it_glue_org_id, "3021");
    assert_eq!(sent[0].summary, run.summary);

    let tsi_record = h
        .decisions
        .records()
        .into_iter()
        .find(|r| r.stage == Stage::TsiClassification)
        .unwrap();
    assert_eq!(tsi_record.type_name.as_deref(), Some("Incident"));
    assert_eq!(tsi_record.subtype, None);
    assert!(tsi_record.reason.unwrap().contains(r#""subtype":"s""#));
}

#[tokio::test]
async fn test_noc_board_sets_in_queue_status() {
    let board = r#"{"reason": "backup alert", "confidence_score": 98, "board_name": "Network Operations Center", "board_id": 52}"#;
    let tsi = r#"{"reason": "backup", "confidence_score": 95,
        "type": {"id": 2799, "name": "Backups"}, "subtype": {"id": 10371, "name": "Restore"}}"#;
    let h = Harness::new(
        ScriptedCompletions::new(&[TICKET_VERDICT, board, tsi, SUMMARY]),
        FakeTicketing::default(),
    );

    h.pipeline().run(company_ticket()).await.unwrap();

    let m = &h.ticketing.updates()[0].1;
    assert_eq!(m.status, Some(Reference { id: NOC_IN_QUEUE_STATUS_ID }));
    assert_eq!(m.subtype, Some(Reference { id: 10371 }));
    assert_eq!(m.item, None);
}

// ── failures ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_stage_failure_alerts_and_propagates() {
    let h = Harness::new(
        ScriptedCompletions::new(&[TICKET_VERDICT]).then_fail(CompletionError::Timeout),
        FakeTicketing::default(),
    );

    let err = h.pipeline().run(company_ticket()).await.unwrap_err();

    assert!(format!("{err:#}").contains("board routing failed"));
    assert_eq!(h.alerts(), vec!["Dispatch Triage Failure"]);
    assert!(h.ticketing.updates().is_empty());
}

#[tokio::test]
async fn test_no_company_failure_uses_its_own_alert() {
    let h = Harness::new(
        ScriptedCompletions::default().then_fail(CompletionError::Provider {
            status: 429,
            body: "rate limited".into(),
        }),
        FakeTicketing::default(),
    );

    assert!(h.pipeline().run(unresolved_ticket()).await.is_err());
    assert_eq!(h.alerts(), vec!["Change Me SPAM Classification Failure"]);
}

#[tokio::test]
async fn test_malformed_completion_is_fatal() {
    let h = Harness::new(ScriptedCompletions::new(&["not json at all"]), FakeTicketing::default());

    let err = h.pipeline().run(company_ticket()).await.unwrap_err();

    assert!(format!("{err:#}").contains("ticket type classification failed"));
    assert_eq!(h.alerts().len(), 1);
}

#[tokio::test]
async fn test_decision_log_failure_is_fatal() {
    let h = Harness::with_decisions(
        ScriptedCompletions::new(&[TICKET_VERDICT, L1_BOARD]),
        FakeTicketing::default(),
        RecordingDecisions::failing(),
    );

    let err = h.pipeline().run(company_ticket()).await.unwrap_err();

    assert!(format!("{err:#}").contains("decision store unavailable"));
    assert_eq!(h.completions.requests().len(), 1);
    assert!(h.ticketing.updates().is_empty());
    assert_eq!(h.alerts(), vec!["Dispatch Triage Failure"]);
}
