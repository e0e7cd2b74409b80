#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use dispatch_core::activities::ActivityRequest;
use dispatch_core::audit::{DecisionLog, DecisionRecord};
use dispatch_core::completion::{CompletionBackend, CompletionError, CompletionRequest, RawCompletion};
use dispatch_core::mutation::Mutation;
use dispatch_core::notify::{Alerter, ProposedNote, ProposedNoteSink};
use dispatch_core::pipeline::{Models, Pipeline};
use dispatch_core::retry::RetryPolicy;
use dispatch_core::schema::SchemaCache;
use dispatch_core::ticketing::{TicketingApi, TicketingError};
use dispatch_core::{Contact, TokenUsage};

// ── Completion ───────────────────────────────────────────────────────────

/// Replies handed out in call order; running dry is a transport error.
#[derive(Default)]
pub struct ScriptedCompletions {
    replies: Mutex<VecDeque<Result<String, CompletionError>>>,
    pub requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedCompletions {
    pub fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| Ok(r.to_string())).collect()),
            requests: Mutex::default(),
        }
    }

    pub fn then_fail(self, err: CompletionError) -> Self {
        self.replies.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionBackend for ScriptedCompletions {
    async fn complete(&self, request: &CompletionRequest) -> Result<RawCompletion, CompletionError> {
        self.requests.lock().unwrap().push(request.clone());
        let next = self.replies.lock().unwrap().pop_front();
        let text = next.unwrap_or_else(|| Err(CompletionError::Transport("no scripted reply".into())))?;
        Ok(RawCompletion {
            text,
            usage: TokenUsage {
                prompt_tokens: 100,
                completion_tokens: 20,
                total_tokens: 120,
            },
            model: request.model.clone(),
        })
    }
}

// ── Ticketing ────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeTicketing {
    pub update_results: Mutex<VecDeque<Result<(), TicketingError>>>,
    pub updates: Mutex<Vec<(i64, Mutation)>>,
    pub notes: Mutex<Vec<(i64, String)>>,
    pub activities: Mutex<Vec<ActivityRequest>>,
    pub contact: Option<Contact>,
    pub searchable: Vec<Contact>,
    pub searches: Mutex<Vec<(String, String, i64)>>,
}

impl FakeTicketing {
    pub fn with_contact(mut self, contact: Contact) -> Self {
        self.contact = Some(contact);
        self
    }

    pub fn with_searchable(mut self, contact: Contact) -> Self {
        self.searchable.push(contact);
        self
    }

    pub fn with_update_results(self, results: Vec<Result<(), TicketingError>>) -> Self {
        *self.update_results.lock().unwrap() = results.into();
        self
    }

    pub fn updates(&self) -> Vec<(i64, Mutation)> {
        self.updates.lock().unwrap().clone()
    }

    pub fn notes(&self) -> Vec<(i64, String)> {
        self.notes.lock().unwrap().clone()
    }

    pub fn activity_names(&self) -> Vec<String> {
        self.activities.lock().unwrap().iter().map(|a| a.name.clone()).collect()
    }
}

#[async_trait]
impl TicketingApi for FakeTicketing {
    async fn update_ticket(&self, ticket_id: i64, mutation: &Mutation) -> Result<(), TicketingError> {
        self.updates.lock().unwrap().push((ticket_id, mutation.clone()));
        self.update_results.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }

    async fn add_note(&self, ticket_id: i64, text: &str) -> Result<(), TicketingError> {
        self.notes.lock().unwrap().push((ticket_id, text.to_string()));
        Ok(())
    }

    async fn create_activity(&self, activity: &ActivityRequest) -> Result<(), TicketingError> {
        self.activities.lock().unwrap().push(activity.clone());
        Ok(())
    }

    async fn get_contact(&self, contact_id: i64) -> Result<Contact, TicketingError> {
        self.contact.clone().ok_or(TicketingError::Status {
            status: 404,
            body: format!("contact {contact_id} not found"),
        })
    }

    async fn search_contacts(
        &self,
        first_name: &str,
        last_name: &str,
        company_id: i64,
    ) -> Result<Vec<Contact>, TicketingError> {
        self.searches
            .lock()
            .unwrap()
            .push((first_name.to_string(), last_name.to_string(), company_id));
        Ok(self.searchable.clone())
    }
}

// ── Side channels ────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingDecisions {
    pub records: Mutex<Vec<DecisionRecord>>,
    pub fail: bool,
}

impl RecordingDecisions {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn records(&self) -> Vec<DecisionRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl DecisionLog for RecordingDecisions {
    async fn record(&self, record: &DecisionRecord) -> Result<()> {
        if self.fail {
            bail!("decision store unavailable");
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingAlerter {
    pub alerts: Mutex<Vec<String>>,
}

#[async_trait]
impl Alerter for RecordingAlerter {
    async fn send_alert(&self, message: &str) {
        self.alerts.lock().unwrap().push(message.to_string());
    }
}

#[derive(Default)]
pub struct RecordingNotes {
    pub sent: Mutex<Vec<ProposedNote>>,
    pub fail: bool,
}

#[async_trait]
impl ProposedNoteSink for RecordingNotes {
    async fn send(&self, note: &ProposedNote) -> Result<()> {
        if self.fail {
            bail!("proposed note endpoint returned 503");
        }
        self.sent.lock().unwrap().push(note.clone());
        Ok(())
    }
}

// ── Harness ──────────────────────────────────────────────────────────────

pub struct Harness {
    pub completions: Arc<ScriptedCompletions>,
    pub ticketing: Arc<FakeTicketing>,
    pub decisions: Arc<RecordingDecisions>,
    pub alerter: Arc<RecordingAlerter>,
    pub proposed: Arc<RecordingNotes>,
}

impl Harness {
    pub fn new(completions: ScriptedCompletions, ticketing: FakeTicketing) -> Self {
        Self::with_decisions(completions, ticketing, RecordingDecisions::default())
    }

    pub fn with_decisions(
        completions: ScriptedCompletions,
        ticketing: FakeTicketing,
        decisions: RecordingDecisions,
    ) -> Self {
        Self {
            completions: Arc::new(completions),
            ticketing: Arc::new(ticketing),
            decisions: Arc::new(decisions),
            alerter: Arc::default(),
            proposed: Arc::default(),
        }
    }

    pub fn pipeline(&self) -> Pipeline {
        Pipeline::new(
            self.completions.clone(),
            self.ticketing.clone(),
            self.decisions.clone(),
            self.alerter.clone(),
            Arc::new(SchemaCache::embedded()),
            Models {
                base: "gpt-4o".into(),
                reasoning: "o3-mini".into(),
            },
        )
        .with_proposed_notes(self.proposed.clone())
        .with_mutation_retry(RetryPolicy::semantic().with_delay(Duration::ZERO))
    }

    pub fn alerts(&self) -> Vec<String> {
        self.alerter.alerts.lock().unwrap().clone()
    }
}
