use std::ops::ControlFlow;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use tracing::{error, info, warn};

use crate::activities::{create_activities, plan_activities};
use crate::audit::{DecisionLog, DecisionRecord, Stage};
use crate::completion::{complete_as, CompletionBackend, CompletionRequest};
use crate::constants::{
    CERTAIN_SPAM_CONFIDENCE, CLOSING_STATUS_ID, CONTINUAL_SERVICE_IMPROVEMENT_TYPE_ID, NOC_BOARD_ID,
    NOC_IN_QUEUE_STATUS_ID, NO_COMPANY_ID, POSSIBLE_SPAM_CONFIDENCE, TRIAGE_REVIEW_STATUS_ID,
};
use crate::inputs::{board_routing_input, clean_summary, summary_input, triage_input, tsi_input};
use crate::mutation::{apply_with_fallback, Mutation, Reference};
use crate::notes::{build_summary, exit_note, success_note, NoteInputs};
use crate::notify::{Alerter, ProposedNote, ProposedNoteSink};
use crate::policy::{is_low_confidence, is_non_service_board, is_vip, proposed_note_eligibility};
use crate::prompts::{board_prompt, spam_prompt, summary_prompt, ticket_type_prompt, tsi_prompt};
use crate::retry::RetryPolicy;
use crate::schema::SchemaCache;
use crate::ticketing::{
    add_note_reporting, find_contact_by_submitted_for, update_ticket_reporting, TicketingApi, TicketingError,
};
use crate::types::{
    BoardDecision, CompletedRun, Contact, Disposition, ExitReason, SummaryDecision, TicketRequest, TriageDecision,
    TsiDecision, TsiPick, DECISION_INFO_ALERT, DECISION_SPAM, DECISION_TICKET,
};

const TRIAGE_MAX_TOKENS: u32 = 1500;
const BOARD_MAX_TOKENS: u32 = 3000;
const TSI_MAX_TOKENS: u32 = 15000;
const SUMMARY_MAX_TOKENS: u32 = 500;

const NO_COMPANY_FAILURE_ALERT: &str = "Change Me SPAM Classification Failure";
const TRIAGE_FAILURE_ALERT: &str = "Dispatch Triage Failure";

// ── Context ──────────────────────────────────────────────────────────────

/// Assembled output of the finalize step.
#[derive(Debug, Clone, PartialEq)]
pub struct Assembly {
    pub summary: String,
    pub note: String,
    pub mutation: Mutation,
}

/// What one stage adds to the context.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextDelta {
    Spam(TriageDecision),
    TicketType(TriageDecision),
    Board(BoardDecision),
    Tsi(TsiDecision),
    Summary(SummaryDecision),
    Contact(Option<Contact>),
    Assembled(Assembly),
}

/// Result of running one stage.
#[derive(Debug, Clone, PartialEq)]
pub enum StageFlow {
    Continue(ContextDelta),
    Exit(ExitReason),
}

/// Everything known about a ticket within one invocation. Built up only
/// through [`PipelineContext::merge`]; each stage kind lands at most once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineContext {
    pub ticket: TicketRequest,
    pub spam: Option<TriageDecision>,
    pub ticket_type: Option<TriageDecision>,
    pub board: Option<BoardDecision>,
    pub tsi: Option<TsiDecision>,
    pub summary: Option<SummaryDecision>,
    /// Captured from the first classification stage and reused verbatim.
    pub intent: Option<String>,
    pub contact: Option<Contact>,
    pub contact_resolved: bool,
    pub is_vip: bool,
    pub assembly: Option<Assembly>,
}

fn set_once<T>(slot: Option<T>, value: T, kind: &str) -> Result<Option<T>> {
    if slot.is_some() {
        bail!("duplicate {kind} outcome");
    }
    Ok(Some(value))
}

impl PipelineContext {
    pub fn new(ticket: TicketRequest) -> Self {
        Self {
            ticket,
            ..Default::default()
        }
    }

    pub fn ticket_id(&self) -> i64 {
        self.ticket.ticket_id
    }

    pub fn is_no_company(&self) -> bool {
        self.ticket.company_id == NO_COMPANY_ID
    }

    pub fn merge(self, delta: ContextDelta) -> Result<Self> {
        let mut next = self;
        match delta {
            ContextDelta::Spam(d) => {
                next.intent = next.intent.or_else(|| d.intent.clone());
                next.spam = set_once(next.spam, d, "spam")?;
            },
            ContextDelta::TicketType(d) => {
                next.intent = next.intent.or_else(|| d.intent.clone());
                next.ticket_type = set_once(next.ticket_type, d, "ticket type")?;
            },
            ContextDelta::Board(d) => next.board = set_once(next.board, d, "board")?,
            ContextDelta::Tsi(d) => next.tsi = set_once(next.tsi, d, "TSI")?,
            ContextDelta::Summary(d) => next.summary = set_once(next.summary, d, "summary")?,
            ContextDelta::Contact(c) => {
                if next.contact_resolved {
                    bail!("duplicate contact outcome");
                }
                next.is_vip = is_vip(c.as_ref());
                next.contact = c;
                next.contact_resolved = true;
            },
            ContextDelta::Assembled(a) => next.assembly = set_once(next.assembly, a, "assembly")?,
        }
        Ok(next)
    }

    fn note_inputs(&self) -> NoteInputs<'_> {
        NoteInputs {
            spam: self.spam.as_ref(),
            ticket_type: self.ticket_type.as_ref(),
            board: self.board.as_ref(),
            tsi: self.tsi.as_ref(),
            intent: self.intent.as_deref(),
        }
    }

    fn board_id(&self) -> Option<i64> {
        self.board.as_ref().and_then(|b| b.board_id)
    }
}

/// Fold a stage result into the context, or stop with the exit reason.
pub fn advance(ctx: PipelineContext, flow: StageFlow) -> Result<ControlFlow<ExitReason, PipelineContext>> {
    match flow {
        StageFlow::Continue(delta) => Ok(ControlFlow::Continue(ctx.merge(delta)?)),
        StageFlow::Exit(reason) => Ok(ControlFlow::Break(reason)),
    }
}

/// Fields written back to a fully classified ticket.
pub fn final_mutation(ctx: &PipelineContext, summary: &str) -> Mutation {
    let pick = |p: &Option<TsiPick>| p.as_ref().and_then(|p| p.id).map(Reference::from);
    let tsi = ctx.tsi.as_ref();
    let board_id = ctx.board_id();
    Mutation {
        summary: Some(summary.to_string()),
        board: board_id.map(Reference::from),
        type_ref: tsi.and_then(|t| pick(&t.type_pick)),
        subtype: tsi.and_then(|t| pick(&t.subtype)),
        item: tsi.and_then(|t| pick(&t.item)),
        priority: tsi.and_then(|t| pick(&t.priority)),
        contact: ctx.contact.as_ref().map(|c| Reference::from(c.id)),
        status: (board_id == Some(NOC_BOARD_ID)).then_some(Reference::from(NOC_IN_QUEUE_STATUS_ID)),
        skip_callback: Some(true),
    }
}

// ── Pipeline ─────────────────────────────────────────────────────────────

/// Deployment names per model class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Models {
    pub base: String,
    pub reasoning: String,
}

pub struct Pipeline {
    completion: Arc<dyn CompletionBackend>,
    ticketing: Arc<dyn TicketingApi>,
    decisions: Arc<dyn DecisionLog>,
    alerter: Arc<dyn Alerter>,
    proposed_notes: Option<Arc<dyn ProposedNoteSink>>,
    schemas: Arc<SchemaCache>,
    models: Models,
    mutation_retry: RetryPolicy<TicketingError>,
}

impl Pipeline {
    pub fn new(
        completion: Arc<dyn CompletionBackend>,
        ticketing: Arc<dyn TicketingApi>,
        decisions: Arc<dyn DecisionLog>,
        alerter: Arc<dyn Alerter>,
        schemas: Arc<SchemaCache>,
        models: Models,
    ) -> Self {
        Self {
            completion,
            ticketing,
            decisions,
            alerter,
            proposed_notes: None,
            schemas,
            models,
            mutation_retry: RetryPolicy::semantic(),
        }
    }

    pub fn with_proposed_notes(mut self, sink: Arc<dyn ProposedNoteSink>) -> Self {
        self.proposed_notes = Some(sink);
        self
    }

    pub fn with_mutation_retry(mut self, policy: RetryPolicy<TicketingError>) -> Self {
        self.mutation_retry = policy;
        self
    }

    /// Classify and route one ticket. On failure the operator alert is sent
    /// before the error is returned.
    pub async fn run(&self, ticket: TicketRequest) -> Result<Disposition> {
        let ticket_id = ticket.ticket_id;
        let no_company = ticket.company_id == NO_COMPANY_ID;
        log_intake(&ticket);

        match self.run_stages(ticket).await {
            Ok(disposition) => {
                info!(ticket_id, outcome = disposition.message(), "dispatch finished");
                Ok(disposition)
            },
            Err(e) => {
                let msg = format!("{e:#}");
                error!(ticket_id, error = %msg, "dispatch failed");
                let alert = if no_company { NO_COMPANY_FAILURE_ALERT } else { TRIAGE_FAILURE_ALERT };
                self.alerter.send_alert(alert).await;
                Err(e)
            },
        }
    }

    async fn run_stages(&self, ticket: TicketRequest) -> Result<Disposition> {
        let ctx = PipelineContext::new(clean_summary(ticket));

        let first = if ctx.is_no_company() {
            self.spam_stage(&ctx).await?
        } else {
            self.ticket_type_stage(&ctx).await?
        };
        let ctx = match advance(ctx, first)? {
            ControlFlow::Continue(ctx) => ctx,
            ControlFlow::Break(reason) => return Ok(Disposition::EarlyExit(reason)),
        };

        let flow = self.board_stage(&ctx).await?;
        let ctx = match advance(ctx, flow)? {
            ControlFlow::Continue(ctx) => ctx,
            ControlFlow::Break(reason) => return Ok(Disposition::EarlyExit(reason)),
        };

        let plan = plan_activities(ctx.ticket_id(), ctx.spam.as_ref(), ctx.board.as_ref(), Utc::now());
        let activities = create_activities(self.ticketing.as_ref(), &plan).await;
        info!(ticket_id = ctx.ticket_id(), activities = %activities, "classification activities");

        if let Some(reason) = routing_gate(ctx.board.as_ref()) {
            self.triage_exit(&ctx, reason).await;
            return Ok(Disposition::EarlyExit(reason));
        }

        let flow = self.tsi_stage(&ctx).await?;
        let ctx = match advance(ctx, flow)? {
            ControlFlow::Continue(ctx) => ctx,
            ControlFlow::Break(reason) => return Ok(Disposition::EarlyExit(reason)),
        };

        let flow = self.summary_stage(&ctx).await?;
        let ctx = match advance(ctx, flow)? {
            ControlFlow::Continue(ctx) => ctx,
            ControlFlow::Break(reason) => return Ok(Disposition::EarlyExit(reason)),
        };

        let contact = self.resolve_contact(&ctx).await;
        let ctx = ctx.merge(ContextDelta::Contact(contact))?;
        let assembled = assemble(&ctx);
        let ctx = ctx.merge(ContextDelta::Assembled(assembled))?;

        self.finalize(ctx).await
    }

    // ── Stages ────────────────────────────────────────────────────────────

    fn request(&self, system: String, input: String, model: &str, max_tokens: u32) -> CompletionRequest {
        CompletionRequest::new(system, input, model)
            .with_temperature(0.0)
            .with_max_tokens(max_tokens)
    }

    async fn spam_stage(&self, ctx: &PipelineContext) -> Result<StageFlow> {
        let ticket_id = ctx.ticket_id();
        info!(ticket_id, company_id = ctx.ticket.company_id, "no company, running spam classification");
        let req = self.request(spam_prompt(), triage_input(&ctx.ticket), &self.models.base, TRIAGE_MAX_TOKENS);
        let out = complete_as::<TriageDecision>(self.completion.as_ref(), &req)
            .await
            .context("spam classification failed")?;
        let d = out.value;
        info!(
            ticket_id,
            stage = "spam",
            decision = %d.decision,
            confidence = d.confidence_score,
            model = %out.model,
            total_tokens = out.usage.total_tokens,
            "spam classification completed"
        );

        let company = ctx.ticket.company_name.as_deref().unwrap_or("No Company");
        let mut record = DecisionRecord::new(Stage::TicketType, ticket_id, company).with_usage(out.usage, &out.model);
        record.intent = d.intent.clone();
        record.reason = d.reason.clone();
        record.confidence_score = Some(d.confidence_score);
        record.classification = Some(if d.is_spam() { "SPAM" } else { DECISION_TICKET }.to_string());
        self.decisions
            .record(&record)
            .await
            .context("failed to record spam decision")?;

        let exit = no_company_exit(&d);
        let Some(reason) = exit else {
            if d.decision != DECISION_SPAM && d.decision != DECISION_TICKET {
                warn!(ticket_id, decision = %d.decision, "unrecognized spam decision, continuing");
            }
            return Ok(StageFlow::Continue(ContextDelta::Spam(d)));
        };

        let exit_ctx = ctx.clone().merge(ContextDelta::Spam(d))?;
        let mutation = match reason {
            ExitReason::Spam => Mutation {
                type_ref: Some(CONTINUAL_SERVICE_IMPROVEMENT_TYPE_ID.into()),
                status: Some(CLOSING_STATUS_ID.into()),
                ..Default::default()
            },
            _ => Mutation::status_only(TRIAGE_REVIEW_STATUS_ID),
        };
        self.exit_actions(&exit_ctx, reason, &mutation).await;
        if matches!(reason, ExitReason::Spam | ExitReason::PossibleSpam) {
            let plan = plan_activities(ticket_id, exit_ctx.spam.as_ref(), None, Utc::now());
            let activities = create_activities(self.ticketing.as_ref(), &plan).await;
            info!(ticket_id, activities = %activities, "spam activities");
        }
        Ok(StageFlow::Exit(reason))
    }

    async fn ticket_type_stage(&self, ctx: &PipelineContext) -> Result<StageFlow> {
        let ticket_id = ctx.ticket_id();
        info!(ticket_id, company_id = ctx.ticket.company_id, "running ticket type classification");
        let req = self.request(
            ticket_type_prompt(),
            triage_input(&ctx.ticket),
            &self.models.base,
            TRIAGE_MAX_TOKENS,
        );
        let out = complete_as::<TriageDecision>(self.completion.as_ref(), &req)
            .await
            .context("ticket type classification failed")?;
        let d = out.value;
        info!(
            ticket_id,
            stage = "ticket_type",
            decision = %d.decision,
            confidence = d.confidence_score,
            model = %out.model,
            total_tokens = out.usage.total_tokens,
            "ticket type classification completed"
        );

        let company = ctx.ticket.company_name.as_deref().unwrap_or("Unknown");
        let mut record = DecisionRecord::new(Stage::TicketType, ticket_id, company).with_usage(out.usage, &out.model);
        record.intent = d.intent.clone();
        record.reason = d.reason.clone();
        record.confidence_score = Some(d.confidence_score);
        record.classification = Some(d.decision.clone());
        self.decisions
            .record(&record)
            .await
            .context("failed to record ticket type decision")?;

        if d.decision != DECISION_INFO_ALERT {
            return Ok(StageFlow::Continue(ContextDelta::TicketType(d)));
        }
        let exit_ctx = ctx.clone().merge(ContextDelta::TicketType(d))?;
        self.exit_actions(&exit_ctx, ExitReason::InfoAlert, &Mutation::status_only(TRIAGE_REVIEW_STATUS_ID))
            .await;
        Ok(StageFlow::Exit(ExitReason::InfoAlert))
    }

    async fn board_stage(&self, ctx: &PipelineContext) -> Result<StageFlow> {
        let ticket_id = ctx.ticket_id();
        let catalog = self.schemas.catalog().await.context("failed to load routing tables")?;
        let prompt = board_prompt(&catalog, ctx.ticket.company_id)?;
        let req = self.request(
            prompt,
            board_routing_input(&ctx.ticket, ctx.intent.as_deref()),
            &self.models.reasoning,
            BOARD_MAX_TOKENS,
        );
        let out = complete_as::<BoardDecision>(self.completion.as_ref(), &req)
            .await
            .context("board routing failed")?;
        let d = out.value;
        info!(
            ticket_id,
            stage = "board_routing",
            board_id = d.board_id,
            board_name = d.board_name.as_deref().unwrap_or("Unknown"),
            confidence = d.confidence_score,
            model = %out.model,
            total_tokens = out.usage.total_tokens,
            "board routing completed"
        );

        let company = ctx.ticket.company_name.as_deref().unwrap_or("Unknown");
        let mut record = DecisionRecord::new(Stage::BoardRouting, ticket_id, company).with_usage(out.usage, &out.model);
        record.intent = ctx.intent.clone();
        record.reason = d.reason.clone();
        record.confidence_score = Some(d.confidence_score);
        record.board_id = d.board_id;
        record.board_name = d.board_name.clone();
        self.decisions
            .record(&record)
            .await
            .context("failed to record board decision")?;

        Ok(StageFlow::Continue(ContextDelta::Board(d)))
    }

    async fn tsi_stage(&self, ctx: &PipelineContext) -> Result<StageFlow> {
        let ticket_id = ctx.ticket_id();
        let board_name = ctx.board.as_ref().and_then(|b| b.board_name.as_deref());
        let catalog = self.schemas.catalog().await.context("failed to load classification tables")?;
        let prompt = tsi_prompt(&catalog, ctx.board_id(), board_name)?;
        let req = self.request(prompt, tsi_input(&ctx.ticket, ctx.intent.as_deref()), &self.models.reasoning, TSI_MAX_TOKENS);
        let out = complete_as::<TsiDecision>(self.completion.as_ref(), &req)
            .await
            .context("TSI classification failed")?;
        let d = out.value;
        let name = |p: &Option<TsiPick>| p.as_ref().and_then(|p| p.name.clone());
        info!(
            ticket_id,
            stage = "tsi",
            type_name = name(&d.type_pick).as_deref().unwrap_or("None"),
            subtype = name(&d.subtype).as_deref().unwrap_or("None"),
            item = name(&d.item).as_deref().unwrap_or("None"),
            priority = name(&d.priority).as_deref().unwrap_or("None"),
            confidence = d.confidence_score,
            model = %out.model,
            total_tokens = out.usage.total_tokens,
            "TSI classification completed"
        );

        let company = ctx.ticket.company_name.as_deref().unwrap_or("Unknown");
        let mut record =
            DecisionRecord::new(Stage::TsiClassification, ticket_id, company).with_usage(out.usage, &out.model);
        record.intent = ctx.intent.clone();
        record.reason = d.reason.as_ref().map(|r| r.to_log_text());
        record.confidence_score = Some(d.confidence_score);
        record.type_name = name(&d.type_pick);
        record.subtype = name(&d.subtype);
        record.item = name(&d.item);
        record.priority = name(&d.priority);
        self.decisions
            .record(&record)
            .await
            .context("failed to record TSI decision")?;

        Ok(StageFlow::Continue(ContextDelta::Tsi(d)))
    }

    async fn summary_stage(&self, ctx: &PipelineContext) -> Result<StageFlow> {
        let ticket_id = ctx.ticket_id();
        let req = self.request(
            summary_prompt(),
            summary_input(&ctx.ticket, ctx.intent.as_deref()),
            &self.models.base,
            SUMMARY_MAX_TOKENS,
        );
        let out = complete_as::<SummaryDecision>(self.completion.as_ref(), &req)
            .await
            .context("summary generation failed")?;
        let d = out.value;
        info!(
            ticket_id,
            stage = "summary",
            submitted_for = d.submitted_for.as_deref().unwrap_or("None"),
            model = %out.model,
            total_tokens = out.usage.total_tokens,
            "summary generation completed"
        );

        let company = ctx.ticket.company_name.as_deref().unwrap_or("Unknown");
        let mut record = DecisionRecord::new(Stage::Summary, ticket_id, company).with_usage(out.usage, &out.model);
        record.intent = ctx.intent.clone();
        record.reason = d.reason.clone();
        record.confidence_score = Some(d.confidence_score);
        record.summary = d.new_summary.clone();
        self.decisions
            .record(&record)
            .await
            .context("failed to record summary decision")?;

        Ok(StageFlow::Continue(ContextDelta::Summary(d)))
    }

    // ── Side effects ──────────────────────────────────────────────────────

    /// Contact by id when the ticket carries one, otherwise by the name the
    /// summary stage says the ticket was submitted for. Never fails.
    async fn resolve_contact(&self, ctx: &PipelineContext) -> Option<Contact> {
        let ticket_id = ctx.ticket_id();
        match ctx.ticket.contact_id.filter(|id| *id > 0) {
            Some(contact_id) => match self.ticketing.get_contact(contact_id).await {
                Ok(contact) => Some(contact),
                Err(e) => {
                    warn!(ticket_id, contact_id, error = %e, "contact lookup failed, continuing without contact");
                    None
                },
            },
            None => {
                let submitted_for = ctx.summary.as_ref()?.submitted_for.as_deref()?;
                find_contact_by_submitted_for(self.ticketing.as_ref(), submitted_for, ctx.ticket.company_id).await
            },
        }
    }

    async fn exit_actions(&self, ctx: &PipelineContext, reason: ExitReason, mutation: &Mutation) {
        let ticket_id = ctx.ticket_id();
        let update = update_ticket_reporting(self.ticketing.as_ref(), ticket_id, mutation).await;
        let note = match exit_note(reason, &ctx.note_inputs()) {
            Some(text) => add_note_reporting(self.ticketing.as_ref(), ticket_id, &text).await,
            None => "no note".to_string(),
        };
        info!(ticket_id, exit = reason.message(), update = %update, note = %note, "early exit");
    }

    async fn triage_exit(&self, ctx: &PipelineContext, reason: ExitReason) {
        self.exit_actions(ctx, reason, &Mutation::status_only(TRIAGE_REVIEW_STATUS_ID))
            .await;
    }

    async fn finalize(&self, ctx: PipelineContext) -> Result<Disposition> {
        let ticket_id = ctx.ticket_id();
        let Some(assembly) = ctx.assembly.as_ref() else {
            bail!("ticket {ticket_id} reached finalize without an assembled update");
        };

        let update_result = apply_with_fallback(
            self.ticketing.as_ref(),
            ticket_id,
            &assembly.mutation,
            self.mutation_retry,
        )
        .await;
        let note_result = add_note_reporting(self.ticketing.as_ref(), ticket_id, &assembly.note).await;
        info!(ticket_id, update = %update_result, note = %note_result, vip = ctx.is_vip, "ticket updated");

        let proposed_note_sent = self.send_proposed_note(&ctx, &assembly.summary).await;

        let tsi_type = ctx.tsi.as_ref().and_then(|t| t.type_pick.as_ref());
        Ok(Disposition::Completed(CompletedRun {
            board_name: ctx.board.as_ref().and_then(|b| b.board_name.clone()),
            board_id: ctx.board_id(),
            type_name: tsi_type.and_then(|p| p.name.clone()),
            type_id: tsi_type.and_then(|p| p.id),
            summary: assembly.summary.clone(),
            is_vip: ctx.is_vip,
            proposed_note_sent,
            update_result,
        }))
    }

    async fn send_proposed_note(&self, ctx: &PipelineContext, summary: &str) -> bool {
        let ticket_id = ctx.ticket_id();
        let eligibility = proposed_note_eligibility(&ctx.ticket, ctx.board_id());
        if !eligibility.is_eligible() {
            info!(ticket_id, reasons = %eligibility.unmet.join(", "), "proposed note not sent, conditions not met");
            return false;
        }
        let Some(sink) = &self.proposed_notes else {
            warn!(ticket_id, "proposed note not sent, endpoint not configured");
            return false;
        };
        let board_name = ctx.board.as_ref().and_then(|b| b.board_name.as_deref());
        let note = ProposedNote::new(&ctx.ticket, ctx.intent.as_deref(), summary, board_name);
        match sink.send(&note).await {
            Ok(()) => {
                info!(ticket_id, "proposed note sent");
                true
            },
            Err(e) => {
                let msg = format!("{e:#}");
                warn!(ticket_id, error = %msg, "proposed note failed");
                false
            },
        }
    }
}

/// Exit for the no-company branch. Only an exact 95 or 100 on a spam
/// verdict exits; other spam confidences fall through to routing.
pub fn no_company_exit(d: &TriageDecision) -> Option<ExitReason> {
    match d.decision.as_str() {
        DECISION_TICKET => Some(ExitReason::NoCompany),
        DECISION_SPAM if d.confidence_score == POSSIBLE_SPAM_CONFIDENCE => Some(ExitReason::PossibleSpam),
        DECISION_SPAM if d.confidence_score == CERTAIN_SPAM_CONFIDENCE => Some(ExitReason::Spam),
        _ => None,
    }
}

/// Exit after board routing: low confidence first, then non-service boards.
pub fn routing_gate(board: Option<&BoardDecision>) -> Option<ExitReason> {
    let board = board?;
    if is_low_confidence(board.confidence_score) {
        Some(ExitReason::LowBoardConfidence)
    } else if is_non_service_board(board.board_id) {
        Some(ExitReason::NonServiceBoard)
    } else {
        None
    }
}

fn assemble(ctx: &PipelineContext) -> Assembly {
    let summary_decision = ctx.summary.as_ref();
    let summary = build_summary(
        summary_decision.and_then(|s| s.submitted_for.as_deref()),
        summary_decision
            .and_then(|s| s.new_summary.as_deref())
            .unwrap_or_default(),
        ctx.is_vip,
    );
    let note = success_note(&ctx.note_inputs());
    let mutation = final_mutation(ctx, &summary);
    Assembly {
        summary,
        note,
        mutation,
    }
}

fn log_intake(ticket: &TicketRequest) {
    info!(
        ticket_id = ticket.ticket_id,
        company_id = ticket.company_id,
        company_name = ticket.company_name.as_deref().unwrap_or("Unknown"),
        summary = ticket.summary.as_deref().unwrap_or(""),
        description = ticket.initial_description.as_deref().unwrap_or(""),
        service_team = ticket.service_team.as_ref().map_or("None", |t| t.name.as_str()),
        notes = ticket.notes.as_ref().map_or(0, Vec::len),
        "ticket request received"
    );
}
