//! Per-stage decision log. Distinct from diagnostic tracing: one upserted
//! row per (stage, ticket) that reporting queries read back.

use std::fmt;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use crate::types::TokenUsage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Stage {
    TicketType,
    BoardRouting,
    TsiClassification,
    Summary,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TicketType => "Ticket Type",
            Self::BoardRouting => "Board Routing",
            Self::TsiClassification => "TSI Classification",
            Self::Summary => "Summary",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One decision row. Fields a stage does not produce stay `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionRecord {
    pub stage: Stage,
    pub ticket_id: i64,
    pub company: String,
    pub intent: Option<String>,
    pub reason: Option<String>,
    pub confidence_score: Option<i32>,
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
    pub model: Option<String>,
    pub board_id: Option<i64>,
    pub board_name: Option<String>,
    pub type_name: Option<String>,
    pub subtype: Option<String>,
    pub item: Option<String>,
    pub priority: Option<String>,
    pub summary: Option<String>,
    pub classification: Option<String>,
}

impl DecisionRecord {
    pub fn new(stage: Stage, ticket_id: i64, company: impl Into<String>) -> Self {
        Self {
            stage,
            ticket_id,
            company: company.into(),
            intent: None,
            reason: None,
            confidence_score: None,
            prompt_tokens: None,
            completion_tokens: None,
            total_tokens: None,
            model: None,
            board_id: None,
            board_name: None,
            type_name: None,
            subtype: None,
            item: None,
            priority: None,
            summary: None,
            classification: None,
        }
    }

    pub fn with_usage(mut self, usage: TokenUsage, model: &str) -> Self {
        self.prompt_tokens = Some(usage.prompt_tokens);
        self.completion_tokens = Some(usage.completion_tokens);
        self.total_tokens = Some(usage.total_tokens);
        self.model = Some(model.to_string());
        self
    }
}

/// Audit sink. A failed write aborts the run that produced it.
#[async_trait]
pub trait DecisionLog: Send + Sync {
    async fn record(&self, record: &DecisionRecord) -> Result<()>;
}

/// Emits each record as a structured `info!` event. Used when no database
/// is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDecisionLog;

#[async_trait]
impl DecisionLog for TracingDecisionLog {
    async fn record(&self, r: &DecisionRecord) -> Result<()> {
        info!(
            target: "dispatch_core::decision_log",
            stage = %r.stage,
            ticket_id = r.ticket_id,
            company = %r.company,
            confidence = r.confidence_score,
            model = r.model.as_deref(),
            total_tokens = r.total_tokens,
            board_id = r.board_id,
            board_name = r.board_name.as_deref(),
            type_name = r.type_name.as_deref(),
            classification = r.classification.as_deref(),
            "decision recorded"
        );
        Ok(())
    }
}
