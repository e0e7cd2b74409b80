use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use deadpool_postgres::{Config as PoolConfig, Pool, Runtime};
use dispatch_core::audit::{DecisionLog, DecisionRecord};
use tokio_postgres::NoTls;
use tracing::{debug, info};

/// Table names are interpolated into SQL, so only plain identifiers pass.
pub fn validate_table_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid_start = chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid_start || !valid_rest || name.len() > 63 {
        bail!("invalid decision log table name: {name:?}");
    }
    Ok(())
}

fn create_table_sql(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            stage              TEXT        NOT NULL,
            ticket_id          BIGINT      NOT NULL,
            company            TEXT        NOT NULL,
            intent             TEXT,
            reason             TEXT,
            confidence_score   INTEGER,
            prompt_tokens      BIGINT,
            completion_tokens  BIGINT,
            total_tokens       BIGINT,
            model              TEXT,
            board_id           BIGINT,
            board_name         TEXT,
            type_name          TEXT,
            subtype            TEXT,
            item               TEXT,
            priority           TEXT,
            summary            TEXT,
            classification     TEXT,
            logged_at          TIMESTAMPTZ NOT NULL,
            PRIMARY KEY (stage, ticket_id)
        )"
    )
}

const COLUMNS: [&str; 19] = [
    "stage",
    "ticket_id",
    "company",
    "intent",
    "reason",
    "confidence_score",
    "prompt_tokens",
    "completion_tokens",
    "total_tokens",
    "model",
    "board_id",
    "board_name",
    "type_name",
    "subtype",
    "item",
    "priority",
    "summary",
    "classification",
    "logged_at",
];

fn upsert_sql(table: &str) -> String {
    let placeholders: Vec<String> = (1..=COLUMNS.len()).map(|i| format!("${i}")).collect();
    let updates: Vec<String> = COLUMNS[2..]
        .iter()
        .map(|c| format!("{c} = EXCLUDED.{c}"))
        .collect();
    format!(
        "INSERT INTO {table} ({}) VALUES ({}) ON CONFLICT (stage, ticket_id) DO UPDATE SET {}",
        COLUMNS.join(", "),
        placeholders.join(", "),
        updates.join(", ")
    )
}

/// Decision rows in Postgres, one per (stage, ticket). Re-running a ticket
/// overwrites its earlier rows.
pub struct PgDecisionLog {
    pool: Pool,
    upsert: String,
}

impl PgDecisionLog {
    /// Build the pool and make sure the table exists.
    pub async fn connect(database_url: &str, table: &str) -> Result<Self> {
        validate_table_name(table)?;
        let mut cfg = PoolConfig::new();
        cfg.url = Some(database_url.to_string());
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .context("failed to create decision log pool")?;

        let client = pool.get().await.context("failed to connect to decision log database")?;
        client
            .batch_execute(&create_table_sql(table))
            .await
            .with_context(|| format!("failed to create table {table}"))?;
        info!(table, "decision log ready");

        Ok(Self {
            pool,
            upsert: upsert_sql(table),
        })
    }
}

#[async_trait]
impl DecisionLog for PgDecisionLog {
    async fn record(&self, r: &DecisionRecord) -> Result<()> {
        let client = self.pool.get().await.context("decision log pool exhausted")?;
        let tokens = |t: Option<u32>| t.map(i64::from);
        let (prompt, completion, total) = (
            tokens(r.prompt_tokens),
            tokens(r.completion_tokens),
            tokens(r.total_tokens),
        );
        client
            .execute(
                &self.upsert,
                &[
                    &r.stage.as_str(),
                    &r.ticket_id,
                    &r.company,
                    &r.intent,
                    &r.reason,
                    &r.confidence_score,
                    &prompt,
                    &completion,
                    &total,
                    &r.model,
                    &r.board_id,
                    &r.board_name,
                    &r.type_name,
                    &r.subtype,
                    &r.item,
                    &r.priority,
                    &r.summary,
                    &r.classification,
                    &Utc::now(),
                ],
            )
            .await
            .with_context(|| format!("failed to record {} decision for ticket {}", r.stage, r.ticket_id))?;
        debug!(ticket_id = r.ticket_id, stage = %r.stage, "decision row upserted");
        Ok(())
    }
}
