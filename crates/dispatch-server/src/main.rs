mod logging;
mod routes;

use std::sync::Arc;

use dispatch_agent::AzureOpenAiBackend;
use dispatch_core::{
    audit::{DecisionLog, TracingDecisionLog},
    config::Config,
    pipeline::{Models, Pipeline},
    retry::RetryPolicy,
    schema::{SchemaCache, SchemaSource},
};
use dispatch_domains::{ConnectWiseClient, PgDecisionLog, ProposedNoteClient, TeamsAlerter, TeamsTarget};
use tracing::{info, warn};

use crate::routes::{router, AppState};

async fn decision_log(config: &Config) -> anyhow::Result<Arc<dyn DecisionLog>> {
    match &config.database_url {
        Some(url) => Ok(Arc::new(PgDecisionLog::connect(url, &config.decision_log_table).await?)),
        None => {
            warn!("DATABASE_URL not set, decisions are only written to the log");
            Ok(Arc::new(TracingDecisionLog))
        },
    }
}

fn pipeline(config: &Config, decisions: Arc<dyn DecisionLog>) -> Pipeline {
    let completion = AzureOpenAiBackend::new(
        &config.azure_endpoint,
        &config.azure_api_key,
        &config.azure_api_version,
    );
    let ticketing = ConnectWiseClient::new(
        &config.apim_base_url,
        &config.apim_subscription_key,
        &config.dispatch_user,
    )
    .with_retry_delay(config.transport_retry_delay());
    let alerter = TeamsAlerter::new(TeamsTarget {
        webhook: config.teams_alert_webhook.clone(),
        team_id: config.alert_team_id.clone(),
        channel_id: config.alert_channel_id.clone(),
    });
    let schemas = match &config.data_dir {
        Some(dir) => SchemaCache::new(SchemaSource::Directory(dir.clone())),
        None => SchemaCache::embedded(),
    };

    let pipeline = Pipeline::new(
        Arc::new(completion),
        Arc::new(ticketing),
        decisions,
        Arc::new(alerter),
        Arc::new(schemas),
        Models {
            base: config.base_model.clone(),
            reasoning: config.reasoning_model.clone(),
        },
    )
    .with_mutation_retry(RetryPolicy::semantic().with_delay(config.semantic_retry_delay()));

    match &config.proposed_note_endpoint {
        Some(endpoint) => pipeline.with_proposed_notes(Arc::new(ProposedNoteClient::new(endpoint))),
        None => {
            warn!("PROPOSED_NOTE_ENDPOINT not set, proposed notes are disabled");
            pipeline
        },
    }
}

// ── main ──────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    logging::init(&config.log_format);

    let decisions = decision_log(&config).await?;
    let state = Arc::new(AppState {
        pipeline: pipeline(&config, decisions),
    });
    let app = router(state);

    let addr = config.bind_addr();
    info!(
        base_model = %config.base_model,
        reasoning_model = %config.reasoning_model,
        "Listening on {addr}"
    );
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
