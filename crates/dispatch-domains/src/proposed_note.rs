use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use dispatch_core::notify::{ProposedNote, ProposedNoteSink};
use tracing::info;

/// Hands eligible tickets to the service that drafts a first technician note.
pub struct ProposedNoteClient {
    http: reqwest::Client,
    endpoint: String,
}

impl ProposedNoteClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl ProposedNoteSink for ProposedNoteClient {
    async fn send(&self, note: &ProposedNote) -> Result<()> {
        let resp = self
            .http
            .post(&self.endpoint)
            .json(note)
            .send()
            .await
            .context("proposed note request failed")?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("proposed note endpoint returned {status}: {body}");
        }
        info!(ticket_id = %note.ticket_id, status = status.as_u16(), "proposed note accepted");
        Ok(())
    }
}
