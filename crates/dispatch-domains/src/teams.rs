use async_trait::async_trait;
use dispatch_core::notify::Alerter;
use serde::Serialize;
use serde_json::json;
use tracing::{error, info, warn};

const CARD_TITLE: &str = "Azure App Failure - AI Dispatch";
const TEAM_NAME: &str = "ROC Team";
const CHANNEL_NAME: &str = "Critical Rewst Alerts";

/// Where alerts go. All three values are needed to send anything.
#[derive(Debug, Clone, Default)]
pub struct TeamsTarget {
    pub webhook: Option<String>,
    pub team_id: Option<String>,
    pub channel_id: Option<String>,
}

impl TeamsTarget {
    fn complete(&self) -> Option<(&str, &str, &str)> {
        fn nonempty(v: &Option<String>) -> Option<&str> {
            v.as_deref().filter(|s| !s.is_empty())
        }
        Some((
            nonempty(&self.webhook)?,
            nonempty(&self.team_id)?,
            nonempty(&self.channel_id)?,
        ))
    }
}

#[derive(Debug, Serialize)]
struct AlertPayload<'a> {
    /// The card travels as a JSON string, not a nested object.
    adaptive_card: String,
    recipient_email: &'a str,
    recipient_name: &'a str,
    team_id: &'a str,
    team_name: &'a str,
    channel_id: &'a str,
    channel_name: &'a str,
    to_channel: bool,
}

fn adaptive_card(message: &str) -> String {
    json!({
        "type": "AdaptiveCard",
        "version": "1.4",
        "body": [
            {
                "type": "TextBlock",
                "text": CARD_TITLE,
                "weight": "bolder",
                "color": "attention",
                "horizontalAlignment": "center"
            },
            { "type": "TextBlock", "text": message, "wrap": true }
        ]
    })
    .to_string()
}

/// Posts failure alerts to a Teams channel through a webhook relay.
pub struct TeamsAlerter {
    http: reqwest::Client,
    target: TeamsTarget,
}

impl TeamsAlerter {
    pub fn new(target: TeamsTarget) -> Self {
        if target.complete().is_none() {
            warn!("teams alert configuration incomplete, alerts will not be sent");
        }
        Self {
            http: reqwest::Client::new(),
            target,
        }
    }
}

#[async_trait]
impl Alerter for TeamsAlerter {
    async fn send_alert(&self, message: &str) {
        let Some((webhook, team_id, channel_id)) = self.target.complete() else {
            warn!(alert = message, "teams alert not sent, webhook configuration incomplete");
            return;
        };
        let payload = AlertPayload {
            adaptive_card: adaptive_card(message),
            recipient_email: "",
            recipient_name: "",
            team_id,
            team_name: TEAM_NAME,
            channel_id,
            channel_name: CHANNEL_NAME,
            to_channel: true,
        };

        info!(alert = message, "sending teams alert");
        match self.http.post(webhook).json(&payload).send().await {
            Ok(resp) if resp.status().is_success() => {
                info!(status = resp.status().as_u16(), "teams alert delivered");
            },
            Ok(resp) => {
                let status = resp.status().as_u16();
                let body = resp.text().await.unwrap_or_default();
                error!(status, body = %body, "teams alert rejected");
            },
            Err(e) => error!(error = %e, "teams alert failed"),
        }
    }
}
