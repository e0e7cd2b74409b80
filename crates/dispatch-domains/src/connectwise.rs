use std::time::Duration;

use async_trait::async_trait;
use dispatch_core::activities::ActivityRequest;
use dispatch_core::mutation::Mutation;
use dispatch_core::retry::RetryPolicy;
use dispatch_core::ticketing::{TicketingApi, TicketingError};
use dispatch_core::Contact;
use reqwest::header::AUTHORIZATION;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, info};

const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// ConnectWise Manage behind the API gateway. Every call runs under the
/// transport retry policy.
pub struct ConnectWiseClient {
    http: reqwest::Client,
    base_url: String,
    subscription_key: String,
    dispatch_user: String,
    retry: RetryPolicy<TicketingError>,
}

impl ConnectWiseClient {
    pub fn new(
        base_url: impl Into<String>,
        subscription_key: impl Into<String>,
        dispatch_user: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            subscription_key: subscription_key.into(),
            dispatch_user: dispatch_user.into(),
            retry: RetryPolicy::transport(),
        }
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry = self.retry.with_delay(delay);
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    async fn send_once(
        &self,
        method: Method,
        url: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<String, TicketingError> {
        let mut req = self
            .http
            .request(method, url)
            .header(SUBSCRIPTION_KEY_HEADER, &self.subscription_key)
            .header(AUTHORIZATION, format!("Basic {}", self.dispatch_user));
        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(body) = body {
            req = req.json(body);
        }
        let resp = req
            .send()
            .await
            .map_err(|e| TicketingError::Transport(e.to_string()))?;
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| TicketingError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(TicketingError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(text)
    }

    async fn send(
        &self,
        label: &str,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<String, TicketingError> {
        let url = self.url(path);
        let url = url.as_str();
        debug!(%method, url, "ticketing request");
        self.retry
            .run(label, |_| self.send_once(method.clone(), url, query, body))
            .await
            .result
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        label: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, TicketingError> {
        let text = self.send(label, Method::GET, path, query, None).await?;
        serde_json::from_str(&text).map_err(|e| TicketingError::Decode(e.to_string()))
    }
}

#[async_trait]
impl TicketingApi for ConnectWiseClient {
    async fn update_ticket(&self, ticket_id: i64, mutation: &Mutation) -> Result<(), TicketingError> {
        let ops = Value::Array(mutation.patch_ops());
        self.send(
            "update_ticket",
            Method::PATCH,
            &format!("service/tickets/{ticket_id}"),
            &[],
            Some(&ops),
        )
        .await?;
        Ok(())
    }

    async fn add_note(&self, ticket_id: i64, text: &str) -> Result<(), TicketingError> {
        let body = json!({ "text": text, "internalAnalysisFlag": true });
        self.send(
            "add_note",
            Method::POST,
            &format!("service/tickets/{ticket_id}/notes"),
            &[],
            Some(&body),
        )
        .await?;
        Ok(())
    }

    async fn create_activity(&self, activity: &ActivityRequest) -> Result<(), TicketingError> {
        let body = serde_json::to_value(activity).map_err(|e| TicketingError::Decode(e.to_string()))?;
        self.send("create_activity", Method::POST, "sales/activities", &[], Some(&body))
            .await?;
        Ok(())
    }

    async fn get_contact(&self, contact_id: i64) -> Result<Contact, TicketingError> {
        self.get_json("get_contact", &format!("company/contacts/{contact_id}"), &[])
            .await
    }

    async fn search_contacts(
        &self,
        first_name: &str,
        last_name: &str,
        company_id: i64,
    ) -> Result<Vec<Contact>, TicketingError> {
        info!(first_name, last_name, company_id, "searching contacts");
        let query = [
            ("firstName", first_name.to_string()),
            ("lastName", last_name.to_string()),
            ("company/id", company_id.to_string()),
            ("inactiveFlag", "false".to_string()),
        ];
        let text = self
            .send("search_contacts", Method::GET, "company/contacts", &query, None)
            .await?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&text).map_err(|e| TicketingError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispatch_core::mutation::Reference;
    use httpmock::Method::{GET, PATCH, POST};
    use httpmock::MockServer;

    fn client(server: &MockServer) -> ConnectWiseClient {
        ConnectWiseClient::new(format!("{}/cw/", server.base_url()), "sub-key", "ZGlzcGF0Y2g6cHc=")
            .with_retry_delay(Duration::ZERO)
    }

    #[tokio::test]
    async fn test_update_sends_patch_ops_with_gateway_headers() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(PATCH)
                .path("/cw/service/tickets/42")
                .header("Ocp-Apim-Subscription-Key", "sub-key")
                .header("authorization", "Basic ZGlzcGF0Y2g6cHc=")
                .json_body(json!([
                    {"op": "replace", "path": "/status", "value": {"id": 4084}}
                ]));
            then.status(200).json_body(json!({"id": 42}));
        });

        let m = Mutation {
            status: Some(Reference { id: 4084 }),
            ..Default::default()
        };
        client(&server).update_ticket(42, &m).await.unwrap();
        mock.assert();
    }

    #[tokio::test]
    async fn test_note_is_internal_analysis() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/cw/service/tickets/42/notes")
                .json_body(json!({"text": "Reason for Decision: x", "internalAnalysisFlag": true}));
            then.status(201);
        });

        client(&server).add_note(42, "Reason for Decision: x").await.unwrap();
        mock.assert();
    }

    #[tokio::test]
    async fn test_contact_search_query() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/cw/company/contacts")
                .query_param("firstName", "Jane")
                .query_param("lastName", "Roe Smith")
                .query_param("company/id", "12")
                .query_param("inactiveFlag", "false");
            then.status(200)
                .json_body(json!([{"id": 9, "firstName": "Jane", "lastName": "Roe Smith", "types": []}]));
        });

        let found = client(&server).search_contacts("Jane", "Roe Smith", 12).await.unwrap();
        mock.assert();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, 9);
    }

    #[tokio::test]
    async fn test_get_contact_decodes() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/cw/company/contacts/9");
            then.status(200)
                .json_body(json!({"id": 9, "types": [{"id": 17, "name": "VIP"}]}));
        });

        let contact = client(&server).get_contact(9).await.unwrap();
        assert_eq!(contact.types[0].id, 17);
    }

    #[tokio::test]
    async fn test_server_errors_retried_until_budget_spent() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/cw/company/contacts/9");
            then.status(502).body("bad gateway");
        });

        let err = client(&server).get_contact(9).await.unwrap_err();
        mock.assert_hits(4);
        assert_eq!(err.status(), Some(502));
    }

    #[tokio::test]
    async fn test_client_errors_not_retried() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(PATCH).path("/cw/service/tickets/42");
            then.status(400).body("item does not exist");
        });

        let m = Mutation {
            item: Some(Reference { id: 1 }),
            ..Default::default()
        };
        let err = client(&server).update_ticket(42, &m).await.unwrap_err();
        mock.assert_hits(1);
        assert!(err.is_bad_request_mentioning("ITEM"));
    }
}
