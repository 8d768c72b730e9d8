use super::credentials::Credentials;
use super::types::{ListMessagesResponse, MessageResponse};
use crate::client::{ClientError, DetailClient, ListClient};
use crate::config::GmailConfig;
use crate::models::{MessageDetail, MessagePage, SENDER_HEADER};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// HTTP client for the Gmail `users.messages` endpoints.
#[derive(Clone)]
pub struct GmailClient {
    http: reqwest::Client,
    config: GmailConfig,
    credentials: Credentials,
}

impl GmailClient {
    pub fn new(config: GmailConfig, credentials: Credentials) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent("sender-stats/0.1")
            .build()
            .map_err(ClientError::Http)?;

        Ok(Self {
            http: client,
            config,
            credentials,
        })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/gmail/v1/users/{}/messages",
            self.config.base_url.trim_end_matches('/'),
            self.config.user_id
        )
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, ClientError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(self.credentials.access_token())
            .query(query)
            .send()
            .await
            .map_err(ClientError::Http)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status { status, body });
        }

        let body = response.bytes().await.map_err(ClientError::Http)?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl ListClient for GmailClient {
    async fn list(
        &self,
        query: &str,
        page_token: Option<&str>,
        max_results: u32,
    ) -> Result<MessagePage, ClientError> {
        let mut params = vec![
            ("q", query.to_string()),
            ("maxResults", max_results.to_string()),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token.to_string()));
        }

        let response: ListMessagesResponse = self.get_json(&self.messages_url(), &params).await?;
        Ok(response.into())
    }
}

#[async_trait]
impl DetailClient for GmailClient {
    async fn fetch(&self, id: &str) -> Result<MessageDetail, ClientError> {
        let url = format!("{}/{}", self.messages_url(), id);
        let params = [
            ("format", "metadata".to_string()),
            ("metadataHeaders", SENDER_HEADER.to_string()),
        ];

        let response: MessageResponse = self.get_json(&url, &params).await?;
        Ok(response.into())
    }
}
