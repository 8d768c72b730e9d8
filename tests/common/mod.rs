#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::StatusCode;
use sender_stats::cache::DiskMessageCache;
use sender_stats::client::{ClientError, DetailClient, ListClient};
use sender_stats::config::PipelineConfig;
use sender_stats::models::{MessageDetail, MessageHeader, MessagePage, MessageRef};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Serves a fixed list of pages; page `n` carries token `"n+1"` when more follow.
pub struct FakeLister {
    pages: Vec<Vec<String>>,
    fail_on_page: Option<usize>,
}

impl FakeLister {
    pub fn new(pages: &[&[&str]]) -> Self {
        Self {
            pages: pages
                .iter()
                .map(|page| page.iter().map(|id| id.to_string()).collect())
                .collect(),
            fail_on_page: None,
        }
    }

    pub fn failing_on_page(mut self, page: usize) -> Self {
        self.fail_on_page = Some(page);
        self
    }
}

#[async_trait]
impl ListClient for FakeLister {
    async fn list(
        &self,
        _query: &str,
        page_token: Option<&str>,
        _max_results: u32,
    ) -> Result<MessagePage, ClientError> {
        let index = page_token.map_or(0, |token| token.parse::<usize>().unwrap());
        if self.fail_on_page == Some(index) {
            return Err(ClientError::status(StatusCode::UNAUTHORIZED, "token expired"));
        }

        let next_page_token = (index + 1 < self.pages.len()).then(|| (index + 1).to_string());
        Ok(MessagePage {
            messages: self.pages[index].iter().map(MessageRef::new).collect(),
            next_page_token,
        })
    }
}

/// Detail service backed by a map of id -> sender. Unknown ids are 404s.
#[derive(Default)]
pub struct FakeDetail {
    senders: HashMap<String, String>,
    without_sender: Vec<String>,
    calls: Mutex<Vec<String>>,
    delay: Duration,
}

impl FakeDetail {
    pub fn new(senders: &[(&str, &str)]) -> Self {
        Self {
            senders: senders
                .iter()
                .map(|(id, sender)| (id.to_string(), sender.to_string()))
                .collect(),
            ..Self::default()
        }
    }

    /// Ids that resolve but have no `From` header.
    pub fn with_headerless(mut self, ids: &[&str]) -> Self {
        self.without_sender = ids.iter().map(|id| id.to_string()).collect();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl DetailClient for FakeDetail {
    async fn fetch(&self, id: &str) -> Result<MessageDetail, ClientError> {
        self.calls.lock().push(id.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if self.without_sender.iter().any(|other| other == id) {
            return Ok(MessageDetail {
                id: id.to_string(),
                headers: vec![MessageHeader::new("Subject", "no sender here")],
            });
        }

        match self.senders.get(id) {
            Some(sender) => Ok(MessageDetail {
                id: id.to_string(),
                headers: vec![
                    MessageHeader::new("Subject", "hello"),
                    MessageHeader::new("From", sender.clone()),
                ],
            }),
            None => Err(ClientError::status(StatusCode::NOT_FOUND, "not found")),
        }
    }
}

pub fn config() -> PipelineConfig {
    PipelineConfig::from_env()
        .with_concurrency(4)
        .with_page_size(2)
}

pub fn open_cache(path: &Path) -> Arc<DiskMessageCache> {
    Arc::new(DiskMessageCache::open(path.join("messages.bin")).unwrap())
}
