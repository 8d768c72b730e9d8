use serde::{Deserialize, Serialize};

// ===== Listing Models =====

/// Opaque identifier of a remote message awaiting detail resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef {
    pub id: String,
}

impl MessageRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// One page of a listing call.
#[derive(Debug, Clone, Default)]
pub struct MessagePage {
    pub messages: Vec<MessageRef>,
    pub next_page_token: Option<String>,
}

// ===== Detail Models =====

/// Header that carries the sender.
pub const SENDER_HEADER: &str = "From";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageHeader {
    pub name: String,
    pub value: String,
}

impl MessageHeader {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MessageDetail {
    pub id: String,
    pub headers: Vec<MessageHeader>,
}

impl MessageDetail {
    /// First header whose name matches `name` case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|header| header.name.eq_ignore_ascii_case(name))
            .map(|header| header.value.as_str())
    }
}

// ===== Resolved Models =====

/// A message id paired with its raw (unnormalized) `From` header.
///
/// This is what the cache persists and what the aggregator consumes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolvedMessage {
    pub id: String,
    pub sender: String,
}

impl ResolvedMessage {
    pub fn new(id: impl Into<String>, sender: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            sender: sender.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_is_case_insensitive() {
        let detail = MessageDetail {
            id: "a".to_string(),
            headers: vec![
                MessageHeader::new("Subject", "hello"),
                MessageHeader::new("FROM", "X <x@example.com>"),
            ],
        };

        assert_eq!(detail.header("from"), Some("X <x@example.com>"));
        assert_eq!(detail.header("To"), None);
    }

    #[test]
    fn header_lookup_takes_first_match() {
        let detail = MessageDetail {
            id: "a".to_string(),
            headers: vec![
                MessageHeader::new("From", "first@example.com"),
                MessageHeader::new("from", "second@example.com"),
            ],
        };

        assert_eq!(detail.header("From"), Some("first@example.com"));
        assert_eq!(detail.header(SENDER_HEADER), Some("first@example.com"));
    }
}
