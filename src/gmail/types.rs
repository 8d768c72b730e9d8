//! Wire formats of the Gmail `users.messages` endpoints.

use crate::models::{MessageDetail, MessageHeader, MessagePage, MessageRef};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListMessagesResponse {
    /// Omitted entirely when the query matches nothing.
    #[serde(default)]
    pub messages: Vec<MessageStub>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessageStub {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessageResponse {
    pub id: String,
    #[serde(default)]
    pub payload: Option<MessagePart>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessagePart {
    #[serde(default)]
    pub headers: Vec<MessageHeader>,
}

impl From<ListMessagesResponse> for MessagePage {
    fn from(response: ListMessagesResponse) -> Self {
        MessagePage {
            messages: response
                .messages
                .into_iter()
                .map(|stub| MessageRef::new(stub.id))
                .collect(),
            next_page_token: response.next_page_token,
        }
    }
}

impl From<MessageResponse> for MessageDetail {
    fn from(response: MessageResponse) -> Self {
        MessageDetail {
            id: response.id,
            headers: response
                .payload
                .map(|part| part.headers)
                .unwrap_or_default(),
        }
    }
}
