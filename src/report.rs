//! Sender frequency report.
//!
//! Turns the resolved `From` headers of a run into a ranked list of sender
//! addresses.
//!
//! # Address extraction
//!
//! Headers come in several shapes:
//!
//! - `"Name" <addr@host>` - the address is whatever sits between the last `<`
//!   and the last `>`
//! - `addr@host` - a bare address with no display name
//! - `addr@host (Name)` and other RFC 5322 forms - handled by `mailparse`
//!
//! A header with an unbalanced `<` or `>` yields no address. Anything that
//! yields no address is skipped and listed in
//! [`SenderReport::skipped`] rather than failing the report.

use crate::models::ResolvedMessage;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// How many senders the report shows unless told otherwise.
pub const DEFAULT_TOP_N: usize = 30;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("no address found in sender `{0}`")]
    MalformedSender(String),
}

fn looks_like_address(candidate: &str) -> bool {
    match candidate.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !candidate.contains(char::is_whitespace)
        }
        None => false,
    }
}

/// Extract the lowercased email address from a raw `From` header value.
pub fn extract_address(sender: &str) -> Result<String, AddressError> {
    let sender = sender.trim();

    if let (Some(open), Some(close)) = (sender.rfind('<'), sender.rfind('>')) {
        if open < close {
            let inner = sender[open + 1..close].trim();
            if !inner.is_empty() {
                return Ok(inner.to_lowercase());
            }
        }
    }

    // An unclosed or empty bracket pair would otherwise leak into the address
    if sender.contains(['<', '>']) {
        return Err(AddressError::MalformedSender(sender.to_string()));
    }

    if let Ok(parsed) = mailparse::addrparse(sender) {
        for addr in parsed.iter() {
            let candidate = match addr {
                mailparse::MailAddr::Single(info) => Some(info.addr.as_str()),
                mailparse::MailAddr::Group(group) => {
                    group.addrs.first().map(|info| info.addr.as_str())
                }
            };
            if let Some(candidate) = candidate.map(str::trim).filter(|c| looks_like_address(c)) {
                return Ok(candidate.to_lowercase());
            }
        }
    }

    // `addr@host (Name)` and similar: first token that looks like an address
    let token = sender
        .split_whitespace()
        .map(|token| token.trim_matches(|c: char| matches!(c, '"' | '\'' | '(' | ')' | ',' | ';')))
        .find(|token| looks_like_address(token));
    if let Some(token) = token {
        return Ok(token.to_lowercase());
    }

    Err(AddressError::MalformedSender(sender.to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderCount {
    pub address: String,
    pub count: usize,
}

/// Ranked sender counts for one run.
#[derive(Debug, Clone, Default)]
pub struct SenderReport {
    /// Top senders, highest count first; ties ordered by address.
    pub entries: Vec<SenderCount>,
    /// Messages that contributed to a count.
    pub counted: usize,
    /// Distinct addresses seen, before truncation.
    pub distinct: usize,
    /// Messages whose sender yielded no address.
    pub skipped: Vec<(String, AddressError)>,
}

impl SenderReport {
    /// True when every message contributed to a count.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }

    pub fn build(messages: &[ResolvedMessage], top_n: usize) -> Self {
        let mut counts: HashMap<String, usize> = HashMap::new();
        let mut skipped = Vec::new();
        let mut counted = 0;

        for message in messages {
            match extract_address(&message.sender) {
                Ok(address) => {
                    *counts.entry(address).or_insert(0) += 1;
                    counted += 1;
                }
                Err(e) => {
                    log::warn!("message {}: {}", message.id, e);
                    skipped.push((message.id.clone(), e));
                }
            }
        }

        let distinct = counts.len();
        let mut entries: Vec<SenderCount> = counts
            .into_iter()
            .map(|(address, count)| SenderCount { address, count })
            .collect();
        entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.address.cmp(&b.address)));
        entries.truncate(top_n);

        Self {
            entries,
            counted,
            distinct,
            skipped,
        }
    }
}

impl fmt::Display for SenderReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "{} = {}", entry.address, entry.count)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_address_angle_brackets() {
        assert_eq!(extract_address("X <X@Example.com>").unwrap(), "x@example.com");
        assert_eq!(
            extract_address("\"Doe, Jane\" <jane@example.com>").unwrap(),
            "jane@example.com"
        );
        // Last pair wins
        assert_eq!(
            extract_address("<old@example.com> via <list@example.com>").unwrap(),
            "list@example.com"
        );
    }

    #[test]
    fn test_extract_address_bare() {
        assert_eq!(extract_address("Bare@Example.com").unwrap(), "bare@example.com");
        assert_eq!(extract_address("  bare@example.com  ").unwrap(), "bare@example.com");
    }

    #[test]
    fn test_extract_address_malformed() {
        assert!(matches!(
            extract_address("Mail Delivery Subsystem"),
            Err(AddressError::MalformedSender(_))
        ));
        assert!(extract_address("").is_err());
        assert!(extract_address("Name <>").is_err());
    }

    #[test]
    fn test_extract_address_unbalanced_brackets() {
        for sender in ["Name <a@b.com", "a@b.com>", "<a@b.com", "Name > a@b.com <"] {
            assert_eq!(
                extract_address(sender),
                Err(AddressError::MalformedSender(sender.to_string())),
                "{sender}"
            );
        }
    }

    #[test]
    fn test_report_counts_and_orders() {
        let messages = vec![
            ResolvedMessage::new("1", "X <x@example.com>"),
            ResolvedMessage::new("2", "Y <y@example.com>"),
            ResolvedMessage::new("3", "Other X <X@EXAMPLE.COM>"),
            ResolvedMessage::new("4", "b@example.com"),
            ResolvedMessage::new("5", "a@example.com"),
        ];

        let report = SenderReport::build(&messages, DEFAULT_TOP_N);

        assert!(report.is_complete());
        assert_eq!(report.counted, 5);
        assert_eq!(report.distinct, 4);
        assert_eq!(
            report.entries,
            vec![
                SenderCount { address: "x@example.com".into(), count: 2 },
                SenderCount { address: "a@example.com".into(), count: 1 },
                SenderCount { address: "b@example.com".into(), count: 1 },
                SenderCount { address: "y@example.com".into(), count: 1 },
            ]
        );
    }

    #[test]
    fn test_report_truncates_to_top_n() {
        let messages: Vec<ResolvedMessage> = (0..10)
            .map(|i| ResolvedMessage::new(i.to_string(), format!("user{i}@example.com")))
            .collect();

        let report = SenderReport::build(&messages, 3);
        assert_eq!(report.entries.len(), 3);
        assert_eq!(report.distinct, 10);
    }

    #[test]
    fn test_report_skips_malformed_senders() {
        let messages = vec![
            ResolvedMessage::new("ok", "X <x@example.com>"),
            ResolvedMessage::new("bad", "undisclosed"),
        ];

        let report = SenderReport::build(&messages, DEFAULT_TOP_N);
        assert_eq!(report.counted, 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].0, "bad");
        assert!(!report.is_complete());
    }

    #[test]
    fn test_display_format() {
        let messages = vec![
            ResolvedMessage::new("1", "X <x@example.com>"),
            ResolvedMessage::new("2", "X <x@example.com>"),
            ResolvedMessage::new("3", "Y <y@example.com>"),
        ];

        let report = SenderReport::build(&messages, DEFAULT_TOP_N);
        assert_eq!(report.to_string(), "x@example.com = 2\ny@example.com = 1\n");
    }
}
