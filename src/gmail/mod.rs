//! Gmail REST API implementation of the listing and detail clients.

mod client;
mod credentials;
mod types;

pub use client::GmailClient;
pub use credentials::Credentials;
