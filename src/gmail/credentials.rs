use crate::client::ClientError;
use serde_json::Value;
use std::path::Path;

/// Bearer credentials for the Gmail API.
///
/// Obtaining the token (the OAuth consent flow) happens elsewhere; this only
/// reads the result. The file may hold the token at the top level or nested
/// under `installed` / `web`, matching the client secret layouts Google hands
/// out.
#[derive(Clone)]
pub struct Credentials {
    access_token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
        }
    }

    pub fn load(path: &Path) -> Result<Self, ClientError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ClientError::Credentials(format!("cannot read {}: {}", path.display(), e))
        })?;
        let json: Value = serde_json::from_str(&raw)?;

        let token = ["access_token", "installed", "web"]
            .iter()
            .find_map(|key| match json.get(*key) {
                Some(Value::String(token)) => Some(token.clone()),
                Some(Value::Object(nested)) => nested
                    .get("access_token")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                _ => None,
            })
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| {
                ClientError::Credentials(format!("no access_token in {}", path.display()))
            })?;

        Ok(Self::new(token))
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }
}
