//! Client construction: credential and endpoint configuration.
//!
//! Configuration is explicit. There is no process-wide client and nothing is
//! read from the environment; the embedding application injects the token.

use std::fmt;
use std::sync::Arc;

use crate::client::Bot;
use crate::error::ValidationError;
use crate::transport::{ReqwestTransport, Transport};

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// A bot token. Only ever placed in the endpoint path.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    /// Local format check: non-empty and usable as a URL path segment.
    pub fn new(token: impl Into<String>) -> Result<Self, ValidationError> {
        let token = token.into();
        if token.is_empty() {
            return Err(ValidationError::InvalidToken("token is empty"));
        }
        if token.chars().any(|c| c == '/' || c == '?' || c == '#' || c.is_whitespace()) {
            return Err(ValidationError::InvalidToken(
                "token contains a character that cannot appear in a path segment",
            ));
        }
        Ok(Self(token))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(<redacted>)")
    }
}

/// Builder for `Bot`.
pub struct BotBuilder {
    token: String,
    api_url: String,
    transport: Option<Arc<dyn Transport>>,
}

impl BotBuilder {
    pub(crate) fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            api_url: DEFAULT_API_URL.to_string(),
            transport: None,
        }
    }

    /// Override the API host, e.g. a local Bot API server or a test double.
    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Reuse an existing `reqwest::Client`.
    pub fn client(self, client: reqwest::Client) -> Self {
        self.transport(ReqwestTransport::new(client))
    }

    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Validate the token and assemble the client. Performs no I/O.
    pub fn build(self) -> Result<Bot, ValidationError> {
        let token = Token::new(self.token)?;
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(ReqwestTransport::default()));
        Ok(Bot::from_parts(token, &self.api_url, transport))
    }
}
