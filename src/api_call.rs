//! Outbound GET on behalf of the user ("Call API" on tab 3).
//!
//! There is no allow-list: whatever URL the user types is requested from the
//! server's network position.

use std::time::Duration;

use crate::error::{DashError, Result};

pub const RESULT_PREFIX: &str = "API Result: ";

#[derive(Clone)]
pub struct ApiClient {
    agent: ureq::Agent,
}

impl ApiClient {
    pub fn new(timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }

    /// Body of a 2xx response; anything else is `OutboundRequestError`.
    pub fn get(&self, url: &str) -> Result<String> {
        tracing::debug!(%url, "outbound request");
        let response = self.agent.get(url).call().map_err(|e| match e {
            ureq::Error::Status(code, _) => DashError::OutboundRequestError(code.to_string()),
            ureq::Error::Transport(t) => DashError::OutboundRequestError(t.to_string()),
        })?;
        let status = response.status();
        if !(200..300).contains(&status) {
            return Err(DashError::OutboundRequestError(status.to_string()));
        }
        response
            .into_string()
            .map_err(|e| DashError::OutboundRequestError(e.to_string()))
    }

    /// Text for the result region. Never fails.
    pub fn call(&self, url: &str) -> String {
        match self.get(url) {
            Ok(body) => format!("{}{}", RESULT_PREFIX, body),
            Err(e) => {
                tracing::info!(%url, error = %e, "outbound request failed");
                format!("{}{}", RESULT_PREFIX, e)
            }
        }
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient").finish_non_exhaustive()
    }
}
