//! Delivery of report payloads to the collector.

use crate::report::ReportPayload;
use std::time::Duration;
use tracing::{debug, info};

/// Collector endpoint used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "https://stat.hostingstabilitymeter.com/slurp_stats.php";

/// Errors raised while delivering a payload.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("collector returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request to {endpoint} failed: {message}")]
    Request { endpoint: String, message: String },

    #[error("failed to read collector response: {0}")]
    Body(#[from] std::io::Error),
}

/// Something that can deliver a payload and return the collector's reply.
pub trait Transport {
    fn send(&self, payload: &ReportPayload) -> Result<String, TransportError>;
}

/// Form-encoded HTTP POST to the collector.
pub struct HttpTransport {
    agent: ureq::Agent,
    endpoint: String,
}

impl HttpTransport {
    /// Transport with an overall request timeout and a redirect limit.
    ///
    /// Certificate validation follows the TLS defaults of the HTTP client.
    pub fn new(
        endpoint: impl Into<String>,
        timeout: Duration,
        max_redirects: u32,
        user_agent: &str,
    ) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .redirects(max_redirects)
            .user_agent(user_agent)
            .build();
        Self {
            agent,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Transport for HttpTransport {
    fn send(&self, payload: &ReportPayload) -> Result<String, TransportError> {
        debug!(endpoint = %self.endpoint, "posting report");

        match self.agent.post(&self.endpoint).send_form(&payload.form_fields()) {
            Ok(resp) => {
                let status = resp.status();
                let body = resp.into_string()?;
                info!(status, bytes = body.len(), "report delivered");
                Ok(body)
            }
            Err(ureq::Error::Status(status, resp)) => Err(TransportError::Status {
                status,
                body: resp.into_string().unwrap_or_default(),
            }),
            Err(e) => Err(TransportError::Request {
                endpoint: self.endpoint.clone(),
                message: e.to_string(),
            }),
        }
    }
}
