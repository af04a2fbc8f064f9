//! HTTP Prober Port (C3).
//!
//! An abstract capability issuing `HEAD` with a timeout and a redirect cap,
//! used by the Content Analyzer to validate links found in HTML/text parts.

use std::time::Duration;

use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub valid: bool,
    pub status: Option<u16>,
    pub warning: Option<String>,
}

#[async_trait]
pub trait HttpProberPort: Send + Sync {
    async fn head(&self, url: &str, deadline: Duration) -> ProbeResult;
}

/// Default prober backed by `reqwest`, capping redirects at 10 and sending a
/// configurable `User-Agent`, per spec §5.
pub struct ReqwestProber {
    client: reqwest::Client,
}

impl ReqwestProber {
    pub fn new(user_agent: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(10))
            .user_agent(user_agent.to_string())
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpProberPort for ReqwestProber {
    async fn head(&self, url: &str, deadline: Duration) -> ProbeResult {
        let request = self.client.head(url).timeout(deadline).send();
        match tokio::time::timeout(deadline, request).await {
            Ok(Ok(response)) => ProbeResult {
                valid: true,
                status: Some(response.status().as_u16()),
                warning: None,
            },
            Ok(Err(e)) => ProbeResult {
                valid: true,
                status: None,
                warning: Some(format!("connection error: {e}")),
            },
            Err(_) => ProbeResult {
                valid: true,
                status: None,
                warning: Some("probe timed out".to_string()),
            },
        }
    }
}

/// In-memory prober for tests, keyed by exact URL.
#[derive(Default, Clone)]
pub struct MockProber {
    responses: std::collections::HashMap<String, ProbeResult>,
}

impl MockProber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, url: &str, result: ProbeResult) -> Self {
        self.responses.insert(url.to_string(), result);
        self
    }
}

#[async_trait]
impl HttpProberPort for MockProber {
    async fn head(&self, url: &str, _deadline: Duration) -> ProbeResult {
        self.responses.get(url).cloned().unwrap_or(ProbeResult {
            valid: true,
            status: Some(200),
            warning: None,
        })
    }
}
