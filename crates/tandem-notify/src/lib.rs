use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use serde::Serialize;
use tracing::{debug, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct PushMessage<'a> {
    to: &'a str,
    title: &'a str,
    body: &'a str,
}

/// Outbound push-notification client. Delivery is best-effort: callers fire
/// and forget, and a failed send only leaves a warning in the logs — it never
/// rolls back the state change that triggered it.
#[derive(Clone)]
pub struct PushClient {
    inner: Option<Arc<PushClientInner>>,
}

struct PushClientInner {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl PushClient {
    pub fn new(endpoint: String, api_key: String) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            inner: Some(Arc::new(PushClientInner {
                http,
                endpoint,
                api_key,
            })),
        })
    }

    /// A client that drops every send. Used when no push endpoint is
    /// configured, and by tests.
    pub fn disabled() -> Self {
        Self { inner: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    pub async fn send(&self, token: &str, title: &str, body: &str) -> Result<()> {
        let Some(inner) = &self.inner else {
            debug!("Push disabled, dropping notification '{}'", title);
            return Ok(());
        };

        let response = inner
            .http
            .post(&inner.endpoint)
            .header("Authorization", format!("key={}", inner.api_key))
            .json(&PushMessage { to: token, title, body })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("Push endpoint returned {}", response.status()));
        }

        Ok(())
    }

    /// Fire-and-forget dispatch: spawns the send and logs a warning on
    /// failure. The caller's request never waits on delivery.
    pub fn dispatch(&self, token: String, title: String, body: String) {
        let client = self.clone();
        tokio::spawn(async move {
            if let Err(e) = client.send(&token, &title, &body).await {
                warn!("Push notification '{}' failed: {}", title, e);
            }
        });
    }
}
