//! `reqwest::Client` wrapper that records every outgoing call in a span.

use tracing::{field::Empty, Instrument, Level};

#[derive(Clone, Debug)]
pub struct TracedClient {
    inner: reqwest::Client,
}

impl TracedClient {
    pub fn new(inner: reqwest::Client) -> Self {
        Self { inner }
    }

    /// Client with a per-request timeout.
    pub fn with_timeout(timeout: std::time::Duration) -> reqwest::Result<Self> {
        Ok(Self::new(reqwest::Client::builder().timeout(timeout).build()?))
    }

    /// Execute a built request inside an `outgoing_http` span.
    pub async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        let span = tracing::span!(
            Level::INFO,
            "outgoing_http",
            http.method = %req.method(),
            http.url = %redacted(req.url()),
            http.status_code = Empty,
            error = Empty,
        );

        let response = self.inner.execute(req).instrument(span.clone()).await?;

        let status = response.status();
        span.record("http.status_code", status.as_u16());
        if status.is_client_error() || status.is_server_error() {
            span.record("error", true);
        }
        tracing::debug!(parent: &span, status = status.as_u16(), "response received");
        Ok(response)
    }

    /// Start a request; finish it with `TracedClient::execute`.
    pub fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.inner.request(method, url)
    }

    pub async fn get(&self, url: &str) -> reqwest::Result<reqwest::Response> {
        let req = self.inner.get(url).build()?;
        self.execute(req).await
    }

    pub fn inner(&self) -> &reqwest::Client {
        &self.inner
    }
}

impl Default for TracedClient {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

fn redacted(url: &url::Url) -> String {
    let mut u = url.clone();
    if u.password().is_some() {
        let _ = u.set_password(Some("***"));
    }
    u.to_string()
}
