// crates/probes/src/http.rs
//! HTTP(S) reachability probe: one GET per target

use async_trait::async_trait;
use reqwest::Client;
use std::error::Error as StdError;
use tracing::{debug, instrument};

use vigil_common::{Payload, ProbeError, ProbeKind, ProbeRequest, Prober, VERSION};

pub struct HttpProbe {
    client: Client,
}

impl HttpProbe {
    /// Build a probe with its own client. The timeout is applied per request.
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(format!("vigil/{}", VERSION))
            .build()?;
        Ok(Self { client })
    }

    /// Use an already configured client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

/// Map a reqwest error onto the probe taxonomy.
fn classify(err: &reqwest::Error) -> ProbeError {
    if err.is_timeout() {
        ProbeError::Timeout
    } else if err.is_builder() {
        ProbeError::Protocol(format!("invalid request: {}", root_cause(err)))
    } else if err.is_redirect() || err.is_decode() || err.is_body() {
        ProbeError::Protocol(root_cause(err))
    } else {
        // connect, DNS and TLS failures all surface here
        ProbeError::Transport(root_cause(err))
    }
}

/// Innermost error message, which names the DNS/TLS/socket problem.
fn root_cause(err: &(dyn StdError + 'static)) -> String {
    let mut current = err;
    while let Some(source) = current.source() {
        current = source;
    }
    current.to_string()
}

#[async_trait]
impl Prober for HttpProbe {
    #[instrument(skip(self, request), fields(target = %request.target))]
    async fn probe(&self, request: &ProbeRequest) -> Result<Payload, ProbeError> {
        let response = self
            .client
            .get(request.target.as_str())
            .timeout(request.timeout)
            .send()
            .await
            .map_err(|e| classify(&e))?;

        let status = response.status();
        debug!(status = status.as_u16(), "response received");

        // 4xx still proves the endpoint is reachable
        if status.is_server_error() {
            return Err(ProbeError::Protocol(format!("server error {}", status.as_u16())));
        }
        Ok(Payload::Status(status.as_u16()))
    }

    fn kind(&self) -> ProbeKind {
        ProbeKind::HttpFetch
    }

    fn name(&self) -> &str {
        "HTTP Fetch Probe"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use vigil_common::Target;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(url: String, timeout: Duration) -> ProbeRequest {
        ProbeRequest::new(Target::new(url), ProbeKind::HttpFetch, timeout)
    }

    async fn server_with(status: u16) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_ok_status_is_success() {
        let server = server_with(200).await;
        let probe = HttpProbe::new().unwrap();
        let payload = probe
            .probe(&request(format!("{}/", server.uri()), Duration::from_secs(2)))
            .await
            .unwrap();
        assert_eq!(payload, Payload::Status(200));
    }

    #[tokio::test]
    async fn test_client_error_is_still_success() {
        let server = server_with(404).await;
        let probe = HttpProbe::new().unwrap();
        let payload = probe
            .probe(&request(format!("{}/", server.uri()), Duration::from_secs(2)))
            .await
            .unwrap();
        assert_eq!(payload, Payload::Status(404));
    }

    #[tokio::test]
    async fn test_server_error_is_protocol_failure() {
        let server = server_with(503).await;
        let probe = HttpProbe::new().unwrap();
        let err = probe
            .probe(&request(format!("{}/", server.uri()), Duration::from_secs(2)))
            .await
            .unwrap_err();
        assert_eq!(err, ProbeError::Protocol("server error 503".into()));
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let probe = HttpProbe::new().unwrap();
        let err = probe
            .probe(&request(format!("{}/", server.uri()), Duration::from_millis(100)))
            .await
            .unwrap_err();
        assert_eq!(err, ProbeError::Timeout);
    }

    #[tokio::test]
    async fn test_refused_connection_is_transport() {
        // grab a free port, then close it
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let probe = HttpProbe::new().unwrap();
        let err = probe
            .probe(&request(format!("http://127.0.0.1:{}/", port), Duration::from_secs(2)))
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::Transport(_)));
    }

    #[tokio::test]
    async fn test_malformed_url_is_protocol() {
        let probe = HttpProbe::new().unwrap();
        let err = probe
            .probe(&request("not a url".to_string(), Duration::from_secs(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::Protocol(_)));
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_public_fetch_scenario() {
        let probe = HttpProbe::new().unwrap();
        let ok = probe
            .probe(&request("https://example.com".into(), Duration::from_secs(5)))
            .await
            .unwrap();
        assert!(matches!(ok, Payload::Status(code) if (200..500).contains(&code)));

        let err = probe
            .probe(&request("https://000.invalid".into(), Duration::from_secs(5)))
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::Transport(_)));
    }
}
