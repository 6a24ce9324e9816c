use anyhow::Result;
use std::time::{Duration, Instant};

use super::types::ProbeOutcome;

/// Issues one request against a site.
///
/// Implementations never fail: transport problems are reported through the
/// `connect_failed`/`connect_timeout` flags of the outcome.
#[async_trait::async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, url: &str, timeout: Duration) -> ProbeOutcome;
}

/// HTTP/HTTPS probe
pub struct HttpProbe {
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl Probe for HttpProbe {
    async fn probe(&self, url: &str, timeout: Duration) -> ProbeOutcome {
        let start = Instant::now();

        let request = async {
            let response = self.client.get(url).send().await?;
            let connect_time = start.elapsed();
            let status_code = response.status().as_u16();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status_code, body, connect_time))
        };

        match tokio::time::timeout(timeout, request).await {
            Ok(Ok((status_code, body, connect_time))) => ProbeOutcome {
                status_code: Some(status_code),
                body: Some(body),
                connect_time,
                response_time: start.elapsed(),
                ..Default::default()
            },
            Ok(Err(e)) if e.is_timeout() => ProbeOutcome::timed_out(start.elapsed()),
            Ok(Err(e)) => {
                tracing::debug!(url, error = %e, "HTTP request failed");
                ProbeOutcome {
                    connect_failed: true,
                    connect_time: start.elapsed(),
                    response_time: start.elapsed(),
                    ..Default::default()
                }
            }
            Err(_) => ProbeOutcome::timed_out(start.elapsed()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reports_status_and_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/health")
            .match_header("user-agent", "sitewatch-test")
            .with_status(503)
            .with_body("maintenance")
            .create_async()
            .await;

        let probe = HttpProbe::new("sitewatch-test").unwrap();
        let outcome = probe.probe(&format!("{}/health", server.url()), Duration::from_secs(5)).await;

        mock.assert_async().await;
        assert_eq!(outcome.status_code, Some(503));
        assert_eq!(outcome.body.as_deref(), Some("maintenance"));
        assert!(!outcome.connect_failed);
        assert!(outcome.response_time >= outcome.connect_time);
    }

    #[tokio::test]
    async fn redirects_are_not_followed() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/old")
            .with_status(301)
            .with_header("location", "/new")
            .create_async()
            .await;

        let probe = HttpProbe::new("sitewatch-test").unwrap();
        let outcome = probe.probe(&format!("{}/old", server.url()), Duration::from_secs(5)).await;
        assert_eq!(outcome.status_code, Some(301));
    }

    #[tokio::test]
    async fn unreachable_host_is_a_connect_failure() {
        // Bind then drop a listener so the port is known to be closed.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let probe = HttpProbe::new("sitewatch-test").unwrap();
        let outcome = probe.probe(&format!("http://{addr}/"), Duration::from_secs(5)).await;

        assert!(outcome.connect_failed);
        assert_eq!(outcome.status_code, None);
    }

    #[tokio::test]
    async fn slow_server_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept and never answer.
        let _server = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let probe = HttpProbe::new("sitewatch-test").unwrap();
        let outcome = probe.probe(&format!("http://{addr}/"), Duration::from_millis(200)).await;

        assert!(outcome.connect_timeout);
        assert!(outcome.connect_failed);
    }
}
