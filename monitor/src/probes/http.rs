use std::time::{Duration, Instant};

use crate::constants::probes::HTTP_SUCCESS_CEILING;
use crate::types::CheckResult;

pub(super) async fn probe(
    client: &reqwest::Client,
    url: &str,
    expected_status: Option<u16>,
    timeout: Duration,
) -> CheckResult {
    let start = Instant::now();
    let response = client.get(url).timeout(timeout).send().await;
    let elapsed = start.elapsed().as_millis() as u64;

    match response {
        Ok(response) => {
            let code = response.status().as_u16();
            let passed = match expected_status {
                Some(expected) => code == expected,
                None => code < HTTP_SUCCESS_CEILING,
            };

            if passed {
                CheckResult::up(elapsed, format!("HTTP {}", code))
            } else {
                let mut result = match expected_status {
                    Some(expected) => {
                        CheckResult::down(elapsed, format!("expected HTTP {}, got {}", expected, code))
                    }
                    None => CheckResult::down(elapsed, format!("HTTP {}", code)),
                };
                result.details = Some(format!("HTTP {}", code));
                result
            }
        }
        Err(e) if e.is_timeout() => CheckResult::down(
            elapsed,
            format!("request timed out after {}ms", timeout.as_millis()),
        ),
        Err(e) => CheckResult::down(elapsed, format!("request failed: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn server_returning(status: u16) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_success_status_is_up() {
        let server = server_returning(204).await;
        let url = format!("{}/health", server.uri());

        let result = probe(&reqwest::Client::new(), &url, None, Duration::from_secs(2)).await;
        assert!(result.is_up());
        assert_eq!(result.details.as_deref(), Some("HTTP 204"));
    }

    #[tokio::test]
    async fn test_server_error_is_down() {
        let server = server_returning(503).await;
        let url = format!("{}/health", server.uri());

        let result = probe(&reqwest::Client::new(), &url, None, Duration::from_secs(2)).await;
        assert!(!result.is_up());
        assert_eq!(result.error.as_deref(), Some("HTTP 503"));
    }

    #[tokio::test]
    async fn test_expected_status_must_match() {
        let server = server_returning(401).await;
        let url = format!("{}/health", server.uri());
        let client = reqwest::Client::new();

        let matched = probe(&client, &url, Some(401), Duration::from_secs(2)).await;
        assert!(matched.is_up());

        let mismatched = probe(&client, &url, Some(200), Duration::from_secs(2)).await;
        assert!(!mismatched.is_up());
        assert!(mismatched.error.unwrap().contains("expected HTTP 200"));
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let result = probe(
            &reqwest::Client::new(),
            &server.uri(),
            None,
            Duration::from_millis(100),
        )
        .await;
        assert!(!result.is_up());
        assert!(result.error.unwrap().contains("timed out"));
    }
}
