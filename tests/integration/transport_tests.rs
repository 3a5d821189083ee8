use judgment_harvest::config::{TransportConfig, UserAgentConfig};
use judgment_harvest::crawler::{FetchError, Transport};
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_transport(retries: u32) -> Transport {
    transport_with_timeout(retries, 5)
}

fn transport_with_timeout(retries: u32, timeout_secs: u64) -> Transport {
    let config = TransportConfig {
        timeout_secs,
        connect_timeout_secs: 5,
        retries,
        backoff_base_ms: 1,
        ..TransportConfig::default()
    };
    let user_agent = UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: Some("https://example.com/bot".to_string()),
    };
    Transport::new(&config, &user_agent).expect("Failed to build transport")
}

#[tokio::test]
async fn test_sends_configured_user_agent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/doc"))
        .and(header("user-agent", "TestBot/1.0.0 (+https://example.com/bot)"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let body = test_transport(0)
        .fetch(&format!("{}/doc", mock_server.uri()))
        .await
        .unwrap();
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn test_retryable_status_is_retried_until_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("recovered"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let body = test_transport(3)
        .fetch(&format!("{}/flaky", mock_server.uri()))
        .await
        .unwrap();
    assert_eq!(body, "recovered");
}

#[tokio::test]
async fn test_rate_limit_is_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/limited"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/limited"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let result = test_transport(1)
        .fetch(&format!("{}/limited", mock_server.uri()))
        .await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_retries_exhausted() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3) // 1 attempt + 2 retries
        .mount(&mock_server)
        .await;

    let err = test_transport(2)
        .fetch(&format!("{}/down", mock_server.uri()))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        FetchError::Status {
            status: 500,
            attempts: 3,
            ..
        }
    ));
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let mock_server = MockServer::start().await;

    for (route, status) in [("/missing", 404), ("/forbidden", 403), ("/gone", 410)] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status))
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    let transport = test_transport(3);
    for (route, status) in [("/missing", 404), ("/forbidden", 403), ("/gone", 410)] {
        let err = transport
            .fetch(&format!("{}{}", mock_server.uri(), route))
            .await
            .unwrap_err();
        assert_eq!(err.attempts(), 1);
        assert!(matches!(err, FetchError::Status { status: s, .. } if s == status));
    }
}

#[tokio::test]
async fn test_connection_refused_surfaces_after_retries() {
    // Nothing listens on the discard port
    let err = test_transport(1)
        .fetch("http://127.0.0.1:9/doc")
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Network { attempts: 2, .. }));
}

#[tokio::test]
async fn test_timeout_is_retried_until_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("late")
                .set_delay(Duration::from_millis(1500)),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_body_string("on time"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let body = transport_with_timeout(2, 1)
        .fetch(&format!("{}/slow", mock_server.uri()))
        .await
        .unwrap();
    assert_eq!(body, "on time");
}

#[tokio::test]
async fn test_timeouts_exhaust_retries() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/stalled"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("never seen")
                .set_delay(Duration::from_millis(1500)),
        )
        .expect(2) // 1 attempt + 1 retry
        .mount(&mock_server)
        .await;

    let err = transport_with_timeout(1, 1)
        .fetch(&format!("{}/stalled", mock_server.uri()))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Timeout { attempts: 2, .. }));
}
