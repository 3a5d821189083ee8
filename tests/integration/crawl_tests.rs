use crate::common::{
    create_test_config, document_body, mount_document, mount_listing, stored_files, LISTING_PATH,
};
use judgment_harvest::crawler::Coordinator;
use judgment_harvest::output::{load_failed_ids, write_failed_ids};
use judgment_harvest::state::FailureReason;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_page_with_duplicate_and_unrelated_links() {
    let mock_server = MockServer::start().await;
    let output = TempDir::new().unwrap();

    mount_listing(
        &mock_server,
        1,
        &["/gd/s/ABC123", "/gd/s/ABC123", "/gd/s/XYZ789", "/other/page"],
    )
    .await;
    mount_document(&mock_server, "ABC123", 1).await;
    mount_document(&mock_server, "XYZ789", 1).await;

    Mock::given(method("GET"))
        .and(path("/other/page"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0) // Should never be called
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), output.path(), 1);
    let coordinator = Coordinator::new(config).expect("Failed to create coordinator");

    let result = coordinator.process_page(1).await;
    assert!(result.listing_fetched);
    assert_eq!(result.links_found, 2);
    assert_eq!(result.written, 2);
    assert_eq!(result.skipped, 0);
    assert_eq!(result.failed, 0);
    assert_eq!(coordinator.state().total_downloaded(), 2);

    assert_eq!(
        stored_files(output.path()),
        vec!["ABC123.html".to_string(), "XYZ789.html".to_string()]
    );
    let stored = std::fs::read_to_string(output.path().join("ABC123.html")).unwrap();
    assert_eq!(stored, document_body("ABC123"));
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let mock_server = MockServer::start().await;
    let output = TempDir::new().unwrap();

    mount_listing(&mock_server, 1, &["/gd/s/A1", "/gd/s/A2"]).await;
    mount_listing(&mock_server, 2, &["/gd/s/B1", "/gd/s/B2", "/gd/s/B3"]).await;
    for id in ["A1", "A2", "B1", "B2", "B3"] {
        // Exactly once across both runs
        mount_document(&mock_server, id, 1).await;
    }

    let config = create_test_config(&mock_server.uri(), output.path(), 2);

    let first = Coordinator::new(config.clone())
        .expect("Failed to create coordinator")
        .run()
        .await;
    assert_eq!(first.pages_visited, 2);
    assert_eq!(first.documents_written, 5);
    assert_eq!(first.documents_skipped, 0);
    assert_eq!(first.total_failed(), 0);
    let files_after_first = stored_files(output.path());

    let second = Coordinator::new(config)
        .expect("Failed to create coordinator")
        .run()
        .await;
    assert_eq!(second.documents_written, 0);
    assert_eq!(second.documents_skipped, 5);
    assert_eq!(second.total_failed(), 0);
    assert_eq!(stored_files(output.path()), files_after_first);
}

#[tokio::test]
async fn test_one_failing_document_does_not_affect_siblings() {
    let mock_server = MockServer::start().await;
    let output = TempDir::new().unwrap();

    mount_listing(
        &mock_server,
        1,
        &["/gd/s/D1", "/gd/s/D2", "/gd/s/BAD3", "/gd/s/D4", "/gd/s/D5"],
    )
    .await;
    for id in ["D1", "D2", "D4"] {
        mount_document(&mock_server, id, 1).await;
    }
    Mock::given(method("GET"))
        .and(path("/gd/s/BAD3"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1) // Not retried
        .mount(&mock_server)
        .await;

    // A document already on disk counts as skipped
    std::fs::write(output.path().join("D5.html"), "previous run").unwrap();
    Mock::given(method("GET"))
        .and(path("/gd/s/D5"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), output.path(), 1);
    let coordinator = Coordinator::new(config).expect("Failed to create coordinator");
    let result = coordinator.process_page(1).await;

    assert_eq!(result.links_found, 5);
    assert_eq!(result.written, 3);
    assert_eq!(result.skipped, 1);
    assert_eq!(result.failed, 1);
    assert_eq!(result.written + result.skipped + result.failed, 5);

    assert_eq!(coordinator.state().failed_ids(), vec!["BAD3".to_string()]);
    assert!(matches!(
        coordinator.state().failed_documents()[0].reason,
        FailureReason::Fetch(_)
    ));
    assert!(!output.path().join("BAD3.html").exists());
    assert_eq!(
        std::fs::read_to_string(output.path().join("D5.html")).unwrap(),
        "previous run"
    );
}

#[tokio::test]
async fn test_short_response_is_failed_not_written() {
    let mock_server = MockServer::start().await;
    let output = TempDir::new().unwrap();

    mount_listing(&mock_server, 1, &["/gd/s/OK1", "/gd/s/CAPTCHA"]).await;
    mount_document(&mock_server, "OK1", 1).await;
    Mock::given(method("GET"))
        .and(path("/gd/s/CAPTCHA"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Please wait"))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), output.path(), 1);
    let coordinator = Coordinator::new(config).expect("Failed to create coordinator");
    let result = coordinator.process_page(1).await;

    assert_eq!(result.written, 1);
    assert_eq!(result.failed, 1);
    assert!(!output.path().join("CAPTCHA.html").exists());
    assert!(matches!(
        coordinator.state().failed_documents()[0].reason,
        FailureReason::TooShort { len: 11, .. }
    ));
    assert_eq!(stored_files(output.path()), vec!["OK1.html".to_string()]);
}

#[tokio::test]
async fn test_listing_failure_is_not_fatal() {
    let mock_server = MockServer::start().await;
    let output = TempDir::new().unwrap();

    // Page 1 keeps failing; 1 attempt + 2 retries
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .and(query_param("CurrentPage", "1"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&mock_server)
        .await;
    mount_listing(&mock_server, 2, &["/gd/s/P2A"]).await;
    mount_document(&mock_server, "P2A", 1).await;

    let config = create_test_config(&mock_server.uri(), output.path(), 2);
    let coordinator = Coordinator::new(config).expect("Failed to create coordinator");

    let summary = coordinator.run().await;
    assert_eq!(summary.pages_visited, 2);
    assert_eq!(summary.last_page, Some(2));
    assert_eq!(summary.documents_written, 1);
    assert_eq!(summary.total_failed(), 0);
}

#[tokio::test]
async fn test_stops_after_consecutive_empty_pages() {
    let mock_server = MockServer::start().await;
    let output = TempDir::new().unwrap();

    mount_listing(&mock_server, 1, &["/gd/s/ONLY1"]).await;
    mount_document(&mock_server, "ONLY1", 1).await;
    mount_listing(&mock_server, 2, &[]).await;
    mount_listing(&mock_server, 3, &["/other/page"]).await;
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .and(query_param("CurrentPage", "4"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri(), output.path(), 1040);
    config.crawler.stop_after_empty_pages = Some(2);
    let summary = Coordinator::new(config)
        .expect("Failed to create coordinator")
        .run()
        .await;

    assert!(summary.stopped_on_empty_pages);
    assert_eq!(summary.pages_visited, 3);
    assert_eq!(summary.last_page, Some(3));
    assert_eq!(summary.documents_written, 1);
}

const PAGE_DELAY_MS: u64 = 300;

#[tokio::test]
async fn test_delay_is_applied_between_pages_only() {
    let mock_server = MockServer::start().await;
    let output = TempDir::new().unwrap();

    for page in 1..=3 {
        mount_listing(&mock_server, page, &[]).await;
    }

    let mut config = create_test_config(&mock_server.uri(), output.path(), 3);
    config.crawler.page_delay_ms = PAGE_DELAY_MS;
    let coordinator = Coordinator::new(config).expect("Failed to create coordinator");

    let started = Instant::now();
    let summary = coordinator.run().await;
    let elapsed = started.elapsed();

    assert_eq!(summary.pages_visited, 3);
    // Two gaps between three pages, none after the last
    assert!(elapsed >= Duration::from_millis(2 * PAGE_DELAY_MS), "{:?}", elapsed);
    assert!(elapsed < Duration::from_millis(3 * PAGE_DELAY_MS), "{:?}", elapsed);
}

#[tokio::test]
async fn test_no_delay_after_early_stop() {
    let mock_server = MockServer::start().await;
    let output = TempDir::new().unwrap();

    for page in 1..=2 {
        mount_listing(&mock_server, page, &[]).await;
    }

    let mut config = create_test_config(&mock_server.uri(), output.path(), 10);
    config.crawler.page_delay_ms = PAGE_DELAY_MS;
    config.crawler.stop_after_empty_pages = Some(2);
    let coordinator = Coordinator::new(config).expect("Failed to create coordinator");

    let started = Instant::now();
    let summary = coordinator.run().await;
    let elapsed = started.elapsed();

    assert!(summary.stopped_on_empty_pages);
    assert_eq!(summary.pages_visited, 2);
    assert!(elapsed >= Duration::from_millis(PAGE_DELAY_MS), "{:?}", elapsed);
    assert!(elapsed < Duration::from_millis(2 * PAGE_DELAY_MS), "{:?}", elapsed);
}

#[tokio::test]
async fn test_progress_reported_every_page() {
    let mock_server = MockServer::start().await;
    let output = TempDir::new().unwrap();

    mount_listing(&mock_server, 1, &["/gd/s/P1"]).await;
    mount_document(&mock_server, "P1", 1).await;
    mount_listing(&mock_server, 2, &["/gd/s/P2"]).await;
    mount_document(&mock_server, "P2", 1).await;

    let mut config = create_test_config(&mock_server.uri(), output.path(), 2);
    config.crawler.progress_interval = 1;
    let summary = Coordinator::new(config)
        .expect("Failed to create coordinator")
        .run()
        .await;

    assert_eq!(summary.pages_visited, 2);
    assert_eq!(summary.documents_written, 2);
}

#[tokio::test]
async fn test_full_range_is_scanned_without_empty_page_limit() {
    let mock_server = MockServer::start().await;
    let output = TempDir::new().unwrap();

    for page in 1..=4 {
        mount_listing(&mock_server, page, &[]).await;
    }

    let config = create_test_config(&mock_server.uri(), output.path(), 4);
    let summary = Coordinator::new(config)
        .expect("Failed to create coordinator")
        .run()
        .await;

    assert!(!summary.stopped_on_empty_pages);
    assert_eq!(summary.pages_visited, 4);
    assert_eq!(summary.documents_written, 0);
}

#[tokio::test]
async fn test_retry_failed_identifiers() {
    let mock_server = MockServer::start().await;
    let output = TempDir::new().unwrap();
    let failed_path = output.path().join("failed.txt");

    mount_listing(&mock_server, 1, &["/gd/s/FLAKY1", "/gd/s/OK2"]).await;
    mount_document(&mock_server, "OK2", 1).await;

    // First run: the document is unavailable
    Mock::given(method("GET"))
        .and(path("/gd/s/FLAKY1"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(3)
        .expect(3)
        .mount(&mock_server)
        .await;

    let docs_dir = output.path().join("docs");
    let config = create_test_config(&mock_server.uri(), &docs_dir, 1);

    let first = Coordinator::new(config.clone())
        .expect("Failed to create coordinator")
        .run()
        .await;
    assert_eq!(first.failed_ids(), vec!["FLAKY1"]);
    write_failed_ids(&first, &failed_path).unwrap();

    // Re-run: the document is back
    mount_document(&mock_server, "FLAKY1", 1).await;

    let ids = load_failed_ids(&failed_path).unwrap();
    let retry = Coordinator::new(config)
        .expect("Failed to create coordinator")
        .retry_ids(&ids)
        .await;

    assert_eq!(retry.documents_written, 1);
    assert_eq!(retry.total_failed(), 0);
    assert_eq!(
        stored_files(&docs_dir),
        vec!["FLAKY1.html".to_string(), "OK2.html".to_string()]
    );
}
