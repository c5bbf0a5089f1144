use std::error::Error;
use std::time::{Duration, Instant};

use hoops_engine::{FailureKind, FetchError, FetchSettings, Fetcher, ReqwestFetcher};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_settings() -> FetchSettings {
    FetchSettings {
        request_delay: Duration::ZERO,
        ..FetchSettings::default()
    }
}

async fn request_count(server: &MockServer) -> usize {
    server.received_requests().await.unwrap_or_default().len()
}

#[tokio::test]
async fn fetcher_returns_decoded_html() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/doc"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<html>caf\u{e9}</html>", "text/html; charset=utf-8"),
        )
        .mount(&server)
        .await;

    let fetcher = ReqwestFetcher::new(fast_settings()).unwrap();
    let html = fetcher.fetch(&format!("{}/doc", server.uri())).await.unwrap();

    assert_eq!(html, "<html>café</html>");
}

#[tokio::test]
async fn retryable_statuses_then_success_takes_n_plus_one_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>ok</p>"))
        .with_priority(2)
        .mount(&server)
        .await;

    let fetcher = ReqwestFetcher::new(fast_settings()).unwrap();
    let html = fetcher
        .fetch(&format!("{}/flaky", server.uri()))
        .await
        .unwrap();

    assert_eq!(html, "<p>ok</p>");
    assert_eq!(request_count(&server).await, 3);
}

const PACING: Duration = Duration::from_millis(150);

fn paced_settings() -> FetchSettings {
    FetchSettings {
        request_delay: PACING,
        ..FetchSettings::default()
    }
}

#[tokio::test]
async fn first_request_waits_for_the_pacing_delay() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/doc"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>ok</p>"))
        .mount(&server)
        .await;

    let fetcher = ReqwestFetcher::new(paced_settings()).unwrap();
    let started = Instant::now();
    fetcher.fetch(&format!("{}/doc", server.uri())).await.unwrap();

    assert!(started.elapsed() >= PACING, "took {:?}", started.elapsed());
}

#[tokio::test]
async fn retry_waits_for_backoff_and_pacing_again() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>ok</p>"))
        .with_priority(2)
        .mount(&server)
        .await;

    let settings = paced_settings();
    let backoff = settings.backoff_delay(1);
    let fetcher = ReqwestFetcher::new(settings).unwrap();
    let started = Instant::now();
    fetcher
        .fetch(&format!("{}/flaky", server.uri()))
        .await
        .unwrap();

    // Pacing before each of the two attempts plus one backoff between them.
    let floor = PACING * 2 + backoff;
    assert!(started.elapsed() >= floor, "took {:?}, expected at least {:?}", started.elapsed(), floor);
    assert_eq!(request_count(&server).await, 2);
}

#[tokio::test]
async fn persistent_rate_limiting_exhausts_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let fetcher = ReqwestFetcher::new(fast_settings()).unwrap();
    let err = fetcher
        .fetch(&format!("{}/busy", server.uri()))
        .await
        .unwrap_err();

    assert_eq!(err.kind, FailureKind::RetriesExhausted { attempts: 3 });
    assert_eq!(err.last_kind(), &FailureKind::HttpStatus(429));
    assert_eq!(request_count(&server).await, 3);
}

#[tokio::test]
async fn not_found_fails_after_one_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fetcher = ReqwestFetcher::new(fast_settings()).unwrap();
    let err = fetcher
        .fetch(&format!("{}/missing", server.uri()))
        .await
        .unwrap_err();

    assert_eq!(err.kind, FailureKind::HttpStatus(404));
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn transport_errors_are_retried_and_chained() {
    let settings = FetchSettings {
        max_attempts: 2,
        connect_timeout: Duration::from_millis(200),
        ..fast_settings()
    };
    let fetcher = ReqwestFetcher::new(settings).unwrap();

    let err = fetcher.fetch("http://127.0.0.1:1/").await.unwrap_err();

    assert_eq!(err.kind, FailureKind::RetriesExhausted { attempts: 2 });
    let last = err
        .source()
        .and_then(|cause| cause.downcast_ref::<FetchError>())
        .expect("last attempt chained as cause");
    assert!(matches!(last.kind, FailureKind::Network | FailureKind::Timeout));
}

#[tokio::test]
async fn oversized_body_is_rejected_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/large"))
        .respond_with(ResponseTemplate::new(200).set_body_string("01234567890"))
        .mount(&server)
        .await;

    let settings = FetchSettings {
        max_bytes: 10,
        ..fast_settings()
    };
    let fetcher = ReqwestFetcher::new(settings).unwrap();
    let err = fetcher
        .fetch(&format!("{}/large", server.uri()))
        .await
        .unwrap_err();

    assert_eq!(
        err.kind,
        FailureKind::TooLarge {
            max_bytes: 10,
            actual: Some(11)
        }
    );
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn invalid_url_is_rejected_before_any_request() {
    let fetcher = ReqwestFetcher::new(fast_settings()).unwrap();
    let err = fetcher.fetch("not a url").await.unwrap_err();
    assert_eq!(err.kind, FailureKind::InvalidUrl);
}
