//! HttpFetcher against a local mock server
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use unpage_core::*;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_config() -> FetchConfig {
    FetchConfig { timeout: 5, empty_body_backoff: Duration::from_millis(10), ..Default::default() }
}

fn read_site_fixture(site: &str, name: &str) -> String {
    std::fs::read_to_string(format!("../../tests/fixtures/sites/{}/{}", site, name)).unwrap()
}

#[tokio::test]
async fn fetcher_returns_body_and_sends_user_agent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a/title/p-1"))
        .and(header("User-Agent", "unpage-test"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<html>ok</html>", "text/html; charset=utf-8"))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(FetchConfig { user_agent: "unpage-test".to_string(), ..fast_config() }).unwrap();
    let body = fetcher.fetch(&format!("{}/a/title/p-1", server.uri())).await.unwrap();

    assert_eq!(body, "<html>ok</html>");
}

#[tokio::test]
async fn fetcher_fails_on_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(fast_config()).unwrap();
    let err = fetcher.fetch(&format!("{}/missing", server.uri())).await.unwrap_err();

    assert!(matches!(err, UnpageError::HttpStatus { status: 404, .. }));
}

#[tokio::test]
async fn fetcher_retries_empty_body_then_gives_up() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/empty"))
        .respond_with(ResponseTemplate::new(200).set_body_string("  \n"))
        .expect(3)
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(fast_config()).unwrap();
    let err = fetcher.fetch(&format!("{}/empty", server.uri())).await.unwrap_err();

    assert!(matches!(err, UnpageError::EmptyResponse { .. }));
}

#[tokio::test]
async fn fetcher_times_out_on_slow_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_body_string("late").set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(FetchConfig { timeout: 1, ..fast_config() }).unwrap();
    let err = fetcher.fetch(&format!("{}/slow", server.uri())).await.unwrap_err();

    assert!(matches!(err, UnpageError::Timeout { timeout: 1 }));
}

#[tokio::test]
async fn fetcher_rejects_non_http_urls() {
    let fetcher = HttpFetcher::new(fast_config()).unwrap();
    let err = fetcher.fetch("ftp://example.com/a/title/p-1").await.unwrap_err();
    assert!(matches!(err, UnpageError::InvalidUrl(_)));
}

#[tokio::test]
async fn gallery_over_http() {
    let server = MockServer::start().await;
    for page in 1..=3 {
        Mock::given(method("GET"))
            .and(path(format!("/a/10-facts-about-octopuses/p-{}", page)))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(read_site_fixture("knowable", &format!("page{}.html", page)), "text/html"),
            )
            .expect(1)
            .mount(&server)
            .await;
    }

    let site = SiteDescriptor {
        id: "127.0.0.1".to_string(),
        ..sites::knowable::descriptor()
    };
    let fetcher = Arc::new(HttpFetcher::new(fast_config()).unwrap());
    let paginator = Paginator::new(fetcher, SessionConfig::default());
    let mut live = StaticDocument::new(read_site_fixture("knowable", "live.html"));

    let outcome = paginator
        .run_session(
            &format!("{}/a/10-facts-about-octopuses", server.uri()),
            &site,
            &mut live,
            &TracingReporter,
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(outcome.pages_loaded(), Some(3));
    assert!(live.html().contains("Most of their neurons live in their arms."));
    assert!(live.html().contains(&format!(r#"src="{}/img/octopus/3.jpg""#, server.uri())));
}
