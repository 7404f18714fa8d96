//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use sitewalk::config::Config;
use sitewalk::crawler::CrawlProgress;
use sitewalk::{crawl, CrawlPhase, Crawler, PageStatus, SessionRegistry};
use wiremock::matchers::{header, header_exists, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a configuration suited to a local mock server
///
/// No jitter, a small fixed baseline and near-instant retry cool-downs.
fn create_test_config() -> Config {
    let mut config = Config::default();
    config.crawler.jitter_min_ms = 0;
    config.crawler.jitter_max_ms = 0;
    config.crawler.baseline_concurrency = Some(4);
    config.crawler.min_concurrency = 1;
    config.crawler.request_timeout_secs = 2;
    config.crawler.connect_timeout_secs = 1;
    config.crawler.max_backoff_ms = 1_000;
    config.retry.cooldown_ms = 10;
    config
}

/// An HTML page with a title and the given links
fn html_page(title: &str, links: &[&str]) -> ResponseTemplate {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a href="{}">{}</a>"#, href, href))
        .collect();
    let body = format!(
        "<html><head><title>{}</title></head><body>{}</body></html>",
        title, anchors
    );
    ResponseTemplate::new(200).set_body_raw(body, "text/html")
}

async fn mount_page(server: &MockServer, route: &str, title: &str, links: &[&str]) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html_page(title, links))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_crawl_single_domain() {
    let mock_server = MockServer::start().await;

    mount_page(&mock_server, "/", "Home", &["/page1", "/page2/", "#top"]).await;
    mount_page(&mock_server, "/page1", "Page 1", &["/page2", "/page3?ref=nav"]).await;
    mount_page(&mock_server, "/page2", "Page 2", &["/"]).await;
    mount_page(&mock_server, "/page3", "Page 3", &[]).await;

    let report = crawl(create_test_config(), &mock_server.uri(), 100)
        .await
        .expect("crawl should start");

    assert_eq!(report.phase, CrawlPhase::Completed);
    assert_eq!(report.pages.len(), 4);
    assert!(report.error_summary.is_empty());
    assert!(report.finished_at.is_some());

    let base = format!("{}/", mock_server.uri());
    assert_eq!(report.pages[0].url, base);
    assert_eq!(report.pages[0].title, "Home");

    let titles: HashSet<_> = report.pages.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, HashSet::from(["Home", "Page 1", "Page 2", "Page 3"]));
    assert!(report
        .pages
        .iter()
        .all(|p| p.status == PageStatus::Success && p.retry_count == 0));
}

#[tokio::test]
async fn test_cap_enforcement() {
    let mock_server = MockServer::start().await;

    let links: Vec<String> = (0..100).map(|i| format!("/p{}", i)).collect();
    let link_refs: Vec<&str> = links.iter().map(String::as_str).collect();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page("Home", &link_refs))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/p\d+$"))
        .respond_with(html_page("Leaf", &[]))
        .mount(&mock_server)
        .await;

    let report = crawl(create_test_config(), &mock_server.uri(), 5)
        .await
        .expect("crawl should start");

    // Cap is checked before dispatch, so the last batch (size 4) may overshoot
    assert!(report.pages.len() >= 5, "got {} pages", report.pages.len());
    assert!(report.pages.len() <= 5 + 4 - 1, "got {} pages", report.pages.len());
    assert_eq!(report.phase, CrawlPhase::Completed);
}

#[tokio::test]
async fn test_each_url_fetched_at_most_once() {
    let mock_server = MockServer::start().await;

    // Every page links to every other page, in several spellings
    let links = ["/", "/a", "/a/", "/b#frag", "/b?x=1", "/c"];
    for route in ["/", "/a", "/b", "/c"] {
        mount_page(&mock_server, route, route, &links).await;
    }

    let report = crawl(create_test_config(), &mock_server.uri(), 100)
        .await
        .expect("crawl should start");

    let unique: HashSet<_> = report.pages.iter().map(|p| p.url.as_str()).collect();
    assert_eq!(unique.len(), report.pages.len());
    assert_eq!(report.pages.len(), 4);
    // The `expect(1)` on every mock is verified when the server drops
}

#[tokio::test]
async fn test_domain_boundary_and_resource_filter() {
    let mock_server = MockServer::start().await;
    let port = url::Url::parse(&mock_server.uri())
        .unwrap()
        .port()
        .unwrap();

    // Same server reached through another host name must not be followed
    let other_host = format!("http://localhost:{}/external", port);

    mount_page(
        &mock_server,
        "/",
        "Home",
        &[other_host.as_str(), "/brochure.pdf", "/logo.png", "mailto:a@b.c", "/inside"],
    )
    .await;
    mount_page(&mock_server, "/inside", "Inside", &[]).await;

    for route in ["/external", "/brochure.pdf", "/logo.png"] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;
    }

    let report = crawl(create_test_config(), &mock_server.uri(), 100)
        .await
        .expect("crawl should start");

    assert_eq!(report.pages.len(), 2);
}

#[tokio::test]
async fn test_non_html_content_handling() {
    let mock_server = MockServer::start().await;

    mount_page(&mock_server, "/", "Home", &["/feed", "/untitled"]).await;

    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(r#"{"links": ["<a href=\"/hidden\">x</a>"]}"#, "application/json"),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/untitled"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("<html><body>No title</body></html>", "text/html"),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/hidden"))
        .respond_with(html_page("Hidden", &[]))
        .expect(0)
        .mount(&mock_server)
        .await;

    let report = crawl(create_test_config(), &mock_server.uri(), 100)
        .await
        .expect("crawl should start");

    assert_eq!(report.pages.len(), 3);

    let feed_url = format!("{}/feed", mock_server.uri());
    let feed = report
        .pages
        .iter()
        .find(|p| p.url == feed_url)
        .expect("feed page recorded");
    assert_eq!(feed.status, PageStatus::NonHtml);
    assert_eq!(feed.title, feed_url);
    assert_eq!(feed.error, None);

    let untitled_url = format!("{}/untitled", mock_server.uri());
    let untitled = report
        .pages
        .iter()
        .find(|p| p.url == untitled_url)
        .expect("untitled page recorded");
    assert_eq!(untitled.status, PageStatus::Success);
    assert_eq!(untitled.title, untitled_url);
}

#[tokio::test]
async fn test_retry_convergence() {
    let mock_server = MockServer::start().await;

    mount_page(&mock_server, "/", "Home", &["/flaky", "/dead"]).await;

    // Fails in the primary pass and retry rounds 1 and 2, then recovers
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(3)
        .expect(3)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(html_page("Finally", &["/found-late"]))
        .expect(1)
        .mount(&mock_server)
        .await;

    // Fails in the primary pass and all three retry rounds
    Mock::given(method("GET"))
        .and(path("/dead"))
        .respond_with(ResponseTemplate::new(500))
        .expect(4)
        .mount(&mock_server)
        .await;

    // Links found by a retried page are only queued, never fetched
    Mock::given(method("GET"))
        .and(path("/found-late"))
        .respond_with(html_page("Late", &[]))
        .expect(0)
        .mount(&mock_server)
        .await;

    let crawler = Crawler::new(create_test_config()).unwrap();
    let handle = crawler.start(&mock_server.uri(), 100).unwrap();
    let report = handle.wait().await;

    assert_eq!(report.phase, CrawlPhase::Completed);
    assert_eq!(report.pages.len(), 3);

    let flaky_url = format!("{}/flaky", mock_server.uri());
    let flaky = report.pages.iter().find(|p| p.url == flaky_url).unwrap();
    assert_eq!(flaky.status, PageStatus::Success);
    assert_eq!(flaky.retry_count, 3);
    assert_eq!(flaky.title, "Finally");
    assert_eq!(flaky.error, None);
    assert!(flaky.retried_at.is_some());
    assert!(flaky.retried_at.unwrap() >= flaky.discovered_at);

    let dead_url = format!("{}/dead", mock_server.uri());
    let dead = report.pages.iter().find(|p| p.url == dead_url).unwrap();
    assert_eq!(dead.status, PageStatus::Error);
    assert_eq!(dead.retry_count, 3);
    assert_eq!(dead.error.as_deref(), Some("500 Internal Server Error"));
    assert_eq!(dead.retried_at, None);

    assert_eq!(report.error_summary.len(), 1);
    assert_eq!(report.error_summary[0].url, dead_url);
    assert_eq!(report.error_summary[0].error, "500 Internal Server Error");
    assert_eq!(report.error_summary[0].retry_count, 3);

    // The recovered page's link was queued for a later session
    assert_eq!(handle.status().pages_queued, 1);
    assert_eq!(handle.status().errors, 1);
}

#[tokio::test]
async fn test_no_retry_rounds_configured() {
    let mock_server = MockServer::start().await;

    mount_page(&mock_server, "/", "Home", &["/missing"]).await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config();
    config.retry.max_rounds = 0;

    let report = crawl(config, &mock_server.uri(), 100).await.unwrap();

    assert_eq!(report.error_summary.len(), 1);
    assert_eq!(report.error_summary[0].error, "404 Not Found");
    assert_eq!(report.error_summary[0].retry_count, 0);
}

#[tokio::test]
async fn test_rate_limit_triggers_backoff() {
    let mock_server = MockServer::start().await;

    mount_page(&mock_server, "/", "Home", &["/limited", "/next"]).await;
    mount_page(&mock_server, "/next", "Next", &["/after"]).await;
    mount_page(&mock_server, "/after", "After", &[]).await;

    Mock::given(method("GET"))
        .and(path("/limited"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&mock_server)
        .await;

    let mut config = create_test_config();
    config.retry.max_rounds = 0;

    let started = Instant::now();
    let report = crawl(config, &mock_server.uri(), 100).await.unwrap();

    // The batch holding the 429 forces a one-second pause before /after
    assert!(started.elapsed() >= Duration::from_secs(1));
    assert_eq!(report.pages.len(), 4);

    let limited_url = format!("{}/limited", mock_server.uri());
    let limited = report.pages.iter().find(|p| p.url == limited_url).unwrap();
    assert_eq!(limited.status, PageStatus::Error);
    assert_eq!(limited.error.as_deref(), Some("429 Too Many Requests"));
}

#[tokio::test]
async fn test_browser_header_set() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("dnt", "1"))
        .and(header("user-agent", "SitewalkTest/1.0"))
        .and(header("sec-fetch-mode", "navigate"))
        .and(header_exists("accept"))
        .and(header_exists("accept-language"))
        .and(header_exists("accept-encoding"))
        .respond_with(html_page("Home", &[]))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config();
    config.user_agent.pool = vec!["SitewalkTest/1.0".to_string()];

    let report = crawl(config, &mock_server.uri(), 10).await.unwrap();

    assert_eq!(report.pages.len(), 1);
    assert_eq!(report.pages[0].status, PageStatus::Success);
    assert_eq!(report.pages[0].title, "Home");
}

#[tokio::test]
async fn test_stop_is_honored() {
    let mock_server = MockServer::start().await;

    let links: Vec<String> = (0..50).map(|i| format!("/slow{}", i)).collect();
    let link_refs: Vec<&str> = links.iter().map(String::as_str).collect();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page("Home", &link_refs).set_delay(Duration::from_millis(300)))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/slow\d+$"))
        .respond_with(html_page("Slow", &[]).set_delay(Duration::from_millis(300)))
        .mount(&mock_server)
        .await;

    let crawler = Crawler::new(create_test_config()).unwrap();
    let handle = crawler.start(&mock_server.uri(), 100).unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    handle.stop();
    assert!(!handle.status().running);

    let report = handle.wait().await;

    assert_eq!(report.phase, CrawlPhase::Stopped);
    assert_eq!(handle.phase(), CrawlPhase::Stopped);
    // The in-flight root batch finished; nothing after it was dispatched
    assert_eq!(report.pages.len(), 1);
    assert_eq!(report.pages[0].title, "Home");
    assert_eq!(handle.status().pages_queued, 50);
}

#[tokio::test]
async fn test_connection_refused_is_classified() {
    // Reserve a port, then free it so nothing is listening there
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let report = crawl(create_test_config(), &format!("http://127.0.0.1:{}", port), 10)
        .await
        .unwrap();

    assert_eq!(report.phase, CrawlPhase::Completed);
    assert_eq!(report.pages.len(), 1);
    assert_eq!(report.pages[0].status, PageStatus::Error);
    assert_eq!(
        report.pages[0].error.as_deref(),
        Some("Connection Refused - Server not accepting connections")
    );
    assert_eq!(report.pages[0].retry_count, 3);
    assert_eq!(report.error_summary.len(), 1);
}

#[tokio::test]
async fn test_progress_callback() {
    let mock_server = MockServer::start().await;

    mount_page(&mock_server, "/", "Home", &["/a", "/b"]).await;
    mount_page(&mock_server, "/a", "A", &[]).await;
    mount_page(&mock_server, "/b", "B", &[]).await;

    let seen: Arc<Mutex<Vec<CrawlProgress>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);

    let crawler = Crawler::new(create_test_config()).unwrap();
    let handle = crawler
        .start_with_progress(&mock_server.uri(), 100, move |progress| {
            sink.lock().unwrap().push(progress);
        })
        .unwrap();
    handle.wait().await;

    let seen = seen.lock().unwrap();
    // One notification per batch: the root, then /a and /b together
    assert_eq!(seen.len(), 2);
    assert_eq!(
        seen[0],
        CrawlProgress {
            pages_found: 1,
            pages_queued: 2,
            errors: 0
        }
    );
    assert_eq!(
        seen[1],
        CrawlProgress {
            pages_found: 3,
            pages_queued: 0,
            errors: 0
        }
    );
}

#[tokio::test]
async fn test_invalid_input_rejected_before_start() {
    let crawler = Crawler::new(create_test_config()).unwrap();

    assert!(crawler.start("", 10).is_err());
    assert!(crawler.start("not a domain", 10).is_err());
    assert!(crawler.start("example.com", 0).is_err());
}

#[tokio::test]
async fn test_sessions_in_registry() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "/", "Home", &[]).await;

    let registry = Arc::new(SessionRegistry::new(Duration::from_secs(60)));
    let crawler = Crawler::new(create_test_config()).unwrap();

    let id = registry.insert(crawler.start(&mock_server.uri(), 10).unwrap());

    let handle = registry.get(&id).expect("session registered");
    let report = handle.wait().await;
    assert_eq!(report.pages.len(), 1);

    // Not expired yet
    assert_eq!(registry.purge_expired(chrono::Utc::now()), 0);

    let later = chrono::Utc::now() + chrono::Duration::seconds(120);
    assert_eq!(registry.purge_expired(later), 1);
    assert!(registry.get(&id).is_none());
}

#[tokio::test]
async fn test_root_redirect_to_other_host_keeps_relative_links() {
    let mock_server = MockServer::start().await;
    let port = url::Url::parse(&mock_server.uri())
        .unwrap()
        .port()
        .unwrap();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(301)
                .insert_header("location", format!("http://localhost:{}/home", port).as_str()),
        )
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, "/home", "Home", &["/a", "/b"]).await;
    mount_page(&mock_server, "/a", "A", &[]).await;
    mount_page(&mock_server, "/b", "B", &[]).await;

    let report = crawl(create_test_config(), &mock_server.uri(), 100)
        .await
        .unwrap();

    assert_eq!(report.phase, CrawlPhase::Completed);
    assert_eq!(report.pages.len(), 3);
    assert_eq!(report.pages[0].title, "Home");

    let urls: HashSet<_> = report.pages.iter().map(|p| p.url.clone()).collect();
    assert!(urls.contains(&format!("{}/a", mock_server.uri())));
    assert!(urls.contains(&format!("{}/b", mock_server.uri())));
}

#[tokio::test]
async fn test_panicking_callback_still_ends_session() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "/", "Home", &[]).await;

    let crawler = Crawler::new(create_test_config()).unwrap();
    let handle = crawler
        .start_with_progress(&mock_server.uri(), 10, |_| panic!("callback failed"))
        .unwrap();

    let report = tokio::time::timeout(Duration::from_secs(5), handle.wait())
        .await
        .expect("wait should resolve after the crawl task dies");

    assert_eq!(report.phase, CrawlPhase::Stopped);
    assert!(report.finished_at.is_some());
    assert!(!handle.status().running);
}

#[tokio::test]
async fn test_retry_sub_batches_report_progress() {
    let mock_server = MockServer::start().await;

    let links: Vec<String> = (0..5).map(|i| format!("/e{}", i)).collect();
    let link_refs: Vec<&str> = links.iter().map(String::as_str).collect();
    mount_page(&mock_server, "/", "Home", &link_refs).await;

    // Primary pass plus one retry round
    Mock::given(method("GET"))
        .and(path_regex(r"^/e\d$"))
        .respond_with(ResponseTemplate::new(500))
        .expect(10)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config();
    config.crawler.baseline_concurrency = Some(8);
    config.retry.max_rounds = 1;
    config.retry.sub_batch_size = 2;
    config.retry.cooldown_ms = 100;

    let seen: Arc<Mutex<Vec<CrawlProgress>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);

    let crawler = Crawler::new(config).unwrap();
    let started = Instant::now();
    let handle = crawler
        .start_with_progress(&mock_server.uri(), 100, move |progress| {
            sink.lock().unwrap().push(progress);
        })
        .unwrap();
    let report = handle.wait().await;

    assert_eq!(report.phase, CrawlPhase::Completed);
    assert_eq!(report.error_summary.len(), 5);
    assert!(report.error_summary.iter().all(|e| e.retry_count == 1));

    // Two sub-batch cool-downs separate the three retry sub-batches
    assert!(started.elapsed() >= Duration::from_millis(200));

    let seen = seen.lock().unwrap();
    // Two primary batches, then sub-batches of 2, 2 and 1
    assert_eq!(seen.len(), 5);
    for progress in &seen[2..] {
        assert_eq!(progress.pages_found, 6);
        assert_eq!(progress.errors, 5);
    }
}

#[tokio::test]
async fn test_stop_during_retry_phase() {
    let mock_server = MockServer::start().await;

    let links: Vec<String> = (0..4).map(|i| format!("/e{}", i)).collect();
    let link_refs: Vec<&str> = links.iter().map(String::as_str).collect();
    mount_page(&mock_server, "/", "Home", &link_refs).await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/e\d$"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let mut config = create_test_config();
    config.retry.max_rounds = 3;
    config.retry.sub_batch_size = 1;
    config.retry.cooldown_ms = 200;

    let crawler = Crawler::new(config).unwrap();
    let handle = crawler.start(&mock_server.uri(), 100).unwrap();

    tokio::time::timeout(Duration::from_secs(5), async {
        while handle.phase() != CrawlPhase::Retrying {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("crawl should reach the retry phase");
    handle.stop();

    let report = handle.wait().await;
    assert_eq!(report.phase, CrawlPhase::Stopped);
    assert_eq!(report.error_summary.len(), 4);

    // Only the sub-batch in flight at the stop was retried
    let retried = report.pages.iter().filter(|p| p.retry_count > 0).count();
    assert!(retried <= 1, "retried {} pages", retried);

    let failing_fetches = mock_server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|request| request.url.path().starts_with("/e"))
        .count();
    // A full run would make 4 primary fetches plus 12 retries
    assert!(failing_fetches <= 5, "made {} fetches", failing_fetches);
}
