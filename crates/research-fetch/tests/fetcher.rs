// crates/research-fetch/tests/fetcher.rs
// ============================================================================
// Module: Fetcher Tests
// Description: Tests for robots parsing and bounded HTTP acquisition.
// ============================================================================
//! ## Overview
//! Validates robots precedence rules and, against a local server, redirect
//! walking with final-URL capture, terminal status classification, and the
//! response size cap.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::thread;

use research_core::interfaces::ContentFetcher;
use research_core::interfaces::FetchError;
use research_core::interfaces::FetchRequest;
use research_fetch::FetcherConfig;
use research_fetch::HttpFetcher;
use research_fetch::RobotsPolicy;
use tiny_http::Header;
use tiny_http::Response;
use tiny_http::Server;

/// Builds a default fetch request for a URL.
fn request(url: &str) -> FetchRequest {
    FetchRequest {
        url: url.to_string(),
        timeout_ms: 5_000,
        max_bytes: 1024,
        max_redirects: 3,
        etag: None,
        last_modified: None,
        respect_robots: false,
    }
}

/// Starts a local server routing by path; returns its base URL.
fn serve(routes: fn(&str) -> Response<std::io::Cursor<Vec<u8>>>) -> String {
    let server = Server::http("127.0.0.1:0").unwrap();
    let base = format!("http://{}", server.server_addr().to_ip().unwrap());
    thread::spawn(move || {
        for http_request in server.incoming_requests() {
            let path = http_request.url().to_string();
            let _ = http_request.respond(routes(&path));
        }
    });
    base
}

// ============================================================================
// SECTION: Robots Parsing
// ============================================================================

/// Tests longest-match precedence with allow overriding disallow.
#[test]
fn test_robots_longest_match() {
    let policy = RobotsPolicy::parse(
        "User-agent: *\nDisallow: /private\nAllow: /private/press\n",
        "research-engine/0.1",
    );
    assert!(policy.is_allowed("/"));
    assert!(!policy.is_allowed("/private/data"));
    assert!(policy.is_allowed("/private/press/2025"));
}

/// Tests the engine-specific group overrides the wildcard group.
#[test]
fn test_robots_agent_group_precedence() {
    let policy = RobotsPolicy::parse(
        "User-agent: *\nDisallow: /\n\nUser-agent: research-engine\nDisallow: /internal\n",
        "research-engine/0.1",
    );
    assert!(policy.is_allowed("/public"));
    assert!(!policy.is_allowed("/internal/x"));
}

/// Tests an absent or empty file permits everything.
#[test]
fn test_robots_default_permits() {
    let policy = RobotsPolicy::allow_all();
    assert!(policy.is_allowed("/anything"));
    let parsed = RobotsPolicy::parse("User-agent: *\nDisallow:\n", "research-engine/0.1");
    assert!(parsed.is_allowed("/anything"));
}

// ============================================================================
// SECTION: HTTP Behavior
// ============================================================================

/// Routes for the redirect/status/size scenarios.
fn routes(path: &str) -> Response<std::io::Cursor<Vec<u8>>> {
    match path {
        "/redirect" => {
            let header = Header::from_bytes(&b"Location"[..], &b"/canonical"[..]).unwrap();
            Response::from_data(Vec::new()).with_status_code(302).with_header(header)
        }
        "/canonical" => Response::from_data(b"canonical body".to_vec()),
        "/missing" => Response::from_data(b"gone".to_vec()).with_status_code(404),
        "/flaky" => Response::from_data(b"busy".to_vec()).with_status_code(503),
        "/huge" => Response::from_data(vec![b'x'; 4096]),
        _ => Response::from_data(b"ok".to_vec()),
    }
}

/// Tests redirects are walked and the final URL is recorded.
#[test]
fn test_redirects_record_final_url() {
    let base = serve(routes);
    let fetcher = HttpFetcher::new(FetcherConfig::default()).unwrap();
    let response = fetcher.fetch(&request(&format!("{base}/redirect"))).unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.redirects, 1);
    assert!(response.final_url.ends_with("/canonical"));
    assert_eq!(response.body, b"canonical body");
}

/// Tests 404 is terminal and 503 is retriable.
#[test]
fn test_status_classification() {
    let base = serve(routes);
    let fetcher = HttpFetcher::new(FetcherConfig::default()).unwrap();

    let err = fetcher.fetch(&request(&format!("{base}/missing"))).unwrap_err();
    match &err {
        FetchError::Status { status, retriable, .. } => {
            assert_eq!(*status, 404);
            assert!(!retriable);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!err.is_retriable());

    let err = fetcher.fetch(&request(&format!("{base}/flaky"))).unwrap_err();
    assert!(err.is_retriable());
}

/// Tests the size cap rejects oversized bodies.
#[test]
fn test_size_cap() {
    let base = serve(routes);
    let fetcher = HttpFetcher::new(FetcherConfig::default()).unwrap();
    let err = fetcher.fetch(&request(&format!("{base}/huge"))).unwrap_err();
    assert!(matches!(err, FetchError::TooLarge { max_bytes: 1024 }));
}
