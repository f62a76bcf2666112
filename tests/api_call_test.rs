mod common;

use std::time::Duration;

use tabdash::api_call::ApiClient;
use tabdash::DashError;

fn client() -> ApiClient {
    ApiClient::new(Duration::from_secs(5))
}

#[test]
fn success_body_is_shown() {
    let url = common::serve_once("200 OK", "{\"ok\":true}");
    assert_eq!(client().call(&url), "API Result: {\"ok\":true}");
}

#[test]
fn not_found_reports_status() {
    let url = common::serve_once("404 Not Found", "nope");
    let text = client().call(&url);
    assert!(text.contains("404"), "{}", text);
    assert!(text.starts_with("API Result: Error: "));
}

#[test]
fn server_error_is_an_outbound_error() {
    let url = common::serve_once("503 Service Unavailable", "");
    let err = client().get(&url).unwrap_err();
    assert!(matches!(err, DashError::OutboundRequestError(ref code) if code == "503"));
}

#[test]
fn unreachable_host_reports_transport_error() {
    let text = client().call("http://127.0.0.1:1/health");
    assert!(text.starts_with("API Result: Error: "), "{}", text);
    assert!(text.len() > "API Result: Error: ".len());
}
