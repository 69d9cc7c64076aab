//! End-to-end tests against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives `RetryingClient`
//! through the real `UreqTransport`. Cache and audit log go to a temporary
//! directory so the file-backed defaults are exercised too.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use courier_core::{
    AttemptFailure, ClientError, ClientSettings, FileLog, MemoryCache, RetryingClient,
};
use mock_server::Echo;
use serde_json::json;

/// Boot the mock server on a background thread and return its address.
fn start_server() -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    addr
}

fn hits(addr: SocketAddr, path: &str) -> u64 {
    let counts: HashMap<String, u64> = RetryingClient::get(format!("http://{addr}/hits"), Vec::new())
        .build()
        .execute_json()
        .unwrap();
    counts.get(path).copied().unwrap_or(0)
}

#[test]
fn get_sends_default_then_caller_headers() {
    let addr = start_server();

    let echo: Echo = RetryingClient::get(
        format!("http://{addr}/echo"),
        vec![
            ("X-Request-Id".to_string(), "abc".to_string()),
            ("Accept".to_string(), "text/plain".to_string()),
        ],
    )
    .build()
    .execute_json()
    .unwrap();

    assert_eq!(echo.method, "GET");
    assert_eq!(echo.body, serde_json::Value::Null);
    let accepts: Vec<_> = echo
        .headers
        .iter()
        .filter(|(name, _)| name == "accept")
        .map(|(_, value)| value.as_str())
        .collect();
    assert_eq!(accepts[..2], ["application/json", "text/plain"]);
    assert!(echo
        .headers
        .contains(&("content-type".to_string(), "application/json".to_string())));
    assert!(echo
        .headers
        .contains(&("x-request-id".to_string(), "abc".to_string())));
}

#[test]
fn body_methods_send_json() {
    let addr = start_server();
    let url = format!("http://{addr}/echo");

    for (builder, method) in [
        (RetryingClient::post(&url, json!({"name": "x"}), Vec::new()), "POST"),
        (RetryingClient::put(&url, json!({"name": "x"}), Vec::new()), "PUT"),
        (RetryingClient::patch(&url, json!({"name": "x"}), Vec::new()), "PATCH"),
    ] {
        let echo: Echo = builder.build().execute_json().unwrap();
        assert_eq!(echo.method, method);
        assert_eq!(echo.body, json!({"name": "x"}));
    }

    let echo: Echo = RetryingClient::delete(&url, Vec::new())
        .build()
        .execute_json()
        .unwrap();
    assert_eq!(echo.method, "DELETE");
    assert_eq!(echo.body, serde_json::Value::Null);
}

#[test]
fn flaky_endpoint_succeeds_within_budget() {
    let addr = start_server();

    let payload = RetryingClient::get(format!("http://{addr}/flaky/2"), Vec::new())
        .set_retry(3, 0)
        .build()
        .execute()
        .unwrap();

    assert_eq!(payload, json!({"attempt": 3}));
    assert_eq!(hits(addr, "/flaky/2"), 3);
}

#[test]
fn server_errors_exhaust_the_budget() {
    let addr = start_server();

    let err = RetryingClient::post(format!("http://{addr}/status/500"), json!({"name": "x"}), Vec::new())
        .set_retry(2, 0)
        .build()
        .execute()
        .unwrap_err();

    assert_eq!(err.attempts(), Some(2));
    assert!(matches!(
        err,
        ClientError::Exhausted {
            last_failure: AttemptFailure::Status { status: 500, .. },
            ..
        }
    ));
    assert_eq!(hits(addr, "/status/500"), 2);
}

#[test]
fn non_json_success_is_retried_then_exhausts() {
    let addr = start_server();

    let err = RetryingClient::get(format!("http://{addr}/text"), Vec::new())
        .set_retry(2, 0)
        .build()
        .execute()
        .unwrap_err();

    assert!(matches!(
        err,
        ClientError::Exhausted {
            last_failure: AttemptFailure::Decode(_),
            ..
        }
    ));
}

#[test]
fn timeout_is_a_transport_failure() {
    let addr = start_server();

    let err = RetryingClient::get(format!("http://{addr}/slow/3000"), Vec::new())
        .timeout(1)
        .set_retry(1, 0)
        .build()
        .execute()
        .unwrap_err();

    assert!(matches!(
        err,
        ClientError::Exhausted {
            attempts: 1,
            last_failure: AttemptFailure::Transport(_),
        }
    ));
}

#[test]
fn file_cache_serves_repeat_calls_without_network() {
    let addr = start_server();
    let dir = tempfile::tempdir().unwrap();
    let settings = ClientSettings {
        cache_ttl_secs: Some(60),
        cache_dir: dir.path().join("cache"),
        ..ClientSettings::default()
    };

    let client = RetryingClient::get(format!("http://{addr}/items"), Vec::new())
        .settings(settings.clone())
        .build();
    assert_eq!(client.execute().unwrap(), json!({"id": 1}));
    assert_eq!(client.execute().unwrap(), json!({"id": 1}));

    // A fresh client over the same cache root sees the same record.
    let again = RetryingClient::get(format!("http://{addr}/items"), Vec::new())
        .settings(settings)
        .build();
    assert_eq!(again.execute().unwrap(), json!({"id": 1}));

    assert_eq!(hits(addr, "/items"), 1);
    assert_eq!(std::fs::read_dir(dir.path().join("cache")).unwrap().count(), 1);
}

#[test]
fn injected_store_replaces_file_cache() {
    let addr = start_server();
    let store = Arc::new(MemoryCache::new());

    for _ in 0..3 {
        RetryingClient::get(format!("http://{addr}/items"), Vec::new())
            .enable_cache(60)
            .cache_store(store.clone())
            .build()
            .execute()
            .unwrap();
    }

    assert_eq!(store.len(), 1);
    assert_eq!(hits(addr, "/items"), 1);
}

#[test]
fn audit_log_file_records_the_call() {
    let addr = start_server();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("logs/api_logs.txt");

    RetryingClient::get(format!("http://{addr}/flaky/1"), Vec::new())
        .enable_logging()
        .audit_log(Arc::new(FileLog::new(&path)))
        .set_retry(2, 0)
        .build()
        .execute()
        .unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    let messages: Vec<_> = contents
        .lines()
        .map(|line| line.split_once("] ").unwrap().1)
        .collect();
    let url = format!("http://{addr}/flaky/1");
    assert_eq!(
        messages,
        vec![
            format!("Sending GET request to: {url}"),
            "Request failed with status code: 503".to_string(),
            "Retrying request (attempt 1 of 2)".to_string(),
            format!("Sending GET request to: {url}"),
        ]
    );
}

#[test]
fn redirects_are_not_followed() {
    let addr = start_server();

    let err = RetryingClient::get(format!("http://{addr}/redirect"), Vec::new())
        .set_retry(2, 0)
        .build()
        .execute()
        .unwrap_err();

    assert!(matches!(
        err,
        ClientError::Exhausted {
            attempts: 2,
            last_failure: AttemptFailure::Status { status: 301, .. },
        }
    ));
    assert_eq!(hits(addr, "/redirect"), 2);
    assert_eq!(hits(addr, "/items"), 0);
}

#[test]
fn large_bodies_are_read_in_full() {
    let addr = start_server();
    let size = 11 * 1024 * 1024;

    let payload = RetryingClient::get(format!("http://{addr}/big/{size}"), Vec::new())
        .timeout(30)
        .set_retry(1, 0)
        .build()
        .execute()
        .unwrap();

    assert_eq!(payload["pad"].as_str().unwrap().len(), size);
}
