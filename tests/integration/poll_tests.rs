//! End-to-end polling tests
//!
//! Each test starts a mock server, points a collector at it, and checks what ends up
//! in the log and how long the collector asked to sleep.

use occupancy_poller::config::{Config, Settings};
use occupancy_poller::poller::{
    Collector, FetchError, FetchFailure, Fetcher, ReqwestClient, RetryPolicy, Sleeper,
    TransportError,
};
use occupancy_poller::PollerError;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Records requested sleeps and returns immediately
#[derive(Clone, Default)]
struct RecordingSleeper {
    slept: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    fn slept(&self) -> Vec<Duration> {
        self.slept.lock().unwrap().clone()
    }
}

impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.slept.lock().unwrap().push(duration);
    }
}

/// Creates a test configuration polling `url` and writing to `output`
fn create_test_config(url: &str, output: &Path, max_attempts: u32) -> Config {
    Settings {
        url: Some(url.to_string()),
        output: Some(output.to_path_buf()),
        interval: Some(600.0),
        max_attempts: Some(max_attempts),
        user_agent: Some("TestPoller/1.0".to_string()),
        request_timeout: Some(5),
    }
    .into_config()
    .expect("Invalid test configuration")
}

fn counter_html(live: &str, forecast: &str) -> String {
    format!(
        r#"<html><head><title>Piscine</title></head><body>
        <app-counter value="{}"></app-counter>
        <app-counter forecast="true" value="{}"></app-counter>
        </body></html>"#,
        live, forecast
    )
}

fn html_response(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8")
}

#[tokio::test]
async fn test_collector_records_live_value_with_user_agent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/piscine"))
        .and(header("user-agent", "TestPoller/1.0"))
        .respond_with(html_response(counter_html("27", "80")))
        .expect(2)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("piscine.csv");
    let config = create_test_config(&format!("{}/piscine", mock_server.uri()), &output, 3);

    let client = ReqwestClient::from_config(&config).expect("Failed to build client");
    let sleeper = RecordingSleeper::default();
    let collector = Collector::new(&config, client, sleeper.clone());

    let recorded = collector.run_for(2).await.expect("Polling failed");
    assert_eq!(recorded, 2);

    let content = std::fs::read_to_string(&output).expect("Log not written");
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    for line in &lines {
        let (value, timestamp) = line.split_once(',').expect("Malformed line");
        assert_eq!(value, "27");
        assert!(timestamp.parse::<f64>().expect("Bad timestamp") > 1.0e9);
    }
    assert!(content.ends_with('\n'));

    assert_eq!(sleeper.slept(), vec![Duration::from_secs(600)]);
}

#[tokio::test]
async fn test_fetch_retries_server_errors_then_succeeds() {
    let mock_server = MockServer::start().await;

    // Mounted first, so it answers until used up
    Mock::given(method("GET"))
        .and(path("/piscine"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/piscine"))
        .respond_with(html_response(counter_html("3", "4")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = ReqwestClient::new("TestPoller/1.0", Duration::from_secs(5)).unwrap();
    let sleeper = RecordingSleeper::default();
    let fetcher = Fetcher::new(
        client,
        sleeper.clone(),
        RetryPolicy {
            max_attempts: 100,
            backoff: Duration::from_secs(600),
        },
    );

    let response = fetcher
        .fetch(&format!("{}/piscine", mock_server.uri()))
        .await
        .expect("Fetch should recover");

    assert_eq!(response.status.as_u16(), 200);
    assert!(response.body.contains("app-counter"));
    assert_eq!(
        sleeper.slept(),
        vec![Duration::from_secs(600), Duration::from_secs(600)]
    );
}

#[tokio::test]
async fn test_rate_limit_uses_retry_after() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/piscine"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "5"))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/piscine"))
        .respond_with(html_response(counter_html("9", "10")))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("piscine.csv");
    let config = create_test_config(&format!("{}/piscine", mock_server.uri()), &output, 3);

    let sleeper = RecordingSleeper::default();
    let collector = Collector::new(
        &config,
        ReqwestClient::from_config(&config).unwrap(),
        sleeper.clone(),
    );

    let reading = collector
        .poll_once()
        .await
        .expect("Fetch should recover")
        .expect("Expected a reading");

    assert_eq!(reading.value, 9);
    assert_eq!(sleeper.slept(), vec![Duration::from_secs(5)]);
}

#[tokio::test]
async fn test_unreachable_host_exhausts_retries() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("piscine.csv");
    // Nothing listens on port 1
    let config = create_test_config("http://127.0.0.1:1/piscine", &output, 3);

    let sleeper = RecordingSleeper::default();
    let collector = Collector::new(
        &config,
        ReqwestClient::from_config(&config).unwrap(),
        sleeper.clone(),
    );

    let err = collector.run().await.expect_err("Run should give up");

    match err {
        PollerError::Fetch(FetchError::RetriesExhausted {
            attempts,
            last_failure,
            ..
        }) => {
            assert_eq!(attempts, 3);
            assert!(matches!(
                last_failure,
                FetchFailure::Transport(TransportError::Connect(_) | TransportError::Other(_))
            ));
        }
        other => panic!("Unexpected error: {}", other),
    }

    assert_eq!(sleeper.slept().len(), 2);
    assert!(!output.exists());
}

#[tokio::test]
async fn test_ambiguous_page_yields_no_reading() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/ambiguous"))
        .respond_with(html_response(
            r#"<html><body>
            <app-counter value="5"></app-counter>
            <app-counter value="7"></app-counter>
            </body></html>"#
                .to_string(),
        ))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("ambiguous.csv");
    let config = create_test_config(&format!("{}/ambiguous", mock_server.uri()), &output, 3);
    let collector = Collector::new(
        &config,
        ReqwestClient::from_config(&config).unwrap(),
        RecordingSleeper::default(),
    );

    let reading = collector.poll_once().await.expect("Fetch should succeed");
    assert!(reading.is_none());
    assert!(!output.exists());
}

#[tokio::test]
async fn test_plain_text_content_type_still_yields_reading() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/piscine"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(counter_html("14", "60")),
        )
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("piscine.csv");
    let config = create_test_config(&format!("{}/piscine", mock_server.uri()), &output, 3);
    let collector = Collector::new(
        &config,
        ReqwestClient::from_config(&config).unwrap(),
        RecordingSleeper::default(),
    );

    let reading = collector
        .poll_once()
        .await
        .expect("Fetch should succeed")
        .expect("Expected a reading");

    assert_eq!(reading.value, 14);
    let content = std::fs::read_to_string(&output).expect("Log not written");
    assert!(content.starts_with("14,"));
}
