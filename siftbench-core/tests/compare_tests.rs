// Tests for running pipelines and aggregating their self-reports

use siftbench_core::compare::{Comparison, PipelineSpec, RowBody, run_pipeline};
use siftbench_core::pipeline::PipelineConfig;
use siftbench_core::report::generate_json_report;
use siftbench_scanner::{CrawlConfig, StrategyKind};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GOOD_REPORT: &str = r#"{"pipeline":"shell","pages_total":3,"pages_ok":2,"tokens_total":40,"avg_noise_ratio":0.5,"throughput_pages_per_sec":1.25,"failures":[{"url":"https://a.test/z","status":null,"error":"timeout","tokens":0,"noise_ratio":null}]}"#;

fn shell(name: &str, script: &str) -> PipelineSpec {
    PipelineSpec::process(name, "sh", vec!["-c".to_string(), script.to_string()])
}

fn echo_report(name: &str, report: &str) -> PipelineSpec {
    shell(name, &format!("printf '%s' '{}'", report))
}

// ============================================================================
// Process Isolation Tests
// ============================================================================

#[tokio::test]
async fn test_zero_pipelines_yield_empty_comparison() {
    let rows = Comparison::new(Vec::new()).run().await;
    assert!(rows.is_empty());
    assert_eq!(generate_json_report(&rows).unwrap().trim(), "[]");
}

#[tokio::test]
async fn test_missing_executable_does_not_affect_other_rows() {
    let specs = vec![
        echo_report("first", GOOD_REPORT),
        PipelineSpec::process("ghost", "siftbench-no-such-binary", Vec::new()),
        echo_report("third", GOOD_REPORT),
    ];
    let rows = Comparison::new(specs).run().await;

    assert_eq!(rows.len(), 3);
    assert!(rows[0].metrics().is_some());
    assert_eq!(rows[1].pipeline, "ghost");
    assert_eq!(rows[1].error(), Some("siftbench-no-such-binary not found"));
    assert!(rows[1].metrics().is_none());
    assert!(rows[2].metrics().is_some());
}

#[tokio::test]
async fn test_reported_name_wins_over_configured_name() {
    let rows = Comparison::new(vec![echo_report("configured", GOOD_REPORT)]).run().await;
    assert_eq!(rows[0].pipeline, "shell");

    let metrics = rows[0].metrics().unwrap();
    assert_eq!(metrics.pages_total, 3);
    assert_eq!(metrics.pages_ok, 2);
    assert_eq!(metrics.tokens_total, 40);
    assert_eq!(metrics.top_failures.0, vec![("timeout".to_string(), 1)]);
}

#[tokio::test]
async fn test_non_zero_exit_reports_stderr() {
    let spec = shell("crashy", "echo 'ImportError: no module named bs4' >&2; exit 3");
    let rows = Comparison::new(vec![spec]).run().await;
    assert_eq!(rows[0].pipeline, "crashy");
    assert_eq!(rows[0].error(), Some("ImportError: no module named bs4"));
}

#[tokio::test]
async fn test_non_zero_exit_keeps_last_stderr_line() {
    let script = "printf '\\033[33m WARN\\033[0m page one failed\\n WARN page two failed\\nError: browser unavailable\\n\\n' >&2; exit 1";
    let rows = Comparison::new(vec![shell("logged", script)]).run().await;
    assert_eq!(rows[0].error(), Some("Error: browser unavailable"));
}

#[tokio::test]
async fn test_non_zero_exit_without_stderr() {
    let rows = Comparison::new(vec![shell("quiet", "exit 4")]).run().await;
    assert_eq!(rows[0].error(), Some("quiet exited with status 4"));
}

#[tokio::test]
async fn test_invalid_output_row() {
    let rows = Comparison::new(vec![shell("noisy", "echo 'loading model...'")]).run().await;
    assert_eq!(rows[0].error(), Some("invalid_json"));
}

#[tokio::test]
async fn test_self_reported_failure_row() {
    let spec = echo_report(
        "rendered-dom",
        r#"{"pipeline":"rendered-dom","error":"browser unavailable"}"#,
    );
    let rows = Comparison::new(vec![spec]).run().await;
    assert_eq!(rows[0].pipeline, "rendered-dom");
    assert!(matches!(rows[0].body, RowBody::Error { ref error } if error == "browser unavailable"));
}

#[tokio::test]
async fn test_pipeline_timeout() {
    let spec = shell("slow", "sleep 5").with_timeout(Some(Duration::from_secs(1)));
    let rows = Comparison::new(vec![spec]).run().await;
    assert_eq!(rows[0].error(), Some("slow timed out after 1s"));
}

#[tokio::test]
async fn test_malformed_fields_default_to_zero() {
    let spec = echo_report("partial", r#"{"pipeline":"partial","pages_total":"many"}"#);
    let report = run_pipeline(&spec).await.unwrap();
    assert_eq!(report.pages_total, 0);
    assert_eq!(report.pages_ok, 0);
    assert!(report.failures.is_empty());
}

// ============================================================================
// Ordering and Determinism Tests
// ============================================================================

#[tokio::test]
async fn test_parallel_run_keeps_configuration_order() {
    let specs = vec![
        shell("slowest", &format!("sleep 0.3; printf '%s' '{}'", GOOD_REPORT)),
        PipelineSpec::process("missing", "siftbench-no-such-binary", Vec::new()),
        shell("fast", "exit 1"),
    ];
    let rows = Comparison::new(specs).parallel(true).run().await;

    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].pipeline, "shell");
    assert_eq!(rows[1].pipeline, "missing");
    assert_eq!(rows[2].pipeline, "fast");
}

#[tokio::test]
async fn test_reaggregation_is_byte_identical() {
    let specs = || {
        vec![
            echo_report("a", GOOD_REPORT),
            PipelineSpec::process("b", "siftbench-no-such-binary", Vec::new()),
        ]
    };
    let first = generate_json_report(&Comparison::new(specs()).run().await).unwrap();
    let second = generate_json_report(&Comparison::new(specs()).run().await).unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_progress_callback_sees_every_pipeline() {
    let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    let specs = vec![shell("one", "exit 1"), shell("two", "exit 1")];

    Comparison::new(specs)
        .with_progress_callback(Arc::new(move |_index: usize, name: &str| {
            seen_clone.lock().unwrap().push(name.to_string());
        }))
        .run()
        .await;

    assert_eq!(*seen.lock().unwrap(), vec!["one".to_string(), "two".to_string()]);
}

// ============================================================================
// In-Process Tests
// ============================================================================

#[tokio::test]
async fn test_in_process_pipeline_against_mock_site() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string(
                    "<html><body><p>Hello there reader</p><a href='/next'>next</a></body></html>",
                ),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/next"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let crawl = CrawlConfig::new(vec![format!("{}/", server.uri())])
        .with_timeout(Duration::from_secs(5));
    let config = PipelineConfig::new(StrategyKind::StaticParse, crawl);
    let rows = Comparison::new(vec![PipelineSpec::in_process(config)]).run().await;

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].pipeline, "static-parse");
    let metrics = rows[0].metrics().unwrap();
    assert_eq!(metrics.pages_total, 2);
    assert_eq!(metrics.pages_ok, 1);
    assert!(metrics.tokens_total >= 3);
    assert_eq!(metrics.top_failures.0, vec![("fetch_failed".to_string(), 1)]);
}

#[tokio::test]
async fn test_in_process_invalid_config_is_reported() {
    let config = PipelineConfig::new(StrategyKind::StaticParse, CrawlConfig::new(Vec::new()));
    let rows = Comparison::new(vec![PipelineSpec::in_process(config)]).run().await;
    assert_eq!(rows[0].pipeline, "static-parse");
    assert!(rows[0].error().is_some());
}
