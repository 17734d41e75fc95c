use std::sync::Arc;

use mockito::{Matcher, Server, ServerGuard};
use serde_json::{Value, json};

use jobprobe::core::event::{HarnessEvent, create_event_channel};
use jobprobe::engine::SuiteRunner;
use jobprobe::report::{FileReportSink, Outcome};

mod common;

use common::{artifact_names, outcome, run};

async fn json_mock(server: &mut ServerGuard, method: &str, path: &str, status: usize, body: Value) -> mockito::Mock {
    server
        .mock(method, path)
        .with_status(status)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .create_async()
        .await
}

/// 预签名 → 直传 → 创建任务 → 状态
async fn conforming_api(server: &mut ServerGuard, final_status: &str) -> Vec<mockito::Mock> {
    let upload_url = format!("{}/storage/uploads/test.jpg", server.url());
    let mut mocks = Vec::new();

    mocks.push(
        server
            .mock("POST", "/uploads/presigned")
            .match_header("authorization", format!("Bearer {}", common::TOKEN).as_str())
            .match_body(Matcher::Json(json!({ "filename": "test.jpg", "content_type": "image/jpeg" })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "bucket": "media",
                    "key": "uploads/test.jpg",
                    "upload_url": upload_url,
                    "method": "put",
                    "expires_in": 900,
                })
                .to_string(),
            )
            .create_async()
            .await,
    );
    mocks.push(
        server
            .mock("PUT", "/storage/uploads/test.jpg")
            .match_header("content-type", "image/jpeg")
            .match_header("authorization", Matcher::Missing)
            .with_status(200)
            .create_async()
            .await,
    );
    mocks.push(
        server
            .mock("POST", "/jobs")
            .match_body(Matcher::Json(json!({ "gcs_url": "gs://media/uploads/test.jpg" })))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"job-42"}"#)
            .create_async()
            .await,
    );
    mocks.push(
        json_mock(
            server,
            "GET",
            "/jobs/job-42/status",
            200,
            json!({ "job_id": "job-42", "state": final_status }),
        )
        .await,
    );
    mocks
}

#[tokio::test]
async fn e2e_flow_reaches_terminal_state() {
    let mut server = Server::new_async().await;
    let mocks = conforming_api(&mut server, "Completed").await;

    let (report, sink) = run(&server.url(), &["e2e_upload_and_poll"]).await;

    let (result, artifacts) = outcome(&sink, "e2e_upload_and_poll");
    assert_eq!(result, Outcome::Passed, "{:?}", artifact_names(&artifacts));
    assert_eq!(report.passed, 1);
    assert!(report.is_success());

    let poll = artifacts.iter().find(|a| a.name == "job_poll_result").unwrap();
    assert_eq!(poll.payload["terminal"], true);
    assert_eq!(poll.payload["last"]["status"], "Completed");

    for mock in mocks {
        mock.assert_async().await;
    }
}

#[tokio::test]
async fn e2e_flow_tolerates_deadline_without_terminal_state() {
    let mut server = Server::new_async().await;
    conforming_api(&mut server, "running").await;

    let (_, sink) = run(&server.url(), &["e2e_upload_and_poll"]).await;

    let (result, artifacts) = outcome(&sink, "e2e_upload_and_poll");
    assert_eq!(result, Outcome::Passed);
    let poll = artifacts.iter().find(|a| a.name == "job_poll_result").unwrap();
    assert_eq!(poll.payload["terminal"], false);
    assert_eq!(poll.payload["last"]["status"], "running");
}

#[tokio::test]
async fn unsupported_upload_method_fails() {
    let mut server = Server::new_async().await;
    json_mock(
        &mut server,
        "POST",
        "/uploads/presigned",
        201,
        json!({
            "bucket": "b", "key": "k", "upload_url": "https://storage.example/k",
            "method": "PATCH", "expires_in": 60,
        }),
    )
    .await;

    let (report, sink) = run(&server.url(), &["e2e_upload_and_poll"]).await;

    let (result, artifacts) = outcome(&sink, "e2e_upload_and_poll");
    match result {
        Outcome::Failed(msg) => assert!(msg.contains("PATCH"), "{msg}"),
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(artifact_names(&artifacts).contains(&"upload_error"));
    assert!(!report.is_success());
}

#[tokio::test]
async fn presigned_contract_violation_is_recorded() {
    let mut server = Server::new_async().await;
    json_mock(
        &mut server,
        "POST",
        "/uploads/presigned",
        200,
        json!({ "bucket": "b", "key": "k", "upload_url": "not a url", "method": "PUT", "expires_in": 0 }),
    )
    .await;

    let (_, sink) = run(&server.url(), &["presigned_shape"]).await;

    let (result, artifacts) = outcome(&sink, "presigned_shape");
    assert!(result.is_failed());
    let names = artifact_names(&artifacts);
    assert!(names.contains(&"presigned_invalid_body"), "{names:?}");
    assert!(names.contains(&"presigned_validation_error"));
    assert!(names.contains(&"error"));
}

#[tokio::test]
async fn auth_rejection_skips_positive_and_passes_negative() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/uploads/presigned")
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(r#"{"detail":"Not authenticated"}"#)
        .create_async()
        .await;

    let (report, sink) = run(
        &server.url(),
        &["presigned_shape", "presigned_missing_content_type", "neg_presigned_missing_filename"],
    )
    .await;

    let (shape, artifacts) = outcome(&sink, "presigned_shape");
    assert!(matches!(shape, Outcome::Skipped(ref r) if r.contains("requires auth")));
    assert!(artifact_names(&artifacts).contains(&"skip_reason"));

    assert_eq!(outcome(&sink, "presigned_missing_content_type").0, Outcome::Passed);
    assert_eq!(outcome(&sink, "neg_presigned_missing_filename").0, Outcome::Passed);
    assert_eq!((report.passed, report.skipped, report.failed), (2, 1, 0));
}

#[tokio::test]
async fn cloudflare_challenge_is_inconclusive() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/health")
        .with_status(403)
        .with_header("cf-mitigated", "challenge")
        .with_header("content-type", "text/html; charset=UTF-8")
        .with_body("<html><title>Just a moment...</title></html>")
        .create_async()
        .await;

    let (report, sink) = run(&server.url(), &["health"]).await;

    let (result, artifacts) = outcome(&sink, "health");
    assert!(matches!(result, Outcome::Skipped(_)));
    assert_eq!(artifact_names(&artifacts), ["health_cloudflare_detected"]);
    assert_eq!(artifacts[0].payload["status_code"], 403);
    assert!(report.is_success());
}

#[tokio::test]
async fn unexpected_status_fails_with_full_response() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/ready")
        .with_status(500)
        .with_body("boom")
        .create_async()
        .await;

    let (_, sink) = run(&server.url(), &["ready"]).await;

    let (result, artifacts) = outcome(&sink, "ready");
    match result {
        Outcome::Failed(msg) => assert!(msg.contains("500"), "{msg}"),
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(artifact_names(&artifacts), ["ready_meta", "ready_body", "error"]);
    assert_eq!(artifacts[1].payload, "boom");
}

#[tokio::test]
async fn smoke_checks_pass_on_healthy_service() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/health")
        .with_status(200)
        .with_body("OK")
        .create_async()
        .await;
    json_mock(&mut server, "GET", "/ready", 503, json!({ "ok": false })).await;
    server
        .mock("GET", "/docs")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body("<html>swagger</html>")
        .create_async()
        .await;
    json_mock(
        &mut server,
        "GET",
        "/openapi.json",
        200,
        json!({ "openapi": "3.1.0", "info": { "title": "Jobs" }, "paths": { "/health": { "get": {} } } }),
    )
    .await;

    let (report, _) = run(&server.url(), &["health", "ready", "docs", "openapi"]).await;
    assert_eq!(report.passed, 4, "{:?}", report.scenarios);
}

#[tokio::test]
async fn missing_gcs_url_detail_must_name_the_field() {
    let mut server = Server::new_async().await;
    json_mock(
        &mut server,
        "POST",
        "/jobs",
        422,
        json!({ "detail": [{ "loc": ["body", "source"], "msg": "Field required" }] }),
    )
    .await;

    let (_, sink) = run(&server.url(), &["neg_jobs_missing_gcs_url"]).await;
    let (result, artifacts) = outcome(&sink, "neg_jobs_missing_gcs_url");
    assert!(result.is_failed());
    assert!(artifact_names(&artifacts).contains(&"assertion_failed"));

    let mut server = Server::new_async().await;
    json_mock(
        &mut server,
        "POST",
        "/jobs",
        422,
        json!({ "detail": [{ "loc": ["body", "gcs_url"], "msg": "Field required" }] }),
    )
    .await;

    let (report, _) = run(&server.url(), &["neg_jobs_missing_gcs_url", "neg_jobs_gcs_url_wrong_type"]).await;
    assert_eq!(report.passed, 2);
}

#[tokio::test]
async fn path_traversal_key_must_be_sanitized() {
    let mut server = Server::new_async().await;
    json_mock(
        &mut server,
        "POST",
        "/uploads/presigned",
        200,
        json!({ "bucket": "b", "key": "../evil.jpg", "upload_url": "https://s/x", "method": "PUT", "expires_in": 60 }),
    )
    .await;
    let (_, sink) = run(&server.url(), &["neg_presigned_path_traversal"]).await;
    assert!(outcome(&sink, "neg_presigned_path_traversal").0.is_failed());

    let mut server = Server::new_async().await;
    json_mock(
        &mut server,
        "POST",
        "/uploads/presigned",
        200,
        json!({ "bucket": "b", "key": "uploads/evil.jpg", "upload_url": "https://s/x", "method": "PUT", "expires_in": 60 }),
    )
    .await;
    let (_, sink) = run(&server.url(), &["neg_presigned_path_traversal"]).await;
    assert_eq!(outcome(&sink, "neg_presigned_path_traversal").0, Outcome::Passed);
}

#[tokio::test]
async fn empty_filename_may_be_rejected() {
    let mut server = Server::new_async().await;
    json_mock(&mut server, "POST", "/uploads/presigned", 500, json!({ "detail": "boom" })).await;
    let (_, sink) = run(&server.url(), &["neg_presigned_empty_filename"]).await;
    assert!(outcome(&sink, "neg_presigned_empty_filename").0.is_failed());

    let mut server = Server::new_async().await;
    json_mock(&mut server, "POST", "/uploads/presigned", 422, json!({ "detail": [] })).await;
    let (_, sink) = run(&server.url(), &["neg_presigned_empty_filename"]).await;
    assert_eq!(outcome(&sink, "neg_presigned_empty_filename").0, Outcome::Passed);
}

#[tokio::test]
async fn empty_gcs_url_must_not_succeed_immediately() {
    let mut server = Server::new_async().await;
    json_mock(&mut server, "POST", "/jobs", 200, json!({ "job_id": "j-empty" })).await;
    json_mock(&mut server, "GET", "/jobs/j-empty/status", 200, json!({ "status": "DONE" })).await;

    let (_, sink) = run(&server.url(), &["neg_jobs_empty_gcs_url"]).await;
    match outcome(&sink, "neg_jobs_empty_gcs_url").0 {
        Outcome::Failed(msg) => assert!(msg.contains("done"), "{msg}"),
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test]
async fn rejected_upload_format_is_accepted_signal() {
    let mut server = Server::new_async().await;
    json_mock(
        &mut server,
        "POST",
        "/uploads/presigned",
        422,
        json!({ "detail": "unsupported content_type" }),
    )
    .await;

    let (_, sink) = run(&server.url(), &["upload_format_random_exe"]).await;

    let (result, artifacts) = outcome(&sink, "upload_format_random_exe");
    assert_eq!(result, Outcome::Passed);
    assert_eq!(
        artifact_names(&artifacts),
        [
            "random_exe_presigned_request",
            "random_exe_presigned_response_meta",
            "random_exe_presigned_error_body",
        ]
    );
}

#[tokio::test]
async fn upload_format_records_file_details_and_result() {
    let mut server = Server::new_async().await;
    let upload_url = format!("{}/storage/sample.pdf", server.url());
    json_mock(
        &mut server,
        "POST",
        "/uploads/presigned",
        201,
        json!({ "bucket": "b", "key": "sample.pdf", "upload_url": upload_url, "method": "POST", "expires_in": 60 }),
    )
    .await;
    server
        .mock("POST", "/storage/sample.pdf")
        .match_header("content-type", "application/pdf")
        .with_status(204)
        .create_async()
        .await;

    let (_, sink) = run(&server.url(), &["upload_format_random_pdf"]).await;

    let (result, artifacts) = outcome(&sink, "upload_format_random_pdf");
    assert_eq!(result, Outcome::Passed, "{:?}", artifact_names(&artifacts));

    let file = artifacts.iter().find(|a| a.name == "random_pdf_file").unwrap();
    assert_eq!(file.payload["bytes_len"], 14);
    assert_eq!(file.payload["first_bytes_hex"], "255044462d312e370a25454f460a");

    let uploaded = artifacts.iter().find(|a| a.name == "random_pdf_upload_result").unwrap();
    assert_eq!(uploaded.payload["status_code"], 204);
}

#[tokio::test]
async fn file_sink_writes_scenario_dirs_and_summary() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/docs")
        .with_status(404)
        .with_body("missing")
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(FileReportSink::new(dir.path()));
    let (tx, rx) = create_event_channel();

    let report = SuiteRunner::new(Arc::new(common::config(&server.url())), sink.clone())
        .with_events(tx)
        .run(&[common::scenario("docs")])
        .await
        .unwrap();
    assert_eq!(report.failed, 1);

    let scenario_dir = sink.scenario_dir("docs");
    let mut files: Vec<String> = std::fs::read_dir(&scenario_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    files.sort();
    assert_eq!(files, ["01_docs_meta.json", "02_docs_body.txt", "03_error.txt", "outcome.json"]);

    let summary: Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("summary.json")).unwrap()).unwrap();
    assert_eq!(summary["failed"], 1);
    assert_eq!(summary["scenarios"][0]["id"], "docs");
    assert_eq!(summary["scenarios"][0]["outcome"], "failed");

    let mut events = Vec::new();
    while let Some(event) = rx.try_recv() {
        events.push(event);
    }
    assert!(matches!(events.first(), Some(HarnessEvent::SuiteStarted { total: 1, .. })));
    assert!(matches!(
        events.last(),
        Some(HarnessEvent::SuiteFinished { passed: 0, failed: 1, skipped: 0 })
    ));
}
