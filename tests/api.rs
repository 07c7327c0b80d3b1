use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use rocket::http::{ContentType, Status};
use rocket::local::asynchronous::Client;
use serde_json::{json, Value};

use workload_optimizer::app_state::AppState;
use workload_optimizer::config::AppConfig;
use workload_optimizer::gateway::{Endpoint, Gateway, Payload, RawResponse, Transport, TransportError};
use workload_optimizer::types::{ErrorBody, RecommendationResult, SimulationResult};

/// 按 URL 后缀返回预设响应，并记下每次收到的请求
struct StubTransport {
    optimize: RawResponse,
    simulate: RawResponse,
    delay: Option<Duration>,
    /// 以此开头的地址一律连不上
    unreachable: Option<&'static str>,
    seen: Mutex<Vec<(String, Value)>>,
}

impl StubTransport {
    fn new(optimize: RawResponse, simulate: RawResponse) -> Self {
        Self {
            optimize,
            simulate,
            delay: None,
            unreachable: None,
            seen: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn post_json(
        &self,
        endpoint: &Endpoint,
        body: &Payload,
    ) -> Result<RawResponse, TransportError> {
        self.seen
            .lock()
            .unwrap()
            .push((endpoint.url.clone(), serde_json::to_value(body).unwrap()));
        if self.unreachable.is_some_and(|prefix| endpoint.url.starts_with(prefix)) {
            return Err(TransportError {
                message: "connection refused".to_string(),
            });
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if endpoint.url.ends_with("/simulate") {
            Ok(self.simulate.clone())
        } else {
            Ok(self.optimize.clone())
        }
    }
}

fn raw(status: u16, status_text: &str, body: &str) -> RawResponse {
    RawResponse {
        status,
        status_text: status_text.to_string(),
        body: body.to_string(),
    }
}

fn ok(body: &str) -> RawResponse {
    raw(200, "OK", body)
}

fn test_config() -> AppConfig {
    AppConfig {
        scoring_base_url: "http://scoring.test".to_string(),
        public_base_url: "http://optimizer.test".to_string(),
        mock_delay_ms: 0,
        report_font_dir: "/nonexistent/fonts".to_string(),
        ..AppConfig::default()
    }
}

async fn client_with(config: AppConfig, transport: Arc<StubTransport>) -> Client {
    let state = AppState::new(config, Gateway::new(transport));
    let figment = rocket::Config::figment().merge(("log_level", "off"));
    Client::tracked(workload_optimizer::rocket(figment, state))
        .await
        .unwrap()
}

async fn client(transport: Arc<StubTransport>) -> Client {
    client_with(test_config(), transport).await
}

fn idle_transport() -> Arc<StubTransport> {
    Arc::new(StubTransport::new(ok("{}"), ok("[]")))
}

fn workload() -> Value {
    json!({
        "model_type": "ResNet50",
        "framework": "pytorch",
        "task_type": "inference",
        "model_size_mb": 98.0,
        "parameters_millions": 25.0,
        "flops_billions": 28.75,
        "batch_size": 8,
        "latency_requirement_ms": 20,
    })
}

fn simulate_workload() -> Value {
    json!({
        "model_type": "ResNet50",
        "framework": "pytorch",
        "task_type": "inference",
        "model_size_mb": 1024.0,
        "parameters_millions": 25.0,
        "flops_billions": 28.75,
        "batch_size": 2,
        "throughput_req_qps": 100,
    })
}

const H100_RESULT: &str = r#"{
    "recommended_instance": "H100",
    "expected_inference_time_ms": 0.88,
    "cost_per_1000_inferences": 0.001,
    "alternatives": [
        {"hardware": "A100", "inference_time_ms": 1.02, "cost_per_1000": 0.001}
    ]
}"#;

#[tokio::test]
async fn health_reports_ok() {
    let client = client(idle_transport()).await;
    let response = client.get("/health").dispatch().await;

    assert_eq!(response.status(), Status::Ok);
    assert_eq!(
        response.into_json::<Value>().await.unwrap(),
        json!({"status": "ok"})
    );
}

#[tokio::test]
async fn flops_estimate_uses_catalog() {
    let client = client(idle_transport()).await;
    let response = client
        .get("/api/flops?model_type=ResNet50&parameters_millions=25")
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["flops_billions"], "28.75");
    assert_eq!(body["multiplier"], 1.15);

    let unknown = client
        .get("/api/flops?model_type=Mystery&parameters_millions=12.5")
        .dispatch()
        .await;
    let body: Value = unknown.into_json().await.unwrap();
    assert_eq!(body["flops_billions"], "25.00");
}

#[tokio::test]
async fn negative_parameters_are_rejected() {
    let client = client(idle_transport()).await;
    let response = client
        .get("/api/flops?model_type=ResNet50&parameters_millions=-1")
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::UnprocessableEntity);
    let body: ErrorBody = response.into_json().await.unwrap();
    assert!(body.error.contains("parameters_millions"));
}

#[tokio::test]
async fn architectures_are_listed_sorted() {
    let client = client(idle_transport()).await;
    let response = client.get("/api/architectures").dispatch().await;

    let body: Vec<Value> = response.into_json().await.unwrap();
    assert_eq!(body.len(), 33);
    assert_eq!(body[0]["model_type"], "BERT_base");
}

#[tokio::test]
async fn hardware_lookup() {
    let client = client(idle_transport()).await;

    let t4 = client.get("/api/hardware/T4").dispatch().await;
    assert_eq!(t4.status(), Status::Ok);
    let spec: Value = t4.into_json().await.unwrap();
    assert!(spec["fullName"].as_str().unwrap().contains("T4"));

    let missing = client.get("/api/hardware/TPU_v5").dispatch().await;
    assert_eq!(missing.status(), Status::NotFound);
    let body: ErrorBody = missing.into_json().await.unwrap();
    assert!(body.error.contains("TPU_v5"));

    let all: Value = client
        .get("/api/hardware")
        .dispatch()
        .await
        .into_json()
        .await
        .unwrap();
    assert_eq!(all.as_object().unwrap().len(), 8);
}

#[tokio::test]
async fn optimize_forwards_to_scoring_service() {
    let transport = Arc::new(StubTransport::new(ok(H100_RESULT), ok("[]")));
    let client = client(transport.clone()).await;

    let response = client
        .post("/api/optimize")
        .json(&workload())
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::Ok);
    let result: RecommendationResult = response.into_json().await.unwrap();
    assert_eq!(result.recommended_instance, "H100");
    assert_eq!(result.alternatives.unwrap().len(), 1);

    let seen = transport.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let (url, body) = &seen[0];
    assert_eq!(url, "http://scoring.test/optimize");
    assert_eq!(body["model_type"], "ResNet50");
    assert_eq!(body["concurrency"], 1);
    assert_eq!(body["is_post_deployment"], false);
    assert_eq!(body["throughput_requirement"], Value::Null);
    assert!(body.get("resource_metrics").is_none());
}

#[tokio::test]
async fn upstream_error_status_is_passed_through() {
    let transport = Arc::new(StubTransport::new(
        raw(
            503,
            "Service Unavailable",
            r#"{"error":"overloaded","details":"retry later"}"#,
        ),
        ok("[]"),
    ));
    let client = client(transport).await;

    let response = client
        .post("/api/optimize")
        .json(&workload())
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::ServiceUnavailable);
    let body: ErrorBody = response.into_json().await.unwrap();
    assert_eq!(
        body,
        ErrorBody {
            error: "overloaded".to_string(),
            details: Some("retry later".to_string()),
        }
    );
}

#[tokio::test]
async fn malformed_success_becomes_500() {
    let transport = Arc::new(StubTransport::new(ok("<html>oops</html>"), ok("[]")));
    let client = client(transport).await;

    let response = client
        .post("/api/optimize")
        .json(&workload())
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::InternalServerError);
    let body: ErrorBody = response.into_json().await.unwrap();
    assert_eq!(body.error, "Invalid JSON response from server");
    assert_eq!(body.details.as_deref(), Some("<html>oops</html>"));
}

#[tokio::test]
async fn post_deployment_without_metrics_is_a_conflict() {
    let transport = Arc::new(StubTransport::new(ok(H100_RESULT), ok("[]")));
    let client = client(transport.clone()).await;

    let mut body = workload();
    body["is_post_deployment"] = json!(true);
    let response = client.post("/api/optimize").json(&body).dispatch().await;

    assert_eq!(response.status(), Status::Conflict);
    assert!(transport.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn invalid_body_gets_json_catcher() {
    let client = client(idle_transport()).await;

    let response = client
        .post("/api/optimize")
        .json(&json!({"model_type": "ResNet50"}))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::UnprocessableEntity);
    assert_eq!(response.content_type(), Some(ContentType::JSON));

    let garbage = client
        .post("/api/optimize")
        .header(ContentType::JSON)
        .body("{not json")
        .dispatch()
        .await;
    assert_eq!(garbage.status(), Status::BadRequest);
    let body: ErrorBody = garbage.into_json().await.unwrap();
    assert_eq!(body.error, "Bad Request");
}

#[tokio::test]
async fn unknown_route_gets_json_404() {
    let client = client(idle_transport()).await;
    let response = client.get("/api/nothing-here").dispatch().await;

    assert_eq!(response.status(), Status::NotFound);
    let body: ErrorBody = response.into_json().await.unwrap();
    assert!(body.error.contains("/api/nothing-here"));
}

#[tokio::test]
async fn recommend_and_simulate_run_concurrently_and_fail_independently() {
    let transport = Arc::new(StubTransport::new(
        ok(H100_RESULT),
        ok(r#"{"hardware":"H100"}"#),
    ));
    let client = client(transport.clone()).await;

    let recommend = client.post("/api/optimize").json(&workload()).dispatch();
    let simulate = client
        .post("/api/simulate")
        .json(&simulate_workload())
        .dispatch();
    let (recommend, simulate) = tokio::join!(recommend, simulate);

    assert_eq!(recommend.status(), Status::Ok);
    let result: RecommendationResult = recommend.into_json().await.unwrap();
    assert_eq!(result.recommended_instance, "H100");

    assert_eq!(simulate.status(), Status::InternalServerError);
    let body: ErrorBody = simulate.into_json().await.unwrap();
    assert_eq!(
        body.error,
        "Invalid response format from API: Expected an array of hardware options"
    );

    let seen = transport.seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    let simulate_body = &seen
        .iter()
        .find(|(url, _)| url.ends_with("/simulate"))
        .unwrap()
        .1;
    assert_eq!(simulate_body["throughput_req_qps"], 100);
    assert!(simulate_body.get("throughput_requirement").is_none());
}

#[tokio::test]
async fn slow_upstream_hits_the_configured_timeout() {
    let mut stub = StubTransport::new(ok(H100_RESULT), ok("[]"));
    stub.delay = Some(Duration::from_secs(5));
    let config = AppConfig {
        request_timeout_secs: Some(1),
        ..test_config()
    };
    let client = client_with(config, Arc::new(stub)).await;

    let response = client
        .post("/api/optimize")
        .json(&workload())
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::InternalServerError);
    let body: ErrorBody = response.into_json().await.unwrap();
    assert_eq!(body.error, "Failed to reach the scoring service");
    assert_eq!(body.details.as_deref(), Some("no response within 1s"));
}

#[tokio::test]
async fn mock_routes_return_canned_results() {
    let transport = idle_transport();
    let client = client(transport.clone()).await;

    let response = client
        .post("/api/mock/optimize")
        .json(&workload())
        .dispatch()
        .await;
    let result: RecommendationResult = response.into_json().await.unwrap();
    assert_eq!(result.recommended_instance, "H100");
    assert_eq!(result.alternatives.unwrap().len(), 5);

    let mut post = workload();
    post["is_post_deployment"] = json!(true);
    post["resource_metrics"] = json!({
        "gpu_utilization": 92.0,
        "gpu_memory_usage": 40.0,
        "cpu_utilization": 30.0,
        "ram_usage": 20.0,
        "disk_iops": 100.0,
        "network_bandwidth": 50.0,
        "avg_latency": 12.0,
        "throughput": 80.0,
    });
    let result: RecommendationResult = client
        .post("/api/mock/optimize")
        .json(&post)
        .dispatch()
        .await
        .into_json()
        .await
        .unwrap();
    assert_eq!(result.recommended_instance, "A100");

    let entries: SimulationResult = client
        .post("/api/mock/simulate")
        .json(&simulate_workload())
        .dispatch()
        .await
        .into_json()
        .await
        .unwrap();
    assert_eq!(entries.len(), 6);
    assert!(entries.iter().all(|e| e.memory_gb == 1.0));

    assert!(transport.seen.lock().unwrap().is_empty());
}

fn simulation_report_body() -> Value {
    json!({
        "workload": simulate_workload(),
        "results": [
            {"hardware": "T4", "latency_ms": 9.412, "throughput_qps": 212.5, "cost_per_1000": 0.0008, "memory_gb": 1.0},
            {"hardware": "TPU_v5", "latency_ms": 3.0, "throughput_qps": 666.67, "cost_per_1000": 0.002, "memory_gb": 1.0}
        ]
    })
}

#[tokio::test]
async fn simulation_report_as_csv_download() {
    let client = client(idle_transport()).await;
    let response = client
        .post("/api/report/simulation/csv")
        .json(&simulation_report_body())
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::Ok);
    assert_eq!(response.content_type(), Some(ContentType::CSV));
    let disposition = response
        .headers()
        .get_one("Content-Disposition")
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment; filename=\"simulation_report_"));
    assert!(disposition.ends_with(".csv\""));

    let csv = response.into_string().await.unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("Hardware,Full Name,Latency (ms),Throughput (QPS),Cost per 1000,Memory (GB),Architecture,Memory Spec")
    );
    assert!(lines.next().unwrap().starts_with("T4,"));
    assert!(lines.next().unwrap().contains("\"N/A\""));
}

#[tokio::test]
async fn recommendation_report_as_json() {
    let client = client(idle_transport()).await;
    let body = json!({
        "workload": workload(),
        "result": serde_json::from_str::<Value>(H100_RESULT).unwrap(),
    });
    let response = client
        .post("/api/report/recommendation/json")
        .json(&body)
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::Ok);
    let report: Value = response.into_json().await.unwrap();
    assert_eq!(
        report["reportMetadata"]["modelConfiguration"]["modelType"],
        "ResNet50"
    );
}

#[tokio::test]
async fn report_format_and_font_errors() {
    let client = client(idle_transport()).await;

    let unknown = client
        .post("/api/report/simulation/xls")
        .json(&simulation_report_body())
        .dispatch()
        .await;
    assert_eq!(unknown.status(), Status::NotFound);

    let pdf = client
        .post("/api/report/simulation/pdf")
        .json(&simulation_report_body())
        .dispatch()
        .await;
    assert_eq!(pdf.status(), Status::InternalServerError);
    let body: ErrorBody = pdf.into_json().await.unwrap();
    assert_eq!(body.error, "Failed to generate report");
    assert!(body.details.unwrap().contains("/nonexistent/fonts"));

    let text = client
        .post("/api/report/simulation/txt")
        .json(&simulation_report_body())
        .dispatch()
        .await;
    assert_eq!(text.status(), Status::Ok);
    let text = text.into_string().await.unwrap();
    assert!(text.contains("Page 1 of 1"));
}

#[tokio::test]
async fn explicit_fallback_resubmits_to_mock_route() {
    let mut stub = StubTransport::new(ok(H100_RESULT), ok("[]"));
    stub.unreachable = Some("http://scoring.test");
    let transport = Arc::new(stub);
    let client = client(transport.clone()).await;

    let response = client
        .post("/api/optimize?fallback=true")
        .json(&workload())
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::Ok);
    let result: RecommendationResult = response.into_json().await.unwrap();
    assert_eq!(result.recommended_instance, "H100");

    let seen = transport.seen.lock().unwrap();
    let urls: Vec<&str> = seen.iter().map(|(url, _)| url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "http://scoring.test/optimize",
            "http://optimizer.test/api/mock/optimize"
        ]
    );
    assert_eq!(seen[0].1, seen[1].1);
}

#[tokio::test]
async fn no_fallback_without_the_flag() {
    let mut stub = StubTransport::new(ok(H100_RESULT), ok("[]"));
    stub.unreachable = Some("http://scoring.test");
    let transport = Arc::new(stub);
    let client = client(transport.clone()).await;

    let response = client
        .post("/api/simulate")
        .json(&simulate_workload())
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::InternalServerError);
    let body: ErrorBody = response.into_json().await.unwrap();
    assert_eq!(body.error, "Failed to reach the scoring service");
    assert_eq!(transport.seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn simulation_report_as_pdf() {
    let config = AppConfig {
        report_font_dir: concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/fonts").to_string(),
        report_font_family: "DejaVuSerif".to_string(),
        ..test_config()
    };
    let client = client_with(config, idle_transport()).await;

    let response = client
        .post("/api/report/simulation/pdf")
        .json(&simulation_report_body())
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::Ok);
    assert_eq!(response.content_type(), Some(ContentType::PDF));
    let disposition = response
        .headers()
        .get_one("Content-Disposition")
        .unwrap()
        .to_string();
    assert!(disposition.ends_with(".pdf\""));
    let bytes = response.into_bytes().await.unwrap();
    assert!(bytes.starts_with(b"%PDF"));
}
