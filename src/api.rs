use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use rocket::http::{ContentType, Header, Status};
use rocket::serde::json::Json;
use rocket::{catch, get, post, Request, Responder, State};
use tracing::{debug, warn};

use crate::app_state::AppState;
use crate::error::{DescriptorError, GatewayError, ReportError};
use crate::hardware::HardwareSpec;
use crate::mock;
use crate::report::{Report, ReportFormat};
use crate::types::{
    ArchitectureInfo, ErrorBody, FlopsEstimateResponse, HealthResponse, RecommendRequest,
    RecommendationReportRequest, RecommendationResult, SimulateRequest, SimulationReportRequest,
    SimulationResult, WorkloadDescriptor,
};

/// 错误统一回 `{error, details}`
pub type ApiError = (Status, Json<ErrorBody>);

fn api_error(status: Status, error: impl Into<String>, details: Option<String>) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error: error.into(),
            details,
        }),
    )
}

/// 上游给了错误状态码就原样转发，其余情况一律 500
fn from_gateway(err: GatewayError) -> ApiError {
    let status = err
        .status_code
        .filter(|code| (400..600).contains(code))
        .map(Status::new)
        .unwrap_or(Status::InternalServerError);
    api_error(status, err.message, err.details)
}

fn from_descriptor(err: DescriptorError) -> ApiError {
    let status = match err {
        DescriptorError::AwaitingMetrics => Status::Conflict,
        _ => Status::UnprocessableEntity,
    };
    api_error(status, err.to_string(), None)
}

fn from_report(err: ReportError) -> ApiError {
    api_error(
        Status::InternalServerError,
        "Failed to generate report",
        Some(err.to_string()),
    )
}

#[get("/health")]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

#[get("/api/architectures")]
pub async fn list_architectures(state: &State<Arc<AppState>>) -> Json<Vec<ArchitectureInfo>> {
    let resp = state
        .flops
        .entries()
        .into_iter()
        .map(|(tag, multiplier)| ArchitectureInfo {
            model_type: tag.to_string(),
            multiplier,
        })
        .collect();
    Json(resp)
}

#[get("/api/flops?<model_type>&<parameters_millions>")]
pub async fn estimate_flops(
    state: &State<Arc<AppState>>,
    model_type: &str,
    parameters_millions: f64,
) -> Result<Json<FlopsEstimateResponse>, ApiError> {
    // 估算器本身不校验，这里挡掉负数和非有限值
    if !parameters_millions.is_finite() || parameters_millions < 0.0 {
        return Err(api_error(
            Status::UnprocessableEntity,
            "parameters_millions must be a non-negative number",
            None,
        ));
    }

    Ok(Json(FlopsEstimateResponse {
        model_type: model_type.to_string(),
        multiplier: state.flops.multiplier(model_type),
        flops_billions: state.flops.estimate(model_type, parameters_millions),
    }))
}

#[get("/api/hardware")]
pub async fn list_hardware(
    state: &State<Arc<AppState>>,
) -> Json<BTreeMap<String, HardwareSpec>> {
    let resp = state
        .hardware
        .list()
        .into_iter()
        .map(|(id, spec)| (id.to_string(), spec.clone()))
        .collect();
    Json(resp)
}

#[get("/api/hardware/<id>")]
pub async fn hardware_spec(
    state: &State<Arc<AppState>>,
    id: &str,
) -> Result<Json<HardwareSpec>, ApiError> {
    state.hardware.get(id).cloned().map(Json).ok_or_else(|| {
        api_error(
            Status::NotFound,
            format!("hardware `{}` not found", id),
            None,
        )
    })
}

/// `?fallback=true` 时，上游失败后改投本服务的 mock 路由，只换一次地址
#[post("/api/optimize?<fallback>", data = "<req>")]
pub async fn optimize(
    state: &State<Arc<AppState>>,
    req: Json<RecommendRequest>,
    fallback: Option<bool>,
) -> Result<Json<RecommendationResult>, ApiError> {
    let descriptor = WorkloadDescriptor::try_from(&*req).map_err(from_descriptor)?;
    let mut submission = state.recommend_submission(descriptor, fallback.unwrap_or(false));
    debug!(url = submission.endpoint().url.as_str(), "Forwarding optimize request");

    let mut outcome = submission.recommend(&state.gateway).await;
    if outcome.is_err() {
        if let Some(next) = submission.fall_back() {
            warn!(url = next.url.as_str(), "Resubmitting optimize request to fallback");
            outcome = submission.recommend(&state.gateway).await;
        }
    }
    outcome.map(Json).map_err(from_gateway)
}

#[post("/api/simulate?<fallback>", data = "<req>")]
pub async fn simulate(
    state: &State<Arc<AppState>>,
    req: Json<SimulateRequest>,
    fallback: Option<bool>,
) -> Result<Json<SimulationResult>, ApiError> {
    let descriptor = WorkloadDescriptor::try_from(&*req).map_err(from_descriptor)?;
    let mut submission = state.simulate_submission(descriptor, fallback.unwrap_or(false));
    debug!(url = submission.endpoint().url.as_str(), "Forwarding simulate request");

    let mut outcome = submission.simulate(&state.gateway).await;
    if outcome.is_err() {
        if let Some(next) = submission.fall_back() {
            warn!(url = next.url.as_str(), "Resubmitting simulate request to fallback");
            outcome = submission.simulate(&state.gateway).await;
        }
    }
    outcome.map(Json).map_err(from_gateway)
}

async fn mock_delay(state: &AppState) {
    if state.config.mock_delay_ms > 0 {
        rocket::tokio::time::sleep(Duration::from_millis(state.config.mock_delay_ms)).await;
    }
}

#[post("/api/mock/optimize", data = "<req>")]
pub async fn mock_optimize(
    state: &State<Arc<AppState>>,
    req: Json<RecommendRequest>,
) -> Result<Json<RecommendationResult>, ApiError> {
    let descriptor = WorkloadDescriptor::try_from(&*req).map_err(from_descriptor)?;
    mock_delay(state).await;
    Ok(Json(mock::recommend(&descriptor)))
}

#[post("/api/mock/simulate", data = "<req>")]
pub async fn mock_simulate(
    state: &State<Arc<AppState>>,
    req: Json<SimulateRequest>,
) -> Result<Json<SimulationResult>, ApiError> {
    let descriptor = WorkloadDescriptor::try_from(&*req).map_err(from_descriptor)?;
    mock_delay(state).await;
    Ok(Json(mock::simulate(&descriptor)))
}

/// 报表下载：正文加 Content-Type 和附件文件名
#[derive(Responder)]
pub struct Download {
    body: Vec<u8>,
    content_type: ContentType,
    disposition: Header<'static>,
}

fn render(
    state: &AppState,
    report: &Report<'_>,
    format: ReportFormat,
) -> Result<Download, ApiError> {
    let (body, content_type) = match format {
        ReportFormat::Json => (
            report.to_json().map_err(from_report)?.into_bytes(),
            ContentType::JSON,
        ),
        ReportFormat::Csv => (report.to_csv().into_bytes(), ContentType::CSV),
        ReportFormat::Text => (report.to_text().into_bytes(), ContentType::Plain),
        ReportFormat::Pdf => (
            report
                .to_pdf(&state.config.report_font_dir, &state.config.report_font_family)
                .map_err(|e| {
                    warn!(error = %e, "PDF rendering failed");
                    from_report(e)
                })?,
            ContentType::PDF,
        ),
    };

    Ok(Download {
        body,
        content_type,
        disposition: Header::new(
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", report.filename(format)),
        ),
    })
}

fn parse_format(format: &str) -> Result<ReportFormat, ApiError> {
    ReportFormat::parse(format).ok_or_else(|| {
        api_error(
            Status::NotFound,
            format!("unsupported report format `{}`", format),
            None,
        )
    })
}

#[post("/api/report/recommendation/<format>", data = "<req>")]
pub async fn recommendation_report(
    state: &State<Arc<AppState>>,
    format: &str,
    req: Json<RecommendationReportRequest>,
) -> Result<Download, ApiError> {
    let format = parse_format(format)?;
    let descriptor = WorkloadDescriptor::try_from(&req.workload).map_err(from_descriptor)?;
    let report = Report::recommendation(
        &descriptor,
        &req.result,
        &state.hardware,
        chrono::Utc::now(),
    );
    render(state, &report, format)
}

#[post("/api/report/simulation/<format>", data = "<req>")]
pub async fn simulation_report(
    state: &State<Arc<AppState>>,
    format: &str,
    req: Json<SimulationReportRequest>,
) -> Result<Download, ApiError> {
    let format = parse_format(format)?;
    let descriptor = WorkloadDescriptor::try_from(&req.workload).map_err(from_descriptor)?;
    let report = Report::simulation(
        &descriptor,
        &req.results,
        &state.hardware,
        chrono::Utc::now(),
    );
    render(state, &report, format)
}

#[catch(404)]
pub fn not_found(req: &Request<'_>) -> Json<ErrorBody> {
    Json(ErrorBody {
        error: format!("no route for {} {}", req.method(), req.uri()),
        details: None,
    })
}

#[catch(422)]
pub fn unprocessable(_req: &Request<'_>) -> Json<ErrorBody> {
    Json(ErrorBody {
        error: "Request body is not a valid workload description".to_string(),
        details: None,
    })
}

#[catch(default)]
pub fn fallback(status: Status, _req: &Request<'_>) -> (Status, Json<ErrorBody>) {
    (
        status,
        Json(ErrorBody {
            error: status.reason_lossy().to_string(),
            details: None,
        }),
    )
}
