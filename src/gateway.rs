//! 表单与外部评分服务之间的请求网关。
//!
//! 每次调用：序列化请求体并 POST，先把响应读成文本，再解析、分类。
//! 这一层不重试；换备用地址重新提交由调用方显式决定（见 [`Submission`]）。

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{GatewayError, GatewayErrorKind};
use crate::types::{
    RecommendRequest, RecommendationResult, SimulateRequest, SimulationResult,
    WorkloadDescriptor,
};

/// 原始文本在错误详情里最多保留的字符数
pub const MAX_DETAILS_CHARS: usize = 200;

/// 超长原始文本截断后的标记
const ELLIPSIS: &str = "...";

/// 拼接根地址和路径，两边多余或缺少的 `/` 都处理掉
pub fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

/// 目标地址，总是绝对 URL。远程服务会额外带 `Accept: application/json`。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub url: String,
    pub remote: bool,
}

impl Endpoint {
    pub fn remote(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            remote: true,
        }
    }

    /// 本服务自己的路由，例如 `("http://127.0.0.1:8000", "/api/mock/optimize")`
    pub fn same_origin(origin: &str, path: &str) -> Self {
        Self {
            url: join_url(origin, path),
            remote: false,
        }
    }
}

/// 发给评分服务的请求体，由传输层负责序列化
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Recommend(RecommendRequest),
    Simulate(SimulateRequest),
}

impl Payload {
    fn kind(&self) -> CallKind {
        match self {
            Payload::Recommend(_) => CallKind::Recommend,
            Payload::Simulate(_) => CallKind::Simulate,
        }
    }
}

/// 拿到的完整响应，body 尚未解析
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub status_text: String,
    pub body: String,
}

impl RawResponse {
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

/// 发送 JSON 请求的传输层抽象
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST 一个 JSON 体，返回状态码和完整文本。
    /// 只有拿不到响应（连接失败、读 body 失败）才返回 Err。
    async fn post_json(
        &self,
        endpoint: &Endpoint,
        body: &Payload,
    ) -> Result<RawResponse, TransportError>;
}

/// 基于 reqwest 的实现
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(
        &self,
        endpoint: &Endpoint,
        body: &Payload,
    ) -> Result<RawResponse, TransportError> {
        let mut request = self
            .client
            .post(&endpoint.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if endpoint.remote {
            request = request.header(reqwest::header::ACCEPT, "application/json");
        }

        let response = request
            .json(body)
            .send()
            .await
            .map_err(|e| TransportError {
                message: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| TransportError {
            message: format!("Failed to read response body: {}", e),
        })?;

        Ok(RawResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("").to_string(),
            body,
        })
    }
}

/// 截断到 200 个字符，被截断时追加 `...`
pub fn truncate_raw(text: &str) -> String {
    match text.char_indices().nth(MAX_DETAILS_CHARS) {
        Some((cut, _)) => format!("{}{}", &text[..cut], ELLIPSIS),
        None => text.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallKind {
    Recommend,
    Simulate,
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// 解析 JSON 并识别上游错误（非成功状态或 `error` 字段）
fn parse_checked(raw: &RawResponse) -> Result<Value, GatewayError> {
    let value: Value = match serde_json::from_str(&raw.body) {
        Ok(value) => value,
        Err(_) if raw.is_ok() => {
            return Err(GatewayError::new(
                GatewayErrorKind::MalformedSuccessResponse,
                "Invalid JSON response from server",
            )
            .with_details(truncate_raw(&raw.body))
            .with_status(raw.status));
        }
        Err(_) => {
            return Err(GatewayError::new(
                GatewayErrorKind::InvalidResponseFormat,
                "Invalid JSON response from server",
            )
            .with_details(truncate_raw(&raw.body))
            .with_status(raw.status));
        }
    };

    let error_field = value.get("error").filter(|e| !e.is_null());
    if !raw.is_ok() || error_field.is_some() {
        let message = match error_field {
            Some(error) => value_text(error),
            None => format!("{} {}", raw.status, raw.status_text)
                .trim_end()
                .to_string(),
        };
        let details = match value.get("details").filter(|d| !d.is_null()) {
            Some(details) => value_text(details),
            None => truncate_raw(&raw.body),
        };
        return Err(GatewayError::new(GatewayErrorKind::UpstreamError, message)
            .with_details(details)
            .with_status(raw.status));
    }

    Ok(value)
}

fn decode<T: DeserializeOwned>(
    value: Value,
    kind: GatewayErrorKind,
    raw: &RawResponse,
) -> Result<T, GatewayError> {
    serde_json::from_value(value).map_err(|e| {
        GatewayError::new(kind, "Invalid response format from API")
            .with_details(e.to_string())
            .with_status(raw.status)
    })
}

/// recommend 响应分类：必须带非空的 `recommended_instance`
pub fn classify_recommend(raw: &RawResponse) -> Result<RecommendationResult, GatewayError> {
    let value = parse_checked(raw)?;

    let has_instance = value
        .get("recommended_instance")
        .and_then(Value::as_str)
        .is_some_and(|s| !s.is_empty());
    if !has_instance {
        return Err(GatewayError::new(
            GatewayErrorKind::MalformedSuccessResponse,
            "Invalid response format from API",
        )
        .with_details(truncate_raw(&raw.body))
        .with_status(raw.status));
    }

    decode(value, GatewayErrorKind::MalformedSuccessResponse, raw)
}

/// simulate 响应分类：必须是数组，对象即使解析成功也不接受
pub fn classify_simulate(raw: &RawResponse) -> Result<SimulationResult, GatewayError> {
    let value = parse_checked(raw)?;

    if !value.is_array() {
        return Err(GatewayError::new(
            GatewayErrorKind::InvalidResponseFormat,
            "Invalid response format from API: Expected an array of hardware options",
        )
        .with_details(truncate_raw(&raw.body))
        .with_status(raw.status));
    }

    decode(value, GatewayErrorKind::InvalidResponseFormat, raw)
}

/// 无状态网关，可以被多个并发调用共享
#[derive(Clone)]
pub struct Gateway {
    transport: Arc<dyn Transport>,
}

impl Gateway {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn http() -> Self {
        Self::new(Arc::new(HttpTransport::new()))
    }

    async fn send(&self, body: &Payload, endpoint: &Endpoint) -> Result<RawResponse, GatewayError> {
        let kind = body.kind();
        debug!(?kind, url = endpoint.url.as_str(), ?body, "Submitting workload");

        let raw = self
            .transport
            .post_json(endpoint, body)
            .await
            .map_err(|e| {
                warn!(?kind, url = endpoint.url.as_str(), error = %e, "Scoring service unreachable");
                GatewayError::network(e.message)
            })?;

        debug!(?kind, status = raw.status, body = raw.body.as_str(), "Raw scoring response");
        Ok(raw)
    }

    fn log_outcome<T>(kind: CallKind, outcome: &Result<T, GatewayError>) {
        if let Err(err) = outcome {
            warn!(
                ?kind,
                error_kind = ?err.kind,
                status = ?err.status_code,
                message = err.message.as_str(),
                "Scoring call failed"
            );
        }
    }

    pub async fn recommend(
        &self,
        descriptor: &WorkloadDescriptor,
        endpoint: &Endpoint,
    ) -> Result<RecommendationResult, GatewayError> {
        let body = Payload::Recommend(descriptor.to_recommend_request());
        let raw = self.send(&body, endpoint).await?;
        let outcome = classify_recommend(&raw);
        Self::log_outcome(CallKind::Recommend, &outcome);
        outcome
    }

    pub async fn simulate(
        &self,
        descriptor: &WorkloadDescriptor,
        endpoint: &Endpoint,
    ) -> Result<SimulationResult, GatewayError> {
        let body = Payload::Simulate(descriptor.to_simulate_request());
        let raw = self.send(&body, endpoint).await?;
        let outcome = classify_simulate(&raw);
        Self::log_outcome(CallKind::Simulate, &outcome);
        outcome
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    Submitting,
    Succeeded,
    Failed,
}

/// 一次用户提交：同一个请求体，加上一串候选地址。
///
/// 失败后不会自动换地址，只有调用 [`Submission::fall_back`] 才前进到下一个。
/// `&mut self` 保证同一时刻最多一个调用在途。
#[derive(Debug, Clone)]
pub struct Submission {
    descriptor: WorkloadDescriptor,
    endpoints: Vec<Endpoint>,
    current: usize,
    state: SubmissionState,
    timeout: Option<Duration>,
}

impl Submission {
    pub fn new(descriptor: WorkloadDescriptor, primary: Endpoint) -> Self {
        Self {
            descriptor,
            endpoints: vec![primary],
            current: 0,
            state: SubmissionState::Idle,
            timeout: None,
        }
    }

    /// 每次调用等待响应的上限；超时按网络错误算，提交进入 Failed
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_fallback(mut self, endpoint: Endpoint) -> Self {
        self.endpoints.push(endpoint);
        self
    }

    pub fn state(&self) -> SubmissionState {
        self.state
    }

    pub fn descriptor(&self) -> &WorkloadDescriptor {
        &self.descriptor
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoints[self.current]
    }

    /// 失败之后切到下一个候选地址，状态回到 Idle。
    /// 没失败或已经没有候选时返回 None，什么也不改。
    pub fn fall_back(&mut self) -> Option<&Endpoint> {
        if self.state != SubmissionState::Failed || self.current + 1 >= self.endpoints.len() {
            return None;
        }
        self.current += 1;
        self.state = SubmissionState::Idle;
        Some(&self.endpoints[self.current])
    }

    fn finish<T>(&mut self, outcome: &Result<T, GatewayError>) {
        self.state = if outcome.is_ok() {
            SubmissionState::Succeeded
        } else {
            SubmissionState::Failed
        };
    }

    async fn bounded<T>(
        timeout: Option<Duration>,
        call: impl Future<Output = Result<T, GatewayError>>,
    ) -> Result<T, GatewayError> {
        match timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.unwrap_or_else(|_| {
                Err(GatewayError::network(format!(
                    "no response within {}s",
                    limit.as_secs()
                )))
            }),
            None => call.await,
        }
    }

    pub async fn recommend(
        &mut self,
        gateway: &Gateway,
    ) -> Result<RecommendationResult, GatewayError> {
        self.state = SubmissionState::Submitting;
        let call = gateway.recommend(&self.descriptor, &self.endpoints[self.current]);
        let outcome = Self::bounded(self.timeout, call).await;
        self.finish(&outcome);
        outcome
    }

    pub async fn simulate(&mut self, gateway: &Gateway) -> Result<SimulationResult, GatewayError> {
        self.state = SubmissionState::Submitting;
        let call = gateway.simulate(&self.descriptor, &self.endpoints[self.current]);
        let outcome = Self::bounded(self.timeout, call).await;
        self.finish(&outcome);
        outcome
    }
}
