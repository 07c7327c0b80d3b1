use serde::Serialize;

/// Gateway 失败的分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GatewayErrorKind {
    /// 拿到响应之前传输层就失败了
    NetworkError,
    /// 响应体不是 JSON，或不是期望的数组/对象形状
    InvalidResponseFormat,
    /// 状态码成功，但响应体没通过最小形状检查
    MalformedSuccessResponse,
    /// 非成功状态码，或响应体里带了 `error` 字段
    UpstreamError,
}

/// 统一交给调用方的错误，所有失败都会走到这里
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct GatewayError {
    pub kind: GatewayErrorKind,
    pub message: String,
    pub details: Option<String>,
    pub status_code: Option<u16>,
}

impl GatewayError {
    pub fn new(kind: GatewayErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
            status_code: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self
    }

    pub fn network(details: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::NetworkError, "Failed to reach the scoring service")
            .with_details(details)
    }
}

/// 请求体无法构成合法的 WorkloadDescriptor
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DescriptorError {
    #[error("missing required field `{field}`")]
    MissingField { field: &'static str },

    #[error("field `{field}` must be a positive number")]
    NotPositive { field: &'static str },

    #[error("resource metrics are required before a post-deployment workload can be submitted")]
    AwaitingMetrics,

    #[error("resource metrics are only accepted for post-deployment workloads")]
    UnexpectedMetrics,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FormError {
    #[error("field `{field}` is required")]
    Missing { field: &'static str },

    #[error("field `{field}` is not a valid number: `{value}`")]
    InvalidNumber { field: &'static str, value: String },

    #[error("unknown value `{value}` for `{field}`")]
    UnknownOption { field: &'static str, value: String },

    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("no usable font `{family}` in `{dir}`: {message}")]
    FontUnavailable {
        dir: String,
        family: String,
        message: String,
    },

    #[error("failed to render PDF: {message}")]
    Render { message: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
