use serde::{Deserialize, Serialize};

use crate::error::DescriptorError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    Pytorch,
    Tensorflow,
    Jax,
    Onnx,
}

impl Framework {
    pub fn as_str(&self) -> &'static str {
        match self {
            Framework::Pytorch => "pytorch",
            Framework::Tensorflow => "tensorflow",
            Framework::Jax => "jax",
            Framework::Onnx => "onnx",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pytorch" => Some(Framework::Pytorch),
            "tensorflow" => Some(Framework::Tensorflow),
            "jax" => Some(Framework::Jax),
            "onnx" => Some(Framework::Onnx),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Training,
    Inference,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Training => "training",
            TaskType::Inference => "inference",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "training" => Some(TaskType::Training),
            "inference" => Some(TaskType::Inference),
            _ => None,
        }
    }
}

/// 已部署工作负载的实测资源指标
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceMetrics {
    pub gpu_utilization: f64,
    pub gpu_memory_usage: f64,
    pub cpu_utilization: f64,
    pub ram_usage: f64,
    pub disk_iops: f64,
    pub network_bandwidth: f64,
    pub avg_latency: f64,
    pub throughput: f64,
}

/// 部署模式。指标只在 post-deployment 下存在，由类型保证。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Deployment {
    PreDeployment,
    PostDeployment(ResourceMetrics),
}

impl Deployment {
    pub fn is_post_deployment(&self) -> bool {
        matches!(self, Deployment::PostDeployment(_))
    }

    pub fn metrics(&self) -> Option<&ResourceMetrics> {
        match self {
            Deployment::PreDeployment => None,
            Deployment::PostDeployment(metrics) => Some(metrics),
        }
    }
}

/// 一次评分请求的完整工作负载描述，构造后不可变
#[derive(Debug, Clone, PartialEq)]
pub struct WorkloadDescriptor {
    pub model_architecture: String,
    pub framework: Framework,
    pub task_type: TaskType,
    pub model_size_mb: f64,
    pub parameters_millions: f64,
    pub flops_billions: f64,
    pub batch_size: u32,
    pub latency_requirement_ms: Option<u32>,
    pub throughput_requirement: Option<u32>,
    pub concurrency: u32,
    pub deployment: Deployment,
}

impl WorkloadDescriptor {
    /// recommend 调用的请求体
    pub fn to_recommend_request(&self) -> RecommendRequest {
        RecommendRequest {
            model_type: self.model_architecture.clone(),
            framework: self.framework,
            task_type: self.task_type,
            model_size_mb: self.model_size_mb,
            parameters_millions: self.parameters_millions,
            flops_billions: self.flops_billions,
            batch_size: self.batch_size,
            latency_requirement_ms: self.latency_requirement_ms,
            throughput_requirement: self.throughput_requirement,
            concurrency: self.concurrency,
            is_post_deployment: self.deployment.is_post_deployment(),
            resource_metrics: self.deployment.metrics().copied(),
        }
    }

    /// simulate 调用的请求体，两个约束字段换了名字
    pub fn to_simulate_request(&self) -> SimulateRequest {
        SimulateRequest {
            model_type: self.model_architecture.clone(),
            framework: self.framework,
            task_type: self.task_type,
            model_size_mb: self.model_size_mb,
            parameters_millions: self.parameters_millions,
            flops_billions: self.flops_billions,
            batch_size: self.batch_size,
            latency_req_ms: self.latency_requirement_ms,
            throughput_req_qps: self.throughput_requirement,
            concurrency: self.concurrency,
            is_post_deployment: self.deployment.is_post_deployment(),
            resource_metrics: self.deployment.metrics().copied(),
        }
    }
}

fn default_concurrency() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendRequest {
    pub model_type: String,
    pub framework: Framework,
    pub task_type: TaskType,
    pub model_size_mb: f64,
    pub parameters_millions: f64,
    pub flops_billions: f64,
    pub batch_size: u32,
    #[serde(default)]
    pub latency_requirement_ms: Option<u32>,
    #[serde(default)]
    pub throughput_requirement: Option<u32>,
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,
    #[serde(default)]
    pub is_post_deployment: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_metrics: Option<ResourceMetrics>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulateRequest {
    pub model_type: String,
    pub framework: Framework,
    pub task_type: TaskType,
    pub model_size_mb: f64,
    pub parameters_millions: f64,
    pub flops_billions: f64,
    pub batch_size: u32,
    #[serde(default)]
    pub latency_req_ms: Option<u32>,
    #[serde(default)]
    pub throughput_req_qps: Option<u32>,
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,
    #[serde(default)]
    pub is_post_deployment: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_metrics: Option<ResourceMetrics>,
}

/// 两种请求体共有的字段，校验逻辑只写一遍
struct WireFields<'a> {
    model_type: &'a str,
    framework: Framework,
    task_type: TaskType,
    model_size_mb: f64,
    parameters_millions: f64,
    flops_billions: f64,
    batch_size: u32,
    latency: Option<u32>,
    throughput: Option<u32>,
    concurrency: u32,
    is_post_deployment: bool,
    resource_metrics: Option<ResourceMetrics>,
}

fn positive(field: &'static str, value: f64) -> Result<f64, DescriptorError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(DescriptorError::NotPositive { field })
    }
}

fn positive_int(field: &'static str, value: u32) -> Result<u32, DescriptorError> {
    if value >= 1 {
        Ok(value)
    } else {
        Err(DescriptorError::NotPositive { field })
    }
}

fn optional_positive(field: &'static str, value: Option<u32>) -> Result<Option<u32>, DescriptorError> {
    value.map(|v| positive_int(field, v)).transpose()
}

impl WireFields<'_> {
    fn into_descriptor(self) -> Result<WorkloadDescriptor, DescriptorError> {
        if self.model_type.trim().is_empty() {
            return Err(DescriptorError::MissingField { field: "model_type" });
        }

        let deployment = match (self.is_post_deployment, self.resource_metrics) {
            (false, None) => Deployment::PreDeployment,
            (true, Some(metrics)) => Deployment::PostDeployment(metrics),
            (true, None) => return Err(DescriptorError::AwaitingMetrics),
            (false, Some(_)) => return Err(DescriptorError::UnexpectedMetrics),
        };

        Ok(WorkloadDescriptor {
            model_architecture: self.model_type.to_string(),
            framework: self.framework,
            task_type: self.task_type,
            model_size_mb: positive("model_size_mb", self.model_size_mb)?,
            parameters_millions: positive("parameters_millions", self.parameters_millions)?,
            flops_billions: positive("flops_billions", self.flops_billions)?,
            batch_size: positive_int("batch_size", self.batch_size)?,
            latency_requirement_ms: optional_positive("latency_requirement_ms", self.latency)?,
            throughput_requirement: optional_positive("throughput_requirement", self.throughput)?,
            concurrency: positive_int("concurrency", self.concurrency)?,
            deployment,
        })
    }
}

impl TryFrom<&RecommendRequest> for WorkloadDescriptor {
    type Error = DescriptorError;

    fn try_from(req: &RecommendRequest) -> Result<Self, Self::Error> {
        WireFields {
            model_type: &req.model_type,
            framework: req.framework,
            task_type: req.task_type,
            model_size_mb: req.model_size_mb,
            parameters_millions: req.parameters_millions,
            flops_billions: req.flops_billions,
            batch_size: req.batch_size,
            latency: req.latency_requirement_ms,
            throughput: req.throughput_requirement,
            concurrency: req.concurrency,
            is_post_deployment: req.is_post_deployment,
            resource_metrics: req.resource_metrics,
        }
        .into_descriptor()
    }
}

impl TryFrom<&SimulateRequest> for WorkloadDescriptor {
    type Error = DescriptorError;

    fn try_from(req: &SimulateRequest) -> Result<Self, Self::Error> {
        WireFields {
            model_type: &req.model_type,
            framework: req.framework,
            task_type: req.task_type,
            model_size_mb: req.model_size_mb,
            parameters_millions: req.parameters_millions,
            flops_billions: req.flops_billions,
            batch_size: req.batch_size,
            latency: req.latency_req_ms,
            throughput: req.throughput_req_qps,
            concurrency: req.concurrency,
            is_post_deployment: req.is_post_deployment,
            resource_metrics: req.resource_metrics,
        }
        .into_descriptor()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternativeOption {
    pub hardware: String,
    pub inference_time_ms: f64,
    pub cost_per_1000: f64,
    #[serde(default)]
    pub violates_latency: bool,
    #[serde(default)]
    pub violates_throughput: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResult {
    pub recommended_instance: String,
    pub expected_inference_time_ms: f64,
    pub cost_per_1000_inferences: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peak_memory_usage_gb: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternatives: Option<Vec<AlternativeOption>>,
}

/// simulate 结果中的一行，各行地位相同
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationEntry {
    pub hardware: String,
    pub latency_ms: f64,
    pub throughput_qps: f64,
    pub cost_per_1000: f64,
    pub memory_gb: f64,
}

pub type SimulationResult = Vec<SimulationEntry>;

/// 代理路由返回的错误体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlopsEstimateResponse {
    pub model_type: String,
    pub multiplier: f64,
    pub flops_billions: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchitectureInfo {
    pub model_type: String,
    pub multiplier: f64,
}

/// 导出推荐报表时提交的内容
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationReportRequest {
    pub workload: RecommendRequest,
    pub result: RecommendationResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReportRequest {
    pub workload: SimulateRequest,
    pub results: SimulationResult,
}
